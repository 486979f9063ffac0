use chrono::{NaiveDate, NaiveDateTime};

use crate::error::SchemaError;
use crate::importer::excel_serial_to_datetime;
use crate::models::{Cell, CleanedTable, Column, Field, RawTable, SalesRecord};

pub const VCH_DATE: &str = "Vch_date";
pub const AMOUNT: &str = "Amount";
pub const QTY: &str = "Qty";
pub const SCM_QTY: &str = "Scm_qty";
pub const SCM_DISC: &str = "Scm_disc";
pub const MRP: &str = "MRP";
pub const EXP_DATE: &str = "Exp_date";

/// Accepted spellings of the voucher date header, in priority order.
pub const DATE_ALIASES: &[&str] = &[VCH_DATE, "Vchdate", "Voucher_Date"];

/// Canonical names for the columns that are not fixed by the export format.
#[derive(Debug, Clone, PartialEq)]
pub struct Schema {
    pub customer_column: String,
    /// The product column has no header in the exports seen so far, so it
    /// arrives as `Unnamed_1`.
    pub product_column: String,
}

impl Default for Schema {
    fn default() -> Self {
        Self {
            customer_column: "Particulars".to_string(),
            product_column: "Unnamed_1".to_string(),
        }
    }
}

impl Schema {
    fn field_for(&self, name: &str) -> Option<Field> {
        let field = match name {
            VCH_DATE => Field::VchDate,
            AMOUNT => Field::Amount,
            QTY => Field::Qty,
            SCM_QTY => Field::ScmQty,
            SCM_DISC => Field::ScmDisc,
            MRP => Field::Mrp,
            EXP_DATE => Field::ExpDate,
            n if n == self.customer_column => Field::Customer,
            n if n == self.product_column => Field::Product,
            _ => return None,
        };
        Some(field)
    }
}

/// Trim, turn spaces into underscores, drop colons: `"Vch Date: "` -> `"Vch_Date"`.
pub fn canonical_column_name(raw: &str) -> String {
    raw.trim().replace(' ', "_").replace(':', "")
}

// ---------------------------------------------------------------------------
// Cell coercion
// ---------------------------------------------------------------------------

const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M",
    "%m/%d/%Y %H:%M:%S",
    "%m/%d/%Y %H:%M",
    "%d/%m/%Y %H:%M:%S",
    "%d/%m/%Y %H:%M",
];

// Month-first before day-first; two-digit years last so `%Y` never eats them.
const DATE_FORMATS: &[&str] = &[
    "%Y-%m-%d",
    "%Y/%m/%d",
    "%m/%d/%Y",
    "%d/%m/%Y",
    "%m-%d-%Y",
    "%d-%m-%Y",
    "%d.%m.%Y",
    "%d-%b-%Y",
    "%d %b %Y",
    "%b %d, %Y",
    "%d-%b-%y",
    "%m/%d/%y",
    "%d/%m/%y",
];

fn plausible(dt: NaiveDateTime) -> Option<NaiveDateTime> {
    use chrono::Datelike;
    (dt.year() >= 1900).then_some(dt)
}

pub fn parse_date_text(raw: &str) -> Option<NaiveDateTime> {
    let s = raw.trim();
    if s.is_empty() {
        return None;
    }
    DATETIME_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(s, fmt).ok().and_then(plausible))
        .or_else(|| {
            DATE_FORMATS.iter().find_map(|fmt| {
                NaiveDate::parse_from_str(s, fmt)
                    .ok()
                    .and_then(|d| d.and_hms_opt(0, 0, 0))
                    .and_then(plausible)
            })
        })
}

/// Read a cell as a date/time. Anything unreadable is `None`, never an error.
pub fn parse_datetime(cell: &Cell) -> Option<NaiveDateTime> {
    match cell {
        Cell::DateTime(dt) => Some(*dt),
        Cell::Number(serial) => excel_serial_to_datetime(*serial),
        Cell::Text(s) => parse_date_text(s),
        Cell::Bool(_) | Cell::Empty => None,
    }
}

pub fn parse_number_text(raw: &str) -> Option<f64> {
    let s = raw.trim().replace(',', "");
    s.parse::<f64>().ok().filter(|n| !n.is_nan())
}

/// Read a cell as a number. Anything unreadable is `None`, never an error.
pub fn parse_number(cell: &Cell) -> Option<f64> {
    match cell {
        Cell::Number(n) => Some(*n).filter(|n| !n.is_nan()),
        Cell::Text(s) => parse_number_text(s),
        Cell::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
        Cell::DateTime(_) | Cell::Empty => None,
    }
}

fn parse_label(cell: &Cell) -> Option<String> {
    match cell {
        Cell::Empty => None,
        other => Some(other.to_string()),
    }
}

/// `name`, or `name.1`, `name.2`, ... if an earlier column already holds it.
fn unique_name(columns: &[Column], name: String) -> String {
    let taken = |n: &str| columns.iter().any(|c| c.name == n);
    let mut candidate = name.clone();
    let mut suffix = 1;
    while taken(&candidate) {
        candidate = format!("{name}.{suffix}");
        suffix += 1;
    }
    candidate
}

// ---------------------------------------------------------------------------
// normalize
// ---------------------------------------------------------------------------

/// Clean a raw export into the canonical sales schema.
///
/// Drops fully empty rows, canonicalizes headers, resolves the voucher date
/// alias, requires `Amount`, coerces dates and numbers (failures become
/// missing) and defaults the scheme fields to zero. The input is not touched.
pub fn normalize(raw: &RawTable, schema: &Schema) -> Result<CleanedTable, SchemaError> {
    let names: Vec<String> = raw.headers.iter().map(|h| canonical_column_name(h)).collect();
    log::debug!("cleaned columns: {names:?}");

    // The leftmost column carrying any alias becomes the voucher date.
    let date_idx = names
        .iter()
        .position(|n| DATE_ALIASES.contains(&n.as_str()))
        .ok_or_else(|| SchemaError::MissingColumn(VCH_DATE.to_string()))?;
    if names[date_idx] != VCH_DATE {
        log::info!("using '{}' as {VCH_DATE}", names[date_idx]);
    }
    if !names.iter().any(|n| n == AMOUNT) {
        return Err(SchemaError::MissingColumn(AMOUNT.to_string()));
    }

    let mut columns: Vec<Column> = Vec::with_capacity(names.len() + 2);
    let mut extra_count = 0;
    for (i, name) in names.into_iter().enumerate() {
        let (name, field) = if i == date_idx {
            (VCH_DATE.to_string(), Field::VchDate)
        } else {
            // A canonical slot is filled by its first column; later duplicates ride along.
            match schema.field_for(&name) {
                Some(f) if f != Field::VchDate && !columns.iter().any(|c| c.field == f) => (name, f),
                _ => {
                    extra_count += 1;
                    (name, Field::Extra(extra_count - 1))
                }
            }
        };
        let name = unique_name(&columns, name);
        columns.push(Column { name, field });
    }

    let mut unparsed_dates = 0usize;
    let records: Vec<SalesRecord> = raw
        .rows
        .iter()
        .filter(|row| !row.iter().all(Cell::is_empty))
        .map(|row| {
            let mut record = SalesRecord {
                extra: Vec::with_capacity(extra_count),
                ..Default::default()
            };
            for (column, cell) in columns.iter().zip(row) {
                match column.field {
                    Field::VchDate => {
                        record.vch_date = parse_datetime(cell);
                        if record.vch_date.is_none() {
                            unparsed_dates += 1;
                        }
                    }
                    Field::Amount => record.amount = parse_number(cell),
                    Field::Customer => record.customer = parse_label(cell),
                    Field::Product => record.product = parse_label(cell),
                    Field::Qty => record.qty = parse_number(cell),
                    Field::ScmQty => record.scm_qty = parse_number(cell).unwrap_or(0.0),
                    Field::ScmDisc => record.scm_disc = parse_number(cell).unwrap_or(0.0),
                    Field::Mrp => record.mrp = parse_number(cell),
                    Field::ExpDate => record.exp_date = parse_datetime(cell),
                    Field::Extra(_) => record.extra.push(cell.clone()),
                }
            }
            record
        })
        .collect();

    for (name, field) in [(SCM_QTY, Field::ScmQty), (SCM_DISC, Field::ScmDisc)] {
        if !columns.iter().any(|c| c.field == field) {
            columns.push(Column {
                name: name.to_string(),
                field,
            });
        }
    }

    log::info!(
        "normalized {} of {} rows",
        records.len(),
        raw.rows.len()
    );
    if unparsed_dates > 0 {
        log::warn!("{unparsed_dates} rows have no readable {VCH_DATE}");
    }

    Ok(CleanedTable::new(columns, records))
}
