use std::collections::BTreeSet;
use std::fmt;

use chrono::{NaiveDate, NaiveDateTime};

/// Spellings a delimited-text parser should treat as a missing value.
const NA_VALUES: &[&str] = &[
    "", "#N/A", "#N/A N/A", "#NA", "-1.#IND", "-1.#QNAN", "-NaN", "-nan", "1.#IND", "1.#QNAN",
    "<NA>", "N/A", "NA", "NULL", "NaN", "None", "n/a", "nan", "null",
];

/// One untyped value as produced by a CSV or spreadsheet parser.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Cell {
    #[default]
    Empty,
    Text(String),
    Number(f64),
    Bool(bool),
    DateTime(NaiveDateTime),
}

impl Cell {
    /// Build a cell from delimited-text input. Whitespace-only fields and the
    /// usual NA spellings become `Empty`; other text is kept untrimmed.
    pub fn from_text(raw: &str) -> Self {
        if raw.trim().is_empty() || NA_VALUES.contains(&raw) {
            Cell::Empty
        } else {
            Cell::Text(raw.to_string())
        }
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, Cell::Empty)
    }
}

impl fmt::Display for Cell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Cell::Empty => Ok(()),
            Cell::Text(s) => f.write_str(s),
            Cell::Number(n) => write!(f, "{n}"),
            Cell::Bool(true) => f.write_str("True"),
            Cell::Bool(false) => f.write_str("False"),
            Cell::DateTime(dt) => {
                if dt.time() == chrono::NaiveTime::MIN {
                    write!(f, "{}", dt.format("%Y-%m-%d"))
                } else {
                    write!(f, "{}", dt.format("%Y-%m-%d %H:%M:%S"))
                }
            }
        }
    }
}

/// Header plus rows exactly as loaded from a file. Every row has the header's width.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct RawTable {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<Cell>>,
}

impl RawTable {
    pub fn new(headers: Vec<String>, rows: Vec<Vec<Cell>>) -> Self {
        let width = headers.len();
        let rows = rows
            .into_iter()
            .map(|mut row| {
                row.resize(width, Cell::Empty);
                row
            })
            .collect();
        Self { headers, rows }
    }

    /// Build a table from a header row of raw cells. Blank headers become
    /// `Unnamed: <position>` and repeated names get `.1`, `.2`, ... suffixes.
    pub fn from_header_cells(header: &[Cell], rows: Vec<Vec<Cell>>) -> Self {
        let mut headers: Vec<String> = Vec::with_capacity(header.len());
        for (i, cell) in header.iter().enumerate() {
            let name = cell.to_string();
            let name = if name.trim().is_empty() {
                format!("Unnamed: {i}")
            } else {
                name
            };
            let mut candidate = name.clone();
            let mut suffix = 1;
            while headers.contains(&candidate) {
                candidate = format!("{name}.{suffix}");
                suffix += 1;
            }
            headers.push(candidate);
        }
        Self::new(headers, rows)
    }
}

/// Which canonical slot a cleaned column feeds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field {
    VchDate,
    Amount,
    Customer,
    Product,
    Qty,
    ScmQty,
    ScmDisc,
    Mrp,
    ExpDate,
    /// Any other source column, by position in `SalesRecord::extra`.
    Extra(usize),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Column {
    pub name: String,
    pub field: Field,
}

/// One sale line after cleaning. Missing values are `None`; scheme fields default to zero.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SalesRecord {
    pub vch_date: Option<NaiveDateTime>,
    pub amount: Option<f64>,
    pub customer: Option<String>,
    pub product: Option<String>,
    pub qty: Option<f64>,
    pub scm_qty: f64,
    pub scm_disc: f64,
    pub mrp: Option<f64>,
    pub exp_date: Option<NaiveDateTime>,
    pub extra: Vec<Cell>,
}

impl SalesRecord {
    pub fn cell(&self, field: Field) -> Cell {
        fn num(v: Option<f64>) -> Cell {
            v.map_or(Cell::Empty, Cell::Number)
        }
        fn date(v: Option<NaiveDateTime>) -> Cell {
            v.map_or(Cell::Empty, Cell::DateTime)
        }
        fn text(v: &Option<String>) -> Cell {
            v.as_ref().map_or(Cell::Empty, |s| Cell::Text(s.clone()))
        }
        match field {
            Field::VchDate => date(self.vch_date),
            Field::Amount => num(self.amount),
            Field::Customer => text(&self.customer),
            Field::Product => text(&self.product),
            Field::Qty => num(self.qty),
            Field::ScmQty => Cell::Number(self.scm_qty),
            Field::ScmDisc => Cell::Number(self.scm_disc),
            Field::Mrp => num(self.mrp),
            Field::ExpDate => date(self.exp_date),
            Field::Extra(i) => self.extra.get(i).cloned().unwrap_or_default(),
        }
    }

    pub fn vch_day(&self) -> Option<NaiveDate> {
        self.vch_date.map(|dt| dt.date())
    }
}

/// Output of the normalizer: canonical columns in source order plus typed rows.
#[derive(Debug, Clone, PartialEq)]
pub struct CleanedTable {
    columns: Vec<Column>,
    records: Vec<SalesRecord>,
}

impl CleanedTable {
    pub(crate) fn new(columns: Vec<Column>, records: Vec<SalesRecord>) -> Self {
        Self { columns, records }
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.name.as_str()).collect()
    }

    pub fn records(&self) -> &[SalesRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn has(&self, field: Field) -> bool {
        self.columns.iter().any(|c| c.field == field)
    }

    /// Sorted distinct customer names, for filter pickers.
    pub fn customers(&self) -> Vec<String> {
        distinct(self.records.iter().filter_map(|r| r.customer.as_deref()))
    }

    /// Sorted distinct product names, for filter pickers.
    pub fn products(&self) -> Vec<String> {
        distinct(self.records.iter().filter_map(|r| r.product.as_deref()))
    }

    /// Earliest and latest voucher date, ignoring rows without one.
    pub fn date_span(&self) -> Option<(NaiveDate, NaiveDate)> {
        let mut days = self.records.iter().filter_map(SalesRecord::vch_day);
        let first = days.next()?;
        Some(days.fold((first, first), |(lo, hi), d| (lo.min(d), hi.max(d))))
    }

    /// Turn the cleaned table back into raw cells under its canonical headers.
    #[cfg(test)]
    pub fn to_raw(&self) -> RawTable {
        let headers = self.columns.iter().map(|c| c.name.clone()).collect();
        let rows = self
            .records
            .iter()
            .map(|r| self.columns.iter().map(|c| r.cell(c.field)).collect())
            .collect();
        RawTable::new(headers, rows)
    }
}

fn distinct<'a>(values: impl Iterator<Item = &'a str>) -> Vec<String> {
    values
        .collect::<BTreeSet<_>>()
        .into_iter()
        .map(str::to_string)
        .collect()
}
