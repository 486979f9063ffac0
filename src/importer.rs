use std::io::Read;
use std::path::Path;

use chrono::NaiveDateTime;

use crate::error::{Result, SmartMedError};
use crate::models::{Cell, RawTable};

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Convert an Excel serial day number (days since 1899-12-30, fraction = time of day).
pub fn excel_serial_to_datetime(serial: f64) -> Option<NaiveDateTime> {
    // 2958465 is 9999-12-31
    if !serial.is_finite() || serial < 1.0 || serial > 2_958_465.0 {
        return None;
    }
    let base = chrono::NaiveDate::from_ymd_opt(1899, 12, 30)?.and_hms_opt(0, 0, 0)?;
    let seconds = (serial * 86_400.0).round() as i64;
    base.checked_add_signed(chrono::Duration::seconds(seconds))
}

// ---------------------------------------------------------------------------
// Source kinds
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SourceKind {
    DelimitedText,
    #[cfg(feature = "xlsx")]
    Spreadsheet,
}

impl SourceKind {
    pub fn detect(file_path: &Path) -> Option<Self> {
        let ext = file_path
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or("")
            .to_ascii_lowercase();
        match ext.as_str() {
            "csv" | "txt" => Some(Self::DelimitedText),
            #[cfg(feature = "xlsx")]
            "xlsx" | "xlsm" | "xls" | "xlsb" | "ods" => Some(Self::Spreadsheet),
            _ => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::DelimitedText => "delimited text",
            #[cfg(feature = "xlsx")]
            Self::Spreadsheet => "spreadsheet",
        }
    }
}

/// Load a sales export from disk. Spreadsheets skip `skip_rows` leading rows before the header.
#[cfg_attr(not(feature = "xlsx"), allow(unused_variables))]
pub fn load_file(file_path: &Path, skip_rows: usize) -> Result<RawTable> {
    let kind = SourceKind::detect(file_path)
        .ok_or_else(|| SmartMedError::UnsupportedFormat(file_path.display().to_string()))?;
    log::info!("reading {} as {}", file_path.display(), kind.name());

    let table = match kind {
        SourceKind::DelimitedText => {
            let file = std::fs::File::open(file_path)?;
            read_csv(std::io::BufReader::new(file))?
        }
        #[cfg(feature = "xlsx")]
        SourceKind::Spreadsheet => read_spreadsheet(file_path, skip_rows)?,
    };
    log::info!(
        "loaded {} rows x {} columns",
        table.rows.len(),
        table.headers.len()
    );
    Ok(table)
}

// ---------------------------------------------------------------------------
// Delimited text
// ---------------------------------------------------------------------------

/// Parse delimited text whose first record is the header row.
/// Non-UTF-8 bytes are replaced rather than rejected.
pub fn read_csv<R: Read>(reader: R) -> Result<RawTable> {
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(reader);

    let mut header: Option<Vec<Cell>> = None;
    let mut rows = Vec::new();
    for result in rdr.byte_records() {
        let record = result?;
        let cells: Vec<Cell> = record
            .iter()
            .map(|field| Cell::from_text(&String::from_utf8_lossy(field)))
            .collect();
        if header.is_none() {
            let mut cells = cells;
            if let Some(Cell::Text(first)) = cells.first_mut() {
                *first = first.trim_start_matches('\u{feff}').to_string();
            }
            header = Some(cells);
        } else {
            rows.push(cells);
        }
    }
    Ok(RawTable::from_header_cells(&header.unwrap_or_default(), rows))
}

// ---------------------------------------------------------------------------
// Spreadsheet (feature-gated)
// ---------------------------------------------------------------------------

#[cfg(feature = "xlsx")]
fn read_spreadsheet(file_path: &Path, skip_rows: usize) -> Result<RawTable> {
    use calamine::Reader;

    let mut workbook = calamine::open_workbook_auto(file_path)
        .map_err(|e| SmartMedError::Spreadsheet(format!("Failed to open workbook: {e}")))?;
    let range = workbook
        .worksheet_range_at(0)
        .ok_or_else(|| SmartMedError::Spreadsheet("Workbook has no sheets".to_string()))?
        .map_err(|e| SmartMedError::Spreadsheet(format!("Failed to read first sheet: {e}")))?;

    let rows = range
        .rows()
        .map(|row| row.iter().map(cell_from_data).collect::<Vec<_>>());
    Ok(table_from_sheet_rows(range.start().unwrap_or((0, 0)), rows, skip_rows))
}

/// Build a table from a used range that begins at `start` (row, column).
/// `skip_rows` and the column positions count from A1, not from `start`;
/// blank rows are dropped and the first remaining row is the header.
#[cfg(any(feature = "xlsx", test))]
fn table_from_sheet_rows(
    start: (u32, u32),
    rows: impl Iterator<Item = Vec<Cell>>,
    skip_rows: usize,
) -> RawTable {
    let (start_row, start_col) = start;
    let skip = skip_rows.saturating_sub(start_row as usize);
    let pad = start_col as usize;

    let mut rows = rows
        .skip(skip)
        .map(|row| {
            let mut cells = vec![Cell::Empty; pad];
            cells.extend(row);
            cells
        })
        .filter(|cells| !cells.iter().all(Cell::is_empty));

    let header = rows.next().unwrap_or_default();
    RawTable::from_header_cells(&header, rows.collect())
}

#[cfg(feature = "xlsx")]
fn cell_from_data(data: &calamine::Data) -> Cell {
    use calamine::Data;
    match data {
        Data::Int(i) => Cell::Number(*i as f64),
        Data::Float(f) => Cell::Number(*f),
        Data::String(s) if s.is_empty() => Cell::Empty,
        Data::String(s) => Cell::Text(s.clone()),
        Data::Bool(b) => Cell::Bool(*b),
        Data::DateTime(dt) => {
            excel_serial_to_datetime(dt.as_f64()).map_or(Cell::Empty, Cell::DateTime)
        }
        Data::DateTimeIso(s) | Data::DurationIso(s) => Cell::Text(s.clone()),
        Data::Error(_) | Data::Empty => Cell::Empty,
    }
}
