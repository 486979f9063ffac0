use std::io::Write;
use std::path::Path;

use crate::error::Result;
use crate::filter::FilteredView;
use crate::models::Cell;

pub const DEFAULT_EXPORT_NAME: &str = "filtered_sales_data.csv";

fn format_cell(cell: &Cell, date_only: bool) -> String {
    match cell {
        Cell::DateTime(dt) if date_only => dt.format("%Y-%m-%d").to_string(),
        Cell::DateTime(dt) => dt.format("%Y-%m-%d %H:%M:%S").to_string(),
        other => other.to_string(),
    }
}

/// Write every column of the view as UTF-8 CSV, header first.
///
/// A date column prints as `YYYY-MM-DD` when all of its values in the view
/// fall on midnight, otherwise with the time of day.
pub fn write_csv<W: Write>(view: &FilteredView, writer: W) -> Result<()> {
    let columns = view.columns();
    let date_only: Vec<bool> = columns
        .iter()
        .map(|c| {
            view.records().iter().all(|r| match r.cell(c.field) {
                Cell::DateTime(dt) => dt.time() == chrono::NaiveTime::MIN,
                _ => true,
            })
        })
        .collect();

    let mut wtr = csv::Writer::from_writer(writer);
    wtr.write_record(columns.iter().map(|c| c.name.as_str()))?;
    for record in view.records() {
        wtr.write_record(
            columns
                .iter()
                .zip(&date_only)
                .map(|(c, &date_only)| format_cell(&record.cell(c.field), date_only)),
        )?;
    }
    wtr.flush()?;
    Ok(())
}

/// Write the view to `path`, creating parent directories. Returns the row count.
pub fn export_csv(view: &FilteredView, path: &Path) -> Result<usize> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    let file = std::fs::File::create(path)?;
    write_csv(view, std::io::BufWriter::new(file))?;
    log::info!("wrote {} rows to {}", view.len(), path.display());
    Ok(view.len())
}
