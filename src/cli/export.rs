use std::path::PathBuf;

use super::FilterArgs;
use crate::error::Result;
use crate::exporter::{export_csv, DEFAULT_EXPORT_NAME};
use crate::filter::apply_filters;
use crate::settings::load_settings;

pub fn run(file: &str, filters: &FilterArgs, output: Option<String>) -> Result<()> {
    let settings = load_settings();
    let table = super::load_table(file, &settings)?;
    let criteria = filters.criteria(&table)?;
    let view = apply_filters(&table, &criteria);

    let path = output
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_EXPORT_NAME));
    let written = export_csv(&view, &path)?;
    println!("Wrote {written} records to {}", path.display());
    Ok(())
}
