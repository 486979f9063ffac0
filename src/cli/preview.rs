use colored::Colorize;
use comfy_table::{Cell, Table};

use crate::error::Result;
use crate::settings::load_settings;

pub fn run(file: &str, rows: usize) -> Result<()> {
    let settings = load_settings();
    let table = super::load_table(file, &settings)?;

    println!("{} {}", "Cleaned columns:".bold(), table.column_names().join(", "));
    println!(
        "{} {} rows loaded. Showing the first {}:",
        "File loaded and cleaned.".green(),
        table.len(),
        rows.min(table.len())
    );

    let mut out = Table::new();
    out.set_header(table.column_names());
    for record in table.records().iter().take(rows) {
        out.add_row(
            table
                .columns()
                .iter()
                .map(|c| Cell::new(record.cell(c.field).to_string())),
        );
    }
    println!("{out}");
    Ok(())
}
