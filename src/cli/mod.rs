pub mod config;
pub mod dashboard;
pub mod export;
pub mod preview;
pub mod report;

use std::path::Path;

use clap::{Args, Parser, Subcommand};

use crate::error::Result;
use crate::filter::{resolve_date_range, FilterCriteria};
use crate::importer::load_file;
use crate::models::CleanedTable;
use crate::normalizer::normalize;
use crate::settings::Settings;

#[derive(Parser)]
#[command(
    name = "smartmed",
    version,
    about = "Sales analytics for pharmacy distributor exports (.xlsx or .csv)."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Load and clean a sales report, then show its columns and first rows.
    Preview {
        /// Path to the CSV or XLSX sales report
        file: String,
        /// Number of rows to show
        #[arg(long, default_value = "20")]
        rows: usize,
    },
    /// Print KPIs, monthly trend, top customers/products, discounts and expiring stock.
    Report {
        /// Path to the CSV or XLSX sales report
        file: String,
        #[command(flatten)]
        filters: FilterArgs,
        /// Print the summary as JSON instead of tables
        #[arg(long)]
        json: bool,
    },
    /// Write the filtered rows to CSV.
    Export {
        /// Path to the CSV or XLSX sales report
        file: String,
        #[command(flatten)]
        filters: FilterArgs,
        /// Output file (default: ./filtered_sales_data.csv)
        #[arg(long)]
        output: Option<String>,
    },
    /// Open the interactive dashboard.
    Dashboard {
        /// Path to the CSV or XLSX sales report
        file: String,
        #[command(flatten)]
        filters: FilterArgs,
    },
    /// View or change settings.
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
    /// Print a shell completion script.
    Completions {
        /// Target shell
        shell: clap_complete::Shell,
    },
}

#[derive(Subcommand)]
pub enum ConfigCommands {
    /// Show current settings and where they are stored.
    Show,
    /// Change one setting, e.g. `smartmed config set product_column "Item Name"`.
    Set {
        /// Setting name
        key: String,
        /// New value
        value: String,
    },
}

#[derive(Args, Debug, Clone, Default)]
pub struct FilterArgs {
    /// First voucher date to include: YYYY-MM-DD (default: earliest in file)
    #[arg(long = "from")]
    pub from_date: Option<String>,
    /// Last voucher date to include: YYYY-MM-DD (default: latest in file)
    #[arg(long = "to")]
    pub to_date: Option<String>,
    /// Only this customer (exact match on Particulars)
    #[arg(long)]
    pub customer: Option<String>,
    /// Only this product (exact match on the product column)
    #[arg(long)]
    pub product: Option<String>,
}

impl FilterArgs {
    pub fn criteria(&self, table: &CleanedTable) -> Result<FilterCriteria> {
        Ok(FilterCriteria {
            date_range: resolve_date_range(
                self.from_date.as_deref(),
                self.to_date.as_deref(),
                table.date_span(),
            )?,
            customer: self.customer.clone(),
            product: self.product.clone(),
        })
    }
}

/// Read and clean a sales report with the current settings.
pub(crate) fn load_table(file: &str, settings: &Settings) -> Result<CleanedTable> {
    let raw = load_file(Path::new(file), settings.spreadsheet_skip_rows)?;
    Ok(normalize(&raw, &settings.schema())?)
}
