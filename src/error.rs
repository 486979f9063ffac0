use thiserror::Error;

/// Raised when a required column cannot be resolved after header cleanup.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SchemaError {
    #[error("Missing expected column: {0}")]
    MissingColumn(String),
}

#[derive(Error, Debug)]
pub enum SmartMedError {
    #[error(transparent)]
    Schema(#[from] SchemaError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Spreadsheet error: {0}")]
    Spreadsheet(String),

    #[error("Unsupported file type: {0} (expected .csv or .xlsx)")]
    UnsupportedFormat(String),

    #[error("Invalid filter: {0}")]
    InvalidFilter(String),

    #[error("Settings error: {0}")]
    Settings(String),

    #[error("{0}")]
    Other(String),
}

pub type Result<T> = std::result::Result<T, SmartMedError>;
