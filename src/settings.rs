use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{Result, SmartMedError};
use crate::normalizer::Schema;
use crate::reports::{SummaryOptions, DEFAULT_EXPIRY_WINDOW_DAYS, DEFAULT_TOP_N};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default = "default_product_column")]
    pub product_column: String,
    #[serde(default = "default_customer_column")]
    pub customer_column: String,
    #[serde(default = "default_skip_rows")]
    pub spreadsheet_skip_rows: usize,
    #[serde(default = "default_expiry_window_days")]
    pub expiry_window_days: i64,
    #[serde(default = "default_top_n")]
    pub top_n: usize,
    #[serde(default = "default_currency_symbol")]
    pub currency_symbol: String,
}

fn default_product_column() -> String {
    Schema::default().product_column
}

fn default_customer_column() -> String {
    Schema::default().customer_column
}

fn default_skip_rows() -> usize {
    6
}

fn default_expiry_window_days() -> i64 {
    DEFAULT_EXPIRY_WINDOW_DAYS
}

fn default_top_n() -> usize {
    DEFAULT_TOP_N
}

fn default_currency_symbol() -> String {
    "₹".to_string()
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            product_column: default_product_column(),
            customer_column: default_customer_column(),
            spreadsheet_skip_rows: default_skip_rows(),
            expiry_window_days: default_expiry_window_days(),
            top_n: default_top_n(),
            currency_symbol: default_currency_symbol(),
        }
    }
}

/// A hundred years.
pub const MAX_EXPIRY_WINDOW_DAYS: i64 = 36_500;
pub const MAX_TOP_N: usize = 100;

pub const KEYS: &[&str] = &[
    "product_column",
    "customer_column",
    "spreadsheet_skip_rows",
    "expiry_window_days",
    "top_n",
    "currency_symbol",
];

impl Settings {
    pub fn schema(&self) -> Schema {
        Schema {
            customer_column: self.customer_column.clone(),
            product_column: self.product_column.clone(),
        }
    }

    pub fn summary_options(&self) -> SummaryOptions {
        SummaryOptions {
            expiry_window_days: self.expiry_window_days,
            top_n: self.top_n,
        }
    }

    pub fn entries(&self) -> Vec<(&'static str, String)> {
        vec![
            ("product_column", self.product_column.clone()),
            ("customer_column", self.customer_column.clone()),
            ("spreadsheet_skip_rows", self.spreadsheet_skip_rows.to_string()),
            ("expiry_window_days", self.expiry_window_days.to_string()),
            ("top_n", self.top_n.to_string()),
            ("currency_symbol", self.currency_symbol.clone()),
        ]
    }

    /// Update one setting from its string form.
    pub fn set(&mut self, key: &str, value: &str) -> Result<()> {
        fn number<T: std::str::FromStr>(key: &str, value: &str) -> Result<T> {
            value.trim().parse().map_err(|_| {
                SmartMedError::Settings(format!("{key} expects a whole number, got '{value}'"))
            })
        }
        fn bounded<T>(key: &str, value: &str, range: std::ops::RangeInclusive<T>) -> Result<T>
        where
            T: std::str::FromStr + PartialOrd + std::fmt::Display,
        {
            let n: T = number(key, value)?;
            if !range.contains(&n) {
                return Err(SmartMedError::Settings(format!(
                    "{key} must be between {} and {}",
                    range.start(),
                    range.end()
                )));
            }
            Ok(n)
        }
        match key {
            "product_column" => self.product_column = value.to_string(),
            "customer_column" => self.customer_column = value.to_string(),
            "spreadsheet_skip_rows" => self.spreadsheet_skip_rows = number(key, value)?,
            "expiry_window_days" => {
                self.expiry_window_days = bounded(key, value, 1..=MAX_EXPIRY_WINDOW_DAYS)?
            }
            "top_n" => self.top_n = bounded(key, value, 1..=MAX_TOP_N)?,
            "currency_symbol" => self.currency_symbol = value.to_string(),
            other => {
                return Err(SmartMedError::Settings(format!(
                    "Unknown setting '{other}' (expected one of: {})",
                    KEYS.join(", ")
                )))
            }
        }
        Ok(())
    }
}

fn config_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".config")
        .join("smartmed")
}

pub fn settings_path() -> PathBuf {
    config_dir().join("settings.json")
}

pub fn load_settings() -> Settings {
    load_settings_from(&settings_path())
}

pub fn load_settings_from(path: &Path) -> Settings {
    if !path.exists() {
        return Settings::default();
    }
    let content = std::fs::read_to_string(path).unwrap_or_default();
    serde_json::from_str(&content).unwrap_or_else(|e| {
        log::warn!("ignoring unreadable settings at {}: {e}", path.display());
        Settings::default()
    })
}

pub fn save_settings(settings: &Settings) -> Result<()> {
    save_settings_to(settings, &settings_path())
}

pub fn save_settings_to(settings: &Settings, path: &Path) -> Result<()> {
    if let Some(dir) = path.parent() {
        std::fs::create_dir_all(dir)?;
    }
    let json = serde_json::to_string_pretty(settings)
        .map_err(|e| SmartMedError::Settings(e.to_string()))?;
    std::fs::write(path, format!("{json}\n"))?;
    Ok(())
}
