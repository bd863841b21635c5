use crate::error::{AppError, Result};
use crate::reports::Window;
use std::path::PathBuf;

pub const DEFAULT_DATA_PATH: &str = "TabelaValores.csv";
pub const DEFAULT_PREVIEW_ROWS: usize = 50;
pub const DEFAULT_WINDOW_MONTHS: u32 = 6;

#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    /// Price ledger export (PRICE_DATA_PATH, or the first CLI argument)
    pub data_path: PathBuf,
    pub log_level: String,
    /// Where report files are written (OUTPUT_DIR)
    pub output_dir: PathBuf,
    /// Rows shown in the full listing preview (PREVIEW_ROWS)
    pub preview_rows: usize,
    /// Initial trend window (WINDOW_MONTHS)
    pub window: Window,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok(), std::env::args().nth(1))
    }

    /// Build from any key lookup so tests do not have to touch the process
    /// environment.
    pub fn from_lookup<F>(lookup: F, path_arg: Option<String>) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let data_path = path_arg
            .or_else(|| lookup("PRICE_DATA_PATH"))
            .unwrap_or_else(|| DEFAULT_DATA_PATH.to_string());
        Ok(Self {
            data_path: PathBuf::from(data_path),
            log_level: lookup("LOG_LEVEL").unwrap_or_else(|| "info".to_string()),
            output_dir: PathBuf::from(lookup("OUTPUT_DIR").unwrap_or_else(|| ".".to_string())),
            preview_rows: positive(&lookup, "PREVIEW_ROWS", DEFAULT_PREVIEW_ROWS)?,
            window: Window::months(positive(&lookup, "WINDOW_MONTHS", DEFAULT_WINDOW_MONTHS)?)?,
        })
    }
}

fn positive<F, T>(lookup: &F, key: &str, default: T) -> Result<T>
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr + PartialOrd + Default,
{
    let Some(raw) = lookup(key) else {
        return Ok(default);
    };
    match raw.trim().parse::<T>() {
        Ok(v) if v > T::default() => Ok(v),
        _ => Err(AppError::Config(format!(
            "{key} must be a positive integer, got {raw:?}"
        ))),
    }
}
