use std::io;
use std::num::ParseIntError;
use thiserror::Error;

use crate::tb_rust_client::TbError;

/// Everything that can end an export run.
///
/// Only status and authentication failures reported by the platform are
/// treated as recoverable by the binary: they are logged and the process exits
/// normally. Transport failures and the other variants are fatal.
#[derive(Debug, Error)]
pub enum ExportError {
    #[error(transparent)]
    Api(#[from] TbError),
    #[error("Console I/O failed: {0}")]
    Input(#[from] io::Error),
    #[error("Invalid number '{input}': {source}")]
    InvalidNumber { input: String, source: ParseIntError },
    #[error("Device number {index} is out of range ({available} devices available)")]
    DeviceIndex { index: usize, available: usize },
    #[error("Invalid timestamp: {0}")]
    Timestamp(String),
    #[error("No data to export: end {end_ts} is not after start {start_ts}")]
    EmptyWindow { start_ts: i64, end_ts: i64 },
    #[error("Failed to write CSV: {0}")]
    Csv(#[from] csv::Error),
}

impl ExportError {
    pub fn is_api(&self) -> bool {
        matches!(self, ExportError::Api(_))
    }

    pub fn is_recoverable(&self) -> bool {
        matches!(self, ExportError::Api(TbError::Api { .. } | TbError::Auth(_)))
    }
}
