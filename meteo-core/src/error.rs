use chrono::NaiveDate;
use std::path::PathBuf;
use thiserror::Error;

/// Errors raised by the query and export pipeline.
///
/// Every variant is local to the call that produced it: the query engine and the
/// encoder hold no shared state, so a failed call never affects later ones.
#[derive(Debug, Error)]
pub enum MeteoError {
    /// Malformed or out-of-domain caller input.
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Invalid date range: start {start} is after end {end}")]
    InvalidRange { start: NaiveDate, end: NaiveDate },

    #[error("Encoding failed: {0}")]
    Encoding(String),

    /// A record violates a modelled invariant.
    #[error("Data integrity violation: {0}")]
    DataIntegrity(String),

    #[error("Failed to write export file '{path}'")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl From<serde_json::Error> for MeteoError {
    fn from(err: serde_json::Error) -> Self {
        MeteoError::Encoding(format!("JSON: {err}"))
    }
}

impl From<csv::Error> for MeteoError {
    fn from(err: csv::Error) -> Self {
        MeteoError::Encoding(format!("CSV: {err}"))
    }
}

pub type Result<T, E = MeteoError> = std::result::Result<T, E>;
