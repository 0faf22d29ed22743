use chrono::NaiveDate;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AnalyticsError {
    #[error("No {dimension} selected: select at least one {dimension}")]
    EmptySelection { dimension: String },

    #[error("Missing required column '{column}' in {stream} data")]
    MissingColumn { stream: String, column: String },

    #[error("Failed to fetch {stream} rows from {from} to {to}: {reason}")]
    UpstreamFetch {
        stream: String,
        from: NaiveDate,
        to: NaiveDate,
        reason: String,
    },

    #[error("Invalid date range: start {start} is after end {end}")]
    InvalidDateRange { start: NaiveDate, end: NaiveDate },

    #[error("Invalid period granularity '{0}': expected Day, Week, Month or Year")]
    InvalidGranularity(String),

    #[error("Invalid collectibility code {0}: must be between 1 and 5")]
    InvalidCollectibility(i64),

    #[error("Date calculation error: {0}")]
    DateError(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, AnalyticsError>;
