use crate::types::{Industry, RevenueBand};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SimError {
    #[error("Invalid revenue: {revenue} (expected 0..=1000 million)")]
    InvalidRevenue { revenue: f64 },

    #[error("Invalid revenue band: '{label}'")]
    InvalidBand { label: String },

    #[error("Invalid industry string: '{value}'")]
    InvalidIndustry { value: String },

    #[error("Unknown industry: {industry}")]
    UnknownIndustry { industry: Industry },

    #[error("Invalid revenue band: {band} for industry: {industry}")]
    UnknownBand { industry: Industry, band: RevenueBand },

    #[error("Invalid run count: {runs} (must be at least 1)")]
    InvalidRunCount { runs: usize },

    #[error("Invalid stats parameter {field}={value} for {industry}/{band}")]
    InvalidParameter {
        industry: Industry,
        band:     RevenueBand,
        field:    &'static str,
        value:    f64,
    },

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("CSV export error: {0}")]
    Csv(#[from] csv::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub type SimResult<T> = Result<T, SimError>;
