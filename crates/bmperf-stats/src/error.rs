//! Errors raised while reading benchmark statistics.

use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum StatsError {
    #[error("failed to read {}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid number for `{field}`: {value:?}")]
    InvalidNumber { field: String, value: String },
}

/// Convenience result alias.
pub type Result<T> = std::result::Result<T, StatsError>;
