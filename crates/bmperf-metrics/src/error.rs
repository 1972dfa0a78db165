//! Configuration errors for capability resolution.
//!
//! Every variant means the run configuration is broken; none of them is
//! recoverable per artifact.

use thiserror::Error;

use crate::Target;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MetricsError {
    #[error("invalid target {0}")]
    InvalidTarget(String),

    #[error("unrecognized prec type \"{0}\"")]
    UnknownPrecision(String),

    #[error("invalid prec type \"{precision}\" for {target}")]
    InvalidPrecision { target: Target, precision: String },
}

/// Convenience result alias.
pub type Result<T> = std::result::Result<T, MetricsError>;
