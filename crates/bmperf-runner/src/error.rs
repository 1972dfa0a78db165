//! Error types for tree loading, process execution and measurement.

use std::path::PathBuf;
use std::process::ExitStatus;

use bmperf_device::DeviceError;
use bmperf_metrics::MetricsError;
use bmperf_stats::StatsError;
use thiserror::Error;

/// Problems with the artifact tree or its `config.yaml` files.
#[derive(Debug, Error)]
pub enum TreeError {
    #[error("no config.yaml in {}", .0.display())]
    MissingConfig(PathBuf),

    #[error("failed to read {}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse {}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("{} is not a YAML mapping", .0.display())]
    NotAMapping(PathBuf),

    #[error("no target configured in {}", .0.display())]
    MissingTarget(PathBuf),

    #[error(transparent)]
    Target(#[from] MetricsError),

    #[error("invalid configuration for {model}")]
    InvalidConfig {
        model: String,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("\"{0}\" is not a mapping")]
    InvalidOverride(String),

    #[error("invalid environment override {key}={value}: {reason}")]
    EnvOverride {
        key: String,
        value: String,
        reason: String,
    },

    #[error("validation failed: {0}")]
    Validation(String),

    #[error("failed to walk artifact tree")]
    Walk(#[from] walkdir::Error),
}

/// Failures launching or waiting for a benchmark-runner process.
#[derive(Debug, Error)]
pub enum ExecError {
    #[error("empty command line for {0}")]
    EmptyCommand(String),

    #[error("failed to prepare {}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to launch `{program}`")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to wait for {title}")]
    Wait {
        title: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{title} failed: {status}")]
    Failed { title: String, status: ExitStatus },
}

/// Failures writing the report.
#[derive(Debug, Error)]
pub enum ReportError {
    #[error("failed to create report {}", path.display())]
    Create {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Csv(#[from] csv::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Errors from measuring one artifact.
#[derive(Debug, Error)]
pub enum RunError {
    #[error(transparent)]
    Tree(#[from] TreeError),

    #[error(transparent)]
    Metrics(#[from] MetricsError),

    #[error(transparent)]
    Report(#[from] ReportError),

    #[error(transparent)]
    Exec(#[from] ExecError),

    #[error(transparent)]
    Device(#[from] DeviceError),

    #[error(transparent)]
    Stats(#[from] StatsError),

    #[error("benchmark library is not available")]
    NoProvider,
}

impl RunError {
    /// Whether the whole run must stop.
    ///
    /// Configuration and report errors are fatal; everything else only
    /// costs the current artifact its row.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::Tree(_) | Self::Metrics(_) | Self::Report(_))
    }
}

/// Convenience result alias.
pub type Result<T> = std::result::Result<T, RunError>;
