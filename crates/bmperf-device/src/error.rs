//! Benchmark library error types.

use std::path::PathBuf;

use thiserror::Error;

/// Errors produced by the direct benchmark provider.
///
/// All of them are scoped to one artifact: the runner logs them and moves
/// on to the next configuration.
#[derive(Debug, Error)]
pub enum DeviceError {
    #[error("failed to load benchmark library {}", path.display())]
    LibraryLoad {
        path: PathBuf,
        #[source]
        source: libloading::Error,
    },

    #[error("benchmark library is missing symbol `{symbol}`")]
    MissingSymbol {
        symbol: &'static str,
        #[source]
        source: libloading::Error,
    },

    #[error("too many devices: {count} (at most {max})")]
    TooManyDevices { count: usize, max: usize },

    #[error("no devices selected")]
    NoDevice,

    #[error("invalid bmodel path {}", .0.display())]
    InvalidPath(PathBuf),

    #[error("getPerformance returned {code} for {}", path.display())]
    Benchmark { code: i32, path: PathBuf },
}

/// Convenience result alias.
pub type Result<T> = std::result::Result<T, DeviceError>;
