//! Statistics extraction for bmodel benchmark runs.
//!
//! Two text sources feed the performance report:
//! - the combined output of a benchmark-runner execution (`INFO:<label> time(s): <v>`
//!   timing lines and `Input <i>) ... shape=[...]` descriptors)
//! - the compiler-emitted profile written next to a compiled bmodel
//!   (`<key> : <number>` pairs after the `API_END` marker)
//!
//! # Quick start
//!
//! ```rust
//! use bmperf_stats::{format_float, parse_stats};
//!
//! let log = "INFO:calculate time(s): 1.000\nINFO:calculate time(s): 3.000\n";
//! let stats = parse_stats(log).unwrap();
//! assert_eq!(stats.get("calculate"), Some(2.0));
//! assert_eq!(format_float(0.5), "0.500");
//! ```

pub mod average;
pub mod error;
pub mod exec_log;
pub mod format;
pub mod profile;

pub use average::Average;
pub use error::{Result, StatsError};
pub use exec_log::{RunStats, parse_stats, parse_stats_file};
pub use format::{format_float, format_percent, format_seconds};
pub use profile::{PROFILE_MARKER, ProfileRecord, ProfileValue, parse_profile, parse_profile_str};
