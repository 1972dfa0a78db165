// SPDX-License-Identifier: MIT OR Apache-2.0
//! Capability tables and derived performance metrics for Sophon TPU targets.
//!
//! This crate provides the numeric policy shared by the benchmark runner:
//! - per-target, per-precision peak compute and DDR bandwidth
//! - how many benchmark rounds to request for one artifact
//! - MAC and DDR utilization from measured or estimated latency
//!
//! # Quick start
//!
//! ```rust
//! use bmperf_metrics::{Precision, Target, calibrate_rounds, resolve};
//!
//! let spec = resolve(Target::Bm1684, Precision::Int8).unwrap();
//! assert_eq!(spec.mac_total, 17.6);
//! assert_eq!(spec.ddr_total, 32.0);
//!
//! // A 4 ms profile estimate asks for 300 rounds.
//! assert_eq!(calibrate_rounds(None, Some(4.0), 1).rounds, 300);
//! ```

pub mod capability;
pub mod error;
pub mod rounds;
pub mod utilization;

pub use capability::{CapabilitySpec, Precision, Target, resolve, supported_precisions};
pub use error::{MetricsError, Result};
pub use rounds::{MAX_ROUNDS, MIN_ROUNDS, RoundPlan, RoundSource, calibrate_rounds};
pub use utilization::{
    ProfileEstimate, Utilization, ddr_utilization, derive_utilization, mac_utilization,
};
