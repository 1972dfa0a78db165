//! `bmperf-device`: direct benchmark execution on Sophon TPU devices.
//!
//! The vendor ships the device-side benchmark loop as a shared library
//! (`libbenchmark.so`) exporting two C entry points:
//!
//! | Symbol           | Signature                                 |
//! |------------------|-------------------------------------------|
//! | `getDevNum`      | `int getDevNum(void)`                     |
//! | `getPerformance` | `int getPerformance(ParamIn*, LatRes*)`   |
//!
//! [`BenchmarkLibrary`] loads it at runtime through `libloading`, so the
//! harness builds and runs on hosts without the SDK; only the direct
//! measurement path needs the library. The [`PerformanceProvider`] trait is
//! the seam the runner depends on, which lets tests swap in a fake.
//!
//! [`cpu`] samples process CPU utilization with `sysinfo`.
//!
//! # Usage
//!
//! ```rust
//! use bmperf_device::{BenchmarkLibrary, DeviceError};
//!
//! let err = BenchmarkLibrary::open("/nonexistent/libbenchmark.so").unwrap_err();
//! assert!(matches!(err, DeviceError::LibraryLoad { .. }));
//! ```

pub mod cpu;
pub mod device;
pub mod error;
mod ffi;

pub use device::{BenchmarkLibrary, Performance, PerformanceProvider};
pub use error::{DeviceError, Result};
pub use ffi::MAX_DEVICES_NUM;
