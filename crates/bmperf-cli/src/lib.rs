//! bmperf CLI library
//!
//! This library exposes the argument model and exit codes for testing purposes.

pub mod cli;
pub mod exit;
