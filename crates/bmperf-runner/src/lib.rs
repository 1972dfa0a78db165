//! Benchmark orchestration for trees of compiled bmodels.
//!
//! ```text
//! BuildTree::load ─► walk ─► ArtifactDiscovery::artifacts ─► Orchestrator::run_model
//!                                                                   │
//!                                   ProcessExecutor (reference) or PerformanceProvider (direct)
//!                                                                   │
//!                                                                RowSink
//! ```
//!
//! The report layout is fixed up front by a [`ReportSchema`]; every row is
//! rendered from it.

pub mod config;
pub mod dispatch;
pub mod error;
pub mod executor;
pub mod orchestrator;
pub mod report;
pub mod schema;
pub mod tree;

pub use bmperf_device::cpu::sample_process_cpu;
pub use config::{ModelConfig, ModelSettings};
pub use dispatch::{ArtifactDiscovery, PlannedRun, RunSummary, run_all};
pub use error::{ExecError, ReportError, Result, RunError, TreeError};
pub use executor::{ProcessExecutor, RunningProcess};
pub use orchestrator::{Artifact, Orchestrator, RunOptions};
pub use report::{CsvReport, MemoryReport, REPORT_FILE, RowSink};
pub use schema::{Column, NOT_APPLICABLE, ReportSchema, RowValues};
pub use tree::{BuildTree, GlobalConfig, ModelEntry, TreeOverrides};
