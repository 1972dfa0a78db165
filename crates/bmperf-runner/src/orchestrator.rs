//! Measurement of one artifact and assembly of its report row.
//!
//! Two measurement paths:
//!
//! * reference comparison: the configuration asks for `runtime_cmp` and a
//!   non-empty `output_ref_data.dat` sits next to the bmodel. The benchmark
//!   runner is launched as a child process, its CPU usage is sampled once
//!   over a fixed window, and latency is read back from its log.
//! * direct: the benchmark library measures the bmodel in-process on the
//!   configured (or all) devices.

use std::path::{Path, PathBuf};
use std::time::Duration;

use bmperf_device::PerformanceProvider;
use bmperf_device::cpu::sample_process_cpu;
use bmperf_metrics::{
    MetricsError, ProfileEstimate, Utilization, calibrate_rounds, derive_utilization, resolve,
    supported_precisions,
};
use bmperf_stats::{ProfileRecord, parse_profile, parse_stats_file};
use tracing::{debug, error, info, warn};

use crate::config::ModelConfig;
use crate::error::{Result, RunError};
use crate::executor::ProcessExecutor;
use crate::report::RowSink;
use crate::schema::{ReportSchema, RowValues};
use crate::tree::BuildTree;

/// Reference outputs stored next to the bmodel by the compiler.
pub const REFERENCE_OUTPUT: &str = "output_ref_data.dat";
/// Environment variable naming the runtime profile output directory.
pub const PROFILE_OUT_DIR_VAR: &str = "BMRUNTIME_PROFILE_OUT_DIR";
/// Iteration-option marker meaning the runner reports the total over all rounds.
const AGGREGATE_TIMING_MARKER: &str = "calculate_times";

/// Run-wide switches, fixed before the first artifact is measured.
///
/// Whether simulator-estimate columns are emitted is a property of the
/// [`ReportSchema`], not of these options.
#[derive(Debug, Clone, PartialEq)]
pub struct RunOptions {
    /// Direct path uses every available device instead of the configured ones.
    pub use_all_devices: bool,
    /// CPU sampling window on the reference path.
    pub cpu_window: Duration,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            use_all_devices: false,
            cpu_window: Duration::from_secs(1),
        }
    }
}

/// One compiled artifact to measure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Artifact {
    /// Artifact label, e.g. `4b.compilation`.
    pub name: String,
    pub batch_size: u32,
    pub bmodel: PathBuf,
    /// Compiler profile; may not exist.
    pub profile: PathBuf,
}

#[derive(Debug, Clone, PartialEq)]
struct Measurement {
    latency_ms: f64,
    throughput: f64,
    shape: String,
    cpu_usage: Option<f64>,
}

pub struct Orchestrator<'a> {
    tree: &'a BuildTree,
    schema: &'a ReportSchema,
    options: RunOptions,
    provider: Option<&'a dyn PerformanceProvider>,
}

impl<'a> Orchestrator<'a> {
    pub fn new(tree: &'a BuildTree, schema: &'a ReportSchema, options: RunOptions) -> Self {
        Self {
            tree,
            schema,
            options,
            provider: None,
        }
    }

    /// Provider for the direct path. Without one, direct measurements fail
    /// with [`RunError::NoProvider`].
    pub fn with_provider(mut self, provider: &'a dyn PerformanceProvider) -> Self {
        self.provider = Some(provider);
        self
    }

    /// Measure `artifact` and append its row to `sink`.
    ///
    /// # Errors
    ///
    /// Fatal configuration errors ([`RunError::is_fatal`]) and per-artifact
    /// failures; in the latter case nothing has been written.
    pub fn run_model(
        &self,
        config: &ModelConfig,
        artifact: &Artifact,
        sink: &mut dyn RowSink,
    ) -> Result<()> {
        let global = self.tree.global();
        let batch = artifact.batch_size.max(1);
        let full_name = format!("{} {}", config.name(), artifact.name);

        let capability = config
            .precision()
            .and_then(|prec| resolve(global.target, prec))
            .inspect_err(|e| {
                if let MetricsError::InvalidPrecision { target, .. } = e {
                    let supported: Vec<_> = supported_precisions(*target).collect();
                    error!(model = %full_name, ?supported, "{e}");
                } else {
                    error!(model = %full_name, "{e}");
                }
            })?;

        let profile = load_profile(&artifact.profile)?;
        let estimate = profile.as_ref().map(profile_estimate).unwrap_or_default();
        let plan = calibrate_rounds(config.settings().time_rounds, estimate.runtime_ms, batch);
        info!("Run {} times for {full_name}", plan.rounds);
        debug!(source = ?plan.source, "round calibration");

        let measured = if self.wants_reference(config, &artifact.bmodel) {
            info!("Runtime test {full_name}");
            self.measure_reference(config, artifact, plan.rounds, &full_name)?
        } else {
            info!("Runtime test {full_name} without reference");
            self.measure_direct(artifact, plan.rounds)?
        };

        let gops = config.settings().gops;
        let utilization = match &profile {
            Some(_) => {
                if gops.is_none() {
                    warn!(
                        "Profile exists but no GOPs in config.yaml, {}",
                        config.name()
                    );
                }
                derive_utilization(measured.latency_ms, gops, batch, &capability, &estimate)
            }
            None => Utilization::default(),
        };
        // Next to a profile, a zero CPU reading is reported as N/A.
        let cpu_usage = match &profile {
            Some(_) => measured.cpu_usage.filter(|usage| *usage != 0.0),
            None => measured.cpu_usage,
        };
        let attributes = self
            .schema
            .extras()
            .map(|k| (k.to_string(), config.attribute(k)))
            .collect();

        let row = RowValues {
            name: config.name().to_string(),
            attributes,
            shape: measured.shape,
            batch_gops: gops.map(|g| g * f64::from(batch)),
            latency_ms: measured.latency_ms,
            throughput: measured.throughput,
            estimated_time_ms: profile.as_ref().and(estimate.runtime_ms),
            cpu_usage,
            utilization,
        };
        sink.write_row(&self.schema.render(&row))?;
        Ok(())
    }

    fn wants_reference(&self, config: &ModelConfig, bmodel: &Path) -> bool {
        if !config.settings().runtime_cmp.unwrap_or(false) {
            return false;
        }
        let Some(dir) = bmodel.parent() else {
            return false;
        };
        std::fs::metadata(dir.join(REFERENCE_OUTPUT)).is_ok_and(|m| m.is_file() && m.len() > 0)
    }

    fn measure_reference(
        &self,
        config: &ModelConfig,
        artifact: &Artifact,
        rounds: u32,
        full_name: &str,
    ) -> Result<Measurement> {
        let global = self.tree.global();
        let title = format!("run.{}", artifact.name);
        let bmodel_dir = artifact.bmodel.parent().unwrap_or(Path::new("."));
        let iter_opt = config
            .settings()
            .iter_opt
            .as_deref()
            .unwrap_or(&global.iter_opt);

        let mut env: Vec<String> = config
            .settings()
            .run_env
            .iter()
            .map(|v| self.tree.expand_variables(config, v))
            .collect();
        let profile_dir = format!("{}b.profiledata", artifact.batch_size);
        env.push(format!("{PROFILE_OUT_DIR_VAR}={profile_dir}"));
        let executor = ProcessExecutor::new(config.workdir(), &env);

        let argv = vec![
            global.runner.clone(),
            iter_opt.to_string(),
            rounds.to_string(),
            "--dev".to_string(),
            global.devices[0].to_string(),
            "--context".to_string(),
            bmodel_dir.display().to_string(),
        ];
        let process = executor
            .fire(&title, &argv)
            .inspect_err(|e| error!("Runtime test {full_name} failed: {e}"))?;
        let cpu_usage = sample_process_cpu(process.pid(), self.options.cpu_window);
        let log = process
            .drain()
            .inspect_err(|e| error!("Runtime test {full_name} failed: {e}"))?;

        let stats = parse_stats_file(&log)?;
        let mut latency_ms = match stats.get("calculate") {
            Some(seconds) => seconds * 1000.0,
            None => {
                warn!(log = %log.display(), "no calculate time in runner log");
                f64::NAN
            }
        };
        if iter_opt.contains(AGGREGATE_TIMING_MARKER) {
            latency_ms /= f64::from(rounds);
        }

        Ok(Measurement {
            latency_ms,
            throughput: 1000.0 / latency_ms,
            shape: stats.shape().to_string(),
            cpu_usage,
        })
    }

    fn measure_direct(&self, artifact: &Artifact, rounds: u32) -> Result<Measurement> {
        let provider = self.provider.ok_or(RunError::NoProvider)?;
        let devices = if self.options.use_all_devices {
            provider.available_devices()?
        } else {
            self.tree.global().devices.clone()
        };
        let perf = provider.get_performance(rounds, &artifact.bmodel, &devices)?;
        Ok(Measurement {
            latency_ms: perf.avg_latency_ms,
            throughput: perf.throughput,
            shape: perf.shape,
            cpu_usage: perf.cpu_usage,
        })
    }
}

fn load_profile(path: &Path) -> Result<Option<ProfileRecord>> {
    if !path.exists() {
        return Ok(None);
    }
    let record = parse_profile(path)?;
    if let Some(record) = &record
        && record.runtime().is_none()
    {
        warn!(profile = %path.display(), "profile has no runtime estimate");
    }
    Ok(record)
}

fn profile_estimate(record: &ProfileRecord) -> ProfileEstimate {
    ProfileEstimate {
        runtime_ms: record.runtime(),
        transfer_bytes: record.transfer_bytes(),
    }
}
