//! Artifact discovery and the run loop over all model configurations.
//!
//! Two discovery flavors share one orchestrator:
//!
//! * [`ArtifactDiscovery::DirectoryScan`]: every `*.bmodel` under the model's
//!   workdir, batch size 1, profile at `<bmodel>.compiler_profile_0.txt`.
//! * [`ArtifactDiscovery::NamingTemplate`]: the fp and int8 build loops, one
//!   artifact directory per batch size named from a template.

use std::collections::BTreeSet;
use std::ffi::OsString;
use std::path::PathBuf;

use bmperf_metrics::Precision;
use serde_yaml::{Mapping, Value};
use tracing::{error, info, warn};
use walkdir::WalkDir;

use crate::config::{ModelConfig, ModelSettings};
use crate::error::{Result, TreeError};
use crate::orchestrator::{Artifact, Orchestrator};
use crate::report::RowSink;
use crate::tree::{BuildTree, ModelEntry};

/// Name of the compiled model inside a template-named artifact directory.
pub const COMPILED_BMODEL: &str = "compilation.bmodel";
const SCAN_PROFILE_SUFFIX: &str = ".compiler_profile_0.txt";
const FP_TEMPLATE: &str = "{}b.fp.compilation";
const INT8_TEMPLATE: &str = "{}b.compilation";
/// Loop keys never reported as attribute columns.
const HEADER_DENYLIST: &[&str] = &["build_env"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArtifactDiscovery {
    DirectoryScan,
    NamingTemplate,
}

/// A configuration paired with one artifact it applies to.
#[derive(Debug, Clone, PartialEq)]
pub struct PlannedRun {
    pub config: ModelConfig,
    pub artifact: Artifact,
}

/// Outcome counts of [`run_all`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub measured: usize,
    pub skipped: usize,
}

impl ArtifactDiscovery {
    /// Extra attribute columns, sorted. Directory scans have none.
    pub fn extra_headers(&self, entries: &[ModelEntry]) -> Vec<String> {
        match self {
            Self::DirectoryScan => Vec::new(),
            Self::NamingTemplate => {
                let mut keys = BTreeSet::from(["prec".to_string()]);
                for entry in entries {
                    let settings = entry.config.settings();
                    let loops = [&settings.fp_loops, &settings.int8_loops];
                    for overrides in loops.into_iter().flatten().flatten() {
                        if let Value::Mapping(m) = overrides {
                            keys.extend(m.keys().filter_map(Value::as_str).map(str::to_string));
                        }
                    }
                }
                keys.into_iter().filter(|k| !skip_header(k)).collect()
            }
        }
    }

    /// Every artifact of one model configuration, in measurement order.
    ///
    /// Missing template-named artifacts are skipped with a warning.
    ///
    /// # Errors
    ///
    /// [`TreeError`] for a malformed loop override or an unreadable workdir.
    pub fn artifacts(
        &self,
        tree: &BuildTree,
        config: &ModelConfig,
    ) -> std::result::Result<Vec<PlannedRun>, TreeError> {
        match self {
            Self::DirectoryScan => scan_directory(config),
            Self::NamingTemplate => expand_templates(tree, config),
        }
    }
}

fn skip_header(key: &str) -> bool {
    key.contains("template") || HEADER_DENYLIST.contains(&key)
}

fn scan_directory(config: &ModelConfig) -> std::result::Result<Vec<PlannedRun>, TreeError> {
    let workdir = config.workdir();
    if !workdir.is_dir() {
        warn!("{} does not exist", workdir.display());
        return Ok(Vec::new());
    }

    let mut runs = Vec::new();
    for entry in WalkDir::new(workdir).sort_by_file_name() {
        let entry = entry?;
        let path = entry.path();
        if !entry.file_type().is_file() || path.extension().is_none_or(|ext| ext != "bmodel") {
            continue;
        }
        let file_name = entry.file_name().to_string_lossy();
        if file_name.contains("compilation") {
            continue;
        }
        let Some(name) = path.file_stem().map(|s| s.to_string_lossy().into_owned()) else {
            continue;
        };

        let precision = if name.contains("int8") {
            Precision::Int8
        } else {
            Precision::Fp32
        };
        let mut profile = OsString::from(path.as_os_str());
        profile.push(SCAN_PROFILE_SUFFIX);

        runs.push(PlannedRun {
            config: config.with_name(&name).with_default_precision(precision),
            artifact: Artifact {
                name,
                batch_size: 1,
                bmodel: path.to_path_buf(),
                profile: PathBuf::from(profile),
            },
        });
    }
    Ok(runs)
}

/// The two build loops of a template-driven tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BuildFamily {
    Fp,
    Int8,
}

impl BuildFamily {
    /// Key whose presence means this variant was built.
    fn trigger(self) -> &'static str {
        match self {
            Self::Fp => "fp_compile_options",
            Self::Int8 => "bmnetu_options",
        }
    }

    fn loops(self, s: &ModelSettings) -> Option<&Vec<Value>> {
        match self {
            Self::Fp => s.fp_loops.as_ref(),
            Self::Int8 => s.int8_loops.as_ref(),
        }
    }

    fn batch_sizes(self, s: &ModelSettings) -> Vec<u32> {
        let sizes = match self {
            Self::Fp => s.fp_batch_sizes.as_ref(),
            Self::Int8 => s.bmnetu_batch_sizes.as_ref(),
        };
        sizes.cloned().unwrap_or_else(|| vec![1])
    }

    fn template(self, s: &ModelSettings) -> &str {
        match self {
            Self::Fp => s.fp_outdir_template.as_deref().unwrap_or(FP_TEMPLATE),
            Self::Int8 => s.int8_outdir_template.as_deref().unwrap_or(INT8_TEMPLATE),
        }
    }

    fn default_precision(self) -> Precision {
        match self {
            Self::Fp => Precision::Fp32,
            Self::Int8 => Precision::Int8,
        }
    }
}

fn expand_templates(
    tree: &BuildTree,
    config: &ModelConfig,
) -> std::result::Result<Vec<PlannedRun>, TreeError> {
    if !config.settings().time.unwrap_or(true) {
        info!(model = config.name(), "timing disabled");
        return Ok(Vec::new());
    }
    let profile_name = tree.global().target.profile_file_name();
    let no_overrides = [Value::Mapping(Mapping::new())];

    let mut runs = Vec::new();
    for family in [BuildFamily::Fp, BuildFamily::Int8] {
        if !config.contains(family.trigger()) {
            continue;
        }
        let loops = match family.loops(config.settings()) {
            Some(loops) if !loops.is_empty() => loops.as_slice(),
            _ => &no_overrides,
        };

        for overrides in loops {
            let variant = config
                .with_overrides(overrides)?
                .with_default_precision(family.default_precision());
            let template = family.template(variant.settings());

            for b in family.batch_sizes(variant.settings()) {
                let name = template.replace("{}", &b.to_string());
                let artifact_dir = variant.workdir().join(&name);
                let bmodel = artifact_dir.join(COMPILED_BMODEL);
                if !bmodel.exists() {
                    warn!("{} does not exist", bmodel.display());
                    continue;
                }
                runs.push(PlannedRun {
                    config: variant.clone(),
                    artifact: Artifact {
                        name,
                        batch_size: b,
                        bmodel,
                        profile: artifact_dir.join(profile_name),
                    },
                });
            }
        }
    }
    Ok(runs)
}

/// Measure every artifact of every entry, in discovery order.
///
/// Per-artifact failures are logged and counted; the first fatal error stops
/// the run.
pub fn run_all(
    tree: &BuildTree,
    entries: &[ModelEntry],
    discovery: ArtifactDiscovery,
    orchestrator: &Orchestrator<'_>,
    sink: &mut dyn RowSink,
) -> Result<RunSummary> {
    let mut summary = RunSummary::default();
    for entry in entries {
        for run in discovery.artifacts(tree, &entry.config)? {
            match orchestrator.run_model(&run.config, &run.artifact, sink) {
                Ok(()) => summary.measured += 1,
                Err(e) if e.is_fatal() => return Err(e),
                Err(e) => {
                    error!(
                        model = run.config.name(),
                        artifact = %run.artifact.name,
                        "skipped: {e}"
                    );
                    summary.skipped += 1;
                }
            }
        }
    }
    info!(
        measured = summary.measured,
        skipped = summary.skipped,
        "run finished"
    );
    Ok(summary)
}
