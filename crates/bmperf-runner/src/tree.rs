//! Artifact tree: global configuration, model discovery and variable
//! expansion.
//!
//! ```text
//! <root>/config.yaml            global configuration
//! <root>/<model>/config.yaml    one model each
//! <root>/<outdir>/<model>/...   compiled artifacts (outdir defaults to `output`)
//! ```
//!
//! Global values come from `config.yaml`, then `BMPERF_*` environment
//! variables, then [`TreeOverrides`] from the command line.

use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use bmperf_metrics::Target;
use regex::{Captures, Regex};
use serde::Deserialize;
use serde_yaml::{Mapping, Value};
use tracing::{debug, info, warn};
use walkdir::WalkDir;

use crate::config::{ModelConfig, dict_override, render_value};
use crate::error::TreeError;

pub const CONFIG_FILE: &str = "config.yaml";
pub const DEFAULT_OUTDIR: &str = "output";
pub const DEFAULT_ITER_OPT: &str = "--loopnum";
pub const DEFAULT_RUNNER: &str = "bmrt_test";
pub const DEFAULT_BENCHMARK_LIB: &str = "libbenchmark.so";

pub const ENV_TARGET: &str = "BMPERF_TARGET";
pub const ENV_DEVICES: &str = "BMPERF_DEVICES";
pub const ENV_OUTDIR: &str = "BMPERF_OUTDIR";

/// Command-line overrides, applied after the environment.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TreeOverrides {
    pub target: Option<Target>,
    pub devices: Option<Vec<i32>>,
    pub outdir: Option<PathBuf>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct GlobalFile {
    target: Option<String>,
    devices: Option<Vec<i32>>,
    outdir: Option<PathBuf>,
    iter_opt: Option<String>,
    runner: Option<String>,
    benchmark_lib: Option<PathBuf>,
}

impl GlobalFile {
    fn apply_env_overrides(&mut self) -> Result<(), TreeError> {
        if let Ok(val) = std::env::var(ENV_TARGET) {
            val.parse::<Target>().map_err(|e| TreeError::EnvOverride {
                key: ENV_TARGET.into(),
                value: val.clone(),
                reason: e.to_string(),
            })?;
            self.target = Some(val);
        }

        if let Ok(val) = std::env::var(ENV_DEVICES) {
            let devices = parse_device_list(&val).map_err(|reason| TreeError::EnvOverride {
                key: ENV_DEVICES.into(),
                value: val.clone(),
                reason,
            })?;
            self.devices = Some(devices);
        }

        if let Ok(val) = std::env::var(ENV_OUTDIR) {
            self.outdir = Some(PathBuf::from(val));
        }

        Ok(())
    }
}

/// Parse a comma separated device list, ignoring empty entries (`"0, 1,"`).
pub fn parse_device_list(s: &str) -> Result<Vec<i32>, String> {
    s.split(',')
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(|v| v.parse::<i32>().map_err(|e| format!("{v:?}: {e}")))
        .collect()
}

/// Resolved global configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct GlobalConfig {
    pub target: Target,
    /// Configured device ids; the first one runs reference comparisons.
    pub devices: Vec<i32>,
    /// Absolute output directory; holds the artifacts and `stats.csv`.
    pub outdir: PathBuf,
    pub iter_opt: String,
    pub runner: String,
    pub benchmark_lib: PathBuf,
    raw: Mapping,
}

impl GlobalConfig {
    /// The global mapping every model configuration is overlaid on.
    pub fn raw(&self) -> &Mapping {
        &self.raw
    }
}

/// A discovered model directory and its merged configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct ModelEntry {
    pub path: PathBuf,
    pub config: ModelConfig,
}

#[derive(Debug, Clone)]
pub struct BuildTree {
    root: PathBuf,
    global: GlobalConfig,
}

impl BuildTree {
    /// Verify that `root` looks like an artifact tree: a readable
    /// `config.yaml` holding a YAML mapping.
    pub fn check(root: &Path) -> Result<(), TreeError> {
        read_mapping(&root.join(CONFIG_FILE)).map(|_| ())
    }

    /// Load the global configuration of the tree at `root`.
    ///
    /// # Errors
    ///
    /// Any [`TreeError`]; an unrecognised target surfaces as
    /// [`TreeError::Target`].
    pub fn load(root: &Path, overrides: &TreeOverrides) -> Result<Self, TreeError> {
        let root = std::path::absolute(root).map_err(|source| TreeError::Read {
            path: root.to_path_buf(),
            source,
        })?;
        let path = root.join(CONFIG_FILE);
        let mut raw = read_mapping(&path)?;
        let value = Value::Mapping(raw.clone());
        let mut file: GlobalFile = serde_yaml::from_value(value).map_err(|source| TreeError::Parse {
            path: path.clone(),
            source,
        })?;
        file.apply_env_overrides()?;

        let target = match overrides.target {
            Some(target) => target,
            None => file
                .target
                .as_deref()
                .ok_or_else(|| TreeError::MissingTarget(path.clone()))?
                .parse()?,
        };
        let devices = overrides
            .devices
            .clone()
            .or(file.devices)
            .unwrap_or_else(|| vec![0]);
        if devices.is_empty() {
            return Err(TreeError::Validation("devices must not be empty".into()));
        }
        let outdir = overrides
            .outdir
            .clone()
            .or(file.outdir)
            .unwrap_or_else(|| DEFAULT_OUTDIR.into());
        let outdir = if outdir.is_absolute() {
            outdir
        } else {
            root.join(outdir)
        };

        raw.insert("target".into(), Value::String(target.to_string()));
        raw.insert("outdir".into(), Value::String(outdir.display().to_string()));

        let global = GlobalConfig {
            target,
            devices,
            outdir,
            iter_opt: file.iter_opt.unwrap_or_else(|| DEFAULT_ITER_OPT.into()),
            runner: file.runner.unwrap_or_else(|| DEFAULT_RUNNER.into()),
            benchmark_lib: file
                .benchmark_lib
                .unwrap_or_else(|| DEFAULT_BENCHMARK_LIB.into()),
            raw,
        };
        info!(
            root = %root.display(),
            target = %global.target,
            devices = ?global.devices,
            outdir = %global.outdir.display(),
            "loaded artifact tree"
        );
        Ok(Self { root, global })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn global(&self) -> &GlobalConfig {
        &self.global
    }

    /// Every model directory under the root, in file-name order.
    ///
    /// With non-empty `filters` only directories whose name is listed are
    /// returned. Hidden directories and the output directory are not
    /// descended into.
    pub fn walk(&self, filters: &[String]) -> Result<Vec<ModelEntry>, TreeError> {
        let outdir = &self.global.outdir;
        // filter_entry also sees the root, which may itself be a dot directory
        let walker = WalkDir::new(&self.root)
            .min_depth(1)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|e| e.depth() == 0 || is_model_candidate(e, outdir));

        let mut entries = Vec::new();
        for entry in walker {
            let entry = entry?;
            let dir = entry.path();
            let config_path = dir.join(CONFIG_FILE);
            if !config_path.is_file() {
                continue;
            }
            let dir_name = entry.file_name().to_string_lossy();
            if !filters.is_empty() && !filters.iter().any(|f| f == dir_name.as_ref()) {
                debug!(model = %dir_name, "filtered out");
                continue;
            }

            let local = read_mapping(&config_path)?;
            let name = local
                .get("name")
                .and_then(Value::as_str)
                .map_or_else(|| dir_name.to_string(), str::to_string);
            let merged = dict_override(&self.global.raw, &Value::Mapping(local))?;
            let workdir = outdir.join(&name);
            let config = ModelConfig::new(name, dir, workdir, merged)?;
            entries.push(ModelEntry {
                path: dir.to_path_buf(),
                config,
            });
        }
        debug!(count = entries.len(), "walked artifact tree");
        Ok(entries)
    }

    /// Replace `$(key)` in `text` with the configuration's value for `key`.
    ///
    /// `$(root)` is the tree root and `$(home)` the model's source directory.
    /// Unknown variables are left as written.
    pub fn expand_variables(&self, config: &ModelConfig, text: &str) -> String {
        variable_pattern()
            .replace_all(text, |caps: &Captures<'_>| {
                let key = &caps[1];
                match key {
                    "root" => self.root.display().to_string(),
                    "home" => config.source_dir().display().to_string(),
                    _ => match config.raw().get(key) {
                        Some(value) if !value.is_null() => render_value(value),
                        _ => {
                            warn!(
                                variable = key,
                                model = config.name(),
                                "unknown variable left unexpanded"
                            );
                            caps[0].to_string()
                        }
                    },
                }
            })
            .into_owned()
    }
}

fn variable_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\$\((\w+)\)").expect("variable regex must compile"))
}

fn is_hidden(name: &std::ffi::OsStr) -> bool {
    name.to_str().is_some_and(|s| s.starts_with('.'))
}

/// A directory that may hold a model: not hidden and not the output directory.
fn is_model_candidate(entry: &walkdir::DirEntry, outdir: &Path) -> bool {
    entry.file_type().is_dir() && !is_hidden(entry.file_name()) && entry.path() != outdir
}

fn read_mapping(path: &Path) -> Result<Mapping, TreeError> {
    if !path.is_file() {
        let dir = path.parent().unwrap_or(path);
        return Err(TreeError::MissingConfig(dir.to_path_buf()));
    }
    let text = std::fs::read_to_string(path).map_err(|source| TreeError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    let value: Value = serde_yaml::from_str(&text).map_err(|source| TreeError::Parse {
        path: path.to_path_buf(),
        source,
    })?;
    match value {
        Value::Mapping(m) => Ok(m),
        Value::Null => Ok(Mapping::new()),
        _ => Err(TreeError::NotAMapping(path.to_path_buf())),
    }
}
