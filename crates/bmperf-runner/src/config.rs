//! Model configuration: the merged YAML mapping and its typed view.
//!
//! A model's configuration is the global `config.yaml` overlaid by the
//! model's own `config.yaml`, and each build loop overlays one more
//! override-set on top. Every overlay produces a new [`ModelConfig`]; none is
//! mutated in place.

use std::path::{Path, PathBuf};

use bmperf_metrics::{MetricsError, Precision};
use serde::Deserialize;
use serde_yaml::{Mapping, Value};

use crate::error::TreeError;

/// Keys the runner reads, each optional.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct ModelSettings {
    /// Numeric precision name (`FP32`, `FP16`, `BF16`, `INT8`).
    pub prec: Option<String>,
    /// Compute demand of one image, GOPs.
    pub gops: Option<f64>,
    /// Explicit total image budget for round calibration.
    pub time_rounds: Option<f64>,
    /// Compare against stored reference outputs when available.
    pub runtime_cmp: Option<bool>,
    /// Iteration flag passed to the benchmark runner.
    pub iter_opt: Option<String>,
    /// `KEY=VALUE` entries for the runner environment, `$(var)` expanded.
    pub run_env: Vec<String>,
    /// `false` disables timing for this model.
    pub time: Option<bool>,
    pub fp_loops: Option<Vec<Value>>,
    pub int8_loops: Option<Vec<Value>>,
    pub fp_batch_sizes: Option<Vec<u32>>,
    pub bmnetu_batch_sizes: Option<Vec<u32>>,
    pub fp_outdir_template: Option<String>,
    pub int8_outdir_template: Option<String>,
}

/// One model (or one loop variant of it) ready to be measured.
#[derive(Debug, Clone, PartialEq)]
pub struct ModelConfig {
    name: String,
    source_dir: PathBuf,
    workdir: PathBuf,
    settings: ModelSettings,
    raw: Mapping,
}

impl ModelConfig {
    /// Build from a merged mapping. `name` and `workdir` are written back into
    /// the mapping so they can be referenced by `$(name)` / `$(workdir)`.
    pub fn new(
        name: impl Into<String>,
        source_dir: impl Into<PathBuf>,
        workdir: impl Into<PathBuf>,
        mut raw: Mapping,
    ) -> Result<Self, TreeError> {
        let name = name.into();
        let workdir = workdir.into();
        raw.insert("name".into(), Value::String(name.clone()));
        raw.insert(
            "workdir".into(),
            Value::String(workdir.display().to_string()),
        );
        let settings = parse_settings(&name, &raw)?;
        Ok(Self {
            name,
            source_dir: source_dir.into(),
            workdir,
            settings,
            raw,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Directory holding the model's own `config.yaml`.
    pub fn source_dir(&self) -> &Path {
        &self.source_dir
    }

    /// Output directory the model's artifacts were built into.
    pub fn workdir(&self) -> &Path {
        &self.workdir
    }

    pub fn settings(&self) -> &ModelSettings {
        &self.settings
    }

    pub fn raw(&self) -> &Mapping {
        &self.raw
    }

    /// Whether `key` is present at all, even with a null value.
    pub fn contains(&self, key: &str) -> bool {
        self.raw.contains_key(key)
    }

    /// Overlay one loop override-set.
    ///
    /// # Errors
    ///
    /// [`TreeError::InvalidOverride`] if `overrides` is not a mapping, or
    /// [`TreeError::InvalidConfig`] if the merged keys no longer parse.
    pub fn with_overrides(&self, overrides: &Value) -> Result<Self, TreeError> {
        let raw = dict_override(&self.raw, overrides)?;
        let settings = parse_settings(&self.name, &raw)?;
        Ok(Self {
            raw,
            settings,
            ..self.clone()
        })
    }

    /// Same configuration reported under another name.
    pub fn with_name(&self, name: impl Into<String>) -> Self {
        let name = name.into();
        let mut raw = self.raw.clone();
        raw.insert("name".into(), Value::String(name.clone()));
        Self {
            name,
            raw,
            ..self.clone()
        }
    }

    /// Fill in the precision when the configuration does not name one.
    pub fn with_default_precision(mut self, precision: Precision) -> Self {
        if self.settings.prec.is_none() {
            let prec = precision.to_string();
            self.raw.insert("prec".into(), Value::String(prec.clone()));
            self.settings.prec = Some(prec);
        }
        self
    }

    /// The configured precision.
    ///
    /// # Errors
    ///
    /// [`MetricsError::UnknownPrecision`] for an unset or unrecognised name.
    pub fn precision(&self) -> Result<Precision, MetricsError> {
        match &self.settings.prec {
            Some(prec) => prec.parse(),
            None => Err(MetricsError::UnknownPrecision(String::new())),
        }
    }

    /// Report cell for an extra attribute column; empty when unset.
    pub fn attribute(&self, key: &str) -> String {
        self.raw.get(key).map(render_value).unwrap_or_default()
    }
}

fn parse_settings(model: &str, raw: &Mapping) -> Result<ModelSettings, TreeError> {
    serde_yaml::from_value(Value::Mapping(raw.clone())).map_err(|source| TreeError::InvalidConfig {
        model: model.to_string(),
        source,
    })
}

/// Copy of `base` with every key of `overrides` replacing the base value.
///
/// # Errors
///
/// [`TreeError::InvalidOverride`] if `overrides` is not a mapping.
pub fn dict_override(base: &Mapping, overrides: &Value) -> Result<Mapping, TreeError> {
    let Value::Mapping(overrides) = overrides else {
        return Err(TreeError::InvalidOverride(render_value(overrides)));
    };
    let mut merged = base.clone();
    for (k, v) in overrides {
        merged.insert(k.clone(), v.clone());
    }
    Ok(merged)
}

/// Render a YAML value as a single report cell.
pub fn render_value(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        Value::String(s) => s.clone(),
        Value::Sequence(items) => {
            let items = items.iter().map(render_value).collect::<Vec<_>>();
            format!("[{}]", items.join(", "))
        }
        Value::Mapping(m) => {
            let pairs = m
                .iter()
                .map(|(k, v)| format!("{}: {}", render_value(k), render_value(v)))
                .collect::<Vec<_>>();
            format!("{{{}}}", pairs.join(", "))
        }
        Value::Tagged(tagged) => render_value(&tagged.value),
    }
}
