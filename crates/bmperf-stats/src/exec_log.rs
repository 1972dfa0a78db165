//! Benchmark-runner log parsing.
//!
//! The runner prints one `INFO:<label> time(s): <seconds>` line per timed
//! stage and one `Input <i>) ... shape=[d0 d1 ...]` line per network input.
//! Stages may be reported several times (once per device or per loop); each
//! label is averaged over all of its occurrences.

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::OnceLock;

use regex::Regex;

use crate::{Average, Result, StatsError};

fn time_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"INFO:(.+) time\(s\): ([.\d]+)").expect("timing line regex must compile")
    })
}

fn shape_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"Input \d+\).+shape=\[([\d ]+)\]").expect("shape line regex must compile")
    })
}

/// Per-label mean timings plus the input shape summary of one execution.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RunStats {
    values: BTreeMap<String, f64>,
    shape: String,
}

impl RunStats {
    /// Mean value of a normalised label (spaces replaced by `_`).
    pub fn get(&self, label: &str) -> Option<f64> {
        self.values.get(label).copied()
    }

    /// Input shapes as `d0xd1x...`, one per input, joined with `:`.
    /// Empty when the log carried no shape lines.
    pub fn shape(&self) -> &str {
        &self.shape
    }

    pub fn labels(&self) -> impl Iterator<Item = &str> {
        self.values.keys().map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// Extract averaged timing statistics and the input shape summary from log text.
///
/// # Errors
///
/// Returns [`StatsError::InvalidNumber`] when a timing value matches the
/// line pattern but is not a valid float (e.g. `1.2.3`).
///
/// # Examples
///
/// ```
/// use bmperf_stats::parse_stats;
///
/// let log = "Input 0) 'data' shape=[1 3 224 224]\nINFO:load input time(s): 0.002\n";
/// let stats = parse_stats(log).unwrap();
/// assert_eq!(stats.get("load_input"), Some(0.002));
/// assert_eq!(stats.shape(), "1x3x224x224");
/// ```
pub fn parse_stats(text: &str) -> Result<RunStats> {
    let mut acc: BTreeMap<String, Average> = BTreeMap::new();
    for caps in time_pattern().captures_iter(text) {
        let label = caps[1].trim().replace(' ', "_");
        let raw = &caps[2];
        let value: f64 = raw.parse().map_err(|_| StatsError::InvalidNumber {
            field: label.clone(),
            value: raw.to_string(),
        })?;
        acc.entry(label).or_default().put(value);
    }

    let values = acc
        .into_iter()
        .filter_map(|(label, avg)| avg.get().map(|m| (label, m)))
        .collect();

    let shape = shape_pattern()
        .captures_iter(text)
        .map(|caps| join_dims(&caps[1]))
        .collect::<Vec<_>>()
        .join(":");

    Ok(RunStats { values, shape })
}

/// `"1 3 224 224"` -> `"1x3x224x224"`
fn join_dims(dims: &str) -> String {
    dims.split_whitespace().collect::<Vec<_>>().join("x")
}

/// Read a captured runner log and parse it with [`parse_stats`].
///
/// The log may contain arbitrary binary noise from the device driver, so
/// invalid UTF-8 is replaced rather than rejected.
pub fn parse_stats_file(path: &Path) -> Result<RunStats> {
    let bytes = std::fs::read(path).map_err(|source| StatsError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    parse_stats(&String::from_utf8_lossy(&bytes))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn repeated_label_is_averaged() {
        let log = "INFO:calculate time(s): 1.000\nINFO:calculate time(s): 3.000\n";
        let stats = parse_stats(log).unwrap();
        assert_eq!(stats.get("calculate"), Some(2.0));
    }

    #[test]
    fn label_is_trimmed_and_underscored() {
        let stats = parse_stats("INFO: net calculate time(s): 0.5\n").unwrap();
        assert_eq!(stats.get("net_calculate"), Some(0.5));
        assert_eq!(stats.labels().collect::<Vec<_>>(), vec!["net_calculate"]);
    }

    #[test]
    fn distinct_labels_are_kept_apart() {
        let log = "INFO:calculate time(s): 0.010\n\
                   INFO:load input time(s): 0.002\n\
                   INFO:calculate time(s): 0.030\n";
        let stats = parse_stats(log).unwrap();
        assert!((stats.get("calculate").unwrap() - 0.02).abs() < 1e-12);
        assert_eq!(stats.get("load_input"), Some(0.002));
    }

    #[test]
    fn shapes_are_joined_in_order() {
        let log = "Input 0) 'data' dtype=f32 shape=[1 3 224 224]\n\
                   Input 1) 'aux' dtype=f32 shape=[1 1000]\n";
        let stats = parse_stats(log).unwrap();
        assert_eq!(stats.shape(), "1x3x224x224:1x1000");
        assert!(stats.is_empty());
    }

    #[test]
    fn no_matches_yield_empty_stats() {
        let stats = parse_stats("bmrt_test finished\n").unwrap();
        assert!(stats.is_empty());
        assert_eq!(stats.shape(), "");
    }

    #[test]
    fn malformed_number_is_an_error() {
        let err = parse_stats("INFO:calculate time(s): 1.2.3\n").unwrap_err();
        match err {
            StatsError::InvalidNumber { field, .. } => assert_eq!(field, "calculate"),
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
