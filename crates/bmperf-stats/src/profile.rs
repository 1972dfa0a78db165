//! Compiler profile parsing.
//!
//! The compiler writes an estimate of the bmodel's runtime behaviour next to
//! the artifact. Everything before the `API_END` marker is per-layer detail
//! and is ignored; the summary after it is a list of `<key> : <number>` pairs
//! (`runtime`, and the transfer volumes `S2L`, `L2S`, `S2S`).

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::OnceLock;

use regex::Regex;

use crate::{Result, StatsError};

/// Start of the profile summary section.
pub const PROFILE_MARKER: &str = "API_END";

fn pair_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(\w+) *: *([\d.]+)").expect("pair regex must compile"))
}

/// A profile number keeps the integer/float distinction of its source text.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ProfileValue {
    Int(i64),
    Float(f64),
}

impl ProfileValue {
    pub fn as_f64(self) -> f64 {
        match self {
            Self::Int(v) => v as f64,
            Self::Float(v) => v,
        }
    }
}

/// Parsed profile summary. Immutable once read.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProfileRecord {
    values: BTreeMap<String, ProfileValue>,
}

impl ProfileRecord {
    pub fn get(&self, key: &str) -> Option<ProfileValue> {
        self.values.get(key).copied()
    }

    pub fn get_f64(&self, key: &str) -> Option<f64> {
        self.get(key).map(ProfileValue::as_f64)
    }

    /// Estimated single-iteration runtime.
    pub fn runtime(&self) -> Option<f64> {
        self.get_f64("runtime")
    }

    /// Bytes moved per iteration as `S2L + L2S + 2 * S2S`, if all three are present.
    pub fn transfer_bytes(&self) -> Option<f64> {
        let s2l = self.get_f64("S2L")?;
        let l2s = self.get_f64("L2S")?;
        let s2s = self.get_f64("S2S")?;
        Some(s2l + l2s + 2.0 * s2s)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// Read and parse a profile file.
///
/// Returns `Ok(None)` for an empty file: the profile is optional data and its
/// absence only disables the derived columns.
///
/// # Errors
///
/// [`StatsError::Read`] when the file cannot be read, and
/// [`StatsError::InvalidNumber`] for a malformed value.
pub fn parse_profile(path: &Path) -> Result<Option<ProfileRecord>> {
    let bytes = std::fs::read(path).map_err(|source| StatsError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    parse_profile_str(&String::from_utf8_lossy(&bytes))
}

/// Parse profile text; see [`parse_profile`].
///
/// # Examples
///
/// ```
/// use bmperf_stats::{ProfileValue, parse_profile_str};
///
/// let record = parse_profile_str("noise API_END foo : 1 bar : 2.5").unwrap().unwrap();
/// assert_eq!(record.get("foo"), Some(ProfileValue::Int(1)));
/// assert_eq!(record.get("bar"), Some(ProfileValue::Float(2.5)));
/// ```
pub fn parse_profile_str(text: &str) -> Result<Option<ProfileRecord>> {
    if text.is_empty() {
        return Ok(None);
    }
    // A profile without a summary section carries no usable values.
    let Some(start) = text.find(PROFILE_MARKER) else {
        return Ok(Some(ProfileRecord::default()));
    };

    let mut values = BTreeMap::new();
    for caps in pair_pattern().captures_iter(&text[start..]) {
        let key = caps[1].to_string();
        let raw = &caps[2];
        let invalid = || StatsError::InvalidNumber {
            field: key.clone(),
            value: raw.to_string(),
        };
        let value = if raw.contains('.') {
            ProfileValue::Float(raw.parse().map_err(|_| invalid())?)
        } else {
            ProfileValue::Int(raw.parse().map_err(|_| invalid())?)
        };
        values.insert(key, value);
    }
    Ok(Some(ProfileRecord { values }))
}
