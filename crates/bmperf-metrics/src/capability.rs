// SPDX-License-Identifier: MIT OR Apache-2.0
//! Peak compute and memory bandwidth per TPU target and numeric precision.
//!
//! `mac_total` is in TOPS and `ddr_total` in GB/s, so a latency in
//! milliseconds divides GOPs straight into the same unit.

use serde::{Deserialize, Serialize};

use crate::{MetricsError, Result};

/// Hardware target family.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Target {
    Bm1684,
    Bm1684x,
}

impl Target {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Bm1684 => "BM1684",
            Self::Bm1684x => "BM1684X",
        }
    }

    /// File name of the compiler profile emitted next to a template-built bmodel.
    pub fn profile_file_name(&self) -> &'static str {
        match self {
            Self::Bm1684 => "compiler_profile_0.dat",
            Self::Bm1684x => "compiler_profile_0.txt",
        }
    }
}

impl std::fmt::Display for Target {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Target {
    type Err = MetricsError;
    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_uppercase().as_str() {
            "BM1684" => Ok(Self::Bm1684),
            "BM1684X" => Ok(Self::Bm1684x),
            _ => Err(MetricsError::InvalidTarget(s.to_string())),
        }
    }
}

/// Numeric precision a bmodel was compiled for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Precision {
    Fp32,
    Fp16,
    Bf16,
    Int8,
}

impl Precision {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Fp32 => "FP32",
            Self::Fp16 => "FP16",
            Self::Bf16 => "BF16",
            Self::Int8 => "INT8",
        }
    }
}

impl std::fmt::Display for Precision {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Precision {
    type Err = MetricsError;
    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_uppercase().as_str() {
            "FP32" => Ok(Self::Fp32),
            "FP16" => Ok(Self::Fp16),
            "BF16" => Ok(Self::Bf16),
            "INT8" => Ok(Self::Int8),
            _ => Err(MetricsError::UnknownPrecision(s.to_string())),
        }
    }
}

/// Theoretical peaks for one (target, precision) pair.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CapabilitySpec {
    pub target: Target,
    pub precision: Precision,
    /// Peak compute, TOPS.
    pub mac_total: f64,
    /// Peak DDR bandwidth, GB/s.
    pub ddr_total: f64,
}

const fn spec(
    target: Target,
    precision: Precision,
    mac_total: f64,
    ddr_total: f64,
) -> CapabilitySpec {
    CapabilitySpec {
        target,
        precision,
        mac_total,
        ddr_total,
    }
}

// ---------- Built-in tables ----------

static CAPABILITIES: &[CapabilitySpec] = &[
    spec(Target::Bm1684, Precision::Fp32, 2.2, 32.0),
    spec(Target::Bm1684, Precision::Int8, 17.6, 32.0),
    spec(Target::Bm1684x, Precision::Fp32, 2.0, 64.0),
    spec(Target::Bm1684x, Precision::Fp16, 16.0, 64.0),
    spec(Target::Bm1684x, Precision::Bf16, 16.0, 64.0),
    spec(Target::Bm1684x, Precision::Int8, 32.0, 64.0),
];

/// Every precision a target supports, in table order.
pub fn supported_precisions(target: Target) -> impl Iterator<Item = Precision> {
    CAPABILITIES
        .iter()
        .filter(move |c| c.target == target)
        .map(|c| c.precision)
}

/// Look up the capability entry for a (target, precision) pair.
///
/// # Errors
///
/// [`MetricsError::InvalidPrecision`] when the target has no entry for the precision.
pub fn resolve(target: Target, precision: Precision) -> Result<CapabilitySpec> {
    CAPABILITIES
        .iter()
        .find(|c| c.target == target && c.precision == precision)
        .copied()
        .ok_or_else(|| MetricsError::InvalidPrecision {
            target,
            precision: precision.to_string(),
        })
}
