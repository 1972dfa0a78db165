// SPDX-License-Identifier: MIT OR Apache-2.0
//! MAC and DDR utilization.
//!
//! Latencies are in milliseconds. GOPs per millisecond equals TOPS, which is
//! the unit of [`CapabilitySpec::mac_total`]; bytes per millisecond times
//! 1000 over 2^30 is GiB/s, compared against [`CapabilitySpec::ddr_total`].

use crate::CapabilitySpec;

const GIB: f64 = 1024.0 * 1024.0 * 1024.0;

/// Fraction of peak compute achieved by `batch_size` images of `gops` each.
pub fn mac_utilization(gops: f64, batch_size: u32, latency_ms: f64, spec: &CapabilitySpec) -> f64 {
    gops * f64::from(batch_size) / latency_ms / spec.mac_total
}

/// Fraction of peak DDR bandwidth achieved when moving `transfer_bytes` per iteration.
pub fn ddr_utilization(transfer_bytes: f64, latency_ms: f64, spec: &CapabilitySpec) -> f64 {
    transfer_bytes / latency_ms * 1000.0 / GIB / spec.ddr_total
}

/// Values taken from the compiler profile.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ProfileEstimate {
    /// Estimated single-iteration runtime, ms.
    pub runtime_ms: Option<f64>,
    /// `S2L + L2S + 2 * S2S`.
    pub transfer_bytes: Option<f64>,
}

/// Utilization derived from measured latency and, in parallel, from the
/// profile's own runtime estimate.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Utilization {
    pub mac: Option<f64>,
    pub ddr: Option<f64>,
    pub estimated_mac: Option<f64>,
    pub estimated_ddr: Option<f64>,
}

/// Evaluate both utilization formulas against the measured latency and the
/// profile estimate. A value is `None` when one of its inputs is missing
/// (no GOPs in the configuration, incomplete profile).
pub fn derive_utilization(
    latency_ms: f64,
    gops: Option<f64>,
    batch_size: u32,
    spec: &CapabilitySpec,
    estimate: &ProfileEstimate,
) -> Utilization {
    let mac_at = |t: f64| gops.map(|g| mac_utilization(g, batch_size, t, spec));
    let bytes = estimate.transfer_bytes;
    let ddr_at = |t: f64| bytes.map(|b| ddr_utilization(b, t, spec));

    Utilization {
        mac: mac_at(latency_ms),
        ddr: ddr_at(latency_ms),
        estimated_mac: estimate.runtime_ms.and_then(mac_at),
        estimated_ddr: estimate.runtime_ms.and_then(ddr_at),
    }
}
