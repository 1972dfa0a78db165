// SPDX-License-Identifier: MIT OR Apache-2.0
//! Benchmark round-count calibration.
//!
//! Priority: explicit time budget, then the compiler profile estimate, then a
//! fixed per-batch default. The result is always at least one round.

/// Runtime the profile-driven path aims for, in profile runtime units.
pub const TARGET_RUNTIME: f64 = 1200.0;
pub const MIN_ROUNDS: u32 = 1;
pub const MAX_ROUNDS: u32 = 10_000;
/// Images per run when nothing better is known.
pub const DEFAULT_IMAGE_BUDGET: u32 = 2000;

/// Which policy produced a [`RoundPlan`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoundSource {
    TimeBudget,
    Profile,
    Default,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RoundPlan {
    pub rounds: u32,
    pub source: RoundSource,
}

/// Decide how many rounds to run.
///
/// * `time_budget` - explicit total budget from the configuration; yields
///   `ceil(budget / batch_size)` regardless of any profile
/// * `estimated_runtime` - single-iteration runtime from the compiler
///   profile; yields `TARGET_RUNTIME / runtime` truncated and clamped to
///   `[MIN_ROUNDS, MAX_ROUNDS]`
/// * otherwise `floor(DEFAULT_IMAGE_BUDGET / batch_size)`
///
/// A zero batch size is treated as one.
pub fn calibrate_rounds(
    time_budget: Option<f64>,
    estimated_runtime: Option<f64>,
    batch_size: u32,
) -> RoundPlan {
    let batch = batch_size.max(1);

    if let Some(budget) = time_budget {
        let rounds = (budget / f64::from(batch)).ceil() as u32;
        return RoundPlan {
            rounds: rounds.max(MIN_ROUNDS),
            source: RoundSource::TimeBudget,
        };
    }

    if let Some(runtime) = estimated_runtime {
        // `as` saturates: +inf -> u32::MAX, NaN -> 0
        let rounds = (TARGET_RUNTIME / runtime) as u32;
        return RoundPlan {
            rounds: rounds.clamp(MIN_ROUNDS, MAX_ROUNDS),
            source: RoundSource::Profile,
        };
    }

    RoundPlan {
        rounds: (DEFAULT_IMAGE_BUDGET / batch).max(MIN_ROUNDS),
        source: RoundSource::Default,
    }
}
