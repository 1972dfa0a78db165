//! Property-based tests for `bmperf-stats`.

use bmperf_stats::{Average, format_float, parse_stats};
use proptest::prelude::*;

// ── Strategies ──────────────────────────────────────────────────────────────

fn arb_observations() -> impl Strategy<Value = Vec<f64>> {
    prop::collection::vec(-1.0e6f64..1.0e6f64, 1..64)
}

fn arb_label() -> impl Strategy<Value = String> {
    "[a-z]{1,8}( [a-z]{1,8}){0,2}"
}

// ── Property tests ───────────────────────────────────────────────────────────

proptest! {
    /// `get` is the arithmetic mean of every `put`.
    #[test]
    fn average_is_arithmetic_mean(values in arb_observations()) {
        let mut avg = Average::new();
        for &v in &values {
            avg.put(v);
        }
        let expected = values.iter().sum::<f64>() / values.len() as f64;
        let got = avg.get().expect("at least one observation");
        prop_assert!((got - expected).abs() <= 1e-9 * expected.abs().max(1.0));
        prop_assert_eq!(avg.count(), values.len());
    }

    /// Every timing line contributes to the mean of its normalised label.
    #[test]
    fn log_label_mean_matches_lines(
        label in arb_label(),
        values in prop::collection::vec(0u32..100_000u32, 1..16),
    ) {
        let text: String = values
            .iter()
            .map(|v| format!("INFO:{label} time(s): {}.{:03}\n", v / 1000, v % 1000))
            .collect();
        let stats = parse_stats(&text).unwrap();
        let key = label.replace(' ', "_");
        let expected =
            values.iter().map(|&v| f64::from(v) / 1000.0).sum::<f64>() / values.len() as f64;
        let got = stats.get(&key).expect("label present");
        prop_assert!((got - expected).abs() < 1e-9);
    }

    /// Fixed-point output never collapses a positive value to zero.
    #[test]
    fn small_positive_values_never_print_as_zero(v in 1.0e-30f64..0.1f64) {
        let s = format_float(v);
        prop_assert!(s.contains('e'), "expected scientific notation for {v}: {s}");
        prop_assert!(!s.starts_with("0.000"));
    }

    /// Values at or above the threshold always print three decimals.
    #[test]
    fn large_values_use_three_decimals(v in 0.1f64..1.0e9f64) {
        let s = format_float(v);
        let (_, frac) = s.split_once('.').expect("decimal point");
        prop_assert_eq!(frac.len(), 3);
    }
}
