//! Report cell formatting.

/// Format a timing or throughput value.
///
/// Values `>= 0.1` use three fixed decimals. Smaller values switch to
/// scientific notation with three mantissa decimals so they do not collapse
/// to `0.000`; the exponent is signed and at least two digits wide.
///
/// # Examples
///
/// ```
/// use bmperf_stats::format_float;
///
/// assert_eq!(format_float(0.5), "0.500");
/// assert_eq!(format_float(0.1), "0.100");
/// assert_eq!(format_float(0.0005), "5.000e-04");
/// ```
pub fn format_float(v: f64) -> String {
    if v.is_nan() {
        return "nan".to_string();
    }
    if v >= 0.1 {
        format!("{v:.3}")
    } else {
        scientific(v)
    }
}

fn scientific(v: f64) -> String {
    let s = format!("{v:.3e}");
    let Some((mantissa, exp)) = s.split_once('e') else {
        // inf / -inf
        return s;
    };
    let (sign, digits) = match exp.strip_prefix('-') {
        Some(digits) => ('-', digits),
        None => ('+', exp),
    };
    format!("{mantissa}e{sign}{digits:0>2}")
}

/// Format a ratio as a percentage with two decimals (`0.1234` -> `12.34%`).
pub fn format_percent(v: f64) -> String {
    if v.is_nan() {
        return "nan%".to_string();
    }
    format!("{:.2}%", v * 100.0)
}

/// Human readable duration used for the end-of-run summary.
///
/// Zero components are dropped; whole days are prefixed.
///
/// ```
/// use bmperf_stats::format_seconds;
///
/// assert_eq!(format_seconds(3725), "1 hours 2 minutes 5 seconds");
/// assert_eq!(format_seconds(0), "0 second");
/// ```
pub fn format_seconds(total: u64) -> String {
    const DAY: u64 = 24 * 60 * 60;
    let days = total / DAY;
    let rem = total % DAY;
    let parts = [
        (rem / 3600, "hours"),
        (rem % 3600 / 60, "minutes"),
        (rem % 60, "seconds"),
    ];
    let mut text = parts
        .iter()
        .filter(|(v, _)| *v > 0)
        .map(|(v, unit)| format!("{v} {unit}"))
        .collect::<Vec<_>>()
        .join(" ");
    if text.is_empty() {
        text = "0 second".to_string();
    }
    if days > 0 {
        format!("{days} days {text}")
    } else {
        text
    }
}
