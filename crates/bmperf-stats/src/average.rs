//! Running mean of a repeatedly observed scalar.

/// Accumulates observations of one signal and reports their arithmetic mean.
///
/// # Examples
///
/// ```
/// use bmperf_stats::Average;
///
/// let mut avg = Average::new();
/// assert_eq!(avg.get(), None);
/// avg.put(1.0);
/// avg.put(3.0);
/// assert_eq!(avg.get(), Some(2.0));
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Average {
    acc: f64,
    count: usize,
}

impl Average {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add one observation.
    pub fn put(&mut self, value: f64) {
        self.acc += value;
        self.count += 1;
    }

    /// Mean of every observation so far; `None` until the first [`put`](Self::put).
    pub fn get(&self) -> Option<f64> {
        (self.count > 0).then(|| self.acc / self.count as f64)
    }

    pub fn count(&self) -> usize {
        self.count
    }
}
