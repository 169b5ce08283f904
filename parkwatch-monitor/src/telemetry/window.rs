use std::collections::VecDeque;

/// Number of readings kept for each chart.
pub const WINDOW_LEN: usize = 10;

/// Trailing window of the most recent readings of one metric.
///
/// Oldest readings fall off the front once the window is full.
#[derive(Debug, Clone)]
pub struct MetricWindow {
    readings: VecDeque<f64>,
    capacity: usize,
}

impl Default for MetricWindow {
    fn default() -> Self {
        Self::new(WINDOW_LEN)
    }
}

impl MetricWindow {
    pub fn new(capacity: usize) -> Self {
        Self {
            readings: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    pub fn push(&mut self, value: f64) {
        if self.capacity == 0 {
            return;
        }
        if self.readings.len() == self.capacity {
            self.readings.pop_front();
        }
        self.readings.push_back(value);
    }

    /// Replace the contents with `values`, keeping the newest that fit.
    pub fn refill(&mut self, values: impl IntoIterator<Item = f64>) {
        self.readings.clear();
        for value in values {
            self.push(value);
        }
    }

    pub fn latest(&self) -> Option<f64> {
        self.readings.back().copied()
    }

    pub fn len(&self) -> usize {
        self.readings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.readings.is_empty()
    }

    /// Oldest first.
    pub fn to_vec(&self) -> Vec<f64> {
        self.readings.iter().copied().collect()
    }
}
