//! Delay-operator history buffer.
//!
//! A ring buffer of `(time, value)` samples, pre-filled backward from the
//! run's start time so a lookup never sees an empty history. An owned,
//! per-call-site Rust structure rather than a process-global table.

use std::collections::{BTreeMap, VecDeque};

use crate::errors::DelayError;

/// Backward pre-fill spacing.
const PREFILL_STEP: f64 = 0.01;

/// A per-call-site delay history buffer.
#[derive(Debug, Clone)]
pub struct DelayBuffer {
    capacity: usize,
    times: VecDeque<f64>,
    values: VecDeque<f64>,
    ic: f64,
    real_samples: usize,
}

impl DelayBuffer {
    /// Creates a buffer with capacity `2 * nmx`, pre-filled with `ic` at
    /// times spaced `0.01` apart, ending at `initial_time`.
    pub fn new(initial_time: f64, ic: f64, nmx: usize) -> Self {
        let capacity = (2 * nmx).max(1);
        let mut times = VecDeque::with_capacity(capacity);
        let mut values = VecDeque::with_capacity(capacity);

        for i in (0..capacity).rev() {
            times.push_back(initial_time - PREFILL_STEP * i as f64);
            values.push_back(ic);
        }

        Self {
            capacity,
            times,
            values,
            ic,
            real_samples: 0,
        }
    }

    /// Records a new real sample, evicting the oldest entry once the ring
    /// is full.
    pub fn add(&mut self, t: f64, value: f64) {
        if self.times.len() == self.capacity {
            self.times.pop_front();
            self.values.pop_front();
        }
        self.times.push_back(t);
        self.values.push_back(value);
        self.real_samples += 1;
    }

    /// Looks up the (possibly interpolated) value at `requested` time.
    ///
    /// Returns `ic` if `requested` precedes the earliest real sample but
    /// is still within the retained pre-fill window, and an error if
    /// `requested` precedes even the earliest retained sample (the ring
    /// has wrapped far enough that no sample covers it at all).
    pub fn get_delayed_value(&self, requested: f64) -> Result<f64, DelayError> {
        let earliest = *self.times.front().expect("buffer is never empty");
        if requested < earliest {
            return Err(DelayError::HistoryExhausted {
                requested,
                earliest,
            });
        }

        let real_count = self.real_samples.min(self.times.len());
        let first_real_index = self.times.len() - real_count;

        if real_count == 0 || requested < self.times[first_real_index] {
            return Ok(self.ic);
        }

        for w in first_real_index..self.times.len() - 1 {
            let (t0, t1) = (self.times[w], self.times[w + 1]);
            if requested >= t0 && requested <= t1 {
                let (v0, v1) = (self.values[w], self.values[w + 1]);
                if (t1 - t0).abs() < f64::EPSILON {
                    return Ok(v1);
                }
                let frac = (requested - t0) / (t1 - t0);
                return Ok(v0 + frac * (v1 - v0));
            }
        }

        Ok(*self.values.back().expect("buffer is never empty"))
    }
}

/// Owns every call site's [`DelayBuffer`] for one simulation run, keyed by
/// the Sorter's content-hash identifier.
#[derive(Debug, Clone, Default)]
pub struct DelayRegistry {
    buffers: BTreeMap<i64, DelayBuffer>,
}

impl DelayRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records the current sample and returns the value at `t - tdl`,
    /// creating and pre-filling the buffer for this call site on first
    /// use.
    pub fn evaluate(
        &mut self,
        id: i64,
        t: f64,
        x_value: f64,
        ic: f64,
        tdl: f64,
        nmx: usize,
    ) -> Result<f64, DelayError> {
        let buffer = self
            .buffers
            .entry(id)
            .or_insert_with(|| DelayBuffer::new(t, ic, nmx));
        buffer.add(t, x_value);
        buffer.get_delayed_value(t - tdl)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prefill_returns_initial_condition() {
        let buffer = DelayBuffer::new(0.0, 5.0, 4);
        assert_eq!(buffer.get_delayed_value(-0.05).unwrap(), 5.0);
    }

    #[test]
    fn interpolates_linearly_between_real_samples() {
        let mut buffer = DelayBuffer::new(0.0, 0.0, 4);
        buffer.add(1.0, 10.0);
        buffer.add(2.0, 20.0);
        assert_eq!(buffer.get_delayed_value(1.5).unwrap(), 15.0);
    }

    #[test]
    fn before_earliest_real_sample_returns_ic() {
        let mut buffer = DelayBuffer::new(0.0, 3.0, 4);
        buffer.add(1.0, 10.0);
        assert_eq!(buffer.get_delayed_value(0.5).unwrap(), 3.0);
    }

    #[test]
    fn before_earliest_retained_sample_is_an_error() {
        let buffer = DelayBuffer::new(0.0, 1.0, 2);
        let err = buffer.get_delayed_value(-100.0).unwrap_err();
        assert!(matches!(err, DelayError::HistoryExhausted { .. }));
    }

    #[test]
    fn request_at_or_after_latest_sample_clamps_to_it() {
        let mut buffer = DelayBuffer::new(0.0, 0.0, 4);
        buffer.add(1.0, 10.0);
        assert_eq!(buffer.get_delayed_value(5.0).unwrap(), 10.0);
    }

    #[test]
    fn ring_evicts_oldest_entries_past_capacity() {
        let mut buffer = DelayBuffer::new(0.0, 0.0, 1);
        assert_eq!(buffer.capacity, 2);
        buffer.add(1.0, 1.0);
        buffer.add(2.0, 2.0);
        buffer.add(3.0, 3.0);
        assert_eq!(buffer.times.len(), 2);
        let err = buffer.get_delayed_value(-50.0).unwrap_err();
        assert!(matches!(err, DelayError::HistoryExhausted { .. }));
    }

    #[test]
    fn registry_creates_a_buffer_per_identifier_on_first_use() {
        let mut registry = DelayRegistry::new();
        let value = registry.evaluate(42, 0.0, 7.0, 7.0, 1.0, 4).unwrap();
        assert_eq!(value, 7.0);
    }
}
