//! Latency sinks and session counters
//!
//! The sink is an opaque accumulator for (start, stop) timestamp pairs; the
//! rest of the system never looks inside it beyond the rendered summary.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

use histogram::AtomicHistogram;

// Covers 1ns..2^64ns with ~0.8% relative error per bucket.
const GROUPING_POWER: u8 = 7;
const MAX_VALUE_POWER: u8 = 64;

/// Concurrent latency accumulator for one measurement direction.
#[derive(Debug)]
pub struct LatencySink {
    histogram: AtomicHistogram,
    samples: AtomicU64,
}

impl LatencySink {
    pub fn new() -> Self {
        LatencySink {
            histogram: AtomicHistogram::new(GROUPING_POWER, MAX_VALUE_POWER)
                .expect("histogram parameters are static"),
            samples: AtomicU64::new(0),
        }
    }

    /// Record one completed operation.
    pub fn record(&self, start: Instant, stop: Instant) {
        let nanos = stop.saturating_duration_since(start).as_nanos() as u64;
        if self.histogram.increment(nanos).is_ok() {
            self.samples.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub fn sample_count(&self) -> u64 {
        self.samples.load(Ordering::Relaxed)
    }

    /// One-line human-readable summary: count plus approximate percentiles
    /// in microseconds.
    pub fn summary(&self) -> String {
        let count = self.sample_count();
        if count == 0 {
            return "count=0".to_string();
        }
        let snapshot = self.histogram.load();
        let upper_us = |q: f64| -> u64 {
            snapshot
                .percentile(q)
                .ok()
                .flatten()
                .map(|bucket| bucket.end() / 1_000)
                .unwrap_or(0)
        };
        format!(
            "count={count} p50={}us p90={}us p99={}us max={}us",
            upper_us(50.0),
            upper_us(90.0),
            upper_us(99.0),
            upper_us(100.0),
        )
    }
}

impl Default for LatencySink {
    fn default() -> Self {
        LatencySink::new()
    }
}

/// Counters printed in the shutdown summary.
#[derive(Debug, Default)]
pub struct SessionStats {
    processed_sockets: AtomicU64,
}

impl SessionStats {
    pub fn socket_processed(&self) {
        self.processed_sockets.fetch_add(1, Ordering::Relaxed);
    }

    pub fn processed_sockets(&self) -> u64 {
        self.processed_sockets.load(Ordering::Relaxed)
    }
}
