//! Metrics collection and reporting for the relay.
//!
//! Counters are plain atomics so the forwarding loop can bump them without
//! locking while a reporting task reads them through an `Arc`.

use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

/* ---------------------------------------------------------------- *
 * Simple Counter
 * ---------------------------------------------------------------- */

#[derive(Debug)]
pub struct Counter {
    value: AtomicU64,
}

impl Counter {
    pub fn new() -> Self {
        Self {
            value: AtomicU64::new(0),
        }
    }

    pub fn increment(&self) {
        self.value.fetch_add(1, Ordering::Relaxed);
    }

    pub fn add(&self, value: u64) {
        self.value.fetch_add(value, Ordering::Relaxed);
    }

    pub fn value(&self) -> u64 {
        self.value.load(Ordering::Relaxed)
    }
}

impl Default for Counter {
    fn default() -> Self {
        Self::new()
    }
}

impl Clone for Counter {
    fn clone(&self) -> Self {
        let c = Counter::new();
        c.value.store(self.value(), Ordering::Relaxed);
        c
    }
}

/* ---------------------------------------------------------------- *
 * Gauge
 * ---------------------------------------------------------------- */

#[derive(Debug)]
pub struct Gauge {
    value: AtomicU64,
}

impl Gauge {
    pub fn new() -> Self {
        Self {
            value: AtomicU64::new(0),
        }
    }

    pub fn set(&self, value: u64) {
        self.value.store(value, Ordering::Relaxed);
    }

    pub fn value(&self) -> u64 {
        self.value.load(Ordering::Relaxed)
    }
}

impl Default for Gauge {
    fn default() -> Self {
        Self::new()
    }
}

impl Clone for Gauge {
    fn clone(&self) -> Self {
        let g = Gauge::new();
        g.set(self.value());
        g
    }
}

/* ---------------------------------------------------------------- *
 * Histogram
 * ---------------------------------------------------------------- */

/// Bucketed distribution; a value lands in the first bucket whose upper
/// boundary is at least the value.
#[derive(Debug)]
pub struct Histogram {
    buckets: Vec<AtomicU64>,
    boundaries: Vec<u64>,
    overflow: AtomicU64,
    sum: AtomicU64,
    count: AtomicU64,
}

impl Histogram {
    pub fn new(boundaries: Vec<u64>) -> Self {
        let buckets = (0..boundaries.len()).map(|_| AtomicU64::new(0)).collect();

        Self {
            buckets,
            boundaries,
            overflow: AtomicU64::new(0),
            sum: AtomicU64::new(0),
            count: AtomicU64::new(0),
        }
    }

    /// Latency buckets in microseconds, 1 µs to 1 s.
    pub fn latency_micros() -> Self {
        Self::new(vec![1, 10, 100, 1_000, 10_000, 100_000, 1_000_000])
    }

    pub fn observe(&self, value: u64) {
        self.sum.fetch_add(value, Ordering::Relaxed);
        self.count.fetch_add(1, Ordering::Relaxed);

        match self.boundaries.iter().position(|&b| value <= b) {
            Some(idx) => {
                self.buckets[idx].fetch_add(1, Ordering::Relaxed);
            }
            None => {
                self.overflow.fetch_add(1, Ordering::Relaxed);
            }
        }
    }

    pub fn observe_duration(&self, elapsed: Duration) {
        self.observe(elapsed.as_micros().min(u64::MAX as u128) as u64);
    }

    pub fn average(&self) -> f64 {
        let c = self.count();
        if c == 0 {
            0.0
        } else {
            self.sum() as f64 / c as f64
        }
    }

    /// `(upper boundary, count)` per bucket.
    pub fn counts(&self) -> Vec<(u64, u64)> {
        self.boundaries
            .iter()
            .zip(self.buckets.iter())
            .map(|(&b, bucket)| (b, bucket.load(Ordering::Relaxed)))
            .collect()
    }

    pub fn overflow(&self) -> u64 {
        self.overflow.load(Ordering::Relaxed)
    }

    pub fn count(&self) -> u64 {
        self.count.load(Ordering::Relaxed)
    }

    pub fn sum(&self) -> u64 {
        self.sum.load(Ordering::Relaxed)
    }
}

impl Default for Histogram {
    fn default() -> Self {
        Self::latency_micros()
    }
}

impl Clone for Histogram {
    fn clone(&self) -> Self {
        Self {
            buckets: self
                .buckets
                .iter()
                .map(|b| AtomicU64::new(b.load(Ordering::Relaxed)))
                .collect(),
            boundaries: self.boundaries.clone(),
            overflow: AtomicU64::new(self.overflow()),
            sum: AtomicU64::new(self.sum()),
            count: AtomicU64::new(self.count()),
        }
    }
}

/* ---------------------------------------------------------------- *
 * Aggregate metrics for the relay
 * ---------------------------------------------------------------- */

#[derive(Debug, Default, Clone)]
pub struct RelayMetrics {
    // Interest pipeline
    pub interests_received: Counter,
    pub interests_duplicate: Counter,
    pub interests_forwarded: Counter,
    pub interests_aggregated: Counter,
    pub interests_not_forwardable: Counter,
    pub interests_timed_out: Counter,
    pub interests_retransmitted: Counter,
    pub nacks_sent: Counter,

    // Content pipeline
    pub content_received: Counter,
    pub content_duplicate: Counter,
    pub content_unsolicited: Counter,
    /// Content frames handed to faces (including cache hits)
    pub content_sent: Counter,

    // Cache metrics
    pub cs_hits: Counter,
    pub cs_misses: Counter,
    pub cs_inserts: Counter,
    pub cs_evictions: Counter,
    pub cs_expirations: Counter,
    pub cs_size: Gauge,

    // PIT metrics
    pub pit_inserts: Counter,
    pub pit_expirations: Counter,
    pub pit_size: Gauge,

    // FIB and face metrics
    pub fib_size: Gauge,
    pub faces_created: Counter,
    pub faces_removed: Counter,
    pub face_count: Gauge,

    // Transport metrics
    pub frames_received: Counter,
    pub frames_sent: Counter,
    pub frames_dropped: Counter,
    pub parse_errors: Counter,
    pub bytes_received: Counter,
    pub bytes_sent: Counter,

    // Performance metrics
    pub interest_processing_time: Histogram,
}

impl RelayMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Point-in-time copy suitable for logging or JSON export.
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            interests_received: self.interests_received.value(),
            interests_duplicate: self.interests_duplicate.value(),
            interests_forwarded: self.interests_forwarded.value(),
            interests_aggregated: self.interests_aggregated.value(),
            interests_not_forwardable: self.interests_not_forwardable.value(),
            interests_timed_out: self.interests_timed_out.value(),
            interests_retransmitted: self.interests_retransmitted.value(),
            nacks_sent: self.nacks_sent.value(),
            content_received: self.content_received.value(),
            content_duplicate: self.content_duplicate.value(),
            content_unsolicited: self.content_unsolicited.value(),
            content_sent: self.content_sent.value(),
            cs_hits: self.cs_hits.value(),
            cs_misses: self.cs_misses.value(),
            cs_inserts: self.cs_inserts.value(),
            cs_evictions: self.cs_evictions.value(),
            cs_expirations: self.cs_expirations.value(),
            cs_size: self.cs_size.value(),
            pit_inserts: self.pit_inserts.value(),
            pit_expirations: self.pit_expirations.value(),
            pit_size: self.pit_size.value(),
            fib_size: self.fib_size.value(),
            faces_created: self.faces_created.value(),
            faces_removed: self.faces_removed.value(),
            face_count: self.face_count.value(),
            frames_received: self.frames_received.value(),
            frames_sent: self.frames_sent.value(),
            frames_dropped: self.frames_dropped.value(),
            parse_errors: self.parse_errors.value(),
            bytes_received: self.bytes_received.value(),
            bytes_sent: self.bytes_sent.value(),
            interest_processing_avg_us: self.interest_processing_time.average(),
            interest_processing_buckets: self.interest_processing_time.counts(),
        }
    }
}

/// Serializable view of [`RelayMetrics`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MetricsSnapshot {
    pub interests_received: u64,
    pub interests_duplicate: u64,
    pub interests_forwarded: u64,
    pub interests_aggregated: u64,
    pub interests_not_forwardable: u64,
    pub interests_timed_out: u64,
    pub interests_retransmitted: u64,
    pub nacks_sent: u64,
    pub content_received: u64,
    pub content_duplicate: u64,
    pub content_unsolicited: u64,
    pub content_sent: u64,
    pub cs_hits: u64,
    pub cs_misses: u64,
    pub cs_inserts: u64,
    pub cs_evictions: u64,
    pub cs_expirations: u64,
    pub cs_size: u64,
    pub pit_inserts: u64,
    pub pit_expirations: u64,
    pub pit_size: u64,
    pub fib_size: u64,
    pub faces_created: u64,
    pub faces_removed: u64,
    pub face_count: u64,
    pub frames_received: u64,
    pub frames_sent: u64,
    pub frames_dropped: u64,
    pub parse_errors: u64,
    pub bytes_received: u64,
    pub bytes_sent: u64,
    pub interest_processing_avg_us: f64,
    pub interest_processing_buckets: Vec<(u64, u64)>,
}
