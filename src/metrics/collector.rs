use std::collections::{HashMap, VecDeque};

use hdrhistogram::Histogram;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

use super::percentiles::{PercentileSet, HIST_HIGH, HIST_LOW, HIST_SIGFIG};
use super::{rounded_div, MetricEvent};

// ─── Configuration ───────────────────────────────────────────────

/// Events retained when no capacity is given.
pub const DEFAULT_CAPACITY: usize = 1000;

/// Requested capacities below this are raised to it.
pub const MIN_CAPACITY: usize = 100;

/// `recent()` limit used by the reporting layer when none is supplied.
pub const DEFAULT_RECENT_LIMIT: usize = 10;

// ─── Public types ────────────────────────────────────────────────

/// Bounded, newest-first store of request events with a running summary.
///
/// The middleware calls `add()`, the reporting layer calls the queries.
/// Writers (`add`, `clear`) take an exclusive lock, queries share a read
/// lock; nothing awaits while a lock is held.
pub struct MetricsCollector {
    inner: RwLock<Inner>,
}

/// Global rollup over every event currently stored.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Summary {
    pub total_requests: u64,
    pub success_requests: u64,
    pub failed_requests: u64,
    pub average_response_time: u64,
    /// Percentage 0–100, rounded; 0 when there are no requests
    pub success_rate: u64,
}

/// Rollup for one `(method, path)` pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EndpointMetric {
    pub method: String,
    pub path: String,
    pub count: u64,
    pub success_count: u64,
    pub failed_count: u64,
    pub total_response_time: u64,
    pub average_response_time: u64,
}

// ─── Internal state ──────────────────────────────────────────────

struct Inner {
    capacity: usize,

    // Front = newest
    events: VecDeque<MetricEvent>,

    // Counters, always consistent with `events`
    total_requests: u64,
    success_requests: u64,
    failed_requests: u64,
    response_time_sum: u64,
}

// ─── MetricsCollector impl ───────────────────────────────────────

impl MetricsCollector {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }

    /// Capacities below `MIN_CAPACITY` are raised to it.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            inner: RwLock::new(Inner::new(capacity.max(MIN_CAPACITY))),
        }
    }

    pub fn capacity(&self) -> usize {
        self.inner.read().capacity
    }

    /// Record one request. Never fails; malformed values are stored as-is.
    pub fn add(&self, event: MetricEvent) {
        self.inner.write().add(event);
    }

    pub fn summary(&self) -> Summary {
        self.inner.read().summary()
    }

    /// Copy of the whole history, newest first.
    pub fn all(&self) -> Vec<MetricEvent> {
        self.inner.read().events.iter().cloned().collect()
    }

    /// The `limit` newest events, newest first.
    pub fn recent(&self, limit: usize) -> Vec<MetricEvent> {
        self.inner
            .read()
            .events
            .iter()
            .take(limit)
            .cloned()
            .collect()
    }

    /// Per-endpoint rollups, busiest first.
    pub fn by_endpoint(&self) -> Vec<EndpointMetric> {
        self.inner.read().by_endpoint()
    }

    /// Events with `start <= timestamp <= end`, in store order.
    pub fn by_time_range(&self, start: i64, end: i64) -> Vec<MetricEvent> {
        self.inner
            .read()
            .events
            .iter()
            .filter(|e| e.timestamp >= start && e.timestamp <= end)
            .cloned()
            .collect()
    }

    /// Latency percentiles over the events currently stored.
    pub fn percentiles(&self) -> PercentileSet {
        self.inner.read().percentiles()
    }

    pub fn count(&self) -> usize {
        self.inner.read().events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.count() == 0
    }

    /// Drop every event and zero the summary. Capacity is kept.
    pub fn clear(&self) {
        let mut inner = self.inner.write();
        let capacity = inner.capacity;
        *inner = Inner::new(capacity);
    }
}

impl Default for MetricsCollector {
    fn default() -> Self {
        Self::new()
    }
}

// ─── Inner impl ──────────────────────────────────────────────────

impl Inner {
    fn new(capacity: usize) -> Self {
        Self {
            capacity,
            events: VecDeque::with_capacity(capacity + 1),
            total_requests: 0,
            success_requests: 0,
            failed_requests: 0,
            response_time_sum: 0,
        }
    }

    fn add(&mut self, event: MetricEvent) {
        let success = event.success;
        let response_time = event.response_time;
        self.events.push_front(event);

        if self.events.len() > self.capacity {
            // Oldest entries live at the back
            self.events.truncate(self.capacity);
            self.recalculate();
        } else {
            self.total_requests += 1;
            if success {
                self.success_requests += 1;
            } else {
                self.failed_requests += 1;
            }
            self.response_time_sum = self.response_time_sum.saturating_add(response_time);
        }
    }

    /// Rebuild every counter from the surviving events.
    fn recalculate(&mut self) {
        let total = self.events.len() as u64;
        let success = self.events.iter().filter(|e| e.success).count() as u64;

        self.total_requests = total;
        self.success_requests = success;
        self.failed_requests = total - success;
        self.response_time_sum = self
            .events
            .iter()
            .fold(0u64, |sum, e| sum.saturating_add(e.response_time));
    }

    fn summary(&self) -> Summary {
        Summary {
            total_requests: self.total_requests,
            success_requests: self.success_requests,
            failed_requests: self.failed_requests,
            average_response_time: rounded_div(
                self.response_time_sum,
                self.total_requests,
            ),
            success_rate: rounded_div(
                self.success_requests * 100,
                self.total_requests,
            ),
        }
    }

    fn by_endpoint(&self) -> Vec<EndpointMetric> {
        // Groups appear in first-seen order (newest first), which the
        // stable sort below keeps for equal counts.
        let mut index: HashMap<(&str, &str), usize> = HashMap::new();
        let mut groups: Vec<EndpointMetric> = Vec::new();

        for event in &self.events {
            let key = (event.method.as_str(), event.path.as_str());
            let slot = *index.entry(key).or_insert_with(|| {
                groups.push(EndpointMetric {
                    method: event.method.clone(),
                    path: event.path.clone(),
                    count: 0,
                    success_count: 0,
                    failed_count: 0,
                    total_response_time: 0,
                    average_response_time: 0,
                });
                groups.len() - 1
            });

            let group = &mut groups[slot];
            group.count += 1;
            group.total_response_time =
                group.total_response_time.saturating_add(event.response_time);
            if event.success {
                group.success_count += 1;
            } else {
                group.failed_count += 1;
            }
        }

        for group in &mut groups {
            group.average_response_time =
                rounded_div(group.total_response_time, group.count);
        }

        groups.sort_by(|a, b| b.count.cmp(&a.count));
        groups
    }

    fn percentiles(&self) -> PercentileSet {
        if self.events.is_empty() {
            return PercentileSet::empty();
        }

        let mut hist = match Histogram::<u64>::new_with_bounds(
            HIST_LOW,
            HIST_HIGH,
            HIST_SIGFIG,
        ) {
            Ok(hist) => hist,
            Err(e) => {
                tracing::error!("cannot build latency histogram: {e}");
                return PercentileSet::empty();
            }
        };

        for event in &self.events {
            // Clamp into the histogram's trackable range
            let _ = hist.record(event.response_time.clamp(HIST_LOW, HIST_HIGH));
        }

        PercentileSet::from_histogram(&hist)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn event(method: &str, path: &str, status: u16, ms: u64, ts: i64) -> MetricEvent {
        MetricEvent::new(method, path, status, ms, ts)
    }

    #[test]
    fn capacity_is_floored() {
        assert_eq!(MetricsCollector::with_capacity(5).capacity(), MIN_CAPACITY);
        assert_eq!(MetricsCollector::with_capacity(250).capacity(), 250);
        assert_eq!(MetricsCollector::new().capacity(), DEFAULT_CAPACITY);
    }

    #[test]
    fn add_updates_summary_incrementally() {
        let collector = MetricsCollector::new();
        collector.add(event("GET", "/a", 200, 10, 1));
        collector.add(event("GET", "/a", 500, 21, 2));

        let summary = collector.summary();
        assert_eq!(summary.total_requests, 2);
        assert_eq!(summary.success_requests, 1);
        assert_eq!(summary.failed_requests, 1);
        // (10 + 21) / 2 = 15.5 → 16
        assert_eq!(summary.average_response_time, 16);
        assert_eq!(summary.success_rate, 50);
    }

    #[test]
    fn success_rate_rounds() {
        let collector = MetricsCollector::new();
        collector.add(event("GET", "/a", 200, 1, 1));
        collector.add(event("GET", "/a", 200, 1, 2));
        collector.add(event("GET", "/a", 404, 1, 3));

        assert_eq!(collector.summary().success_rate, 67);
    }

    #[test]
    fn eviction_recomputes_from_survivors() {
        let collector = MetricsCollector::with_capacity(100);
        // The first event is a slow failure that will be evicted
        collector.add(event("GET", "/slow", 500, 10_000, 0));
        for ts in 1..=100 {
            collector.add(event("GET", "/fast", 200, 4, ts));
        }

        let summary = collector.summary();
        assert_eq!(collector.count(), 100);
        assert_eq!(summary.total_requests, 100);
        assert_eq!(summary.failed_requests, 0);
        assert_eq!(summary.average_response_time, 4);
        assert_eq!(summary.success_rate, 100);
    }

    #[test]
    fn clear_keeps_capacity() {
        let collector = MetricsCollector::with_capacity(300);
        collector.add(event("GET", "/a", 200, 1, 1));
        collector.clear();

        assert!(collector.is_empty());
        assert_eq!(collector.capacity(), 300);
        assert_eq!(collector.summary(), Summary::default());
    }

    #[test]
    fn endpoint_ties_keep_most_recent_first() {
        let collector = MetricsCollector::new();
        collector.add(event("GET", "/old", 200, 1, 1));
        collector.add(event("GET", "/new", 200, 1, 2));

        let endpoints = collector.by_endpoint();
        assert_eq!(endpoints[0].path, "/new");
        assert_eq!(endpoints[1].path, "/old");
    }

    #[test]
    fn endpoint_average_is_rounded() {
        let collector = MetricsCollector::new();
        collector.add(event("GET", "/a", 200, 1, 1));
        collector.add(event("GET", "/a", 200, 2, 2));

        let endpoints = collector.by_endpoint();
        assert_eq!(endpoints[0].total_response_time, 3);
        assert_eq!(endpoints[0].average_response_time, 2);
    }

    #[test]
    fn percentiles_cover_stored_events() {
        let collector = MetricsCollector::new();
        assert!(!collector.percentiles().has_data());

        for ms in [0u64, 10, 20, 30] {
            collector.add(event("GET", "/a", 200, ms, 1));
        }

        let p = collector.percentiles();
        assert_eq!(p.count, 4);
        // A zero latency is recorded as 1 ms
        assert_eq!(p.min, 1);
        assert!(p.max >= 30);
    }
}
