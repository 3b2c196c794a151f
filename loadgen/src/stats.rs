//! Pass/fail bookkeeping shared by all simulated users of a run.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::error::Failure;

/// Counters for a single request name.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RequestStats {
    /// Number of requests recorded, successful or not.
    pub requests: u64,
    /// Number of requests scored as failed.
    pub failures: u64,
    /// Failure counts keyed by their reason.
    pub reasons: BTreeMap<String, u64>,
}

impl RequestStats {
    /// Number of requests scored as successful.
    pub fn successes(&self) -> u64 {
        self.requests - self.failures
    }

    fn merge(&mut self, other: &RequestStats) {
        self.requests += other.requests;
        self.failures += other.failures;
        for (reason, count) in &other.reasons {
            *self.reasons.entry(reason.clone()).or_default() += count;
        }
    }
}

/// A cheaply cloneable sink for request outcomes.
///
/// Every simulated user holds a clone and records into the same counters.
#[derive(Clone, Debug, Default)]
pub struct Stats {
    inner: Arc<Mutex<BTreeMap<&'static str, RequestStats>>>,
}

impl Stats {
    /// Creates an empty sink.
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, BTreeMap<&'static str, RequestStats>> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Records one request outcome under `name`.
    pub fn record(&self, name: &'static str, outcome: &Result<(), Failure>) {
        let mut requests = self.lock();
        let entry = requests.entry(name).or_default();
        entry.requests += 1;
        if let Err(failure) = outcome {
            entry.failures += 1;
            *entry.reasons.entry(failure.to_string()).or_default() += 1;
        }
    }

    /// Returns the counters for `name`, or empty counters if nothing was recorded.
    pub fn get(&self, name: &str) -> RequestStats {
        self.lock().get(name).cloned().unwrap_or_default()
    }

    /// Returns a copy of all counters, sorted by request name.
    pub fn snapshot(&self) -> BTreeMap<&'static str, RequestStats> {
        self.lock().clone()
    }

    /// Sums the counters of all request names.
    pub fn total(&self) -> RequestStats {
        let mut total = RequestStats::default();
        for stats in self.lock().values() {
            total.merge(stats);
        }
        total
    }
}

#[cfg(test)]
mod tests {
    use reqwest::StatusCode;

    use super::*;

    #[test]
    fn counts_per_name_and_reason() {
        let stats = Stats::new();
        stats.record("Health Check", &Ok(()));
        stats.record(
            "Health Check",
            &Err(Failure::Status(StatusCode::SERVICE_UNAVAILABLE)),
        );
        stats.record(
            "Health Check",
            &Err(Failure::Status(StatusCode::SERVICE_UNAVAILABLE)),
        );
        stats.record("Add Product", &Err(Failure::MissingField("id")));

        let health = stats.get("Health Check");
        assert_eq!(health.requests, 3);
        assert_eq!(health.failures, 2);
        assert_eq!(health.successes(), 1);
        assert_eq!(health.reasons["unexpected status 503"], 2);

        let total = stats.total();
        assert_eq!(total.requests, 4);
        assert_eq!(total.failures, 3);
        assert_eq!(total.reasons.len(), 2);

        assert_eq!(stats.get("Delete Product"), RequestStats::default());
    }

    #[test]
    fn clones_share_counters() {
        let stats = Stats::new();
        let other = stats.clone();
        other.record("View Cart", &Ok(()));
        assert_eq!(stats.get("View Cart").requests, 1);
    }
}
