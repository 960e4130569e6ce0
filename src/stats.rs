use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;

/// What a single delivery attempt contributed to the counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum AttemptOutcome {
    /// Receiver answered 200.
    Delivered,
    /// Failed, another attempt follows.
    Retrying,
    /// Failed, no attempts left.
    Exhausted,
    /// Failed single diagnostic attempt; no retry accounting.
    ProbeFailed,
}

/// Process-wide delivery counters.
///
/// Updated concurrently by every delivery task, so all increments are
/// atomic. Never reset.
#[derive(Debug, Default)]
pub struct DeliveryStats {
    total_sent: AtomicU64,
    successful: AtomicU64,
    failed: AtomicU64,
    retries: AtomicU64,
}

impl DeliveryStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn record(&self, outcome: AttemptOutcome) {
        self.total_sent.fetch_add(1, Ordering::Release);
        match outcome {
            AttemptOutcome::Delivered => {
                self.successful.fetch_add(1, Ordering::Release);
            }
            AttemptOutcome::Retrying => {
                self.retries.fetch_add(1, Ordering::Release);
            }
            AttemptOutcome::Exhausted => {
                self.failed.fetch_add(1, Ordering::Release);
            }
            AttemptOutcome::ProbeFailed => {}
        }
    }

    /// Outcome counters are loaded before `total_sent`, which `record`
    /// bumps first, so a snapshot never shows more outcomes than attempts.
    pub fn counters(&self) -> DeliveryCounters {
        let successful = self.successful.load(Ordering::Acquire);
        let failed = self.failed.load(Ordering::Acquire);
        let retries = self.retries.load(Ordering::Acquire);
        DeliveryCounters {
            total_sent: self.total_sent.load(Ordering::Acquire),
            successful,
            failed,
            retries,
        }
    }
}

/// Point-in-time copy of the delivery counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct DeliveryCounters {
    pub total_sent: u64,
    pub successful: u64,
    pub failed: u64,
    pub retries: u64,
}

impl DeliveryCounters {
    /// Percentage of attempts answered with 200, or 0 before any attempt.
    pub fn success_rate(&self) -> f64 {
        if self.total_sent == 0 {
            return 0.0;
        }
        (self.successful as f64 / self.total_sent as f64 * 100.0).min(100.0)
    }
}

/// Registry population at snapshot time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct EndpointCounts {
    pub total: usize,
    pub enabled: usize,
    pub disabled: usize,
}

/// Read-only view returned by `Dispatcher::stats`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct StatsSnapshot {
    pub endpoints: EndpointCounts,
    pub delivery: DeliveryCounters,
    pub success_rate: f64,
}

impl StatsSnapshot {
    pub(crate) fn new(endpoints: EndpointCounts, delivery: DeliveryCounters) -> Self {
        Self {
            endpoints,
            delivery,
            success_rate: delivery.success_rate(),
        }
    }
}
