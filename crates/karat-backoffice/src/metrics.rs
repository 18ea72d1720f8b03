//! # Metrics Sink
//!
//! Injected observability interface. Services take an `Arc<dyn
//! MetricsSink>` at construction; there is deliberately no process-wide
//! metrics singleton, so two back-office instances in one process (or
//! one in a test) never share counters.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// A counter sink for service-level events.
///
/// Implementations must be cheap and infallible: metrics are a side
/// channel and must never affect the primary operation.
pub trait MetricsSink: Send + Sync {
    /// Increments a named counter by one.
    fn incr(&self, counter: &'static str);
}

/// Discards everything. The default when no sink is injected.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopMetrics;

impl MetricsSink for NoopMetrics {
    fn incr(&self, _counter: &'static str) {}
}

/// In-memory counters, mainly for tests and diagnostics endpoints.
#[derive(Debug, Default)]
pub struct InMemoryMetrics {
    counters: std::sync::Mutex<std::collections::HashMap<&'static str, Arc<AtomicU64>>>,
}

impl InMemoryMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current value of a counter (zero if never incremented).
    pub fn get(&self, counter: &'static str) -> u64 {
        self.counters
            .lock()
            .ok()
            .and_then(|map| map.get(counter).map(|c| c.load(Ordering::Relaxed)))
            .unwrap_or(0)
    }
}

impl MetricsSink for InMemoryMetrics {
    fn incr(&self, counter: &'static str) {
        if let Ok(mut map) = self.counters.lock() {
            map.entry(counter)
                .or_insert_with(|| Arc::new(AtomicU64::new(0)))
                .fetch_add(1, Ordering::Relaxed);
        }
    }
}

// =============================================================================
// Counter Names
// =============================================================================

pub mod counters {
    //! Counter names used by the services, kept in one place so
    //! dashboards and tests do not chase string literals.

    pub const RATES_PUBLISHED: &str = "karat.rates.published";
    pub const QUOTES_PRICED: &str = "karat.pricing.quotes";
    pub const ITEMS_RESERVED: &str = "karat.stock.reserved";
    pub const ORDERS_RELEASED: &str = "karat.stock.orders_released";
    pub const PAYMENTS_RECORDED: &str = "karat.payments.recorded";
    pub const PAYMENTS_REPLAYED: &str = "karat.payments.replayed";
    pub const PAYMENTS_REJECTED: &str = "karat.payments.rejected";
    pub const PLANS_OPENED: &str = "karat.emi.plans_opened";
    pub const INSTALLMENTS_MARKED_OVERDUE: &str = "karat.emi.marked_overdue";
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_in_memory_counts() {
        let metrics = InMemoryMetrics::new();
        assert_eq!(metrics.get(counters::PAYMENTS_RECORDED), 0);

        metrics.incr(counters::PAYMENTS_RECORDED);
        metrics.incr(counters::PAYMENTS_RECORDED);
        metrics.incr(counters::PAYMENTS_REPLAYED);

        assert_eq!(metrics.get(counters::PAYMENTS_RECORDED), 2);
        assert_eq!(metrics.get(counters::PAYMENTS_REPLAYED), 1);
    }

    #[test]
    fn test_noop_is_silent() {
        NoopMetrics.incr(counters::QUOTES_PRICED);
    }
}
