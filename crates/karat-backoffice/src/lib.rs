//! # karat-backoffice: Service Layer for the Karat Back-Office
//!
//! The caller-facing operations the (external) HTTP layer consumes.
//!
//! ## Operation Map
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │                     Back-Office Operations                          │
//! │                                                                     │
//! │  RateService      publish_rate, current_rate                        │
//! │  PricingService   quote_product, quote_components                   │
//! │  OrderService     create_order, add_line, complete_order            │
//! │  StockService     receive_item, reserve_item, release_order         │
//! │  PaymentService   record_order_payment, record_installment_payment  │
//! │  EmiService       open_plan, mark_overdue_installments,             │
//! │                   upcoming_installments                             │
//! │                                                                     │
//! │  Every operation: authorize(session, permission)                    │
//! │                   → store/core work                                 │
//! │                   → best-effort audit + metrics                     │
//! └─────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Boundary Rules
//! - Money crosses as decimal strings with at most 2 places, weight
//!   with at most 3; anything finer is rejected, never rounded.
//! - Business rejections keep precise messages and machine codes;
//!   infrastructure failures are logged and surfaced generically.
//! - Audit writes and metrics are side channels: they never fail the
//!   primary operation.

// =============================================================================
// Module Declarations
// =============================================================================

mod audit;
pub mod config;
pub mod error;
pub mod metrics;
pub mod services;
pub mod telemetry;

// =============================================================================
// Re-exports
// =============================================================================

pub use config::{BackofficeConfig, ConfigError};
pub use error::{ErrorCode, ServiceError, ServiceResult};
pub use metrics::{InMemoryMetrics, MetricsSink, NoopMetrics};

pub use services::emi::EmiService;
pub use services::orders::OrderService;
pub use services::payments::PaymentService;
pub use services::pricing::PricingService;
pub use services::rates::RateService;
pub use services::stock::StockService;

use std::sync::Arc;

use karat_core::MAX_UPCOMING_WINDOW_DAYS;
use karat_store::Store;

// =============================================================================
// Facade
// =============================================================================

/// Bundles the store and the injected sinks, handing out services.
///
/// ## Usage
/// ```rust,ignore
/// let store = Store::new(StoreConfig::new(&config.database_path)).await?;
/// let backoffice = Backoffice::new(store);
///
/// let session = Session::new("u-1", Role::Manager);
/// let quote = backoffice.pricing().quote_product(&session, &id).await?;
/// ```
#[derive(Clone)]
pub struct Backoffice {
    store: Store,
    metrics: Arc<dyn MetricsSink>,
    upcoming_window_cap_days: i64,
}

impl Backoffice {
    /// Creates a back office with a no-op metrics sink.
    pub fn new(store: Store) -> Self {
        Backoffice {
            store,
            metrics: Arc::new(NoopMetrics),
            upcoming_window_cap_days: MAX_UPCOMING_WINDOW_DAYS,
        }
    }

    /// Creates a back office with an injected metrics sink.
    pub fn with_metrics(store: Store, metrics: Arc<dyn MetricsSink>) -> Self {
        Backoffice {
            store,
            metrics,
            upcoming_window_cap_days: MAX_UPCOMING_WINDOW_DAYS,
        }
    }

    /// Applies configuration knobs (window caps) from [`BackofficeConfig`].
    pub fn with_config(mut self, config: &BackofficeConfig) -> Self {
        self.upcoming_window_cap_days = config.upcoming_window_cap_days;
        self
    }

    /// Direct store access, for embedding processes and tests.
    pub fn store(&self) -> &Store {
        &self.store
    }

    /// Returns the rate service.
    pub fn rates(&self) -> RateService {
        RateService::new(self.store.clone(), self.metrics.clone())
    }

    /// Returns the pricing service.
    pub fn pricing(&self) -> PricingService {
        PricingService::new(self.store.clone(), self.metrics.clone())
    }

    /// Returns the order service.
    pub fn orders(&self) -> OrderService {
        OrderService::new(self.store.clone(), self.metrics.clone())
    }

    /// Returns the stock service.
    pub fn stock(&self) -> StockService {
        StockService::new(self.store.clone(), self.metrics.clone())
    }

    /// Returns the payment service.
    pub fn payments(&self) -> PaymentService {
        PaymentService::new(self.store.clone(), self.metrics.clone())
    }

    /// Returns the EMI service.
    pub fn emi(&self) -> EmiService {
        EmiService::new(
            self.store.clone(),
            self.metrics.clone(),
            self.upcoming_window_cap_days,
        )
    }
}
