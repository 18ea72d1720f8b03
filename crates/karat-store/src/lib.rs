//! # karat-store: Database Layer for the Karat Back-Office
//!
//! Persistence for the Karat back-office over SQLite with sqlx.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │                        Karat Data Flow                              │
//! │                                                                     │
//! │  karat-backoffice service call                                      │
//! │       │                                                             │
//! │       ▼                                                             │
//! │  ┌─────────────────────────────────────────────────────────────┐    │
//! │  │                  karat-store (THIS CRATE)                   │    │
//! │  │                                                             │    │
//! │  │   ┌────────────┐   ┌───────────────┐   ┌───────────────┐    │    │
//! │  │   │   Store    │   │ Repositories  │   │  Migrations   │    │    │
//! │  │   │ (pool.rs)  │◄──│ rate, stock,  │   │  (embedded)   │    │    │
//! │  │   │ SqlitePool │   │ order, emi,   │   │ 001_initial…  │    │    │
//! │  │   │ WAL mode   │   │ ledger, audit │   │               │    │    │
//! │  │   └────────────┘   └───────────────┘   └───────────────┘    │    │
//! │  └─────────────────────────────────────────────────────────────┘    │
//! │       │                                                             │
//! │       ▼                                                             │
//! │  SQLite database file (or :memory: in tests)                        │
//! └─────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Organization
//!
//! - [`pool`] - Connection pool creation and the [`Store`] handle
//! - [`migrations`] - Embedded database migrations
//! - [`error`] - Store error types
//! - [`repository`] - Repository implementations per aggregate
//!
//! ## Transaction Discipline
//!
//! Every operation that mutates more than one row commits or rolls
//! back as a single unit: line add (reserve + line + totals), payment
//! recording (payment + roll-up + ledger), cancellation (release all +
//! order), plan opening (plan + installments). Business rejections
//! discovered mid-transaction surface as `StoreError::Domain` after a
//! full rollback.

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod migrations;
pub mod pool;
pub mod repository;

// =============================================================================
// Re-exports
// =============================================================================

pub use error::{StoreError, StoreResult};
pub use pool::{Store, StoreConfig};

// Repository re-exports for convenience
pub use repository::audit::{AuditRepository, NewAuditRecord};
pub use repository::emi::{EmiRepository, InstallmentPaymentOutcome};
pub use repository::ledger::LedgerRepository;
pub use repository::order::{OrderRepository, PaymentOutcome};
pub use repository::product::{NewProduct, ProductRepository, ReorderAlert};
pub use repository::rate::{NewRate, RateRepository};
pub use repository::stock::{NewStockItem, StockRepository};
