//! # karat-core: Pure Business Logic for the Karat Back-Office
//!
//! This crate is the heart of the Karat jewelry retail back-office. It
//! contains all business logic as pure functions with zero I/O
//! dependencies.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │                       Karat Architecture                            │
//! │                                                                     │
//! │  ┌─────────────────────────────────────────────────────────────┐    │
//! │  │                External HTTP / UI layer                     │    │
//! │  │                  (not in this repo)                         │    │
//! │  └────────────────────────────┬────────────────────────────────┘    │
//! │                               │                                     │
//! │  ┌────────────────────────────▼────────────────────────────────┐    │
//! │  │                   karat-backoffice                          │    │
//! │  │    pricing, stock, payments, EMI services + authz/audit     │    │
//! │  └────────────────────────────┬────────────────────────────────┘    │
//! │                               │                                     │
//! │  ┌────────────────────────────▼────────────────────────────────┐    │
//! │  │              ★ karat-core (THIS CRATE) ★                    │    │
//! │  │                                                             │    │
//! │  │   ┌─────────┐ ┌─────────┐ ┌─────────┐ ┌─────────┐           │    │
//! │  │   │  money  │ │ pricing │ │   emi   │ │  auth   │           │    │
//! │  │   │ Weight  │ │ calc    │ │ schedule│ │ roles   │           │    │
//! │  │   │ Percent │ │ breakdown│ │ overdue │ │ perms  │           │    │
//! │  │   └─────────┘ └─────────┘ └─────────┘ └─────────┘           │    │
//! │  │                                                             │    │
//! │  │   NO I/O • NO DATABASE • NO CLOCK • PURE FUNCTIONS          │    │
//! │  └────────────────────────────┬────────────────────────────────┘    │
//! │                               │                                     │
//! │  ┌────────────────────────────▼────────────────────────────────┐    │
//! │  │                karat-store (Database Layer)                 │    │
//! │  │          SQLite queries, migrations, repositories           │    │
//! │  └─────────────────────────────────────────────────────────────┘    │
//! └─────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`types`] - Domain types (RateMaster, StockItem, SalesOrder, ...)
//! - [`money`] - Money/Weight/Percent fixed-point arithmetic
//! - [`pricing`] - The dynamic selling-price breakdown
//! - [`emi`] - Installment schedule generation and classification
//! - [`auth`] - Role capability sets and the authorize guard
//! - [`error`] - Domain error types
//! - [`validation`] - Input validation
//!
//! ## Design Principles
//!
//! 1. **Pure Functions**: deterministic, same input = same output
//! 2. **No I/O**: database, network, file system access is forbidden here
//! 3. **No ambient clock**: "now"/"today" is always an argument
//! 4. **Integer fixed-point**: paise, milligrams, basis points; no floats
//! 5. **Explicit Errors**: all errors are typed, never strings or panics

// =============================================================================
// Module Declarations
// =============================================================================

pub mod auth;
pub mod emi;
pub mod error;
pub mod money;
pub mod pricing;
pub mod types;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================
// Allow users to write `use karat_core::Money` instead of
// `use karat_core::money::Money`.

pub use auth::{authorize, Permission, Role, Session};
pub use error::{CoreError, CoreResult, ValidationError};
pub use money::{Money, Percent, Weight};
pub use pricing::{calculate_price, PriceBreakdown, PricingInput};
pub use types::*;

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Maximum EMI installments on a single plan.
///
/// ## Business Reason
/// Five years of monthly installments is the longest plan the shop
/// offers; anything larger is a data entry error.
pub const MAX_INSTALLMENT_COUNT: u32 = 60;

/// Maximum window accepted by the upcoming-installments query, in days.
///
/// ## Business Reason
/// The follow-up screens look at most one year ahead; an unbounded
/// window would drag the whole installment book into one response.
pub const MAX_UPCOMING_WINDOW_DAYS: i64 = 365;

/// Maximum wastage allowance in basis points (25%).
///
/// ## Business Reason
/// Hand-made pieces rarely exceed single-digit wastage; 25% is already
/// generous and anything above it is a typo.
pub const MAX_WASTAGE_BPS: u32 = 2_500;
