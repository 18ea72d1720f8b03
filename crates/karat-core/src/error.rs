//! # Error Types
//!
//! Domain-specific error types for karat-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                 │
//! │                                                                     │
//! │  karat-core errors (this file)                                      │
//! │  ├── CoreError        - Business rule violations                    │
//! │  └── ValidationError  - Input validation failures                   │
//! │                                                                     │
//! │  karat-store errors (separate crate)                                │
//! │  └── StoreError       - Database operation failures                 │
//! │                                                                     │
//! │  karat-backoffice errors (separate crate)                           │
//! │  └── ServiceError     - What the caller sees (serialized)           │
//! │                                                                     │
//! │  Flow: ValidationError → CoreError → StoreError → ServiceError      │
//! └─────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Design Principles
//! 1. Use `thiserror` for derive macros (not manual impl)
//! 2. Include context in error messages (tag id, order id, amounts)
//! 3. Errors are enum variants, never String
//! 4. Rejections never clamp: an overpay fails loudly instead of being
//!    silently truncated to the pending balance

use thiserror::Error;

use crate::auth::{Permission, Role};
use crate::money::Money;
use crate::types::StockStatus;

// =============================================================================
// Core Error
// =============================================================================

/// Core business logic errors.
///
/// These represent business rule violations or domain logic failures.
/// They should be caught and translated to user-facing messages.
#[derive(Debug, Error)]
pub enum CoreError {
    /// No current rate exists for the metal/purity pair.
    ///
    /// Pricing flows must treat this as a hard stop, never as a
    /// default-to-zero rate.
    #[error("No current rate for {metal_type}/{purity}")]
    RateNotFound { metal_type: String, purity: String },

    /// Stock item cannot be found.
    #[error("Stock item not found: {0}")]
    StockItemNotFound(String),

    /// Stock item exists but is not available for reservation.
    ///
    /// ## When This Occurs
    /// - A concurrent request reserved the item first
    /// - The item was already sold
    #[error("Stock item {tag_id} is {status:?}, not available")]
    StockItemUnavailable { tag_id: String, status: StockStatus },

    /// Sales order cannot be found.
    #[error("Sales order not found: {0}")]
    OrderNotFound(String),

    /// Order is not in a state that allows the requested operation.
    ///
    /// ## When This Occurs
    /// - Recording a payment against a cancelled order
    /// - Adding a line to a completed order
    /// - Cancelling an already cancelled order
    #[error("Order {order_id} is {status}, cannot perform operation")]
    InvalidOrderStatus { order_id: String, status: String },

    /// Order has no pending balance left to pay.
    #[error("Order {order_id} is already fully paid")]
    OrderFullyPaid { order_id: String },

    /// Payment is larger than the order's pending balance.
    #[error("Payment of {amount} exceeds pending balance {pending} on order {order_id}")]
    PaymentExceedsBalance {
        order_id: String,
        amount: Money,
        pending: Money,
    },

    /// EMI plan cannot be found.
    #[error("EMI plan not found: {0}")]
    PlanNotFound(String),

    /// Installment cannot be found on the plan.
    #[error("Installment not found: {0}")]
    InstallmentNotFound(String),

    /// Payment is larger than the installment's remaining balance.
    #[error("Payment of {amount} exceeds remaining {remaining} on installment {installment_id}")]
    InstallmentOverpay {
        installment_id: String,
        amount: Money,
        remaining: Money,
    },

    /// Product cannot be found.
    #[error("Product not found: {0}")]
    ProductNotFound(String),

    /// The session's role does not grant the required permission.
    #[error("Role {role:?} is not permitted to {permission:?}")]
    PermissionDenied { role: Role, permission: Permission },

    /// Validation error (wraps ValidationError).
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
}

// =============================================================================
// Validation Error
// =============================================================================

/// Input validation errors.
///
/// These occur when caller input doesn't meet requirements. Used for
/// early validation before business logic runs.
#[derive(Debug, Error)]
pub enum ValidationError {
    /// A required field is missing or empty.
    #[error("{field} is required")]
    Required { field: String },

    /// Field value is too long.
    #[error("{field} must be at most {max} characters")]
    TooLong { field: String, max: usize },

    /// Numeric value is out of range.
    #[error("{field} must be between {min} and {max}")]
    OutOfRange { field: String, min: i64, max: i64 },

    /// Value must be strictly positive.
    #[error("{field} must be positive")]
    MustBePositive { field: String },

    /// Value must be zero or greater.
    #[error("{field} must not be negative")]
    MustBeNonNegative { field: String },

    /// Decimal input carries more fractional digits than the schema
    /// allows (2 for money, 3 for weight).
    #[error("{field} allows at most {max_places} decimal places")]
    PrecisionExceeded { field: String, max_places: u32 },

    /// Invalid format (e.g., not a decimal number, invalid UUID).
    #[error("{field} has invalid format: {reason}")]
    InvalidFormat { field: String, reason: String },

    /// Duplicate value (e.g., duplicate tag id).
    #[error("{field} '{value}' already exists")]
    Duplicate { field: String, value: String },
}

// =============================================================================
// Result Type Aliases
// =============================================================================

/// Convenience type alias for Results with CoreError.
pub type CoreResult<T> = Result<T, CoreError>;

/// Convenience type alias for Results with ValidationError.
pub type ValidationResult<T> = Result<T, ValidationError>;

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let err = CoreError::PaymentExceedsBalance {
            order_id: "SO-1001".to_string(),
            amount: Money::from_paise(600_100),
            pending: Money::from_paise(600_000),
        };
        assert_eq!(
            err.to_string(),
            "Payment of ₹6001.00 exceeds pending balance ₹6000.00 on order SO-1001"
        );

        let err = CoreError::RateNotFound {
            metal_type: "gold".to_string(),
            purity: "22K".to_string(),
        };
        assert_eq!(err.to_string(), "No current rate for gold/22K");
    }

    #[test]
    fn test_validation_error_messages() {
        let err = ValidationError::PrecisionExceeded {
            field: "amount".to_string(),
            max_places: 2,
        };
        assert_eq!(err.to_string(), "amount allows at most 2 decimal places");
    }

    #[test]
    fn test_validation_converts_to_core_error() {
        let validation_err = ValidationError::Required {
            field: "tag_id".to_string(),
        };
        let core_err: CoreError = validation_err.into();
        assert!(matches!(core_err, CoreError::Validation(_)));
    }
}
