//! # Service Error Type
//!
//! Unified error type for back-office operations.
//!
//! ## Error Handling Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │                  Error Flow in the Back-Office                      │
//! │                                                                     │
//! │  HTTP layer (external)            This workspace                    │
//! │  ──────────────────────           ──────────────                    │
//! │                                                                     │
//! │  POST /orders/:id/payments                                          │
//! │         │                                                           │
//! │         ▼                                                           │
//! │  ┌──────────────────────────────────────────────────────────────┐   │
//! │  │  PaymentService::record_order_payment                        │   │
//! │  │  Result<T, ServiceError>                                     │   │
//! │  │         │                                                    │   │
//! │  │  StoreError::Domain(OrderFullyPaid) ──► ORDER_FULLY_PAID ───►│   │
//! │  │  StoreError::QueryFailed(..)        ──► DATABASE_ERROR ─────►│   │
//! │  │  ValidationError::Precision..       ──► VALIDATION_ERROR ───►│   │
//! │  └──────────────────────────────────────────────────────────────┘   │
//! │                                                                     │
//! │  Serialized as { "code": "...", "message": "..." }                  │
//! └─────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Infrastructure failures are logged with their real cause and
//! surfaced with a generic message; business rejections keep their
//! precise, user-explainable message.

use serde::Serialize;

use karat_core::{CoreError, ValidationError};
use karat_store::StoreError;

/// Error returned from back-office service operations.
///
/// ## Serialization
/// ```json
/// { "code": "PAYMENT_EXCEEDS_BALANCE",
///   "message": "Payment of ₹6001.00 exceeds pending balance ₹6000.00 on order SO-1001" }
/// ```
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceError {
    /// Machine-readable error code for programmatic handling
    pub code: ErrorCode,

    /// Human-readable error message for display
    pub message: String,
}

/// Error codes for service responses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    /// Resource not found (404)
    NotFound,

    /// Input validation failed (400)
    ValidationError,

    /// The session's role lacks the permission (403)
    PermissionDenied,

    /// No current rate for the metal/purity pair (422)
    RateUnavailable,

    /// Reservation race or already-sold item (409)
    StockUnavailable,

    /// Order has no pending balance (422)
    OrderFullyPaid,

    /// Payment larger than the pending balance (422)
    PaymentExceedsBalance,

    /// Other business rule rejection (422)
    BusinessRule,

    /// Database operation failed (500)
    DatabaseError,

    /// Internal error (500)
    Internal,
}

impl ServiceError {
    /// Creates a new service error.
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        ServiceError {
            code,
            message: message.into(),
        }
    }

    /// Creates a not found error.
    pub fn not_found(resource: &str, id: &str) -> Self {
        ServiceError::new(ErrorCode::NotFound, format!("{} not found: {}", resource, id))
    }

    /// Creates a validation error.
    pub fn validation(message: impl Into<String>) -> Self {
        ServiceError::new(ErrorCode::ValidationError, message)
    }

    /// Creates an internal error.
    pub fn internal(message: impl Into<String>) -> Self {
        ServiceError::new(ErrorCode::Internal, message)
    }
}

/// Converts core errors to service errors.
impl From<CoreError> for ServiceError {
    fn from(err: CoreError) -> Self {
        let code = match &err {
            CoreError::RateNotFound { .. } => ErrorCode::RateUnavailable,
            CoreError::StockItemUnavailable { .. } => ErrorCode::StockUnavailable,
            CoreError::OrderFullyPaid { .. } => ErrorCode::OrderFullyPaid,
            CoreError::PaymentExceedsBalance { .. } => ErrorCode::PaymentExceedsBalance,
            CoreError::InstallmentOverpay { .. } | CoreError::InvalidOrderStatus { .. } => {
                ErrorCode::BusinessRule
            }
            CoreError::PermissionDenied { .. } => ErrorCode::PermissionDenied,
            CoreError::StockItemNotFound(_)
            | CoreError::OrderNotFound(_)
            | CoreError::PlanNotFound(_)
            | CoreError::InstallmentNotFound(_)
            | CoreError::ProductNotFound(_) => ErrorCode::NotFound,
            CoreError::Validation(_) => ErrorCode::ValidationError,
        };
        ServiceError::new(code, err.to_string())
    }
}

/// Converts validation errors to service errors.
impl From<ValidationError> for ServiceError {
    fn from(err: ValidationError) -> Self {
        ServiceError::validation(err.to_string())
    }
}

/// Converts store errors to service errors.
impl From<StoreError> for ServiceError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Domain(core) => core.into(),
            StoreError::NotFound { entity, id } => ServiceError::not_found(&entity, &id),
            StoreError::UniqueViolation { field, value } => ServiceError::new(
                ErrorCode::ValidationError,
                format!("{} '{}' already exists", field, value),
            ),
            StoreError::ForeignKeyViolation { message } => {
                tracing::error!("Foreign key violation: {}", message);
                ServiceError::new(ErrorCode::ValidationError, "Invalid reference")
            }
            StoreError::ConnectionFailed(_) => {
                ServiceError::new(ErrorCode::DatabaseError, "Database connection failed")
            }
            StoreError::MigrationFailed(_) => {
                ServiceError::new(ErrorCode::DatabaseError, "Database migration failed")
            }
            StoreError::QueryFailed(e) => {
                // Log the actual error but return a generic message
                tracing::error!("Database query failed: {}", e);
                ServiceError::new(ErrorCode::DatabaseError, "Database operation failed")
            }
            StoreError::PoolExhausted => {
                ServiceError::new(ErrorCode::DatabaseError, "Database pool exhausted")
            }
            StoreError::Internal(e) => {
                tracing::error!("Internal database error: {}", e);
                ServiceError::new(ErrorCode::DatabaseError, "Database operation failed")
            }
        }
    }
}

impl std::fmt::Display for ServiceError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{:?}] {}", self.code, self.message)
    }
}

impl std::error::Error for ServiceError {}

/// Result type for service operations.
pub type ServiceResult<T> = Result<T, ServiceError>;

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use karat_core::Money;

    #[test]
    fn test_domain_errors_keep_their_codes() {
        let err: ServiceError = StoreError::Domain(CoreError::OrderFullyPaid {
            order_id: "o-1".to_string(),
        })
        .into();
        assert_eq!(err.code, ErrorCode::OrderFullyPaid);

        let err: ServiceError = StoreError::Domain(CoreError::PaymentExceedsBalance {
            order_id: "o-1".to_string(),
            amount: Money::from_paise(200),
            pending: Money::from_paise(100),
        })
        .into();
        assert_eq!(err.code, ErrorCode::PaymentExceedsBalance);
        assert!(err.message.contains("₹2.00"));
    }

    #[test]
    fn test_infrastructure_errors_get_generic_messages() {
        let err: ServiceError = StoreError::QueryFailed("secret table names".to_string()).into();
        assert_eq!(err.code, ErrorCode::DatabaseError);
        assert!(!err.message.contains("secret"));
    }
}
