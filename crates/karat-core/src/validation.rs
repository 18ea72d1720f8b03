//! # Validation Module
//!
//! Input validation for back-office operations.
//!
//! Validation runs at the service boundary, before business logic, so
//! repositories can assume well-formed input. The database still
//! enforces its own constraints (NOT NULL, UNIQUE, CHECK) as the last
//! line of defense.

use crate::error::{ValidationError, ValidationResult};
use crate::money::Money;
use crate::{MAX_INSTALLMENT_COUNT, MAX_UPCOMING_WINDOW_DAYS, MAX_WASTAGE_BPS};

// =============================================================================
// String Validators
// =============================================================================

/// Validates a stock tag id.
///
/// ## Rules
/// - Must not be empty
/// - At most 50 characters
/// - Alphanumeric, hyphens and underscores only
///
/// ## Example
/// ```rust
/// use karat_core::validation::validate_tag_id;
///
/// assert!(validate_tag_id("TAG-22K-0042").is_ok());
/// assert!(validate_tag_id("").is_err());
/// assert!(validate_tag_id("has space").is_err());
/// ```
pub fn validate_tag_id(tag_id: &str) -> ValidationResult<()> {
    let tag_id = tag_id.trim();

    if tag_id.is_empty() {
        return Err(ValidationError::Required {
            field: "tag_id".to_string(),
        });
    }

    if tag_id.len() > 50 {
        return Err(ValidationError::TooLong {
            field: "tag_id".to_string(),
            max: 50,
        });
    }

    if !tag_id
        .chars()
        .all(|c| c.is_alphanumeric() || c == '-' || c == '_')
    {
        return Err(ValidationError::InvalidFormat {
            field: "tag_id".to_string(),
            reason: "must contain only letters, numbers, hyphens, and underscores".to_string(),
        });
    }

    Ok(())
}

/// Validates a SKU. Same shape as tag ids.
pub fn validate_sku(sku: &str) -> ValidationResult<()> {
    let sku = sku.trim();

    if sku.is_empty() {
        return Err(ValidationError::Required {
            field: "sku".to_string(),
        });
    }

    if sku.len() > 50 {
        return Err(ValidationError::TooLong {
            field: "sku".to_string(),
            max: 50,
        });
    }

    if !sku
        .chars()
        .all(|c| c.is_alphanumeric() || c == '-' || c == '_')
    {
        return Err(ValidationError::InvalidFormat {
            field: "sku".to_string(),
            reason: "must contain only letters, numbers, hyphens, and underscores".to_string(),
        });
    }

    Ok(())
}

/// Validates a purity grade, e.g. "22K", "24K", "925", "PT950".
pub fn validate_purity(purity: &str) -> ValidationResult<()> {
    let purity = purity.trim();

    if purity.is_empty() {
        return Err(ValidationError::Required {
            field: "purity".to_string(),
        });
    }

    if purity.len() > 16 {
        return Err(ValidationError::TooLong {
            field: "purity".to_string(),
            max: 16,
        });
    }

    if !purity.chars().all(|c| c.is_ascii_alphanumeric()) {
        return Err(ValidationError::InvalidFormat {
            field: "purity".to_string(),
            reason: "must contain only letters and digits".to_string(),
        });
    }

    Ok(())
}

/// Validates a UUID string format.
pub fn validate_uuid(id: &str) -> ValidationResult<()> {
    if id.trim().is_empty() {
        return Err(ValidationError::Required {
            field: "id".to_string(),
        });
    }

    uuid::Uuid::parse_str(id).map_err(|_| ValidationError::InvalidFormat {
        field: "id".to_string(),
        reason: "must be a valid UUID".to_string(),
    })?;

    Ok(())
}

// =============================================================================
// Numeric Validators
// =============================================================================

/// Validates a payment amount: strictly positive.
pub fn validate_payment_amount(amount: Money) -> ValidationResult<()> {
    if !amount.is_positive() {
        return Err(ValidationError::MustBePositive {
            field: "payment amount".to_string(),
        });
    }
    Ok(())
}

/// Validates a monetary amount that may be zero but not negative
/// (discounts, making charges, stone values).
pub fn validate_non_negative_amount(field: &str, amount: Money) -> ValidationResult<()> {
    if amount.is_negative() {
        return Err(ValidationError::MustBeNonNegative {
            field: field.to_string(),
        });
    }
    Ok(())
}

/// Validates a wastage allowance in basis points.
///
/// Trade practice tops out well below 100%; anything above is a data
/// entry error.
pub fn validate_wastage_bps(bps: u32) -> ValidationResult<()> {
    if bps > MAX_WASTAGE_BPS {
        return Err(ValidationError::OutOfRange {
            field: "wastage".to_string(),
            min: 0,
            max: MAX_WASTAGE_BPS as i64,
        });
    }
    Ok(())
}

/// Validates an EMI installment count.
pub fn validate_installment_count(months: u32) -> ValidationResult<()> {
    if months == 0 || months > MAX_INSTALLMENT_COUNT {
        return Err(ValidationError::OutOfRange {
            field: "installment_count".to_string(),
            min: 1,
            max: MAX_INSTALLMENT_COUNT as i64,
        });
    }
    Ok(())
}

/// Validates an upcoming-installments window in days.
pub fn validate_window_days(days: i64) -> ValidationResult<()> {
    if days < 1 || days > MAX_UPCOMING_WINDOW_DAYS {
        return Err(ValidationError::OutOfRange {
            field: "days".to_string(),
            min: 1,
            max: MAX_UPCOMING_WINDOW_DAYS,
        });
    }
    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_tag_id() {
        assert!(validate_tag_id("TAG-22K-0042").is_ok());
        assert!(validate_tag_id("ring_001").is_ok());

        assert!(validate_tag_id("").is_err());
        assert!(validate_tag_id("   ").is_err());
        assert!(validate_tag_id("has space").is_err());
        assert!(validate_tag_id(&"A".repeat(60)).is_err());
    }

    #[test]
    fn test_validate_purity() {
        assert!(validate_purity("22K").is_ok());
        assert!(validate_purity("925").is_ok());
        assert!(validate_purity("PT950").is_ok());

        assert!(validate_purity("").is_err());
        assert!(validate_purity("22 K").is_err());
        assert!(validate_purity(&"9".repeat(20)).is_err());
    }

    #[test]
    fn test_validate_payment_amount() {
        assert!(validate_payment_amount(Money::from_paise(1)).is_ok());
        assert!(validate_payment_amount(Money::zero()).is_err());
        assert!(validate_payment_amount(Money::from_paise(-100)).is_err());
    }

    #[test]
    fn test_validate_wastage() {
        assert!(validate_wastage_bps(0).is_ok());
        assert!(validate_wastage_bps(200).is_ok());
        assert!(validate_wastage_bps(MAX_WASTAGE_BPS).is_ok());
        assert!(validate_wastage_bps(MAX_WASTAGE_BPS + 1).is_err());
    }

    #[test]
    fn test_validate_installment_count() {
        assert!(validate_installment_count(1).is_ok());
        assert!(validate_installment_count(12).is_ok());
        assert!(validate_installment_count(0).is_err());
        assert!(validate_installment_count(MAX_INSTALLMENT_COUNT + 1).is_err());
    }

    #[test]
    fn test_validate_window_days() {
        assert!(validate_window_days(7).is_ok());
        assert!(validate_window_days(0).is_err());
        assert!(validate_window_days(MAX_UPCOMING_WINDOW_DAYS + 1).is_err());
    }

    #[test]
    fn test_validate_uuid() {
        assert!(validate_uuid("550e8400-e29b-41d4-a716-446655440000").is_ok());
        assert!(validate_uuid("").is_err());
        assert!(validate_uuid("not-a-uuid").is_err());
    }
}
