//! # EMI Schedule Math
//!
//! Pure installment-schedule generation and classification.
//!
//! ## Schedule Shape
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │  Principal ₹100.00 over 3 months, plan starts 2026-01-31            │
//! │                                                                     │
//! │  #1  ₹33.33   due 2026-02-28   (month-end clamped)                  │
//! │  #2  ₹33.33   due 2026-03-31                                        │
//! │  #3  ₹33.34   due 2026-04-30   (absorbs the rounding remainder)     │
//! │                                                                     │
//! │  Sum of installments == principal, always.                          │
//! └─────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The overdue predicate lives on [`Installment::is_overdue`]
//! (crate::types); this module owns schedule generation and the status
//! derivation used when a payment lands on an installment.

use chrono::{Months, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::error::{ValidationError, ValidationResult};
use crate::money::Money;
use crate::types::{Installment, InstallmentStatus};
use crate::MAX_INSTALLMENT_COUNT;

// =============================================================================
// Schedule Generation
// =============================================================================

/// One row of a generated schedule, before persistence assigns ids.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScheduledInstallment {
    /// 1-based position in the schedule.
    pub seq_no: u32,
    pub amount: Money,
    pub due_date: NaiveDate,
}

/// Builds an equal-monthly schedule for `principal` over `months`
/// installments, the first falling one calendar month after
/// `start_date`.
///
/// ## Guarantees
/// - The amounts sum to exactly `principal`; the final installment
///   absorbs the integer-division remainder.
/// - Due dates advance by calendar month with end-of-month clamping
///   (a plan started Jan 31 is due Feb 28, Mar 31, Apr 30, ...).
///
/// ## Errors
/// - `months == 0` or beyond [`MAX_INSTALLMENT_COUNT`]
/// - non-positive principal
pub fn build_schedule(
    principal: Money,
    months: u32,
    start_date: NaiveDate,
) -> ValidationResult<Vec<ScheduledInstallment>> {
    if !principal.is_positive() {
        return Err(ValidationError::MustBePositive {
            field: "principal".to_string(),
        });
    }
    if months == 0 || months > MAX_INSTALLMENT_COUNT {
        return Err(ValidationError::OutOfRange {
            field: "installment_count".to_string(),
            min: 1,
            max: MAX_INSTALLMENT_COUNT as i64,
        });
    }

    let (monthly, last) =
        principal
            .split_equal(months)
            .ok_or_else(|| ValidationError::OutOfRange {
                field: "installment_count".to_string(),
                min: 1,
                max: MAX_INSTALLMENT_COUNT as i64,
            })?;

    let mut schedule = Vec::with_capacity(months as usize);
    for seq in 1..=months {
        let due_date = start_date
            .checked_add_months(Months::new(seq))
            .ok_or_else(|| ValidationError::InvalidFormat {
                field: "start_date".to_string(),
                reason: "due date out of calendar range".to_string(),
            })?;
        let amount = if seq == months { last } else { monthly };
        schedule.push(ScheduledInstallment {
            seq_no: seq,
            amount,
            due_date,
        });
    }

    Ok(schedule)
}

// =============================================================================
// Status Derivation
// =============================================================================

/// Derives an installment's status from its amounts and due date.
///
/// ## Rule
/// - fully paid                      → Paid
/// - unpaid/partial and past due     → Overdue
/// - partially paid, not past due    → Partial
/// - untouched, not past due         → Pending
pub fn installment_status(
    amount: Money,
    paid: Money,
    due_date: NaiveDate,
    today: NaiveDate,
) -> InstallmentStatus {
    if paid >= amount {
        InstallmentStatus::Paid
    } else if due_date < today {
        InstallmentStatus::Overdue
    } else if paid.is_positive() {
        InstallmentStatus::Partial
    } else {
        InstallmentStatus::Pending
    }
}

/// Groups installments by calendar due date, preserving date order.
///
/// The store returns upcoming installments as a flat, ordered list;
/// presentation wants them bucketed per day.
pub fn group_by_due_date(
    installments: Vec<Installment>,
) -> std::collections::BTreeMap<NaiveDate, Vec<Installment>> {
    let mut grouped: std::collections::BTreeMap<NaiveDate, Vec<Installment>> =
        std::collections::BTreeMap::new();
    for installment in installments {
        grouped.entry(installment.due_date).or_default().push(installment);
    }
    grouped
}

// =============================================================================
// Unit Tests
// =============================================================================
