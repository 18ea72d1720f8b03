//! # Pricing Calculator
//!
//! The dynamic selling-price breakdown for a jewelry piece.
//!
//! ## The Formula
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │              Selling Price of a Jewelry Piece                       │
//! │                                                                     │
//! │  net weight        10.000 g                                         │
//! │       │  × (1 + wastage 2%)                                         │
//! │       ▼                                                             │
//! │  effective weight  10.200 g            (rounded to 3 decimals)      │
//! │       │  × rate ₹6000.00/g                                          │
//! │       ▼                                                             │
//! │  metal amount      ₹61,200.00          (rounded to 2 decimals)      │
//! │       │  + making charges ₹500.00                                   │
//! │       │  + stone value    ₹0.00                                     │
//! │       ▼                                                             │
//! │  total price       ₹61,700.00                                       │
//! └─────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Purity (of the function, not the metal)
//! `calculate_price` reads no external state and performs no I/O. The
//! current rate is an argument, resolved by the store layer beforehand.
//! Prices are never persisted on catalog rows; they are recomputed at
//! read time so every quote reflects the live rate.

use serde::{Deserialize, Serialize};

use crate::error::{ValidationError, ValidationResult};
use crate::money::{Money, Percent, Weight};
use crate::types::Product;

// =============================================================================
// Input / Output
// =============================================================================

/// Inputs to the price calculation. All values must be non-negative.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct PricingInput {
    pub net_weight: Weight,
    pub wastage: Percent,
    pub rate_per_gram: Money,
    pub making_charges: Money,
    pub stone_value: Money,
}

/// The computed price breakdown.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriceBreakdown {
    /// Net weight plus wastage, at 3 decimal places.
    pub effective_weight: Weight,
    /// Effective weight times the per-gram rate, at 2 decimal places.
    pub metal_amount: Money,
    pub making_charges: Money,
    pub stone_value: Money,
    /// `metal_amount + making_charges + stone_value`.
    pub total: Money,
}

// =============================================================================
// Calculation
// =============================================================================

/// Computes the price breakdown for the given inputs.
///
/// Negative inputs are caller errors and are rejected, never clamped.
///
/// ## Example
/// ```rust
/// use karat_core::money::{Money, Percent, Weight};
/// use karat_core::pricing::{calculate_price, PricingInput};
///
/// let breakdown = calculate_price(&PricingInput {
///     net_weight: Weight::from_grams(10),
///     wastage: Percent::from_bps(200),          // 2%
///     rate_per_gram: Money::from_rupees(6_000),
///     making_charges: Money::from_rupees(500),
///     stone_value: Money::zero(),
/// })
/// .unwrap();
///
/// assert_eq!(breakdown.effective_weight.milligrams(), 10_200);
/// assert_eq!(breakdown.metal_amount.paise(), 6_120_000);
/// assert_eq!(breakdown.total.paise(), 6_170_000);
/// ```
pub fn calculate_price(input: &PricingInput) -> ValidationResult<PriceBreakdown> {
    validate_non_negative_weight("net_weight", input.net_weight)?;
    validate_non_negative_money("rate_per_gram", input.rate_per_gram)?;
    validate_non_negative_money("making_charges", input.making_charges)?;
    validate_non_negative_money("stone_value", input.stone_value)?;

    let effective_weight = input.net_weight.with_wastage(input.wastage);
    let metal_amount = effective_weight.times_rate(input.rate_per_gram);
    let total = metal_amount + input.making_charges + input.stone_value;

    Ok(PriceBreakdown {
        effective_weight,
        metal_amount,
        making_charges: input.making_charges,
        stone_value: input.stone_value,
        total,
    })
}

/// Builds the pricing input for a catalog product at a given rate.
///
/// When the product carries no flat making charge, the rate master's
/// default making-charge percentage is applied to the metal amount.
pub fn pricing_input_for_product(
    product: &Product,
    rate_per_gram: Money,
    default_making_charge: Percent,
) -> PricingInput {
    let making_charges = if product.making_charges().is_zero() {
        let effective = product.net_weight().with_wastage(product.wastage());
        effective.times_rate(rate_per_gram).apply_bps(default_making_charge)
    } else {
        product.making_charges()
    };

    PricingInput {
        net_weight: product.net_weight(),
        wastage: product.wastage(),
        rate_per_gram,
        making_charges,
        stone_value: product.stone_value(),
    }
}

fn validate_non_negative_money(field: &str, value: Money) -> ValidationResult<()> {
    if value.is_negative() {
        return Err(ValidationError::MustBeNonNegative {
            field: field.to_string(),
        });
    }
    Ok(())
}

fn validate_non_negative_weight(field: &str, value: Weight) -> ValidationResult<()> {
    if value.is_negative() {
        return Err(ValidationError::MustBeNonNegative {
            field: field.to_string(),
        });
    }
    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================
