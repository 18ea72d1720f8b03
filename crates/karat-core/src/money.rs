//! # Money, Weight and Percent
//!
//! Fixed-point numeric types used throughout the Karat back-office.
//!
//! ## Why Integer Representations?
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │  THE FLOATING POINT PROBLEM                                         │
//! │                                                                     │
//! │  In floating point:                                                 │
//! │    0.1 + 0.2 = 0.30000000000000004  ❌ WRONG!                       │
//! │                                                                     │
//! │  A jewelry invoice multiplies a 3-decimal weight by a per-gram      │
//! │  rate. One ulp of drift on a 61,200.00 invoice is a dispute.        │
//! │                                                                     │
//! │  OUR SOLUTION: integer minor units                                  │
//! │    Money  = paise      (1/100 rupee,  2 decimal places)             │
//! │    Weight = milligrams (1/1000 gram,  3 decimal places)             │
//! │    Percent = basis points (1/100 of a percent)                      │
//! │                                                                     │
//! └─────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Rounding Policy
//! Every operation that divides rounds half away from zero. For the
//! non-negative inputs the pricing flows permit, this is the same as the
//! classic round-half-up. The rounding happens once per derived figure
//! (effective weight, metal amount), never on intermediate products.
//!
//! ## Boundary Parsing
//! `parse_str` constructors accept decimal strings and reject excess
//! precision: `"61700.005"` is not a valid money amount and
//! `"10.2001"` is not a valid weight. Callers cannot smuggle sub-paise
//! or sub-milligram values across the service boundary.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{Add, AddAssign, Sub, SubAssign};

use crate::error::{ValidationError, ValidationResult};

/// Parses a fixed-point decimal string into an integer count of minor
/// units. `scale` is the number of decimal places the field allows.
fn parse_fixed(s: &str, field: &str, scale: u32) -> ValidationResult<i64> {
    let s = s.trim();
    let (negative, digits) = match s.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, s),
    };

    if digits.is_empty() {
        return Err(ValidationError::Required {
            field: field.to_string(),
        });
    }

    let (whole, frac) = match digits.split_once('.') {
        Some((w, f)) => (w, f),
        None => (digits, ""),
    };

    let well_formed = !whole.is_empty()
        && whole.chars().all(|c| c.is_ascii_digit())
        && frac.chars().all(|c| c.is_ascii_digit());
    if !well_formed {
        return Err(ValidationError::InvalidFormat {
            field: field.to_string(),
            reason: "must be a decimal number".to_string(),
        });
    }

    if frac.len() > scale as usize {
        return Err(ValidationError::PrecisionExceeded {
            field: field.to_string(),
            max_places: scale,
        });
    }

    let overflow = || ValidationError::InvalidFormat {
        field: field.to_string(),
        reason: "value out of range".to_string(),
    };

    let base: i64 = 10i64.pow(scale);
    let whole: i64 = whole.parse().map_err(|_| overflow())?;
    let frac_units: i64 = if frac.is_empty() {
        0
    } else {
        // Right-pad to the full scale: "2" at scale 2 means 20 paise.
        let padded: i64 = frac.parse().map_err(|_| overflow())?;
        padded * 10i64.pow(scale - frac.len() as u32)
    };

    let magnitude = whole
        .checked_mul(base)
        .and_then(|w| w.checked_add(frac_units))
        .ok_or_else(overflow)?;

    Ok(if negative { -magnitude } else { magnitude })
}

/// Divides with half-away-from-zero rounding, widening through i128 so
/// large rate × weight products cannot overflow.
fn div_round_half_away(numerator: i128, denominator: i128) -> i64 {
    let half = denominator / 2;
    let adjusted = if numerator >= 0 {
        numerator + half
    } else {
        numerator - half
    };
    (adjusted / denominator) as i64
}

// =============================================================================
// Money
// =============================================================================

/// A monetary value in paise (1/100 rupee).
///
/// ## Design Decisions
/// - **i64 (signed)**: allows negative values for adjustments and
///   expense ledger entries
/// - **Single field tuple struct**: zero-cost abstraction over i64
/// - There is deliberately no constructor from `f64`
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(transparent))]
pub struct Money(i64);

impl Money {
    /// Creates a Money value from paise (the smallest currency unit).
    #[inline]
    pub const fn from_paise(paise: i64) -> Self {
        Money(paise)
    }

    /// Creates a Money value from whole rupees.
    #[inline]
    pub const fn from_rupees(rupees: i64) -> Self {
        Money(rupees * 100)
    }

    /// Parses a decimal string with at most 2 fractional digits.
    ///
    /// ## Example
    /// ```rust
    /// use karat_core::money::Money;
    ///
    /// assert_eq!(Money::parse_str("61700.00").unwrap().paise(), 6_170_000);
    /// assert_eq!(Money::parse_str("500").unwrap().paise(), 50_000);
    /// assert!(Money::parse_str("1.005").is_err());
    /// ```
    pub fn parse_str(s: &str) -> ValidationResult<Self> {
        parse_fixed(s, "amount", 2).map(Money)
    }

    /// Returns the value in paise.
    #[inline]
    pub const fn paise(&self) -> i64 {
        self.0
    }

    /// Returns the whole-rupee portion.
    #[inline]
    pub const fn rupees(&self) -> i64 {
        self.0 / 100
    }

    /// Returns the paise portion (always 0-99).
    #[inline]
    pub const fn paise_part(&self) -> i64 {
        (self.0 % 100).abs()
    }

    /// Zero money value.
    #[inline]
    pub const fn zero() -> Self {
        Money(0)
    }

    /// Checks if the value is zero.
    #[inline]
    pub const fn is_zero(&self) -> bool {
        self.0 == 0
    }

    /// Checks if the value is strictly positive.
    #[inline]
    pub const fn is_positive(&self) -> bool {
        self.0 > 0
    }

    /// Checks if the value is negative.
    #[inline]
    pub const fn is_negative(&self) -> bool {
        self.0 < 0
    }

    /// Plain decimal rendering with exactly 2 fractional digits and no
    /// currency symbol, the inverse of [`Money::parse_str`]. This is
    /// the form money takes at the service boundary.
    pub fn to_decimal_string(&self) -> String {
        let sign = if self.0 < 0 { "-" } else { "" };
        format!("{}{}.{:02}", sign, self.rupees().abs(), self.paise_part())
    }

    /// Saturating subtraction that never goes below zero. Used for
    /// pending-balance arithmetic where the invariant `paid ≤ final`
    /// already holds but a defect must not manufacture a negative due.
    #[inline]
    pub fn remaining_after(&self, paid: Money) -> Money {
        Money((self.0 - paid.0).max(0))
    }

    /// Applies a basis-point fraction with half-away rounding.
    ///
    /// Used for percentage-based making charges: the rate master's
    /// `default_making_charge_bps` applied to the metal amount.
    ///
    /// ## Example
    /// ```rust
    /// use karat_core::money::{Money, Percent};
    ///
    /// let metal = Money::from_paise(6_120_000); // ₹61,200.00
    /// let charge = metal.apply_bps(Percent::from_bps(800)); // 8%
    /// assert_eq!(charge.paise(), 489_600); // ₹4,896.00
    /// ```
    pub fn apply_bps(&self, fraction: Percent) -> Money {
        Money(div_round_half_away(
            self.0 as i128 * fraction.bps() as i128,
            10_000,
        ))
    }

    /// Splits this amount into `parts` equal portions, folding the
    /// integer remainder into the last portion so the sum is exact.
    ///
    /// ## Example
    /// ```rust
    /// use karat_core::money::Money;
    ///
    /// let total = Money::from_paise(10_000);
    /// let (each, last) = total.split_equal(3).unwrap();
    /// assert_eq!(each.paise(), 3_333);
    /// assert_eq!(last.paise(), 3_334);
    /// ```
    pub fn split_equal(&self, parts: u32) -> Option<(Money, Money)> {
        if parts == 0 {
            return None;
        }
        let parts = parts as i64;
        let each = self.0 / parts;
        let last = self.0 - each * (parts - 1);
        Some((Money(each), Money(last)))
    }
}

/// Display implementation shows money in a human-readable format.
///
/// This is for logs and error messages. The UI layer owns localized
/// formatting.
impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        write!(f, "{}₹{}.{:02}", sign, self.rupees().abs(), self.paise_part())
    }
}

impl Add for Money {
    type Output = Self;

    #[inline]
    fn add(self, other: Self) -> Self {
        Money(self.0 + other.0)
    }
}

impl AddAssign for Money {
    #[inline]
    fn add_assign(&mut self, other: Self) {
        self.0 += other.0;
    }
}

impl Sub for Money {
    type Output = Self;

    #[inline]
    fn sub(self, other: Self) -> Self {
        Money(self.0 - other.0)
    }
}

impl SubAssign for Money {
    #[inline]
    fn sub_assign(&mut self, other: Self) {
        self.0 -= other.0;
    }
}

// =============================================================================
// Weight
// =============================================================================

/// A metal weight in milligrams (1/1000 gram).
///
/// Jewelry weights are quoted to 3 decimal places of a gram, so the
/// milligram is the natural integer unit.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(transparent))]
pub struct Weight(i64);

impl Weight {
    /// Creates a weight from milligrams.
    #[inline]
    pub const fn from_milligrams(mg: i64) -> Self {
        Weight(mg)
    }

    /// Creates a weight from whole grams.
    #[inline]
    pub const fn from_grams(grams: i64) -> Self {
        Weight(grams * 1_000)
    }

    /// Parses a decimal gram string with at most 3 fractional digits.
    ///
    /// ## Example
    /// ```rust
    /// use karat_core::money::Weight;
    ///
    /// assert_eq!(Weight::parse_str("10.200").unwrap().milligrams(), 10_200);
    /// assert!(Weight::parse_str("10.2001").is_err());
    /// ```
    pub fn parse_str(s: &str) -> ValidationResult<Self> {
        parse_fixed(s, "weight", 3).map(Weight)
    }

    /// Returns the weight in milligrams.
    #[inline]
    pub const fn milligrams(&self) -> i64 {
        self.0
    }

    /// Returns the whole-gram portion.
    #[inline]
    pub const fn grams(&self) -> i64 {
        self.0 / 1_000
    }

    /// Returns the milligram portion (always 0-999).
    #[inline]
    pub const fn milligrams_part(&self) -> i64 {
        (self.0 % 1_000).abs()
    }

    /// Zero weight.
    #[inline]
    pub const fn zero() -> Self {
        Weight(0)
    }

    /// Checks if the weight is negative.
    #[inline]
    pub const fn is_negative(&self) -> bool {
        self.0 < 0
    }

    /// Plain decimal rendering with exactly 3 fractional digits, the
    /// inverse of [`Weight::parse_str`].
    pub fn to_decimal_string(&self) -> String {
        let sign = if self.0 < 0 { "-" } else { "" };
        format!("{}{}.{:03}", sign, self.grams().abs(), self.milligrams_part())
    }

    /// Adds a wastage allowance: `weight * (1 + wastage/100)`, rounded
    /// half-away at the third decimal place.
    ///
    /// ## Example
    /// ```rust
    /// use karat_core::money::{Percent, Weight};
    ///
    /// let net = Weight::from_grams(10);
    /// let effective = net.with_wastage(Percent::from_bps(200)); // 2%
    /// assert_eq!(effective.milligrams(), 10_200);
    /// ```
    pub fn with_wastage(&self, wastage: Percent) -> Weight {
        Weight(div_round_half_away(
            self.0 as i128 * (10_000 + wastage.bps() as i128),
            10_000,
        ))
    }

    /// Multiplies this weight by a per-gram rate, rounded half-away to
    /// whole paise.
    ///
    /// ## Example
    /// ```rust
    /// use karat_core::money::{Money, Weight};
    ///
    /// let effective = Weight::from_milligrams(10_200);     // 10.200 g
    /// let rate = Money::from_rupees(6_000);                // per gram
    /// assert_eq!(effective.times_rate(rate).paise(), 6_120_000);
    /// ```
    pub fn times_rate(&self, rate_per_gram: Money) -> Money {
        Money::from_paise(div_round_half_away(
            self.0 as i128 * rate_per_gram.paise() as i128,
            1_000,
        ))
    }
}

/// Display shows grams with 3 decimal places, e.g. `10.200g`.
impl fmt::Display for Weight {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        write!(
            f,
            "{}{}.{:03}g",
            sign,
            self.grams().abs(),
            self.milligrams_part()
        )
    }
}

impl Add for Weight {
    type Output = Self;

    #[inline]
    fn add(self, other: Self) -> Self {
        Weight(self.0 + other.0)
    }
}

impl Sub for Weight {
    type Output = Self;

    #[inline]
    fn sub(self, other: Self) -> Self {
        Weight(self.0 - other.0)
    }
}

// =============================================================================
// Percent
// =============================================================================

/// A percentage in basis points (bps).
///
/// 1 basis point = 0.01% = 1/10000. A 2% wastage allowance is 200 bps;
/// an 8.25% making charge is 825 bps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(transparent))]
pub struct Percent(u32);

impl Percent {
    /// Creates a percentage from basis points.
    #[inline]
    pub const fn from_bps(bps: u32) -> Self {
        Percent(bps)
    }

    /// Parses a decimal percent string with at most 2 fractional
    /// digits, e.g. `"2.5"` → 250 bps. Negative percentages are
    /// rejected.
    pub fn parse_str(s: &str) -> ValidationResult<Self> {
        let units = parse_fixed(s, "percent", 2)?;
        if units < 0 {
            return Err(ValidationError::MustBeNonNegative {
                field: "percent".to_string(),
            });
        }
        Ok(Percent(units as u32))
    }

    /// Returns the value in basis points.
    #[inline]
    pub const fn bps(&self) -> u32 {
        self.0
    }

    /// Returns the value as a percentage (for display only).
    #[inline]
    pub fn percentage(&self) -> f64 {
        self.0 as f64 / 100.0
    }

    /// Zero percent.
    #[inline]
    pub const fn zero() -> Self {
        Percent(0)
    }

    /// Checks if the percentage is zero.
    #[inline]
    pub const fn is_zero(&self) -> bool {
        self.0 == 0
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_money_units() {
        let money = Money::from_paise(6_170_099);
        assert_eq!(money.paise(), 6_170_099);
        assert_eq!(money.rupees(), 61_700);
        assert_eq!(money.paise_part(), 99);
    }

    #[test]
    fn test_money_display() {
        assert_eq!(format!("{}", Money::from_paise(1_099)), "₹10.99");
        assert_eq!(format!("{}", Money::from_paise(500)), "₹5.00");
        assert_eq!(format!("{}", Money::from_paise(-550)), "-₹5.50");
        assert_eq!(format!("{}", Money::from_paise(0)), "₹0.00");
    }

    #[test]
    fn test_money_parse() {
        assert_eq!(Money::parse_str("61700.00").unwrap().paise(), 6_170_000);
        assert_eq!(Money::parse_str("500").unwrap().paise(), 50_000);
        assert_eq!(Money::parse_str("0.5").unwrap().paise(), 50);
        assert_eq!(Money::parse_str("-12.34").unwrap().paise(), -1_234);

        assert!(matches!(
            Money::parse_str("1.005"),
            Err(ValidationError::PrecisionExceeded { .. })
        ));
        assert!(Money::parse_str("").is_err());
        assert!(Money::parse_str("12.x").is_err());
        assert!(Money::parse_str(".50").is_err());
    }

    #[test]
    fn test_decimal_round_trips() {
        for s in ["61700.00", "0.05", "-12.34"] {
            assert_eq!(Money::parse_str(s).unwrap().to_decimal_string(), s);
        }
        for s in ["10.200", "0.001", "5.000"] {
            assert_eq!(Weight::parse_str(s).unwrap().to_decimal_string(), s);
        }
    }

    #[test]
    fn test_money_arithmetic() {
        let a = Money::from_paise(1_000);
        let b = Money::from_paise(400);
        assert_eq!((a + b).paise(), 1_400);
        assert_eq!((a - b).paise(), 600);

        let mut c = a;
        c += b;
        assert_eq!(c.paise(), 1_400);
        c -= b;
        assert_eq!(c.paise(), 1_000);
    }

    #[test]
    fn test_remaining_after_never_negative() {
        let final_amount = Money::from_paise(1_000_000);
        assert_eq!(
            final_amount.remaining_after(Money::from_paise(400_000)).paise(),
            600_000
        );
        assert_eq!(
            final_amount.remaining_after(Money::from_paise(1_000_000)).paise(),
            0
        );
        assert_eq!(
            final_amount.remaining_after(Money::from_paise(1_100_000)).paise(),
            0
        );
    }

    #[test]
    fn test_apply_bps_rounds_half_away() {
        // 1000 paise at 8.25% = 82.5 paise, rounds to 83
        let amount = Money::from_paise(1_000);
        assert_eq!(amount.apply_bps(Percent::from_bps(825)).paise(), 83);

        // 10% of 10000 is exact
        let amount = Money::from_paise(10_000);
        assert_eq!(amount.apply_bps(Percent::from_bps(1_000)).paise(), 1_000);
    }

    #[test]
    fn test_split_equal_sums_exactly() {
        let total = Money::from_paise(10_000);
        let (each, last) = total.split_equal(3).unwrap();
        assert_eq!(each.paise() * 2 + last.paise(), 10_000);
        assert!(total.split_equal(0).is_none());
    }

    #[test]
    fn test_weight_parse_and_display() {
        let w = Weight::parse_str("10.200").unwrap();
        assert_eq!(w.milligrams(), 10_200);
        assert_eq!(format!("{}", w), "10.200g");

        assert_eq!(Weight::parse_str("10.2").unwrap().milligrams(), 10_200);
        assert!(matches!(
            Weight::parse_str("10.2001"),
            Err(ValidationError::PrecisionExceeded { .. })
        ));
    }

    #[test]
    fn test_wastage_rounds_at_third_decimal() {
        // 10g at 2% wastage = 10.200g exactly
        let net = Weight::from_grams(10);
        assert_eq!(net.with_wastage(Percent::from_bps(200)).milligrams(), 10_200);

        // 3.333g at 2.5% = 3.416325g, rounds to 3.416g
        let net = Weight::from_milligrams(3_333);
        assert_eq!(net.with_wastage(Percent::from_bps(250)).milligrams(), 3_416);

        // half exactly: 10.001g at 5% = 10.50105g -> 10.501
        let net = Weight::from_milligrams(10_001);
        assert_eq!(net.with_wastage(Percent::from_bps(500)).milligrams(), 10_501);
    }

    #[test]
    fn test_times_rate() {
        // 10.200g at ₹6000/g = ₹61,200.00
        let effective = Weight::from_milligrams(10_200);
        let rate = Money::from_rupees(6_000);
        assert_eq!(effective.times_rate(rate).paise(), 6_120_000);

        // 1mg at ₹6000/g = 600 paise exactly
        let tiny = Weight::from_milligrams(1);
        assert_eq!(tiny.times_rate(rate).paise(), 600);

        // rounding: 1mg at ₹0.75/g = 0.075 paise -> 0
        let rate = Money::from_paise(75);
        assert_eq!(tiny.times_rate(rate).paise(), 0);
        // 7mg at ₹0.75/g = 0.525 paise -> 1
        assert_eq!(Weight::from_milligrams(7).times_rate(rate).paise(), 1);
    }

    #[test]
    fn test_percent_parse() {
        assert_eq!(Percent::parse_str("2").unwrap().bps(), 200);
        assert_eq!(Percent::parse_str("2.5").unwrap().bps(), 250);
        assert_eq!(Percent::parse_str("8.25").unwrap().bps(), 825);
        assert!(Percent::parse_str("-1").is_err());
        assert!(Percent::parse_str("2.505").is_err());
    }

    #[test]
    fn test_large_invoice_no_overflow() {
        // 5kg of platinum at ₹35,000/g stays well inside i64 after the
        // i128 widening in times_rate.
        let heavy = Weight::from_grams(5_000);
        let rate = Money::from_rupees(35_000);
        assert_eq!(heavy.times_rate(rate).paise(), 17_500_000_000_000);
    }
}
