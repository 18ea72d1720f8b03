//! # Pricing Service
//!
//! Live price quotes: rate resolution plus the pure breakdown math.
//!
//! A quote is never persisted. Every call resolves the current rate
//! and recomputes, so two quotes across a rate update legitimately
//! differ; that is the point.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{ServiceError, ServiceResult};
use crate::metrics::{counters, MetricsSink};
use karat_core::pricing::{calculate_price, pricing_input_for_product, PriceBreakdown, PricingInput};
use karat_core::{authorize, MetalType, Money, Percent, Permission, Session, Weight};
use karat_store::Store;

/// Ad-hoc pricing request with raw components (counter sales, repairs,
/// exchange valuations). Decimal strings, precision-checked.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuoteComponentsRequest {
    pub metal_type: MetalType,
    pub purity: String,
    /// Net weight in grams, at most 3 decimal places.
    pub net_weight: String,
    /// Wastage percent, at most 2 decimal places.
    pub wastage_percent: String,
    /// Flat making charges; at most 2 decimal places.
    pub making_charges: String,
    /// Stone value; at most 2 decimal places.
    pub stone_value: String,
}

/// A price quote as seen by callers. Monetary fields are decimal
/// strings at 2 places, the weight at 3.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PriceQuote {
    /// Rate row that priced this quote, for traceability.
    pub rate_id: String,
    pub rate_per_gram: String,
    pub effective_weight: String,
    pub metal_amount: String,
    pub making_charges: String,
    pub stone_value: String,
    pub total: String,
}

impl PriceQuote {
    fn from_breakdown(rate_id: &str, rate_per_gram: Money, b: &PriceBreakdown) -> Self {
        PriceQuote {
            rate_id: rate_id.to_string(),
            rate_per_gram: rate_per_gram.to_decimal_string(),
            effective_weight: b.effective_weight.to_decimal_string(),
            metal_amount: b.metal_amount.to_decimal_string(),
            making_charges: b.making_charges.to_decimal_string(),
            stone_value: b.stone_value.to_decimal_string(),
            total: b.total.to_decimal_string(),
        }
    }
}

/// Service for price quoting.
#[derive(Clone)]
pub struct PricingService {
    store: Store,
    metrics: Arc<dyn MetricsSink>,
}

impl PricingService {
    pub(crate) fn new(store: Store, metrics: Arc<dyn MetricsSink>) -> Self {
        PricingService { store, metrics }
    }

    /// Quotes a catalog product against the current rate.
    ///
    /// Fails hard with `RATE_UNAVAILABLE` when no current rate exists
    /// for the product's metal/purity; a quote at rate zero is worse
    /// than no quote.
    pub async fn quote_product(
        &self,
        session: &Session,
        product_id: &str,
    ) -> ServiceResult<PriceQuote> {
        authorize(session, Permission::ViewRates)?;

        let product = self
            .store
            .products()
            .get_by_id(product_id)
            .await?
            .ok_or_else(|| ServiceError::not_found("Product", product_id))?;

        let rate = self
            .store
            .rates()
            .current(product.metal_type, &product.purity)
            .await?;

        let input = pricing_input_for_product(
            &product,
            rate.rate_per_gram(),
            rate.default_making_charge(),
        );
        let breakdown = calculate_price(&input)?;

        debug!(
            product_id = %product_id,
            rate_id = %rate.id,
            total = %breakdown.total,
            "Product quoted"
        );
        self.metrics.incr(counters::QUOTES_PRICED);

        Ok(PriceQuote::from_breakdown(
            &rate.id,
            rate.rate_per_gram(),
            &breakdown,
        ))
    }

    /// Quotes raw components against the current rate for the pair.
    pub async fn quote_components(
        &self,
        session: &Session,
        request: QuoteComponentsRequest,
    ) -> ServiceResult<PriceQuote> {
        authorize(session, Permission::ViewRates)?;
        karat_core::validation::validate_purity(&request.purity)?;

        let net_weight = Weight::parse_str(&request.net_weight)?;
        let wastage = Percent::parse_str(&request.wastage_percent)?;
        karat_core::validation::validate_wastage_bps(wastage.bps())?;
        let making_charges = Money::parse_str(&request.making_charges)?;
        let stone_value = Money::parse_str(&request.stone_value)?;

        let rate = self
            .store
            .rates()
            .current(request.metal_type, &request.purity)
            .await?;

        let breakdown = calculate_price(&PricingInput {
            net_weight,
            wastage,
            rate_per_gram: rate.rate_per_gram(),
            making_charges,
            stone_value,
        })?;

        self.metrics.incr(counters::QUOTES_PRICED);

        Ok(PriceQuote::from_breakdown(
            &rate.id,
            rate.rate_per_gram(),
            &breakdown,
        ))
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
