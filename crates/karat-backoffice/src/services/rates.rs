//! # Rate Service
//!
//! Publishing and resolving per-gram metal rates.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::audit;
use crate::error::ServiceResult;
use crate::metrics::{counters, MetricsSink};
use karat_core::{authorize, MetalType, Money, Percent, Permission, RateMaster, Session};
use karat_store::{NewRate, Store};

/// Request to publish a new rate quotation.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PublishRateRequest {
    pub metal_type: MetalType,
    pub purity: String,
    /// Per-gram rate as a decimal string, at most 2 places.
    pub rate_per_gram: String,
    pub valid_until: Option<DateTime<Utc>>,
    /// Default making charge as a decimal percent string, e.g. "8.25".
    pub default_making_charge_percent: String,
}

/// A rate as seen by callers.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RateDto {
    pub rate_id: String,
    pub metal_type: MetalType,
    pub purity: String,
    pub rate_per_gram: String,
    pub valid_until: Option<String>,
    pub default_making_charge_percent: f64,
}

impl From<RateMaster> for RateDto {
    fn from(rate: RateMaster) -> Self {
        RateDto {
            rate_id: rate.id.clone(),
            metal_type: rate.metal_type,
            purity: rate.purity.clone(),
            rate_per_gram: rate.rate_per_gram().to_decimal_string(),
            valid_until: rate.valid_until.map(|t| t.to_rfc3339()),
            default_making_charge_percent: rate.default_making_charge().percentage(),
        }
    }
}

/// Service for rate master operations.
#[derive(Clone)]
pub struct RateService {
    store: Store,
    metrics: Arc<dyn MetricsSink>,
}

impl RateService {
    pub(crate) fn new(store: Store, metrics: Arc<dyn MetricsSink>) -> Self {
        RateService { store, metrics }
    }

    /// Publishes a new rate, superseding the pair's previous one.
    pub async fn publish_rate(
        &self,
        session: &Session,
        request: PublishRateRequest,
    ) -> ServiceResult<RateDto> {
        authorize(session, Permission::ManageRates)?;
        karat_core::validation::validate_purity(&request.purity)?;

        let rate_per_gram = Money::parse_str(&request.rate_per_gram)?;
        karat_core::validation::validate_non_negative_amount("rate_per_gram", rate_per_gram)?;
        let default_making_charge = Percent::parse_str(&request.default_making_charge_percent)?;

        let rate = self
            .store
            .rates()
            .publish(NewRate {
                metal_type: request.metal_type,
                purity: request.purity,
                rate_per_gram,
                valid_until: request.valid_until,
                default_making_charge,
            })
            .await?;

        self.metrics.incr(counters::RATES_PUBLISHED);
        audit::record_best_effort(
            &self.store,
            session,
            "publish_rate",
            "rate_master",
            &rate.id,
            Some(format!(
                "{}/{} at {}",
                rate.metal_type, rate.purity, rate.rate_per_gram()
            )),
        )
        .await;

        Ok(rate.into())
    }

    /// Resolves the current rate for a (metal, purity) pair.
    pub async fn current_rate(
        &self,
        session: &Session,
        metal_type: MetalType,
        purity: &str,
    ) -> ServiceResult<RateDto> {
        authorize(session, Permission::ViewRates)?;
        karat_core::validation::validate_purity(purity)?;

        let rate = self.store.rates().current(metal_type, purity).await?;
        debug!(metal_type = %metal_type, purity = %purity, rate_id = %rate.id, "Rate resolved");

        Ok(rate.into())
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
