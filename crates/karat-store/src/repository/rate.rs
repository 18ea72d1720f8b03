//! # Rate Master Repository
//!
//! Database operations for per-gram metal rate quotations.
//!
//! ## Resolution Rule
//! Among rates for a (metal, purity) pair that are Active and not past
//! their `valid_until`, the newest creation timestamp wins, with the id
//! as the final tie-break so duplicate timestamps still resolve
//! deterministically. No matching rate is a hard error: pricing flows
//! must never default to a zero rate.
//!
//! ## Supersession
//! Publishing a new rate and retiring the previous current one happen
//! in the same transaction, so there is no instant where two Active
//! open-ended rates exist for the pair (and if bad data ever produces
//! one, the resolution rule still picks a single winner).

use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use tracing::{debug, info};
use uuid::Uuid;

use crate::error::{StoreError, StoreResult};
use karat_core::{CoreError, MetalType, Money, Percent, RateMaster, RateStatus};

/// Column list shared by every rate SELECT.
const RATE_COLUMNS: &str = "id, metal_type, purity, rate_per_gram_paise, valid_until, status, \
     default_making_charge_bps, created_at, updated_at";

/// Input for publishing a new rate quotation.
#[derive(Debug, Clone)]
pub struct NewRate {
    pub metal_type: MetalType,
    pub purity: String,
    pub rate_per_gram: Money,
    /// Quotation expiry; `None` keeps it live until superseded.
    pub valid_until: Option<DateTime<Utc>>,
    pub default_making_charge: Percent,
}

/// Repository for rate master database operations.
#[derive(Debug, Clone)]
pub struct RateRepository {
    pool: SqlitePool,
}

impl RateRepository {
    /// Creates a new RateRepository.
    pub fn new(pool: SqlitePool) -> Self {
        RateRepository { pool }
    }

    /// Publishes a new rate, superseding the pair's previous Active
    /// rate in the same transaction.
    pub async fn publish(&self, new: NewRate) -> StoreResult<RateMaster> {
        let now = Utc::now();
        let rate = RateMaster {
            id: Uuid::new_v4().to_string(),
            metal_type: new.metal_type,
            purity: new.purity,
            rate_per_gram_paise: new.rate_per_gram.paise(),
            valid_until: new.valid_until,
            status: RateStatus::Active,
            default_making_charge_bps: new.default_making_charge.bps(),
            created_at: now,
            updated_at: now,
        };

        let mut tx = self.pool.begin().await?;

        sqlx::query(
            "UPDATE rate_master SET status = 'superseded', updated_at = ?3
             WHERE metal_type = ?1 AND purity = ?2 AND status = 'active'",
        )
        .bind(rate.metal_type)
        .bind(&rate.purity)
        .bind(now)
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            "INSERT INTO rate_master (
                id, metal_type, purity, rate_per_gram_paise, valid_until,
                status, default_making_charge_bps, created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
        )
        .bind(&rate.id)
        .bind(rate.metal_type)
        .bind(&rate.purity)
        .bind(rate.rate_per_gram_paise)
        .bind(rate.valid_until)
        .bind(rate.status)
        .bind(rate.default_making_charge_bps)
        .bind(rate.created_at)
        .bind(rate.updated_at)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        info!(
            metal_type = %rate.metal_type,
            purity = %rate.purity,
            rate = %rate.rate_per_gram(),
            "Rate published"
        );

        Ok(rate)
    }

    /// Resolves the current rate for a (metal, purity) pair.
    ///
    /// ## Errors
    /// `RateNotFound` when no Active, unexpired rate exists. Callers
    /// must treat this as a hard stop.
    pub async fn current(&self, metal_type: MetalType, purity: &str) -> StoreResult<RateMaster> {
        let now = Utc::now();

        let rate = sqlx::query_as::<_, RateMaster>(&format!(
            "SELECT {RATE_COLUMNS} FROM rate_master
             WHERE metal_type = ?1 AND purity = ?2 AND status = 'active'
               AND (valid_until IS NULL OR valid_until >= ?3)
             ORDER BY created_at DESC, id DESC
             LIMIT 1"
        ))
        .bind(metal_type)
        .bind(purity)
        .bind(now)
        .fetch_optional(&self.pool)
        .await?;

        debug!(metal_type = %metal_type, purity = %purity, found = rate.is_some(), "Rate lookup");

        rate.ok_or_else(|| {
            StoreError::Domain(CoreError::RateNotFound {
                metal_type: metal_type.as_str().to_string(),
                purity: purity.to_string(),
            })
        })
    }

    /// Gets a rate row by id (historical rows included).
    pub async fn get_by_id(&self, id: &str) -> StoreResult<Option<RateMaster>> {
        let rate = sqlx::query_as::<_, RateMaster>(&format!(
            "SELECT {RATE_COLUMNS} FROM rate_master WHERE id = ?1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(rate)
    }

    /// Full quotation history for a pair, newest first.
    pub async fn history(&self, metal_type: MetalType, purity: &str) -> StoreResult<Vec<RateMaster>> {
        let rates = sqlx::query_as::<_, RateMaster>(&format!(
            "SELECT {RATE_COLUMNS} FROM rate_master
             WHERE metal_type = ?1 AND purity = ?2
             ORDER BY created_at DESC, id DESC"
        ))
        .bind(metal_type)
        .bind(purity)
        .fetch_all(&self.pool)
        .await?;

        Ok(rates)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::{Store, StoreConfig};

    fn gold_rate(paise_per_gram: i64) -> NewRate {
        NewRate {
            metal_type: MetalType::Gold,
            purity: "22K".to_string(),
            rate_per_gram: Money::from_paise(paise_per_gram),
            valid_until: None,
            default_making_charge: Percent::from_bps(800),
        }
    }

    #[tokio::test]
    async fn test_publish_then_resolve() {
        let store = Store::new(StoreConfig::in_memory()).await.unwrap();
        store.rates().publish(gold_rate(600_000)).await.unwrap();

        let rate = store.rates().current(MetalType::Gold, "22K").await.unwrap();
        assert_eq!(rate.rate_per_gram_paise, 600_000);
        assert_eq!(rate.status, RateStatus::Active);
    }

    #[tokio::test]
    async fn test_missing_rate_is_a_hard_stop() {
        let store = Store::new(StoreConfig::in_memory()).await.unwrap();
        store.rates().publish(gold_rate(600_000)).await.unwrap();

        let err = store
            .rates()
            .current(MetalType::Silver, "925")
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            StoreError::Domain(CoreError::RateNotFound { .. })
        ));
    }

    #[tokio::test]
    async fn test_newest_publication_wins_and_supersedes() {
        let store = Store::new(StoreConfig::in_memory()).await.unwrap();
        let first = store.rates().publish(gold_rate(600_000)).await.unwrap();
        let second = store.rates().publish(gold_rate(612_500)).await.unwrap();

        let current = store.rates().current(MetalType::Gold, "22K").await.unwrap();
        assert_eq!(current.id, second.id);
        assert_eq!(current.rate_per_gram_paise, 612_500);

        // the earlier quotation is retired, not deleted
        let old = store.rates().get_by_id(&first.id).await.unwrap().unwrap();
        assert_eq!(old.status, RateStatus::Superseded);

        let history = store.rates().history(MetalType::Gold, "22K").await.unwrap();
        assert_eq!(history.len(), 2);
    }

    #[tokio::test]
    async fn test_expired_rate_is_skipped() {
        let store = Store::new(StoreConfig::in_memory()).await.unwrap();
        let mut expired = gold_rate(600_000);
        expired.valid_until = Some(Utc::now() - chrono::Duration::hours(1));
        store.rates().publish(expired).await.unwrap();

        let err = store
            .rates()
            .current(MetalType::Gold, "22K")
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            StoreError::Domain(CoreError::RateNotFound { .. })
        ));
    }
}
