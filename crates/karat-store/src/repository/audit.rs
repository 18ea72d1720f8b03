//! # Audit Log Repository
//!
//! Insert-only audit trail. There is no update or delete here on
//! purpose; the table is append-only by construction.
//!
//! Callers treat audit writes as best-effort: the service layer logs a
//! failed insert and moves on, so an audit outage can never roll back a
//! payment or a reservation.

use chrono::Utc;
use sqlx::SqlitePool;
use uuid::Uuid;

use crate::error::StoreResult;
use karat_core::AuditRecord;

/// Input for one audit record.
#[derive(Debug, Clone)]
pub struct NewAuditRecord {
    pub actor: String,
    pub action: String,
    pub entity: String,
    pub entity_id: String,
    pub detail: Option<String>,
}

/// Repository for the audit log.
#[derive(Debug, Clone)]
pub struct AuditRepository {
    pool: SqlitePool,
}

impl AuditRepository {
    /// Creates a new AuditRepository.
    pub fn new(pool: SqlitePool) -> Self {
        AuditRepository { pool }
    }

    /// Appends one audit record.
    pub async fn record(&self, new: NewAuditRecord) -> StoreResult<AuditRecord> {
        let record = AuditRecord {
            id: Uuid::new_v4().to_string(),
            actor: new.actor,
            action: new.action,
            entity: new.entity,
            entity_id: new.entity_id,
            detail: new.detail,
            recorded_at: Utc::now(),
        };

        sqlx::query(
            "INSERT INTO audit_log (
                id, actor, action, entity, entity_id, detail, recorded_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        )
        .bind(&record.id)
        .bind(&record.actor)
        .bind(&record.action)
        .bind(&record.entity)
        .bind(&record.entity_id)
        .bind(&record.detail)
        .bind(record.recorded_at)
        .execute(&self.pool)
        .await?;

        Ok(record)
    }

    /// Trail for one entity, newest first.
    pub async fn for_entity(&self, entity: &str, entity_id: &str) -> StoreResult<Vec<AuditRecord>> {
        let records = sqlx::query_as::<_, AuditRecord>(
            "SELECT id, actor, action, entity, entity_id, detail, recorded_at
             FROM audit_log
             WHERE entity = ?1 AND entity_id = ?2
             ORDER BY recorded_at DESC, id DESC",
        )
        .bind(entity)
        .bind(entity_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(records)
    }

    /// Most recent records across all entities.
    pub async fn recent(&self, limit: u32) -> StoreResult<Vec<AuditRecord>> {
        let records = sqlx::query_as::<_, AuditRecord>(
            "SELECT id, actor, action, entity, entity_id, detail, recorded_at
             FROM audit_log
             ORDER BY recorded_at DESC, id DESC
             LIMIT ?1",
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(records)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::{Store, StoreConfig};

    #[tokio::test]
    async fn test_record_and_query() {
        let store = Store::new(StoreConfig::in_memory()).await.unwrap();

        store
            .audit()
            .record(NewAuditRecord {
                actor: "u-1".to_string(),
                action: "record_payment".to_string(),
                entity: "sales_order".to_string(),
                entity_id: "o-1".to_string(),
                detail: Some("amount=₹4000.00".to_string()),
            })
            .await
            .unwrap();
        store
            .audit()
            .record(NewAuditRecord {
                actor: "u-2".to_string(),
                action: "cancel_order".to_string(),
                entity: "sales_order".to_string(),
                entity_id: "o-2".to_string(),
                detail: None,
            })
            .await
            .unwrap();

        let trail = store.audit().for_entity("sales_order", "o-1").await.unwrap();
        assert_eq!(trail.len(), 1);
        assert_eq!(trail[0].action, "record_payment");

        let recent = store.audit().recent(10).await.unwrap();
        assert_eq!(recent.len(), 2);
    }
}
