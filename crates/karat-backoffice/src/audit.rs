//! # Best-Effort Audit Events
//!
//! Services emit an audit record after each successful mutation. The
//! write is best-effort by contract: an audit failure is logged and
//! swallowed so it can never roll back or fail the primary operation,
//! which has already committed by the time the event is written.

use tracing::warn;

use karat_core::Session;
use karat_store::{NewAuditRecord, Store};

/// Appends an audit record, swallowing (but logging) any failure.
pub(crate) async fn record_best_effort(
    store: &Store,
    session: &Session,
    action: &str,
    entity: &str,
    entity_id: &str,
    detail: Option<String>,
) {
    let result = store
        .audit()
        .record(NewAuditRecord {
            actor: session.user_id.clone(),
            action: action.to_string(),
            entity: entity.to_string(),
            entity_id: entity_id.to_string(),
            detail,
        })
        .await;

    if let Err(e) = result {
        warn!(
            action = %action,
            entity = %entity,
            entity_id = %entity_id,
            error = %e,
            "Audit write failed; continuing"
        );
    }
}
