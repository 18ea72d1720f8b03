//! # Ledger Repository
//!
//! The derived income/expense ledger. Every entry mirrors exactly one
//! payment row and is written in the same transaction as that payment,
//! which is what makes duplicate ledger entries structurally
//! impossible: no payment, no entry; one payment, one entry.

use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use uuid::Uuid;

use crate::error::StoreResult;
use karat_core::{LedgerEntry, LedgerKind, LedgerSource, Money, PaymentMethod};

/// Column list shared by every ledger SELECT.
const LEDGER_COLUMNS: &str =
    "id, kind, source, order_id, plan_id, payment_id, amount_paise, method, recorded_at";

/// Repository for ledger queries.
#[derive(Debug, Clone)]
pub struct LedgerRepository {
    pool: SqlitePool,
}

impl LedgerRepository {
    /// Creates a new LedgerRepository.
    pub fn new(pool: SqlitePool) -> Self {
        LedgerRepository { pool }
    }

    /// Entries recorded against one sales order, oldest first.
    pub async fn list_for_order(&self, order_id: &str) -> StoreResult<Vec<LedgerEntry>> {
        let entries = sqlx::query_as::<_, LedgerEntry>(&format!(
            "SELECT {LEDGER_COLUMNS} FROM ledger_entries
             WHERE order_id = ?1
             ORDER BY recorded_at, id"
        ))
        .bind(order_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(entries)
    }

    /// Entries recorded against one EMI plan, oldest first.
    pub async fn list_for_plan(&self, plan_id: &str) -> StoreResult<Vec<LedgerEntry>> {
        let entries = sqlx::query_as::<_, LedgerEntry>(&format!(
            "SELECT {LEDGER_COLUMNS} FROM ledger_entries
             WHERE plan_id = ?1
             ORDER BY recorded_at, id"
        ))
        .bind(plan_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(entries)
    }

    /// Income total recorded in the half-open interval `[from, to)`.
    pub async fn income_between(
        &self,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> StoreResult<Money> {
        let total: Option<i64> = sqlx::query_scalar(
            "SELECT SUM(amount_paise) FROM ledger_entries
             WHERE kind = 'income' AND recorded_at >= ?1 AND recorded_at < ?2",
        )
        .bind(from)
        .bind(to)
        .fetch_one(&self.pool)
        .await?;

        Ok(Money::from_paise(total.unwrap_or(0)))
    }
}

// =============================================================================
// Transaction helper (shared with the payment workflows)
// =============================================================================

/// Builds a ledger entry mirroring a payment.
pub(crate) fn entry_for_payment(
    source: LedgerSource,
    order_id: Option<&str>,
    plan_id: Option<&str>,
    payment_id: &str,
    amount: Money,
    method: PaymentMethod,
    recorded_at: DateTime<Utc>,
) -> LedgerEntry {
    LedgerEntry {
        id: Uuid::new_v4().to_string(),
        kind: LedgerKind::Income,
        source,
        order_id: order_id.map(str::to_string),
        plan_id: plan_id.map(str::to_string),
        payment_id: payment_id.to_string(),
        amount_paise: amount.paise(),
        method,
        recorded_at,
    }
}

/// Inserts a ledger entry inside an open transaction.
pub(crate) async fn insert_with(
    tx: &mut sqlx::Transaction<'_, sqlx::Sqlite>,
    entry: &LedgerEntry,
) -> StoreResult<()> {
    sqlx::query(
        "INSERT INTO ledger_entries (
            id, kind, source, order_id, plan_id, payment_id,
            amount_paise, method, recorded_at
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
    )
    .bind(&entry.id)
    .bind(entry.kind)
    .bind(entry.source)
    .bind(&entry.order_id)
    .bind(&entry.plan_id)
    .bind(&entry.payment_id)
    .bind(entry.amount_paise)
    .bind(entry.method)
    .bind(entry.recorded_at)
    .execute(&mut **tx)
    .await?;

    Ok(())
}
