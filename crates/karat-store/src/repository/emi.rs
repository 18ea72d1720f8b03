//! # EMI Repository
//!
//! Database operations for EMI plans and installments.
//!
//! ## Installment Bookkeeping
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │                 Installment Payment Roll-Up                         │
//! │                                                                     │
//! │  record_installment_payment(plan, installment, amount)              │
//! │       │                                                             │
//! │       ├── 1. installment.paid_amount += amount                      │
//! │       │      status ← paid / partial / overdue (from due date)      │
//! │       │                                                             │
//! │       ├── 2. plan.paid_amount += amount                             │
//! │       │      status ← completed when every paisa is in              │
//! │       │                                                             │
//! │       ├── 3. emi_payments row (append-only, idempotency key)        │
//! │       │                                                             │
//! │       └── 4. ledger entry mirroring the payment                     │
//! │                                                                     │
//! │  All four in ONE transaction.                                       │
//! └─────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! `mark_overdue` is a single conditional UPDATE and therefore
//! idempotent: a second run right after the first finds nothing left to
//! mark. It is meant to be fired by an external cron-style trigger, not
//! by an in-process scheduler.

use chrono::{NaiveDate, Utc};
use sqlx::SqlitePool;
use tracing::{debug, info};
use uuid::Uuid;

use crate::error::{StoreError, StoreResult};
use crate::repository::ledger;
use karat_core::emi::{build_schedule, installment_status};
use karat_core::{
    CoreError, EmiPaymentRecord, EmiPlan, EmiStatus, Installment, InstallmentStatus, LedgerSource,
    Money, PaymentMethod, ValidationError,
};

/// Column list shared by every plan SELECT.
const PLAN_COLUMNS: &str = "id, order_id, principal_paise, installment_count, \
     monthly_amount_paise, start_date, paid_amount_paise, status, created_at, updated_at";

/// Column list shared by every installment SELECT.
const INSTALLMENT_COLUMNS: &str = "id, plan_id, seq_no, amount_paise, paid_amount_paise, \
     due_date, status, created_at, updated_at";

/// Outcome of a successful (or replayed) installment payment.
#[derive(Debug, Clone)]
pub struct InstallmentPaymentOutcome {
    pub record: EmiPaymentRecord,
    pub installment: Installment,
    pub plan: EmiPlan,
    /// False when a retried request id replayed an earlier payment.
    pub applied: bool,
}

/// Repository for EMI database operations.
#[derive(Debug, Clone)]
pub struct EmiRepository {
    pool: SqlitePool,
}

impl EmiRepository {
    /// Creates a new EmiRepository.
    pub fn new(pool: SqlitePool) -> Self {
        EmiRepository { pool }
    }

    /// Opens an EMI plan for an order and materializes its schedule.
    ///
    /// The plan row and every installment row are inserted in one
    /// transaction; the schedule itself comes from the pure core math
    /// so the amounts are guaranteed to sum to the principal.
    pub async fn open_plan(
        &self,
        order_id: &str,
        principal: Money,
        months: u32,
        start_date: NaiveDate,
    ) -> StoreResult<(EmiPlan, Vec<Installment>)> {
        let schedule =
            build_schedule(principal, months, start_date).map_err(CoreError::Validation)?;

        let now = Utc::now();
        let plan = EmiPlan {
            id: Uuid::new_v4().to_string(),
            order_id: order_id.to_string(),
            principal_paise: principal.paise(),
            installment_count: months,
            monthly_amount_paise: schedule[0].amount.paise(),
            start_date,
            paid_amount_paise: 0,
            status: EmiStatus::Active,
            created_at: now,
            updated_at: now,
        };

        let mut tx = self.pool.begin().await?;

        // The order must exist; the FK would catch it anyway but this
        // gives the caller a domain error instead of a constraint one.
        let order_exists: Option<String> =
            sqlx::query_scalar("SELECT id FROM sales_orders WHERE id = ?1")
                .bind(order_id)
                .fetch_optional(&mut *tx)
                .await?;
        if order_exists.is_none() {
            return Err(CoreError::OrderNotFound(order_id.to_string()).into());
        }

        sqlx::query(
            "INSERT INTO emi_plans (
                id, order_id, principal_paise, installment_count,
                monthly_amount_paise, start_date, paid_amount_paise,
                status, created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
        )
        .bind(&plan.id)
        .bind(&plan.order_id)
        .bind(plan.principal_paise)
        .bind(plan.installment_count)
        .bind(plan.monthly_amount_paise)
        .bind(plan.start_date)
        .bind(plan.paid_amount_paise)
        .bind(plan.status)
        .bind(plan.created_at)
        .bind(plan.updated_at)
        .execute(&mut *tx)
        .await?;

        let mut installments = Vec::with_capacity(schedule.len());
        for scheduled in &schedule {
            let installment = Installment {
                id: Uuid::new_v4().to_string(),
                plan_id: plan.id.clone(),
                seq_no: scheduled.seq_no,
                amount_paise: scheduled.amount.paise(),
                paid_amount_paise: 0,
                due_date: scheduled.due_date,
                status: InstallmentStatus::Pending,
                created_at: now,
                updated_at: now,
            };

            sqlx::query(
                "INSERT INTO installments (
                    id, plan_id, seq_no, amount_paise, paid_amount_paise,
                    due_date, status, created_at, updated_at
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
            )
            .bind(&installment.id)
            .bind(&installment.plan_id)
            .bind(installment.seq_no)
            .bind(installment.amount_paise)
            .bind(installment.paid_amount_paise)
            .bind(installment.due_date)
            .bind(installment.status)
            .bind(installment.created_at)
            .bind(installment.updated_at)
            .execute(&mut *tx)
            .await?;

            installments.push(installment);
        }

        tx.commit().await?;

        info!(
            plan_id = %plan.id,
            order_id = %order_id,
            principal = %principal,
            months = months,
            "EMI plan opened"
        );

        Ok((plan, installments))
    }

    /// Gets a plan by id.
    pub async fn plan(&self, plan_id: &str) -> StoreResult<Option<EmiPlan>> {
        let plan = sqlx::query_as::<_, EmiPlan>(&format!(
            "SELECT {PLAN_COLUMNS} FROM emi_plans WHERE id = ?1"
        ))
        .bind(plan_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(plan)
    }

    /// Gets a plan's installments in schedule order.
    pub async fn installments(&self, plan_id: &str) -> StoreResult<Vec<Installment>> {
        let installments = sqlx::query_as::<_, Installment>(&format!(
            "SELECT {INSTALLMENT_COLUMNS} FROM installments
             WHERE plan_id = ?1
             ORDER BY seq_no"
        ))
        .bind(plan_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(installments)
    }

    /// Records a payment against one installment of a plan.
    ///
    /// ## Preconditions (rejected, never clamped)
    /// - plan and installment exist, installment belongs to the plan
    /// - `amount <= installment remaining` (`InstallmentOverpay`)
    ///
    /// ## Atomicity
    /// Installment update, plan roll-up, payment record, and ledger
    /// entry commit as one unit.
    pub async fn record_installment_payment(
        &self,
        plan_id: &str,
        installment_id: &str,
        amount: Money,
        method: PaymentMethod,
        reference: Option<&str>,
        request_id: Option<&str>,
    ) -> StoreResult<InstallmentPaymentOutcome> {
        if !amount.is_positive() {
            return Err(CoreError::Validation(ValidationError::MustBePositive {
                field: "payment amount".to_string(),
            })
            .into());
        }

        let now = Utc::now();
        let today = now.date_naive();
        let mut tx = self.pool.begin().await?;

        // Replay check, same discipline as order payments.
        if let Some(rid) = request_id {
            let existing = sqlx::query_as::<_, EmiPaymentRecord>(
                "SELECT id, plan_id, installment_id, amount_paise, method,
                        reference, request_id, paid_at
                 FROM emi_payments
                 WHERE plan_id = ?1 AND request_id = ?2",
            )
            .bind(plan_id)
            .bind(rid)
            .fetch_optional(&mut *tx)
            .await?;

            if let Some(record) = existing {
                let installment = fetch_installment_tx(&mut tx, plan_id, &record.installment_id)
                    .await?;
                let plan = fetch_plan_tx(&mut tx, plan_id).await?;
                tx.commit().await?;
                info!(plan_id = %plan_id, request_id = %rid, "Installment payment replayed");
                return Ok(InstallmentPaymentOutcome {
                    record,
                    installment,
                    plan,
                    applied: false,
                });
            }
        }

        let plan = fetch_plan_tx(&mut tx, plan_id).await?;
        let installment = fetch_installment_tx(&mut tx, plan_id, installment_id).await?;

        let remaining = installment.remaining();
        if amount > remaining {
            return Err(CoreError::InstallmentOverpay {
                installment_id: installment_id.to_string(),
                amount,
                remaining,
            }
            .into());
        }

        let new_inst_paid = installment.paid_amount() + amount;
        let new_inst_status = installment_status(
            installment.amount(),
            new_inst_paid,
            installment.due_date,
            today,
        );

        sqlx::query(
            "UPDATE installments SET
                paid_amount_paise = ?2,
                status = ?3,
                updated_at = ?4
             WHERE id = ?1",
        )
        .bind(installment_id)
        .bind(new_inst_paid.paise())
        .bind(new_inst_status)
        .bind(now)
        .execute(&mut *tx)
        .await?;

        let new_plan_paid = plan.paid_amount() + amount;
        let new_plan_status = if new_plan_paid >= plan.principal() {
            EmiStatus::Completed
        } else {
            EmiStatus::Active
        };

        sqlx::query(
            "UPDATE emi_plans SET
                paid_amount_paise = ?2,
                status = ?3,
                updated_at = ?4
             WHERE id = ?1",
        )
        .bind(plan_id)
        .bind(new_plan_paid.paise())
        .bind(new_plan_status)
        .bind(now)
        .execute(&mut *tx)
        .await?;

        let record = EmiPaymentRecord {
            id: Uuid::new_v4().to_string(),
            plan_id: plan_id.to_string(),
            installment_id: installment_id.to_string(),
            amount_paise: amount.paise(),
            method,
            reference: reference.map(str::to_string),
            request_id: request_id.map(str::to_string),
            paid_at: now,
        };

        sqlx::query(
            "INSERT INTO emi_payments (
                id, plan_id, installment_id, amount_paise, method,
                reference, request_id, paid_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
        )
        .bind(&record.id)
        .bind(&record.plan_id)
        .bind(&record.installment_id)
        .bind(record.amount_paise)
        .bind(record.method)
        .bind(&record.reference)
        .bind(&record.request_id)
        .bind(record.paid_at)
        .execute(&mut *tx)
        .await?;

        let entry = ledger::entry_for_payment(
            LedgerSource::EmiPayment,
            None,
            Some(plan_id),
            &record.id,
            amount,
            method,
            now,
        );
        ledger::insert_with(&mut tx, &entry).await?;

        tx.commit().await?;

        info!(
            plan_id = %plan_id,
            installment_id = %installment_id,
            amount = %amount,
            installment_status = ?new_inst_status,
            plan_status = ?new_plan_status,
            "Installment payment recorded"
        );

        Ok(InstallmentPaymentOutcome {
            record,
            installment: Installment {
                paid_amount_paise: new_inst_paid.paise(),
                status: new_inst_status,
                updated_at: now,
                ..installment
            },
            plan: EmiPlan {
                paid_amount_paise: new_plan_paid.paise(),
                status: new_plan_status,
                updated_at: now,
                ..plan
            },
            applied: true,
        })
    }

    /// Marks every installment that is past due and not fully paid as
    /// Overdue. Returns the number newly marked.
    ///
    /// ## Idempotency
    /// The predicate excludes rows already marked, so running this
    /// twice in a row marks on the first run and is a no-op on the
    /// second. Nothing downstream fires from here; notification fan-out
    /// belongs to whatever invokes the batch.
    pub async fn mark_overdue(&self) -> StoreResult<u64> {
        let now = Utc::now();
        let today = now.date_naive();

        let result = sqlx::query(
            "UPDATE installments SET status = 'overdue', updated_at = ?2
             WHERE due_date < ?1
               AND paid_amount_paise < amount_paise
               AND status != 'overdue'",
        )
        .bind(today)
        .bind(now)
        .execute(&self.pool)
        .await?;

        debug!(marked = result.rows_affected(), "Overdue sweep finished");
        Ok(result.rows_affected())
    }

    /// Unsettled installments due in `[today, today + days]`, ordered
    /// by due date then schedule position.
    pub async fn upcoming(&self, days: i64) -> StoreResult<Vec<Installment>> {
        let today = Utc::now().date_naive();
        let until = today + chrono::Duration::days(days);

        let installments = sqlx::query_as::<_, Installment>(&format!(
            "SELECT {INSTALLMENT_COLUMNS} FROM installments
             WHERE due_date >= ?1 AND due_date <= ?2
               AND paid_amount_paise < amount_paise
             ORDER BY due_date, plan_id, seq_no"
        ))
        .bind(today)
        .bind(until)
        .fetch_all(&self.pool)
        .await?;

        Ok(installments)
    }
}

/// Fetches a plan inside an open transaction.
async fn fetch_plan_tx(
    tx: &mut sqlx::Transaction<'_, sqlx::Sqlite>,
    plan_id: &str,
) -> StoreResult<EmiPlan> {
    let plan = sqlx::query_as::<_, EmiPlan>(&format!(
        "SELECT {PLAN_COLUMNS} FROM emi_plans WHERE id = ?1"
    ))
    .bind(plan_id)
    .fetch_optional(&mut **tx)
    .await?;

    plan.ok_or_else(|| StoreError::Domain(CoreError::PlanNotFound(plan_id.to_string())))
}

/// Fetches an installment inside an open transaction, scoped to its
/// plan so a stray id from another plan cannot be paid through this
/// one.
async fn fetch_installment_tx(
    tx: &mut sqlx::Transaction<'_, sqlx::Sqlite>,
    plan_id: &str,
    installment_id: &str,
) -> StoreResult<Installment> {
    let installment = sqlx::query_as::<_, Installment>(&format!(
        "SELECT {INSTALLMENT_COLUMNS} FROM installments
         WHERE id = ?1 AND plan_id = ?2"
    ))
    .bind(installment_id)
    .bind(plan_id)
    .fetch_optional(&mut **tx)
    .await?;

    installment.ok_or_else(|| {
        StoreError::Domain(CoreError::InstallmentNotFound(installment_id.to_string()))
    })
}

// =============================================================================
// Unit Tests
// =============================================================================
