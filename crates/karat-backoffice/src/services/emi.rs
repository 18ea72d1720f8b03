//! # EMI Service
//!
//! Plan opening, the overdue sweep, and the upcoming-installments view.
//!
//! The overdue sweep is built to be driven by an external cron-style
//! trigger: it is idempotent, returns only a count, and fires no
//! notifications itself.

use std::sync::Arc;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::audit;
use crate::error::ServiceResult;
use crate::metrics::{counters, MetricsSink};
use karat_core::emi::group_by_due_date;
use karat_core::{authorize, EmiPlan, EmiStatus, Installment, InstallmentStatus, Money, Permission, Session};
use karat_store::Store;

/// Request to open an EMI plan for an order.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OpenPlanRequest {
    pub order_id: String,
    /// Financed principal as a decimal string, at most 2 places.
    pub principal: String,
    pub installment_count: u32,
    pub start_date: NaiveDate,
}

/// An EMI plan as seen by callers.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlanDto {
    pub plan_id: String,
    pub order_id: String,
    pub principal: String,
    pub installment_count: u32,
    pub monthly_amount: String,
    pub start_date: NaiveDate,
    pub paid_amount: String,
    pub pending_amount: String,
    pub status: EmiStatus,
}

impl From<EmiPlan> for PlanDto {
    fn from(plan: EmiPlan) -> Self {
        PlanDto {
            plan_id: plan.id.clone(),
            order_id: plan.order_id.clone(),
            principal: plan.principal().to_decimal_string(),
            installment_count: plan.installment_count,
            monthly_amount: Money::from_paise(plan.monthly_amount_paise).to_decimal_string(),
            start_date: plan.start_date,
            paid_amount: plan.paid_amount().to_decimal_string(),
            pending_amount: plan.pending_amount().to_decimal_string(),
            status: plan.status,
        }
    }
}

/// An installment as seen by callers.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InstallmentDto {
    pub installment_id: String,
    pub plan_id: String,
    pub seq_no: u32,
    pub amount: String,
    pub paid_amount: String,
    pub remaining: String,
    pub due_date: NaiveDate,
    pub status: InstallmentStatus,
}

impl From<Installment> for InstallmentDto {
    fn from(installment: Installment) -> Self {
        InstallmentDto {
            installment_id: installment.id.clone(),
            plan_id: installment.plan_id.clone(),
            seq_no: installment.seq_no,
            amount: installment.amount().to_decimal_string(),
            paid_amount: installment.paid_amount().to_decimal_string(),
            remaining: installment.remaining().to_decimal_string(),
            due_date: installment.due_date,
            status: installment.status,
        }
    }
}

/// Installments due on one calendar day.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DueDayGroup {
    pub due_date: NaiveDate,
    pub installments: Vec<InstallmentDto>,
}

/// Outcome of the overdue sweep.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OverdueSweepResponse {
    pub newly_marked: u64,
}

/// Service for EMI operations.
#[derive(Clone)]
pub struct EmiService {
    store: Store,
    metrics: Arc<dyn MetricsSink>,
    upcoming_window_cap_days: i64,
}

impl EmiService {
    pub(crate) fn new(
        store: Store,
        metrics: Arc<dyn MetricsSink>,
        upcoming_window_cap_days: i64,
    ) -> Self {
        EmiService {
            store,
            metrics,
            upcoming_window_cap_days,
        }
    }

    /// Opens an EMI plan and materializes its schedule.
    pub async fn open_plan(
        &self,
        session: &Session,
        request: OpenPlanRequest,
    ) -> ServiceResult<(PlanDto, Vec<InstallmentDto>)> {
        authorize(session, Permission::ManageEmi)?;
        karat_core::validation::validate_installment_count(request.installment_count)?;

        let principal = Money::parse_str(&request.principal)?;
        karat_core::validation::validate_payment_amount(principal)?;

        let (plan, installments) = self
            .store
            .emi()
            .open_plan(
                &request.order_id,
                principal,
                request.installment_count,
                request.start_date,
            )
            .await?;

        self.metrics.incr(counters::PLANS_OPENED);
        audit::record_best_effort(
            &self.store,
            session,
            "open_emi_plan",
            "emi_plan",
            &plan.id,
            Some(format!(
                "{} over {} months",
                plan.principal(),
                plan.installment_count
            )),
        )
        .await;

        Ok((
            plan.into(),
            installments.into_iter().map(InstallmentDto::from).collect(),
        ))
    }

    /// Gets a plan with its full schedule.
    pub async fn get_plan(
        &self,
        session: &Session,
        plan_id: &str,
    ) -> ServiceResult<(PlanDto, Vec<InstallmentDto>)> {
        authorize(session, Permission::ManageEmi)?;

        let plan = self
            .store
            .emi()
            .plan(plan_id)
            .await?
            .ok_or_else(|| crate::error::ServiceError::not_found("EMI plan", plan_id))?;
        let installments = self.store.emi().installments(plan_id).await?;

        Ok((
            plan.into(),
            installments.into_iter().map(InstallmentDto::from).collect(),
        ))
    }

    /// Marks every past-due, unsettled installment as Overdue.
    ///
    /// Safe to re-run at any time; already-marked rows are skipped, so
    /// back-to-back sweeps cannot double-count.
    pub async fn mark_overdue_installments(
        &self,
        session: &Session,
    ) -> ServiceResult<OverdueSweepResponse> {
        authorize(session, Permission::ManageEmi)?;

        let newly_marked = self.store.emi().mark_overdue().await?;

        for _ in 0..newly_marked {
            self.metrics.incr(counters::INSTALLMENTS_MARKED_OVERDUE);
        }
        if newly_marked > 0 {
            info!(newly_marked = newly_marked, "Overdue sweep marked installments");
            audit::record_best_effort(
                &self.store,
                session,
                "mark_overdue_installments",
                "installment",
                "batch",
                Some(format!("{} newly marked", newly_marked)),
            )
            .await;
        }

        Ok(OverdueSweepResponse { newly_marked })
    }

    /// Unsettled installments due within the next `days` days, grouped
    /// by calendar due date for presentation.
    pub async fn upcoming_installments(
        &self,
        session: &Session,
        days: i64,
    ) -> ServiceResult<Vec<DueDayGroup>> {
        authorize(session, Permission::ManageEmi)?;
        karat_core::validation::validate_window_days(days)?;
        let days = days.min(self.upcoming_window_cap_days);

        let installments = self.store.emi().upcoming(days).await?;

        let groups = group_by_due_date(installments)
            .into_iter()
            .map(|(due_date, bucket)| DueDayGroup {
                due_date,
                installments: bucket.into_iter().map(InstallmentDto::from).collect(),
            })
            .collect();

        Ok(groups)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCode;
    use crate::Backoffice;
    use chrono::{Duration, Utc};
    use karat_core::Role;
    use karat_store::StoreConfig;

    async fn backoffice_with_order() -> (Backoffice, String) {
        let store = karat_store::Store::new(StoreConfig::in_memory()).await.unwrap();
        let bo = Backoffice::new(store);
        let order = bo.store().orders().create("cust-1", Money::zero()).await.unwrap();
        (bo, order.id)
    }

    #[tokio::test]
    async fn test_open_plan_and_fetch() {
        let (bo, order_id) = backoffice_with_order().await;
        let accountant = Session::new("u-3", Role::Accountant);

        let (plan, installments) = bo
            .emi()
            .open_plan(
                &accountant,
                OpenPlanRequest {
                    order_id,
                    principal: "60000.00".to_string(),
                    installment_count: 6,
                    start_date: Utc::now().date_naive(),
                },
            )
            .await
            .unwrap();

        assert_eq!(plan.status, EmiStatus::Active);
        assert_eq!(installments.len(), 6);
        assert_eq!(plan.monthly_amount, "10000.00");
        assert_eq!(plan.pending_amount, "60000.00");

        let (fetched, schedule) = bo.emi().get_plan(&accountant, &plan.plan_id).await.unwrap();
        assert_eq!(fetched.plan_id, plan.plan_id);
        assert_eq!(schedule.len(), 6);
    }

    #[tokio::test]
    async fn test_sales_staff_cannot_manage_emi() {
        let (bo, order_id) = backoffice_with_order().await;
        let staff = Session::new("u-2", Role::SalesStaff);

        let err = bo
            .emi()
            .open_plan(
                &staff,
                OpenPlanRequest {
                    order_id,
                    principal: "60000.00".to_string(),
                    installment_count: 6,
                    start_date: Utc::now().date_naive(),
                },
            )
            .await
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::PermissionDenied);
    }

    #[tokio::test]
    async fn test_overdue_sweep_idempotent_through_service() {
        let (bo, order_id) = backoffice_with_order().await;
        let accountant = Session::new("u-3", Role::Accountant);

        // plan far enough in the past that two installments are due
        bo.emi()
            .open_plan(
                &accountant,
                OpenPlanRequest {
                    order_id,
                    principal: "30000.00".to_string(),
                    installment_count: 3,
                    start_date: Utc::now().date_naive() - Duration::days(70),
                },
            )
            .await
            .unwrap();

        let first = bo.emi().mark_overdue_installments(&accountant).await.unwrap();
        assert!(first.newly_marked >= 2);

        let second = bo.emi().mark_overdue_installments(&accountant).await.unwrap();
        assert_eq!(second.newly_marked, 0);
    }

    #[tokio::test]
    async fn test_upcoming_grouped_by_day() {
        let (bo, order_id) = backoffice_with_order().await;
        let accountant = Session::new("u-3", Role::Accountant);

        // two plans starting today produce installments on the same
        // calendar day one month out
        for principal in ["10000.00", "20000.00"] {
            bo.emi()
                .open_plan(
                    &accountant,
                    OpenPlanRequest {
                        order_id: order_id.clone(),
                        principal: principal.to_string(),
                        installment_count: 2,
                        start_date: Utc::now().date_naive(),
                    },
                )
                .await
                .unwrap();
        }

        let groups = bo.emi().upcoming_installments(&accountant, 45).await.unwrap();
        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].installments.len(), 2);

        // window validation still applies
        let err = bo.emi().upcoming_installments(&accountant, 0).await.unwrap_err();
        assert_eq!(err.code, ErrorCode::ValidationError);
    }
}
