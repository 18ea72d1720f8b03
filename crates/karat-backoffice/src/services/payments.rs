//! # Payment Service
//!
//! Payment recording against orders and EMI installments.
//!
//! Both shapes share the same discipline: validate at the boundary,
//! let the store apply the whole effect (payment row, roll-up, ledger)
//! in one transaction, then emit audit and metrics after the commit.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::audit;
use crate::error::ServiceResult;
use crate::metrics::{counters, MetricsSink};
use crate::services::orders::OrderDto;
use karat_core::{authorize, InstallmentStatus, Money, PaymentMethod, Permission, Session};
use karat_store::Store;

/// Request to record a payment against a sales order.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderPaymentRequest {
    pub order_id: String,
    /// Amount as a decimal string, at most 2 places.
    pub amount: String,
    pub method: PaymentMethod,
    /// External reference (cheque number, UPI txn id, auth code).
    pub reference: Option<String>,
    /// Client-supplied idempotency key. Retrying with the same key
    /// returns the original outcome instead of applying twice.
    pub request_id: Option<String>,
}

/// Outcome of an order payment.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderPaymentResponse {
    pub payment_id: String,
    pub amount: String,
    pub method: PaymentMethod,
    /// False when an idempotent retry replayed an earlier payment.
    pub applied: bool,
    pub order: OrderDto,
}

/// Request to record a payment against one EMI installment.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InstallmentPaymentRequest {
    pub plan_id: String,
    pub installment_id: String,
    /// Amount as a decimal string, at most 2 places.
    pub amount: String,
    pub method: PaymentMethod,
    pub reference: Option<String>,
    pub request_id: Option<String>,
}

/// Outcome of an installment payment.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InstallmentPaymentResponse {
    pub payment_id: String,
    pub amount: String,
    pub applied: bool,
    pub installment_id: String,
    pub installment_status: InstallmentStatus,
    pub installment_paid: String,
    pub installment_remaining: String,
    pub plan_paid: String,
    pub plan_pending: String,
    pub plan_completed: bool,
}

/// Service for payment recording.
#[derive(Clone)]
pub struct PaymentService {
    store: Store,
    metrics: Arc<dyn MetricsSink>,
}

impl PaymentService {
    pub(crate) fn new(store: Store, metrics: Arc<dyn MetricsSink>) -> Self {
        PaymentService { store, metrics }
    }

    /// Records a payment against a sales order.
    ///
    /// ## Rejections (no clamping, no partial effect)
    /// - `ORDER_FULLY_PAID` when nothing is pending
    /// - `PAYMENT_EXCEEDS_BALANCE` when the amount overshoots
    pub async fn record_order_payment(
        &self,
        session: &Session,
        request: OrderPaymentRequest,
    ) -> ServiceResult<OrderPaymentResponse> {
        authorize(session, Permission::RecordPayments)?;

        let amount = Money::parse_str(&request.amount)?;
        karat_core::validation::validate_payment_amount(amount)?;

        let outcome = self
            .store
            .orders()
            .record_payment(
                &request.order_id,
                amount,
                request.method,
                request.reference.as_deref(),
                request.request_id.as_deref(),
            )
            .await
            .inspect_err(|_| self.metrics.incr(counters::PAYMENTS_REJECTED))?;

        if outcome.applied {
            self.metrics.incr(counters::PAYMENTS_RECORDED);
            let detail = serde_json::json!({
                "paymentId": outcome.payment.id,
                "amount": outcome.payment.amount().to_decimal_string(),
                "method": outcome.payment.method.as_str(),
                "paymentStatus": outcome.order.payment_status,
            });
            audit::record_best_effort(
                &self.store,
                session,
                "record_order_payment",
                "sales_order",
                &request.order_id,
                Some(detail.to_string()),
            )
            .await;
        } else {
            self.metrics.incr(counters::PAYMENTS_REPLAYED);
        }

        Ok(OrderPaymentResponse {
            payment_id: outcome.payment.id.clone(),
            amount: outcome.payment.amount().to_decimal_string(),
            method: outcome.payment.method,
            applied: outcome.applied,
            order: outcome.order.into(),
        })
    }

    /// Records a payment against one installment of an EMI plan,
    /// rolling the plan's aggregate totals up in the same transaction.
    pub async fn record_installment_payment(
        &self,
        session: &Session,
        request: InstallmentPaymentRequest,
    ) -> ServiceResult<InstallmentPaymentResponse> {
        authorize(session, Permission::RecordPayments)?;

        let amount = Money::parse_str(&request.amount)?;
        karat_core::validation::validate_payment_amount(amount)?;

        let outcome = self
            .store
            .emi()
            .record_installment_payment(
                &request.plan_id,
                &request.installment_id,
                amount,
                request.method,
                request.reference.as_deref(),
                request.request_id.as_deref(),
            )
            .await
            .inspect_err(|_| self.metrics.incr(counters::PAYMENTS_REJECTED))?;

        if outcome.applied {
            self.metrics.incr(counters::PAYMENTS_RECORDED);
            let detail = serde_json::json!({
                "paymentId": outcome.record.id,
                "installmentId": outcome.installment.id,
                "seqNo": outcome.installment.seq_no,
                "amount": Money::from_paise(outcome.record.amount_paise).to_decimal_string(),
                "installmentStatus": outcome.installment.status,
            });
            audit::record_best_effort(
                &self.store,
                session,
                "record_installment_payment",
                "emi_plan",
                &request.plan_id,
                Some(detail.to_string()),
            )
            .await;
        } else {
            self.metrics.incr(counters::PAYMENTS_REPLAYED);
        }

        Ok(InstallmentPaymentResponse {
            payment_id: outcome.record.id.clone(),
            amount: Money::from_paise(outcome.record.amount_paise).to_decimal_string(),
            applied: outcome.applied,
            installment_id: outcome.installment.id.clone(),
            installment_status: outcome.installment.status,
            installment_paid: outcome.installment.paid_amount().to_decimal_string(),
            installment_remaining: outcome.installment.remaining().to_decimal_string(),
            plan_paid: outcome.plan.paid_amount().to_decimal_string(),
            plan_pending: outcome.plan.pending_amount().to_decimal_string(),
            plan_completed: outcome.plan.status == karat_core::EmiStatus::Completed,
        })
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCode;
    use crate::services::rates::PublishRateRequest;
    use crate::Backoffice;
    use karat_core::{MetalType, PaymentStatus, Percent, Role, Weight};
    use karat_store::{NewProduct, NewStockItem, StoreConfig};

    /// Back office with one rated product, one stock item, and one
    /// open order holding it (final amount 61,700.00).
    async fn seeded_with_order() -> (Backoffice, String) {
        let store = karat_store::Store::new(StoreConfig::in_memory()).await.unwrap();
        let bo = Backoffice::new(store);
        let manager = Session::new("u-1", Role::Manager);

        bo.rates()
            .publish_rate(
                &manager,
                PublishRateRequest {
                    metal_type: MetalType::Gold,
                    purity: "22K".to_string(),
                    rate_per_gram: "6000.00".to_string(),
                    valid_until: None,
                    default_making_charge_percent: "8".to_string(),
                },
            )
            .await
            .unwrap();

        let product = bo
            .store()
            .products()
            .insert(NewProduct {
                sku: "GR-22K-001".to_string(),
                name: "Gold ring".to_string(),
                metal_type: MetalType::Gold,
                purity: "22K".to_string(),
                net_weight: Weight::from_grams(10),
                wastage: Percent::from_bps(200),
                making_charges: Money::from_rupees(500),
                stone_value: Money::zero(),
                reorder_level: 0,
                huid: None,
            })
            .await
            .unwrap();
        let item = bo
            .store()
            .stock()
            .insert(NewStockItem {
                product_id: product.id,
                tag_id: "TAG-0001".to_string(),
                barcode: None,
                purchase_cost: Money::zero(),
            })
            .await
            .unwrap();

        let order = bo.store().orders().create("cust-1", Money::zero()).await.unwrap();
        bo.store()
            .orders()
            .add_line(&order.id, &item.id, Money::from_rupees(10_000))
            .await
            .unwrap();

        (bo, order.id)
    }

    fn pay(order_id: &str, amount: &str) -> OrderPaymentRequest {
        OrderPaymentRequest {
            order_id: order_id.to_string(),
            amount: amount.to_string(),
            method: PaymentMethod::Cash,
            reference: None,
            request_id: None,
        }
    }

    #[tokio::test]
    async fn test_partial_then_settling_payment() {
        let (bo, order_id) = seeded_with_order().await;
        let accountant = Session::new("u-3", Role::Accountant);

        let first = bo
            .payments()
            .record_order_payment(&accountant, pay(&order_id, "4000.00"))
            .await
            .unwrap();
        assert!(first.applied);
        assert_eq!(first.order.payment_status, PaymentStatus::Partial);
        assert_eq!(first.order.pending_amount, "6000.00");

        let second = bo
            .payments()
            .record_order_payment(&accountant, pay(&order_id, "6000.00"))
            .await
            .unwrap();
        assert_eq!(second.order.payment_status, PaymentStatus::Paid);
        assert_eq!(second.order.pending_amount, "0.00");

        // one more paisa is rejected now
        let err = bo
            .payments()
            .record_order_payment(&accountant, pay(&order_id, "0.01"))
            .await
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::OrderFullyPaid);
    }

    #[tokio::test]
    async fn test_overpay_rejected_with_code() {
        let (bo, order_id) = seeded_with_order().await;
        let accountant = Session::new("u-3", Role::Accountant);

        let err = bo
            .payments()
            .record_order_payment(&accountant, pay(&order_id, "10000.01"))
            .await
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::PaymentExceedsBalance);
    }

    #[tokio::test]
    async fn test_precision_and_sign_rejected_at_boundary() {
        let (bo, order_id) = seeded_with_order().await;
        let accountant = Session::new("u-3", Role::Accountant);

        let err = bo
            .payments()
            .record_order_payment(&accountant, pay(&order_id, "100.001"))
            .await
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::ValidationError);

        let err = bo
            .payments()
            .record_order_payment(&accountant, pay(&order_id, "-5"))
            .await
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::ValidationError);
    }

    #[tokio::test]
    async fn test_idempotent_retry_replays() {
        let (bo, order_id) = seeded_with_order().await;
        let accountant = Session::new("u-3", Role::Accountant);

        let mut request = pay(&order_id, "4000.00");
        request.request_id = Some("req-1".to_string());

        let first = bo
            .payments()
            .record_order_payment(&accountant, request.clone())
            .await
            .unwrap();
        let retry = bo
            .payments()
            .record_order_payment(&accountant, request)
            .await
            .unwrap();

        assert!(first.applied);
        assert!(!retry.applied);
        assert_eq!(retry.payment_id, first.payment_id);
        assert_eq!(retry.order.paid_amount, "4000.00");
    }

    #[tokio::test]
    async fn test_installment_payment_flow() {
        let (bo, order_id) = seeded_with_order().await;
        let accountant = Session::new("u-3", Role::Accountant);

        let (plan, installments) = bo
            .store()
            .emi()
            .open_plan(
                &order_id,
                Money::from_rupees(6_000),
                3,
                chrono::Utc::now().date_naive(),
            )
            .await
            .unwrap();

        let response = bo
            .payments()
            .record_installment_payment(
                &accountant,
                InstallmentPaymentRequest {
                    plan_id: plan.id.clone(),
                    installment_id: installments[0].id.clone(),
                    amount: "2000.00".to_string(),
                    method: PaymentMethod::Upi,
                    reference: Some("upi-1".to_string()),
                    request_id: None,
                },
            )
            .await
            .unwrap();

        assert_eq!(response.installment_status, InstallmentStatus::Paid);
        assert_eq!(response.installment_remaining, "0.00");
        assert_eq!(response.plan_paid, "2000.00");
        assert!(!response.plan_completed);

        // overpaying the second installment is rejected
        let err = bo
            .payments()
            .record_installment_payment(
                &accountant,
                InstallmentPaymentRequest {
                    plan_id: plan.id.clone(),
                    installment_id: installments[1].id.clone(),
                    amount: "2000.01".to_string(),
                    method: PaymentMethod::Cash,
                    reference: None,
                    request_id: None,
                },
            )
            .await
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::BusinessRule);
    }
}
