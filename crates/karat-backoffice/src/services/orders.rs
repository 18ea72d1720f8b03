//! # Order Service
//!
//! Sales order creation and line management. Adding a line is where
//! the live price gets frozen: the service resolves the current rate,
//! runs the breakdown, and hands the total to the store, which
//! reserves the stock item and books the line in one transaction.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::audit;
use crate::error::{ServiceError, ServiceResult};
use crate::metrics::{counters, MetricsSink};
use karat_core::pricing::{calculate_price, pricing_input_for_product};
use karat_core::{authorize, Money, OrderStatus, PaymentStatus, Permission, SalesOrder, Session};
use karat_store::Store;

/// Request to create an order.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateOrderRequest {
    pub customer_id: String,
    /// Whole-order discount as a decimal string, at most 2 places.
    pub discount: String,
}

/// An order as seen by callers.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderDto {
    pub order_id: String,
    pub order_number: String,
    pub customer_id: String,
    pub status: OrderStatus,
    pub order_total: String,
    pub discount: String,
    pub final_amount: String,
    pub paid_amount: String,
    pub pending_amount: String,
    pub payment_status: PaymentStatus,
}

impl From<SalesOrder> for OrderDto {
    fn from(order: SalesOrder) -> Self {
        OrderDto {
            order_id: order.id.clone(),
            order_number: order.order_number.clone(),
            customer_id: order.customer_id.clone(),
            status: order.status,
            order_total: order.order_total().to_decimal_string(),
            discount: order.discount().to_decimal_string(),
            final_amount: order.final_amount().to_decimal_string(),
            paid_amount: order.paid_amount().to_decimal_string(),
            pending_amount: order.pending_amount().to_decimal_string(),
            payment_status: order.payment_status,
        }
    }
}

/// Outcome of adding a line.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AddLineResponse {
    pub line_id: String,
    pub stock_item_id: String,
    pub sku: String,
    /// The frozen line price.
    pub price: String,
    pub order: OrderDto,
}

/// Service for sales order operations.
#[derive(Clone)]
pub struct OrderService {
    store: Store,
    metrics: Arc<dyn MetricsSink>,
}

impl OrderService {
    pub(crate) fn new(store: Store, metrics: Arc<dyn MetricsSink>) -> Self {
        OrderService { store, metrics }
    }

    /// Creates a new open order.
    pub async fn create_order(
        &self,
        session: &Session,
        request: CreateOrderRequest,
    ) -> ServiceResult<OrderDto> {
        authorize(session, Permission::SellStock)?;

        let discount = Money::parse_str(&request.discount)?;
        karat_core::validation::validate_non_negative_amount("discount", discount)?;

        let order = self
            .store
            .orders()
            .create(&request.customer_id, discount)
            .await?;

        audit::record_best_effort(
            &self.store,
            session,
            "create_order",
            "sales_order",
            &order.id,
            Some(order.order_number.clone()),
        )
        .await;

        Ok(order.into())
    }

    /// Gets an order by id.
    pub async fn get_order(&self, session: &Session, order_id: &str) -> ServiceResult<OrderDto> {
        authorize(session, Permission::SellStock)?;

        let order = self
            .store
            .orders()
            .get_by_id(order_id)
            .await?
            .ok_or_else(|| ServiceError::not_found("Sales order", order_id))?;

        Ok(order.into())
    }

    /// Adds a stock item to an open order at the live price.
    ///
    /// The price is computed here, from the current rate and the
    /// item's product specification, then frozen on the line. The
    /// store reserves the item and recalculates totals atomically.
    pub async fn add_line(
        &self,
        session: &Session,
        order_id: &str,
        stock_item_id: &str,
    ) -> ServiceResult<AddLineResponse> {
        authorize(session, Permission::SellStock)?;

        let item = self
            .store
            .stock()
            .get_by_id(stock_item_id)
            .await?
            .ok_or_else(|| ServiceError::not_found("Stock item", stock_item_id))?;
        let product = self
            .store
            .products()
            .get_by_id(&item.product_id)
            .await?
            .ok_or_else(|| ServiceError::not_found("Product", &item.product_id))?;

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
        let price = calculate_price(&input)?.total;

        let line = self.store.orders().add_line(order_id, stock_item_id, price).await?;
        let order = self
            .store
            .orders()
            .get_by_id(order_id)
            .await?
            .ok_or_else(|| ServiceError::not_found("Sales order", order_id))?;

        debug!(order_id = %order_id, line_id = %line.id, price = %price, "Line priced and added");
        self.metrics.incr(counters::ITEMS_RESERVED);
        audit::record_best_effort(
            &self.store,
            session,
            "add_order_line",
            "sales_order",
            order_id,
            Some(format!("{} at {}", line.sku_snapshot, price)),
        )
        .await;

        Ok(AddLineResponse {
            line_id: line.id,
            stock_item_id: line.stock_item_id,
            sku: line.sku_snapshot,
            price: price.to_decimal_string(),
            order: order.into(),
        })
    }

    /// Completes a fully paid order, marking its items Sold.
    pub async fn complete_order(
        &self,
        session: &Session,
        order_id: &str,
    ) -> ServiceResult<OrderDto> {
        authorize(session, Permission::SellStock)?;

        let order = self.store.orders().complete(order_id).await?;

        audit::record_best_effort(
            &self.store,
            session,
            "complete_order",
            "sales_order",
            order_id,
            None,
        )
        .await;

        Ok(order.into())
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
    use karat_core::{MetalType, Percent, Role, Weight};
    use karat_store::{NewProduct, NewStockItem, StoreConfig};

    async fn seeded() -> (Backoffice, String) {
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
                purchase_cost: Money::from_rupees(48_000),
            })
            .await
            .unwrap();

        (bo, item.id)
    }

    #[tokio::test]
    async fn test_add_line_freezes_live_price() {
        let (bo, item_id) = seeded().await;
        let staff = Session::new("u-2", Role::SalesStaff);

        let order = bo
            .orders()
            .create_order(
                &staff,
                CreateOrderRequest {
                    customer_id: "cust-1".to_string(),
                    discount: "0".to_string(),
                },
            )
            .await
            .unwrap();

        let added = bo.orders().add_line(&staff, &order.order_id, &item_id).await.unwrap();
        // catalog carries a flat ₹500 making charge, so the quote is
        // the reference 61,700.00
        assert_eq!(added.price, "61700.00");
        assert_eq!(added.order.final_amount, "61700.00");
        assert_eq!(added.order.pending_amount, "61700.00");
    }

    #[tokio::test]
    async fn test_accountant_cannot_sell() {
        let (bo, _item_id) = seeded().await;
        let accountant = Session::new("u-3", Role::Accountant);

        let err = bo
            .orders()
            .create_order(
                &accountant,
                CreateOrderRequest {
                    customer_id: "cust-1".to_string(),
                    discount: "0".to_string(),
                },
            )
            .await
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::PermissionDenied);
    }

    #[tokio::test]
    async fn test_add_line_without_rate_is_rejected() {
        let (bo, _) = seeded().await;
        let staff = Session::new("u-2", Role::SalesStaff);

        // a silver product with no published silver rate
        let product = bo
            .store()
            .products()
            .insert(NewProduct {
                sku: "SC-925-001".to_string(),
                name: "Silver chain".to_string(),
                metal_type: MetalType::Silver,
                purity: "925".to_string(),
                net_weight: Weight::from_grams(25),
                wastage: Percent::from_bps(100),
                making_charges: Money::from_rupees(200),
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
                tag_id: "TAG-S001".to_string(),
                barcode: None,
                purchase_cost: Money::zero(),
            })
            .await
            .unwrap();

        let order = bo
            .orders()
            .create_order(
                &staff,
                CreateOrderRequest {
                    customer_id: "cust-1".to_string(),
                    discount: "0".to_string(),
                },
            )
            .await
            .unwrap();

        let err = bo
            .orders()
            .add_line(&staff, &order.order_id, &item.id)
            .await
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::RateUnavailable);
    }
}
