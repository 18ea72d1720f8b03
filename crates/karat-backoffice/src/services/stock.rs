//! # Stock Service
//!
//! Receiving, reserving, and releasing physically tagged stock.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::audit;
use crate::error::{ServiceError, ServiceResult};
use crate::metrics::{counters, MetricsSink};
use karat_core::{authorize, Money, Permission, Session, StockItem, StockStatus};
use karat_store::{NewStockItem, Store};

/// Request to receive a piece into inventory.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReceiveItemRequest {
    pub product_id: String,
    pub tag_id: String,
    pub barcode: Option<String>,
    /// Purchase cost as a decimal string, at most 2 places.
    pub purchase_cost: String,
}

/// A stock item as seen by callers.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StockItemDto {
    pub item_id: String,
    pub product_id: String,
    pub tag_id: String,
    pub barcode: Option<String>,
    pub status: StockStatus,
    pub sale_date: Option<String>,
    pub sales_order_line_id: Option<String>,
}

impl From<StockItem> for StockItemDto {
    fn from(item: StockItem) -> Self {
        StockItemDto {
            item_id: item.id,
            product_id: item.product_id,
            tag_id: item.tag_id,
            barcode: item.barcode,
            status: item.status,
            sale_date: item.sale_date.map(|t| t.to_rfc3339()),
            sales_order_line_id: item.sales_order_line_id,
        }
    }
}

/// Outcome of an order release.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReleaseResponse {
    pub order_id: String,
    pub items_released: u64,
}

/// Service for stock item operations.
#[derive(Clone)]
pub struct StockService {
    store: Store,
    metrics: Arc<dyn MetricsSink>,
}

impl StockService {
    pub(crate) fn new(store: Store, metrics: Arc<dyn MetricsSink>) -> Self {
        StockService { store, metrics }
    }

    /// Receives a new piece into inventory as Available.
    pub async fn receive_item(
        &self,
        session: &Session,
        request: ReceiveItemRequest,
    ) -> ServiceResult<StockItemDto> {
        authorize(session, Permission::ManageStock)?;
        karat_core::validation::validate_tag_id(&request.tag_id)?;

        let purchase_cost = Money::parse_str(&request.purchase_cost)?;
        karat_core::validation::validate_non_negative_amount("purchase_cost", purchase_cost)?;

        let item = self
            .store
            .stock()
            .insert(NewStockItem {
                product_id: request.product_id,
                tag_id: request.tag_id,
                barcode: request.barcode,
                purchase_cost,
            })
            .await?;

        audit::record_best_effort(
            &self.store,
            session,
            "receive_stock_item",
            "stock_item",
            &item.id,
            Some(item.tag_id.clone()),
        )
        .await;

        Ok(item.into())
    }

    /// Looks up a stock item by its physical tag.
    pub async fn get_by_tag(&self, session: &Session, tag_id: &str) -> ServiceResult<StockItemDto> {
        authorize(session, Permission::SellStock)?;

        let item = self
            .store
            .stock()
            .get_by_tag(tag_id)
            .await?
            .ok_or_else(|| ServiceError::not_found("Stock item", tag_id))?;

        Ok(item.into())
    }

    /// Reserves an Available item for a sales order line.
    ///
    /// A lost race surfaces as `STOCK_UNAVAILABLE`; the caller retries
    /// with a different piece, never with force.
    pub async fn reserve_item(
        &self,
        session: &Session,
        item_id: &str,
        line_id: &str,
    ) -> ServiceResult<StockItemDto> {
        authorize(session, Permission::SellStock)?;

        let item = self.store.stock().reserve(item_id, line_id).await?;

        self.metrics.incr(counters::ITEMS_RESERVED);
        audit::record_best_effort(
            &self.store,
            session,
            "reserve_stock_item",
            "stock_item",
            item_id,
            Some(format!("line {}", line_id)),
        )
        .await;

        Ok(item.into())
    }

    /// Cancels an order and releases every one of its stock items back
    /// to Available. All lines or none.
    pub async fn release_order(
        &self,
        session: &Session,
        order_id: &str,
    ) -> ServiceResult<ReleaseResponse> {
        authorize(session, Permission::SellStock)?;

        let (order, released) = self.store.orders().cancel(order_id).await?;

        self.metrics.incr(counters::ORDERS_RELEASED);
        audit::record_best_effort(
            &self.store,
            session,
            "release_order_stock",
            "sales_order",
            &order.id,
            Some(format!("{} item(s) released", released)),
        )
        .await;

        Ok(ReleaseResponse {
            order_id: order.id,
            items_released: released,
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
    use crate::Backoffice;
    use karat_core::{MetalType, Percent, Role, Weight};
    use karat_store::{NewProduct, StoreConfig};

    async fn seeded() -> (Backoffice, String) {
        let store = karat_store::Store::new(StoreConfig::in_memory()).await.unwrap();
        let bo = Backoffice::new(store);
        let product = bo
            .store()
            .products()
            .insert(NewProduct {
                sku: "GB-22K-001".to_string(),
                name: "Gold bangle".to_string(),
                metal_type: MetalType::Gold,
                purity: "22K".to_string(),
                net_weight: Weight::from_grams(12),
                wastage: Percent::from_bps(250),
                making_charges: Money::from_rupees(800),
                stone_value: Money::zero(),
                reorder_level: 0,
                huid: None,
            })
            .await
            .unwrap();
        (bo, product.id)
    }

    #[tokio::test]
    async fn test_receive_requires_manage_stock() {
        let (bo, product_id) = seeded().await;
        let staff = Session::new("u-2", Role::SalesStaff);

        let err = bo
            .stock()
            .receive_item(
                &staff,
                ReceiveItemRequest {
                    product_id: product_id.clone(),
                    tag_id: "TAG-0001".to_string(),
                    barcode: None,
                    purchase_cost: "48000.00".to_string(),
                },
            )
            .await
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::PermissionDenied);

        let manager = Session::new("u-1", Role::Manager);
        let item = bo
            .stock()
            .receive_item(
                &manager,
                ReceiveItemRequest {
                    product_id,
                    tag_id: "TAG-0001".to_string(),
                    barcode: None,
                    purchase_cost: "48000.00".to_string(),
                },
            )
            .await
            .unwrap();
        assert_eq!(item.status, StockStatus::Available);
    }

    #[tokio::test]
    async fn test_reserve_race_surfaces_conflict() {
        let (bo, product_id) = seeded().await;
        let manager = Session::new("u-1", Role::Manager);
        let staff = Session::new("u-2", Role::SalesStaff);

        let item = bo
            .stock()
            .receive_item(
                &manager,
                ReceiveItemRequest {
                    product_id,
                    tag_id: "TAG-0002".to_string(),
                    barcode: None,
                    purchase_cost: "0".to_string(),
                },
            )
            .await
            .unwrap();

        bo.stock().reserve_item(&staff, &item.item_id, "line-1").await.unwrap();

        let err = bo
            .stock()
            .reserve_item(&staff, &item.item_id, "line-2")
            .await
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::StockUnavailable);
    }
}
