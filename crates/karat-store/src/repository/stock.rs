//! # Stock Item Repository
//!
//! Database operations for physically tagged stock items.
//!
//! ## The Reservation Guard
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │              Two terminals sell the same bangle                     │
//! │                                                                     │
//! │  Terminal A                         Terminal B                      │
//! │  UPDATE stock_items                 UPDATE stock_items              │
//! │    SET status='reserved', ...         SET status='reserved', ...    │
//! │    WHERE id=X AND                     WHERE id=X AND                │
//! │          status='available'                 status='available'      │
//! │       │                                  │                          │
//! │       ▼                                  ▼                          │
//! │  rows_affected = 1  ✓               rows_affected = 0  ✗            │
//! │  (item is theirs)                   (StockItemUnavailable)          │
//! │                                                                     │
//! │  The check and the set are ONE statement, so SQLite's writer        │
//! │  serialization decides the race. No read-then-write window.         │
//! └─────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The transition helpers in this module come in two flavors: public
//! methods that own their transaction, and `pub(crate)` functions
//! taking a connection so the order workflows can run them inside a
//! larger transaction.

use chrono::{DateTime, Utc};
use sqlx::{SqliteConnection, SqlitePool};
use tracing::debug;
use uuid::Uuid;

use crate::error::{StoreError, StoreResult};
use karat_core::{CoreError, Money, StockItem, StockStatus};

/// Column list shared by every stock item SELECT.
const STOCK_COLUMNS: &str = "id, product_id, tag_id, barcode, status, purchase_cost_paise, \
     sale_date, sales_order_line_id, created_at, updated_at";

/// Input for receiving a new stock item.
#[derive(Debug, Clone)]
pub struct NewStockItem {
    pub product_id: String,
    pub tag_id: String,
    pub barcode: Option<String>,
    pub purchase_cost: Money,
}

/// Repository for stock item database operations.
#[derive(Debug, Clone)]
pub struct StockRepository {
    pool: SqlitePool,
}

impl StockRepository {
    /// Creates a new StockRepository.
    pub fn new(pool: SqlitePool) -> Self {
        StockRepository { pool }
    }

    /// Receives a new stock item into inventory as Available.
    pub async fn insert(&self, new: NewStockItem) -> StoreResult<StockItem> {
        let now = Utc::now();
        let item = StockItem {
            id: Uuid::new_v4().to_string(),
            product_id: new.product_id,
            tag_id: new.tag_id,
            barcode: new.barcode,
            status: StockStatus::Available,
            purchase_cost_paise: new.purchase_cost.paise(),
            sale_date: None,
            sales_order_line_id: None,
            created_at: now,
            updated_at: now,
        };

        debug!(tag_id = %item.tag_id, product_id = %item.product_id, "Receiving stock item");

        sqlx::query(
            "INSERT INTO stock_items (
                id, product_id, tag_id, barcode, status, purchase_cost_paise,
                sale_date, sales_order_line_id, created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
        )
        .bind(&item.id)
        .bind(&item.product_id)
        .bind(&item.tag_id)
        .bind(&item.barcode)
        .bind(item.status)
        .bind(item.purchase_cost_paise)
        .bind(item.sale_date)
        .bind(&item.sales_order_line_id)
        .bind(item.created_at)
        .bind(item.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(item)
    }

    /// Gets a stock item by its id.
    pub async fn get_by_id(&self, id: &str) -> StoreResult<Option<StockItem>> {
        let item = sqlx::query_as::<_, StockItem>(&format!(
            "SELECT {STOCK_COLUMNS} FROM stock_items WHERE id = ?1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(item)
    }

    /// Gets a stock item by its physical tag.
    pub async fn get_by_tag(&self, tag_id: &str) -> StoreResult<Option<StockItem>> {
        let item = sqlx::query_as::<_, StockItem>(&format!(
            "SELECT {STOCK_COLUMNS} FROM stock_items WHERE tag_id = ?1"
        ))
        .bind(tag_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(item)
    }

    /// Lists items linked to the lines of an order.
    pub async fn list_for_order(&self, order_id: &str) -> StoreResult<Vec<StockItem>> {
        let items = sqlx::query_as::<_, StockItem>(
            "SELECT s.id, s.product_id, s.tag_id, s.barcode, s.status,
                    s.purchase_cost_paise, s.sale_date, s.sales_order_line_id,
                    s.created_at, s.updated_at
             FROM stock_items s
             INNER JOIN sales_order_lines l ON l.id = s.sales_order_line_id
             WHERE l.order_id = ?1
             ORDER BY l.created_at",
        )
        .bind(order_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(items)
    }

    /// Counts Available items for a product (reorder-level checks).
    pub async fn available_count(&self, product_id: &str) -> StoreResult<i64> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM stock_items WHERE product_id = ?1 AND status = 'available'",
        )
        .bind(product_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(count)
    }

    /// Reserves an Available item for a sales order line.
    ///
    /// Standalone flavor that owns its transaction. Fails with
    /// `StockItemUnavailable` if a concurrent request got the item
    /// first, or `StockItemNotFound` if the id is unknown.
    pub async fn reserve(&self, item_id: &str, line_id: &str) -> StoreResult<StockItem> {
        let mut tx = self.pool.begin().await?;
        reserve_with(&mut tx, item_id, line_id, Utc::now()).await?;

        let item = sqlx::query_as::<_, StockItem>(&format!(
            "SELECT {STOCK_COLUMNS} FROM stock_items WHERE id = ?1"
        ))
        .bind(item_id)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(item)
    }
}

// =============================================================================
// Transition helpers (shared with the order workflows)
// =============================================================================

/// Reserves one Available item inside an open transaction.
///
/// The availability check and the status write are a single conditional
/// UPDATE; zero rows affected means the item was not Available (or does
/// not exist), and a follow-up read tells the two cases apart.
pub(crate) async fn reserve_with(
    tx: &mut sqlx::Transaction<'_, sqlx::Sqlite>,
    item_id: &str,
    line_id: &str,
    now: DateTime<Utc>,
) -> StoreResult<()> {
    let result = sqlx::query(
        "UPDATE stock_items SET
            status = 'reserved',
            sales_order_line_id = ?2,
            updated_at = ?3
         WHERE id = ?1 AND status = 'available'",
    )
    .bind(item_id)
    .bind(line_id)
    .bind(now)
    .execute(&mut **tx)
    .await?;

    if result.rows_affected() == 0 {
        return Err(unavailable_reason(&mut **tx, item_id).await);
    }

    debug!(item_id = %item_id, line_id = %line_id, "Stock item reserved");
    Ok(())
}

/// Marks every Reserved item on an order's lines as Sold, stamping the
/// sale date. Runs inside the caller's transaction.
pub(crate) async fn mark_sold_for_order(
    tx: &mut sqlx::Transaction<'_, sqlx::Sqlite>,
    order_id: &str,
    now: DateTime<Utc>,
) -> StoreResult<u64> {
    let result = sqlx::query(
        "UPDATE stock_items SET
            status = 'sold',
            sale_date = ?2,
            updated_at = ?2
         WHERE status = 'reserved'
           AND sales_order_line_id IN (
               SELECT id FROM sales_order_lines WHERE order_id = ?1
           )",
    )
    .bind(order_id)
    .bind(now)
    .execute(&mut **tx)
    .await?;

    Ok(result.rows_affected())
}

/// Returns every item linked to an order's lines to Available, clearing
/// the sale date and the line linkage. Runs inside the caller's
/// transaction so the release is all-or-nothing with the order update.
pub(crate) async fn release_all_for_order(
    tx: &mut sqlx::Transaction<'_, sqlx::Sqlite>,
    order_id: &str,
    now: DateTime<Utc>,
) -> StoreResult<u64> {
    let result = sqlx::query(
        "UPDATE stock_items SET
            status = 'available',
            sale_date = NULL,
            sales_order_line_id = NULL,
            updated_at = ?2
         WHERE sales_order_line_id IN (
               SELECT id FROM sales_order_lines WHERE order_id = ?1
           )",
    )
    .bind(order_id)
    .bind(now)
    .execute(&mut **tx)
    .await?;

    debug!(order_id = %order_id, released = result.rows_affected(), "Stock released for order");
    Ok(result.rows_affected())
}

/// Explains a failed reservation: unknown id vs. already taken.
async fn unavailable_reason(conn: &mut SqliteConnection, item_id: &str) -> StoreError {
    let current = sqlx::query_as::<_, StockItem>(&format!(
        "SELECT {STOCK_COLUMNS} FROM stock_items WHERE id = ?1"
    ))
    .bind(item_id)
    .fetch_optional(conn)
    .await;

    match current {
        Ok(Some(item)) => StoreError::Domain(CoreError::StockItemUnavailable {
            tag_id: item.tag_id,
            status: item.status,
        }),
        Ok(None) => StoreError::Domain(CoreError::StockItemNotFound(item_id.to_string())),
        Err(e) => e.into(),
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::{Store, StoreConfig};
    use crate::repository::product::NewProduct;
    use karat_core::{MetalType, Percent, Weight};

    async fn store_with_product() -> (Store, String) {
        let store = Store::new(StoreConfig::in_memory()).await.unwrap();
        let product = store
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
                reorder_level: 1,
                huid: None,
            })
            .await
            .unwrap();
        (store, product.id)
    }

    #[tokio::test]
    async fn test_insert_and_fetch_by_tag() {
        let (store, product_id) = store_with_product().await;
        let item = store
            .stock()
            .insert(NewStockItem {
                product_id,
                tag_id: "TAG-0001".to_string(),
                barcode: Some("8901234567890".to_string()),
                purchase_cost: Money::from_rupees(48_000),
            })
            .await
            .unwrap();

        assert_eq!(item.status, StockStatus::Available);

        let fetched = store.stock().get_by_tag("TAG-0001").await.unwrap().unwrap();
        assert_eq!(fetched.id, item.id);
        assert!(fetched.sale_date.is_none());
    }

    #[tokio::test]
    async fn test_reserve_takes_the_item_exactly_once() {
        let (store, product_id) = store_with_product().await;
        let item = store
            .stock()
            .insert(NewStockItem {
                product_id,
                tag_id: "TAG-0002".to_string(),
                barcode: None,
                purchase_cost: Money::zero(),
            })
            .await
            .unwrap();

        let reserved = store.stock().reserve(&item.id, "line-1").await.unwrap();
        assert_eq!(reserved.status, StockStatus::Reserved);
        assert_eq!(reserved.sales_order_line_id.as_deref(), Some("line-1"));

        // second reservation loses the race
        let err = store.stock().reserve(&item.id, "line-2").await.unwrap_err();
        assert!(matches!(
            err,
            StoreError::Domain(CoreError::StockItemUnavailable { .. })
        ));
    }

    #[tokio::test]
    async fn test_reserve_unknown_item_is_not_found() {
        let (store, _) = store_with_product().await;
        let err = store.stock().reserve("no-such-id", "line-1").await.unwrap_err();
        assert!(matches!(
            err,
            StoreError::Domain(CoreError::StockItemNotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_available_count() {
        let (store, product_id) = store_with_product().await;
        for n in 0..3 {
            store
                .stock()
                .insert(NewStockItem {
                    product_id: product_id.clone(),
                    tag_id: format!("TAG-1{n:03}"),
                    barcode: None,
                    purchase_cost: Money::zero(),
                })
                .await
                .unwrap();
        }

        assert_eq!(store.stock().available_count(&product_id).await.unwrap(), 3);

        let item = store.stock().get_by_tag("TAG-1000").await.unwrap().unwrap();
        store.stock().reserve(&item.id, "line-9").await.unwrap();
        assert_eq!(store.stock().available_count(&product_id).await.unwrap(), 2);
    }
}
