//! # Sales Order Repository
//!
//! Database operations for sales orders, lines, and payments.
//!
//! ## Order Lifecycle
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │                      Sales Order Lifecycle                          │
//! │                                                                     │
//! │  1. CREATE                                                          │
//! │     └── create() → SalesOrder { status: Open, totals: 0 }           │
//! │                                                                     │
//! │  2. ADD LINES                                                       │
//! │     └── add_line() → reserves the stock item + inserts the line     │
//! │                      + recalculates order totals, one transaction   │
//! │                                                                     │
//! │  3. RECORD PAYMENTS (any number, until fully paid)                  │
//! │     └── record_payment() → payment row + paid_amount roll-up        │
//! │                            + ledger entry, one transaction          │
//! │                                                                     │
//! │  4a. COMPLETE                       4b. CANCEL                      │
//! │      └── items Reserved→Sold            └── items → Available,      │
//! │          order → Completed                  sale_date cleared,      │
//! │                                             order → Cancelled       │
//! └─────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Every step that touches more than one row is a single transaction;
//! a failure anywhere rolls the whole step back.

use chrono::Utc;
use sqlx::SqlitePool;
use tracing::{debug, info};
use uuid::Uuid;

use crate::error::{StoreError, StoreResult};
use crate::repository::{ledger, stock};
use karat_core::{
    CoreError, LedgerSource, Money, OrderStatus, PaymentMethod, PaymentStatus, SalesOrder,
    SalesOrderLine, SalesPayment, ValidationError,
};

/// Column list shared by every order SELECT.
const ORDER_COLUMNS: &str = "id, order_number, customer_id, status, order_total_paise, \
     discount_paise, final_amount_paise, paid_amount_paise, payment_status, \
     created_at, updated_at";

/// Column list shared by every payment SELECT.
const PAYMENT_COLUMNS: &str = "id, order_id, amount_paise, method, reference, request_id, paid_at";

/// Outcome of a successful (or replayed) payment recording.
#[derive(Debug, Clone)]
pub struct PaymentOutcome {
    pub payment: SalesPayment,
    pub order: SalesOrder,
    /// False when a retried request id replayed an earlier payment.
    pub applied: bool,
}

/// Repository for sales order database operations.
#[derive(Debug, Clone)]
pub struct OrderRepository {
    pool: SqlitePool,
}

impl OrderRepository {
    /// Creates a new OrderRepository.
    pub fn new(pool: SqlitePool) -> Self {
        OrderRepository { pool }
    }

    /// Creates a new open order with zero totals.
    pub async fn create(&self, customer_id: &str, discount: Money) -> StoreResult<SalesOrder> {
        if discount.is_negative() {
            return Err(CoreError::Validation(ValidationError::MustBeNonNegative {
                field: "discount".to_string(),
            })
            .into());
        }

        let now = Utc::now();
        let order = SalesOrder {
            id: Uuid::new_v4().to_string(),
            order_number: generate_order_number(),
            customer_id: customer_id.to_string(),
            status: OrderStatus::Open,
            order_total_paise: 0,
            discount_paise: discount.paise(),
            final_amount_paise: 0,
            paid_amount_paise: 0,
            payment_status: PaymentStatus::Pending,
            created_at: now,
            updated_at: now,
        };

        debug!(id = %order.id, order_number = %order.order_number, "Creating order");

        sqlx::query(
            "INSERT INTO sales_orders (
                id, order_number, customer_id, status, order_total_paise,
                discount_paise, final_amount_paise, paid_amount_paise,
                payment_status, created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
        )
        .bind(&order.id)
        .bind(&order.order_number)
        .bind(&order.customer_id)
        .bind(order.status)
        .bind(order.order_total_paise)
        .bind(order.discount_paise)
        .bind(order.final_amount_paise)
        .bind(order.paid_amount_paise)
        .bind(order.payment_status)
        .bind(order.created_at)
        .bind(order.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(order)
    }

    /// Gets an order by id.
    pub async fn get_by_id(&self, id: &str) -> StoreResult<Option<SalesOrder>> {
        let order = sqlx::query_as::<_, SalesOrder>(&format!(
            "SELECT {ORDER_COLUMNS} FROM sales_orders WHERE id = ?1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(order)
    }

    /// Gets all lines of an order, oldest first.
    pub async fn lines(&self, order_id: &str) -> StoreResult<Vec<SalesOrderLine>> {
        let lines = sqlx::query_as::<_, SalesOrderLine>(
            "SELECT id, order_id, stock_item_id, sku_snapshot, name_snapshot,
                    price_paise, created_at
             FROM sales_order_lines
             WHERE order_id = ?1
             ORDER BY created_at, id",
        )
        .bind(order_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(lines)
    }

    /// Gets all payments recorded against an order, oldest first.
    pub async fn payments(&self, order_id: &str) -> StoreResult<Vec<SalesPayment>> {
        let payments = sqlx::query_as::<_, SalesPayment>(&format!(
            "SELECT {PAYMENT_COLUMNS} FROM sales_payments
             WHERE order_id = ?1
             ORDER BY paid_at, id"
        ))
        .bind(order_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(payments)
    }

    /// Sum of recorded payments for an order.
    pub async fn total_paid(&self, order_id: &str) -> StoreResult<Money> {
        let total: Option<i64> =
            sqlx::query_scalar("SELECT SUM(amount_paise) FROM sales_payments WHERE order_id = ?1")
                .bind(order_id)
                .fetch_one(&self.pool)
                .await?;

        Ok(Money::from_paise(total.unwrap_or(0)))
    }

    /// Adds a line to an open order, reserving the stock item.
    ///
    /// ## Atomicity
    /// Reservation, line insert, and total recalculation commit as one
    /// transaction. A reservation race rolls everything back and
    /// surfaces `StockItemUnavailable`.
    ///
    /// `price` is the agreed line price, already computed from the
    /// current rate by the pricing flow.
    pub async fn add_line(
        &self,
        order_id: &str,
        stock_item_id: &str,
        price: Money,
    ) -> StoreResult<SalesOrderLine> {
        if price.is_negative() {
            return Err(CoreError::Validation(ValidationError::MustBeNonNegative {
                field: "price".to_string(),
            })
            .into());
        }

        let now = Utc::now();
        let mut tx = self.pool.begin().await?;

        let order = fetch_order_tx(&mut tx, order_id).await?;
        if order.status != OrderStatus::Open {
            return Err(CoreError::InvalidOrderStatus {
                order_id: order_id.to_string(),
                status: order.status.as_str().to_string(),
            }
            .into());
        }

        // Snapshot the catalog data through the stock item's product.
        let snapshot: Option<(String, String)> = sqlx::query_as(
            "SELECT p.sku, p.name
             FROM stock_items s
             INNER JOIN products p ON p.id = s.product_id
             WHERE s.id = ?1",
        )
        .bind(stock_item_id)
        .fetch_optional(&mut *tx)
        .await?;
        let (sku_snapshot, name_snapshot) = snapshot
            .ok_or_else(|| CoreError::StockItemNotFound(stock_item_id.to_string()))?;

        let line = SalesOrderLine {
            id: Uuid::new_v4().to_string(),
            order_id: order_id.to_string(),
            stock_item_id: stock_item_id.to_string(),
            sku_snapshot,
            name_snapshot,
            price_paise: price.paise(),
            created_at: now,
        };

        // Reserve first: the conditional UPDATE is the race guard.
        stock::reserve_with(&mut tx, stock_item_id, &line.id, now).await?;

        sqlx::query(
            "INSERT INTO sales_order_lines (
                id, order_id, stock_item_id, sku_snapshot, name_snapshot,
                price_paise, created_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        )
        .bind(&line.id)
        .bind(&line.order_id)
        .bind(&line.stock_item_id)
        .bind(&line.sku_snapshot)
        .bind(&line.name_snapshot)
        .bind(line.price_paise)
        .bind(line.created_at)
        .execute(&mut *tx)
        .await?;

        let new_total = order.order_total_paise + price.paise();
        let new_final = (new_total - order.discount_paise).max(0);
        let new_payment_status = PaymentStatus::from_amounts(
            order.paid_amount(),
            Money::from_paise(new_final),
        );

        sqlx::query(
            "UPDATE sales_orders SET
                order_total_paise = ?2,
                final_amount_paise = ?3,
                payment_status = ?4,
                updated_at = ?5
             WHERE id = ?1",
        )
        .bind(order_id)
        .bind(new_total)
        .bind(new_final)
        .bind(new_payment_status)
        .bind(now)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        debug!(order_id = %order_id, stock_item_id = %stock_item_id, price = %price, "Line added");
        Ok(line)
    }

    /// Records a payment against an order.
    ///
    /// ## Preconditions (rejected, never clamped)
    /// - order exists and is not cancelled
    /// - order has a pending balance (`OrderFullyPaid` otherwise)
    /// - `amount <= pending` (`PaymentExceedsBalance` otherwise)
    ///
    /// ## Atomicity
    /// Payment insert, paid-amount/payment-status roll-up, and the
    /// mirroring income ledger entry commit as one unit.
    ///
    /// ## Idempotent Retry
    /// When `request_id` is supplied and a payment with that id already
    /// exists on the order, the stored payment and current order are
    /// returned with `applied = false` and nothing is written.
    pub async fn record_payment(
        &self,
        order_id: &str,
        amount: Money,
        method: PaymentMethod,
        reference: Option<&str>,
        request_id: Option<&str>,
    ) -> StoreResult<PaymentOutcome> {
        if !amount.is_positive() {
            return Err(CoreError::Validation(ValidationError::MustBePositive {
                field: "payment amount".to_string(),
            })
            .into());
        }

        let now = Utc::now();
        let mut tx = self.pool.begin().await?;

        // Replay check runs inside the transaction so a concurrent
        // retry of the same request serializes against the insert.
        if let Some(rid) = request_id {
            let existing = sqlx::query_as::<_, SalesPayment>(&format!(
                "SELECT {PAYMENT_COLUMNS} FROM sales_payments
                 WHERE order_id = ?1 AND request_id = ?2"
            ))
            .bind(order_id)
            .bind(rid)
            .fetch_optional(&mut *tx)
            .await?;

            if let Some(payment) = existing {
                let order = fetch_order_tx(&mut tx, order_id).await?;
                tx.commit().await?;
                info!(order_id = %order_id, request_id = %rid, "Payment replayed, not reapplied");
                return Ok(PaymentOutcome {
                    payment,
                    order,
                    applied: false,
                });
            }
        }

        let order = fetch_order_tx(&mut tx, order_id).await?;
        if order.status == OrderStatus::Cancelled {
            return Err(CoreError::InvalidOrderStatus {
                order_id: order_id.to_string(),
                status: order.status.as_str().to_string(),
            }
            .into());
        }

        let pending = order.pending_amount();
        if pending.is_zero() {
            return Err(CoreError::OrderFullyPaid {
                order_id: order_id.to_string(),
            }
            .into());
        }
        if amount > pending {
            return Err(CoreError::PaymentExceedsBalance {
                order_id: order_id.to_string(),
                amount,
                pending,
            }
            .into());
        }

        let payment = SalesPayment {
            id: Uuid::new_v4().to_string(),
            order_id: order_id.to_string(),
            amount_paise: amount.paise(),
            method,
            reference: reference.map(str::to_string),
            request_id: request_id.map(str::to_string),
            paid_at: now,
        };

        sqlx::query(
            "INSERT INTO sales_payments (
                id, order_id, amount_paise, method, reference, request_id, paid_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        )
        .bind(&payment.id)
        .bind(&payment.order_id)
        .bind(payment.amount_paise)
        .bind(payment.method)
        .bind(&payment.reference)
        .bind(&payment.request_id)
        .bind(payment.paid_at)
        .execute(&mut *tx)
        .await?;

        let new_paid = order.paid_amount() + amount;
        let new_status = PaymentStatus::from_amounts(new_paid, order.final_amount());

        sqlx::query(
            "UPDATE sales_orders SET
                paid_amount_paise = ?2,
                payment_status = ?3,
                updated_at = ?4
             WHERE id = ?1",
        )
        .bind(order_id)
        .bind(new_paid.paise())
        .bind(new_status)
        .bind(now)
        .execute(&mut *tx)
        .await?;

        let entry = ledger::entry_for_payment(
            LedgerSource::OrderPayment,
            Some(order_id),
            None,
            &payment.id,
            amount,
            method,
            now,
        );
        ledger::insert_with(&mut tx, &entry).await?;

        tx.commit().await?;

        info!(
            order_id = %order_id,
            payment_id = %payment.id,
            amount = %amount,
            paid = %new_paid,
            status = ?new_status,
            "Payment recorded"
        );

        let updated = SalesOrder {
            paid_amount_paise: new_paid.paise(),
            payment_status: new_status,
            updated_at: now,
            ..order
        };

        Ok(PaymentOutcome {
            payment,
            order: updated,
            applied: true,
        })
    }

    /// Completes a fully paid open order: every reserved item on its
    /// lines becomes Sold with the sale date stamped.
    pub async fn complete(&self, order_id: &str) -> StoreResult<SalesOrder> {
        let now = Utc::now();
        let mut tx = self.pool.begin().await?;

        let order = fetch_order_tx(&mut tx, order_id).await?;
        if order.status != OrderStatus::Open {
            return Err(CoreError::InvalidOrderStatus {
                order_id: order_id.to_string(),
                status: order.status.as_str().to_string(),
            }
            .into());
        }
        if order.payment_status != PaymentStatus::Paid {
            return Err(CoreError::InvalidOrderStatus {
                order_id: order_id.to_string(),
                status: "open with a pending balance".to_string(),
            }
            .into());
        }

        stock::mark_sold_for_order(&mut tx, order_id, now).await?;

        sqlx::query(
            "UPDATE sales_orders SET status = 'completed', updated_at = ?2 WHERE id = ?1",
        )
        .bind(order_id)
        .bind(now)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        info!(order_id = %order_id, "Order completed");
        Ok(SalesOrder {
            status: OrderStatus::Completed,
            updated_at: now,
            ..order
        })
    }

    /// Cancels an order and releases every linked stock item back to
    /// Available, clearing sale dates and line linkage.
    ///
    /// ## Atomicity
    /// All of the order's items are released and the order is marked
    /// Cancelled in one transaction, or nothing happens at all. Returns
    /// the cancelled order and the number of items released.
    pub async fn cancel(&self, order_id: &str) -> StoreResult<(SalesOrder, u64)> {
        let now = Utc::now();
        let mut tx = self.pool.begin().await?;

        let order = fetch_order_tx(&mut tx, order_id).await?;
        if order.status == OrderStatus::Cancelled {
            return Err(CoreError::InvalidOrderStatus {
                order_id: order_id.to_string(),
                status: order.status.as_str().to_string(),
            }
            .into());
        }

        let released = stock::release_all_for_order(&mut tx, order_id, now).await?;

        sqlx::query(
            "UPDATE sales_orders SET status = 'cancelled', updated_at = ?2 WHERE id = ?1",
        )
        .bind(order_id)
        .bind(now)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        info!(order_id = %order_id, released = released, "Order cancelled, stock released");
        Ok((
            SalesOrder {
                status: OrderStatus::Cancelled,
                updated_at: now,
                ..order
            },
            released,
        ))
    }
}

/// Fetches an order inside an open transaction, mapping a missing row
/// to the domain error.
async fn fetch_order_tx(
    tx: &mut sqlx::Transaction<'_, sqlx::Sqlite>,
    order_id: &str,
) -> StoreResult<SalesOrder> {
    let order = sqlx::query_as::<_, SalesOrder>(&format!(
        "SELECT {ORDER_COLUMNS} FROM sales_orders WHERE id = ?1"
    ))
    .bind(order_id)
    .fetch_optional(&mut **tx)
    .await?;

    order.ok_or_else(|| StoreError::Domain(CoreError::OrderNotFound(order_id.to_string())))
}

/// Generates an order number: `SO-YYYYMMDD-xxxxxxxx`.
///
/// The suffix is a random slug so two terminals creating orders in the
/// same instant cannot collide on the UNIQUE order_number index.
// TODO: replace the random suffix with a per-day counter table so
// numbers are gapless for the accountant's filings.
fn generate_order_number() -> String {
    let now = Utc::now();
    let slug = Uuid::new_v4().simple().to_string();
    format!("SO-{}-{}", now.format("%Y%m%d"), &slug[..8])
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::{Store, StoreConfig};
    use crate::repository::product::NewProduct;
    use crate::repository::stock::NewStockItem;
    use karat_core::{MetalType, Percent, StockStatus, Weight};

    async fn seeded_store() -> (Store, Vec<String>) {
        let store = Store::new(StoreConfig::in_memory()).await.unwrap();
        let product = store
            .products()
            .insert(NewProduct {
                sku: "GB-22K-001".to_string(),
                name: "Gold bangle".to_string(),
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

        let mut item_ids = Vec::new();
        for n in 0..3 {
            let item = store
                .stock()
                .insert(NewStockItem {
                    product_id: product.id.clone(),
                    tag_id: format!("TAG-3{n:03}"),
                    barcode: None,
                    purchase_cost: Money::from_rupees(48_000),
                })
                .await
                .unwrap();
            item_ids.push(item.id);
        }
        (store, item_ids)
    }

    /// Order with one line priced at ₹10,000.00.
    async fn open_order(store: &Store, item_id: &str) -> SalesOrder {
        let order = store.orders().create("cust-1", Money::zero()).await.unwrap();
        store
            .orders()
            .add_line(&order.id, item_id, Money::from_rupees(10_000))
            .await
            .unwrap();
        store.orders().get_by_id(&order.id).await.unwrap().unwrap()
    }

    #[tokio::test]
    async fn test_add_line_reserves_and_totals() {
        let (store, items) = seeded_store().await;
        let order = open_order(&store, &items[0]).await;

        assert_eq!(order.order_total_paise, 1_000_000);
        assert_eq!(order.final_amount_paise, 1_000_000);
        assert_eq!(order.payment_status, PaymentStatus::Pending);

        let item = store.stock().get_by_id(&items[0]).await.unwrap().unwrap();
        assert_eq!(item.status, StockStatus::Reserved);

        let lines = store.orders().lines(&order.id).await.unwrap();
        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0].sku_snapshot, "GB-22K-001");
        assert_eq!(item.sales_order_line_id.as_deref(), Some(lines[0].id.as_str()));
    }

    #[tokio::test]
    async fn test_add_line_applies_discount() {
        let (store, items) = seeded_store().await;
        let order = store
            .orders()
            .create("cust-1", Money::from_rupees(500))
            .await
            .unwrap();
        store
            .orders()
            .add_line(&order.id, &items[0], Money::from_rupees(10_000))
            .await
            .unwrap();

        let order = store.orders().get_by_id(&order.id).await.unwrap().unwrap();
        assert_eq!(order.order_total_paise, 1_000_000);
        assert_eq!(order.final_amount_paise, 950_000);
    }

    #[tokio::test]
    async fn test_same_item_cannot_land_on_two_orders() {
        let (store, items) = seeded_store().await;
        let _first = open_order(&store, &items[0]).await;

        let second = store.orders().create("cust-2", Money::zero()).await.unwrap();
        let err = store
            .orders()
            .add_line(&second.id, &items[0], Money::from_rupees(10_000))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            StoreError::Domain(CoreError::StockItemUnavailable { .. })
        ));

        // the losing order's totals are untouched (full rollback)
        let second = store.orders().get_by_id(&second.id).await.unwrap().unwrap();
        assert_eq!(second.order_total_paise, 0);
        assert!(store.orders().lines(&second.id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_partial_then_full_payment() {
        let (store, items) = seeded_store().await;
        let order = open_order(&store, &items[0]).await;

        let first = store
            .orders()
            .record_payment(&order.id, Money::from_rupees(4_000), PaymentMethod::Cash, None, None)
            .await
            .unwrap();
        assert!(first.applied);
        assert_eq!(first.order.paid_amount_paise, 400_000);
        assert_eq!(first.order.payment_status, PaymentStatus::Partial);

        let second = store
            .orders()
            .record_payment(
                &order.id,
                Money::from_rupees(6_000),
                PaymentMethod::Upi,
                Some("upi-ref-77"),
                None,
            )
            .await
            .unwrap();
        assert_eq!(second.order.paid_amount_paise, 1_000_000);
        assert_eq!(second.order.payment_status, PaymentStatus::Paid);

        // payments sum to the order's paid amount
        let total = store.orders().total_paid(&order.id).await.unwrap();
        assert_eq!(total.paise(), 1_000_000);

        // one ledger entry per payment
        let entries = store.ledger().list_for_order(&order.id).await.unwrap();
        assert_eq!(entries.len(), 2);
        let ledger_sum: i64 = entries.iter().map(|e| e.amount_paise).sum();
        assert_eq!(ledger_sum, 1_000_000);
    }

    #[tokio::test]
    async fn test_fully_paid_order_rejects_another_paisa() {
        let (store, items) = seeded_store().await;
        let order = open_order(&store, &items[0]).await;

        store
            .orders()
            .record_payment(&order.id, Money::from_rupees(10_000), PaymentMethod::Card, None, None)
            .await
            .unwrap();

        let err = store
            .orders()
            .record_payment(&order.id, Money::from_paise(1), PaymentMethod::Cash, None, None)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            StoreError::Domain(CoreError::OrderFullyPaid { .. })
        ));
    }

    #[tokio::test]
    async fn test_overpay_rejected_and_state_untouched() {
        let (store, items) = seeded_store().await;
        let order = open_order(&store, &items[0]).await;

        store
            .orders()
            .record_payment(&order.id, Money::from_rupees(4_000), PaymentMethod::Cash, None, None)
            .await
            .unwrap();

        let err = store
            .orders()
            .record_payment(&order.id, Money::from_rupees(6_001), PaymentMethod::Cash, None, None)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            StoreError::Domain(CoreError::PaymentExceedsBalance { .. })
        ));

        // nothing changed: paid amount, payment rows, ledger rows
        let order = store.orders().get_by_id(&order.id).await.unwrap().unwrap();
        assert_eq!(order.paid_amount_paise, 400_000);
        assert_eq!(store.orders().payments(&order.id).await.unwrap().len(), 1);
        assert_eq!(store.ledger().list_for_order(&order.id).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_retried_request_id_is_not_reapplied() {
        let (store, items) = seeded_store().await;
        let order = open_order(&store, &items[0]).await;

        let first = store
            .orders()
            .record_payment(
                &order.id,
                Money::from_rupees(4_000),
                PaymentMethod::Cash,
                None,
                Some("req-abc"),
            )
            .await
            .unwrap();
        assert!(first.applied);

        // identical retry: same payment comes back, nothing re-applied
        let replay = store
            .orders()
            .record_payment(
                &order.id,
                Money::from_rupees(4_000),
                PaymentMethod::Cash,
                None,
                Some("req-abc"),
            )
            .await
            .unwrap();
        assert!(!replay.applied);
        assert_eq!(replay.payment.id, first.payment.id);
        assert_eq!(replay.order.paid_amount_paise, 400_000);

        assert_eq!(store.orders().payments(&order.id).await.unwrap().len(), 1);
        assert_eq!(store.ledger().list_for_order(&order.id).await.unwrap().len(), 1);

        // two legitimate identical payments with DIFFERENT request ids
        // both apply: the old amount+method heuristic would have
        // swallowed the second one
        let second = store
            .orders()
            .record_payment(
                &order.id,
                Money::from_rupees(4_000),
                PaymentMethod::Cash,
                None,
                Some("req-def"),
            )
            .await
            .unwrap();
        assert!(second.applied);
        assert_eq!(second.order.paid_amount_paise, 800_000);
        assert_eq!(store.ledger().list_for_order(&order.id).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_complete_marks_items_sold() {
        let (store, items) = seeded_store().await;
        let order = open_order(&store, &items[0]).await;

        // completing before full payment is rejected
        let err = store.orders().complete(&order.id).await.unwrap_err();
        assert!(matches!(
            err,
            StoreError::Domain(CoreError::InvalidOrderStatus { .. })
        ));

        store
            .orders()
            .record_payment(&order.id, Money::from_rupees(10_000), PaymentMethod::Cash, None, None)
            .await
            .unwrap();
        let completed = store.orders().complete(&order.id).await.unwrap();
        assert_eq!(completed.status, OrderStatus::Completed);

        let item = store.stock().get_by_id(&items[0]).await.unwrap().unwrap();
        assert_eq!(item.status, StockStatus::Sold);
        assert!(item.sale_date.is_some());
    }

    #[tokio::test]
    async fn test_cancel_releases_every_item() {
        let (store, items) = seeded_store().await;
        let order = store.orders().create("cust-1", Money::zero()).await.unwrap();
        for item_id in &items {
            store
                .orders()
                .add_line(&order.id, item_id, Money::from_rupees(10_000))
                .await
                .unwrap();
        }

        let (cancelled, released) = store.orders().cancel(&order.id).await.unwrap();
        assert_eq!(cancelled.status, OrderStatus::Cancelled);
        assert_eq!(released, 3);

        for item_id in &items {
            let item = store.stock().get_by_id(item_id).await.unwrap().unwrap();
            assert_eq!(item.status, StockStatus::Available);
            assert!(item.sale_date.is_none());
            assert!(item.sales_order_line_id.is_none());
        }

        // cancelling twice is rejected
        let err = store.orders().cancel(&order.id).await.unwrap_err();
        assert!(matches!(
            err,
            StoreError::Domain(CoreError::InvalidOrderStatus { .. })
        ));
    }

    #[tokio::test]
    async fn test_cancel_after_completion_releases_sold_items() {
        let (store, items) = seeded_store().await;
        let order = open_order(&store, &items[0]).await;
        store
            .orders()
            .record_payment(&order.id, Money::from_rupees(10_000), PaymentMethod::Cash, None, None)
            .await
            .unwrap();
        store.orders().complete(&order.id).await.unwrap();

        let (_, released) = store.orders().cancel(&order.id).await.unwrap();
        assert_eq!(released, 1);

        let item = store.stock().get_by_id(&items[0]).await.unwrap().unwrap();
        assert_eq!(item.status, StockStatus::Available);
        assert!(item.sale_date.is_none());
    }

    #[tokio::test]
    async fn test_payment_against_unknown_order() {
        let (store, _) = seeded_store().await;
        let err = store
            .orders()
            .record_payment("no-such", Money::from_rupees(1), PaymentMethod::Cash, None, None)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            StoreError::Domain(CoreError::OrderNotFound(_))
        ));
    }
}
