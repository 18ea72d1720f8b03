//! # Product Repository
//!
//! Database operations for catalog products.
//!
//! A product row is the pricing *specification* only: weight, wastage,
//! charges, stone value. There is no price column anywhere in this
//! table; quotes are computed at read time against the current rate.

use chrono::Utc;
use serde::Serialize;
use sqlx::SqlitePool;
use tracing::debug;
use uuid::Uuid;

use crate::error::{StoreError, StoreResult};
use karat_core::{MetalType, Money, Percent, Product, ProductLifecycle, Weight};

/// Column list shared by every product SELECT.
const PRODUCT_COLUMNS: &str = "id, sku, name, metal_type, purity, net_weight_mg, wastage_bps, \
     making_charges_paise, stone_value_paise, reorder_level, huid, lifecycle, \
     created_at, updated_at";

/// Input for creating a catalog product.
#[derive(Debug, Clone)]
pub struct NewProduct {
    pub sku: String,
    pub name: String,
    pub metal_type: MetalType,
    pub purity: String,
    pub net_weight: Weight,
    pub wastage: Percent,
    pub making_charges: Money,
    pub stone_value: Money,
    pub reorder_level: i64,
    pub huid: Option<String>,
}

/// A product whose available stock has fallen to or below its reorder
/// level.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct ReorderAlert {
    pub product_id: String,
    pub sku: String,
    pub name: String,
    pub reorder_level: i64,
    pub available_count: i64,
}

/// Repository for product database operations.
#[derive(Debug, Clone)]
pub struct ProductRepository {
    pool: SqlitePool,
}

impl ProductRepository {
    /// Creates a new ProductRepository.
    pub fn new(pool: SqlitePool) -> Self {
        ProductRepository { pool }
    }

    /// Inserts a new product.
    ///
    /// ## Errors
    /// `UniqueViolation` when the SKU already exists.
    pub async fn insert(&self, new: NewProduct) -> StoreResult<Product> {
        let now = Utc::now();
        let product = Product {
            id: Uuid::new_v4().to_string(),
            sku: new.sku,
            name: new.name,
            metal_type: new.metal_type,
            purity: new.purity,
            net_weight_mg: new.net_weight.milligrams(),
            wastage_bps: new.wastage.bps(),
            making_charges_paise: new.making_charges.paise(),
            stone_value_paise: new.stone_value.paise(),
            reorder_level: new.reorder_level,
            huid: new.huid,
            lifecycle: ProductLifecycle::Active,
            created_at: now,
            updated_at: now,
        };

        debug!(sku = %product.sku, "Inserting product");

        sqlx::query(
            "INSERT INTO products (
                id, sku, name, metal_type, purity, net_weight_mg, wastage_bps,
                making_charges_paise, stone_value_paise, reorder_level, huid,
                lifecycle, created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14)",
        )
        .bind(&product.id)
        .bind(&product.sku)
        .bind(&product.name)
        .bind(product.metal_type)
        .bind(&product.purity)
        .bind(product.net_weight_mg)
        .bind(product.wastage_bps)
        .bind(product.making_charges_paise)
        .bind(product.stone_value_paise)
        .bind(product.reorder_level)
        .bind(&product.huid)
        .bind(product.lifecycle)
        .bind(product.created_at)
        .bind(product.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(product)
    }

    /// Gets a product by its id.
    pub async fn get_by_id(&self, id: &str) -> StoreResult<Option<Product>> {
        let product = sqlx::query_as::<_, Product>(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM products WHERE id = ?1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(product)
    }

    /// Gets a product by its SKU.
    pub async fn get_by_sku(&self, sku: &str) -> StoreResult<Option<Product>> {
        let product = sqlx::query_as::<_, Product>(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM products WHERE sku = ?1"
        ))
        .bind(sku)
        .fetch_optional(&self.pool)
        .await?;

        Ok(product)
    }

    /// Lists active products, sorted by name.
    pub async fn list_active(&self, limit: u32) -> StoreResult<Vec<Product>> {
        let products = sqlx::query_as::<_, Product>(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM products
             WHERE lifecycle = 'active'
             ORDER BY name
             LIMIT ?1"
        ))
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(products)
    }

    /// Moves a product to the Deleted lifecycle state.
    ///
    /// Historical order lines keep their snapshots, so nothing breaks
    /// downstream; the product simply stops being sellable.
    pub async fn mark_deleted(&self, id: &str) -> StoreResult<()> {
        let now = Utc::now();

        let result = sqlx::query(
            "UPDATE products SET lifecycle = 'deleted', updated_at = ?2
             WHERE id = ?1 AND lifecycle = 'active'",
        )
        .bind(id)
        .bind(now)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::not_found("Product", id));
        }

        Ok(())
    }

    /// Lists active products at or below their reorder level.
    ///
    /// Counts only Available stock items: reserved and sold pieces are
    /// already spoken for.
    pub async fn list_below_reorder(&self) -> StoreResult<Vec<ReorderAlert>> {
        let alerts = sqlx::query_as::<_, ReorderAlert>(
            "SELECT p.id AS product_id, p.sku, p.name, p.reorder_level,
                    COUNT(s.id) AS available_count
             FROM products p
             LEFT JOIN stock_items s
                    ON s.product_id = p.id AND s.status = 'available'
             WHERE p.lifecycle = 'active' AND p.reorder_level > 0
             GROUP BY p.id, p.sku, p.name, p.reorder_level
             HAVING COUNT(s.id) <= p.reorder_level
             ORDER BY p.sku",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(alerts)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::{Store, StoreConfig};
    use crate::repository::stock::NewStockItem;

    fn ring(sku: &str) -> NewProduct {
        NewProduct {
            sku: sku.to_string(),
            name: "Gold ring".to_string(),
            metal_type: MetalType::Gold,
            purity: "22K".to_string(),
            net_weight: Weight::from_grams(10),
            wastage: Percent::from_bps(200),
            making_charges: Money::from_rupees(500),
            stone_value: Money::zero(),
            reorder_level: 2,
            huid: Some("HUID123456".to_string()),
        }
    }

    #[tokio::test]
    async fn test_insert_and_fetch() {
        let store = Store::new(StoreConfig::in_memory()).await.unwrap();
        let product = store.products().insert(ring("GR-22K-001")).await.unwrap();

        let by_sku = store
            .products()
            .get_by_sku("GR-22K-001")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(by_sku.id, product.id);
        assert_eq!(by_sku.net_weight_mg, 10_000);
        assert_eq!(by_sku.lifecycle, ProductLifecycle::Active);
    }

    #[tokio::test]
    async fn test_duplicate_sku_rejected() {
        let store = Store::new(StoreConfig::in_memory()).await.unwrap();
        store.products().insert(ring("GR-22K-001")).await.unwrap();

        let err = store.products().insert(ring("GR-22K-001")).await.unwrap_err();
        assert!(matches!(err, StoreError::UniqueViolation { .. }));
    }

    #[tokio::test]
    async fn test_mark_deleted_leaves_catalog_listing() {
        let store = Store::new(StoreConfig::in_memory()).await.unwrap();
        let product = store.products().insert(ring("GR-22K-001")).await.unwrap();
        store.products().insert(ring("GR-22K-002")).await.unwrap();

        store.products().mark_deleted(&product.id).await.unwrap();

        let active = store.products().list_active(50).await.unwrap();
        assert_eq!(active.len(), 1);
        assert_eq!(active[0].sku, "GR-22K-002");

        // second delete finds nothing active
        let err = store.products().mark_deleted(&product.id).await.unwrap_err();
        assert!(matches!(err, StoreError::NotFound { .. }));
    }

    #[tokio::test]
    async fn test_reorder_alert_counts_only_available() {
        let store = Store::new(StoreConfig::in_memory()).await.unwrap();
        let product = store.products().insert(ring("GR-22K-001")).await.unwrap();

        // reorder_level is 2; with 3 available pieces there is no alert
        for n in 0..3 {
            store
                .stock()
                .insert(NewStockItem {
                    product_id: product.id.clone(),
                    tag_id: format!("TAG-2{n:03}"),
                    barcode: None,
                    purchase_cost: Money::zero(),
                })
                .await
                .unwrap();
        }
        assert!(store.products().list_below_reorder().await.unwrap().is_empty());

        // reserving one piece drops the available count to the level
        let item = store.stock().get_by_tag("TAG-2000").await.unwrap().unwrap();
        store.stock().reserve(&item.id, "line-1").await.unwrap();

        let alerts = store.products().list_below_reorder().await.unwrap();
        assert_eq!(alerts.len(), 1);
        assert_eq!(alerts[0].available_count, 2);
    }
}
