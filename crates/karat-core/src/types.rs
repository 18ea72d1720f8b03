//! # Domain Types
//!
//! Core domain types for the Karat back-office.
//!
//! ## Type Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                │
//! │                                                                     │
//! │  Catalog                     Sales                     EMI          │
//! │  ┌────────────┐              ┌──────────────┐          ┌──────────┐ │
//! │  │ RateMaster │              │ SalesOrder   │          │ EmiPlan  │ │
//! │  │ Product    │              │ SalesOrder-  │          │ Install- │ │
//! │  │ StockItem  │◄─────────────│   Line       │          │   ment   │ │
//! │  └────────────┘  reserves    │ SalesPayment │          └──────────┘ │
//! │                              └──────┬───────┘               │       │
//! │                                     │      payment recording │      │
//! │                                     ▼                        ▼      │
//! │                              ┌──────────────┐          ┌──────────┐ │
//! │                              │ LedgerEntry  │◄─────────│EmiPayment│ │
//! │                              └──────────────┘          └──────────┘ │
//! └─────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Conventions
//! - Entity ids are UUID v4 strings; business ids (tag id, order number,
//!   SKU) are separate human-facing fields.
//! - Monetary fields are stored as `*_paise: i64`, weights as `*_mg:
//!   i64`, percentages as `*_bps: u32`; typed accessors return
//!   [`Money`](crate::money::Money) / [`Weight`](crate::money::Weight) /
//!   [`Percent`](crate::money::Percent).
//! - Lifecycle is always an explicit enum, never a nullable timestamp.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::money::{Money, Percent, Weight};

// =============================================================================
// Metal and Purity
// =============================================================================

/// The metal a product is made of.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[serde(rename_all = "snake_case")]
pub enum MetalType {
    Gold,
    Silver,
    Platinum,
}

impl MetalType {
    /// Stable lowercase name, used in error messages and logs.
    pub const fn as_str(&self) -> &'static str {
        match self {
            MetalType::Gold => "gold",
            MetalType::Silver => "silver",
            MetalType::Platinum => "platinum",
        }
    }
}

impl std::fmt::Display for MetalType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// Rate Master
// =============================================================================

/// Whether a rate row is the live quotation or has been replaced.
///
/// Rates are superseded, never deleted, so every historical invoice can
/// still point at the rate that priced it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[serde(rename_all = "snake_case")]
pub enum RateStatus {
    Active,
    Superseded,
}

/// A per-gram metal rate quotation for one (metal, purity) pair.
///
/// Multiple rows may exist per pair; the resolver picks the newest
/// active, unexpired one.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct RateMaster {
    pub id: String,
    pub metal_type: MetalType,
    /// Purity grade as quoted by the trade, e.g. "22K", "24K", "925".
    pub purity: String,
    /// Rate per gram in paise.
    pub rate_per_gram_paise: i64,
    /// Quotation expiry; `None` means open-ended.
    pub valid_until: Option<DateTime<Utc>>,
    pub status: RateStatus,
    /// Default making charge applied when a product carries none,
    /// as basis points of the metal amount.
    pub default_making_charge_bps: u32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl RateMaster {
    /// Returns the per-gram rate as Money.
    #[inline]
    pub fn rate_per_gram(&self) -> Money {
        Money::from_paise(self.rate_per_gram_paise)
    }

    /// Returns the default making charge fraction.
    #[inline]
    pub fn default_making_charge(&self) -> Percent {
        Percent::from_bps(self.default_making_charge_bps)
    }

    /// Checks whether this rate is usable at the given instant.
    pub fn is_current_at(&self, now: DateTime<Utc>) -> bool {
        self.status == RateStatus::Active
            && self.valid_until.map_or(true, |until| until >= now)
    }
}

// =============================================================================
// Product
// =============================================================================

/// Explicit lifecycle for catalog entries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[serde(rename_all = "snake_case")]
pub enum ProductLifecycle {
    Active,
    Deleted,
}

/// A catalog product: the immutable pricing specification.
///
/// The selling price is intentionally NOT a field here. It changes with
/// every rate update, so it is computed fresh at read time from the
/// weight/wastage/charges below plus the current rate.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Product {
    pub id: String,
    /// Stock Keeping Unit - business identifier.
    pub sku: String,
    pub name: String,
    pub metal_type: MetalType,
    pub purity: String,
    /// Net metal weight in milligrams.
    pub net_weight_mg: i64,
    /// Wastage allowance in basis points (200 = 2%).
    pub wastage_bps: u32,
    /// Flat making charges in paise.
    pub making_charges_paise: i64,
    /// Stone/gem value in paise.
    pub stone_value_paise: i64,
    /// Restock alert threshold: number of available stock items.
    pub reorder_level: i64,
    /// Hallmark unique identification code, when the piece is stamped.
    pub huid: Option<String>,
    pub lifecycle: ProductLifecycle,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Product {
    #[inline]
    pub fn net_weight(&self) -> Weight {
        Weight::from_milligrams(self.net_weight_mg)
    }

    #[inline]
    pub fn wastage(&self) -> Percent {
        Percent::from_bps(self.wastage_bps)
    }

    #[inline]
    pub fn making_charges(&self) -> Money {
        Money::from_paise(self.making_charges_paise)
    }

    #[inline]
    pub fn stone_value(&self) -> Money {
        Money::from_paise(self.stone_value_paise)
    }
}

// =============================================================================
// Stock Item
// =============================================================================

/// Status of one physically tagged inventory unit.
///
/// ## State Machine
/// ```text
/// AVAILABLE ──reserve──► RESERVED ──complete──► SOLD
///     ▲                      │                    │
///     └──────── release (order cancelled) ────────┘
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[serde(rename_all = "snake_case")]
pub enum StockStatus {
    Available,
    Reserved,
    Sold,
}

/// One physical unit of stock, distinct from its Product specification.
///
/// ## Invariant
/// `status` is Reserved or Sold if and only if `sales_order_line_id`
/// points at a line of a non-cancelled order.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct StockItem {
    pub id: String,
    pub product_id: String,
    /// Physical tag attached to the piece.
    pub tag_id: String,
    pub barcode: Option<String>,
    pub status: StockStatus,
    /// What the shop paid for the piece, in paise.
    pub purchase_cost_paise: i64,
    pub sale_date: Option<DateTime<Utc>>,
    pub sales_order_line_id: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl StockItem {
    #[inline]
    pub fn purchase_cost(&self) -> Money {
        Money::from_paise(self.purchase_cost_paise)
    }
}

// =============================================================================
// Sales Order
// =============================================================================

/// Lifecycle of a sales order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    Open,
    Completed,
    Cancelled,
}

impl OrderStatus {
    pub const fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Open => "open",
            OrderStatus::Completed => "completed",
            OrderStatus::Cancelled => "cancelled",
        }
    }
}

/// How much of the order's final amount has been settled.
///
/// This is a pure function of `paid_amount` vs `final_amount`, never
/// an independently mutable field. See [`PaymentStatus::from_amounts`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    Pending,
    Partial,
    Paid,
}

impl PaymentStatus {
    /// Derives the payment status from the two amounts.
    ///
    /// ## Rule
    /// - paid == 0            → Pending
    /// - 0 < paid < final     → Partial
    /// - paid >= final        → Paid
    pub fn from_amounts(paid: Money, final_amount: Money) -> PaymentStatus {
        if paid.is_zero() {
            PaymentStatus::Pending
        } else if paid < final_amount {
            PaymentStatus::Partial
        } else {
            PaymentStatus::Paid
        }
    }
}

/// A customer sales order.
///
/// ## Invariants
/// - `paid_amount_paise <= final_amount_paise`
/// - `final_amount_paise == order_total_paise - discount_paise`
/// - `payment_status == PaymentStatus::from_amounts(paid, final)`
/// - `sum(payments.amount) == paid_amount_paise`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct SalesOrder {
    pub id: String,
    /// Human-facing order number, e.g. "SO-20260801-0001".
    pub order_number: String,
    pub customer_id: String,
    pub status: OrderStatus,
    pub order_total_paise: i64,
    pub discount_paise: i64,
    pub final_amount_paise: i64,
    pub paid_amount_paise: i64,
    pub payment_status: PaymentStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl SalesOrder {
    #[inline]
    pub fn order_total(&self) -> Money {
        Money::from_paise(self.order_total_paise)
    }

    #[inline]
    pub fn discount(&self) -> Money {
        Money::from_paise(self.discount_paise)
    }

    #[inline]
    pub fn final_amount(&self) -> Money {
        Money::from_paise(self.final_amount_paise)
    }

    #[inline]
    pub fn paid_amount(&self) -> Money {
        Money::from_paise(self.paid_amount_paise)
    }

    /// Balance still owed on the order.
    #[inline]
    pub fn pending_amount(&self) -> Money {
        self.final_amount().remaining_after(self.paid_amount())
    }
}

/// A line on a sales order, referencing exactly one stock item.
///
/// Uses the snapshot pattern: SKU and name are frozen at sale time so
/// the order history survives later catalog edits.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct SalesOrderLine {
    pub id: String,
    pub order_id: String,
    pub stock_item_id: String,
    /// SKU at time of sale (frozen).
    pub sku_snapshot: String,
    /// Product name at time of sale (frozen).
    pub name_snapshot: String,
    /// Agreed line price in paise (computed from the rate current at
    /// sale time, frozen here).
    pub price_paise: i64,
    pub created_at: DateTime<Utc>,
}

impl SalesOrderLine {
    #[inline]
    pub fn price(&self) -> Money {
        Money::from_paise(self.price_paise)
    }
}

// =============================================================================
// Payments
// =============================================================================

/// Settlement instrument.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    Cash,
    Card,
    BankTransfer,
    Upi,
}

impl PaymentMethod {
    pub const fn as_str(&self) -> &'static str {
        match self {
            PaymentMethod::Cash => "cash",
            PaymentMethod::Card => "card",
            PaymentMethod::BankTransfer => "bank_transfer",
            PaymentMethod::Upi => "upi",
        }
    }
}

/// An append-only payment record against a sales order.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct SalesPayment {
    pub id: String,
    pub order_id: String,
    pub amount_paise: i64,
    pub method: PaymentMethod,
    /// External reference (cheque number, UPI txn id, card auth code).
    pub reference: Option<String>,
    /// Caller-supplied idempotency key. A retried request carrying the
    /// same key returns the original payment instead of applying twice.
    pub request_id: Option<String>,
    pub paid_at: DateTime<Utc>,
}

impl SalesPayment {
    #[inline]
    pub fn amount(&self) -> Money {
        Money::from_paise(self.amount_paise)
    }
}

// =============================================================================
// EMI
// =============================================================================

/// Lifecycle of an EMI plan.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[serde(rename_all = "snake_case")]
pub enum EmiStatus {
    Active,
    Completed,
}

/// An equated-monthly-installment plan attached to a sales order.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct EmiPlan {
    pub id: String,
    pub order_id: String,
    /// Amount being financed, in paise.
    pub principal_paise: i64,
    pub installment_count: u32,
    /// The equal monthly amount; the final installment absorbs the
    /// rounding remainder.
    pub monthly_amount_paise: i64,
    pub start_date: NaiveDate,
    pub paid_amount_paise: i64,
    pub status: EmiStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl EmiPlan {
    #[inline]
    pub fn principal(&self) -> Money {
        Money::from_paise(self.principal_paise)
    }

    #[inline]
    pub fn paid_amount(&self) -> Money {
        Money::from_paise(self.paid_amount_paise)
    }

    /// Balance still owed across all installments.
    #[inline]
    pub fn pending_amount(&self) -> Money {
        self.principal().remaining_after(self.paid_amount())
    }
}

/// Status of a single installment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[serde(rename_all = "snake_case")]
pub enum InstallmentStatus {
    Pending,
    Partial,
    Paid,
    Overdue,
}

/// One scheduled installment of an EMI plan.
///
/// ## Invariant
/// `paid_amount_paise <= amount_paise`; the installment is overdue when
/// `due_date < today` and it is not fully paid.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Installment {
    pub id: String,
    pub plan_id: String,
    /// 1-based position in the schedule.
    pub seq_no: u32,
    pub amount_paise: i64,
    pub paid_amount_paise: i64,
    pub due_date: NaiveDate,
    pub status: InstallmentStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Installment {
    #[inline]
    pub fn amount(&self) -> Money {
        Money::from_paise(self.amount_paise)
    }

    #[inline]
    pub fn paid_amount(&self) -> Money {
        Money::from_paise(self.paid_amount_paise)
    }

    /// Balance remaining on this installment.
    #[inline]
    pub fn remaining(&self) -> Money {
        self.amount().remaining_after(self.paid_amount())
    }

    /// Overdue predicate: past due and not fully settled. Pure in
    /// `today` so callers (and tests) control the clock.
    pub fn is_overdue(&self, today: NaiveDate) -> bool {
        self.due_date < today && self.paid_amount_paise < self.amount_paise
    }
}

/// An append-only payment record against one installment.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct EmiPaymentRecord {
    pub id: String,
    pub plan_id: String,
    pub installment_id: String,
    pub amount_paise: i64,
    pub method: PaymentMethod,
    pub reference: Option<String>,
    pub request_id: Option<String>,
    pub paid_at: DateTime<Utc>,
}

// =============================================================================
// Ledger
// =============================================================================

/// Direction of a ledger entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[serde(rename_all = "snake_case")]
pub enum LedgerKind {
    Income,
    Expense,
}

/// What produced a ledger entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[serde(rename_all = "snake_case")]
pub enum LedgerSource {
    OrderPayment,
    EmiPayment,
}

/// A derived ledger entry, written in the same transaction as the
/// payment it mirrors. Immutable once created.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct LedgerEntry {
    pub id: String,
    pub kind: LedgerKind,
    pub source: LedgerSource,
    pub order_id: Option<String>,
    pub plan_id: Option<String>,
    /// The payment row this entry mirrors, exactly one per payment.
    pub payment_id: String,
    pub amount_paise: i64,
    pub method: PaymentMethod,
    pub recorded_at: DateTime<Utc>,
}

impl LedgerEntry {
    #[inline]
    pub fn amount(&self) -> Money {
        Money::from_paise(self.amount_paise)
    }
}

// =============================================================================
// Audit
// =============================================================================

/// An insert-only audit trail record. Writing one is best-effort: a
/// failed audit insert is logged and swallowed, never rolled into the
/// primary operation's outcome.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct AuditRecord {
    pub id: String,
    /// User id of the actor, from the session.
    pub actor: String,
    /// Verb, e.g. "record_payment", "reserve_stock_item".
    pub action: String,
    /// Entity kind, e.g. "sales_order".
    pub entity: String,
    pub entity_id: String,
    pub detail: Option<String>,
    pub recorded_at: DateTime<Utc>,
}

// =============================================================================
// Unit Tests
// =============================================================================
