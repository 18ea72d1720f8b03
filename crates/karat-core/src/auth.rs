//! # Roles and Permissions
//!
//! Capability-set authorization for back-office operations.
//!
//! Every role maps to a fixed set of permissions, and every service
//! operation performs exactly one `authorize(session, permission)`
//! check before touching the store. Business logic never inspects the
//! role directly.

use serde::{Deserialize, Serialize};

use crate::error::{CoreError, CoreResult};

// =============================================================================
// Permissions
// =============================================================================

/// A single back-office capability.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Permission {
    /// Publish or supersede metal rates.
    ManageRates,
    /// Read current rates and price quotes.
    ViewRates,
    /// Create and edit catalog products.
    ManageCatalog,
    /// Receive stock and adjust stock items.
    ManageStock,
    /// Create orders, add lines, reserve and release stock.
    SellStock,
    /// Record order and installment payments.
    RecordPayments,
    /// Open EMI plans and run overdue marking.
    ManageEmi,
    /// Read ledger entries and reports.
    ViewLedger,
}

// =============================================================================
// Roles
// =============================================================================

/// A back-office role. Each role carries a fixed capability set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Admin,
    Manager,
    SalesStaff,
    Accountant,
}

impl Role {
    /// The capability set for this role.
    pub const fn permissions(&self) -> &'static [Permission] {
        use Permission::*;
        match self {
            Role::Admin => &[
                ManageRates,
                ViewRates,
                ManageCatalog,
                ManageStock,
                SellStock,
                RecordPayments,
                ManageEmi,
                ViewLedger,
            ],
            Role::Manager => &[
                ManageRates,
                ViewRates,
                ManageCatalog,
                ManageStock,
                SellStock,
                RecordPayments,
                ManageEmi,
                ViewLedger,
            ],
            Role::SalesStaff => &[ViewRates, SellStock, RecordPayments],
            Role::Accountant => &[ViewRates, RecordPayments, ManageEmi, ViewLedger],
        }
    }

    /// Checks whether this role grants a permission.
    pub fn allows(&self, permission: Permission) -> bool {
        self.permissions().contains(&permission)
    }
}

// =============================================================================
// Session
// =============================================================================

/// An authenticated caller. Issued by the (external) auth layer; this
/// crate only consumes it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    pub user_id: String,
    pub role: Role,
}

impl Session {
    pub fn new(user_id: impl Into<String>, role: Role) -> Self {
        Session {
            user_id: user_id.into(),
            role,
        }
    }
}

/// The single authorization guard.
///
/// ## Example
/// ```rust
/// use karat_core::auth::{authorize, Permission, Role, Session};
///
/// let session = Session::new("u-1", Role::SalesStaff);
/// assert!(authorize(&session, Permission::SellStock).is_ok());
/// assert!(authorize(&session, Permission::ManageRates).is_err());
/// ```
pub fn authorize(session: &Session, permission: Permission) -> CoreResult<()> {
    if session.role.allows(permission) {
        Ok(())
    } else {
        Err(CoreError::PermissionDenied {
            role: session.role,
            permission,
        })
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
