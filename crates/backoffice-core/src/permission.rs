//! # Permission Gate
//!
//! Authentication and the role model live outside this workspace. Services
//! receive the acting user explicitly and ask a [`PermissionGate`] whether
//! the action is allowed before touching the database.
//!
//! ```text
//! caller ──► service.confirm_order(&actor, ..)
//!                 │
//!                 ├── gate.has_permission(&actor, OrderConfirm)?  no ──► PermissionDenied
//!                 │
//!                 └── yes ──► transaction
//! ```

use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{CoreError, CoreResult};

/// Lifecycle capabilities.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Permission {
    OrderCreate,
    OrderConfirm,
    OrderCancel,
    OrderView,
    DeliveryCreate,
    DeliveryUpdate,
    ReturnProcess,
}

impl Permission {
    pub const ALL: [Permission; 7] = [
        Permission::OrderCreate,
        Permission::OrderConfirm,
        Permission::OrderCancel,
        Permission::OrderView,
        Permission::DeliveryCreate,
        Permission::DeliveryUpdate,
        Permission::ReturnProcess,
    ];

    /// Code as stored in the external permission table.
    pub const fn code(&self) -> &'static str {
        match self {
            Permission::OrderCreate => "ORDER_CREATE",
            Permission::OrderConfirm => "ORDER_CONFIRM",
            Permission::OrderCancel => "ORDER_CANCEL",
            Permission::OrderView => "ORDER_VIEW",
            Permission::DeliveryCreate => "DELIVERY_CREATE",
            Permission::DeliveryUpdate => "DELIVERY_UPDATE",
            Permission::ReturnProcess => "RETURN_PROCESS",
        }
    }
}

impl fmt::Display for Permission {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// The user performing an operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Actor {
    pub user_id: String,
    /// Role name as known to the external RBAC model.
    pub role: String,
}

impl Actor {
    pub fn new(user_id: impl Into<String>, role: impl Into<String>) -> Self {
        Actor {
            user_id: user_id.into(),
            role: role.into(),
        }
    }
}

/// Boolean capability check supplied by the host application.
pub trait PermissionGate: Send + Sync {
    fn has_permission(&self, actor: &Actor, permission: Permission) -> bool;

    /// `Ok(())` or [`CoreError::PermissionDenied`].
    fn require(&self, actor: &Actor, permission: Permission) -> CoreResult<()> {
        if self.has_permission(actor, permission) {
            Ok(())
        } else {
            Err(CoreError::PermissionDenied {
                permission: permission.code().to_string(),
            })
        }
    }
}

/// Grants everything. For tools and tests.
#[derive(Debug, Clone, Copy, Default)]
pub struct AllowAll;

impl PermissionGate for AllowAll {
    fn has_permission(&self, _actor: &Actor, _permission: Permission) -> bool {
        true
    }
}

/// Superuser code granting every permission.
pub const ALL_CODE: &str = "ALL";

/// Static role → permission codes table.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RolePermissions {
    roles: HashMap<String, Vec<String>>,
}

impl RolePermissions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds (or replaces) the codes granted to `role`.
    pub fn grant(mut self, role: &str, codes: &[&str]) -> Self {
        self.roles
            .insert(role.to_string(), codes.iter().map(|c| c.to_string()).collect());
        self
    }

    /// Default table for the back office roles.
    ///
    /// - `admin`: everything
    /// - `manager`: everything except delivery status reports
    /// - `sales`: create, confirm, cancel and view orders
    /// - `delivery`: view orders, update deliveries
    pub fn defaults() -> Self {
        RolePermissions::new()
            .grant("admin", &[ALL_CODE])
            .grant(
                "manager",
                &[
                    "ORDER_CREATE",
                    "ORDER_CONFIRM",
                    "ORDER_CANCEL",
                    "ORDER_VIEW",
                    "DELIVERY_CREATE",
                    "RETURN_PROCESS",
                ],
            )
            .grant(
                "sales",
                &["ORDER_CREATE", "ORDER_CONFIRM", "ORDER_CANCEL", "ORDER_VIEW"],
            )
            .grant("delivery", &["ORDER_VIEW", "DELIVERY_UPDATE"])
    }
}

impl PermissionGate for RolePermissions {
    fn has_permission(&self, actor: &Actor, permission: Permission) -> bool {
        self.roles.get(&actor.role).map_or(false, |codes| {
            codes
                .iter()
                .any(|code| code == ALL_CODE || code == permission.code())
        })
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_allow_all() {
        let actor = Actor::new("u1", "anyone");
        for permission in Permission::ALL {
            assert!(AllowAll.has_permission(&actor, permission));
        }
    }

    #[test]
    fn test_default_roles() {
        let gate = RolePermissions::defaults();
        let sales = Actor::new("u1", "sales");
        let delivery = Actor::new("u2", "delivery");
        let admin = Actor::new("u3", "admin");

        assert!(gate.has_permission(&sales, Permission::OrderConfirm));
        assert!(!gate.has_permission(&sales, Permission::ReturnProcess));
        assert!(gate.has_permission(&delivery, Permission::DeliveryUpdate));
        assert!(!gate.has_permission(&delivery, Permission::DeliveryCreate));
        for permission in Permission::ALL {
            assert!(gate.has_permission(&admin, permission));
        }
    }

    #[test]
    fn test_unknown_role_denied() {
        let gate = RolePermissions::defaults();
        let err = gate
            .require(&Actor::new("u9", "intern"), Permission::OrderView)
            .unwrap_err();
        assert_eq!(err.to_string(), "Permission denied: ORDER_VIEW");
    }
}
