//! # Lifecycle Rules
//!
//! Status transitions for orders, sales and deliveries.
//!
//! ## Order
//! ```text
//!            add/remove items
//!              ┌────────┐
//!              ▼        │
//!          ┌────────┐───┘   confirm    ┌───────────┐
//!          │  OPEN  │─────────────────►│ CONFIRMED │ ──► unwound only by returns
//!          └───┬────┘                  └───────────┘
//!              │ cancel                ┌───────────┐
//!              └──────────────────────►│ CANCELLED │
//!                                      └───────────┘
//! ```
//!
//! ## Delivery
//! ```text
//!  CREATED ──► PACKED ──► SHIPPED ──► DELIVERED
//!     │           │          │
//!     └───────────┴──────────┴──────► FAILED
//! ```

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{CoreError, CoreResult, ValidationError};
use crate::types::{Delivery, DeliveryStatus, InvoiceStatus, OrderStatus, Sale, SaleType};

// =============================================================================
// Orders
// =============================================================================

/// Fails unless the order can still be edited.
pub fn ensure_order_open(order_id: &str, status: OrderStatus, action: &str) -> CoreResult<()> {
    match status {
        OrderStatus::Open => Ok(()),
        other => Err(CoreError::invalid_state("Order", order_id, other, action)),
    }
}

impl OrderStatus {
    #[inline]
    pub fn is_terminal(&self) -> bool {
        !matches!(self, OrderStatus::Open)
    }
}

// =============================================================================
// Sales
// =============================================================================

/// Fails unless `sale` is an invoice whose payment state allows fulfilment.
pub fn ensure_deliverable(sale: &Sale) -> CoreResult<()> {
    if sale.sale_type != SaleType::Invoice {
        return Err(CoreError::invalid_state(
            "Sale",
            &sale.id,
            sale.sale_type,
            "create a delivery",
        ));
    }
    match sale.invoice_status {
        InvoiceStatus::Paid | InvoiceStatus::Confirmed => Ok(()),
        other => Err(CoreError::invalid_state("Sale", &sale.id, other, "create a delivery")),
    }
}

/// Fails unless `sale` is an invoice that may still be returned against.
///
/// Returns are accepted until `window_days` after the sale date.
pub fn ensure_returnable(sale: &Sale, now: DateTime<Utc>, window_days: i64) -> CoreResult<()> {
    if sale.sale_type != SaleType::Invoice {
        return Err(CoreError::invalid_state(
            "Sale",
            &sale.id,
            sale.sale_type,
            "accept a return",
        ));
    }

    let deadline = sale.sale_date + Duration::days(window_days);
    if now > deadline {
        return Err(ValidationError::InvalidReference {
            field: "sale_id".to_string(),
            id: sale.id.clone(),
            reason: format!("return window of {} days has closed", window_days),
        }
        .into());
    }

    Ok(())
}

// =============================================================================
// Deliveries
// =============================================================================

impl DeliveryStatus {
    #[inline]
    pub fn is_terminal(&self) -> bool {
        matches!(self, DeliveryStatus::Delivered | DeliveryStatus::Failed)
    }

    /// True if `self → next` is a legal move.
    pub fn can_transition_to(&self, next: DeliveryStatus) -> bool {
        use DeliveryStatus::*;
        matches!(
            (self, next),
            (Created, Packed) | (Packed, Shipped) | (Shipped, Delivered)
        ) || (next == Failed && !self.is_terminal())
    }
}

/// Who carries a delivery and may report its progress.
///
/// An external vendor takes precedence over the internal dispatcher when
/// both are recorded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "id", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Carrier {
    Employee(String),
    Vendor(String),
}

impl Carrier {
    /// Resolves the authoritative carrier from the recorded ids.
    pub fn resolve(employee_id: &str, vendor_id: Option<&str>) -> Carrier {
        match vendor_id {
            Some(vendor) => Carrier::Vendor(vendor.to_string()),
            None => Carrier::Employee(employee_id.to_string()),
        }
    }
}

impl Delivery {
    #[inline]
    pub fn carrier(&self) -> Carrier {
        Carrier::resolve(&self.employee_id, self.vendor_id.as_deref())
    }
}

/// Validates a status report from `reporter` and returns the new status.
pub fn check_delivery_transition(
    delivery: &Delivery,
    reporter: &Carrier,
    next: DeliveryStatus,
) -> CoreResult<DeliveryStatus> {
    let carrier = delivery.carrier();
    if &carrier != reporter {
        return Err(ValidationError::InvalidReference {
            field: "reporter".to_string(),
            id: match reporter {
                Carrier::Employee(id) | Carrier::Vendor(id) => id.clone(),
            },
            reason: "is not the carrier responsible for this delivery".to_string(),
        }
        .into());
    }

    if !delivery.status.can_transition_to(next) {
        return Err(CoreError::invalid_state(
            "Delivery",
            &delivery.id,
            delivery.status,
            &format!("move to {}", next),
        ));
    }

    Ok(next)
}

// =============================================================================
// Unit Tests
// =============================================================================
