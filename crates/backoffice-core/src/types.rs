//! # Domain Types
//!
//! Rows and value types of the sales order lifecycle.
//!
//! ## Type Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                    │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │   SalesOrder    │   │      Sale       │   │    Delivery     │       │
//! │  │  ─────────────  │   │  ─────────────  │   │  ─────────────  │       │
//! │  │  status OPEN    │──►│  INVOICE        │──►│  sale_id (1:1)  │       │
//! │  │  items[]        │   │  RETURN ──┐     │   │  CREATED..      │       │
//! │  │  phone/address  │   │  items[]  │     │   │  carrier        │       │
//! │  └─────────────────┘   └───────────┼─────┘   └─────────────────┘       │
//! │                                    │ original_sale_id                   │
//! │                                    ▼                                    │
//! │                         reverses an INVOICE item                        │
//! │                                                                         │
//! │  InventoryEntry: (product_id, location_id) → quantity ≥ 0              │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Dual-Key Identity Pattern
//! Every entity has:
//! - `id`: UUID v4 - immutable, used for relations
//! - Business key where one exists (sku, phone, promotion code)
//!
//! ## Amount Convention
//! `final_amount_cents` on order and sale items is post-discount and
//! tax-inclusive: shelf prices already include VAT. Return quantities and
//! refunds are stored as positive numbers; the parent sale's
//! [`SaleType::Return`] marks them as reversals.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::money::Money;
use crate::pricing::Discount;

/// Implements `Display` with the stored (SCREAMING_SNAKE_CASE) spelling.
macro_rules! status_display {
    ($ty:ident { $($variant:ident => $text:literal),+ $(,)? }) => {
        impl $ty {
            /// Returns the spelling stored in the database.
            pub const fn as_str(&self) -> &'static str {
                match self {
                    $($ty::$variant => $text),+
                }
            }
        }

        impl fmt::Display for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }
    };
}

// =============================================================================
// Statuses
// =============================================================================

/// Status of a sales order (the draft aggregate).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "SCREAMING_SNAKE_CASE"))]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderStatus {
    /// Draft: items may be added and removed.
    #[default]
    Open,
    /// Invoiced; inventory has been deducted. Terminal.
    Confirmed,
    /// Abandoned before confirmation. Terminal.
    Cancelled,
}

status_display!(OrderStatus {
    Open => "OPEN",
    Confirmed => "CONFIRMED",
    Cancelled => "CANCELLED",
});

/// Kind of financial document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "SCREAMING_SNAKE_CASE"))]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SaleType {
    Invoice,
    Return,
}

status_display!(SaleType {
    Invoice => "INVOICE",
    Return => "RETURN",
});

/// Payment state of a sale.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "SCREAMING_SNAKE_CASE"))]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum InvoiceStatus {
    /// Issued, payment not yet settled.
    Confirmed,
    /// Issued and paid.
    Paid,
    /// Refund issued (RETURN sales).
    Refunded,
}

status_display!(InvoiceStatus {
    Confirmed => "CONFIRMED",
    Paid => "PAID",
    Refunded => "REFUNDED",
});

/// Fulfilment state of a delivery.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "SCREAMING_SNAKE_CASE"))]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DeliveryStatus {
    Created,
    Packed,
    Shipped,
    Delivered,
    Failed,
}

status_display!(DeliveryStatus {
    Created => "CREATED",
    Packed => "PACKED",
    Shipped => "SHIPPED",
    Delivered => "DELIVERED",
    Failed => "FAILED",
});

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "SCREAMING_SNAKE_CASE"))]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EmployeeRole {
    Sales,
    Delivery,
    Manager,
}

status_display!(EmployeeRole {
    Sales => "SALES",
    Delivery => "DELIVERY",
    Manager => "MANAGER",
});

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "SCREAMING_SNAKE_CASE"))]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LocationStatus {
    Open,
    Closed,
}

status_display!(LocationStatus {
    Open => "OPEN",
    Closed => "CLOSED",
});

/// Catalog status shared by products and promotions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "SCREAMING_SNAKE_CASE"))]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ActiveStatus {
    Active,
    Inactive,
}

status_display!(ActiveStatus {
    Active => "ACTIVE",
    Inactive => "INACTIVE",
});

// =============================================================================
// Reference Data
// =============================================================================

/// A customer, matched by phone number when an order is created.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Customer {
    pub id: String,
    pub first_name: String,
    pub last_name: String,
    /// Business key: unique per customer.
    pub phone: String,
    pub email: Option<String>,
    pub address: String,
    pub created_at: DateTime<Utc>,
    pub modified_at: DateTime<Utc>,
}

impl Customer {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }
}

/// Customer details captured at order time.
///
/// An existing customer with the same phone has its name, address and
/// (when given) email corrected to these values.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CustomerDetails {
    pub phone: String,
    pub first_name: String,
    pub last_name: String,
    pub email: Option<String>,
    pub address: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Employee {
    pub id: String,
    pub first_name: String,
    pub last_name: String,
    pub role: EmployeeRole,
    pub is_inactive: bool,
}

impl Employee {
    #[inline]
    pub fn is_active(&self) -> bool {
        !self.is_inactive
    }
}

/// A store or warehouse; the unit of inventory partitioning.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Location {
    pub id: String,
    pub name: String,
    pub status: LocationStatus,
}

impl Location {
    #[inline]
    pub fn is_open(&self) -> bool {
        self.status == LocationStatus::Open
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Product {
    pub id: String,
    pub sku: String,
    pub name: String,
    /// Current shelf price (tax-inclusive).
    pub unit_price_cents: i64,
    pub status: ActiveStatus,
}

impl Product {
    #[inline]
    pub fn unit_price(&self) -> Money {
        Money::from_cents(self.unit_price_cents)
    }

    #[inline]
    pub fn is_active(&self) -> bool {
        self.status == ActiveStatus::Active
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct PaymentMethod {
    pub id: String,
    pub name: String,
}

/// External carrier company.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct DeliveryVendor {
    pub id: String,
    pub name: String,
}

/// A promotion code, optionally bound to a campaign window.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Promotion {
    pub id: String,
    pub code: String,
    /// Percentage discount in basis points (1000 = 10%).
    pub discount_percent_bps: Option<i64>,
    /// Fixed discount subtracted after the percentage.
    pub discount_value_cents: Option<i64>,
    pub status: ActiveStatus,
    pub campaign_name: Option<String>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
}

impl Promotion {
    /// True when the promotion is active and `today` falls inside its
    /// campaign window (open-ended bounds always match).
    pub fn is_eligible_on(&self, today: NaiveDate) -> bool {
        self.status == ActiveStatus::Active
            && self.start_date.map_or(true, |start| start <= today)
            && self.end_date.map_or(true, |end| end >= today)
    }

    pub fn discount(&self) -> Discount {
        Discount {
            percent_bps: self
                .discount_percent_bps
                .and_then(|bps| u32::try_from(bps).ok()),
            value: self.discount_value_cents.map(Money::from_cents),
        }
    }
}

// =============================================================================
// Sales Order (draft aggregate)
// =============================================================================

/// Order header.
///
/// `delivery_phone` / `delivery_address` are snapshots; later edits to the
/// customer never rewrite historical orders.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct SalesOrder {
    pub id: String,
    pub customer_id: String,
    pub employee_id: String,
    pub location_id: String,
    pub status: OrderStatus,
    pub note: Option<String>,
    pub delivery_phone: String,
    pub delivery_address: String,
    pub created_at: DateTime<Utc>,
    pub modified_at: DateTime<Utc>,
}

/// A line on a draft order. One per product per order.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct SalesOrderItem {
    pub id: String,
    pub order_id: String,
    pub product_id: String,
    pub quantity: i64,
    /// Unit price when the line was added (frozen).
    pub unit_price_cents: i64,
    pub final_amount_cents: i64,
    pub promotion_id: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl SalesOrderItem {
    #[inline]
    pub fn final_amount(&self) -> Money {
        Money::from_cents(self.final_amount_cents)
    }
}

/// Header plus lines, as returned by the lifecycle manager.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderDetail {
    pub order: SalesOrder,
    pub items: Vec<SalesOrderItem>,
}

impl OrderDetail {
    pub fn total(&self) -> Money {
        self.items.iter().map(SalesOrderItem::final_amount).sum()
    }
}

/// Delivery contact captured on the order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeliveryContact {
    pub phone: String,
    pub address: String,
}

impl DeliveryContact {
    /// Delivers to the customer's own phone and address.
    pub fn from_customer(details: &CustomerDetails) -> Self {
        DeliveryContact {
            phone: details.phone.clone(),
            address: details.address.clone(),
        }
    }
}

/// Input for creating a draft order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewOrder {
    pub customer: CustomerDetails,
    pub employee_id: String,
    pub location_id: String,
    pub note: Option<String>,
    pub delivery: DeliveryContact,
}

/// Open order listing row.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct OrderSummary {
    pub order_id: String,
    pub created_at: DateTime<Utc>,
    pub customer_name: String,
    pub location_name: String,
    pub item_count: i64,
    pub total_amount_cents: i64,
}

/// Order history row joined with its invoice and delivery, if any.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct OrderHistoryEntry {
    pub order_id: String,
    pub created_at: DateTime<Utc>,
    pub customer_name: String,
    pub employee_name: String,
    pub location_name: String,
    pub status: OrderStatus,
    pub item_count: i64,
    pub total_amount_cents: i64,
    pub invoice_id: Option<String>,
    pub invoice_status: Option<InvoiceStatus>,
    pub delivery_status: Option<DeliveryStatus>,
}

/// Filter for the order history listing.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OrderHistoryFilter {
    pub status: Option<OrderStatus>,
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
}

// =============================================================================
// Sale (Invoice / Return)
// =============================================================================

/// A financial document: an INVOICE from a confirmed order or a RETURN
/// against an invoice.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Sale {
    pub id: String,
    pub sale_type: SaleType,
    /// Source order (INVOICE only).
    pub order_id: Option<String>,
    /// Invoice being reversed (RETURN only).
    pub original_sale_id: Option<String>,
    pub location_id: String,
    pub payment_method_id: String,
    pub invoice_status: InvoiceStatus,
    pub delivery_status: Option<DeliveryStatus>,
    pub total_amount_cents: i64,
    pub sale_date: DateTime<Utc>,
    pub modified_at: DateTime<Utc>,
}

impl Sale {
    #[inline]
    pub fn total_amount(&self) -> Money {
        Money::from_cents(self.total_amount_cents)
    }

    #[inline]
    pub fn is_invoice(&self) -> bool {
        self.sale_type == SaleType::Invoice
    }
}

/// Quantity and amount per product at the moment of sale (snapshot).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct SaleItem {
    pub id: String,
    pub sale_id: String,
    pub product_id: String,
    pub quantity: i64,
    pub final_amount_cents: i64,
    /// Invoice item being reversed (RETURN items only).
    pub original_sale_item_id: Option<String>,
}

impl SaleItem {
    #[inline]
    pub fn final_amount(&self) -> Money {
        Money::from_cents(self.final_amount_cents)
    }
}

/// Sale header plus its items.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SaleDetail {
    pub sale: Sale,
    pub items: Vec<SaleItem>,
}

/// Input for a return against an invoice line.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReturnRequest {
    pub original_sale_id: String,
    pub product_id: String,
    pub quantity: i64,
    pub refund_payment_method_id: String,
    /// Location whose stock receives the returned goods.
    pub return_location_id: String,
}

/// Outcome of a processed return.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReturnReceipt {
    pub return_sale: Sale,
    pub item: SaleItem,
    pub refund: Money,
    /// Quantity of the product still returnable on the original invoice.
    pub remaining_returnable: i64,
}

// =============================================================================
// Delivery
// =============================================================================

/// Delivery of one invoice. At most one per sale.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Delivery {
    pub id: String,
    pub sale_id: String,
    /// Origin location the goods leave from.
    pub location_id: String,
    /// Internal dispatcher.
    pub employee_id: String,
    /// External carrier, if any.
    pub vendor_id: Option<String>,
    pub status: DeliveryStatus,
    pub created_at: DateTime<Utc>,
    pub modified_at: DateTime<Utc>,
}

/// Input for dispatching an invoice.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewDelivery {
    pub sale_id: String,
    pub origin_location_id: String,
    /// Internal dispatcher; must be an active DELIVERY employee.
    pub employee_id: String,
    /// External carrier. Takes over status reporting when set.
    pub vendor_id: Option<String>,
}

/// Invoice waiting for a delivery to be created.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct PendingDelivery {
    pub sale_id: String,
    pub sale_date: DateTime<Utc>,
    pub customer_name: String,
    pub delivery_phone: String,
    pub delivery_address: String,
    pub location_id: String,
    pub location_name: String,
    pub total_amount_cents: i64,
}

// =============================================================================
// Inventory
// =============================================================================

/// Stock of one product at one location.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct InventoryEntry {
    pub product_id: String,
    pub location_id: String,
    /// Never negative.
    pub quantity: i64,
    pub modified_at: DateTime<Utc>,
}

// =============================================================================
// Unit Tests
// =============================================================================
