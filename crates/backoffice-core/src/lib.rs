//! # backoffice-core: Pure Business Logic for the Sales Order Lifecycle
//!
//! This crate holds the rules of the back-office order lifecycle as pure
//! functions and plain data. Nothing here touches a database.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Back Office Architecture                           │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │              UI / API layer (outside this workspace)            │   │
//! │  │   Create Order ──► Confirm ──► Delivery ──► Return ──► History  │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │ actor + command                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │  backoffice-db services (OrderLifecycleManager, ...)            │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │               ★ backoffice-core (THIS CRATE) ★                  │   │
//! │  │                                                                 │   │
//! │  │   ┌─────────┐ ┌─────────┐ ┌─────────┐ ┌──────────┐ ┌────────┐  │   │
//! │  │   │  types  │ │  money  │ │ pricing │ │lifecycle │ │ perms  │  │   │
//! │  │   │ Order   │ │ Money   │ │ line amt│ │ statuses │ │ gate   │  │   │
//! │  │   │ Sale    │ │         │ │ refunds │ │ carriers │ │ actor  │  │   │
//! │  │   └─────────┘ └─────────┘ └─────────┘ └──────────┘ └────────┘  │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`types`] - Domain rows (SalesOrder, Sale, Delivery, InventoryEntry, ...)
//! - [`money`] - Integer money in minor units
//! - [`pricing`] - Line amount resolution and refund proration
//! - [`lifecycle`] - Order / sale / delivery status rules
//! - [`permission`] - Actor and the external permission gate
//! - [`validation`] - Input validation
//! - [`error`] - Domain error taxonomy
//!
//! ## Example Usage
//!
//! ```rust
//! use backoffice_core::money::Money;
//! use backoffice_core::pricing::{resolve_line_amount, Discount};
//!
//! let unit_price = Money::from_cents(25_000);
//! let promo = Discount { percent_bps: Some(1000), value: None }; // 10% off
//!
//! let amount = resolve_line_amount(unit_price, 2, Some(&promo));
//! assert_eq!(amount, Some(Money::from_cents(45_000)));
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod lifecycle;
pub mod money;
pub mod permission;
pub mod pricing;
pub mod types;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================

pub use error::{CoreError, CoreResult, ErrorCategory, ErrorPayload, StockShortage, ValidationError};
pub use lifecycle::Carrier;
pub use money::Money;
pub use permission::{Actor, AllowAll, Permission, PermissionGate, RolePermissions};
pub use types::*;

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Maximum line items on a single sales order (default, configurable).
pub const MAX_ORDER_ITEMS: usize = 100;

/// Maximum quantity of a single line item.
///
/// Catches typing 1000 instead of 10 at the counter.
pub const MAX_ITEM_QUANTITY: i64 = 999;

/// Largest unit price or fixed discount a catalog row may carry.
pub const MAX_UNIT_PRICE_CENTS: i64 = 1_000_000_000_000;

/// Days after the invoice date during which a return is accepted.
pub const DEFAULT_RETURN_WINDOW_DAYS: i64 = 30;

/// Minimum digits in a delivery phone number.
pub const MIN_PHONE_DIGITS: usize = 10;
