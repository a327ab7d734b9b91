//! # Order Lifecycle Manager
//!
//! Draft orders from creation to invoice.
//!
//! ## Confirmation
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  confirm_order(order_id, payment_method_id)                            │
//! │                                                                         │
//! │  BEGIN                                                                  │
//! │   ├── claim order row            ← write lock taken here               │
//! │   ├── status?  CONFIRMED → AlreadyConfirmed(sale_id)                   │
//! │   │            CANCELLED → InvalidState                                │
//! │   ├── stock check, every line    → InsufficientStock(all shortages)    │
//! │   ├── decrement stock, every line                                      │
//! │   ├── insert INVOICE (PAID) + sale items                               │
//! │   └── order → CONFIRMED                                                │
//! │  COMMIT                          ← or nothing at all                   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The stock check in `add_item` is advisory: stock may move before the
//! order is confirmed, and no reservation is held.

use std::sync::Arc;

use chrono::Utc;
use sqlx::{SqliteConnection, SqlitePool};
use tracing::{info, warn};

use backoffice_core::lifecycle::ensure_order_open;
use backoffice_core::pricing::resolve_line_amount;
use backoffice_core::validation::{
    validate_customer_details, validate_delivery_contact, validate_note, validate_order_size,
    validate_quantity,
};
use backoffice_core::{
    Actor, CoreError, CoreResult, InvoiceStatus, Money, NewOrder, OrderDetail,
    OrderHistoryEntry, OrderHistoryFilter, OrderStatus, OrderSummary, Permission, PermissionGate,
    Sale, SaleDetail, SaleItem, SaleType, SalesOrder, SalesOrderItem, StockShortage,
    ValidationError,
};

use crate::config::OrderSettings;
use crate::repository::inventory::InventoryLedger;
use crate::repository::{customer, new_id, order, reference, sale};
use crate::service::{acquire, begin, commit};

/// Creates, edits, confirms and cancels sales orders.
#[derive(Clone)]
pub struct OrderLifecycleManager {
    pool: SqlitePool,
    gate: Arc<dyn PermissionGate>,
    settings: OrderSettings,
}

impl OrderLifecycleManager {
    pub fn new(pool: SqlitePool, gate: Arc<dyn PermissionGate>, settings: OrderSettings) -> Self {
        OrderLifecycleManager { pool, gate, settings }
    }

    // =========================================================================
    // Commands
    // =========================================================================

    /// Creates an OPEN order with no items.
    ///
    /// The customer is matched by phone: a known customer gets its name,
    /// address and email corrected, an unknown one is created.
    pub async fn create_order(&self, actor: &Actor, new_order: NewOrder) -> CoreResult<OrderDetail> {
        self.gate.require(actor, Permission::OrderCreate)?;

        validate_customer_details(&new_order.customer)?;
        validate_delivery_contact(&new_order.delivery)?;
        validate_note(new_order.note.as_deref())?;

        {
            let mut conn = acquire(&self.pool).await?;
            check_seller(&mut conn, &new_order.employee_id).await?;
            check_open_location(&mut conn, &new_order.location_id).await?;
        }

        let now = Utc::now();
        let mut tx = begin(&self.pool).await?;

        let customer = customer::upsert_by_phone(&mut tx, &new_order.customer, now).await?;
        let sales_order = SalesOrder {
            id: new_id(),
            customer_id: customer.id,
            employee_id: new_order.employee_id,
            location_id: new_order.location_id,
            status: OrderStatus::Open,
            note: new_order.note.filter(|n| !n.trim().is_empty()),
            delivery_phone: new_order.delivery.phone.trim().to_string(),
            delivery_address: new_order.delivery.address.trim().to_string(),
            created_at: now,
            modified_at: now,
        };
        order::insert_order(&mut tx, &sales_order).await?;

        commit(tx).await?;

        info!(
            order_id = %sales_order.id,
            customer_id = %sales_order.customer_id,
            user = %actor.user_id,
            "Sales order created"
        );

        Ok(OrderDetail {
            order: sales_order,
            items: Vec::new(),
        })
    }

    /// Adds a product line to an OPEN order.
    ///
    /// ## Errors
    /// - `InvalidState` unless the order is OPEN
    /// - `DuplicateItem` if the product is already on the order
    /// - `Validation` for a bad quantity, an inactive product, an ineligible
    ///   promotion or a full order
    /// - `InsufficientStock` if the order's location cannot cover the
    ///   quantity right now
    pub async fn add_item(
        &self,
        actor: &Actor,
        order_id: &str,
        product_id: &str,
        quantity: i64,
        promotion_id: Option<&str>,
    ) -> CoreResult<SalesOrderItem> {
        self.gate.require(actor, Permission::OrderCreate)?;
        validate_quantity(quantity, self.settings.max_item_quantity)?;

        let now = Utc::now();
        let mut tx = begin(&self.pool).await?;
        let sales_order = claim_order(&mut tx, order_id).await?;
        ensure_order_open(order_id, sales_order.status, "add items")?;

        if order::find_item(&mut tx, order_id, product_id).await?.is_some() {
            warn!(order_id, product_id, "Product already on order");
            return Err(CoreError::DuplicateItem {
                order_id: order_id.to_string(),
                product_id: product_id.to_string(),
            });
        }

        let line_count = order::count_items(&mut tx, order_id).await?;
        validate_order_size(line_count, self.settings.max_items_per_order)?;

        let product = match reference::get_product(&mut tx, product_id).await? {
            Some(p) if p.is_active() => p,
            Some(_) => return Err(ValidationError::invalid_reference("product_id", product_id, "is inactive").into()),
            None => return Err(ValidationError::invalid_reference("product_id", product_id, "does not exist").into()),
        };

        let discount = match promotion_id {
            Some(promotion_id) => {
                let promotion = reference::get_promotion(&mut tx, promotion_id)
                    .await?
                    .ok_or_else(|| {
                        ValidationError::invalid_reference("promotion_id", promotion_id, "does not exist")
                    })?;
                if !promotion.is_eligible_on(now.date_naive()) {
                    return Err(ValidationError::invalid_reference(
                        "promotion_id",
                        promotion_id,
                        "is inactive or outside its campaign",
                    )
                    .into());
                }
                Some(promotion.discount())
            }
            None => None,
        };

        let available =
            InventoryLedger::get_available(&mut tx, product_id, &sales_order.location_id).await?;
        if quantity > available {
            warn!(order_id, product_id, requested = quantity, available, "Not enough stock to add item");
            return Err(CoreError::InsufficientStock {
                shortages: vec![StockShortage {
                    product_id: product_id.to_string(),
                    requested: quantity,
                    available,
                }],
            });
        }

        let final_amount = resolve_line_amount(product.unit_price(), quantity, discount.as_ref())
            .ok_or_else(|| amount_out_of_range("line amount"))?;
        let item = SalesOrderItem {
            id: new_id(),
            order_id: order_id.to_string(),
            product_id: product_id.to_string(),
            quantity,
            unit_price_cents: product.unit_price_cents,
            final_amount_cents: final_amount.cents(),
            promotion_id: promotion_id.map(str::to_string),
            created_at: now,
        };
        order::insert_item(&mut tx, &item).await?;

        commit(tx).await?;
        Ok(item)
    }

    /// Removes a product line from an OPEN order.
    pub async fn remove_item(&self, actor: &Actor, order_id: &str, product_id: &str) -> CoreResult<()> {
        self.gate.require(actor, Permission::OrderCreate)?;

        let mut tx = begin(&self.pool).await?;
        let sales_order = claim_order(&mut tx, order_id).await?;
        ensure_order_open(order_id, sales_order.status, "remove items")?;

        if !order::delete_item(&mut tx, order_id, product_id).await? {
            return Err(CoreError::not_found("Order item", product_id));
        }

        commit(tx).await?;
        Ok(())
    }

    /// Turns an OPEN order into a PAID invoice and deducts its stock.
    ///
    /// Every line is checked before anything is written; if any product is
    /// short the error lists all of them and the order stays OPEN. A second
    /// confirmation fails with `AlreadyConfirmed` carrying the invoice id.
    pub async fn confirm_order(
        &self,
        actor: &Actor,
        order_id: &str,
        payment_method_id: &str,
    ) -> CoreResult<SaleDetail> {
        self.gate.require(actor, Permission::OrderConfirm)?;

        let now = Utc::now();
        let mut tx = begin(&self.pool).await?;
        let sales_order = claim_order(&mut tx, order_id).await?;

        match sales_order.status {
            OrderStatus::Open => {}
            OrderStatus::Confirmed => {
                let invoice = sale::invoice_for_order(&mut tx, order_id).await?;
                return Err(match invoice {
                    Some(invoice) => {
                        warn!(order_id, sale_id = %invoice.id, "Order already confirmed");
                        CoreError::AlreadyConfirmed {
                            order_id: order_id.to_string(),
                            sale_id: invoice.id,
                        }
                    }
                    None => CoreError::Storage(format!("confirmed order {} has no invoice", order_id)),
                });
            }
            OrderStatus::Cancelled => {
                return Err(CoreError::invalid_state("Order", order_id, OrderStatus::Cancelled, "confirm"));
            }
        }

        if reference::get_payment_method(&mut tx, payment_method_id).await?.is_none() {
            return Err(ValidationError::invalid_reference(
                "payment_method_id",
                payment_method_id,
                "does not exist",
            )
            .into());
        }

        let items = order::get_items(&mut tx, order_id).await?;
        if items.is_empty() {
            return Err(ValidationError::Required {
                field: "order items".to_string(),
            }
            .into());
        }

        let mut shortages = Vec::new();
        for item in &items {
            let available =
                InventoryLedger::get_available(&mut tx, &item.product_id, &sales_order.location_id).await?;
            if item.quantity > available {
                shortages.push(StockShortage {
                    product_id: item.product_id.clone(),
                    requested: item.quantity,
                    available,
                });
            }
        }
        if !shortages.is_empty() {
            warn!(order_id, shortages = shortages.len(), "Confirmation rejected, insufficient stock");
            return Err(CoreError::InsufficientStock { shortages });
        }

        let total = items
            .iter()
            .try_fold(Money::zero(), |total, item| total.checked_add(item.final_amount()))
            .ok_or_else(|| amount_out_of_range("order total"))?;

        for item in &items {
            InventoryLedger::decrement(&mut tx, &item.product_id, &sales_order.location_id, item.quantity, now)
                .await?;
        }

        let invoice = Sale {
            id: new_id(),
            sale_type: SaleType::Invoice,
            order_id: Some(order_id.to_string()),
            original_sale_id: None,
            location_id: sales_order.location_id.clone(),
            payment_method_id: payment_method_id.to_string(),
            invoice_status: InvoiceStatus::Paid,
            delivery_status: None,
            total_amount_cents: total.cents(),
            sale_date: now,
            modified_at: now,
        };
        sale::insert_sale(&mut tx, &invoice).await?;

        let mut sale_items = Vec::with_capacity(items.len());
        for item in &items {
            let sale_item = SaleItem {
                id: new_id(),
                sale_id: invoice.id.clone(),
                product_id: item.product_id.clone(),
                quantity: item.quantity,
                final_amount_cents: item.final_amount_cents,
                original_sale_item_id: None,
            };
            sale::insert_item(&mut tx, &sale_item).await?;
            sale_items.push(sale_item);
        }

        order::set_status(&mut tx, order_id, OrderStatus::Confirmed, now).await?;
        commit(tx).await?;

        info!(
            order_id,
            sale_id = %invoice.id,
            total = %invoice.total_amount(),
            lines = sale_items.len(),
            user = %actor.user_id,
            "Order confirmed"
        );

        Ok(SaleDetail {
            sale: invoice,
            items: sale_items,
        })
    }

    /// Cancels an OPEN order. Stock is untouched.
    pub async fn cancel_order(&self, actor: &Actor, order_id: &str) -> CoreResult<SalesOrder> {
        self.gate.require(actor, Permission::OrderCancel)?;

        let now = Utc::now();
        let mut tx = begin(&self.pool).await?;
        let mut sales_order = claim_order(&mut tx, order_id).await?;
        ensure_order_open(order_id, sales_order.status, "cancel")?;

        order::set_status(&mut tx, order_id, OrderStatus::Cancelled, now).await?;
        commit(tx).await?;

        info!(order_id, user = %actor.user_id, "Order cancelled");

        sales_order.status = OrderStatus::Cancelled;
        sales_order.modified_at = now;
        Ok(sales_order)
    }

    // =========================================================================
    // Queries
    // =========================================================================

    /// Order header and lines.
    pub async fn get_order(&self, actor: &Actor, order_id: &str) -> CoreResult<OrderDetail> {
        self.gate.require(actor, Permission::OrderView)?;

        let mut conn = acquire(&self.pool).await?;
        let sales_order = order::get_order(&mut conn, order_id)
            .await?
            .ok_or_else(|| CoreError::not_found("Order", order_id))?;
        let items = order::get_items(&mut conn, order_id).await?;

        Ok(OrderDetail {
            order: sales_order,
            items,
        })
    }

    /// OPEN orders with their line count and running total.
    pub async fn list_open_orders(&self, actor: &Actor) -> CoreResult<Vec<OrderSummary>> {
        self.gate.require(actor, Permission::OrderView)?;

        let mut conn = acquire(&self.pool).await?;
        Ok(order::list_open(&mut conn).await?)
    }

    /// Orders of every status, newest first, capped at
    /// [`order::HISTORY_LIMIT`] rows.
    pub async fn order_history(
        &self,
        actor: &Actor,
        filter: &OrderHistoryFilter,
    ) -> CoreResult<Vec<OrderHistoryEntry>> {
        self.gate.require(actor, Permission::OrderView)?;

        let mut conn = acquire(&self.pool).await?;
        Ok(order::history(&mut conn, filter).await?)
    }

    /// A sale (invoice or return) with its items.
    pub async fn get_sale(&self, actor: &Actor, sale_id: &str) -> CoreResult<SaleDetail> {
        self.gate.require(actor, Permission::OrderView)?;

        let mut conn = acquire(&self.pool).await?;
        let found = sale::get_sale(&mut conn, sale_id)
            .await?
            .ok_or_else(|| CoreError::not_found("Sale", sale_id))?;
        let items = sale::get_items(&mut conn, sale_id).await?;

        Ok(SaleDetail { sale: found, items })
    }
}

// =============================================================================
// Helpers
// =============================================================================

/// Claims the order row and returns it.
async fn claim_order(conn: &mut SqliteConnection, order_id: &str) -> CoreResult<SalesOrder> {
    if !order::claim(conn, order_id, Utc::now()).await? {
        return Err(CoreError::not_found("Order", order_id));
    }
    order::get_order(conn, order_id)
        .await?
        .ok_or_else(|| CoreError::not_found("Order", order_id))
}

async fn check_seller(conn: &mut SqliteConnection, employee_id: &str) -> CoreResult<()> {
    match reference::get_employee(conn, employee_id).await? {
        Some(employee) if employee.is_active() => Ok(()),
        Some(_) => Err(ValidationError::invalid_reference("employee_id", employee_id, "is inactive").into()),
        None => Err(ValidationError::invalid_reference("employee_id", employee_id, "does not exist").into()),
    }
}

fn amount_out_of_range(field: &str) -> CoreError {
    ValidationError::OutOfRange {
        field: field.to_string(),
        min: 0,
        max: i64::MAX,
    }
    .into()
}

async fn check_open_location(conn: &mut SqliteConnection, location_id: &str) -> CoreResult<()> {
    match reference::get_location(conn, location_id).await? {
        Some(location) if location.is_open() => Ok(()),
        Some(_) => Err(ValidationError::invalid_reference("location_id", location_id, "is closed").into()),
        None => Err(ValidationError::invalid_reference("location_id", location_id, "does not exist").into()),
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::retry::{retry_on_conflict, RetryPolicy};
    use crate::testing::Fixture;
    use backoffice_core::{RolePermissions, MAX_UNIT_PRICE_CENTS};

    #[tokio::test]
    async fn test_confirm_deducts_stock_and_invoices() {
        let fx = Fixture::new().await;
        fx.stock(&fx.product_a, &fx.store, 10).await;
        let order_id = fx.open_order(&[(&fx.product_a, 10)]).await;

        let invoice = fx
            .db
            .orders()
            .confirm_order(&fx.actor, &order_id, &fx.card)
            .await
            .unwrap();

        assert_eq!(fx.available(&fx.product_a, &fx.store).await, 0);
        assert_eq!(invoice.sale.sale_type, SaleType::Invoice);
        assert_eq!(invoice.sale.invoice_status, InvoiceStatus::Paid);
        assert_eq!(invoice.sale.order_id.as_deref(), Some(order_id.as_str()));
        assert_eq!(invoice.sale.total_amount(), Money::from_cents(250_000));
        assert_eq!(invoice.items.len(), 1);
        assert_eq!(invoice.items[0].quantity, 10);

        let order = fx.db.orders().get_order(&fx.actor, &order_id).await.unwrap();
        assert_eq!(order.order.status, OrderStatus::Confirmed);
    }

    #[tokio::test]
    async fn test_create_order_reuses_customer_by_phone() {
        let fx = Fixture::new().await;
        let orders = fx.db.orders();

        let first = orders.create_order(&fx.actor, fx.new_order()).await.unwrap();
        let mut again = fx.new_order();
        again.customer.first_name = "Mai Anh".to_string();
        again.note = Some("call before delivery".to_string());
        let second = orders.create_order(&fx.actor, again).await.unwrap();

        assert_eq!(first.order.customer_id, second.order.customer_id);
        assert_ne!(first.order.id, second.order.id);
        assert_eq!(second.order.status, OrderStatus::Open);
        assert!(second.items.is_empty());

        let open = orders.list_open_orders(&fx.actor).await.unwrap();
        assert_eq!(open.len(), 2);
        assert!(open.iter().any(|o| o.customer_name == "Mai Anh Pham"));
    }

    #[tokio::test]
    async fn test_create_order_rejects_bad_references() {
        let fx = Fixture::new().await;
        let orders = fx.db.orders();

        let mut inactive = fx.new_order();
        inactive.employee_id = fx.inactive_employee.clone();
        let mut closed = fx.new_order();
        closed.location_id = fx.closed_store.clone();
        let mut short_phone = fx.new_order();
        short_phone.customer.phone = "09012".to_string();

        for request in [inactive, closed, short_phone] {
            let err = orders.create_order(&fx.actor, request).await.unwrap_err();
            assert!(matches!(err, CoreError::Validation(_)), "got {err}");
        }
        assert!(orders.list_open_orders(&fx.actor).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_same_product_twice_is_duplicate() {
        let fx = Fixture::new().await;
        fx.stock(&fx.product_a, &fx.store, 10).await;
        let order_id = fx.open_order(&[(&fx.product_a, 1)]).await;

        let err = fx
            .db
            .orders()
            .add_item(&fx.actor, &order_id, &fx.product_a, 2, None)
            .await
            .unwrap_err();
        assert!(matches!(err, CoreError::DuplicateItem { .. }));

        let order = fx.db.orders().get_order(&fx.actor, &order_id).await.unwrap();
        assert_eq!(order.items.len(), 1);
        assert_eq!(order.items[0].quantity, 1);
    }

    #[tokio::test]
    async fn test_add_item_rules() {
        let fx = Fixture::new().await;
        fx.stock(&fx.product_a, &fx.store, 5).await;
        fx.stock(&fx.retired_product, &fx.store, 5).await;
        let order_id = fx.open_order::<&str>(&[]).await;
        let orders = fx.db.orders();

        for quantity in [0, 1000] {
            let err = orders
                .add_item(&fx.actor, &order_id, &fx.product_a, quantity, None)
                .await
                .unwrap_err();
            assert!(matches!(err, CoreError::Validation(_)));
        }

        let err = orders
            .add_item(&fx.actor, &order_id, &fx.retired_product, 1, None)
            .await
            .unwrap_err();
        assert!(matches!(err, CoreError::Validation(_)));

        let err = orders
            .add_item(&fx.actor, &order_id, &fx.product_a, 1, Some(&fx.expired_promo))
            .await
            .unwrap_err();
        assert!(matches!(err, CoreError::Validation(_)));

        let err = orders
            .add_item(&fx.actor, &order_id, &fx.product_a, 6, None)
            .await
            .unwrap_err();
        match err {
            CoreError::InsufficientStock { shortages } => assert_eq!(shortages[0].available, 5),
            other => panic!("unexpected error: {other}"),
        }

        // exactly what is on hand is fine
        let item = orders
            .add_item(&fx.actor, &order_id, &fx.product_a, 5, Some(&fx.promo_10))
            .await
            .unwrap();
        assert_eq!(item.final_amount(), Money::from_cents(112_500));
        assert_eq!(item.promotion_id.as_deref(), Some(fx.promo_10.as_str()));
    }

    #[tokio::test]
    async fn test_order_item_limit() {
        let fx = Fixture::new().await;
        fx.stock(&fx.product_a, &fx.store, 5).await;
        fx.stock(&fx.product_b, &fx.store, 5).await;
        let db = fx.db.clone().with_order_settings(OrderSettings {
            max_items_per_order: 1,
            ..OrderSettings::default()
        });
        let order_id = fx.open_order(&[(&fx.product_a, 1)]).await;

        let err = db
            .orders()
            .add_item(&fx.actor, &order_id, &fx.product_b, 1, None)
            .await
            .unwrap_err();
        assert!(matches!(err, CoreError::Validation(ValidationError::LimitReached { .. })));
    }

    #[tokio::test]
    async fn test_amounts_that_overflow_are_rejected() {
        let fx = Fixture::new().await;
        let bulk_1 = fx.product("BULK-1", MAX_UNIT_PRICE_CENTS).await;
        let bulk_2 = fx.product("BULK-2", MAX_UNIT_PRICE_CENTS).await;
        fx.stock(&bulk_1, &fx.store, 10_000_000).await;
        fx.stock(&bulk_2, &fx.store, 10_000_000).await;
        let db = fx.db.clone().with_order_settings(OrderSettings {
            max_item_quantity: i64::MAX,
            ..OrderSettings::default()
        });
        let orders = db.orders();

        let order_id = fx.open_order::<&str>(&[]).await;
        let err = orders
            .add_item(&fx.actor, &order_id, &bulk_1, 10_000_000, None)
            .await
            .unwrap_err();
        assert!(matches!(err, CoreError::Validation(ValidationError::OutOfRange { .. })));

        // each line fits, their sum does not
        for product_id in [&bulk_1, &bulk_2] {
            orders
                .add_item(&fx.actor, &order_id, product_id, 5_000_000, None)
                .await
                .unwrap();
        }
        let err = orders.confirm_order(&fx.actor, &order_id, &fx.cash).await.unwrap_err();
        assert!(matches!(err, CoreError::Validation(ValidationError::OutOfRange { .. })));

        assert_eq!(fx.available(&bulk_1, &fx.store).await, 10_000_000);
        let order = orders.get_order(&fx.actor, &order_id).await.unwrap();
        assert_eq!(order.order.status, OrderStatus::Open);
    }

    #[tokio::test]
    async fn test_remove_item_and_empty_confirm() {
        let fx = Fixture::new().await;
        fx.stock(&fx.product_b, &fx.store, 5).await;
        let order_id = fx.open_order(&[(&fx.product_b, 2)]).await;
        let orders = fx.db.orders();

        orders.remove_item(&fx.actor, &order_id, &fx.product_b).await.unwrap();
        let err = orders.remove_item(&fx.actor, &order_id, &fx.product_b).await.unwrap_err();
        assert!(matches!(err, CoreError::NotFound { .. }));

        let err = orders.confirm_order(&fx.actor, &order_id, &fx.cash).await.unwrap_err();
        assert!(matches!(err, CoreError::Validation(_)));
        assert_eq!(fx.available(&fx.product_b, &fx.store).await, 5);
    }

    #[tokio::test]
    async fn test_confirm_lists_every_shortage() {
        let fx = Fixture::new().await;
        fx.stock(&fx.product_a, &fx.store, 3).await;
        fx.stock(&fx.product_b, &fx.store, 3).await;
        let order_id = fx.open_order(&[(&fx.product_a, 3), (&fx.product_b, 3)]).await;

        fx.stock(&fx.product_a, &fx.store, 1).await;
        fx.stock(&fx.product_b, &fx.store, 0).await;

        let err = fx
            .db
            .orders()
            .confirm_order(&fx.actor, &order_id, &fx.cash)
            .await
            .unwrap_err();
        match err {
            CoreError::InsufficientStock { shortages } => {
                assert_eq!(shortages.len(), 2);
                assert!(shortages.iter().any(|s| s.product_id == fx.product_a && s.available == 1));
                assert!(shortages.iter().any(|s| s.product_id == fx.product_b && s.available == 0));
            }
            other => panic!("unexpected error: {other}"),
        }

        assert_eq!(fx.available(&fx.product_a, &fx.store).await, 1);
        let order = fx.db.orders().get_order(&fx.actor, &order_id).await.unwrap();
        assert_eq!(order.order.status, OrderStatus::Open);
    }

    #[tokio::test]
    async fn test_add_time_check_is_not_a_reservation() {
        let fx = Fixture::new().await;
        fx.stock(&fx.product_b, &fx.store, 4).await;
        let first = fx.open_order(&[(&fx.product_b, 4)]).await;
        let second = fx.open_order(&[(&fx.product_b, 4)]).await;
        let orders = fx.db.orders();

        orders.confirm_order(&fx.actor, &first, &fx.cash).await.unwrap();
        let err = orders.confirm_order(&fx.actor, &second, &fx.cash).await.unwrap_err();
        assert!(matches!(err, CoreError::InsufficientStock { .. }));
        assert_eq!(fx.available(&fx.product_b, &fx.store).await, 0);
    }

    #[tokio::test]
    async fn test_second_confirm_is_rejected() {
        let fx = Fixture::new().await;
        fx.stock(&fx.product_a, &fx.store, 10).await;
        let order_id = fx.open_order(&[(&fx.product_a, 3)]).await;
        let orders = fx.db.orders();

        let invoice = orders.confirm_order(&fx.actor, &order_id, &fx.cash).await.unwrap();
        let err = orders.confirm_order(&fx.actor, &order_id, &fx.cash).await.unwrap_err();

        match err {
            CoreError::AlreadyConfirmed { sale_id, .. } => assert_eq!(sale_id, invoice.sale.id),
            other => panic!("unexpected error: {other}"),
        }
        assert_eq!(fx.available(&fx.product_a, &fx.store).await, 7);

        let history = orders
            .order_history(&fx.actor, &OrderHistoryFilter::default())
            .await
            .unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].invoice_id.as_deref(), Some(invoice.sale.id.as_str()));
    }

    #[tokio::test]
    async fn test_cancelled_order_is_frozen() {
        let fx = Fixture::new().await;
        fx.stock(&fx.product_a, &fx.store, 10).await;
        let order_id = fx.open_order(&[(&fx.product_a, 3)]).await;
        let orders = fx.db.orders();

        let cancelled = orders.cancel_order(&fx.actor, &order_id).await.unwrap();
        assert_eq!(cancelled.status, OrderStatus::Cancelled);

        let err = orders.confirm_order(&fx.actor, &order_id, &fx.cash).await.unwrap_err();
        assert!(matches!(err, CoreError::InvalidState { .. }));
        let err = orders.cancel_order(&fx.actor, &order_id).await.unwrap_err();
        assert!(matches!(err, CoreError::InvalidState { .. }));
        let err = orders
            .add_item(&fx.actor, &order_id, &fx.product_b, 1, None)
            .await
            .unwrap_err();
        assert!(matches!(err, CoreError::InvalidState { .. }));

        assert_eq!(fx.available(&fx.product_a, &fx.store).await, 10);
    }

    #[tokio::test]
    async fn test_unknown_order_not_found() {
        let fx = Fixture::new().await;
        let orders = fx.db.orders();

        let err = orders.confirm_order(&fx.actor, "missing", &fx.cash).await.unwrap_err();
        assert!(matches!(err, CoreError::NotFound { .. }));
        let err = orders.get_order(&fx.actor, "missing").await.unwrap_err();
        assert!(matches!(err, CoreError::NotFound { .. }));
    }

    #[tokio::test]
    async fn test_permission_denied_before_any_work() {
        let fx = Fixture::new().await;
        let db = fx
            .db
            .clone()
            .with_permissions(Arc::new(RolePermissions::defaults()));
        let courier = Actor::new("d-1", "delivery");

        let err = db.orders().create_order(&courier, fx.new_order()).await.unwrap_err();
        assert!(matches!(err, CoreError::PermissionDenied { .. }));
        assert!(db.orders().list_open_orders(&courier).await.unwrap().is_empty());

        let clerk = Actor::new("s-1", "sales");
        db.orders().create_order(&clerk, fx.new_order()).await.unwrap();
    }

    #[tokio::test]
    async fn test_history_filters() {
        let fx = Fixture::new().await;
        fx.stock(&fx.product_b, &fx.store, 10).await;
        let orders = fx.db.orders();

        let confirmed = fx.open_order(&[(&fx.product_b, 1)]).await;
        orders.confirm_order(&fx.actor, &confirmed, &fx.cash).await.unwrap();
        let cancelled = fx.open_order(&[(&fx.product_b, 1)]).await;
        orders.cancel_order(&fx.actor, &cancelled).await.unwrap();
        fx.open_order(&[(&fx.product_b, 2)]).await;

        let all = orders
            .order_history(&fx.actor, &OrderHistoryFilter::default())
            .await
            .unwrap();
        assert_eq!(all.len(), 3);

        let only_confirmed = orders
            .order_history(
                &fx.actor,
                &OrderHistoryFilter {
                    status: Some(OrderStatus::Confirmed),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(only_confirmed.len(), 1);
        assert_eq!(only_confirmed[0].order_id, confirmed);
        assert_eq!(only_confirmed[0].invoice_status, Some(InvoiceStatus::Paid));
        assert_eq!(only_confirmed[0].employee_name, "Linh Tran");

        let before_everything = orders
            .order_history(
                &fx.actor,
                &OrderHistoryFilter {
                    to: Some(Utc::now() - chrono::Duration::days(1)),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert!(before_everything.is_empty());

        let open = orders.list_open_orders(&fx.actor).await.unwrap();
        assert_eq!(open.len(), 1);
        assert_eq!(open[0].item_count, 1);
        assert_eq!(open[0].total_amount_cents, 200);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_concurrent_confirms_never_oversell() {
        let dir = tempfile::tempdir().unwrap();
        let fx = Fixture::on_disk(dir.path()).await;
        fx.stock(&fx.product_a, &fx.store, 10).await;
        let first = fx.open_order(&[(&fx.product_a, 6)]).await;
        let second = fx.open_order(&[(&fx.product_a, 6)]).await;

        let handles: Vec<_> = [first, second]
            .into_iter()
            .map(|order_id| {
                let db = fx.db.clone();
                let actor = fx.actor.clone();
                let cash = fx.cash.clone();
                tokio::spawn(async move {
                    let orders = db.orders();
                    retry_on_conflict(&RetryPolicy::default(), || {
                        orders.confirm_order(&actor, &order_id, &cash)
                    })
                    .await
                })
            })
            .collect();

        let mut confirmed = 0;
        let mut short = 0;
        for handle in handles {
            match handle.await.unwrap() {
                Ok(_) => confirmed += 1,
                Err(CoreError::InsufficientStock { shortages }) => {
                    assert_eq!(shortages[0].available, 4);
                    short += 1;
                }
                Err(other) => panic!("unexpected error: {other}"),
            }
        }

        assert_eq!((confirmed, short), (1, 1));
        assert_eq!(fx.available(&fx.product_a, &fx.store).await, 4);
    }
}
