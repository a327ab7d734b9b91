//! # Return Processor
//!
//! Partial or full returns against an invoice item.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  process_return(sale, product, qty)                                    │
//! │                                                                         │
//! │  BEGIN                                                                  │
//! │   ├── claim original invoice      ← serialises returns on one invoice  │
//! │   ├── window / item / references                                       │
//! │   ├── already + qty > sold?       → ExcessiveReturn                    │
//! │   ├── refund = prorate(amount, sold, already, qty)                     │
//! │   ├── insert RETURN (REFUNDED) + item → original item                   │
//! │   └── stock += qty at the return location                              │
//! │  COMMIT                                                                 │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Refunds are prorated on the cumulative quantity, so successive partial
//! returns add up to exactly the invoiced amount.

use std::sync::Arc;

use chrono::Utc;
use sqlx::SqlitePool;
use tracing::{info, warn};

use backoffice_core::lifecycle::ensure_returnable;
use backoffice_core::pricing::prorate_refund;
use backoffice_core::{
    Actor, CoreError, CoreResult, InvoiceStatus, Permission, PermissionGate, ReturnReceipt,
    ReturnRequest, Sale, SaleDetail, SaleItem, SaleType, ValidationError,
};

use crate::config::OrderSettings;
use crate::repository::inventory::InventoryLedger;
use crate::repository::{new_id, reference, sale};
use crate::service::{acquire, begin, commit};

#[derive(Clone)]
pub struct ReturnProcessor {
    pool: SqlitePool,
    gate: Arc<dyn PermissionGate>,
    settings: OrderSettings,
}

impl ReturnProcessor {
    pub fn new(pool: SqlitePool, gate: Arc<dyn PermissionGate>, settings: OrderSettings) -> Self {
        ReturnProcessor { pool, gate, settings }
    }

    /// Records a return, refunds its prorated share and restocks the
    /// return location.
    pub async fn process_return(&self, actor: &Actor, request: ReturnRequest) -> CoreResult<ReturnReceipt> {
        self.gate.require(actor, Permission::ReturnProcess)?;

        if request.quantity <= 0 {
            return Err(ValidationError::MustBePositive {
                field: "quantity".to_string(),
            }
            .into());
        }

        let now = Utc::now();
        let mut tx = begin(&self.pool).await?;

        if !sale::claim(&mut tx, &request.original_sale_id).await? {
            return Err(CoreError::not_found("Sale", &request.original_sale_id));
        }
        let original = sale::get_sale(&mut tx, &request.original_sale_id)
            .await?
            .ok_or_else(|| CoreError::not_found("Sale", &request.original_sale_id))?;
        ensure_returnable(&original, now, self.settings.return_window_days)?;

        let item = sale::find_item(&mut tx, &original.id, &request.product_id)
            .await?
            .ok_or_else(|| {
                CoreError::not_found("Sale item", format!("{}/{}", original.id, request.product_id))
            })?;

        if reference::get_payment_method(&mut tx, &request.refund_payment_method_id)
            .await?
            .is_none()
        {
            return Err(ValidationError::invalid_reference(
                "refund_payment_method_id",
                &request.refund_payment_method_id,
                "does not exist",
            )
            .into());
        }
        if reference::get_location(&mut tx, &request.return_location_id).await?.is_none() {
            return Err(ValidationError::invalid_reference(
                "return_location_id",
                &request.return_location_id,
                "does not exist",
            )
            .into());
        }

        let already_returned = sale::returned_quantity(&mut tx, &item.id).await?;
        if request.quantity + already_returned > item.quantity {
            warn!(
                sale_id = %original.id,
                product_id = %request.product_id,
                requested = request.quantity,
                sold = item.quantity,
                already_returned,
                "Return exceeds remaining quantity"
            );
            return Err(CoreError::ExcessiveReturn {
                sale_id: original.id,
                product_id: request.product_id,
                requested: request.quantity,
                sold: item.quantity,
                already_returned,
            });
        }

        let refund = prorate_refund(item.final_amount(), item.quantity, already_returned, request.quantity);

        let return_sale = Sale {
            id: new_id(),
            sale_type: SaleType::Return,
            order_id: None,
            original_sale_id: Some(original.id.clone()),
            location_id: request.return_location_id.clone(),
            payment_method_id: request.refund_payment_method_id.clone(),
            invoice_status: InvoiceStatus::Refunded,
            delivery_status: None,
            total_amount_cents: refund.cents(),
            sale_date: now,
            modified_at: now,
        };
        sale::insert_sale(&mut tx, &return_sale).await?;

        let return_item = SaleItem {
            id: new_id(),
            sale_id: return_sale.id.clone(),
            product_id: request.product_id.clone(),
            quantity: request.quantity,
            final_amount_cents: refund.cents(),
            original_sale_item_id: Some(item.id.clone()),
        };
        sale::insert_item(&mut tx, &return_item).await?;

        InventoryLedger::increment(
            &mut tx,
            &request.product_id,
            &request.return_location_id,
            request.quantity,
            now,
        )
        .await?;

        commit(tx).await?;

        info!(
            return_id = %return_sale.id,
            sale_id = %original.id,
            product_id = %request.product_id,
            quantity = request.quantity,
            refund = %refund,
            user = %actor.user_id,
            "Return processed"
        );

        Ok(ReturnReceipt {
            return_sale,
            item: return_item,
            refund,
            remaining_returnable: item.quantity - already_returned - request.quantity,
        })
    }

    /// Units of `product_id` on `sale_id` not yet returned.
    pub async fn returnable_quantity(&self, actor: &Actor, sale_id: &str, product_id: &str) -> CoreResult<i64> {
        self.gate.require(actor, Permission::OrderView)?;

        let mut conn = acquire(&self.pool).await?;
        let item = sale::find_item(&mut conn, sale_id, product_id)
            .await?
            .ok_or_else(|| CoreError::not_found("Sale item", format!("{}/{}", sale_id, product_id)))?;
        let returned = sale::returned_quantity(&mut conn, &item.id).await?;

        Ok(item.quantity - returned)
    }

    /// Every return recorded against `sale_id`, oldest first.
    pub async fn returns_for(&self, actor: &Actor, sale_id: &str) -> CoreResult<Vec<SaleDetail>> {
        self.gate.require(actor, Permission::OrderView)?;

        let mut conn = acquire(&self.pool).await?;
        let returns = sale::returns_for(&mut conn, sale_id).await?;

        let mut details = Vec::with_capacity(returns.len());
        for found in returns {
            let items = sale::get_items(&mut conn, &found.id).await?;
            details.push(SaleDetail { sale: found, items });
        }
        Ok(details)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
