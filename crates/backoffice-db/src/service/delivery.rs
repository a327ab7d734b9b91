//! # Delivery Dispatcher
//!
//! One delivery per invoice, carried by an internal delivery employee or an
//! external vendor.
//!
//! ```text
//! CREATED ──► PACKED ──► SHIPPED ──► DELIVERED
//!    │           │           │
//!    └───────────┴───────────┴──────► FAILED
//! ```
//!
//! Only the carrier may report progress: the vendor when one is recorded,
//! otherwise the delivery employee. Every status change is mirrored on the
//! sale's `delivery_status`.

use std::sync::Arc;

use chrono::Utc;
use sqlx::{SqliteConnection, SqlitePool};
use tracing::{info, warn};

use backoffice_core::lifecycle::{check_delivery_transition, ensure_deliverable};
use backoffice_core::{
    Actor, Carrier, CoreError, CoreResult, Delivery, DeliveryStatus, EmployeeRole, NewDelivery,
    PendingDelivery, Permission, PermissionGate, ValidationError,
};

use crate::repository::{delivery, new_id, reference, sale};
use crate::service::{acquire, begin, commit};

#[derive(Clone)]
pub struct DeliveryDispatcher {
    pool: SqlitePool,
    gate: Arc<dyn PermissionGate>,
}

impl DeliveryDispatcher {
    pub fn new(pool: SqlitePool, gate: Arc<dyn PermissionGate>) -> Self {
        DeliveryDispatcher { pool, gate }
    }

    /// Opens the delivery of a paid invoice.
    ///
    /// ## Errors
    /// - `NotFound` for an unknown sale
    /// - `InvalidState` for a return, or an invoice not yet paid/confirmed
    /// - `DuplicateDelivery` if the sale already has one
    /// - `Validation` for an unknown location or vendor, or an employee who
    ///   is missing, inactive or not on the delivery team
    pub async fn create_delivery(&self, actor: &Actor, request: NewDelivery) -> CoreResult<Delivery> {
        self.gate.require(actor, Permission::DeliveryCreate)?;

        let now = Utc::now();
        let mut tx = begin(&self.pool).await?;

        if !sale::claim(&mut tx, &request.sale_id).await? {
            return Err(CoreError::not_found("Sale", &request.sale_id));
        }
        let invoice = sale::get_sale(&mut tx, &request.sale_id)
            .await?
            .ok_or_else(|| CoreError::not_found("Sale", &request.sale_id))?;
        ensure_deliverable(&invoice)?;

        if let Some(existing) = delivery::get_for_sale(&mut tx, &request.sale_id).await? {
            warn!(sale_id = %request.sale_id, delivery_id = %existing.id, "Sale already has a delivery");
            return Err(CoreError::DuplicateDelivery {
                sale_id: request.sale_id,
                delivery_id: existing.id,
            });
        }

        check_references(&mut tx, &request).await?;

        let created = Delivery {
            id: new_id(),
            sale_id: request.sale_id,
            location_id: request.origin_location_id,
            employee_id: request.employee_id,
            vendor_id: request.vendor_id,
            status: DeliveryStatus::Created,
            created_at: now,
            modified_at: now,
        };
        delivery::insert_delivery(&mut tx, &created).await?;
        sale::set_delivery_status(&mut tx, &created.sale_id, created.status, now).await?;

        commit(tx).await?;

        info!(
            delivery_id = %created.id,
            sale_id = %created.sale_id,
            carrier = ?created.carrier(),
            user = %actor.user_id,
            "Delivery created"
        );
        Ok(created)
    }

    /// Records a progress report from `reporter`.
    pub async fn update_delivery_status(
        &self,
        actor: &Actor,
        delivery_id: &str,
        reporter: &Carrier,
        status: DeliveryStatus,
    ) -> CoreResult<Delivery> {
        self.gate.require(actor, Permission::DeliveryUpdate)?;

        let now = Utc::now();
        let mut tx = begin(&self.pool).await?;

        if !delivery::claim(&mut tx, delivery_id).await? {
            return Err(CoreError::not_found("Delivery", delivery_id));
        }
        let mut current = delivery::get_delivery(&mut tx, delivery_id)
            .await?
            .ok_or_else(|| CoreError::not_found("Delivery", delivery_id))?;

        let previous = current.status;
        let next = match check_delivery_transition(&current, reporter, status) {
            Ok(next) => next,
            Err(e) => {
                warn!(delivery_id, from = %previous, to = %status, error = %e, "Delivery update rejected");
                return Err(e);
            }
        };

        delivery::set_status(&mut tx, delivery_id, next, now).await?;
        sale::set_delivery_status(&mut tx, &current.sale_id, next, now).await?;
        commit(tx).await?;

        info!(delivery_id, from = %previous, to = %next, "Delivery status updated");

        current.status = next;
        current.modified_at = now;
        Ok(current)
    }

    pub async fn get_delivery(&self, actor: &Actor, delivery_id: &str) -> CoreResult<Delivery> {
        self.gate.require(actor, Permission::OrderView)?;

        let mut conn = acquire(&self.pool).await?;
        delivery::get_delivery(&mut conn, delivery_id)
            .await?
            .ok_or_else(|| CoreError::not_found("Delivery", delivery_id))
    }

    /// The delivery of `sale_id`, if one was created.
    pub async fn delivery_for_sale(&self, actor: &Actor, sale_id: &str) -> CoreResult<Option<Delivery>> {
        self.gate.require(actor, Permission::OrderView)?;

        let mut conn = acquire(&self.pool).await?;
        Ok(delivery::get_for_sale(&mut conn, sale_id).await?)
    }

    /// Paid invoices nobody has dispatched yet, oldest first.
    pub async fn invoices_awaiting_delivery(&self, actor: &Actor) -> CoreResult<Vec<PendingDelivery>> {
        self.gate.require(actor, Permission::OrderView)?;

        let mut conn = acquire(&self.pool).await?;
        Ok(sale::awaiting_delivery(&mut conn).await?)
    }
}

async fn check_references(conn: &mut SqliteConnection, request: &NewDelivery) -> CoreResult<()> {
    if reference::get_location(conn, &request.origin_location_id).await?.is_none() {
        return Err(ValidationError::invalid_reference(
            "origin_location_id",
            &request.origin_location_id,
            "does not exist",
        )
        .into());
    }

    match reference::get_employee(conn, &request.employee_id).await? {
        None => {
            return Err(ValidationError::invalid_reference("employee_id", &request.employee_id, "does not exist").into())
        }
        Some(e) if !e.is_active() => {
            return Err(ValidationError::invalid_reference("employee_id", &request.employee_id, "is inactive").into())
        }
        Some(e) if e.role != EmployeeRole::Delivery => {
            return Err(ValidationError::invalid_reference(
                "employee_id",
                &request.employee_id,
                "is not a delivery employee",
            )
            .into())
        }
        Some(_) => {}
    }

    if let Some(vendor_id) = request.vendor_id.as_deref() {
        if reference::get_vendor(conn, vendor_id).await?.is_none() {
            return Err(ValidationError::invalid_reference("vendor_id", vendor_id, "does not exist").into());
        }
    }

    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================
