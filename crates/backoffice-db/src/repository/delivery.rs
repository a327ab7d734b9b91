//! # Delivery Repository

use chrono::{DateTime, Utc};
use sqlx::SqliteConnection;
use tracing::debug;

use backoffice_core::{Delivery, DeliveryStatus};

use crate::error::DbResult;

const DELIVERY_COLUMNS: &str =
    "id, sale_id, location_id, employee_id, vendor_id, status, created_at, modified_at";

pub async fn insert_delivery(conn: &mut SqliteConnection, delivery: &Delivery) -> DbResult<()> {
    debug!(id = %delivery.id, sale_id = %delivery.sale_id, "Inserting delivery");

    sqlx::query(
        r#"
        INSERT INTO deliveries (
            id, sale_id, location_id, employee_id, vendor_id, status, created_at, modified_at
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
        "#,
    )
    .bind(&delivery.id)
    .bind(&delivery.sale_id)
    .bind(&delivery.location_id)
    .bind(&delivery.employee_id)
    .bind(&delivery.vendor_id)
    .bind(delivery.status)
    .bind(delivery.created_at)
    .bind(delivery.modified_at)
    .execute(&mut *conn)
    .await?;

    Ok(())
}

/// Takes the write lock on behalf of `delivery_id` without changing it.
pub async fn claim(conn: &mut SqliteConnection, delivery_id: &str) -> DbResult<bool> {
    let result = sqlx::query("UPDATE deliveries SET modified_at = modified_at WHERE id = ?1")
        .bind(delivery_id)
        .execute(&mut *conn)
        .await?;

    Ok(result.rows_affected() > 0)
}

pub async fn get_delivery(conn: &mut SqliteConnection, delivery_id: &str) -> DbResult<Option<Delivery>> {
    let delivery = sqlx::query_as::<_, Delivery>(&format!(
        "SELECT {DELIVERY_COLUMNS} FROM deliveries WHERE id = ?1"
    ))
    .bind(delivery_id)
    .fetch_optional(&mut *conn)
    .await?;

    Ok(delivery)
}

pub async fn get_for_sale(conn: &mut SqliteConnection, sale_id: &str) -> DbResult<Option<Delivery>> {
    let delivery = sqlx::query_as::<_, Delivery>(&format!(
        "SELECT {DELIVERY_COLUMNS} FROM deliveries WHERE sale_id = ?1"
    ))
    .bind(sale_id)
    .fetch_optional(&mut *conn)
    .await?;

    Ok(delivery)
}

pub async fn set_status(
    conn: &mut SqliteConnection,
    delivery_id: &str,
    status: DeliveryStatus,
    now: DateTime<Utc>,
) -> DbResult<()> {
    debug!(delivery_id, status = %status, "Updating delivery status");

    sqlx::query("UPDATE deliveries SET status = ?1, modified_at = ?2 WHERE id = ?3")
        .bind(status)
        .bind(now)
        .bind(delivery_id)
        .execute(&mut *conn)
        .await?;

    Ok(())
}
