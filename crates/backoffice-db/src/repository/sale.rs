//! # Sale Repository
//!
//! Invoices, returns and their items.
//!
//! ## Sale Lifecycle
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                       Sale Lifecycle                                    │
//! │                                                                         │
//! │  1. INVOICE (confirm_order)                                            │
//! │     └── insert_sale(INVOICE, PAID) + insert_item() per order line      │
//! │                                                                         │
//! │  2. DELIVERY (create_delivery / update_delivery_status)                │
//! │     └── set_delivery_status() mirrors the delivery's status            │
//! │                                                                         │
//! │  3. RETURN (process_return), any number until fully returned           │
//! │     └── insert_sale(RETURN, REFUNDED, original_sale_id)                │
//! │     └── insert_item(original_sale_item_id)                             │
//! │                                                                         │
//! │  Amounts and quantities are immutable snapshots.                       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::{DateTime, Utc};
use sqlx::SqliteConnection;
use tracing::debug;

use backoffice_core::{DeliveryStatus, PendingDelivery, Sale, SaleItem};

use crate::error::DbResult;

const SALE_COLUMNS: &str = "id, sale_type, order_id, original_sale_id, location_id, \
     payment_method_id, invoice_status, delivery_status, total_amount_cents, sale_date, modified_at";

const ITEM_COLUMNS: &str =
    "id, sale_id, product_id, quantity, final_amount_cents, original_sale_item_id";

// =============================================================================
// Sales
// =============================================================================

pub async fn insert_sale(conn: &mut SqliteConnection, sale: &Sale) -> DbResult<()> {
    debug!(id = %sale.id, sale_type = %sale.sale_type, total = sale.total_amount_cents, "Inserting sale");

    sqlx::query(
        r#"
        INSERT INTO sales (
            id, sale_type, order_id, original_sale_id, location_id,
            payment_method_id, invoice_status, delivery_status,
            total_amount_cents, sale_date, modified_at
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)
        "#,
    )
    .bind(&sale.id)
    .bind(sale.sale_type)
    .bind(&sale.order_id)
    .bind(&sale.original_sale_id)
    .bind(&sale.location_id)
    .bind(&sale.payment_method_id)
    .bind(sale.invoice_status)
    .bind(sale.delivery_status)
    .bind(sale.total_amount_cents)
    .bind(sale.sale_date)
    .bind(sale.modified_at)
    .execute(&mut *conn)
    .await?;

    Ok(())
}

/// Takes the write lock on behalf of `sale_id` without changing it.
/// Returns false if the sale doesn't exist.
pub async fn claim(conn: &mut SqliteConnection, sale_id: &str) -> DbResult<bool> {
    let result = sqlx::query("UPDATE sales SET modified_at = modified_at WHERE id = ?1")
        .bind(sale_id)
        .execute(&mut *conn)
        .await?;

    Ok(result.rows_affected() > 0)
}

pub async fn get_sale(conn: &mut SqliteConnection, sale_id: &str) -> DbResult<Option<Sale>> {
    let sale = sqlx::query_as::<_, Sale>(&format!("SELECT {SALE_COLUMNS} FROM sales WHERE id = ?1"))
        .bind(sale_id)
        .fetch_optional(&mut *conn)
        .await?;

    Ok(sale)
}

/// The invoice created from `order_id`, if the order was confirmed.
pub async fn invoice_for_order(conn: &mut SqliteConnection, order_id: &str) -> DbResult<Option<Sale>> {
    let sale = sqlx::query_as::<_, Sale>(&format!(
        "SELECT {SALE_COLUMNS} FROM sales WHERE order_id = ?1 AND sale_type = 'INVOICE'"
    ))
    .bind(order_id)
    .fetch_optional(&mut *conn)
    .await?;

    Ok(sale)
}

/// RETURN sales against `sale_id`, oldest first.
pub async fn returns_for(conn: &mut SqliteConnection, sale_id: &str) -> DbResult<Vec<Sale>> {
    let sales = sqlx::query_as::<_, Sale>(&format!(
        "SELECT {SALE_COLUMNS} FROM sales \
         WHERE original_sale_id = ?1 AND sale_type = 'RETURN' \
         ORDER BY sale_date, id"
    ))
    .bind(sale_id)
    .fetch_all(&mut *conn)
    .await?;

    Ok(sales)
}

pub async fn set_delivery_status(
    conn: &mut SqliteConnection,
    sale_id: &str,
    status: DeliveryStatus,
    now: DateTime<Utc>,
) -> DbResult<()> {
    debug!(sale_id, status = %status, "Propagating delivery status to sale");

    sqlx::query("UPDATE sales SET delivery_status = ?1, modified_at = ?2 WHERE id = ?3")
        .bind(status)
        .bind(now)
        .bind(sale_id)
        .execute(&mut *conn)
        .await?;

    Ok(())
}

/// Paid or confirmed invoices with no delivery yet, oldest first.
pub async fn awaiting_delivery(conn: &mut SqliteConnection) -> DbResult<Vec<PendingDelivery>> {
    let rows = sqlx::query_as::<_, PendingDelivery>(
        r#"
        SELECT s.id AS sale_id,
               s.sale_date,
               c.first_name || ' ' || c.last_name AS customer_name,
               o.delivery_phone,
               o.delivery_address,
               s.location_id,
               l.name AS location_name,
               s.total_amount_cents
        FROM sales s
        JOIN sales_orders o ON o.id = s.order_id
        JOIN customers c ON c.id = o.customer_id
        JOIN locations l ON l.id = s.location_id
        LEFT JOIN deliveries d ON d.sale_id = s.id
        WHERE s.sale_type = 'INVOICE'
          AND s.invoice_status IN ('PAID', 'CONFIRMED')
          AND d.id IS NULL
        ORDER BY s.sale_date, s.id
        "#,
    )
    .fetch_all(&mut *conn)
    .await?;

    Ok(rows)
}

// =============================================================================
// Sale Items
// =============================================================================

pub async fn insert_item(conn: &mut SqliteConnection, item: &SaleItem) -> DbResult<()> {
    sqlx::query(
        r#"
        INSERT INTO sales_items (
            id, sale_id, product_id, quantity, final_amount_cents, original_sale_item_id
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6)
        "#,
    )
    .bind(&item.id)
    .bind(&item.sale_id)
    .bind(&item.product_id)
    .bind(item.quantity)
    .bind(item.final_amount_cents)
    .bind(&item.original_sale_item_id)
    .execute(&mut *conn)
    .await?;

    Ok(())
}

pub async fn get_items(conn: &mut SqliteConnection, sale_id: &str) -> DbResult<Vec<SaleItem>> {
    let items = sqlx::query_as::<_, SaleItem>(&format!(
        "SELECT {ITEM_COLUMNS} FROM sales_items WHERE sale_id = ?1 ORDER BY rowid"
    ))
    .bind(sale_id)
    .fetch_all(&mut *conn)
    .await?;

    Ok(items)
}

/// The item for `product_id` on `sale_id`.
pub async fn find_item(
    conn: &mut SqliteConnection,
    sale_id: &str,
    product_id: &str,
) -> DbResult<Option<SaleItem>> {
    let item = sqlx::query_as::<_, SaleItem>(&format!(
        "SELECT {ITEM_COLUMNS} FROM sales_items WHERE sale_id = ?1 AND product_id = ?2"
    ))
    .bind(sale_id)
    .bind(product_id)
    .fetch_optional(&mut *conn)
    .await?;

    Ok(item)
}

/// Quantity already returned against an invoice item.
pub async fn returned_quantity(conn: &mut SqliteConnection, original_item_id: &str) -> DbResult<i64> {
    let quantity: i64 = sqlx::query_scalar(
        r#"
        SELECT COALESCE(SUM(ri.quantity), 0)
        FROM sales_items ri
        JOIN sales rs ON rs.id = ri.sale_id
        WHERE ri.original_sale_item_id = ?1 AND rs.sale_type = 'RETURN'
        "#,
    )
    .bind(original_item_id)
    .fetch_one(&mut *conn)
    .await?;

    Ok(quantity)
}
