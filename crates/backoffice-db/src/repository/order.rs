//! # Sales Order Repository
//!
//! Draft order headers and lines.
//!
//! ## Row Claim
//! [`claim`] is the first statement of every transaction that mutates an
//! order. It is a write, so SQLite hands the transaction the database write
//! lock before anything is read; a concurrent transaction on the same
//! database waits (up to the busy timeout) instead of reading stale rows.

use chrono::{DateTime, Utc};
use sqlx::{QueryBuilder, Sqlite, SqliteConnection};
use tracing::debug;

use backoffice_core::{
    OrderHistoryEntry, OrderHistoryFilter, OrderStatus, OrderSummary, SalesOrder, SalesOrderItem,
};

use crate::error::DbResult;

/// Maximum rows returned by [`history`].
pub const HISTORY_LIMIT: i64 = 100;

const ORDER_COLUMNS: &str = "id, customer_id, employee_id, location_id, status, note, \
     delivery_phone, delivery_address, created_at, modified_at";

const ITEM_COLUMNS: &str = "id, order_id, product_id, quantity, unit_price_cents, \
     final_amount_cents, promotion_id, created_at";

// =============================================================================
// Header
// =============================================================================

pub async fn insert_order(conn: &mut SqliteConnection, order: &SalesOrder) -> DbResult<()> {
    debug!(id = %order.id, customer_id = %order.customer_id, "Inserting sales order");

    sqlx::query(
        r#"
        INSERT INTO sales_orders (
            id, customer_id, employee_id, location_id, status, note,
            delivery_phone, delivery_address, created_at, modified_at
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
        "#,
    )
    .bind(&order.id)
    .bind(&order.customer_id)
    .bind(&order.employee_id)
    .bind(&order.location_id)
    .bind(order.status)
    .bind(&order.note)
    .bind(&order.delivery_phone)
    .bind(&order.delivery_address)
    .bind(order.created_at)
    .bind(order.modified_at)
    .execute(&mut *conn)
    .await?;

    Ok(())
}

/// Touches the order to take the write lock. Returns false if it doesn't exist.
pub async fn claim(conn: &mut SqliteConnection, order_id: &str, now: DateTime<Utc>) -> DbResult<bool> {
    let result = sqlx::query("UPDATE sales_orders SET modified_at = ?1 WHERE id = ?2")
        .bind(now)
        .bind(order_id)
        .execute(&mut *conn)
        .await?;

    Ok(result.rows_affected() > 0)
}

pub async fn get_order(conn: &mut SqliteConnection, order_id: &str) -> DbResult<Option<SalesOrder>> {
    let order = sqlx::query_as::<_, SalesOrder>(&format!(
        "SELECT {ORDER_COLUMNS} FROM sales_orders WHERE id = ?1"
    ))
    .bind(order_id)
    .fetch_optional(&mut *conn)
    .await?;

    Ok(order)
}

pub async fn set_status(
    conn: &mut SqliteConnection,
    order_id: &str,
    status: OrderStatus,
    now: DateTime<Utc>,
) -> DbResult<()> {
    debug!(order_id, status = %status, "Updating order status");

    sqlx::query("UPDATE sales_orders SET status = ?1, modified_at = ?2 WHERE id = ?3")
        .bind(status)
        .bind(now)
        .bind(order_id)
        .execute(&mut *conn)
        .await?;

    Ok(())
}

// =============================================================================
// Lines
// =============================================================================

pub async fn get_items(conn: &mut SqliteConnection, order_id: &str) -> DbResult<Vec<SalesOrderItem>> {
    let items = sqlx::query_as::<_, SalesOrderItem>(&format!(
        "SELECT {ITEM_COLUMNS} FROM sales_order_items WHERE order_id = ?1 ORDER BY created_at, id"
    ))
    .bind(order_id)
    .fetch_all(&mut *conn)
    .await?;

    Ok(items)
}

pub async fn find_item(
    conn: &mut SqliteConnection,
    order_id: &str,
    product_id: &str,
) -> DbResult<Option<SalesOrderItem>> {
    let item = sqlx::query_as::<_, SalesOrderItem>(&format!(
        "SELECT {ITEM_COLUMNS} FROM sales_order_items WHERE order_id = ?1 AND product_id = ?2"
    ))
    .bind(order_id)
    .bind(product_id)
    .fetch_optional(&mut *conn)
    .await?;

    Ok(item)
}

pub async fn count_items(conn: &mut SqliteConnection, order_id: &str) -> DbResult<usize> {
    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM sales_order_items WHERE order_id = ?1")
        .bind(order_id)
        .fetch_one(&mut *conn)
        .await?;

    Ok(count as usize)
}

pub async fn insert_item(conn: &mut SqliteConnection, item: &SalesOrderItem) -> DbResult<()> {
    debug!(order_id = %item.order_id, product_id = %item.product_id, quantity = item.quantity, "Adding order item");

    sqlx::query(
        r#"
        INSERT INTO sales_order_items (
            id, order_id, product_id, quantity, unit_price_cents,
            final_amount_cents, promotion_id, created_at
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
        "#,
    )
    .bind(&item.id)
    .bind(&item.order_id)
    .bind(&item.product_id)
    .bind(item.quantity)
    .bind(item.unit_price_cents)
    .bind(item.final_amount_cents)
    .bind(&item.promotion_id)
    .bind(item.created_at)
    .execute(&mut *conn)
    .await?;

    Ok(())
}

/// Deletes a line. Returns false if the product was not on the order.
pub async fn delete_item(conn: &mut SqliteConnection, order_id: &str, product_id: &str) -> DbResult<bool> {
    debug!(order_id, product_id, "Removing order item");

    let result = sqlx::query("DELETE FROM sales_order_items WHERE order_id = ?1 AND product_id = ?2")
        .bind(order_id)
        .bind(product_id)
        .execute(&mut *conn)
        .await?;

    Ok(result.rows_affected() > 0)
}

// =============================================================================
// Listings
// =============================================================================

/// Open orders, oldest first.
pub async fn list_open(conn: &mut SqliteConnection) -> DbResult<Vec<OrderSummary>> {
    let rows = sqlx::query_as::<_, OrderSummary>(
        r#"
        SELECT o.id AS order_id,
               o.created_at,
               c.first_name || ' ' || c.last_name AS customer_name,
               l.name AS location_name,
               (SELECT COUNT(*) FROM sales_order_items i WHERE i.order_id = o.id) AS item_count,
               (SELECT COALESCE(SUM(i.final_amount_cents), 0)
                  FROM sales_order_items i WHERE i.order_id = o.id) AS total_amount_cents
        FROM sales_orders o
        JOIN customers c ON c.id = o.customer_id
        JOIN locations l ON l.id = o.location_id
        WHERE o.status = 'OPEN'
        ORDER BY o.created_at, o.id
        "#,
    )
    .fetch_all(&mut *conn)
    .await?;

    Ok(rows)
}

/// Orders of any status, newest first, joined with the invoice and the
/// delivery status where they exist.
pub async fn history(
    conn: &mut SqliteConnection,
    filter: &OrderHistoryFilter,
) -> DbResult<Vec<OrderHistoryEntry>> {
    let mut query: QueryBuilder<Sqlite> = QueryBuilder::new(
        r#"
        SELECT o.id AS order_id,
               o.created_at,
               c.first_name || ' ' || c.last_name AS customer_name,
               e.first_name || ' ' || e.last_name AS employee_name,
               l.name AS location_name,
               o.status,
               (SELECT COUNT(*) FROM sales_order_items i WHERE i.order_id = o.id) AS item_count,
               (SELECT COALESCE(SUM(i.final_amount_cents), 0)
                  FROM sales_order_items i WHERE i.order_id = o.id) AS total_amount_cents,
               s.id AS invoice_id,
               s.invoice_status,
               s.delivery_status
        FROM sales_orders o
        JOIN customers c ON c.id = o.customer_id
        JOIN employees e ON e.id = o.employee_id
        JOIN locations l ON l.id = o.location_id
        LEFT JOIN sales s ON s.order_id = o.id AND s.sale_type = 'INVOICE'
        WHERE 1 = 1
        "#,
    );

    if let Some(status) = filter.status {
        query.push(" AND o.status = ").push_bind(status);
    }
    if let Some(from) = filter.from {
        query.push(" AND o.created_at >= ").push_bind(from);
    }
    if let Some(to) = filter.to {
        query.push(" AND o.created_at <= ").push_bind(to);
    }
    query
        .push(" ORDER BY o.created_at DESC, o.id LIMIT ")
        .push_bind(HISTORY_LIMIT);

    let rows = query
        .build_query_as::<OrderHistoryEntry>()
        .fetch_all(&mut *conn)
        .await?;

    Ok(rows)
}
