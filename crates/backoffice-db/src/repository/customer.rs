//! # Customer Repository
//!
//! Customers are matched by phone number. Creating an order for a known
//! phone corrects the stored name, address and (if given) email.

use chrono::{DateTime, Utc};
use sqlx::SqliteConnection;
use tracing::debug;

use backoffice_core::{Customer, CustomerDetails};

use crate::error::DbResult;
use crate::repository::new_id;

const CUSTOMER_COLUMNS: &str =
    "id, first_name, last_name, phone, email, address, created_at, modified_at";

/// Inserts the customer or updates the one with the same phone.
///
/// A missing email keeps the stored one.
pub async fn upsert_by_phone(
    conn: &mut SqliteConnection,
    details: &CustomerDetails,
    now: DateTime<Utc>,
) -> DbResult<Customer> {
    let phone = details.phone.trim();
    let email = details
        .email
        .as_deref()
        .map(str::trim)
        .filter(|e| !e.is_empty());

    debug!(phone = %phone, "Upserting customer");

    let customer = sqlx::query_as::<_, Customer>(&format!(
        r#"
        INSERT INTO customers (
            id, first_name, last_name, phone, email, address, created_at, modified_at
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?7)
        ON CONFLICT(phone) DO UPDATE SET
            first_name  = excluded.first_name,
            last_name   = excluded.last_name,
            email       = COALESCE(excluded.email, customers.email),
            address     = excluded.address,
            modified_at = excluded.modified_at
        RETURNING {CUSTOMER_COLUMNS}
        "#
    ))
    .bind(new_id())
    .bind(details.first_name.trim())
    .bind(details.last_name.trim())
    .bind(phone)
    .bind(email)
    .bind(details.address.trim())
    .bind(now)
    .fetch_one(&mut *conn)
    .await?;

    Ok(customer)
}

/// Gets a customer by phone.
pub async fn get_by_phone(conn: &mut SqliteConnection, phone: &str) -> DbResult<Option<Customer>> {
    let customer = sqlx::query_as::<_, Customer>(&format!(
        "SELECT {CUSTOMER_COLUMNS} FROM customers WHERE phone = ?1"
    ))
    .bind(phone.trim())
    .fetch_optional(&mut *conn)
    .await?;

    Ok(customer)
}

// =============================================================================
// Unit Tests
// =============================================================================
