//! # Inventory Ledger
//!
//! Stock per (product, location). Every function runs on the caller's
//! connection so stock changes commit or roll back together with the sale
//! that caused them.
//!
//! ## Non-Negative Stock
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  UPDATE inventory                                                       │
//! │     SET quantity = quantity - :qty                                      │
//! │   WHERE product_id = :p AND location_id = :l                            │
//! │     AND quantity >= :qty          ← check and write in one statement    │
//! │                                                                         │
//! │  rows_affected = 1  → decremented                                       │
//! │  rows_affected = 0  → InsufficientStock (nothing written)               │
//! │                                                                         │
//! │  Backed by CHECK (quantity >= 0) on the table.                          │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::{DateTime, Utc};
use sqlx::SqliteConnection;
use tracing::{debug, warn};

use backoffice_core::{CoreError, CoreResult, InventoryEntry, StockShortage, ValidationError};

use crate::error::{DbError, DbResult};

/// Stock operations on a caller-supplied connection or transaction.
pub struct InventoryLedger;

impl InventoryLedger {
    /// Quantity on hand; 0 when the product was never stocked there.
    pub async fn get_available(
        conn: &mut SqliteConnection,
        product_id: &str,
        location_id: &str,
    ) -> DbResult<i64> {
        let quantity: Option<i64> = sqlx::query_scalar(
            "SELECT quantity FROM inventory WHERE product_id = ?1 AND location_id = ?2",
        )
        .bind(product_id)
        .bind(location_id)
        .fetch_optional(&mut *conn)
        .await?;

        Ok(quantity.unwrap_or(0))
    }

    /// Full ledger row, if any.
    pub async fn get_entry(
        conn: &mut SqliteConnection,
        product_id: &str,
        location_id: &str,
    ) -> DbResult<Option<InventoryEntry>> {
        let entry = sqlx::query_as::<_, InventoryEntry>(
            r#"
            SELECT product_id, location_id, quantity, modified_at
            FROM inventory
            WHERE product_id = ?1 AND location_id = ?2
            "#,
        )
        .bind(product_id)
        .bind(location_id)
        .fetch_optional(&mut *conn)
        .await?;

        Ok(entry)
    }

    /// Subtracts `quantity`, failing without changes if stock is short.
    pub async fn decrement(
        conn: &mut SqliteConnection,
        product_id: &str,
        location_id: &str,
        quantity: i64,
        now: DateTime<Utc>,
    ) -> CoreResult<()> {
        ensure_positive(quantity)?;
        debug!(product_id, location_id, quantity, "Decrementing stock");

        let result = sqlx::query(
            r#"
            UPDATE inventory
            SET quantity = quantity - ?1, modified_at = ?2
            WHERE product_id = ?3 AND location_id = ?4 AND quantity >= ?1
            "#,
        )
        .bind(quantity)
        .bind(now)
        .bind(product_id)
        .bind(location_id)
        .execute(&mut *conn)
        .await
        .map_err(DbError::from)?;

        if result.rows_affected() == 0 {
            let available = Self::get_available(conn, product_id, location_id).await?;
            warn!(product_id, location_id, requested = quantity, available, "Insufficient stock");
            return Err(CoreError::InsufficientStock {
                shortages: vec![StockShortage {
                    product_id: product_id.to_string(),
                    requested: quantity,
                    available,
                }],
            });
        }

        Ok(())
    }

    /// Adds `quantity`, creating the ledger row if needed.
    pub async fn increment(
        conn: &mut SqliteConnection,
        product_id: &str,
        location_id: &str,
        quantity: i64,
        now: DateTime<Utc>,
    ) -> CoreResult<()> {
        ensure_positive(quantity)?;
        debug!(product_id, location_id, quantity, "Incrementing stock");

        sqlx::query(
            r#"
            INSERT INTO inventory (product_id, location_id, quantity, modified_at)
            VALUES (?1, ?2, ?3, ?4)
            ON CONFLICT(product_id, location_id) DO UPDATE SET
                quantity    = inventory.quantity + excluded.quantity,
                modified_at = excluded.modified_at
            "#,
        )
        .bind(product_id)
        .bind(location_id)
        .bind(quantity)
        .bind(now)
        .execute(&mut *conn)
        .await
        .map_err(DbError::from)?;

        Ok(())
    }

    /// Administrative stock count: sets the quantity outright.
    pub async fn set_quantity(
        conn: &mut SqliteConnection,
        product_id: &str,
        location_id: &str,
        quantity: i64,
        now: DateTime<Utc>,
    ) -> CoreResult<()> {
        if quantity < 0 {
            return Err(ValidationError::OutOfRange {
                field: "quantity".to_string(),
                min: 0,
                max: i64::MAX,
            }
            .into());
        }
        debug!(product_id, location_id, quantity, "Setting stock");

        sqlx::query(
            r#"
            INSERT INTO inventory (product_id, location_id, quantity, modified_at)
            VALUES (?1, ?2, ?3, ?4)
            ON CONFLICT(product_id, location_id) DO UPDATE SET
                quantity    = excluded.quantity,
                modified_at = excluded.modified_at
            "#,
        )
        .bind(product_id)
        .bind(location_id)
        .bind(quantity)
        .bind(now)
        .execute(&mut *conn)
        .await
        .map_err(DbError::from)?;

        Ok(())
    }
}

fn ensure_positive(quantity: i64) -> CoreResult<()> {
    if quantity <= 0 {
        return Err(ValidationError::MustBePositive {
            field: "quantity".to_string(),
        }
        .into());
    }
    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::Fixture;

    #[tokio::test]
    async fn test_unstocked_product_reads_zero() {
        let fx = Fixture::new().await;
        let mut conn = fx.db.pool().acquire().await.unwrap();

        let qty = InventoryLedger::get_available(&mut conn, &fx.product_a, &fx.store)
            .await
            .unwrap();
        assert_eq!(qty, 0);
        assert!(InventoryLedger::get_entry(&mut conn, &fx.product_a, &fx.store)
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn test_decrement_to_exactly_zero() {
        let fx = Fixture::new().await;
        fx.stock(&fx.product_a, &fx.store, 10).await;
        let mut conn = fx.db.pool().acquire().await.unwrap();

        InventoryLedger::decrement(&mut conn, &fx.product_a, &fx.store, 10, Utc::now())
            .await
            .unwrap();
        drop(conn);
        assert_eq!(fx.available(&fx.product_a, &fx.store).await, 0);
    }

    #[tokio::test]
    async fn test_decrement_past_zero_is_rejected_untouched() {
        let fx = Fixture::new().await;
        fx.stock(&fx.product_a, &fx.store, 3).await;
        let mut conn = fx.db.pool().acquire().await.unwrap();

        let err = InventoryLedger::decrement(&mut conn, &fx.product_a, &fx.store, 4, Utc::now())
            .await
            .unwrap_err();
        match err {
            CoreError::InsufficientStock { shortages } => {
                assert_eq!(shortages[0].requested, 4);
                assert_eq!(shortages[0].available, 3);
            }
            other => panic!("unexpected error: {other}"),
        }
        drop(conn);
        assert_eq!(fx.available(&fx.product_a, &fx.store).await, 3);
    }

    #[tokio::test]
    async fn test_increment_creates_row() {
        let fx = Fixture::new().await;
        let mut conn = fx.db.pool().acquire().await.unwrap();

        InventoryLedger::increment(&mut conn, &fx.product_b, &fx.warehouse, 2, Utc::now())
            .await
            .unwrap();
        InventoryLedger::increment(&mut conn, &fx.product_b, &fx.warehouse, 3, Utc::now())
            .await
            .unwrap();
        drop(conn);
        assert_eq!(fx.available(&fx.product_b, &fx.warehouse).await, 5);
    }

    #[tokio::test]
    async fn test_non_positive_quantities_rejected() {
        let fx = Fixture::new().await;
        let mut conn = fx.db.pool().acquire().await.unwrap();

        assert!(matches!(
            InventoryLedger::increment(&mut conn, &fx.product_a, &fx.store, 0, Utc::now()).await,
            Err(CoreError::Validation(_))
        ));
        assert!(matches!(
            InventoryLedger::decrement(&mut conn, &fx.product_a, &fx.store, -1, Utc::now()).await,
            Err(CoreError::Validation(_))
        ));
        assert!(matches!(
            InventoryLedger::set_quantity(&mut conn, &fx.product_a, &fx.store, -5, Utc::now()).await,
            Err(CoreError::Validation(_))
        ));
    }

    #[tokio::test]
    async fn test_check_constraint_backs_the_ledger() {
        let fx = Fixture::new().await;
        fx.stock(&fx.product_a, &fx.store, 1).await;

        let result = sqlx::query(
            "UPDATE inventory SET quantity = -1 WHERE product_id = ?1 AND location_id = ?2",
        )
        .bind(&fx.product_a)
        .bind(&fx.store)
        .execute(fx.db.pool())
        .await
        .map_err(DbError::from);

        assert!(matches!(result, Err(DbError::CheckViolation { .. })));
    }
}
