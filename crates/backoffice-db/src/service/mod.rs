//! # Lifecycle Services
//!
//! The transactional operations of the order lifecycle.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  OrderLifecycleManager   create / add / remove / confirm / cancel      │
//! │          │                                                              │
//! │          │ confirm: one transaction                                     │
//! │          ├──► InventoryLedger::decrement  (per line)                    │
//! │          └──► sale::insert_sale (INVOICE) + items                       │
//! │                                                                         │
//! │  DeliveryDispatcher      create_delivery / update_delivery_status      │
//! │  ReturnProcessor         process_return                                │
//! │          └──► InventoryLedger::increment + sale::insert_sale (RETURN)   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Every mutating operation:
//! 1. asks the [`PermissionGate`](backoffice_core::PermissionGate),
//! 2. validates its input,
//! 3. opens a transaction whose first statement claims the row it mutates,
//! 4. commits everything or nothing.

pub mod delivery;
pub mod lifecycle;
pub mod returns;

use sqlx::pool::PoolConnection;
use sqlx::{Sqlite, SqlitePool, Transaction};

use backoffice_core::CoreResult;

use crate::error::DbError;

pub(crate) async fn begin(pool: &SqlitePool) -> CoreResult<Transaction<'static, Sqlite>> {
    Ok(pool.begin().await.map_err(DbError::from)?)
}

pub(crate) async fn commit(tx: Transaction<'static, Sqlite>) -> CoreResult<()> {
    tx.commit().await.map_err(DbError::from)?;
    Ok(())
}

pub(crate) async fn acquire(pool: &SqlitePool) -> CoreResult<PoolConnection<Sqlite>> {
    Ok(pool.acquire().await.map_err(DbError::from)?)
}
