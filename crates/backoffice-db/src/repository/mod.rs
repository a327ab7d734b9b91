//! # Repository Module
//!
//! SQL for every table, one module per aggregate.
//!
//! ## Connection Passing
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Every repository function takes `&mut SqliteConnection`:              │
//! │                                                                         │
//! │  let mut tx = pool.begin().await?;                                     │
//! │  order::claim(&mut tx, id, now).await?;        ─┐                      │
//! │  InventoryLedger::decrement(&mut tx, ..).await?; │ same transaction    │
//! │  sale::insert_sale(&mut tx, &invoice).await?;  ─┘                      │
//! │  tx.commit().await?;                                                   │
//! │                                                                         │
//! │  let mut conn = pool.acquire().await?;         (read-only queries)     │
//! │  order::list_open(&mut conn).await?;                                   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! A transaction and a pooled connection both deref to `SqliteConnection`,
//! so the same function serves reads and transactional writes.
//!
//! ## Available Repositories
//!
//! - [`customer`] - Customer upsert by phone
//! - [`reference`] - Employees, locations, products, payment methods,
//!   vendors, promotions
//! - [`inventory`] - [`InventoryLedger`](inventory::InventoryLedger)
//! - [`order`] - Draft orders and their lines
//! - [`sale`] - Invoices, returns and their items
//! - [`delivery`] - Deliveries

pub mod customer;
pub mod delivery;
pub mod inventory;
pub mod order;
pub mod reference;
pub mod sale;

/// Generates a new UUID v4 identifier.
pub fn new_id() -> String {
    uuid::Uuid::new_v4().to_string()
}
