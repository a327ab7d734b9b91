//! # backoffice-db: Persistence and Lifecycle Services
//!
//! SQLite storage for the retail back office and the transactional
//! services that move a sale from draft order to invoice, delivery and
//! return.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Back Office Data Flow                              │
//! │                                                                         │
//! │  Host application (API, admin UI, batch job)                           │
//! │       │ actor + request                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                   backoffice-db (THIS CRATE)                    │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────────┐    ┌───────────────┐    ┌──────────────┐  │   │
//! │  │   │   Services    │    │  Repositories │    │  Migrations  │  │   │
//! │  │   │ (service/)    │───►│ (repository/) │    │  (embedded)  │  │   │
//! │  │   │               │    │               │    │              │  │   │
//! │  │   │ OrderLifecycle│    │ order, sale   │    │ 001_initial  │  │   │
//! │  │   │ Delivery      │    │ delivery      │    │ _schema.sql  │  │   │
//! │  │   │ Returns       │    │ InventoryLedger│   │              │  │   │
//! │  │   └───────────────┘    └───────────────┘    └──────────────┘  │   │
//! │  │          │ rules, pricing, errors                               │   │
//! │  │          ▼                                                      │   │
//! │  │   backoffice-core                                               │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                     SQLite Database (WAL)                       │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Organization
//!
//! - [`config`] - `backoffice.toml` + environment overrides
//! - [`pool`] - Connection pool creation and configuration
//! - [`migrations`] - Embedded database migrations
//! - [`error`] - Database error types
//! - [`repository`] - SQL per table, on a caller-supplied connection
//! - [`service`] - Order lifecycle, deliveries, returns
//! - [`retry`] - Backoff retry of lock conflicts
//!
//! ## Usage
//!
//! ```rust,ignore
//! use backoffice_db::{BackofficeConfig, Database};
//!
//! let config = BackofficeConfig::load_or_default(None);
//! let db = Database::new(config.db_config()).await?
//!     .with_order_settings(config.orders.clone());
//!
//! let order = db.orders().create_order(&actor, new_order).await?;
//! db.orders().add_item(&actor, &order.order.id, &product_id, 2, None).await?;
//! let invoice = db.orders().confirm_order(&actor, &order.order.id, &cash_id).await?;
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod config;
pub mod error;
pub mod migrations;
pub mod pool;
pub mod repository;
pub mod retry;
pub mod service;

#[cfg(test)]
pub(crate) mod testing;

// =============================================================================
// Re-exports
// =============================================================================

pub use config::{BackofficeConfig, ConfigError, DatabaseSettings, OrderSettings, RetrySettings};
pub use error::{DbError, DbResult};
pub use pool::{Database, DbConfig};
pub use repository::inventory::InventoryLedger;
pub use retry::{retry_on_conflict, RetryPolicy};

// Service re-exports for convenience
pub use service::delivery::DeliveryDispatcher;
pub use service::lifecycle::OrderLifecycleManager;
pub use service::returns::ReturnProcessor;

/// Default filter when `RUST_LOG` is unset.
pub const DEFAULT_LOG_FILTER: &str = "info,backoffice=debug,sqlx=warn";

/// Installs the global `tracing` subscriber for the binaries.
///
/// `RUST_LOG` overrides [`DEFAULT_LOG_FILTER`].
pub fn init_tracing() {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));

    tracing_subscriber::fmt().with_env_filter(filter).init();
}
