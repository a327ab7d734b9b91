//! # Database Error Types
//!
//! Error types for database operations.
//!
//! ## Error Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Error Propagation                                    │
//! │                                                                         │
//! │  SQLite Error (sqlx::Error)                                            │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  DbError (this module) ← Adds context and categorization               │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  CoreError ← What lifecycle services return                            │
//! │       │       (Busy / PoolExhausted become retryable Concurrency)      │
//! │       ▼                                                                 │
//! │  ErrorPayload (API layer) ← Serialized for the caller                  │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use backoffice_core::CoreError;
use thiserror::Error;

/// Database operation errors.
///
/// These errors wrap sqlx errors and provide additional context
/// for debugging and user feedback.
#[derive(Debug, Error)]
pub enum DbError {
    /// Entity not found in database.
    #[error("{entity} not found: {id}")]
    NotFound { entity: String, id: String },

    /// Unique constraint violation.
    ///
    /// ## When This Occurs
    /// - Second invoice for the same order
    /// - Second delivery for the same sale
    /// - Same product twice on one order
    #[error("Duplicate {field}: '{value}' already exists")]
    UniqueViolation { field: String, value: String },

    /// Foreign key constraint violation.
    #[error("Foreign key violation: {message}")]
    ForeignKeyViolation { message: String },

    /// CHECK constraint violation (e.g. negative stock).
    #[error("Check constraint violation: {message}")]
    CheckViolation { message: String },

    /// The database stayed locked for longer than the busy timeout.
    ///
    /// ## When This Occurs
    /// - Another connection holds the write lock (a confirmation or a
    ///   return in progress) past `busy_timeout`
    #[error("Database busy: {0}")]
    Busy(String),

    /// Database connection failed.
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    /// Migration failed.
    #[error("Migration failed: {0}")]
    MigrationFailed(String),

    /// Query execution failed.
    #[error("Query failed: {0}")]
    QueryFailed(String),

    /// Pool exhausted (all connections in use).
    #[error("Connection pool exhausted")]
    PoolExhausted,

    /// Internal database error.
    #[error("Internal database error: {0}")]
    Internal(String),
}

impl DbError {
    /// Creates a NotFound error for a given entity type and ID.
    pub fn not_found(entity: impl Into<String>, id: impl Into<String>) -> Self {
        DbError::NotFound {
            entity: entity.into(),
            id: id.into(),
        }
    }

    /// True for lock and pool timeouts.
    pub fn is_busy(&self) -> bool {
        matches!(self, DbError::Busy(_) | DbError::PoolExhausted)
    }
}

/// SQLite primary and extended result codes for a locked database:
/// SQLITE_BUSY (5), SQLITE_LOCKED (6), and their extended forms.
const BUSY_CODES: [&str; 5] = ["5", "6", "261", "262", "517"];

/// Convert sqlx errors to DbError.
///
/// ## Error Mapping
/// ```text
/// sqlx::Error::RowNotFound    → DbError::NotFound
/// sqlx::Error::Database       → Busy / Unique / ForeignKey / Check / QueryFailed
/// sqlx::Error::PoolTimedOut   → DbError::PoolExhausted
/// Other                       → DbError::Internal
/// ```
impl From<sqlx::Error> for DbError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => DbError::NotFound {
                entity: "Record".to_string(),
                id: "unknown".to_string(),
            },

            sqlx::Error::Database(db_err) => {
                let msg = db_err.message();
                let busy_code = db_err
                    .code()
                    .map_or(false, |code| BUSY_CODES.contains(&&*code));

                if busy_code
                    || msg.contains("database is locked")
                    || msg.contains("database table is locked")
                {
                    DbError::Busy(msg.to_string())
                } else if let Some(field) = msg.strip_prefix("UNIQUE constraint failed: ") {
                    DbError::UniqueViolation {
                        field: field.to_string(),
                        value: "unknown".to_string(),
                    }
                } else if msg.contains("FOREIGN KEY constraint failed") {
                    DbError::ForeignKeyViolation {
                        message: msg.to_string(),
                    }
                } else if msg.contains("CHECK constraint failed") {
                    DbError::CheckViolation {
                        message: msg.to_string(),
                    }
                } else {
                    DbError::QueryFailed(msg.to_string())
                }
            }

            sqlx::Error::PoolTimedOut => DbError::PoolExhausted,

            sqlx::Error::PoolClosed => DbError::ConnectionFailed("Pool is closed".to_string()),

            _ => DbError::Internal(err.to_string()),
        }
    }
}

impl From<sqlx::migrate::MigrateError> for DbError {
    fn from(err: sqlx::migrate::MigrateError) -> Self {
        DbError::MigrationFailed(err.to_string())
    }
}

/// Lifecycle services return [`CoreError`]; storage failures land here.
///
/// Constraint violations that the services check explicitly beforehand
/// (duplicate item, duplicate delivery, second invoice) only reach this
/// path on a race, and surface as storage errors with the constraint name.
impl From<DbError> for CoreError {
    fn from(err: DbError) -> Self {
        match err {
            DbError::NotFound { entity, id } => CoreError::NotFound { entity, id },
            DbError::Busy(msg) => CoreError::Concurrency(msg),
            DbError::PoolExhausted => CoreError::Concurrency("connection pool exhausted".to_string()),
            other => CoreError::Storage(other.to_string()),
        }
    }
}

/// Result type for database operations.
pub type DbResult<T> = Result<T, DbError>;

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_busy_maps_to_retryable_concurrency() {
        let core: CoreError = DbError::Busy("database is locked".to_string()).into();
        assert!(core.is_retryable());

        let core: CoreError = DbError::PoolExhausted.into();
        assert!(core.is_retryable());
    }

    #[test]
    fn test_not_found_keeps_context() {
        let core: CoreError = DbError::not_found("Sale", "s-1").into();
        assert_eq!(core.to_string(), "Sale not found: s-1");
    }

    #[test]
    fn test_other_errors_are_storage() {
        let core: CoreError = DbError::CheckViolation {
            message: "CHECK constraint failed: quantity >= 0".to_string(),
        }
        .into();
        assert!(matches!(core, CoreError::Storage(_)));
        assert!(!core.is_retryable());
    }

    #[test]
    fn test_row_not_found() {
        let err: DbError = sqlx::Error::RowNotFound.into();
        assert!(matches!(err, DbError::NotFound { .. }));
        let err: DbError = sqlx::Error::PoolTimedOut.into();
        assert!(err.is_busy());
    }
}
