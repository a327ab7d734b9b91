//! # Error Types
//!
//! Domain error taxonomy for the order lifecycle.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                     │
//! │                                                                         │
//! │  backoffice-core errors (this file)                                    │
//! │  ├── CoreError        - Everything a lifecycle operation can return    │
//! │  └── ValidationError  - Input validation failures                      │
//! │                                                                         │
//! │  backoffice-db errors (separate crate)                                 │
//! │  └── DbError          - Database failures, converted into CoreError    │
//! │                                                                         │
//! │  API layer (outside this workspace)                                    │
//! │  └── ErrorPayload     - { code, message } as the caller sees it        │
//! │                                                                         │
//! │  Flow: ValidationError → CoreError ← DbError ; CoreError → ErrorPayload │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Retry Semantics
//! | Category      | Variants                                   | Retry?        |
//! |---------------|--------------------------------------------|---------------|
//! | Validation    | Validation                                 | no            |
//! | NotFound      | NotFound                                   | no            |
//! | InvalidState  | InvalidState                               | re-fetch      |
//! | BusinessRule  | InsufficientStock, ExcessiveReturn         | adjust input  |
//! | Idempotency   | DuplicateItem, DuplicateDelivery, AlreadyConfirmed | check state |
//! | Concurrency   | Concurrency                                | yes, bounded  |
//! | Permission    | PermissionDenied                           | no            |
//! | Internal      | Storage                                    | no            |

use serde::Serialize;
use thiserror::Error;

// =============================================================================
// Core Error
// =============================================================================

/// One product that could not be covered by stock at confirmation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StockShortage {
    pub product_id: String,
    pub requested: i64,
    pub available: i64,
}

/// Errors returned by lifecycle operations.
///
/// Every operation that returns one of these has rolled back all of its
/// changes.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Bad input or a reference to something missing/inactive.
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    /// The addressed entity does not exist.
    #[error("{entity} not found: {id}")]
    NotFound { entity: String, id: String },

    /// The operation is not legal for the entity's current state.
    ///
    /// ## When This Occurs
    /// - Adding items to a CONFIRMED or CANCELLED order
    /// - Creating a delivery for a RETURN sale
    /// - Moving a DELIVERED delivery back to SHIPPED
    #[error("{entity} {id} is {current}, cannot {action}")]
    InvalidState {
        entity: String,
        id: String,
        current: String,
        action: String,
    },

    /// One or more products lack stock at the order's location.
    ///
    /// ## User Workflow
    /// ```text
    /// ConfirmOrder
    ///      │
    ///      ▼
    /// check every line: P1 needs 6, has 4 / P2 needs 2, has 0
    ///      │
    ///      ▼
    /// InsufficientStock { shortages: [P1, P2] }   (nothing changed)
    ///      │
    ///      ▼
    /// caller adjusts quantities and confirms again
    /// ```
    #[error("Insufficient stock for {} product(s): {}", shortages.len(), describe_shortages(shortages))]
    InsufficientStock { shortages: Vec<StockShortage> },

    /// Return quantity exceeds what is left to return on the invoice.
    #[error(
        "Cannot return {requested} of {product_id} on sale {sale_id}: sold {sold}, already returned {already_returned}"
    )]
    ExcessiveReturn {
        sale_id: String,
        product_id: String,
        requested: i64,
        sold: i64,
        already_returned: i64,
    },

    /// The product is already a line on the order.
    #[error("Product {product_id} is already on order {order_id}")]
    DuplicateItem { order_id: String, product_id: String },

    /// The sale already has a delivery.
    #[error("Sale {sale_id} already has delivery {delivery_id}")]
    DuplicateDelivery { sale_id: String, delivery_id: String },

    /// The order was confirmed before; `sale_id` is its invoice.
    #[error("Order {order_id} is already confirmed as sale {sale_id}")]
    AlreadyConfirmed { order_id: String, sale_id: String },

    /// Lock timeout or busy database. Safe to retry from scratch.
    #[error("Concurrent update conflict: {0}")]
    Concurrency(String),

    #[error("Permission denied: {permission}")]
    PermissionDenied { permission: String },

    /// Unexpected storage failure.
    #[error("Storage error: {0}")]
    Storage(String),
}

fn describe_shortages(shortages: &[StockShortage]) -> String {
    shortages
        .iter()
        .map(|s| format!("{} (requested {}, available {})", s.product_id, s.requested, s.available))
        .collect::<Vec<_>>()
        .join(", ")
}

/// Coarse grouping of [`CoreError`] used for retry and display decisions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCategory {
    Validation,
    NotFound,
    InvalidState,
    BusinessRule,
    Idempotency,
    Concurrency,
    Permission,
    Internal,
}

impl CoreError {
    /// Shorthand for [`CoreError::NotFound`].
    pub fn not_found(entity: &str, id: impl Into<String>) -> Self {
        CoreError::NotFound {
            entity: entity.to_string(),
            id: id.into(),
        }
    }

    /// Shorthand for [`CoreError::InvalidState`].
    pub fn invalid_state(
        entity: &str,
        id: impl Into<String>,
        current: impl ToString,
        action: &str,
    ) -> Self {
        CoreError::InvalidState {
            entity: entity.to_string(),
            id: id.into(),
            current: current.to_string(),
            action: action.to_string(),
        }
    }

    pub fn category(&self) -> ErrorCategory {
        match self {
            CoreError::Validation(_) => ErrorCategory::Validation,
            CoreError::NotFound { .. } => ErrorCategory::NotFound,
            CoreError::InvalidState { .. } => ErrorCategory::InvalidState,
            CoreError::InsufficientStock { .. } | CoreError::ExcessiveReturn { .. } => {
                ErrorCategory::BusinessRule
            }
            CoreError::DuplicateItem { .. }
            | CoreError::DuplicateDelivery { .. }
            | CoreError::AlreadyConfirmed { .. } => ErrorCategory::Idempotency,
            CoreError::Concurrency(_) => ErrorCategory::Concurrency,
            CoreError::PermissionDenied { .. } => ErrorCategory::Permission,
            CoreError::Storage(_) => ErrorCategory::Internal,
        }
    }

    /// Only lock conflicts are worth retrying automatically.
    #[inline]
    pub fn is_retryable(&self) -> bool {
        matches!(self, CoreError::Concurrency(_))
    }

    /// Machine-readable code for the API layer.
    pub fn code(&self) -> &'static str {
        match self {
            CoreError::Validation(_) => "VALIDATION_ERROR",
            CoreError::NotFound { .. } => "NOT_FOUND",
            CoreError::InvalidState { .. } => "INVALID_STATE",
            CoreError::InsufficientStock { .. } => "INSUFFICIENT_STOCK",
            CoreError::ExcessiveReturn { .. } => "EXCESSIVE_RETURN",
            CoreError::DuplicateItem { .. } => "DUPLICATE_ITEM",
            CoreError::DuplicateDelivery { .. } => "DUPLICATE_DELIVERY",
            CoreError::AlreadyConfirmed { .. } => "ALREADY_CONFIRMED",
            CoreError::Concurrency(_) => "CONCURRENCY",
            CoreError::PermissionDenied { .. } => "PERMISSION_DENIED",
            CoreError::Storage(_) => "INTERNAL",
        }
    }
}

// =============================================================================
// Error Payload
// =============================================================================

/// Serializable error for the API layer.
///
/// ## JSON Shape
/// ```json
/// {
///   "code": "INSUFFICIENT_STOCK",
///   "message": "Insufficient stock for 1 product(s): ...",
///   "retryable": false
/// }
/// ```
#[derive(Debug, Clone, Serialize)]
pub struct ErrorPayload {
    pub code: &'static str,
    pub message: String,
    pub retryable: bool,
    /// Per-product detail for stock rejections.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub shortages: Vec<StockShortage>,
}

impl From<&CoreError> for ErrorPayload {
    fn from(err: &CoreError) -> Self {
        let shortages = match err {
            CoreError::InsufficientStock { shortages } => shortages.clone(),
            _ => Vec::new(),
        };
        ErrorPayload {
            code: err.code(),
            message: err.to_string(),
            retryable: err.is_retryable(),
            shortages,
        }
    }
}

// =============================================================================
// Validation Error
// =============================================================================

/// Input validation errors.
///
/// Raised before any state is touched.
#[derive(Debug, Error)]
pub enum ValidationError {
    /// A required field is missing or empty.
    #[error("{field} is required")]
    Required { field: String },

    /// Field value is too short.
    #[error("{field} must be at least {min} characters")]
    TooShort { field: String, min: usize },

    /// Field value is too long.
    #[error("{field} must be at most {max} characters")]
    TooLong { field: String, max: usize },

    /// Numeric value is out of range.
    #[error("{field} must be between {min} and {max}")]
    OutOfRange { field: String, min: i64, max: i64 },

    /// Value must be positive.
    #[error("{field} must be positive")]
    MustBePositive { field: String },

    /// Invalid format (e.g., invalid UUID, bad phone number).
    #[error("{field} has invalid format: {reason}")]
    InvalidFormat { field: String, reason: String },

    /// A referenced row is missing or unusable (inactive, closed, wrong role).
    #[error("{field} '{id}' is not usable: {reason}")]
    InvalidReference {
        field: String,
        id: String,
        reason: String,
    },

    /// A collection reached its size limit.
    #[error("{field} cannot have more than {max} entries")]
    LimitReached { field: String, max: usize },
}

impl ValidationError {
    /// Shorthand for [`ValidationError::InvalidReference`].
    pub fn invalid_reference(field: &str, id: impl Into<String>, reason: &str) -> Self {
        ValidationError::InvalidReference {
            field: field.to_string(),
            id: id.into(),
            reason: reason.to_string(),
        }
    }
}

// =============================================================================
// Result Type Alias
// =============================================================================

/// Convenience type alias for Results with CoreError.
pub type CoreResult<T> = Result<T, CoreError>;

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insufficient_stock_lists_every_product() {
        let err = CoreError::InsufficientStock {
            shortages: vec![
                StockShortage {
                    product_id: "P1".to_string(),
                    requested: 6,
                    available: 4,
                },
                StockShortage {
                    product_id: "P2".to_string(),
                    requested: 2,
                    available: 0,
                },
            ],
        };
        assert_eq!(
            err.to_string(),
            "Insufficient stock for 2 product(s): P1 (requested 6, available 4), P2 (requested 2, available 0)"
        );
        assert_eq!(err.category(), ErrorCategory::BusinessRule);
    }

    #[test]
    fn test_only_concurrency_is_retryable() {
        assert!(CoreError::Concurrency("database is locked".to_string()).is_retryable());
        assert!(!CoreError::not_found("Sale", "s-1").is_retryable());
        assert!(!CoreError::AlreadyConfirmed {
            order_id: "o-1".to_string(),
            sale_id: "s-1".to_string(),
        }
        .is_retryable());
    }

    #[test]
    fn test_categories() {
        let dup = CoreError::DuplicateDelivery {
            sale_id: "s".to_string(),
            delivery_id: "d".to_string(),
        };
        assert_eq!(dup.category(), ErrorCategory::Idempotency);

        let state = CoreError::invalid_state("Order", "o-1", "CONFIRMED", "add items");
        assert_eq!(state.category(), ErrorCategory::InvalidState);
        assert_eq!(state.to_string(), "Order o-1 is CONFIRMED, cannot add items");
    }

    #[test]
    fn test_validation_converts_to_core_error() {
        let validation_err = ValidationError::Required {
            field: "phone".to_string(),
        };
        let core_err: CoreError = validation_err.into();
        assert!(matches!(core_err, CoreError::Validation(_)));
        assert_eq!(core_err.code(), "VALIDATION_ERROR");
    }

    #[test]
    fn test_payload_serialization() {
        let err = CoreError::InsufficientStock {
            shortages: vec![StockShortage {
                product_id: "P".to_string(),
                requested: 6,
                available: 4,
            }],
        };
        let payload = ErrorPayload::from(&err);
        let json = serde_json::to_value(&payload).unwrap();
        assert_eq!(json["code"], "INSUFFICIENT_STOCK");
        assert_eq!(json["retryable"], false);
        assert_eq!(json["shortages"][0]["available"], 4);

        let plain = ErrorPayload::from(&CoreError::Storage("disk".to_string()));
        let json = serde_json::to_value(&plain).unwrap();
        assert!(json.get("shortages").is_none());
    }
}
