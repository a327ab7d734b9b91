//! # Validation Module
//!
//! Input validation for lifecycle commands.
//!
//! ## Validation Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Validation Layers                                  │
//! │                                                                         │
//! │  Layer 1: Caller (UI / API, outside this workspace)                    │
//! │  └── Form checks, immediate feedback                                   │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 2: Lifecycle services (Rust)                                    │
//! │  ├── THIS MODULE: field formats and limits                             │
//! │  └── Reference checks (employee active, location open, ...)            │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 3: Database (SQLite)                                            │
//! │  ├── CHECK (quantity >= 0) on inventory                                │
//! │  ├── UNIQUE (order_id, product_id), UNIQUE deliveries(sale_id)         │
//! │  └── Foreign key constraints                                           │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust
//! use backoffice_core::validation::{validate_phone, validate_quantity};
//!
//! assert!(validate_phone("0912 345 678").is_ok());
//! assert!(validate_quantity(5, 999).is_ok());
//! ```

use crate::error::ValidationError;
use crate::types::{CustomerDetails, DeliveryContact, Product, Promotion};
use crate::{MAX_UNIT_PRICE_CENTS, MIN_PHONE_DIGITS};

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

// =============================================================================
// String Validators
// =============================================================================

fn require_text(field: &str, value: &str, max: usize) -> ValidationResult<()> {
    let value = value.trim();

    if value.is_empty() {
        return Err(ValidationError::Required {
            field: field.to_string(),
        });
    }

    if value.chars().count() > max {
        return Err(ValidationError::TooLong {
            field: field.to_string(),
            max,
        });
    }

    Ok(())
}

/// Validates a phone number.
///
/// ## Rules
/// - Digits, spaces, hyphens, parentheses and a leading `+` only
/// - At least 10 digits, at most 15
///
/// ## Example
/// ```rust
/// use backoffice_core::validation::validate_phone;
///
/// assert!(validate_phone("+84 912-345-678").is_ok());
/// assert!(validate_phone("12345").is_err());
/// assert!(validate_phone("09123x5678").is_err());
/// ```
pub fn validate_phone(phone: &str) -> ValidationResult<()> {
    let phone = phone.trim();

    if phone.is_empty() {
        return Err(ValidationError::Required {
            field: "phone".to_string(),
        });
    }

    let allowed = phone.char_indices().all(|(i, c)| {
        c.is_ascii_digit() || matches!(c, ' ' | '-' | '(' | ')') || (c == '+' && i == 0)
    });
    if !allowed {
        return Err(ValidationError::InvalidFormat {
            field: "phone".to_string(),
            reason: "must contain only digits, spaces, hyphens and parentheses".to_string(),
        });
    }

    let digits = phone.chars().filter(char::is_ascii_digit).count();
    if digits < MIN_PHONE_DIGITS {
        return Err(ValidationError::TooShort {
            field: "phone".to_string(),
            min: MIN_PHONE_DIGITS,
        });
    }
    if digits > 15 {
        return Err(ValidationError::TooLong {
            field: "phone".to_string(),
            max: 15,
        });
    }

    Ok(())
}

/// Validates a first or last name. Max 100 characters.
pub fn validate_person_name(field: &str, name: &str) -> ValidationResult<()> {
    require_text(field, name, 100)
}

/// Validates a postal address. Max 500 characters.
pub fn validate_address(field: &str, address: &str) -> ValidationResult<()> {
    require_text(field, address, 500)
}

/// Validates an optional email.
///
/// Only shape is checked: one `@` with text on both sides and a dot in the
/// domain.
pub fn validate_email(email: Option<&str>) -> ValidationResult<()> {
    let Some(email) = email.map(str::trim).filter(|e| !e.is_empty()) else {
        return Ok(());
    };

    let valid = match email.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && !domain.contains('@')
                && domain.contains('.')
                && !domain.starts_with('.')
                && !domain.ends_with('.')
        }
        None => false,
    };

    if !valid {
        return Err(ValidationError::InvalidFormat {
            field: "email".to_string(),
            reason: "must look like name@example.com".to_string(),
        });
    }

    Ok(())
}

/// Validates a free-text order note. Optional, max 1000 characters.
pub fn validate_note(note: Option<&str>) -> ValidationResult<()> {
    match note {
        Some(note) if note.chars().count() > 1000 => Err(ValidationError::TooLong {
            field: "note".to_string(),
            max: 1000,
        }),
        _ => Ok(()),
    }
}

/// Validates a SKU.
///
/// ## Rules
/// - 1 to 50 characters
/// - Letters, numbers, hyphens and underscores only
///
/// ## Example
/// ```rust
/// use backoffice_core::validation::validate_sku;
///
/// assert!(validate_sku("TSHIRT-M-BLK").is_ok());
/// assert!(validate_sku("has space").is_err());
/// ```
pub fn validate_sku(sku: &str) -> ValidationResult<()> {
    require_text("sku", sku, 50)?;

    if !sku
        .trim()
        .chars()
        .all(|c| c.is_alphanumeric() || c == '-' || c == '_')
    {
        return Err(ValidationError::InvalidFormat {
            field: "sku".to_string(),
            reason: "must contain only letters, numbers, hyphens, and underscores".to_string(),
        });
    }

    Ok(())
}

/// Validates a product name. Max 200 characters.
pub fn validate_product_name(name: &str) -> ValidationResult<()> {
    require_text("name", name, 200)
}

// =============================================================================
// Composite Validators
// =============================================================================

/// Validates customer details captured at order time.
pub fn validate_customer_details(details: &CustomerDetails) -> ValidationResult<()> {
    validate_phone(&details.phone)?;
    validate_person_name("first_name", &details.first_name)?;
    validate_person_name("last_name", &details.last_name)?;
    validate_email(details.email.as_deref())?;
    validate_address("address", &details.address)
}

/// Validates the delivery contact snapshot.
pub fn validate_delivery_contact(contact: &DeliveryContact) -> ValidationResult<()> {
    validate_phone(&contact.phone)?;
    validate_address("delivery_address", &contact.address)
}

/// Validates a catalog product before it is stored.
pub fn validate_product(product: &Product) -> ValidationResult<()> {
    validate_sku(&product.sku)?;
    validate_product_name(&product.name)?;
    validate_amount_cents("unit_price", product.unit_price_cents)
}

/// Validates a promotion before it is stored.
///
/// ## Rules
/// - Code: 1 to 50 characters
/// - Percentage within 0..=10000 basis points
/// - Fixed value within the price range
/// - A campaign window may not end before it starts
pub fn validate_promotion(promotion: &Promotion) -> ValidationResult<()> {
    require_text("code", &promotion.code, 50)?;

    if let Some(bps) = promotion.discount_percent_bps {
        validate_discount_bps(bps)?;
    }
    if let Some(value) = promotion.discount_value_cents {
        validate_amount_cents("discount_value", value)?;
    }

    if let (Some(start), Some(end)) = (promotion.start_date, promotion.end_date) {
        if end < start {
            return Err(ValidationError::InvalidFormat {
                field: "end_date".to_string(),
                reason: "must not be before start_date".to_string(),
            });
        }
    }

    Ok(())
}

// =============================================================================
// Numeric Validators
// =============================================================================

/// Validates a line quantity against the configured maximum.
///
/// ## Rules
/// - Must be positive (> 0)
/// - Must not exceed `max` (999 by default)
pub fn validate_quantity(qty: i64, max: i64) -> ValidationResult<()> {
    if qty <= 0 {
        return Err(ValidationError::MustBePositive {
            field: "quantity".to_string(),
        });
    }

    if qty > max {
        return Err(ValidationError::OutOfRange {
            field: "quantity".to_string(),
            min: 1,
            max,
        });
    }

    Ok(())
}

/// Validates an amount in minor units.
///
/// ## Rules
/// - Zero is allowed
/// - At most [`MAX_UNIT_PRICE_CENTS`]
pub fn validate_amount_cents(field: &str, cents: i64) -> ValidationResult<()> {
    if !(0..=MAX_UNIT_PRICE_CENTS).contains(&cents) {
        return Err(ValidationError::OutOfRange {
            field: field.to_string(),
            min: 0,
            max: MAX_UNIT_PRICE_CENTS,
        });
    }

    Ok(())
}

/// Validates a percentage discount in basis points (0..=10000).
pub fn validate_discount_bps(bps: i64) -> ValidationResult<()> {
    if !(0..=10000).contains(&bps) {
        return Err(ValidationError::OutOfRange {
            field: "discount_percent".to_string(),
            min: 0,
            max: 10000,
        });
    }

    Ok(())
}

// =============================================================================
// Collection Validators
// =============================================================================

/// Checks that one more line fits on an order that has `current_items`.
pub fn validate_order_size(current_items: usize, max: usize) -> ValidationResult<()> {
    if current_items >= max {
        return Err(ValidationError::LimitReached {
            field: "order items".to_string(),
            max,
        });
    }

    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ActiveStatus;
    use chrono::NaiveDate;

    fn details() -> CustomerDetails {
        CustomerDetails {
            phone: "0912345678".to_string(),
            first_name: "Linh".to_string(),
            last_name: "Tran".to_string(),
            email: Some("linh@example.com".to_string()),
            address: "12 Hang Bac, Hanoi".to_string(),
        }
    }

    #[test]
    fn test_validate_phone() {
        assert!(validate_phone("0912345678").is_ok());
        assert!(validate_phone("(091) 234-5678").is_ok());
        assert!(validate_phone("+84912345678").is_ok());

        assert!(validate_phone("").is_err());
        assert!(validate_phone("091234567").is_err());
        assert!(validate_phone("09+12345678").is_err());
        assert!(validate_phone("1234567890123456").is_err());
    }

    #[test]
    fn test_validate_email() {
        assert!(validate_email(None).is_ok());
        assert!(validate_email(Some("")).is_ok());
        assert!(validate_email(Some("a@b.co")).is_ok());

        assert!(validate_email(Some("no-at-sign")).is_err());
        assert!(validate_email(Some("@example.com")).is_err());
        assert!(validate_email(Some("a@localhost")).is_err());
        assert!(validate_email(Some("a@b@c.com")).is_err());
    }

    #[test]
    fn test_validate_customer_details() {
        assert!(validate_customer_details(&details()).is_ok());

        let mut missing_name = details();
        missing_name.last_name = "  ".to_string();
        let err = validate_customer_details(&missing_name).unwrap_err();
        assert_eq!(err.to_string(), "last_name is required");
    }

    #[test]
    fn test_validate_delivery_contact() {
        let contact = DeliveryContact::from_customer(&details());
        assert!(validate_delivery_contact(&contact).is_ok());

        let blank = DeliveryContact {
            phone: "0912345678".to_string(),
            address: String::new(),
        };
        assert!(validate_delivery_contact(&blank).is_err());
    }

    #[test]
    fn test_validate_quantity() {
        assert!(validate_quantity(1, 999).is_ok());
        assert!(validate_quantity(999, 999).is_ok());

        assert!(validate_quantity(0, 999).is_err());
        assert!(validate_quantity(-1, 999).is_err());
        assert!(validate_quantity(1000, 999).is_err());
    }

    #[test]
    fn test_validate_order_size() {
        assert!(validate_order_size(0, 100).is_ok());
        assert!(validate_order_size(99, 100).is_ok());
        assert!(validate_order_size(100, 100).is_err());
    }

    #[test]
    fn test_validate_sku() {
        assert!(validate_sku("TSHIRT-M-BLK").is_ok());
        assert!(validate_sku("product_1").is_ok());
        assert!(validate_sku("").is_err());
        assert!(validate_sku(&"A".repeat(51)).is_err());
    }

    #[test]
    fn test_validate_discount_bps() {
        assert!(validate_discount_bps(0).is_ok());
        assert!(validate_discount_bps(10000).is_ok());
        assert!(validate_discount_bps(-1).is_err());
        assert!(validate_discount_bps(10001).is_err());
    }

    #[test]
    fn test_validate_amount_cents() {
        assert!(validate_amount_cents("unit_price", 0).is_ok());
        assert!(validate_amount_cents("unit_price", MAX_UNIT_PRICE_CENTS).is_ok());
        assert!(validate_amount_cents("unit_price", -1).is_err());
        assert!(validate_amount_cents("unit_price", MAX_UNIT_PRICE_CENTS + 1).is_err());
    }

    #[test]
    fn test_validate_product() {
        let mut product = Product {
            id: "p-1".to_string(),
            sku: "KIT-MUG-S".to_string(),
            name: "Mug (S)".to_string(),
            unit_price_cents: 50_000,
            status: ActiveStatus::Active,
        };
        assert!(validate_product(&product).is_ok());

        product.unit_price_cents = -100;
        let err = validate_product(&product).unwrap_err();
        assert!(matches!(err, ValidationError::OutOfRange { ref field, .. } if field == "unit_price"));

        product.unit_price_cents = i64::MAX;
        assert!(validate_product(&product).is_err());

        product.unit_price_cents = 100;
        product.sku = "has space".to_string();
        assert!(validate_product(&product).is_err());
    }

    #[test]
    fn test_validate_promotion() {
        let mut promotion = Promotion {
            id: "promo-1".to_string(),
            code: "MEMBER10".to_string(),
            discount_percent_bps: Some(1000),
            discount_value_cents: None,
            status: ActiveStatus::Active,
            campaign_name: None,
            start_date: NaiveDate::from_ymd_opt(2026, 3, 1),
            end_date: NaiveDate::from_ymd_opt(2026, 3, 31),
        };
        assert!(validate_promotion(&promotion).is_ok());

        promotion.discount_percent_bps = Some(12_000);
        assert!(validate_promotion(&promotion).is_err());

        promotion.discount_percent_bps = None;
        promotion.discount_value_cents = Some(-5);
        assert!(validate_promotion(&promotion).is_err());

        promotion.discount_value_cents = Some(5_000);
        promotion.end_date = NaiveDate::from_ymd_opt(2026, 2, 1);
        let err = validate_promotion(&promotion).unwrap_err();
        assert!(matches!(err, ValidationError::InvalidFormat { ref field, .. } if field == "end_date"));
    }
}
