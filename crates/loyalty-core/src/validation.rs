//! # Validation Module
//!
//! Input validation for dashboard forms and the billing counter.
//!
//! ## Validation Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Validation Layers                                  │
//! │                                                                         │
//! │  Layer 1: Dashboard (TypeScript) - immediate form feedback              │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 2: THIS MODULE - range and format rules (InvalidInput)           │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 3: Ledger calculator - clamps anything that slipped through      │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 4: SQLite CHECK / UNIQUE / FOREIGN KEY constraints               │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust
//! use loyalty_core::validation::{validate_discount_bps, validate_purchase_cents};
//!
//! assert!(validate_purchase_cents(10_000).is_ok());
//! assert!(validate_discount_bps(10_001).is_err());
//! ```

use chrono::NaiveDate;

use crate::error::ValidationError;
use crate::money::Money;
use crate::types::BillItem;
use crate::{MAX_BILL_ITEMS, MAX_ITEM_QUANTITY, MAX_PURCHASE_CENTS};

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

// =============================================================================
// String Validators
// =============================================================================

/// Validates a required display name (business, tier, offer, customer).
///
/// Returns the trimmed value.
pub fn validate_name(field: &str, value: &str, max: usize) -> ValidationResult<String> {
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

    Ok(value.to_string())
}

/// Validates an email address.
///
/// ## Rules
/// - Required, at most 254 characters
/// - Exactly one `@` with a non-empty local part and a dotted domain
///
/// ## Example
/// ```rust
/// use loyalty_core::validation::validate_email;
///
/// assert!(validate_email("john.doe@email.com").is_ok());
/// assert!(validate_email("john.doe").is_err());
/// ```
pub fn validate_email(email: &str) -> ValidationResult<String> {
    let email = validate_name("email", email, 254)?;

    let invalid = |reason: &str| ValidationError::InvalidFormat {
        field: "email".to_string(),
        reason: reason.to_string(),
    };

    let (local, domain) = email
        .split_once('@')
        .ok_or_else(|| invalid("missing @"))?;

    if local.is_empty() || domain.contains('@') {
        return Err(invalid("must contain a single @ after a local part"));
    }

    if !domain.contains('.') || domain.starts_with('.') || domain.ends_with('.') {
        return Err(invalid("domain must contain a dot"));
    }

    if email.chars().any(char::is_whitespace) {
        return Err(invalid("must not contain spaces"));
    }

    Ok(email.to_lowercase())
}

/// Validates a search query. Empty is allowed (lists everything).
pub fn validate_search_query(query: &str) -> ValidationResult<String> {
    let query = query.trim();

    if query.len() > 100 {
        return Err(ValidationError::TooLong {
            field: "query".to_string(),
            max: 100,
        });
    }

    Ok(query.to_string())
}

// =============================================================================
// Numeric Validators
// =============================================================================

/// Validates a purchase amount in cents: zero up to `MAX_PURCHASE_CENTS`.
pub fn validate_purchase_cents(cents: i64) -> ValidationResult<()> {
    if cents < 0 {
        return Err(ValidationError::MustNotBeNegative {
            field: "purchase amount".to_string(),
        });
    }

    if cents > MAX_PURCHASE_CENTS {
        return Err(ValidationError::out_of_range("purchase amount", 0, MAX_PURCHASE_CENTS));
    }

    Ok(())
}

/// Validates a discount percentage in basis points (0% to 100%).
pub fn validate_discount_bps(bps: u32) -> ValidationResult<()> {
    if bps > 10_000 {
        return Err(ValidationError::out_of_range("discount_percentage", 0, 10_000));
    }

    Ok(())
}

/// Validates a bill line quantity.
///
/// ## Rules
/// - Must be positive (> 0)
/// - Must not exceed MAX_ITEM_QUANTITY (999)
pub fn validate_quantity(qty: i64) -> ValidationResult<()> {
    if qty <= 0 {
        return Err(ValidationError::MustBePositive {
            field: "quantity".to_string(),
        });
    }

    if qty > MAX_ITEM_QUANTITY {
        return Err(ValidationError::out_of_range("quantity", 1, MAX_ITEM_QUANTITY));
    }

    Ok(())
}

/// Validates the number of lines on a bill before adding one more.
pub fn validate_bill_size(current_items: usize) -> ValidationResult<()> {
    if current_items >= MAX_BILL_ITEMS {
        return Err(ValidationError::out_of_range(
            "bill items",
            0,
            MAX_BILL_ITEMS as i64,
        ));
    }

    Ok(())
}

/// Validates an itemised bill: line count, quantities, unit prices, and a
/// subtotal that stays within `MAX_PURCHASE_CENTS`.
pub fn validate_bill_items(items: &[BillItem]) -> ValidationResult<()> {
    if items.is_empty() {
        return Err(ValidationError::Required {
            field: "bill items".to_string(),
        });
    }
    validate_bill_size(items.len() - 1)?;

    let mut subtotal = Money::zero();
    for item in items {
        validate_name("item name", &item.name, 200)?;
        validate_quantity(item.quantity)?;
        if item.unit_price_cents < 0 {
            return Err(ValidationError::MustNotBeNegative {
                field: format!("price of {}", item.name.trim()),
            });
        }

        subtotal = Money::from_cents(item.unit_price_cents)
            .checked_multiply_quantity(item.quantity)
            .and_then(|line| subtotal.checked_add(line))
            .ok_or_else(|| ValidationError::out_of_range("bill subtotal", 0, MAX_PURCHASE_CENTS))?;
    }

    validate_purchase_cents(subtotal.cents()).map_err(|_| {
        ValidationError::out_of_range("bill subtotal", 0, MAX_PURCHASE_CENTS)
    })
}

// =============================================================================
// Date Validators
// =============================================================================

/// Validates an offer validity window (inclusive on both ends).
pub fn validate_offer_window(valid_from: NaiveDate, valid_until: NaiveDate) -> ValidationResult<()> {
    if valid_until < valid_from {
        return Err(ValidationError::InvalidFormat {
            field: "valid_until".to_string(),
            reason: format!("must not be before {}", valid_from),
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

    #[test]
    fn test_validate_name() {
        assert_eq!(validate_name("name", "  Gold  ", 50).unwrap(), "Gold");
        assert!(validate_name("name", "", 50).is_err());
        assert!(validate_name("name", "   ", 50).is_err());
        assert!(validate_name("name", &"A".repeat(51), 50).is_err());
    }

    #[test]
    fn test_validate_email() {
        assert_eq!(
            validate_email(" Jane.Smith@Email.com ").unwrap(),
            "jane.smith@email.com"
        );
        assert!(validate_email("").is_err());
        assert!(validate_email("@email.com").is_err());
        assert!(validate_email("jane@email").is_err());
        assert!(validate_email("jane@@email.com").is_err());
        assert!(validate_email("ja ne@email.com").is_err());
    }

    #[test]
    fn test_validate_purchase_cents() {
        assert!(validate_purchase_cents(0).is_ok());
        assert!(validate_purchase_cents(10_000).is_ok());
        assert!(validate_purchase_cents(-1).is_err());
        assert!(validate_purchase_cents(MAX_PURCHASE_CENTS).is_ok());
        assert!(matches!(
            validate_purchase_cents(1_000_000_000_000_000),
            Err(ValidationError::OutOfRange { .. })
        ));
    }

    #[test]
    fn test_validate_discount_bps() {
        assert!(validate_discount_bps(0).is_ok());
        assert!(validate_discount_bps(10_000).is_ok());
        assert!(validate_discount_bps(10_001).is_err());
    }

    #[test]
    fn test_validate_quantity() {
        assert!(validate_quantity(1).is_ok());
        assert!(validate_quantity(999).is_ok());
        assert!(validate_quantity(0).is_err());
        assert!(validate_quantity(-1).is_err());
        assert!(validate_quantity(1000).is_err());
    }

    #[test]
    fn test_validate_bill_size() {
        assert!(validate_bill_size(0).is_ok());
        assert!(validate_bill_size(MAX_BILL_ITEMS - 1).is_ok());
        assert!(validate_bill_size(MAX_BILL_ITEMS).is_err());
    }

    #[test]
    fn test_validate_offer_window() {
        let jan = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        let dec = NaiveDate::from_ymd_opt(2024, 12, 31).unwrap();
        assert!(validate_offer_window(jan, dec).is_ok());
        assert!(validate_offer_window(jan, jan).is_ok());
        assert!(validate_offer_window(dec, jan).is_err());
    }

    #[test]
    fn test_validate_bill_items() {
        let latte = BillItem::new("Latte", Money::from_cents(475), 2);
        assert!(validate_bill_items(&[latte.clone()]).is_ok());
        assert!(validate_bill_items(&[]).is_err());

        let too_many = vec![latte.clone(); MAX_BILL_ITEMS + 1];
        assert!(validate_bill_items(&too_many).is_err());
        assert!(validate_bill_items(&vec![latte; MAX_BILL_ITEMS]).is_ok());

        assert!(validate_bill_items(&[BillItem::new("Scone", Money::from_cents(350), 0)]).is_err());
        assert!(validate_bill_items(&[BillItem::new("Refund", Money::from_cents(-100), 1)]).is_err());
        assert!(validate_bill_items(&[BillItem::new(" ", Money::from_cents(100), 1)]).is_err());
    }

    #[test]
    fn test_bill_items_subtotal_ceiling() {
        let yacht = BillItem::new("Yacht", Money::from_cents(i64::MAX / 2), 3);
        assert!(matches!(
            validate_bill_items(&[yacht]),
            Err(ValidationError::OutOfRange { .. })
        ));

        let half = Money::from_cents(MAX_PURCHASE_CENTS / 2 + 1);
        let pair = [BillItem::new("Left", half, 1), BillItem::new("Right", half, 1)];
        assert!(matches!(
            validate_bill_items(&pair),
            Err(ValidationError::OutOfRange { .. })
        ));

        let at_ceiling = BillItem::new("Estate", Money::from_cents(MAX_PURCHASE_CENTS), 1);
        assert!(validate_bill_items(&[at_ceiling]).is_ok());
    }
}
