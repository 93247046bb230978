//! # Error Types
//!
//! Domain-specific error types for loyalty-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                     │
//! │                                                                         │
//! │  loyalty-core errors (this file)                                        │
//! │  ├── CoreError           - General domain errors                        │
//! │  ├── ValidationError     - Input validation failures (InvalidInput)     │
//! │  ├── RedemptionRejected  - Redemption precondition failed               │
//! │  └── OfferRejected       - Offer not applicable to this purchase        │
//! │                                                                         │
//! │  loyalty-db errors (separate crate)                                     │
//! │  └── DbError             - Database operation failures                  │
//! │                                                                         │
//! │  Flow: ValidationError → CoreError → DbError → dashboard toast          │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! `RedemptionRejected` is an ordinary value: the calculator returns it
//! inside a bill breakdown so the counter screen can show a corrective
//! message while the rest of the bill stays valid.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use ts_rs::TS;

use crate::money::Money;

// =============================================================================
// Core Error
// =============================================================================

/// Domain rule failures, wrapped by `DbError::Core` in the storage layer.
///
/// Missing rows are a storage concern and surface as `DbError::NotFound`.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Points redemption precondition failed.
    #[error("Redemption rejected: {0}")]
    Redemption(#[from] RedemptionRejected),

    /// Offer cannot be applied to this purchase.
    #[error("Offer rejected: {0}")]
    Offer(#[from] OfferRejected),

    /// Validation error (wraps ValidationError).
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
}

// =============================================================================
// Redemption Rejected
// =============================================================================

/// Why a points redemption was refused.
///
/// ## User Workflow
/// ```text
/// Balance: 650 pts, minimum: 500 pts
///      │
///      ├── redeem 0    → no redemption (not a rejection)
///      ├── redeem 400  → BelowMinimum { requested: 400, minimum: 500 }
///      ├── redeem 500  → accepted (threshold is inclusive)
///      └── redeem 700  → ExceedsBalance { requested: 700, balance: 650 }
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum RedemptionRejected {
    #[error("minimum redeemable points is {minimum}, requested {requested}")]
    BelowMinimum { requested: u64, minimum: u64 },

    #[error("requested {requested} points but only {balance} available")]
    ExceedsBalance { requested: u64, balance: u64 },
}

// =============================================================================
// Offer Rejected
// =============================================================================

/// Why an offer cannot be applied.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum OfferRejected {
    #[error("offer is not active")]
    Inactive,

    #[error("offer starts on {starts}")]
    NotYetValid {
        #[ts(as = "String")]
        starts: NaiveDate,
    },

    #[error("offer expired on {ended}")]
    Expired {
        #[ts(as = "String")]
        ended: NaiveDate,
    },

    #[error("minimum purchase is {minimum}, got {purchase}")]
    BelowMinimumPurchase { minimum: Money, purchase: Money },

    #[error("offer has reached its limit of {max_uses} uses")]
    UsageExhausted { max_uses: u32 },
}

// =============================================================================
// Validation Error
// =============================================================================

/// Input validation errors.
///
/// These are the InvalidInput taxonomy: callers validate with
/// [`crate::validation`] before handing values to the calculator.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("{field} is required")]
    Required { field: String },

    #[error("{field} must be at most {max} characters")]
    TooLong { field: String, max: usize },

    #[error("{field} must be between {min} and {max}")]
    OutOfRange { field: String, min: i64, max: i64 },

    #[error("{field} must be positive")]
    MustBePositive { field: String },

    #[error("{field} must not be negative")]
    MustNotBeNegative { field: String },

    #[error("{field} has invalid format: {reason}")]
    InvalidFormat { field: String, reason: String },
}

impl ValidationError {
    pub fn out_of_range(field: impl Into<String>, min: i64, max: i64) -> Self {
        ValidationError::OutOfRange {
            field: field.into(),
            min,
            max,
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_redemption_messages() {
        let err = RedemptionRejected::BelowMinimum {
            requested: 400,
            minimum: 500,
        };
        assert_eq!(
            err.to_string(),
            "minimum redeemable points is 500, requested 400"
        );

        let err = RedemptionRejected::ExceedsBalance {
            requested: 700,
            balance: 650,
        };
        assert_eq!(
            err.to_string(),
            "requested 700 points but only 650 available"
        );
    }

    #[test]
    fn test_offer_messages() {
        let err = OfferRejected::BelowMinimumPurchase {
            minimum: Money::from_cents(2500),
            purchase: Money::from_cents(1999),
        };
        assert_eq!(err.to_string(), "minimum purchase is $25.00, got $19.99");
    }

    #[test]
    fn test_conversions_into_core_error() {
        let core: CoreError = RedemptionRejected::ExceedsBalance {
            requested: 2,
            balance: 1,
        }
        .into();
        assert!(matches!(core, CoreError::Redemption(_)));

        let core: CoreError = ValidationError::Required {
            field: "email".to_string(),
        }
        .into();
        assert!(matches!(core, CoreError::Validation(_)));
        assert_eq!(core.to_string(), "Validation error: email is required");
    }

    #[test]
    fn test_full_bill_surfaces_as_validation_error() {
        let core: CoreError = crate::validation::validate_bill_size(crate::MAX_BILL_ITEMS)
            .unwrap_err()
            .into();
        match core {
            CoreError::Validation(ValidationError::OutOfRange { field, max, .. }) => {
                assert_eq!(field, "bill items");
                assert_eq!(max, crate::MAX_BILL_ITEMS as i64);
            }
            CoreError::Validation(other) => panic!("unexpected validation error: {other}"),
            CoreError::Redemption(_) | CoreError::Offer(_) => panic!("bill size is a validation rule"),
        }
    }

    #[test]
    fn test_redemption_rejected_serializes_with_reason_tag() {
        let err = RedemptionRejected::BelowMinimum {
            requested: 100,
            minimum: 500,
        };
        let json = serde_json::to_value(err).unwrap();
        assert_eq!(json["reason"], "below_minimum");
        assert_eq!(json["minimum"], 500);
    }
}
