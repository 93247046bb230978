//! # Promotional Offers
//!
//! Time-boxed, usage-capped discounts a business runs alongside its tiers
//! ("Happy Hour Special", "$10 off your first order").
//!
//! ## Applicability Checks
//! ```text
//! Offer::check(purchase, today)
//!      │
//!      ├── is_active == false          → Inactive
//!      ├── today < valid_from          → NotYetValid
//!      ├── today > valid_until         → Expired
//!      ├── used_count >= max_uses      → UsageExhausted
//!      ├── purchase < min_purchase     → BelowMinimumPurchase
//!      └── otherwise                   → Ok(())
//! ```

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::error::{OfferRejected, ValidationError};
use crate::ledger::compute_discount;
use crate::money::{ExactMoney, Money};
use crate::types::Percentage;
use crate::validation::{validate_discount_bps, validate_name, validate_offer_window, ValidationResult};

/// What the offer takes off the bill.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum OfferKind {
    Percentage(Percentage),
    FixedAmount(Money),
}

/// Dashboard badge for an offer on a given day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum OfferStatus {
    Active,
    Scheduled,
    Expired,
    Exhausted,
    Inactive,
}

/// A promotional offer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct Offer {
    pub id: String,
    pub business_id: String,
    pub title: String,
    pub description: Option<String>,
    pub kind: OfferKind,
    pub min_purchase: Money,
    /// `None` means unlimited.
    pub max_uses: Option<u32>,
    #[ts(as = "String")]
    pub valid_from: NaiveDate,
    #[ts(as = "String")]
    pub valid_until: NaiveDate,
    pub is_active: bool,
    pub used_count: u32,
}

impl Offer {
    /// Whether the offer may be applied to `purchase` on `today`.
    pub fn check(&self, purchase: Money, today: NaiveDate) -> Result<(), OfferRejected> {
        if !self.is_active {
            return Err(OfferRejected::Inactive);
        }

        if today < self.valid_from {
            return Err(OfferRejected::NotYetValid {
                starts: self.valid_from,
            });
        }

        if today > self.valid_until {
            return Err(OfferRejected::Expired {
                ended: self.valid_until,
            });
        }

        if self.is_exhausted() {
            return Err(OfferRejected::UsageExhausted {
                max_uses: self.max_uses.unwrap_or_default(),
            });
        }

        if purchase < self.min_purchase {
            return Err(OfferRejected::BelowMinimumPurchase {
                minimum: self.min_purchase,
                purchase,
            });
        }

        Ok(())
    }

    /// Discount this offer gives on `purchase`. Fixed amounts never exceed
    /// the purchase.
    pub fn discount_for(&self, purchase: Money) -> ExactMoney {
        let purchase = purchase.clamp_non_negative();
        match self.kind {
            OfferKind::Percentage(pct) => compute_discount(purchase, pct),
            OfferKind::FixedAmount(amount) => {
                ExactMoney::from(amount.clamp_non_negative().min(purchase))
            }
        }
    }

    /// `check` followed by `discount_for`.
    pub fn apply(&self, purchase: Money, today: NaiveDate) -> Result<ExactMoney, OfferRejected> {
        self.check(purchase, today)?;
        Ok(self.discount_for(purchase))
    }

    pub fn is_exhausted(&self) -> bool {
        self.max_uses
            .map(|max| self.used_count >= max)
            .unwrap_or(false)
    }

    /// Status regardless of any particular purchase amount.
    pub fn status(&self, today: NaiveDate) -> OfferStatus {
        if !self.is_active {
            OfferStatus::Inactive
        } else if today < self.valid_from {
            OfferStatus::Scheduled
        } else if today > self.valid_until {
            OfferStatus::Expired
        } else if self.is_exhausted() {
            OfferStatus::Exhausted
        } else {
            OfferStatus::Active
        }
    }

    /// Checks the fields a dashboard form submits.
    pub fn validate(&self) -> ValidationResult<()> {
        validate_name("title", &self.title, 100)?;
        validate_offer_window(self.valid_from, self.valid_until)?;

        if self.min_purchase.is_negative() {
            return Err(ValidationError::MustNotBeNegative {
                field: "min_purchase".to_string(),
            });
        }

        match self.kind {
            OfferKind::Percentage(pct) => validate_discount_bps(pct.bps())?,
            OfferKind::FixedAmount(amount) if !amount.is_positive() => {
                return Err(ValidationError::MustBePositive {
                    field: "discount_amount".to_string(),
                });
            }
            OfferKind::FixedAmount(_) => {}
        }

        if self.max_uses == Some(0) {
            return Err(ValidationError::MustBePositive {
                field: "max_uses".to_string(),
            });
        }

        Ok(())
    }
}
