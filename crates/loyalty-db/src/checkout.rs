//! # Checkout
//!
//! The billing counter's one call: compute a bill with the customer's
//! current tier and the business's settings, then settle it.
//!
//! ```text
//! Database::checkout(business, customer, $100.00, redeem 500)
//!      │
//!      ├── load business  → LoyaltyConfig
//!      ├── load customer  → balance, tier_id
//!      ├── load tiers     → tier discount
//!      │
//!      ├── compute_bill(config, input)            (pure)
//!      │      └── Rejected redemption → DbError::Core(Redemption(..)), no write
//!      │
//!      └── BillRepository::record(breakdown)      (one transaction)
//!
//! Database::checkout_items(business, customer, &[BillItem], redeem)
//!      └── validate lines, subtotal_of(items), then as above
//! ```

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::error::{DbError, DbResult};
use crate::pool::Database;
use loyalty_core::ledger::{compute_bill, BillBreakdown, BillInput, RedemptionOutcome, RedemptionRequest};
use loyalty_core::tier::resolve_tier;
use loyalty_core::ledger::subtotal_of;
use loyalty_core::validation::{validate_bill_items, validate_purchase_cents};
use loyalty_core::{Bill, BillItem, Customer, Money};

/// What the counter shows after a successful checkout.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutReceipt {
    pub bill: Bill,
    pub breakdown: BillBreakdown,
    /// Customer as stored after settlement (new balance and tier).
    pub customer: Customer,
}

impl Database {
    /// Computes and settles one bill.
    ///
    /// A rejected redemption writes nothing and is returned as
    /// `DbError::Core(CoreError::Redemption(..))` so the counter can show the
    /// corrective message; the cashier then retries with a valid amount or
    /// with zero points.
    pub async fn checkout(
        &self,
        business_id: &str,
        customer_id: &str,
        purchase: Money,
        redeem_points: u64,
    ) -> DbResult<CheckoutReceipt> {
        validate_purchase_cents(purchase.cents())?;

        let business = self
            .businesses()
            .get_by_id(business_id)
            .await?
            .ok_or_else(|| DbError::not_found("Business", business_id))?;

        let customer = self
            .customers()
            .get_by_id(business_id, customer_id)
            .await?
            .ok_or_else(|| DbError::not_found("Customer", customer_id))?;

        let tiers = self.tiers().list_for_business(business_id).await?;
        let tier = customer
            .tier_id
            .as_deref()
            .and_then(|id| tiers.iter().find(|t| t.id == id))
            .or_else(|| resolve_tier(&tiers, customer.points));
        let discount = tier.map(|t| t.discount).unwrap_or_default();

        let config = business.loyalty.with_discount(discount);
        let breakdown = compute_bill(
            &config,
            BillInput {
                purchase,
                balance: customer.points,
                redeem: RedemptionRequest::of(redeem_points),
            },
        );

        if let RedemptionOutcome::Rejected { error } = breakdown.redemption {
            warn!(
                customer_id = %customer_id,
                requested = redeem_points,
                balance = customer.points,
                %error,
                "Redemption rejected at checkout"
            );
            return Err(error.into());
        }

        let bill = self.bills().record(business_id, customer_id, &breakdown).await?;

        let customer = self
            .customers()
            .get_by_id(business_id, customer_id)
            .await?
            .ok_or_else(|| DbError::not_found("Customer", customer_id))?;

        info!(
            bill_id = %bill.id,
            customer_id = %customer_id,
            tier = tier.map(|t| t.name.as_str()).unwrap_or("none"),
            total = %bill.total(),
            earned = bill.points_earned,
            redeemed = bill.points_redeemed,
            "Checkout complete"
        );

        Ok(CheckoutReceipt {
            bill,
            breakdown,
            customer,
        })
    }

    /// Checkout for an itemised bill: the purchase is the sum of the lines.
    pub async fn checkout_items(
        &self,
        business_id: &str,
        customer_id: &str,
        items: &[BillItem],
        redeem_points: u64,
    ) -> DbResult<CheckoutReceipt> {
        validate_bill_items(items)?;
        let purchase = subtotal_of(items);
        debug!(lines = items.len(), subtotal = %purchase, "Itemised bill");
        self.checkout(business_id, customer_id, purchase, redeem_points).await
    }
}
