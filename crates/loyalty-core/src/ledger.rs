//! # Loyalty Ledger Calculator
//!
//! Pure, stateless arithmetic for the billing counter: tier discount,
//! points earned, redemption eligibility, redemption value and final total.
//!
//! ## Bill Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  purchase $100.00, Silver tier (10%), balance 650 pts, redeem 500 pts   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  compute_discount(100.00, 10%)              → $10.00                    │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  compute_points_earned(90.00, 1 pt/$)       → 90 pts (floor)            │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  is_redemption_eligible(650, min 500)       → true (inclusive)          │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  compute_redemption(500, 650, 500, B:100)   → $5.00                     │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  compute_final_total(100, 10, 5)            → $85.00 (never clamped)    │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  PointDelta { redeemed: 500, earned: 90 }   → caller applies: 240 pts   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Input Policy
//! Callers validate with [`crate::validation`]. Anything out of range that
//! still reaches the calculator is clamped into range: negative amounts count
//! as zero and percentages above 100% count as 100%. The final-total
//! subtraction is the one place that is never clamped, so an over-redeemed
//! bill reports a negative total.
//!
//! ## Redemption Conventions
//! Businesses express the point-to-money rate in one of two opposite ways.
//! Both are kept as separate operations and [`RedemptionRate`] makes the
//! choice explicit at every call site:
//! - Convention A, [`redemption_value_per_point`]: `points × value_per_point`
//! - Convention B, [`redemption_value_points_per_currency`]: `points / points_per_currency`

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::error::RedemptionRejected;
use crate::money::{ExactMoney, Money, MICROS_PER_UNIT};
use crate::types::{BillItem, EarnRate, LoyaltyConfig, Percentage, PointValue, PointsPerCurrency, RedemptionRate};

// =============================================================================
// Discount
// =============================================================================

/// Tier discount on a purchase: `purchase × percentage / 100`, full precision.
///
/// ## Example
/// ```rust
/// use loyalty_core::ledger::compute_discount;
/// use loyalty_core::{Money, Percentage};
///
/// let discount = compute_discount(Money::from_cents(10_000), Percentage::from_percent(10));
/// assert_eq!(discount.round_to_cents().cents(), 1_000); // $10.00
/// ```
pub fn compute_discount(purchase: Money, discount: Percentage) -> ExactMoney {
    let cents = purchase.clamp_non_negative().cents() as i128;
    let bps = discount.bps().min(Percentage::FULL.bps()) as i128;
    // cents × bps / 10_000 cents == cents × bps micro-units
    ExactMoney::from_wide(cents * bps)
}

// =============================================================================
// Points Earned
// =============================================================================

/// Points earned on a net amount: `floor(net × points_per_dollar)`.
///
/// Truncation, never rounding: $89.99 at 1 pt/$ earns 89 points.
///
/// ## Example
/// ```rust
/// use loyalty_core::ledger::compute_points_earned;
/// use loyalty_core::{EarnRate, ExactMoney};
///
/// let net = ExactMoney::from_micros(90_000_000); // $90.00
/// assert_eq!(compute_points_earned(net, EarnRate::from_points_per_unit(1)), 90);
/// ```
pub fn compute_points_earned(net: ExactMoney, rate: EarnRate) -> u64 {
    let micros = net.clamp_non_negative().micros() as i128;
    let millipoints = rate.millipoints() as i128;
    let points = micros * millipoints / (MICROS_PER_UNIT as i128 * 1_000);
    u64::try_from(points).unwrap_or(u64::MAX)
}

// =============================================================================
// Redemption
// =============================================================================

/// Whether a point count reaches the redemption threshold (inclusive).
///
/// Accepts either the customer's balance or the points earned on the
/// current bill; the counter screen decides which it shows.
#[inline]
pub const fn is_redemption_eligible(points: u64, min_redeem_points: u64) -> bool {
    points >= min_redeem_points
}

/// Convention A ("value-per-point"): `points × value_per_point`.
///
/// ## Example
/// ```rust
/// use loyalty_core::ledger::redemption_value_per_point;
/// use loyalty_core::PointValue;
///
/// let value = redemption_value_per_point(200, PointValue::from_dollars(0.05));
/// assert_eq!(value.round_to_cents().cents(), 1_000); // $10.00
/// ```
pub fn redemption_value_per_point(points: u64, value: PointValue) -> ExactMoney {
    ExactMoney::from_wide(points as i128 * value.micros() as i128)
}

/// Convention B ("points-per-dollar"): `points / points_per_currency`.
///
/// Exact to one micro-unit; any smaller remainder is truncated.
///
/// ## Example
/// ```rust
/// use loyalty_core::ledger::redemption_value_points_per_currency;
/// use loyalty_core::PointsPerCurrency;
///
/// let rate = PointsPerCurrency::new(100).unwrap();
/// let value = redemption_value_points_per_currency(500, rate);
/// assert_eq!(value.round_to_cents().cents(), 500); // $5.00
/// ```
pub fn redemption_value_points_per_currency(points: u64, rate: PointsPerCurrency) -> ExactMoney {
    ExactMoney::from_wide(points as i128 * MICROS_PER_UNIT as i128 / rate.get() as i128)
}

/// Value of a point count under whichever convention the rate declares.
pub fn redemption_value(points: u64, rate: RedemptionRate) -> ExactMoney {
    match rate {
        RedemptionRate::ValuePerPoint(value) => redemption_value_per_point(points, value),
        RedemptionRate::PointsPerCurrency(per) => redemption_value_points_per_currency(points, per),
    }
}

/// A number of points the customer asked to spend on this bill.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct RedemptionRequest {
    pub points: u64,
}

impl RedemptionRequest {
    #[inline]
    pub const fn of(points: u64) -> Self {
        RedemptionRequest { points }
    }

    /// "Do not redeem anything."
    #[inline]
    pub const fn none() -> Self {
        RedemptionRequest { points: 0 }
    }

    #[inline]
    pub const fn is_none(&self) -> bool {
        self.points == 0
    }
}

/// Checks a redemption request against the balance and the minimum.
///
/// ## Rules
/// - `0` points is "no redemption" and always passes
/// - more than the balance is always rejected, whatever the minimum
/// - fewer than `min_redeem_points` is rejected; exactly the minimum passes
pub fn validate_redemption(
    request: RedemptionRequest,
    balance: u64,
    min_redeem_points: u64,
) -> Result<(), RedemptionRejected> {
    if request.is_none() {
        return Ok(());
    }

    if request.points > balance {
        return Err(RedemptionRejected::ExceedsBalance {
            requested: request.points,
            balance,
        });
    }

    if request.points < min_redeem_points {
        return Err(RedemptionRejected::BelowMinimum {
            requested: request.points,
            minimum: min_redeem_points,
        });
    }

    Ok(())
}

/// An accepted redemption and its money value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Redemption {
    pub points: u64,
    pub value: ExactMoney,
}

/// Validates a request and, if it passes, values it with the declared rate.
///
/// ## Example
/// ```rust
/// use loyalty_core::ledger::{compute_redemption, RedemptionRequest};
/// use loyalty_core::{PointsPerCurrency, RedemptionRate};
///
/// let rate = RedemptionRate::PointsPerCurrency(PointsPerCurrency::new(100).unwrap());
/// let ok = compute_redemption(RedemptionRequest::of(500), 650, 500, rate).unwrap();
/// assert_eq!(ok.value.round_to_cents().cents(), 500);
///
/// assert!(compute_redemption(RedemptionRequest::of(499), 650, 500, rate).is_err());
/// ```
pub fn compute_redemption(
    request: RedemptionRequest,
    balance: u64,
    min_redeem_points: u64,
    rate: RedemptionRate,
) -> Result<Redemption, RedemptionRejected> {
    validate_redemption(request, balance, min_redeem_points)?;

    Ok(Redemption {
        points: request.points,
        value: redemption_value(request.points, rate),
    })
}

/// Full-precision worth of a whole balance.
pub fn redeemable_value(balance: u64, rate: RedemptionRate) -> ExactMoney {
    redemption_value(balance, rate)
}

/// Whole currency units a balance is worth, as the counter shows it
/// ("650 points, worth $6").
pub fn redeemable_whole_units(balance: u64, rate: RedemptionRate) -> i64 {
    redeemable_value(balance, rate).whole_units()
}

// =============================================================================
// Final Total
// =============================================================================

/// `purchase − discount − redemption`. Not clamped: may be negative.
///
/// ## Example
/// ```rust
/// use loyalty_core::ledger::compute_final_total;
/// use loyalty_core::{ExactMoney, Money};
///
/// let total = compute_final_total(
///     Money::from_cents(5_000),
///     ExactMoney::from(Money::from_cents(500)),
///     ExactMoney::from(Money::from_cents(6_000)),
/// );
/// assert_eq!(total.round_to_cents().cents(), -1_500); // -$15.00
/// ```
pub fn compute_final_total(purchase: Money, discount: ExactMoney, redemption: ExactMoney) -> ExactMoney {
    ExactMoney::from(purchase) - discount - redemption
}

// =============================================================================
// Bill Composition
// =============================================================================

/// Subtotal of an itemised bill.
pub fn subtotal_of(items: &[BillItem]) -> Money {
    items.iter().map(BillItem::line_total).sum()
}

/// Inputs for one bill at the counter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct BillInput {
    pub purchase: Money,
    /// Customer's balance before this bill.
    pub balance: u64,
    pub redeem: RedemptionRequest,
}

/// What happened to the redemption part of a bill.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum RedemptionOutcome {
    NotRequested,
    Applied(Redemption),
    Rejected { error: RedemptionRejected },
}

impl RedemptionOutcome {
    /// Money taken off the bill (zero unless applied).
    pub fn value(&self) -> ExactMoney {
        match self {
            RedemptionOutcome::Applied(r) => r.value,
            _ => ExactMoney::zero(),
        }
    }

    /// Points taken off the balance (zero unless applied).
    pub fn points(&self) -> u64 {
        match self {
            RedemptionOutcome::Applied(r) => r.points,
            _ => 0,
        }
    }

    pub fn rejection(&self) -> Option<RedemptionRejected> {
        match self {
            RedemptionOutcome::Rejected { error } => Some(*error),
            _ => None,
        }
    }
}

/// Change to a customer's balance that the storage layer must apply.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct PointDelta {
    pub redeemed: u64,
    pub earned: u64,
}

impl PointDelta {
    /// Signed net change.
    pub fn net(&self) -> i64 {
        self.earned as i64 - self.redeemed as i64
    }

    /// `balance − redeemed + earned`, or `None` if the balance cannot cover
    /// the redemption (only possible when the balance changed since the bill
    /// was computed).
    pub fn apply(&self, balance: u64) -> Option<u64> {
        balance.checked_sub(self.redeemed)?.checked_add(self.earned)
    }
}

/// Everything the counter screen shows for one bill.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct BillBreakdown {
    pub purchase: Money,
    pub discount: ExactMoney,
    /// `purchase − discount`, the amount points are earned on.
    pub net: ExactMoney,
    pub points_earned: u64,
    /// Whether the balance reaches the redemption minimum.
    pub redemption_eligible: bool,
    pub redemption: RedemptionOutcome,
    pub final_total: ExactMoney,
    pub delta: PointDelta,
}

impl BillBreakdown {
    pub fn discount_display(&self) -> Money {
        self.discount.round_to_cents()
    }

    pub fn redemption_display(&self) -> Money {
        self.redemption.value().round_to_cents()
    }

    pub fn total_display(&self) -> Money {
        self.final_total.round_to_cents()
    }
}

/// Composes the calculator operations for one bill.
///
/// A rejected redemption does not disturb the rest of the bill: discount and
/// points earned are computed the same way, and the redemption contributes
/// nothing to the total or the delta.
///
/// ## Example
/// ```rust
/// use loyalty_core::ledger::{compute_bill, BillInput, RedemptionRequest};
/// use loyalty_core::{LoyaltyConfig, Money, Percentage};
///
/// let config = LoyaltyConfig::default().with_discount(Percentage::from_percent(10));
/// let bill = compute_bill(&config, BillInput {
///     purchase: Money::from_cents(10_000),
///     balance: 650,
///     redeem: RedemptionRequest::of(500),
/// });
///
/// assert_eq!(bill.discount_display().cents(), 1_000);
/// assert_eq!(bill.points_earned, 90);
/// assert_eq!(bill.total_display().cents(), 8_500);
/// assert_eq!(bill.delta.apply(650), Some(240));
/// ```
pub fn compute_bill(config: &LoyaltyConfig, input: BillInput) -> BillBreakdown {
    let discount = compute_discount(input.purchase, config.discount);
    let net = ExactMoney::from(input.purchase) - discount;
    let points_earned = compute_points_earned(net, config.earn_rate);
    let redemption_eligible = is_redemption_eligible(input.balance, config.min_redeem_points);

    let redemption = if input.redeem.is_none() {
        RedemptionOutcome::NotRequested
    } else {
        match compute_redemption(
            input.redeem,
            input.balance,
            config.min_redeem_points,
            config.redemption_rate,
        ) {
            Ok(r) => RedemptionOutcome::Applied(r),
            Err(error) => RedemptionOutcome::Rejected { error },
        }
    };

    let final_total = compute_final_total(input.purchase, discount, redemption.value());

    BillBreakdown {
        purchase: input.purchase,
        discount,
        net,
        points_earned,
        redemption_eligible,
        redemption,
        final_total,
        delta: PointDelta {
            redeemed: redemption.points(),
            earned: points_earned,
        },
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
