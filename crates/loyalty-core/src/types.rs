//! # Domain Types
//!
//! Rates, configuration and record types shared by the calculator and the
//! storage layer.
//!
//! ## Type Overview
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                    │
//! │                                                                         │
//! │  Rates (integer fixed-point, never floats in the ledger)                │
//! │  ┌─────────────────┐ ┌─────────────────┐ ┌───────────────────────────┐  │
//! │  │ Percentage      │ │ EarnRate        │ │ RedemptionRate            │  │
//! │  │ bps: 1000 = 10% │ │ milli-points/$  │ │ ValuePerPoint(PointValue) │  │
//! │  └─────────────────┘ │ 1000 = 1 pt/$   │ │ PointsPerCurrency(N)      │  │
//! │                      └─────────────────┘ └───────────────────────────┘  │
//! │                                                                         │
//! │  Records (owned by loyalty-db, passed in by value)                      │
//! │  ┌──────────┐ ┌──────────┐ ┌──────────┐ ┌─────────────┐                │
//! │  │ Business │ │ Customer │ │   Bill   │ │ LedgerEntry │                │
//! │  │ + config │ │ + points │ │ snapshot │ │ point delta │                │
//! │  └──────────┘ └──────────┘ └──────────┘ └─────────────┘                │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::error::ValidationError;
use crate::money::{Money, MICROS_PER_UNIT};

// =============================================================================
// Percentage
// =============================================================================

/// A percentage in basis points (1 bps = 0.01%, 10_000 bps = 100%).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Percentage(u32);

impl Percentage {
    /// 100%.
    pub const FULL: Percentage = Percentage(10_000);

    #[inline]
    pub const fn from_bps(bps: u32) -> Self {
        Percentage(bps)
    }

    /// Whole percent, as entered on the tier screen (`10` = 10%).
    #[inline]
    pub const fn from_percent(percent: u32) -> Self {
        Percentage(percent * 100)
    }

    /// Creates a percentage from a decimal percent (for convenience).
    pub fn from_percentage(pct: f64) -> Self {
        Percentage((pct * 100.0).round() as u32)
    }

    #[inline]
    pub const fn bps(&self) -> u32 {
        self.0
    }

    /// Returns the rate as a percentage (for display only).
    #[inline]
    pub fn percentage(&self) -> f64 {
        self.0 as f64 / 100.0
    }

    #[inline]
    pub const fn zero() -> Self {
        Percentage(0)
    }

    #[inline]
    pub const fn is_zero(&self) -> bool {
        self.0 == 0
    }
}

impl Default for Percentage {
    fn default() -> Self {
        Percentage::zero()
    }
}

// =============================================================================
// Earn Rate
// =============================================================================

/// Points earned per major currency unit, in milli-points.
///
/// `1_000` is one point per dollar; `1_500` is one and a half.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct EarnRate(u32);

impl EarnRate {
    #[inline]
    pub const fn from_millipoints(millipoints: u32) -> Self {
        EarnRate(millipoints)
    }

    #[inline]
    pub const fn from_points_per_unit(points: u32) -> Self {
        EarnRate(points * 1_000)
    }

    #[inline]
    pub const fn millipoints(&self) -> u32 {
        self.0
    }

    /// Points per dollar (for display only).
    #[inline]
    pub fn points_per_unit(&self) -> f64 {
        self.0 as f64 / 1_000.0
    }
}

impl Default for EarnRate {
    fn default() -> Self {
        EarnRate::from_points_per_unit(1)
    }
}

// =============================================================================
// Redemption Rates
// =============================================================================

/// Convention A: the cash value of ONE point, in micro-units.
///
/// `PointValue::from_micros(50_000)` means 1 point = $0.05.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct PointValue(u32);

impl PointValue {
    #[inline]
    pub const fn from_micros(micros: u32) -> Self {
        PointValue(micros)
    }

    #[inline]
    pub const fn from_cents(cents: u32) -> Self {
        PointValue(cents * 10_000)
    }

    /// Creates a value from a decimal dollar amount (`0.05`).
    pub fn from_dollars(dollars: f64) -> Self {
        PointValue((dollars * MICROS_PER_UNIT as f64).round() as u32)
    }

    #[inline]
    pub const fn micros(&self) -> u32 {
        self.0
    }
}

/// Convention B: how many points make ONE major currency unit.
///
/// `PointsPerCurrency::new(100)` means 100 points = $1. Never zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[ts(export, as = "u32")]
#[serde(try_from = "u32", into = "u32")]
pub struct PointsPerCurrency(u32);

impl PointsPerCurrency {
    /// Creates the rate, rejecting zero.
    pub fn new(points: u32) -> Result<Self, ValidationError> {
        if points == 0 {
            return Err(ValidationError::MustBePositive {
                field: "points_to_currency_value".to_string(),
            });
        }
        Ok(PointsPerCurrency(points))
    }

    #[inline]
    pub const fn get(&self) -> u32 {
        self.0
    }
}

impl TryFrom<u32> for PointsPerCurrency {
    type Error = ValidationError;

    fn try_from(points: u32) -> Result<Self, Self::Error> {
        PointsPerCurrency::new(points)
    }
}

impl From<PointsPerCurrency> for u32 {
    fn from(rate: PointsPerCurrency) -> Self {
        rate.0
    }
}

impl Default for PointsPerCurrency {
    fn default() -> Self {
        PointsPerCurrency(100)
    }
}

/// How a business converts points into money.
///
/// The two conventions read `pointsToCurrencyValue` in opposite directions,
/// so a configuration must name the one it uses. There is no default
/// conversion between them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(tag = "convention", content = "rate", rename_all = "snake_case")]
pub enum RedemptionRate {
    /// Convention A: `value = points × value_per_point`.
    ValuePerPoint(PointValue),
    /// Convention B: `value = points / points_per_currency`.
    PointsPerCurrency(PointsPerCurrency),
}

impl Default for RedemptionRate {
    fn default() -> Self {
        RedemptionRate::PointsPerCurrency(PointsPerCurrency::default())
    }
}

// =============================================================================
// Bonuses
// =============================================================================

/// One-off point awards outside of purchases.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum BonusKind {
    Welcome,
    Birthday,
    Referral,
}

/// Bonus points per [`BonusKind`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct BonusSchedule {
    pub welcome: u64,
    pub birthday: u64,
    pub referral: u64,
}

impl BonusSchedule {
    pub const fn points_for(&self, kind: BonusKind) -> u64 {
        match kind {
            BonusKind::Welcome => self.welcome,
            BonusKind::Birthday => self.birthday,
            BonusKind::Referral => self.referral,
        }
    }
}

impl Default for BonusSchedule {
    fn default() -> Self {
        BonusSchedule {
            welcome: 50,
            birthday: 100,
            referral: 200,
        }
    }
}

// =============================================================================
// Loyalty Config
// =============================================================================

/// Per-business loyalty program settings. Read-only during a calculation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct LoyaltyConfig {
    /// `pointsPerDollar`.
    pub earn_rate: EarnRate,
    /// Point-to-money conversion with its declared convention.
    pub redemption_rate: RedemptionRate,
    /// Smallest non-zero redemption accepted (inclusive).
    pub min_redeem_points: u64,
    /// Tier discount applied to the purchase (0-100%).
    pub discount: Percentage,
    pub bonuses: BonusSchedule,
}

impl LoyaltyConfig {
    /// Returns a copy with the tier's discount percentage applied.
    pub fn with_discount(mut self, discount: Percentage) -> Self {
        self.discount = discount;
        self
    }

    /// Checks the ranges the calculator otherwise clamps.
    pub fn validate(&self) -> Result<(), ValidationError> {
        crate::validation::validate_discount_bps(self.discount.bps())?;
        if let RedemptionRate::ValuePerPoint(value) = self.redemption_rate {
            if value.micros() == 0 {
                return Err(ValidationError::MustBePositive {
                    field: "point_to_currency".to_string(),
                });
            }
        }
        Ok(())
    }
}

impl Default for LoyaltyConfig {
    /// Business-setup defaults: 1 pt/$, 100 pts = $1, minimum 500.
    fn default() -> Self {
        LoyaltyConfig {
            earn_rate: EarnRate::default(),
            redemption_rate: RedemptionRate::default(),
            min_redeem_points: 500,
            discount: Percentage::zero(),
            bonuses: BonusSchedule::default(),
        }
    }
}

// =============================================================================
// Business
// =============================================================================

/// A tenant: one business running a loyalty program.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct Business {
    pub id: String,
    pub name: String,
    pub description: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub website: Option<String>,
    pub loyalty: LoyaltyConfig,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

// =============================================================================
// Customer
// =============================================================================

/// A member of one business's loyalty program.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct Customer {
    pub id: String,
    pub business_id: String,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone: Option<String>,
    /// Current membership tier, recomputed after every balance change.
    pub tier_id: Option<String>,
    /// Point balance. Only changed through the storage layer's guarded updates.
    pub points: u64,
    pub total_spent_cents: i64,
    #[ts(as = "Option<String>")]
    pub birthday: Option<NaiveDate>,
    #[ts(as = "String")]
    pub joined_at: DateTime<Utc>,
    #[ts(as = "Option<String>")]
    pub last_purchase_at: Option<DateTime<Utc>>,
}

impl Customer {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }

    #[inline]
    pub fn total_spent(&self) -> Money {
        Money::from_cents(self.total_spent_cents)
    }
}

// =============================================================================
// Bill
// =============================================================================

/// A line on an itemised bill.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct BillItem {
    pub name: String,
    pub unit_price_cents: i64,
    pub quantity: i64,
}

impl BillItem {
    pub fn new(name: impl Into<String>, unit_price: Money, quantity: i64) -> Self {
        BillItem {
            name: name.into(),
            unit_price_cents: unit_price.cents(),
            quantity,
        }
    }

    #[inline]
    pub fn line_total(&self) -> Money {
        Money::from_cents(self.unit_price_cents).multiply_quantity(self.quantity)
    }
}

/// A settled bill. Amounts are the rounded display values; the exact
/// total was rounded once at settlement.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct Bill {
    pub id: String,
    pub business_id: String,
    pub customer_id: String,
    pub purchase_cents: i64,
    pub discount_cents: i64,
    pub redemption_cents: i64,
    /// May be negative when redemption exceeds the discounted purchase.
    pub total_cents: i64,
    pub points_redeemed: u64,
    pub points_earned: u64,
    pub balance_after: u64,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

impl Bill {
    #[inline]
    pub fn total(&self) -> Money {
        Money::from_cents(self.total_cents)
    }
}

// =============================================================================
// Ledger Entries
// =============================================================================

/// Kind of point movement recorded in the ledger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum LedgerEntryKind {
    /// Points earned on a purchase.
    Accrual,
    /// Points spent against a purchase.
    Redemption,
    /// Welcome / birthday / referral award.
    Bonus,
    /// Manual correction from the dashboard.
    Adjustment,
}

/// One signed movement of a customer's point balance.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct LedgerEntry {
    pub id: String,
    pub business_id: String,
    pub customer_id: String,
    pub kind: LedgerEntryKind,
    /// Positive for credits, negative for debits.
    pub points: i64,
    pub bill_id: Option<String>,
    pub note: Option<String>,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_percentage_constructors() {
        assert_eq!(Percentage::from_percent(10).bps(), 1_000);
        assert_eq!(Percentage::from_percentage(8.25).bps(), 825);
        assert!((Percentage::from_bps(1_500).percentage() - 15.0).abs() < 0.001);
        assert!(Percentage::default().is_zero());
    }

    #[test]
    fn test_point_value_from_dollars() {
        assert_eq!(PointValue::from_dollars(0.05).micros(), 50_000);
        assert_eq!(PointValue::from_cents(5), PointValue::from_micros(50_000));
    }

    #[test]
    fn test_points_per_currency_rejects_zero() {
        assert!(PointsPerCurrency::new(0).is_err());
        assert_eq!(PointsPerCurrency::new(100).unwrap().get(), 100);
    }

    #[test]
    fn test_points_per_currency_deserialize_rejects_zero() {
        let ok: PointsPerCurrency = serde_json::from_str("250").unwrap();
        assert_eq!(ok.get(), 250);
        assert!(serde_json::from_str::<PointsPerCurrency>("0").is_err());
    }

    #[test]
    fn test_points_per_currency_is_a_plain_number_on_the_wire() {
        let rate = PointsPerCurrency::new(100).unwrap();
        assert_eq!(serde_json::to_string(&rate).unwrap(), "100");
        assert_eq!(PointsPerCurrency::inline(), "number");
    }

    #[test]
    fn test_redemption_rate_declares_convention() {
        let rate = RedemptionRate::ValuePerPoint(PointValue::from_cents(5));
        let json = serde_json::to_value(rate).unwrap();
        assert_eq!(json["convention"], "value_per_point");
        assert_eq!(json["rate"], 50_000);

        let json = serde_json::to_value(RedemptionRate::default()).unwrap();
        assert_eq!(json["convention"], "points_per_currency");
        assert_eq!(json["rate"], 100);
    }

    #[test]
    fn test_default_config_matches_business_setup() {
        let config = LoyaltyConfig::default();
        assert_eq!(config.earn_rate, EarnRate::from_points_per_unit(1));
        assert_eq!(config.min_redeem_points, 500);
        assert_eq!(config.bonuses.points_for(BonusKind::Welcome), 50);
        assert_eq!(config.bonuses.points_for(BonusKind::Birthday), 100);
        assert_eq!(config.bonuses.points_for(BonusKind::Referral), 200);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_validate_rejects_over_full_discount() {
        let config = LoyaltyConfig::default().with_discount(Percentage::from_bps(10_001));
        assert!(config.validate().is_err());

        let config = LoyaltyConfig {
            redemption_rate: RedemptionRate::ValuePerPoint(PointValue::from_micros(0)),
            ..LoyaltyConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_bill_item_line_total() {
        let item = BillItem::new("Flat white", Money::from_cents(450), 3);
        assert_eq!(item.line_total().cents(), 1350);
    }
}
