//! # Membership Tiers
//!
//! Each business defines its own ladder of tiers. A customer sits on the
//! highest rung whose threshold their balance reaches.
//!
//! ```text
//!   points:   0 ─────────── 500 ─────────── 1000 ──────────►
//!             │   Bronze 5%  │   Silver 10%  │   Gold 15%
//!             └──────────────┴───────────────┴──────────────
//! ```

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::types::Percentage;

/// One rung of a business's tier ladder.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct MembershipTier {
    pub id: String,
    pub business_id: String,
    pub name: String,
    pub description: Option<String>,
    /// Inclusive point threshold.
    pub points_required: u64,
    /// Discount applied to purchases at the counter.
    pub discount: Percentage,
    pub benefits: Vec<String>,
    /// Dashboard badge colour, e.g. `#C0C0C0`.
    pub color: Option<String>,
}

/// Picks the tier with the highest `points_required <= points`.
///
/// Order of `tiers` does not matter. Returns `None` when no tier is reached,
/// which only happens if the ladder has no zero-point entry.
///
/// ## Example
/// ```rust
/// use loyalty_core::tier::{resolve_tier, MembershipTier};
/// use loyalty_core::Percentage;
///
/// let tier = |name: &str, at: u64| MembershipTier {
///     id: name.to_lowercase(),
///     business_id: "b".into(),
///     name: name.into(),
///     description: None,
///     points_required: at,
///     discount: Percentage::zero(),
///     benefits: vec![],
///     color: None,
/// };
/// let ladder = [tier("Bronze", 0), tier("Silver", 500), tier("Gold", 1000)];
///
/// assert_eq!(resolve_tier(&ladder, 650).map(|t| t.name.as_str()), Some("Silver"));
/// ```
pub fn resolve_tier(tiers: &[MembershipTier], points: u64) -> Option<&MembershipTier> {
    tiers
        .iter()
        .filter(|t| t.points_required <= points)
        .max_by_key(|t| t.points_required)
}

/// The lowest tier strictly above the customer's balance.
pub fn next_tier(tiers: &[MembershipTier], points: u64) -> Option<&MembershipTier> {
    tiers
        .iter()
        .filter(|t| t.points_required > points)
        .min_by_key(|t| t.points_required)
}

/// Points still needed to reach the next tier; `None` at the top.
pub fn points_to_next_tier(tiers: &[MembershipTier], points: u64) -> Option<u64> {
    next_tier(tiers, points).map(|t| t.points_required - points)
}

/// Discount for a balance, or zero when no tier applies.
pub fn discount_for_points(tiers: &[MembershipTier], points: u64) -> Percentage {
    resolve_tier(tiers, points)
        .map(|t| t.discount)
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tier(name: &str, points_required: u64, percent: u32) -> MembershipTier {
        MembershipTier {
            id: name.to_lowercase(),
            business_id: "biz".to_string(),
            name: name.to_string(),
            description: None,
            points_required,
            discount: Percentage::from_percent(percent),
            benefits: vec![],
            color: None,
        }
    }

    fn ladder() -> Vec<MembershipTier> {
        // deliberately unsorted
        vec![tier("Gold", 1000, 15), tier("Bronze", 0, 5), tier("Silver", 500, 10)]
    }

    #[test]
    fn test_resolve_tier_thresholds_are_inclusive() {
        let tiers = ladder();
        assert_eq!(resolve_tier(&tiers, 0).unwrap().name, "Bronze");
        assert_eq!(resolve_tier(&tiers, 499).unwrap().name, "Bronze");
        assert_eq!(resolve_tier(&tiers, 500).unwrap().name, "Silver");
        assert_eq!(resolve_tier(&tiers, 650).unwrap().name, "Silver");
        assert_eq!(resolve_tier(&tiers, 1000).unwrap().name, "Gold");
        assert_eq!(resolve_tier(&tiers, 50_000).unwrap().name, "Gold");
    }

    #[test]
    fn test_resolve_tier_without_base_rung() {
        let tiers = vec![tier("Silver", 500, 10)];
        assert!(resolve_tier(&tiers, 100).is_none());
        assert!(resolve_tier(&[], 100).is_none());
        assert_eq!(discount_for_points(&tiers, 100), Percentage::zero());
    }

    #[test]
    fn test_next_tier_progress() {
        let tiers = ladder();
        assert_eq!(next_tier(&tiers, 650).unwrap().name, "Gold");
        assert_eq!(points_to_next_tier(&tiers, 650), Some(350));
        assert_eq!(points_to_next_tier(&tiers, 0), Some(500));
        assert_eq!(points_to_next_tier(&tiers, 1000), None);
    }

    #[test]
    fn test_discount_for_points() {
        let tiers = ladder();
        assert_eq!(discount_for_points(&tiers, 650), Percentage::from_percent(10));
        assert_eq!(discount_for_points(&tiers, 1200), Percentage::from_percent(15));
    }
}
