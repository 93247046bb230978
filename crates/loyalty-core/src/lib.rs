//! # loyalty-core: Pure Loyalty Ledger Logic
//!
//! Discounts, points, redemptions, tiers and offers for a multi-business
//! loyalty program, as pure functions with zero I/O dependencies.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Loyalty Hub Architecture                         │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                    Dashboard (TypeScript)                       │   │
//! │  │   Billing counter ──► Customers ──► Tiers ──► Offers ──► Wallet │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │ ts-rs generated bindings               │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │               ★ loyalty-core (THIS CRATE) ★                     │   │
//! │  │                                                                 │   │
//! │  │   ┌──────────┐ ┌──────────┐ ┌──────────┐ ┌──────────┐          │   │
//! │  │   │  ledger  │ │   tier   │ │  offer   │ │validation│          │   │
//! │  │   │ discount │ │ resolve  │ │  check   │ │  rules   │          │   │
//! │  │   │ earn/redm│ │ next     │ │ discount │ │  checks  │          │   │
//! │  │   └──────────┘ └──────────┘ └──────────┘ └──────────┘          │   │
//! │  │                                                                 │   │
//! │  │   NO I/O • NO DATABASE • NO NETWORK • PURE FUNCTIONS           │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │                    loyalty-db (Database Layer)                  │   │
//! │  │     SQLite, migrations, repositories, atomic bill settlement    │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`ledger`] - The bill calculator (discount, earn, redeem, total)
//! - [`tier`] - Membership tier resolution
//! - [`offer`] - Promotional offer rules
//! - [`types`] - Rates, configuration and records
//! - [`money`] - Cent and micro-unit money types
//! - [`error`] - Domain error types
//! - [`validation`] - Input validation (the InvalidInput taxonomy)
//!
//! ## Design Principles
//!
//! 1. **Pure Functions**: same input, same output; nothing is mutated
//! 2. **No I/O**: persistence belongs to loyalty-db
//! 3. **Integer Money**: cents for storage, micro-units for arithmetic, no floats
//! 4. **Explicit Conventions**: a redemption rate always names its convention
//!
//! ## Example Usage
//!
//! ```rust
//! use loyalty_core::ledger::{compute_bill, BillInput, RedemptionRequest};
//! use loyalty_core::{LoyaltyConfig, Money, Percentage};
//!
//! let config = LoyaltyConfig::default().with_discount(Percentage::from_percent(10));
//! let bill = compute_bill(&config, BillInput {
//!     purchase: Money::from_cents(10_000),
//!     balance: 120,
//!     redeem: RedemptionRequest::none(),
//! });
//!
//! assert_eq!(bill.total_display().to_string(), "$90.00");
//! assert_eq!(bill.points_earned, 90);
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod ledger;
pub mod money;
pub mod offer;
pub mod tier;
pub mod types;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================

pub use error::{CoreError, OfferRejected, RedemptionRejected, ValidationError};
pub use money::{format_points, ExactMoney, Money};
pub use offer::{Offer, OfferKind, OfferStatus};
pub use tier::MembershipTier;
pub use types::*;

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Business used by the seed data and single-business deployments.
pub const DEFAULT_BUSINESS_ID: &str = "00000000-0000-0000-0000-000000000001";

/// Maximum lines on a single itemised bill.
pub const MAX_BILL_ITEMS: usize = 100;

/// Maximum quantity on a single bill line.
///
/// Catches typing 1000 instead of 10 at the counter.
pub const MAX_ITEM_QUANTITY: i64 = 999;

/// Largest purchase, in cents, the calculator represents exactly
/// (about $9.2 trillion): every cent amount up to it fits in micro-units.
pub const MAX_PURCHASE_CENTS: i64 = i64::MAX / money::MICROS_PER_CENT;
