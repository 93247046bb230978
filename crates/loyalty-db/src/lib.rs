//! # loyalty-db: Database Layer for Loyalty Hub
//!
//! The storage collaborator for the ledger calculator: businesses, tiers,
//! customers, offers, bills and the point ledger in SQLite via sqlx.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Loyalty Hub Data Flow                            │
//! │                                                                         │
//! │  Billing counter (checkout)                                            │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                     loyalty-db (THIS CRATE)                     │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────────┐    ┌───────────────┐    ┌──────────────┐  │   │
//! │  │   │   Database    │    │  Repositories │    │  Migrations  │  │   │
//! │  │   │   (pool.rs)   │    │               │    │  (embedded)  │  │   │
//! │  │   │               │    │ BusinessRepo  │    │              │  │   │
//! │  │   │ SqlitePool    │◄───│ CustomerRepo  │    │ 001_init.sql │  │   │
//! │  │   │ checkout()    │    │ BillRepo ...  │    │              │  │   │
//! │  │   └───────────────┘    └───────────────┘    └──────────────┘  │   │
//! │  │            │                                                    │   │
//! │  │            └──► loyalty-core::ledger::compute_bill (pure)      │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  SQLite (LOYALTY_DB_PATH, default ./loyalty.db)                        │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Organization
//!
//! - [`pool`] - Connection pool creation and configuration
//! - [`migrations`] - Embedded database migrations
//! - [`error`] - Database error types
//! - [`repository`] - Repository implementations
//! - [`checkout`] - Compute-and-settle for the billing counter
//!
//! ## Usage
//!
//! ```rust,ignore
//! use loyalty_db::{Database, DbConfig};
//! use loyalty_core::Money;
//!
//! let db = Database::new(DbConfig::from_env()?).await?;
//!
//! let receipt = db
//!     .checkout(business_id, customer_id, Money::from_cents(10_000), 500)
//!     .await?;
//! println!("total {} / balance {}", receipt.bill.total(), receipt.customer.points);
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod checkout;
pub mod error;
pub mod migrations;
pub mod pool;
pub mod repository;

// =============================================================================
// Re-exports
// =============================================================================

pub use checkout::CheckoutReceipt;
pub use error::{DbError, DbResult};
pub use migrations::MigrationStatus;
pub use pool::{Database, DbConfig};

pub use repository::bill::BillRepository;
pub use repository::business::BusinessRepository;
pub use repository::customer::{CustomerRepository, NewCustomer};
pub use repository::offer::OfferRepository;
pub use repository::tier::TierRepository;
