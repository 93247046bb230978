//! # Repository Module
//!
//! Database repository implementations for Loyalty Hub.
//!
//! ## Repository Pattern
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Repository Pattern                                   │
//! │                                                                         │
//! │  Caller                                                                │
//! │       │  db.customers().search(business_id, "doe", 20)                 │
//! │       ▼                                                                 │
//! │  CustomerRepository                                                    │
//! │  ├── insert(&self, new_customer)     (welcome bonus in one tx)         │
//! │  ├── get_by_id(&self, id)                                              │
//! │  ├── search(&self, business_id, query, limit)                          │
//! │  └── adjust_points(&self, ..)        (guarded, never below zero)       │
//! │       │  SQL                                                            │
//! │       ▼                                                                 │
//! │  SQLite Database                                                       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Every query is scoped by `business_id`.
//!
//! ## Available Repositories
//!
//! - [`BusinessRepository`](business::BusinessRepository) - Businesses and their loyalty settings
//! - [`TierRepository`](tier::TierRepository) - Membership tiers
//! - [`CustomerRepository`](customer::CustomerRepository) - Members and point balances
//! - [`OfferRepository`](offer::OfferRepository) - Promotional offers
//! - [`BillRepository`](bill::BillRepository) - Settled bills and the point ledger

pub mod bill;
pub mod business;
pub mod customer;
pub mod offer;
pub mod tier;

use chrono::{DateTime, Utc};
use sqlx::SqliteConnection;
use uuid::Uuid;

use crate::error::{points_to_db, DbResult};
use loyalty_core::LedgerEntryKind;

/// Generates a new record ID.
pub fn generate_id() -> String {
    Uuid::new_v4().to_string()
}

/// Escapes `\`, `%` and `_` so user text matches literally in
/// `LIKE ... ESCAPE '\'`.
pub(crate) fn escape_like(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        if matches!(c, '\\' | '%' | '_') {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

/// A point movement about to be written to the ledger.
pub(crate) struct NewLedgerEntry<'a> {
    pub business_id: &'a str,
    pub customer_id: &'a str,
    pub kind: LedgerEntryKind,
    /// Signed: credits positive, debits negative.
    pub points: i64,
    pub bill_id: Option<&'a str>,
    pub note: Option<&'a str>,
}

/// Appends one signed movement to the point ledger.
pub(crate) async fn insert_ledger_entry(
    conn: &mut SqliteConnection,
    entry: &NewLedgerEntry<'_>,
    at: DateTime<Utc>,
) -> DbResult<()> {
    sqlx::query(
        r#"
        INSERT INTO point_ledger (id, business_id, customer_id, kind, points, bill_id, note, created_at)
        VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
        "#,
    )
    .bind(generate_id())
    .bind(entry.business_id)
    .bind(entry.customer_id)
    .bind(entry.kind)
    .bind(entry.points)
    .bind(entry.bill_id)
    .bind(entry.note)
    .bind(at)
    .execute(&mut *conn)
    .await?;

    Ok(())
}

/// Recomputes a customer's tier from their current balance.
///
/// Runs on the caller's connection so it joins the caller's transaction.
pub(crate) async fn sync_customer_tier(
    conn: &mut SqliteConnection,
    business_id: &str,
    customer_id: &str,
    points: u64,
) -> DbResult<Option<String>> {
    let tiers = tier::load_tiers(&mut *conn, business_id).await?;
    let tier_id = loyalty_core::tier::resolve_tier(&tiers, points).map(|t| t.id.clone());

    sqlx::query("UPDATE customers SET tier_id = ?1 WHERE id = ?2 AND business_id = ?3")
        .bind(tier_id.as_deref())
        .bind(customer_id)
        .bind(business_id)
        .execute(&mut *conn)
        .await?;

    Ok(tier_id)
}

/// Current balance of a customer, read on the caller's connection.
pub(crate) async fn read_balance(
    conn: &mut SqliteConnection,
    business_id: &str,
    customer_id: &str,
) -> DbResult<Option<u64>> {
    let points: Option<i64> =
        sqlx::query_scalar("SELECT points FROM customers WHERE id = ?1 AND business_id = ?2")
            .bind(customer_id)
            .bind(business_id)
            .fetch_optional(&mut *conn)
            .await?;

    points.map(crate::error::points_from_db).transpose()
}

/// Applies `points - debit + credit`, refusing to take the balance below zero.
///
/// Returns `false` when no row matched: either the customer does not exist
/// or the balance is too small.
pub(crate) async fn apply_point_delta(
    conn: &mut SqliteConnection,
    business_id: &str,
    customer_id: &str,
    debit: u64,
    credit: u64,
) -> DbResult<bool> {
    let debit = points_to_db(debit)?;
    let credit = points_to_db(credit)?;

    let result = sqlx::query(
        r#"
        UPDATE customers
        SET points = points - ?1 + ?2
        WHERE id = ?3 AND business_id = ?4 AND points >= ?1
        "#,
    )
    .bind(debit)
    .bind(credit)
    .bind(customer_id)
    .bind(business_id)
    .execute(&mut *conn)
    .await?;

    Ok(result.rows_affected() == 1)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn escape_like_neutralises_wildcards() {
        assert_eq!(escape_like("jane"), "jane");
        assert_eq!(escape_like("j_"), "j\\_");
        assert_eq!(escape_like("100%"), "100\\%");
        assert_eq!(escape_like("a\\b"), "a\\\\b");
    }
}
