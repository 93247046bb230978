//! # Bill Repository
//!
//! Settles computed bills and keeps the point ledger.
//!
//! ## Settlement
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                       record(breakdown)                                 │
//! │                                                                         │
//! │  BEGIN                                                                  │
//! │   1. UPDATE customers SET points = points - redeemed + earned           │
//! │        WHERE points >= redeemed           0 rows → DbError::Conflict    │
//! │   2. SELECT points                        → balance_after               │
//! │   3. INSERT INTO bills                    amounts rounded once          │
//! │   4. INSERT INTO point_ledger             redemption (-), accrual (+)   │
//! │   5. UPDATE total_spent, last_purchase_at                               │
//! │   6. UPDATE tier_id                       from balance_after            │
//! │  COMMIT                                                                 │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Two counters settling against the same customer serialize on SQLite's
//! write lock; the guard in step 1 stops the second from spending points the
//! first already spent.

use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use tracing::{debug, info, warn};

use super::{apply_point_delta, generate_id, insert_ledger_entry, read_balance, sync_customer_tier, NewLedgerEntry};
use crate::error::{points_from_db, points_to_db, DbError, DbResult};
use loyalty_core::ledger::BillBreakdown;
use loyalty_core::{Bill, LedgerEntry, LedgerEntryKind};

#[derive(Debug, sqlx::FromRow)]
struct BillRow {
    id: String,
    business_id: String,
    customer_id: String,
    purchase_cents: i64,
    discount_cents: i64,
    redemption_cents: i64,
    total_cents: i64,
    points_redeemed: i64,
    points_earned: i64,
    balance_after: i64,
    created_at: DateTime<Utc>,
}

const SELECT_BILL: &str = r#"
    SELECT id, business_id, customer_id, purchase_cents, discount_cents,
           redemption_cents, total_cents, points_redeemed, points_earned,
           balance_after, created_at
    FROM bills
"#;

impl TryFrom<BillRow> for Bill {
    type Error = DbError;

    fn try_from(row: BillRow) -> DbResult<Self> {
        Ok(Bill {
            points_redeemed: points_from_db(row.points_redeemed)?,
            points_earned: points_from_db(row.points_earned)?,
            balance_after: points_from_db(row.balance_after)?,
            id: row.id,
            business_id: row.business_id,
            customer_id: row.customer_id,
            purchase_cents: row.purchase_cents,
            discount_cents: row.discount_cents,
            redemption_cents: row.redemption_cents,
            total_cents: row.total_cents,
            created_at: row.created_at,
        })
    }
}

#[derive(Debug, sqlx::FromRow)]
struct LedgerRow {
    id: String,
    business_id: String,
    customer_id: String,
    kind: LedgerEntryKind,
    points: i64,
    bill_id: Option<String>,
    note: Option<String>,
    created_at: DateTime<Utc>,
}

impl From<LedgerRow> for LedgerEntry {
    fn from(row: LedgerRow) -> Self {
        LedgerEntry {
            id: row.id,
            business_id: row.business_id,
            customer_id: row.customer_id,
            kind: row.kind,
            points: row.points,
            bill_id: row.bill_id,
            note: row.note,
            created_at: row.created_at,
        }
    }
}

/// Repository for bills and the point ledger.
#[derive(Debug, Clone)]
pub struct BillRepository {
    pool: SqlitePool,
}

impl BillRepository {
    pub fn new(pool: SqlitePool) -> Self {
        BillRepository { pool }
    }

    /// Persists a computed bill and applies its point delta atomically.
    ///
    /// The breakdown's redemption was validated against the balance the
    /// caller read; if that balance has since dropped below the redeemed
    /// amount nothing is written and [`DbError::Conflict`] is returned.
    pub async fn record(
        &self,
        business_id: &str,
        customer_id: &str,
        breakdown: &BillBreakdown,
    ) -> DbResult<Bill> {
        let delta = breakdown.delta;
        let id = generate_id();
        let now = Utc::now();

        debug!(
            id = %id,
            customer_id = %customer_id,
            redeemed = delta.redeemed,
            earned = delta.earned,
            "Recording bill"
        );

        let mut tx = self.pool.begin().await?;

        if !apply_point_delta(&mut tx, business_id, customer_id, delta.redeemed, delta.earned).await? {
            return match read_balance(&mut tx, business_id, customer_id).await? {
                None => Err(DbError::not_found("Customer", customer_id)),
                Some(balance) => {
                    warn!(
                        customer_id = %customer_id,
                        balance,
                        redeemed = delta.redeemed,
                        "Balance changed before settlement"
                    );
                    Err(DbError::conflict(format!(
                        "balance is now {balance}, cannot redeem {}",
                        delta.redeemed
                    )))
                }
            };
        }

        let balance_after = read_balance(&mut tx, business_id, customer_id)
            .await?
            .ok_or_else(|| DbError::not_found("Customer", customer_id))?;

        let bill = Bill {
            id: id.clone(),
            business_id: business_id.to_string(),
            customer_id: customer_id.to_string(),
            purchase_cents: breakdown.purchase.cents(),
            discount_cents: breakdown.discount_display().cents(),
            redemption_cents: breakdown.redemption_display().cents(),
            total_cents: breakdown.total_display().cents(),
            points_redeemed: delta.redeemed,
            points_earned: delta.earned,
            balance_after,
            created_at: now,
        };

        sqlx::query(
            r#"
            INSERT INTO bills (
                id, business_id, customer_id,
                purchase_cents, discount_cents, redemption_cents, total_cents,
                points_redeemed, points_earned, balance_after, created_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)
            "#,
        )
        .bind(&bill.id)
        .bind(&bill.business_id)
        .bind(&bill.customer_id)
        .bind(bill.purchase_cents)
        .bind(bill.discount_cents)
        .bind(bill.redemption_cents)
        .bind(bill.total_cents)
        .bind(points_to_db(bill.points_redeemed)?)
        .bind(points_to_db(bill.points_earned)?)
        .bind(points_to_db(bill.balance_after)?)
        .bind(bill.created_at)
        .execute(&mut *tx)
        .await?;

        let movements = [
            (LedgerEntryKind::Redemption, -points_to_db(delta.redeemed)?),
            (LedgerEntryKind::Accrual, points_to_db(delta.earned)?),
        ];
        for (kind, points) in movements.into_iter().filter(|(_, p)| *p != 0) {
            insert_ledger_entry(
                &mut tx,
                &NewLedgerEntry {
                    business_id,
                    customer_id,
                    kind,
                    points,
                    bill_id: Some(id.as_str()),
                    note: None,
                },
                now,
            )
            .await?;
        }

        // a negative bill never reduces lifetime spend
        sqlx::query(
            r#"
            UPDATE customers
            SET total_spent_cents = total_spent_cents + ?3, last_purchase_at = ?4
            WHERE id = ?1 AND business_id = ?2
            "#,
        )
        .bind(customer_id)
        .bind(business_id)
        .bind(bill.total_cents.max(0))
        .bind(now)
        .execute(&mut *tx)
        .await?;

        sync_customer_tier(&mut tx, business_id, customer_id, balance_after).await?;

        tx.commit().await?;

        info!(
            id = %bill.id,
            customer_id = %customer_id,
            total = %bill.total(),
            balance_after,
            "Bill settled"
        );

        Ok(bill)
    }

    pub async fn get_by_id(&self, business_id: &str, id: &str) -> DbResult<Option<Bill>> {
        let row: Option<BillRow> = sqlx::query_as(&format!("{SELECT_BILL} WHERE id = ?1 AND business_id = ?2"))
            .bind(id)
            .bind(business_id)
            .fetch_optional(&self.pool)
            .await?;

        row.map(Bill::try_from).transpose()
    }

    /// Most recent bills first.
    pub async fn list_for_customer(&self, business_id: &str, customer_id: &str, limit: u32) -> DbResult<Vec<Bill>> {
        let rows: Vec<BillRow> = sqlx::query_as(&format!(
            "{SELECT_BILL} WHERE business_id = ?1 AND customer_id = ?2 ORDER BY created_at DESC, rowid DESC LIMIT ?3"
        ))
        .bind(business_id)
        .bind(customer_id)
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(Bill::try_from).collect()
    }

    /// Every point movement of a customer, oldest first.
    pub async fn ledger_for_customer(&self, business_id: &str, customer_id: &str) -> DbResult<Vec<LedgerEntry>> {
        let rows: Vec<LedgerRow> = sqlx::query_as(
            r#"
            SELECT id, business_id, customer_id, kind, points, bill_id, note, created_at
            FROM point_ledger
            WHERE business_id = ?1 AND customer_id = ?2
            ORDER BY created_at ASC, rowid ASC
            "#,
        )
        .bind(business_id)
        .bind(customer_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(LedgerEntry::from).collect())
    }
}
