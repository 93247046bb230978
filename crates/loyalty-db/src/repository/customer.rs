//! # Customer Repository
//!
//! Members of a business's loyalty program and their point balances.
//!
//! ## Balance Mutations
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Every balance change is one transaction:                               │
//! │                                                                         │
//! │   BEGIN                                                                 │
//! │     UPDATE customers SET points = points - debit + credit               │
//! │       WHERE id = ? AND points >= debit      ← guard, 0 rows = conflict  │
//! │     INSERT INTO point_ledger (...)          ← one row per movement      │
//! │     UPDATE customers SET tier_id = ?        ← re-resolve tier           │
//! │   COMMIT                                                                │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::{DateTime, NaiveDate, Utc};
use sqlx::SqlitePool;
use tracing::{debug, info, warn};

use super::{
    apply_point_delta, escape_like, generate_id, insert_ledger_entry, read_balance, sync_customer_tier,
    NewLedgerEntry,
};
use crate::error::{points_from_db, DbError, DbResult};
use loyalty_core::validation::{validate_email, validate_name, validate_search_query};
use loyalty_core::{BonusKind, BonusSchedule, Customer, LedgerEntryKind};

#[derive(Debug, sqlx::FromRow)]
pub(crate) struct CustomerRow {
    id: String,
    business_id: String,
    first_name: String,
    last_name: String,
    email: String,
    phone: Option<String>,
    tier_id: Option<String>,
    points: i64,
    total_spent_cents: i64,
    birthday: Option<NaiveDate>,
    joined_at: DateTime<Utc>,
    last_purchase_at: Option<DateTime<Utc>>,
}

pub(crate) const SELECT_CUSTOMER: &str = r#"
    SELECT id, business_id, first_name, last_name, email, phone, tier_id,
           points, total_spent_cents, birthday, joined_at, last_purchase_at
    FROM customers
"#;

impl TryFrom<CustomerRow> for Customer {
    type Error = DbError;

    fn try_from(row: CustomerRow) -> DbResult<Self> {
        Ok(Customer {
            points: points_from_db(row.points)?,
            id: row.id,
            business_id: row.business_id,
            first_name: row.first_name,
            last_name: row.last_name,
            email: row.email,
            phone: row.phone,
            tier_id: row.tier_id,
            total_spent_cents: row.total_spent_cents,
            birthday: row.birthday,
            joined_at: row.joined_at,
            last_purchase_at: row.last_purchase_at,
        })
    }
}

/// Fields a dashboard submits to enrol a customer.
#[derive(Debug, Clone, Default)]
pub struct NewCustomer {
    pub business_id: String,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone: Option<String>,
    pub birthday: Option<NaiveDate>,
}

/// Repository for customer operations.
#[derive(Debug, Clone)]
pub struct CustomerRepository {
    pool: SqlitePool,
}

impl CustomerRepository {
    pub fn new(pool: SqlitePool) -> Self {
        CustomerRepository { pool }
    }

    /// Enrols a customer and credits the business's welcome bonus in the
    /// same transaction.
    pub async fn insert(&self, new: &NewCustomer) -> DbResult<Customer> {
        let first_name = validate_name("first_name", &new.first_name, 50)?;
        let last_name = validate_name("last_name", &new.last_name, 50)?;
        let email = validate_email(&new.email)?;

        let bonuses = self.bonus_schedule(&new.business_id).await?;
        let welcome = bonuses.points_for(BonusKind::Welcome);

        let id = generate_id();
        let now = Utc::now();

        debug!(id = %id, business_id = %new.business_id, welcome, "Enrolling customer");

        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r#"
            INSERT INTO customers (
                id, business_id, first_name, last_name, email, phone,
                tier_id, points, total_spent_cents, birthday, joined_at, last_purchase_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, NULL, 0, 0, ?7, ?8, NULL)
            "#,
        )
        .bind(&id)
        .bind(&new.business_id)
        .bind(&first_name)
        .bind(&last_name)
        .bind(&email)
        .bind(&new.phone)
        .bind(new.birthday)
        .bind(now)
        .execute(&mut *tx)
        .await?;

        if welcome > 0 {
            apply_point_delta(&mut tx, &new.business_id, &id, 0, welcome).await?;
            insert_ledger_entry(
                &mut tx,
                &NewLedgerEntry {
                    business_id: &new.business_id,
                    customer_id: &id,
                    kind: LedgerEntryKind::Bonus,
                    points: welcome as i64,
                    bill_id: None,
                    note: Some("welcome"),
                },
                now,
            )
            .await?;
        }

        sync_customer_tier(&mut tx, &new.business_id, &id, welcome).await?;

        let row: CustomerRow = sqlx::query_as(&format!("{SELECT_CUSTOMER} WHERE id = ?1"))
            .bind(&id)
            .fetch_one(&mut *tx)
            .await?;

        tx.commit().await?;

        info!(id = %id, business_id = %new.business_id, points = welcome, "Customer enrolled");

        Customer::try_from(row)
    }

    pub async fn get_by_id(&self, business_id: &str, id: &str) -> DbResult<Option<Customer>> {
        let row: Option<CustomerRow> =
            sqlx::query_as(&format!("{SELECT_CUSTOMER} WHERE id = ?1 AND business_id = ?2"))
                .bind(id)
                .bind(business_id)
                .fetch_optional(&self.pool)
                .await?;

        row.map(Customer::try_from).transpose()
    }

    /// Searches by first name, last name or email (case-insensitive prefix
    /// on names, substring on email). An empty query lists everyone.
    pub async fn search(&self, business_id: &str, query: &str, limit: u32) -> DbResult<Vec<Customer>> {
        let query = validate_search_query(query)?;

        debug!(business_id = %business_id, query = %query, limit, "Searching customers");

        let needle = escape_like(&query.to_lowercase());
        let name_pattern = format!("{needle}%");
        let email_pattern = format!("%{needle}%");

        let rows: Vec<CustomerRow> = sqlx::query_as(&format!(
            r#"{SELECT_CUSTOMER}
            WHERE business_id = ?1
              AND (?2 = ''
                   OR lower(first_name) LIKE ?3 ESCAPE '\'
                   OR lower(last_name) LIKE ?3 ESCAPE '\'
                   OR lower(first_name || ' ' || last_name) LIKE ?3 ESCAPE '\'
                   OR email LIKE ?4 ESCAPE '\')
            ORDER BY last_name, first_name
            LIMIT ?5
            "#
        ))
        .bind(business_id)
        .bind(&query)
        .bind(&name_pattern)
        .bind(&email_pattern)
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(Customer::try_from).collect()
    }

    pub async fn count(&self, business_id: &str) -> DbResult<u64> {
        let n: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM customers WHERE business_id = ?1")
            .bind(business_id)
            .fetch_one(&self.pool)
            .await?;

        points_from_db(n)
    }

    /// Credits a birthday, referral or welcome bonus from the business's
    /// schedule. Returns the new balance.
    pub async fn award_bonus(&self, business_id: &str, customer_id: &str, kind: BonusKind) -> DbResult<u64> {
        let points = self.bonus_schedule(business_id).await?.points_for(kind);

        debug!(customer_id = %customer_id, ?kind, points, "Awarding bonus");

        let note = match kind {
            BonusKind::Welcome => "welcome",
            BonusKind::Birthday => "birthday",
            BonusKind::Referral => "referral",
        };

        self.change_balance(business_id, customer_id, points as i64, LedgerEntryKind::Bonus, Some(note))
            .await
    }

    /// Manual correction from the dashboard. A debit larger than the balance
    /// is refused with [`DbError::Conflict`]. Returns the new balance.
    pub async fn adjust_points(
        &self,
        business_id: &str,
        customer_id: &str,
        delta: i64,
        note: Option<&str>,
    ) -> DbResult<u64> {
        debug!(customer_id = %customer_id, delta, "Adjusting points");

        self.change_balance(business_id, customer_id, delta, LedgerEntryKind::Adjustment, note)
            .await
    }

    async fn change_balance(
        &self,
        business_id: &str,
        customer_id: &str,
        delta: i64,
        kind: LedgerEntryKind,
        note: Option<&str>,
    ) -> DbResult<u64> {
        let (debit, credit) = if delta < 0 {
            (delta.unsigned_abs(), 0)
        } else {
            (0, delta as u64)
        };

        let mut tx = self.pool.begin().await?;

        if !apply_point_delta(&mut tx, business_id, customer_id, debit, credit).await? {
            return match read_balance(&mut tx, business_id, customer_id).await? {
                None => Err(DbError::not_found("Customer", customer_id)),
                Some(balance) => {
                    warn!(customer_id = %customer_id, balance, delta, "Adjustment would make balance negative");
                    Err(DbError::conflict(format!(
                        "cannot debit {debit} points from a balance of {balance}"
                    )))
                }
            };
        }

        let balance = read_balance(&mut tx, business_id, customer_id)
            .await?
            .ok_or_else(|| DbError::not_found("Customer", customer_id))?;

        if delta != 0 {
            insert_ledger_entry(
                &mut tx,
                &NewLedgerEntry {
                    business_id,
                    customer_id,
                    kind,
                    points: delta,
                    bill_id: None,
                    note,
                },
                Utc::now(),
            )
            .await?;
        }

        sync_customer_tier(&mut tx, business_id, customer_id, balance).await?;

        tx.commit().await?;

        Ok(balance)
    }

    async fn bonus_schedule(&self, business_id: &str) -> DbResult<BonusSchedule> {
        let row: Option<(i64, i64, i64)> = sqlx::query_as(
            "SELECT welcome_bonus, birthday_bonus, referral_bonus FROM businesses WHERE id = ?1",
        )
        .bind(business_id)
        .fetch_optional(&self.pool)
        .await?;

        let (welcome, birthday, referral) = row.ok_or_else(|| DbError::not_found("Business", business_id))?;

        Ok(BonusSchedule {
            welcome: points_from_db(welcome)?,
            birthday: points_from_db(birthday)?,
            referral: points_from_db(referral)?,
        })
    }
}
