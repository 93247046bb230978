//! # Offer Repository
//!
//! Promotional offers and their usage counters.

use chrono::{NaiveDate, Utc};
use sqlx::SqlitePool;
use tracing::{debug, warn};

use crate::error::{u32_from_db, DbError, DbResult};
use loyalty_core::{CoreError, Money, Offer, OfferKind, OfferRejected, Percentage};

const KIND_PERCENTAGE: &str = "percentage";
const KIND_FIXED_AMOUNT: &str = "fixed_amount";

#[derive(Debug, sqlx::FromRow)]
struct OfferRow {
    id: String,
    business_id: String,
    title: String,
    description: Option<String>,
    kind: String,
    discount_value: i64,
    min_purchase_cents: i64,
    max_uses: Option<i64>,
    valid_from: NaiveDate,
    valid_until: NaiveDate,
    is_active: bool,
    used_count: i64,
}

const SELECT_OFFER: &str = r#"
    SELECT id, business_id, title, description, kind, discount_value,
           min_purchase_cents, max_uses, valid_from, valid_until, is_active, used_count
    FROM offers
"#;

impl TryFrom<OfferRow> for Offer {
    type Error = DbError;

    fn try_from(row: OfferRow) -> DbResult<Self> {
        let kind = match row.kind.as_str() {
            KIND_PERCENTAGE => OfferKind::Percentage(Percentage::from_bps(u32_from_db(
                "discount_value",
                row.discount_value,
            )?)),
            KIND_FIXED_AMOUNT => OfferKind::FixedAmount(Money::from_cents(row.discount_value)),
            other => return Err(DbError::Internal(format!("unknown offer kind '{other}'"))),
        };

        Ok(Offer {
            kind,
            max_uses: row.max_uses.map(|n| u32_from_db("max_uses", n)).transpose()?,
            used_count: u32_from_db("used_count", row.used_count)?,
            id: row.id,
            business_id: row.business_id,
            title: row.title,
            description: row.description,
            min_purchase: Money::from_cents(row.min_purchase_cents),
            valid_from: row.valid_from,
            valid_until: row.valid_until,
            is_active: row.is_active,
        })
    }
}

fn kind_to_db(kind: OfferKind) -> (&'static str, i64) {
    match kind {
        OfferKind::Percentage(pct) => (KIND_PERCENTAGE, pct.bps() as i64),
        OfferKind::FixedAmount(amount) => (KIND_FIXED_AMOUNT, amount.cents()),
    }
}

/// Repository for offer operations.
#[derive(Debug, Clone)]
pub struct OfferRepository {
    pool: SqlitePool,
}

impl OfferRepository {
    pub fn new(pool: SqlitePool) -> Self {
        OfferRepository { pool }
    }

    pub async fn insert(&self, offer: &Offer) -> DbResult<()> {
        offer.validate()?;

        debug!(id = %offer.id, business_id = %offer.business_id, title = %offer.title, "Inserting offer");

        let (kind, value) = kind_to_db(offer.kind);

        sqlx::query(
            r#"
            INSERT INTO offers (
                id, business_id, title, description, kind, discount_value,
                min_purchase_cents, max_uses, valid_from, valid_until,
                is_active, used_count, created_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)
            "#,
        )
        .bind(&offer.id)
        .bind(&offer.business_id)
        .bind(offer.title.trim())
        .bind(&offer.description)
        .bind(kind)
        .bind(value)
        .bind(offer.min_purchase.cents())
        .bind(offer.max_uses.map(i64::from))
        .bind(offer.valid_from)
        .bind(offer.valid_until)
        .bind(offer.is_active)
        .bind(offer.used_count as i64)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    pub async fn get_by_id(&self, business_id: &str, id: &str) -> DbResult<Option<Offer>> {
        let row: Option<OfferRow> = sqlx::query_as(&format!("{SELECT_OFFER} WHERE id = ?1 AND business_id = ?2"))
            .bind(id)
            .bind(business_id)
            .fetch_optional(&self.pool)
            .await?;

        row.map(Offer::try_from).transpose()
    }

    /// All offers of a business, soonest start first.
    pub async fn list_for_business(&self, business_id: &str) -> DbResult<Vec<Offer>> {
        let rows: Vec<OfferRow> =
            sqlx::query_as(&format!("{SELECT_OFFER} WHERE business_id = ?1 ORDER BY valid_from, title"))
                .bind(business_id)
                .fetch_all(&self.pool)
                .await?;

        rows.into_iter().map(Offer::try_from).collect()
    }

    pub async fn set_active(&self, business_id: &str, id: &str, active: bool) -> DbResult<()> {
        debug!(id = %id, active, "Toggling offer");

        let result = sqlx::query("UPDATE offers SET is_active = ?3 WHERE id = ?1 AND business_id = ?2")
            .bind(id)
            .bind(business_id)
            .bind(active)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Offer", id));
        }

        Ok(())
    }

    /// Counts one redemption of an offer. The increment is guarded so
    /// concurrent uses never push `used_count` past `max_uses`.
    /// Returns the new count.
    pub async fn record_use(&self, business_id: &str, id: &str) -> DbResult<u32> {
        let used: Option<i64> = sqlx::query_scalar(
            r#"
            UPDATE offers SET used_count = used_count + 1
            WHERE id = ?1 AND business_id = ?2
              AND (max_uses IS NULL OR used_count < max_uses)
            RETURNING used_count
            "#,
        )
        .bind(id)
        .bind(business_id)
        .fetch_optional(&self.pool)
        .await?;

        if let Some(used) = used {
            return u32_from_db("used_count", used);
        }

        // Guard refused the increment: either the offer is gone or it is used up.
        let offer = self
            .get_by_id(business_id, id)
            .await?
            .ok_or_else(|| DbError::not_found("Offer", id))?;

        warn!(id = %id, used = offer.used_count, "Offer usage limit reached");
        Err(DbError::Core(CoreError::Offer(OfferRejected::UsageExhausted {
            max_uses: offer.max_uses.unwrap_or(offer.used_count),
        })))
    }
}
