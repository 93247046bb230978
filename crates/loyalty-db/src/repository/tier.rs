//! # Tier Repository
//!
//! Membership tiers per business, always read in threshold order.

use chrono::Utc;
use sqlx::{Sqlite, SqlitePool};
use tracing::debug;

use crate::error::{points_from_db, points_to_db, u32_from_db, DbError, DbResult};
use loyalty_core::validation::{validate_discount_bps, validate_name};
use loyalty_core::{MembershipTier, Percentage};

#[derive(Debug, sqlx::FromRow)]
struct TierRow {
    id: String,
    business_id: String,
    name: String,
    description: Option<String>,
    points_required: i64,
    discount_bps: i64,
    benefits: String,
    color: Option<String>,
}

impl TryFrom<TierRow> for MembershipTier {
    type Error = DbError;

    fn try_from(row: TierRow) -> DbResult<Self> {
        let benefits: Vec<String> = serde_json::from_str(&row.benefits)
            .map_err(|e| DbError::Internal(format!("tier {} benefits: {e}", row.id)))?;

        Ok(MembershipTier {
            points_required: points_from_db(row.points_required)?,
            discount: Percentage::from_bps(u32_from_db("discount_bps", row.discount_bps)?),
            id: row.id,
            business_id: row.business_id,
            name: row.name,
            description: row.description,
            benefits,
            color: row.color,
        })
    }
}

/// Loads a business's tiers on any executor (pool or open transaction).
pub(crate) async fn load_tiers<'e, E>(executor: E, business_id: &str) -> DbResult<Vec<MembershipTier>>
where
    E: sqlx::Executor<'e, Database = Sqlite>,
{
    let rows: Vec<TierRow> = sqlx::query_as(
        r#"
        SELECT id, business_id, name, description, points_required, discount_bps, benefits, color
        FROM membership_tiers
        WHERE business_id = ?1
        ORDER BY points_required ASC
        "#,
    )
    .bind(business_id)
    .fetch_all(executor)
    .await?;

    rows.into_iter().map(MembershipTier::try_from).collect()
}

/// Repository for membership tier operations.
#[derive(Debug, Clone)]
pub struct TierRepository {
    pool: SqlitePool,
}

impl TierRepository {
    pub fn new(pool: SqlitePool) -> Self {
        TierRepository { pool }
    }

    /// Inserts a tier after validating its name and discount.
    pub async fn insert(&self, tier: &MembershipTier) -> DbResult<()> {
        let name = validate_name("name", &tier.name, 50)?;
        validate_discount_bps(tier.discount.bps())?;

        debug!(
            id = %tier.id,
            business_id = %tier.business_id,
            name = %name,
            points_required = tier.points_required,
            "Inserting membership tier"
        );

        let benefits = serde_json::to_string(&tier.benefits)
            .map_err(|e| DbError::Internal(e.to_string()))?;

        sqlx::query(
            r#"
            INSERT INTO membership_tiers (
                id, business_id, name, description,
                points_required, discount_bps, benefits, color, created_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
            "#,
        )
        .bind(&tier.id)
        .bind(&tier.business_id)
        .bind(&name)
        .bind(&tier.description)
        .bind(points_to_db(tier.points_required)?)
        .bind(tier.discount.bps() as i64)
        .bind(benefits)
        .bind(&tier.color)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Tiers of one business, lowest threshold first.
    pub async fn list_for_business(&self, business_id: &str) -> DbResult<Vec<MembershipTier>> {
        load_tiers(&self.pool, business_id).await
    }

    pub async fn get_by_id(&self, business_id: &str, id: &str) -> DbResult<Option<MembershipTier>> {
        let row: Option<TierRow> = sqlx::query_as(
            r#"
            SELECT id, business_id, name, description, points_required, discount_bps, benefits, color
            FROM membership_tiers
            WHERE id = ?1 AND business_id = ?2
            "#,
        )
        .bind(id)
        .bind(business_id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(MembershipTier::try_from).transpose()
    }

    /// Deletes a tier. Customers on it fall back to no tier until their
    /// next balance change.
    pub async fn delete(&self, business_id: &str, id: &str) -> DbResult<()> {
        debug!(id = %id, business_id = %business_id, "Deleting membership tier");

        let result = sqlx::query("DELETE FROM membership_tiers WHERE id = ?1 AND business_id = ?2")
            .bind(id)
            .bind(business_id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("MembershipTier", id));
        }

        Ok(())
    }
}
