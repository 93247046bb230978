//! # Business Repository
//!
//! Businesses (tenants) and their loyalty program settings.
//!
//! ## Stored Redemption Rate
//! ```text
//! redemption_convention   redemption_rate   LoyaltyConfig.redemption_rate
//! ─────────────────────   ───────────────   ─────────────────────────────
//! 'value_per_point'       50000             ValuePerPoint($0.05 / point)
//! 'points_per_currency'   100               PointsPerCurrency(100 pts = $1)
//! ```

use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use tracing::{debug, info};

use crate::error::{points_from_db, points_to_db, u32_from_db, DbError, DbResult};
use loyalty_core::validation::validate_name;
use loyalty_core::{
    BonusSchedule, Business, EarnRate, LoyaltyConfig, Percentage, PointValue, PointsPerCurrency,
    RedemptionRate,
};

const CONVENTION_VALUE_PER_POINT: &str = "value_per_point";
const CONVENTION_POINTS_PER_CURRENCY: &str = "points_per_currency";

#[derive(Debug, sqlx::FromRow)]
struct BusinessRow {
    id: String,
    name: String,
    description: Option<String>,
    email: Option<String>,
    phone: Option<String>,
    address: Option<String>,
    website: Option<String>,
    earn_rate_millipoints: i64,
    redemption_convention: String,
    redemption_rate: i64,
    min_redeem_points: i64,
    welcome_bonus: i64,
    birthday_bonus: i64,
    referral_bonus: i64,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

const SELECT_BUSINESS: &str = r#"
    SELECT id, name, description, email, phone, address, website,
           earn_rate_millipoints, redemption_convention, redemption_rate,
           min_redeem_points, welcome_bonus, birthday_bonus, referral_bonus,
           created_at, updated_at
    FROM businesses
"#;

fn redemption_rate_from_db(convention: &str, rate: i64) -> DbResult<RedemptionRate> {
    let rate = u32_from_db("redemption_rate", rate)?;
    match convention {
        CONVENTION_VALUE_PER_POINT => Ok(RedemptionRate::ValuePerPoint(PointValue::from_micros(rate))),
        CONVENTION_POINTS_PER_CURRENCY => Ok(RedemptionRate::PointsPerCurrency(PointsPerCurrency::new(rate)?)),
        other => Err(DbError::Internal(format!("unknown redemption convention '{other}'"))),
    }
}

fn redemption_rate_to_db(rate: RedemptionRate) -> (&'static str, i64) {
    match rate {
        RedemptionRate::ValuePerPoint(v) => (CONVENTION_VALUE_PER_POINT, v.micros() as i64),
        RedemptionRate::PointsPerCurrency(n) => (CONVENTION_POINTS_PER_CURRENCY, n.get() as i64),
    }
}

impl TryFrom<BusinessRow> for Business {
    type Error = DbError;

    fn try_from(row: BusinessRow) -> DbResult<Self> {
        let loyalty = LoyaltyConfig {
            earn_rate: EarnRate::from_millipoints(u32_from_db("earn_rate_millipoints", row.earn_rate_millipoints)?),
            redemption_rate: redemption_rate_from_db(&row.redemption_convention, row.redemption_rate)?,
            min_redeem_points: points_from_db(row.min_redeem_points)?,
            // tier discounts live on tiers; the business-level config has none
            discount: Percentage::zero(),
            bonuses: BonusSchedule {
                welcome: points_from_db(row.welcome_bonus)?,
                birthday: points_from_db(row.birthday_bonus)?,
                referral: points_from_db(row.referral_bonus)?,
            },
        };

        Ok(Business {
            id: row.id,
            name: row.name,
            description: row.description,
            email: row.email,
            phone: row.phone,
            address: row.address,
            website: row.website,
            loyalty,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

/// Repository for business operations.
#[derive(Debug, Clone)]
pub struct BusinessRepository {
    pool: SqlitePool,
}

impl BusinessRepository {
    pub fn new(pool: SqlitePool) -> Self {
        BusinessRepository { pool }
    }

    /// Inserts a business with its loyalty settings.
    pub async fn insert(&self, business: &Business) -> DbResult<()> {
        let name = validate_name("name", &business.name, 100)?;
        business.loyalty.validate()?;

        info!(id = %business.id, name = %name, "Registering business");

        let (convention, rate) = redemption_rate_to_db(business.loyalty.redemption_rate);
        let bonuses = business.loyalty.bonuses;

        sqlx::query(
            r#"
            INSERT INTO businesses (
                id, name, description, email, phone, address, website,
                earn_rate_millipoints, redemption_convention, redemption_rate,
                min_redeem_points, welcome_bonus, birthday_bonus, referral_bonus,
                created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16)
            "#,
        )
        .bind(&business.id)
        .bind(&name)
        .bind(&business.description)
        .bind(&business.email)
        .bind(&business.phone)
        .bind(&business.address)
        .bind(&business.website)
        .bind(business.loyalty.earn_rate.millipoints() as i64)
        .bind(convention)
        .bind(rate)
        .bind(points_to_db(business.loyalty.min_redeem_points)?)
        .bind(points_to_db(bonuses.welcome)?)
        .bind(points_to_db(bonuses.birthday)?)
        .bind(points_to_db(bonuses.referral)?)
        .bind(business.created_at)
        .bind(business.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Business>> {
        let row: Option<BusinessRow> = sqlx::query_as(&format!("{SELECT_BUSINESS} WHERE id = ?1"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        row.map(Business::try_from).transpose()
    }

    /// Replaces a business's loyalty settings. The `discount` field is
    /// ignored; tier discounts are stored on tiers.
    pub async fn update_loyalty_config(&self, id: &str, config: &LoyaltyConfig) -> DbResult<()> {
        config.validate()?;

        debug!(
            id = %id,
            earn_millipoints = config.earn_rate.millipoints(),
            min_redeem_points = config.min_redeem_points,
            "Updating loyalty config"
        );

        let (convention, rate) = redemption_rate_to_db(config.redemption_rate);

        let result = sqlx::query(
            r#"
            UPDATE businesses SET
                earn_rate_millipoints = ?2,
                redemption_convention = ?3,
                redemption_rate = ?4,
                min_redeem_points = ?5,
                welcome_bonus = ?6,
                birthday_bonus = ?7,
                referral_bonus = ?8,
                updated_at = ?9
            WHERE id = ?1
            "#,
        )
        .bind(id)
        .bind(config.earn_rate.millipoints() as i64)
        .bind(convention)
        .bind(rate)
        .bind(points_to_db(config.min_redeem_points)?)
        .bind(points_to_db(config.bonuses.welcome)?)
        .bind(points_to_db(config.bonuses.birthday)?)
        .bind(points_to_db(config.bonuses.referral)?)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Business", id));
        }

        Ok(())
    }

    pub async fn list(&self) -> DbResult<Vec<Business>> {
        let rows: Vec<BusinessRow> = sqlx::query_as(&format!("{SELECT_BUSINESS} ORDER BY name"))
            .fetch_all(&self.pool)
            .await?;

        rows.into_iter().map(Business::try_from).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_redemption_rate_column_mapping() {
        let a = RedemptionRate::ValuePerPoint(PointValue::from_cents(5));
        let (conv, rate) = redemption_rate_to_db(a);
        assert_eq!((conv, rate), ("value_per_point", 50_000));
        assert_eq!(redemption_rate_from_db(conv, rate).unwrap(), a);

        let b = RedemptionRate::default();
        let (conv, rate) = redemption_rate_to_db(b);
        assert_eq!((conv, rate), ("points_per_currency", 100));
        assert_eq!(redemption_rate_from_db(conv, rate).unwrap(), b);
    }

    #[test]
    fn test_redemption_rate_rejects_bad_rows() {
        assert!(redemption_rate_from_db("points_per_currency", 0).is_err());
        assert!(redemption_rate_from_db("dollars_per_point", 5).is_err());
        assert!(redemption_rate_from_db("value_per_point", -1).is_err());
    }
}
