//! # Storage Errors
//!
//! ```text
//! sqlx::Error ──────────┐
//!                        ├──► DbError ──► counter message / dashboard toast
//! CoreError (rejections)┘
//! ```
//!
//! Domain rejections pass through untouched as [`DbError::Core`], so a
//! caller can still match on `RedemptionRejected` after a failed checkout.

use loyalty_core::{CoreError, RedemptionRejected, ValidationError};
use sqlx::error::ErrorKind;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DbError {
    #[error("{entity} not found: {id}")]
    NotFound { entity: String, id: String },

    /// ## When This Occurs
    /// - Second customer with the same email in one business
    /// - Duplicate tier name in one business
    #[error("Duplicate {field}: '{value}' already exists")]
    UniqueViolation { field: String, value: String },

    /// Tenant or parent row missing.
    #[error("Foreign key violation: {message}")]
    ForeignKeyViolation { message: String },

    /// A guarded update matched no row, or a CHECK constraint refused it.
    ///
    /// ## When This Occurs
    /// - Another purchase spent the points between calculation and settlement
    /// - A manual adjustment would take the balance below zero
    /// - An offer reached `max_uses` concurrently
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Domain rule rejected the operation before any write happened.
    #[error(transparent)]
    Core(#[from] CoreError),

    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    /// Environment or builder configuration is unusable.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Migration failed: {0}")]
    MigrationFailed(String),

    #[error("Query failed: {0}")]
    QueryFailed(String),

    #[error("Transaction failed: {0}")]
    TransactionFailed(String),

    /// Every pooled connection stayed busy past the acquire timeout.
    #[error("Connection pool exhausted")]
    PoolExhausted,

    /// Internal database error, including stored values that no longer fit
    /// their domain type.
    #[error("Internal database error: {0}")]
    Internal(String),
}

impl DbError {
    pub fn not_found(entity: impl Into<String>, id: impl Into<String>) -> Self {
        DbError::NotFound {
            entity: entity.into(),
            id: id.into(),
        }
    }

    pub fn duplicate(field: impl Into<String>, value: impl Into<String>) -> Self {
        DbError::UniqueViolation {
            field: field.into(),
            value: value.into(),
        }
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        DbError::Conflict(message.into())
    }

    /// The redemption rejection, if that is what stopped the operation.
    pub fn redemption_rejection(&self) -> Option<RedemptionRejected> {
        match self {
            DbError::Core(CoreError::Redemption(r)) => Some(*r),
            _ => None,
        }
    }
}

impl From<ValidationError> for DbError {
    fn from(err: ValidationError) -> Self {
        DbError::Core(CoreError::Validation(err))
    }
}

impl From<RedemptionRejected> for DbError {
    fn from(err: RedemptionRejected) -> Self {
        DbError::Core(CoreError::Redemption(err))
    }
}

/// Maps driver errors onto the ledger's categories.
///
/// ```text
/// unique index       → UniqueViolation { field: "customers.email" }
/// foreign key        → ForeignKeyViolation
/// CHECK constraint   → Conflict   (e.g. points >= 0 would be broken)
/// pool timed out     → PoolExhausted
/// anything else      → QueryFailed / Internal
/// ```
impl From<sqlx::Error> for DbError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => DbError::not_found("Record", "unknown"),

            sqlx::Error::Database(db_err) => {
                let msg = db_err.message();
                match db_err.kind() {
                    ErrorKind::UniqueViolation => DbError::UniqueViolation {
                        // SQLite: "UNIQUE constraint failed: customers.business_id, customers.email"
                        field: msg.rsplit(": ").next().unwrap_or(msg).to_string(),
                        value: "unknown".to_string(),
                    },
                    ErrorKind::ForeignKeyViolation => DbError::ForeignKeyViolation {
                        message: msg.to_string(),
                    },
                    ErrorKind::CheckViolation => DbError::Conflict(msg.to_string()),
                    _ => DbError::QueryFailed(msg.to_string()),
                }
            }

            sqlx::Error::PoolTimedOut => DbError::PoolExhausted,
            sqlx::Error::PoolClosed => DbError::ConnectionFailed("pool is closed".to_string()),
            _ => DbError::Internal(err.to_string()),
        }
    }
}

impl From<sqlx::migrate::MigrateError> for DbError {
    fn from(err: sqlx::migrate::MigrateError) -> Self {
        DbError::MigrationFailed(err.to_string())
    }
}

pub type DbResult<T> = Result<T, DbError>;

// =============================================================================
// Column Conversions
// =============================================================================
// SQLite integers are i64; point counts are u64 in the domain.

pub(crate) fn points_from_db(value: i64) -> DbResult<u64> {
    u64::try_from(value).map_err(|_| DbError::Internal(format!("negative point value {value} in database")))
}

pub(crate) fn points_to_db(value: u64) -> DbResult<i64> {
    i64::try_from(value).map_err(|_| DbError::Internal(format!("point value {value} exceeds storage range")))
}

pub(crate) fn u32_from_db(column: &str, value: i64) -> DbResult<u32> {
    u32::try_from(value).map_err(|_| DbError::Internal(format!("{column} value {value} out of range")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_point_conversions() {
        assert_eq!(points_from_db(650).unwrap(), 650);
        assert!(points_from_db(-1).is_err());
        assert_eq!(points_to_db(650).unwrap(), 650);
        assert!(points_to_db(u64::MAX).is_err());
        assert!(u32_from_db("discount_bps", -5).is_err());
    }

    #[test]
    fn test_redemption_rejection_roundtrip() {
        let err: DbError = RedemptionRejected::BelowMinimum {
            requested: 100,
            minimum: 500,
        }
        .into();
        assert!(err.redemption_rejection().is_some());
        assert_eq!(
            err.to_string(),
            "Redemption rejected: minimum redeemable points is 500, requested 100"
        );
        assert!(DbError::conflict("x").redemption_rejection().is_none());
    }
}
