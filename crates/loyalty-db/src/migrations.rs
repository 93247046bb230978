//! # Schema Migrations
//!
//! The SQL files under `migrations/sqlite/` are compiled into the binary and
//! applied by [`Database::new`](crate::Database::new) unless the config turns
//! them off.
//!
//! ```text
//! 001_initial_schema.sql   businesses, membership_tiers, customers,
//!                          offers, bills, point_ledger
//! ```
//!
//! New schema goes in a new `NNN_description.sql` file. Applied files are
//! checksummed by sqlx, so editing one breaks every existing database.

use serde::Serialize;
use sqlx::SqlitePool;
use tracing::{info, warn};

use crate::error::DbResult;

static MIGRATOR: sqlx::migrate::Migrator = sqlx::migrate!("../../migrations/sqlite");

/// Embedded versus applied migration counts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MigrationStatus {
    pub embedded: usize,
    pub applied: usize,
}

impl MigrationStatus {
    /// True when every embedded migration has been applied.
    pub fn is_current(&self) -> bool {
        self.applied >= self.embedded
    }
}

/// Applies pending migrations. Safe to call on an up-to-date database.
pub async fn run_migrations(pool: &SqlitePool) -> DbResult<()> {
    MIGRATOR.run(pool).await?;
    info!(embedded = MIGRATOR.migrations.len(), "Schema up to date");
    Ok(())
}

/// Reports how far the schema has been migrated.
///
/// A database that was never migrated has no `_sqlx_migrations` table and
/// reports zero applied.
pub async fn migration_status(pool: &SqlitePool) -> DbResult<MigrationStatus> {
    let embedded = MIGRATOR.migrations.len();

    let has_table: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = '_sqlx_migrations'",
    )
    .fetch_one(pool)
    .await?;

    let applied = if has_table == 0 {
        0
    } else {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM _sqlx_migrations WHERE success = 1")
            .fetch_one(pool)
            .await?;
        usize::try_from(count).unwrap_or_default()
    };

    let status = MigrationStatus { embedded, applied };
    if !status.is_current() {
        warn!(embedded, applied, "Schema is behind the embedded migrations");
    }
    Ok(status)
}
