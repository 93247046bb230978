//! # Database Handle
//!
//! [`DbConfig`] says where the ledger lives and how many connections may
//! touch it; [`Database`] owns the pool and hands out repositories.
//!
//! ```text
//! DbConfig::from_env()?            LOYALTY_DB_PATH, LOYALTY_DB_MAX_CONNECTIONS
//!     │
//!     ▼
//! Database::new(config).await?     WAL + foreign keys + busy timeout,
//!     │                            then embedded migrations
//!     ▼
//! db.customers() / db.bills() / db.checkout(..)
//! ```
//!
//! WAL lets dashboards read while a checkout transaction holds the write
//! lock. Two counters settling at once queue on `busy_timeout` instead of
//! failing with `SQLITE_BUSY`.

use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous};
use sqlx::SqlitePool;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;
use tracing::{debug, info};

use crate::error::{DbError, DbResult};
use crate::migrations::{self, MigrationStatus};
use crate::repository::bill::BillRepository;
use crate::repository::business::BusinessRepository;
use crate::repository::customer::CustomerRepository;
use crate::repository::offer::OfferRepository;
use crate::repository::tier::TierRepository;

/// Environment variable holding the database file path.
pub const ENV_DB_PATH: &str = "LOYALTY_DB_PATH";

/// Environment variable holding the maximum pool size.
pub const ENV_DB_MAX_CONNECTIONS: &str = "LOYALTY_DB_MAX_CONNECTIONS";

/// Database file used when nothing is configured.
pub const DEFAULT_DB_PATH: &str = "loyalty.db";

pub const DEFAULT_MAX_CONNECTIONS: u32 = 5;
pub const DEFAULT_ACQUIRE_TIMEOUT: Duration = Duration::from_secs(30);
pub const DEFAULT_BUSY_TIMEOUT: Duration = Duration::from_secs(5);

const IN_MEMORY: &str = ":memory:";

// =============================================================================
// Configuration
// =============================================================================

/// Where the ledger database lives and how the pool is sized.
///
/// ```rust
/// use loyalty_db::DbConfig;
///
/// let config = DbConfig::new("/var/lib/loyalty/hub.db").max_connections(8);
/// assert_eq!(config.max_connections, 8);
/// assert!(config.run_migrations);
/// ```
#[derive(Debug, Clone)]
pub struct DbConfig {
    /// SQLite file, created on first connect. `:memory:` for a throwaway
    /// database.
    pub database_path: PathBuf,
    pub max_connections: u32,
    pub min_connections: u32,
    /// How long a caller waits for a free pooled connection.
    pub acquire_timeout: Duration,
    /// How long a writer waits on another writer's lock.
    pub busy_timeout: Duration,
    pub run_migrations: bool,
}

impl Default for DbConfig {
    fn default() -> Self {
        DbConfig::new(DEFAULT_DB_PATH)
    }
}

impl DbConfig {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        DbConfig {
            database_path: path.into(),
            max_connections: DEFAULT_MAX_CONNECTIONS,
            min_connections: 1,
            acquire_timeout: DEFAULT_ACQUIRE_TIMEOUT,
            busy_timeout: DEFAULT_BUSY_TIMEOUT,
            run_migrations: true,
        }
    }

    /// Reads `LOYALTY_DB_PATH` and `LOYALTY_DB_MAX_CONNECTIONS`.
    ///
    /// Unset variables fall back to the defaults; a pool size that is not a
    /// positive integer is an error.
    pub fn from_env() -> DbResult<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> DbResult<Self> {
        let mut config = match lookup(ENV_DB_PATH) {
            Some(path) if !path.trim().is_empty() => DbConfig::new(path.trim()),
            _ => DbConfig::default(),
        };

        if let Some(raw) = lookup(ENV_DB_MAX_CONNECTIONS) {
            let max = raw
                .trim()
                .parse::<u32>()
                .ok()
                .filter(|n| *n > 0)
                .ok_or_else(|| {
                    DbError::InvalidConfig(format!("{ENV_DB_MAX_CONNECTIONS} must be a positive integer, got '{raw}'"))
                })?;
            config = config.max_connections(max);
        }

        Ok(config)
    }

    /// Sets the pool ceiling, lowering the floor if it would exceed it.
    pub fn max_connections(mut self, max: u32) -> Self {
        self.max_connections = max;
        self.min_connections = self.min_connections.min(max);
        self
    }

    pub fn min_connections(mut self, min: u32) -> Self {
        self.min_connections = min;
        self
    }

    pub fn acquire_timeout(mut self, timeout: Duration) -> Self {
        self.acquire_timeout = timeout;
        self
    }

    pub fn busy_timeout(mut self, timeout: Duration) -> Self {
        self.busy_timeout = timeout;
        self
    }

    pub fn run_migrations(mut self, run: bool) -> Self {
        self.run_migrations = run;
        self
    }

    /// A private in-memory database, migrated on connect.
    ///
    /// Pinned to one connection: every SQLite in-memory connection opens a
    /// separate, empty database.
    pub fn in_memory() -> Self {
        DbConfig::new(IN_MEMORY)
            .max_connections(1)
            .acquire_timeout(Duration::from_secs(5))
    }

    fn is_in_memory(&self) -> bool {
        self.database_path.as_os_str() == IN_MEMORY
    }

    fn connect_options(&self) -> DbResult<SqliteConnectOptions> {
        let url = if self.is_in_memory() {
            "sqlite::memory:".to_string()
        } else {
            format!("sqlite://{}", self.database_path.display())
        };

        let options = SqliteConnectOptions::from_str(&url)
            .map_err(|e| DbError::InvalidConfig(format!("{}: {e}", self.database_path.display())))?
            .create_if_missing(true)
            .foreign_keys(true)
            .busy_timeout(self.busy_timeout);

        // WAL needs a file on disk
        Ok(if self.is_in_memory() {
            options
        } else {
            options
                .journal_mode(SqliteJournalMode::Wal)
                .synchronous(SqliteSynchronous::Normal)
        })
    }
}

// =============================================================================
// Database
// =============================================================================

/// Pool handle. Clones share the pool.
#[derive(Debug, Clone)]
pub struct Database {
    pool: SqlitePool,
}

impl Database {
    /// Opens the pool and, unless disabled, brings the schema up to date.
    pub async fn new(config: DbConfig) -> DbResult<Self> {
        let options = config.connect_options()?;
        debug!(
            path = %config.database_path.display(),
            busy_timeout_ms = config.busy_timeout.as_millis() as u64,
            "Connecting to ledger database"
        );

        let pool = SqlitePoolOptions::new()
            .max_connections(config.max_connections)
            .min_connections(config.min_connections)
            .acquire_timeout(config.acquire_timeout)
            .connect_with(options)
            .await
            .map_err(|e| DbError::ConnectionFailed(e.to_string()))?;

        info!(
            path = %config.database_path.display(),
            max_connections = config.max_connections,
            "Ledger database open"
        );

        let db = Database { pool };
        if config.run_migrations {
            db.run_migrations().await?;
        }
        Ok(db)
    }

    pub async fn run_migrations(&self) -> DbResult<()> {
        migrations::run_migrations(&self.pool).await
    }

    pub async fn migration_status(&self) -> DbResult<MigrationStatus> {
        migrations::migration_status(&self.pool).await
    }

    /// Raw pool, for queries no repository covers.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    pub fn businesses(&self) -> BusinessRepository {
        BusinessRepository::new(self.pool.clone())
    }

    pub fn tiers(&self) -> TierRepository {
        TierRepository::new(self.pool.clone())
    }

    pub fn customers(&self) -> CustomerRepository {
        CustomerRepository::new(self.pool.clone())
    }

    pub fn offers(&self) -> OfferRepository {
        OfferRepository::new(self.pool.clone())
    }

    pub fn bills(&self) -> BillRepository {
        BillRepository::new(self.pool.clone())
    }

    /// Waits for checked-out connections to return, then closes the pool.
    pub async fn close(&self) {
        self.pool.close().await;
        info!("Ledger database closed");
    }

    /// True if a trivial query round-trips.
    pub async fn health_check(&self) -> bool {
        sqlx::query_scalar::<_, i64>("SELECT 1")
            .fetch_one(&self.pool)
            .await
            .is_ok()
    }
}
