//! # Database Pool Management
//!
//! Connection pool creation and configuration for SQLite.
//!
//! ## Architecture
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Database Connection Pool                           │
//! │                                                                         │
//! │  QuoterConfig::from_env()?.db_config()                                 │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  Database::new(config).await ← Create pool + run migrations            │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────┐   ┌──────────────────┐    │
//! │  │            SqlitePool                    │   │   serial_lock    │    │
//! │  │  ┌─────┐ ┌─────┐ ┌─────┐ ┌─────┐       │   │ Arc<Mutex<()>>   │    │
//! │  │  │Conn1│ │Conn2│ │Conn3│ │Conn4│ ...   │   │ one per Database │    │
//! │  │  └─────┘ └─────┘ └─────┘ └─────┘       │   └────────┬─────────┘    │
//! │  └─────────────────────────────────────────┘            │              │
//! │       │                                                  │              │
//! │       ▼                                                  ▼              │
//! │  db.quotations() ─── clones pool + lock ──► QuotationRepository::create │
//! │  db.payments()                              (mints serials one at a     │
//! │                                              time within this process) │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## WAL Mode
//! SQLite WAL (Write-Ahead Logging) mode is enabled for:
//! - Better concurrent read performance
//! - Readers don't block writers
//! - Writers don't block readers
//! - Better crash recovery

use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use quoter_core::DEFAULT_TAX_RATE;
use rust_decimal::Decimal;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous};
use sqlx::SqlitePool;
use tokio::sync::Mutex;
use tracing::{debug, info};

use crate::error::{DbError, DbResult};
use crate::migrations;
use crate::repository::payment::PaymentRepository;
use crate::repository::quotation::{QuotationRepository, SerialPolicy};

/// Default number of serial minting attempts before giving up.
pub const DEFAULT_SERIAL_RETRY_ATTEMPTS: u32 = 5;

// =============================================================================
// Configuration
// =============================================================================

/// Database configuration.
///
/// ## Example
/// ```rust
/// use quoter_db::DbConfig;
///
/// let config = DbConfig::new("/path/to/quoter.db")
///     .max_connections(5)
///     .min_connections(1)
///     .serial_retry_attempts(8);
/// assert_eq!(config.serial_retry_attempts, 8);
/// ```
#[derive(Debug, Clone)]
pub struct DbConfig {
    /// Path to the SQLite database file.
    pub database_path: PathBuf,

    /// Maximum number of connections in the pool.
    /// Default: 5 (plenty for a single shop)
    pub max_connections: u32,

    /// Minimum number of connections to keep alive.
    /// Default: 1
    pub min_connections: u32,

    /// Connection timeout duration.
    /// Default: 30 seconds
    pub connect_timeout: Duration,

    /// Idle timeout before closing a connection.
    /// Default: 10 minutes
    pub idle_timeout: Duration,

    /// How long SQLite waits on a locked file before reporting busy.
    /// Default: 5 seconds
    pub busy_timeout: Duration,

    /// Whether to run migrations on connect.
    /// Default: true
    pub run_migrations: bool,

    /// Attempts at minting a serial before [`DbError::SerialConflict`].
    /// Default: 5
    pub serial_retry_attempts: u32,

    /// Backoff unit between minting attempts; attempt `n` waits `n × backoff`.
    /// Default: 20 ms
    pub serial_retry_backoff: Duration,

    /// Tax rate for quotations created without one.
    /// Default: 0.15
    pub default_tax_rate: Decimal,
}

impl DbConfig {
    /// Creates a new database configuration with the given path.
    ///
    /// ## Arguments
    /// * `path` - Path to the SQLite database file. Will be created if it doesn't exist.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        DbConfig {
            database_path: path.into(),
            max_connections: 5,
            min_connections: 1,
            connect_timeout: Duration::from_secs(30),
            idle_timeout: Duration::from_secs(600),
            busy_timeout: Duration::from_secs(5),
            run_migrations: true,
            serial_retry_attempts: DEFAULT_SERIAL_RETRY_ATTEMPTS,
            serial_retry_backoff: Duration::from_millis(20),
            default_tax_rate: DEFAULT_TAX_RATE,
        }
    }

    /// Sets the maximum number of connections.
    pub fn max_connections(mut self, max: u32) -> Self {
        self.max_connections = max;
        self
    }

    /// Sets the minimum number of connections.
    pub fn min_connections(mut self, min: u32) -> Self {
        self.min_connections = min;
        self
    }

    /// Sets the connection timeout.
    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Sets whether to run migrations on connect.
    pub fn run_migrations(mut self, run: bool) -> Self {
        self.run_migrations = run;
        self
    }

    /// Sets the serial minting attempts. Values below 1 are raised to 1.
    pub fn serial_retry_attempts(mut self, attempts: u32) -> Self {
        self.serial_retry_attempts = attempts.max(1);
        self
    }

    /// Sets the backoff unit between serial minting attempts.
    pub fn serial_retry_backoff(mut self, backoff: Duration) -> Self {
        self.serial_retry_backoff = backoff;
        self
    }

    /// Sets the tax rate for quotations created without one.
    pub fn default_tax_rate(mut self, rate: Decimal) -> Self {
        self.default_tax_rate = rate;
        self
    }

    /// Creates an in-memory database configuration (for testing).
    ///
    /// ## Usage
    /// ```rust,ignore
    /// let config = DbConfig::in_memory();
    /// let db = Database::new(config).await?;
    /// // Database is isolated, perfect for tests
    /// ```
    pub fn in_memory() -> Self {
        DbConfig {
            database_path: PathBuf::from(":memory:"),
            max_connections: 1, // In-memory requires single connection
            min_connections: 1,
            connect_timeout: Duration::from_secs(5),
            idle_timeout: Duration::from_secs(60),
            ..DbConfig::new(":memory:")
        }
    }

    fn serial_policy(&self) -> SerialPolicy {
        SerialPolicy {
            attempts: self.serial_retry_attempts.max(1),
            backoff: self.serial_retry_backoff,
        }
    }
}

// =============================================================================
// Database
// =============================================================================

/// Main database handle providing repository access.
///
/// Cloning is cheap and every clone shares the pool and the serial lock, so
/// quotations created through any clone get distinct serials.
///
/// ## Usage
/// ```rust,ignore
/// let db = Database::new(QuoterConfig::from_env()?.db_config()).await?;
///
/// let quote = db.quotations().create(NewQuotation::new("Al Noor Interiors")).await?;
/// db.quotations().add_item(&quote.id, item).await?;
/// let summary = db.payments().summary(&quote.id).await?;
/// ```
#[derive(Debug, Clone)]
pub struct Database {
    /// The SQLite connection pool.
    pool: SqlitePool,

    /// Serializes serial minting within this process.
    serial_lock: Arc<Mutex<()>>,

    serial_policy: SerialPolicy,

    default_tax_rate: Decimal,
}

impl Database {
    /// Creates a new database connection pool.
    ///
    /// ## What This Does
    /// 1. Creates the database file if it doesn't exist
    /// 2. Configures SQLite:
    ///    - WAL mode for concurrent reads
    ///    - NORMAL synchronous (balance of safety/speed)
    ///    - Foreign keys enabled
    ///    - Busy timeout for cross-process writers
    /// 3. Creates the connection pool
    /// 4. Runs migrations (if enabled)
    pub async fn new(config: DbConfig) -> DbResult<Self> {
        info!(
            path = %config.database_path.display(),
            "Initializing database connection"
        );

        // sqlite://path creates file if not exists
        let connect_url = format!("sqlite://{}?mode=rwc", config.database_path.display());

        let connect_options = SqliteConnectOptions::from_str(&connect_url)
            .map_err(|e| DbError::ConnectionFailed(e.to_string()))?
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Normal)
            // SQLite has them disabled by default for backwards compatibility
            .foreign_keys(true)
            .busy_timeout(config.busy_timeout)
            .create_if_missing(true);

        debug!("Connection options configured");

        let pool = SqlitePoolOptions::new()
            .max_connections(config.max_connections)
            .min_connections(config.min_connections)
            .acquire_timeout(config.connect_timeout)
            .idle_timeout(Some(config.idle_timeout))
            .connect_with(connect_options)
            .await
            .map_err(|e| DbError::ConnectionFailed(e.to_string()))?;

        info!(
            max_connections = config.max_connections,
            serial_retry_attempts = config.serial_retry_attempts,
            "Database pool created"
        );

        let db = Database {
            pool,
            serial_lock: Arc::new(Mutex::new(())),
            serial_policy: config.serial_policy(),
            default_tax_rate: config.default_tax_rate,
        };

        if config.run_migrations {
            db.run_migrations().await?;
        }

        Ok(db)
    }

    /// Runs database migrations.
    ///
    /// Idempotent; called by `new()` when `run_migrations` is true.
    pub async fn run_migrations(&self) -> DbResult<()> {
        info!("Running database migrations");
        migrations::run_migrations(&self.pool).await?;
        info!("Migrations complete");
        Ok(())
    }

    /// Returns a reference to the connection pool.
    ///
    /// For advanced queries not covered by repositories.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Returns the quotation repository.
    ///
    /// Every repository returned here shares this handle's serial lock.
    pub fn quotations(&self) -> QuotationRepository {
        QuotationRepository::new(
            self.pool.clone(),
            Arc::clone(&self.serial_lock),
            self.serial_policy,
            self.default_tax_rate,
        )
    }

    /// Returns the payment repository.
    pub fn payments(&self) -> PaymentRepository {
        PaymentRepository::new(self.pool.clone())
    }

    /// Closes the database connection pool.
    ///
    /// After calling close, all repository operations will fail.
    pub async fn close(&self) {
        info!("Closing database connection pool");
        self.pool.close().await;
    }

    /// Checks if the database is healthy (can execute queries).
    pub async fn health_check(&self) -> bool {
        sqlx::query("SELECT 1").execute(&self.pool).await.is_ok()
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[tokio::test]
    async fn test_in_memory_database() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        assert!(db.health_check().await);
    }

    #[tokio::test]
    async fn test_file_database_is_created() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("quoter.db");

        let db = Database::new(DbConfig::new(&path)).await.unwrap();
        assert!(db.health_check().await);
        assert!(path.exists());
        db.close().await;
    }

    #[test]
    fn test_config_builder() {
        let config = DbConfig::new("/tmp/test.db")
            .max_connections(10)
            .min_connections(2)
            .serial_retry_attempts(0)
            .default_tax_rate(dec!(0.05));

        assert_eq!(config.max_connections, 10);
        assert_eq!(config.min_connections, 2);
        assert_eq!(config.serial_retry_attempts, 1);
        assert_eq!(config.default_tax_rate, dec!(0.05));
    }

    #[test]
    fn test_in_memory_keeps_serial_defaults() {
        let config = DbConfig::in_memory();
        assert_eq!(config.max_connections, 1);
        assert_eq!(config.serial_retry_attempts, DEFAULT_SERIAL_RETRY_ATTEMPTS);
        assert_eq!(config.default_tax_rate, DEFAULT_TAX_RATE);
    }
}
