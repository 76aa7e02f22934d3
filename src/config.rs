//! Store Configuration (CM-6, SC-8)
//!
//! Explicit configuration for both credential backends. Store locations
//! are values passed into constructors; there is no process-wide
//! mutable path, so two components can point at different stores in the
//! same process (which is exactly what the migration path needs).
//!
//! # Usage
//!
//! ```ignore
//! use palisade::config::{create_pool, StoreConfig};
//! use palisade::store::SqliteCredentialStore;
//!
//! let config = StoreConfig::builder("sqlite://intelligence_platform.db")
//!     .max_connections(5)
//!     .build();
//! let pool = create_pool(&config).await?;
//! let store = SqliteCredentialStore::new(pool);
//! store.init_schema().await?;
//! ```

use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;
use tracing::info;

use crate::store::{SqlitePool, StoreError};

/// Configuration for the relational credential store, plus the location
/// of the legacy flat file when one is being migrated.
#[derive(Debug, Clone)]
pub struct StoreConfig {
    /// SQLite connection URL (e.g. `sqlite://data/platform.db`)
    pub database_url: String,

    /// Legacy `username,password_hash` file, if this deployment still
    /// has one to migrate or fall back to
    pub legacy_users_file: Option<PathBuf>,

    /// Maximum number of pooled connections
    /// Default: 5 (SQLite tolerates few writers)
    pub max_connections: u32,

    /// Minimum number of idle connections to maintain
    pub min_connections: u32,

    /// Maximum time to wait for a connection from the pool
    pub acquire_timeout: Duration,

    /// Maximum lifetime of a connection before it is recycled
    pub max_lifetime: Duration,

    /// Maximum idle time before a connection is closed
    pub idle_timeout: Duration,

    /// How long a connection waits on a locked database before giving up
    pub busy_timeout: Duration,

    /// Create the database file if it does not exist
    pub create_if_missing: bool,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            database_url: String::new(),
            legacy_users_file: None,
            max_connections: 5,
            min_connections: 1,
            acquire_timeout: Duration::from_secs(30),
            max_lifetime: Duration::from_secs(30 * 60),
            idle_timeout: Duration::from_secs(10 * 60),
            busy_timeout: Duration::from_secs(5),
            create_if_missing: true,
        }
    }
}

impl StoreConfig {
    /// Load configuration from environment variables.
    ///
    /// # Environment Variables
    ///
    /// - `DATABASE_URL`: SQLite connection URL (required)
    /// - `LEGACY_USERS_FILE`: path to the legacy credential file (optional)
    /// - `DB_MAX_CONNECTIONS`: max pool size (default: 5)
    /// - `DB_MIN_CONNECTIONS`: min idle connections (default: 1)
    /// - `DB_ACQUIRE_TIMEOUT`: connection acquire timeout (default: "30s")
    /// - `DB_MAX_LIFETIME`: max connection lifetime (default: "30m")
    /// - `DB_IDLE_TIMEOUT`: idle connection timeout (default: "10m")
    /// - `DB_BUSY_TIMEOUT`: lock wait timeout (default: "5s")
    ///
    /// # Panics
    ///
    /// Panics if `DATABASE_URL` is not set.
    pub fn from_env() -> Self {
        let database_url =
            std::env::var("DATABASE_URL").expect("DATABASE_URL environment variable must be set");

        let legacy_users_file = std::env::var("LEGACY_USERS_FILE").ok().map(PathBuf::from);

        let max_connections = std::env::var("DB_MAX_CONNECTIONS")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(5);

        let min_connections = std::env::var("DB_MIN_CONNECTIONS")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(1);

        let acquire_timeout = std::env::var("DB_ACQUIRE_TIMEOUT")
            .map(|s| parse_duration(&s, Duration::from_secs(30)))
            .unwrap_or(Duration::from_secs(30));

        let max_lifetime = std::env::var("DB_MAX_LIFETIME")
            .map(|s| parse_duration(&s, Duration::from_secs(30 * 60)))
            .unwrap_or(Duration::from_secs(30 * 60));

        let idle_timeout = std::env::var("DB_IDLE_TIMEOUT")
            .map(|s| parse_duration(&s, Duration::from_secs(10 * 60)))
            .unwrap_or(Duration::from_secs(10 * 60));

        let busy_timeout = std::env::var("DB_BUSY_TIMEOUT")
            .map(|s| parse_duration(&s, Duration::from_secs(5)))
            .unwrap_or(Duration::from_secs(5));

        Self {
            database_url,
            legacy_users_file,
            max_connections,
            min_connections,
            acquire_timeout,
            max_lifetime,
            idle_timeout,
            busy_timeout,
            create_if_missing: true,
        }
    }

    /// Create a new builder for programmatic configuration.
    pub fn builder(database_url: impl Into<String>) -> StoreConfigBuilder {
        StoreConfigBuilder::new(database_url)
    }
}

/// Builder for [`StoreConfig`].
#[derive(Debug, Clone)]
pub struct StoreConfigBuilder {
    config: StoreConfig,
}

impl StoreConfigBuilder {
    /// Create a new builder with the required database URL.
    pub fn new(database_url: impl Into<String>) -> Self {
        Self {
            config: StoreConfig {
                database_url: database_url.into(),
                ..Default::default()
            },
        }
    }

    /// Set the legacy credential file location
    pub fn legacy_users_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.legacy_users_file = Some(path.into());
        self
    }

    /// Set maximum pooled connections (default: 5)
    pub fn max_connections(mut self, n: u32) -> Self {
        self.config.max_connections = n;
        self
    }

    /// Set minimum idle connections (default: 1)
    pub fn min_connections(mut self, n: u32) -> Self {
        self.config.min_connections = n;
        self
    }

    /// Set connection acquire timeout
    pub fn acquire_timeout(mut self, timeout: Duration) -> Self {
        self.config.acquire_timeout = timeout;
        self
    }

    /// Set the lock wait timeout
    pub fn busy_timeout(mut self, timeout: Duration) -> Self {
        self.config.busy_timeout = timeout;
        self
    }

    /// Fail instead of creating a missing database file
    pub fn require_existing_database(mut self) -> Self {
        self.config.create_if_missing = false;
        self
    }

    /// Build the configuration
    pub fn build(self) -> StoreConfig {
        self.config
    }
}

/// Create a connection pool with the given configuration.
///
/// WAL journaling is enabled so readers do not block the single writer,
/// and every connection carries the configured busy timeout. A health
/// check runs before the pool is handed back.
pub async fn create_pool(config: &StoreConfig) -> Result<SqlitePool, StoreError> {
    info!(
        max_connections = config.max_connections,
        create_if_missing = config.create_if_missing,
        "initializing credential database pool"
    );

    let connect_options = SqliteConnectOptions::from_str(&config.database_url)
        .map_err(|e| StoreError::Unavailable(format!("invalid database URL: {}", e)))?
        .create_if_missing(config.create_if_missing)
        .journal_mode(SqliteJournalMode::Wal)
        .busy_timeout(config.busy_timeout);

    let pool = SqlitePoolOptions::new()
        .max_connections(config.max_connections)
        .min_connections(config.min_connections)
        .acquire_timeout(config.acquire_timeout)
        .max_lifetime(config.max_lifetime)
        .idle_timeout(config.idle_timeout)
        .test_before_acquire(true)
        .connect_with(connect_options)
        .await
        .map_err(|e| StoreError::Unavailable(format!("failed to connect: {}", e)))?;

    health_check(&pool).await?;

    info!("credential database pool ready");

    Ok(pool)
}

/// Verify the pool can execute a query, and report latency and pool
/// occupancy.
pub async fn health_check(pool: &SqlitePool) -> Result<HealthStatus, StoreError> {
    let start = std::time::Instant::now();

    let result: (i32,) = sqlx::query_as("SELECT 1")
        .fetch_one(pool)
        .await
        .map_err(|e| StoreError::Unavailable(format!("health check query failed: {}", e)))?;

    if result.0 != 1 {
        return Err(StoreError::Unavailable(
            "health check returned unexpected result".into(),
        ));
    }

    Ok(HealthStatus {
        connected: true,
        latency: start.elapsed(),
        pool_size: pool.size(),
        idle_connections: pool.num_idle() as u32,
    })
}

/// Pool health snapshot.
#[derive(Debug, Clone)]
pub struct HealthStatus {
    /// Connection is alive
    pub connected: bool,
    /// Query latency
    pub latency: Duration,
    /// Current pool size
    pub pool_size: u32,
    /// Idle connections in pool
    pub idle_connections: u32,
}

impl HealthStatus {
    /// Whether the pool is responsive enough for interactive use.
    pub fn is_healthy(&self) -> bool {
        self.connected && self.latency < Duration::from_secs(5)
    }
}

/// Parse a duration like "30s", "10m", "1h", or "250ms", falling back
/// to `default` when the value does not parse.
fn parse_duration(s: &str, default: Duration) -> Duration {
    let s = s.trim().to_lowercase();
    let (digits, unit_ms) = if let Some(rest) = s.strip_suffix("ms") {
        (rest, 1)
    } else if let Some(rest) = s.strip_suffix('s') {
        (rest, 1000)
    } else if let Some(rest) = s.strip_suffix('m') {
        (rest, 60 * 1000)
    } else if let Some(rest) = s.strip_suffix('h') {
        (rest, 60 * 60 * 1000)
    } else {
        (s.as_str(), 1000)
    };

    digits
        .trim()
        .parse::<u64>()
        .map(|n| Duration::from_millis(n * unit_ms))
        .unwrap_or(default)
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = StoreConfig::builder("sqlite::memory:").build();
        assert_eq!(config.max_connections, 5);
        assert!(config.create_if_missing);
        assert!(config.legacy_users_file.is_none());
    }

    #[test]
    fn test_builder() {
        let config = StoreConfig::builder("sqlite://platform.db")
            .legacy_users_file("users.txt")
            .max_connections(2)
            .busy_timeout(Duration::from_secs(1))
            .require_existing_database()
            .build();

        assert_eq!(config.database_url, "sqlite://platform.db");
        assert_eq!(config.legacy_users_file, Some(PathBuf::from("users.txt")));
        assert_eq!(config.max_connections, 2);
        assert_eq!(config.busy_timeout, Duration::from_secs(1));
        assert!(!config.create_if_missing);
    }

    #[test]
    fn test_parse_duration() {
        let fallback = Duration::from_secs(30);
        assert_eq!(
            parse_duration("250ms", fallback),
            Duration::from_millis(250)
        );
        assert_eq!(parse_duration("30s", fallback), Duration::from_secs(30));
        assert_eq!(parse_duration("10m", fallback), Duration::from_secs(600));
        assert_eq!(parse_duration("1h", fallback), Duration::from_secs(3600));
        assert_eq!(parse_duration("45", fallback), Duration::from_secs(45));
        assert_eq!(parse_duration("junk", fallback), fallback);
    }

    #[tokio::test]
    async fn test_create_pool_and_health_check() {
        let config = StoreConfig::builder("sqlite::memory:")
            .max_connections(1)
            .build();
        let pool = create_pool(&config).await.unwrap();

        let status = health_check(&pool).await.unwrap();
        assert!(status.connected);
        assert!(status.is_healthy());
    }

    #[tokio::test]
    async fn test_missing_database_is_unavailable_when_creation_disabled() {
        let config = StoreConfig::builder("sqlite:///no/such/directory/platform.db")
            .require_existing_database()
            .build();
        let err = create_pool(&config).await.unwrap_err();
        assert!(matches!(err, StoreError::Unavailable(_)));
    }
}
