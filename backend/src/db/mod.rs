//! # Database Module
//!
//! PostgreSQL index of the bridge's on-chain state. It stores:
//!
//! - Registered users (cached user records)
//! - Swaps (cached swap records, plus swaps whose creation is still unsigned)
//! - Prepared transactions and their outcome (audit trail)
//!
//! The chain is always authoritative. The index exists so swaps can be
//! listed per user and so the monitor knows which swaps are still open.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                      DATABASE LAYER                             │
//! │                                                                 │
//! │  ┌──────────────────────────────────────────────────────────┐   │
//! │  │                   Connection Pool                        │   │
//! │  │                  (deadpool-postgres)                     │   │
//! │  └──────────────────────────────────────────────────────────┘   │
//! │                              │                                  │
//! │         ┌────────────────────┼────────────────────┐             │
//! │         ▼                    ▼                    ▼             │
//! │  ┌────────────┐      ┌────────────┐       ┌─────────────────┐   │
//! │  │bridge_users│      │   swaps    │       │swap_transactions│   │
//! │  └────────────┘      └────────────┘       └─────────────────┘   │
//! └─────────────────────────────────────────────────────────────────┘
//! ```

pub mod models;
pub mod queries;

use deadpool_postgres::{Config, Pool, Runtime};
use thiserror::Error;
use tokio_postgres::{Config as TokioConfig, NoTls};
use tracing::{debug, error, info, warn};

/// Database-related errors.
#[derive(Error, Debug)]
pub enum DatabaseError {
    #[error("Database connection failed: {0}")]
    ConnectionError(String),

    #[error("Query failed: {0}")]
    QueryError(#[from] tokio_postgres::Error),

    #[error("Migration failed: {0}")]
    MigrationError(String),

    #[error("Record not found: {0}")]
    NotFound(String),

    #[error("Invalid configuration: {0}")]
    ConfigError(String),
}

/// Locations tried for the schema, relative to the working directory.
const MIGRATION_PATHS: [&str; 3] = [
    "migrations/001_initial_schema.sql",
    "backend/migrations/001_initial_schema.sql",
    "../migrations/001_initial_schema.sql",
];

/// PostgreSQL error codes for objects that already exist.
const DUPLICATE_CODES: [&str; 2] = ["42P07", "42710"];

/// Connection pool wrapper.
///
/// ## Usage
///
/// ```rust,ignore
/// let db = Database::connect("postgres://...").await?;
/// let swaps = queries::list_swaps_by_authority(db.pool(), "7xKt...", 50, 0).await?;
/// ```
#[derive(Clone)]
pub struct Database {
    pool: Pool,
}

impl Database {
    /// Connect to PostgreSQL with a pool of up to 10 connections.
    ///
    /// ## Arguments
    ///
    /// * `database_url` - PostgreSQL connection string
    ///
    /// ## Returns
    ///
    /// * `Ok(Database)` - Connected and verified with `SELECT 1`
    /// * `Err(DatabaseError)` - URL invalid or server unreachable
    pub async fn connect(database_url: &str) -> Result<Self, DatabaseError> {
        info!("Connecting to database...");

        let parsed = database_url
            .parse::<TokioConfig>()
            .map_err(|e| DatabaseError::ConfigError(format!("Invalid database URL: {}", e)))?;

        let mut config = Config::new();
        config.dbname = parsed.get_dbname().map(str::to_string);
        config.user = parsed.get_user().map(str::to_string);
        config.password = parsed
            .get_password()
            .map(|password| String::from_utf8_lossy(password).to_string());
        if let Some(tokio_postgres::config::Host::Tcp(host)) = parsed.get_hosts().first() {
            config.host = Some(host.clone());
        }
        config.port = parsed.get_ports().first().copied();
        config.pool = Some(deadpool_postgres::PoolConfig {
            max_size: 10,
            ..Default::default()
        });

        let pool = config
            .create_pool(Some(Runtime::Tokio1), NoTls)
            .map_err(|e| DatabaseError::ConnectionError(e.to_string()))?;

        let client = pool
            .get()
            .await
            .map_err(|e| DatabaseError::ConnectionError(e.to_string()))?;
        client
            .query("SELECT 1", &[])
            .await
            .map_err(|e| DatabaseError::ConnectionError(e.to_string()))?;

        info!("Database connection established");
        Ok(Self { pool })
    }

    /// Apply `migrations/001_initial_schema.sql`.
    ///
    /// The schema uses `IF NOT EXISTS` throughout; "already exists" errors
    /// from older databases are logged and tolerated.
    pub async fn run_migrations(&self) -> Result<(), DatabaseError> {
        info!("Running database migrations...");

        let sql = read_migration()?;

        let client = self
            .pool
            .get()
            .await
            .map_err(|e| DatabaseError::ConnectionError(e.to_string()))?;

        match client.batch_execute(&sql).await {
            Ok(()) => {
                info!("Migrations completed successfully");
                Ok(())
            }
            Err(e) => {
                let code = e.code().map(|c| c.code().to_string());
                if code.as_deref().is_some_and(|c| DUPLICATE_CODES.contains(&c)) {
                    warn!("Schema objects already exist ({:?}), continuing", code);
                    return Ok(());
                }

                let detail = e
                    .as_db_error()
                    .and_then(|db| db.detail())
                    .unwrap_or("no detail");
                error!("Migration failed: {} (code {:?}, {})", e, code, detail);
                Err(DatabaseError::MigrationError(format!("{} ({})", e, detail)))
            }
        }
    }

    /// Get the underlying pool for queries.
    pub fn pool(&self) -> &Pool {
        &self.pool
    }
}

fn read_migration() -> Result<String, DatabaseError> {
    for path in MIGRATION_PATHS {
        match std::fs::read_to_string(path) {
            Ok(sql) => {
                info!("Found migration file at: {}", path);
                return Ok(sql);
            }
            Err(e) => debug!("Tried path '{}': {}", path, e),
        }
    }

    let cwd = std::env::current_dir()
        .map(|p| p.display().to_string())
        .unwrap_or_else(|_| "unknown".to_string());
    Err(DatabaseError::MigrationError(format!(
        "Could not find migration file. Current directory: {}. Tried paths: {:?}",
        cwd, MIGRATION_PATHS
    )))
}
