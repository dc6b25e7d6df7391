//! SQLite connection pool
//!
//! A file database runs in WAL mode with foreign keys enforced and is
//! migrated before the handle is returned. The in-memory database keeps one
//! connection alive for its whole life, since every new connection would
//! open a separate empty database.

use std::path::{Path, PathBuf};
use std::str::FromStr;

use anyhow::{Context, Result};
use sqlx::SqlitePool;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous};

use crate::storage::migrations::{self, MigrationStatus};

/// Connections kept for a file database
const FILE_POOL_SIZE: u32 = 4;

/// Path reported for the in-memory database
const MEMORY_PATH: &str = ":memory:";

/// `<data dir>/portfolio/portfolio.db`, or `portfolio.db` in the working
/// directory when the platform has no data dir
pub fn default_database_path() -> PathBuf {
    match dirs::data_dir() {
        Some(dir) => dir.join("portfolio").join("portfolio.db"),
        None => PathBuf::from("portfolio.db"),
    }
}

/// Handle to a migrated database
#[derive(Debug, Clone)]
pub struct Database {
    pool: SqlitePool,
    path: PathBuf,
}

impl Database {
    /// Open the database file at `path`, creating it and its directory if needed
    pub async fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
            std::fs::create_dir_all(dir)
                .with_context(|| format!("Cannot create database directory {}", dir.display()))?;
        }

        let options = SqliteConnectOptions::new()
            .filename(&path)
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Normal)
            .foreign_keys(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(FILE_POOL_SIZE)
            .connect_with(options)
            .await
            .with_context(|| format!("Cannot open database {}", path.display()))?;

        Self::migrated(pool, path).await
    }

    /// A fresh in-memory database
    pub async fn in_memory() -> Result<Self> {
        let options = SqliteConnectOptions::from_str("sqlite::memory:")?.foreign_keys(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(options)
            .await
            .context("Cannot open in-memory database")?;

        Self::migrated(pool, PathBuf::from(MEMORY_PATH)).await
    }

    async fn migrated(pool: SqlitePool, path: PathBuf) -> Result<Self> {
        let db = Self { pool, path };
        db.migrate().await?;
        Ok(db)
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Apply pending schema migrations
    pub async fn migrate(&self) -> Result<()> {
        migrations::run_migrations(&self.pool)
            .await
            .context("Failed to run database migrations")
    }

    pub async fn migration_status(&self) -> Result<MigrationStatus> {
        migrations::migration_status(&self.pool)
            .await
            .context("Failed to check migration status")
    }

    /// Round-trip a trivial query
    pub async fn health_check(&self) -> Result<()> {
        sqlx::query("SELECT 1")
            .fetch_one(&self.pool)
            .await
            .context("Database health check failed")?;
        Ok(())
    }

    pub async fn close(&self) {
        self.pool.close().await;
    }

    /// File path, or `:memory:`
    pub fn path(&self) -> &Path {
        &self.path
    }
}
