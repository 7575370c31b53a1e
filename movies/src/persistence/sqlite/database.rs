//! SQLite connection pool, startup ping and migration runner.

use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous};
use sqlx::{Connection, SqlitePool};
use std::path::Path;
use std::str::FromStr;

use crate::config::PoolConfig;
use crate::deadline::Deadline;
use crate::error::StorageError;

/// Holds a bounded connection pool to the SQLite database.
#[derive(Clone)]
pub struct Database {
    pool: SqlitePool,
}

impl Database {
    /// Open (or create) the database at `path`, verify that a connection can
    /// be established within `config.connect_timeout`, run migrations, and
    /// return a ready-to-use `Database`.
    pub async fn connect(path: &Path, config: &PoolConfig) -> Result<Self, StorageError> {
        config.validate()?;

        // Ensure parent directory exists
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let options = SqliteConnectOptions::from_str(&format!("sqlite:{}", path.display()))?
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Normal)
            .busy_timeout(config.connect_timeout);

        let pool = SqlitePoolOptions::new()
            .max_connections(config.max_open_conns)
            .min_connections(0)
            .idle_timeout(config.max_idle_time)
            .acquire_timeout(config.connect_timeout)
            .connect_lazy_with(options);

        let db = Self { pool };
        db.ping(Deadline::after(config.connect_timeout)).await?;
        db.run_migrations().await?;

        tracing::info!(
            path = %path.display(),
            max_open_conns = config.max_open_conns,
            max_idle_conns = config.max_idle_conns,
            max_idle_time = ?config.max_idle_time,
            "Database connection pool established"
        );
        Ok(db)
    }

    /// Create an in-memory database for testing. Migrations are applied.
    ///
    /// Every SQLite in-memory connection is its own database, so the pool is
    /// pinned to a single connection that is never recycled.
    #[cfg(test)]
    pub async fn new_in_memory() -> Result<Self, StorageError> {
        let options = SqliteConnectOptions::from_str("sqlite::memory:")?;

        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(options)
            .await?;

        let db = Self { pool };
        db.run_migrations().await?;
        Ok(db)
    }

    /// Acquire a connection and round-trip a ping before `deadline`.
    pub async fn ping(&self, deadline: Deadline) -> Result<(), StorageError> {
        deadline
            .run("ping", async {
                let mut conn = self.pool.acquire().await?;
                conn.ping().await?;
                Ok::<_, StorageError>(())
            })
            .await
    }

    /// Run embedded migrations from `movies/migrations/`.
    async fn run_migrations(&self) -> Result<(), StorageError> {
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .map_err(|e| StorageError::Migration(e.to_string()))?;
        Ok(())
    }

    /// Get a reference to the underlying pool.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Close every connection; later operations fail with a storage error.
    pub async fn close(&self) {
        self.pool.close().await;
    }
}
