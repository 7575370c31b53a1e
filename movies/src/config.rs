//! Tunables for the connection pool and query deadlines.
//!
//! Every value has a compile-time default. The database path can be
//! overridden with the `MOVIEDB_DB_PATH` environment variable; everything
//! else is passed in by the binary at construction.

use std::path::PathBuf;
use std::time::Duration;

use crate::error::StorageError;

/// Default maximum number of open (in-use + idle) connections.
pub const DEFAULT_MAX_OPEN_CONNS: u32 = 25;

/// Default maximum number of idle connections.
pub const DEFAULT_MAX_IDLE_CONNS: u32 = 25;

/// Default idle lifetime before a connection is recycled.
pub const DEFAULT_MAX_IDLE_TIME: Duration = Duration::from_secs(15 * 60);

/// Default budget for opening the pool and pinging the database.
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

/// Default read deadline.
pub const DEFAULT_READ_TIMEOUT: Duration = Duration::from_secs(3);

/// Default deadline for insert, update and delete.
pub const DEFAULT_WRITE_TIMEOUT: Duration = Duration::from_secs(3);

const DEFAULT_DB_FILE: &str = ".local/share/moviedb/movies.db";
const DEV_DB_FILE: &str = "./data/movies.db";

/// Connection pool settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PoolConfig {
    pub max_open_conns: u32,
    pub max_idle_conns: u32,
    pub max_idle_time: Duration,
    pub connect_timeout: Duration,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            max_open_conns: DEFAULT_MAX_OPEN_CONNS,
            max_idle_conns: DEFAULT_MAX_IDLE_CONNS,
            max_idle_time: DEFAULT_MAX_IDLE_TIME,
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
        }
    }
}

impl PoolConfig {
    /// Reject settings the pool cannot honour.
    pub fn validate(&self) -> Result<(), StorageError> {
        if self.max_open_conns == 0 {
            return Err(StorageError::Config(
                "max open connections must be at least 1".to_string(),
            ));
        }
        if self.max_idle_conns > self.max_open_conns {
            return Err(StorageError::Config(format!(
                "max idle connections ({}) exceeds max open connections ({})",
                self.max_idle_conns, self.max_open_conns
            )));
        }
        if self.connect_timeout.is_zero() {
            return Err(StorageError::Config(
                "connect timeout must be non-zero".to_string(),
            ));
        }
        Ok(())
    }
}

/// Per-operation deadlines applied by the stores.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QueryTimeouts {
    pub read: Duration,
    pub write: Duration,
}

impl Default for QueryTimeouts {
    fn default() -> Self {
        Self {
            read: DEFAULT_READ_TIMEOUT,
            write: DEFAULT_WRITE_TIMEOUT,
        }
    }
}

impl QueryTimeouts {
    /// Same budget for reads and writes.
    pub fn uniform(timeout: Duration) -> Self {
        Self {
            read: timeout,
            write: timeout,
        }
    }
}

/// Get the database file path.
///
/// Priority:
/// 1. `MOVIEDB_DB_PATH` env variable if set
/// 2. `$HOME/.local/share/moviedb/movies.db` if HOME is set
/// 3. `./data/movies.db` as fallback
pub fn get_db_path() -> PathBuf {
    if let Ok(path) = std::env::var("MOVIEDB_DB_PATH") {
        return PathBuf::from(path);
    }

    if let Ok(home) = std::env::var("HOME") {
        return PathBuf::from(home).join(DEFAULT_DB_FILE);
    }

    PathBuf::from(DEV_DB_FILE)
}
