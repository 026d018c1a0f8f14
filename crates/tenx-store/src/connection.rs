//! Pooled `SQLite` access for the chat log database.
//!
//! Request handlers borrow a connection per call, so every connection the
//! pool hands out is prepared the same way by [`SessionPragmas`].

use std::time::Duration;

use r2d2::{CustomizeConnection, Pool};
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::Connection;

use crate::errors::Result;

/// Pool of prepared connections.
pub type ConnectionPool = Pool<SqliteConnectionManager>;

/// A connection checked out of a [`ConnectionPool`].
pub type PooledConnection = r2d2::PooledConnection<SqliteConnectionManager>;

/// Pool sizing and lock behaviour.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ConnectionConfig {
    /// Upper bound on open connections. Zero is treated as one.
    pub pool_size: u32,
    /// How long a writer waits on a locked database before failing.
    pub busy_timeout: Duration,
    /// How long a handler waits for a free connection.
    pub acquire_timeout: Duration,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            pool_size: 16,
            busy_timeout: Duration::from_secs(30),
            acquire_timeout: Duration::from_secs(5),
        }
    }
}

impl ConnectionConfig {
    /// Defaults with `pool_size` connections.
    pub fn with_pool_size(pool_size: u32) -> Self {
        Self {
            pool_size,
            ..Self::default()
        }
    }
}

/// Per-connection setup: WAL so readers never block the writer, enforced
/// foreign keys, and the busy timeout.
#[derive(Debug)]
struct SessionPragmas {
    busy_timeout_ms: u128,
}

impl CustomizeConnection<Connection, rusqlite::Error> for SessionPragmas {
    fn on_acquire(&self, conn: &mut Connection) -> std::result::Result<(), rusqlite::Error> {
        let sql = format!(
            "PRAGMA journal_mode = WAL; \
             PRAGMA synchronous = NORMAL; \
             PRAGMA foreign_keys = ON; \
             PRAGMA busy_timeout = {};",
            self.busy_timeout_ms
        );
        conn.execute_batch(&sql)
    }
}

fn pool_over(
    manager: SqliteConnectionManager,
    size: u32,
    config: &ConnectionConfig,
) -> Result<ConnectionPool> {
    Ok(Pool::builder()
        .max_size(size.max(1))
        .connection_timeout(config.acquire_timeout)
        .connection_customizer(Box::new(SessionPragmas {
            busy_timeout_ms: config.busy_timeout.as_millis(),
        }))
        .build(manager)?)
}

/// Pool over a single private in-memory database.
///
/// An in-memory database lives inside its connection, so the pool is capped
/// at one connection whatever `config.pool_size` says.
pub fn new_in_memory(config: &ConnectionConfig) -> Result<ConnectionPool> {
    pool_over(SqliteConnectionManager::memory(), 1, config)
}

/// Pool over the database file at `path`, created if missing.
pub fn new_file(path: &str, config: &ConnectionConfig) -> Result<ConnectionPool> {
    pool_over(SqliteConnectionManager::file(path), config.pool_size, config)
}

/// Settings observed on a live connection.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PragmaState {
    /// `wal` for file databases, `memory` for in-memory ones.
    pub journal_mode: String,
    /// Foreign key enforcement.
    pub foreign_keys_enabled: bool,
    /// Busy timeout in milliseconds.
    pub busy_timeout_ms: i64,
}

/// Query the pragmas in effect on `conn`.
pub fn verify_pragmas(conn: &Connection) -> Result<PragmaState> {
    let pragma_i64 = |name: &str| -> rusqlite::Result<i64> {
        conn.query_row(&format!("PRAGMA {name}"), [], |row| row.get(0))
    };
    Ok(PragmaState {
        journal_mode: conn.query_row("PRAGMA journal_mode", [], |row| row.get(0))?,
        foreign_keys_enabled: pragma_i64("foreign_keys")? == 1,
        busy_timeout_ms: pragma_i64("busy_timeout")?,
    })
}
