//! # tenx-store
//!
//! `SQLite` persistence for the tenx REST surface.
//!
//! Documents that the original service kept as nested objects (chat history,
//! token usage, user preferences, model defaults) are stored as JSON columns;
//! everything that is filtered or sorted on is a plain column.
//!
//! - [`connection`]: r2d2 pool with WAL and per-connection pragmas
//! - [`migrations`]: embedded, versioned schema migrations
//! - [`repositories`]: stateless repositories taking `&Connection`
//! - [`row_types`]: record types returned by the repositories

#![deny(unsafe_code)]

pub mod connection;
pub mod errors;
pub mod migrations;
pub mod repositories;
pub mod row_types;

pub use connection::{
    ConnectionConfig, ConnectionPool, PooledConnection, PragmaState, new_file, new_in_memory,
    verify_pragmas,
};
pub use errors::{Result, StoreError};
pub use migrations::{current_version, latest_version, run_migrations};
pub use repositories::chat_log::ChatLogRepo;
pub use repositories::model_config::ModelConfigRepo;
pub use repositories::user::{Contact, UserRepo};
pub use repositories::user_settings::UserSettingsRepo;
pub use row_types::{
    AiModelRecord, AiModelUpdate, DefaultSettings, NewAiModel, UserRecord, UserSettingsRecord,
};

/// Open a file-backed pool and bring its schema up to date.
pub fn open(path: &str, config: &ConnectionConfig) -> Result<ConnectionPool> {
    let pool = new_file(path, config)?;
    let conn = pool.get()?;
    let applied = run_migrations(&conn)?;
    tracing::info!(path, applied, version = current_version(&conn)?, "database ready");
    Ok(pool)
}

/// Open a migrated in-memory pool.
pub fn open_in_memory() -> Result<ConnectionPool> {
    let pool = new_in_memory(&ConnectionConfig::default())?;
    let conn = pool.get()?;
    let _ = run_migrations(&conn)?;
    Ok(pool)
}
