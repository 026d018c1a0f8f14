//! Shared handler state.

use std::time::Instant;

use rusqlite::Connection;
use tenx_auth::DeliveryRouter;
use tenx_store::ConnectionPool;

use crate::errors::ApiError;

/// State shared by every handler.
#[derive(Clone)]
pub struct AppState {
    /// Database pool.
    pub pool: ConnectionPool,
    /// OTP delivery channels.
    pub delivery: DeliveryRouter,
    /// OTP validity window.
    pub otp_ttl_secs: u64,
    /// When the server started.
    pub start_time: Instant,
}

impl AppState {
    /// State over a migrated pool.
    pub fn new(pool: ConnectionPool, delivery: DeliveryRouter, otp_ttl_secs: u64) -> Self {
        Self {
            pool,
            delivery,
            otp_ttl_secs,
            start_time: Instant::now(),
        }
    }

    /// Run `f` on a pooled connection off the async runtime.
    pub async fn db<T, F>(&self, f: F) -> Result<T, ApiError>
    where
        F: FnOnce(&Connection) -> tenx_store::Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let pool = self.pool.clone();
        tokio::task::spawn_blocking(move || {
            let conn = pool.get()?;
            f(&conn)
        })
        .await
        .map_err(|e| ApiError::internal("Database task failed", e))?
        .map_err(ApiError::from)
    }
}
