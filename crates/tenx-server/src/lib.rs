//! # tenx-server
//!
//! Axum REST server for the tenx chat service.
//!
//! - `/api/chat-logs`: per-principal chat log documents
//! - `/api/user-settings`: per-principal preference document
//! - `/api/configurations`: global model configurations
//! - `/api/auth/send-otp`, `/api/auth/verify-otp`: passwordless login
//! - `/health`
//!
//! The principal is read from the `user-id` header. Errors render through
//! [`errors::ApiError`]. Graceful shutdown via `tokio::signal` +
//! `CancellationToken`.

#![deny(unsafe_code)]

pub mod errors;
pub mod health;
pub mod principal;
pub mod routes;
pub mod server;
pub mod shutdown;
pub mod state;

pub use errors::ApiError;
pub use principal::Principal;
pub use server::{TenxServer, build_router};
pub use shutdown::ShutdownCoordinator;
pub use state::AppState;
