//! Repositories over the store tables.
//!
//! Each repository is a stateless struct whose methods take a `&Connection`,
//! so callers decide pooling and transactions.

pub mod chat_log;
pub mod model_config;
pub mod user;
pub mod user_settings;
