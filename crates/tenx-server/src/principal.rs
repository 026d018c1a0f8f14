//! Principal extraction from the `user-id` header.
//!
//! The header is trusted as-is. It identifies the caller but proves nothing.

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use tenx_core::UserId;
use tenx_core::constants::USER_ID_HEADER;

use crate::errors::ApiError;

/// The caller's user ID. Rejects with 401 when the header is missing or
/// blank.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Principal(pub UserId);

impl<S: Send + Sync> FromRequestParts<S> for Principal {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .headers
            .get(USER_ID_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .map(|v| Self(UserId::from(v)))
            .ok_or_else(|| ApiError::Unauthorized("Unauthorized: No user ID provided".into()))
    }
}
