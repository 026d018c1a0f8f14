//! `/api/auth`: passwordless login by one-time password.

use axum::Json;
use axum::extract::State;
use axum::extract::rejection::JsonRejection;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use tenx_auth::{Identifier, StoredOtp, check_otp, generate_otp, otp_expiry_after};
use tenx_core::UserId;
use tenx_store::{Contact, UserRepo};
use tracing::{debug, info, warn};

use crate::errors::ApiError;
use crate::state::AppState;

/// Body of `POST /api/auth/send-otp`.
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(default)]
pub struct SendOtpRequest {
    identifier: String,
}

/// Body of `POST /api/auth/verify-otp`.
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(default)]
pub struct VerifyOtpRequest {
    identifier: String,
    otp: String,
}

/// Reply of `send-otp`.
#[derive(Debug, Serialize)]
pub struct OtpSent {
    message: &'static str,
}

/// Reply of a successful `verify-otp`.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OtpVerified {
    user_id: UserId,
}

fn contact(identifier: &Identifier) -> Contact<'_> {
    match identifier {
        Identifier::Email(v) => Contact::Email(v),
        Identifier::Phone(v) => Contact::Phone(v),
    }
}

/// `POST /api/auth/send-otp`: find or create the user, store a fresh code
/// and deliver it by email or SMS depending on the identifier.
pub async fn send_otp(
    State(state): State<AppState>,
    body: Result<Json<SendOtpRequest>, JsonRejection>,
) -> Result<Json<OtpSent>, ApiError> {
    let Json(req) = body?;
    let identifier = Identifier::parse(&req.identifier)?;
    info!(identifier = %identifier, channel = identifier.channel(), "OTP requested");

    let otp = generate_otp();
    let expiry = otp_expiry_after(Utc::now(), state.otp_ttl_secs).to_rfc3339();
    let (lookup, code) = (identifier.clone(), otp.clone());
    let (user, created) = state
        .db(move |conn| {
            let (user, created) = UserRepo::find_or_create(conn, contact(&lookup))?;
            let _ = UserRepo::set_otp(conn, &user.user_id, &code, &expiry)?;
            Ok((user, created))
        })
        .await?;
    debug!(user_id = %user.user_id, created, "OTP stored");

    state.delivery.send(&identifier, &otp).await?;
    info!(identifier = %identifier, channel = identifier.channel(), "OTP sent");
    Ok(Json(OtpSent {
        message: "OTP sent successfully",
    }))
}

/// `POST /api/auth/verify-otp`: on success the code is consumed and the user
/// marked verified.
pub async fn verify_otp(
    State(state): State<AppState>,
    body: Result<Json<VerifyOtpRequest>, JsonRejection>,
) -> Result<Json<OtpVerified>, ApiError> {
    let Json(req) = body?;
    let identifier = Identifier::parse(&req.identifier)?;
    if req.otp.trim().is_empty() {
        return Err(ApiError::bad_request("OTP is required"));
    }

    let lookup = identifier.clone();
    let user = state
        .db(move |conn| UserRepo::find_by_identifier(conn, contact(&lookup)))
        .await?;
    let rejected = || ApiError::Unauthorized("Invalid or expired OTP".into());
    let Some(user) = user else {
        warn!(identifier = %identifier, "OTP verification for unknown user");
        return Err(rejected());
    };

    let stored = StoredOtp::from_columns(user.otp.as_deref(), user.otp_expiry.as_deref());
    if let Err(reason) = check_otp(&stored, req.otp.trim(), Utc::now()) {
        warn!(identifier = %identifier, reason = %reason, "OTP rejected");
        return Err(rejected());
    }

    let user_id = user.user_id;
    let id = user_id.clone();
    let _ = state
        .db(move |conn| UserRepo::clear_otp_and_mark_verified(conn, &id))
        .await?;
    info!(user_id = %user_id, "OTP verified");
    Ok(Json(OtpVerified { user_id }))
}
