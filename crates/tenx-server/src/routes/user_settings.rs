//! `/api/user-settings`: the principal's preference document.
//!
//! The document is schemaless JSON. A missing document is created from
//! [`default_settings`] on first read.

use axum::Json;
use axum::extract::State;
use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use serde_json::{Map, Value, json};
use tenx_store::{UserSettingsRecord, UserSettingsRepo};
use tracing::{debug, info};

use super::Envelope;
use crate::errors::ApiError;
use crate::principal::Principal;
use crate::state::AppState;

/// Accepted range of `ttsConfig.speed`.
pub const TTS_SPEED_RANGE: std::ops::RangeInclusive<f64> = 0.5..=2.0;

/// Preference document of a new user.
pub fn default_settings() -> Value {
    json!({
        "submitKey": "Enter",
        "avatar": "1f603",
        "fontSize": 14,
        "fontFamily": "",
        "theme": "auto",
        "tightBorder": false,
        "sendPreviewBubble": true,
        "enableAutoGenerateTitle": true,
        "sidebarWidth": 300,
        "enableArtifacts": true,
        "enableCodeFold": true,
        "disablePromptHint": false,
        "dontShowMaskSplashScreen": false,
        "hideBuiltinMasks": false,
        "ttsConfig": {
            "enable": false,
            "autoplay": false,
            "engine": "openai",
            "model": "tts-1",
            "voice": "alloy",
            "speed": 1.0
        }
    })
}

/// Reject documents with an out-of-range or non-numeric TTS speed.
pub fn validate_settings(settings: &Value) -> Result<(), ApiError> {
    let Some(speed) = settings.get("ttsConfig").and_then(|t| t.get("speed")) else {
        return Ok(());
    };
    match speed.as_f64() {
        Some(s) if TTS_SPEED_RANGE.contains(&s) => Ok(()),
        _ => Err(ApiError::bad_request("TTS speed must be between 0.5 and 2.0")),
    }
}

/// Overlay the top-level keys of `update` onto `base`.
fn merge_settings(base: Value, update: Map<String, Value>) -> Value {
    let mut merged = match base {
        Value::Object(map) => map,
        _ => Map::new(),
    };
    merged.extend(update);
    Value::Object(merged)
}

/// `GET /api/user-settings`: 201 when the defaults were just created.
pub async fn get(
    State(state): State<AppState>,
    Principal(user): Principal,
) -> Result<(StatusCode, Json<Envelope<UserSettingsRecord>>), ApiError> {
    let (record, created) = state
        .db(move |conn| match UserSettingsRepo::get(conn, &user)? {
            Some(record) => Ok((record, false)),
            None => Ok((UserSettingsRepo::upsert(conn, &user, &default_settings())?, true)),
        })
        .await?;
    let status = if created {
        info!(user_id = %record.user_id, "created default user settings");
        StatusCode::CREATED
    } else {
        StatusCode::OK
    };
    Ok((status, Json(Envelope::new(record))))
}

/// `PUT /api/user-settings` with `{"settings": {...}}`. Keys present in the
/// body replace the stored ones.
pub async fn put(
    State(state): State<AppState>,
    Principal(user): Principal,
    body: Result<Json<Value>, JsonRejection>,
) -> Result<Json<Envelope<UserSettingsRecord>>, ApiError> {
    let Json(body) = body?;
    let update = match body.get("settings") {
        None | Some(Value::Null) => Map::new(),
        Some(Value::Object(map)) => map.clone(),
        Some(_) => return Err(ApiError::bad_request("settings must be an object")),
    };
    validate_settings(&Value::Object(update.clone()))?;

    let record = state
        .db(move |conn| {
            let base = UserSettingsRepo::get(conn, &user)?
                .map_or_else(default_settings, |r| r.settings);
            UserSettingsRepo::upsert(conn, &user, &merge_settings(base, update))
        })
        .await?;
    debug!(user_id = %record.user_id, "user settings updated");
    Ok(Json(Envelope::new(record)))
}
