//! `/api/configurations`: global model configurations.

use axum::Json;
use axum::extract::State;
use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use serde::Deserialize;
use tenx_store::{AiModelRecord, AiModelUpdate, DefaultSettings, ModelConfigRepo, NewAiModel};
use tracing::info;

use crate::errors::ApiError;
use crate::state::AppState;

/// Body of `POST` and `PUT`.
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ConfigurationInput {
    model_type: String,
    version: String,
    model: Option<String>,
    provider_name: Option<String>,
    default_settings: Option<DefaultSettings>,
    is_active: Option<bool>,
}

impl ConfigurationInput {
    fn key(&self) -> Result<(String, String), ApiError> {
        let model_type = self.model_type.trim();
        let version = self.version.trim();
        if model_type.is_empty() || version.is_empty() {
            return Err(ApiError::bad_request("Model type and version are required"));
        }
        Ok((model_type.to_owned(), version.to_owned()))
    }
}

/// `GET /api/configurations`: active configurations, seeding the default
/// one when none is active.
pub async fn list(State(state): State<AppState>) -> Result<Json<Vec<AiModelRecord>>, ApiError> {
    let records = state
        .db(|conn| {
            let active = ModelConfigRepo::list_active(conn)?;
            if !active.is_empty() {
                return Ok(active);
            }
            let seeded = match ModelConfigRepo::get_by_type_version(conn, "chat", "1.0")? {
                // an inactive seed is reactivated rather than duplicated
                Some(_) => ModelConfigRepo::update_by_type_version(
                    conn,
                    "chat",
                    "1.0",
                    &AiModelUpdate {
                        is_active: Some(true),
                        ..AiModelUpdate::default()
                    },
                )?,
                None => Some(ModelConfigRepo::create(conn, &NewAiModel::seed())?),
            };
            info!("no active configuration, seeded default");
            Ok(seeded.into_iter().collect())
        })
        .await?;
    Ok(Json(records))
}

/// `POST /api/configurations`. Unset model and provider take the seed
/// values.
pub async fn create(
    State(state): State<AppState>,
    body: Result<Json<ConfigurationInput>, JsonRejection>,
) -> Result<(StatusCode, Json<AiModelRecord>), ApiError> {
    let Json(input) = body?;
    let (model_type, version) = input.key()?;
    let seed = NewAiModel::seed();
    let new = NewAiModel {
        model_type,
        version,
        model: input.model.filter(|m| !m.is_empty()).unwrap_or(seed.model),
        provider_name: input
            .provider_name
            .filter(|p| !p.is_empty())
            .unwrap_or(seed.provider_name),
        default_settings: input.default_settings.unwrap_or_default(),
    };
    let record = state.db(move |conn| ModelConfigRepo::create(conn, &new)).await?;
    info!(model_type = %record.model_type, version = %record.version, "configuration created");
    Ok((StatusCode::CREATED, Json(record)))
}

/// `PUT /api/configurations`: update by `(modelType, version)`.
pub async fn update(
    State(state): State<AppState>,
    body: Result<Json<ConfigurationInput>, JsonRejection>,
) -> Result<Json<AiModelRecord>, ApiError> {
    let Json(input) = body?;
    let (model_type, version) = input.key()?;
    let update = AiModelUpdate {
        model: input.model,
        provider_name: input.provider_name,
        default_settings: input.default_settings,
        is_active: input.is_active,
    };
    let record = state
        .db(move |conn| ModelConfigRepo::update_by_type_version(conn, &model_type, &version, &update))
        .await?
        .ok_or_else(|| ApiError::NotFound("Configuration not found".into()))?;
    info!(model_type = %record.model_type, version = %record.version, "configuration updated");
    Ok(Json(record))
}
