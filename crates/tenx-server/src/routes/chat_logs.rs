//! `/api/chat-logs`: per-principal chat log documents.

use axum::Json;
use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Path, Query, State};
use serde::{Deserialize, Serialize};
use tenx_core::{ChatId, ChatLog, ChatLogPage, ChatLogPayload, Pagination, UserId};
use tenx_store::ChatLogRepo;
use tracing::{debug, info};

use crate::errors::ApiError;
use crate::principal::Principal;
use crate::state::AppState;

/// Page size when `limit` is absent.
pub const DEFAULT_LIMIT: u32 = 50;

/// Query of `GET /api/chat-logs`.
#[derive(Clone, Copy, Debug, Default, Deserialize)]
pub struct ListQuery {
    limit: Option<u32>,
    offset: Option<u32>,
}

/// Query of `DELETE /api/chat-logs`.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct DeleteQuery {
    id: Option<String>,
}

/// Body of a successful delete.
#[derive(Debug, Serialize)]
pub struct Deleted {
    success: bool,
    deleted: usize,
}

fn not_found() -> ApiError {
    ApiError::NotFound("Chat log not found".into())
}

/// `GET /api/chat-logs?limit&offset`: newest first.
pub async fn list(
    State(state): State<AppState>,
    Principal(user): Principal,
    query: Result<Query<ListQuery>, QueryRejection>,
) -> Result<Json<ChatLogPage>, ApiError> {
    let Query(query) = query?;
    let limit = query.limit.unwrap_or(DEFAULT_LIMIT);
    let offset = query.offset.unwrap_or(0);
    let page = state
        .db(move |conn| {
            Ok(ChatLogPage {
                chat_logs: ChatLogRepo::list(conn, &user, limit, offset)?,
                pagination: Pagination {
                    total: ChatLogRepo::count(conn, &user)?,
                    offset,
                    limit,
                },
            })
        })
        .await?;
    debug!(count = page.chat_logs.len(), total = page.pagination.total, "listed chat logs");
    Ok(Json(page))
}

/// `POST /api/chat-logs`: `chatId` is generated when absent.
pub async fn create(
    State(state): State<AppState>,
    Principal(user): Principal,
    body: Result<Json<ChatLogPayload>, JsonRejection>,
) -> Result<Json<ChatLog>, ApiError> {
    let Json(payload) = body?;
    let log = state
        .db(move |conn| ChatLogRepo::create(conn, &user, &payload))
        .await?;
    info!(chat_id = %log.chat_id, user_id = %log.user_id, "chat log created");
    Ok(Json(log))
}

/// `DELETE /api/chat-logs[?id=]`: one record with `id`, every record of the
/// principal without.
pub async fn delete_many(
    State(state): State<AppState>,
    Principal(user): Principal,
    query: Result<Query<DeleteQuery>, QueryRejection>,
) -> Result<Json<Deleted>, ApiError> {
    let Query(query) = query?;
    match query.id.filter(|id| !id.is_empty()) {
        Some(id) => delete_one(state, user, ChatId::from(id)).await,
        None => {
            let user_id = user.clone();
            let deleted = state
                .db(move |conn| ChatLogRepo::delete_all_for_user(conn, &user_id))
                .await?;
            info!(user_id = %user, deleted, "chat logs cleared");
            Ok(Json(Deleted {
                success: true,
                deleted,
            }))
        }
    }
}

/// `GET /api/chat-logs/{chatId}`.
pub async fn get(
    State(state): State<AppState>,
    Principal(user): Principal,
    Path(chat_id): Path<String>,
) -> Result<Json<ChatLog>, ApiError> {
    state
        .db(move |conn| ChatLogRepo::get(conn, &user, &ChatId::from(chat_id)))
        .await?
        .map(Json)
        .ok_or_else(not_found)
}

/// `PATCH /api/chat-logs/{chatId}`: only fields present in the body change.
pub async fn patch(
    State(state): State<AppState>,
    Principal(user): Principal,
    Path(chat_id): Path<String>,
    body: Result<Json<ChatLogPayload>, JsonRejection>,
) -> Result<Json<ChatLog>, ApiError> {
    let Json(payload) = body?;
    let log = state
        .db(move |conn| ChatLogRepo::patch(conn, &user, &ChatId::from(chat_id), &payload))
        .await?
        .ok_or_else(not_found)?;
    debug!(chat_id = %log.chat_id, messages = log.messages.len(), "chat log patched");
    Ok(Json(log))
}

/// `DELETE /api/chat-logs/{chatId}`.
pub async fn delete(
    State(state): State<AppState>,
    Principal(user): Principal,
    Path(chat_id): Path<String>,
) -> Result<Json<Deleted>, ApiError> {
    delete_one(state, user, ChatId::from(chat_id)).await
}

async fn delete_one(
    state: AppState,
    user: UserId,
    chat_id: ChatId,
) -> Result<Json<Deleted>, ApiError> {
    let id = chat_id.clone();
    let removed = state
        .db(move |conn| ChatLogRepo::delete(conn, &user, &id))
        .await?;
    if !removed {
        return Err(not_found());
    }
    info!(chat_id = %chat_id, "chat log deleted");
    Ok(Json(Deleted {
        success: true,
        deleted: 1,
    }))
}
