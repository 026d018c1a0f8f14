//! Chat log repository over the `chat_logs` table.
//!
//! Every query is scoped to the owning user; a log that exists under another
//! user is reported as absent.

use rusqlite::{Connection, OptionalExtension, params};
use tenx_core::{ChatId, ChatLog, ChatLogMessage, ChatLogPayload, TokenUsage, UserId};

use crate::errors::{Result, StoreError};

const COLUMNS: &str =
    "chat_id, user_id, model_id, topic, messages, token_usage, cost, created_at, updated_at";

/// Chat log repository.
pub struct ChatLogRepo;

impl ChatLogRepo {
    /// Insert a new log for `user_id`. The key comes from `payload.chat_id`
    /// or is generated.
    pub fn create(conn: &Connection, user_id: &UserId, payload: &ChatLogPayload) -> Result<ChatLog> {
        let log = ChatLog {
            chat_id: payload.chat_id.clone().unwrap_or_default(),
            user_id: user_id.clone(),
            model_id: payload.model_id.clone().unwrap_or_default(),
            topic: payload.topic.clone().unwrap_or_default(),
            messages: payload.messages.clone().unwrap_or_default(),
            token_usage: payload.token_usage.map(TokenUsage::from).unwrap_or_default(),
            cost: payload.cost.unwrap_or(0.0),
            created_at: chrono::Utc::now().to_rfc3339(),
            updated_at: None,
        };

        let _ = conn
            .execute(
                "INSERT INTO chat_logs (chat_id, user_id, model_id, topic, messages,
                     token_usage, cost, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, NULL)",
                params![
                    log.chat_id.as_str(),
                    log.user_id.as_str(),
                    log.model_id,
                    log.topic,
                    serde_json::to_string(&log.messages)?,
                    serde_json::to_string(&log.token_usage)?,
                    log.cost,
                    log.created_at,
                ],
            )
            .map_err(|e| StoreError::from_insert(e, "chat log", log.chat_id.as_str()))?;

        Ok(log)
    }

    /// Fetch one log.
    pub fn get(conn: &Connection, user_id: &UserId, chat_id: &ChatId) -> Result<Option<ChatLog>> {
        let row = conn
            .query_row(
                &format!("SELECT {COLUMNS} FROM chat_logs WHERE chat_id = ?1 AND user_id = ?2"),
                params![chat_id.as_str(), user_id.as_str()],
                RawChatLog::from_row,
            )
            .optional()?;
        row.map(RawChatLog::decode).transpose()
    }

    /// Page through a user's logs, newest first.
    pub fn list(conn: &Connection, user_id: &UserId, limit: u32, offset: u32) -> Result<Vec<ChatLog>> {
        let mut stmt = conn.prepare(&format!(
            "SELECT {COLUMNS} FROM chat_logs WHERE user_id = ?1
             ORDER BY created_at DESC, rowid DESC LIMIT ?2 OFFSET ?3"
        ))?;
        let rows = stmt
            .query_map(params![user_id.as_str(), limit, offset], RawChatLog::from_row)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        rows.into_iter().map(RawChatLog::decode).collect()
    }

    /// Number of logs owned by a user.
    pub fn count(conn: &Connection, user_id: &UserId) -> Result<u64> {
        let n: i64 = conn.query_row(
            "SELECT COUNT(*) FROM chat_logs WHERE user_id = ?1",
            params![user_id.as_str()],
            |row| row.get(0),
        )?;
        Ok(u64::try_from(n).unwrap_or(0))
    }

    /// Apply the fields present in `payload`. Returns the updated log, or
    /// `None` when the user owns no such log.
    pub fn patch(
        conn: &Connection,
        user_id: &UserId,
        chat_id: &ChatId,
        payload: &ChatLogPayload,
    ) -> Result<Option<ChatLog>> {
        let Some(mut log) = Self::get(conn, user_id, chat_id)? else {
            return Ok(None);
        };

        if let Some(messages) = &payload.messages {
            log.messages.clone_from(messages);
        }
        if let Some(model_id) = &payload.model_id {
            log.model_id.clone_from(model_id);
        }
        if let Some(topic) = &payload.topic {
            log.topic.clone_from(topic);
        }
        if let Some(usage) = payload.token_usage {
            log.token_usage = usage.into();
        }
        if let Some(cost) = payload.cost {
            log.cost = cost;
        }
        log.updated_at = Some(
            payload
                .updated_at
                .clone()
                .unwrap_or_else(|| chrono::Utc::now().to_rfc3339()),
        );

        let _ = conn.execute(
            "UPDATE chat_logs
             SET model_id = ?1, topic = ?2, messages = ?3, token_usage = ?4,
                 cost = ?5, updated_at = ?6
             WHERE chat_id = ?7 AND user_id = ?8",
            params![
                log.model_id,
                log.topic,
                serde_json::to_string(&log.messages)?,
                serde_json::to_string(&log.token_usage)?,
                log.cost,
                log.updated_at,
                chat_id.as_str(),
                user_id.as_str(),
            ],
        )?;
        Ok(Some(log))
    }

    /// Delete one log. Returns whether a row was removed.
    pub fn delete(conn: &Connection, user_id: &UserId, chat_id: &ChatId) -> Result<bool> {
        let changed = conn.execute(
            "DELETE FROM chat_logs WHERE chat_id = ?1 AND user_id = ?2",
            params![chat_id.as_str(), user_id.as_str()],
        )?;
        Ok(changed > 0)
    }

    /// Delete every log of a user. Returns the number removed.
    pub fn delete_all_for_user(conn: &Connection, user_id: &UserId) -> Result<usize> {
        Ok(conn.execute(
            "DELETE FROM chat_logs WHERE user_id = ?1",
            params![user_id.as_str()],
        )?)
    }
}

/// Row with JSON columns still encoded.
struct RawChatLog {
    chat_id: String,
    user_id: String,
    model_id: String,
    topic: String,
    messages: String,
    token_usage: String,
    cost: f64,
    created_at: String,
    updated_at: Option<String>,
}

impl RawChatLog {
    fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            chat_id: row.get(0)?,
            user_id: row.get(1)?,
            model_id: row.get(2)?,
            topic: row.get(3)?,
            messages: row.get(4)?,
            token_usage: row.get(5)?,
            cost: row.get(6)?,
            created_at: row.get(7)?,
            updated_at: row.get(8)?,
        })
    }

    fn decode(self) -> Result<ChatLog> {
        let messages: Vec<ChatLogMessage> = serde_json::from_str(&self.messages)?;
        let token_usage: TokenUsage = serde_json::from_str(&self.token_usage)?;
        Ok(ChatLog {
            chat_id: self.chat_id.into(),
            user_id: self.user_id.into(),
            model_id: self.model_id,
            topic: self.topic,
            messages,
            token_usage,
            cost: self.cost,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}
