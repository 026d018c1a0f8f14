//! Per-user preference documents over the `user_settings` table.

use rusqlite::{Connection, OptionalExtension, params};
use tenx_core::UserId;

use crate::errors::Result;
use crate::row_types::UserSettingsRecord;

/// User settings repository.
pub struct UserSettingsRepo;

impl UserSettingsRepo {
    /// Fetch a user's settings document.
    pub fn get(conn: &Connection, user_id: &UserId) -> Result<Option<UserSettingsRecord>> {
        let raw: Option<(String, String, String)> = conn
            .query_row(
                "SELECT settings, created_at, updated_at FROM user_settings WHERE user_id = ?1",
                params![user_id.as_str()],
                |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
            )
            .optional()?;
        raw.map(|(settings, created_at, updated_at)| {
            Ok(UserSettingsRecord {
                user_id: user_id.clone(),
                settings: serde_json::from_str(&settings)?,
                created_at,
                updated_at,
            })
        })
        .transpose()
    }

    /// Replace a user's settings document, creating the row if needed.
    /// `created_at` survives replacement.
    pub fn upsert(
        conn: &Connection,
        user_id: &UserId,
        settings: &serde_json::Value,
    ) -> Result<UserSettingsRecord> {
        let now = chrono::Utc::now().to_rfc3339();
        let _ = conn.execute(
            "INSERT INTO user_settings (user_id, settings, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?3)
             ON CONFLICT (user_id) DO UPDATE
             SET settings = excluded.settings, updated_at = excluded.updated_at",
            params![user_id.as_str(), serde_json::to_string(settings)?, now],
        )?;
        let created_at: String = conn.query_row(
            "SELECT created_at FROM user_settings WHERE user_id = ?1",
            params![user_id.as_str()],
            |row| row.get(0),
        )?;
        Ok(UserSettingsRecord {
            user_id: user_id.clone(),
            settings: settings.clone(),
            created_at,
            updated_at: now,
        })
    }
}
