//! Global model configurations over the `ai_models` table.

use rusqlite::{Connection, OptionalExtension, params};
use uuid::Uuid;

use crate::errors::{Result, StoreError};
use crate::row_types::{AiModelRecord, AiModelUpdate, DefaultSettings, NewAiModel};

const COLUMNS: &str = "id, model_type, version, model, provider_name, default_settings,
     is_active, created_at, updated_at";

/// Model configuration repository.
pub struct ModelConfigRepo;

impl ModelConfigRepo {
    /// All active configurations, oldest first.
    pub fn list_active(conn: &Connection) -> Result<Vec<AiModelRecord>> {
        let mut stmt = conn.prepare(&format!(
            "SELECT {COLUMNS} FROM ai_models WHERE is_active = 1 ORDER BY created_at, rowid"
        ))?;
        let rows = stmt
            .query_map([], RawAiModel::from_row)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        rows.into_iter().map(RawAiModel::decode).collect()
    }

    /// Insert an active configuration.
    pub fn create(conn: &Connection, input: &NewAiModel) -> Result<AiModelRecord> {
        let now = chrono::Utc::now().to_rfc3339();
        let record = AiModelRecord {
            id: Uuid::now_v7().to_string(),
            model_type: input.model_type.clone(),
            version: input.version.clone(),
            model: input.model.clone(),
            provider_name: input.provider_name.clone(),
            default_settings: input.default_settings.clone(),
            is_active: true,
            created_at: now.clone(),
            updated_at: now,
        };
        let _ = conn
            .execute(
                "INSERT INTO ai_models (id, model_type, version, model, provider_name,
                     default_settings, is_active, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, 1, ?7, ?8)",
                params![
                    record.id,
                    record.model_type,
                    record.version,
                    record.model,
                    record.provider_name,
                    serde_json::to_string(&record.default_settings)?,
                    record.created_at,
                    record.updated_at,
                ],
            )
            .map_err(|e| {
                StoreError::from_insert(
                    e,
                    "configuration",
                    &format!("{}@{}", input.model_type, input.version),
                )
            })?;
        Ok(record)
    }

    /// Find a configuration by `(model_type, version)`.
    pub fn get_by_type_version(
        conn: &Connection,
        model_type: &str,
        version: &str,
    ) -> Result<Option<AiModelRecord>> {
        let raw = conn
            .query_row(
                &format!("SELECT {COLUMNS} FROM ai_models WHERE model_type = ?1 AND version = ?2"),
                params![model_type, version],
                RawAiModel::from_row,
            )
            .optional()?;
        raw.map(RawAiModel::decode).transpose()
    }

    /// Apply a partial update to the configuration addressed by
    /// `(model_type, version)`. Returns `None` when it does not exist.
    pub fn update_by_type_version(
        conn: &Connection,
        model_type: &str,
        version: &str,
        update: &AiModelUpdate,
    ) -> Result<Option<AiModelRecord>> {
        let Some(mut record) = Self::get_by_type_version(conn, model_type, version)? else {
            return Ok(None);
        };

        if let Some(model) = update.model.as_ref().filter(|m| !m.is_empty()) {
            record.model.clone_from(model);
        }
        if let Some(provider) = update.provider_name.as_ref().filter(|p| !p.is_empty()) {
            record.provider_name.clone_from(provider);
        }
        if let Some(settings) = &update.default_settings {
            record.default_settings = settings.clone();
        }
        if let Some(active) = update.is_active {
            record.is_active = active;
        }
        record.updated_at = chrono::Utc::now().to_rfc3339();

        let _ = conn.execute(
            "UPDATE ai_models
             SET model = ?1, provider_name = ?2, default_settings = ?3,
                 is_active = ?4, updated_at = ?5
             WHERE id = ?6",
            params![
                record.model,
                record.provider_name,
                serde_json::to_string(&record.default_settings)?,
                record.is_active,
                record.updated_at,
                record.id,
            ],
        )?;
        Ok(Some(record))
    }
}

struct RawAiModel {
    id: String,
    model_type: String,
    version: String,
    model: String,
    provider_name: String,
    default_settings: String,
    is_active: bool,
    created_at: String,
    updated_at: String,
}

impl RawAiModel {
    fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            model_type: row.get(1)?,
            version: row.get(2)?,
            model: row.get(3)?,
            provider_name: row.get(4)?,
            default_settings: row.get(5)?,
            is_active: row.get(6)?,
            created_at: row.get(7)?,
            updated_at: row.get(8)?,
        })
    }

    fn decode(self) -> Result<AiModelRecord> {
        let default_settings: DefaultSettings = serde_json::from_str(&self.default_settings)?;
        Ok(AiModelRecord {
            id: self.id,
            model_type: self.model_type,
            version: self.version,
            model: self.model,
            provider_name: self.provider_name,
            default_settings,
            is_active: self.is_active,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::migrations::run_migrations;
    use assert_matches::assert_matches;

    fn setup() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        let _ = run_migrations(&conn).unwrap();
        conn
    }

    #[test]
    fn empty_table_lists_nothing() {
        let conn = setup();
        assert!(ModelConfigRepo::list_active(&conn).unwrap().is_empty());
    }

    #[test]
    fn create_then_list() {
        let conn = setup();
        let created = ModelConfigRepo::create(&conn, &NewAiModel::seed()).unwrap();
        let listed = ModelConfigRepo::list_active(&conn).unwrap();
        assert_eq!(listed, vec![created]);
        assert_eq!(listed[0].default_settings.history_message_count, 10);
    }

    #[test]
    fn duplicate_type_version_is_reported() {
        let conn = setup();
        let _ = ModelConfigRepo::create(&conn, &NewAiModel::seed()).unwrap();
        let err = ModelConfigRepo::create(&conn, &NewAiModel::seed()).unwrap_err();
        assert_matches!(err, StoreError::Duplicate { kind: "configuration", .. });
    }

    #[test]
    fn update_changes_present_fields_and_deactivates() {
        let conn = setup();
        let _ = ModelConfigRepo::create(&conn, &NewAiModel::seed()).unwrap();

        let update = AiModelUpdate {
            model: Some("gpt-4o".into()),
            provider_name: Some(String::new()),
            default_settings: None,
            is_active: Some(false),
        };
        let updated = ModelConfigRepo::update_by_type_version(&conn, "chat", "1.0", &update)
            .unwrap()
            .unwrap();
        assert_eq!(updated.model, "gpt-4o");
        assert_eq!(updated.provider_name, "openai");
        assert!(!updated.is_active);
        assert!(ModelConfigRepo::list_active(&conn).unwrap().is_empty());
    }

    #[test]
    fn update_missing_returns_none() {
        let conn = setup();
        let out = ModelConfigRepo::update_by_type_version(
            &conn,
            "chat",
            "9.9",
            &AiModelUpdate::default(),
        )
        .unwrap();
        assert!(out.is_none());
    }
}
