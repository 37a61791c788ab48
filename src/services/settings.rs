use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, Set,
};
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::instrument;
use uuid::Uuid;

use crate::entities::setting;
use crate::errors::ServiceError;

const NOTIFICATION_PREFIX: &str = "notification:";

#[derive(Debug, Serialize)]
pub struct NotificationSettings {
    /// Flag name (without the prefix) → enabled
    pub flags: BTreeMap<String, bool>,
}

/// Application settings and per-user notification preferences stored as
/// key/value rows.
#[derive(Clone)]
pub struct SettingsService {
    db: Arc<DatabaseConnection>,
}

impl SettingsService {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    #[instrument(skip(self))]
    pub async fn get_global(&self, key: &str) -> Result<Option<String>, ServiceError> {
        let row = setting::Entity::find()
            .filter(setting::Column::Key.eq(key))
            .filter(setting::Column::UserId.is_null())
            .one(&*self.db)
            .await?;
        Ok(row.and_then(|r| r.value))
    }

    #[instrument(skip(self, value))]
    pub async fn set_global(&self, key: &str, value: &str) -> Result<(), ServiceError> {
        self.upsert(None, key, value).await
    }

    #[instrument(skip(self))]
    pub async fn notification_settings(
        &self,
        user_id: Uuid,
    ) -> Result<NotificationSettings, ServiceError> {
        let rows = setting::Entity::find()
            .filter(setting::Column::UserId.eq(user_id))
            .all(&*self.db)
            .await?;

        let flags = rows
            .into_iter()
            .filter_map(|row| {
                row.key
                    .strip_prefix(NOTIFICATION_PREFIX)
                    .map(|name| (name.to_string(), row.value.as_deref() == Some("true")))
            })
            .collect();
        Ok(NotificationSettings { flags })
    }

    #[instrument(skip(self, flags))]
    pub async fn update_notification_settings(
        &self,
        user_id: Uuid,
        flags: BTreeMap<String, bool>,
    ) -> Result<NotificationSettings, ServiceError> {
        for (name, enabled) in &flags {
            let key = format!("{NOTIFICATION_PREFIX}{name}");
            self.upsert(Some(user_id), &key, if *enabled { "true" } else { "false" })
                .await?;
        }
        self.notification_settings(user_id).await
    }

    async fn upsert(
        &self,
        user_id: Option<Uuid>,
        key: &str,
        value: &str,
    ) -> Result<(), ServiceError> {
        let mut query = setting::Entity::find().filter(setting::Column::Key.eq(key));
        query = match user_id {
            Some(user_id) => query.filter(setting::Column::UserId.eq(user_id)),
            None => query.filter(setting::Column::UserId.is_null()),
        };

        match query.one(&*self.db).await? {
            Some(existing) => {
                let mut update: setting::ActiveModel = existing.into();
                update.value = Set(Some(value.to_string()));
                update.updated_at = Set(Some(Utc::now()));
                update.update(&*self.db).await?;
            }
            None => {
                setting::ActiveModel {
                    id: Set(Uuid::new_v4()),
                    key: Set(key.to_string()),
                    value: Set(Some(value.to_string())),
                    user_id: Set(user_id),
                    created_at: Set(Utc::now()),
                    updated_at: Set(None),
                }
                .insert(&*self.db)
                .await?;
            }
        }
        Ok(())
    }
}
