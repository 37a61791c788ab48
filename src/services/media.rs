use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder, Set,
};
use serde::Serialize;
use std::sync::Arc;
use tracing::instrument;
use uuid::Uuid;

use crate::entities::video;
use crate::errors::ServiceError;
use crate::storage::{self, ObjectStorage};

#[derive(Debug, Serialize)]
pub struct VideoView {
    pub id: Uuid,
    pub title: String,
    pub category: Option<String>,
    pub file_url: String,
    pub thumbnail_url: Option<String>,
    pub status: i32,
}

/// Upload payload for a media item.
#[derive(Debug)]
pub struct VideoUpload {
    pub title: String,
    pub category: Option<String>,
    pub file_name: String,
    pub bytes: Vec<u8>,
    pub thumbnail: Option<(String, Vec<u8>)>,
}

/// Media library: files under `video/` and `thumbnail/` plus catalog rows.
#[derive(Clone)]
pub struct MediaService {
    db: Arc<DatabaseConnection>,
    storage: Arc<dyn ObjectStorage>,
}

impl MediaService {
    pub fn new(db: Arc<DatabaseConnection>, storage: Arc<dyn ObjectStorage>) -> Self {
        Self { db, storage }
    }

    #[instrument(skip(self, upload), fields(title = %upload.title))]
    pub async fn upload(&self, upload: VideoUpload) -> Result<VideoView, ServiceError> {
        if upload.title.trim().is_empty() {
            return Err(ServiceError::ValidationError(
                "Title must not be empty".to_string(),
            ));
        }

        let file_key = storage::video_key(&upload.file_name);
        self.storage.put(&file_key, &upload.bytes).await?;

        let thumbnail_key = match &upload.thumbnail {
            Some((name, bytes)) => {
                let key = storage::thumbnail_key(name);
                self.storage.put(&key, bytes).await?;
                Some(key)
            }
            None => None,
        };

        let created = video::ActiveModel {
            id: Set(Uuid::new_v4()),
            title: Set(upload.title.trim().to_string()),
            category: Set(upload.category),
            file_path: Set(file_key),
            thumbnail_path: Set(thumbnail_key),
            status: Set(1),
            created_at: Set(Utc::now()),
        }
        .insert(&*self.db)
        .await?;

        Ok(self.shape(created))
    }

    #[instrument(skip(self))]
    pub async fn find_all(&self, q: Option<&str>) -> Result<Vec<VideoView>, ServiceError> {
        let mut query = video::Entity::find().order_by_desc(video::Column::CreatedAt);
        if let Some(term) = q.map(str::trim).filter(|s| !s.is_empty()) {
            query = query.filter(video::Column::Title.contains(term));
        }
        let rows = query.all(&*self.db).await?;
        Ok(rows.into_iter().map(|row| self.shape(row)).collect())
    }

    /// Removes the catalog row and both stored objects.
    #[instrument(skip(self))]
    pub async fn remove(&self, id: Uuid) -> Result<(), ServiceError> {
        let row = video::Entity::find_by_id(id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound("Video not found".to_string()))?;

        self.storage.delete(&row.file_path).await?;
        if let Some(thumbnail) = &row.thumbnail_path {
            self.storage.delete(thumbnail).await?;
        }
        video::Entity::delete_by_id(id).exec(&*self.db).await?;
        Ok(())
    }

    fn shape(&self, row: video::Model) -> VideoView {
        VideoView {
            id: row.id,
            title: row.title,
            category: row.category,
            file_url: self.storage.url(&row.file_path),
            thumbnail_url: row.thumbnail_path.as_deref().map(|k| self.storage.url(k)),
            status: row.status,
        }
    }
}
