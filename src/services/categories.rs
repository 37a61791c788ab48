use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, Set,
};
use serde::Deserialize;
use std::sync::Arc;
use tracing::instrument;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::entities::category;
use crate::errors::ServiceError;
use crate::storage;

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateCategoryRequest {
    #[validate(length(min = 1, max = 120, message = "Name must be 1-120 characters"))]
    pub name: String,
    pub description: Option<String>,
    /// Object key under `categories/`
    pub image: Option<String>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct UpdateCategoryRequest {
    pub name: Option<String>,
    pub description: Option<String>,
    pub image: Option<String>,
    pub status: Option<i32>,
}

#[derive(Clone)]
pub struct CategoryService {
    db: Arc<DatabaseConnection>,
}

impl CategoryService {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    #[instrument(skip(self, request))]
    pub async fn create(
        &self,
        request: CreateCategoryRequest,
    ) -> Result<category::Model, ServiceError> {
        request.validate()?;

        let created = category::ActiveModel {
            id: Set(Uuid::new_v4()),
            name: Set(request.name.trim().to_string()),
            description: Set(request.description.map(|d| d.trim().to_string())),
            // Bare file names land under the categories/ prefix
            image: Set(request
                .image
                .map(|name| storage::category_image_key(&name))),
            status: Set(1),
            created_at: Set(Utc::now()),
            updated_at: Set(None),
        }
        .insert(&*self.db)
        .await?;
        Ok(created)
    }

    #[instrument(skip(self))]
    pub async fn find_all(
        &self,
        q: Option<&str>,
        status: Option<i32>,
    ) -> Result<Vec<category::Model>, ServiceError> {
        let mut query = category::Entity::find();
        if let Some(term) = q.map(str::trim).filter(|s| !s.is_empty()) {
            query = query.filter(category::Column::Name.contains(term));
        }
        if let Some(status) = status {
            query = query.filter(category::Column::Status.eq(status));
        }
        Ok(query.all(&*self.db).await?)
    }

    #[instrument(skip(self))]
    pub async fn find_one(&self, id: Uuid) -> Result<category::Model, ServiceError> {
        category::Entity::find_by_id(id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound("Category not found".to_string()))
    }

    /// Rejects the rename when another category already uses the name.
    #[instrument(skip(self, request))]
    pub async fn update(
        &self,
        id: Uuid,
        request: UpdateCategoryRequest,
    ) -> Result<(), ServiceError> {
        request.validate()?;

        if let Some(name) = &request.name {
            let duplicate = category::Entity::find()
                .filter(category::Column::Name.eq(name.trim()))
                .filter(category::Column::Id.ne(id))
                .one(&*self.db)
                .await?;
            if duplicate.is_some() {
                return Err(ServiceError::InvalidOperation(
                    "Category already exists".to_string(),
                ));
            }
        }

        let existing = self.find_one(id).await?;
        let mut update: category::ActiveModel = existing.into();
        if let Some(name) = request.name {
            update.name = Set(name.trim().to_string());
        }
        if let Some(description) = request.description {
            update.description = Set(Some(description.trim().to_string()));
        }
        if let Some(image) = request.image {
            update.image = Set(Some(image));
        }
        if let Some(status) = request.status {
            update.status = Set(status);
        }
        update.updated_at = Set(Some(Utc::now()));
        update.update(&*self.db).await?;
        Ok(())
    }

    #[instrument(skip(self))]
    pub async fn remove(&self, id: Uuid) -> Result<(), ServiceError> {
        let existing = self.find_one(id).await?;
        category::Entity::delete_by_id(existing.id)
            .exec(&*self.db)
            .await?;
        Ok(())
    }
}
