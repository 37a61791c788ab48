use chrono::{DateTime, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, DatabaseConnection, EntityTrait, ModelTrait,
    PaginatorTrait, QueryFilter, QueryOrder, QuerySelect, Set,
};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{info, instrument};
use uuid::Uuid;

use crate::db::filter::{search_any, DateRange, ListParams, Page, Pagination};
use crate::entities::{user, user_document};
use crate::errors::ServiceError;
use crate::events::{Event, EventSender};
use crate::storage::{self, ObjectStorage};

const LOGISTICS_TYPES: &[&str] = &["logistic_agent", "logistic_manager"];

#[derive(Debug, Serialize)]
pub struct DocumentView {
    pub id: Uuid,
    pub approved_at: Option<DateTime<Utc>>,
    pub document_type: String,
    pub file_url: String,
    pub file_name: String,
}

#[derive(Debug, Serialize)]
pub struct VerificationRow {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub created_at: DateTime<Utc>,
    pub phone_number: Option<String>,
    pub user_type: String,
    pub approved_at: Option<DateTime<Utc>>,
    pub approval_status: String,
    pub documents: Vec<DocumentView>,
}

#[derive(Debug, Serialize)]
pub struct VerificationDetail {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub created_at: DateTime<Utc>,
    pub phone_number: Option<String>,
    pub user_type: String,
    pub approved_at: Option<DateTime<Utc>>,
    pub approval_status: String,
    /// Keyed by document type for direct frontend mapping
    pub documents: HashMap<String, DocumentView>,
}

/// Upload payload for one verification document.
#[derive(Debug)]
pub struct DocumentUpload {
    pub document_type: String,
    pub file_name: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

/// Logistics staff verification: document intake, per-document approval
/// and the final account verification gate.
#[derive(Clone)]
pub struct VerificationService {
    db: Arc<DatabaseConnection>,
    storage: Arc<dyn ObjectStorage>,
    events: EventSender,
}

impl VerificationService {
    pub fn new(
        db: Arc<DatabaseConnection>,
        storage: Arc<dyn ObjectStorage>,
        events: EventSender,
    ) -> Self {
        Self {
            db,
            storage,
            events,
        }
    }

    /// Verification queue: logistics accounts (optionally one role) with
    /// their documents, oldest first. A lone date filters to that whole
    /// day.
    #[instrument(skip(self, params))]
    pub async fn find_all(
        &self,
        role: Option<&str>,
        params: &ListParams,
    ) -> Result<Page<VerificationRow>, ServiceError> {
        let mut condition = Condition::all();
        condition = match role {
            Some(role) => condition.add(user::Column::UserType.eq(role)),
            None => condition.add(user::Column::UserType.is_in(LOGISTICS_TYPES.iter().copied())),
        };

        let range =
            DateRange::day_window(params.start_date.as_deref(), params.end_date.as_deref())?;
        if !range.is_empty() {
            condition = condition.add(range.condition(user::Column::CreatedAt));
        }

        if let Some(term) = params.search_term() {
            condition = condition.add(search_any(
                &[
                    user::Column::Name,
                    user::Column::FirstName,
                    user::Column::LastName,
                    user::Column::Email,
                    user::Column::Username,
                ],
                &term,
            ));
        }

        let total_items = user::Entity::find()
            .filter(condition.clone())
            .count(&*self.db)
            .await?;

        let users = user::Entity::find()
            .filter(condition)
            .order_by_asc(user::Column::CreatedAt)
            .offset(params.offset())
            .limit(params.limit())
            .all(&*self.db)
            .await?;

        let mut data = Vec::with_capacity(users.len());
        for account in users {
            let documents = account
                .find_related(user_document::Entity)
                .all(&*self.db)
                .await?;
            data.push(self.shape_row(account, documents));
        }

        Ok(Page {
            pagination: Pagination::new(params.effective_page(), params.limit(), total_items)
                .with_cursor(params.cursor.clone()),
            data,
        })
    }

    #[instrument(skip(self))]
    pub async fn find_one(&self, id: Uuid) -> Result<VerificationDetail, ServiceError> {
        let account = user::Entity::find_by_id(id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound("Logistics user not found".to_string()))?;

        let documents = account
            .find_related(user_document::Entity)
            .all(&*self.db)
            .await?;

        let document_map = documents
            .into_iter()
            .map(|doc| {
                (
                    doc.document_type.clone(),
                    DocumentView {
                        id: doc.id,
                        approved_at: doc.approved_at,
                        document_type: doc.document_type,
                        file_url: self.storage.url(&doc.file_path),
                        file_name: doc.file_name,
                    },
                )
            })
            .collect();

        Ok(VerificationDetail {
            approval_status: approval_status(account.approved_at),
            id: account.id,
            name: account.name,
            email: account.email,
            created_at: account.created_at,
            phone_number: account.phone_number,
            user_type: account.user_type,
            approved_at: account.approved_at,
            documents: document_map,
        })
    }

    /// Stores each file under `documents/{user_id}/` and records its
    /// metadata.
    #[instrument(skip(self, uploads), fields(count = uploads.len()))]
    pub async fn upload_documents(
        &self,
        user_id: Uuid,
        uploads: Vec<DocumentUpload>,
    ) -> Result<Vec<user_document::Model>, ServiceError> {
        if uploads.is_empty() {
            return Err(ServiceError::BadRequest("No files supplied".to_string()));
        }

        let mut stored = Vec::with_capacity(uploads.len());
        for upload in uploads {
            if upload.document_type.is_empty() || upload.file_name.is_empty() {
                return Err(ServiceError::BadRequest(
                    "Mismatch between files and types".to_string(),
                ));
            }

            let key = storage::document_key(user_id, &upload.file_name);
            self.storage.put(&key, &upload.bytes).await?;

            let row = user_document::ActiveModel {
                id: Set(Uuid::new_v4()),
                user_id: Set(user_id),
                document_type: Set(upload.document_type),
                file_type: Set(upload.content_type),
                file_path: Set(key),
                file_name: Set(upload.file_name),
                approved_at: Set(None),
                created_at: Set(Utc::now()),
            }
            .insert(&*self.db)
            .await?;
            stored.push(row);
        }

        Ok(stored)
    }

    #[instrument(skip(self))]
    pub async fn approve_document(
        &self,
        user_id: Uuid,
        document_id: Uuid,
    ) -> Result<user_document::Model, ServiceError> {
        let document = self.find_document(user_id, document_id).await?;

        let mut update: user_document::ActiveModel = document.into();
        update.approved_at = Set(Some(Utc::now()));
        let approved = update.update(&*self.db).await?;

        self.events
            .send(Event::DocumentApproved {
                user_id,
                document_id,
            })
            .await;
        Ok(approved)
    }

    /// Rejection removes the stored object and the metadata row.
    #[instrument(skip(self))]
    pub async fn reject_document(
        &self,
        user_id: Uuid,
        document_id: Uuid,
    ) -> Result<(), ServiceError> {
        let document = self.find_document(user_id, document_id).await?;

        self.storage.delete(&document.file_path).await?;
        user_document::Entity::delete_by_id(document.id)
            .exec(&*self.db)
            .await?;
        Ok(())
    }

    /// Final verification: allowed only when every uploaded document has
    /// been approved.
    #[instrument(skip(self))]
    pub async fn verify(&self, user_id: Uuid) -> Result<(), ServiceError> {
        let account = user::Entity::find()
            .filter(user::Column::Id.eq(user_id))
            .filter(user::Column::UserType.is_in(LOGISTICS_TYPES.iter().copied()))
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound("User not found".to_string()))?;

        let documents = user_document::Entity::find()
            .filter(user_document::Column::UserId.eq(user_id))
            .all(&*self.db)
            .await?;

        if documents.iter().any(|doc| doc.approved_at.is_none()) {
            return Err(ServiceError::InvalidOperation(
                "All documents must be approved first".to_string(),
            ));
        }

        let mut update: user::ActiveModel = account.into();
        update.approved_at = Set(Some(Utc::now()));
        update.updated_at = Set(Some(Utc::now()));
        update.update(&*self.db).await?;

        self.events.send(Event::UserVerified(user_id)).await;
        info!(user_id = %user_id, "logistics user verified");
        Ok(())
    }

    async fn find_document(
        &self,
        user_id: Uuid,
        document_id: Uuid,
    ) -> Result<user_document::Model, ServiceError> {
        user_document::Entity::find_by_id(document_id)
            .filter(user_document::Column::UserId.eq(user_id))
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound("Document not found".to_string()))
    }

    fn shape_row(
        &self,
        account: user::Model,
        documents: Vec<user_document::Model>,
    ) -> VerificationRow {
        VerificationRow {
            approval_status: approval_status(account.approved_at),
            id: account.id,
            name: account.name,
            email: account.email,
            created_at: account.created_at,
            phone_number: account.phone_number,
            user_type: account.user_type,
            approved_at: account.approved_at,
            documents: documents
                .into_iter()
                .map(|doc| DocumentView {
                    id: doc.id,
                    approved_at: doc.approved_at,
                    document_type: doc.document_type,
                    file_url: self.storage.url(&doc.file_path),
                    file_name: doc.file_name,
                })
                .collect(),
        }
    }
}

fn approval_status(approved_at: Option<DateTime<Utc>>) -> String {
    if approved_at.is_some() {
        "approved".to_string()
    } else {
        "pending".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn approval_status_derives_from_timestamp() {
        assert_eq!(approval_status(None), "pending");
        assert_eq!(approval_status(Some(Utc::now())), "approved");
    }
}
