use chrono::{DateTime, Utc};
use sea_orm::{ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder};
use serde::Serialize;
use std::sync::Arc;
use tracing::instrument;
use uuid::Uuid;

use crate::entities::user;
use crate::errors::ServiceError;

#[derive(Debug, Serialize)]
pub struct ClientRow {
    pub id: Uuid,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub email: String,
    pub phone_number: Option<String>,
    pub created_at: DateTime<Utc>,
    pub status: i32,
}

/// Customer-account listing for the admin panel.
#[derive(Clone)]
pub struct ClientListService {
    db: Arc<DatabaseConnection>,
}

impl ClientListService {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    #[instrument(skip(self))]
    pub async fn find_all(&self) -> Result<Vec<ClientRow>, ServiceError> {
        let clients = user::Entity::find()
            .filter(user::Column::UserType.eq("user"))
            .order_by_desc(user::Column::CreatedAt)
            .all(&*self.db)
            .await?;

        Ok(clients
            .into_iter()
            .map(|u| ClientRow {
                id: u.id,
                first_name: u.first_name,
                last_name: u.last_name,
                email: u.email,
                phone_number: u.phone_number,
                created_at: u.created_at,
                status: u.status,
            })
            .collect())
    }
}
