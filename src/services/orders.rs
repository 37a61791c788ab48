use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sea_orm::{
    ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder,
};
use serde::Serialize;
use std::sync::Arc;
use tracing::instrument;
use uuid::Uuid;

use crate::entities::{order, user};
use crate::errors::ServiceError;

#[derive(Debug, Serialize)]
pub struct OrderListRow {
    pub id: Uuid,
    pub created_at: DateTime<Utc>,
    pub total_amount: Decimal,
    pub working_status: Option<String>,
    pub payment_status: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
}

/// Admin order listing and lookup.
#[derive(Clone)]
pub struct OrderListService {
    db: Arc<DatabaseConnection>,
}

impl OrderListService {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// All orders newest first, optionally excluding one category (the
    /// admin view hides live-show orders, which have their own screen).
    #[instrument(skip(self))]
    pub async fn find_all(
        &self,
        exclude_category: Option<&str>,
    ) -> Result<Vec<OrderListRow>, ServiceError> {
        let mut query = order::Entity::find()
            .find_also_related(user::Entity)
            .order_by_desc(order::Column::CreatedAt);

        if let Some(category) = exclude_category {
            query = query.filter(
                order::Column::Category
                    .ne(category)
                    .or(order::Column::Category.is_null()),
            );
        }

        let rows = query.all(&*self.db).await?;

        Ok(rows
            .into_iter()
            .map(|(order_row, customer)| OrderListRow {
                id: order_row.id,
                created_at: order_row.created_at,
                total_amount: order_row.total_amount,
                working_status: order_row.working_status,
                payment_status: order_row.payment_status,
                first_name: customer.as_ref().and_then(|u| u.first_name.clone()),
                last_name: customer.as_ref().and_then(|u| u.last_name.clone()),
            })
            .collect())
    }

    #[instrument(skip(self))]
    pub async fn find_by_id(&self, id: Uuid) -> Result<order::Model, ServiceError> {
        order::Entity::find_by_id(id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound("Order not found".to_string()))
    }
}
