use chrono::{DateTime, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, DatabaseConnection, EntityTrait, ModelTrait,
    PaginatorTrait, QueryFilter, QueryOrder, QuerySelect, Set,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::instrument;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::auth::hash_password;
use crate::db::filter::{search_any, DateRange, ListParams, Page, Pagination};
use crate::entities::{order, product, review, user};
use crate::errors::ServiceError;

const LOGISTICS_TYPES: &[&str] = &["logistic_agent", "logistic_manager"];
const ASSIGNABLE_ROLES: &[&str] = &[
    "user",
    "vendor",
    "admin",
    "logistic_agent",
    "logistic_manager",
];

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct AddStaffRequest {
    #[validate(length(min = 1, max = 120))]
    pub name: String,
    #[validate(email)]
    pub email: String,
    #[validate(length(min = 1))]
    pub phone_number: String,
    #[validate(length(min = 8, message = "Password must be at least 8 characters"))]
    pub password: String,
    /// Defaults to logistic_agent
    pub role: Option<String>,
    pub status: Option<i32>,
}

#[derive(Debug, Clone, Serialize)]
pub struct StaffRow {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub phone_number: Option<String>,
    pub user_type: String,
    pub status: i32,
    pub created_at: DateTime<Utc>,
    /// Average review rating across the member's products
    pub rating: f64,
    /// Orders handled by this member
    pub total_fulfillment: u64,
    /// Vendor catalog size
    pub total_products: u64,
}

/// Staff and vendor management: listings with computed rating and
/// fulfillment figures, account creation, role changes.
#[derive(Clone)]
pub struct StaffService {
    db: Arc<DatabaseConnection>,
}

impl StaffService {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Lists staff of the requested role group. Rating and fulfillment
    /// counts are computed per row; the persistence layer cannot sort on
    /// them, so those sorts happen in memory after the fetch.
    #[instrument(skip(self, params))]
    pub async fn find_all(
        &self,
        staff_type: Option<&str>,
        params: &ListParams,
    ) -> Result<Page<StaffRow>, ServiceError> {
        let mut condition = Condition::all();
        condition = match staff_type {
            Some("vendor") => condition.add(user::Column::UserType.eq("vendor")),
            Some("logistics") | None => {
                condition.add(user::Column::UserType.is_in(LOGISTICS_TYPES.iter().copied()))
            }
            Some(other) => condition.add(user::Column::UserType.eq(other)),
        };

        let range = DateRange::bounds(params.start_date.as_deref(), params.end_date.as_deref())?;
        if !range.is_empty() {
            condition = condition.add(range.condition(user::Column::CreatedAt));
        }
        if let Some(term) = params.search_term() {
            condition = condition.add(search_any(&[user::Column::Name, user::Column::Email], &term));
        }

        let total_items = user::Entity::find()
            .filter(condition.clone())
            .count(&*self.db)
            .await?;

        let accounts = user::Entity::find()
            .filter(condition)
            .order_by_desc(user::Column::CreatedAt)
            .offset(params.offset())
            .limit(params.limit())
            .all(&*self.db)
            .await?;

        let mut data = Vec::with_capacity(accounts.len());
        for account in accounts {
            data.push(self.shape_row(account).await?);
        }

        let data = sort_staff(data, params.sort_by.as_deref(), params.descending());

        Ok(Page {
            pagination: Pagination::new(params.effective_page(), params.limit(), total_items)
                .with_cursor(params.cursor.clone()),
            data,
        })
    }

    /// Creates a staff account with a hashed password. Email must be
    /// unique.
    #[instrument(skip(self, request), fields(email = %request.email))]
    pub async fn add_user(&self, request: AddStaffRequest) -> Result<user::Model, ServiceError> {
        request.validate()?;

        let role = request
            .role
            .unwrap_or_else(|| "logistic_agent".to_string());
        if !ASSIGNABLE_ROLES.contains(&role.as_str()) {
            return Err(ServiceError::ValidationError(format!(
                "invalid role: {role}"
            )));
        }

        let duplicate = user::Entity::find()
            .filter(user::Column::Email.eq(&request.email))
            .one(&*self.db)
            .await?;
        if duplicate.is_some() {
            return Err(ServiceError::InvalidOperation(
                "Email already in use".to_string(),
            ));
        }

        let created = user::ActiveModel {
            id: Set(Uuid::new_v4()),
            name: Set(request.name),
            first_name: Set(None),
            last_name: Set(None),
            username: Set(None),
            email: Set(request.email),
            phone_number: Set(Some(request.phone_number)),
            password_hash: Set(hash_password(&request.password)?),
            user_type: Set(role),
            status: Set(request.status.unwrap_or(1)),
            approved_at: Set(None),
            billing_id: Set(None),
            avatar: Set(None),
            created_at: Set(Utc::now()),
            updated_at: Set(None),
        }
        .insert(&*self.db)
        .await?;
        Ok(created)
    }

    /// Changes an account's role.
    #[instrument(skip(self))]
    pub async fn set_role(&self, user_id: Uuid, role: &str) -> Result<(), ServiceError> {
        if !ASSIGNABLE_ROLES.contains(&role) {
            return Err(ServiceError::ValidationError(format!(
                "invalid role: {role}"
            )));
        }

        let account = user::Entity::find_by_id(user_id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound("User not found".to_string()))?;

        let mut update: user::ActiveModel = account.into();
        update.user_type = Set(role.to_string());
        update.updated_at = Set(Some(Utc::now()));
        update.update(&*self.db).await?;
        Ok(())
    }

    async fn shape_row(&self, account: user::Model) -> Result<StaffRow, ServiceError> {
        let total_fulfillment = account
            .find_related(order::Entity)
            .count(&*self.db)
            .await?;
        let total_products = account
            .find_related(product::Entity)
            .count(&*self.db)
            .await?;

        let ratings = review::Entity::find()
            .filter(review::Column::UserId.eq(account.id))
            .all(&*self.db)
            .await?;
        let rating = if ratings.is_empty() {
            0.0
        } else {
            ratings.iter().map(|r| f64::from(r.rating_value)).sum::<f64>() / ratings.len() as f64
        };

        Ok(StaffRow {
            id: account.id,
            name: account.name,
            email: account.email,
            phone_number: account.phone_number,
            user_type: account.user_type,
            status: account.status,
            created_at: account.created_at,
            rating,
            total_fulfillment,
            total_products,
        })
    }
}

/// In-memory secondary sort for the computed columns.
fn sort_staff(mut rows: Vec<StaffRow>, sort_by: Option<&str>, descending: bool) -> Vec<StaffRow> {
    let Some(sort_by) = sort_by.filter(|s| *s != "default") else {
        return rows;
    };

    match sort_by {
        "total_no_of_fulfillment" => {
            rows.sort_by_key(|row| row.total_fulfillment);
        }
        "rating" => {
            rows.sort_by(|a, b| a.rating.total_cmp(&b.rating));
        }
        "no_of_products" => {
            rows.sort_by_key(|row| row.total_products);
        }
        _ => return rows,
    }
    if descending {
        rows.reverse();
    }
    rows
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(name: &str, rating: f64, fulfillment: u64, products: u64) -> StaffRow {
        StaffRow {
            id: Uuid::new_v4(),
            name: name.to_string(),
            email: format!("{name}@example.com"),
            phone_number: None,
            user_type: "logistic_agent".to_string(),
            status: 1,
            created_at: Utc::now(),
            rating,
            total_fulfillment: fulfillment,
            total_products: products,
        }
    }

    #[test]
    fn default_sort_keeps_fetch_order() {
        let rows = vec![row("a", 1.0, 5, 0), row("b", 5.0, 1, 0)];
        let sorted = sort_staff(rows, None, true);
        assert_eq!(sorted[0].name, "a");
        let rows = vec![row("a", 1.0, 5, 0), row("b", 5.0, 1, 0)];
        let sorted = sort_staff(rows, Some("default"), true);
        assert_eq!(sorted[0].name, "a");
    }

    #[test]
    fn rating_sort_descends_by_default() {
        let rows = vec![row("low", 2.0, 0, 0), row("high", 4.5, 0, 0)];
        let sorted = sort_staff(rows, Some("rating"), true);
        assert_eq!(sorted[0].name, "high");
    }

    #[test]
    fn fulfillment_sort_ascending() {
        let rows = vec![row("busy", 0.0, 9, 0), row("idle", 0.0, 2, 0)];
        let sorted = sort_staff(rows, Some("total_no_of_fulfillment"), false);
        assert_eq!(sorted[0].name, "idle");
    }

    #[test]
    fn unknown_sort_key_is_ignored() {
        let rows = vec![row("a", 1.0, 1, 1), row("b", 2.0, 2, 2)];
        let sorted = sort_staff(rows, Some("shoe_size"), true);
        assert_eq!(sorted[0].name, "a");
    }
}
