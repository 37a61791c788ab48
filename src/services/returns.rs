use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, DatabaseConnection, EntityTrait, ModelTrait,
    PaginatorTrait, QueryFilter, QueryOrder, QuerySelect, Set,
};
use serde::Serialize;
use std::sync::Arc;
use tracing::{info, instrument};
use uuid::Uuid;

use crate::db::filter::{DateRange, ListParams, Page, Pagination};
use crate::entities::{order, order_return, order_return_item, product, user};
use crate::errors::ServiceError;
use crate::events::{Event, EventSender};

#[derive(Debug, Serialize)]
pub struct ReturnItemView {
    pub product_id: Uuid,
    pub product_name: Option<String>,
    pub price: Option<Decimal>,
    pub quantity: i32,
    pub total_price: Decimal,
}

#[derive(Debug, Serialize)]
pub struct ReturnRow {
    pub return_id: Uuid,
    pub customer_name: String,
    pub customer_email: Option<String>,
    pub order_id: Uuid,
    pub items: Vec<ReturnItemView>,
    pub date_requested: DateTime<Utc>,
    pub reason: String,
    pub additional_info: String,
    pub vendor_status: String,
    pub admin_status: String,
}

/// Return-product workflow: vendor-approved requests queue up for the
/// admin decision.
#[derive(Clone)]
pub struct ReturnService {
    db: Arc<DatabaseConnection>,
    events: EventSender,
}

impl ReturnService {
    pub fn new(db: Arc<DatabaseConnection>, events: EventSender) -> Self {
        Self { db, events }
    }

    /// New-item queue: vendor approved, admin still pending.
    #[instrument(skip(self, params))]
    pub async fn find_new(&self, params: &ListParams) -> Result<Page<ReturnRow>, ServiceError> {
        self.find_filtered("approved", Some("pending"), params).await
    }

    /// Decision history: everything the admin has already ruled on.
    #[instrument(skip(self, params))]
    pub async fn find_history(&self, params: &ListParams) -> Result<Page<ReturnRow>, ServiceError> {
        self.find_filtered("approved", None, params).await
    }

    /// Records the admin decision on a vendor-approved return.
    #[instrument(skip(self))]
    pub async fn decide(&self, return_id: Uuid, admin_status: &str) -> Result<(), ServiceError> {
        if !matches!(admin_status, "approved" | "rejected") {
            return Err(ServiceError::ValidationError(format!(
                "invalid admin status: {admin_status}"
            )));
        }

        let request = order_return::Entity::find_by_id(return_id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound("Return request not found".to_string()))?;

        if request.vendor_status != "approved" {
            return Err(ServiceError::InvalidOperation(
                "Vendor has not approved this return".to_string(),
            ));
        }

        let mut update: order_return::ActiveModel = request.into();
        update.admin_status = Set(admin_status.to_string());
        update.updated_at = Set(Some(Utc::now()));
        update.update(&*self.db).await?;

        self.events
            .send(Event::ReturnDecision {
                return_id,
                admin_status: admin_status.to_string(),
            })
            .await;
        info!(return_id = %return_id, admin_status, "return decided");
        Ok(())
    }

    async fn find_filtered(
        &self,
        vendor_status: &str,
        admin_status: Option<&str>,
        params: &ListParams,
    ) -> Result<Page<ReturnRow>, ServiceError> {
        let mut condition =
            Condition::all().add(order_return::Column::VendorStatus.eq(vendor_status));
        if let Some(admin_status) = admin_status {
            condition = condition.add(order_return::Column::AdminStatus.eq(admin_status));
        } else {
            condition = condition.add(order_return::Column::AdminStatus.ne("pending"));
        }

        let range = DateRange::bounds(params.start_date.as_deref(), params.end_date.as_deref())?;
        if !range.is_empty() {
            condition = condition.add(range.condition(order_return::Column::CreatedAt));
        }

        // Search matches the ordering customer; resolve to order ids first.
        if let Some(term) = params.search_term() {
            let customer_ids: Vec<Uuid> = user::Entity::find()
                .filter(
                    Condition::any()
                        .add(user::Column::Name.contains(&term))
                        .add(user::Column::Email.contains(&term)),
                )
                .all(&*self.db)
                .await?
                .into_iter()
                .map(|u| u.id)
                .collect();

            let order_ids: Vec<Uuid> = if customer_ids.is_empty() {
                Vec::new()
            } else {
                order::Entity::find()
                    .filter(order::Column::UserId.is_in(customer_ids))
                    .all(&*self.db)
                    .await?
                    .into_iter()
                    .map(|o| o.id)
                    .collect()
            };

            if order_ids.is_empty() {
                // No matching customers; the page is empty but keeps the
                // count honest.
                return Ok(Page {
                    pagination: Pagination::new(params.effective_page(), params.limit(), 0),
                    data: Vec::new(),
                });
            }
            condition = condition.add(order_return::Column::OrderId.is_in(order_ids));
        }

        let total_items = order_return::Entity::find()
            .filter(condition.clone())
            .count(&*self.db)
            .await?;

        let requests = order_return::Entity::find()
            .filter(condition)
            .order_by_desc(order_return::Column::CreatedAt)
            .offset(params.offset())
            .limit(params.limit())
            .all(&*self.db)
            .await?;

        let mut data = Vec::with_capacity(requests.len());
        for request in requests {
            data.push(self.shape_row(request).await?);
        }

        Ok(Page {
            pagination: Pagination::new(params.effective_page(), params.limit(), total_items),
            data,
        })
    }

    async fn shape_row(&self, request: order_return::Model) -> Result<ReturnRow, ServiceError> {
        let order_row = order::Entity::find_by_id(request.order_id)
            .find_also_related(user::Entity)
            .one(&*self.db)
            .await?;

        let items = request
            .find_related(order_return_item::Entity)
            .find_also_related(product::Entity)
            .all(&*self.db)
            .await?;

        let item_views = items
            .into_iter()
            .map(|(item, product)| {
                let price = product.as_ref().map(|p| p.price);
                ReturnItemView {
                    product_id: item.product_id,
                    product_name: product.as_ref().map(|p| p.name.clone()),
                    price,
                    quantity: item.quantity,
                    total_price: price.unwrap_or(Decimal::ZERO) * Decimal::from(item.quantity),
                }
            })
            .collect();

        let customer = order_row.as_ref().and_then(|(_, u)| u.as_ref());
        Ok(ReturnRow {
            return_id: request.id,
            customer_name: customer
                .map(|u| u.name.clone())
                .unwrap_or_else(|| "N/A".to_string()),
            customer_email: customer.map(|u| u.email.clone()),
            order_id: request.order_id,
            items: item_views,
            date_requested: request.created_at,
            reason: request
                .reason
                .unwrap_or_else(|| "No reason provided".to_string()),
            additional_info: request
                .additional_info
                .unwrap_or_else(|| "No additional info provided".to_string()),
            vendor_status: request.vendor_status,
            admin_status: request.admin_status,
        })
    }
}
