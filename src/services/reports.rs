use chrono::Utc;
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, DatabaseConnection, EntityTrait, PaginatorTrait,
    QueryFilter, QueryOrder, QuerySelect, Set,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{info, instrument};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::db::filter::{DateRange, ListParams, Page, Pagination};
use crate::entities::{order, payment_transaction, report};
use crate::errors::ServiceError;
use crate::events::{Event, EventSender};

pub const REPORT_ORDERS: &str = "orders";
pub const REPORT_TRANSACTIONS: &str = "transactions";

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateReportRequest {
    /// orders or transactions
    #[validate(length(min = 1))]
    pub report_type: String,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct OrderReportRow {
    pub invoice_number: String,
    pub customer_email: Option<String>,
    pub status: String,
    pub payment_status: String,
    pub total_amount: Decimal,
    pub created_at: String,
}

#[derive(Debug, Serialize)]
pub struct TransactionReportRow {
    pub reference_number: Option<String>,
    pub tx_type: String,
    pub status: String,
    pub amount: Option<Decimal>,
    pub currency: Option<String>,
    pub created_at: String,
}

/// Aggregated report payload. PDF rendering consumes this downstream;
/// this service only assembles the numbers.
#[derive(Debug, Serialize)]
pub struct ReportPayload {
    pub report_id: Uuid,
    pub report_type: String,
    pub total_count: u64,
    pub total_amount: Decimal,
    pub by_status: BTreeMap<String, u64>,
    pub order_rows: Vec<OrderReportRow>,
    pub transaction_rows: Vec<TransactionReportRow>,
}

#[derive(Clone)]
pub struct ReportService {
    db: Arc<DatabaseConnection>,
    events: EventSender,
}

impl ReportService {
    pub fn new(db: Arc<DatabaseConnection>, events: EventSender) -> Self {
        Self { db, events }
    }

    /// Records the report request, builds the payload and marks the row
    /// completed (or failed, when aggregation errors out).
    #[instrument(skip(self, request), fields(report_type = %request.report_type))]
    pub async fn create(
        &self,
        request: CreateReportRequest,
    ) -> Result<ReportPayload, ServiceError> {
        request.validate()?;
        if !matches!(
            request.report_type.as_str(),
            REPORT_ORDERS | REPORT_TRANSACTIONS
        ) {
            return Err(ServiceError::ValidationError(format!(
                "invalid report type: {}",
                request.report_type
            )));
        }

        let filters = serde_json::json!({
            "start_date": request.start_date,
            "end_date": request.end_date,
        });

        let row = report::ActiveModel {
            id: Set(Uuid::new_v4()),
            report_type: Set(request.report_type.clone()),
            status: Set("pending".to_string()),
            start_date: Set(request.start_date.clone()),
            end_date: Set(request.end_date.clone()),
            filters: Set(Some(filters.to_string())),
            file_path: Set(None),
            created_at: Set(Utc::now()),
            updated_at: Set(None),
        }
        .insert(&*self.db)
        .await?;

        self.events.send(Event::ReportRequested(row.id)).await;

        let built = self
            .build_payload(
                row.id,
                &request.report_type,
                request.start_date.as_deref(),
                request.end_date.as_deref(),
            )
            .await;

        let mut update: report::ActiveModel = row.into();
        update.status = Set(if built.is_ok() {
            "completed".to_string()
        } else {
            "failed".to_string()
        });
        update.updated_at = Set(Some(Utc::now()));
        update.update(&*self.db).await?;

        let payload = built?;
        info!(report_id = %payload.report_id, "report generated");
        Ok(payload)
    }

    #[instrument(skip(self, params))]
    pub async fn find_all(&self, params: &ListParams) -> Result<Page<report::Model>, ServiceError> {
        let mut condition = Condition::all();
        let range = DateRange::bounds(params.start_date.as_deref(), params.end_date.as_deref())?;
        if !range.is_empty() {
            condition = condition.add(range.condition(report::Column::CreatedAt));
        }
        if let Some(term) = params.search_term() {
            condition = condition.add(report::Column::ReportType.contains(&term));
        }

        let total_items = report::Entity::find()
            .filter(condition.clone())
            .count(&*self.db)
            .await?;
        let data = report::Entity::find()
            .filter(condition)
            .order_by_desc(report::Column::CreatedAt)
            .offset(params.offset())
            .limit(params.limit())
            .all(&*self.db)
            .await?;

        Ok(Page {
            pagination: Pagination::new(params.effective_page(), params.limit(), total_items),
            data,
        })
    }

    #[instrument(skip(self))]
    pub async fn find_one(&self, id: Uuid) -> Result<report::Model, ServiceError> {
        report::Entity::find_by_id(id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound("Report not found".to_string()))
    }

    async fn build_payload(
        &self,
        report_id: Uuid,
        report_type: &str,
        start_date: Option<&str>,
        end_date: Option<&str>,
    ) -> Result<ReportPayload, ServiceError> {
        let range = DateRange::bounds(start_date, end_date)?;

        match report_type {
            REPORT_ORDERS => {
                let mut query = order::Entity::find();
                if !range.is_empty() {
                    query = query.filter(range.condition(order::Column::CreatedAt));
                }
                let rows = query
                    .order_by_desc(order::Column::CreatedAt)
                    .all(&*self.db)
                    .await?;

                let mut by_status: BTreeMap<String, u64> = BTreeMap::new();
                let mut total_amount = Decimal::ZERO;
                for row in &rows {
                    *by_status.entry(row.status.clone()).or_insert(0) += 1;
                    total_amount += row.total_amount;
                }

                Ok(ReportPayload {
                    report_id,
                    report_type: REPORT_ORDERS.to_string(),
                    total_count: rows.len() as u64,
                    total_amount,
                    by_status,
                    order_rows: rows
                        .into_iter()
                        .map(|o| OrderReportRow {
                            invoice_number: o.invoice_number,
                            customer_email: o.email,
                            status: o.status,
                            payment_status: o.payment_status,
                            total_amount: o.total_amount,
                            created_at: o.created_at.to_rfc3339(),
                        })
                        .collect(),
                    transaction_rows: Vec::new(),
                })
            }
            _ => {
                let mut query = payment_transaction::Entity::find();
                if !range.is_empty() {
                    query =
                        query.filter(range.condition(payment_transaction::Column::CreatedAt));
                }
                let rows = query
                    .order_by_desc(payment_transaction::Column::CreatedAt)
                    .all(&*self.db)
                    .await?;

                let mut by_status: BTreeMap<String, u64> = BTreeMap::new();
                let mut total_amount = Decimal::ZERO;
                for row in &rows {
                    *by_status.entry(row.status.clone()).or_insert(0) += 1;
                    if let Some(amount) = row.amount {
                        total_amount += amount;
                    }
                }

                Ok(ReportPayload {
                    report_id,
                    report_type: REPORT_TRANSACTIONS.to_string(),
                    total_count: rows.len() as u64,
                    total_amount,
                    by_status,
                    order_rows: Vec::new(),
                    transaction_rows: rows
                        .into_iter()
                        .map(|tx| TransactionReportRow {
                            reference_number: tx.reference_number,
                            tx_type: tx.tx_type,
                            status: tx.status,
                            amount: tx.amount,
                            currency: tx.currency,
                            created_at: tx.created_at.to_rfc3339(),
                        })
                        .collect(),
                })
            }
        }
    }
}
