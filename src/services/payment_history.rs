use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sea_orm::{DatabaseConnection, EntityTrait, QueryOrder};
use serde::Serialize;
use std::sync::Arc;
use tracing::instrument;
use uuid::Uuid;

use crate::entities::{order, payment_transaction};
use crate::errors::ServiceError;

#[derive(Debug, Serialize)]
pub struct PaymentHistoryRow {
    pub id: Uuid,
    pub date: DateTime<Utc>,
    pub amount: Option<Decimal>,
    pub status: String,
    pub invoice_number: Option<String>,
}

/// Admin view over the transaction ledger, joined with order invoice
/// numbers.
#[derive(Clone)]
pub struct PaymentHistoryService {
    db: Arc<DatabaseConnection>,
}

impl PaymentHistoryService {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    #[instrument(skip(self))]
    pub async fn find_all(&self) -> Result<Vec<PaymentHistoryRow>, ServiceError> {
        let rows = payment_transaction::Entity::find()
            .find_also_related(order::Entity)
            .order_by_desc(payment_transaction::Column::CreatedAt)
            .all(&*self.db)
            .await?;

        Ok(rows
            .into_iter()
            .map(|(tx, order_row)| PaymentHistoryRow {
                id: tx.id,
                date: tx.created_at,
                amount: tx.amount,
                status: tx.status,
                invoice_number: order_row.map(|o| o.invoice_number),
            })
            .collect())
    }
}
