use chrono::{DateTime, Utc};
use sea_orm::{
    ColumnTrait, Condition, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, QuerySelect,
};
use serde::Serialize;
use std::sync::Arc;
use tracing::instrument;
use uuid::Uuid;

use crate::db::filter::{DateRange, ListParams, Page, Pagination};
use crate::entities::{payment_transaction, user};
use crate::errors::ServiceError;

const VENDOR_TYPES: &[&str] = &["vendor"];
const LOGISTICS_TYPES: &[&str] = &["logistic_manager", "logistic_agent"];

#[derive(Debug, Serialize)]
pub struct PayrollRow {
    pub id: Uuid,
    pub company_name: String,
    pub transaction_id: Option<String>,
    pub withdraw_date: DateTime<Utc>,
    pub amount: String,
    pub status: String,
    pub payment_to: Option<String>,
    pub actions: String,
}

/// Succeeded withdraw payouts to vendors or logistics staff.
#[derive(Clone)]
pub struct PayrollService {
    db: Arc<DatabaseConnection>,
}

impl PayrollService {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    #[instrument(skip(self, params))]
    pub async fn find_all(
        &self,
        staff_type: Option<&str>,
        params: &ListParams,
    ) -> Result<Page<PayrollRow>, ServiceError> {
        let user_types = if staff_type == Some("logistics") {
            LOGISTICS_TYPES
        } else {
            VENDOR_TYPES
        };

        let mut condition = Condition::all()
            .add(payment_transaction::Column::TxType.eq("withdraw"))
            .add(payment_transaction::Column::Status.eq("succeeded"))
            .add(user::Column::UserType.is_in(user_types.iter().copied()));

        let range = DateRange::bounds(params.start_date.as_deref(), params.end_date.as_deref())?;
        if !range.is_empty() {
            condition = condition.add(range.condition(payment_transaction::Column::CreatedAt));
        }

        if let Some(term) = params.search_term() {
            // The reference number lives on the transaction, the payee
            // name on the user; resolve the name side to ids first.
            let matching_users: Vec<Uuid> = user::Entity::find()
                .filter(user::Column::Name.contains(&term))
                .all(&*self.db)
                .await?
                .into_iter()
                .map(|u| u.id)
                .collect();

            let mut search = Condition::any()
                .add(payment_transaction::Column::ReferenceNumber.contains(&term));
            if !matching_users.is_empty() {
                search = search.add(payment_transaction::Column::UserId.is_in(matching_users));
            }
            condition = condition.add(search);
        }

        let total_items = payment_transaction::Entity::find()
            .find_also_related(user::Entity)
            .filter(condition.clone())
            .count(&*self.db)
            .await?;

        let mut query = payment_transaction::Entity::find()
            .find_also_related(user::Entity)
            .filter(condition.clone());

        query = match params.sort_by.as_deref() {
            Some("amount") => order_by(query, payment_transaction::Column::Amount, params),
            Some("status") => order_by(query, payment_transaction::Column::Status, params),
            Some("payment_to") => order_by(query, payment_transaction::Column::WithdrawVia, params),
            _ => query.order_by_desc(payment_transaction::Column::CreatedAt),
        };

        // Cursor pagination anchors on the cursor row's created_at; offset
        // pagination applies otherwise.
        if let Some(cursor) = parse_cursor(params.cursor.as_deref())? {
            if let Some(anchor) = payment_transaction::Entity::find_by_id(cursor)
                .one(&*self.db)
                .await?
            {
                query = query
                    .filter(payment_transaction::Column::CreatedAt.lt(anchor.created_at))
                    .limit(params.limit());
            }
        } else {
            query = query.offset(params.offset()).limit(params.limit());
        }

        let rows = query.all(&*self.db).await?;

        let data = rows
            .into_iter()
            .map(|(tx, payee)| shape_row(tx, payee))
            .collect();

        Ok(Page {
            pagination: Pagination::new(params.effective_page(), params.limit(), total_items)
                .with_cursor(params.cursor.clone()),
            data,
        })
    }

    #[instrument(skip(self))]
    pub async fn get_transaction(&self, id: Uuid) -> Result<PayrollRow, ServiceError> {
        let (tx, payee) = payment_transaction::Entity::find_by_id(id)
            .find_also_related(user::Entity)
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound("Transaction not found".to_string()))?;
        Ok(shape_row(tx, payee))
    }
}

fn order_by(
    query: sea_orm::SelectTwo<payment_transaction::Entity, user::Entity>,
    column: payment_transaction::Column,
    params: &ListParams,
) -> sea_orm::SelectTwo<payment_transaction::Entity, user::Entity> {
    if params.descending() {
        query.order_by_desc(column)
    } else {
        query.order_by_asc(column)
    }
}

fn parse_cursor(cursor: Option<&str>) -> Result<Option<Uuid>, ServiceError> {
    cursor
        .map(|c| {
            Uuid::parse_str(c)
                .map_err(|_| ServiceError::ValidationError(format!("invalid cursor: {c}")))
        })
        .transpose()
}

fn shape_row(tx: payment_transaction::Model, payee: Option<user::Model>) -> PayrollRow {
    PayrollRow {
        id: tx.id,
        company_name: payee
            .map(|u| u.name)
            .unwrap_or_else(|| "N/A".to_string()),
        transaction_id: tx.reference_number,
        withdraw_date: tx.created_at,
        amount: tx
            .amount
            .map(|a| a.to_string())
            .unwrap_or_else(|| "0".to_string()),
        // Admin payroll shows succeeded payouts as paid
        status: if tx.status == "succeeded" {
            "paid".to_string()
        } else {
            tx.status
        },
        payment_to: tx.withdraw_via,
        actions: format!("View {}", tx.id),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn withdraw_tx(status: &str) -> payment_transaction::Model {
        payment_transaction::Model {
            id: Uuid::new_v4(),
            order_id: None,
            user_id: Some(Uuid::new_v4()),
            store_id: None,
            amount: Some(dec!(120.50)),
            currency: Some("usd".into()),
            paid_amount: None,
            paid_currency: None,
            status: status.to_string(),
            raw_status: None,
            tx_type: "withdraw".into(),
            provider: "stripe".into(),
            reference_number: Some("po_123".into()),
            withdraw_via: Some("bank".into()),
            created_at: Utc::now(),
            updated_at: None,
        }
    }

    #[test]
    fn succeeded_is_shaped_as_paid() {
        let row = shape_row(withdraw_tx("succeeded"), None);
        assert_eq!(row.status, "paid");
        assert_eq!(row.company_name, "N/A");
        assert_eq!(row.amount, "120.50");
    }

    #[test]
    fn other_statuses_pass_through() {
        let row = shape_row(withdraw_tx("pending"), None);
        assert_eq!(row.status, "pending");
    }

    #[test]
    fn invalid_cursor_is_a_validation_error() {
        assert!(parse_cursor(Some("not-a-uuid")).is_err());
        assert!(parse_cursor(None).unwrap().is_none());
    }
}
