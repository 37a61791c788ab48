use chrono::Utc;
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, Set,
    TransactionTrait,
};
use std::sync::Arc;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::entities::{order, payment_transaction};
use crate::errors::ServiceError;

/// Fields for a new ledger row. Everything except the status/type/provider
/// defaults is optional; absent fields stay null.
#[derive(Debug, Clone, Default)]
pub struct NewTransaction {
    pub order_id: Option<Uuid>,
    pub user_id: Option<Uuid>,
    pub store_id: Option<Uuid>,
    pub amount: Option<Decimal>,
    pub currency: Option<String>,
    pub reference_number: Option<String>,
    pub status: Option<String>,
    pub tx_type: Option<String>,
    pub provider: Option<String>,
    pub withdraw_via: Option<String>,
}

/// Provider-reported state to mirror into the ledger and the correlated
/// order.
#[derive(Debug, Clone, Default)]
pub struct TransactionPatch {
    pub status: Option<String>,
    pub paid_amount: Option<Decimal>,
    pub paid_currency: Option<String>,
    pub raw_status: Option<String>,
}

/// Payment-transaction ledger. The ledger is the source of truth for
/// provider state; the order is the source of truth for business state.
/// Updates keyed on a reference number touch both tables inside one
/// database transaction so a crash cannot split them.
#[derive(Clone)]
pub struct TransactionLedger {
    db: Arc<DatabaseConnection>,
}

impl TransactionLedger {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    #[instrument(skip(self, new), fields(reference = ?new.reference_number))]
    pub async fn create(
        &self,
        new: NewTransaction,
    ) -> Result<payment_transaction::Model, ServiceError> {
        let row = payment_transaction::ActiveModel {
            id: Set(Uuid::new_v4()),
            order_id: Set(new.order_id),
            user_id: Set(new.user_id),
            store_id: Set(new.store_id),
            amount: Set(new.amount),
            currency: Set(new.currency),
            paid_amount: Set(None),
            paid_currency: Set(None),
            status: Set(new.status.unwrap_or_else(|| "pending".to_string())),
            raw_status: Set(None),
            tx_type: Set(new.tx_type.unwrap_or_else(|| "order".to_string())),
            provider: Set(new.provider.unwrap_or_else(|| "stripe".to_string())),
            reference_number: Set(new.reference_number),
            withdraw_via: Set(new.withdraw_via),
            created_at: Set(Utc::now()),
            updated_at: Set(None),
        };
        Ok(row.insert(&*self.db).await?)
    }

    /// Applies a provider state change to every ledger row carrying the
    /// reference number and mirrors it into the correlated order. An
    /// unknown reference is a no-op: provider retries of events for
    /// orders this system never created must not invent state. Returns
    /// the number of ledger rows updated.
    #[instrument(skip(self, patch), fields(reference = %reference_number))]
    pub async fn update_by_reference(
        &self,
        reference_number: &str,
        patch: TransactionPatch,
    ) -> Result<u64, ServiceError> {
        let txn = self.db.begin().await?;

        let rows = payment_transaction::Entity::find()
            .filter(payment_transaction::Column::ReferenceNumber.eq(reference_number))
            .all(&txn)
            .await?;

        if rows.is_empty() {
            txn.commit().await?;
            warn!("no ledger rows for reference, skipping update");
            return Ok(0);
        }

        // Mirror provider state into the order correlated with the first
        // matching row, matching the ledger's tolerance for duplicates.
        if let Some(order_id) = rows[0].order_id {
            if let Some(order_row) = order::Entity::find_by_id(order_id).one(&txn).await? {
                let mut order_update: order::ActiveModel = order_row.into();
                if let Some(status) = &patch.status {
                    order_update.payment_status = Set(status.clone());
                }
                if let Some(paid_amount) = patch.paid_amount {
                    order_update.paid_amount = Set(Some(paid_amount));
                }
                if let Some(paid_currency) = &patch.paid_currency {
                    order_update.paid_currency = Set(Some(paid_currency.clone()));
                }
                if let Some(raw_status) = &patch.raw_status {
                    order_update.payment_raw_status = Set(Some(raw_status.clone()));
                }
                order_update.updated_at = Set(Some(Utc::now()));
                order_update.update(&txn).await?;
            }
        }

        let mut updated = 0u64;
        for row in rows {
            let mut update: payment_transaction::ActiveModel = row.into();
            if let Some(status) = &patch.status {
                update.status = Set(status.clone());
            }
            if let Some(paid_amount) = patch.paid_amount {
                update.paid_amount = Set(Some(paid_amount));
            }
            if let Some(paid_currency) = &patch.paid_currency {
                update.paid_currency = Set(Some(paid_currency.clone()));
            }
            if let Some(raw_status) = &patch.raw_status {
                update.raw_status = Set(Some(raw_status.clone()));
            }
            update.updated_at = Set(Some(Utc::now()));
            update.update(&txn).await?;
            updated += 1;
        }

        txn.commit().await?;
        info!(updated, "ledger rows updated");
        Ok(updated)
    }
}
