use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumString};
use uuid::Uuid;

/// Provider-mirrored transaction status. Stored as its snake_case string.
#[derive(Debug, Clone, Copy, PartialEq, Eq, AsRefStr, Display, EnumString)]
#[strum(serialize_all = "snake_case")]
pub enum TransactionStatus {
    Pending,
    Succeeded,
    Failed,
    Canceled,
    RequiresAction,
}

/// Ledger row mirroring payment-provider state for a reference number.
/// One logical transaction exists per `reference_number`; updates match
/// all rows with the reference to tolerate accidental duplicates.
/// Rows are never deleted outside explicit admin cleanup.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "payment_transactions")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub order_id: Option<Uuid>,
    pub user_id: Option<Uuid>,
    pub store_id: Option<Uuid>,
    pub amount: Option<Decimal>,
    pub currency: Option<String>,
    pub paid_amount: Option<Decimal>,
    pub paid_currency: Option<String>,
    /// pending, succeeded, failed, canceled, requires_action
    pub status: String,
    /// Verbatim provider status string
    pub raw_status: Option<String>,
    /// order, subscription, withdraw
    #[sea_orm(column_name = "type")]
    pub tx_type: String,
    pub provider: String,
    pub reference_number: Option<String>,
    /// Destination for withdraw payouts (bank, paypal, ...)
    pub withdraw_via: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::order::Entity",
        from = "Column::OrderId",
        to = "super::order::Column::Id"
    )]
    Order,
    #[sea_orm(
        belongs_to = "super::user::Entity",
        from = "Column::UserId",
        to = "super::user::Column::Id"
    )]
    User,
}

impl Related<super::order::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Order.def()
    }
}

impl Related<super::user::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::User.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
