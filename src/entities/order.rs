use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumString};
use uuid::Uuid;

/// Business status of an order. Stored as its snake_case string.
#[derive(Debug, Clone, Copy, PartialEq, Eq, AsRefStr, Display, EnumString)]
#[strum(serialize_all = "snake_case")]
pub enum OrderStatus {
    Pending,
    Processing,
    Confirmed,
    Completed,
    Failed,
    Cancelled,
}

/// Customer purchase. Orders are financial records and are never
/// deleted; payment fields are mutated only by confirmation handling and
/// the transaction ledger, correlated through
/// `payment_reference_number` (one order per payment-intent lifecycle).
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "orders")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub invoice_number: String,
    pub user_id: Uuid,
    pub vendor_id: Option<Uuid>,
    /// pending, processing, confirmed, completed, failed, cancelled
    pub status: String,
    /// Fulfillment-side status shown on admin lists
    pub working_status: Option<String>,
    pub total_amount: Decimal,
    pub category: Option<String>,
    pub payment_status: String,
    pub payment_provider: Option<String>,
    pub payment_reference_number: Option<String>,
    /// Verbatim provider status string from the last update
    pub payment_raw_status: Option<String>,
    pub paid_amount: Option<Decimal>,
    pub paid_currency: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub email: Option<String>,
    pub phone_number: Option<String>,
    pub country: Option<String>,
    pub city: Option<String>,
    pub occasion: Option<String>,
    pub recipient: Option<String>,
    pub delivery_deadline: Option<String>,
    pub comments: Option<String>,
    /// Purchased media item, when the order is for a video
    pub video_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::user::Entity",
        from = "Column::UserId",
        to = "super::user::Column::Id"
    )]
    User,
    #[sea_orm(has_many = "super::payment_transaction::Entity")]
    PaymentTransactions,
    #[sea_orm(has_many = "super::order_return::Entity")]
    OrderReturns,
    #[sea_orm(
        belongs_to = "super::video::Entity",
        from = "Column::VideoId",
        to = "super::video::Column::Id"
    )]
    Video,
}

impl Related<super::user::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::User.def()
    }
}

impl Related<super::payment_transaction::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::PaymentTransactions.def()
    }
}

impl Related<super::order_return::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::OrderReturns.def()
    }
}

impl Related<super::video::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Video.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
