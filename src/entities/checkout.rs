use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Snapshot of a cart at the point of initiating payment. Contact and
/// address fields are filled in by checkout updates; abandoned checkouts
/// are simply left behind.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "checkouts")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub user_id: Option<Uuid>,
    pub email: Option<String>,
    pub phone_number: Option<String>,
    pub address1: Option<String>,
    pub address2: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub zip_code: Option<String>,
    pub country: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::checkout_item::Entity")]
    CheckoutItems,
    #[sea_orm(has_many = "super::temp_redeem::Entity")]
    TempRedeems,
}

impl Related<super::checkout_item::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::CheckoutItems.def()
    }
}

impl Related<super::temp_redeem::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::TempRedeems.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
