use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Discount rule. `amount_type` is `percentage` or `flat`; only coupons
/// with `method = "code"` participate in checkout pricing.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "coupons")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    #[sea_orm(unique)]
    pub code: String,
    pub name: Option<String>,
    pub method: String,
    pub amount: Decimal,
    pub amount_type: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::temp_redeem::Entity")]
    TempRedeems,
}

impl Related<super::temp_redeem::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::TempRedeems.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
