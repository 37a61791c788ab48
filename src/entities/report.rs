use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Generated report record. The payload is aggregated in this service;
/// rendering to PDF and delivery happen downstream, after which
/// `file_path` points at the rendered object.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "reports")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    /// orders or transactions
    pub report_type: String,
    /// pending, completed, failed
    pub status: String,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    /// Requested filters, serialized as JSON
    pub filters: Option<String>,
    pub file_path: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
