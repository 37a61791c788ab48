use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, DatabaseConnection, EntityTrait, QueryFilter, Set,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::instrument;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::db::filter::DateRange;
use crate::entities::traffic_source;
use crate::errors::ServiceError;

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateTrafficSourceRequest {
    #[validate(length(min = 1, max = 120))]
    pub source: String,
    pub referrer: Option<String>,
}

#[derive(Debug, PartialEq, Eq, Serialize, ToSchema)]
pub struct TrafficCount {
    pub source: String,
    pub visits: u64,
}

/// Visit-source tracking: one row per hit, grouped counts on read.
#[derive(Clone)]
pub struct TrafficSourceService {
    db: Arc<DatabaseConnection>,
}

impl TrafficSourceService {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    #[instrument(skip(self, request))]
    pub async fn create(
        &self,
        request: CreateTrafficSourceRequest,
    ) -> Result<traffic_source::Model, ServiceError> {
        request.validate()?;

        let created = traffic_source::ActiveModel {
            id: Set(Uuid::new_v4()),
            source: Set(request.source),
            referrer: Set(request.referrer),
            created_at: Set(Utc::now()),
        }
        .insert(&*self.db)
        .await?;
        Ok(created)
    }

    #[instrument(skip(self))]
    pub async fn find_all(
        &self,
        start_date: Option<&str>,
        end_date: Option<&str>,
    ) -> Result<Vec<TrafficCount>, ServiceError> {
        let mut condition = Condition::all();
        let range = DateRange::bounds(start_date, end_date)?;
        if !range.is_empty() {
            condition = condition.add(range.condition(traffic_source::Column::CreatedAt));
        }

        let rows = traffic_source::Entity::find()
            .filter(condition)
            .all(&*self.db)
            .await?;

        Ok(count_by_source(rows.iter().map(|r| r.source.as_str())))
    }
}

/// Groups hits by source. BTreeMap keeps the output order stable.
pub fn count_by_source<'a>(sources: impl Iterator<Item = &'a str>) -> Vec<TrafficCount> {
    let mut counts: BTreeMap<&str, u64> = BTreeMap::new();
    for source in sources {
        *counts.entry(source).or_insert(0) += 1;
    }
    counts
        .into_iter()
        .map(|(source, visits)| TrafficCount {
            source: source.to_string(),
            visits,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counts_group_by_source() {
        let hits = ["google", "direct", "google", "newsletter", "google"];
        let counts = count_by_source(hits.iter().copied());
        assert_eq!(
            counts,
            vec![
                TrafficCount {
                    source: "direct".into(),
                    visits: 1
                },
                TrafficCount {
                    source: "google".into(),
                    visits: 3
                },
                TrafficCount {
                    source: "newsletter".into(),
                    visits: 1
                },
            ]
        );
    }

    #[test]
    fn empty_input_yields_empty_counts() {
        assert!(count_by_source(std::iter::empty()).is_empty());
    }
}
