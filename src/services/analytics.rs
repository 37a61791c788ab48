use chrono::{DateTime, Months, Utc};
use sea_orm::{ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter};
use serde::Serialize;
use std::collections::BTreeMap;
use std::str::FromStr;
use std::sync::Arc;
use tracing::instrument;
use utoipa::ToSchema;

use crate::entities::{order, user};
use crate::errors::ServiceError;

/// Reporting window. Any other input is a hard failure, not a default.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Period {
    OneMonth,
    SixMonths,
    OneYear,
}

impl FromStr for Period {
    type Err = ServiceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "1 month" => Ok(Period::OneMonth),
            "6 months" => Ok(Period::SixMonths),
            "1 year" => Ok(Period::OneYear),
            other => Err(ServiceError::ValidationError(format!(
                "Invalid period specified: {other}. Use \"1 month\", \"6 months\", or \"1 year\""
            ))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Bucket {
    Day,
    Month,
}

impl Period {
    pub fn start_from(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        match self {
            Period::OneMonth => now - Months::new(1),
            Period::SixMonths => now - Months::new(6),
            Period::OneYear => now - Months::new(12),
        }
    }

    /// One-month windows bucket by day; longer windows by month.
    pub fn bucket(&self) -> Bucket {
        match self {
            Period::OneMonth => Bucket::Day,
            Period::SixMonths | Period::OneYear => Bucket::Month,
        }
    }
}

pub fn bucket_key(date: DateTime<Utc>, bucket: Bucket) -> String {
    match bucket {
        Bucket::Day => date.format("%Y-%m-%d").to_string(),
        Bucket::Month => date.format("%Y-%m").to_string(),
    }
}

#[derive(Debug, PartialEq, Eq, Serialize, ToSchema)]
pub struct SignupBucket {
    pub period: String,
    pub user_count: u64,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct CategoryShare {
    pub category: String,
    pub count: u64,
    pub percentage: f64,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct CategoryAnalytics {
    pub total_orders: u64,
    pub categories: Vec<CategoryShare>,
}

/// Read-only signup and order-category analytics.
#[derive(Clone)]
pub struct AnalyticsService {
    db: Arc<DatabaseConnection>,
}

impl AnalyticsService {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// User signups bucketed by day or month over the requested window.
    #[instrument(skip(self))]
    pub async fn user_signups(&self, period: &str) -> Result<Vec<SignupBucket>, ServiceError> {
        let period: Period = period.parse()?;
        let now = Utc::now();
        let start = period.start_from(now);

        let signups = user::Entity::find()
            .filter(user::Column::CreatedAt.gte(start))
            .filter(user::Column::CreatedAt.lte(now))
            .all(&*self.db)
            .await?;

        Ok(bucket_signups(
            signups.iter().map(|u| u.created_at),
            period.bucket(),
        ))
    }

    /// Order-category distribution over the window, largest share first.
    #[instrument(skip(self))]
    pub async fn order_categories(&self, period: &str) -> Result<CategoryAnalytics, ServiceError> {
        let period: Period = period.parse()?;
        let now = Utc::now();
        let start = period.start_from(now);

        let total_orders = order::Entity::find()
            .filter(order::Column::CreatedAt.gte(start))
            .filter(order::Column::CreatedAt.lte(now))
            .count(&*self.db)
            .await?;

        let orders = order::Entity::find()
            .filter(order::Column::CreatedAt.gte(start))
            .filter(order::Column::CreatedAt.lte(now))
            .all(&*self.db)
            .await?;

        let categories =
            category_shares(orders.iter().map(|o| o.category.as_deref()), total_orders);

        Ok(CategoryAnalytics {
            total_orders,
            categories,
        })
    }
}

pub fn bucket_signups(
    created_ats: impl Iterator<Item = DateTime<Utc>>,
    bucket: Bucket,
) -> Vec<SignupBucket> {
    let mut counts: BTreeMap<String, u64> = BTreeMap::new();
    for created_at in created_ats {
        *counts.entry(bucket_key(created_at, bucket)).or_insert(0) += 1;
    }
    counts
        .into_iter()
        .map(|(period, user_count)| SignupBucket { period, user_count })
        .collect()
}

pub fn category_shares<'a>(
    categories: impl Iterator<Item = Option<&'a str>>,
    total: u64,
) -> Vec<CategoryShare> {
    let mut counts: BTreeMap<String, u64> = BTreeMap::new();
    for category in categories {
        let key = category.unwrap_or("Unknown").to_string();
        *counts.entry(key).or_insert(0) += 1;
    }

    let mut shares: Vec<CategoryShare> = counts
        .into_iter()
        .map(|(category, count)| CategoryShare {
            category,
            count,
            percentage: if total == 0 {
                0.0
            } else {
                round2(count as f64 / total as f64 * 100.0)
            },
        })
        .collect();
    shares.sort_by(|a, b| b.count.cmp(&a.count));
    shares
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(y: i32, m: u32, d: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, 12, 0, 0).unwrap()
    }

    #[test]
    fn period_strings_are_exhaustive() {
        assert_eq!("1 month".parse::<Period>().unwrap(), Period::OneMonth);
        assert_eq!("6 months".parse::<Period>().unwrap(), Period::SixMonths);
        assert_eq!("1 year".parse::<Period>().unwrap(), Period::OneYear);
        assert!("2 weeks".parse::<Period>().is_err());
        assert!("".parse::<Period>().is_err());
    }

    #[test]
    fn one_month_buckets_by_day_others_by_month() {
        assert_eq!(Period::OneMonth.bucket(), Bucket::Day);
        assert_eq!(Period::SixMonths.bucket(), Bucket::Month);
        assert_eq!(Period::OneYear.bucket(), Bucket::Month);
    }

    #[test]
    fn signups_group_by_bucket_key() {
        let dates = vec![at(2025, 3, 1), at(2025, 3, 1), at(2025, 3, 2)];
        let buckets = bucket_signups(dates.into_iter(), Bucket::Day);
        assert_eq!(
            buckets,
            vec![
                SignupBucket {
                    period: "2025-03-01".into(),
                    user_count: 2
                },
                SignupBucket {
                    period: "2025-03-02".into(),
                    user_count: 1
                },
            ]
        );
    }

    #[test]
    fn month_buckets_merge_days() {
        let dates = vec![at(2025, 1, 3), at(2025, 1, 28), at(2025, 2, 1)];
        let buckets = bucket_signups(dates.into_iter(), Bucket::Month);
        assert_eq!(buckets.len(), 2);
        assert_eq!(buckets[0].period, "2025-01");
        assert_eq!(buckets[0].user_count, 2);
    }

    #[test]
    fn category_shares_compute_rounded_percentages() {
        let cats = vec![Some("birthday"), Some("birthday"), Some("wedding")];
        let shares = category_shares(cats.into_iter(), 3);
        assert_eq!(shares[0].category, "birthday");
        assert_eq!(shares[0].count, 2);
        assert_eq!(shares[0].percentage, 66.67);
        assert_eq!(shares[1].percentage, 33.33);
    }

    #[test]
    fn missing_category_is_unknown() {
        let shares = category_shares(vec![None].into_iter(), 1);
        assert_eq!(shares[0].category, "Unknown");
        assert_eq!(shares[0].percentage, 100.0);
    }

    #[test]
    fn zero_total_avoids_division() {
        let shares = category_shares(std::iter::empty(), 0);
        assert!(shares.is_empty());
    }
}
