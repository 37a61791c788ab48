use chrono::{DateTime, Datelike, Duration, TimeZone, Utc};
use rust_decimal::Decimal;
use sea_orm::{
    ColumnTrait, Condition, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, QuerySelect,
};
use serde::Serialize;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Arc;
use tracing::instrument;
use uuid::Uuid;

use crate::db::filter::DateRange;
use crate::entities::{order, payment_transaction, traffic_source, user, video};
use crate::errors::ServiceError;
use crate::services::traffic::{count_by_source, TrafficCount};
use crate::storage::{self, ObjectStorage};

const GROWTH_BUCKETS: usize = 12;

#[derive(Debug, Serialize)]
pub struct RecentOrder {
    pub id: Uuid,
    pub total_amount: Decimal,
    pub status: String,
    pub created_at: DateTime<Utc>,
    pub customer_name: Option<String>,
    pub customer_email: Option<String>,
    pub customer_avatar_url: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct CategoryCount {
    pub category_name: String,
    pub order_count: u64,
}

#[derive(Debug, Serialize)]
pub struct CategoryWindows {
    pub last_7_days: Vec<CategoryCount>,
    pub this_month: Vec<CategoryCount>,
    pub last_month: Vec<CategoryCount>,
    pub last_year: Vec<CategoryCount>,
    pub lifetime: Vec<CategoryCount>,
}

#[derive(Debug, Serialize)]
pub struct TrafficWindows {
    pub last_7_days: Vec<TrafficCount>,
    pub this_month: Vec<TrafficCount>,
    pub last_month: Vec<TrafficCount>,
    pub this_year: Vec<TrafficCount>,
    pub last_year: Vec<TrafficCount>,
}

#[derive(Debug, Serialize)]
pub struct MonthlyRevenue {
    pub month: String,
    pub revenue: Decimal,
}

#[derive(Debug, Serialize)]
pub struct CityCount {
    pub city: String,
    pub count: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GrowthBucket {
    pub label: String,
    pub new_customers: u64,
    pub returning_customers: u64,
}

#[derive(Debug, Serialize)]
pub struct DateRangeEcho {
    pub start: String,
    pub end: String,
}

#[derive(Debug, Serialize)]
pub struct DashboardOverview {
    pub total_revenue: Decimal,
    pub total_orders: u64,
    pub total_vendors: u64,
    pub total_users: u64,
    pub date_range: DateRangeEcho,
    pub orders: Vec<RecentOrder>,
    pub orders_by_category: CategoryWindows,
    pub last_week_sales: Decimal,
    pub revenue_per_month: Vec<MonthlyRevenue>,
    pub confirmed_bookings: u64,
    pub pending_bookings: u64,
    pub cancelled_bookings: u64,
    pub processing_bookings: u64,
    pub traffic_sources: TrafficWindows,
    pub top_location_for_customer: Vec<CityCount>,
    pub customer_growth_weekly: Vec<GrowthBucket>,
    pub customer_growth_monthly: Vec<GrowthBucket>,
    pub customer_growth_yearly: Vec<GrowthBucket>,
}

#[derive(Debug, Serialize)]
pub struct UserPaymentRow {
    pub id: Uuid,
    pub created_at: DateTime<Utc>,
    pub amount: Option<Decimal>,
    pub status: String,
}

#[derive(Debug, Serialize)]
pub struct UserVideoOrder {
    pub id: Uuid,
    pub title: Option<String>,
    pub image: Option<String>,
    pub category: Option<String>,
    pub status: String,
    pub date: DateTime<Utc>,
    pub price: Decimal,
}

#[derive(Debug, Serialize)]
pub struct UserOverview {
    pub user_id: Uuid,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub email: String,
    pub order_count: u64,
    pub total_spending: Decimal,
    pub payment_history: Vec<UserPaymentRow>,
    pub video_orders: Vec<UserVideoOrder>,
}

/// Read-only dashboard aggregation. Vendor callers see only their own
/// orders; admins see everything.
#[derive(Clone)]
pub struct DashboardService {
    db: Arc<DatabaseConnection>,
    storage: Arc<dyn ObjectStorage>,
}

impl DashboardService {
    pub fn new(db: Arc<DatabaseConnection>, storage: Arc<dyn ObjectStorage>) -> Self {
        Self { db, storage }
    }

    #[instrument(skip(self))]
    pub async fn admin_overview(
        &self,
        requester: Option<Uuid>,
        start_date: Option<&str>,
        end_date: Option<&str>,
    ) -> Result<DashboardOverview, ServiceError> {
        let now = Utc::now();
        let last_week_start = now - Duration::days(7);

        // Vendor accounts are scoped to their own orders.
        let mut scope = Condition::all();
        if let Some(requester) = requester {
            let details = user::Entity::find_by_id(requester).one(&*self.db).await?;
            if details.map(|u| u.user_type) == Some("vendor".to_string()) {
                scope = scope.add(order::Column::VendorId.eq(requester));
            }
        }

        // Explicit dates clamp to whole days; the default window is the
        // trailing week.
        let range = DateRange::bounds(start_date, end_date)?;
        let window = if range.is_empty() {
            Condition::all().add(order::Column::CreatedAt.gte(last_week_start))
        } else {
            range.condition(order::Column::CreatedAt)
        };

        let recent = order::Entity::find()
            .find_also_related(user::Entity)
            .filter(scope.clone())
            .filter(window.clone())
            .order_by_desc(order::Column::CreatedAt)
            .limit(7)
            .all(&*self.db)
            .await?;
        let orders = recent
            .into_iter()
            .map(|(o, u)| RecentOrder {
                id: o.id,
                total_amount: o.total_amount,
                status: o.status,
                created_at: o.created_at,
                customer_name: u.as_ref().map(|u| u.name.clone()),
                customer_email: u.as_ref().map(|u| u.email.clone()),
                customer_avatar_url: u
                    .as_ref()
                    .and_then(|u| u.avatar.as_deref())
                    .map(|name| self.storage.url(&storage::avatar_key(name))),
            })
            .collect();

        let total_orders = order::Entity::find()
            .filter(scope.clone())
            .filter(window.clone())
            .count(&*self.db)
            .await?;

        let total_vendors = user::Entity::find()
            .filter(user::Column::UserType.eq("vendor"))
            .filter(if range.is_empty() {
                Condition::all().add(user::Column::CreatedAt.gte(last_week_start))
            } else {
                range.condition(user::Column::CreatedAt)
            })
            .count(&*self.db)
            .await?;

        let total_users = user::Entity::find()
            .filter(user::Column::UserType.eq("user"))
            .filter(user::Column::CreatedAt.gte(last_week_start))
            .count(&*self.db)
            .await?;

        // Revenue figures ignore the date window, matching the headline
        // lifetime totals on the dashboard.
        let scoped_orders = order::Entity::find()
            .filter(scope.clone())
            .all(&*self.db)
            .await?;
        let total_revenue: Decimal = scoped_orders.iter().map(|o| o.total_amount).sum();
        let revenue_per_month = monthly_revenue(&scoped_orders);

        let booking_count = |status: &'static str| {
            let scope = scope.clone();
            async move {
                order::Entity::find()
                    .filter(scope)
                    .filter(order::Column::Status.eq(status))
                    .count(&*self.db)
                    .await
            }
        };
        let confirmed_bookings = booking_count("confirmed").await?;
        let pending_bookings = booking_count("pending").await?;
        let cancelled_bookings = booking_count("cancelled").await?;
        let processing_bookings = booking_count("processing").await?;

        let last_week_sales: Decimal = order::Entity::find()
            .filter(scope.clone())
            .filter(order::Column::Status.eq("completed"))
            .filter(order::Column::CreatedAt.gte(last_week_start))
            .all(&*self.db)
            .await?
            .iter()
            .map(|o| o.total_amount)
            .sum();

        let windows = Windows::at(now);
        let orders_by_category = CategoryWindows {
            last_7_days: self
                .categories_between(&scope, Some((windows.last_7_days, now)))
                .await?,
            this_month: self
                .categories_between(&scope, Some((windows.this_month_start, now)))
                .await?,
            last_month: self
                .categories_between(
                    &scope,
                    Some((windows.last_month_start, windows.last_month_end)),
                )
                .await?,
            last_year: self
                .categories_between(
                    &scope,
                    Some((windows.last_year_start, windows.last_year_end)),
                )
                .await?,
            lifetime: self.categories_between(&scope, None).await?,
        };

        let traffic_sources = TrafficWindows {
            last_7_days: self.traffic_between(windows.last_7_days, now).await?,
            this_month: self.traffic_between(windows.this_month_start, now).await?,
            last_month: self
                .traffic_between(windows.last_month_start, windows.last_month_end)
                .await?,
            this_year: self.traffic_between(windows.this_year_start, now).await?,
            last_year: self
                .traffic_between(windows.last_year_start, windows.last_year_end)
                .await?,
        };

        let top_location_for_customer = top_cities(&scoped_orders);

        // Customer growth inspects the trailing 12 years of orders once
        // and classifies per bucket.
        let growth_window_start = shift_years(now, -(GROWTH_BUCKETS as i32));
        let growth_orders: Vec<(Uuid, DateTime<Utc>)> = order::Entity::find()
            .filter(scope.clone())
            .filter(order::Column::CreatedAt.gte(growth_window_start))
            .all(&*self.db)
            .await?
            .into_iter()
            .map(|o| (o.user_id, o.created_at))
            .collect();
        let (customer_growth_weekly, customer_growth_monthly, customer_growth_yearly) =
            customer_growth(&growth_orders, now);

        Ok(DashboardOverview {
            total_revenue,
            total_orders,
            total_vendors,
            total_users,
            date_range: DateRangeEcho {
                start: start_date.unwrap_or("last week").to_string(),
                end: end_date.unwrap_or("current").to_string(),
            },
            orders,
            orders_by_category,
            last_week_sales,
            revenue_per_month,
            confirmed_bookings,
            pending_bookings,
            cancelled_bookings,
            processing_bookings,
            traffic_sources,
            top_location_for_customer,
            customer_growth_weekly,
            customer_growth_monthly,
            customer_growth_yearly,
        })
    }

    /// Per-user dashboard: spend, payment history and purchased media.
    #[instrument(skip(self))]
    pub async fn user_overview(&self, user_id: Uuid) -> Result<UserOverview, ServiceError> {
        let account = user::Entity::find_by_id(user_id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound("User not found".to_string()))?;

        let order_count = order::Entity::find()
            .filter(order::Column::UserId.eq(user_id))
            .count(&*self.db)
            .await?;

        let transactions = payment_transaction::Entity::find()
            .filter(payment_transaction::Column::UserId.eq(user_id))
            .order_by_desc(payment_transaction::Column::CreatedAt)
            .all(&*self.db)
            .await?;

        let total_spending: Decimal = transactions
            .iter()
            .filter(|tx| tx.status == "succeeded")
            .filter_map(|tx| tx.amount)
            .sum();

        let payment_history = transactions
            .into_iter()
            .map(|tx| UserPaymentRow {
                id: tx.id,
                created_at: tx.created_at,
                amount: tx.amount,
                status: tx.status,
            })
            .collect();

        let video_orders = order::Entity::find()
            .find_also_related(video::Entity)
            .filter(order::Column::UserId.eq(user_id))
            .order_by_desc(order::Column::CreatedAt)
            .all(&*self.db)
            .await?
            .into_iter()
            .map(|(o, v)| UserVideoOrder {
                id: o.id,
                title: v.as_ref().map(|v| v.title.clone()),
                image: v
                    .as_ref()
                    .and_then(|v| v.thumbnail_path.as_deref())
                    .map(|key| self.storage.url(key)),
                category: v.as_ref().and_then(|v| v.category.clone()),
                status: o.status,
                date: o.created_at,
                price: o.total_amount,
            })
            .collect();

        Ok(UserOverview {
            user_id: account.id,
            first_name: account.first_name,
            last_name: account.last_name,
            email: account.email,
            order_count,
            total_spending,
            payment_history,
            video_orders,
        })
    }

    async fn categories_between(
        &self,
        scope: &Condition,
        window: Option<(DateTime<Utc>, DateTime<Utc>)>,
    ) -> Result<Vec<CategoryCount>, ServiceError> {
        let mut query = order::Entity::find().filter(scope.clone());
        if let Some((start, end)) = window {
            query = query
                .filter(order::Column::CreatedAt.gte(start))
                .filter(order::Column::CreatedAt.lte(end));
        }
        let rows = query.all(&*self.db).await?;

        let mut counts: BTreeMap<String, u64> = BTreeMap::new();
        for row in rows {
            let name = row.category.unwrap_or_else(|| "Unknown".to_string());
            *counts.entry(name).or_insert(0) += 1;
        }
        Ok(counts
            .into_iter()
            .map(|(category_name, order_count)| CategoryCount {
                category_name,
                order_count,
            })
            .collect())
    }

    async fn traffic_between(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<TrafficCount>, ServiceError> {
        let rows = traffic_source::Entity::find()
            .filter(traffic_source::Column::CreatedAt.gte(start))
            .filter(traffic_source::Column::CreatedAt.lte(end))
            .all(&*self.db)
            .await?;
        Ok(count_by_source(rows.iter().map(|r| r.source.as_str())))
    }
}

struct Windows {
    last_7_days: DateTime<Utc>,
    this_month_start: DateTime<Utc>,
    last_month_start: DateTime<Utc>,
    last_month_end: DateTime<Utc>,
    this_year_start: DateTime<Utc>,
    last_year_start: DateTime<Utc>,
    last_year_end: DateTime<Utc>,
}

impl Windows {
    fn at(now: DateTime<Utc>) -> Self {
        let this_month_start = Utc
            .with_ymd_and_hms(now.year(), now.month(), 1, 0, 0, 0)
            .unwrap();
        let (prev_year, prev_month) = if now.month() == 1 {
            (now.year() - 1, 12)
        } else {
            (now.year(), now.month() - 1)
        };
        let last_month_start = Utc
            .with_ymd_and_hms(prev_year, prev_month, 1, 0, 0, 0)
            .unwrap();

        Self {
            last_7_days: now - Duration::days(7),
            this_month_start,
            last_month_start,
            last_month_end: this_month_start - Duration::milliseconds(1),
            this_year_start: Utc.with_ymd_and_hms(now.year(), 1, 1, 0, 0, 0).unwrap(),
            last_year_start: Utc.with_ymd_and_hms(now.year() - 1, 1, 1, 0, 0, 0).unwrap(),
            last_year_end: Utc
                .with_ymd_and_hms(now.year() - 1, 12, 31, 23, 59, 59)
                .unwrap(),
        }
    }
}

fn shift_years(now: DateTime<Utc>, years: i32) -> DateTime<Utc> {
    now.with_year(now.year() + years)
        .unwrap_or_else(|| now - Duration::days(365 * i64::from(years.unsigned_abs())))
}

fn monthly_revenue(orders: &[order::Model]) -> Vec<MonthlyRevenue> {
    let mut by_month: BTreeMap<String, Decimal> = BTreeMap::new();
    for row in orders {
        let key = row.created_at.format("%Y-%m").to_string();
        *by_month.entry(key).or_insert(Decimal::ZERO) += row.total_amount;
    }
    by_month
        .into_iter()
        .map(|(month, revenue)| MonthlyRevenue { month, revenue })
        .collect()
}

fn top_cities(orders: &[order::Model]) -> Vec<CityCount> {
    let mut counts: HashMap<&str, u64> = HashMap::new();
    for row in orders {
        if let Some(city) = row.city.as_deref() {
            *counts.entry(city).or_insert(0) += 1;
        }
    }
    let mut cities: Vec<CityCount> = counts
        .into_iter()
        .map(|(city, count)| CityCount {
            city: city.to_string(),
            count,
        })
        .collect();
    cities.sort_by(|a, b| b.count.cmp(&a.count).then(a.city.cmp(&b.city)));
    cities
}

#[derive(Default)]
struct CustomerActivity {
    order_count: u64,
    weeks: HashSet<i64>,
    months: HashSet<u32>,
    years: HashSet<i32>,
}

/// New-vs-returning classification over 12 weekly, monthly and yearly
/// buckets. A customer appears in every bucket (distinct week/month/year)
/// in which they placed at least one order, and counts as returning in
/// all of them when their total order count across the whole window
/// exceeds one.
pub fn customer_growth(
    orders: &[(Uuid, DateTime<Utc>)],
    now: DateTime<Utc>,
) -> (Vec<GrowthBucket>, Vec<GrowthBucket>, Vec<GrowthBucket>) {
    let mut activity: HashMap<Uuid, CustomerActivity> = HashMap::new();
    for (user_id, created_at) in orders {
        let entry = activity.entry(*user_id).or_default();
        entry.order_count += 1;
        entry
            .weeks
            .insert((now - *created_at).num_days().div_euclid(7));
        entry.months.insert(created_at.month0());
        entry.years.insert(created_at.year());
    }

    let mut weekly = Vec::with_capacity(GROWTH_BUCKETS);
    for i in 0..GROWTH_BUCKETS {
        let week_start = now - Duration::days(7 * i as i64);
        let label = format!(
            "{} week {}",
            week_start.format("%B"),
            week_start.day() / 7 + 1
        );
        let (new_customers, returning_customers) =
            classify(activity.values(), |a| a.weeks.contains(&(i as i64)));
        weekly.push(GrowthBucket {
            label,
            new_customers,
            returning_customers,
        });
    }

    let mut monthly = Vec::with_capacity(GROWTH_BUCKETS);
    for i in 0..GROWTH_BUCKETS as u32 {
        let label = Utc
            .with_ymd_and_hms(now.year(), i + 1, 1, 0, 0, 0)
            .unwrap()
            .format("%B")
            .to_string();
        let (new_customers, returning_customers) =
            classify(activity.values(), |a| a.months.contains(&i));
        monthly.push(GrowthBucket {
            label,
            new_customers,
            returning_customers,
        });
    }

    let mut yearly = Vec::with_capacity(GROWTH_BUCKETS);
    for i in 0..GROWTH_BUCKETS as i32 {
        let year = now.year() - i;
        let (new_customers, returning_customers) =
            classify(activity.values(), |a| a.years.contains(&year));
        yearly.push(GrowthBucket {
            label: year.to_string(),
            new_customers,
            returning_customers,
        });
    }

    (weekly, monthly, yearly)
}

fn classify<'a>(
    customers: impl Iterator<Item = &'a CustomerActivity>,
    in_bucket: impl Fn(&CustomerActivity) -> bool,
) -> (u64, u64) {
    let mut new_customers = 0;
    let mut returning_customers = 0;
    for customer in customers {
        if in_bucket(customer) {
            if customer.order_count > 1 {
                returning_customers += 1;
            } else {
                new_customers += 1;
            }
        }
    }
    (new_customers, returning_customers)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn at(y: i32, m: u32, d: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, 12, 0, 0).unwrap()
    }

    #[test]
    fn single_order_customer_is_new_in_its_week() {
        let user = Uuid::new_v4();
        let now = at(2025, 6, 15);
        let (weekly, _, _) = customer_growth(&[(user, now - Duration::days(2))], now);
        assert_eq!(weekly[0].new_customers, 1);
        assert_eq!(weekly[0].returning_customers, 0);
        // Absent from older buckets
        assert_eq!(weekly[5].new_customers, 0);
    }

    #[test]
    fn repeat_customer_is_returning_in_every_active_bucket() {
        let user = Uuid::new_v4();
        let now = at(2025, 6, 15);
        let orders = [
            (user, now - Duration::days(1)),
            (user, now - Duration::days(10)),
        ];
        let (weekly, _, _) = customer_growth(&orders, now);
        assert_eq!(weekly[0].returning_customers, 1);
        assert_eq!(weekly[1].returning_customers, 1);
        assert_eq!(weekly[0].new_customers, 0);
    }

    #[test]
    fn monthly_buckets_follow_calendar_months() {
        let user = Uuid::new_v4();
        let now = at(2025, 6, 15);
        // March order lands in bucket index 2
        let (_, monthly, _) = customer_growth(&[(user, at(2025, 3, 10))], now);
        assert_eq!(monthly[2].new_customers, 1);
        assert_eq!(monthly[2].label, "March");
        assert_eq!(monthly[5].new_customers, 0);
    }

    #[test]
    fn yearly_buckets_count_back_from_current_year() {
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        let now = at(2025, 6, 15);
        let orders = [
            (a, at(2025, 1, 1)),
            (b, at(2023, 5, 5)),
            (b, at(2023, 8, 8)),
        ];
        let (_, _, yearly) = customer_growth(&orders, now);
        assert_eq!(yearly[0].label, "2025");
        assert_eq!(yearly[0].new_customers, 1);
        assert_eq!(yearly[2].label, "2023");
        assert_eq!(yearly[2].returning_customers, 1);
    }

    #[test]
    fn growth_always_yields_twelve_buckets() {
        let now = at(2025, 6, 15);
        let (weekly, monthly, yearly) = customer_growth(&[], now);
        assert_eq!(weekly.len(), 12);
        assert_eq!(monthly.len(), 12);
        assert_eq!(yearly.len(), 12);
        assert!(weekly.iter().all(|b| b.new_customers == 0));
    }

    #[test]
    fn monthly_revenue_groups_and_sorts() {
        let mk = |ym: (i32, u32), amount: Decimal| order::Model {
            id: Uuid::new_v4(),
            invoice_number: "1000".into(),
            user_id: Uuid::new_v4(),
            vendor_id: None,
            status: "completed".into(),
            working_status: None,
            total_amount: amount,
            category: None,
            payment_status: "paid".into(),
            payment_provider: None,
            payment_reference_number: None,
            payment_raw_status: None,
            paid_amount: None,
            paid_currency: None,
            first_name: None,
            last_name: None,
            email: None,
            phone_number: None,
            country: None,
            city: None,
            occasion: None,
            recipient: None,
            delivery_deadline: None,
            comments: None,
            video_id: None,
            created_at: at(ym.0, ym.1, 10),
            updated_at: None,
        };
        let orders = vec![
            mk((2025, 2), dec!(10)),
            mk((2025, 1), dec!(5)),
            mk((2025, 2), dec!(7)),
        ];
        let monthly = monthly_revenue(&orders);
        assert_eq!(monthly[0].month, "2025-01");
        assert_eq!(monthly[0].revenue, dec!(5));
        assert_eq!(monthly[1].month, "2025-02");
        assert_eq!(monthly[1].revenue, dec!(17));
    }

    #[test]
    fn top_cities_rank_by_count() {
        let mut base = vec![];
        for city in ["Austin", "Boston", "Austin", "Chicago", "Austin", "Boston"] {
            let mut o = order::Model {
                id: Uuid::new_v4(),
                invoice_number: "1000".into(),
                user_id: Uuid::new_v4(),
                vendor_id: None,
                status: "completed".into(),
                working_status: None,
                total_amount: dec!(1),
                category: None,
                payment_status: "paid".into(),
                payment_provider: None,
                payment_reference_number: None,
                payment_raw_status: None,
                paid_amount: None,
                paid_currency: None,
                first_name: None,
                last_name: None,
                email: None,
                phone_number: None,
                country: None,
                city: None,
                occasion: None,
                recipient: None,
                delivery_deadline: None,
                comments: None,
                video_id: None,
                created_at: at(2025, 1, 1),
                updated_at: None,
            };
            o.city = Some(city.to_string());
            base.push(o);
        }
        let ranked = top_cities(&base);
        assert_eq!(ranked[0].city, "Austin");
        assert_eq!(ranked[0].count, 3);
        assert_eq!(ranked[1].city, "Boston");
    }
}
