//! Typed builders for the list-endpoint filter contract.
//!
//! Every admin list service accepts the same query shape
//! (`q`, `startDate`, `endDate`, `page`, `limit`, `sortBy`, `sortOrder`,
//! `cursor`) and composes it into sea-orm conditions here instead of
//! assembling untyped filter maps at each call site.

use chrono::{DateTime, NaiveDate, Utc};
use sea_orm::{ColumnTrait, Condition};
use serde::Deserialize;
use utoipa::IntoParams;

use crate::errors::ServiceError;

pub const DEFAULT_PAGE: u64 = 1;
pub const DEFAULT_LIMIT: u64 = 10;

/// Query parameters shared by the admin list endpoints.
#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
pub struct ListParams {
    /// Case-insensitive substring search
    pub q: Option<String>,
    /// Inclusive start date, `YYYY-MM-DD`
    pub start_date: Option<String>,
    /// Inclusive end date, `YYYY-MM-DD`
    pub end_date: Option<String>,
    pub page: Option<u64>,
    pub limit: Option<u64>,
    pub sort_by: Option<String>,
    pub sort_order: Option<String>,
    /// Row id to resume after (cursor pagination)
    pub cursor: Option<String>,
}

impl ListParams {
    /// Search input with surrounding whitespace removed; empty searches are
    /// treated as absent.
    pub fn search_term(&self) -> Option<String> {
        self.q
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
    }

    /// Effective page number. A search always restarts from the first page
    /// regardless of the caller-supplied value.
    pub fn effective_page(&self) -> u64 {
        if self.search_term().is_some() {
            DEFAULT_PAGE
        } else {
            self.page.unwrap_or(DEFAULT_PAGE).max(1)
        }
    }

    pub fn limit(&self) -> u64 {
        self.limit.unwrap_or(DEFAULT_LIMIT).max(1)
    }

    pub fn offset(&self) -> u64 {
        (self.effective_page() - 1) * self.limit()
    }

    pub fn descending(&self) -> bool {
        !matches!(self.sort_order.as_deref(), Some("asc"))
    }
}

/// Inclusive created-at window expanded to whole-day bounds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateRange {
    pub gte: Option<DateTime<Utc>>,
    pub lte: Option<DateTime<Utc>>,
}

fn start_of_day(date: &str) -> Result<DateTime<Utc>, ServiceError> {
    let day = NaiveDate::parse_from_str(date, "%Y-%m-%d")
        .map_err(|_| ServiceError::ValidationError(format!("invalid date: {date}")))?;
    Ok(day.and_hms_opt(0, 0, 0).unwrap_or_default().and_utc())
}

fn end_of_day(date: &str) -> Result<DateTime<Utc>, ServiceError> {
    let day = NaiveDate::parse_from_str(date, "%Y-%m-%d")
        .map_err(|_| ServiceError::ValidationError(format!("invalid date: {date}")))?;
    Ok(day
        .and_hms_milli_opt(23, 59, 59, 999)
        .unwrap_or_default()
        .and_utc())
}

impl DateRange {
    /// Independent bounds: each provided date clamps its own side.
    pub fn bounds(start: Option<&str>, end: Option<&str>) -> Result<Self, ServiceError> {
        Ok(Self {
            gte: start.map(start_of_day).transpose()?,
            lte: end.map(end_of_day).transpose()?,
        })
    }

    /// Day-window semantics: a lone date (either side) selects that whole
    /// day; two dates select the inclusive range.
    pub fn day_window(start: Option<&str>, end: Option<&str>) -> Result<Self, ServiceError> {
        match (start, end) {
            (Some(s), None) => Ok(Self {
                gte: Some(start_of_day(s)?),
                lte: Some(end_of_day(s)?),
            }),
            (None, Some(e)) => Ok(Self {
                gte: Some(start_of_day(e)?),
                lte: Some(end_of_day(e)?),
            }),
            (start, end) => Self::bounds(start, end),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.gte.is_none() && self.lte.is_none()
    }

    /// Renders the window as a condition on the given timestamp column.
    pub fn condition<C: ColumnTrait>(&self, column: C) -> Condition {
        let mut cond = Condition::all();
        if let Some(gte) = self.gte {
            cond = cond.add(column.gte(gte));
        }
        if let Some(lte) = self.lte {
            cond = cond.add(column.lte(lte));
        }
        cond
    }
}

/// OR-of-substring-matches over a set of text columns.
pub fn search_any<C: ColumnTrait>(columns: &[C], term: &str) -> Condition {
    let mut cond = Condition::any();
    for column in columns {
        cond = cond.add(column.contains(term));
    }
    cond
}

/// Pagination block of the uniform list envelope.
#[derive(Debug, Clone, serde::Serialize, utoipa::ToSchema)]
pub struct Pagination {
    pub current_page: u64,
    pub total_pages: u64,
    pub total_items: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cursor: Option<String>,
}

/// Uniform paginated result: metadata plus the shaped rows.
#[derive(Debug, Clone, serde::Serialize)]
pub struct Page<T> {
    pub pagination: Pagination,
    pub data: Vec<T>,
}

impl Pagination {
    pub fn new(current_page: u64, limit: u64, total_items: u64) -> Self {
        Self {
            current_page,
            total_pages: total_items.div_ceil(limit.max(1)),
            total_items,
            cursor: None,
        }
    }

    pub fn with_cursor(mut self, cursor: Option<String>) -> Self {
        self.cursor = cursor;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Timelike;

    #[test]
    fn search_resets_page_to_first() {
        let params = ListParams {
            q: Some("acme".into()),
            page: Some(7),
            ..Default::default()
        };
        assert_eq!(params.effective_page(), 1);
    }

    #[test]
    fn blank_search_is_ignored() {
        let params = ListParams {
            q: Some("   ".into()),
            page: Some(3),
            ..Default::default()
        };
        assert_eq!(params.search_term(), None);
        assert_eq!(params.effective_page(), 3);
    }

    #[test]
    fn offset_is_zero_based() {
        let params = ListParams {
            page: Some(3),
            limit: Some(10),
            ..Default::default()
        };
        assert_eq!(params.offset(), 20);
    }

    #[test]
    fn date_range_expands_to_whole_days() {
        let range = DateRange::bounds(Some("2025-03-01"), Some("2025-03-02")).unwrap();
        let gte = range.gte.unwrap();
        let lte = range.lte.unwrap();
        assert_eq!(gte.hour(), 0);
        assert_eq!(lte.hour(), 23);
        assert_eq!(lte.minute(), 59);
    }

    #[test]
    fn lone_date_selects_single_day_window() {
        let range = DateRange::day_window(Some("2025-03-01"), None).unwrap();
        assert!(range.gte.is_some());
        assert!(range.lte.is_some());
        assert_eq!(
            range.gte.unwrap().date_naive(),
            range.lte.unwrap().date_naive()
        );
    }

    #[test]
    fn invalid_date_is_a_validation_error() {
        assert!(DateRange::bounds(Some("03/01/2025"), None).is_err());
    }

    #[test]
    fn total_pages_is_ceiling_division() {
        assert_eq!(Pagination::new(1, 10, 0).total_pages, 0);
        assert_eq!(Pagination::new(1, 10, 10).total_pages, 1);
        assert_eq!(Pagination::new(1, 10, 11).total_pages, 2);
        assert_eq!(Pagination::new(1, 10, 95).total_pages, 10);
    }
}
