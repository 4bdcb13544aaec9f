//! Pagination on top of list endpoints that only understand `limit`/`offset`.
//!
//! Three flavours are provided:
//!
//! - [`PageRequest`]: record pagination with client-side date filtering. The
//!   upstream list is over-fetched from offset 0, filtered, then sliced.
//! - [`TimeWindow`]: a single video split into fixed 300-second pages.
//! - [`EntityPage`]: 25 segment entities per page, paged by the server.

use crate::batch::BatchItem;
use crate::client::{FileRecord, ListResponse};
use chrono::{DateTime, NaiveDate, Utc};
use cloudglue_mcp_common::error::{Error, Result};
use serde::Serialize;
use serde_json::Value;
use std::future::Future;

/// Extra records fetched beyond `offset + limit` to absorb filtered-out items.
pub const OVER_FETCH_MARGIN: u32 = 50;

/// Largest page the list endpoints return.
pub const MAX_UPSTREAM_PAGE: u32 = 100;

/// Length of one time-range page.
pub const TIME_WINDOW_SECONDS: f64 = 300.0;

/// Segment entities per page.
pub const ENTITIES_PER_PAGE: u32 = 25;

const DAY_FORMAT: &str = "%Y-%m-%d";

/// Something with a creation timestamp.
pub trait Dated {
    /// Parsed timestamp; missing or unreadable values sort as the Unix epoch.
    fn created_at(&self) -> DateTime<Utc>;
}

/// Parse an ISO-8601 string, or a number of milliseconds since the epoch.
pub fn parse_timestamp(value: &Value) -> Option<DateTime<Utc>> {
    match value {
        Value::String(s) => parse_iso(s),
        Value::Number(n) => n.as_i64().and_then(DateTime::from_timestamp_millis),
        _ => None,
    }
}

fn parse_iso(s: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s)
        .map(|d| d.with_timezone(&Utc))
        .ok()
        .or_else(|| {
            chrono::NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.f")
                .ok()
                .map(|n| n.and_utc())
        })
}

fn or_epoch(at: Option<DateTime<Utc>>) -> DateTime<Utc> {
    at.unwrap_or(DateTime::UNIX_EPOCH)
}

impl Dated for Value {
    fn created_at(&self) -> DateTime<Utc> {
        let raw = self
            .get("created_at")
            .filter(|v| !v.is_null())
            .or_else(|| self.get("added_at").filter(|v| !v.is_null()));
        or_epoch(raw.and_then(parse_timestamp))
    }
}

impl Dated for FileRecord {
    fn created_at(&self) -> DateTime<Utc> {
        or_epoch(self.created_at.as_ref().and_then(parse_timestamp))
    }
}

/// A looked-up record is dated by what the lookup returned; failed lookups by the epoch.
impl<T, R: Dated> Dated for BatchItem<T, R> {
    fn created_at(&self) -> DateTime<Utc> {
        self.result
            .as_ref()
            .map(Dated::created_at)
            .unwrap_or(DateTime::UNIX_EPOCH)
    }
}

/// Optional creation-date bounds, given as `YYYY-MM-DD` in UTC.
///
/// `after` keeps items created strictly after the start of that day;
/// `before` keeps items created strictly before the last millisecond of that day.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DateRange {
    after: Option<NaiveDate>,
    before: Option<NaiveDate>,
}

impl DateRange {
    /// Parse the two optional bounds. Malformed dates are validation errors.
    pub fn parse(created_after: Option<&str>, created_before: Option<&str>) -> Result<Self> {
        Ok(Self {
            after: created_after.map(|d| parse_day("created_after", d)).transpose()?,
            before: created_before.map(|d| parse_day("created_before", d)).transpose()?,
        })
    }

    pub fn is_empty(&self) -> bool {
        self.after.is_none() && self.before.is_none()
    }

    fn after_bound(&self) -> Option<DateTime<Utc>> {
        self.after
            .and_then(|d| d.and_hms_milli_opt(0, 0, 0, 0))
            .map(|n| n.and_utc())
    }

    fn before_bound(&self) -> Option<DateTime<Utc>> {
        self.before
            .and_then(|d| d.and_hms_milli_opt(23, 59, 59, 999))
            .map(|n| n.and_utc())
    }

    pub fn contains(&self, at: DateTime<Utc>) -> bool {
        if let Some(after) = self.after_bound() {
            if at <= after {
                return false;
            }
        }
        if let Some(before) = self.before_bound() {
            if at >= before {
                return false;
            }
        }
        true
    }

    pub fn created_after(&self) -> Option<String> {
        self.after.map(|d| d.format(DAY_FORMAT).to_string())
    }

    pub fn created_before(&self) -> Option<String> {
        self.before.map(|d| d.format(DAY_FORMAT).to_string())
    }
}

fn parse_day(field: &str, raw: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(raw.trim(), DAY_FORMAT).map_err(|_| {
        Error::validation(format!("{} must be a date in YYYY-MM-DD format, got '{}'", field, raw))
    })
}

/// Caller's page of interest plus date filters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub limit: u32,
    pub offset: u32,
    pub range: DateRange,
}

impl PageRequest {
    pub fn new(limit: u32, offset: u32, range: DateRange) -> Self {
        Self {
            limit: limit.max(1),
            offset,
            range,
        }
    }

    /// Number of records to request from offset 0.
    pub fn fetch_limit(&self) -> u32 {
        self.limit
            .saturating_add(self.offset)
            .saturating_add(OVER_FETCH_MARGIN)
            .min(MAX_UPSTREAM_PAGE)
    }

    /// Filter by date in fetched order, then slice `[offset, offset + limit)`.
    ///
    /// Without date filters the upstream `total` (when known) is reported as
    /// the filtered total; pass `None` when the candidates were pre-filtered.
    pub fn paginate<T: Dated>(&self, items: Vec<T>, upstream_total: Option<u64>) -> PageResult<T> {
        let filtered: Vec<T> = if self.range.is_empty() {
            items
        } else {
            items
                .into_iter()
                .filter(|item| self.range.contains(item.created_at()))
                .collect()
        };

        let total_filtered = match (self.range.is_empty(), upstream_total) {
            (true, Some(total)) => total.max(filtered.len() as u64),
            _ => filtered.len() as u64,
        };

        let page: Vec<T> = filtered
            .into_iter()
            .skip(self.offset as usize)
            .take(self.limit as usize)
            .collect();

        PageResult {
            total_returned: page.len(),
            items: page,
            offset: self.offset,
            limit: self.limit,
            has_more: u64::from(self.offset) + u64::from(self.limit) < total_filtered,
            total_filtered,
            created_after: self.range.created_after(),
            created_before: self.range.created_before(),
        }
    }
}

/// One page of filtered records.
#[derive(Debug, Clone, PartialEq)]
pub struct PageResult<T> {
    pub items: Vec<T>,
    pub offset: u32,
    pub limit: u32,
    pub total_returned: usize,
    pub total_filtered: u64,
    pub has_more: bool,
    pub created_after: Option<String>,
    pub created_before: Option<String>,
}

/// Pagination block embedded in tool responses.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PaginationInfo {
    pub offset: u32,
    pub limit: u32,
    pub total_returned: usize,
    pub total_filtered: u64,
    pub has_more: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filtered_after: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filtered_before: Option<String>,
}

impl<T> PageResult<T> {
    pub fn pagination(&self) -> PaginationInfo {
        PaginationInfo {
            offset: self.offset,
            limit: self.limit,
            total_returned: self.total_returned,
            total_filtered: self.total_filtered,
            has_more: self.has_more,
            filtered_after: self.created_after.clone(),
            filtered_before: self.created_before.clone(),
        }
    }

    /// Replace the items, keeping the pagination figures.
    pub fn map<U>(self, f: impl FnMut(T) -> U) -> PageResult<U> {
        PageResult {
            items: self.items.into_iter().map(f).collect(),
            offset: self.offset,
            limit: self.limit,
            total_returned: self.total_returned,
            total_filtered: self.total_filtered,
            has_more: self.has_more,
            created_after: self.created_after,
            created_before: self.created_before,
        }
    }
}

/// Over-fetch from `fetch(limit, offset)`, then filter and slice.
pub async fn filter_fetch<T, F, Fut>(request: &PageRequest, fetch: F) -> Result<PageResult<T>>
where
    T: Dated,
    F: FnOnce(u32, u32) -> Fut,
    Fut: Future<Output = Result<ListResponse<T>>>,
{
    let response = fetch(request.fetch_limit(), 0).await?;
    Ok(request.paginate(response.data, response.total))
}

/// A 300-second slice of one video.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TimeWindow {
    /// Zero-based page index
    pub page: u32,
    pub total_pages: u32,
    pub start_seconds: f64,
    pub end_seconds: f64,
}

impl TimeWindow {
    /// `ceil(duration / 300)`, never less than 1.
    pub fn total_pages(duration_seconds: f64) -> u32 {
        if !duration_seconds.is_finite() || duration_seconds <= 0.0 {
            return 1;
        }
        ((duration_seconds / TIME_WINDOW_SECONDS).ceil() as u32).max(1)
    }

    /// Window for a zero-based page. Pages past the end are rejected.
    pub fn for_page(page: u32, duration_seconds: f64) -> Result<Self> {
        let total_pages = Self::total_pages(duration_seconds);
        if page >= total_pages {
            return Err(Error::validation(format!(
                "page {} is out of range; the video has {} page(s) of {} seconds",
                page, total_pages, TIME_WINDOW_SECONDS
            )));
        }

        let start_seconds = f64::from(page) * TIME_WINDOW_SECONDS;
        let end_seconds = if duration_seconds.is_finite() && duration_seconds > 0.0 {
            (start_seconds + TIME_WINDOW_SECONDS).min(duration_seconds)
        } else {
            start_seconds + TIME_WINDOW_SECONDS
        };

        Ok(Self {
            page,
            total_pages,
            start_seconds,
            end_seconds,
        })
    }
}

/// Zero-based page of segment entities.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct EntityPage {
    pub page: u32,
}

impl EntityPage {
    pub fn new(page: u32) -> Self {
        Self { page }
    }

    pub fn limit(&self) -> u32 {
        ENTITIES_PER_PAGE
    }

    pub fn offset(&self) -> u32 {
        self.page.saturating_mul(ENTITIES_PER_PAGE)
    }

    /// `ceil(total / 25)`, or 1 for an empty result.
    pub fn total_pages(total: u64) -> u32 {
        if total == 0 {
            1
        } else {
            total.div_ceil(u64::from(ENTITIES_PER_PAGE)) as u32
        }
    }

    /// Slice a fully materialised list the same way the server would.
    pub fn slice<'a, T>(&self, items: &'a [T]) -> &'a [T] {
        let start = (self.offset() as usize).min(items.len());
        let end = (start + ENTITIES_PER_PAGE as usize).min(items.len());
        &items[start..end]
    }
}
