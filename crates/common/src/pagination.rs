//! Pagination and date-range types.
//!
//! The data-access layer delegates page slicing and page assembly here;
//! repositories only run the count and window queries.

use chrono::{DateTime, NaiveDate, NaiveTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};

/// Default page number (1-indexed)
const DEFAULT_PAGE: u32 = 1;

/// Default items per page
const DEFAULT_PER_PAGE: u32 = 20;

/// Maximum items per page
const MAX_PER_PAGE: u32 = 100;

/// Page window requested by a caller.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaginationParams {
    /// Page number (1-indexed)
    #[serde(default = "default_page")]
    pub page: u32,

    /// Items per page
    #[serde(default = "default_per_page")]
    pub per_page: u32,
}

fn default_page() -> u32 {
    DEFAULT_PAGE
}

fn default_per_page() -> u32 {
    DEFAULT_PER_PAGE
}

impl Default for PaginationParams {
    fn default() -> Self {
        Self {
            page: DEFAULT_PAGE,
            per_page: DEFAULT_PER_PAGE,
        }
    }
}

impl PaginationParams {
    /// Create parameters, clamping zero and oversized values.
    pub fn new(page: u32, per_page: u32) -> Self {
        let page = if page == 0 { DEFAULT_PAGE } else { page };
        let per_page = if per_page == 0 {
            DEFAULT_PER_PAGE
        } else {
            per_page.min(MAX_PER_PAGE)
        };

        Self { page, per_page }
    }

    /// 0-indexed offset for the window query.
    ///
    /// `new()` clamps, but deserialized parameters can still carry a zero
    /// page; treat it as page 1 instead of underflowing.
    pub fn offset(&self) -> u32 {
        (self.page.max(1) - 1) * self.per_page
    }

    /// Row limit for the window query.
    pub fn limit(&self) -> u32 {
        self.per_page
    }
}

/// One bounded slice of a collection plus page metadata.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaginatedResult<T> {
    /// The items for the current page
    pub items: Vec<T>,

    /// Current page number (1-indexed)
    pub page: u32,

    /// Items per page
    pub per_page: u32,

    /// Total number of items across all pages
    pub total: u64,

    /// Total number of pages
    pub total_pages: u32,

    /// Whether there is a next page
    pub has_next: bool,

    /// Whether there is a previous page
    pub has_prev: bool,
}

impl<T> PaginatedResult<T> {
    /// Assemble a page from its items and the total match count.
    pub fn new(items: Vec<T>, page: u32, per_page: u32, total: u64) -> Self {
        let total_pages = ((total as f64) / (per_page as f64)).ceil() as u32;
        let has_next = page < total_pages;
        let has_prev = page > 1;

        Self {
            items,
            page,
            per_page,
            total,
            total_pages,
            has_next,
            has_prev,
        }
    }

    /// Assemble a page from the request parameters and total match count.
    pub fn from_params(items: Vec<T>, params: &PaginationParams, total: u64) -> Self {
        Self::new(items, params.page, params.per_page, total)
    }

    /// Map the items to a different type, keeping the metadata.
    pub fn map<U, F>(self, f: F) -> PaginatedResult<U>
    where
        F: FnMut(T) -> U,
    {
        PaginatedResult {
            items: self.items.into_iter().map(f).collect(),
            page: self.page,
            per_page: self.per_page,
            total: self.total,
            total_pages: self.total_pages,
            has_next: self.has_next,
            has_prev: self.has_prev,
        }
    }
}

/// Inclusive date range for BETWEEN-style filtering.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DateRange {
    /// Start instant (inclusive)
    pub start: Option<DateTime<Utc>>,

    /// End instant (inclusive)
    pub end: Option<DateTime<Utc>>,
}

impl DateRange {
    pub fn new(start: Option<DateTime<Utc>>, end: Option<DateTime<Utc>>) -> Self {
        Self { start, end }
    }

    /// Expand calendar dates to a [start-of-day, end-of-day] UTC pair.
    ///
    /// When only `to` is given, both bounds fall on that day, so a single
    /// date selects that whole day.
    pub fn day_bounds(from: Option<NaiveDate>, to: Option<NaiveDate>) -> Self {
        let start_of = |day: NaiveDate| Utc.from_utc_datetime(&day.and_time(NaiveTime::MIN));
        let end_of = |day: NaiveDate| {
            let end = NaiveTime::from_hms_micro_opt(23, 59, 59, 999_999)
                .unwrap_or(NaiveTime::MIN);
            Utc.from_utc_datetime(&day.and_time(end))
        };

        match (from, to) {
            (None, Some(day)) => Self::new(Some(start_of(day)), Some(end_of(day))),
            (Some(from), Some(to)) => Self::new(Some(start_of(from)), Some(end_of(to))),
            (Some(from), None) => Self::new(Some(start_of(from)), None),
            (None, None) => Self::default(),
        }
    }

    /// Validate that the bounds are ordered.
    pub fn validate(&self) -> Result<(), String> {
        if let (Some(start), Some(end)) = (self.start, self.end) {
            if start > end {
                return Err("Start date must be before or equal to end date".to_string());
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn params_defaults_and_window() {
        let params = PaginationParams::default();
        assert_eq!(params.page, 1);
        assert_eq!(params.per_page, 20);
        assert_eq!(params.offset(), 0);

        let params = PaginationParams::new(3, 25);
        assert_eq!(params.offset(), 50);
        assert_eq!(params.limit(), 25);
    }

    #[test]
    fn params_clamp_zero_and_oversized() {
        assert_eq!(PaginationParams::new(0, 20).page, 1);
        assert_eq!(PaginationParams::new(1, 0).per_page, 20);
        assert_eq!(PaginationParams::new(1, 500).per_page, 100);
    }

    #[test]
    fn zero_page_from_the_wire_does_not_underflow() {
        // serde defaults only cover absent fields; an explicit zero gets
        // through and must still window from the first page.
        let params: PaginationParams =
            serde_json::from_str(r#"{"page": 0, "per_page": 20}"#).unwrap();
        assert_eq!(params.page, 0);
        assert_eq!(params.offset(), 0);
        assert_eq!(params.limit(), 20);
    }

    #[test]
    fn page_metadata() {
        let result = PaginatedResult::new(vec![1, 2, 3, 4, 5], 2, 5, 23);
        assert_eq!(result.total_pages, 5);
        assert!(result.has_next);
        assert!(result.has_prev);

        let last = PaginatedResult::new(vec![1, 2, 3], 5, 5, 23);
        assert!(!last.has_next);
        assert!(last.has_prev);
    }

    #[test]
    fn page_map_keeps_metadata() {
        let result = PaginatedResult::new(vec![1, 2, 3], 1, 3, 9).map(|x| x * 10);
        assert_eq!(result.items, vec![10, 20, 30]);
        assert_eq!(result.total, 9);
        assert_eq!(result.total_pages, 3);
    }

    #[test]
    fn day_bounds_from_single_date() {
        let day = NaiveDate::from_ymd_opt(2024, 3, 5).unwrap();
        let range = DateRange::day_bounds(None, Some(day));

        let start = range.start.unwrap();
        let end = range.end.unwrap();
        assert_eq!(start.date_naive(), day);
        assert_eq!(end.date_naive(), day);
        assert!(start < end);
        assert!(range.validate().is_ok());
    }

    #[test]
    fn day_bounds_ordering_validation() {
        let from = NaiveDate::from_ymd_opt(2024, 3, 10).unwrap();
        let to = NaiveDate::from_ymd_opt(2024, 3, 1).unwrap();
        let range = DateRange::day_bounds(Some(from), Some(to));
        assert!(range.validate().is_err());
    }
}
