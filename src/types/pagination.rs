//! Pagination types for list endpoints.

use serde::Serialize;
use utoipa::ToSchema;

use crate::config::{DEFAULT_PAGE_NUMBER, DEFAULT_PAGE_SIZE, MAX_PAGE_SIZE};

/// Resolved page request (1-indexed page, capped limit)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PaginationParams {
    pub page: u64,
    pub limit: u64,
}

impl PaginationParams {
    /// Resolve raw query values. Missing, non-numeric or non-positive values
    /// fall back to the defaults; the limit is capped at `MAX_PAGE_SIZE`.
    pub fn from_query(page: Option<&str>, limit: Option<&str>) -> Self {
        let page = parse_positive(page).unwrap_or(DEFAULT_PAGE_NUMBER);
        let limit = parse_positive(limit)
            .unwrap_or(DEFAULT_PAGE_SIZE)
            .min(MAX_PAGE_SIZE);
        Self { page, limit }
    }

    /// Calculate offset for database query, clamped to what Postgres accepts
    pub fn offset(&self) -> u64 {
        self.page
            .saturating_sub(1)
            .saturating_mul(self.limit)
            .min(i64::MAX as u64)
    }
}

impl Default for PaginationParams {
    fn default() -> Self {
        Self {
            page: DEFAULT_PAGE_NUMBER,
            limit: DEFAULT_PAGE_SIZE,
        }
    }
}

fn parse_positive(raw: Option<&str>) -> Option<u64> {
    raw.and_then(|v| v.trim().parse::<u64>().ok())
        .filter(|v| *v > 0)
}

/// Pagination metadata
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PaginationMeta {
    pub current_page: u64,
    pub total_pages: u64,
    pub total_count: u64,
    pub limit: u64,
    pub has_next_page: bool,
    pub has_prev_page: bool,
}

impl PaginationMeta {
    pub fn new(params: PaginationParams, total_count: u64) -> Self {
        let total_pages = total_count.div_ceil(params.limit.max(1));
        Self {
            current_page: params.page,
            total_pages,
            total_count,
            limit: params.limit,
            has_next_page: params.page < total_pages,
            has_prev_page: params.page > 1,
        }
    }
}

/// One page of results together with its metadata
#[derive(Debug, Clone)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub meta: PaginationMeta,
}

impl<T> Page<T> {
    pub fn new(items: Vec<T>, params: PaginationParams, total_count: u64) -> Self {
        Self {
            items,
            meta: PaginationMeta::new(params, total_count),
        }
    }

    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Page<U> {
        Page {
            items: self.items.into_iter().map(f).collect(),
            meta: self.meta,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_when_missing() {
        let params = PaginationParams::from_query(None, None);
        assert_eq!(params, PaginationParams { page: 1, limit: 10 });
        assert_eq!(params.offset(), 0);
    }

    #[test]
    fn test_invalid_values_fall_back() {
        let params = PaginationParams::from_query(Some("abc"), Some("0"));
        assert_eq!(params, PaginationParams { page: 1, limit: 10 });
        let params = PaginationParams::from_query(Some("-2"), Some("-5"));
        assert_eq!(params, PaginationParams { page: 1, limit: 10 });
    }

    #[test]
    fn test_limit_capped() {
        let params = PaginationParams::from_query(Some("3"), Some("1000"));
        assert_eq!(params.limit, MAX_PAGE_SIZE);
        assert_eq!(params.offset(), 200);
    }

    #[test]
    fn test_huge_page_does_not_overflow() {
        let params = PaginationParams::from_query(Some("18446744073709551615"), Some("10"));
        assert_eq!(params.page, u64::MAX);
        assert_eq!(params.offset(), i64::MAX as u64);

        let meta = PaginationMeta::new(params, 25);
        assert!(!meta.has_next_page);
        assert!(meta.has_prev_page);
    }

    #[test]
    fn test_meta_flags() {
        let meta = PaginationMeta::new(PaginationParams { page: 2, limit: 10 }, 25);
        assert_eq!(meta.total_pages, 3);
        assert!(meta.has_next_page);
        assert!(meta.has_prev_page);

        let last = PaginationMeta::new(PaginationParams { page: 3, limit: 10 }, 25);
        assert!(!last.has_next_page);
    }

    #[test]
    fn test_meta_empty() {
        let meta = PaginationMeta::new(PaginationParams::default(), 0);
        assert_eq!(meta.total_pages, 0);
        assert!(!meta.has_next_page);
        assert!(!meta.has_prev_page);
    }
}
