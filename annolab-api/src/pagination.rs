//! Page/limit handling for list endpoints

use serde::{Deserialize, Serialize};

/// Page size when the client does not ask for one
pub const DEFAULT_LIMIT: i64 = 20;

/// Upper bound on a requested page size
pub const MAX_LIMIT: i64 = 100;

/// Highest page number honoured; larger requests read this page
pub const MAX_PAGE: i64 = 1_000_000;

/// `?page=&limit=` query parameters
#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct PageQuery {
    pub page: Option<i64>,
    pub limit: Option<i64>,
}

/// Sanitized page window
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pagination {
    /// Current page number (1-indexed)
    pub page: i64,
    pub limit: i64,
    /// Offset for SQL LIMIT/OFFSET query
    pub offset: i64,
}

impl Pagination {
    /// Clamp the requested page and limit to valid values
    ///
    /// # Examples
    /// ```
    /// use annolab_api::pagination::Pagination;
    ///
    /// let p = Pagination::new(Some(3), Some(10));
    /// assert_eq!(p.offset, 20);
    ///
    /// // Page zero and oversized limits are clamped
    /// let p = Pagination::new(Some(0), Some(5000));
    /// assert_eq!(p.page, 1);
    /// assert_eq!(p.limit, 100);
    ///
    /// // So are absurd page numbers
    /// let p = Pagination::new(Some(i64::MAX), Some(100));
    /// assert_eq!(p.page, 1_000_000);
    /// ```
    pub fn new(page: Option<i64>, limit: Option<i64>) -> Self {
        let page = page.unwrap_or(1).clamp(1, MAX_PAGE);
        let limit = limit.unwrap_or(DEFAULT_LIMIT).clamp(1, MAX_LIMIT);
        Self {
            page,
            limit,
            offset: (page - 1) * limit,
        }
    }
}

impl From<PageQuery> for Pagination {
    fn from(query: PageQuery) -> Self {
        Pagination::new(query.page, query.limit)
    }
}

/// One page of results plus the total row count
#[derive(Debug, Serialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total: i64,
    pub page: i64,
    pub limit: i64,
}

impl<T> Page<T> {
    pub fn new(items: Vec<T>, total: i64, pagination: Pagination) -> Self {
        Self {
            items,
            total,
            page: pagination.page,
            limit: pagination.limit,
        }
    }
}
