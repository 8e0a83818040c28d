//! Paging and ordering types
//!
//! # Example
//!
//! ```rust
//! use acton_docstore::pagination::{PagingQuery, PagingResult};
//!
//! let query = PagingQuery::new(2, 20);
//! assert_eq!(query.skip(), 40);
//!
//! let page = PagingResult::new(query, 45, vec!["a", "b", "c", "d", "e"]);
//! assert_eq!(page.total, 45);
//! assert!(!page.has_more());
//! ```

use std::fmt;

use serde::{Deserialize, Serialize};

/// Default page size
pub const DEFAULT_PAGE_SIZE: i64 = 20;

/// Direction for ordering results
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderDirection {
    /// Sort in ascending order (A-Z, 0-9)
    #[serde(alias = "asc")]
    Ascending,
    /// Sort in descending order (Z-A, 9-0)
    #[default]
    #[serde(alias = "desc")]
    Descending,
}

impl OrderDirection {
    /// Store-native sort value: `1` ascending, `-1` descending
    #[must_use]
    pub const fn as_i32(self) -> i32 {
        match self {
            Self::Ascending => 1,
            Self::Descending => -1,
        }
    }
}

impl fmt::Display for OrderDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Ascending => write!(f, "asc"),
            Self::Descending => write!(f, "desc"),
        }
    }
}

/// Zero-based page request
///
/// Deserializes from query strings such as `?page=1&count=50`; missing
/// fields take their defaults.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PagingQuery {
    /// Zero-based page index
    #[serde(default)]
    pub page: i64,
    /// Page size
    #[serde(default = "default_count")]
    pub count: i64,
}

fn default_count() -> i64 {
    DEFAULT_PAGE_SIZE
}

impl Default for PagingQuery {
    fn default() -> Self {
        Self {
            page: 0,
            count: DEFAULT_PAGE_SIZE,
        }
    }
}

impl PagingQuery {
    /// Create a page request
    #[must_use]
    pub const fn new(page: i64, count: i64) -> Self {
        Self { page, count }
    }

    /// Number of records to skip (`page * count`)
    #[must_use]
    pub const fn skip(&self) -> i64 {
        self.page.saturating_mul(self.count)
    }

    /// Maximum number of records to return
    #[must_use]
    pub const fn limit(&self) -> i64 {
        self.count
    }
}

/// One page of results, echoing the request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PagingResult<T> {
    /// Zero-based page index
    pub page: i64,
    /// Requested page size
    pub count: i64,
    /// Number of records matching the filter across all pages
    pub total: i64,
    /// Records on this page
    pub items: Vec<T>,
}

impl<T> PagingResult<T> {
    /// Create a page from a request, a total and its items
    pub fn new(query: PagingQuery, total: i64, items: Vec<T>) -> Self {
        Self {
            page: query.page,
            count: query.count,
            total,
            items,
        }
    }

    /// An empty page echoing the request
    pub fn empty(query: PagingQuery) -> Self {
        Self::new(query, 0, Vec::new())
    }

    /// Whether records remain after this page
    #[must_use]
    pub fn has_more(&self) -> bool {
        self.page
            .saturating_add(1)
            .saturating_mul(self.count)
            < self.total
    }

    /// Map items while keeping paging metadata
    pub fn map<U, F: FnMut(T) -> U>(self, f: F) -> PagingResult<U> {
        PagingResult {
            page: self.page,
            count: self.count,
            total: self.total,
            items: self.items.into_iter().map(f).collect(),
        }
    }
}
