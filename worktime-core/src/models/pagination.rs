//! Pagination support for list queries
//!
//! Out-of-range page numbers and sizes are rejected rather than clamped, so a
//! client that asks for something unreasonable learns about it.

use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// Default page size for list queries
pub const DEFAULT_PAGE_SIZE: u32 = 50;

/// Maximum allowed page size
pub const MAX_PAGE_SIZE: u32 = 1_000;

/// Maximum allowed page number
pub const MAX_PAGE: u32 = 10_000_000;

/// Minimum page number (1-indexed)
pub const MIN_PAGE: u32 = 1;

/// Pagination parameters for list queries
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageParams {
    /// Page number (1-indexed)
    pub page: u32,
    /// Number of items per page
    pub page_size: u32,
}

impl PageParams {
    /// Create validated pagination parameters
    ///
    /// Missing values fall back to page 1 and `DEFAULT_PAGE_SIZE`.
    ///
    /// # Examples
    /// ```
    /// use worktime_core::models::PageParams;
    ///
    /// let params = PageParams::new(None, None).unwrap();
    /// assert_eq!(params.page, 1);
    /// assert_eq!(params.page_size, 50);
    ///
    /// assert!(PageParams::new(Some(0), None).is_err());
    /// assert!(PageParams::new(Some(1), Some(5_000)).is_err());
    /// ```
    pub fn new(page: Option<u32>, page_size: Option<u32>) -> Result<Self> {
        let page = page.unwrap_or(MIN_PAGE);
        let page_size = page_size.unwrap_or(DEFAULT_PAGE_SIZE);

        if !(MIN_PAGE..=MAX_PAGE).contains(&page) {
            return Err(Error::InvalidInput(format!(
                "page must be between {MIN_PAGE} and {MAX_PAGE}"
            )));
        }
        if !(1..=MAX_PAGE_SIZE).contains(&page_size) {
            return Err(Error::InvalidInput(format!(
                "page_size must be between 1 and {MAX_PAGE_SIZE}"
            )));
        }

        Ok(Self { page, page_size })
    }

    /// OFFSET for SQL query
    ///
    /// # Examples
    /// ```
    /// use worktime_core::models::PageParams;
    ///
    /// let params = PageParams::new(Some(3), Some(50)).unwrap();
    /// assert_eq!(params.offset(), 100);
    /// ```
    #[must_use]
    pub const fn offset(&self) -> i64 {
        (self.page as i64 - 1) * self.page_size as i64
    }

    /// LIMIT for SQL query
    #[must_use]
    pub const fn limit(&self) -> i64 {
        self.page_size as i64
    }
}

impl Default for PageParams {
    fn default() -> Self {
        Self {
            page: MIN_PAGE,
            page_size: DEFAULT_PAGE_SIZE,
        }
    }
}

/// Pagination metadata returned alongside list results
///
/// All fields are zero when the query matched nothing.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageMetadata {
    pub current_page: u32,
    pub page_size: u32,
    pub first_page: u32,
    pub last_page: u32,
    pub total_records: u64,
}

impl PageMetadata {
    #[must_use]
    pub fn calculate(total_records: u64, params: PageParams) -> Self {
        if total_records == 0 {
            return Self::default();
        }

        let page_size = u64::from(params.page_size);
        let last_page = u32::try_from(total_records.div_ceil(page_size)).unwrap_or(u32::MAX);

        Self {
            current_page: params.page,
            page_size: params.page_size,
            first_page: MIN_PAGE,
            last_page,
            total_records,
        }
    }
}

/// One page of results plus metadata
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Page<T> {
    #[serde(rename = "result")]
    pub items: Vec<T>,
    pub metadata: PageMetadata,
}

impl<T> Page<T> {
    #[must_use]
    pub fn new(items: Vec<T>, total: u64, params: PageParams) -> Self {
        Self {
            items,
            metadata: PageMetadata::calculate(total, params),
        }
    }

    #[must_use]
    pub const fn has_next(&self) -> bool {
        self.metadata.current_page < self.metadata.last_page
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}
