//! Page requests and paged results for list operations.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::error::{Classify, ErrorKind};

/// Largest page size a caller may request.
pub const MAX_PAGE_SIZE: u32 = 100;

/// Page size used when the caller does not specify one.
pub const DEFAULT_PAGE_SIZE: u32 = 10;

/// Invalid paging parameters.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PagingError {
    #[error("page must be at least 1, got {0}")]
    InvalidPage(u32),

    #[error("page size must be between 1 and {MAX_PAGE_SIZE}, got {0}")]
    InvalidPageSize(u32),
}

impl Classify for PagingError {
    fn kind(&self) -> ErrorKind {
        ErrorKind::InvalidArgument
    }
}

/// A validated, 1-based page request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PageRequest {
    page: u32,
    page_size: u32,
}

impl PageRequest {
    /// Creates a page request, rejecting out-of-range values.
    pub fn new(page: u32, page_size: u32) -> Result<Self, PagingError> {
        if page == 0 {
            return Err(PagingError::InvalidPage(page));
        }
        if page_size == 0 || page_size > MAX_PAGE_SIZE {
            return Err(PagingError::InvalidPageSize(page_size));
        }
        Ok(Self { page, page_size })
    }

    /// Builds a page request from optional query values, using defaults for
    /// missing ones.
    pub fn from_optional(page: Option<u32>, page_size: Option<u32>) -> Result<Self, PagingError> {
        Self::new(page.unwrap_or(1), page_size.unwrap_or(DEFAULT_PAGE_SIZE))
    }

    pub fn page(&self) -> u32 {
        self.page
    }

    pub fn page_size(&self) -> u32 {
        self.page_size
    }

    /// Number of rows to skip.
    pub fn offset(&self) -> u64 {
        u64::from(self.page - 1) * u64::from(self.page_size)
    }

    /// Number of rows to take.
    pub fn limit(&self) -> u64 {
        u64::from(self.page_size)
    }

    /// Slices an already filtered and ordered list into this page.
    pub fn apply<T>(&self, items: Vec<T>) -> Page<T> {
        let total = items.len() as u64;
        let items = items
            .into_iter()
            .skip(self.offset() as usize)
            .take(self.page_size as usize)
            .collect();
        Page::new(items, total, *self)
    }
}

impl Default for PageRequest {
    fn default() -> Self {
        Self {
            page: 1,
            page_size: DEFAULT_PAGE_SIZE,
        }
    }
}

/// One page of results plus the total number of matching rows.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total: u64,
    pub page: u32,
    pub page_size: u32,
}

impl<T> Page<T> {
    pub fn new(items: Vec<T>, total: u64, request: PageRequest) -> Self {
        Self {
            items,
            total,
            page: request.page,
            page_size: request.page_size,
        }
    }

    /// Converts every item, keeping the paging metadata.
    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Page<U> {
        Page {
            items: self.items.into_iter().map(f).collect(),
            total: self.total,
            page: self.page,
            page_size: self.page_size,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_zero_page() {
        assert_eq!(PageRequest::new(0, 10), Err(PagingError::InvalidPage(0)));
    }

    #[test]
    fn rejects_out_of_range_page_size() {
        assert_eq!(PageRequest::new(1, 0), Err(PagingError::InvalidPageSize(0)));
        assert_eq!(
            PageRequest::new(1, 101),
            Err(PagingError::InvalidPageSize(101))
        );
    }

    #[test]
    fn offset_and_limit() {
        let req = PageRequest::new(3, 20).unwrap();
        assert_eq!(req.offset(), 40);
        assert_eq!(req.limit(), 20);
    }

    #[test]
    fn defaults_fill_missing_values() {
        let req = PageRequest::from_optional(None, None).unwrap();
        assert_eq!(req.page(), 1);
        assert_eq!(req.page_size(), DEFAULT_PAGE_SIZE);
    }

    #[test]
    fn apply_slices_and_counts() {
        let req = PageRequest::new(2, 2).unwrap();
        let page = req.apply(vec![1, 2, 3, 4, 5]);
        assert_eq!(page.items, vec![3, 4]);
        assert_eq!(page.total, 5);
        assert_eq!(page.page, 2);
    }

    #[test]
    fn apply_past_the_end_is_empty() {
        let req = PageRequest::new(4, 2).unwrap();
        let page = req.apply(vec![1, 2, 3]);
        assert!(page.items.is_empty());
        assert_eq!(page.total, 3);
    }

    #[test]
    fn map_keeps_metadata() {
        let page = PageRequest::default().apply(vec![1, 2]).map(|n| n * 10);
        assert_eq!(page.items, vec![10, 20]);
        assert_eq!(page.total, 2);
    }
}
