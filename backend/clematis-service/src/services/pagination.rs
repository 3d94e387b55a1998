/// Page/offset arithmetic shared by every list endpoint.
///
/// Pages are 1-based and fixed at [`PAGE_SIZE`] rows. There is no total
/// count: clients keep asking for `nextPage` until a page comes back short.
use serde::Deserialize;

pub const PAGE_SIZE: i64 = 15;

/// Highest page whose offset and successor still fit in an `i64`.
pub const MAX_PAGE: i64 = i64::MAX / PAGE_SIZE;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageCursor {
    page: i64,
}

impl Default for PageCursor {
    fn default() -> Self {
        Self { page: 1 }
    }
}

impl PageCursor {
    /// Requested page, defaulting to 1. Pages below 1 are treated as page 1
    /// and pages past [`MAX_PAGE`] as the last addressable one.
    pub fn new(page: Option<i64>) -> Self {
        Self {
            page: page.unwrap_or(1).clamp(1, MAX_PAGE),
        }
    }

    pub fn page(&self) -> i64 {
        self.page
    }

    pub fn limit(&self) -> i64 {
        PAGE_SIZE
    }

    pub fn offset(&self) -> i64 {
        (self.page - 1) * PAGE_SIZE
    }

    pub fn previous_page(&self) -> i64 {
        (self.page - 1).max(1)
    }

    pub fn next_page(&self) -> i64 {
        (self.page + 1).min(MAX_PAGE)
    }
}

/// `?page=` query string
#[derive(Debug, Default, Deserialize)]
pub struct PageQuery {
    pub page: Option<i64>,
}

impl PageQuery {
    pub fn cursor(&self) -> PageCursor {
        PageCursor::new(self.page)
    }
}
