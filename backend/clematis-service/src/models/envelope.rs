//! Response envelopes shared by every endpoint.
//!
//! Single objects: `{code, data, success, error}`.
//! Lists: `{code, data: {count, records, previousPage, backAnchor, anchor, nextPage}, size, success, error}`.

use serde::Serialize;

use crate::services::pagination::PageCursor;

/// `""` on success, the numeric error code on failure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum ResponseCode {
    Ok(&'static str),
    Error(u16),
}

#[derive(Debug, Clone, Serialize)]
pub struct ApiResponse<T: Serialize> {
    pub code: ResponseCode,
    pub data: T,
    pub success: bool,
    pub error: String,
}

/// Empty `data` object
#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct Empty {}

impl<T: Serialize> ApiResponse<T> {
    pub fn ok(data: T) -> Self {
        Self {
            code: ResponseCode::Ok(""),
            data,
            success: true,
            error: String::new(),
        }
    }
}

impl ApiResponse<Empty> {
    pub fn success() -> Self {
        Self::ok(Empty {})
    }

    pub fn failure(code: u16, error: impl Into<String>) -> Self {
        Self {
            code: ResponseCode::Error(code),
            data: Empty {},
            success: false,
            error: error.into(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ListData<T: Serialize> {
    pub count: usize,
    pub records: Vec<T>,
    pub previous_page: i64,
    /// Always `-1`; kept for client compatibility
    pub back_anchor: i64,
    /// Always `0`; kept for client compatibility
    pub anchor: i64,
    pub next_page: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct ListResponse<T: Serialize> {
    pub code: ResponseCode,
    pub data: ListData<T>,
    pub size: usize,
    pub success: bool,
    pub error: String,
}

impl<T: Serialize> ListResponse<T> {
    /// Wrap one page of records. `count` and `size` report the rows on this page only.
    pub fn page(records: Vec<T>, cursor: PageCursor) -> Self {
        let count = records.len();
        Self {
            code: ResponseCode::Ok(""),
            data: ListData {
                count,
                records,
                previous_page: cursor.previous_page(),
                back_anchor: -1,
                anchor: 0,
                next_page: cursor.next_page(),
            },
            size: count,
            success: true,
            error: String::new(),
        }
    }
}
