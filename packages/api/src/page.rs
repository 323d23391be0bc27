//! Pagination and render-depth query types and the paged response envelope.

use serde::{Deserialize, Serialize};

use crate::model::Link;

/// Hard cap on `?size`; requests asking for more are clamped, not rejected.
pub const MAX_PAGE_SIZE: usize = 1000;

/// Default `?size` when the client does not specify one.
pub const DEFAULT_PAGE_SIZE: usize = 100;

/// Largest supported `?depth`; also the default, so responses render the
/// full nested chain unless the client asks for less.
pub const MAX_DEPTH: usize = 5;

// ---------------------------------------------------------------------------
// Query parameters
// ---------------------------------------------------------------------------

/// Query parameters shared by every list endpoint: `?page`, `?size`,
/// `?depth`.
#[derive(Debug, Clone, Copy, Deserialize, Default, PartialEq, Eq)]
pub struct PageParams {
    /// 0-based page number. Default 0.
    #[serde(default)]
    pub page: usize,
    /// Page size. Default 100, clamped to [1, 1000].
    pub size: Option<usize>,
    /// Nested render depth. Default 5, clamped to [0, 5].
    pub depth: Option<usize>,
}

impl PageParams {
    /// Effective page size, clamped to `[1, MAX_PAGE_SIZE]`.
    pub fn effective_size(&self) -> usize {
        self.size
            .unwrap_or(DEFAULT_PAGE_SIZE)
            .clamp(1, MAX_PAGE_SIZE)
    }

    /// Effective render depth, clamped to `[0, MAX_DEPTH]`.
    pub fn effective_depth(&self) -> usize {
        self.depth.unwrap_or(MAX_DEPTH).min(MAX_DEPTH)
    }

    /// Offset of the first item on this page.
    pub fn offset(&self) -> usize {
        self.page.saturating_mul(self.effective_size())
    }
}

/// Query parameters for single-resource GET endpoints: `?depth` only.
#[derive(Debug, Clone, Copy, Deserialize, Default, PartialEq, Eq)]
pub struct DepthParams {
    pub depth: Option<usize>,
}

impl DepthParams {
    pub fn effective_depth(&self) -> usize {
        self.depth.unwrap_or(MAX_DEPTH).min(MAX_DEPTH)
    }
}

// ---------------------------------------------------------------------------
// Paged envelope
// ---------------------------------------------------------------------------

/// Page metadata echoed back with every paginated response.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct PageMeta {
    /// Effective page size used for this response.
    pub size: usize,
    /// Total matching items across all pages.
    pub total_elements: usize,
    /// Number of pages at this size (0 when there are no items).
    pub total_pages: usize,
    /// 0-based index of this page.
    pub number: usize,
}

/// The envelope every list endpoint returns.
///
/// ```json
/// {
///   "content": [ { ... }, { ... } ],
///   "page": { "size": 100, "total_elements": 2, "total_pages": 1, "number": 0 },
///   "links": [ { "rel": "first", "href": "..." }, { "rel": "self", "href": "..." } ]
/// }
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Page<T> {
    pub content: Vec<T>,
    pub page: PageMeta,
    pub links: Vec<Link>,
}

impl<T> Page<T> {
    /// Build a page envelope. `links` are attached afterwards by the
    /// server's assembler, which knows the request URL.
    pub fn new(content: Vec<T>, number: usize, size: usize, total_elements: usize) -> Self {
        let total_pages = total_elements.div_ceil(size);
        Self {
            content,
            page: PageMeta {
                size,
                total_elements,
                total_pages,
                number,
            },
            links: Vec::new(),
        }
    }

    /// 0-based index of the last page, when any items exist.
    pub fn last_page(&self) -> Option<usize> {
        (self.page.total_pages > 0).then(|| self.page.total_pages - 1)
    }

    /// Next page number, when one exists.
    pub fn next_page(&self) -> Option<usize> {
        let next = self.page.number + 1;
        (next < self.page.total_pages).then_some(next)
    }

    /// Previous page number, when one exists.
    pub fn prev_page(&self) -> Option<usize> {
        self.page.number.checked_sub(1)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
