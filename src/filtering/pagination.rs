//! Page/size normalization and the `total_pages` law.

use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

/// Global fallback when neither the request nor the route configures a size.
pub const FALLBACK_PAGE_SIZE: u64 = 25;

/// Requested paging, as it appears in a structured body or query string.
#[derive(Debug, Clone, Copy, Default, Deserialize, Serialize, ToSchema, IntoParams)]
pub struct PagingInput {
    /// 1-based page number.
    pub page: Option<u64>,
    /// Items per page.
    pub size: Option<u64>,
}

/// Resolved paging for one request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Paging {
    pub page: u64,
    pub size: u64,
}

impl Paging {
    /// Resolve paging from request input and the per-route default.
    ///
    /// Page defaults to 1 and is clamped to at least 1. Size priority:
    /// request, then route default, then [`FALLBACK_PAGE_SIZE`]; clamped to
    /// at least 1.
    #[must_use]
    pub fn resolve(input: PagingInput, route_default_size: Option<u64>) -> Self {
        let page = input.page.unwrap_or(1).max(1);
        let size = input
            .size
            .or(route_default_size)
            .unwrap_or(FALLBACK_PAGE_SIZE)
            .max(1);
        Self { page, size }
    }

    /// Saturates so an absurd requested page cannot overflow; the query
    /// simply lands past the last row and returns an empty page.
    #[must_use]
    pub const fn offset(&self) -> u64 {
        self.page.saturating_sub(1).saturating_mul(self.size)
    }

    #[must_use]
    pub const fn limit(&self) -> u64 {
        self.size
    }

    /// `max(1, ceil(count / size))` - an empty result set still reports one
    /// page.
    #[must_use]
    pub const fn total_pages(&self, count: u64) -> u64 {
        let pages = count.div_ceil(self.size);
        if pages == 0 { 1 } else { pages }
    }
}
