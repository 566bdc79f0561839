//! Response envelope.
//!
//! Every successful operation answers with the same shape: `success`, then
//! either `data` (list) or `record` (single), and for lists a `meta` block
//! echoing the resolved paging, ordering, and filtering. Absent sections are
//! omitted from the JSON rather than serialized as null.

use crate::compiler::QueryPlan;
use crate::filtering::pagination::Paging;
use axum::Json;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use serde_json::Value;
use serde_with::skip_serializing_none;
use utoipa::ToSchema;

/// Resolved paging echoed back to the client.
#[derive(Debug, Clone, Copy, Serialize, ToSchema)]
pub struct PagingMeta {
    pub page: u64,
    pub size: u64,
    /// Total matching records, before paging.
    pub count: u64,
    /// `ceil(count / size)`, floored at 1 so an empty result still reports
    /// one (empty) page.
    pub total_pages: u64,
}

impl PagingMeta {
    #[must_use]
    pub fn new(paging: Paging, count: u64) -> Self {
        Self {
            page: paging.page,
            size: paging.size,
            count,
            total_pages: paging.total_pages(count),
        }
    }
}

/// One applied ordering key, in external field names.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct OrderEcho {
    pub order_by: String,
    pub direction: &'static str,
}

/// List metadata: paging always, ordering and filtering when applied.
#[skip_serializing_none]
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct Meta {
    pub paging: PagingMeta,
    pub ordering: Option<Vec<OrderEcho>>,
    #[schema(value_type = Option<Object>)]
    pub filtering: Option<Value>,
}

/// The uniform success envelope.
#[skip_serializing_none]
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ApiResponse {
    pub success: bool,
    /// List results.
    #[schema(value_type = Option<Vec<Object>>)]
    pub data: Option<Vec<Value>>,
    /// Single-record result.
    #[schema(value_type = Option<Object>)]
    pub record: Option<Value>,
    pub meta: Option<Meta>,
}

impl ApiResponse {
    /// List envelope with paging/ordering/filtering metadata from the plan.
    #[must_use]
    pub fn list(data: Vec<Value>, count: u64, plan: &QueryPlan, filtering: Option<Value>) -> Self {
        let ordering = if plan.sort.is_empty() {
            None
        } else {
            Some(
                plan.sort
                    .iter()
                    .map(|key| OrderEcho {
                        order_by: key.external.clone(),
                        direction: key.direction.as_str(),
                    })
                    .collect(),
            )
        };
        Self {
            success: true,
            data: Some(data),
            record: None,
            meta: Some(Meta {
                paging: PagingMeta::new(plan.paging, count),
                ordering,
                filtering,
            }),
        }
    }

    /// Single-record envelope.
    #[must_use]
    pub fn record(record: Value) -> Self {
        Self {
            success: true,
            data: None,
            record: Some(record),
            meta: None,
        }
    }

    /// Bare success envelope, used by destroy.
    #[must_use]
    pub fn success() -> Self {
        Self {
            success: true,
            data: None,
            record: None,
            meta: None,
        }
    }
}

impl IntoResponse for ApiResponse {
    fn into_response(self) -> Response {
        Json(self).into_response()
    }
}
