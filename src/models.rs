//! Request surfaces.
//!
//! A list request arrives either as a query-string map (filters plus the
//! reserved control keys `page`, `size`, `order_by`, `order_dir`) or as a
//! structured body `{ filtering, ordering, paging }`. Both normalize into a
//! [`ListRequest`], to which trusted route code may attach programmatic
//! filters that bypass the field access policy.

use crate::errors::ApiError;
use crate::filtering::pagination::PagingInput;
use crate::filtering::sort::{OrderingInput, SortDirection};
use serde::Deserialize;
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};
use utoipa::ToSchema;

/// Reserved query-string keys that are never treated as filter fields.
pub const RESERVED_QUERY_KEYS: [&str; 4] = ["page", "size", "order_by", "order_dir"];

/// Structured list body.
#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
pub struct ListBody {
    /// Filter object: `{field: value | {op: value}, and: [...], or: [...]}`.
    #[serde(default)]
    #[schema(value_type = Option<Object>)]
    pub filtering: Option<Value>,
    /// A single `{order_by, direction}` pair or an array of them.
    #[serde(default)]
    pub ordering: Option<OrderingInput>,
    #[serde(default)]
    pub paging: Option<PagingInput>,
}

/// One normalized list request, assembled from either surface.
#[derive(Debug, Clone, Default)]
pub struct ListRequest {
    /// Non-reserved query-string entries, keyed deterministically.
    pub query_filters: BTreeMap<String, String>,
    /// Structured filter object from the body.
    pub body_filtering: Option<Value>,
    /// Trusted filters applied by route code; bypass the access policy.
    pub programmatic_filtering: Option<Value>,
    pub ordering: Option<OrderingInput>,
    /// Query-string ordering shorthand (`category,-price`).
    pub order_shorthand: Option<String>,
    /// Global direction for unsigned shorthand fields.
    pub order_dir: Option<SortDirection>,
    pub paging: PagingInput,
}

impl ListRequest {
    /// Build from a raw query-string map, separating the reserved control
    /// keys from filter entries.
    ///
    /// # Errors
    ///
    /// `ApiError::BadRequest` when `page` or `size` is not a number.
    pub fn from_query_map(map: HashMap<String, String>) -> Result<Self, ApiError> {
        let mut request = Self::default();

        for (key, value) in map {
            match key.as_str() {
                "page" => request.paging.page = Some(parse_number("page", &value)?),
                "size" => request.paging.size = Some(parse_number("size", &value)?),
                "order_by" => request.order_shorthand = Some(value),
                "order_dir" => request.order_dir = Some(SortDirection::parse(&value)),
                _ => {
                    request.query_filters.insert(key, value);
                }
            }
        }

        Ok(request)
    }

    /// Build from a structured body.
    #[must_use]
    pub fn from_body(body: ListBody) -> Self {
        Self {
            body_filtering: body.filtering,
            ordering: body.ordering,
            paging: body.paging.unwrap_or_default(),
            ..Self::default()
        }
    }

    /// Attach trusted filters (e.g., an ownership scope) that bypass the
    /// field access policy.
    #[must_use]
    pub fn with_programmatic(mut self, filtering: Value) -> Self {
        self.programmatic_filtering = Some(filtering);
        self
    }
}

fn parse_number(key: &str, raw: &str) -> Result<u64, ApiError> {
    raw.parse::<u64>()
        .map_err(|_| ApiError::bad_request(format!("The '{key}' parameter must be a number")))
}
