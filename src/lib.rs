//! Query translation and response shaping for CRUD APIs over `sea-orm`.
//!
//! The engine turns two request surfaces (query-string filters and a
//! structured `{filtering, ordering, paging}` body) into normalized predicate
//! trees, runs every field through alias resolution and an access policy,
//! substitutes externally-visible identifiers for internal keys in both
//! directions, and shapes result rows (association flattening, identifier
//! externalization, alias renames) before they leave the API.
//!
//! A route supplies a declarative [`ResourceConfig`], freezes it into a
//! [`RouteContext`] at startup, and serves requests through the operations in
//! [`operations`] against any [`StorageAdapter`].
//!
//! ```no_run
//! use crudshape::{ListRequest, ResourceConfig};
//! # async fn example(adapter: impl crudshape::StorageAdapter) -> Result<(), crudshape::ApiError> {
//! let ctx = ResourceConfig {
//!     allow_filtering_on: Some(vec!["price".into(), "category".into()]),
//!     default_page_size: Some(50),
//!     ..ResourceConfig::default()
//! }
//! .build("Product")?;
//!
//! let request = ListRequest::from_query_map(
//!     [("price:gte".to_string(), "100".to_string())].into(),
//! )?;
//! let response = crudshape::operations::list(&ctx, &adapter, &request).await?;
//! # Ok(())
//! # }
//! ```

pub mod adapter;
pub mod aliasing;
pub mod compiler;
pub mod config;
pub mod errors;
pub mod filtering;
pub mod flatten;
pub mod id_mapping;
pub mod models;
pub mod operations;
pub mod policy;
pub mod response;

pub use adapter::{JsonRow, StorageAdapter};
pub use aliasing::AliasTable;
pub use compiler::{QueryPlan, compile_list, compile_single};
pub use config::{IncludeDef, RelationIdMapping, ResourceConfig, RouteContext};
pub use errors::ApiError;
pub use filtering::{
    FALLBACK_PAGE_SIZE, FieldPath, FilterLeaf, Logic, Operator, OrderPair, OrderingInput, Paging,
    PagingInput, Predicate, SortDirection, SortKey, parse_body_filters, parse_query_filters,
};
pub use flatten::{FlattenAttribute, FlattenSpec};
pub use id_mapping::{
    AssociationLookup, IdentifierMode, LookupMiss, RelationMapping, externalize_rows,
    rewrite_filter_ids, rewrite_write_ids,
};
pub use models::{ListBody, ListRequest, RESERVED_QUERY_KEYS};
pub use policy::FieldPolicy;
pub use response::{ApiResponse, Meta, OrderEcho, PagingMeta};
