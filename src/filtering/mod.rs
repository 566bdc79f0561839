//! Filter parsing, ordering, paging, and storage-condition compilation.
//!
//! Two request surfaces feed one normalized [`ast::Predicate`] tree:
//!
//! - the query-string surface (`price:gte=100&category=books`), parsed by
//!   [`query_parser`], and
//! - the structured body surface
//!   (`{"filtering": {"price": {"gte": 100}, "or": [...]}}`), parsed by
//!   [`body_parser`].
//!
//! Both run every leaf through alias resolution and the field access policy
//! before the tree is accepted; a single rejected leaf invalidates the whole
//! tree. [`conditions`] then compiles the accepted tree into `sea_orm` query
//! options, and [`sort`] / [`pagination`] normalize ordering and paging.

pub mod ast;
pub mod body_parser;
pub mod conditions;
pub mod pagination;
pub mod query_parser;
pub mod sort;

pub use ast::{FieldPath, FilterLeaf, Logic, Operator, Predicate};
pub use body_parser::parse_body_filters;
pub use conditions::compile;
pub use pagination::{FALLBACK_PAGE_SIZE, Paging, PagingInput};
pub use query_parser::parse_query_filters;
pub use sort::{OrderPair, OrderingInput, SortDirection, SortKey, compile_order, resolve_ordering};
