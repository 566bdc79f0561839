//! Query compilation: one normalized, access-checked request description in,
//! storage-native query options out.
//!
//! The compiler runs the per-request pipeline in a fixed order: parse both
//! filter surfaces, resolve ordering and paging, substitute id-valued
//! operands through the identifier mapper, then emit a [`QueryPlan`] carrying
//! both the abstract predicate tree and its compiled `sea_orm` condition.
//! Nothing in the plan is mutated after compilation.

use crate::config::{IncludeDef, RouteContext};
use crate::errors::ApiError;
use crate::filtering::ast::Predicate;
use crate::filtering::pagination::Paging;
use crate::filtering::sort::SortKey;
use crate::filtering::{
    compile, compile_order, parse_body_filters, parse_query_filters, resolve_ordering,
};
use crate::flatten::validate_flattening;
use crate::id_mapping::{AssociationLookup, LookupMiss, rewrite_filter_ids};
use crate::models::ListRequest;
use sea_orm::{Condition, Order, sea_query::SimpleExpr};
use serde_json::Value;

/// Storage-native query options for one request.
#[derive(Debug, Clone)]
pub struct QueryPlan {
    /// The normalized predicate tree, with internal names and substituted id
    /// operands.
    pub predicate: Predicate,
    /// The predicate compiled for the storage adapter.
    pub condition: Condition,
    /// Resolved multi-key ordering, applied left-to-right.
    pub sort: Vec<SortKey>,
    /// The ordering compiled for the storage adapter.
    pub order: Vec<(SimpleExpr, Order)>,
    pub paging: Paging,
    /// False whenever flattening is configured: joining a to-many
    /// association can multiply parent rows, so the parent must not be
    /// paginated independently of the join.
    pub paginate_in_subquery: bool,
    pub includes: Vec<IncludeDef>,
    /// Projected columns; `None` selects everything.
    pub attributes: Option<Vec<String>>,
}

impl QueryPlan {
    #[must_use]
    pub const fn offset(&self) -> u64 {
        self.paging.offset()
    }

    #[must_use]
    pub const fn limit(&self) -> u64 {
        self.paging.limit()
    }
}

/// Compile a list request.
///
/// # Errors
///
/// `ApiError::BadRequest` from either parser or the flatten validation;
/// adapter errors from id-operand lookups pass through. A relation-id
/// operand that matches nothing degrades to an impossible predicate rather
/// than erroring.
pub async fn compile_list(
    ctx: &RouteContext,
    request: &ListRequest,
    lookup: &dyn AssociationLookup,
) -> Result<QueryPlan, ApiError> {
    // Flatten specs are validated against the includes before anything
    // touches storage; a typo must not silently return nested objects.
    validate_flattening(&ctx.flatten, &ctx.includes)?;

    let mut parts = vec![parse_query_filters(
        &request.query_filters,
        &ctx.aliases,
        &ctx.filter_policy,
    )?];
    if let Some(filtering) = &request.body_filtering {
        parts.push(parse_body_filters(
            filtering,
            &ctx.aliases,
            Some(&ctx.filter_policy),
        )?);
    }
    let user = Predicate::and(parts);

    // Only user-supplied operands carry external id values. Programmatic
    // filters are written in internal terms by trusted route code, so they
    // join the tree after the id rewrite.
    let user = rewrite_filter_ids(user, ctx, lookup, LookupMiss::MatchNothing).await?;
    let predicate = match &request.programmatic_filtering {
        Some(filtering) => Predicate::and(vec![
            user,
            parse_body_filters(filtering, &ctx.aliases, None)?,
        ]),
        None => user,
    };

    let sort = resolve_ordering(
        ctx,
        request.ordering.as_ref(),
        request.order_shorthand.as_deref(),
        request.order_dir,
    )?;
    let paging = Paging::resolve(request.paging, ctx.default_page_size);

    Ok(QueryPlan {
        condition: compile(&predicate),
        order: compile_order(&sort),
        predicate,
        sort,
        paging,
        paginate_in_subquery: ctx.flatten.is_empty(),
        includes: ctx.includes.clone(),
        attributes: ctx.attributes.clone(),
    })
}

/// Compile a single-record operation addressed by its external id, with an
/// optional trusted scoping filter.
///
/// No lookup is needed for the root id: under an alternate key the external
/// value is the alternate column's value, and otherwise it is the literal
/// primary key.
///
/// # Errors
///
/// `ApiError::BadRequest` from the scoping-filter parser.
pub fn compile_single(
    ctx: &RouteContext,
    id: &Value,
    scoping: Option<&Value>,
) -> Result<QueryPlan, ApiError> {
    let id_leaf = Predicate::leaf(
        ctx.id_mode.column(&ctx.primary_key),
        crate::filtering::Operator::Eq,
        id.clone(),
    );

    let predicate = match scoping {
        Some(filtering) => Predicate::and(vec![
            id_leaf,
            parse_body_filters(filtering, &ctx.aliases, None)?,
        ]),
        None => id_leaf,
    };

    let paging = Paging { page: 1, size: 1 };

    Ok(QueryPlan {
        condition: compile(&predicate),
        predicate,
        sort: Vec::new(),
        order: Vec::new(),
        paging,
        paginate_in_subquery: ctx.flatten.is_empty(),
        includes: ctx.includes.clone(),
        attributes: ctx.attributes.clone(),
    })
}
