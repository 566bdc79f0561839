//! Ordering resolution.
//!
//! Accepts a single `{order_by, direction}` pair, an array of pairs (applied
//! left-to-right as a stable multi-key sort), or the query-string shorthand
//! `order_by=category,-price` where a leading `+`/`-` overrides the global
//! direction for that one field.
//!
//! Ordering fields pass through the same alias table and access policy as
//! filter fields, including dot-qualified association fields. Ordering by
//! `id` orders by whatever internal column the externally-visible id maps to,
//! so pagination stays deterministic under identifier mapping.

use crate::config::RouteContext;
use crate::errors::ApiError;
use crate::filtering::ast::FieldPath;
use sea_orm::{
    Order,
    sea_query::{Alias, Expr, SimpleExpr},
};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Sort direction, accepted case-insensitively.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    #[default]
    #[serde(alias = "ASC", alias = "Asc")]
    Asc,
    #[serde(alias = "DESC", alias = "Desc")]
    Desc,
}

impl SortDirection {
    #[must_use]
    pub fn to_order(self) -> Order {
        match self {
            Self::Asc => Order::Asc,
            Self::Desc => Order::Desc,
        }
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Asc => "asc",
            Self::Desc => "desc",
        }
    }

    /// Parse from a query-string value; anything not spelled like "desc" is
    /// ascending.
    #[must_use]
    pub fn parse(raw: &str) -> Self {
        if raw.eq_ignore_ascii_case("desc") {
            Self::Desc
        } else {
            Self::Asc
        }
    }
}

/// One requested ordering pair, as it appears in a structured body.
#[derive(Debug, Clone, Deserialize, Serialize, ToSchema)]
pub struct OrderPair {
    pub order_by: String,
    #[serde(default)]
    pub direction: Option<SortDirection>,
}

/// Either a single pair or an array of pairs.
#[derive(Debug, Clone, Deserialize, Serialize, ToSchema)]
#[serde(untagged)]
pub enum OrderingInput {
    One(OrderPair),
    Many(Vec<OrderPair>),
}

impl OrderingInput {
    fn pairs(&self) -> Vec<&OrderPair> {
        match self {
            Self::One(pair) => vec![pair],
            Self::Many(pairs) => pairs.iter().collect(),
        }
    }
}

/// One resolved sort key over an internal (possibly dot-qualified) column.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SortKey {
    pub path: FieldPath,
    pub direction: SortDirection,
    /// The external spelling, echoed back in response meta.
    pub external: String,
}

/// Resolve the requested ordering, falling back to the route default and
/// finally to the externally-visible id ascending.
///
/// # Errors
///
/// `ApiError::BadRequest` when an ordering field is rejected by the policy.
pub fn resolve_ordering(
    ctx: &RouteContext,
    body: Option<&OrderingInput>,
    shorthand: Option<&str>,
    global_dir: Option<SortDirection>,
) -> Result<Vec<SortKey>, ApiError> {
    if let Some(input) = body {
        let mut keys = Vec::new();
        for pair in input.pairs() {
            keys.push(resolve_key(
                ctx,
                &pair.order_by,
                pair.direction.unwrap_or_default(),
            )?);
        }
        if !keys.is_empty() {
            return Ok(keys);
        }
    }

    if let Some(list) = shorthand {
        let keys = parse_shorthand(ctx, list, global_dir)?;
        if !keys.is_empty() {
            return Ok(keys);
        }
    }

    if let Some((field, direction)) = &ctx.default_order {
        return Ok(vec![resolve_key(ctx, field, *direction)?]);
    }

    // Deterministic pagination fallback: the externally-visible id, ascending.
    // Skips the ordering policy since it is not request input.
    Ok(vec![SortKey {
        path: FieldPath::new(ctx.id_mode.column(&ctx.primary_key)),
        direction: SortDirection::Asc,
        external: "id".to_string(),
    }])
}

/// Comma-separated field list; leading `+`/`-` overrides the global direction
/// for that one field.
fn parse_shorthand(
    ctx: &RouteContext,
    list: &str,
    global_dir: Option<SortDirection>,
) -> Result<Vec<SortKey>, ApiError> {
    let mut keys = Vec::new();
    for token in list.split(',') {
        let token = token.trim();
        if token.is_empty() {
            continue;
        }
        let (field, direction) = match token.split_at_checked(1) {
            Some(("-", rest)) => (rest, SortDirection::Desc),
            Some(("+", rest)) => (rest, SortDirection::Asc),
            _ => (token, global_dir.unwrap_or_default()),
        };
        keys.push(resolve_key(ctx, field, direction)?);
    }
    Ok(keys)
}

fn resolve_key(
    ctx: &RouteContext,
    field: &str,
    direction: SortDirection,
) -> Result<SortKey, ApiError> {
    let internal = ctx.aliases.resolve(field);
    ctx.order_policy.check(field, &internal)?;

    Ok(SortKey {
        path: ctx.resolve_id_path(&internal),
        direction,
        external: field.to_string(),
    })
}

/// Compile resolved sort keys into `sea_query` order expressions.
#[must_use]
pub fn compile_order(keys: &[SortKey]) -> Vec<(SimpleExpr, Order)> {
    keys.iter()
        .map(|key| {
            let expr = match key.path.association() {
                Some((assoc, col)) => Expr::col((Alias::new(assoc), Alias::new(col))),
                None => Expr::col(Alias::new(key.path.as_str())),
            };
            (expr.into(), key.direction.to_order())
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ResourceConfig;
    use serde_json::json;

    fn ctx() -> RouteContext {
        ResourceConfig::default().build("Product").unwrap()
    }

    #[test]
    fn test_direction_parsing() {
        assert_eq!(SortDirection::parse("DESC"), SortDirection::Desc);
        assert_eq!(SortDirection::parse("desc"), SortDirection::Desc);
        assert_eq!(SortDirection::parse("asc"), SortDirection::Asc);
        assert_eq!(SortDirection::parse("anything"), SortDirection::Asc);
    }

    #[test]
    fn test_ordering_input_accepts_one_or_many() {
        let one: OrderingInput =
            serde_json::from_value(json!({"order_by": "price", "direction": "desc"})).unwrap();
        assert_eq!(one.pairs().len(), 1);

        let many: OrderingInput = serde_json::from_value(json!([
            {"order_by": "category"},
            {"order_by": "price", "direction": "DESC"}
        ]))
        .unwrap();
        assert_eq!(many.pairs().len(), 2);
        assert_eq!(many.pairs()[1].direction, Some(SortDirection::Desc));
    }

    #[test]
    fn test_body_multi_key_order_preserved() {
        let input: OrderingInput = serde_json::from_value(json!([
            {"order_by": "category", "direction": "asc"},
            {"order_by": "price", "direction": "desc"}
        ]))
        .unwrap();
        let keys = resolve_ordering(&ctx(), Some(&input), None, None).unwrap();
        assert_eq!(keys.len(), 2);
        assert_eq!(keys[0].path.as_str(), "category");
        assert_eq!(keys[0].direction, SortDirection::Asc);
        assert_eq!(keys[1].path.as_str(), "price");
        assert_eq!(keys[1].direction, SortDirection::Desc);
    }

    #[test]
    fn test_shorthand_sign_overrides_global_direction() {
        let keys = resolve_ordering(
            &ctx(),
            None,
            Some("category,-price,+score"),
            Some(SortDirection::Desc),
        )
        .unwrap();
        assert_eq!(keys.len(), 3);
        // No sign: inherits the global direction
        assert_eq!(keys[0].direction, SortDirection::Desc);
        assert_eq!(keys[1].direction, SortDirection::Desc);
        assert_eq!(keys[2].direction, SortDirection::Asc);
    }

    #[test]
    fn test_fallback_is_id_ascending() {
        let keys = resolve_ordering(&ctx(), None, None, None).unwrap();
        assert_eq!(keys.len(), 1);
        assert_eq!(keys[0].path.as_str(), "id");
        assert_eq!(keys[0].direction, SortDirection::Asc);
    }

    #[test]
    fn test_fallback_uses_route_default_first() {
        let config = ResourceConfig {
            default_order_by: Some("created_at".to_string()),
            default_order_dir: Some(SortDirection::Desc),
            ..ResourceConfig::default()
        };
        let ctx = config.build("Product").unwrap();
        let keys = resolve_ordering(&ctx, None, None, None).unwrap();
        assert_eq!(keys[0].path.as_str(), "created_at");
        assert_eq!(keys[0].direction, SortDirection::Desc);
    }

    #[test]
    fn test_id_mapping_redirects_id_ordering() {
        let config = ResourceConfig {
            id_mapping: Some("sku".to_string()),
            ..ResourceConfig::default()
        };
        let ctx = config.build("Product").unwrap();

        // Explicit order on id
        let input: OrderingInput =
            serde_json::from_value(json!({"order_by": "id", "direction": "asc"})).unwrap();
        let keys = resolve_ordering(&ctx, Some(&input), None, None).unwrap();
        assert_eq!(keys[0].path.as_str(), "sku");

        // Default fallback too
        let keys = resolve_ordering(&ctx, None, None, None).unwrap();
        assert_eq!(keys[0].path.as_str(), "sku");
    }

    #[test]
    fn test_ordering_policy_enforced() {
        let config = ResourceConfig {
            block_ordering_on: Some(vec!["internal_rank".to_string()]),
            ..ResourceConfig::default()
        };
        let ctx = config.build("Product").unwrap();
        let err = resolve_ordering(&ctx, None, Some("internal_rank"), None).unwrap_err();
        assert!(err.to_string().contains("internal_rank"));
    }

    #[test]
    fn test_compile_order_dotted() {
        let keys = vec![SortKey {
            path: FieldPath::new("artist.label"),
            direction: SortDirection::Desc,
            external: "artist.name".to_string(),
        }];
        let compiled = compile_order(&keys);
        assert_eq!(compiled.len(), 1);
        assert_eq!(compiled[0].1, Order::Desc);
    }
}
