//! Identifier mapping: presenting an alternate unique column as the
//! externally visible id, for the root entity and for related entities
//! reached through associations.
//!
//! Root mapping is a pure column redirection in both directions. Relation
//! mapping needs the storage adapter's lookup capability: on input an
//! external `id_field` value resolves to the target's internal primary key
//! before the query or write runs; on output the internal foreign-key value
//! resolves back to the `id_field` value. Substitution only touches
//! foreign-key columns present in the final projection; an excluded column is
//! never looked up.

use crate::config::RouteContext;
use crate::errors::ApiError;
use crate::filtering::ast::{FilterLeaf, Operator, Predicate};
use async_trait::async_trait;
use serde_json::{Map, Value};
use std::future::Future;
use std::pin::Pin;

/// How the entity's external id relates to storage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IdentifierMode {
    /// The external id is the literal primary key.
    Literal,
    /// The external id is this internal column's value.
    AlternateKey(String),
}

impl IdentifierMode {
    #[must_use]
    pub fn from_config(id_mapping: Option<String>) -> Self {
        id_mapping.map_or(Self::Literal, Self::AlternateKey)
    }

    /// The internal column the external id addresses.
    #[must_use]
    pub fn column<'a>(&'a self, primary_key: &'a str) -> &'a str {
        match self {
            Self::Literal => primary_key,
            Self::AlternateKey(column) => column,
        }
    }
}

/// A validated relation-id substitution, bound to its include.
#[derive(Debug, Clone)]
pub struct RelationMapping {
    /// Target table.
    pub table: String,
    /// The target column exposed externally.
    pub id_field: String,
    /// Foreign-key column on the parent.
    pub fk_column: String,
    /// The include alias the mapping was resolved against.
    pub as_alias: String,
}

/// The storage adapter's association-lookup capability.
#[async_trait]
pub trait AssociationLookup: Send + Sync {
    /// Resolve an external `id_field` value to the target's primary key.
    async fn resolve_external(
        &self,
        table: &str,
        id_field: &str,
        value: &Value,
    ) -> Result<Option<Value>, ApiError>;

    /// Resolve a target primary key back to its `id_field` value.
    async fn resolve_internal(
        &self,
        table: &str,
        id_field: &str,
        key: &Value,
    ) -> Result<Option<Value>, ApiError>;
}

/// What to do when an input-direction lookup finds no match.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LookupMiss {
    /// Surface `RelatedNotFound` (write paths and single-record operations).
    Reject,
    /// Degrade to an impossible predicate so a list endpoint returns an
    /// empty page instead of erroring.
    MatchNothing,
}

/// Rewrite id-valued filter operands from external to internal form.
///
/// Root-id and dotted-id leaves are redirected to their mapped columns
/// (no lookup needed). Leaves on relation-mapped foreign-key columns have
/// their operands resolved through the adapter.
///
/// # Errors
///
/// `ApiError::RelatedNotFound` on a lookup miss under [`LookupMiss::Reject`];
/// adapter errors pass through.
pub async fn rewrite_filter_ids(
    predicate: Predicate,
    ctx: &RouteContext,
    lookup: &dyn AssociationLookup,
    on_miss: LookupMiss,
) -> Result<Predicate, ApiError> {
    rewrite_node(predicate, ctx, lookup, on_miss).await
}

fn rewrite_node<'a>(
    predicate: Predicate,
    ctx: &'a RouteContext,
    lookup: &'a dyn AssociationLookup,
    on_miss: LookupMiss,
) -> Pin<Box<dyn Future<Output = Result<Predicate, ApiError>> + Send + 'a>> {
    Box::pin(async move {
        match predicate {
            Predicate::Group { logic, children } => {
                let mut rewritten = Vec::with_capacity(children.len());
                for child in children {
                    rewritten.push(rewrite_node(child, ctx, lookup, on_miss).await?);
                }
                Ok(Predicate::Group {
                    logic,
                    children: rewritten,
                })
            }
            Predicate::Leaf(leaf) => rewrite_leaf(leaf, ctx, lookup, on_miss).await,
        }
    })
}

async fn rewrite_leaf(
    mut leaf: FilterLeaf,
    ctx: &RouteContext,
    lookup: &dyn AssociationLookup,
    on_miss: LookupMiss,
) -> Result<Predicate, ApiError> {
    leaf.field = ctx.resolve_id_path(leaf.field.as_str());

    let Some(mapping) = ctx.relation_mapping_for_fk(leaf.field.as_str()) else {
        return Ok(Predicate::Leaf(leaf));
    };

    match leaf.op {
        Operator::Eq => {
            match lookup
                .resolve_external(&mapping.table, &mapping.id_field, &leaf.value)
                .await?
            {
                Some(key) => {
                    leaf.value = key;
                    Ok(Predicate::Leaf(leaf))
                }
                None => match on_miss {
                    LookupMiss::Reject => Err(ApiError::related_not_found(&mapping.fk_column)),
                    LookupMiss::MatchNothing => Ok(Predicate::never(&mapping.fk_column)),
                },
            }
        }
        // No row carries the unresolvable key, so the inequality holds
        // everywhere.
        Operator::Neq => {
            match lookup
                .resolve_external(&mapping.table, &mapping.id_field, &leaf.value)
                .await?
            {
                Some(key) => {
                    leaf.value = key;
                    Ok(Predicate::Leaf(leaf))
                }
                None => Ok(Predicate::empty()),
            }
        }
        Operator::In | Operator::NotIn => {
            let externals = leaf.value.as_array().cloned().unwrap_or_default();
            let mut keys = Vec::with_capacity(externals.len());
            for external in &externals {
                match lookup
                    .resolve_external(&mapping.table, &mapping.id_field, external)
                    .await?
                {
                    Some(key) => keys.push(key),
                    None if on_miss == LookupMiss::Reject && leaf.op == Operator::In => {
                        return Err(ApiError::related_not_found(&mapping.fk_column));
                    }
                    // Unresolvable members constrain nothing; an IN over
                    // zero survivors is the impossible predicate.
                    None => {}
                }
            }
            leaf.value = Value::Array(keys);
            Ok(Predicate::Leaf(leaf))
        }
        _ => Ok(Predicate::Leaf(leaf)),
    }
}

/// Rewrite relation-mapped foreign-key fields of a write payload from
/// external to internal form, in place.
///
/// # Errors
///
/// `ApiError::RelatedNotFound` when a value cannot resolve; writes never
/// degrade.
pub async fn rewrite_write_ids(
    payload: &mut Map<String, Value>,
    ctx: &RouteContext,
    lookup: &dyn AssociationLookup,
) -> Result<(), ApiError> {
    for mapping in &ctx.relation_mappings {
        let Some(value) = payload.get(&mapping.fk_column) else {
            continue;
        };
        if value.is_null() {
            continue;
        }
        let key = lookup
            .resolve_external(&mapping.table, &mapping.id_field, value)
            .await?
            .ok_or_else(|| ApiError::related_not_found(&mapping.fk_column))?;
        payload.insert(mapping.fk_column.clone(), key);
    }
    Ok(())
}

/// Rewrite result rows from internal to external id form, in place:
/// the root `id` takes its alternate column's value, and relation-mapped
/// foreign keys take the target's `id_field` value.
///
/// # Errors
///
/// Adapter lookup errors pass through. An output-direction miss (a dangling
/// foreign key) substitutes JSON null rather than failing the response.
pub async fn externalize_rows(
    rows: &mut [Value],
    ctx: &RouteContext,
    lookup: &dyn AssociationLookup,
) -> Result<(), ApiError> {
    for mapping in &ctx.relation_mappings {
        if !ctx.projects(&mapping.fk_column) {
            continue;
        }
        // Lookup results cached per request; list pages repeat fk values.
        let mut cache: Vec<(Value, Value)> = Vec::new();
        for row in rows.iter_mut() {
            let Some(object) = row.as_object_mut() else {
                continue;
            };
            let Some(key) = object.get(&mapping.fk_column) else {
                continue;
            };
            if key.is_null() {
                continue;
            }
            let external = match cache.iter().find(|(cached, _)| cached == key) {
                Some((_, external)) => external.clone(),
                None => {
                    let resolved = lookup
                        .resolve_internal(&mapping.table, &mapping.id_field, key)
                        .await?
                        .unwrap_or(Value::Null);
                    cache.push((key.clone(), resolved.clone()));
                    resolved
                }
            };
            object.insert(mapping.fk_column.clone(), external);
        }
    }

    if let IdentifierMode::AlternateKey(column) = &ctx.id_mode {
        for row in rows.iter_mut() {
            let Some(object) = row.as_object_mut() else {
                continue;
            };
            let external = if ctx.explicitly_projects(column) {
                object.get(column).cloned()
            } else {
                object.remove(column)
            };
            object.insert("id".to_string(), external.unwrap_or(Value::Null));
        }
    }

    Ok(())
}
