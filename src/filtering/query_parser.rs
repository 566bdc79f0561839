//! Query-string filter surface.
//!
//! Keys are `field` or `field:operator`; a key without an operator is an
//! equality test. Values arrive as strings and are coerced: `true`/`false`
//! become boolean equality, numeric forms become numbers, UUID strings are
//! normalized, everything else stays a string. `in`/`not_in` values are
//! comma-split into arrays.
//!
//! Every leaf's field goes through alias resolution and the field access
//! policy; any rejection aborts the whole parse so no query ever runs with a
//! partially-applied filter.

use crate::aliasing::AliasTable;
use crate::errors::ApiError;
use crate::filtering::ast::{FieldPath, FilterLeaf, Operator, Predicate};
use crate::policy::FieldPolicy;
use serde_json::Value;
use std::collections::BTreeMap;
use uuid::Uuid;

/// Parse the non-reserved query-string entries into a predicate tree.
///
/// Entries are processed in key order so the resulting tree is deterministic
/// regardless of the map's iteration order.
///
/// # Errors
///
/// `ApiError::BadRequest` for an unknown operator keyword or a field rejected
/// by the access policy.
pub fn parse_query_filters(
    entries: &BTreeMap<String, String>,
    aliases: &AliasTable,
    policy: &FieldPolicy,
) -> Result<Predicate, ApiError> {
    let mut children = Vec::with_capacity(entries.len());

    for (key, raw_value) in entries {
        let (field, op) = split_key(key)?;
        let internal = aliases.resolve(field);
        policy.check(field, &internal)?;

        let value = operand_for(op, raw_value);
        children.push(Predicate::Leaf(FilterLeaf {
            field: FieldPath::new(internal),
            op,
            value,
        }));
    }

    Ok(Predicate::and(children))
}

/// Split a `field` / `field:operator` key.
fn split_key(key: &str) -> Result<(&str, Operator), ApiError> {
    match key.rsplit_once(':') {
        Some((field, keyword)) => {
            let op = Operator::parse(keyword)
                .ok_or_else(|| ApiError::bad_request(format!("Unknown operator '{keyword}'")))?;
            Ok((field, op))
        }
        None => Ok((key, Operator::Eq)),
    }
}

fn operand_for(op: Operator, raw: &str) -> Value {
    if op.takes_list() {
        return Value::Array(raw.split(',').map(|part| coerce_scalar(part.trim())).collect());
    }
    if op.is_standalone() {
        return Value::Null;
    }
    coerce_scalar(raw)
}

/// Coerce a raw query-string value into its natural JSON scalar.
#[must_use]
pub fn coerce_scalar(raw: &str) -> Value {
    match raw {
        "true" => return Value::Bool(true),
        "false" => return Value::Bool(false),
        _ => {}
    }
    if let Ok(int) = raw.parse::<i64>() {
        return Value::Number(int.into());
    }
    if let Ok(float) = raw.parse::<f64>()
        && let Some(number) = serde_json::Number::from_f64(float)
    {
        return Value::Number(number);
    }
    // Normalize UUID spellings so lookups and equality are canonical
    if let Ok(uuid) = Uuid::parse_str(raw) {
        return Value::String(uuid.to_string());
    }
    Value::String(raw.to_string())
}
