//! Structured-body filter surface.
//!
//! A filter object maps field names to either a scalar (equality) or an
//! operator object `{"gte": 100, "lt": 500}`, which expands into an implicit
//! AND of that field's leaves. The reserved keys `and` / `or` hold arrays of
//! nested filter objects and recurse.
//!
//! Trusted route code may also supply *programmatic* filters through the same
//! grammar; those bypass the field access policy since they are not
//! attacker-controlled. Pass `None` for the policy in that case.

use crate::aliasing::AliasTable;
use crate::errors::ApiError;
use crate::filtering::ast::{FieldPath, FilterLeaf, Logic, Operator, Predicate};
use crate::policy::FieldPolicy;
use serde_json::Value;

/// Parse a structured filter value into a predicate tree.
///
/// # Errors
///
/// `ApiError::BadRequest` for unknown operators, malformed `and`/`or` arrays,
/// non-array `in`/`not_in` operands, or fields rejected by the policy.
pub fn parse_body_filters(
    filtering: &Value,
    aliases: &AliasTable,
    policy: Option<&FieldPolicy>,
) -> Result<Predicate, ApiError> {
    match filtering {
        Value::Null => Ok(Predicate::empty()),
        Value::Object(_) => parse_object(filtering, aliases, policy),
        _ => Err(ApiError::bad_request(
            "The 'filtering' value must be an object",
        )),
    }
}

fn parse_object(
    value: &Value,
    aliases: &AliasTable,
    policy: Option<&FieldPolicy>,
) -> Result<Predicate, ApiError> {
    let Some(object) = value.as_object() else {
        return Err(ApiError::bad_request("Filter entries must be objects"));
    };

    let mut children = Vec::with_capacity(object.len());

    for (key, entry) in object {
        match key.as_str() {
            "and" => children.push(parse_branch(entry, Logic::And, aliases, policy)?),
            "or" => children.push(parse_branch(entry, Logic::Or, aliases, policy)?),
            field => children.push(parse_field(field, entry, aliases, policy)?),
        }
    }

    Ok(Predicate::and(children))
}

fn parse_branch(
    entry: &Value,
    logic: Logic,
    aliases: &AliasTable,
    policy: Option<&FieldPolicy>,
) -> Result<Predicate, ApiError> {
    let Some(items) = entry.as_array() else {
        let name = if logic == Logic::And { "and" } else { "or" };
        return Err(ApiError::bad_request(format!(
            "The '{name}' filter key must hold an array"
        )));
    };

    let children = items
        .iter()
        .map(|item| parse_object(item, aliases, policy))
        .collect::<Result<Vec<_>, _>>()?;

    Ok(match logic {
        Logic::And => Predicate::and(children),
        Logic::Or => Predicate::or(children),
    })
}

fn parse_field(
    field: &str,
    entry: &Value,
    aliases: &AliasTable,
    policy: Option<&FieldPolicy>,
) -> Result<Predicate, ApiError> {
    let internal = aliases.resolve(field);
    if let Some(policy) = policy {
        policy.check(field, &internal)?;
    }

    match entry {
        // Operator object: {"gte": 100, "lt": 500} - implicit AND of leaves
        Value::Object(ops) => {
            let mut leaves = Vec::with_capacity(ops.len());
            for (keyword, operand) in ops {
                let op = Operator::parse(keyword).ok_or_else(|| {
                    ApiError::bad_request(format!("Unknown operator '{keyword}'"))
                })?;
                leaves.push(Predicate::Leaf(FilterLeaf {
                    field: FieldPath::new(internal.clone()),
                    op,
                    value: check_operand(op, operand, field)?,
                }));
            }
            Ok(Predicate::and(leaves))
        }
        // Bare scalar (booleans included) is equality
        scalar => Ok(Predicate::Leaf(FilterLeaf {
            field: FieldPath::new(internal),
            op: Operator::Eq,
            value: scalar.clone(),
        })),
    }
}

fn check_operand(op: Operator, operand: &Value, field: &str) -> Result<Value, ApiError> {
    if op.takes_list() && !operand.is_array() {
        return Err(ApiError::bad_request(format!(
            "Operator '{}' on field '{field}' requires an array value",
            op.as_str()
        )));
    }
    if op.is_standalone() {
        return Ok(Value::Null);
    }
    Ok(operand.clone())
}
