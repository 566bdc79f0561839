//! Flattening: merging a joined association's attributes into the parent row.
//!
//! A flatten spec names an association (`model` + `as`) and the attributes to
//! lift out of it, each optionally renamed. The nested association key is
//! deleted from the parent, so the nested object never reaches the response.
//! Validation is eager: a spec that matches no configured include fails the
//! request before the storage query runs, instead of silently returning the
//! association unflattened.

use crate::config::IncludeDef;
use crate::errors::ApiError;
use serde::Deserialize;
use serde_json::{Map, Value};

/// One attribute to lift: a bare name, or `[internal, external]` to rename.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum FlattenAttribute {
    Name(String),
    Renamed(String, String),
}

impl FlattenAttribute {
    #[must_use]
    pub fn internal(&self) -> &str {
        match self {
            Self::Name(name) | Self::Renamed(name, _) => name,
        }
    }

    #[must_use]
    pub fn external(&self) -> &str {
        match self {
            Self::Name(name) => name,
            Self::Renamed(_, alias) => alias,
        }
    }
}

/// Declared flattening of one association into the parent's flat shape.
#[derive(Debug, Clone, Deserialize)]
pub struct FlattenSpec {
    /// Target table of the association.
    pub model: String,
    /// The association alias, matched against the include's `as`.
    #[serde(rename = "as")]
    pub as_alias: String,
    /// Attributes to merge. Empty is legal: the association is stripped
    /// without exposing anything from it.
    #[serde(default)]
    pub attributes: Vec<FlattenAttribute>,
    /// Extra options forwarded to the include (e.g., a limiting strategy for
    /// to-many associations). Opaque to the engine.
    #[serde(default)]
    pub include_options: Option<Value>,
}

/// Check every flatten spec against the configured includes.
///
/// # Errors
///
/// `ApiError::BadRequest` when a spec's `model`/`as` pair matches no include.
pub fn validate_flattening(specs: &[FlattenSpec], includes: &[IncludeDef]) -> Result<(), ApiError> {
    for spec in specs {
        let matched = includes
            .iter()
            .any(|include| include.model == spec.model && include.as_alias == spec.as_alias);
        if !matched {
            return Err(ApiError::bad_request(format!(
                "Flattening target '{}' (as '{}') does not match any configured include",
                spec.model, spec.as_alias
            )));
        }
    }
    Ok(())
}

/// Apply every flatten spec to each result row.
pub fn flatten_rows(rows: &mut [Value], specs: &[FlattenSpec]) {
    for row in rows {
        if let Value::Object(object) = row {
            for spec in specs {
                flatten_row(object, spec);
            }
        }
    }
}

fn flatten_row(row: &mut Map<String, Value>, spec: &FlattenSpec) {
    let nested = row.remove(&spec.as_alias);

    // A to-many include arrives as an array; the first element is the
    // matched child row. Call sites needing stable row counts constrain the
    // include themselves.
    let child = match &nested {
        Some(Value::Object(child)) => Some(child),
        Some(Value::Array(items)) => items.first().and_then(Value::as_object),
        _ => None,
    };

    for attribute in &spec.attributes {
        let value = child
            .and_then(|child| child.get(attribute.internal()).cloned())
            .unwrap_or(Value::Null);
        row.insert(attribute.external().to_string(), value);
    }
}
