//! Bidirectional external-name / internal-column aliasing.
//!
//! Aliases are declared per route as `external -> internal` pairs and used in
//! three places: resolving filter fields, resolving ordering fields, and
//! rewriting result row keys back to their external names. Both directions
//! are built once at route-configuration time; injectivity is validated there
//! so an ambiguous table fails at startup instead of per request.

use crate::errors::ApiError;
use serde_json::{Map, Value};
use std::collections::HashMap;

/// Forward and inverse alias maps for one route.
#[derive(Debug, Clone, Default)]
pub struct AliasTable {
    /// external name -> internal column
    forward: HashMap<String, String>,
    /// internal column -> external name
    inverse: HashMap<String, String>,
}

impl AliasTable {
    /// Build an alias table, validating that no two external names collapse
    /// to the same internal column.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::Config` when the declared map is not injective.
    pub fn new(declared: &HashMap<String, String>) -> Result<Self, ApiError> {
        let mut forward = HashMap::with_capacity(declared.len());
        let mut inverse = HashMap::with_capacity(declared.len());

        for (external, internal) in declared {
            if let Some(existing) = inverse.insert(internal.clone(), external.clone()) {
                return Err(ApiError::config(format!(
                    "aliases '{existing}' and '{external}' both map to column '{internal}'"
                )));
            }
            forward.insert(external.clone(), internal.clone());
        }

        Ok(Self { forward, inverse })
    }

    /// An empty table: every name resolves to itself.
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    /// Resolve an external field name to its internal column name.
    ///
    /// Unaliased names resolve to themselves. For dot-qualified paths an
    /// exact full-path alias wins; otherwise the terminal segment is resolved
    /// and the association prefix kept as-is.
    #[must_use]
    pub fn resolve(&self, external: &str) -> String {
        if let Some(internal) = self.forward.get(external) {
            return internal.clone();
        }
        if let Some((prefix, terminal)) = external.rsplit_once('.')
            && let Some(internal) = self.forward.get(terminal)
        {
            return format!("{prefix}.{internal}");
        }
        external.to_string()
    }

    /// Resolve an internal column name back to its external name.
    #[must_use]
    pub fn external_for(&self, internal: &str) -> String {
        if let Some(external) = self.inverse.get(internal) {
            return external.clone();
        }
        if let Some((prefix, terminal)) = internal.rsplit_once('.')
            && let Some(external) = self.inverse.get(terminal)
        {
            return format!("{prefix}.{external}");
        }
        internal.to_string()
    }

    /// Rewrite the keys of a JSON object from external to internal names.
    pub fn rename_to_internal(&self, obj: &mut Map<String, Value>) {
        self.rename_keys(obj, |table, key| table.resolve(key));
    }

    /// Rewrite the keys of a JSON object from internal to external names.
    pub fn rename_to_external(&self, obj: &mut Map<String, Value>) {
        self.rename_keys(obj, |table, key| table.external_for(key));
    }

    fn rename_keys(&self, obj: &mut Map<String, Value>, f: impl Fn(&Self, &str) -> String) {
        let renames: Vec<(String, String)> = obj
            .keys()
            .filter_map(|key| {
                let mapped = f(self, key);
                (mapped != *key).then(|| (key.clone(), mapped))
            })
            .collect();

        for (old, new) in renames {
            if let Some(value) = obj.remove(&old) {
                obj.insert(new, value);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn table() -> AliasTable {
        let declared = HashMap::from([
            ("name".to_string(), "label".to_string()),
            ("cost".to_string(), "price_cents".to_string()),
        ]);
        AliasTable::new(&declared).unwrap()
    }

    #[test]
    fn test_resolve_aliased_and_plain() {
        let t = table();
        assert_eq!(t.resolve("name"), "label");
        assert_eq!(t.resolve("cost"), "price_cents");
        assert_eq!(t.resolve("category"), "category");
    }

    #[test]
    fn test_external_for_inverse() {
        let t = table();
        assert_eq!(t.external_for("label"), "name");
        assert_eq!(t.external_for("category"), "category");
    }

    #[test]
    fn test_dotted_terminal_segment() {
        let t = table();
        assert_eq!(t.resolve("artist.name"), "artist.label");
        assert_eq!(t.external_for("artist.label"), "artist.name");
    }

    /// An exact full-path alias takes precedence over terminal resolution.
    #[test]
    fn test_dotted_full_path_alias_wins() {
        let declared = HashMap::from([
            ("artist_name".to_string(), "artist.label".to_string()),
            ("name".to_string(), "title".to_string()),
        ]);
        let t = AliasTable::new(&declared).unwrap();
        assert_eq!(t.resolve("artist_name"), "artist.label");
        // Plain terminal resolution is unaffected
        assert_eq!(t.resolve("other.name"), "other.title");
    }

    #[test]
    fn test_non_injective_map_rejected() {
        let declared = HashMap::from([
            ("name".to_string(), "label".to_string()),
            ("title".to_string(), "label".to_string()),
        ]);
        assert!(AliasTable::new(&declared).is_err());
    }

    #[test]
    fn test_rename_round_trip() {
        let t = table();
        let original = json!({"name": "Widget", "cost": 100, "category": "tools"});
        let mut obj = original.as_object().unwrap().clone();

        t.rename_to_internal(&mut obj);
        assert!(obj.contains_key("label"));
        assert!(obj.contains_key("price_cents"));
        assert!(obj.contains_key("category"));
        assert!(!obj.contains_key("name"));

        t.rename_to_external(&mut obj);
        assert_eq!(Value::Object(obj), original);
    }

    #[test]
    fn test_empty_table_is_identity() {
        let t = AliasTable::empty();
        assert_eq!(t.resolve("anything"), "anything");
        assert_eq!(t.external_for("anything"), "anything");
    }
}
