//! Per-route configuration and the frozen request-time context.
//!
//! A [`ResourceConfig`] is the declarative bag of options a route supplies
//! once; [`ResourceConfig::build`] validates it (alias injectivity, flatten
//! and relation-mapping targets) and freezes it into an immutable
//! [`RouteContext`] shared across requests. Each request composes its own
//! plan from the frozen context; nothing here is mutated after startup.

use crate::aliasing::AliasTable;
use crate::errors::ApiError;
use crate::filtering::ast::FieldPath;
use crate::filtering::sort::SortDirection;
use crate::flatten::{FlattenSpec, validate_flattening};
use crate::id_mapping::{IdentifierMode, RelationMapping};
use crate::policy::FieldPolicy;
use serde::Deserialize;
use std::collections::HashMap;

fn default_pk() -> String {
    "id".to_string()
}

/// One declared association traversal the query may load alongside the
/// primary entity.
#[derive(Debug, Clone, Deserialize)]
pub struct IncludeDef {
    /// Target table of the association.
    pub model: String,
    /// Alias the association is loaded under.
    #[serde(rename = "as")]
    pub as_alias: String,
    /// Foreign-key column on the parent pointing at the target; absent for
    /// to-many associations keyed from the child side.
    #[serde(default)]
    pub fk_column: Option<String>,
    /// The target's primary-key column.
    #[serde(default = "default_pk")]
    pub pk_column: String,
    /// Projected attributes of the target; `None` selects everything.
    #[serde(default)]
    pub attributes: Option<Vec<String>>,
    /// The association's own alternate-id column, used when a dotted filter
    /// or ordering path ends in `id`.
    #[serde(default)]
    pub id_mapping: Option<String>,
    /// Load the association with a separate query (keeps to-many row counts
    /// stable under flattening).
    #[serde(default)]
    pub separate: bool,
}

/// One declared relation-id substitution: present the target's `id_field`
/// instead of the internal foreign-key value.
#[derive(Debug, Clone, Deserialize)]
pub struct RelationIdMapping {
    /// Target table, matched against the includes.
    pub model: String,
    /// The target column exposed as the external id.
    pub id_field: String,
}

/// The recognized per-route options.
#[derive(Debug, Clone, Deserialize)]
pub struct ResourceConfig {
    #[serde(default)]
    pub allow_filtering_on: Option<Vec<String>>,
    #[serde(default)]
    pub block_filtering_on: Option<Vec<String>>,
    #[serde(default)]
    pub allow_ordering_on: Option<Vec<String>>,
    #[serde(default)]
    pub block_ordering_on: Option<Vec<String>>,
    /// external name -> internal column
    #[serde(default)]
    pub aliases: Option<HashMap<String, String>>,
    /// Internal column exposed as the entity's external `id`.
    #[serde(default)]
    pub id_mapping: Option<String>,
    #[serde(default)]
    pub relation_id_mapping: Option<Vec<RelationIdMapping>>,
    #[serde(default)]
    pub default_page_size: Option<u64>,
    #[serde(default)]
    pub default_order_by: Option<String>,
    #[serde(default)]
    pub default_order_dir: Option<SortDirection>,
    #[serde(default)]
    pub flattening: Option<Vec<FlattenSpec>>,
    #[serde(default)]
    pub includes: Vec<IncludeDef>,
    /// Projected attributes of the entity; `None` selects everything.
    #[serde(default)]
    pub attributes: Option<Vec<String>>,
    /// The entity's primary-key column.
    #[serde(default = "default_pk")]
    pub primary_key: String,
}

impl Default for ResourceConfig {
    fn default() -> Self {
        Self {
            allow_filtering_on: None,
            block_filtering_on: None,
            allow_ordering_on: None,
            block_ordering_on: None,
            aliases: None,
            id_mapping: None,
            relation_id_mapping: None,
            default_page_size: None,
            default_order_by: None,
            default_order_dir: None,
            flattening: None,
            includes: Vec::new(),
            attributes: None,
            primary_key: default_pk(),
        }
    }
}

/// Immutable per-route context, validated once and shared across requests.
#[derive(Debug, Clone)]
pub struct RouteContext {
    pub resource_name: String,
    pub primary_key: String,
    pub aliases: AliasTable,
    pub filter_policy: FieldPolicy,
    pub order_policy: FieldPolicy,
    pub id_mode: IdentifierMode,
    pub relation_mappings: Vec<RelationMapping>,
    pub default_page_size: Option<u64>,
    pub default_order: Option<(String, SortDirection)>,
    pub flatten: Vec<FlattenSpec>,
    pub includes: Vec<IncludeDef>,
    pub attributes: Option<Vec<String>>,
}

impl ResourceConfig {
    /// Validate the configuration and freeze it into a [`RouteContext`].
    ///
    /// # Errors
    ///
    /// `ApiError::Config` for an alias collision or a relation mapping with
    /// no matching include; `ApiError::BadRequest` for a flatten spec that
    /// matches no include (the same rejection a request would get).
    pub fn build(self, resource_name: &str) -> Result<RouteContext, ApiError> {
        let aliases = match &self.aliases {
            Some(declared) => AliasTable::new(declared)?,
            None => AliasTable::empty(),
        };

        let filter_policy =
            FieldPolicy::new(self.allow_filtering_on, self.block_filtering_on, "filtering");
        let order_policy =
            FieldPolicy::new(self.allow_ordering_on, self.block_ordering_on, "ordering");

        let flatten = self.flattening.unwrap_or_default();
        validate_flattening(&flatten, &self.includes)?;

        let mut relation_mappings = Vec::new();
        for mapping in self.relation_id_mapping.unwrap_or_default() {
            let include = self
                .includes
                .iter()
                .find(|include| include.model == mapping.model)
                .ok_or_else(|| {
                    ApiError::config(format!(
                        "relation_id_mapping target '{}' has no matching include",
                        mapping.model
                    ))
                })?;
            let fk_column = include.fk_column.clone().ok_or_else(|| {
                ApiError::config(format!(
                    "relation_id_mapping target '{}' has no foreign-key column on the parent",
                    mapping.model
                ))
            })?;
            relation_mappings.push(RelationMapping {
                table: mapping.model,
                id_field: mapping.id_field,
                fk_column,
                as_alias: include.as_alias.clone(),
            });
        }

        let default_order = self
            .default_order_by
            .map(|field| (field, self.default_order_dir.unwrap_or_default()));

        Ok(RouteContext {
            resource_name: resource_name.to_string(),
            primary_key: self.primary_key,
            aliases,
            filter_policy,
            order_policy,
            id_mode: IdentifierMode::from_config(self.id_mapping),
            relation_mappings,
            default_page_size: self.default_page_size,
            default_order,
            flatten,
            includes: self.includes,
            attributes: self.attributes,
        })
    }
}

impl RouteContext {
    /// The include loaded under the given alias, if any.
    #[must_use]
    pub fn include(&self, as_alias: &str) -> Option<&IncludeDef> {
        self.includes
            .iter()
            .find(|include| include.as_alias == as_alias)
    }

    /// The relation mapping governing a foreign-key column, if any.
    #[must_use]
    pub fn relation_mapping_for_fk(&self, fk_column: &str) -> Option<&RelationMapping> {
        self.relation_mappings
            .iter()
            .find(|mapping| mapping.fk_column == fk_column)
    }

    /// Whether a column is part of the final projection. `None` projects
    /// every column.
    #[must_use]
    pub fn projects(&self, column: &str) -> bool {
        self.attributes
            .as_ref()
            .is_none_or(|attributes| attributes.iter().any(|attr| attr == column))
    }

    /// Whether a column is explicitly listed in the projection (as opposed
    /// to implicitly included by projecting everything).
    #[must_use]
    pub fn explicitly_projects(&self, column: &str) -> bool {
        self.attributes
            .as_ref()
            .is_some_and(|attributes| attributes.iter().any(|attr| attr == column))
    }

    /// Redirect an internal field path through identifier mapping: the root
    /// `id` goes to its alternate column, and a dotted terminal `id` goes to
    /// the association's own mapped column (or its literal primary key).
    #[must_use]
    pub fn resolve_id_path(&self, internal: &str) -> FieldPath {
        if internal == self.primary_key {
            return FieldPath::new(self.id_mode.column(&self.primary_key));
        }
        if let Some((assoc, terminal)) = internal.split_once('.')
            && terminal == "id"
            && let Some(include) = self.include(assoc)
        {
            // The include's own mapping wins; an association governed only
            // by relation_id_mapping exposes that id_field instead.
            let column = include
                .id_mapping
                .as_deref()
                .or_else(|| {
                    self.relation_mappings
                        .iter()
                        .find(|mapping| mapping.as_alias == assoc)
                        .map(|mapping| mapping.id_field.as_str())
                })
                .unwrap_or(&include.pk_column);
            return FieldPath::new(format!("{assoc}.{column}"));
        }
        FieldPath::new(internal)
    }
}
