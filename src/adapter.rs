//! Storage adapter seam.
//!
//! The engine compiles requests into a [`QueryPlan`] and hands it to a
//! [`StorageAdapter`]; it never issues queries itself. Adapters exchange rows
//! as JSON objects keyed by internal column names, so response shaping
//! (flattening, identifier externalization, alias renames) stays independent
//! of the backing store.

use crate::compiler::QueryPlan;
use crate::errors::ApiError;
use crate::id_mapping::AssociationLookup;
use async_trait::async_trait;
use serde_json::Value;

/// One result row, keyed by internal column names.
pub type JsonRow = serde_json::Map<String, Value>;

/// Backend operations for one resource.
///
/// An adapter also serves the identifier mapper's lookups, so a single
/// implementation covers both query execution and id resolution.
#[async_trait]
pub trait StorageAdapter: AssociationLookup {
    /// Fetch the rows selected by the plan plus the unpaginated match count.
    async fn find_and_count_all(&self, plan: &QueryPlan) -> Result<(Vec<JsonRow>, u64), ApiError>;

    /// Fetch at most one row matching the plan's predicate.
    async fn find_one(&self, plan: &QueryPlan) -> Result<Option<JsonRow>, ApiError>;

    /// Insert one row and return it as stored.
    async fn create(&self, values: JsonRow) -> Result<JsonRow, ApiError>;

    /// Update the row matching the plan's predicate; `None` when no row
    /// matched.
    async fn update(&self, plan: &QueryPlan, values: JsonRow) -> Result<Option<JsonRow>, ApiError>;

    /// Delete the rows matching the plan's predicate, returning how many
    /// were removed.
    async fn destroy(&self, plan: &QueryPlan) -> Result<u64, ApiError>;
}
