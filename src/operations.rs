//! The five CRUD operations, generic over the storage adapter.
//!
//! Each operation compiles a plan, runs it through the adapter, and shapes
//! the result rows in a fixed order: flatten configured associations,
//! externalize identifiers, then rename internal columns back to their
//! external aliases. Write payloads travel the reverse path before the
//! adapter sees them.

use crate::adapter::{JsonRow, StorageAdapter};
use crate::compiler::{compile_list, compile_single};
use crate::config::RouteContext;
use crate::errors::ApiError;
use crate::flatten::flatten_rows;
use crate::id_mapping::{IdentifierMode, externalize_rows, rewrite_write_ids};
use crate::models::ListRequest;
use crate::response::ApiResponse;
use serde_json::Value;
use tracing::debug;

/// List records matching the request's filters, ordered and paginated.
///
/// # Errors
///
/// `ApiError::BadRequest` from parsing or flatten validation; adapter errors
/// pass through.
pub async fn list<A: StorageAdapter>(
    ctx: &RouteContext,
    adapter: &A,
    request: &ListRequest,
) -> Result<ApiResponse, ApiError> {
    let plan = compile_list(ctx, request, adapter).await?;
    let (rows, count) = adapter.find_and_count_all(&plan).await?;
    debug!(
        resource = %ctx.resource_name,
        count,
        page = plan.paging.page,
        "list query executed"
    );

    let mut rows: Vec<Value> = rows.into_iter().map(Value::Object).collect();
    shape_rows(&mut rows, ctx, adapter).await?;

    let filtering_echo = request.body_filtering.clone();
    Ok(ApiResponse::list(rows, count, &plan, filtering_echo))
}

/// Fetch one record by its external id, optionally narrowed by a trusted
/// scoping filter.
///
/// # Errors
///
/// `ApiError::NotFound` when no record matches.
pub async fn get_one<A: StorageAdapter>(
    ctx: &RouteContext,
    adapter: &A,
    id: &Value,
    scoping: Option<&Value>,
) -> Result<ApiResponse, ApiError> {
    let plan = compile_single(ctx, id, scoping)?;
    let row = adapter
        .find_one(&plan)
        .await?
        .ok_or_else(|| not_found(ctx, id))?;

    Ok(ApiResponse::record(shape_one(row, ctx, adapter).await?))
}

/// Insert one record from an external-form payload.
///
/// # Errors
///
/// `ApiError::RelatedNotFound` when a relation-mapped foreign-key value
/// cannot resolve; adapter errors pass through.
pub async fn create<A: StorageAdapter>(
    ctx: &RouteContext,
    adapter: &A,
    payload: JsonRow,
) -> Result<ApiResponse, ApiError> {
    let values = internalize_payload(payload, ctx, adapter).await?;
    let row = adapter.create(values).await?;
    debug!(resource = %ctx.resource_name, "record created");

    Ok(ApiResponse::record(shape_one(row, ctx, adapter).await?))
}

/// Update the record addressed by its external id.
///
/// # Errors
///
/// `ApiError::NotFound` when no record matches; `ApiError::RelatedNotFound`
/// when a relation-mapped foreign-key value cannot resolve.
pub async fn update<A: StorageAdapter>(
    ctx: &RouteContext,
    adapter: &A,
    id: &Value,
    payload: JsonRow,
    scoping: Option<&Value>,
) -> Result<ApiResponse, ApiError> {
    let plan = compile_single(ctx, id, scoping)?;
    let values = internalize_payload(payload, ctx, adapter).await?;
    let row = adapter
        .update(&plan, values)
        .await?
        .ok_or_else(|| not_found(ctx, id))?;
    debug!(resource = %ctx.resource_name, "record updated");

    Ok(ApiResponse::record(shape_one(row, ctx, adapter).await?))
}

/// Delete the record addressed by its external id.
///
/// # Errors
///
/// `ApiError::NotFound` when no record matches.
pub async fn destroy<A: StorageAdapter>(
    ctx: &RouteContext,
    adapter: &A,
    id: &Value,
    scoping: Option<&Value>,
) -> Result<ApiResponse, ApiError> {
    let plan = compile_single(ctx, id, scoping)?;
    let removed = adapter.destroy(&plan).await?;
    if removed == 0 {
        return Err(not_found(ctx, id));
    }
    debug!(resource = %ctx.resource_name, removed, "records deleted");

    Ok(ApiResponse::success())
}

/// Convert a write payload from external to internal form: alias renames,
/// root-id redirection, then relation-id resolution through the adapter.
async fn internalize_payload<A: StorageAdapter>(
    mut payload: JsonRow,
    ctx: &RouteContext,
    adapter: &A,
) -> Result<JsonRow, ApiError> {
    ctx.aliases.rename_to_internal(&mut payload);

    if let IdentifierMode::AlternateKey(column) = &ctx.id_mode
        && let Some(value) = payload.remove("id")
    {
        payload.insert(column.clone(), value);
    }

    rewrite_write_ids(&mut payload, ctx, adapter).await?;
    Ok(payload)
}

async fn shape_one<A: StorageAdapter>(
    row: JsonRow,
    ctx: &RouteContext,
    adapter: &A,
) -> Result<Value, ApiError> {
    let mut rows = vec![Value::Object(row)];
    shape_rows(&mut rows, ctx, adapter).await?;
    Ok(rows.remove(0))
}

/// Flatten, externalize ids, then rename to external aliases. Flattening
/// runs first so relation-mapped foreign keys lifted out of an association
/// still get substituted; aliasing runs last so it sees final column names.
async fn shape_rows<A: StorageAdapter>(
    rows: &mut [Value],
    ctx: &RouteContext,
    adapter: &A,
) -> Result<(), ApiError> {
    flatten_rows(rows, &ctx.flatten);
    externalize_rows(rows, ctx, adapter).await?;
    for row in rows {
        if let Some(object) = row.as_object_mut() {
            ctx.aliases.rename_to_external(object);
        }
    }
    Ok(())
}

fn not_found(ctx: &RouteContext, id: &Value) -> ApiError {
    let display = match id {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    };
    ApiError::not_found(&ctx.resource_name, Some(display))
}
