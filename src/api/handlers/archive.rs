//! Handlers for the archive collections (`news`, `minutes`, `segments`).

use axum::{
    Extension, Json,
    body::Bytes,
    extract::{Path, Query, State, rejection::QueryRejection},
    http::StatusCode,
};
use serde_json::{Value, json};
use validator::Validate;

use super::json_body;
use crate::api::dto::archive::{ListQuery, ListResponse, UpsertResponse};
use crate::domain::entities::{Collection, Principal};
use crate::error::AppError;
use crate::state::AppState;

fn collection(raw: &str) -> Result<Collection, AppError> {
    raw.parse()
        .map_err(|e: String| AppError::not_found(e, json!({"collection": raw})))
}

/// Lists records of a collection.
///
/// # Endpoint
///
/// `GET /api/{collection}`
///
/// # Query Parameters
///
/// - `limit` (optional): page size, 1 to 500 (default: 50)
/// - `offset` (optional): records to skip (default: 0)
///
/// # Errors
///
/// - 404 for an unknown collection
/// - 400 `VALIDATION_ERROR` for invalid query parameters
pub async fn list_records_handler(
    State(state): State<AppState>,
    Path(name): Path<String>,
    query: Result<Query<ListQuery>, QueryRejection>,
) -> Result<Json<ListResponse>, AppError> {
    let collection = collection(&name)?;

    let Query(query) = query.map_err(|e| {
        AppError::validation("Invalid query parameters", json!({"reason": e.body_text()}))
    })?;
    query.validate()?;

    let (limit, offset) = query.limit_offset();
    let (items, total) = state.archive.list(collection, limit, offset).await?;

    Ok(Json(ListResponse {
        items,
        total,
        limit,
        offset,
    }))
}

/// Inserts or updates records by natural key (`url`, else `id`).
///
/// # Endpoint
///
/// `POST /api/{collection}`
///
/// # Request Body
///
/// A single JSON object or an array of objects. Batch size is already
/// bounded by the admission gate.
///
/// # Response
///
/// ```json
/// { "inserted": 2, "updated": 1 }
/// ```
pub async fn upsert_records_handler(
    State(state): State<AppState>,
    Path(name): Path<String>,
    principal: Option<Extension<Principal>>,
    body: Bytes,
) -> Result<Json<UpsertResponse>, AppError> {
    let collection = collection(&name)?;

    let items = match json_body(&body)? {
        Some(Value::Array(items)) => items,
        Some(item @ Value::Object(_)) => vec![item],
        Some(_) | None => {
            return Err(AppError::validation(
                "Body must be a JSON object or an array of objects",
                json!({}),
            ));
        }
    };

    if let Some(index) = items.iter().position(|item| !item.is_object()) {
        return Err(AppError::validation(
            "Every batch item must be a JSON object",
            json!({"index": index}),
        ));
    }

    let received = items.len();
    let outcome = state.archive.upsert(collection, items).await?;

    let subject = principal
        .as_ref()
        .and_then(|Extension(p)| p.subject())
        .unwrap_or("-");
    tracing::info!(
        collection = %collection,
        received,
        inserted = outcome.inserted,
        updated = outcome.updated,
        subject,
        "Records upserted"
    );

    Ok(Json(outcome.into()))
}

/// Deletes a record.
///
/// # Endpoint
///
/// `DELETE /api/{collection}/{id}`
///
/// # Response Codes
///
/// - **204 No Content**: deleted
/// - **404 Not Found**: unknown collection or record
/// - **400 Bad Request**: `id` is not a non-negative integer
pub async fn delete_record_handler(
    State(state): State<AppState>,
    Path((name, raw_id)): Path<(String, String)>,
) -> Result<StatusCode, AppError> {
    let collection = collection(&name)?;
    let id: u64 = raw_id.parse().map_err(|_| {
        AppError::validation("Record id must be a non-negative integer", json!({"id": raw_id}))
    })?;

    if state.archive.delete(collection, id).await? {
        tracing::info!(collection = %collection, id, "Record deleted");
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(AppError::not_found(
            "Record not found",
            json!({"collection": collection.as_str(), "id": id}),
        ))
    }
}
