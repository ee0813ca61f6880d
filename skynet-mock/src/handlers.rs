/// Axum HTTP handlers for the Skynet portal endpoints

use axum::{
    extract::{Multipart, Path, Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use std::sync::Arc;

use crate::state::{PortalState, RegistryError};
use crate::types::*;

/// Shared application state
pub type AppState = Arc<PortalState>;

/// Custom error type for handlers
pub enum ApiError {
    NotFound(String),
    BadRequest(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
        };

        (status, Json(serde_json::json!({ "message": message }))).into_response()
    }
}

impl From<RegistryError> for ApiError {
    fn from(err: RegistryError) -> Self {
        ApiError::BadRequest(format!("unable to update the registry: {}", err))
    }
}

/// GET /skynet/registry?publickey=ed25519:<hex>&datakey=<hex>
pub async fn get_registry_entry(
    State(state): State<AppState>,
    Query(query): Query<RegistryQuery>,
) -> Result<Json<RegistryEntryResponse>, ApiError> {
    let entry = state
        .lookup(&query.publickey, &query.datakey)
        .await
        .ok_or_else(|| ApiError::NotFound("registry entry not found".to_string()))?;

    Ok(Json(RegistryEntryResponse {
        data: hex::encode(&entry.data),
        revision: entry.revision,
        signature: hex::encode(&entry.signature),
    }))
}

/// POST /skynet/registry
pub async fn set_registry_entry(
    State(state): State<AppState>,
    Json(update): Json<RegistryUpdate>,
) -> Result<StatusCode, ApiError> {
    let revision = state.update(&update).await.map_err(|e| {
        log::warn!("Rejected registry update: {}", e);
        ApiError::from(e)
    })?;
    log::info!("Registry {} updated to revision {}", update.datakey, revision);
    Ok(StatusCode::NO_CONTENT)
}

/// POST /skynet/skyfile
/// Multipart upload, file in the `file` field
pub async fn upload_skyfile(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<SkyfileUploadResponse>, ApiError> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::BadRequest(format!("invalid multipart body: {}", e)))?
    {
        if field.name() != Some("file") {
            continue;
        }
        let content_type = field
            .content_type()
            .unwrap_or("application/octet-stream")
            .to_string();
        let bytes = field
            .bytes()
            .await
            .map_err(|e| ApiError::BadRequest(format!("failed to read file: {}", e)))?;

        let (skylink, merkle_root) = state.store_file(bytes.to_vec(), content_type).await;
        log::info!("Stored skyfile {} ({} bytes)", skylink, bytes.len());

        return Ok(Json(SkyfileUploadResponse {
            skylink,
            merkleroot: hex::encode(merkle_root),
            bitfield: 0,
        }));
    }

    Err(ApiError::BadRequest("missing 'file' field".to_string()))
}

/// GET /{skylink}
pub async fn download_skyfile(
    State(state): State<AppState>,
    Path(skylink): Path<String>,
) -> Result<Response, ApiError> {
    let (content_type, bytes) = state
        .file(&skylink)
        .await
        .ok_or_else(|| ApiError::NotFound(format!("skylink not found: {}", skylink)))?;

    Ok(([(header::CONTENT_TYPE, content_type)], bytes).into_response())
}

/// GET /health
/// Health check endpoint
pub async fn health_check() -> &'static str {
    "OK"
}
