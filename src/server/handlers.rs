//! Request handlers.

use super::response::payload_response;
use super::upload::read_conversion_request;
use super::AppState;
use crate::config::{resolve_scale, OutputMode};
use crate::convert::convert_bytes;
use crate::error::ConvertError;
use axum::extract::multipart::MultipartRejection;
use axum::extract::{Multipart, State};
use axum::http::{Method, Uri};
use axum::response::Response;
use axum::Json;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info};

/// Banner returned by `GET /` in archive deployments.
pub const ROOT_BANNER: &str = "PDF to Image Backend is running!";

/// Convert endpoint handler.
///
/// POST /api/convert
///
/// Accepts multipart form data with:
/// - the file field (default `pdfFile`): the PDF document
/// - `scale` (optional): render scale; unusable values fall back to the
///   configured default
///
/// A request that is not multipart at all carries no file and is answered
/// like a missing file.
pub async fn convert(
    State(state): State<AppState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Response, ConvertError> {
    let multipart = multipart.map_err(|rejection| {
        debug!("Request is not a multipart upload: {}", rejection);
        ConvertError::MissingFile {
            field: state.config.file_field.clone(),
        }
    })?;

    let request = read_conversion_request(multipart, &state.config).await?;

    let defaults = &state.config.conversion;
    let scale = resolve_scale(request.scale.as_deref(), defaults.scale, defaults.max_scale);
    info!(
        "Converting {} ({} bytes) at scale {}",
        request.file.file_name.as_deref().unwrap_or("<unnamed>"),
        request.file.bytes.len(),
        scale
    );

    let output = convert_bytes(
        request.file.bytes,
        defaults.with_scale(scale),
        Arc::clone(&state.backend),
    )
    .await?;

    Ok(payload_response(output.payload))
}

/// Any method other than POST on `/api/convert`.
pub async fn method_not_allowed(method: Method) -> ConvertError {
    ConvertError::MethodNotAllowed {
        method: method.to_string(),
    }
}

/// Health check response.
#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub output_mode: OutputMode,
    pub engine: String,
}

/// Health check endpoint handler.
///
/// GET /health
pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        output_mode: state.config.conversion.output_mode,
        engine: state.backend.name().to_string(),
    })
}

/// GET /
pub async fn root() -> &'static str {
    ROOT_BANNER
}

/// Fallback for unknown paths.
pub async fn not_found(uri: Uri) -> ConvertError {
    ConvertError::NotFound {
        path: uri.path().to_string(),
    }
}
