//! Response shaping: success payloads and JSON error bodies.

use crate::error::ConvertError;
use crate::output::{InlineArrayBody, OutputPayload, ARCHIVE_FILENAME};
use axum::http::{header, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};

/// Error response body
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorBody {
    pub success: bool,
    pub error: String,
    pub message: String,
}

/// HTTP status for an error.
pub fn status_for(err: &ConvertError) -> StatusCode {
    if !err.is_client_error() {
        return StatusCode::INTERNAL_SERVER_ERROR;
    }
    match err {
        ConvertError::PayloadTooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
        ConvertError::MethodNotAllowed { .. } => StatusCode::METHOD_NOT_ALLOWED,
        ConvertError::NotFound { .. } | ConvertError::FileNotFound { .. } => StatusCode::NOT_FOUND,
        _ => StatusCode::BAD_REQUEST,
    }
}

impl IntoResponse for ConvertError {
    fn into_response(self) -> Response {
        let status = status_for(&self);
        if status.is_server_error() {
            tracing::error!(stage = self.stage(), kind = self.kind(), "{}", self);
        } else {
            tracing::warn!(stage = self.stage(), kind = self.kind(), "{}", self);
        }

        let body = ErrorBody {
            success: false,
            error: self.kind().to_string(),
            message: self.to_string(),
        };
        let mut response = (status, Json(body)).into_response();

        if matches!(self, ConvertError::MethodNotAllowed { .. }) {
            response
                .headers_mut()
                .insert(header::ALLOW, HeaderValue::from_static("POST"));
        }
        response
    }
}

/// 200 response for a finished conversion.
pub fn payload_response(payload: OutputPayload) -> Response {
    match payload {
        OutputPayload::Archive { bytes, .. } => (
            StatusCode::OK,
            [
                (header::CONTENT_TYPE, "application/zip".to_string()),
                (
                    header::CONTENT_DISPOSITION,
                    format!("attachment; filename=\"{}\"", ARCHIVE_FILENAME),
                ),
            ],
            bytes,
        )
            .into_response(),
        OutputPayload::InlineArray { images } => {
            (StatusCode::OK, Json(InlineArrayBody::new(images))).into_response()
        }
    }
}
