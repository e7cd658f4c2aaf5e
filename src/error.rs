//! Error types for the pdf2img library.
//!
//! Every failure in the conversion pipeline is terminal for the request:
//! there is no partial output and nothing is retried. [`ConvertError`]
//! therefore carries both the human-readable message and enough
//! classification ([`ConvertError::kind`], [`ConvertError::stage`]) for the
//! HTTP layer to pick a status code and for logs to say where it broke.
//!
//! The split between caller-input errors (4xx) and internal failures (5xx)
//! lives in [`ConvertError::is_client_error`].

use std::path::PathBuf;
use thiserror::Error;

/// All errors returned by the pdf2img library and server.
#[derive(Debug, Error)]
pub enum ConvertError {
    // ── Input errors ──────────────────────────────────────────────────────
    /// The multipart request carried no file under the expected field.
    #[error("No PDF file provided. Upload the document in the '{field}' form field.")]
    MissingFile { field: String },

    /// The request body could not be read as a multipart upload.
    #[error("Invalid upload: {0}")]
    InvalidUpload(String),

    /// The upload exceeded the configured body limit.
    #[error("Upload exceeds the maximum allowed size of {limit_bytes} bytes")]
    PayloadTooLarge { limit_bytes: usize },

    /// HTTP method other than POST on the conversion endpoint.
    #[error("Method {method} is not allowed; use POST")]
    MethodNotAllowed { method: String },

    /// No route matched the request path.
    #[error("No route for '{path}'")]
    NotFound { path: String },

    /// A local input file for the CLI could not be found.
    #[error("PDF file not found: '{path}'")]
    FileNotFound { path: PathBuf },

    // ── Document errors ───────────────────────────────────────────────────
    /// The bytes could not be opened as a paged document.
    #[error("Failed to parse PDF document: {detail}")]
    Parse { detail: String },

    /// The engine failed to rasterise one page; the request is aborted.
    #[error("Rasterisation failed for page {page}: {detail}")]
    Render { page: usize, detail: String },

    /// A rendered surface could not be PNG-encoded.
    #[error("PNG encoding failed for page {page}: {detail}")]
    Encode { page: usize, detail: String },

    /// The output archive could not be written or finalised.
    #[error("Failed to package output: {0}")]
    Packaging(String),

    // ── Engine / config errors ────────────────────────────────────────────
    /// Could not bind to a pdfium library.
    #[error(
        "Failed to bind to pdfium library: {0}\n\
         Set PDFIUM_LIB_PATH=/path/to/libpdfium or place the library next to the binary."
    )]
    EngineUnavailable(String),

    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Filesystem failure while spooling or reading input.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl ConvertError {
    /// Stable, machine-readable error kind used in JSON error bodies.
    pub fn kind(&self) -> &'static str {
        match self {
            ConvertError::MissingFile { .. } => "missing_file",
            ConvertError::InvalidUpload(_) => "invalid_upload",
            ConvertError::PayloadTooLarge { .. } => "payload_too_large",
            ConvertError::MethodNotAllowed { .. } => "method_not_allowed",
            ConvertError::NotFound { .. } => "not_found",
            ConvertError::FileNotFound { .. } => "file_not_found",
            ConvertError::Parse { .. } => "parse_error",
            ConvertError::Render { .. } => "render_error",
            ConvertError::Encode { .. } => "encode_error",
            ConvertError::Packaging(_) => "packaging_error",
            ConvertError::EngineUnavailable(_) => "engine_unavailable",
            ConvertError::InvalidConfig(_) => "invalid_config",
            ConvertError::Io(_) | ConvertError::Internal(_) => "internal_error",
        }
    }

    /// Pipeline stage the error originated from, for log context.
    pub fn stage(&self) -> &'static str {
        match self {
            ConvertError::MissingFile { .. }
            | ConvertError::InvalidUpload(_)
            | ConvertError::PayloadTooLarge { .. }
            | ConvertError::FileNotFound { .. } => "upload",
            ConvertError::MethodNotAllowed { .. } | ConvertError::NotFound { .. } => "routing",
            ConvertError::Parse { .. } => "load",
            ConvertError::Render { .. } => "render",
            ConvertError::Encode { .. } => "encode",
            ConvertError::Packaging(_) => "package",
            ConvertError::EngineUnavailable(_) | ConvertError::InvalidConfig(_) => "setup",
            ConvertError::Io(_) | ConvertError::Internal(_) => "internal",
        }
    }

    /// `true` when the caller sent something wrong; nothing was converted.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            ConvertError::MissingFile { .. }
                | ConvertError::InvalidUpload(_)
                | ConvertError::PayloadTooLarge { .. }
                | ConvertError::MethodNotAllowed { .. }
                | ConvertError::NotFound { .. }
                | ConvertError::FileNotFound { .. }
        )
    }
}
