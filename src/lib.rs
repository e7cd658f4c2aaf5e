//! # pdf2img
//!
//! Turn an uploaded PDF into one PNG image per page, served over HTTP or
//! run from the command line.
//!
//! ## Pipeline Overview
//!
//! ```text
//! PDF bytes
//!  │
//!  ├─ 1. Input    multipart upload (memory or spooled temp file), %PDF- check
//!  ├─ 2. Load     open the document with pdfium (blocking pool)
//!  ├─ 3. Render   one page at a time, viewport = page size × scale
//!  ├─ 4. Encode   PNG, or base64 data URL in inline mode
//!  └─ 5. Package  zip archive (page_001.png …) or ordered JSON array
//! ```
//!
//! Any failure ends the conversion: there is no partial archive and no short
//! image array.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use pdf2img::{convert_file, ConversionConfig, OutputPayload, PdfiumBackend, RenderBackend};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let backend: Arc<dyn RenderBackend> = Arc::new(PdfiumBackend::new(None));
//!     let config = ConversionConfig::builder().scale(2.0).build()?;
//!     let output = convert_file("document.pdf", &config, backend).await?;
//!     if let OutputPayload::Archive { bytes, entries } = output.payload {
//!         println!("{} entries, {} bytes", entries.len(), bytes.len());
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Serving
//!
//! [`server::create_router`] builds the axum router (`POST /api/convert`,
//! `GET /health`, `GET /` in archive mode); [`server::serve`] binds it with
//! graceful shutdown.
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `pdf2img` binary (clap + anyhow + tracing-subscriber + indicatif) |
//!
//! Disable `cli` when using only the library:
//! ```toml
//! pdf2img = { version = "0.1", default-features = false }
//! ```

// ── Modules ──────────────────────────────────────────────────────────────

pub mod config;
pub mod convert;
pub mod error;
pub mod output;
pub mod pipeline;
pub mod progress;
pub mod server;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use config::{
    resolve_scale, ConversionConfig, ConversionConfigBuilder, OutputMode, ServerConfig,
    UploadStorage,
};
pub use convert::{convert_bytes, convert_bytes_blocking, convert_file, convert_to_file};
pub use error::ConvertError;
pub use output::{
    ConversionOutput, ConversionStats, InlineArrayBody, OutputPayload, PageSummary,
    ARCHIVE_FILENAME,
};
pub use pipeline::render::{PageSize, PageSource, PdfiumBackend, RenderBackend, Viewport};
pub use progress::{ConversionProgressCallback, NoopProgressCallback, ProgressCallback};
