//! Pipeline stages for PDF-to-image conversion.
//!
//! Each submodule implements exactly one transformation step, so each can be
//! tested on its own and the rendering engine can be swapped without
//! touching the other stages.
//!
//! ## Data Flow
//!
//! ```text
//! input ──▶ render ──▶ encode ──▶ package
//! (upload)  (pdfium)   (PNG)      (zip / data URLs)
//! ```
//!
//! 1. [`input`]: receive the upload (memory or spooled temp file) and
//!    reject bytes without a PDF header
//! 2. [`render`]: open the document and rasterise one page at a time;
//!    blocking, so it runs under `spawn_blocking`
//! 3. [`encode`]: PNG-encode each surface, optionally as a data URL
//! 4. [`package`]: append pages in order and finalise the payload once

pub mod encode;
pub mod input;
pub mod package;
pub mod render;
