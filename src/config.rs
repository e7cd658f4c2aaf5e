//! Configuration types for PDF-to-image conversion and the HTTP server.
//!
//! [`ConversionConfig`] controls the pipeline itself (scale, packaging
//! strategy, progress reporting) and is built via its
//! [`ConversionConfigBuilder`]. [`ServerConfig`] wraps it with everything the
//! HTTP transport needs: bind address, upload handling and the pdfium
//! library location.

use crate::error::ConvertError;
use crate::progress::ProgressCallback;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

/// Scale applied when the caller sends no usable `scale` value.
pub const DEFAULT_SCALE: f32 = 1.5;

/// Upper bound on the render scale. A 10× render of an A4 page is already
/// ~5950 × 8420 px.
pub const DEFAULT_MAX_SCALE: f32 = 10.0;

/// Multipart field carrying the uploaded document.
pub const DEFAULT_FILE_FIELD: &str = "pdfFile";

/// Default request body limit: 100 MB.
pub const DEFAULT_MAX_UPLOAD_BYTES: usize = 100 * 1024 * 1024;

/// Configuration for a single PDF-to-image conversion.
///
/// # Example
/// ```rust
/// use pdf2img::{ConversionConfig, OutputMode};
///
/// let config = ConversionConfig::builder()
///     .scale(2.0)
///     .output_mode(OutputMode::InlineArray)
///     .build()
///     .unwrap();
/// assert_eq!(config.scale, 2.0);
/// ```
#[derive(Clone)]
pub struct ConversionConfig {
    /// Render scale relative to the page's intrinsic size in PDF points
    /// (1.0 = 72 DPI). Default: 1.5.
    pub scale: f32,

    /// Largest scale accepted; larger requests are clamped. Default: 10.0.
    pub max_scale: f32,

    /// How rendered pages are packaged. Default: [`OutputMode::Archive`].
    pub output_mode: OutputMode,

    /// Optional per-page progress events.
    pub progress_callback: Option<ProgressCallback>,
}

impl Default for ConversionConfig {
    fn default() -> Self {
        Self {
            scale: DEFAULT_SCALE,
            max_scale: DEFAULT_MAX_SCALE,
            output_mode: OutputMode::default(),
            progress_callback: None,
        }
    }
}

impl fmt::Debug for ConversionConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConversionConfig")
            .field("scale", &self.scale)
            .field("max_scale", &self.max_scale)
            .field("output_mode", &self.output_mode)
            .field(
                "progress_callback",
                &self
                    .progress_callback
                    .as_ref()
                    .map(|_| "<dyn ConversionProgressCallback>"),
            )
            .finish()
    }
}

impl ConversionConfig {
    /// Create a new builder for `ConversionConfig`.
    pub fn builder() -> ConversionConfigBuilder {
        ConversionConfigBuilder {
            config: Self::default(),
        }
    }

    /// Copy of this config rendering at `scale` (already resolved by
    /// [`resolve_scale`]).
    pub fn with_scale(&self, scale: f32) -> Self {
        Self {
            scale,
            ..self.clone()
        }
    }
}

/// Builder for [`ConversionConfig`].
#[derive(Debug)]
pub struct ConversionConfigBuilder {
    config: ConversionConfig,
}

impl ConversionConfigBuilder {
    pub fn scale(mut self, scale: f32) -> Self {
        self.config.scale = scale;
        self
    }

    pub fn max_scale(mut self, max: f32) -> Self {
        self.config.max_scale = max;
        self
    }

    pub fn output_mode(mut self, mode: OutputMode) -> Self {
        self.config.output_mode = mode;
        self
    }

    pub fn progress_callback(mut self, cb: ProgressCallback) -> Self {
        self.config.progress_callback = Some(cb);
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<ConversionConfig, ConvertError> {
        let c = &self.config;
        if !c.max_scale.is_finite() || c.max_scale <= 0.0 {
            return Err(ConvertError::InvalidConfig(format!(
                "max scale must be a positive number, got {}",
                c.max_scale
            )));
        }
        if !c.scale.is_finite() || c.scale <= 0.0 {
            return Err(ConvertError::InvalidConfig(format!(
                "scale must be a positive number, got {}",
                c.scale
            )));
        }
        if c.scale > c.max_scale {
            return Err(ConvertError::InvalidConfig(format!(
                "scale {} exceeds max scale {}",
                c.scale, c.max_scale
            )));
        }
        Ok(self.config)
    }
}

/// Interpret a caller-supplied scale value.
///
/// Only the longest leading decimal number is read, so `"2px"` and `"2,5"`
/// both mean `2`. Missing, unparsable, non-finite, zero and negative values
/// fall back to `default` without error; values above `max` are clamped to
/// `max`.
pub fn resolve_scale(raw: Option<&str>, default: f32, max: f32) -> f32 {
    match raw.and_then(|s| leading_number(s.trim()).parse::<f32>().ok()) {
        Some(v) if v.is_finite() && v > 0.0 => v.min(max),
        _ => default,
    }
}

/// The longest prefix of `s` shaped like `[+-]digits[.digits][e[+-]digits]`.
/// Returns `""` when `s` does not start with a number.
fn leading_number(s: &str) -> &str {
    let b = s.as_bytes();
    let digits_from = |mut i: usize| {
        while b.get(i).is_some_and(u8::is_ascii_digit) {
            i += 1;
        }
        i
    };

    let mut end = usize::from(matches!(b.first(), Some(b'+' | b'-')));
    let int_end = digits_from(end);
    let mut seen_digit = int_end > end;
    end = int_end;

    if b.get(end) == Some(&b'.') {
        let frac_end = digits_from(end + 1);
        if seen_digit || frac_end > end + 1 {
            seen_digit = true;
            end = frac_end;
        }
    }
    if !seen_digit {
        return "";
    }

    if matches!(b.get(end), Some(b'e' | b'E')) {
        let sign = usize::from(matches!(b.get(end + 1), Some(b'+' | b'-')));
        let exp_end = digits_from(end + 1 + sign);
        if exp_end > end + 1 + sign {
            end = exp_end;
        }
    }
    &s[..end]
}

// ── Enums ────────────────────────────────────────────────────────────────

/// How the rendered pages are returned to the caller.
///
/// Chosen once per deployment, never per request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutputMode {
    /// One zip archive with a `page_NNN.png` entry per page. (default)
    #[default]
    Archive,
    /// A JSON array of `data:image/png;base64,…` strings in page order.
    InlineArray,
}

impl OutputMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            OutputMode::Archive => "archive",
            OutputMode::InlineArray => "inline_array",
        }
    }
}

impl fmt::Display for OutputMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Where an upload is held while it is being read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UploadStorage {
    /// Buffer the file field in memory. (default)
    #[default]
    Memory,
    /// Spool the file field to a temporary file, deleted once read.
    Disk,
}

// ── Server ───────────────────────────────────────────────────────────────

/// Everything the HTTP transport needs.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Defaults applied to every request (scale, packaging).
    pub conversion: ConversionConfig,
    /// Multipart field name carrying the document.
    pub file_field: String,
    pub upload_storage: UploadStorage,
    /// Directory for disk-spooled uploads; `None` uses the system temp dir.
    pub upload_dir: Option<PathBuf>,
    /// Request body limit in bytes.
    pub max_upload_bytes: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3001,
            conversion: ConversionConfig::default(),
            file_field: DEFAULT_FILE_FIELD.to_string(),
            upload_storage: UploadStorage::default(),
            upload_dir: None,
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
        }
    }
}
