//! Result types returned by a successful conversion.

use crate::config::OutputMode;
use crate::error::ConvertError;
use serde::{Deserialize, Serialize};

/// Filename advertised in the archive download's `Content-Disposition`.
pub const ARCHIVE_FILENAME: &str = "converted_images.zip";

/// Everything a successful conversion produced.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversionOutput {
    /// The packaged images, shaped by the configured [`OutputMode`].
    pub payload: OutputPayload,
    /// One summary per page, in page order.
    pub pages: Vec<PageSummary>,
    pub stats: ConversionStats,
}

impl ConversionOutput {
    /// Number of images in the payload. Always equals the page count.
    pub fn image_count(&self) -> usize {
        self.pages.len()
    }
}

/// Packaged output, one variant per [`OutputMode`].
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum OutputPayload {
    /// A finalised zip archive holding `page_001.png`, `page_002.png`, …
    Archive {
        #[serde(skip)]
        bytes: Vec<u8>,
        entries: Vec<String>,
    },
    /// Base64 PNG data URLs, index 0 = page 1.
    InlineArray { images: Vec<String> },
}

impl OutputPayload {
    pub fn mode(&self) -> OutputMode {
        match self {
            OutputPayload::Archive { .. } => OutputMode::Archive,
            OutputPayload::InlineArray { .. } => OutputMode::InlineArray,
        }
    }

    /// Bytes to store on disk: the zip itself, or the same JSON body the
    /// server sends in inline mode.
    pub fn into_file_bytes(self) -> Result<Vec<u8>, ConvertError> {
        match self {
            OutputPayload::Archive { bytes, .. } => Ok(bytes),
            OutputPayload::InlineArray { images } => {
                serde_json::to_vec_pretty(&InlineArrayBody::new(images))
                    .map_err(|e| ConvertError::Internal(format!("serialise images: {e}")))
            }
        }
    }
}

/// JSON body of a successful inline-mode response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InlineArrayBody {
    pub success: bool,
    pub images: Vec<String>,
}

impl InlineArrayBody {
    pub fn new(images: Vec<String>) -> Self {
        Self {
            success: true,
            images,
        }
    }
}

/// Pixel dimensions and encoded size of one rendered page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageSummary {
    /// 1-indexed page number.
    pub page_num: usize,
    pub width: u32,
    pub height: u32,
    /// Size of the PNG before any base64 or zip wrapping.
    pub png_bytes: usize,
}

/// Timing and volume figures for one conversion.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ConversionStats {
    pub total_pages: usize,
    pub scale: f32,
    /// Sum of PNG sizes across all pages.
    pub total_png_bytes: usize,
    pub render_duration_ms: u64,
    pub total_duration_ms: u64,
}

/// Archive entry name for a 1-indexed page: `page_001.png`.
pub fn archive_entry_name(page_num: usize) -> String {
    format!("page_{:03}.png", page_num)
}
