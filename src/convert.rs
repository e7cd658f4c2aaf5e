//! Conversion entry points: PDF bytes in, packaged PNG pages out.
//!
//! ## Why sequential?
//!
//! Pages are rendered one at a time, in ascending order, and each surface is
//! dropped as soon as its PNG exists. Peak memory is therefore one raster
//! surface plus the output accumulated so far, regardless of page count.
//!
//! Any page failure aborts the whole conversion. The packager is only
//! finalised after the last page succeeded, so callers never see a partial
//! archive or a short image array.

use crate::config::ConversionConfig;
use crate::error::ConvertError;
use crate::output::{ConversionOutput, ConversionStats, PageSummary};
use crate::pipeline::package::{packager_for, OutputPackager};
use crate::pipeline::render::{PageSource, RenderBackend, Viewport};
use crate::pipeline::{encode, input};
use crate::progress::ConversionProgressCallback;
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

/// Convert PDF bytes on tokio's blocking pool.
///
/// This is the entry point the HTTP server uses. `config.scale` is used as
/// given; resolve caller input with [`crate::config::resolve_scale`] first.
///
/// # Example
/// ```rust,no_run
/// use pdf2img::{convert_bytes, ConversionConfig, PdfiumBackend, RenderBackend};
/// use std::sync::Arc;
///
/// # #[tokio::main]
/// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let backend: Arc<dyn RenderBackend> = Arc::new(PdfiumBackend::new(None));
/// let bytes = std::fs::read("document.pdf")?;
/// let output = convert_bytes(bytes, ConversionConfig::default(), backend).await?;
/// println!("{} pages", output.image_count());
/// # Ok(())
/// # }
/// ```
pub async fn convert_bytes(
    bytes: Vec<u8>,
    config: ConversionConfig,
    backend: Arc<dyn RenderBackend>,
) -> Result<ConversionOutput, ConvertError> {
    tokio::task::spawn_blocking(move || convert_bytes_blocking(&bytes, &config, backend.as_ref()))
        .await
        .map_err(|e| ConvertError::Internal(format!("conversion task failed: {e}")))?
}

/// Read a local PDF and convert it.
pub async fn convert_file(
    path: impl AsRef<Path>,
    config: &ConversionConfig,
    backend: Arc<dyn RenderBackend>,
) -> Result<ConversionOutput, ConvertError> {
    let file = input::read_local(path.as_ref()).await?;
    convert_bytes(file.bytes, config.clone(), backend).await
}

/// Convert a local PDF and write the payload to `output_path`.
///
/// Archive mode writes the zip; inline mode writes the JSON response body.
/// Uses atomic write (temp file + rename) so a failed run leaves no partial
/// file behind.
pub async fn convert_to_file(
    input_path: impl AsRef<Path>,
    output_path: impl AsRef<Path>,
    config: &ConversionConfig,
    backend: Arc<dyn RenderBackend>,
) -> Result<ConversionStats, ConvertError> {
    let output = convert_file(input_path, config, backend).await?;
    let path = output_path.as_ref();

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent).await?;
    }

    let bytes = output.payload.into_file_bytes()?;
    let tmp_path = path.with_extension("tmp");
    tokio::fs::write(&tmp_path, &bytes).await?;
    tokio::fs::rename(&tmp_path, path).await?;

    info!("Wrote {} ({} bytes)", path.display(), bytes.len());
    Ok(output.stats)
}

/// Convert PDF bytes on the current thread.
///
/// Blocks for the whole conversion; call it from `spawn_blocking` or a
/// plain thread, never directly on an async executor.
pub fn convert_bytes_blocking(
    bytes: &[u8],
    config: &ConversionConfig,
    backend: &dyn RenderBackend,
) -> Result<ConversionOutput, ConvertError> {
    let total_start = Instant::now();
    info!(
        "Starting conversion: {} bytes, scale {}, {} output",
        bytes.len(),
        config.scale,
        config.output_mode
    );

    input::check_pdf_header(bytes)?;

    let mut packager = packager_for(config.output_mode);
    let mut pages: Vec<PageSummary> = Vec::new();
    let mut render_duration_ms = 0u64;

    backend.with_document(bytes, &mut |doc| {
        let render_start = Instant::now();
        let result = render_pages(doc, config, packager.as_mut(), &mut pages);
        render_duration_ms = render_start.elapsed().as_millis() as u64;
        result
    })?;

    let payload = packager.finish()?;

    let stats = ConversionStats {
        total_pages: pages.len(),
        scale: config.scale,
        total_png_bytes: pages.iter().map(|p| p.png_bytes).sum(),
        render_duration_ms,
        total_duration_ms: total_start.elapsed().as_millis() as u64,
    };

    info!(
        "Conversion complete: {} pages, {} PNG bytes, {}ms total",
        stats.total_pages, stats.total_png_bytes, stats.total_duration_ms
    );

    if let Some(cb) = config.progress_callback.as_deref() {
        cb.on_conversion_complete(stats.total_pages);
    }

    Ok(ConversionOutput {
        payload,
        pages,
        stats,
    })
}

// ── Internal helpers ─────────────────────────────────────────────────────

/// Render every page in ascending order, stopping at the first failure.
fn render_pages(
    doc: &dyn PageSource,
    config: &ConversionConfig,
    packager: &mut dyn OutputPackager,
    pages: &mut Vec<PageSummary>,
) -> Result<(), ConvertError> {
    let total_pages = doc.page_count();
    let cb: Option<&dyn ConversionProgressCallback> = config.progress_callback.as_deref();

    if total_pages == 0 {
        info!("Document has no pages; producing empty output");
    }
    if let Some(cb) = cb {
        cb.on_conversion_start(total_pages);
    }

    for index in 0..total_pages {
        let page_num = index + 1;
        if let Some(cb) = cb {
            cb.on_page_start(page_num, total_pages);
        }

        let result = render_page(doc, index, config.scale)
            .and_then(|(summary, png)| packager.push(page_num, png).map(|_| summary));

        match result {
            Ok(summary) => {
                if let Some(cb) = cb {
                    cb.on_page_complete(page_num, total_pages, summary.png_bytes);
                }
                pages.push(summary);
            }
            Err(e) => {
                warn!("Page {}/{} failed: {}", page_num, total_pages, e);
                if let Some(cb) = cb {
                    cb.on_page_error(page_num, total_pages, &e.to_string());
                }
                return Err(e);
            }
        }
    }

    Ok(())
}

/// Rasterise and PNG-encode one page. The raster surface is released before
/// returning.
fn render_page(
    doc: &dyn PageSource,
    index: usize,
    scale: f32,
) -> Result<(PageSummary, Vec<u8>), ConvertError> {
    let page_num = index + 1;
    let size = doc.page_size(index)?;
    let viewport = Viewport::for_page(size, scale);

    let surface = doc.render(index, viewport)?;
    let png = encode::encode_png(&surface).map_err(|e| ConvertError::Encode {
        page: page_num,
        detail: e.to_string(),
    })?;

    let summary = PageSummary {
        page_num,
        width: surface.width(),
        height: surface.height(),
        png_bytes: png.len(),
    };
    drop(surface);

    debug!(
        "Page {}: {}x{} pt → {}x{} px, {} bytes PNG",
        page_num, size.width, size.height, summary.width, summary.height, summary.png_bytes
    );
    Ok((summary, png))
}
