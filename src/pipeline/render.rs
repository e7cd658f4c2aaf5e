//! PDF rasterisation: open a document and render pages into pixel surfaces.
//!
//! The engine sits behind [`RenderBackend`] so the pipeline, the HTTP layer
//! and the tests do not care which library draws the pixels. The production
//! backend is [`PdfiumBackend`].
//!
//! ## Why a scoped `with_document`?
//!
//! A pdfium `PdfDocument` borrows both the bound library and the source
//! bytes, so it cannot be handed back to the caller. The backend instead
//! opens the document, lends it to a closure as a [`PageSource`], and tears
//! everything down when the closure returns, on success and failure alike.

use crate::error::ConvertError;
use image::DynamicImage;
use pdfium_render::prelude::*;
use std::path::PathBuf;
use std::sync::{Mutex, PoisonError};
use tracing::{debug, info};

/// Intrinsic page size in PDF points (1/72 inch).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PageSize {
    pub width: f32,
    pub height: f32,
}

/// Pixel dimensions of the surface a page is rendered into.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Viewport {
    pub width: u32,
    pub height: u32,
}

impl Viewport {
    /// Scale a page's intrinsic size into whole pixels.
    ///
    /// Each dimension is `floor(points × scale)`, never less than one pixel.
    pub fn for_page(size: PageSize, scale: f32) -> Self {
        Self {
            width: scaled_dimension(size.width, scale),
            height: scaled_dimension(size.height, scale),
        }
    }
}

fn scaled_dimension(points: f32, scale: f32) -> u32 {
    // The epsilon absorbs f32 representation error in decimal scales
    // (0.7f32 is 0.69999998…), so 100pt × 0.7 lands on 70, not 69.
    let px = (points as f64 * scale as f64 + 1e-4).floor();
    if px.is_finite() && px >= 1.0 {
        px.min(u32::MAX as f64) as u32
    } else {
        1
    }
}

/// An open document as seen by the pipeline. Indices are 0-based.
pub trait PageSource {
    /// Number of pages; may be zero.
    fn page_count(&self) -> usize;

    /// Intrinsic size of the page at `index`.
    fn page_size(&self, index: usize) -> Result<PageSize, ConvertError>;

    /// Render the page at `index` into a freshly allocated surface of
    /// exactly `viewport` pixels. The caller owns and drops the surface.
    fn render(&self, index: usize, viewport: Viewport) -> Result<DynamicImage, ConvertError>;
}

/// A document engine able to open raw bytes as a [`PageSource`].
///
/// Implementations are blocking and are called from tokio's blocking pool.
pub trait RenderBackend: Send + Sync {
    /// Short engine name for logs and `/health`.
    fn name(&self) -> &'static str;

    /// Open `bytes` and run `f` against the document.
    ///
    /// Fails with [`ConvertError::Parse`] when the bytes are not a readable
    /// document; errors returned by `f` are passed through unchanged.
    fn with_document(
        &self,
        bytes: &[u8],
        f: &mut dyn FnMut(&dyn PageSource) -> Result<(), ConvertError>,
    ) -> Result<(), ConvertError>;
}

// ── pdfium ───────────────────────────────────────────────────────────────

/// Production backend built on `pdfium-render`.
///
/// The library is bound per document rather than held for the process
/// lifetime. pdfium keeps global state, so documents are opened one at a
/// time behind `lock`.
pub struct PdfiumBackend {
    lib_path: Option<PathBuf>,
    lock: Mutex<()>,
}

impl PdfiumBackend {
    /// `lib_path` may name the library file or the directory holding it.
    /// `None` searches the working directory, then the system library path.
    pub fn new(lib_path: Option<PathBuf>) -> Self {
        Self {
            lib_path,
            lock: Mutex::new(()),
        }
    }

    /// Bind once and drop again; lets the server fail fast at startup when
    /// no library can be found.
    pub fn probe(&self) -> Result<(), ConvertError> {
        let _guard = self.lock.lock().unwrap_or_else(PoisonError::into_inner);
        self.bind().map(|_| ())
    }

    fn bind(&self) -> Result<Pdfium, ConvertError> {
        let bindings = match &self.lib_path {
            Some(path) if path.is_dir() => {
                Pdfium::bind_to_library(Pdfium::pdfium_platform_library_name_at_path(path))
            }
            Some(path) => Pdfium::bind_to_library(path),
            None => Pdfium::bind_to_library(Pdfium::pdfium_platform_library_name_at_path("./"))
                .or_else(|_| Pdfium::bind_to_system_library()),
        }
        .map_err(|e| ConvertError::EngineUnavailable(format!("{:?}", e)))?;

        Ok(Pdfium::new(bindings))
    }
}

impl RenderBackend for PdfiumBackend {
    fn name(&self) -> &'static str {
        "pdfium"
    }

    fn with_document(
        &self,
        bytes: &[u8],
        f: &mut dyn FnMut(&dyn PageSource) -> Result<(), ConvertError>,
    ) -> Result<(), ConvertError> {
        let _guard = self.lock.lock().unwrap_or_else(PoisonError::into_inner);
        let pdfium = self.bind()?;

        let document = pdfium.load_pdf_from_byte_slice(bytes, None).map_err(|e| {
            let err_str = format!("{:?}", e);
            let detail = if err_str.contains("Password") || err_str.contains("password") {
                "document is encrypted and requires a password".to_string()
            } else {
                err_str
            };
            ConvertError::Parse { detail }
        })?;

        let pages = PdfiumPages {
            document: &document,
        };
        info!("PDF loaded: {} pages", pages.page_count());

        f(&pages)
    }
}

struct PdfiumPages<'doc, 'lib> {
    document: &'doc PdfDocument<'lib>,
}

impl<'lib> PdfiumPages<'_, 'lib> {
    fn page(&self, index: usize) -> Result<PdfPage<'lib>, ConvertError> {
        let idx = u16::try_from(index).map_err(|_| ConvertError::Render {
            page: index + 1,
            detail: "page index exceeds pdfium's page range".to_string(),
        })?;

        self.document
            .pages()
            .get(idx)
            .map_err(|e| ConvertError::Render {
                page: index + 1,
                detail: format!("{:?}", e),
            })
    }
}

impl PageSource for PdfiumPages<'_, '_> {
    fn page_count(&self) -> usize {
        self.document.pages().len() as usize
    }

    fn page_size(&self, index: usize) -> Result<PageSize, ConvertError> {
        let page = self.page(index)?;
        Ok(PageSize {
            width: page.width().value,
            height: page.height().value,
        })
    }

    fn render(&self, index: usize, viewport: Viewport) -> Result<DynamicImage, ConvertError> {
        let page = self.page(index)?;

        let render_config = PdfRenderConfig::new()
            .set_target_width(viewport.width as i32)
            .set_target_height(viewport.height as i32);

        let bitmap = page
            .render_with_config(&render_config)
            .map_err(|e| ConvertError::Render {
                page: index + 1,
                detail: format!("{:?}", e),
            })?;

        let image = bitmap.as_image();
        // Release pdfium's bitmap before handing the copy back.
        drop(bitmap);

        debug!(
            "Rendered page {} → {}x{} px",
            index + 1,
            image.width(),
            image.height()
        );
        Ok(image)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const LETTER: PageSize = PageSize {
        width: 612.0,
        height: 792.0,
    };

    #[test]
    fn viewport_scales_linearly() {
        assert_eq!(
            Viewport::for_page(LETTER, 1.0),
            Viewport {
                width: 612,
                height: 792
            }
        );
        assert_eq!(
            Viewport::for_page(LETTER, 1.5),
            Viewport {
                width: 918,
                height: 1188
            }
        );
        assert_eq!(
            Viewport::for_page(LETTER, 2.0),
            Viewport {
                width: 1224,
                height: 1584
            }
        );
    }

    #[test]
    fn viewport_floors_fractional_pixels() {
        let a4 = PageSize {
            width: 595.0,
            height: 842.0,
        };
        assert_eq!(
            Viewport::for_page(a4, 1.5),
            Viewport {
                width: 892,
                height: 1263
            }
        );
    }

    #[test]
    fn viewport_tolerates_decimal_scales() {
        let square = PageSize {
            width: 100.0,
            height: 100.0,
        };
        assert_eq!(Viewport::for_page(square, 0.7).width, 70);
        assert_eq!(Viewport::for_page(square, 0.3).height, 30);
    }

    #[test]
    fn viewport_never_collapses_to_zero() {
        let sliver = PageSize {
            width: 0.2,
            height: 792.0,
        };
        let v = Viewport::for_page(sliver, 1.0);
        assert_eq!(v.width, 1);
        assert_eq!(v.height, 792);
    }

    #[test]
    fn missing_library_is_engine_unavailable() {
        let backend = PdfiumBackend::new(Some(PathBuf::from(
            "/definitely/not/a/real/libpdfium.so",
        )));
        let err = backend.probe().unwrap_err();
        assert!(matches!(err, ConvertError::EngineUnavailable(_)), "got: {err}");
    }
}
