//! Shared helpers for the integration tests: an in-memory render backend and
//! a multipart body builder.

#![allow(dead_code)]

use axum::body::{to_bytes, Body};
use axum::http::{Request, Response};
use axum::Router;
use image::{DynamicImage, Rgba, RgbaImage};
use pdf2img::server::{create_router, AppState};
use pdf2img::{ConvertError, PageSize, PageSource, RenderBackend, ServerConfig, Viewport};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tower::ServiceExt;

pub const BOUNDARY: &str = "PDF2IMG-TEST-BOUNDARY";

/// Build a fake document understood by [`FakeBackend`].
///
/// `%PDF-fake pages=3 size=100x200 fail=2` describes three 100×200 pt pages
/// where page 2 fails to render.
pub fn fake_pdf(pages: usize, width: u32, height: u32) -> Vec<u8> {
    format!("%PDF-fake pages={pages} size={width}x{height}").into_bytes()
}

pub fn fake_pdf_failing_on(pages: usize, fail_page: usize) -> Vec<u8> {
    format!("%PDF-fake pages={pages} size=100x100 fail={fail_page}").into_bytes()
}

/// Bytes with a PDF header that the fake engine refuses to open.
pub fn corrupt_pdf() -> Vec<u8> {
    b"%PDF-1.7\ncorrupt xref table".to_vec()
}

#[derive(Debug, Clone, PartialEq)]
struct FakeDocSpec {
    pages: usize,
    size: PageSize,
    fail_page: Option<usize>,
}

fn parse_spec(bytes: &[u8]) -> Option<FakeDocSpec> {
    let text = std::str::from_utf8(bytes).ok()?;
    let rest = text.strip_prefix("%PDF-fake")?;

    let mut spec = FakeDocSpec {
        pages: 1,
        size: PageSize {
            width: 100.0,
            height: 100.0,
        },
        fail_page: None,
    };
    for token in rest.split_whitespace() {
        let (key, value) = token.split_once('=')?;
        match key {
            "pages" => spec.pages = value.parse().ok()?,
            "size" => {
                let (w, h) = value.split_once('x')?;
                spec.size = PageSize {
                    width: w.parse().ok()?,
                    height: h.parse().ok()?,
                };
            }
            "fail" => spec.fail_page = Some(value.parse().ok()?),
            _ => return None,
        }
    }
    Some(spec)
}

/// Render backend that draws solid-colour pages described by the document
/// bytes. Records every open and every rendered viewport.
#[derive(Default)]
pub struct FakeBackend {
    pub opens: AtomicUsize,
    pub rendered: Mutex<Vec<(usize, Viewport)>>,
}

impl FakeBackend {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn open_count(&self) -> usize {
        self.opens.load(Ordering::SeqCst)
    }

    pub fn viewports(&self) -> Vec<Viewport> {
        self.rendered
            .lock()
            .unwrap()
            .iter()
            .map(|(_, v)| *v)
            .collect()
    }
}

struct FakeDoc<'a> {
    spec: FakeDocSpec,
    backend: &'a FakeBackend,
}

impl PageSource for FakeDoc<'_> {
    fn page_count(&self) -> usize {
        self.spec.pages
    }

    fn page_size(&self, _index: usize) -> Result<PageSize, ConvertError> {
        Ok(self.spec.size)
    }

    fn render(&self, index: usize, viewport: Viewport) -> Result<DynamicImage, ConvertError> {
        let page_num = index + 1;
        if self.spec.fail_page == Some(page_num) {
            return Err(ConvertError::Render {
                page: page_num,
                detail: "fake engine failure".into(),
            });
        }
        self.backend.rendered.lock().unwrap().push((index, viewport));
        let shade = (page_num * 37 % 256) as u8;
        Ok(DynamicImage::ImageRgba8(RgbaImage::from_pixel(
            viewport.width,
            viewport.height,
            Rgba([shade, 255 - shade, 128, 255]),
        )))
    }
}

impl RenderBackend for FakeBackend {
    fn name(&self) -> &'static str {
        "fake"
    }

    fn with_document(
        &self,
        bytes: &[u8],
        f: &mut dyn FnMut(&dyn PageSource) -> Result<(), ConvertError>,
    ) -> Result<(), ConvertError> {
        self.opens.fetch_add(1, Ordering::SeqCst);
        let spec = parse_spec(bytes).ok_or_else(|| ConvertError::Parse {
            detail: "fake engine cannot read this document".into(),
        })?;
        f(&FakeDoc {
            spec,
            backend: self,
        })
    }
}

// ── HTTP helpers ─────────────────────────────────────────────────────────────

pub enum Part<'a> {
    File {
        name: &'a str,
        filename: &'a str,
        bytes: &'a [u8],
    },
    Text {
        name: &'a str,
        value: &'a str,
    },
}

pub fn multipart_body(parts: &[Part<'_>]) -> Vec<u8> {
    let mut body = Vec::new();
    for part in parts {
        body.extend_from_slice(format!("--{BOUNDARY}\r\n").as_bytes());
        match part {
            Part::File {
                name,
                filename,
                bytes,
            } => {
                body.extend_from_slice(
                    format!(
                        "Content-Disposition: form-data; name=\"{name}\"; filename=\"{filename}\"\r\n\
                         Content-Type: application/pdf\r\n\r\n"
                    )
                    .as_bytes(),
                );
                body.extend_from_slice(bytes);
            }
            Part::Text { name, value } => {
                body.extend_from_slice(
                    format!("Content-Disposition: form-data; name=\"{name}\"\r\n\r\n{value}")
                        .as_bytes(),
                );
            }
        }
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());
    body
}

pub fn convert_request(parts: &[Part<'_>]) -> Request<Body> {
    let body = multipart_body(parts);
    Request::builder()
        .method("POST")
        .uri("/api/convert")
        .header(
            "content-type",
            format!("multipart/form-data; boundary={BOUNDARY}"),
        )
        .header("content-length", body.len())
        .body(Body::from(body))
        .expect("Failed to build request")
}

pub fn pdf_upload(bytes: &[u8]) -> Request<Body> {
    convert_request(&[Part::File {
        name: "pdfFile",
        filename: "doc.pdf",
        bytes,
    }])
}

pub fn router(config: ServerConfig, backend: Arc<FakeBackend>) -> Router {
    create_router(AppState::new(config, backend))
}

pub async fn send(router: Router, request: Request<Body>) -> Response<Body> {
    router.oneshot(request).await.expect("Request failed")
}

pub async fn body_bytes(response: Response<Body>) -> Vec<u8> {
    to_bytes(response.into_body(), 64 * 1024 * 1024)
        .await
        .expect("Failed to read body")
        .to_vec()
}

pub async fn body_json(response: Response<Body>) -> serde_json::Value {
    serde_json::from_slice(&body_bytes(response).await).expect("Response JSON parse failed")
}
