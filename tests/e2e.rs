//! End-to-end tests against the real pdfium engine.
//!
//! These need a pdfium shared library, so they are gated behind the
//! `E2E_ENABLED` environment variable and skip when no library can be bound.
//!
//! Run with:
//!   E2E_ENABLED=1 PDFIUM_LIB_PATH=/path/to/lib cargo test --test e2e -- --nocapture

mod common;

use axum::http::{header, StatusCode};
use common::{body_bytes, body_json, pdf_upload, send};
use pdf2img::server::{create_router, AppState};
use pdf2img::{
    convert_bytes, ConversionConfig, OutputMode, OutputPayload, PdfiumBackend, RenderBackend,
    ServerConfig,
};
use std::io::{Cursor, Read};
use std::path::PathBuf;
use std::sync::Arc;

// ── Test helpers ─────────────────────────────────────────────────────────────

/// Skip unless E2E_ENABLED is set *and* pdfium can be bound.
macro_rules! e2e_skip_unless_ready {
    () => {{
        if std::env::var("E2E_ENABLED").is_err() {
            println!("SKIP: set E2E_ENABLED=1 to run e2e tests");
            return;
        }
        let backend = PdfiumBackend::new(std::env::var_os("PDFIUM_LIB_PATH").map(PathBuf::from));
        if let Err(e) = backend.probe() {
            println!("SKIP: pdfium unavailable: {e}");
            return;
        }
        Arc::new(backend) as Arc<dyn RenderBackend>
    }};
}

/// Build a minimal, valid PDF with one blank page per `(width, height)` in
/// points. Offsets in the xref table are computed, not hard-coded.
fn minimal_pdf(pages: &[(u32, u32)]) -> Vec<u8> {
    let mut objects: Vec<String> = Vec::new();
    let kids: Vec<String> = (0..pages.len())
        .map(|i| format!("{} 0 R", i + 3))
        .collect();

    objects.push("<< /Type /Catalog /Pages 2 0 R >>".to_string());
    objects.push(format!(
        "<< /Type /Pages /Kids [{}] /Count {} >>",
        kids.join(" "),
        pages.len()
    ));
    for (w, h) in pages {
        objects.push(format!(
            "<< /Type /Page /Parent 2 0 R /MediaBox [0 0 {w} {h}] /Resources << >> >>"
        ));
    }

    let mut pdf = b"%PDF-1.4\n".to_vec();
    let mut offsets = Vec::with_capacity(objects.len());
    for (i, body) in objects.iter().enumerate() {
        offsets.push(pdf.len());
        pdf.extend_from_slice(format!("{} 0 obj\n{}\nendobj\n", i + 1, body).as_bytes());
    }

    let xref_at = pdf.len();
    pdf.extend_from_slice(format!("xref\n0 {}\n", objects.len() + 1).as_bytes());
    pdf.extend_from_slice(b"0000000000 65535 f \n");
    for off in offsets {
        pdf.extend_from_slice(format!("{off:010} 00000 n \n").as_bytes());
    }
    pdf.extend_from_slice(
        format!(
            "trailer\n<< /Size {} /Root 1 0 R >>\nstartxref\n{}\n%%EOF\n",
            objects.len() + 1,
            xref_at
        )
        .as_bytes(),
    );
    pdf
}

const LETTER: (u32, u32) = (612, 792);
const A4: (u32, u32) = (595, 842);

fn archive_bytes(payload: OutputPayload) -> Vec<u8> {
    match payload {
        OutputPayload::Archive { bytes, .. } => bytes,
        other => panic!("expected archive, got {:?}", other.mode()),
    }
}

// ── Library ──────────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_letter_page_at_default_scale() {
    let backend = e2e_skip_unless_ready!();

    let output = convert_bytes(minimal_pdf(&[LETTER]), ConversionConfig::default(), backend)
        .await
        .expect("conversion should succeed");

    assert_eq!(output.image_count(), 1);
    assert_eq!((output.pages[0].width, output.pages[0].height), (918, 1188));
}

#[tokio::test]
async fn test_mixed_page_sizes() {
    let backend = e2e_skip_unless_ready!();
    let config = ConversionConfig::builder()
        .scale(1.0)
        .output_mode(OutputMode::InlineArray)
        .build()
        .unwrap();

    let output = convert_bytes(minimal_pdf(&[LETTER, A4, LETTER]), config, backend)
        .await
        .expect("conversion should succeed");

    let dims: Vec<(u32, u32)> = output.pages.iter().map(|p| (p.width, p.height)).collect();
    assert_eq!(dims, vec![(612, 792), (595, 842), (612, 792)]);

    match output.payload {
        OutputPayload::InlineArray { images } => assert_eq!(images.len(), 3),
        other => panic!("expected inline array, got {:?}", other.mode()),
    }
}

#[tokio::test]
async fn test_conversion_is_deterministic() {
    let backend = e2e_skip_unless_ready!();
    let pdf = minimal_pdf(&[A4, A4]);

    let first = convert_bytes(pdf.clone(), ConversionConfig::default(), Arc::clone(&backend))
        .await
        .unwrap();
    let second = convert_bytes(pdf, ConversionConfig::default(), backend)
        .await
        .unwrap();

    assert_eq!(first.pages, second.pages);
    assert_eq!(archive_bytes(first.payload), archive_bytes(second.payload));
}

#[tokio::test]
async fn test_corrupt_document_is_parse_error() {
    let backend = e2e_skip_unless_ready!();
    let mut pdf = b"%PDF-1.4\n".to_vec();
    pdf.extend_from_slice(&[0xAB; 512]);

    let err = convert_bytes(pdf, ConversionConfig::default(), backend)
        .await
        .unwrap_err();
    assert_eq!(err.kind(), "parse_error", "got: {err}");
}

// ── HTTP ─────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_http_archive_round_trip() {
    let backend = e2e_skip_unless_ready!();
    let app = create_router(AppState::new(ServerConfig::default(), backend));

    let response = send(app, pdf_upload(&minimal_pdf(&[LETTER, A4]))).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()[header::CONTENT_TYPE], "application/zip");

    let mut archive = zip::ZipArchive::new(Cursor::new(body_bytes(response).await)).unwrap();
    assert_eq!(archive.len(), 2);

    let mut png = Vec::new();
    archive
        .by_name("page_002.png")
        .unwrap()
        .read_to_end(&mut png)
        .unwrap();
    let img = image::load_from_memory(&png).unwrap();
    assert_eq!((img.width(), img.height()), (892, 1263));
}

#[tokio::test]
async fn test_http_corrupt_upload_is_500() {
    let backend = e2e_skip_unless_ready!();
    let app = create_router(AppState::new(ServerConfig::default(), backend));

    let response = send(app, pdf_upload(b"%PDF-1.4\ntruncated")).await;
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body_json(response).await["error"], "parse_error");
}
