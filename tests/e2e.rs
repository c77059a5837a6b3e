//! End-to-end integration tests for edgequake-pdfocr.
//!
//! These tests use real PDF files in `./test_cases/` and run them through
//! pdfium and a local tesseract install. They are gated behind the
//! `E2E_ENABLED` environment variable so they do not run in CI unless
//! explicitly requested.
//!
//! Run with:
//!   E2E_ENABLED=1 LD_LIBRARY_PATH=. cargo test --test e2e -- --nocapture
//!
//! To restrict to a specific test:
//!   E2E_ENABLED=1 LD_LIBRARY_PATH=. cargo test --test e2e test_inspect -- --nocapture

use edgequake_pdfocr::{
    convert, convert_to_file, inspect, OcrConfig, PageSelection, RequestHandler, ResponseBody,
    TesseractEngine, TextPayload, UploadField,
};
use std::path::PathBuf;

// ── Test helpers ─────────────────────────────────────────────────────────────

fn test_cases_dir() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("test_cases")
}

fn output_dir() -> PathBuf {
    let d = PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("test_cases/output");
    std::fs::create_dir_all(&d).ok();
    d
}

/// Skip this test if E2E_ENABLED is not set *or* no PDF file at `path`.
macro_rules! e2e_skip_unless_ready {
    ($path:expr) => {{
        if std::env::var("E2E_ENABLED").is_err() {
            println!("SKIP — set E2E_ENABLED=1 to run e2e tests");
            return;
        }
        let p: PathBuf = $path;
        if !p.exists() {
            println!("SKIP — test file not found: {}", p.display());
            println!("       Place sample scans in test_cases/");
            return;
        }
        p
    }};
}

/// Skip this test when tesseract cannot be run.
macro_rules! skip_without_tesseract {
    () => {{
        match TesseractEngine::default().version() {
            Some(v) => println!("Using {v}"),
            None => {
                println!("SKIP — tesseract not found on PATH");
                return;
            }
        }
    }};
}

/// Fast config for e2e runs: 300 DPI keeps tesseract under a few seconds a page.
fn fast_config() -> OcrConfig {
    OcrConfig::builder()
        .dpi(300)
        .pages(PageSelection::Range(1, 2))
        .build()
        .expect("valid config")
}

fn assert_text_quality(text: &str, context: &str) {
    assert!(!text.trim().is_empty(), "[{context}] OCR text is empty");
    assert!(
        !text.contains('\u{000C}'),
        "[{context}] form feed should be stripped"
    );
    assert!(
        !text.contains("\n\n\n\n"),
        "[{context}] more than 3 consecutive newlines"
    );
    assert!(
        text.lines().all(|l| l == l.trim_end()),
        "[{context}] trailing whitespace left on a line"
    );
    println!("[{context}] ✓  {} chars", text.chars().count());
}

// ── Inspect tests (no OCR, instant) ──────────────────────────────────────────

#[tokio::test]
async fn test_inspect_marathi_scan() {
    let path = e2e_skip_unless_ready!(test_cases_dir().join("marathi_scan.pdf"));

    let meta = inspect(path).await.expect("inspect() should succeed");

    assert!(meta.page_count >= 1);
    assert!(!meta.pdf_version.is_empty());
    println!("Metadata: {:?}", meta);
}

#[tokio::test]
async fn test_inspect_nonexistent() {
    if std::env::var("E2E_ENABLED").is_err() {
        println!("SKIP — set E2E_ENABLED=1 to run e2e tests");
        return;
    }
    let err = inspect("/tmp/does_not_exist_pdfocr.pdf")
        .await
        .expect_err("inspect() should fail for a missing file");
    assert_eq!(err.status_code(), 400);
}

// ── OCR tests ────────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_convert_marathi_scan() {
    let path = e2e_skip_unless_ready!(test_cases_dir().join("marathi_scan.pdf"));
    skip_without_tesseract!();

    let output = convert(path, &fast_config())
        .await
        .expect("convert() should succeed");

    assert_eq!(output.texts.len(), output.report.stats.total_pages);
    assert_eq!(output.report.stats.failed_pages, 0);
    let merged = output.merged_text();
    assert_text_quality(&merged, "marathi_scan");

    let has_devanagari = merged
        .chars()
        .any(|c| ('\u{0900}'..='\u{097F}').contains(&c));
    assert!(has_devanagari, "expected Devanagari characters in output");
}

#[tokio::test]
async fn test_convert_to_file_regenerates_output() {
    let path = e2e_skip_unless_ready!(test_cases_dir().join("marathi_scan.pdf"));
    skip_without_tesseract!();

    let out = output_dir().join("marathi_scan.txt");
    let images = output_dir().join("marathi_scan_images");
    let config = OcrConfig::builder()
        .dpi(300)
        .pages(PageSelection::Single(1))
        .images_dir(&images)
        .build()
        .expect("valid config");

    convert_to_file(path.clone(), &out, &config).await.expect("first run");
    let first = std::fs::read_to_string(&out).expect("output written");
    convert_to_file(path.clone(), &out, &config).await.expect("second run");
    let second = std::fs::read_to_string(&out).expect("output written");

    assert!(first.starts_with("Image 1 - Full Page:\n"));
    assert!(first.ends_with("\n\n"));
    assert_eq!(first, second, "rerun must regenerate, not append");
    assert!(images.join("page_1.png").exists());
}

#[tokio::test]
async fn test_handler_merge_pages() {
    let path = e2e_skip_unless_ready!(test_cases_dir().join("marathi_scan.pdf"));
    skip_without_tesseract!();

    let bytes = std::fs::read(&path).expect("read pdf");
    let field = UploadField::new("file", bytes).with_filename("marathi_scan.pdf");

    let mut config = fast_config();
    let handler = RequestHandler::new(config.clone()).unwrap();
    let pages = handler.handle(std::slice::from_ref(&field)).await;
    assert_eq!(pages.status, 200);

    config.merge_pages = true;
    let handler = RequestHandler::new(config).unwrap();
    let merged = handler.handle(&[field]).await;
    assert_eq!(merged.status, 200);

    match (pages.body, merged.body) {
        (
            ResponseBody::Text(TextPayload::Pages { texts }),
            ResponseBody::Text(TextPayload::Merged { text }),
        ) => assert_eq!(texts.join("\n"), text),
        other => panic!("unexpected bodies: {other:?}"),
    }
}

#[tokio::test]
async fn test_corrupt_pdf_is_a_server_error() {
    if std::env::var("E2E_ENABLED").is_err() {
        println!("SKIP — set E2E_ENABLED=1 to run e2e tests");
        return;
    }
    let handler = RequestHandler::new(OcrConfig::default()).unwrap();
    let resp = handler
        .handle(&[UploadField::new("file", b"%PDF-1.4\ngarbage".to_vec())])
        .await;
    assert_eq!(resp.status, 500);
}
