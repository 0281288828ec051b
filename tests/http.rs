//! HTTP-level tests for the router.
//!
//! The rasteriser and OCR engine are replaced with in-process fakes, so these
//! run without pdfium or tesseract installed. Requests go through the full
//! router (CORS, body limit, multipart parsing) via `tower::ServiceExt`.

use async_trait::async_trait;
use axum::body::{to_bytes, Body};
use axum::http::{header, Method, Request, StatusCode};
use axum::Router;
use image::DynamicImage;
use pdf_ocr_server::{
    router, AppState, BoundingBox, CorsPolicy, OcrEngine, OcrError, PdfOcrError, Rasteriser,
    ServerConfig, TextBlock,
};
use serde_json::Value;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tempfile::TempDir;
use tower::ServiceExt;

const BOUNDARY: &str = "----pdf-ocr-test-boundary";

// ── Fakes ────────────────────────────────────────────────────────────────────

/// Yields `pages` blank images for any input starting with `%PDF`.
struct FakeRasteriser {
    pages: usize,
    calls: AtomicUsize,
}

impl FakeRasteriser {
    fn new(pages: usize) -> Arc<Self> {
        Arc::new(Self {
            pages,
            calls: AtomicUsize::new(0),
        })
    }
}

impl Rasteriser for FakeRasteriser {
    fn rasterise(&self, pdf: &[u8], _dpi: u32) -> Result<Vec<DynamicImage>, PdfOcrError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if !pdf.starts_with(b"%PDF") {
            return Err(PdfOcrError::CorruptPdf {
                detail: "missing %PDF header".into(),
            });
        }
        if self.pages == 0 {
            return Err(PdfOcrError::EmptyDocument);
        }
        Ok((0..self.pages).map(|_| DynamicImage::new_rgb8(16, 16)).collect())
    }
}

/// Returns `blocks` blocks per page and fails on page `fail_on`.
struct FakeEngine {
    blocks: usize,
    fail_on: Option<usize>,
    calls: AtomicUsize,
}

impl FakeEngine {
    fn new(blocks: usize, fail_on: Option<usize>) -> Arc<Self> {
        Arc::new(Self {
            blocks,
            fail_on,
            calls: AtomicUsize::new(0),
        })
    }
}

#[async_trait]
impl OcrEngine for FakeEngine {
    fn name(&self) -> &'static str {
        "fake"
    }

    async fn is_available(&self) -> bool {
        true
    }

    async fn recognize(&self, image_path: &Path) -> Result<Vec<TextBlock>, OcrError> {
        let page = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        assert!(image_path.exists());
        if self.fail_on == Some(page) {
            return Err(OcrError::Failed {
                status: "exit status: 1".into(),
                stderr: "engine crashed".into(),
            });
        }
        Ok((1..=self.blocks as u32)
            .map(|i| TextBlock {
                block_num: i,
                text: format!("block {i}"),
                lines: vec![format!("block {i}")],
                confidence: 91.5,
                bbox: BoundingBox {
                    left: 10,
                    top: 10 * i,
                    width: 100,
                    height: 8,
                },
            })
            .collect())
    }
}

// ── Helpers ──────────────────────────────────────────────────────────────────

struct Harness {
    app: Router,
    rasteriser: Arc<FakeRasteriser>,
    engine: Arc<FakeEngine>,
    temp: TempDir,
}

fn harness(pages: usize, blocks: usize, fail_on: Option<usize>) -> Harness {
    harness_with(pages, blocks, fail_on, |b| b)
}

fn harness_with(
    pages: usize,
    blocks: usize,
    fail_on: Option<usize>,
    customise: impl FnOnce(pdf_ocr_server::ServerConfigBuilder) -> pdf_ocr_server::ServerConfigBuilder,
) -> Harness {
    let temp = TempDir::new().unwrap();
    let config = customise(ServerConfig::builder().temp_dir(temp.path()))
        .build()
        .unwrap();
    let rasteriser = FakeRasteriser::new(pages);
    let engine = FakeEngine::new(blocks, fail_on);
    let app = router(AppState::new(config, rasteriser.clone(), engine.clone()));
    Harness {
        app,
        rasteriser,
        engine,
        temp,
    }
}

fn multipart_body(field: &str, filename: Option<&str>, content: &[u8]) -> Vec<u8> {
    let mut body = Vec::new();
    body.extend_from_slice(format!("--{BOUNDARY}\r\n").as_bytes());
    match filename {
        Some(f) => body.extend_from_slice(
            format!("Content-Disposition: form-data; name=\"{field}\"; filename=\"{f}\"\r\n")
                .as_bytes(),
        ),
        None => body.extend_from_slice(
            format!("Content-Disposition: form-data; name=\"{field}\"\r\n").as_bytes(),
        ),
    }
    body.extend_from_slice(b"Content-Type: application/pdf\r\n\r\n");
    body.extend_from_slice(content);
    body.extend_from_slice(format!("\r\n--{BOUNDARY}--\r\n").as_bytes());
    body
}

fn upload_request(field: &str, filename: Option<&str>, content: &[u8]) -> Request<Body> {
    Request::builder()
        .method(Method::POST)
        .uri("/upload-pdf/")
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={BOUNDARY}"),
        )
        .body(Body::from(multipart_body(field, filename, content)))
        .unwrap()
}

async fn send(app: &Router, req: Request<Body>) -> (StatusCode, Value) {
    let response = app.clone().oneshot(req).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let json = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, json)
}

fn temp_entries(dir: &Path) -> Vec<String> {
    let mut names: Vec<String> = std::fs::read_dir(dir)
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().to_string())
        .collect();
    names.sort();
    names
}

const FAKE_PDF: &[u8] = b"%PDF-1.4\n%fake\n";

// ── Tests ────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn root_reports_working() {
    let h = harness(1, 0, None);
    let req = Request::builder().uri("/").body(Body::empty()).unwrap();
    let (status, json) = send(&h.app, req).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json, serde_json::json!({"message": "Server is working!"}));
}

#[tokio::test]
async fn non_pdf_filename_is_rejected_without_work() {
    for name in ["notes.txt", "scan.PDF", "report.pdf.bak", "noextension"] {
        let h = harness(1, 1, None);
        let (status, json) = send(&h.app, upload_request("file", Some(name), FAKE_PDF)).await;

        assert_eq!(status, StatusCode::BAD_REQUEST, "filename {name}");
        assert_eq!(json["message"], "Please upload a PDF file.");
        assert_eq!(h.rasteriser.calls.load(Ordering::SeqCst), 0);
        assert_eq!(h.engine.calls.load(Ordering::SeqCst), 0);
    }
}

#[tokio::test]
async fn missing_file_field_is_rejected() {
    let h = harness(1, 1, None);
    let (status, json) = send(&h.app, upload_request("document", Some("a.pdf"), FAKE_PDF)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["message"], "Please upload a PDF file.");
}

#[tokio::test]
async fn missing_filename_is_rejected() {
    let h = harness(1, 1, None);
    let (status, _) = send(&h.app, upload_request("file", None, FAKE_PDF)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(h.rasteriser.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn n_pages_yield_n_labelled_results() {
    let h = harness(4, 2, None);
    let (status, json) = send(&h.app, upload_request("file", Some("doc.pdf"), FAKE_PDF)).await;

    assert_eq!(status, StatusCode::OK, "body: {json}");
    let results = json["results"].as_array().unwrap();
    assert_eq!(results.len(), 4);
    for (i, page) in results.iter().enumerate() {
        let obj = page.as_object().unwrap();
        assert_eq!(obj.len(), 1);
        let blocks = obj[&format!("page_{}", i + 1)].as_array().unwrap();
        assert_eq!(blocks.len(), 2);
        assert_eq!(blocks[0]["text"], "block 1");
        assert_eq!(blocks[1]["bbox"]["top"], 20);
    }
}

#[tokio::test]
async fn blank_single_page_has_empty_block_list() {
    let h = harness(1, 0, None);
    let (status, json) = send(&h.app, upload_request("file", Some("blank.pdf"), FAKE_PDF)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json, serde_json::json!({"results": [{"page_1": []}]}));
}

#[tokio::test]
async fn no_temp_files_survive_success() {
    let h = harness(3, 1, None);
    let before = temp_entries(h.temp.path());

    let (status, _) = send(&h.app, upload_request("file", Some("doc.pdf"), FAKE_PDF)).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(temp_entries(h.temp.path()), before);
}

#[tokio::test]
async fn corrupt_pdf_is_processing_error() {
    let h = harness(1, 1, None);
    let (status, json) = send(&h.app, upload_request("file", Some("bad.pdf"), b"")).await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    let msg = json["message"].as_str().unwrap();
    assert!(msg.starts_with("An error occurred during processing: "), "got: {msg}");
    assert!(msg.contains("corrupt"), "got: {msg}");
    assert_eq!(h.engine.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn zero_page_document_is_processing_error() {
    let h = harness(0, 1, None);
    let (status, json) = send(&h.app, upload_request("file", Some("empty.pdf"), FAKE_PDF)).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert!(json["message"].as_str().unwrap().contains("no pages"));
}

#[tokio::test]
async fn ocr_failure_on_page_two_fails_whole_request() {
    let h = harness(3, 1, Some(2));
    let before = temp_entries(h.temp.path());

    let (status, json) = send(&h.app, upload_request("file", Some("doc.pdf"), FAKE_PDF)).await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert!(json.get("results").is_none(), "no partial results: {json}");
    let msg = json["message"].as_str().unwrap();
    assert!(msg.contains("page 2"), "got: {msg}");
    assert_eq!(h.engine.calls.load(Ordering::SeqCst), 2);
    assert_eq!(temp_entries(h.temp.path()), before);
}

#[tokio::test]
async fn hidden_error_detail_returns_generic_message() {
    let h = harness_with(2, 1, Some(1), |b| b.expose_error_detail(false));
    let (status, json) = send(&h.app, upload_request("file", Some("doc.pdf"), FAKE_PDF)).await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(json["message"], "An error occurred during processing.");
}

#[tokio::test]
async fn same_upload_twice_is_structurally_identical() {
    let h = harness(2, 3, None);
    let (_, first) = send(&h.app, upload_request("file", Some("doc.pdf"), FAKE_PDF)).await;
    let (_, second) = send(&h.app, upload_request("file", Some("doc.pdf"), FAKE_PDF)).await;

    let shape = |v: &Value| -> Vec<usize> {
        v["results"]
            .as_array()
            .unwrap()
            .iter()
            .map(|p| p.as_object().unwrap().values().next().unwrap().as_array().unwrap().len())
            .collect()
    };
    assert_eq!(shape(&first), vec![3, 3]);
    assert_eq!(shape(&first), shape(&second));
}

#[tokio::test]
async fn upload_over_body_limit_is_refused() {
    let h = harness_with(1, 1, None, |b| b.max_upload_bytes(64));
    let big = vec![b'x'; 4096];
    let (status, json) = send(&h.app, upload_request("file", Some("big.pdf"), &big)).await;

    assert_eq!(status, StatusCode::PAYLOAD_TOO_LARGE);
    assert_eq!(json["message"], "Upload exceeds the maximum size of 64 bytes.");
    assert_eq!(h.engine.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn non_multipart_body_gets_json_400() {
    let cases: [(Option<&str>, &[u8]); 3] = [
        (Some("application/pdf"), FAKE_PDF),
        (None, FAKE_PDF),
        (Some("multipart/form-data"), b"--x\r\n"),
    ];

    for (content_type, body) in cases {
        let h = harness(1, 1, None);
        let mut req = Request::builder().method(Method::POST).uri("/upload-pdf/");
        if let Some(ct) = content_type {
            req = req.header(header::CONTENT_TYPE, ct);
        }
        let response = h
            .app
            .clone()
            .oneshot(req.body(Body::from(body.to_vec())).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST, "{content_type:?}");
        assert_eq!(
            response.headers()[header::CONTENT_TYPE],
            "application/json",
            "{content_type:?}"
        );
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let json: Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(json, serde_json::json!({"message": "Please upload a PDF file."}));
        assert_eq!(h.rasteriser.calls.load(Ordering::SeqCst), 0);
    }
}

#[tokio::test]
async fn permissive_cors_mirrors_origin_with_credentials() {
    let h = harness(1, 0, None);
    let req = Request::builder()
        .uri("/")
        .header(header::ORIGIN, "https://anywhere.example")
        .body(Body::empty())
        .unwrap();
    let response = h.app.clone().oneshot(req).await.unwrap();

    let headers = response.headers();
    assert_eq!(
        headers[header::ACCESS_CONTROL_ALLOW_ORIGIN],
        "https://anywhere.example"
    );
    assert_eq!(headers[header::ACCESS_CONTROL_ALLOW_CREDENTIALS], "true");
}

#[tokio::test]
async fn allow_list_cors_rejects_unlisted_origin() {
    let h = harness_with(1, 0, None, |b| {
        b.cors(CorsPolicy::AllowList(vec!["https://app.example.org".into()]))
    });

    let listed = Request::builder()
        .uri("/")
        .header(header::ORIGIN, "https://app.example.org")
        .body(Body::empty())
        .unwrap();
    let response = h.app.clone().oneshot(listed).await.unwrap();
    assert_eq!(
        response.headers()[header::ACCESS_CONTROL_ALLOW_ORIGIN],
        "https://app.example.org"
    );

    let unlisted = Request::builder()
        .uri("/")
        .header(header::ORIGIN, "https://evil.example")
        .body(Body::empty())
        .unwrap();
    let response = h.app.clone().oneshot(unlisted).await.unwrap();
    assert!(response
        .headers()
        .get(header::ACCESS_CONTROL_ALLOW_ORIGIN)
        .is_none());
}
