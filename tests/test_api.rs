extern crate dent_detect;

use std::io::Cursor;
use std::path::{Path, PathBuf};
use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use axum::Router;
use serde_json::Value;
use tempfile::TempDir;
use tower::ServiceExt;
use dent_detect::detection_runners::{MockDetector, Predictor, Segment};
use dent_detect::{DentDetection, InferenceError};
use dent_detect::server::{create_router, AnalyzeResponse, AppState};
use dent_detect::Settings;

const BOUNDARY: &str = "dent-detect-test-boundary";

struct TestApp {
    router: Router,
    upload_dir: PathBuf,
    _scratch: TempDir,
}

#[derive(Debug)]
struct FailingSegmenter;

impl Segment for FailingSegmenter {
    fn segment(&self, image_path: &Path, _: f32, _: f32) -> Result<Vec<DentDetection>, InferenceError> {
        assert!(image_path.exists(), "scratch file missing during inference");
        Err(InferenceError::OutputShape("no prediction tensor".to_string()))
    }
}

fn failing_predictor(strict: bool) -> Predictor {
    Predictor::Onnx {
        segmenter: Box::new(FailingSegmenter),
        conf_threshold: 0.25,
        iou_threshold: 0.45,
        strict,
    }
}

fn test_app(max_file_size: u64) -> TestApp {
    test_app_with(max_file_size, Predictor::Mock(MockDetector::with_seed(11)))
}

fn test_app_with(max_file_size: u64, predictor: Predictor) -> TestApp {
    let scratch = TempDir::new().unwrap();
    let upload_dir = scratch.path().join("uploads");
    let settings = Settings {
        upload_dir: upload_dir.clone(),
        max_file_size,
        ..Settings::default()
    };

    TestApp {
        router: create_router(AppState::new(settings, predictor)),
        upload_dir,
        _scratch: scratch,
    }
}

fn png_bytes(width: u32, height: u32) -> Vec<u8> {
    let image = image::RgbImage::from_fn(width, height, |x, y| image::Rgb([x as u8, y as u8, 128]));
    let mut buf = Cursor::new(Vec::new());
    image.write_to(&mut buf, image::ImageFormat::Png).unwrap();
    buf.into_inner()
}

fn multipart_request(field: &str, file_name: &str, content_type: &str, data: &[u8]) -> Request<Body> {
    let mut body = Vec::new();
    body.extend_from_slice(format!("--{}\r\n", BOUNDARY).as_bytes());
    body.extend_from_slice(
        format!("Content-Disposition: form-data; name=\"{}\"; filename=\"{}\"\r\n", field, file_name).as_bytes(),
    );
    body.extend_from_slice(format!("Content-Type: {}\r\n\r\n", content_type).as_bytes());
    body.extend_from_slice(data);
    body.extend_from_slice(format!("\r\n--{}--\r\n", BOUNDARY).as_bytes());

    Request::builder()
        .method("POST")
        .uri("/api/analyze")
        .header(header::CONTENT_TYPE, format!("multipart/form-data; boundary={}", BOUNDARY))
        .body(Body::from(body))
        .unwrap()
}

async fn send(router: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = router.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, serde_json::from_slice(&bytes).unwrap())
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

fn assert_no_scratch_files(dir: &Path) {
    if let Ok(entries) = std::fs::read_dir(dir) {
        let left: Vec<_> = entries.map(|e| e.unwrap().path()).collect();
        assert!(left.is_empty(), "scratch files left behind: {:?}", left);
    }
}

#[tokio::test]
async fn health_reports_predictor() {
    let app = test_app(1024 * 1024);
    let (status, body) = send(&app.router, get("/api/health")).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["predictor"], "mock");
}

#[tokio::test]
async fn classes_are_the_fixed_table() {
    let app = test_app(1024 * 1024);
    let (status, body) = send(&app.router, get("/api/classes")).await;

    assert_eq!(status, StatusCode::OK);
    let classes = body.as_object().unwrap();
    assert_eq!(classes.len(), 9);
    assert_eq!(body["0"], "Abrasion");
    assert_eq!(body["3"], "Caries Class 1");
    assert_eq!(body["8"], "Caries Class 6");
}

#[tokio::test]
async fn root_lists_endpoints() {
    let app = test_app(1024 * 1024);
    let (status, body) = send(&app.router, get("/")).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "running");
    assert_eq!(body["endpoints"]["analyze"], "/api/analyze");
}

#[tokio::test]
async fn analyze_valid_image_with_mock() {
    let app = test_app(1024 * 1024);
    let request = multipart_request("file", "molar.png", "image/png", &png_bytes(64, 48));
    let (status, body) = send(&app.router, request).await;

    assert_eq!(status, StatusCode::OK, "{}", body);
    let response: AnalyzeResponse = serde_json::from_value(body).unwrap();
    assert!(response.success);
    assert_eq!(response.image_name, "molar.png");
    assert!((1..=5).contains(&response.predictions.len()));
    for det in &response.predictions {
        assert!(det.class_id <= 8);
        assert!(det.polygon.len() >= 6 && det.polygon.len() % 2 == 0);
        assert!(det.polygon.iter().all(|v| (0.0..=1.0).contains(v)));
        assert!(det.bbox.w >= 0.0 && det.bbox.h >= 0.0);
    }

    assert_no_scratch_files(&app.upload_dir);
}

#[tokio::test]
async fn analyze_rejects_non_image() {
    let app = test_app(1024 * 1024);
    let request = multipart_request("file", "notes.txt", "text/plain", b"not an image");
    let (status, body) = send(&app.router, request).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["detail"], "File must be an image");
    assert_no_scratch_files(&app.upload_dir);
}

#[tokio::test]
async fn analyze_rejects_oversized_upload() {
    let app = test_app(1024);
    let request = multipart_request("file", "big.png", "image/png", &vec![0u8; 4096]);
    let (status, body) = send(&app.router, request).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    let detail = body["detail"].as_str().unwrap();
    assert!(detail.starts_with("File size exceeds maximum allowed size of"), "{}", detail);
    assert!(detail.contains("0.0009765625MB"), "{}", detail);
    assert_no_scratch_files(&app.upload_dir);
}

#[tokio::test]
async fn analyze_rejects_corrupt_image() {
    let app = test_app(1024 * 1024);
    let request = multipart_request("file", "broken.png", "image/png", b"\x89PNG\r\n\x1a\ngarbage");
    let (status, body) = send(&app.router, request).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["detail"], "Invalid image file");
    assert_no_scratch_files(&app.upload_dir);
}

#[tokio::test]
async fn analyze_requires_file_field() {
    let app = test_app(1024 * 1024);
    let request = multipart_request("attachment", "molar.png", "image/png", &png_bytes(8, 8));
    let (status, body) = send(&app.router, request).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["detail"], "No file uploaded");
    assert_no_scratch_files(&app.upload_dir);
}

#[tokio::test]
async fn client_file_name_never_becomes_a_path() {
    let app = test_app(1024 * 1024);
    let request = multipart_request("file", "../../escape.png", "image/png", &png_bytes(16, 16));
    let (status, body) = send(&app.router, request).await;

    assert_eq!(status, StatusCode::OK, "{}", body);
    assert_eq!(body["image_name"], "../../escape.png");
    assert!(!app.upload_dir.join("../../escape.png").exists());
    assert_no_scratch_files(&app.upload_dir);
}

#[tokio::test]
async fn scratch_dir_stays_empty_across_requests() {
    let app = test_app(2048);
    let requests = vec![
        multipart_request("file", "a.png", "image/png", &png_bytes(12, 12)),
        multipart_request("file", "b.txt", "text/plain", b"plain"),
        multipart_request("file", "c.png", "image/png", b"corrupt"),
        multipart_request("file", "d.png", "image/png", &vec![1u8; 8192]),
    ];
    for request in requests {
        send(&app.router, request).await;
        assert_no_scratch_files(&app.upload_dir);
    }
}

#[tokio::test]
async fn strict_inference_failure_is_a_server_error() {
    let app = test_app_with(1024 * 1024, failing_predictor(true));
    let request = multipart_request("file", "molar.png", "image/png", &png_bytes(16, 16));
    let (status, body) = send(&app.router, request).await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    let detail = body["detail"].as_str().unwrap();
    assert!(detail.starts_with("Analysis failed: "), "{}", detail);
    assert_no_scratch_files(&app.upload_dir);
}

#[tokio::test]
async fn lenient_inference_failure_returns_no_predictions() {
    let app = test_app_with(1024 * 1024, failing_predictor(false));
    let request = multipart_request("file", "molar.png", "image/png", &png_bytes(16, 16));
    let (status, body) = send(&app.router, request).await;

    assert_eq!(status, StatusCode::OK, "{}", body);
    assert_eq!(body["success"], true);
    assert_eq!(body["predictions"].as_array().unwrap().len(), 0);
    assert_no_scratch_files(&app.upload_dir);
}

#[tokio::test]
async fn non_multipart_body_gets_json_detail() {
    let app = test_app(1024 * 1024);
    let request = Request::builder()
        .method("POST")
        .uri("/api/analyze")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from("{}"))
        .unwrap();
    let (status, body) = send(&app.router, request).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["detail"].as_str().unwrap().starts_with("Expected a multipart form upload"), "{}", body);
}
