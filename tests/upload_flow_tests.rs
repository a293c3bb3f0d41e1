// End-to-end upload flow against a live server instance

use opencv::core::{Mat, Scalar, Vector, CV_8UC3};
use opencv::prelude::*;
use roadwatch_core::AppConfig;
use roadwatch_eye::{Detection, Detector, InstanceMask, VisionError};
use roadwatch_server::http::{create_router, ApiState};
use roadwatch_server::metrics::Metrics;
use std::sync::Arc;

/// Fixed-output stand-in for the ONNX model
struct StubDetector {
    names: Vec<String>,
}

impl StubDetector {
    fn new() -> Self {
        Self {
            names: vec!["pothole".to_string()],
        }
    }
}

impl Detector for StubDetector {
    fn class_names(&self) -> &[String] {
        &self.names
    }

    fn input_size(&self) -> i32 {
        640
    }

    fn predict(&self, frame: &Mat) -> Result<Vec<Detection>, VisionError> {
        let mut data = vec![0u8; 16 * 16];
        for y in 6..10 {
            for x in 6..10 {
                data[y * 16 + x] = 1;
            }
        }
        let mask = InstanceMask::new(16, 16, data)?;

        let width = frame.cols() as f32;
        let height = frame.rows() as f32;
        Ok(vec![Detection {
            class_id: 0,
            class_name: "pothole".to_string(),
            confidence: 0.9,
            bbox: (width * 0.375, height * 0.375, width * 0.25, height * 0.25),
            mask,
        }])
    }
}

fn png_bytes() -> Vec<u8> {
    let frame = Mat::new_rows_cols_with_default(120, 200, CV_8UC3, Scalar::all(90.0)).unwrap();
    let mut buf = Vector::<u8>::new();
    opencv::imgcodecs::imencode(".png", &frame, &mut buf, &Vector::new()).unwrap();
    buf.to_vec()
}

async fn spawn_server(dir: &std::path::Path) -> (std::net::SocketAddr, AppConfig) {
    let mut config = AppConfig::default();
    config.paths.upload_dir = dir.join("uploads").to_string_lossy().to_string();
    config.paths.output_dir = dir.join("outputs").to_string_lossy().to_string();
    tokio::fs::create_dir_all(&config.paths.upload_dir).await.unwrap();
    tokio::fs::create_dir_all(&config.paths.output_dir).await.unwrap();

    let state = ApiState {
        config: Arc::new(config.clone()),
        detector: Arc::new(StubDetector::new()),
        metrics: Arc::new(Metrics::new()),
        started_at: chrono::Utc::now(),
    };
    let app = create_router(state);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    (addr, config)
}

#[tokio::test]
async fn test_full_image_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let (addr, config) = spawn_server(dir.path()).await;
    let client = reqwest::Client::new();

    let part = reqwest::multipart::Part::bytes(png_bytes())
        .file_name("road.png")
        .mime_str("image/png")
        .unwrap();
    let form = reqwest::multipart::Form::new().part("file", part);

    let response = client
        .post(format!("http://{}/upload", addr))
        .multipart(form)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), reqwest::StatusCode::OK);

    let json: serde_json::Value = response.json().await.unwrap();
    assert_eq!(json["success"], true);
    assert_eq!(json["file_type"], "image");
    let output_file = json["output_file"].as_str().unwrap().to_string();

    let stored = std::path::Path::new(&config.paths.output_dir).join(&output_file);
    assert!(stored.exists());

    let download = client
        .get(format!("http://{}/download/{}", addr, output_file))
        .send()
        .await
        .unwrap();
    assert_eq!(download.status(), reqwest::StatusCode::OK);
    assert_eq!(download.headers()["content-type"], "image/png");

    let bytes = download.bytes().await.unwrap();
    assert_eq!(bytes.len() as u64, std::fs::metadata(&stored).unwrap().len());
}

#[tokio::test]
async fn test_missing_file_part_over_the_wire() {
    let dir = tempfile::tempdir().unwrap();
    let (addr, _config) = spawn_server(dir.path()).await;
    let client = reqwest::Client::new();

    let form = reqwest::multipart::Form::new().text("note", "hello");
    let response = client
        .post(format!("http://{}/upload", addr))
        .multipart(form)
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), reqwest::StatusCode::BAD_REQUEST);
    let json: serde_json::Value = response.json().await.unwrap();
    assert_eq!(json["error"], "No file part");
}

#[tokio::test]
async fn test_health_over_the_wire() {
    let dir = tempfile::tempdir().unwrap();
    let (addr, _config) = spawn_server(dir.path()).await;
    let client = reqwest::Client::new();

    let response = client
        .get(format!("http://{}/health", addr))
        .send()
        .await
        .unwrap();

    assert!(response.status().is_success());
    let json: serde_json::Value = response.json().await.unwrap();
    assert_eq!(json["status"], "healthy");
}
