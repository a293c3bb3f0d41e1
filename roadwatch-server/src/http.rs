// HTTP server with upload, download and model info routes

use axum::{
    body::{Body, Bytes},
    extract::{DefaultBodyLimit, Multipart, Path, State},
    http::{Response, StatusCode},
    response::{IntoResponse, Json},
    routing::{get, post},
    Router,
};
use roadwatch_core::{AppConfig, MediaKind, StoredUpload};
use roadwatch_eye::{process_image, process_video, Detector};
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Instant;
use tower_http::cors::CorsLayer;
use tracing::{error, info};

// API state
#[derive(Clone)]
pub struct ApiState {
    pub config: Arc<AppConfig>,
    pub detector: Arc<dyn Detector>,
    pub metrics: Arc<crate::metrics::Metrics>,
    pub started_at: chrono::DateTime<chrono::Utc>,
}

// Response types
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

#[derive(Debug, Serialize)]
pub struct UploadResponse {
    pub success: bool,
    pub message: String,
    pub output_file: String,
    pub file_type: String,
}

#[derive(Debug, Serialize)]
pub struct ModelInfoResponse {
    pub model_name: String,
    pub model_path: String,
    pub class_names: BTreeMap<String, String>,
    pub model_type: String,
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub uptime_seconds: i64,
}

/// Create HTTP router with all routes
pub fn create_router(state: ApiState) -> Router {
    let max_upload = state.config.limits.max_upload_bytes;

    Router::new()
        // Embedded UI
        .route("/", get(crate::static_files::index_handler))
        .route("/static/style.css", get(crate::static_files::style_handler))
        .route("/static/script.js", get(crate::static_files::script_handler))
        // Media pipeline
        .route("/upload", post(upload_handler))
        .route("/download/:filename", get(download_handler))
        .route("/model-info", get(model_info_handler))
        // Service endpoints
        .route("/health", get(health_handler))
        .route("/metrics", get(metrics_handler))
        .fallback(not_found_handler)
        .layer(DefaultBodyLimit::max(max_upload))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Accept one media upload, run detection on it and store the annotated result
async fn upload_handler(
    State(state): State<ApiState>,
    mut multipart: Multipart,
) -> impl IntoResponse {
    let mut upload: Option<(String, Bytes)> = None;

    loop {
        let field = match multipart.next_field().await {
            Ok(Some(field)) => field,
            Ok(None) => break,
            Err(e) => {
                let response = Json(ErrorResponse {
                    error: format!("Malformed upload: {}", e),
                });
                return (StatusCode::BAD_REQUEST, response).into_response();
            }
        };

        if field.name() != Some("file") {
            continue;
        }

        let original = field.file_name().unwrap_or_default().to_string();
        let data = match field.bytes().await {
            Ok(data) => data,
            Err(e) => {
                let response = Json(ErrorResponse {
                    error: format!("Upload failed: {}", e),
                });
                return (StatusCode::BAD_REQUEST, response).into_response();
            }
        };

        upload = Some((original, data));
        break;
    }

    let (original, data) = match upload {
        Some(parts) => parts,
        None => {
            let response = Json(ErrorResponse {
                error: "No file part".to_string(),
            });
            return (StatusCode::BAD_REQUEST, response).into_response();
        }
    };

    if original.is_empty() {
        let response = Json(ErrorResponse {
            error: "No selected file".to_string(),
        });
        return (StatusCode::BAD_REQUEST, response).into_response();
    }

    let stored = match StoredUpload::for_original(&original) {
        Ok(stored) => stored,
        Err(_) => {
            let response = Json(ErrorResponse {
                error: "Invalid file type".to_string(),
            });
            return (StatusCode::BAD_REQUEST, response).into_response();
        }
    };

    let upload_path =
        std::path::Path::new(&state.config.paths.upload_dir).join(&stored.upload_name);
    let output_path =
        std::path::Path::new(&state.config.paths.output_dir).join(&stored.output_name);

    if let Err(e) = tokio::fs::write(&upload_path, &data).await {
        error!("Failed to store upload {}: {}", stored.upload_name, e);
        let response = Json(ErrorResponse {
            error: format!("Could not save upload: {}", e),
        });
        return (StatusCode::INTERNAL_SERVER_ERROR, response).into_response();
    }

    info!(
        "Stored {} upload {} ({} bytes)",
        stored.kind.as_str(),
        stored.upload_name,
        data.len()
    );
    state.metrics.record_upload().await;

    // Decoding and inference are synchronous and can take a while for video,
    // so they run off the async workers.
    let detector = state.detector.clone();
    let processing = state.config.processing.clone();
    let kind = stored.kind;
    let in_path = upload_path.to_string_lossy().to_string();
    let out_path = output_path.to_string_lossy().to_string();
    let started = Instant::now();

    let outcome = tokio::task::spawn_blocking(move || match kind {
        MediaKind::Image => {
            process_image(detector.as_ref(), &in_path, &out_path, &processing).map(|s| s.detections)
        }
        MediaKind::Video => {
            process_video(detector.as_ref(), &in_path, &out_path, &processing).map(|s| s.detections)
        }
    })
    .await;

    let duration_ms = started.elapsed().as_secs_f64() * 1000.0;

    let detections = match outcome {
        Ok(Ok(detections)) => detections,
        Ok(Err(e)) => {
            state.metrics.record_failure().await;
            error!("Processing failed for {}: {}", stored.upload_name, e);
            let response = Json(ErrorResponse {
                error: e.to_string(),
            });
            return (StatusCode::INTERNAL_SERVER_ERROR, response).into_response();
        }
        Err(e) => {
            state.metrics.record_failure().await;
            error!("Processing task failed for {}: {}", stored.upload_name, e);
            let response = Json(ErrorResponse {
                error: "Processing failed unexpectedly".to_string(),
            });
            return (StatusCode::INTERNAL_SERVER_ERROR, response).into_response();
        }
    };

    match stored.kind {
        MediaKind::Image => state.metrics.record_image(duration_ms).await,
        MediaKind::Video => state.metrics.record_video(duration_ms).await,
    }

    info!(
        "Processed {} into {} ({} detections, {:.1} ms)",
        stored.upload_name, stored.output_name, detections, duration_ms
    );

    let message = match stored.kind {
        MediaKind::Image => "Image processed successfully",
        MediaKind::Video => "Video processed successfully",
    };

    Json(UploadResponse {
        success: true,
        message: message.to_string(),
        output_file: stored.output_name.clone(),
        file_type: stored.kind.as_str().to_string(),
    })
    .into_response()
}

/// Stream a processed file back as a download attachment
async fn download_handler(
    State(state): State<ApiState>,
    Path(filename): Path<String>,
) -> impl IntoResponse {
    // Only bare output names are valid here
    if filename.contains("..") || filename.contains('/') || filename.contains('\\') {
        let response = Json(ErrorResponse {
            error: "Invalid path".to_string(),
        });
        return (StatusCode::BAD_REQUEST, response).into_response();
    }

    let path = std::path::Path::new(&state.config.paths.output_dir).join(&filename);
    let bytes = match tokio::fs::read(&path).await {
        Ok(bytes) => bytes,
        Err(_) => {
            let response = Json(ErrorResponse {
                error: format!("File not found: {}", filename),
            });
            return (StatusCode::NOT_FOUND, response).into_response();
        }
    };

    match Response::builder()
        .status(StatusCode::OK)
        .header("content-type", content_type_for(&filename))
        .header(
            "content-disposition",
            format!("attachment; filename=\"{}\"", filename),
        )
        .body(Body::from(bytes))
    {
        Ok(response) => response,
        Err(e) => {
            error!("Failed to build download response: {}", e);
            let response = Json(ErrorResponse {
                error: "Internal server error".to_string(),
            });
            (StatusCode::INTERNAL_SERVER_ERROR, response).into_response()
        }
    }
}

/// Describe the loaded model
async fn model_info_handler(State(state): State<ApiState>) -> impl IntoResponse {
    let class_names: BTreeMap<String, String> = state
        .detector
        .class_names()
        .iter()
        .enumerate()
        .map(|(id, name)| (id.to_string(), name.clone()))
        .collect();

    Json(ModelInfoResponse {
        model_name: "YOLOv8 Pothole Detection".to_string(),
        model_path: state.config.model.path.clone(),
        class_names,
        model_type: "Instance Segmentation".to_string(),
    })
}

/// Health check endpoint
async fn health_handler(State(state): State<ApiState>) -> impl IntoResponse {
    let uptime = chrono::Utc::now().signed_duration_since(state.started_at);
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_seconds: uptime.num_seconds(),
    })
}

/// Metrics endpoint (Prometheus format)
async fn metrics_handler(State(state): State<ApiState>) -> impl IntoResponse {
    let report = state.metrics.get_prometheus_metrics().await;
    match Response::builder()
        .status(StatusCode::OK)
        .header("content-type", "text/plain; version=0.0.4")
        .body(Body::from(report))
    {
        Ok(response) => response,
        Err(_) => (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error").into_response(),
    }
}

/// JSON 404 for unknown routes
async fn not_found_handler() -> impl IntoResponse {
    let response = Json(ErrorResponse {
        error: "Not found".to_string(),
    });
    (StatusCode::NOT_FOUND, response).into_response()
}

fn content_type_for(filename: &str) -> &'static str {
    let ext = filename
        .rsplit_once('.')
        .map(|(_, e)| e.to_ascii_lowercase())
        .unwrap_or_default();
    match ext.as_str() {
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "bmp" => "image/bmp",
        "mp4" => "video/mp4",
        "avi" => "video/x-msvideo",
        "mov" => "video/quicktime",
        "mkv" => "video/x-matroska",
        _ => "application/octet-stream",
    }
}
