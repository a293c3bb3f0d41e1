use axum::{
    body::Body,
    http::{Response, StatusCode},
    response::{Html, IntoResponse},
};

// The UI is compiled into the binary so the server ships as a single file.
const INDEX_HTML: &str = include_str!("../assets/index.html");
const STYLE_CSS: &str = include_str!("../assets/style.css");
const SCRIPT_JS: &str = include_str!("../assets/script.js");

/// Serve the embedded upload page
pub async fn index_handler() -> impl IntoResponse {
    Html(INDEX_HTML)
}

/// Serve the embedded stylesheet
pub async fn style_handler() -> impl IntoResponse {
    asset_response("text/css", STYLE_CSS)
}

/// Serve the embedded frontend script
pub async fn script_handler() -> impl IntoResponse {
    asset_response("application/javascript", SCRIPT_JS)
}

fn asset_response(content_type: &'static str, body: &'static str) -> Response<Body> {
    Response::builder()
        .status(StatusCode::OK)
        .header("content-type", content_type)
        .body(Body::from(body))
        .unwrap_or_else(|_| {
            Response::builder()
                .status(StatusCode::INTERNAL_SERVER_ERROR)
                .body(Body::from("Internal server error"))
                .unwrap()
        })
}
