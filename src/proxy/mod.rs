pub mod error;
pub mod eye_tracking;
pub mod form;
pub mod questions;
pub mod respond;
pub mod score;
pub mod state;
pub mod webcam;

use axum::{
    Json, Router,
    extract::DefaultBodyLimit,
    routing::{get, post},
};
use serde_json::{Value, json};
use tower_http::trace::TraceLayer;

pub use error::{MessageError, ProxyError};
pub use state::{AllowAll, AppState, Authorizer};

pub fn router(state: AppState, max_upload_bytes: usize) -> Router {
    Router::new()
        .route(
            "/api/webcam-monitoring",
            post(webcam::submit_webcam_image).get(webcam::list_webcam_images),
        )
        .route("/api/eye-tracking", post(eye_tracking::submit_eye_data))
        .route(
            "/api/cognitive-questions",
            post(questions::request_question).get(questions::question_usage),
        )
        .route("/api/exam-score", get(score::exam_score))
        .route("/healthz", get(healthz))
        .with_state(state)
        .layer(DefaultBodyLimit::max(max_upload_bytes))
        .layer(TraceLayer::new_for_http())
}

async fn healthz() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}
