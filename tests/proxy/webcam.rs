use std::sync::Arc;

use axum::http::StatusCode;
use proctor::proxy;

use crate::support::{
    BASE_URL, DenyAll, MockBackend, Multipart, app, form_files, form_texts, get, query_value,
    send, state,
};

const JPEG: &[u8] = &[0xff, 0xd8, 0xff, 0xe0, 0x00, 0x10];

fn webcam_form() -> Multipart {
    Multipart::new()
        .text("userId", "user-1")
        .text("examId", "exam-1")
        .text("questionId", "q-1")
        .text("sessionId", "session-1")
        .text("timestamp", "1700000000000")
}

#[tokio::test]
async fn webcam_image_is_forwarded_with_object_key() {
    let backend = MockBackend::replying(200, r#"{"stored": true}"#);
    let request = webcam_form()
        .file("image", "frame.jpg", "image/jpeg", JPEG)
        .into_request("/api/webcam-monitoring");

    let (status, body) = send(app(backend.clone()), request).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert_eq!(body["message"], "Image captured and stored successfully");
    let image_url = body["imageUrl"].as_str().expect("imageUrl should be a string");
    assert!(image_url.starts_with("webcam/user-1/exam-1/q-1/1700000000000-"));

    let forwarded = backend.last_request();
    assert_eq!(forwarded.url, format!("{BASE_URL}/api/quiz/submit-webcam"));
    assert_eq!(form_texts(&forwarded, "userId"), vec!["user-1"]);
    assert_eq!(form_texts(&forwarded, "timestamp"), vec!["1700000000000"]);
    assert_eq!(form_texts(&forwarded, "objectKey"), vec![image_url]);
    assert_eq!(
        form_files(&forwarded, "image"),
        vec![("frame.jpg", "image/jpeg", JPEG.len())]
    );
}

#[tokio::test]
async fn backend_image_url_wins_over_object_key() {
    let backend = MockBackend::replying(200, r#"{"imageUrl": "https://cdn.test/frame.jpg"}"#);
    let request = webcam_form()
        .file("image", "frame.jpg", "image/jpeg", JPEG)
        .into_request("/api/webcam-monitoring");

    let (status, body) = send(app(backend), request).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["imageUrl"], "https://cdn.test/frame.jpg");
}

#[tokio::test]
async fn missing_image_is_rejected_before_the_backend() {
    let backend = MockBackend::replying(200, "{}");
    let request = webcam_form().into_request("/api/webcam-monitoring");

    let (status, body) = send(app(backend.clone()), request).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], false);
    assert_eq!(body["error"], "Missing required fields");
    assert!(backend.requests().is_empty());
}

#[tokio::test]
async fn missing_session_is_rejected() {
    let backend = MockBackend::replying(200, "{}");
    let request = Multipart::new()
        .text("userId", "user-1")
        .text("examId", "exam-1")
        .text("questionId", "q-1")
        .file("image", "frame.jpg", "image/jpeg", JPEG)
        .into_request("/api/webcam-monitoring");

    let (status, body) = send(app(backend), request).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Missing required fields");
}

#[tokio::test]
async fn non_image_upload_is_rejected() {
    let backend = MockBackend::replying(200, "{}");
    let request = webcam_form()
        .file("image", "notes.txt", "text/plain", b"hello")
        .into_request("/api/webcam-monitoring");

    let (status, body) = send(app(backend.clone()), request).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Invalid file type. Only images are allowed.");
    assert!(backend.requests().is_empty());
}

#[tokio::test]
async fn unauthorized_session_is_forbidden() {
    let backend = MockBackend::replying(200, "{}");
    let router = proxy::router(
        state(backend.clone()).with_authorizer(Arc::new(DenyAll)),
        1024 * 1024,
    );
    let request = webcam_form()
        .file("image", "frame.jpg", "image/jpeg", JPEG)
        .into_request("/api/webcam-monitoring");

    let (status, body) = send(router, request).await;

    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["success"], false);
    assert!(backend.requests().is_empty());
}

#[tokio::test]
async fn backend_not_found_keeps_status_and_details() {
    let backend = MockBackend::replying(404, "no such session");
    let request = webcam_form()
        .file("image", "frame.jpg", "image/jpeg", JPEG)
        .into_request("/api/webcam-monitoring");

    let (status, body) = send(app(backend.clone()), request).await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(
        body["error"],
        "No monitoring session found for the given parameters."
    );
    assert_eq!(body["details"], "no such session");
    assert_eq!(backend.requests().len(), 1);
}

#[tokio::test]
async fn listing_requires_identifiers() {
    let backend = MockBackend::replying(200, "[]");

    let (status, body) = send(
        app(backend.clone()),
        get("/api/webcam-monitoring?userId=user-1&examId=exam-1"),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Missing required parameters");
    assert!(backend.requests().is_empty());
}

#[tokio::test]
async fn listing_forwards_query_and_unwraps_images() {
    let backend = MockBackend::replying(200, r#"{"images": [{"url": "a.jpg"}, {"url": "b.jpg"}]}"#);

    let (status, body) = send(
        app(backend.clone()),
        get("/api/webcam-monitoring?userId=user-1&examId=exam-1&sessionId=session-1&questionId=q-2"),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert_eq!(body["images"].as_array().map(Vec::len), Some(2));

    let forwarded = backend.last_request();
    assert_eq!(forwarded.url, format!("{BASE_URL}/api/quiz/webcam-images"));
    assert_eq!(query_value(&forwarded, "sessionId"), Some("session-1"));
    assert_eq!(query_value(&forwarded, "questionId"), Some("q-2"));
}
