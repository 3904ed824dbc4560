use axum::http::StatusCode;
use proctor::transport::RequestBody;
use serde_json::json;

use crate::support::{BASE_URL, MockBackend, app, get, post_json, send};

fn question_request() -> serde_json::Value {
    json!({
        "cognitiveState": { "attention": 0.8, "fatigue": 0.1, "confidence": 0.6, "questionId": "q-3" },
        "subject": "algebra",
        "previousQuestionIds": ["q-1", "q-2"],
    })
}

#[tokio::test]
async fn get_explains_the_post_contract() {
    let backend = MockBackend::replying(200, "{}");

    let (status, body) = send(app(backend), get("/api/cognitive-questions")).await;

    assert_eq!(status, StatusCode::METHOD_NOT_ALLOWED);
    assert_eq!(body["success"], false);
    assert_eq!(
        body["message"],
        "This endpoint requires a POST request with cognitive state data"
    );
}

#[tokio::test]
async fn missing_subject_is_rejected() {
    let backend = MockBackend::replying(200, "{}");
    let request = post_json(
        "/api/cognitive-questions",
        &json!({ "cognitiveState": { "attention": 0.5 } }),
    );

    let (status, body) = send(app(backend.clone()), request).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(
        body["message"],
        "Missing required fields: cognitiveState and subject are required"
    );
    assert!(backend.requests().is_empty());
}

#[tokio::test]
async fn question_is_merged_into_success_body() {
    let backend = MockBackend::replying(
        200,
        r#"{"question": {"id": "q-4", "text": "2 + 2?"}, "difficulty": "easy", "success": false}"#,
    );

    let (status, body) = send(
        app(backend.clone()),
        post_json("/api/cognitive-questions", &question_request()),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert_eq!(body["question"]["id"], "q-4");
    assert_eq!(body["difficulty"], "easy");

    let forwarded = backend.last_request();
    assert_eq!(forwarded.url, format!("{BASE_URL}/api/quiz/get_question"));
    assert_eq!(forwarded.body, RequestBody::Json(question_request()));
}

#[tokio::test]
async fn response_without_question_is_a_bad_gateway() {
    let backend = MockBackend::replying(200, r#"{"question": null}"#);

    let (status, body) = send(
        app(backend),
        post_json("/api/cognitive-questions", &question_request()),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert_eq!(
        body["message"],
        "Invalid question data returned from the backend"
    );
}

#[tokio::test]
async fn backend_not_found_uses_question_wording() {
    let backend = MockBackend::replying(404, r#"{"detail": "none left"}"#);

    let (status, body) = send(
        app(backend.clone()),
        post_json("/api/cognitive-questions", &question_request()),
    )
    .await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(
        body["message"],
        "No suitable questions found for the given parameters."
    );
    assert_eq!(backend.requests().len(), 1);
}

#[tokio::test]
async fn exhausted_retries_report_unavailable() {
    let backend = MockBackend::replying(500, "boom");

    let (status, body) = send(
        app(backend.clone()),
        post_json("/api/cognitive-questions", &question_request()),
    )
    .await;

    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(
        body["message"],
        "Failed to connect to question service. Please try again later."
    );
    assert_eq!(backend.requests().len(), 3);
}
