use axum::http::StatusCode;

use crate::support::{BASE_URL, MockBackend, app, get, query_value, send};

#[tokio::test]
async fn score_needs_exam_or_session() {
    let backend = MockBackend::replying(200, "{}");

    let (status, body) = send(app(backend.clone()), get("/api/exam-score?userId=user-1")).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(
        body["message"],
        "Missing required parameters: either examId or sessionId is required"
    );
    assert!(backend.requests().is_empty());
}

#[tokio::test]
async fn score_is_fetched_by_session() {
    let backend = MockBackend::replying(200, r#"{"score": 42, "maxScore": 50}"#);

    let (status, body) = send(
        app(backend.clone()),
        get("/api/exam-score?sessionId=session-1&subject=algebra"),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert_eq!(body["score"], 42);
    assert_eq!(body["maxScore"], 50);

    let forwarded = backend.last_request();
    assert_eq!(forwarded.url, format!("{BASE_URL}/api/quiz/marks"));
    assert_eq!(query_value(&forwarded, "sessionId"), Some("session-1"));
    assert_eq!(query_value(&forwarded, "subject"), Some("algebra"));
    assert_eq!(query_value(&forwarded, "examId"), None);
}

#[tokio::test]
async fn non_object_score_is_nested() {
    let backend = MockBackend::replying(200, "87");

    let (status, body) = send(app(backend), get("/api/exam-score?examId=exam-1")).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert_eq!(body["scoreDetails"], 87);
}
