use axum::{
    Json,
    extract::{State, rejection::JsonRejection},
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use validator::Validate;

use crate::{
    proxy::{
        error::{BackendMessages, MessageError, ProxyError, map_backend_error},
        respond::merge_success,
        state::AppState,
    },
    transport::BackendRequest,
};

const MESSAGES: BackendMessages = BackendMessages {
    not_found: "No suitable questions found for the given parameters.",
    not_authorized: "Not authorized to access the question service.",
    failed: "Failed to retrieve question from the backend service.",
    unreachable: "Failed to connect to question service. Please try again later.",
};

/// The fields the proxy checks before forwarding. The body itself is passed
/// to the backend untouched.
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct QuestionRequest {
    #[validate(required)]
    pub cognitive_state: Option<CognitiveState>,
    #[validate(required, length(min = 1))]
    pub subject: Option<String>,
    #[serde(default)]
    pub previous_question_ids: Option<Vec<String>>,
    #[serde(default)]
    pub difficulty_preference: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CognitiveState {
    pub attention: Option<f64>,
    pub fatigue: Option<f64>,
    pub confidence: Option<f64>,
    pub question_id: Option<String>,
}

pub async fn request_question(
    State(state): State<AppState>,
    body: Result<Json<Value>, JsonRejection>,
) -> Result<Json<Value>, MessageError> {
    let Json(body) = body
        .map_err(|rejection| ProxyError::rejected_body(rejection.status(), rejection.body_text()))?;

    let missing = || {
        ProxyError::BadRequest(
            "Missing required fields: cognitiveState and subject are required".to_string(),
        )
    };
    let request: QuestionRequest = serde_json::from_value(body.clone()).map_err(|_| missing())?;
    request.validate().map_err(|_| missing())?;

    if let Some(cognitive_state) = &request.cognitive_state {
        tracing::debug!(
            target: "proxy",
            attention = ?cognitive_state.attention,
            fatigue = ?cognitive_state.fatigue,
            confidence = ?cognitive_state.confidence,
            question_id = cognitive_state.question_id.as_deref().unwrap_or("N/A"),
            subject = request.subject.as_deref().unwrap_or_default(),
            previous_questions = request.previous_question_ids.as_ref().map_or(0, Vec::len),
            difficulty = ?request.difficulty_preference,
            "question_requested"
        );
    }

    let request = BackendRequest::post_json(state.backend_url(&state.backend.question_path), body);
    let response = state
        .client
        .execute(&request)
        .await
        .map_err(|err| map_backend_error(err, &MESSAGES))?;
    let question: Value = response
        .json()
        .map_err(|err| map_backend_error(err, &MESSAGES))?;

    let has_question = question
        .get("question")
        .is_some_and(|question| !question.is_null());
    if !has_question {
        return Err(ProxyError::bad_gateway("Invalid question data returned from the backend").into());
    }

    Ok(Json(merge_success(question, "question")))
}

pub async fn question_usage() -> MessageError {
    MessageError(ProxyError::MethodNotAllowed(
        "This endpoint requires a POST request with cognitive state data".to_string(),
    ))
}
