use axum::{
    Json,
    extract::{Query, State, rejection::QueryRejection},
};
use serde::Deserialize;
use serde_json::Value;
use validator::{Validate, ValidationError};

use crate::{
    proxy::{
        error::{BackendMessages, MessageError, ProxyError, map_backend_error},
        respond::merge_success,
        state::AppState,
    },
    transport::BackendRequest,
};

const MESSAGES: BackendMessages = BackendMessages {
    not_found: "No score found for the given parameters.",
    not_authorized: "Not authorized to access the score service.",
    failed: "Failed to retrieve score from the backend service.",
    unreachable: "Failed to connect to score service. Please try again later.",
};

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
#[validate(schema(function = "validate_score_target"))]
pub struct ScoreQuery {
    pub exam_id: Option<String>,
    pub user_id: Option<String>,
    pub session_id: Option<String>,
    pub subject: Option<String>,
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|value| !value.is_empty())
}

fn validate_score_target(query: &ScoreQuery) -> Result<(), ValidationError> {
    if non_empty(&query.exam_id).is_none() && non_empty(&query.session_id).is_none() {
        return Err(ValidationError::new("missing_score_target"));
    }
    Ok(())
}

pub async fn exam_score(
    State(state): State<AppState>,
    query: Result<Query<ScoreQuery>, QueryRejection>,
) -> Result<Json<Value>, MessageError> {
    let Query(query) = query.map_err(|rejection| ProxyError::BadRequest(rejection.body_text()))?;
    query.validate().map_err(|_| {
        ProxyError::BadRequest(
            "Missing required parameters: either examId or sessionId is required".to_string(),
        )
    })?;

    let request = BackendRequest::get(state.backend_url(&state.backend.score_path))
        .with_optional_query("examId", non_empty(&query.exam_id))
        .with_optional_query("userId", non_empty(&query.user_id))
        .with_optional_query("sessionId", non_empty(&query.session_id))
        .with_optional_query("subject", non_empty(&query.subject));

    let response = state
        .client
        .execute(&request)
        .await
        .map_err(|err| map_backend_error(err, &MESSAGES))?;
    let score: Value = response
        .json()
        .map_err(|err| map_backend_error(err, &MESSAGES))?;

    Ok(Json(merge_success(score, "scoreDetails")))
}
