use axum::{
    Json,
    extract::{Multipart, State, multipart::MultipartRejection},
};
use serde_json::{Value, json};

use crate::{
    proxy::{error::ProxyError, form::ReceivedForm, state::AppState},
    transport::{BackendRequest, FormField, TransportError, TransportErrorKind},
};

pub async fn submit_eye_data(
    State(state): State<AppState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<Value>, ProxyError> {
    let form = ReceivedForm::read(multipart).await?;

    let Some(question_id) = form.text("questionId") else {
        return Err(ProxyError::BadRequest("Missing questionId".to_string()));
    };
    let images = form.files("images");
    if images.is_empty() {
        return Err(ProxyError::BadRequest("No images provided".to_string()));
    }
    let timestamps = form.texts("timestamps");
    tracing::info!(
        target: "proxy",
        question_id = %question_id,
        images = images.len(),
        timestamps = timestamps.len(),
        "eye_data_received"
    );

    let mut fields = Vec::with_capacity(1 + images.len() * 2);
    fields.push(FormField::text("questionId", question_id));
    for (index, image) in images.iter().enumerate() {
        fields.push(FormField::file(
            "images",
            image
                .file_name
                .clone()
                .unwrap_or_else(|| format!("image-{index}.jpg")),
            image
                .content_type
                .clone()
                .unwrap_or_else(|| "image/jpeg".to_string()),
            image.data.clone(),
        ));
        if let Some(timestamp) = timestamps.get(index).filter(|value| !value.is_empty()) {
            fields.push(FormField::text("timestamps", *timestamp));
        }
    }

    let request =
        BackendRequest::post_multipart(state.backend_url(&state.backend.eye_data_path), fields);
    let response = state
        .client
        .execute(&request)
        .await
        .map_err(eye_data_error)?;
    let backend_response: Value = response.json().map_err(eye_data_error)?;

    Ok(Json(json!({
        "success": true,
        "message": format!(
            "Successfully processed {} eye tracking images for question {}",
            images.len(),
            question_id
        ),
        "backendResponse": backend_response,
    })))
}

/// Backend refusals surface as 502 carrying the backend status and body;
/// an unreachable backend is 503.
fn eye_data_error(err: TransportError) -> ProxyError {
    match err.kind {
        TransportErrorKind::ClientRejected | TransportErrorKind::MalformedResponse => {
            ProxyError::BadGateway {
                message: "Backend API error".to_string(),
                status: err.http_status,
                details: Some(err.body.unwrap_or(err.message)),
            }
        }
        TransportErrorKind::Network
        | TransportErrorKind::Timeout
        | TransportErrorKind::ServerError
        | TransportErrorKind::Unavailable => {
            ProxyError::Unavailable("Failed to connect to backend API".to_string())
        }
        TransportErrorKind::Internal => ProxyError::Internal(err.message),
    }
}
