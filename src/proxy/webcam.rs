use axum::{
    Json,
    extract::{
        Multipart, Query, State,
        multipart::MultipartRejection,
        rejection::QueryRejection,
    },
};
use serde::Deserialize;
use serde_json::{Value, json};
use sha2::{Digest, Sha256};
use validator::Validate;

use crate::{
    capture::types::now_epoch_ms,
    proxy::{
        error::{BackendMessages, ProxyError, map_backend_error},
        form::ReceivedForm,
        state::AppState,
    },
    transport::{BackendRequest, FormField},
};

const SUBMIT_MESSAGES: BackendMessages = BackendMessages {
    not_found: "No monitoring session found for the given parameters.",
    not_authorized: "Not authorized to store webcam images.",
    failed: "Failed to store webcam image",
    unreachable: "Failed to connect to webcam storage service. Please try again later.",
};

const LIST_MESSAGES: BackendMessages = BackendMessages {
    not_found: "No webcam images found for the given parameters.",
    not_authorized: "Not authorized to access webcam images.",
    failed: "Failed to retrieve webcam images",
    unreachable: "Failed to connect to webcam storage service. Please try again later.",
};

#[derive(Debug, Validate)]
struct WebcamMetadata {
    #[validate(length(min = 1))]
    user_id: String,
    #[validate(length(min = 1))]
    exam_id: String,
    #[validate(length(min = 1))]
    question_id: String,
    #[validate(length(min = 1))]
    session_id: String,
}

impl WebcamMetadata {
    fn from_form(form: &ReceivedForm) -> Self {
        let field = |name: &str| form.text(name).unwrap_or_default().to_string();
        Self {
            user_id: field("userId"),
            exam_id: field("examId"),
            question_id: field("questionId"),
            session_id: field("sessionId"),
        }
    }
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct WebcamImagesQuery {
    #[validate(required, length(min = 1))]
    pub user_id: Option<String>,
    #[validate(required, length(min = 1))]
    pub exam_id: Option<String>,
    #[validate(required, length(min = 1))]
    pub session_id: Option<String>,
    pub question_id: Option<String>,
}

/// Storage key the backend files the image under:
/// `webcam/<user>/<exam>/<question>/<timestamp>-<hash>.jpg`.
pub fn webcam_object_key(
    user_id: &str,
    exam_id: &str,
    question_id: &str,
    session_id: &str,
    timestamp: i64,
) -> String {
    let digest = Sha256::digest(
        format!("{user_id}-{exam_id}-{question_id}-{session_id}-{timestamp}").as_bytes(),
    );
    let hash: String = digest[..6]
        .iter()
        .map(|byte| format!("{byte:02x}"))
        .collect();
    format!("webcam/{user_id}/{exam_id}/{question_id}/{timestamp}-{hash}.jpg")
}

pub async fn submit_webcam_image(
    State(state): State<AppState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<Value>, ProxyError> {
    let form = ReceivedForm::read(multipart).await?;

    let metadata = WebcamMetadata::from_form(&form);
    let image = form.file("image");
    let (Some(image), Ok(())) = (image, metadata.validate()) else {
        return Err(ProxyError::BadRequest("Missing required fields".to_string()));
    };
    if !image.is_image() {
        return Err(ProxyError::BadRequest(
            "Invalid file type. Only images are allowed.".to_string(),
        ));
    }
    if !state
        .authorizer
        .authorize(&metadata.user_id, &metadata.session_id)
        .await
    {
        return Err(ProxyError::Forbidden(
            "Not authorized to submit images for this session".to_string(),
        ));
    }

    let timestamp = match form.text("timestamp") {
        Some(raw) => raw
            .trim()
            .parse::<i64>()
            .map_err(|_| ProxyError::BadRequest(format!("Invalid timestamp '{raw}'")))?,
        None => now_epoch_ms(),
    };
    let object_key = webcam_object_key(
        &metadata.user_id,
        &metadata.exam_id,
        &metadata.question_id,
        &metadata.session_id,
        timestamp,
    );

    let content_type = image
        .content_type
        .clone()
        .unwrap_or_else(|| "image/jpeg".to_string());
    let file_name = image
        .file_name
        .clone()
        .unwrap_or_else(|| format!("image-{timestamp}.jpg"));
    let request = BackendRequest::post_multipart(
        state.backend_url(&state.backend.webcam_path),
        vec![
            FormField::text("userId", metadata.user_id.as_str()),
            FormField::text("examId", metadata.exam_id.as_str()),
            FormField::text("questionId", metadata.question_id.as_str()),
            FormField::text("sessionId", metadata.session_id.as_str()),
            FormField::text("timestamp", timestamp.to_string()),
            FormField::text("objectKey", object_key.as_str()),
            FormField::file("image", file_name, content_type, image.data.clone()),
        ],
    );

    let response = state
        .client
        .execute(&request)
        .await
        .map_err(|err| map_backend_error(err, &SUBMIT_MESSAGES))?;
    let stored: Value = response
        .json()
        .map_err(|err| map_backend_error(err, &SUBMIT_MESSAGES))?;
    let image_url = stored
        .get("imageUrl")
        .or_else(|| stored.get("url"))
        .and_then(Value::as_str)
        .map(str::to_string)
        .unwrap_or_else(|| object_key.clone());

    tracing::info!(
        target: "proxy",
        user_id = %metadata.user_id,
        exam_id = %metadata.exam_id,
        question_id = %metadata.question_id,
        session_id = %metadata.session_id,
        timestamp = timestamp,
        bytes = image.data.len(),
        image_url = %image_url,
        "webcam_image_captured"
    );

    Ok(Json(json!({
        "success": true,
        "imageUrl": image_url,
        "message": "Image captured and stored successfully",
    })))
}

pub async fn list_webcam_images(
    State(state): State<AppState>,
    query: Result<Query<WebcamImagesQuery>, QueryRejection>,
) -> Result<Json<Value>, ProxyError> {
    let Query(query) = query.map_err(|rejection| ProxyError::BadRequest(rejection.body_text()))?;
    let (Some(user_id), Some(exam_id), Some(session_id), Ok(())) = (
        query.user_id.as_deref(),
        query.exam_id.as_deref(),
        query.session_id.as_deref(),
        query.validate(),
    ) else {
        return Err(ProxyError::BadRequest("Missing required parameters".to_string()));
    };
    if !state.authorizer.authorize(user_id, session_id).await {
        return Err(ProxyError::Forbidden(
            "Not authorized to view images for this session".to_string(),
        ));
    }

    let request = BackendRequest::get(state.backend_url(&state.backend.webcam_images_path))
        .with_query("userId", user_id)
        .with_query("examId", exam_id)
        .with_query("sessionId", session_id)
        .with_optional_query("questionId", query.question_id.as_deref());

    let response = state
        .client
        .execute(&request)
        .await
        .map_err(|err| map_backend_error(err, &LIST_MESSAGES))?;
    let listed: Value = response
        .json()
        .map_err(|err| map_backend_error(err, &LIST_MESSAGES))?;
    let images = match listed {
        Value::Array(images) => Value::Array(images),
        Value::Object(mut body) => body.remove("images").unwrap_or_else(|| json!([])),
        _ => return Err(ProxyError::bad_gateway("Invalid image listing returned from the backend")),
    };

    Ok(Json(json!({ "success": true, "images": images })))
}
