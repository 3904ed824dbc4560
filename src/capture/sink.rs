use async_trait::async_trait;
use futures_util::future::join_all;
use serde_json::Value;

use crate::{
    capture::{
        dispatcher::{BatchSink, UploadBatch},
        types::{CapturedFrame, SessionIdentity},
    },
    transport::{BackendRequest, FormField, RetryingClient, TransportError, error::internal_error},
};

/// Eye-tracking upload: one multipart submission per question carrying
/// `questionId`, every image and its capture timestamp.
#[derive(Clone)]
pub struct EyeDataSink {
    client: RetryingClient,
    url: String,
}

impl EyeDataSink {
    pub fn new(client: RetryingClient, url: impl Into<String>) -> Self {
        Self {
            client,
            url: url.into(),
        }
    }
}

pub fn eye_data_fields(question_id: &str, frames: &[&CapturedFrame]) -> Vec<FormField> {
    let mut fields = Vec::with_capacity(1 + frames.len() * 2);
    fields.push(FormField::text("questionId", question_id));
    for frame in frames {
        fields.push(FormField::file(
            "images",
            frame.file_name(),
            frame.content_type.clone(),
            frame.data.clone(),
        ));
        fields.push(FormField::text(
            "timestamps",
            frame.captured_at_ms.to_string(),
        ));
    }
    fields
}

/// Groups frames by question in first-seen order, keeping capture order
/// inside each group.
fn group_by_question(frames: &[CapturedFrame]) -> Vec<(String, Vec<&CapturedFrame>)> {
    let mut groups: Vec<(String, Vec<&CapturedFrame>)> = Vec::new();
    for frame in frames {
        match groups
            .iter_mut()
            .find(|(question_id, _)| *question_id == frame.question_id)
        {
            Some((_, group)) => group.push(frame),
            None => groups.push((frame.question_id.clone(), vec![frame])),
        }
    }
    groups
}

#[async_trait]
impl BatchSink for EyeDataSink {
    async fn submit(
        &self,
        _session: &SessionIdentity,
        batch: &UploadBatch,
    ) -> Result<Value, TransportError> {
        let mut responses = Vec::new();
        for (question_id, frames) in group_by_question(&batch.frames) {
            let request =
                BackendRequest::post_multipart(&self.url, eye_data_fields(&question_id, &frames));
            let response = self.client.execute(&request).await?;
            responses.push(response.json::<Value>()?);
        }

        match responses.len() {
            0 => Err(internal_error("eye data batch has no frames")),
            1 => Ok(responses.remove(0)),
            _ => Ok(Value::Array(responses)),
        }
    }
}

/// Webcam monitoring upload: one submission per frame with the session
/// metadata, sent concurrently.
#[derive(Clone)]
pub struct WebcamSink {
    client: RetryingClient,
    url: String,
}

impl WebcamSink {
    pub fn new(client: RetryingClient, url: impl Into<String>) -> Self {
        Self {
            client,
            url: url.into(),
        }
    }
}

pub fn webcam_fields(session: &SessionIdentity, frame: &CapturedFrame) -> Vec<FormField> {
    vec![
        FormField::text("userId", session.user_id.clone()),
        FormField::text("examId", session.exam_id.clone()),
        FormField::text("questionId", frame.question_id.clone()),
        FormField::text("sessionId", session.session_id.clone()),
        FormField::text("timestamp", frame.captured_at_ms.to_string()),
        FormField::file(
            "image",
            frame.file_name(),
            frame.content_type.clone(),
            frame.data.clone(),
        ),
    ]
}

#[async_trait]
impl BatchSink for WebcamSink {
    async fn submit(
        &self,
        session: &SessionIdentity,
        batch: &UploadBatch,
    ) -> Result<Value, TransportError> {
        let uploads = batch.frames.iter().map(|frame| {
            let request = BackendRequest::post_multipart(&self.url, webcam_fields(session, frame));
            async move {
                let response = self.client.execute(&request).await?;
                response.json::<Value>()
            }
        });
        let results = join_all(uploads).await;

        let total = results.len();
        let mut responses = Vec::with_capacity(total);
        let mut first_error: Option<TransportError> = None;
        let mut failures = 0;
        for result in results {
            match result {
                Ok(response) => responses.push(response),
                Err(err) => {
                    failures += 1;
                    first_error.get_or_insert(err);
                }
            }
        }

        if let Some(err) = first_error {
            tracing::warn!(
                target: "dispatcher",
                failed = failures,
                total = total,
                "webcam_frames_failed"
            );
            let mut combined = TransportError::new(
                err.kind,
                format!("{failures} of {total} webcam frames failed to upload: {err}"),
            )
            .with_retryable(false)
            .with_attempts(err.attempts);
            if let Some(status) = err.http_status {
                combined = combined.with_http_status(status);
            }
            return Err(combined);
        }

        Ok(Value::Array(responses))
    }
}
