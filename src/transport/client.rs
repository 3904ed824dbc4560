use std::{sync::Arc, time::Instant};

use tokio::time::sleep;

use crate::transport::{
    backend::BackendTransport,
    error::{TransportError, unavailable},
    retry::{AttemptVerdict, RetryLayer},
    types::{BackendRequest, BackendResponse, RetryConfig},
};

/// Delivers a backend request with bounded attempts and exponential backoff.
#[derive(Clone)]
pub struct RetryingClient {
    backend: Arc<dyn BackendTransport>,
    retry: RetryLayer,
}

impl RetryingClient {
    pub fn new(backend: Arc<dyn BackendTransport>, config: RetryConfig) -> Self {
        Self {
            backend,
            retry: RetryLayer::new(config),
        }
    }

    #[tracing::instrument(
        name = "transport_execute",
        target = "transport",
        skip(self, request),
        fields(url = %request.url, method = ?request.method)
    )]
    pub async fn execute(&self, request: &BackendRequest) -> Result<BackendResponse, TransportError> {
        let max_attempts = self.retry.max_attempts();
        let request_timeout = self.retry.request_timeout();
        let started_at = Instant::now();
        let mut last_error: Option<TransportError> = None;

        for attempt in 1..=max_attempts {
            let result = self.backend.send(request, request_timeout).await;

            match self.retry.classify(result) {
                AttemptVerdict::Delivered(response) => {
                    tracing::debug!(
                        target: "transport",
                        attempt = attempt,
                        status = response.status,
                        elapsed_ms = started_at.elapsed().as_millis() as u64,
                        "attempt_delivered"
                    );
                    return Ok(response);
                }
                AttemptVerdict::Fail(err) => {
                    tracing::warn!(
                        target: "transport",
                        attempt = attempt,
                        status = ?err.http_status,
                        error = %err,
                        "attempt_rejected"
                    );
                    return Err(err.with_attempts(attempt));
                }
                AttemptVerdict::Retry(err) => {
                    tracing::warn!(
                        target: "transport",
                        attempt = attempt,
                        max_attempts = max_attempts,
                        status = ?err.http_status,
                        kind = ?err.kind,
                        error = %err,
                        "attempt_failed"
                    );
                    last_error = Some(err);
                }
            }

            if self.retry.can_retry(attempt) {
                let delay = self.retry.backoff_delay(attempt);
                tracing::debug!(
                    target: "transport",
                    attempt = attempt,
                    delay_ms = delay.as_millis() as u64,
                    "attempt_backoff"
                );
                sleep(delay).await;
            }
        }

        let last_status = last_error.as_ref().and_then(|err| err.http_status);
        let last_message = last_error
            .map(|err| err.to_string())
            .unwrap_or_else(|| "no attempt was made".to_string());
        tracing::error!(
            target: "transport",
            attempts = max_attempts,
            last_status = ?last_status,
            last_error = %last_message,
            "delivery_exhausted"
        );

        let mut err = unavailable(format!(
            "backend unreachable after {max_attempts} attempts: {last_message}"
        ))
        .with_attempts(max_attempts);
        if let Some(status) = last_status {
            err = err.with_http_status(status);
        }
        Err(err)
    }
}
