use std::time::Duration;

use crate::transport::{
    error::{TransportError, map_http_status},
    types::{BackendResponse, RetryConfig},
};

/// What the retry loop does with the result of one attempt.
#[derive(Debug)]
pub enum AttemptVerdict {
    Delivered(BackendResponse),
    Retry(TransportError),
    Fail(TransportError),
}

#[derive(Debug, Clone)]
pub struct RetryLayer {
    config: RetryConfig,
}

impl RetryLayer {
    pub fn new(config: RetryConfig) -> Self {
        Self { config }
    }

    pub fn max_attempts(&self) -> u32 {
        self.config.max_attempts.max(1)
    }

    pub fn request_timeout(&self) -> Duration {
        self.config.request_timeout()
    }

    /// Wait before the attempt following failed attempt number `attempt`
    /// (1-based): `base * 2^attempt`.
    pub fn backoff_delay(&self, attempt: u32) -> Duration {
        let factor = 2u64.saturating_pow(attempt.min(32));
        Duration::from_millis(self.config.backoff_base_ms.saturating_mul(factor))
    }

    pub fn classify(&self, result: Result<BackendResponse, TransportError>) -> AttemptVerdict {
        match result {
            Ok(response) if response.is_success() => AttemptVerdict::Delivered(response),
            Ok(response) => {
                let err = map_http_status(response.status, &response.body);
                if err.retryable {
                    AttemptVerdict::Retry(err)
                } else {
                    AttemptVerdict::Fail(err)
                }
            }
            Err(err) if err.retryable => AttemptVerdict::Retry(err),
            Err(err) => AttemptVerdict::Fail(err),
        }
    }

    pub fn can_retry(&self, attempt: u32) -> bool {
        attempt < self.max_attempts()
    }
}
