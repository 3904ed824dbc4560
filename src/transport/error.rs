use std::fmt;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransportErrorKind {
    Network,
    Timeout,
    ClientRejected,
    ServerError,
    Unavailable,
    MalformedResponse,
    Internal,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransportError {
    pub kind: TransportErrorKind,
    pub message: String,
    pub retryable: bool,
    pub http_status: Option<u16>,
    pub body: Option<String>,
    pub attempts: u32,
}

impl TransportError {
    pub fn new(kind: TransportErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            retryable: matches!(
                kind,
                TransportErrorKind::Network
                    | TransportErrorKind::Timeout
                    | TransportErrorKind::ServerError
            ),
            http_status: None,
            body: None,
            attempts: 0,
        }
    }

    pub fn with_retryable(mut self, retryable: bool) -> Self {
        self.retryable = retryable;
        self
    }

    pub fn with_http_status(mut self, status: u16) -> Self {
        self.http_status = Some(status);
        self
    }

    pub fn with_body(mut self, body: impl Into<String>) -> Self {
        self.body = Some(body.into());
        self
    }

    pub fn with_attempts(mut self, attempts: u32) -> Self {
        self.attempts = attempts;
        self
    }

    /// Status the proxy surfaces for this failure.
    pub fn surface_status(&self) -> u16 {
        match self.kind {
            TransportErrorKind::ClientRejected => self.http_status.unwrap_or(400),
            TransportErrorKind::MalformedResponse => 502,
            TransportErrorKind::Network
            | TransportErrorKind::Timeout
            | TransportErrorKind::ServerError
            | TransportErrorKind::Unavailable => 503,
            TransportErrorKind::Internal => 500,
        }
    }
}

impl fmt::Display for TransportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.http_status {
            Some(status) => write!(f, "{} (status={})", self.message, status),
            None => write!(f, "{}", self.message),
        }
    }
}

impl std::error::Error for TransportError {}

pub fn network_error(message: impl Into<String>) -> TransportError {
    TransportError::new(TransportErrorKind::Network, message)
}

pub fn timeout_error(message: impl Into<String>) -> TransportError {
    TransportError::new(TransportErrorKind::Timeout, message)
}

pub fn unavailable(message: impl Into<String>) -> TransportError {
    TransportError::new(TransportErrorKind::Unavailable, message).with_retryable(false)
}

pub fn malformed_response(message: impl Into<String>) -> TransportError {
    TransportError::new(TransportErrorKind::MalformedResponse, message).with_retryable(false)
}

pub fn internal_error(message: impl Into<String>) -> TransportError {
    TransportError::new(TransportErrorKind::Internal, message).with_retryable(false)
}

/// Maps a non-2xx backend status onto a transport error. Only 5xx responses
/// are eligible for another attempt.
pub fn map_http_status(status: u16, body: &str) -> TransportError {
    let normalized_body = body.chars().take(240).collect::<String>();

    let err = if (400..500).contains(&status) {
        TransportError::new(
            TransportErrorKind::ClientRejected,
            format!("backend rejected request with status {status}"),
        )
        .with_retryable(false)
    } else if (500..600).contains(&status) {
        TransportError::new(
            TransportErrorKind::ServerError,
            format!("backend returned status {status}"),
        )
        .with_retryable(true)
    } else {
        malformed_response(format!("backend answered with unexpected status {status}"))
    };

    err.with_http_status(status).with_body(normalized_body)
}
