use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::{Map, Value, json};
use thiserror::Error;

use crate::transport::{TransportError, TransportErrorKind};

#[derive(Error, Debug)]
pub enum ProxyError {
    #[error("{0}")]
    BadRequest(String),

    #[error("{0}")]
    Forbidden(String),

    #[error("{0}")]
    MethodNotAllowed(String),

    #[error("{0}")]
    PayloadTooLarge(String),

    /// Backend refused the request; its status is passed through.
    #[error("{message}")]
    Rejected {
        status: u16,
        message: String,
        details: Option<String>,
    },

    /// Backend answered with an error the caller cannot act on.
    #[error("{message}")]
    BadGateway {
        message: String,
        status: Option<u16>,
        details: Option<String>,
    },

    #[error("{0}")]
    Unavailable(String),

    #[error("{0}")]
    Internal(String),
}

impl ProxyError {
    pub fn bad_gateway(message: impl Into<String>) -> Self {
        Self::BadGateway {
            message: message.into(),
            status: None,
            details: None,
        }
    }

    /// Error for a request body an extractor refused.
    pub fn rejected_body(status: StatusCode, text: String) -> Self {
        if status == StatusCode::PAYLOAD_TOO_LARGE {
            Self::PayloadTooLarge("Upload size limit exceeded".to_string())
        } else {
            Self::BadRequest(text)
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Forbidden(_) => StatusCode::FORBIDDEN,
            Self::MethodNotAllowed(_) => StatusCode::METHOD_NOT_ALLOWED,
            Self::PayloadTooLarge(_) => StatusCode::PAYLOAD_TOO_LARGE,
            Self::Rejected { status, .. } => {
                StatusCode::from_u16(*status).unwrap_or(StatusCode::BAD_REQUEST)
            }
            Self::BadGateway { .. } => StatusCode::BAD_GATEWAY,
            Self::Unavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn render(self, field: &str) -> Response {
        let status = self.status_code();
        let text = self.to_string();
        let mut body = Map::new();
        body.insert("success".to_string(), Value::Bool(false));
        body.insert(field.to_string(), Value::String(text.clone()));
        match self {
            Self::Rejected {
                details: Some(details),
                ..
            } => {
                body.insert("details".to_string(), Value::String(details));
            }
            Self::BadGateway {
                status: upstream,
                details,
                ..
            } => {
                if let Some(upstream) = upstream {
                    body.insert("status".to_string(), json!(upstream));
                }
                if let Some(details) = details {
                    body.insert("details".to_string(), Value::String(details));
                }
            }
            _ => {}
        }

        if status.is_server_error() {
            tracing::warn!(target: "proxy", status = status.as_u16(), error = %text, "request_failed");
        } else {
            tracing::debug!(target: "proxy", status = status.as_u16(), error = %text, "request_rejected");
        }
        (status, Json(Value::Object(body))).into_response()
    }
}

/// Renders as `{success: false, error, ...}`.
impl IntoResponse for ProxyError {
    fn into_response(self) -> Response {
        self.render("error")
    }
}

/// Same error, rendered with a `message` field instead of `error`.
#[derive(Debug)]
pub struct MessageError(pub ProxyError);

impl From<ProxyError> for MessageError {
    fn from(err: ProxyError) -> Self {
        Self(err)
    }
}

impl IntoResponse for MessageError {
    fn into_response(self) -> Response {
        self.0.render("message")
    }
}

/// Per-route wording for backend failures.
#[derive(Debug, Clone, Copy)]
pub struct BackendMessages {
    pub not_found: &'static str,
    pub not_authorized: &'static str,
    pub failed: &'static str,
    pub unreachable: &'static str,
}

/// Maps a transport failure onto the proxy response for one route.
pub fn map_backend_error(err: TransportError, messages: &BackendMessages) -> ProxyError {
    match err.kind {
        TransportErrorKind::ClientRejected => {
            let status = err.http_status.unwrap_or(400);
            let message = match status {
                404 => messages.not_found,
                401 | 403 => messages.not_authorized,
                _ => messages.failed,
            };
            ProxyError::Rejected {
                status,
                message: message.to_string(),
                details: err.body,
            }
        }
        TransportErrorKind::MalformedResponse => ProxyError::BadGateway {
            message: messages.failed.to_string(),
            status: err.http_status,
            details: Some(err.message),
        },
        TransportErrorKind::Network
        | TransportErrorKind::Timeout
        | TransportErrorKind::ServerError
        | TransportErrorKind::Unavailable => ProxyError::Unavailable(messages.unreachable.to_string()),
        TransportErrorKind::Internal => ProxyError::Internal(err.message),
    }
}
