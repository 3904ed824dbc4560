use std::fmt;

use crate::transport::TransportError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaptureErrorKind {
    DeviceUnavailable,
    FrameUnavailable,
    Encode,
    Upload,
    RestartRequired,
    InvalidState,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaptureError {
    pub kind: CaptureErrorKind,
    pub message: String,
    pub http_status: Option<u16>,
    pub dropped_frames: usize,
}

impl CaptureError {
    pub fn new(kind: CaptureErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            http_status: None,
            dropped_frames: 0,
        }
    }

    pub fn with_dropped_frames(mut self, dropped_frames: usize) -> Self {
        self.dropped_frames = dropped_frames;
        self
    }

    pub fn from_transport(err: &TransportError) -> Self {
        Self {
            kind: CaptureErrorKind::Upload,
            message: err.to_string(),
            http_status: Some(err.surface_status()),
            dropped_frames: 0,
        }
    }
}

impl fmt::Display for CaptureError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for CaptureError {}

pub fn device_unavailable(message: impl Into<String>) -> CaptureError {
    CaptureError::new(CaptureErrorKind::DeviceUnavailable, message)
}

pub fn frame_unavailable(message: impl Into<String>) -> CaptureError {
    CaptureError::new(CaptureErrorKind::FrameUnavailable, message)
}

pub fn encode_error(message: impl Into<String>) -> CaptureError {
    CaptureError::new(CaptureErrorKind::Encode, message)
}

pub fn restart_required(message: impl Into<String>) -> CaptureError {
    CaptureError::new(CaptureErrorKind::RestartRequired, message)
}

pub fn invalid_state(message: impl Into<String>) -> CaptureError {
    CaptureError::new(CaptureErrorKind::InvalidState, message)
}
