use std::{
    sync::{Arc, RwLock},
    time::{Duration, SystemTime, UNIX_EPOCH},
};

use bytes::Bytes;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

fn default_interval_ms() -> u64 {
    1_000
}

fn default_queue_capacity() -> usize {
    60
}

fn default_encode_quality() -> f32 {
    0.85
}

fn default_frame_width() -> u32 {
    640
}

fn default_frame_height() -> u32 {
    480
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CaptureConfig {
    #[serde(default = "default_interval_ms")]
    pub interval_ms: u64,
    #[serde(default = "default_queue_capacity")]
    pub queue_capacity: usize,
    #[serde(default = "default_encode_quality")]
    pub encode_quality: f32,
    #[serde(default = "default_frame_width")]
    pub frame_width: u32,
    #[serde(default = "default_frame_height")]
    pub frame_height: u32,
    /// Periodic flush of everything queued; off unless set.
    #[serde(default)]
    pub flush_interval_ms: Option<u64>,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            interval_ms: default_interval_ms(),
            queue_capacity: default_queue_capacity(),
            encode_quality: default_encode_quality(),
            frame_width: default_frame_width(),
            frame_height: default_frame_height(),
            flush_interval_ms: None,
        }
    }
}

impl CaptureConfig {
    /// Profile used for per-frame webcam monitoring uploads.
    pub fn webcam_monitoring() -> Self {
        Self {
            queue_capacity: 30,
            ..Self::default()
        }
    }

    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms.max(1))
    }

    pub fn flush_interval(&self) -> Option<Duration> {
        self.flush_interval_ms
            .map(|interval_ms| Duration::from_millis(interval_ms.max(1)))
    }

    pub fn jpeg_quality(&self) -> u8 {
        (self.encode_quality.clamp(0.01, 1.0) * 100.0).round() as u8
    }
}

/// One encoded frame, tagged with the question on screen when it was taken.
#[derive(Debug, Clone, PartialEq)]
pub struct CapturedFrame {
    pub data: Bytes,
    pub captured_at_ms: i64,
    pub question_id: String,
    pub content_type: String,
}

impl CapturedFrame {
    pub fn new(data: Bytes, captured_at_ms: i64, question_id: impl Into<String>) -> Self {
        Self {
            data,
            captured_at_ms,
            question_id: question_id.into(),
            content_type: "image/jpeg".to_string(),
        }
    }

    pub fn file_name(&self) -> String {
        format!("image-{}.jpg", self.captured_at_ms)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FrameScope {
    All,
    Question(String),
}

impl FrameScope {
    pub fn question(question_id: impl Into<String>) -> Self {
        Self::Question(question_id.into())
    }

    pub fn matches(&self, frame: &CapturedFrame) -> bool {
        match self {
            Self::All => true,
            Self::Question(question_id) => frame.question_id == *question_id,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CaptureStatus {
    Idle,
    Capturing,
    Uploading,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusSnapshot {
    pub status: CaptureStatus,
    pub is_capturing: bool,
    pub frames_queued: usize,
    pub last_capture_at_ms: Option<i64>,
    pub last_error: Option<String>,
}

impl Default for StatusSnapshot {
    fn default() -> Self {
        Self {
            status: CaptureStatus::Idle,
            is_capturing: false,
            frames_queued: 0,
            last_capture_at_ms: None,
            last_error: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionIdentity {
    pub user_id: String,
    pub exam_id: String,
    pub session_id: String,
}

impl SessionIdentity {
    pub fn new(user_id: impl Into<String>, exam_id: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            exam_id: exam_id.into(),
            session_id: Uuid::now_v7().to_string(),
        }
    }

    pub fn with_session_id(mut self, session_id: impl Into<String>) -> Self {
        self.session_id = session_id.into();
        self
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum UploadOutcome {
    Empty,
    Delivered { frames: usize, response: Value },
}

impl UploadOutcome {
    pub fn frames(&self) -> usize {
        match self {
            Self::Empty => 0,
            Self::Delivered { frames, .. } => *frames,
        }
    }
}

/// Question currently on screen. Capture reads it at every tick, so an update
/// applies to the very next frame.
#[derive(Debug, Clone)]
pub struct QuestionCursor {
    current: Arc<RwLock<String>>,
}

impl QuestionCursor {
    pub fn new(question_id: impl Into<String>) -> Self {
        Self {
            current: Arc::new(RwLock::new(question_id.into())),
        }
    }

    pub fn get(&self) -> String {
        match self.current.read() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    /// Stores `question_id` and returns the question it replaced.
    pub fn replace(&self, question_id: impl Into<String>) -> String {
        let mut guard = match self.current.write() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        std::mem::replace(&mut *guard, question_id.into())
    }
}

pub fn now_epoch_ms() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_millis() as i64)
        .unwrap_or_default()
}
