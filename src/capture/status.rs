use std::sync::{Arc, Mutex, MutexGuard};

use crate::capture::{
    error::CaptureError,
    types::{CaptureStatus, StatusSnapshot},
};

#[derive(Debug, Default)]
struct BoardState {
    snapshot: StatusSnapshot,
    uploads_in_flight: usize,
    device_failed: bool,
}

/// Shared view of one session's capture status. Every transition goes through
/// here so the idle/capturing/uploading/error machine stays consistent.
#[derive(Debug, Clone, Default)]
pub struct StatusBoard {
    inner: Arc<Mutex<BoardState>>,
}

impl StatusBoard {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, BoardState> {
        match self.inner.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    pub fn snapshot(&self) -> StatusSnapshot {
        self.lock().snapshot.clone()
    }

    pub fn status(&self) -> CaptureStatus {
        self.lock().snapshot.status
    }

    pub fn device_failed(&self) -> bool {
        self.lock().device_failed
    }

    pub fn mark_capturing(&self) {
        let mut state = self.lock();
        state.snapshot.is_capturing = true;
        if state.uploads_in_flight == 0 {
            state.snapshot.status = CaptureStatus::Capturing;
        }
    }

    /// Capture halted. An upload still in flight keeps `uploading` until it
    /// settles.
    pub fn mark_stopped(&self) {
        let mut state = self.lock();
        state.snapshot.is_capturing = false;
        if state.uploads_in_flight == 0 && !state.device_failed {
            state.snapshot.status = CaptureStatus::Idle;
        }
    }

    pub fn record_capture(&self, captured_at_ms: i64, frames_queued: usize) {
        let mut state = self.lock();
        state.snapshot.last_capture_at_ms = Some(captured_at_ms);
        state.snapshot.frames_queued = frames_queued;
    }

    pub fn set_frames_queued(&self, frames_queued: usize) {
        self.lock().snapshot.frames_queued = frames_queued;
    }

    pub fn begin_upload(&self) {
        let mut state = self.lock();
        state.uploads_in_flight += 1;
        state.snapshot.status = CaptureStatus::Uploading;
    }

    pub fn finish_upload(&self) {
        let mut state = self.lock();
        state.uploads_in_flight = state.uploads_in_flight.saturating_sub(1);
        if state.uploads_in_flight == 0 {
            state.snapshot.status = settled_status(&state);
        }
    }

    pub fn fail_upload(&self, err: &CaptureError) {
        let mut state = self.lock();
        state.uploads_in_flight = state.uploads_in_flight.saturating_sub(1);
        state.snapshot.status = CaptureStatus::Error;
        state.snapshot.last_error = Some(err.message.clone());
    }

    pub fn fail_device(&self, err: &CaptureError) {
        let mut state = self.lock();
        state.device_failed = true;
        state.snapshot.is_capturing = false;
        state.snapshot.status = CaptureStatus::Error;
        state.snapshot.last_error = Some(err.message.clone());
    }

    pub fn clear_error(&self) {
        let mut state = self.lock();
        state.device_failed = false;
        state.snapshot.last_error = None;
        if state.snapshot.status == CaptureStatus::Error {
            state.snapshot.status = settled_status(&state);
        }
    }

    pub fn reset(&self) {
        let mut state = self.lock();
        let uploads_in_flight = state.uploads_in_flight;
        *state = BoardState {
            uploads_in_flight,
            ..BoardState::default()
        };
        if uploads_in_flight > 0 {
            state.snapshot.status = CaptureStatus::Uploading;
        }
    }
}

fn settled_status(state: &BoardState) -> CaptureStatus {
    if state.uploads_in_flight > 0 {
        CaptureStatus::Uploading
    } else if state.snapshot.is_capturing {
        CaptureStatus::Capturing
    } else {
        CaptureStatus::Idle
    }
}
