use std::{sync::Arc, time::Duration};

use async_trait::async_trait;
use serde_json::Value;
use tokio::{
    sync::Mutex,
    task::JoinHandle,
    time::{Instant, MissedTickBehavior, interval_at},
};
use tokio_util::sync::CancellationToken;

use crate::{
    capture::{
        error::CaptureError,
        queue::SharedQueue,
        status::StatusBoard,
        types::{CapturedFrame, FrameScope, SessionIdentity, UploadOutcome},
    },
    transport::TransportError,
};

/// Frames drained for one upload, in capture order.
#[derive(Debug, Clone, PartialEq)]
pub struct UploadBatch {
    pub scope: FrameScope,
    pub frames: Vec<CapturedFrame>,
}

impl UploadBatch {
    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }
}

/// Where a drained batch goes. Implementations own retry; an `Err` means the
/// batch is lost.
#[async_trait]
pub trait BatchSink: Send + Sync {
    async fn submit(
        &self,
        session: &SessionIdentity,
        batch: &UploadBatch,
    ) -> Result<Value, TransportError>;
}

pub struct UploadDispatcher {
    session: SessionIdentity,
    queue: SharedQueue,
    status: StatusBoard,
    sink: Arc<dyn BatchSink>,
    upload_lock: Mutex<()>,
}

impl UploadDispatcher {
    pub fn new(
        session: SessionIdentity,
        queue: SharedQueue,
        status: StatusBoard,
        sink: Arc<dyn BatchSink>,
    ) -> Self {
        Self {
            session,
            queue,
            status,
            sink,
            upload_lock: Mutex::new(()),
        }
    }

    pub fn session(&self) -> &SessionIdentity {
        &self.session
    }

    /// Drains the frames in `scope` and submits them as one batch. Flushes of
    /// the same session run one at a time; a waiting flush drains whatever is
    /// left once the previous one settles.
    #[tracing::instrument(
        name = "dispatcher_flush",
        target = "dispatcher",
        skip(self),
        fields(session_id = %self.session.session_id)
    )]
    pub async fn flush(&self, scope: FrameScope) -> Result<UploadOutcome, CaptureError> {
        let _upload_guard = self.upload_lock.lock().await;

        let (frames, remaining) = self.queue.drain_scope(&scope);
        self.status.set_frames_queued(remaining);
        if frames.is_empty() {
            tracing::debug!(target: "dispatcher", scope = ?scope, "flush_skipped_empty_batch");
            return Ok(UploadOutcome::Empty);
        }

        let batch = UploadBatch { scope, frames };
        let frame_count = batch.len();
        self.status.begin_upload();
        tracing::info!(
            target: "dispatcher",
            scope = ?batch.scope,
            frames = frame_count,
            remaining = remaining,
            "batch_upload_started"
        );

        match self.sink.submit(&self.session, &batch).await {
            Ok(response) => {
                self.status.finish_upload();
                tracing::info!(
                    target: "dispatcher",
                    frames = frame_count,
                    "batch_upload_completed"
                );
                Ok(UploadOutcome::Delivered {
                    frames: frame_count,
                    response,
                })
            }
            Err(err) => {
                let capture_err =
                    CaptureError::from_transport(&err).with_dropped_frames(frame_count);
                self.status.fail_upload(&capture_err);
                tracing::warn!(
                    target: "dispatcher",
                    frames_dropped = frame_count,
                    attempts = err.attempts,
                    error = %err,
                    "batch_upload_failed"
                );
                Err(capture_err)
            }
        }
    }

    /// Flushes everything queued every `period` until `cancel` fires.
    pub fn spawn_periodic(
        self: Arc<Self>,
        period: Duration,
        cancel: CancellationToken,
    ) -> JoinHandle<()> {
        let mut ticker = interval_at(Instant::now() + period, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        tokio::spawn(async move {
            loop {
                tokio::select! {
                    biased;
                    _ = cancel.cancelled() => break,
                    _ = ticker.tick() => {
                        // failures already land on the status board
                        let _ = self.flush(FrameScope::All).await;
                    }
                }
            }
        })
    }
}
