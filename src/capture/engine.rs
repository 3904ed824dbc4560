use std::{sync::Arc, time::Duration};

use tokio::{
    task::JoinHandle,
    time::{Instant, MissedTickBehavior, interval_at},
};
use tokio_util::sync::CancellationToken;

use crate::capture::{
    error::{CaptureError, encode_error, frame_unavailable},
    queue::SharedQueue,
    source::{FrameEncoder, VideoStream},
    status::StatusBoard,
    types::{CapturedFrame, QuestionCursor, now_epoch_ms},
};

pub struct FrameCaptureEngine {
    queue: SharedQueue,
    cursor: QuestionCursor,
    encoder: Arc<dyn FrameEncoder>,
    status: StatusBoard,
    interval: Duration,
}

impl FrameCaptureEngine {
    pub fn new(
        queue: SharedQueue,
        cursor: QuestionCursor,
        encoder: Arc<dyn FrameEncoder>,
        status: StatusBoard,
        interval: Duration,
    ) -> Self {
        Self {
            queue,
            cursor,
            encoder,
            status,
            interval: interval.max(Duration::from_millis(1)),
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Grabs, encodes and enqueues one frame. Encoding runs on the blocking
    /// pool. The question tag is read under the queue lock, at the instant the
    /// frame enters the queue.
    pub async fn capture_once(
        &self,
        stream: &dyn VideoStream,
    ) -> Result<CapturedFrame, CaptureError> {
        if !stream.is_live() {
            return Err(frame_unavailable("video stream is not live"));
        }
        let raw = stream
            .grab_frame()
            .ok_or_else(|| frame_unavailable("no video frame available"))?;
        let encoder = Arc::clone(&self.encoder);
        let encoded = tokio::task::spawn_blocking(move || encoder.encode(&raw))
            .await
            .map_err(|err| encode_error(format!("encoder task failed: {err}")))??;

        let captured_at_ms = now_epoch_ms();
        let (frame, queued, evicted) = self.queue.enqueue_with(|| CapturedFrame {
            data: encoded.data,
            captured_at_ms,
            question_id: self.cursor.get(),
            content_type: encoded.content_type,
        });
        self.status.record_capture(captured_at_ms, queued);
        tracing::trace!(
            target: "capture",
            question_id = %frame.question_id,
            bytes = frame.data.len(),
            queued = queued,
            evicted = evicted,
            "frame_captured"
        );
        if evicted > 0 {
            tracing::debug!(target: "capture", evicted = evicted, "queue_overflow_evicted_oldest");
        }
        Ok(frame)
    }

    /// Runs the tick loop until `cancel` fires. The first tick lands one
    /// interval after the call; failed ticks are logged and skipped.
    pub fn spawn(
        self: Arc<Self>,
        stream: Arc<dyn VideoStream>,
        cancel: CancellationToken,
    ) -> JoinHandle<()> {
        let mut ticker = interval_at(Instant::now() + self.interval, self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        tokio::spawn(async move {
            tracing::debug!(
                target: "capture",
                interval_ms = self.interval.as_millis() as u64,
                "capture_loop_started"
            );
            loop {
                tokio::select! {
                    biased;
                    _ = cancel.cancelled() => break,
                    _ = ticker.tick() => {
                        if let Err(err) = self.capture_once(stream.as_ref()).await {
                            tracing::debug!(
                                target: "capture",
                                kind = ?err.kind,
                                error = %err,
                                "capture_tick_skipped"
                            );
                        }
                    }
                }
            }
            tracing::debug!(target: "capture", "capture_loop_stopped");
        })
    }
}
