use std::sync::Arc;

use tokio::{sync::Mutex, task::JoinHandle};
use tokio_util::sync::CancellationToken;

use crate::capture::{
    dispatcher::{BatchSink, UploadDispatcher},
    engine::FrameCaptureEngine,
    error::{CaptureError, invalid_state, restart_required},
    queue::SharedQueue,
    source::{FrameEncoder, MediaDevice, StreamConstraints, VideoStream},
    status::StatusBoard,
    types::{
        CaptureConfig, FrameScope, QuestionCursor, SessionIdentity, StatusSnapshot, UploadOutcome,
    },
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Visibility {
    Visible,
    Hidden,
}

struct LoopTask {
    cancel: CancellationToken,
    handle: JoinHandle<()>,
}

impl LoopTask {
    async fn halt(self, name: &'static str) {
        self.cancel.cancel();
        if let Err(err) = self.handle.await {
            tracing::warn!(target: "capture", task = name, error = %err, "loop_task_join_failed");
        }
    }
}

#[derive(Default)]
struct ControllerRuntime {
    stream: Option<Arc<dyn VideoStream>>,
    capture: Option<LoopTask>,
    flush: Option<LoopTask>,
    paused_by_visibility: bool,
    torn_down: bool,
}

/// Owns one monitoring session: the device stream, the capture loop, the
/// optional periodic flush and the upload dispatcher.
pub struct CaptureController {
    config: CaptureConfig,
    device: Arc<dyn MediaDevice>,
    engine: Arc<FrameCaptureEngine>,
    dispatcher: Arc<UploadDispatcher>,
    cursor: QuestionCursor,
    queue: SharedQueue,
    status: StatusBoard,
    runtime: Mutex<ControllerRuntime>,
    lifetime: CancellationToken,
}

impl CaptureController {
    pub fn new(
        session: SessionIdentity,
        initial_question_id: impl Into<String>,
        config: CaptureConfig,
        device: Arc<dyn MediaDevice>,
        encoder: Arc<dyn FrameEncoder>,
        sink: Arc<dyn BatchSink>,
    ) -> Self {
        let queue = SharedQueue::new(config.queue_capacity);
        let cursor = QuestionCursor::new(initial_question_id);
        let status = StatusBoard::new();
        let engine = Arc::new(FrameCaptureEngine::new(
            queue.clone(),
            cursor.clone(),
            encoder,
            status.clone(),
            config.interval(),
        ));
        let dispatcher = Arc::new(UploadDispatcher::new(
            session,
            queue.clone(),
            status.clone(),
            sink,
        ));

        Self {
            config,
            device,
            engine,
            dispatcher,
            cursor,
            queue,
            status,
            runtime: Mutex::new(ControllerRuntime::default()),
            lifetime: CancellationToken::new(),
        }
    }

    pub fn session(&self) -> &SessionIdentity {
        self.dispatcher.session()
    }

    pub fn current_question(&self) -> String {
        self.cursor.get()
    }

    pub fn status(&self) -> StatusSnapshot {
        self.status.snapshot()
    }

    pub fn frames_queued(&self) -> usize {
        self.queue.len()
    }

    pub async fn is_capturing(&self) -> bool {
        self.runtime.lock().await.capture.is_some()
    }

    /// Arms capture, acquiring the camera when no live stream is held. Calling
    /// it while already capturing is a no-op.
    pub async fn start(&self) -> Result<(), CaptureError> {
        let mut runtime = self.runtime.lock().await;
        if runtime.torn_down {
            return Err(invalid_state("capture session has been shut down"));
        }
        if self.status.device_failed() {
            return Err(restart_required(
                "camera access failed; restart capture to try again",
            ));
        }
        runtime.paused_by_visibility = false;
        self.arm(&mut runtime).await
    }

    /// Halts the capture loop and keeps the stream for a later `start`.
    pub async fn stop(&self) {
        let mut runtime = self.runtime.lock().await;
        runtime.paused_by_visibility = false;
        self.disarm(&mut runtime).await;
    }

    pub async fn set_visibility(&self, visibility: Visibility) -> Result<(), CaptureError> {
        let mut runtime = self.runtime.lock().await;
        if runtime.torn_down {
            return Ok(());
        }

        match visibility {
            Visibility::Hidden => {
                if runtime.capture.is_some() {
                    self.disarm(&mut runtime).await;
                    runtime.paused_by_visibility = true;
                    tracing::debug!(target: "capture", "capture_paused_hidden");
                }
                Ok(())
            }
            Visibility::Visible => {
                if !runtime.paused_by_visibility {
                    return Ok(());
                }
                runtime.paused_by_visibility = false;
                tracing::debug!(target: "capture", "capture_resumed_visible");
                self.arm(&mut runtime).await
            }
        }
    }

    /// Points capture at `question_id`, then uploads the frames of the
    /// question that was on screen before.
    pub async fn on_question_change(
        &self,
        question_id: impl Into<String>,
    ) -> Result<UploadOutcome, CaptureError> {
        let question_id = question_id.into();
        let previous = self.cursor.replace(question_id.clone());
        if previous == question_id {
            return Ok(UploadOutcome::Empty);
        }
        tracing::debug!(
            target: "capture",
            previous = %previous,
            current = %question_id,
            "question_changed"
        );
        self.dispatcher.flush(FrameScope::Question(previous)).await
    }

    pub async fn flush(&self, scope: FrameScope) -> Result<UploadOutcome, CaptureError> {
        self.dispatcher.flush(scope).await
    }

    /// Leaves the error state: drops the held stream, clears the error and
    /// starts over with a fresh device acquisition.
    pub async fn restart(&self) -> Result<(), CaptureError> {
        let mut runtime = self.runtime.lock().await;
        if runtime.torn_down {
            return Err(invalid_state("capture session has been shut down"));
        }
        if let Some(task) = runtime.capture.take() {
            task.halt("capture").await;
        }
        if let Some(stream) = runtime.stream.take() {
            stream.stop();
        }
        runtime.paused_by_visibility = false;
        self.status.clear_error();
        tracing::info!(target: "capture", "capture_restart_requested");
        self.arm(&mut runtime).await
    }

    /// Tears the session down. Queued frames are discarded; an upload already
    /// in flight runs to completion.
    pub async fn shutdown(&self) {
        let mut runtime = self.runtime.lock().await;
        if runtime.torn_down {
            return;
        }
        runtime.torn_down = true;
        runtime.paused_by_visibility = false;

        if let Some(task) = runtime.capture.take() {
            task.halt("capture").await;
        }
        if let Some(task) = runtime.flush.take() {
            task.halt("flush").await;
        }
        if let Some(stream) = runtime.stream.take() {
            stream.stop();
        }
        self.lifetime.cancel();

        let discarded = self.queue.len();
        self.queue.clear();
        self.status.reset();
        tracing::info!(
            target: "capture",
            session_id = %self.session().session_id,
            frames_discarded = discarded,
            "capture_session_shut_down"
        );
    }

    async fn arm(&self, runtime: &mut ControllerRuntime) -> Result<(), CaptureError> {
        if runtime.capture.is_some() {
            return Ok(());
        }

        let stream = match runtime.stream.as_ref().filter(|stream| stream.is_live()) {
            Some(stream) => stream.clone(),
            None => {
                let stream = self.acquire_stream().await?;
                runtime.stream = Some(stream.clone());
                stream
            }
        };

        let cancel = self.lifetime.child_token();
        let handle = self.engine.clone().spawn(stream, cancel.clone());
        runtime.capture = Some(LoopTask { cancel, handle });

        if runtime.flush.is_none() {
            if let Some(period) = self.config.flush_interval() {
                let cancel = self.lifetime.child_token();
                let handle = self.dispatcher.clone().spawn_periodic(period, cancel.clone());
                runtime.flush = Some(LoopTask { cancel, handle });
            }
        }

        self.status.mark_capturing();
        tracing::info!(
            target: "capture",
            session_id = %self.session().session_id,
            interval_ms = self.config.interval_ms,
            "capture_started"
        );
        Ok(())
    }

    async fn disarm(&self, runtime: &mut ControllerRuntime) {
        if let Some(task) = runtime.capture.take() {
            task.halt("capture").await;
            tracing::info!(target: "capture", "capture_stopped");
        }
        self.status.mark_stopped();
    }

    async fn acquire_stream(&self) -> Result<Arc<dyn VideoStream>, CaptureError> {
        let constraints = StreamConstraints {
            width: self.config.frame_width,
            height: self.config.frame_height,
            facing_user: true,
        };
        match self.device.acquire(&constraints).await {
            Ok(stream) => Ok(stream),
            Err(err) => {
                self.status.fail_device(&err);
                tracing::warn!(target: "capture", error = %err, "camera_acquire_failed");
                Err(err)
            }
        }
    }
}

impl Drop for CaptureController {
    fn drop(&mut self) {
        self.lifetime.cancel();
    }
}
