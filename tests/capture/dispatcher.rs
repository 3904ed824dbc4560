use std::{sync::Arc, time::Duration};

use proctor::capture::{
    CaptureErrorKind, CaptureStatus, FrameScope, SharedQueue, StatusBoard, UploadDispatcher,
    UploadOutcome,
};
use tokio_util::sync::CancellationToken;

use crate::support::{RecordingSink, frame, session};

fn dispatcher(queue: &SharedQueue, status: &StatusBoard, sink: Arc<RecordingSink>) -> Arc<UploadDispatcher> {
    Arc::new(UploadDispatcher::new(session(), queue.clone(), status.clone(), sink))
}

#[tokio::test]
async fn empty_flush_does_not_call_the_sink() {
    let queue = SharedQueue::new(60);
    let status = StatusBoard::new();
    let sink = Arc::new(RecordingSink::default());

    let outcome = dispatcher(&queue, &status, sink.clone())
        .flush(FrameScope::All)
        .await
        .expect("empty flush succeeds");

    assert_eq!(outcome, UploadOutcome::Empty);
    assert_eq!(sink.calls(), 0);
    assert_eq!(status.status(), CaptureStatus::Idle);
}

#[tokio::test]
async fn question_flush_sends_only_that_question() {
    let queue = SharedQueue::new(60);
    let status = StatusBoard::new();
    let sink = Arc::new(RecordingSink::default());
    queue.enqueue(frame(1, "q1"));
    queue.enqueue(frame(2, "q2"));
    queue.enqueue(frame(3, "q1"));

    let outcome = dispatcher(&queue, &status, sink.clone())
        .flush(FrameScope::question("q1"))
        .await
        .expect("upload should succeed");

    assert_eq!(outcome.frames(), 2);
    let batches = sink.batches();
    assert_eq!(batches.len(), 1);
    assert_eq!(batches[0].scope, FrameScope::question("q1"));
    let stamps: Vec<i64> = batches[0].frames.iter().map(|f| f.captured_at_ms).collect();
    assert_eq!(stamps, vec![1, 3]);
    assert_eq!(queue.len(), 1);
    assert_eq!(status.snapshot().frames_queued, 1);
}

#[tokio::test]
async fn failed_batch_is_dropped_and_reported() {
    let queue = SharedQueue::new(60);
    let status = StatusBoard::new();
    status.mark_capturing();
    let sink = Arc::new(RecordingSink::failing());
    for ts in 1..=3 {
        queue.enqueue(frame(ts, "q1"));
    }

    let err = dispatcher(&queue, &status, sink.clone())
        .flush(FrameScope::All)
        .await
        .expect_err("sink failure should surface");

    assert_eq!(err.kind, CaptureErrorKind::Upload);
    assert_eq!(err.dropped_frames, 3);
    assert_eq!(err.http_status, Some(503));
    assert!(queue.is_empty(), "failed frames are not re-enqueued");

    let snapshot = status.snapshot();
    assert_eq!(snapshot.status, CaptureStatus::Error);
    assert!(snapshot.is_capturing, "capture keeps running after an upload failure");
    assert!(
        snapshot
            .last_error
            .as_deref()
            .is_some_and(|message| message.contains("unreachable"))
    );
}

#[tokio::test(start_paused = true)]
async fn concurrent_flushes_run_one_at_a_time() {
    let queue = SharedQueue::new(60);
    let status = StatusBoard::new();
    let sink = Arc::new(RecordingSink::slow(Duration::from_millis(200)));
    for ts in 1..=4 {
        queue.enqueue(frame(ts, "q1"));
    }
    let dispatcher = dispatcher(&queue, &status, sink.clone());

    let (first, second) = tokio::join!(
        dispatcher.flush(FrameScope::All),
        dispatcher.flush(FrameScope::All)
    );

    let mut delivered = vec![
        first.expect("first flush").frames(),
        second.expect("second flush").frames(),
    ];
    delivered.sort_unstable();
    assert_eq!(delivered, vec![0, 4]);
    assert_eq!(sink.calls(), 1);
    assert_eq!(sink.max_in_flight(), 1);
}

#[tokio::test(start_paused = true)]
async fn uploading_status_settles_back_to_capturing() {
    let queue = SharedQueue::new(60);
    let status = StatusBoard::new();
    status.mark_capturing();
    let sink = Arc::new(RecordingSink::slow(Duration::from_millis(300)));
    queue.enqueue(frame(1, "q1"));
    let dispatcher = dispatcher(&queue, &status, sink.clone());

    let upload = tokio::spawn({
        let dispatcher = dispatcher.clone();
        async move { dispatcher.flush(FrameScope::All).await }
    });
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(status.status(), CaptureStatus::Uploading);

    upload
        .await
        .expect("upload task should join")
        .expect("upload should succeed");
    assert_eq!(status.status(), CaptureStatus::Capturing);
}

#[tokio::test(start_paused = true)]
async fn periodic_flush_uploads_on_each_period() {
    let queue = SharedQueue::new(60);
    let status = StatusBoard::new();
    let sink = Arc::new(RecordingSink::default());
    let dispatcher = dispatcher(&queue, &status, sink.clone());
    let cancel = CancellationToken::new();

    queue.enqueue(frame(1, "q1"));
    let handle = dispatcher.spawn_periodic(Duration::from_millis(1_000), cancel.clone());
    tokio::time::sleep(Duration::from_millis(1_500)).await;
    assert_eq!(sink.calls(), 1);

    queue.enqueue(frame(2, "q2"));
    tokio::time::sleep(Duration::from_millis(1_000)).await;
    assert_eq!(sink.calls(), 2);

    tokio::time::sleep(Duration::from_millis(1_000)).await;
    assert_eq!(sink.calls(), 2, "empty periods do not reach the sink");

    cancel.cancel();
    handle.await.expect("flush loop should exit cleanly");
}
