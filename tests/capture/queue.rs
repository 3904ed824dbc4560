use std::{sync::mpsc, thread, time::Duration};

use proctor::capture::{CaptureQueue, FrameScope, QuestionCursor, SharedQueue};

use crate::support::frame;

#[test]
fn overflow_keeps_the_newest_frames_in_order() {
    let mut queue = CaptureQueue::new(3);
    let evicted: usize = (1..=5).map(|ts| queue.enqueue(frame(ts, "q1"))).sum();

    assert_eq!(evicted, 2);
    assert_eq!(queue.len(), 3);
    let stamps: Vec<i64> = queue.iter().map(|f| f.captured_at_ms).collect();
    assert_eq!(stamps, vec![3, 4, 5]);
}

#[test]
fn draining_one_question_leaves_the_others_in_order() {
    let mut queue = CaptureQueue::new(10);
    queue.enqueue(frame(1, "q1"));
    queue.enqueue(frame(2, "q2"));
    queue.enqueue(frame(3, "q1"));
    queue.enqueue(frame(4, "q2"));

    let drained = queue.drain_scope(&FrameScope::question("q1"));
    let drained_stamps: Vec<i64> = drained.iter().map(|f| f.captured_at_ms).collect();
    assert_eq!(drained_stamps, vec![1, 3]);

    let kept: Vec<i64> = queue.iter().map(|f| f.captured_at_ms).collect();
    assert_eq!(kept, vec![2, 4]);
    assert_eq!(queue.count_for("q2"), 2);
    assert_eq!(queue.count_for("q1"), 0);
}

#[test]
fn shared_queue_reports_length_after_each_operation() {
    let queue = SharedQueue::new(2);
    assert_eq!(queue.enqueue(frame(1, "q1")), (1, 0));
    assert_eq!(queue.enqueue(frame(2, "q1")), (2, 0));
    assert_eq!(queue.enqueue(frame(3, "q2")), (2, 1));

    let (drained, remaining) = queue.drain_scope(&FrameScope::question("q2"));
    assert_eq!(drained.len(), 1);
    assert_eq!(remaining, 1);
    assert_eq!(queue.snapshot()[0].captured_at_ms, 2);

    queue.clear();
    assert!(queue.is_empty());
}

#[test]
fn drain_waits_for_a_frame_being_tagged() {
    let queue = SharedQueue::new(8);
    let cursor = QuestionCursor::new("q1");
    let (tagged_tx, tagged_rx) = mpsc::channel();
    let (release_tx, release_rx) = mpsc::channel::<()>();

    let producer = {
        let queue = queue.clone();
        let cursor = cursor.clone();
        thread::spawn(move || {
            queue.enqueue_with(|| {
                let tagged = frame(1, &cursor.get());
                tagged_tx.send(()).expect("test thread is listening");
                release_rx.recv().expect("test thread releases the frame");
                tagged
            })
        })
    };
    tagged_rx.recv().expect("frame should be tagged");

    // The question moves on while the old-question frame is still in flight.
    cursor.replace("q2");
    let drainer = {
        let queue = queue.clone();
        thread::spawn(move || queue.drain_scope(&FrameScope::Question("q1".to_string())))
    };
    thread::sleep(Duration::from_millis(20));
    release_tx.send(()).expect("producer is waiting");

    let (queued, _, _) = producer.join().expect("producer should finish");
    let (drained, left) = drainer.join().expect("drainer should finish");
    assert_eq!(queued.question_id, "q1");
    assert_eq!(drained.len(), 1);
    assert_eq!(left, 0);
    assert!(queue.is_empty());
}
