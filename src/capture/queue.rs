use std::{
    collections::VecDeque,
    sync::{Arc, Mutex, MutexGuard},
};

use crate::capture::types::{CapturedFrame, FrameScope};

/// Frames in capture order, bounded by `capacity`; the oldest frame is evicted
/// first.
#[derive(Debug, Clone)]
pub struct CaptureQueue {
    capacity: usize,
    frames: VecDeque<CapturedFrame>,
}

impl CaptureQueue {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            capacity,
            frames: VecDeque::with_capacity(capacity),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    /// Appends `frame` and returns how many old frames were evicted.
    pub fn enqueue(&mut self, frame: CapturedFrame) -> usize {
        self.frames.push_back(frame);
        let mut evicted = 0;
        while self.frames.len() > self.capacity {
            self.frames.pop_front();
            evicted += 1;
        }
        evicted
    }

    /// Removes every frame matching `predicate`, keeping the order of both the
    /// drained and the remaining frames.
    pub fn drain<F>(&mut self, mut predicate: F) -> Vec<CapturedFrame>
    where
        F: FnMut(&CapturedFrame) -> bool,
    {
        let mut drained = Vec::new();
        let mut kept = VecDeque::with_capacity(self.frames.len());
        for frame in self.frames.drain(..) {
            if predicate(&frame) {
                drained.push(frame);
            } else {
                kept.push_back(frame);
            }
        }
        self.frames = kept;
        drained
    }

    pub fn drain_scope(&mut self, scope: &FrameScope) -> Vec<CapturedFrame> {
        self.drain(|frame| scope.matches(frame))
    }

    pub fn count_for(&self, question_id: &str) -> usize {
        self.frames
            .iter()
            .filter(|frame| frame.question_id == question_id)
            .count()
    }

    pub fn iter(&self) -> impl Iterator<Item = &CapturedFrame> {
        self.frames.iter()
    }

    pub fn clear(&mut self) {
        self.frames.clear();
    }
}

/// Queue handle shared by the capture loop and the upload dispatcher. The lock
/// is never held across an await point.
#[derive(Debug, Clone)]
pub struct SharedQueue {
    inner: Arc<Mutex<CaptureQueue>>,
}

impl SharedQueue {
    pub fn new(capacity: usize) -> Self {
        Self {
            inner: Arc::new(Mutex::new(CaptureQueue::new(capacity))),
        }
    }

    fn lock(&self) -> MutexGuard<'_, CaptureQueue> {
        match self.inner.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    /// Returns `(queue_len, evicted)` after the push.
    pub fn enqueue(&self, frame: CapturedFrame) -> (usize, usize) {
        let mut queue = self.lock();
        let evicted = queue.enqueue(frame);
        (queue.len(), evicted)
    }

    /// Builds the frame while holding the queue lock, so whatever `build`
    /// reads cannot go stale against a concurrent drain. Returns the frame,
    /// `queue_len` and `evicted`.
    pub fn enqueue_with(
        &self,
        build: impl FnOnce() -> CapturedFrame,
    ) -> (CapturedFrame, usize, usize) {
        let mut queue = self.lock();
        let frame = build();
        let evicted = queue.enqueue(frame.clone());
        (frame, queue.len(), evicted)
    }

    /// Returns the drained frames and the number left behind.
    pub fn drain_scope(&self, scope: &FrameScope) -> (Vec<CapturedFrame>, usize) {
        let mut queue = self.lock();
        let drained = queue.drain_scope(scope);
        (drained, queue.len())
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    pub fn count_for(&self, question_id: &str) -> usize {
        self.lock().count_for(question_id)
    }

    pub fn snapshot(&self) -> Vec<CapturedFrame> {
        self.lock().iter().cloned().collect()
    }

    pub fn clear(&self) {
        self.lock().clear();
    }
}
