pub mod dispatcher;
pub mod engine;
pub mod error;
pub mod lifecycle;
pub mod queue;
pub mod sink;
pub mod source;
pub mod status;
pub mod types;

pub use dispatcher::{BatchSink, UploadBatch, UploadDispatcher};
pub use engine::FrameCaptureEngine;
pub use error::{CaptureError, CaptureErrorKind};
pub use lifecycle::{CaptureController, Visibility};
pub use queue::{CaptureQueue, SharedQueue};
pub use sink::{EyeDataSink, WebcamSink};
pub use source::{
    EncodedImage, FrameEncoder, JpegFrameEncoder, MediaDevice, RawFrame, StreamConstraints,
    VideoStream,
};
pub use status::StatusBoard;
pub use types::{
    CaptureConfig, CaptureStatus, CapturedFrame, FrameScope, QuestionCursor, SessionIdentity,
    StatusSnapshot, UploadOutcome,
};
