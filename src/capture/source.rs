use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use image::{ExtendedColorType, codecs::jpeg::JpegEncoder};

use crate::capture::error::{CaptureError, encode_error};

/// Uncompressed RGB8 frame grabbed from a live stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawFrame {
    pub width: u32,
    pub height: u32,
    pub rgb: Vec<u8>,
}

impl RawFrame {
    pub fn expected_len(width: u32, height: u32) -> usize {
        width as usize * height as usize * 3
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamConstraints {
    pub width: u32,
    pub height: u32,
    pub facing_user: bool,
}

/// A live camera stream. `stop` ends every track; a stopped stream is no
/// longer live and yields no frames.
pub trait VideoStream: Send + Sync {
    fn grab_frame(&self) -> Option<RawFrame>;
    fn is_live(&self) -> bool;
    fn stop(&self);
}

#[async_trait]
pub trait MediaDevice: Send + Sync {
    async fn acquire(
        &self,
        constraints: &StreamConstraints,
    ) -> Result<Arc<dyn VideoStream>, CaptureError>;
}

#[derive(Debug, Clone, PartialEq)]
pub struct EncodedImage {
    pub data: Bytes,
    pub content_type: String,
}

pub trait FrameEncoder: Send + Sync {
    fn encode(&self, frame: &RawFrame) -> Result<EncodedImage, CaptureError>;
}

#[derive(Debug, Clone, Copy)]
pub struct JpegFrameEncoder {
    quality: u8,
}

impl JpegFrameEncoder {
    pub fn new(quality: u8) -> Self {
        Self {
            quality: quality.clamp(1, 100),
        }
    }

    pub fn quality(&self) -> u8 {
        self.quality
    }
}

impl FrameEncoder for JpegFrameEncoder {
    fn encode(&self, frame: &RawFrame) -> Result<EncodedImage, CaptureError> {
        if frame.width == 0 || frame.height == 0 {
            return Err(encode_error("frame has zero dimensions"));
        }
        let expected = RawFrame::expected_len(frame.width, frame.height);
        if frame.rgb.len() != expected {
            return Err(encode_error(format!(
                "frame buffer holds {} bytes, expected {} for {}x{} rgb",
                frame.rgb.len(),
                expected,
                frame.width,
                frame.height
            )));
        }

        let mut buffer = Vec::new();
        {
            let mut encoder = JpegEncoder::new_with_quality(&mut buffer, self.quality);
            encoder
                .encode(&frame.rgb, frame.width, frame.height, ExtendedColorType::Rgb8)
                .map_err(|err| encode_error(format!("jpeg encoding failed: {err}")))?;
        }

        Ok(EncodedImage {
            data: Bytes::from(buffer),
            content_type: "image/jpeg".to_string(),
        })
    }
}
