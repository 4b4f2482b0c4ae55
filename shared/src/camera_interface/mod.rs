//! Frame source abstraction for the servo loop
//!
//! Provides a unified interface for frame acquisition that can be backed by
//! a simulated rig (for testing) or a real camera driver (for production).
//! The control core only ever consumes [`Frame`]s; it never opens or owns a
//! camera.

pub mod mock;

use crate::image_size::PixelShape;
use ndarray::{Array3, ArrayView3};
use std::fmt;
use std::time::Duration;
use thiserror::Error;

pub use mock::MockFrameSource;

/// Timestamp structure aligned with V4L2 format
/// Represents time as seconds and nanoseconds since an epoch
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
pub struct Timestamp {
    /// Seconds component
    pub seconds: u64,
    /// Nanoseconds component (0-999,999,999)
    pub nanos: u64,
}

impl Timestamp {
    pub fn new(seconds: u64, nanos: u64) -> Self {
        Self { seconds, nanos }
    }

    /// Create a timestamp from a Duration since epoch
    pub fn from_duration(duration: Duration) -> Self {
        let total_nanos = duration.as_nanos();
        let seconds = (total_nanos / 1_000_000_000) as u64;
        let nanos = (total_nanos % 1_000_000_000) as u64;
        Self { seconds, nanos }
    }

    pub fn to_duration(&self) -> Duration {
        Duration::new(self.seconds, self.nanos as u32)
    }

    /// Seconds since epoch as a float, the clock used by the controllers
    pub fn as_secs_f64(&self) -> f64 {
        self.seconds as f64 + self.nanos as f64 * 1e-9
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}.{:09}", self.seconds, self.nanos)
    }
}

/// Error type for frame acquisition
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CameraError {
    /// Driver failed to deliver a frame
    #[error("capture error: {0}")]
    CaptureError(String),
    /// Source has no more frames to deliver
    #[error("end of stream after {frames_delivered} frames")]
    EndOfStream { frames_delivered: u64 },
    /// Source was released and can no longer be read
    #[error("frame source has been released")]
    Released,
}

/// Result type for camera operations
pub type CameraResult<T> = Result<T, CameraError>;

/// Metadata returned with each frame
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameMetadata {
    /// Frame sequence number
    pub frame_number: u64,
    /// Timestamp when frame was captured
    pub timestamp: Timestamp,
}

/// An RGB frame with shape `(height, width, 3)`
#[derive(Debug, Clone)]
pub struct Frame {
    pub data: Array3<u8>,
    pub metadata: FrameMetadata,
}

impl Frame {
    pub fn new(data: Array3<u8>, metadata: FrameMetadata) -> Self {
        Self { data, metadata }
    }

    /// Frame of a single solid color
    pub fn filled(shape: PixelShape, rgb: [u8; 3], metadata: FrameMetadata) -> Self {
        let data = Array3::from_shape_fn((shape.height, shape.width, 3), |(_, _, c)| rgb[c]);
        Self::new(data, metadata)
    }

    pub fn view(&self) -> ArrayView3<'_, u8> {
        self.data.view()
    }

    pub fn shape(&self) -> PixelShape {
        let (height, width, _) = self.data.dim();
        PixelShape::new(width, height)
    }

    pub fn timestamp(&self) -> Timestamp {
        self.metadata.timestamp
    }
}

/// Trait for frame acquisition
///
/// Mirrors a typical capture driver: frames are read on demand, the frame
/// extent is fixed for the lifetime of the source, and `release` frees the
/// underlying device. Reading after `release` must fail.
pub trait FrameSource {
    /// Read the next frame
    fn read(&mut self) -> CameraResult<Frame>;

    /// Fixed frame extent of this source
    fn frame_size(&self) -> PixelShape;

    /// Release the underlying device
    fn release(&mut self);
}
