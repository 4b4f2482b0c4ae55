use super::{
    CameraError, CameraResult, Frame, FrameMetadata, FrameSource, PixelShape, Timestamp,
};
use ndarray::Array3;
use std::time::Duration;

/// Frame source replaying a fixed list of frames at a fixed interval
///
/// A single frame is repeated forever; longer lists play once and then
/// report [`CameraError::EndOfStream`].
pub struct MockFrameSource {
    shape: PixelShape,
    frames: Vec<Array3<u8>>,
    frame_index: usize,
    frame_count: u64,
    frame_interval: Duration,
    elapsed_time: Duration,
    released: bool,
}

impl MockFrameSource {
    pub fn new(frames: Vec<Array3<u8>>, frame_interval: Duration) -> Self {
        let shape = frames
            .first()
            .map(|f| {
                let (height, width, _) = f.dim();
                PixelShape::new(width, height)
            })
            .unwrap_or(PixelShape::new(0, 0));
        Self {
            shape,
            frames,
            frame_index: 0,
            frame_count: 0,
            frame_interval,
            elapsed_time: Duration::ZERO,
            released: false,
        }
    }

    pub fn new_repeating(frame: Array3<u8>, frame_interval: Duration) -> Self {
        Self::new(vec![frame], frame_interval)
    }

    pub fn reset(&mut self) {
        self.frame_index = 0;
        self.frame_count = 0;
        self.elapsed_time = Duration::ZERO;
    }

    pub fn frames_delivered(&self) -> u64 {
        self.frame_count
    }

    fn next_frame(&mut self) -> CameraResult<Array3<u8>> {
        let frame_idx = if self.frames.len() == 1 {
            0
        } else {
            if self.frame_index >= self.frames.len() {
                return Err(CameraError::EndOfStream {
                    frames_delivered: self.frame_count,
                });
            }
            let current = self.frame_index;
            self.frame_index += 1;
            current
        };
        Ok(self.frames[frame_idx].clone())
    }
}

impl FrameSource for MockFrameSource {
    fn read(&mut self) -> CameraResult<Frame> {
        if self.released {
            return Err(CameraError::Released);
        }
        let data = self.next_frame()?;
        let metadata = FrameMetadata {
            frame_number: self.frame_count,
            timestamp: Timestamp::from_duration(self.elapsed_time),
        };
        self.frame_count += 1;
        self.elapsed_time += self.frame_interval;
        Ok(Frame::new(data, metadata))
    }

    fn frame_size(&self) -> PixelShape {
        self.shape
    }

    fn release(&mut self) {
        log::debug!("Releasing mock frame source after {} frames", self.frame_count);
        self.released = true;
    }
}
