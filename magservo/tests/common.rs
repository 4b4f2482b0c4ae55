//! Common utilities for magservo tests

#![allow(dead_code)]

use ndarray::Array3;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use shared::camera_interface::{Frame, FrameMetadata, Timestamp};
use shared::image_size::PixelShape;
use std::time::Duration;

/// Dark filled ellipse standing in for the tracked magnet
#[derive(Debug, Clone)]
pub struct BlobParams {
    pub x: f64,
    pub y: f64,
    pub radius_x: f64,
    pub radius_y: f64,
}

impl BlobParams {
    /// Circular blob
    pub fn disk(x: f64, y: f64, radius: f64) -> Self {
        Self {
            x,
            y,
            radius_x: radius,
            radius_y: radius,
        }
    }

    pub fn ellipse(x: f64, y: f64, radius_x: f64, radius_y: f64) -> Self {
        Self {
            x,
            y,
            radius_x,
            radius_y,
        }
    }

    fn covers(&self, col: usize, row: usize) -> bool {
        let dx = (col as f64 - self.x) / self.radius_x;
        let dy = (row as f64 - self.y) / self.radius_y;
        dx * dx + dy * dy <= 1.0
    }
}

/// Configuration for synthetic scene generation
#[derive(Debug, Clone)]
pub struct SceneConfig {
    pub width: usize,
    pub height: usize,
    /// Background brightness (gray level)
    pub background: u8,
    /// Blob brightness (gray level)
    pub foreground: u8,
    /// Fraction of pixels flipped to foreground color as salt noise
    pub speckle_fraction: f64,
    pub seed: u64,
}

impl Default for SceneConfig {
    fn default() -> Self {
        Self {
            width: 500,
            height: 500,
            background: 210,
            foreground: 30,
            speckle_fraction: 0.0,
            seed: 42,
        }
    }
}

impl SceneConfig {
    pub fn shape(&self) -> PixelShape {
        PixelShape::new(self.width, self.height)
    }
}

/// Render a light scene with dark blobs into an RGB raster
pub fn create_scene(config: &SceneConfig, blobs: &[BlobParams]) -> Array3<u8> {
    let mut image = Array3::from_elem((config.height, config.width, 3), config.background);

    for blob in blobs {
        let row_min = (blob.y - blob.radius_y).floor().max(0.0) as usize;
        let row_max = ((blob.y + blob.radius_y).ceil() as usize + 1).min(config.height);
        let col_min = (blob.x - blob.radius_x).floor().max(0.0) as usize;
        let col_max = ((blob.x + blob.radius_x).ceil() as usize + 1).min(config.width);
        for row in row_min..row_max {
            for col in col_min..col_max {
                if blob.covers(col, row) {
                    for c in 0..3 {
                        image[[row, col, c]] = config.foreground;
                    }
                }
            }
        }
    }

    if config.speckle_fraction > 0.0 {
        let mut rng = ChaCha8Rng::seed_from_u64(config.seed);
        for row in 0..config.height {
            for col in 0..config.width {
                if rng.gen_bool(config.speckle_fraction) {
                    for c in 0..3 {
                        image[[row, col, c]] = config.foreground;
                    }
                }
            }
        }
    }

    image
}

/// Frame metadata for the `n`th frame at a fixed interval
pub fn metadata(frame_number: u64, interval: Duration) -> FrameMetadata {
    FrameMetadata {
        frame_number,
        timestamp: Timestamp::from_duration(interval * frame_number as u32),
    }
}

/// Scene wrapped as the `n`th frame of a 30 fps stream
pub fn scene_frame(config: &SceneConfig, blobs: &[BlobParams], frame_number: u64) -> Frame {
    Frame::new(
        create_scene(config, blobs),
        metadata(frame_number, Duration::from_micros(33_333)),
    )
}
