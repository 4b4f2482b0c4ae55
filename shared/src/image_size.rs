//! Frame extent and pixel coordinate utilities
//!
//! Pixel coordinates follow the raster layout: origin at the top-left,
//! x (column) to the right, y (row) downward.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Frame dimensions
///
/// Uses usize for direct compatibility with ndarray indexing. Note that
/// ndarray shapes are `(rows, cols)` = `(height, width)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PixelShape {
    /// Frame width in pixels
    pub width: usize,
    /// Frame height in pixels
    pub height: usize,
}

impl PixelShape {
    pub fn new(width: usize, height: usize) -> Self {
        Self { width, height }
    }

    /// Build from an ndarray `(rows, cols)` dimension pair
    pub fn from_dim(dim: (usize, usize)) -> Self {
        Self::new(dim.1, dim.0)
    }

    /// ndarray `(rows, cols)` dimension pair
    pub fn dim(&self) -> (usize, usize) {
        (self.height, self.width)
    }

    pub fn pixel_count(&self) -> usize {
        self.width * self.height
    }

    /// Get center point as (x, y) float coordinates
    pub fn center(&self) -> (f64, f64) {
        (self.width as f64 / 2.0, self.height as f64 / 2.0)
    }

    /// Check if a pixel index is within bounds
    pub fn contains(&self, x: usize, y: usize) -> bool {
        x < self.width && y < self.height
    }

    /// Pixel whose center is nearest to a real-valued point, if it lies in the frame
    pub fn nearest_pixel(&self, x: f64, y: f64) -> Option<(usize, usize)> {
        if !x.is_finite() || !y.is_finite() {
            return None;
        }
        let (col, row) = (x.round(), y.round());
        if col < 0.0 || row < 0.0 {
            return None;
        }
        let (col, row) = (col as usize, row as usize);
        self.contains(col, row).then_some((col, row))
    }

    /// Clamp a real-valued point onto the pixel grid of this frame
    pub fn clamp_point(&self, x: f64, y: f64) -> (f64, f64) {
        let max_x = self.width.saturating_sub(1) as f64;
        let max_y = self.height.saturating_sub(1) as f64;
        (x.clamp(0.0, max_x), y.clamp(0.0, max_y))
    }
}

impl fmt::Display for PixelShape {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}
