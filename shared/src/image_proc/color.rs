//! Color space conversion and color-range segmentation
//!
//! Frames are RGB with 8-bit channels. Thresholding happens in 8-bit HSV
//! using the common machine-vision encoding: hue in `[0, 180)` (degrees
//! halved so it fits a byte), saturation and value in `[0, 255]`.

use ndarray::{Array2, ArrayView2, ArrayView3, Zip};
use serde::{Deserialize, Serialize};

/// 8-bit HSV triple
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Hsv {
    pub h: u8,
    pub s: u8,
    pub v: u8,
}

/// Convert one RGB pixel to 8-bit HSV
pub fn rgb_to_hsv(r: u8, g: u8, b: u8) -> Hsv {
    let (rf, gf, bf) = (r as f64, g as f64, b as f64);
    let v = rf.max(gf).max(bf);
    let min = rf.min(gf).min(bf);
    let delta = v - min;

    let s = if v > 0.0 { 255.0 * delta / v } else { 0.0 };

    let mut h = if delta == 0.0 {
        0.0
    } else if v == rf {
        60.0 * (gf - bf) / delta
    } else if v == gf {
        120.0 + 60.0 * (bf - rf) / delta
    } else {
        240.0 + 60.0 * (rf - gf) / delta
    };
    if h < 0.0 {
        h += 360.0;
    }

    Hsv {
        // 359.x/2 rounds to 180 which wraps to red at 0
        h: ((h / 2.0).round() as u32 % 180) as u8,
        s: s.round() as u8,
        v: v as u8,
    }
}

/// Inclusive lower/upper bound box in HSV space
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct HsvRange {
    pub lower: [u8; 3],
    pub upper: [u8; 3],
}

impl HsvRange {
    pub fn new(lower: [u8; 3], upper: [u8; 3]) -> Self {
        Self { lower, upper }
    }

    /// Dark targets: any hue or saturation, value at most 95
    pub fn dark() -> Self {
        Self::new([0, 0, 0], [180, 255, 95])
    }

    pub fn contains(&self, hsv: Hsv) -> bool {
        let px = [hsv.h, hsv.s, hsv.v];
        (0..3).all(|c| px[c] >= self.lower[c] && px[c] <= self.upper[c])
    }
}

impl Default for HsvRange {
    fn default() -> Self {
        Self::dark()
    }
}

/// Binarize an RGB frame by an HSV range
///
/// # Arguments
/// * `frame` - RGB frame with shape `(height, width, 3)`
/// * `range` - Inclusive HSV bound box
///
/// # Returns
/// Mask of shape `(height, width)` that is true where the pixel color falls in `range`
pub fn threshold_hsv(frame: &ArrayView3<u8>, range: &HsvRange) -> Array2<bool> {
    let (height, width, channels) = frame.dim();
    assert_eq!(channels, 3, "expected an RGB frame, got {channels} channels");

    Array2::from_shape_fn((height, width), |(row, col)| {
        let hsv = rgb_to_hsv(
            frame[[row, col, 0]],
            frame[[row, col, 1]],
            frame[[row, col, 2]],
        );
        range.contains(hsv)
    })
}

/// Binarize only where `within` is true; everything else is background
pub fn threshold_hsv_within(
    frame: &ArrayView3<u8>,
    range: &HsvRange,
    within: &ArrayView2<bool>,
) -> Array2<bool> {
    let (height, width, _) = frame.dim();
    assert_eq!(
        within.dim(),
        (height, width),
        "region mask does not match frame extent"
    );

    let mut mask = Array2::from_elem((height, width), false);
    Zip::indexed(&mut mask)
        .and(within)
        .for_each(|(row, col), out, &inside| {
            if inside {
                let hsv = rgb_to_hsv(
                    frame[[row, col, 0]],
                    frame[[row, col, 1]],
                    frame[[row, col, 2]],
                );
                *out = range.contains(hsv);
            }
        });
    mask
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::Array3;

    #[test]
    fn test_primary_colors() {
        assert_eq!(rgb_to_hsv(255, 0, 0), Hsv { h: 0, s: 255, v: 255 });
        assert_eq!(rgb_to_hsv(0, 255, 0), Hsv { h: 60, s: 255, v: 255 });
        assert_eq!(rgb_to_hsv(0, 0, 255), Hsv { h: 120, s: 255, v: 255 });
    }

    #[test]
    fn test_grays_have_no_hue_or_saturation() {
        assert_eq!(rgb_to_hsv(0, 0, 0), Hsv { h: 0, s: 0, v: 0 });
        assert_eq!(rgb_to_hsv(128, 128, 128), Hsv { h: 0, s: 0, v: 128 });
    }

    #[test]
    fn test_hue_near_360_wraps() {
        // Hue just below 360 degrees
        let hsv = rgb_to_hsv(255, 0, 1);
        assert_eq!(hsv.h, 0);
    }

    #[test]
    fn test_dark_range() {
        let range = HsvRange::dark();
        assert!(range.contains(rgb_to_hsv(20, 20, 20)));
        assert!(range.contains(rgb_to_hsv(95, 10, 40)));
        assert!(!range.contains(rgb_to_hsv(96, 96, 96)));
        assert!(!range.contains(rgb_to_hsv(230, 230, 230)));
    }

    #[test]
    fn test_threshold_hsv_marks_dark_pixels() {
        let mut frame = Array3::from_elem((3, 4, 3), 220u8);
        for c in 0..3 {
            frame[[1, 2, c]] = 10;
        }
        let mask = threshold_hsv(&frame.view(), &HsvRange::dark());
        assert_eq!(mask.iter().filter(|&&m| m).count(), 1);
        assert!(mask[[1, 2]]);
    }

    #[test]
    fn test_threshold_within_excludes_outside() {
        let frame = Array3::zeros((2, 2, 3));
        let mut within = Array2::from_elem((2, 2), false);
        within[[0, 1]] = true;
        let mask = threshold_hsv_within(&frame.view(), &HsvRange::dark(), &within.view());
        assert_eq!(mask, within);
    }
}
