//! Object localization inside the workspace region
//!
//! Per frame: HSV thresholding restricted to the region mask, morphological
//! opening then closing, largest-blob selection, and a centroid estimate.
//! An optional constant-velocity filter smooths the raw centroid across
//! frames.

use crate::config::LocalizerConfig;
use crate::region::{PixelPoint, WorkspaceRegion};
use crate::selection::select_largest_blob;
use ndarray::{Array2, ArrayView2, ArrayView3};
use serde::{Deserialize, Serialize};
use servo_math::ConstantVelocityFilter;
use shared::image_proc::{
    boundary_points, close, distance_transform_peak, ellipse_kernel, mask_moments,
    min_enclosing_circle, open, threshold_hsv_within, AABB,
};
use shared::image_size::PixelShape;

/// How a blob center was obtained
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum CentroidMethod {
    /// First raw moments of the filled blob mask
    #[default]
    Moments,
    /// Peak of the distance transform (deepest interior point)
    DistancePeak,
    /// Center of the minimal enclosing circle
    EnclosingCircle,
}

impl CentroidMethod {
    /// This method followed by the remaining ones in fallback order
    fn chain(self) -> [CentroidMethod; 3] {
        use CentroidMethod::*;
        match self {
            Moments => [Moments, DistancePeak, EnclosingCircle],
            DistancePeak => [DistancePeak, Moments, EnclosingCircle],
            EnclosingCircle => [EnclosingCircle, Moments, DistancePeak],
        }
    }

    fn estimate(self, mask: &ArrayView2<bool>) -> Option<(f64, f64)> {
        match self {
            CentroidMethod::Moments => mask_moments(mask).centroid(),
            CentroidMethod::DistancePeak => distance_transform_peak(mask),
            CentroidMethod::EnclosingCircle => {
                min_enclosing_circle(&boundary_points(mask)).map(|c| (c.x, c.y))
            }
        }
    }
}

/// Center of a blob mask, trying `preferred` first and then the other methods
///
/// Returns the center in mask coordinates and the method that produced it.
pub fn blob_center(
    mask: &ArrayView2<bool>,
    preferred: CentroidMethod,
) -> Option<((f64, f64), CentroidMethod)> {
    preferred.chain().into_iter().find_map(|method| {
        let center = method.estimate(mask);
        if center.is_none() {
            log::debug!("{method:?} centroid unavailable, falling back");
        }
        center.map(|c| (c, method))
    })
}

/// Raw (unsmoothed) detection of the target blob
#[derive(Debug, Clone, PartialEq)]
pub struct Detection {
    /// Blob center in frame pixel coordinates
    pub position: PixelPoint,
    /// Method that produced `position`
    pub method: CentroidMethod,
    /// Filled blob area in pixels
    pub area: usize,
    /// Blob bounding box
    pub bbox: AABB,
    /// Number of blobs that passed the area filter
    pub candidates: usize,
}

/// Per-frame localizer output
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TrackedPosition {
    /// The target was found; smoothed if smoothing is enabled
    Detected { x: f64, y: f64 },
    /// No qualifying blob this frame, with the filter's prediction if one exists
    Lost { predicted: Option<PixelPoint> },
}

impl TrackedPosition {
    pub fn is_valid(&self) -> bool {
        matches!(self, TrackedPosition::Detected { .. })
    }

    /// Position usable for control, `None` when the target was not detected
    pub fn position(&self) -> Option<PixelPoint> {
        match *self {
            TrackedPosition::Detected { x, y } => Some(PixelPoint::new(x, y)),
            TrackedPosition::Lost { .. } => None,
        }
    }
}

/// Thresholding, cleanup, blob selection, and optional smoothing
pub struct ObjectLocalizer {
    config: LocalizerConfig,
    open_kernel: Array2<bool>,
    close_kernel: Array2<bool>,
    filter: Option<ConstantVelocityFilter>,
}

impl ObjectLocalizer {
    pub fn new(config: LocalizerConfig) -> Self {
        let open_kernel = ellipse_kernel(config.open_kernel_size);
        let close_kernel = ellipse_kernel(config.close_kernel_size);
        let filter = config.smoothing.map(ConstantVelocityFilter::new);
        Self {
            config,
            open_kernel,
            close_kernel,
            filter,
        }
    }

    pub fn config(&self) -> &LocalizerConfig {
        &self.config
    }

    /// Forget the smoothing state; the next detection re-seeds the filter
    pub fn reset_smoothing(&mut self) {
        if let Some(filter) = self.filter.as_mut() {
            filter.reset();
        }
    }

    /// Thresholded, region-restricted and cleaned foreground mask
    ///
    /// Returns `None` if the frame extent does not match the region.
    pub fn foreground_mask(
        &self,
        frame: &ArrayView3<u8>,
        region: &WorkspaceRegion,
    ) -> Option<Array2<bool>> {
        let (height, width, channels) = frame.dim();
        if channels != 3 || PixelShape::new(width, height) != region.frame_shape() {
            log::warn!(
                "Frame {}x{}x{} does not match region frame {}",
                width,
                height,
                channels,
                region.frame_shape()
            );
            return None;
        }

        let raw = threshold_hsv_within(frame, &self.config.target_range, &region.mask());
        let opened = open(&raw.view(), &self.open_kernel.view());
        Some(close(&opened.view(), &self.close_kernel.view()))
    }

    /// Find the target blob without smoothing
    pub fn detect(&self, frame: &ArrayView3<u8>, region: &WorkspaceRegion) -> Option<Detection> {
        let cleaned = self.foreground_mask(frame, region)?;
        let blob = select_largest_blob(&cleaned.view(), self.config.min_area)?;
        let ((cx, cy), method) = blob_center(&blob.filled_mask.view(), self.config.centroid_method)?;
        let (ox, oy) = blob.origin();

        Some(Detection {
            position: PixelPoint::new(cx + ox, cy + oy),
            method,
            area: blob.area,
            bbox: blob.bbox,
            candidates: blob.survivors,
        })
    }

    /// Locate the target in a frame
    ///
    /// With smoothing enabled, a detection corrects the filter and the
    /// filtered position is returned; a miss advances the filter and the
    /// prediction is reported inside [`TrackedPosition::Lost`].
    pub fn locate(&mut self, frame: &ArrayView3<u8>, region: &WorkspaceRegion) -> TrackedPosition {
        let detection = self.detect(frame, region);

        match (detection, self.filter.as_mut()) {
            (Some(d), None) => TrackedPosition::Detected {
                x: d.position.x,
                y: d.position.y,
            },
            (Some(d), Some(filter)) => {
                let (x, y) = filter.update(d.position.x, d.position.y);
                TrackedPosition::Detected { x, y }
            }
            (None, None) => TrackedPosition::Lost { predicted: None },
            (None, Some(filter)) => TrackedPosition::Lost {
                predicted: filter.predict().map(PixelPoint::from),
            },
        }
    }
}
