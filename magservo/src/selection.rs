//! Blob selection from a cleaned foreground mask
//!
//! Components are grouped with 8-connectivity and measured by their filled
//! area (interior holes included), matching how an external outline would be
//! measured. The largest component at or above `min_area` is the target.

use ndarray::{Array2, ArrayView2};
use shared::image_proc::detection::{
    component_mask, component_stats, connected_components, fill_holes, Connectivity, AABB,
};

/// The selected blob
#[derive(Debug, Clone)]
pub struct BlobCandidate {
    /// Filled mask of the blob, cropped to `bbox`
    pub filled_mask: Array2<bool>,
    /// Bounding box of the blob in frame pixel indices
    pub bbox: AABB,
    /// Filled area in pixels
    pub area: usize,
    /// Number of components that passed the area filter
    pub survivors: usize,
}

impl BlobCandidate {
    /// Offset `(x, y)` of the crop origin in frame coordinates
    pub fn origin(&self) -> (f64, f64) {
        (self.bbox.min_col as f64, self.bbox.min_row as f64)
    }
}

/// Pick the largest blob whose filled area is at least `min_area`
///
/// Returns `None` when no component qualifies. Ties keep the component that
/// appears first in raster order.
pub fn select_largest_blob(mask: &ArrayView2<bool>, min_area: usize) -> Option<BlobCandidate> {
    let labeled = connected_components(mask, Connectivity::Eight);
    let stats = component_stats(&labeled.view());

    let mut best: Option<BlobCandidate> = None;
    let mut survivors = 0;

    for component in &stats {
        // Filling can never exceed the bounding box
        if component.bbox.width() * component.bbox.height() < min_area {
            continue;
        }
        let filled = fill_holes(&component_mask(&labeled.view(), component).view());
        let area = filled.iter().filter(|&&m| m).count();
        if area < min_area {
            continue;
        }
        survivors += 1;

        if best.as_ref().map_or(true, |b| area > b.area) {
            best = Some(BlobCandidate {
                filled_mask: filled,
                bbox: component.bbox,
                area,
                survivors: 0,
            });
        }
    }

    if survivors > 1 {
        log::debug!("{survivors} blobs passed the area filter, keeping the largest");
    }

    best.map(|mut b| {
        b.survivors = survivors;
        b
    })
}
