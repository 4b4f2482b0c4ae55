//! Image processing pipeline for blob localization.
//!
//! # Module Organization
//!
//! - **color**: RGB → HSV conversion and color-range binarization
//! - **polygon**: Polygon area, containment, and rasterization into masks
//! - **morphology**: Elliptical structuring elements, erosion/dilation, open/close
//! - **detection**: Connected components, component statistics, hole filling
//! - **centroid**: Moment centroids with distance-transform and enclosing-circle fallbacks
//!
//! All masks are `Array2<bool>` indexed `[row, col]`; all points are `(x, y)`
//! with x = column and y = row.

pub mod centroid;
pub mod color;
pub mod detection;
pub mod morphology;
pub mod polygon;

pub use centroid::{
    boundary_points, distance_transform, distance_transform_peak, mask_moments,
    min_enclosing_circle, Circle, MaskMoments,
};
pub use color::{rgb_to_hsv, threshold_hsv, threshold_hsv_within, Hsv, HsvRange};
pub use detection::{
    component_mask, component_stats, connected_components, fill_holes, ComponentStats,
    Connectivity, AABB,
};
pub use morphology::{close, dilate, ellipse_kernel, erode, open};
pub use polygon::{contains_point, fill_polygon, signed_area};
