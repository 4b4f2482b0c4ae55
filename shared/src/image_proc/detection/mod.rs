//! Blob detection on binary masks.
//!
//! # Module Organization
//!
//! - **aabb**: Axis-aligned bounding boxes for labeled regions
//! - **thresholding**: Connected component labeling, per-component statistics,
//!   and hole filling

pub mod aabb;
pub mod thresholding;

pub use aabb::AABB;
pub use thresholding::{
    component_mask, component_stats, connected_components, fill_holes, ComponentStats,
    Connectivity,
};
