//! Operator-defined workspace region
//!
//! A [`WorkspaceRegion`] is an ordered polygon plus its rasterized mask. The
//! mask is computed once when the region is defined and never changes
//! afterwards; a new point sequence produces a new region.

use crate::error::{ServoError, ServoResult};
use ndarray::{Array2, ArrayView2};
use serde::{Deserialize, Serialize};
use shared::image_proc::polygon::{fill_polygon, signed_area};
use shared::image_proc::AABB;
use shared::image_size::PixelShape;

/// Polygons with less enclosed area than this are treated as degenerate
const MIN_POLYGON_AREA: f64 = 1e-6;

/// Number of clicks the reference rig collects before closing the polygon
pub const DEFAULT_REGION_POINTS: usize = 4;

/// A point in pixel coordinates (origin top-left, x right, y down)
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct PixelPoint {
    pub x: f64,
    pub y: f64,
}

impl PixelPoint {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn distance_to(&self, other: &PixelPoint) -> f64 {
        (self.x - other.x).hypot(self.y - other.y)
    }
}

impl From<(f64, f64)> for PixelPoint {
    fn from((x, y): (f64, f64)) -> Self {
        Self::new(x, y)
    }
}

/// Immutable workspace polygon and its rasterized mask
#[derive(Debug, Clone)]
pub struct WorkspaceRegion {
    points: Vec<PixelPoint>,
    mask: Array2<bool>,
    area: usize,
    bounds: AABB,
}

impl WorkspaceRegion {
    /// Validate and rasterize a polygon for a frame of the given extent
    ///
    /// # Errors
    /// `InvalidRegion` when fewer than 3 points are given, any coordinate is
    /// not finite, the polygon encloses no area, or it covers no pixel of
    /// the frame.
    pub fn define(points: &[PixelPoint], frame: PixelShape) -> ServoResult<Self> {
        if points.len() < 3 {
            return Err(ServoError::InvalidRegion(format!(
                "need at least 3 points, got {}",
                points.len()
            )));
        }
        if let Some(p) = points.iter().find(|p| !p.x.is_finite() || !p.y.is_finite()) {
            return Err(ServoError::InvalidRegion(format!(
                "non-finite vertex ({}, {})",
                p.x, p.y
            )));
        }

        let vertices: Vec<(f64, f64)> = points.iter().map(|p| (p.x, p.y)).collect();
        let enclosed = signed_area(&vertices).abs();
        if enclosed < MIN_POLYGON_AREA {
            return Err(ServoError::InvalidRegion(format!(
                "polygon is degenerate (enclosed area {enclosed:.3e})"
            )));
        }

        let mask = fill_polygon(&vertices, frame);
        let mut bounds = AABB::new();
        let mut area = 0;
        for ((row, col), &inside) in mask.indexed_iter() {
            if inside {
                area += 1;
                bounds.expand_to_include(row, col);
            }
        }
        if area == 0 {
            return Err(ServoError::InvalidRegion(format!(
                "polygon does not cover any pixel of the {frame} frame"
            )));
        }

        log::info!(
            "Workspace region defined: {} vertices, {} pixels inside {} frame",
            points.len(),
            area,
            frame
        );

        Ok(Self {
            points: points.to_vec(),
            mask,
            area,
            bounds,
        })
    }

    /// Region covering the whole frame
    pub fn full_frame(frame: PixelShape) -> ServoResult<Self> {
        let (w, h) = (
            frame.width.saturating_sub(1) as f64,
            frame.height.saturating_sub(1) as f64,
        );
        Self::define(
            &[
                PixelPoint::new(0.0, 0.0),
                PixelPoint::new(w, 0.0),
                PixelPoint::new(w, h),
                PixelPoint::new(0.0, h),
            ],
            frame,
        )
    }

    /// Whether pixel `(x, y)` lies in the region, by mask lookup
    pub fn contains(&self, x: usize, y: usize) -> bool {
        self.mask.get((y, x)).copied().unwrap_or(false)
    }

    /// Whether the pixel nearest to a real-valued point lies in the region
    pub fn contains_point(&self, point: &PixelPoint) -> bool {
        self.frame_shape()
            .nearest_pixel(point.x, point.y)
            .is_some_and(|(col, row)| self.mask[[row, col]])
    }

    pub fn points(&self) -> &[PixelPoint] {
        &self.points
    }

    pub fn mask(&self) -> ArrayView2<'_, bool> {
        self.mask.view()
    }

    /// Number of pixels inside the region
    pub fn area(&self) -> usize {
        self.area
    }

    /// Bounding box of the pixels inside the region
    pub fn bounds(&self) -> AABB {
        self.bounds
    }

    pub fn frame_shape(&self) -> PixelShape {
        PixelShape::from_dim(self.mask.dim())
    }
}

/// Collects operator clicks until a region can be built
///
/// The selector closes the polygon automatically once `required_points`
/// clicks have been collected; [`RegionSelector::finish`] closes it early
/// with any count of at least three.
#[derive(Debug, Clone)]
pub struct RegionSelector {
    frame: PixelShape,
    required_points: usize,
    points: Vec<PixelPoint>,
}

impl RegionSelector {
    pub fn new(frame: PixelShape) -> Self {
        Self::with_required_points(frame, DEFAULT_REGION_POINTS)
    }

    pub fn with_required_points(frame: PixelShape, required_points: usize) -> Self {
        Self {
            frame,
            required_points: required_points.max(3),
            points: Vec::new(),
        }
    }

    /// Record a click
    ///
    /// Returns `Some` once enough points have been collected. Clicks after
    /// that are ignored until [`RegionSelector::reset`].
    pub fn push_point(&mut self, point: PixelPoint) -> Option<ServoResult<WorkspaceRegion>> {
        if self.points.len() >= self.required_points {
            log::warn!("Region already has {} points, ignoring click", self.points.len());
            return None;
        }
        self.points.push(point);
        log::info!(
            "Region point {}/{}: ({:.0}, {:.0})",
            self.points.len(),
            self.required_points,
            point.x,
            point.y
        );
        (self.points.len() == self.required_points).then(|| self.finish())
    }

    /// Build a region from the points collected so far
    pub fn finish(&self) -> ServoResult<WorkspaceRegion> {
        WorkspaceRegion::define(&self.points, self.frame)
    }

    pub fn points(&self) -> &[PixelPoint] {
        &self.points
    }

    pub fn reset(&mut self) {
        self.points.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pts(raw: &[(f64, f64)]) -> Vec<PixelPoint> {
        raw.iter().copied().map(PixelPoint::from).collect()
    }

    #[test]
    fn test_too_few_points() {
        let frame = PixelShape::new(100, 100);
        for n in 0..3 {
            let points = pts(&[(10.0, 10.0), (50.0, 10.0)][..n.min(2)]);
            assert!(matches!(
                WorkspaceRegion::define(&points, frame),
                Err(ServoError::InvalidRegion(_))
            ));
        }
    }

    #[test]
    fn test_collinear_points_rejected() {
        let frame = PixelShape::new(100, 100);
        let points = pts(&[(10.0, 10.0), (20.0, 20.0), (30.0, 30.0), (40.0, 40.0)]);
        assert!(matches!(
            WorkspaceRegion::define(&points, frame),
            Err(ServoError::InvalidRegion(_))
        ));
    }

    #[test]
    fn test_repeated_point_rejected() {
        let frame = PixelShape::new(100, 100);
        let points = pts(&[(10.0, 10.0), (10.0, 10.0), (10.0, 10.0)]);
        assert!(WorkspaceRegion::define(&points, frame).is_err());
    }

    #[test]
    fn test_outside_frame_rejected() {
        let frame = PixelShape::new(100, 100);
        let points = pts(&[(200.0, 200.0), (300.0, 200.0), (300.0, 300.0)]);
        assert!(WorkspaceRegion::define(&points, frame).is_err());
    }

    #[test]
    fn test_square_region_boundary_inclusive() {
        let frame = PixelShape::new(500, 500);
        let points = pts(&[(100.0, 100.0), (400.0, 100.0), (400.0, 400.0), (100.0, 400.0)]);
        let region = WorkspaceRegion::define(&points, frame).unwrap();

        assert!(region.contains(100, 100));
        assert!(region.contains(400, 400));
        assert!(region.contains(250, 250));
        assert!(!region.contains(99, 250));
        assert!(!region.contains(401, 250));
        assert!(!region.contains(1000, 1000));
        assert_eq!(region.area(), 301 * 301);
        assert_eq!(region.bounds(), AABB::from_coords(100, 100, 400, 400));
    }

    #[test]
    fn test_contains_point_rounds() {
        let frame = PixelShape::new(50, 50);
        let points = pts(&[(10.0, 10.0), (20.0, 10.0), (20.0, 20.0), (10.0, 20.0)]);
        let region = WorkspaceRegion::define(&points, frame).unwrap();
        assert!(region.contains_point(&PixelPoint::new(20.4, 15.0)));
        assert!(!region.contains_point(&PixelPoint::new(20.6, 15.0)));
    }

    #[test]
    fn test_selector_closes_after_four_clicks() {
        let mut selector = RegionSelector::new(PixelShape::new(100, 100));
        assert!(selector.push_point(PixelPoint::new(10.0, 10.0)).is_none());
        assert!(selector.push_point(PixelPoint::new(90.0, 10.0)).is_none());
        assert!(selector.push_point(PixelPoint::new(90.0, 90.0)).is_none());
        let region = selector
            .push_point(PixelPoint::new(10.0, 90.0))
            .expect("fourth click should close the polygon")
            .unwrap();
        assert_eq!(region.points().len(), 4);

        // Further clicks are ignored until reset
        assert!(selector.push_point(PixelPoint::new(50.0, 50.0)).is_none());
        selector.reset();
        assert!(selector.points().is_empty());
    }

    #[test]
    fn test_selector_finish_early_triangle() {
        let mut selector = RegionSelector::new(PixelShape::new(100, 100));
        selector.push_point(PixelPoint::new(10.0, 10.0));
        selector.push_point(PixelPoint::new(90.0, 10.0));
        assert!(selector.finish().is_err());
        selector.push_point(PixelPoint::new(50.0, 80.0));
        let region = selector.finish().unwrap();
        assert!(region.contains(50, 40));
    }

    #[test]
    fn test_full_frame() {
        let region = WorkspaceRegion::full_frame(PixelShape::new(20, 10)).unwrap();
        assert_eq!(region.area(), 200);
    }
}
