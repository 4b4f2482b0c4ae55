//! Waypoint path generators
//!
//! Shapes are sampled so that consecutive waypoints are evenly spaced; the
//! closed shapes end where they started.

use magservo::{PixelPoint, ServoResult, WorkspaceRegion};
use shared::image_size::PixelShape;
use std::f64::consts::PI;

/// Axis-aligned square traced clockwise (in image coordinates) from its top-left corner
pub fn square_path(center: PixelPoint, half_side: f64, points_per_side: usize) -> Vec<PixelPoint> {
    let n = points_per_side.max(1);
    let corners = [
        PixelPoint::new(center.x - half_side, center.y - half_side),
        PixelPoint::new(center.x + half_side, center.y - half_side),
        PixelPoint::new(center.x + half_side, center.y + half_side),
        PixelPoint::new(center.x - half_side, center.y + half_side),
    ];

    let mut path = Vec::with_capacity(4 * n + 1);
    for (i, from) in corners.iter().enumerate() {
        let to = corners[(i + 1) % corners.len()];
        for k in 0..n {
            let t = k as f64 / n as f64;
            path.push(PixelPoint::new(
                from.x + (to.x - from.x) * t,
                from.y + (to.y - from.y) * t,
            ));
        }
    }
    path.push(corners[0]);
    path
}

/// Circle starting at angle zero (rightmost point)
pub fn circle_path(center: PixelPoint, radius: f64, points: usize) -> Vec<PixelPoint> {
    let n = points.max(3);
    (0..=n)
        .map(|k| {
            let theta = 2.0 * PI * k as f64 / n as f64;
            PixelPoint::new(center.x + radius * theta.cos(), center.y + radius * theta.sin())
        })
        .collect()
}

/// `points` evenly spaced waypoints from `from` to `to`, both included
pub fn line_path(from: PixelPoint, to: PixelPoint, points: usize) -> Vec<PixelPoint> {
    let n = points.max(2);
    (0..n)
        .map(|k| {
            let t = k as f64 / (n - 1) as f64;
            PixelPoint::new(from.x + (to.x - from.x) * t, from.y + (to.y - from.y) * t)
        })
        .collect()
}

/// Rectangular workspace inset `margin` pixels from every frame edge
pub fn inset_region(shape: PixelShape, margin: f64) -> ServoResult<WorkspaceRegion> {
    let (w, h) = (
        shape.width.saturating_sub(1) as f64,
        shape.height.saturating_sub(1) as f64,
    );
    let points = [
        PixelPoint::new(margin, margin),
        PixelPoint::new(w - margin, margin),
        PixelPoint::new(w - margin, h - margin),
        PixelPoint::new(margin, h - margin),
    ];
    WorkspaceRegion::define(&points, shape)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_square_path_is_closed_and_even() {
        let path = square_path(PixelPoint::new(100.0, 100.0), 40.0, 4);
        assert_eq!(path.len(), 17);
        assert_eq!(path.first(), path.last());
        for pair in path.windows(2) {
            assert_relative_eq!(pair[0].distance_to(&pair[1]), 20.0, epsilon = 1e-9);
        }
    }

    #[test]
    fn test_circle_path_radius() {
        let center = PixelPoint::new(50.0, 60.0);
        let path = circle_path(center, 25.0, 12);
        assert_eq!(path.len(), 13);
        for p in &path {
            assert_relative_eq!(p.distance_to(&center), 25.0, epsilon = 1e-9);
        }
        assert_relative_eq!(path[0].x, path[12].x, epsilon = 1e-9);
    }

    #[test]
    fn test_line_path_endpoints() {
        let path = line_path(PixelPoint::new(0.0, 0.0), PixelPoint::new(30.0, 40.0), 6);
        assert_eq!(path.len(), 6);
        assert_eq!(path[0], PixelPoint::new(0.0, 0.0));
        assert_eq!(path[5], PixelPoint::new(30.0, 40.0));
        assert_relative_eq!(path[1].distance_to(&path[2]), 10.0, epsilon = 1e-9);
    }

    #[test]
    fn test_inset_region() {
        let region = inset_region(PixelShape::new(100, 80), 10.0).unwrap();
        assert!(region.contains(10, 10));
        assert!(region.contains(89, 69));
        assert!(!region.contains(9, 40));
        assert!(inset_region(PixelShape::new(10, 10), 4.5).is_err());
    }
}
