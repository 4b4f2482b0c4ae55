//! Polygon geometry and rasterization
//!
//! Polygons are ordered vertex lists in pixel coordinates `(x, y)`, closed
//! implicitly between the last and first vertex. A pixel `(col, row)` is
//! filled when the point `(col, row)` lies on an edge or inside the polygon
//! under the even-odd rule. Edges and vertices are therefore inclusive.

use crate::image_size::PixelShape;
use ndarray::Array2;

/// Tolerance for treating a point as lying on an edge
const EDGE_EPSILON: f64 = 1e-9;

/// Signed area via the shoelace formula (positive for clockwise in raster coordinates)
pub fn signed_area(points: &[(f64, f64)]) -> f64 {
    if points.len() < 3 {
        return 0.0;
    }
    let mut sum = 0.0;
    for (i, &(x0, y0)) in points.iter().enumerate() {
        let (x1, y1) = points[(i + 1) % points.len()];
        sum += x0 * y1 - x1 * y0;
    }
    sum / 2.0
}

/// Axis-aligned bounds `(min_x, min_y, max_x, max_y)` of a point set
pub fn bounds(points: &[(f64, f64)]) -> Option<(f64, f64, f64, f64)> {
    let (&(x0, y0), rest) = points.split_first()?;
    Some(rest.iter().fold((x0, y0, x0, y0), |(min_x, min_y, max_x, max_y), &(x, y)| {
        (min_x.min(x), min_y.min(y), max_x.max(x), max_y.max(y))
    }))
}

fn on_segment(px: f64, py: f64, (ax, ay): (f64, f64), (bx, by): (f64, f64)) -> bool {
    let cross = (bx - ax) * (py - ay) - (by - ay) * (px - ax);
    let len = ((bx - ax).powi(2) + (by - ay).powi(2)).sqrt().max(1.0);
    if cross.abs() > EDGE_EPSILON * len {
        return false;
    }
    px >= ax.min(bx) - EDGE_EPSILON
        && px <= ax.max(bx) + EDGE_EPSILON
        && py >= ay.min(by) - EDGE_EPSILON
        && py <= ay.max(by) + EDGE_EPSILON
}

/// Boundary-inclusive even-odd containment test
pub fn contains_point(points: &[(f64, f64)], px: f64, py: f64) -> bool {
    let n = points.len();
    if n < 3 {
        return false;
    }

    let mut inside = false;
    for i in 0..n {
        let a = points[i];
        let b = points[(i + 1) % n];
        if on_segment(px, py, a, b) {
            return true;
        }
        // Half-open rule on y so each crossing is counted once
        if (a.1 > py) != (b.1 > py) {
            let x_cross = a.0 + (py - a.1) * (b.0 - a.0) / (b.1 - a.1);
            if px < x_cross {
                inside = !inside;
            }
        }
    }
    inside
}

/// Rasterize a polygon into a mask of the given frame extent
///
/// Only the polygon's bounding box is scanned; everything else is left false.
/// Vertices may lie outside the frame, in which case the mask is clipped.
pub fn fill_polygon(points: &[(f64, f64)], shape: PixelShape) -> Array2<bool> {
    let mut mask = Array2::from_elem(shape.dim(), false);
    let Some((min_x, min_y, max_x, max_y)) = bounds(points) else {
        return mask;
    };
    if points.len() < 3 || shape.pixel_count() == 0 {
        return mask;
    }

    let col_start = min_x.ceil().max(0.0) as usize;
    let row_start = min_y.ceil().max(0.0) as usize;
    if max_x < 0.0 || max_y < 0.0 {
        return mask;
    }
    let col_end = (max_x.floor() as usize).min(shape.width - 1);
    let row_end = (max_y.floor() as usize).min(shape.height - 1);

    for row in row_start..=row_end {
        for col in col_start..=col_end {
            if contains_point(points, col as f64, row as f64) {
                mask[[row, col]] = true;
            }
        }
    }
    mask
}
