//! Centroid calculation methods for binary blobs
//!
//! The primary estimate is the first-moment center of mass of a filled
//! mask. Two geometric fallbacks are provided for masks whose moments are
//! unusable: the peak of the distance transform (the point deepest inside
//! the blob) and the center of the minimal enclosing circle.

use ndarray::{Array2, ArrayView2};
use serde::{Deserialize, Serialize};

/// Raw image moments of a binary mask up to first order
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct MaskMoments {
    /// Zeroth moment (pixel count)
    pub m00: f64,
    /// First moment in x (sum of column indices)
    pub m10: f64,
    /// First moment in y (sum of row indices)
    pub m01: f64,
}

impl MaskMoments {
    /// Center of mass `(m10/m00, m01/m00)`, or `None` when `m00` is zero
    pub fn centroid(&self) -> Option<(f64, f64)> {
        if self.m00 > 0.0 {
            Some((self.m10 / self.m00, self.m01 / self.m00))
        } else {
            None
        }
    }
}

/// Compute raw moments of a mask
pub fn mask_moments(mask: &ArrayView2<bool>) -> MaskMoments {
    let mut moments = MaskMoments::default();
    for ((row, col), &set) in mask.indexed_iter() {
        if set {
            moments.m00 += 1.0;
            moments.m10 += col as f64;
            moments.m01 += row as f64;
        }
    }
    moments
}

/// Approximate Euclidean distance from each foreground pixel to the nearest background
///
/// Uses a two-pass 3x3 chamfer with weights 1 (orthogonal) and √2 (diagonal).
/// Pixels beyond the mask edge count as background. Background pixels have
/// distance 0.
pub fn distance_transform(mask: &ArrayView2<bool>) -> Array2<f64> {
    let (height, width) = mask.dim();
    let diag = std::f64::consts::SQRT_2;
    let mut dist = mask.mapv(|set| if set { f64::INFINITY } else { 0.0 });

    let at = |dist: &Array2<f64>, r: isize, c: isize| -> f64 {
        if r < 0 || c < 0 || r as usize >= height || c as usize >= width {
            0.0
        } else {
            dist[[r as usize, c as usize]]
        }
    };

    for row in 0..height {
        for col in 0..width {
            if dist[[row, col]] == 0.0 {
                continue;
            }
            let (r, c) = (row as isize, col as isize);
            let best = (at(&dist, r, c - 1) + 1.0)
                .min(at(&dist, r - 1, c) + 1.0)
                .min(at(&dist, r - 1, c - 1) + diag)
                .min(at(&dist, r - 1, c + 1) + diag);
            dist[[row, col]] = dist[[row, col]].min(best);
        }
    }

    for row in (0..height).rev() {
        for col in (0..width).rev() {
            if dist[[row, col]] == 0.0 {
                continue;
            }
            let (r, c) = (row as isize, col as isize);
            let best = (at(&dist, r, c + 1) + 1.0)
                .min(at(&dist, r + 1, c) + 1.0)
                .min(at(&dist, r + 1, c + 1) + diag)
                .min(at(&dist, r + 1, c - 1) + diag);
            dist[[row, col]] = dist[[row, col]].min(best);
        }
    }

    dist
}

/// Location `(x, y)` of the distance-transform maximum
///
/// Ties are resolved by averaging all maximal pixels, which keeps symmetric
/// blobs centered. Returns `None` for an empty mask.
pub fn distance_transform_peak(mask: &ArrayView2<bool>) -> Option<(f64, f64)> {
    let dist = distance_transform(mask);
    let peak = dist.iter().copied().fold(0.0_f64, f64::max);
    if peak <= 0.0 {
        return None;
    }

    let (mut sx, mut sy, mut n) = (0.0, 0.0, 0.0);
    for ((row, col), &d) in dist.indexed_iter() {
        if (peak - d).abs() < 1e-9 {
            sx += col as f64;
            sy += row as f64;
            n += 1.0;
        }
    }
    Some((sx / n, sy / n))
}

/// Circle in pixel coordinates
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Circle {
    pub x: f64,
    pub y: f64,
    pub radius: f64,
}

impl Circle {
    fn contains(&self, (px, py): (f64, f64)) -> bool {
        ((px - self.x).powi(2) + (py - self.y).powi(2)).sqrt() <= self.radius + 1e-7
    }

    fn from_two(a: (f64, f64), b: (f64, f64)) -> Self {
        let x = (a.0 + b.0) / 2.0;
        let y = (a.1 + b.1) / 2.0;
        let radius = ((a.0 - b.0).powi(2) + (a.1 - b.1).powi(2)).sqrt() / 2.0;
        Self { x, y, radius }
    }

    fn from_three(a: (f64, f64), b: (f64, f64), c: (f64, f64)) -> Self {
        let d = 2.0 * (a.0 * (b.1 - c.1) + b.0 * (c.1 - a.1) + c.0 * (a.1 - b.1));
        if d.abs() < 1e-12 {
            // Collinear: the widest pair spans the circle
            let candidates = [Self::from_two(a, b), Self::from_two(a, c), Self::from_two(b, c)];
            return candidates
                .into_iter()
                .max_by(|p, q| p.radius.total_cmp(&q.radius))
                .unwrap_or(Self::from_two(a, b));
        }
        let sq = |p: (f64, f64)| p.0 * p.0 + p.1 * p.1;
        let x = (sq(a) * (b.1 - c.1) + sq(b) * (c.1 - a.1) + sq(c) * (a.1 - b.1)) / d;
        let y = (sq(a) * (c.0 - b.0) + sq(b) * (a.0 - c.0) + sq(c) * (b.0 - a.0)) / d;
        let radius = ((a.0 - x).powi(2) + (a.1 - y).powi(2)).sqrt();
        Self { x, y, radius }
    }
}

/// Smallest circle enclosing every point
///
/// Incremental construction: each point outside the current circle must lie
/// on the boundary of the new one, which reduces to circles through one,
/// two, or three support points.
pub fn min_enclosing_circle(points: &[(f64, f64)]) -> Option<Circle> {
    let (&first, _) = points.split_first()?;
    let mut circle = Circle {
        x: first.0,
        y: first.1,
        radius: 0.0,
    };

    for i in 1..points.len() {
        if circle.contains(points[i]) {
            continue;
        }
        circle = Circle {
            x: points[i].0,
            y: points[i].1,
            radius: 0.0,
        };
        for j in 0..i {
            if circle.contains(points[j]) {
                continue;
            }
            circle = Circle::from_two(points[i], points[j]);
            for k in 0..j {
                if !circle.contains(points[k]) {
                    circle = Circle::from_three(points[i], points[j], points[k]);
                }
            }
        }
    }
    Some(circle)
}

/// Foreground pixels with at least one 4-neighbor in the background or off the mask
pub fn boundary_points(mask: &ArrayView2<bool>) -> Vec<(f64, f64)> {
    let (height, width) = mask.dim();
    let is_set = |r: isize, c: isize| {
        r >= 0 && c >= 0 && (r as usize) < height && (c as usize) < width && mask[[r as usize, c as usize]]
    };

    mask.indexed_iter()
        .filter(|&((row, col), &set)| {
            let (r, c) = (row as isize, col as isize);
            set && !(is_set(r - 1, c) && is_set(r + 1, c) && is_set(r, c - 1) && is_set(r, c + 1))
        })
        .map(|((row, col), _)| (col as f64, row as f64))
        .collect()
}
