//! Binary morphology on boolean masks
//!
//! Structuring elements are odd-sized boolean kernels anchored at their
//! center. Pixels beyond the frame edge are ignored, so erosion never eats
//! in from the border and dilation never grows in from it.
//!
//! Both operations only visit foreground pixels, which keeps the cost
//! proportional to the blob area rather than the frame size.

use ndarray::{Array2, ArrayView2};

/// Elliptical structuring element inscribed in a `size` x `size` box
///
/// Row extents are `round(c * sqrt(1 - dy²/r²))` around the center column,
/// which yields the familiar "rounded plus" for small sizes.
pub fn ellipse_kernel(size: usize) -> Array2<bool> {
    let size = size.max(1);
    let r = (size / 2) as f64;
    let c = (size / 2) as f64;
    let mut kernel = Array2::from_elem((size, size), false);

    for row in 0..size {
        let dy = row as f64 - r;
        let dx = if r > 0.0 {
            (c * ((r * r - dy * dy) / (r * r)).max(0.0).sqrt()).round()
        } else {
            0.0
        };
        let start = (c - dx).max(0.0) as usize;
        let end = ((c + dx + 1.0) as usize).min(size);
        for col in start..end {
            kernel[[row, col]] = true;
        }
    }
    kernel
}

/// Kernel offsets `(drow, dcol)` of the set elements relative to the anchor
fn kernel_offsets(kernel: &ArrayView2<bool>) -> Vec<(isize, isize)> {
    let (kh, kw) = kernel.dim();
    let (ar, ac) = ((kh / 2) as isize, (kw / 2) as isize);
    kernel
        .indexed_iter()
        .filter(|(_, &set)| set)
        .map(|((r, c), _)| (r as isize - ar, c as isize - ac))
        .collect()
}

fn offset_index(
    row: usize,
    col: usize,
    (dr, dc): (isize, isize),
    (height, width): (usize, usize),
) -> Option<(usize, usize)> {
    let r = row as isize + dr;
    let c = col as isize + dc;
    (r >= 0 && c >= 0 && (r as usize) < height && (c as usize) < width)
        .then_some((r as usize, c as usize))
}

/// Binary erosion: a pixel survives if every in-frame kernel neighbor is set
pub fn erode(mask: &ArrayView2<bool>, kernel: &ArrayView2<bool>) -> Array2<bool> {
    let dim = mask.dim();
    let offsets = kernel_offsets(kernel);
    let mut out = Array2::from_elem(dim, false);

    for ((row, col), &set) in mask.indexed_iter() {
        if !set {
            continue;
        }
        out[[row, col]] = offsets.iter().all(|&off| {
            offset_index(row, col, off, dim).map_or(true, |idx| mask[idx])
        });
    }
    out
}

/// Binary dilation: every set pixel stamps the kernel onto the output
pub fn dilate(mask: &ArrayView2<bool>, kernel: &ArrayView2<bool>) -> Array2<bool> {
    let dim = mask.dim();
    let offsets = kernel_offsets(kernel);
    let mut out = Array2::from_elem(dim, false);

    for ((row, col), &set) in mask.indexed_iter() {
        if !set {
            continue;
        }
        for &(dr, dc) in &offsets {
            // Reflect the kernel so dilation is the adjoint of erosion
            if let Some(idx) = offset_index(row, col, (-dr, -dc), dim) {
                out[idx] = true;
            }
        }
    }
    out
}

/// Opening (erode then dilate): removes specks smaller than the kernel
pub fn open(mask: &ArrayView2<bool>, kernel: &ArrayView2<bool>) -> Array2<bool> {
    dilate(&erode(mask, kernel).view(), kernel)
}

/// Closing (dilate then erode): fills gaps smaller than the kernel
pub fn close(mask: &ArrayView2<bool>, kernel: &ArrayView2<bool>) -> Array2<bool> {
    erode(&dilate(mask, kernel).view(), kernel)
}
