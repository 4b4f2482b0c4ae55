//! Connected component analysis for binary foreground masks.
//!
//! Groups foreground pixels into labeled blobs and extracts per-blob
//! statistics for selection.
//!
//! # Key Algorithms
//!
//! ## Connected Components
//! Two-pass connected component labeling with union-find optimization.
//! Supports 4-connectivity and 8-connectivity; 8-connectivity groups pixels
//! the same way an external contour trace would.
//!
//! ## Hole Filling
//! Flood-fills the background from the mask border; any background pixel
//! that is not reached is enclosed by foreground and becomes part of the blob.

use crate::image_proc::detection::AABB;
use ndarray::{s, Array2, ArrayView2};
use std::collections::VecDeque;

/// Pixel neighborhood used for labeling
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Connectivity {
    /// Horizontal and vertical neighbors only
    Four,
    /// Horizontal, vertical and diagonal neighbors
    #[default]
    Eight,
}

/// Find the root label in a disjoint-set (union-find) data structure
fn find_root(labels: &mut [usize], label: usize) -> usize {
    let mut current = label;

    while current != labels[current] {
        // Path compression - make the parent point to the grandparent
        labels[current] = labels[labels[current]];
        current = labels[current];
    }

    current
}

/// Union two labels, keeping the smaller root as canonical
fn union_labels(labels: &mut [usize], label1: usize, label2: usize) {
    let root1 = find_root(labels, label1);
    let root2 = find_root(labels, label2);

    if root1 < root2 {
        labels[root2] = root1;
    } else if root2 < root1 {
        labels[root1] = root2;
    }
}

/// Connected component labeling using a two-pass algorithm with union-find.
///
/// # Algorithm
/// 1. **First pass**: Scan the mask, assign preliminary labels from already
///    visited neighbors, and record equivalences
/// 2. **Union-find**: Resolve label equivalences with path compression
/// 3. **Second pass**: Relabel with final consecutive labels
///
/// # Arguments
/// * `mask` - Binary mask where true marks foreground
/// * `connectivity` - Neighborhood defining adjacency
///
/// # Returns
/// Labeled image where background is 0 and each component gets a unique
/// consecutive label starting from 1, ordered by first appearance in raster order
pub fn connected_components(mask: &ArrayView2<bool>, connectivity: Connectivity) -> Array2<usize> {
    let (height, width) = mask.dim();
    let mut labels = Array2::zeros((height, width));
    let mut label_count = 0;
    let mut parent_table = vec![0];

    // Previously visited neighbors as (drow, dcol) offsets
    let neighbors: &[(isize, isize)] = match connectivity {
        Connectivity::Four => &[(-1, 0), (0, -1)],
        Connectivity::Eight => &[(-1, -1), (-1, 0), (-1, 1), (0, -1)],
    };

    let mut neighbor_labels = Vec::with_capacity(4);
    for i in 0..height {
        for j in 0..width {
            if !mask[[i, j]] {
                continue;
            }

            neighbor_labels.clear();
            for &(di, dj) in neighbors {
                let (ni, nj) = (i as isize + di, j as isize + dj);
                if ni < 0 || nj < 0 || nj as usize >= width {
                    continue;
                }
                let label = labels[[ni as usize, nj as usize]];
                if label > 0 {
                    neighbor_labels.push(label);
                }
            }

            match neighbor_labels.iter().copied().min() {
                None => {
                    label_count += 1;
                    labels[[i, j]] = label_count;
                    parent_table.push(label_count);
                }
                Some(min_label) => {
                    labels[[i, j]] = min_label;
                    for &neighbor_label in &neighbor_labels {
                        if neighbor_label != min_label {
                            union_labels(&mut parent_table, min_label, neighbor_label);
                        }
                    }
                }
            }
        }
    }

    for i in 1..parent_table.len() {
        find_root(&mut parent_table, i);
    }

    let mut relabel_map = vec![0; parent_table.len()];
    let mut next_label = 1;
    for i in 1..parent_table.len() {
        let root = parent_table[i];
        if relabel_map[root] == 0 {
            relabel_map[root] = next_label;
            next_label += 1;
        }
        relabel_map[i] = relabel_map[root];
    }

    labels.mapv_inplace(|label| relabel_map[label]);
    labels
}

/// Summary statistics of one labeled component
#[derive(Debug, Clone, PartialEq)]
pub struct ComponentStats {
    /// Component label in the labeled image
    pub label: usize,
    /// Number of pixels carrying this label
    pub area: usize,
    /// Bounding box of the component
    pub bbox: AABB,
}

/// Collect statistics for every label in a labeled image
///
/// # Returns
/// One entry per component; index i corresponds to label i+1
pub fn component_stats(labeled: &ArrayView2<usize>) -> Vec<ComponentStats> {
    let max_label = labeled.iter().copied().max().unwrap_or(0);
    let mut stats: Vec<ComponentStats> = (1..=max_label)
        .map(|label| ComponentStats {
            label,
            area: 0,
            bbox: AABB::new(),
        })
        .collect();

    for ((row, col), &label) in labeled.indexed_iter() {
        if label > 0 {
            let entry = &mut stats[label - 1];
            entry.area += 1;
            entry.bbox.expand_to_include(row, col);
        }
    }
    stats
}

/// Mask of a single component cropped to its bounding box
pub fn component_mask(labeled: &ArrayView2<usize>, stats: &ComponentStats) -> Array2<bool> {
    if stats.bbox.is_empty() {
        return Array2::from_elem((0, 0), false);
    }
    let bbox = &stats.bbox;
    labeled
        .slice(s![bbox.min_row..=bbox.max_row, bbox.min_col..=bbox.max_col])
        .mapv(|label| label == stats.label)
}

/// Fill background regions that are fully enclosed by foreground
///
/// Background is traced with 4-connectivity, the complement of the
/// 8-connected foreground, so diagonal gaps in an outline do not leak.
pub fn fill_holes(mask: &ArrayView2<bool>) -> Array2<bool> {
    let (height, width) = mask.dim();
    let mut outside = Array2::from_elem((height, width), false);
    let mut queue = VecDeque::new();

    for row in 0..height {
        for col in 0..width {
            let on_border = row == 0 || col == 0 || row + 1 == height || col + 1 == width;
            if on_border && !mask[[row, col]] {
                outside[[row, col]] = true;
                queue.push_back((row, col));
            }
        }
    }

    while let Some((row, col)) = queue.pop_front() {
        let candidates = [
            (row.wrapping_sub(1), col),
            (row + 1, col),
            (row, col.wrapping_sub(1)),
            (row, col + 1),
        ];
        for (r, c) in candidates {
            if r < height && c < width && !mask[[r, c]] && !outside[[r, c]] {
                outside[[r, c]] = true;
                queue.push_back((r, c));
            }
        }
    }

    outside.mapv(|o| !o)
}
