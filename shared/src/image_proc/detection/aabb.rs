//! Axis-aligned bounding boxes in pixel index space

use serde::{Deserialize, Serialize};

/// Inclusive bounding box over pixel indices
///
/// A freshly constructed box is empty (`min > max`) until the first pixel is
/// included.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AABB {
    pub min_row: usize,
    pub min_col: usize,
    pub max_row: usize,
    pub max_col: usize,
}

impl AABB {
    pub fn new() -> Self {
        Self {
            min_row: usize::MAX,
            min_col: usize::MAX,
            max_row: 0,
            max_col: 0,
        }
    }

    pub fn from_coords(min_row: usize, min_col: usize, max_row: usize, max_col: usize) -> Self {
        Self {
            min_row,
            min_col,
            max_row,
            max_col,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.min_row > self.max_row || self.min_col > self.max_col
    }

    pub fn expand_to_include(&mut self, row: usize, col: usize) {
        self.min_row = self.min_row.min(row);
        self.min_col = self.min_col.min(col);
        self.max_row = self.max_row.max(row);
        self.max_col = self.max_col.max(col);
    }

    pub fn width(&self) -> usize {
        if self.is_empty() {
            0
        } else {
            self.max_col - self.min_col + 1
        }
    }

    pub fn height(&self) -> usize {
        if self.is_empty() {
            0
        } else {
            self.max_row - self.min_row + 1
        }
    }

    pub fn contains(&self, row: usize, col: usize) -> bool {
        !self.is_empty()
            && row >= self.min_row
            && row <= self.max_row
            && col >= self.min_col
            && col <= self.max_col
    }
}

impl Default for AABB {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_is_empty() {
        let b = AABB::new();
        assert!(b.is_empty());
        assert_eq!(b.width(), 0);
        assert!(!b.contains(0, 0));
    }

    #[test]
    fn test_expand() {
        let mut b = AABB::new();
        b.expand_to_include(5, 3);
        b.expand_to_include(2, 8);
        assert_eq!(b, AABB::from_coords(2, 3, 5, 8));
        assert_eq!(b.width(), 6);
        assert_eq!(b.height(), 4);
        assert!(b.contains(4, 4));
    }
}
