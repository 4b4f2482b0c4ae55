//! Affine maps between N-dimensional vector spaces
//!
//! An [`AffineMap`] represents `y = M·x + b`. Maps compose and invert
//! algebraically so that chained conversions (e.g. duty cycle → current →
//! field) can be collapsed into a single map without accumulating error.

use crate::matrix::{invert_matrix, SingularMatrixError};
use nalgebra::{Const, DimMin, SMatrix, SVector};

/// Affine transform `y = matrix · x + offset`
#[derive(Debug, Clone, PartialEq)]
pub struct AffineMap<const N: usize> {
    matrix: SMatrix<f64, N, N>,
    offset: SVector<f64, N>,
}

impl<const N: usize> AffineMap<N> {
    /// Create a map from its linear part and offset
    pub fn new(matrix: SMatrix<f64, N, N>, offset: SVector<f64, N>) -> Self {
        Self { matrix, offset }
    }

    /// Map that scales each component independently
    pub fn from_diagonal(gains: &SVector<f64, N>, offset: SVector<f64, N>) -> Self {
        Self::new(SMatrix::from_diagonal(gains), offset)
    }

    /// The identity map
    pub fn identity() -> Self {
        Self::new(SMatrix::identity(), SVector::zeros())
    }

    /// Linear part of the map
    pub fn matrix(&self) -> &SMatrix<f64, N, N> {
        &self.matrix
    }

    /// Offset of the map
    pub fn offset(&self) -> &SVector<f64, N> {
        &self.offset
    }

    /// Evaluate the map at `x`
    pub fn apply(&self, x: &SVector<f64, N>) -> SVector<f64, N> {
        self.matrix * x + self.offset
    }

    /// Compose two maps: `self.then(&outer)` evaluates `outer(self(x))`
    ///
    /// The resulting linear part is `outer.M · self.M` and the offset is
    /// `outer.M · self.b + outer.b`.
    pub fn then(&self, outer: &AffineMap<N>) -> AffineMap<N> {
        AffineMap {
            matrix: outer.matrix * self.matrix,
            offset: outer.matrix * self.offset + outer.offset,
        }
    }

    /// Inverse map `x = M⁻¹·(y - b)`
    ///
    /// # Returns
    /// * `Ok(AffineMap)` - Map with linear part `M⁻¹` and offset `-M⁻¹·b`
    /// * `Err(SingularMatrixError)` - If the linear part is not invertible
    pub fn inverse(&self) -> Result<AffineMap<N>, SingularMatrixError>
    where
        Const<N>: DimMin<Const<N>, Output = Const<N>>,
    {
        let inv = invert_matrix(&self.matrix)?;
        Ok(AffineMap {
            offset: -(inv * self.offset),
            matrix: inv,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use nalgebra::{Matrix3, Vector3};
    use rand::{Rng, SeedableRng};
    use rand_chacha::ChaCha8Rng;

    fn sample_map() -> AffineMap<3> {
        AffineMap::new(
            Matrix3::new(2.0, 0.5, 0.0, -0.3, 1.5, 0.2, 0.1, 0.0, 0.8),
            Vector3::new(1.0, -2.0, 0.5),
        )
    }

    #[test]
    fn test_apply() {
        let map = AffineMap::from_diagonal(&Vector3::new(2.0, 3.0, 4.0), Vector3::new(1.0, 1.0, 1.0));
        let y = map.apply(&Vector3::new(1.0, 2.0, 3.0));
        assert_relative_eq!(y, Vector3::new(3.0, 7.0, 13.0));
    }

    #[test]
    fn test_then_matches_sequential_application() {
        let inner = sample_map();
        let outer = AffineMap::from_diagonal(&Vector3::new(0.5, 2.0, -1.0), Vector3::new(0.0, 1.0, 2.0));
        let composed = inner.then(&outer);

        let x = Vector3::new(0.3, -1.2, 4.0);
        assert_relative_eq!(composed.apply(&x), outer.apply(&inner.apply(&x)), epsilon = 1e-12);
    }

    #[test]
    fn test_inverse_round_trip_random() {
        let map = sample_map();
        let inverse = map.inverse().unwrap();
        let mut rng = ChaCha8Rng::seed_from_u64(7);

        for _ in 0..50 {
            let x = Vector3::new(
                rng.gen_range(-100.0..100.0),
                rng.gen_range(-100.0..100.0),
                rng.gen_range(-100.0..100.0),
            );
            assert_relative_eq!(inverse.apply(&map.apply(&x)), x, epsilon = 1e-9);
        }
    }

    #[test]
    fn test_identity() {
        let x = Vector3::new(1.0, 2.0, 3.0);
        assert_eq!(AffineMap::<3>::identity().apply(&x), x);
    }

    #[test]
    fn test_singular_inverse_fails() {
        let map = AffineMap::new(Matrix3::zeros(), Vector3::zeros());
        assert!(map.inverse().is_err());
    }
}
