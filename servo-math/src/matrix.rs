//! Square matrix utilities using nalgebra
//!
//! Provides checked inversion for fixed-size matrices. Singularity is judged
//! relative to the Hadamard bound of the matrix so that well-conditioned
//! matrices with small entries (e.g. products of per-coil gains) are not
//! mistaken for singular ones.

use nalgebra::{Const, DimMin, SMatrix};
use thiserror::Error;

/// Error when matrix inversion fails due to singular matrix
#[derive(Error, Debug, Clone, PartialEq)]
#[error("singular matrix: determinant={determinant:.6e}")]
pub struct SingularMatrixError {
    /// The determinant value (zero or near-zero)
    pub determinant: f64,
}

/// Threshold on |det| / (product of row norms) for considering a matrix singular
const RELATIVE_DETERMINANT_EPSILON: f64 = 1e-12;

/// Product of the Euclidean row norms, an upper bound on |det(M)|
fn hadamard_bound<const N: usize>(matrix: &SMatrix<f64, N, N>) -> f64 {
    matrix.row_iter().map(|row| row.norm()).product()
}

/// Invert an NxN matrix with error handling for singular matrices
///
/// # Arguments
/// * `matrix` - The square matrix to invert
///
/// # Returns
/// * `Ok(SMatrix)` - The inverse matrix
/// * `Err(SingularMatrixError)` - If the matrix is singular or contains non-finite values
pub fn invert_matrix<const N: usize>(
    matrix: &SMatrix<f64, N, N>,
) -> Result<SMatrix<f64, N, N>, SingularMatrixError>
where
    Const<N>: DimMin<Const<N>, Output = Const<N>>,
{
    let det = matrix.determinant();
    let bound = hadamard_bound(matrix);

    if !det.is_finite() || bound == 0.0 || det.abs() <= RELATIVE_DETERMINANT_EPSILON * bound {
        return Err(SingularMatrixError { determinant: det });
    }

    let inverse = matrix
        .try_inverse()
        .ok_or(SingularMatrixError { determinant: det })?;

    if inverse.iter().all(|v| v.is_finite()) {
        Ok(inverse)
    } else {
        Err(SingularMatrixError { determinant: det })
    }
}
