//! servo-math - Linear algebra helpers for magnetic visual servoing
//!
//! This crate provides the small set of numerical building blocks used by the
//! servo control core:
//!
//! - **Matrix** - Checked inversion of square matrices with singularity detection
//! - **Affine** - `y = M·x + b` maps with composition and inversion
//! - **Kalman** - 4-state constant-velocity estimator for 2D position tracking
//!
//! # Example
//!
//! ```text
//! use servo_math::AffineMap;
//! use nalgebra::{SMatrix, SVector};
//!
//! let map = AffineMap::new(SMatrix::<f64, 2, 2>::identity() * 2.0, SVector::from([1.0, 1.0]));
//! let inverse = map.inverse()?;
//! let x = inverse.apply(&map.apply(&SVector::from([3.0, 4.0])));
//! ```

pub mod affine;
pub mod kalman;
pub mod matrix;

pub use affine::AffineMap;
pub use kalman::{ConstantVelocityFilter, KalmanNoise};
pub use matrix::{invert_matrix, SingularMatrixError};
