//! Constant-velocity Kalman filter for 2D position tracking
//!
//! State vector is `[x, y, vx, vy]` with a unit time step per update, so
//! velocities are expressed in pixels per frame. Only position is measured.

use nalgebra::{Matrix2, Matrix2x4, Matrix4, Matrix4x2, Vector2, Vector4};
use serde::{Deserialize, Serialize};

/// Noise parameters for the constant-velocity model
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct KalmanNoise {
    /// Diagonal process noise covariance
    pub process_noise: f64,
    /// Diagonal measurement noise covariance
    pub measurement_noise: f64,
}

impl Default for KalmanNoise {
    fn default() -> Self {
        Self {
            process_noise: 1e-2,
            measurement_noise: 1e-1,
        }
    }
}

/// 4-state constant-velocity estimator
///
/// The filter is uninitialized until the first measurement arrives; that
/// measurement seeds the state with zero velocity and identity covariance.
#[derive(Debug, Clone)]
pub struct ConstantVelocityFilter {
    noise: KalmanNoise,
    state: Option<(Vector4<f64>, Matrix4<f64>)>,
}

impl ConstantVelocityFilter {
    pub fn new(noise: KalmanNoise) -> Self {
        Self { noise, state: None }
    }

    /// Whether a measurement has seeded the filter
    pub fn is_initialized(&self) -> bool {
        self.state.is_some()
    }

    /// Drop all state; the next measurement re-seeds the filter
    pub fn reset(&mut self) {
        self.state = None;
    }

    /// Current position estimate, if initialized
    pub fn position(&self) -> Option<(f64, f64)> {
        self.state.as_ref().map(|(x, _)| (x[0], x[1]))
    }

    /// Current velocity estimate in pixels per step, if initialized
    pub fn velocity(&self) -> Option<(f64, f64)> {
        self.state.as_ref().map(|(x, _)| (x[2], x[3]))
    }

    fn transition() -> Matrix4<f64> {
        Matrix4::new(
            1.0, 0.0, 1.0, 0.0, //
            0.0, 1.0, 0.0, 1.0, //
            0.0, 0.0, 1.0, 0.0, //
            0.0, 0.0, 0.0, 1.0,
        )
    }

    fn measurement_matrix() -> Matrix2x4<f64> {
        Matrix2x4::new(
            1.0, 0.0, 0.0, 0.0, //
            0.0, 1.0, 0.0, 0.0,
        )
    }

    /// Advance the state one step without a measurement
    ///
    /// Returns the predicted position, or `None` if the filter has never been
    /// seeded.
    pub fn predict(&mut self) -> Option<(f64, f64)> {
        let q = Matrix4::identity() * self.noise.process_noise;
        let f = Self::transition();
        let (x, p) = self.state.as_mut()?;
        *x = f * *x;
        *p = f * *p * f.transpose() + q;
        Some((x[0], x[1]))
    }

    /// Incorporate a position measurement
    ///
    /// The first measurement initializes the state at `(x, y, 0, 0)` and is
    /// returned unchanged. Later measurements run a predict step followed by
    /// a correction, returning the corrected position.
    pub fn update(&mut self, mx: f64, my: f64) -> (f64, f64) {
        if self.state.is_none() {
            self.state = Some((Vector4::new(mx, my, 0.0, 0.0), Matrix4::identity()));
            return (mx, my);
        }

        self.predict();

        let h = Self::measurement_matrix();
        let r = Matrix2::identity() * self.noise.measurement_noise;

        let Some((x, p)) = self.state.as_mut() else {
            return (mx, my);
        };

        let innovation = Vector2::new(mx, my) - h * *x;
        let s = h * *p * h.transpose() + r;
        // S is symmetric positive definite since R is
        let Some(s_inv) = s.try_inverse() else {
            return (x[0], x[1]);
        };
        let gain: Matrix4x2<f64> = *p * h.transpose() * s_inv;

        *x += gain * innovation;
        *p = (Matrix4::identity() - gain * h) * *p;

        (x[0], x[1])
    }
}

impl Default for ConstantVelocityFilter {
    fn default() -> Self {
        Self::new(KalmanNoise::default())
    }
}
