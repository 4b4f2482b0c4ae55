//! Affine maps between PWM duty, coil current, and magnetic field
//!
//! The calibration holds two maps per coil array:
//! - `M1, b1`: PWM duty (%) → current (A)
//! - `M2, b2`: current (A) → field (mT)
//!
//! Their composition `M3 = M2·M1, b3 = M2·b1 + b2` maps PWM straight to
//! field. All three inverses are computed when the mapper is built so that a
//! singular calibration is rejected before the control loop starts.

use crate::error::{MappingStage, ServoError, ServoResult};
use nalgebra::{SMatrix, SVector};
use serde::{Deserialize, Serialize};
use servo_math::AffineMap;
use std::fs;
use std::path::Path;

/// Number of coils in the array: two per axis
pub const COIL_COUNT: usize = 6;

/// One value per coil, in coil index order
pub type CoilVector = SVector<f64, COIL_COUNT>;

type CoilMatrix = [[f64; COIL_COUNT]; COIL_COUNT];

/// Measured coil calibration, stored row-major for readable JSON
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CoilCalibration {
    /// PWM → current gain matrix `M1`
    pub pwm_to_current_gain: CoilMatrix,
    /// PWM → current offset `b1`
    pub pwm_to_current_offset: [f64; COIL_COUNT],
    /// Current → field gain matrix `M2`
    pub current_to_field_gain: CoilMatrix,
    /// Current → field offset `b2`
    pub current_to_field_offset: [f64; COIL_COUNT],
}

/// Per-coil gains measured on the reference rig; shared by `M1` and `M2`
const REFERENCE_GAINS: [f64; COIL_COUNT] = [0.1047, 0.1111, 0.1500, 0.1579, 0.2195, 0.2250];
const REFERENCE_FIELD_OFFSET: [f64; COIL_COUNT] = [0.1489, 0.2567, -0.1, -0.1667, 0.0, -0.0556];

fn diagonal(gains: &[f64; COIL_COUNT]) -> CoilMatrix {
    let mut matrix = [[0.0; COIL_COUNT]; COIL_COUNT];
    for (i, gain) in gains.iter().enumerate() {
        matrix[i][i] = *gain;
    }
    matrix
}

fn to_affine(gain: &CoilMatrix, offset: &[f64; COIL_COUNT]) -> AffineMap<COIL_COUNT> {
    let matrix = SMatrix::<f64, COIL_COUNT, COIL_COUNT>::from_fn(|r, c| gain[r][c]);
    AffineMap::new(matrix, CoilVector::from_column_slice(offset))
}

impl CoilCalibration {
    /// Calibration of the reference six-coil rig
    pub fn reference() -> Self {
        Self {
            pwm_to_current_gain: diagonal(&REFERENCE_GAINS),
            pwm_to_current_offset: [1.0; COIL_COUNT],
            current_to_field_gain: diagonal(&REFERENCE_GAINS),
            current_to_field_offset: REFERENCE_FIELD_OFFSET,
        }
    }

    /// Calibration whose maps are all the identity
    pub fn identity() -> Self {
        Self {
            pwm_to_current_gain: diagonal(&[1.0; COIL_COUNT]),
            pwm_to_current_offset: [0.0; COIL_COUNT],
            current_to_field_gain: diagonal(&[1.0; COIL_COUNT]),
            current_to_field_offset: [0.0; COIL_COUNT],
        }
    }

    /// Check that every map is finite and invertible
    pub fn validate(&self) -> ServoResult<()> {
        CoilMapper::new(self).map(|_| ())
    }

    /// Load a calibration from JSON and validate it
    pub fn load(path: impl AsRef<Path>) -> ServoResult<Self> {
        let text = fs::read_to_string(path.as_ref())?;
        let calibration: CoilCalibration = serde_json::from_str(&text)?;
        calibration.validate()?;
        log::info!("Loaded coil calibration from {}", path.as_ref().display());
        Ok(calibration)
    }

    pub fn save(&self, path: impl AsRef<Path>) -> ServoResult<()> {
        fs::write(path, serde_json::to_string_pretty(self)?)?;
        Ok(())
    }
}

impl Default for CoilCalibration {
    fn default() -> Self {
        Self::reference()
    }
}

/// Forward and inverse conversions between PWM, current, and field space
#[derive(Debug, Clone)]
pub struct CoilMapper {
    pwm_to_current: AffineMap<COIL_COUNT>,
    current_to_field: AffineMap<COIL_COUNT>,
    pwm_to_field: AffineMap<COIL_COUNT>,
    current_to_pwm: AffineMap<COIL_COUNT>,
    field_to_current: AffineMap<COIL_COUNT>,
    field_to_pwm: AffineMap<COIL_COUNT>,
}

impl CoilMapper {
    /// Build all six conversions, failing on any singular matrix
    pub fn new(calibration: &CoilCalibration) -> ServoResult<Self> {
        let pwm_to_current = to_affine(
            &calibration.pwm_to_current_gain,
            &calibration.pwm_to_current_offset,
        );
        let current_to_field = to_affine(
            &calibration.current_to_field_gain,
            &calibration.current_to_field_offset,
        );
        let pwm_to_field = pwm_to_current.then(&current_to_field);

        let current_to_pwm = pwm_to_current
            .inverse()
            .map_err(|e| ServoError::singular(MappingStage::PwmToCurrent, e))?;
        let field_to_current = current_to_field
            .inverse()
            .map_err(|e| ServoError::singular(MappingStage::CurrentToField, e))?;
        let field_to_pwm = pwm_to_field
            .inverse()
            .map_err(|e| ServoError::singular(MappingStage::PwmToField, e))?;

        Ok(Self {
            pwm_to_current,
            current_to_field,
            pwm_to_field,
            current_to_pwm,
            field_to_current,
            field_to_pwm,
        })
    }

    /// `M1·pwm + b1`
    pub fn pwm_to_current(&self, pwm: &CoilVector) -> CoilVector {
        self.pwm_to_current.apply(pwm)
    }

    /// `M2·current + b2`
    pub fn current_to_field(&self, current: &CoilVector) -> CoilVector {
        self.current_to_field.apply(current)
    }

    /// `M3·pwm + b3`
    pub fn pwm_to_field(&self, pwm: &CoilVector) -> CoilVector {
        self.pwm_to_field.apply(pwm)
    }

    /// `M1⁻¹·(current - b1)`
    pub fn current_to_pwm(&self, current: &CoilVector) -> CoilVector {
        self.current_to_pwm.apply(current)
    }

    /// `M2⁻¹·(field - b2)`
    pub fn field_to_current(&self, field: &CoilVector) -> CoilVector {
        self.field_to_current.apply(field)
    }

    /// `M3⁻¹·(field - b3)`
    pub fn field_to_pwm(&self, field: &CoilVector) -> CoilVector {
        self.field_to_pwm.apply(field)
    }

    /// Composite PWM → field map
    pub fn pwm_to_field_map(&self) -> &AffineMap<COIL_COUNT> {
        &self.pwm_to_field
    }
}
