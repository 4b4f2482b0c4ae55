use servo_math::SingularMatrixError;
use std::fmt;
use thiserror::Error;

/// Which conversion of the coil mapper failed to invert
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MappingStage {
    /// PWM duty cycle → coil current (`M1`)
    PwmToCurrent,
    /// Coil current → magnetic field (`M2`)
    CurrentToField,
    /// PWM duty cycle → magnetic field (`M3 = M2·M1`)
    PwmToField,
}

impl fmt::Display for MappingStage {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let name = match self {
            MappingStage::PwmToCurrent => "pwm→current",
            MappingStage::CurrentToField => "current→field",
            MappingStage::PwmToField => "pwm→field",
        };
        write!(f, "{name}")
    }
}

/// Errors produced while configuring a servo session.
///
/// None of these occur inside the per-tick control loop; they are raised at
/// setup time when a region, calibration, or configuration is loaded.
#[derive(Error, Debug)]
pub enum ServoError {
    /// Workspace polygon is unusable.
    #[error("invalid region: {0}")]
    InvalidRegion(String),

    /// A coil calibration matrix cannot be inverted.
    #[error("singular {stage} mapping: determinant={determinant:.6e}")]
    SingularMapping {
        /// Conversion whose matrix is singular
        stage: MappingStage,
        /// Determinant of the offending matrix
        determinant: f64,
    },

    /// Configuration validation failure.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// Reading or writing a configuration file failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A configuration file could not be parsed or serialized.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl ServoError {
    pub(crate) fn singular(stage: MappingStage, err: SingularMatrixError) -> Self {
        ServoError::SingularMapping {
            stage,
            determinant: err.determinant,
        }
    }
}

/// Result type for servo setup operations
pub type ServoResult<T> = Result<T, ServoError>;
