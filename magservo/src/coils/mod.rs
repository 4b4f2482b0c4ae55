//! Coil array actuation
//!
//! Conversions between the four quantity spaces of the coil array (control
//! output, PWM duty cycle, coil current, magnetic field), the per-axis pair
//! drive conventions, and the open-loop rotating-field generator.

mod drive;
mod mapper;
mod rotating;

pub use drive::{
    AxisCommand, AxisModes, CoilActuator, CoilCommand, CoilDirection, CoilLayout, ControlSpace,
    DriveMode, MAX_PWM,
};
pub use mapper::{CoilCalibration, CoilMapper, CoilVector, COIL_COUNT};
pub use rotating::{RotatingField, RotationMode, Spin};
