//! Open-loop rotating field generator

use super::drive::AxisCommand;
use crate::operator::STICK_FULL_SCALE;
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;

/// Lowest and highest rotation frequency selectable from the stick (Hz)
const FREQUENCY_RANGE: (f64, f64) = (0.05, 10.0);

/// Plane the field vector sweeps through
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum RotationMode {
    /// Rotation about X: field in the YZ plane
    X,
    /// Rotation about Y: field in the XZ plane
    Y,
    /// Rotation about Z: field in the XY plane
    Z,
    #[default]
    XY,
    XZ,
    YZ,
}

impl RotationMode {
    /// Mode selected by the next press of the mode button
    pub fn next_mode(self) -> Self {
        match self {
            RotationMode::X => RotationMode::Y,
            RotationMode::Y => RotationMode::Z,
            RotationMode::Z => RotationMode::XY,
            RotationMode::XY => RotationMode::XZ,
            RotationMode::XZ => RotationMode::YZ,
            RotationMode::YZ => RotationMode::X,
        }
    }
}

/// Sense of rotation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Spin {
    #[default]
    CounterClockwise,
    Clockwise,
}

impl Spin {
    fn sign(self) -> f64 {
        match self {
            Spin::CounterClockwise => 1.0,
            Spin::Clockwise => -1.0,
        }
    }
}

/// Field of constant magnitude rotating at a fixed frequency
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RotatingField {
    pub mode: RotationMode,
    /// Field amplitude, in the actuator's control space units
    pub amplitude: f64,
    pub frequency_hz: f64,
    pub spin: Spin,
}

impl Default for RotatingField {
    fn default() -> Self {
        Self {
            mode: RotationMode::default(),
            amplitude: 20.0,
            frequency_hz: FREQUENCY_RANGE.0,
            spin: Spin::default(),
        }
    }
}

impl RotatingField {
    pub fn next_mode(&mut self) {
        self.mode = self.mode.next_mode();
        log::info!("Rotation mode -> {:?}", self.mode);
    }

    /// Set frequency and spin from a raw stick deflection
    ///
    /// The sign of `raw` picks the spin; its magnitude sets the frequency,
    /// clamped to the selectable range.
    pub fn from_stick(&mut self, raw: i16) {
        let value = raw as f64 / STICK_FULL_SCALE / 30.0;
        self.spin = if value >= 0.0 {
            Spin::CounterClockwise
        } else {
            Spin::Clockwise
        };
        self.frequency_hz = (value.abs() * 10.0).clamp(FREQUENCY_RANGE.0, FREQUENCY_RANGE.1);
    }

    /// Angular velocity including the spin sign (rad/s)
    pub fn omega(&self) -> f64 {
        2.0 * PI * self.frequency_hz * self.spin.sign()
    }

    /// Field command `t` seconds after the rotation started
    pub fn sample(&self, t: f64) -> AxisCommand {
        let phase = self.omega() * t;
        let (s, c) = (self.amplitude * phase.sin(), self.amplitude * phase.cos());
        match self.mode {
            RotationMode::X | RotationMode::YZ => AxisCommand::new(0.0, s, c),
            RotationMode::Y | RotationMode::XZ => AxisCommand::new(s, 0.0, c),
            RotationMode::Z | RotationMode::XY => AxisCommand::new(s, c, 0.0),
        }
    }
}
