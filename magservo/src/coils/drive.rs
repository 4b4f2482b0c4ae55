//! Axis-level commands and their distribution over coil pairs

use super::mapper::{CoilMapper, CoilVector, COIL_COUNT};
use crate::controllers::Axis;
use crate::error::{ServoError, ServoResult};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Duty-cycle ceiling of the reference coil drivers (%)
pub const MAX_PWM: f64 = 60.0;

/// Per-axis control output, in the units of the active [`ControlSpace`]
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct AxisCommand {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl AxisCommand {
    pub fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    /// In-plane command with no Z drive
    pub fn planar(x: f64, y: f64) -> Self {
        Self { x, y, z: 0.0 }
    }

    pub fn zero() -> Self {
        Self::default()
    }

    pub fn get(&self, axis: Axis) -> f64 {
        match axis {
            Axis::X => self.x,
            Axis::Y => self.y,
            Axis::Z => self.z,
        }
    }
}

/// Coil pair polarity convention
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum DriveMode {
    /// Both coils with the same polarity: uniform field
    #[default]
    Helmholtz,
    /// Coils with opposite polarity: field gradient
    Maxwell,
}

impl DriveMode {
    /// Values for the (first, second) coil of a pair
    pub fn split(self, value: f64) -> (f64, f64) {
        match self {
            DriveMode::Helmholtz => (value, value),
            DriveMode::Maxwell => (value, -value),
        }
    }
}

/// Drive mode of each axis
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct AxisModes {
    pub x: DriveMode,
    pub y: DriveMode,
    pub z: DriveMode,
}

impl AxisModes {
    pub fn get(&self, axis: Axis) -> DriveMode {
        match axis {
            Axis::X => self.x,
            Axis::Y => self.y,
            Axis::Z => self.z,
        }
    }
}

/// Coil indices driven by each axis
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CoilLayout {
    pub x: (usize, usize),
    pub y: (usize, usize),
    pub z: (usize, usize),
}

impl CoilLayout {
    pub fn pair(&self, axis: Axis) -> (usize, usize) {
        match axis {
            Axis::X => self.x,
            Axis::Y => self.y,
            Axis::Z => self.z,
        }
    }

    /// Every coil must belong to exactly one axis
    pub fn validate(&self) -> ServoResult<()> {
        let mut seen = [false; COIL_COUNT];
        for axis in [Axis::X, Axis::Y, Axis::Z] {
            let (a, b) = self.pair(axis);
            for index in [a, b] {
                if index >= COIL_COUNT {
                    return Err(ServoError::InvalidConfig(format!(
                        "{axis} axis uses coil {index}, array has {COIL_COUNT}"
                    )));
                }
                if seen[index] {
                    return Err(ServoError::InvalidConfig(format!(
                        "coil {index} assigned to more than one axis"
                    )));
                }
                seen[index] = true;
            }
        }
        Ok(())
    }
}

impl Default for CoilLayout {
    /// Reference wiring: Z on coils 0/1, Y on 2/3, X on 4/5
    fn default() -> Self {
        Self {
            x: (4, 5),
            y: (2, 3),
            z: (0, 1),
        }
    }
}

/// Space in which [`AxisCommand`] values are expressed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ControlSpace {
    /// Axis values are duty-cycle percentages
    #[default]
    Pwm,
    /// Axis values are per-coil field targets (mT)
    Field,
}

/// Polarity of a single coil driver
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CoilDirection {
    Forward,
    Reverse,
    Off,
}

/// Signed duty cycle for every coil, always within `±max_duty`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CoilCommand {
    duties: [f64; COIL_COUNT],
}

impl CoilCommand {
    /// Clamp each duty to `±max_duty`; non-finite values become zero
    pub fn new(duties: [f64; COIL_COUNT], max_duty: f64) -> Self {
        let limit = max_duty.abs();
        let duties = duties.map(|d| if d.is_finite() { d.clamp(-limit, limit) } else { 0.0 });
        Self { duties }
    }

    /// All coils off
    pub fn zero() -> Self {
        Self {
            duties: [0.0; COIL_COUNT],
        }
    }

    pub fn duties(&self) -> &[f64; COIL_COUNT] {
        &self.duties
    }

    pub fn duty(&self, coil: usize) -> f64 {
        self.duties[coil]
    }

    /// DIR pin state for a coil
    pub fn direction(&self, coil: usize) -> CoilDirection {
        let duty = self.duties[coil];
        if duty > 0.0 {
            CoilDirection::Forward
        } else if duty < 0.0 {
            CoilDirection::Reverse
        } else {
            CoilDirection::Off
        }
    }

    /// Unsigned PWM duty for a coil
    pub fn magnitude(&self, coil: usize) -> f64 {
        self.duties[coil].abs()
    }

    pub fn is_zero(&self) -> bool {
        self.duties.iter().all(|d| *d == 0.0)
    }

    pub fn as_vector(&self) -> CoilVector {
        CoilVector::from_column_slice(&self.duties)
    }
}

impl Default for CoilCommand {
    fn default() -> Self {
        Self::zero()
    }
}

impl fmt::Display for CoilCommand {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "[")?;
        for (i, duty) in self.duties.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{duty:+.1}")?;
        }
        write!(f, "]%")
    }
}

/// Turns axis commands into per-coil duty cycles
#[derive(Debug, Clone)]
pub struct CoilActuator {
    mapper: CoilMapper,
    layout: CoilLayout,
    modes: AxisModes,
    space: ControlSpace,
    max_duty: f64,
}

impl CoilActuator {
    pub fn new(
        mapper: CoilMapper,
        layout: CoilLayout,
        modes: AxisModes,
        space: ControlSpace,
        max_duty: f64,
    ) -> ServoResult<Self> {
        layout.validate()?;
        if !(max_duty.is_finite() && max_duty > 0.0 && max_duty <= 100.0) {
            return Err(ServoError::InvalidConfig(format!(
                "max duty {max_duty} outside (0, 100]"
            )));
        }
        Ok(Self {
            mapper,
            layout,
            modes,
            space,
            max_duty,
        })
    }

    pub fn mapper(&self) -> &CoilMapper {
        &self.mapper
    }

    pub fn layout(&self) -> &CoilLayout {
        &self.layout
    }

    pub fn space(&self) -> ControlSpace {
        self.space
    }

    pub fn max_duty(&self) -> f64 {
        self.max_duty
    }

    pub fn set_mode(&mut self, axis: Axis, mode: DriveMode) {
        match axis {
            Axis::X => self.modes.x = mode,
            Axis::Y => self.modes.y = mode,
            Axis::Z => self.modes.z = mode,
        }
        log::info!("{axis} axis drive mode set to {mode:?}");
    }

    pub fn modes(&self) -> AxisModes {
        self.modes
    }

    /// Per-coil values in the active control space
    fn distribute(&self, command: &AxisCommand) -> CoilVector {
        let mut values = CoilVector::zeros();
        for axis in [Axis::X, Axis::Y, Axis::Z] {
            let (first, second) = self.layout.pair(axis);
            let (a, b) = self.modes.get(axis).split(command.get(axis));
            values[first] = a;
            values[second] = b;
        }
        values
    }

    /// Duty cycles for an axis command
    pub fn command_for(&self, command: &AxisCommand) -> CoilCommand {
        let values = self.distribute(command);
        let duties = match self.space {
            ControlSpace::Pwm => values,
            ControlSpace::Field => self.mapper.field_to_pwm(&values),
        };
        let mut out = [0.0; COIL_COUNT];
        out.copy_from_slice(duties.as_slice());
        CoilCommand::new(out, self.max_duty)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coils::CoilCalibration;
    use approx::assert_relative_eq;

    fn actuator(modes: AxisModes, space: ControlSpace) -> CoilActuator {
        let mapper = CoilMapper::new(&CoilCalibration::reference()).unwrap();
        CoilActuator::new(mapper, CoilLayout::default(), modes, space, MAX_PWM).unwrap()
    }

    #[test]
    fn test_helmholtz_drives_pair_equally() {
        let act = actuator(AxisModes::default(), ControlSpace::Pwm);
        let cmd = act.command_for(&AxisCommand::new(30.0, -20.0, 5.0));
        assert_eq!(cmd.duties(), &[5.0, 5.0, -20.0, -20.0, 30.0, 30.0]);
    }

    #[test]
    fn test_maxwell_drives_pair_opposite() {
        let modes = AxisModes {
            y: DriveMode::Maxwell,
            ..Default::default()
        };
        let act = actuator(modes, ControlSpace::Pwm);
        let cmd = act.command_for(&AxisCommand::planar(10.0, 25.0));
        assert_eq!(cmd.duties(), &[0.0, 0.0, 25.0, -25.0, 10.0, 10.0]);
        assert_eq!(cmd.direction(2), CoilDirection::Forward);
        assert_eq!(cmd.direction(3), CoilDirection::Reverse);
        assert_eq!(cmd.direction(0), CoilDirection::Off);
        assert_eq!(cmd.magnitude(3), 25.0);
    }

    #[test]
    fn test_command_is_clamped() {
        let act = actuator(AxisModes::default(), ControlSpace::Pwm);
        let cmd = act.command_for(&AxisCommand::new(500.0, -61.0, f64::NAN));
        assert_eq!(cmd.duty(4), MAX_PWM);
        assert_eq!(cmd.duty(2), -MAX_PWM);
        assert_eq!(cmd.duty(0), 0.0);
    }

    #[test]
    fn test_field_space_uses_inverse_map() {
        let act = actuator(AxisModes::default(), ControlSpace::Field);
        let target = AxisCommand::new(0.3, 0.25, 0.25);
        let cmd = act.command_for(&target);

        // Unclamped duties reproduce the requested per-coil field
        let field = act.mapper().pwm_to_field(&cmd.as_vector());
        for axis in [Axis::X, Axis::Y, Axis::Z] {
            let (a, b) = act.layout().pair(axis);
            assert_relative_eq!(field[a], target.get(axis), epsilon = 1e-9);
            assert_relative_eq!(field[b], target.get(axis), epsilon = 1e-9);
        }
    }

    #[test]
    fn test_invalid_layout_rejected() {
        let layout = CoilLayout {
            x: (0, 1),
            y: (1, 2),
            z: (3, 4),
        };
        assert!(matches!(layout.validate(), Err(ServoError::InvalidConfig(_))));

        let layout = CoilLayout {
            x: (0, 1),
            y: (2, 3),
            z: (4, 6),
        };
        assert!(layout.validate().is_err());
        assert!(CoilLayout::default().validate().is_ok());
    }

    #[test]
    fn test_zero_command() {
        let cmd = CoilCommand::zero();
        assert!(cmd.is_zero());
        assert!((0..COIL_COUNT).all(|i| cmd.direction(i) == CoilDirection::Off));
        assert_eq!(format!("{cmd}"), "[+0.0, +0.0, +0.0, +0.0, +0.0, +0.0]%");
    }
}
