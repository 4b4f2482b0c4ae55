use crate::coils::{
    AxisModes, CoilActuator, CoilCalibration, CoilLayout, CoilMapper, ControlSpace, MAX_PWM,
};
use crate::controllers::PidConfig;
use crate::error::{ServoError, ServoResult};
use crate::localizer::CentroidMethod;
use serde::{Deserialize, Serialize};
use shared::image_proc::HsvRange;
use std::fs;
use std::path::Path;

/// Noise parameters of the optional centroid smoothing filter
pub use servo_math::KalmanNoise as SmoothingConfig;

/// Object localizer tuning
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LocalizerConfig {
    /// HSV bound box of the tracked object's color
    pub target_range: HsvRange,
    /// Minimum filled blob area in pixels
    pub min_area: usize,
    /// Opening kernel size in pixels (speckle removal)
    pub open_kernel_size: usize,
    /// Closing kernel size in pixels (gap filling)
    pub close_kernel_size: usize,
    /// Preferred centroid estimator; the others serve as fallbacks
    pub centroid_method: CentroidMethod,
    /// Constant-velocity smoothing, disabled if `None`
    pub smoothing: Option<SmoothingConfig>,
}

impl Default for LocalizerConfig {
    fn default() -> Self {
        Self {
            target_range: HsvRange::dark(),
            min_area: 300,
            open_kernel_size: 5,
            close_kernel_size: 11,
            centroid_method: CentroidMethod::default(),
            smoothing: None,
        }
    }
}

/// Path-following supervisor tuning
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SupervisorConfig {
    /// Distance to the current waypoint at which it counts as reached (px)
    pub advance_radius: f64,
    /// Minimum spacing between waypoints recorded in draw mode (px)
    pub draw_min_spacing: f64,
}

impl Default for SupervisorConfig {
    fn default() -> Self {
        Self {
            advance_radius: 5.0,
            draw_min_spacing: 5.0,
        }
    }
}

/// Coil array configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActuationConfig {
    /// Duty-cycle ceiling applied to every coil (%)
    pub max_duty: f64,
    pub control_space: ControlSpace,
    pub layout: CoilLayout,
    pub modes: AxisModes,
    pub calibration: CoilCalibration,
}

impl Default for ActuationConfig {
    fn default() -> Self {
        Self {
            max_duty: MAX_PWM,
            control_space: ControlSpace::default(),
            layout: CoilLayout::default(),
            modes: AxisModes::default(),
            calibration: CoilCalibration::reference(),
        }
    }
}

impl ActuationConfig {
    /// Build the actuator, validating the calibration and layout
    pub fn build(&self) -> ServoResult<CoilActuator> {
        let mapper = CoilMapper::new(&self.calibration)?;
        CoilActuator::new(
            mapper,
            self.layout,
            self.modes,
            self.control_space,
            self.max_duty,
        )
    }
}

/// Complete configuration of a servo session
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ServoConfig {
    pub localizer: LocalizerConfig,
    /// Horizontal (pixel x) controller
    pub pid_x: PidConfig,
    /// Vertical (pixel y) controller
    pub pid_y: PidConfig,
    pub supervisor: SupervisorConfig,
    pub actuation: ActuationConfig,
}

fn invalid(msg: String) -> ServoError {
    ServoError::InvalidConfig(msg)
}

fn validate_pid(name: &str, pid: &PidConfig) -> ServoResult<()> {
    pid.validate().map_err(|err| match err {
        ServoError::InvalidConfig(msg) => invalid(format!("{name}: {msg}")),
        other => other,
    })
}

impl ServoConfig {
    /// Check every section; actuation is validated by building it
    pub fn validate(&self) -> ServoResult<()> {
        let loc = &self.localizer;
        if loc.open_kernel_size == 0 || loc.close_kernel_size == 0 {
            return Err(invalid("morphology kernel sizes must be at least 1".into()));
        }
        let range = &loc.target_range;
        if (0..3).any(|c| range.lower[c] > range.upper[c]) {
            return Err(invalid(format!(
                "target range lower {:?} exceeds upper {:?}",
                range.lower, range.upper
            )));
        }
        if let Some(noise) = loc.smoothing {
            if !(noise.process_noise > 0.0 && noise.measurement_noise > 0.0) {
                return Err(invalid("smoothing noise terms must be positive".into()));
            }
        }

        validate_pid("pid_x", &self.pid_x)?;
        validate_pid("pid_y", &self.pid_y)?;

        let sup = &self.supervisor;
        if !(sup.advance_radius.is_finite() && sup.advance_radius > 0.0) {
            return Err(invalid(format!(
                "advance_radius {} must be positive",
                sup.advance_radius
            )));
        }
        if !(sup.draw_min_spacing.is_finite() && sup.draw_min_spacing >= 0.0) {
            return Err(invalid(format!(
                "draw_min_spacing {} must be non-negative",
                sup.draw_min_spacing
            )));
        }

        self.actuation.build().map(|_| ())
    }

    /// Load and validate a JSON configuration file
    pub fn load(path: impl AsRef<Path>) -> ServoResult<Self> {
        let text = fs::read_to_string(path.as_ref())?;
        let config: ServoConfig = serde_json::from_str(&text)?;
        config.validate()?;
        log::info!("Loaded servo configuration from {}", path.as_ref().display());
        Ok(config)
    }

    pub fn save(&self, path: impl AsRef<Path>) -> ServoResult<()> {
        fs::write(path, serde_json::to_string_pretty(self)?)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_default_is_valid() {
        let config = ServoConfig::default();
        config.validate().unwrap();
        assert_eq!(config.localizer.min_area, 300);
        assert_eq!(config.supervisor.advance_radius, 5.0);
        assert_eq!(config.actuation.max_duty, 60.0);
    }

    #[test]
    fn test_round_trip_through_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("servo.json");

        let mut config = ServoConfig::default();
        config.pid_x = PidConfig::new(0.8, 0.05, 0.01)
            .with_limits(-40.0, 40.0)
            .with_anti_windup(0.5);
        config.localizer.smoothing = Some(SmoothingConfig::default());
        config.localizer.centroid_method = CentroidMethod::DistancePeak;
        config.actuation.control_space = ControlSpace::Field;
        config.save(&path).unwrap();

        assert_eq!(ServoConfig::load(&path).unwrap(), config);
    }

    #[test]
    fn test_rejects_bad_sections() {
        let mut config = ServoConfig::default();
        config.supervisor.advance_radius = 0.0;
        assert!(matches!(config.validate(), Err(ServoError::InvalidConfig(_))));

        let mut config = ServoConfig::default();
        config.pid_y = PidConfig::new(1.0, 0.0, 0.0).with_limits(10.0, -10.0);
        assert!(config.validate().is_err());

        let mut config = ServoConfig::default();
        config.localizer.target_range = HsvRange::new([10, 0, 0], [5, 255, 255]);
        assert!(config.validate().is_err());

        let mut config = ServoConfig::default();
        config.actuation.calibration.pwm_to_current_gain[1][1] = 0.0;
        assert!(matches!(
            config.validate(),
            Err(ServoError::SingularMapping { .. })
        ));
    }

    #[test]
    fn test_load_reports_parse_errors() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("broken.json");
        std::fs::write(&path, "{ \"localizer\": ").unwrap();
        assert!(matches!(ServoConfig::load(&path), Err(ServoError::Json(_))));
        assert!(matches!(
            ServoConfig::load(dir.path().join("missing.json")),
            Err(ServoError::Io(_))
        ));
    }
}
