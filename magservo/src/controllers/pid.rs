//! Single-axis PID controller
//!
//! # Operation
//! 1. Create with `PidController::new(axis, config)`
//! 2. Set the target with `set_setpoint()`
//! 3. Call `compute(measurement, now)` once per control tick
//! 4. Call `reset()` when control stops or the target context changes
//!
//! The first `compute` after construction or reset is a seed tick: it only
//! records the time and returns zero. Time is in seconds; a tick whose clock
//! did not advance contributes no integral and no derivative.

use crate::error::{ServoError, ServoResult};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Controlled axis, used to tag samples
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Axis {
    X,
    Y,
    Z,
}

impl fmt::Display for Axis {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let name = match self {
            Axis::X => "x",
            Axis::Y => "y",
            Axis::Z => "z",
        };
        write!(f, "{name}")
    }
}

/// Gains and limits of a PID controller
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PidConfig {
    /// Proportional gain
    pub kp: f64,
    /// Integral gain
    pub ki: f64,
    /// Derivative gain
    pub kd: f64,
    /// Lower output bound, unbounded if `None`
    pub output_min: Option<f64>,
    /// Upper output bound, unbounded if `None`
    pub output_max: Option<f64>,
    /// Back-calculation anti-windup gain; disabled if `None` or not positive
    pub anti_windup: Option<f64>,
}

impl PidConfig {
    pub fn new(kp: f64, ki: f64, kd: f64) -> Self {
        Self {
            kp,
            ki,
            kd,
            output_min: None,
            output_max: None,
            anti_windup: None,
        }
    }

    /// Symmetric or asymmetric output limits
    pub fn with_limits(mut self, min: f64, max: f64) -> Self {
        self.output_min = Some(min);
        self.output_max = Some(max);
        self
    }

    pub fn with_anti_windup(mut self, kaw: f64) -> Self {
        self.anti_windup = Some(kaw);
        self
    }

    /// Check gains, limits, and anti-windup gain
    ///
    /// Gains and present limits must be finite, `output_min <= output_max`
    /// when both are set, and the anti-windup gain must be finite and `>= 0`.
    pub fn validate(&self) -> ServoResult<()> {
        if ![self.kp, self.ki, self.kd].iter().all(|g| g.is_finite()) {
            return Err(ServoError::InvalidConfig("gains must be finite".into()));
        }
        for bound in [self.output_min, self.output_max].into_iter().flatten() {
            if !bound.is_finite() {
                return Err(ServoError::InvalidConfig(format!(
                    "output limit {bound} must be finite"
                )));
            }
        }
        if let (Some(low), Some(high)) = (self.output_min, self.output_max) {
            if low > high {
                return Err(ServoError::InvalidConfig(format!(
                    "output_min {low} exceeds output_max {high}"
                )));
            }
        }
        if let Some(kaw) = self.anti_windup {
            if !kaw.is_finite() || kaw < 0.0 {
                return Err(ServoError::InvalidConfig(format!(
                    "anti-windup gain {kaw} must be >= 0"
                )));
            }
        }
        Ok(())
    }

    /// Clamp a value into `[output_min, output_max]`, each bound optional
    pub fn clamp(&self, value: f64) -> f64 {
        let mut out = value;
        if let Some(low) = self.output_min {
            out = out.max(low);
        }
        if let Some(high) = self.output_max {
            out = out.min(high);
        }
        out
    }
}

impl Default for PidConfig {
    /// Proportional-only, clamped to the ±60 % duty cycle of the reference drivers
    fn default() -> Self {
        Self::new(1.0, 0.0, 0.0).with_limits(-60.0, 60.0)
    }
}

/// Breakdown of the most recent `compute`
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct PidTerms {
    /// Time since the previous call, in seconds
    pub dt: f64,
    /// `setpoint - measurement`
    pub error: f64,
    pub p: f64,
    pub i: f64,
    pub d: f64,
    /// `p + i + d` before anti-windup and clamping
    pub unsaturated: f64,
    /// Final clamped output
    pub output: f64,
}

/// One controller evaluation, for observers and logs
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PidSample {
    pub axis: Axis,
    /// Controller clock in seconds
    pub time: f64,
    pub measurement: f64,
    pub setpoint: f64,
    pub output: f64,
    pub error: f64,
    pub kp: f64,
    pub ki: f64,
    pub kd: f64,
}

/// PID controller with optional clamping and back-calculation anti-windup
#[derive(Debug, Clone)]
pub struct PidController {
    axis: Axis,
    config: PidConfig,
    setpoint: f64,
    integral: f64,
    last_error: f64,
    last_time: Option<f64>,
    last_terms: Option<PidTerms>,
}

impl PidController {
    pub fn new(axis: Axis, config: PidConfig) -> Self {
        Self {
            axis,
            config,
            setpoint: 0.0,
            integral: 0.0,
            last_error: 0.0,
            last_time: None,
            last_terms: None,
        }
    }

    pub fn axis(&self) -> Axis {
        self.axis
    }

    pub fn config(&self) -> &PidConfig {
        &self.config
    }

    pub fn setpoint(&self) -> f64 {
        self.setpoint
    }

    pub fn set_setpoint(&mut self, setpoint: f64) {
        self.setpoint = setpoint;
    }

    /// Replace the configuration if it validates; the old one is kept on error
    fn retune(&mut self, config: PidConfig) -> ServoResult<()> {
        config.validate()?;
        self.config = config;
        Ok(())
    }

    /// Update gains in place; accumulated state is kept
    pub fn set_gains(&mut self, kp: f64, ki: f64, kd: f64) -> ServoResult<()> {
        self.retune(PidConfig {
            kp,
            ki,
            kd,
            ..self.config
        })
    }

    pub fn set_output_limits(&mut self, min: Option<f64>, max: Option<f64>) -> ServoResult<()> {
        self.retune(PidConfig {
            output_min: min,
            output_max: max,
            ..self.config
        })
    }

    pub fn set_anti_windup(&mut self, kaw: Option<f64>) -> ServoResult<()> {
        self.retune(PidConfig {
            anti_windup: kaw,
            ..self.config
        })
    }

    /// Integral accumulator (error·seconds)
    pub fn integral(&self) -> f64 {
        self.integral
    }

    /// Terms of the last non-seed `compute`, if any
    pub fn last_terms(&self) -> Option<&PidTerms> {
        self.last_terms.as_ref()
    }

    /// Whether the next `compute` will be a seed tick
    pub fn is_seeded(&self) -> bool {
        self.last_time.is_some()
    }

    /// Clear integral, last error, and last time
    pub fn reset(&mut self) {
        self.integral = 0.0;
        self.last_error = 0.0;
        self.last_time = None;
        self.last_terms = None;
    }

    /// Compute the control output for a measurement taken at `now` seconds
    pub fn compute(&mut self, measurement: f64, now: f64) -> f64 {
        let Some(last_time) = self.last_time else {
            self.last_time = Some(now);
            return 0.0;
        };

        let dt = now - last_time;
        let error = self.setpoint - measurement;
        let PidConfig { kp, ki, kd, .. } = self.config;

        let p = kp * error;
        let d = if dt > 0.0 {
            self.integral += error * dt;
            kd * (error - self.last_error) / dt
        } else {
            log::debug!("{} axis: non-positive dt {dt:.3e}s, skipping integral and derivative", self.axis);
            0.0
        };
        let mut i = ki * self.integral;

        self.last_error = error;
        self.last_time = Some(now);

        let unsaturated = p + i + d;
        let saturated = self.config.clamp(unsaturated);

        if let Some(kaw) = self.config.anti_windup {
            if kaw > 0.0 && ki != 0.0 && dt > 0.0 {
                self.integral += (kaw / ki) * (saturated - unsaturated) * dt;
                i = ki * self.integral;
            }
        }

        let output = self.config.clamp(p + i + d);
        self.last_terms = Some(PidTerms {
            dt,
            error,
            p,
            i,
            d,
            unsaturated,
            output,
        });
        output
    }

    /// Sample record for the last `compute`
    pub fn sample(&self, measurement: f64, time: f64) -> Option<PidSample> {
        let terms = self.last_terms?;
        Some(PidSample {
            axis: self.axis,
            time,
            measurement,
            setpoint: self.setpoint,
            output: terms.output,
            error: terms.error,
            kp: self.config.kp,
            ki: self.config.ki,
            kd: self.config.kd,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use rand::{Rng, SeedableRng};
    use rand_chacha::ChaCha8Rng;

    #[test]
    fn test_seed_tick_returns_zero() {
        for (kp, ki, kd) in [(1.0, 0.0, 0.0), (5.0, 2.0, 1.0), (-3.0, 0.5, 0.1)] {
            let mut pid = PidController::new(Axis::X, PidConfig::new(kp, ki, kd));
            pid.set_setpoint(100.0);
            assert_eq!(pid.compute(-42.0, 10.0), 0.0);
            assert!(pid.is_seeded());
            assert!(pid.last_terms().is_none());
        }
    }

    #[test]
    fn test_proportional_only() {
        let mut pid = PidController::new(Axis::X, PidConfig::new(2.0, 0.0, 0.0));
        pid.set_setpoint(10.0);
        pid.compute(0.0, 0.0);

        let mut t = 0.0;
        for measurement in [0.0, 5.0, 10.0, 12.0, 20.0] {
            t += 0.1;
            let out = pid.compute(measurement, t);
            let error = 10.0 - measurement;
            assert_relative_eq!(out, 2.0 * error, epsilon = 1e-12);
            assert!(error == 0.0 || out.signum() == error.signum());
        }
    }

    #[test]
    fn test_scenario_clamped_below_limit() {
        let mut pid = PidController::new(Axis::X, PidConfig::new(1.0, 0.0, 0.0).with_limits(-60.0, 60.0));
        pid.set_setpoint(300.0);
        assert_eq!(pid.compute(250.0, 0.0), 0.0);
        assert_relative_eq!(pid.compute(250.0, 0.033), 50.0);
        // Larger error saturates
        assert_relative_eq!(pid.compute(100.0, 0.066), 60.0);
    }

    #[test]
    fn test_integral_and_derivative() {
        let mut pid = PidController::new(Axis::Y, PidConfig::new(0.0, 1.0, 0.5));
        pid.set_setpoint(1.0);
        pid.compute(0.0, 0.0);

        // error 1 for 0.5 s -> integral 0.5; derivative (1 - 0)/0.5 * 0.5 = 1
        let out = pid.compute(0.0, 0.5);
        let terms = pid.last_terms().unwrap();
        assert_relative_eq!(terms.i, 0.5);
        assert_relative_eq!(terms.d, 1.0);
        assert_relative_eq!(out, 1.5);
    }

    #[test]
    fn test_non_positive_dt() {
        let mut pid = PidController::new(Axis::X, PidConfig::new(1.0, 1.0, 1.0));
        pid.set_setpoint(5.0);
        pid.compute(0.0, 1.0);
        let out = pid.compute(0.0, 1.0);
        let terms = *pid.last_terms().unwrap();
        assert_eq!(terms.d, 0.0);
        assert_eq!(pid.integral(), 0.0);
        assert_relative_eq!(out, 5.0);

        // Clock going backwards behaves the same way
        let out = pid.compute(0.0, 0.5);
        assert!(out.is_finite());
        assert_eq!(pid.integral(), 0.0);
    }

    #[test]
    fn test_reset_forces_seed_tick() {
        let mut pid = PidController::new(Axis::X, PidConfig::new(1.0, 1.0, 0.0));
        pid.set_setpoint(10.0);
        pid.compute(0.0, 0.0);
        pid.compute(0.0, 1.0);
        assert!(pid.integral() > 0.0);

        pid.reset();
        assert_eq!(pid.integral(), 0.0);
        assert!(!pid.is_seeded());
        assert_eq!(pid.compute(0.0, 2.0), 0.0);
    }

    #[test]
    fn test_output_always_within_limits() {
        let mut rng = ChaCha8Rng::seed_from_u64(42);

        for _ in 0..200 {
            let low = rng.gen_range(-100.0..0.0);
            let high = rng.gen_range(0.0..100.0);
            let mut config = PidConfig::new(
                rng.gen_range(-50.0..50.0),
                rng.gen_range(-20.0..20.0),
                rng.gen_range(-5.0..5.0),
            )
            .with_limits(low, high);
            if rng.gen_bool(0.5) {
                config = config.with_anti_windup(rng.gen_range(0.0..10.0));
            }

            let mut pid = PidController::new(Axis::X, config);
            pid.set_setpoint(rng.gen_range(-500.0..500.0));
            let mut t = 0.0;
            for _ in 0..50 {
                // Include zero and negative time steps
                t += rng.gen_range(-0.01..0.1);
                let out = pid.compute(rng.gen_range(-1000.0..1000.0), t);
                assert!(out >= low && out <= high, "{out} outside [{low}, {high}]");
            }
        }
    }

    #[test]
    fn test_one_sided_limit() {
        let mut config = PidConfig::new(1.0, 0.0, 0.0);
        config.output_max = Some(10.0);
        let mut pid = PidController::new(Axis::X, config);
        pid.set_setpoint(0.0);
        pid.compute(0.0, 0.0);
        assert_relative_eq!(pid.compute(500.0, 1.0), -500.0);
        assert_relative_eq!(pid.compute(-500.0, 2.0), 10.0);
    }

    /// Ticks until the output turns negative after the setpoint is reversed
    fn recovery_ticks(anti_windup: Option<f64>) -> usize {
        let mut config = PidConfig::new(1.0, 1.0, 0.0).with_limits(-10.0, 10.0);
        config.anti_windup = anti_windup;
        let mut pid = PidController::new(Axis::X, config);
        let dt = 0.1;
        let mut k = 0;

        pid.set_setpoint(100.0);
        for _ in 0..100 {
            pid.compute(0.0, k as f64 * dt);
            k += 1;
        }

        pid.set_setpoint(-5.0);
        for ticks in 1..10_000 {
            let out = pid.compute(0.0, k as f64 * dt);
            k += 1;
            if out < 0.0 {
                return ticks;
            }
        }
        usize::MAX
    }

    #[test]
    fn test_anti_windup_shortens_recovery() {
        let with_aw = recovery_ticks(Some(1.0));
        let without_aw = recovery_ticks(None);
        assert!(with_aw <= 2, "anti-windup recovery took {with_aw} ticks");
        assert!(without_aw > 100 * with_aw, "no anti-windup recovered in {without_aw} ticks");
    }

    #[test]
    fn test_sample_records_axis_and_gains() {
        let mut pid = PidController::new(Axis::Y, PidConfig::new(2.0, 0.1, 0.0));
        pid.set_setpoint(4.0);
        assert!(pid.sample(1.0, 0.0).is_none());
        pid.compute(1.0, 0.0);
        pid.compute(1.0, 0.5);
        let sample = pid.sample(1.0, 0.5).unwrap();
        assert_eq!(sample.axis, Axis::Y);
        assert_eq!(sample.setpoint, 4.0);
        assert_relative_eq!(sample.error, 3.0);
        assert_eq!(sample.kp, 2.0);
    }

    #[test]
    fn test_retuning_keeps_state() {
        let mut pid = PidController::new(Axis::X, PidConfig::new(1.0, 1.0, 0.0));
        pid.set_setpoint(10.0);
        pid.compute(0.0, 0.0);
        pid.compute(0.0, 1.0);
        let integral = pid.integral();

        pid.set_gains(2.0, 0.5, 0.1).unwrap();
        pid.set_output_limits(Some(-5.0), None).unwrap();
        pid.set_anti_windup(Some(0.5)).unwrap();
        assert_eq!(pid.integral(), integral);
        assert!(pid.is_seeded());
        assert_eq!(pid.config().kp, 2.0);
        assert_eq!(pid.config().output_max, None);

        // error 10, p = 20, integral grows past 10 -> clamp is one-sided
        assert!(pid.compute(0.0, 2.0) > 20.0);
        assert_relative_eq!(pid.compute(100.0, 3.0), -5.0);
    }

    #[test]
    fn test_inverted_limits_rejected() {
        let mut pid = PidController::new(Axis::X, PidConfig::default());
        let before = *pid.config();
        assert!(matches!(
            pid.set_output_limits(Some(10.0), Some(-10.0)),
            Err(ServoError::InvalidConfig(_))
        ));
        assert_eq!(*pid.config(), before);

        // Zero error still commands zero
        pid.set_setpoint(5.0);
        pid.compute(5.0, 0.0);
        assert_eq!(pid.compute(5.0, 0.1), 0.0);
    }

    #[test]
    fn test_non_finite_tuning_rejected() {
        let mut pid = PidController::new(Axis::Y, PidConfig::default());
        assert!(pid.set_output_limits(Some(f64::NAN), Some(10.0)).is_err());
        assert!(pid.set_output_limits(None, Some(f64::INFINITY)).is_err());
        assert!(pid.set_gains(1.0, f64::NAN, 0.0).is_err());
        assert!(pid.set_anti_windup(Some(-1.0)).is_err());
        assert!(pid.set_anti_windup(Some(f64::NAN)).is_err());
        assert_eq!(*pid.config(), PidConfig::default());
    }
}
