//! Magservo harness for testing and simulation
//!
//! Provides a simulated coil rig, waypoint path generators, and a runner
//! that drives a servo session against any frame source.

pub mod paths;
pub mod runner;
pub mod simulated_rig;

pub use paths::{circle_path, inset_region, line_path, square_path};
pub use runner::{run_session, run_session_with_callback, LossPolicy, RunnerResults, TrajectoryPoint};
pub use simulated_rig::{RigActuator, RigCamera, RigConfig, SimulatedRig};
