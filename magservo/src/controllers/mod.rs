//! Feedback controllers for the servo loop
//!
//! One [`PidController`] runs per controlled axis; the supervisor owns the
//! pair and feeds them the current setpoint each tick.

mod pid;

pub use pid::{Axis, PidConfig, PidController, PidSample, PidTerms};
