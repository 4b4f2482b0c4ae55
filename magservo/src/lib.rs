//! MAGSERVO - closed-loop visual servoing for magnetic coil rigs
//!
//! Steers a magnetically responsive object to a point, or along a waypoint
//! path, inside an operator-defined workspace seen by a camera.
//! Per frame: Region mask -> Localizer -> Supervisor/PID -> Coil mapping -> Sink

pub mod callback;
pub mod coils;
pub mod config;
pub mod controllers;
pub mod error;
pub mod localizer;
pub mod operator;
pub mod region;
pub mod selection;
pub mod session;
pub mod sink;
pub mod state;
pub mod supervisor;

// Re-export commonly used types for external use
pub use crate::callback::{CallbackId, ServoCallbackEvent};
pub use crate::coils::{AxisCommand, CoilActuator, CoilCalibration, CoilCommand, CoilMapper};
pub use crate::config::{LocalizerConfig, ServoConfig, SupervisorConfig};
pub use crate::controllers::{Axis, PidConfig, PidController};
pub use crate::error::{ServoError, ServoResult};
pub use crate::localizer::{ObjectLocalizer, TrackedPosition};
pub use crate::operator::OperatorHandle;
pub use crate::region::{PixelPoint, RegionSelector, WorkspaceRegion};
pub use crate::session::{ServoSession, TickReport};
pub use crate::sink::{ActuatorSink, NullSink, RecordingSink};
pub use crate::state::{OperatorEvent, SupervisorState};
pub use crate::supervisor::{calculate_error, ControlAction, PathSupervisor};
