use crate::coils::CoilCommand;
use crate::controllers::PidSample;
use crate::region::PixelPoint;
use crate::state::SupervisorState;
use shared::camera_interface::Timestamp;
use std::sync::Arc;

/// Events emitted for external callbacks
#[derive(Debug, Clone)]
pub enum ServoCallbackEvent {
    /// Supervisor changed state
    StateChanged {
        from: SupervisorState,
        to: SupervisorState,
    },
    /// Object detected this frame
    PositionUpdate {
        position: PixelPoint,
        timestamp: Timestamp,
    },
    /// Object not detected this frame
    TrackingLost {
        consecutive_misses: usize,
        /// Smoothing filter prediction, if smoothing is enabled
        predicted: Option<PixelPoint>,
    },
    /// A path waypoint came within the advance radius
    WaypointReached { index: usize, position: PixelPoint },
    /// The last waypoint of the path was reached
    PathComplete { waypoints: usize },
    /// One axis controller evaluation
    ControlSample(PidSample),
    /// A command was sent to the actuator sink
    CommandApplied {
        command: CoilCommand,
        timestamp: Timestamp,
    },
}

/// Callback ID for registration/deregistration
pub type CallbackId = u64;

/// Callback function type
pub type ServoCallback = Arc<dyn Fn(&ServoCallbackEvent) + Send + Sync>;
