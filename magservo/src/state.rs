use crate::region::PixelPoint;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Path-following supervisor states
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum SupervisorState {
    /// No setpoint armed, nothing is driven
    Idle,
    /// Holding the object on one armed point
    SingleTarget { target: PixelPoint },
    /// Following the waypoint list
    PathFollowing { current_index: usize },
    /// Stopped by the operator or by completing the path; output zeroed
    Stopped,
}

impl SupervisorState {
    /// Whether PID output is applied in this state
    pub fn is_active(&self) -> bool {
        matches!(
            self,
            SupervisorState::SingleTarget { .. } | SupervisorState::PathFollowing { .. }
        )
    }
}

impl fmt::Display for SupervisorState {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            SupervisorState::Idle => write!(f, "Idle"),
            SupervisorState::SingleTarget { target } => {
                write!(f, "SingleTarget({:.1}, {:.1})", target.x, target.y)
            }
            SupervisorState::PathFollowing { current_index } => {
                write!(f, "PathFollowing[{current_index}]")
            }
            SupervisorState::Stopped => write!(f, "Stopped"),
        }
    }
}

/// Operator input, applied between control ticks
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum OperatorEvent {
    /// Hold the object on a single point
    ArmTarget(PixelPoint),
    /// Release a single target
    Disarm,
    /// Append a waypoint to the path
    AddWaypoint(PixelPoint),
    /// Empty the path; stops path following
    ClearWaypoints,
    /// Enable or disable recording of cursor samples as waypoints
    SetDrawMode(bool),
    /// Cursor position sampled while drawing
    DrawSample(PixelPoint),
    /// Begin following the path from its first waypoint
    Start,
    /// Stop all control and zero the coils
    Stop,
}
