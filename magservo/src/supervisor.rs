//! Path-following supervisor
//!
//! Sequences single targets and waypoint paths through the X/Y PID
//! controllers. Operator events change state between ticks; `step` runs
//! one control tick against the latest tracked position.

use crate::coils::AxisCommand;
use crate::config::SupervisorConfig;
use crate::controllers::{Axis, PidConfig, PidController, PidSample};
use crate::region::PixelPoint;
use crate::state::{OperatorEvent, SupervisorState};

/// Error from `position` to `target` as `(dx, dy, |e|)`
pub fn calculate_error(position: PixelPoint, target: PixelPoint) -> (f64, f64, f64) {
    let dx = target.x - position.x;
    let dy = target.y - position.y;
    (dx, dy, dx.hypot(dy))
}

/// Ordered list of path targets
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WaypointSequence {
    points: Vec<PixelPoint>,
}

impl WaypointSequence {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, point: PixelPoint) {
        self.points.push(point);
    }

    pub fn clear(&mut self) {
        self.points.clear();
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<PixelPoint> {
        self.points.get(index).copied()
    }

    pub fn last(&self) -> Option<PixelPoint> {
        self.points.last().copied()
    }

    pub fn points(&self) -> &[PixelPoint] {
        &self.points
    }
}

impl FromIterator<PixelPoint> for WaypointSequence {
    fn from_iter<I: IntoIterator<Item = PixelPoint>>(iter: I) -> Self {
        Self {
            points: iter.into_iter().collect(),
        }
    }
}

/// What the actuator should do after a tick
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ControlAction {
    /// Drive the coils with this command
    Apply(AxisCommand),
    /// Drive all coils to zero
    Zero,
    /// Leave the actuator untouched this tick
    Hold,
}

/// Result of one supervisor tick
#[derive(Debug, Clone, PartialEq)]
pub struct StepOutcome {
    pub action: ControlAction,
    /// Error to the active target, if one was evaluated
    pub error: Option<(f64, f64, f64)>,
    /// Index of the waypoint reached this tick
    pub waypoint_reached: Option<usize>,
    /// The last waypoint was reached this tick
    pub path_complete: bool,
    /// PID samples for the axes evaluated this tick
    pub samples: Vec<PidSample>,
}

impl StepOutcome {
    fn with_action(action: ControlAction) -> Self {
        Self {
            action,
            error: None,
            waypoint_reached: None,
            path_complete: false,
            samples: Vec::new(),
        }
    }
}

/// State machine driving the X/Y controllers toward targets
#[derive(Debug, Clone)]
pub struct PathSupervisor {
    config: SupervisorConfig,
    state: SupervisorState,
    waypoints: WaypointSequence,
    draw_mode: bool,
    pid_x: PidController,
    pid_y: PidController,
    /// A zero command is owed to the actuator on the next tick
    pending_zero: bool,
}

impl PathSupervisor {
    pub fn new(config: SupervisorConfig, pid_x: PidConfig, pid_y: PidConfig) -> Self {
        Self {
            config,
            state: SupervisorState::Idle,
            waypoints: WaypointSequence::new(),
            draw_mode: false,
            pid_x: PidController::new(Axis::X, pid_x),
            pid_y: PidController::new(Axis::Y, pid_y),
            pending_zero: false,
        }
    }

    pub fn state(&self) -> &SupervisorState {
        &self.state
    }

    pub fn config(&self) -> &SupervisorConfig {
        &self.config
    }

    pub fn waypoints(&self) -> &WaypointSequence {
        &self.waypoints
    }

    pub fn draw_mode(&self) -> bool {
        self.draw_mode
    }

    pub fn pid(&self, axis: Axis) -> Option<&PidController> {
        match axis {
            Axis::X => Some(&self.pid_x),
            Axis::Y => Some(&self.pid_y),
            Axis::Z => None,
        }
    }

    /// Mutable access for live tuning
    pub fn pid_mut(&mut self, axis: Axis) -> Option<&mut PidController> {
        match axis {
            Axis::X => Some(&mut self.pid_x),
            Axis::Y => Some(&mut self.pid_y),
            Axis::Z => None,
        }
    }

    /// Point the controllers are currently driving toward
    pub fn current_target(&self) -> Option<PixelPoint> {
        match self.state {
            SupervisorState::SingleTarget { target } => Some(target),
            SupervisorState::PathFollowing { current_index } => self.waypoints.get(current_index),
            SupervisorState::Idle | SupervisorState::Stopped => None,
        }
    }

    fn reset_controllers(&mut self) {
        self.pid_x.reset();
        self.pid_y.reset();
    }

    fn set_setpoints(&mut self, target: PixelPoint) {
        self.pid_x.set_setpoint(target.x);
        self.pid_y.set_setpoint(target.y);
    }

    /// Begin a new control context aimed at `target`
    fn engage(&mut self, target: PixelPoint) {
        self.reset_controllers();
        self.set_setpoints(target);
    }

    /// Zero output and clear controller state
    fn halt(&mut self) -> SupervisorState {
        self.reset_controllers();
        self.pending_zero = true;
        SupervisorState::Stopped
    }

    /// Stop immediately, regardless of state
    ///
    /// Returns true if control was active.
    pub fn stop(&mut self) -> bool {
        let was_active = self.state.is_active();
        if was_active {
            log::info!("Stopping from {}", self.state);
            self.state = self.halt();
        } else {
            self.reset_controllers();
        }
        was_active
    }

    /// Mark the owed zero command as already delivered
    pub(crate) fn clear_pending_zero(&mut self) {
        self.pending_zero = false;
    }

    /// Apply an operator event
    ///
    /// Returns false when the event does not apply in the current state and
    /// was ignored.
    pub fn handle_event(&mut self, event: OperatorEvent) -> bool {
        use SupervisorState::*;

        let new_state = match (&self.state, event) {
            (PathFollowing { .. }, OperatorEvent::ArmTarget(_)) => {
                log::warn!("Ignoring target while following a path; stop first");
                return false;
            }
            (_, OperatorEvent::ArmTarget(target)) => {
                log::info!("Target armed at ({:.1}, {:.1})", target.x, target.y);
                self.engage(target);
                SingleTarget { target }
            }

            (SingleTarget { .. }, OperatorEvent::Disarm) => {
                log::info!("Target disarmed, returning to Idle");
                self.reset_controllers();
                self.pending_zero = true;
                Idle
            }

            (_, OperatorEvent::AddWaypoint(point)) => {
                self.waypoints.push(point);
                log::info!(
                    "Waypoint {} added at ({:.1}, {:.1})",
                    self.waypoints.len() - 1,
                    point.x,
                    point.y
                );
                self.state
            }

            (PathFollowing { .. }, OperatorEvent::ClearWaypoints) => {
                log::info!("Waypoints cleared while following, stopping");
                self.waypoints.clear();
                self.halt()
            }
            (_, OperatorEvent::ClearWaypoints) => {
                self.waypoints.clear();
                self.state
            }

            (_, OperatorEvent::SetDrawMode(enabled)) => {
                self.draw_mode = enabled;
                log::info!("Draw mode {}", if enabled { "on" } else { "off" });
                self.state
            }

            (_, OperatorEvent::DrawSample(point)) if self.draw_mode => {
                let far_enough = self
                    .waypoints
                    .last()
                    .map_or(true, |last| last.distance_to(&point) >= self.config.draw_min_spacing);
                if far_enough {
                    self.waypoints.push(point);
                    log::debug!("Draw sample ({:.1}, {:.1}) recorded", point.x, point.y);
                }
                self.state
            }

            (PathFollowing { .. }, OperatorEvent::Start) => {
                log::warn!("Already following a path, ignoring start");
                return false;
            }
            (_, OperatorEvent::Start) => match self.waypoints.get(0) {
                Some(first) => {
                    log::info!("Following {} waypoints", self.waypoints.len());
                    self.engage(first);
                    PathFollowing { current_index: 0 }
                }
                None => {
                    log::warn!("Cannot start: no waypoints");
                    return false;
                }
            },

            (SingleTarget { .. } | PathFollowing { .. }, OperatorEvent::Stop) => {
                log::info!("Stop requested in {}", self.state);
                self.halt()
            }

            (state, event) => {
                log::warn!("Invalid operator event {event:?} in state {state}");
                return false;
            }
        };

        self.state = new_state;
        true
    }

    fn drive(&mut self, position: PixelPoint, now: f64) -> (AxisCommand, Vec<PidSample>) {
        let ux = self.pid_x.compute(position.x, now);
        let uy = self.pid_y.compute(position.y, now);
        let samples = [
            self.pid_x.sample(position.x, now),
            self.pid_y.sample(position.y, now),
        ]
        .into_iter()
        .flatten()
        .collect();
        (AxisCommand::planar(ux, uy), samples)
    }

    /// Run one control tick at time `now` (seconds)
    ///
    /// `position` is `None` when the object was not detected this frame; the
    /// controllers are then left untouched and the actuator holds.
    ///
    /// A zero owed by `Stop`, `Disarm`, or clearing a running path is always
    /// delivered first. If a new target or path was engaged before this tick,
    /// the tick is spent on the zero and the controllers seed on the next one.
    pub fn step(&mut self, position: Option<PixelPoint>, now: f64) -> StepOutcome {
        if std::mem::take(&mut self.pending_zero) {
            return StepOutcome::with_action(ControlAction::Zero);
        }

        let (target, index) = match self.state {
            SupervisorState::SingleTarget { target } => (target, None),
            SupervisorState::PathFollowing { current_index } => {
                match self.waypoints.get(current_index) {
                    Some(target) => (target, Some(current_index)),
                    None => {
                        log::warn!("Waypoint index {current_index} out of range, stopping");
                        self.state = self.halt();
                        return StepOutcome::with_action(ControlAction::Hold);
                    }
                }
            }
            SupervisorState::Idle | SupervisorState::Stopped => {
                return StepOutcome::with_action(ControlAction::Hold);
            }
        };

        let Some(position) = position else {
            log::debug!("No tracked position, holding");
            return StepOutcome::with_action(ControlAction::Hold);
        };

        let error = calculate_error(position, target);
        let (command, samples) = self.drive(position, now);
        let mut outcome = StepOutcome {
            action: ControlAction::Apply(command),
            error: Some(error),
            waypoint_reached: None,
            path_complete: false,
            samples,
        };

        if let Some(index) = index {
            if error.2 < self.config.advance_radius {
                outcome.waypoint_reached = Some(index);
                if index + 1 >= self.waypoints.len() {
                    log::info!("Final waypoint {index} reached, path complete");
                    self.reset_controllers();
                    self.state = SupervisorState::Stopped;
                    outcome.path_complete = true;
                    outcome.action = ControlAction::Zero;
                } else {
                    let next = index + 1;
                    log::info!("Waypoint {index} reached, advancing to {next}");
                    if let Some(target) = self.waypoints.get(next) {
                        self.set_setpoints(target);
                    }
                    self.state = SupervisorState::PathFollowing {
                        current_index: next,
                    };
                }
            }
        }

        outcome
    }
}
