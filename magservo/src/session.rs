//! Frame-synchronous control session
//!
//! A [`ServoSession`] owns every per-session component and runs one control
//! tick per frame:
//! 1. Drain queued operator events into the supervisor
//! 2. Locate the object inside the workspace region
//! 3. Step the supervisor at the frame timestamp
//! 4. Map the axis command onto the coils and hand it to the sink
//! 5. Notify registered callbacks

use crate::callback::{CallbackId, ServoCallback, ServoCallbackEvent};
use crate::coils::{CoilActuator, CoilCommand};
use crate::config::ServoConfig;
use crate::error::ServoResult;
use crate::localizer::{ObjectLocalizer, TrackedPosition};
use crate::operator::{operator_channel, OperatorHandle};
use crate::region::WorkspaceRegion;
use crate::sink::ActuatorSink;
use crate::state::{OperatorEvent, SupervisorState};
use crate::supervisor::{ControlAction, PathSupervisor};
use shared::camera_interface::{Frame, Timestamp};
use std::collections::HashMap;
use std::sync::mpsc::Receiver;
use std::sync::{Arc, Mutex};

/// Summary of one control tick
#[derive(Debug, Clone, PartialEq)]
pub struct TickReport {
    pub frame_number: u64,
    pub timestamp: Timestamp,
    /// Localizer output for this frame
    pub position: TrackedPosition,
    /// Supervisor state after the tick
    pub state: SupervisorState,
    pub action: ControlAction,
    /// Command sent to the sink, if any
    pub command: Option<CoilCommand>,
    /// `(dx, dy, |e|)` to the active target, if evaluated
    pub error: Option<(f64, f64, f64)>,
    pub waypoint_reached: Option<usize>,
    pub path_complete: bool,
    /// Operator events applied at the start of the tick
    pub events_applied: usize,
}

/// Closed-loop servo session writing commands to `S`
pub struct ServoSession<S: ActuatorSink> {
    region: WorkspaceRegion,
    localizer: ObjectLocalizer,
    supervisor: PathSupervisor,
    actuator: CoilActuator,
    sink: S,
    operator: OperatorHandle,
    operator_events: Receiver<OperatorEvent>,
    /// Registered callbacks
    callbacks: Arc<Mutex<HashMap<CallbackId, ServoCallback>>>,
    /// Next callback ID
    next_callback_id: Arc<Mutex<CallbackId>>,
    consecutive_misses: usize,
    frames_processed: usize,
    last_timestamp: Timestamp,
}

impl<S: ActuatorSink> ServoSession<S> {
    /// Validate the configuration and assemble a session
    ///
    /// All setup failures (singular calibration, bad layout, invalid tuning)
    /// surface here, before the first tick.
    pub fn new(config: &ServoConfig, region: WorkspaceRegion, sink: S) -> ServoResult<Self> {
        config.validate()?;
        let actuator = config.actuation.build()?;
        let (operator, operator_events) = operator_channel();

        log::info!(
            "Servo session ready: region {} px over {}, {:?} control space",
            region.area(),
            region.frame_shape(),
            actuator.space()
        );

        Ok(Self {
            region,
            localizer: ObjectLocalizer::new(config.localizer.clone()),
            supervisor: PathSupervisor::new(config.supervisor, config.pid_x, config.pid_y),
            actuator,
            sink,
            operator,
            operator_events,
            callbacks: Arc::new(Mutex::new(HashMap::new())),
            next_callback_id: Arc::new(Mutex::new(0)),
            consecutive_misses: 0,
            frames_processed: 0,
            last_timestamp: Timestamp::default(),
        })
    }

    /// Handle for queueing operator events from any thread
    pub fn operator_handle(&self) -> OperatorHandle {
        self.operator.clone()
    }

    /// Register a callback for servo events
    pub fn register_callback<F>(&self, callback: F) -> CallbackId
    where
        F: Fn(&ServoCallbackEvent) + Send + Sync + 'static,
    {
        let mut callbacks = self.callbacks.lock().unwrap();
        let mut next_id = self.next_callback_id.lock().unwrap();

        let callback_id = *next_id;
        *next_id += 1;

        callbacks.insert(callback_id, Arc::new(callback));
        callback_id
    }

    /// Deregister a callback
    pub fn deregister_callback(&self, callback_id: CallbackId) -> bool {
        let mut callbacks = self.callbacks.lock().unwrap();
        callbacks.remove(&callback_id).is_some()
    }

    /// Get the number of registered callbacks
    pub fn callback_count(&self) -> usize {
        self.callbacks.lock().unwrap().len()
    }

    /// Emit an event to all registered callbacks
    fn emit_event(&self, event: &ServoCallbackEvent) {
        let callbacks = self.callbacks.lock().unwrap();
        for callback in callbacks.values() {
            callback(event);
        }
    }

    fn emit_state_change(&self, from: SupervisorState) {
        let to = *self.supervisor.state();
        if from != to {
            log::info!("State {from} -> {to}");
            self.emit_event(&ServoCallbackEvent::StateChanged { from, to });
        }
    }

    pub fn region(&self) -> &WorkspaceRegion {
        &self.region
    }

    /// Replace the workspace region; smoothing restarts from scratch
    pub fn set_region(&mut self, region: WorkspaceRegion) {
        self.region = region;
        self.localizer.reset_smoothing();
        self.consecutive_misses = 0;
    }

    pub fn localizer(&self) -> &ObjectLocalizer {
        &self.localizer
    }

    pub fn supervisor(&self) -> &PathSupervisor {
        &self.supervisor
    }

    /// Direct supervisor access, for live tuning between ticks
    pub fn supervisor_mut(&mut self) -> &mut PathSupervisor {
        &mut self.supervisor
    }

    pub fn actuator(&self) -> &CoilActuator {
        &self.actuator
    }

    pub fn actuator_mut(&mut self) -> &mut CoilActuator {
        &mut self.actuator
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    pub fn sink_mut(&mut self) -> &mut S {
        &mut self.sink
    }

    pub fn into_sink(self) -> S {
        self.sink
    }

    /// Frames in a row without a detection
    pub fn consecutive_misses(&self) -> usize {
        self.consecutive_misses
    }

    pub fn frames_processed(&self) -> usize {
        self.frames_processed
    }

    fn send(&mut self, command: CoilCommand, timestamp: Timestamp) {
        self.sink.apply(&command);
        log::debug!("Applied {command}");
        self.emit_event(&ServoCallbackEvent::CommandApplied { command, timestamp });
    }

    /// Apply queued operator events, returning how many were accepted
    fn drain_operator_events(&mut self) -> usize {
        let events: Vec<OperatorEvent> = self.operator_events.try_iter().collect();
        let mut applied = 0;
        for event in events {
            let before = *self.supervisor.state();
            if self.supervisor.handle_event(event) {
                applied += 1;
            }
            self.emit_state_change(before);
        }
        applied
    }

    /// Stop control now: zero the coils and reset the controllers
    pub fn stop_now(&mut self) {
        let before = *self.supervisor.state();
        self.supervisor.stop();
        self.supervisor.clear_pending_zero();
        self.send(CoilCommand::zero(), self.last_timestamp);
        self.emit_state_change(before);
    }

    /// Run one control tick on `frame`
    pub fn tick(&mut self, frame: &Frame) -> TickReport {
        let timestamp = frame.timestamp();
        self.last_timestamp = timestamp;
        self.frames_processed += 1;

        let events_applied = self.drain_operator_events();

        let position = self.localizer.locate(&frame.view(), &self.region);
        match position {
            TrackedPosition::Detected { x, y } => {
                self.consecutive_misses = 0;
                self.emit_event(&ServoCallbackEvent::PositionUpdate {
                    position: (x, y).into(),
                    timestamp,
                });
            }
            TrackedPosition::Lost { predicted } => {
                self.consecutive_misses += 1;
                log::debug!(
                    "Frame {}: no detection ({} in a row)",
                    frame.metadata.frame_number,
                    self.consecutive_misses
                );
                self.emit_event(&ServoCallbackEvent::TrackingLost {
                    consecutive_misses: self.consecutive_misses,
                    predicted,
                });
            }
        }

        let before = *self.supervisor.state();
        let outcome = self
            .supervisor
            .step(position.position(), timestamp.as_secs_f64());

        for sample in &outcome.samples {
            self.emit_event(&ServoCallbackEvent::ControlSample(*sample));
        }

        let command = match outcome.action {
            ControlAction::Apply(axes) => Some(self.actuator.command_for(&axes)),
            ControlAction::Zero => Some(CoilCommand::zero()),
            ControlAction::Hold => None,
        };
        if let Some(command) = command {
            self.send(command, timestamp);
        }

        if let (Some(index), Some(position)) = (outcome.waypoint_reached, position.position()) {
            self.emit_event(&ServoCallbackEvent::WaypointReached { index, position });
        }
        if outcome.path_complete {
            self.emit_event(&ServoCallbackEvent::PathComplete {
                waypoints: self.supervisor.waypoints().len(),
            });
        }
        self.emit_state_change(before);

        TickReport {
            frame_number: frame.metadata.frame_number,
            timestamp,
            position,
            state: *self.supervisor.state(),
            action: outcome.action,
            command,
            error: outcome.error,
            waypoint_reached: outcome.waypoint_reached,
            path_complete: outcome.path_complete,
            events_applied,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::region::PixelPoint;
    use crate::sink::RecordingSink;
    use shared::camera_interface::FrameMetadata;
    use shared::image_size::PixelShape;
    use std::time::Duration;

    fn blank_frame(frame_number: u64) -> Frame {
        let metadata = FrameMetadata {
            frame_number,
            timestamp: Timestamp::from_duration(Duration::from_millis(frame_number * 50)),
        };
        Frame::filled(PixelShape::new(64, 48), [255, 255, 255], metadata)
    }

    fn session() -> ServoSession<RecordingSink> {
        let region = WorkspaceRegion::full_frame(PixelShape::new(64, 48)).unwrap();
        ServoSession::new(&ServoConfig::default(), region, RecordingSink::new()).unwrap()
    }

    #[test]
    fn test_callback_registration() {
        let session = session();
        let id = session.register_callback(|_| {});
        assert_eq!(session.callback_count(), 1);
        assert!(session.deregister_callback(id));
        assert!(!session.deregister_callback(id));
        assert_eq!(session.callback_count(), 0);
    }

    #[test]
    fn test_misses_are_counted_and_reported() {
        let mut session = session();
        let lost = Arc::new(Mutex::new(Vec::new()));
        let lost_clone = lost.clone();
        session.register_callback(move |event| {
            if let ServoCallbackEvent::TrackingLost {
                consecutive_misses, ..
            } = event
            {
                lost_clone.lock().unwrap().push(*consecutive_misses);
            }
        });

        for n in 0..3 {
            let report = session.tick(&blank_frame(n));
            assert!(!report.position.is_valid());
            assert_eq!(report.action, ControlAction::Hold);
            assert!(report.command.is_none());
        }
        assert_eq!(session.consecutive_misses(), 3);
        assert_eq!(*lost.lock().unwrap(), vec![1, 2, 3]);
        assert!(session.sink().commands().is_empty());
    }

    #[test]
    fn test_operator_events_applied_at_tick_start() {
        let mut session = session();
        let handle = session.operator_handle();
        handle.arm_target(10.0, 10.0).unwrap();
        assert_eq!(session.supervisor().state(), &SupervisorState::Idle);

        let states = Arc::new(Mutex::new(Vec::new()));
        let states_clone = states.clone();
        session.register_callback(move |event| {
            if let ServoCallbackEvent::StateChanged { to, .. } = event {
                states_clone.lock().unwrap().push(*to);
            }
        });

        let report = session.tick(&blank_frame(0));
        assert_eq!(report.events_applied, 1);
        assert_eq!(
            report.state,
            SupervisorState::SingleTarget {
                target: PixelPoint::new(10.0, 10.0)
            }
        );
        assert_eq!(states.lock().unwrap().len(), 1);
    }

    #[test]
    fn test_stop_now_zeroes_sink_synchronously() {
        let mut session = session();
        session.operator_handle().arm_target(10.0, 10.0).unwrap();
        session.tick(&blank_frame(0));

        session.stop_now();
        assert_eq!(session.supervisor().state(), &SupervisorState::Stopped);
        assert!(session.sink().last().unwrap().is_zero());

        // The zero was already delivered; the next tick just holds
        let report = session.tick(&blank_frame(1));
        assert_eq!(report.action, ControlAction::Hold);
        assert_eq!(session.sink().commands().len(), 1);
    }
}
