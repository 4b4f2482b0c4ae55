//! Runner for executing a servo session against a frame source
//!
//! Reads frames, ticks the session, and applies the driver-level
//! loss-of-track policy, collecting results.

use magservo::{
    ActuatorSink, PixelPoint, ServoCallbackEvent, ServoSession, SupervisorState, TickReport,
};
use serde::Serialize;
use shared::camera_interface::{CameraError, FrameSource};
use std::sync::{Arc, Mutex};

/// What to do when the object stays out of sight
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LossPolicy {
    /// Stop the session after this many consecutive misses; never if `None`
    pub max_consecutive_misses: Option<usize>,
}

impl LossPolicy {
    pub fn stop_after(misses: usize) -> Self {
        Self {
            max_consecutive_misses: Some(misses),
        }
    }

    pub fn never_stop() -> Self {
        Self::default()
    }

    fn exceeded(&self, misses: usize) -> bool {
        self.max_consecutive_misses.is_some_and(|limit| misses > limit)
    }
}

/// One trajectory sample
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrajectoryPoint {
    /// Frame time in seconds
    pub time: f64,
    /// Tracked position, if detected
    pub position: Option<PixelPoint>,
    /// Active target after the tick
    pub target: Option<PixelPoint>,
}

/// Results from a runner execution
#[derive(Debug, Clone)]
pub struct RunnerResults {
    /// Total frames processed
    pub frames_processed: usize,
    /// Frames where the object was detected
    pub frames_detected: usize,
    /// Frames where the object was not detected
    pub frames_lost: usize,
    /// Final supervisor state
    pub final_state: SupervisorState,
    /// Loss policy stopped the session
    pub stopped_by_policy: bool,
    /// Any errors encountered during execution
    pub errors: Vec<String>,
    /// All events emitted during the run
    pub events: Vec<ServoCallbackEvent>,
    pub trajectory: Vec<TrajectoryPoint>,
}

impl RunnerResults {
    /// Whether a `PathComplete` event was seen
    pub fn path_completed(&self) -> bool {
        self.events
            .iter()
            .any(|e| matches!(e, ServoCallbackEvent::PathComplete { .. }))
    }

    /// Last detected position
    pub fn last_position(&self) -> Option<PixelPoint> {
        self.trajectory.iter().rev().find_map(|p| p.position)
    }
}

/// Run a session for up to `num_frames` frames
pub fn run_session<C, S>(
    session: &mut ServoSession<S>,
    camera: &mut C,
    num_frames: usize,
    policy: LossPolicy,
) -> RunnerResults
where
    C: FrameSource,
    S: ActuatorSink,
{
    run_session_with_callback(session, camera, num_frames, policy, |_, _| {})
}

/// Extended runner with a per-frame callback
///
/// # Arguments
/// * `session` - Servo session to tick
/// * `camera` - Frame source supplying frames
/// * `num_frames` - Maximum number of frames to read
/// * `policy` - Loss-of-track policy
/// * `callback` - Called after each tick with the frame index and report
pub fn run_session_with_callback<C, S, F>(
    session: &mut ServoSession<S>,
    camera: &mut C,
    num_frames: usize,
    policy: LossPolicy,
    mut callback: F,
) -> RunnerResults
where
    C: FrameSource,
    S: ActuatorSink,
    F: FnMut(usize, &TickReport),
{
    let mut results = RunnerResults {
        frames_processed: 0,
        frames_detected: 0,
        frames_lost: 0,
        final_state: *session.supervisor().state(),
        stopped_by_policy: false,
        errors: Vec::new(),
        events: Vec::new(),
        trajectory: Vec::with_capacity(num_frames),
    };

    // Set up event collection
    let events = Arc::new(Mutex::new(Vec::new()));
    let events_clone = events.clone();

    let callback_id = session.register_callback(move |event| {
        events_clone.lock().unwrap().push(event.clone());
    });

    for frame_num in 0..num_frames {
        let frame = match camera.read() {
            Ok(frame) => frame,
            Err(CameraError::EndOfStream { frames_delivered }) => {
                log::info!("Frame source exhausted after {frames_delivered} frames");
                break;
            }
            Err(CameraError::Released) => {
                results.errors.push(format!("Frame {frame_num}: source released"));
                break;
            }
            Err(e) => {
                results.errors.push(format!("Frame {frame_num}: {e}"));
                // Don't break on capture errors, continue processing
                continue;
            }
        };

        let report = session.tick(&frame);
        results.frames_processed += 1;
        if report.position.is_valid() {
            results.frames_detected += 1;
        } else {
            results.frames_lost += 1;
        }
        results.trajectory.push(TrajectoryPoint {
            time: report.timestamp.as_secs_f64(),
            position: report.position.position(),
            target: session.supervisor().current_target(),
        });

        callback(frame_num, &report);

        if policy.exceeded(session.consecutive_misses()) && session.supervisor().state().is_active()
        {
            log::warn!(
                "Object lost for {} frames, stopping",
                session.consecutive_misses()
            );
            session.stop_now();
            results.stopped_by_policy = true;
        }
    }

    results.final_state = *session.supervisor().state();

    // Deregister the callback before collecting, so the Arc has one owner left
    session.deregister_callback(callback_id);

    // Collect all events
    results.events = Arc::try_unwrap(events)
        .map(|mutex| mutex.into_inner().unwrap())
        .unwrap_or_else(|arc| arc.lock().unwrap().clone());

    results
}
