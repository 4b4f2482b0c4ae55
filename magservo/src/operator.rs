//! Operator input plumbing
//!
//! Input devices run on their own threads and queue [`OperatorEvent`]s
//! through an [`OperatorHandle`]; the session drains the queue at the start
//! of each tick so the supervisor never sees a half-applied edit.

use crate::region::PixelPoint;
use crate::state::OperatorEvent;
use shared::image_size::PixelShape;
use std::sync::mpsc::{self, Receiver, SendError, Sender};

/// Full-scale raw joystick axis value
pub(crate) const STICK_FULL_SCALE: f64 = 32767.0;

/// Cursor travel per tick while a pad direction is held (px)
pub const CURSOR_STEP: i64 = 5;

/// Cloneable sender for operator events
#[derive(Debug, Clone)]
pub struct OperatorHandle {
    sender: Sender<OperatorEvent>,
}

impl OperatorHandle {
    /// Queue an event for the next tick
    pub fn send(&self, event: OperatorEvent) -> Result<(), SendError<OperatorEvent>> {
        self.sender.send(event)
    }

    pub fn arm_target(&self, x: f64, y: f64) -> Result<(), SendError<OperatorEvent>> {
        self.send(OperatorEvent::ArmTarget(PixelPoint::new(x, y)))
    }

    pub fn add_waypoint(&self, x: f64, y: f64) -> Result<(), SendError<OperatorEvent>> {
        self.send(OperatorEvent::AddWaypoint(PixelPoint::new(x, y)))
    }

    pub fn start(&self) -> Result<(), SendError<OperatorEvent>> {
        self.send(OperatorEvent::Start)
    }

    pub fn stop(&self) -> Result<(), SendError<OperatorEvent>> {
        self.send(OperatorEvent::Stop)
    }
}

/// Create a connected handle/receiver pair
pub fn operator_channel() -> (OperatorHandle, Receiver<OperatorEvent>) {
    let (sender, receiver) = mpsc::channel();
    (OperatorHandle { sender }, receiver)
}

/// Scale a raw joystick axis reading to a duty cycle within `±max_duty`
pub fn stick_to_duty(raw: i16, max_duty: f64) -> f64 {
    let limit = max_duty.abs();
    (raw as f64 / STICK_FULL_SCALE * limit).clamp(-limit, limit)
}

/// Directional pad buttons currently held
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PadState {
    pub up: bool,
    pub down: bool,
    pub left: bool,
    pub right: bool,
}

/// On-screen cursor steered by the directional pad
#[derive(Debug, Clone)]
pub struct DrawCursor {
    x: i64,
    y: i64,
    shape: PixelShape,
    step: i64,
}

impl DrawCursor {
    /// Cursor centered in a frame of `shape`
    pub fn new(shape: PixelShape) -> Self {
        Self {
            x: (shape.width / 2) as i64,
            y: (shape.height / 2) as i64,
            shape,
            step: CURSOR_STEP,
        }
    }

    pub fn with_step(mut self, step: i64) -> Self {
        self.step = step;
        self
    }

    pub fn position(&self) -> PixelPoint {
        PixelPoint::new(self.x as f64, self.y as f64)
    }

    /// Move one step for each held direction, staying inside the frame
    pub fn update(&mut self, pad: PadState) -> PixelPoint {
        if pad.up {
            self.y -= self.step;
        }
        if pad.down {
            self.y += self.step;
        }
        if pad.left {
            self.x -= self.step;
        }
        if pad.right {
            self.x += self.step;
        }
        self.x = self.x.clamp(0, self.shape.width.saturating_sub(1) as i64);
        self.y = self.y.clamp(0, self.shape.height.saturating_sub(1) as i64);
        self.position()
    }

    /// Draw-mode sample at the current position
    pub fn sample(&self) -> OperatorEvent {
        OperatorEvent::DrawSample(self.position())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn test_stick_to_duty() {
        assert_eq!(stick_to_duty(0, 60.0), 0.0);
        assert_eq!(stick_to_duty(i16::MAX, 60.0), 60.0);
        assert_eq!(stick_to_duty(i16::MIN, 60.0), -60.0);
        assert!((stick_to_duty(16384, 60.0) - 30.0).abs() < 0.01);
    }

    #[test]
    fn test_cursor_clamps_to_frame() {
        let mut cursor = DrawCursor::new(PixelShape::new(20, 10));
        assert_eq!(cursor.position(), PixelPoint::new(10.0, 5.0));

        let up_left = PadState {
            up: true,
            left: true,
            ..Default::default()
        };
        for _ in 0..10 {
            cursor.update(up_left);
        }
        assert_eq!(cursor.position(), PixelPoint::new(0.0, 0.0));

        let down_right = PadState {
            down: true,
            right: true,
            ..Default::default()
        };
        let pos = cursor.update(down_right);
        assert_eq!(pos, PixelPoint::new(5.0, 5.0));
        for _ in 0..10 {
            cursor.update(down_right);
        }
        assert_eq!(cursor.position(), PixelPoint::new(19.0, 9.0));
        assert_eq!(cursor.sample(), OperatorEvent::DrawSample(PixelPoint::new(19.0, 9.0)));
    }

    #[test]
    fn test_events_cross_threads_in_order() {
        let (handle, receiver) = operator_channel();
        let remote = handle.clone();
        thread::spawn(move || {
            remote.add_waypoint(1.0, 2.0).unwrap();
            remote.start().unwrap();
        })
        .join()
        .unwrap();
        handle.stop().unwrap();

        let events: Vec<_> = receiver.try_iter().collect();
        assert_eq!(
            events,
            vec![
                OperatorEvent::AddWaypoint(PixelPoint::new(1.0, 2.0)),
                OperatorEvent::Start,
                OperatorEvent::Stop
            ]
        );
    }
}
