//! Simulated coil rig for closed-loop testing
//!
//! A [`SimulatedRig`] pairs a frame source with an actuator sink over shared
//! state, so that commands written to the sink move the object seen in the
//! following frames. The object is rendered as a dark disk on a light
//! background and moves with overdamped dynamics: its velocity is
//! proportional to the net field each in-plane coil pair produces, relative
//! to the field at zero command.

use magservo::coils::{CoilCalibration, CoilCommand, CoilLayout, CoilMapper, CoilVector};
use magservo::controllers::Axis;
use magservo::{ActuatorSink, PixelPoint, ServoResult};
use ndarray::Array3;
use shared::camera_interface::{
    CameraError, CameraResult, Frame, FrameMetadata, FrameSource, Timestamp,
};
use shared::image_size::PixelShape;
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Physical and optical parameters of the simulated rig
#[derive(Debug, Clone)]
pub struct RigConfig {
    pub shape: PixelShape,
    /// Object radius in pixels
    pub object_radius: f64,
    /// Initial object position
    pub start: PixelPoint,
    /// Object speed per unit of net pair field (px/s per mT)
    pub mobility: f64,
    pub frame_interval: Duration,
    /// Background gray level
    pub background: u8,
    /// Object gray level
    pub foreground: u8,
    pub calibration: CoilCalibration,
    pub layout: CoilLayout,
}

impl Default for RigConfig {
    fn default() -> Self {
        Self {
            shape: PixelShape::new(320, 320),
            object_radius: 14.0,
            start: PixelPoint::new(160.0, 160.0),
            mobility: 20.0,
            frame_interval: Duration::from_micros(33_333),
            background: 210,
            foreground: 30,
            calibration: CoilCalibration::reference(),
            layout: CoilLayout::default(),
        }
    }
}

#[derive(Debug)]
struct RigState {
    config: RigConfig,
    mapper: CoilMapper,
    /// Field produced by an all-zero command
    rest_field: CoilVector,
    position: PixelPoint,
    command: CoilCommand,
    visible: bool,
    frame_number: u64,
    elapsed: Duration,
    released: bool,
}

impl RigState {
    /// Net field of an axis pair relative to rest
    fn pair_field(&self, field: &CoilVector, axis: Axis) -> f64 {
        let (a, b) = self.config.layout.pair(axis);
        (field[a] - self.rest_field[a]) + (field[b] - self.rest_field[b])
    }

    /// Integrate motion over one frame interval
    fn advance(&mut self) {
        let dt = self.config.frame_interval.as_secs_f64();
        let field = self.mapper.pwm_to_field(&self.command.as_vector());
        let vx = self.config.mobility * self.pair_field(&field, Axis::X);
        let vy = self.config.mobility * self.pair_field(&field, Axis::Y);

        let shape = self.config.shape;
        let x = (self.position.x + vx * dt).clamp(0.0, shape.width.saturating_sub(1) as f64);
        let y = (self.position.y + vy * dt).clamp(0.0, shape.height.saturating_sub(1) as f64);
        self.position = PixelPoint::new(x, y);
        self.elapsed += self.config.frame_interval;
    }

    fn render(&self) -> Array3<u8> {
        let shape = self.config.shape;
        let mut image = Array3::from_elem((shape.height, shape.width, 3), self.config.background);
        if !self.visible {
            return image;
        }

        let r = self.config.object_radius;
        let PixelPoint { x: cx, y: cy } = self.position;
        let row_min = (cy - r).floor().max(0.0) as usize;
        let row_max = ((cy + r).ceil().max(0.0) as usize + 1).min(shape.height);
        let col_min = (cx - r).floor().max(0.0) as usize;
        let col_max = ((cx + r).ceil().max(0.0) as usize + 1).min(shape.width);
        for row in row_min..row_max {
            for col in col_min..col_max {
                let (dx, dy) = (col as f64 - cx, row as f64 - cy);
                if dx * dx + dy * dy <= r * r {
                    for c in 0..3 {
                        image[[row, col, c]] = self.config.foreground;
                    }
                }
            }
        }
        image
    }
}

/// Shared simulation state with a camera and an actuator view
#[derive(Debug, Clone)]
pub struct SimulatedRig {
    state: Arc<Mutex<RigState>>,
}

impl SimulatedRig {
    pub fn new(config: RigConfig) -> ServoResult<Self> {
        let mapper = CoilMapper::new(&config.calibration)?;
        let rest_field = mapper.pwm_to_field(&CoilVector::zeros());
        let position = config.start;
        Ok(Self {
            state: Arc::new(Mutex::new(RigState {
                config,
                mapper,
                rest_field,
                position,
                command: CoilCommand::zero(),
                visible: true,
                frame_number: 0,
                elapsed: Duration::ZERO,
                released: false,
            })),
        })
    }

    /// Frame source view of the rig
    pub fn camera(&self) -> RigCamera {
        RigCamera {
            state: self.state.clone(),
        }
    }

    /// Actuator sink view of the rig
    pub fn actuator(&self) -> RigActuator {
        RigActuator {
            state: self.state.clone(),
        }
    }

    /// True object position
    pub fn position(&self) -> PixelPoint {
        self.state.lock().unwrap().position
    }

    pub fn set_position(&self, position: PixelPoint) {
        self.state.lock().unwrap().position = position;
    }

    /// Hide or show the object in subsequent frames
    pub fn set_visible(&self, visible: bool) {
        self.state.lock().unwrap().visible = visible;
    }

    /// Command currently energizing the coils
    pub fn command(&self) -> CoilCommand {
        self.state.lock().unwrap().command
    }

    pub fn shape(&self) -> PixelShape {
        self.state.lock().unwrap().config.shape
    }
}

/// Camera side of a [`SimulatedRig`]
#[derive(Debug, Clone)]
pub struct RigCamera {
    state: Arc<Mutex<RigState>>,
}

impl FrameSource for RigCamera {
    fn read(&mut self) -> CameraResult<Frame> {
        let mut state = self.state.lock().unwrap();
        if state.released {
            return Err(CameraError::Released);
        }
        // Exposure of frame n integrates motion since frame n-1
        if state.frame_number > 0 {
            state.advance();
        }
        let metadata = FrameMetadata {
            frame_number: state.frame_number,
            timestamp: Timestamp::from_duration(state.elapsed),
        };
        state.frame_number += 1;
        Ok(Frame::new(state.render(), metadata))
    }

    fn frame_size(&self) -> PixelShape {
        self.state.lock().unwrap().config.shape
    }

    fn release(&mut self) {
        self.state.lock().unwrap().released = true;
    }
}

/// Actuator side of a [`SimulatedRig`]
#[derive(Debug, Clone)]
pub struct RigActuator {
    state: Arc<Mutex<RigState>>,
}

impl ActuatorSink for RigActuator {
    fn apply(&mut self, command: &CoilCommand) {
        self.state.lock().unwrap().command = *command;
    }
}
