use clap::{Parser, ValueEnum};
use magservo::config::SmoothingConfig;
use magservo::{PidConfig, PixelPoint, ServoConfig, ServoSession, SupervisorState};
use magservo_harness::{
    circle_path, inset_region, line_path, run_session, square_path, LossPolicy, RigConfig,
    SimulatedRig, TrajectoryPoint,
};
use serde::Serialize;
use shared::camera_interface::FrameSource;
use shared::image_size::PixelShape;
use std::path::PathBuf;
use std::time::Duration;

/// Shape the object is asked to follow
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum PathKind {
    Square,
    Circle,
    Line,
    /// Hold a single target instead of following a path
    Target,
}

/// Command line arguments for the servo demo
#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "Closed-loop magnetic servo demonstration on a simulated coil rig"
)]
struct Args {
    /// Path to follow
    #[arg(short, long, value_enum, default_value_t = PathKind::Square)]
    path: PathKind,

    /// Number of frames to run
    #[arg(short = 'n', long, default_value_t = 900)]
    frames: usize,

    /// Frame rate in Hz
    #[arg(long, default_value_t = 30.0)]
    frame_rate: f64,

    /// Frame width and height in pixels
    #[arg(long, default_value_t = 320)]
    size: usize,

    /// Proportional gain
    #[arg(long, default_value_t = 1.0)]
    kp: f64,

    /// Integral gain
    #[arg(long, default_value_t = 0.0)]
    ki: f64,

    /// Derivative gain
    #[arg(long, default_value_t = 0.0)]
    kd: f64,

    /// Symmetric output limit in duty-cycle percent
    #[arg(long, default_value_t = 60.0)]
    limit: f64,

    /// Back-calculation anti-windup gain
    #[arg(long)]
    anti_windup: Option<f64>,

    /// Waypoint advance radius in pixels
    #[arg(long, default_value_t = 5.0)]
    advance_radius: f64,

    /// Smooth the tracked centroid with a constant-velocity filter
    #[arg(long)]
    smoothing: bool,

    /// Stop after this many consecutive frames without a detection
    #[arg(long)]
    max_misses: Option<usize>,

    /// JSON configuration file; overrides the tuning flags above
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Write a JSON run summary with the trajectory to this file
    #[arg(short, long)]
    output: Option<PathBuf>,
}

#[derive(Serialize)]
struct RunSummary<'a> {
    frames_processed: usize,
    frames_detected: usize,
    frames_lost: usize,
    path_completed: bool,
    stopped_by_policy: bool,
    final_error: Option<f64>,
    waypoints: &'a [PixelPoint],
    trajectory: &'a [TrajectoryPoint],
}

fn config_from_args(args: &Args) -> Result<ServoConfig, Box<dyn std::error::Error>> {
    if let Some(path) = &args.config {
        return Ok(ServoConfig::load(path)?);
    }

    let mut pid = PidConfig::new(args.kp, args.ki, args.kd).with_limits(-args.limit, args.limit);
    pid.anti_windup = args.anti_windup;

    let mut config = ServoConfig {
        pid_x: pid,
        pid_y: pid,
        ..Default::default()
    };
    config.supervisor.advance_radius = args.advance_radius;
    config.actuation.max_duty = args.limit.abs().min(100.0);
    if args.smoothing {
        config.localizer.smoothing = Some(SmoothingConfig::default());
    }
    config.validate()?;
    Ok(config)
}

fn waypoints_for(kind: PathKind, shape: PixelShape) -> Vec<PixelPoint> {
    let (w, h) = (shape.width as f64, shape.height as f64);
    let center = PixelPoint::new(w / 2.0, h / 2.0);
    let span = w.min(h) * 0.3;
    match kind {
        PathKind::Square => square_path(center, span, 3),
        PathKind::Circle => circle_path(center, span, 16),
        PathKind::Line => line_path(
            PixelPoint::new(center.x - span, center.y + span / 2.0),
            PixelPoint::new(center.x + span, center.y - span / 2.0),
            8,
        ),
        PathKind::Target => vec![PixelPoint::new(center.x + span, center.y - span / 2.0)],
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();
    let args = Args::parse();

    let config = config_from_args(&args)?;
    let shape = PixelShape::new(args.size, args.size);
    let frame_interval = Duration::from_secs_f64(1.0 / args.frame_rate.max(1.0));

    println!("Magnetic Servo Demo");
    println!("===================");
    println!("Path: {:?}", args.path);
    println!("Frames: {} at {} Hz", args.frames, args.frame_rate);
    println!(
        "Gains: kp={} ki={} kd={}, limits {:?}..{:?}",
        config.pid_x.kp,
        config.pid_x.ki,
        config.pid_x.kd,
        config.pid_x.output_min,
        config.pid_x.output_max
    );

    let rig = SimulatedRig::new(RigConfig {
        shape,
        start: PixelPoint::new(shape.width as f64 / 2.0, shape.height as f64 / 2.0),
        frame_interval,
        calibration: config.actuation.calibration.clone(),
        layout: config.actuation.layout,
        ..Default::default()
    })?;
    let region = inset_region(shape, 10.0)?;
    let mut session = ServoSession::new(&config, region, rig.actuator())?;

    let waypoints = waypoints_for(args.path, shape);
    let handle = session.operator_handle();
    if args.path == PathKind::Target {
        let target = waypoints[0];
        handle.arm_target(target.x, target.y)?;
    } else {
        for point in &waypoints {
            handle.add_waypoint(point.x, point.y)?;
        }
        handle.start()?;
    }

    let policy = LossPolicy {
        max_consecutive_misses: args.max_misses,
    };
    let mut camera = rig.camera();
    let results = run_session(&mut session, &mut camera, args.frames, policy);

    let final_target = match args.path {
        PathKind::Target => waypoints.first().copied(),
        _ => waypoints.last().copied(),
    };
    let final_error = final_target.map(|t| rig.position().distance_to(&t));
    let reached = results
        .events
        .iter()
        .filter(|e| matches!(e, magservo::ServoCallbackEvent::WaypointReached { .. }))
        .count();

    println!();
    println!("Results");
    println!("-------");
    println!("Frames processed: {}", results.frames_processed);
    println!(
        "Detected / lost: {} / {}",
        results.frames_detected, results.frames_lost
    );
    println!("Waypoints reached: {reached} of {}", waypoints.len());
    println!("Path completed: {}", results.path_completed());
    if results.stopped_by_policy {
        println!("Stopped by loss-of-track policy");
    }
    match results.final_state {
        SupervisorState::SingleTarget { .. } | SupervisorState::PathFollowing { .. } => {
            println!("Final state: {} (still active)", results.final_state)
        }
        state => println!("Final state: {state}"),
    }
    if let Some(error) = final_error {
        println!("Final distance to last target: {error:.2} px");
    }
    for error in &results.errors {
        println!("Error: {error}");
    }

    if let Some(path) = &args.output {
        let summary = RunSummary {
            frames_processed: results.frames_processed,
            frames_detected: results.frames_detected,
            frames_lost: results.frames_lost,
            path_completed: results.path_completed(),
            stopped_by_policy: results.stopped_by_policy,
            final_error,
            waypoints: &waypoints,
            trajectory: &results.trajectory,
        };
        std::fs::write(path, serde_json::to_string_pretty(&summary)?)?;
        println!("Summary written to {}", path.display());
    }

    camera.release();
    Ok(())
}
