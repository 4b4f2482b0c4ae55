mod common;

use common::{scene_frame, BlobParams, SceneConfig};
use magservo::operator::{DrawCursor, PadState};
use magservo::{
    ControlAction, OperatorEvent, PixelPoint, RecordingSink, ServoCallbackEvent, ServoConfig,
    ServoSession, SupervisorState, WorkspaceRegion,
};
use std::sync::{Arc, Mutex};

fn session(scene: &SceneConfig) -> ServoSession<RecordingSink> {
    let region = WorkspaceRegion::full_frame(scene.shape()).unwrap();
    ServoSession::new(&ServoConfig::default(), region, RecordingSink::new()).unwrap()
}

#[test]
fn test_path_completes_when_object_visits_each_waypoint() {
    let _ = env_logger::builder().is_test(true).try_init();

    let scene = SceneConfig {
        width: 320,
        height: 320,
        ..Default::default()
    };
    let mut session = session(&scene);

    let reached = Arc::new(Mutex::new(Vec::new()));
    let completed = Arc::new(Mutex::new(0));
    let (reached_clone, completed_clone) = (reached.clone(), completed.clone());
    session.register_callback(move |event| match event {
        ServoCallbackEvent::WaypointReached { index, .. } => {
            reached_clone.lock().unwrap().push(*index)
        }
        ServoCallbackEvent::PathComplete { .. } => *completed_clone.lock().unwrap() += 1,
        _ => {}
    });

    let waypoints = [(80.0, 80.0), (200.0, 80.0), (200.0, 200.0)];
    let handle = session.operator_handle();
    for (x, y) in waypoints {
        handle.add_waypoint(x, y).unwrap();
    }
    handle.start().unwrap();

    // Far from the first waypoint: no advance
    let report = session.tick(&scene_frame(&scene, &[BlobParams::disk(150.0, 150.0, 15.0)], 0));
    assert_eq!(report.events_applied, 4);
    assert_eq!(report.state, SupervisorState::PathFollowing { current_index: 0 });
    assert_eq!(report.waypoint_reached, None);

    // Object lost: index frozen, actuator untouched
    let report = session.tick(&scene_frame(&scene, &[], 1));
    assert_eq!(report.action, ControlAction::Hold);
    assert_eq!(report.state, SupervisorState::PathFollowing { current_index: 0 });

    let mut frame_number = 2;
    for (i, (x, y)) in waypoints.iter().enumerate() {
        let report = session.tick(&scene_frame(&scene, &[BlobParams::disk(*x + 1.0, *y - 2.0, 15.0)], frame_number));
        frame_number += 1;
        assert_eq!(report.waypoint_reached, Some(i));
        if i + 1 < waypoints.len() {
            assert_eq!(report.state, SupervisorState::PathFollowing { current_index: i + 1 });
            assert_eq!(session.supervisor().current_target(), Some(PixelPoint::from(waypoints[i + 1])));
        } else {
            assert!(report.path_complete);
            assert_eq!(report.state, SupervisorState::Stopped);
            assert_eq!(report.action, ControlAction::Zero);
            assert!(report.command.unwrap().is_zero());
        }
    }

    assert_eq!(*reached.lock().unwrap(), vec![0, 1, 2]);
    assert_eq!(*completed.lock().unwrap(), 1);

    // Stopped stays quiet
    let report = session.tick(&scene_frame(&scene, &[BlobParams::disk(20.0, 20.0, 15.0)], frame_number));
    assert_eq!(report.action, ControlAction::Hold);
}

#[test]
fn test_drawn_path_is_followed() {
    let scene = SceneConfig {
        width: 200,
        height: 200,
        ..Default::default()
    };
    let mut session = session(&scene);
    let handle = session.operator_handle();

    // Draw a horizontal stroke from the frame center
    let mut cursor = DrawCursor::new(scene.shape());
    handle.send(OperatorEvent::SetDrawMode(true)).unwrap();
    handle.send(cursor.sample()).unwrap();
    let right = PadState {
        right: true,
        ..Default::default()
    };
    for _ in 0..8 {
        cursor.update(right);
        handle.send(cursor.sample()).unwrap();
        // Stationary samples are dropped by the spacing rule
        handle.send(cursor.sample()).unwrap();
    }
    handle.send(OperatorEvent::SetDrawMode(false)).unwrap();
    handle.start().unwrap();

    let report = session.tick(&scene_frame(&scene, &[BlobParams::disk(60.0, 150.0, 12.0)], 0));
    assert_eq!(session.supervisor().waypoints().len(), 9);
    assert_eq!(
        session.supervisor().waypoints().last(),
        Some(PixelPoint::new(140.0, 100.0))
    );
    assert_eq!(report.state, SupervisorState::PathFollowing { current_index: 0 });
}

#[test]
fn test_clearing_waypoints_mid_path_stops() {
    let scene = SceneConfig {
        width: 200,
        height: 200,
        ..Default::default()
    };
    let mut session = session(&scene);
    let handle = session.operator_handle();
    handle.add_waypoint(50.0, 50.0).unwrap();
    handle.add_waypoint(150.0, 150.0).unwrap();
    handle.start().unwrap();

    let object = [BlobParams::disk(100.0, 100.0, 12.0)];
    session.tick(&scene_frame(&scene, &object, 0));

    handle.send(OperatorEvent::ClearWaypoints).unwrap();
    let report = session.tick(&scene_frame(&scene, &object, 1));
    assert_eq!(report.state, SupervisorState::Stopped);
    assert_eq!(report.action, ControlAction::Zero);

    // Starting with nothing to follow is ignored
    handle.start().unwrap();
    let report = session.tick(&scene_frame(&scene, &object, 2));
    assert_eq!(report.events_applied, 0);
    assert_eq!(report.state, SupervisorState::Stopped);
}
