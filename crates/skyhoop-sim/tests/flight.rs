//! Whole-frame flight scenarios against the demo scene.

use std::sync::Arc;
use std::time::Duration;

use glam::Vec3;
use proptest::prelude::*;
use skyhoop_sim::{
    ColliderSet, ControlSample, FrameScheduler, PhysicsParams, RaceEvent, Track, geometry,
};
use web_time::Instant;

fn demo_colliders() -> Arc<ColliderSet> {
    Arc::new(ColliderSet::build(geometry::demo_scene()))
}

fn sample(throttle: f32, roll: f32) -> ControlSample {
    ControlSample {
        throttle,
        roll,
        power: true,
        ..Default::default()
    }
}

/// Throttle that holds `target` altitude against gravity.
fn hold_altitude(params: &PhysicsParams, y: f32, vy: f32, target: f32) -> f32 {
    let hover = params.gravity / params.lift;
    (hover + 0.1 * (target - y) - 0.05 * vy).clamp(0.0, 1.0)
}

#[test]
fn test_drone_cannot_fly_through_building() {
    // Building at x 81.5..88.5, z 1.5..8.5, up to y 18.3.
    let params = PhysicsParams {
        spawn_position: Vec3::new(70.0, 8.0, 5.0),
        ..Default::default()
    };
    let mut scheduler = FrameScheduler::new(params.clone(), demo_colliders(), Vec::new());

    let mut blocked = false;
    for _ in 0..300 {
        let drone = *scheduler.drone();
        let throttle = hold_altitude(&params, drone.position.y, drone.velocity.y, 8.0);
        let snapshot = scheduler.step(0.016, sample(throttle, 1.0));
        let position = snapshot.drone.position;
        assert!(position.y < 18.3, "drone climbed over the roof to {position}");
        assert!(position.x < 81.5, "drone entered building at {position}");
        blocked |= snapshot.collision.blocked_by.is_some();
    }
    assert!(blocked);
    assert!(scheduler.drone().position.x > 76.0);
}

#[test]
fn test_single_hoop_lap_completes_and_resets() {
    let track = Track::from_json(
        r#"{"sections":[{"radius":0,"height":10,"center_x":0,"center_z":0,"hoops":1}]}"#,
    )
    .unwrap();
    let mut scheduler = FrameScheduler::new(
        PhysicsParams::default(),
        Arc::new(ColliderSet::empty()),
        track.checkpoints(),
    );

    let mut events = Vec::new();
    for _ in 0..300 {
        events.extend(scheduler.step(0.016, sample(1.0, 0.0)).events);
    }

    assert_eq!(events.first(), Some(&RaceEvent::Started));
    assert!(matches!(
        events.iter().find(|e| matches!(e, RaceEvent::Completed { .. })),
        Some(RaceEvent::Completed { new_best: true, .. })
    ));
    assert!(events.contains(&RaceEvent::Reset));
    assert!(scheduler.race().best_time.is_some());
}

#[test]
fn test_link_goes_stale_after_500ms() {
    let mut scheduler = FrameScheduler::new(
        PhysicsParams::default(),
        demo_colliders(),
        Track::default().checkpoints(),
    );
    let writer = scheduler.control_writer();
    let t0 = Instant::now();
    writer.write_at(sample(0.8, 0.5), t0);

    for k in 1..=40u64 {
        let snapshot = scheduler.tick(t0 + Duration::from_millis(16 * k), 0.016);
        if k * 16 <= 500 {
            assert!(!snapshot.stale, "frame {k} should be fresh");
            assert!((snapshot.control.throttle - 0.8).abs() < 1e-6);
        } else {
            assert!(snapshot.stale, "frame {k} should be stale");
            assert_eq!(snapshot.control, ControlSample::zeroed(true));
        }
    }
}

#[test]
fn test_reset_returns_to_spawn_from_any_state() {
    let mut scheduler = FrameScheduler::new(
        PhysicsParams::default(),
        demo_colliders(),
        Track::default().checkpoints(),
    );
    let writer = scheduler.control_writer();
    let t0 = Instant::now();
    for k in 0..100u64 {
        let now = t0 + Duration::from_millis(16 * k);
        writer.write_at(sample(1.0, 0.7), now);
        scheduler.tick(now, 0.016);
    }
    assert!(scheduler.drone().position.y > 5.0);

    scheduler.reset_handle().request();
    let snapshot = scheduler.tick(t0 + Duration::from_millis(1700), 0.016);
    let spawn = scheduler.params().spawn_position;
    assert!((snapshot.drone.position.x - spawn.x).abs() < 1e-3);
    assert!((snapshot.drone.position.z - spawn.z).abs() < 1e-3);
    assert!(snapshot.drone.position.y < 2.0);
    assert!(snapshot.propulsion.current_rpm < 1.0);
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn prop_altitude_stays_above_floor(
        inputs in prop::collection::vec(
            (0.0f32..=1.0, -1.0f32..=1.0, -1.0f32..=1.0, -1.0f32..=1.0, 0.0f32..0.2),
            1..120,
        ),
    ) {
        let mut scheduler = FrameScheduler::new(
            PhysicsParams::default(),
            demo_colliders(),
            Vec::new(),
        );
        for (throttle, yaw, pitch, roll, dt) in inputs {
            let snapshot = scheduler.step(dt, ControlSample {
                throttle,
                yaw,
                pitch,
                roll,
                power: true,
                ..Default::default()
            });
            prop_assert!(snapshot.drone.position.y >= snapshot.collision.floor - 1e-3);
            prop_assert!(snapshot.drone.position.is_finite());
        }
    }
}
