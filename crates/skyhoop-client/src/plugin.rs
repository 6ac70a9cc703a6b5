//! Bevy adapter for the simulation.
//!
//! The plugin owns a [`FrameScheduler`] as a resource, ticks it once per
//! frame with the frame's delta time, and mirrors the resulting snapshot onto
//! the transforms of the drone body and its propellers.

use std::sync::Arc;

use bevy::prelude::*;
use skyhoop_sim::{
    ColliderSet, ControlWriter, FrameScheduler, GeometrySource, PhysicsParams, ResetHandle,
    SimSnapshot, Track, geometry,
};
use web_time::Instant;

use crate::protocol::MessageHandler;

/// Radians a propeller turns per frame at full RPM.
const PROPELLER_SPIN_PER_FRAME: f32 = 0.3;

/// Plugin that flies the drone.
pub struct DroneSimPlugin {
    pub params: PhysicsParams,
    /// Static collision geometry, already in world space.
    pub geometry: Vec<GeometrySource>,
    pub track: Track,
}

impl Default for DroneSimPlugin {
    fn default() -> Self {
        Self {
            params: PhysicsParams::default(),
            geometry: geometry::demo_scene(),
            track: Track::default(),
        }
    }
}

impl Plugin for DroneSimPlugin {
    fn build(&self, app: &mut App) {
        let colliders = Arc::new(ColliderSet::build(self.geometry.iter().cloned()));
        let scheduler =
            FrameScheduler::new(self.params.clone(), colliders, self.track.checkpoints());

        app.insert_resource(DroneSim(scheduler))
            .init_resource::<LatestSnapshot>()
            .add_systems(
                Update,
                (tick_simulation, apply_drone_transform, spin_propellers).chain(),
            );
    }
}

/// The running simulation.
#[derive(Resource)]
pub struct DroneSim(pub FrameScheduler);

impl DroneSim {
    /// A writer for feeding control samples from the network side.
    pub fn control_writer(&self) -> ControlWriter {
        self.0.control_writer()
    }

    /// A handle for requesting a drone reset.
    pub fn reset_handle(&self) -> ResetHandle {
        self.0.reset_handle()
    }

    /// A relay message handler bound to this simulation.
    pub fn message_handler(&self, room: Option<String>) -> MessageHandler {
        MessageHandler::new(room, self.control_writer(), self.reset_handle())
    }
}

/// Snapshot from the most recent frame, for HUD systems.
#[derive(Resource, Default)]
pub struct LatestSnapshot(pub Option<SimSnapshot>);

/// Marker for the entity that follows the drone pose.
#[derive(Component)]
pub struct DroneBody;

/// A propeller, spun in proportion to rotor RPM.
#[derive(Component)]
pub struct Propeller {
    /// Position around the frame. Neighbouring propellers counter-rotate.
    pub index: usize,
}

/// Rotation applied to propeller `index` in one frame.
pub fn propeller_step(normalized_rpm: f32, index: usize) -> f32 {
    let step = normalized_rpm * PROPELLER_SPIN_PER_FRAME;
    if index % 2 == 0 { step } else { -step }
}

fn tick_simulation(
    time: Res<Time>,
    mut sim: ResMut<DroneSim>,
    mut latest: ResMut<LatestSnapshot>,
) {
    let snapshot = sim.0.tick(Instant::now(), time.delta_secs());
    latest.0 = Some(snapshot);
}

fn apply_drone_transform(
    latest: Res<LatestSnapshot>,
    mut bodies: Query<&mut Transform, With<DroneBody>>,
) {
    let Some(snapshot) = &latest.0 else {
        return;
    };
    for mut transform in &mut bodies {
        transform.translation = snapshot.drone.position;
        transform.rotation = snapshot.drone.rotation();
    }
}

fn spin_propellers(
    latest: Res<LatestSnapshot>,
    mut propellers: Query<(&Propeller, &mut Transform)>,
) {
    let Some(snapshot) = &latest.0 else {
        return;
    };
    for (propeller, mut transform) in &mut propellers {
        transform.rotate_local_y(propeller_step(snapshot.normalized_rpm, propeller.index));
    }
}

#[cfg(test)]
mod tests {
    use skyhoop_sim::ControlSample;

    use super::*;

    fn app() -> App {
        let mut app = App::new();
        app.add_plugins((MinimalPlugins, DroneSimPlugin::default()));
        app
    }

    #[test]
    fn test_propellers_alternate_direction() {
        assert!((propeller_step(1.0, 0) - 0.3).abs() < 1e-6);
        assert!((propeller_step(1.0, 1) + 0.3).abs() < 1e-6);
        assert!((propeller_step(0.5, 2) - 0.15).abs() < 1e-6);
        assert_eq!(propeller_step(0.0, 3), 0.0);
    }

    #[test]
    fn test_drone_body_follows_snapshot() {
        let mut app = app();
        let body = app.world_mut().spawn((DroneBody, Transform::default())).id();

        app.update();

        let latest = app.world().resource::<LatestSnapshot>();
        let snapshot = latest.0.as_ref().unwrap();
        let transform = app.world().get::<Transform>(body).unwrap();
        assert_eq!(transform.translation, snapshot.drone.position);
        assert_eq!(snapshot.tick, 1);
    }

    #[test]
    fn test_control_written_through_resource_is_flown() {
        let mut app = app();
        let writer = app.world().resource::<DroneSim>().control_writer();
        writer.write(ControlSample {
            throttle: 0.8,
            power: true,
            ..Default::default()
        });

        app.update();

        let latest = app.world().resource::<LatestSnapshot>();
        let snapshot = latest.0.as_ref().unwrap();
        assert!(!snapshot.stale);
        assert!((snapshot.control.throttle - 0.8).abs() < 1e-6);
    }
}
