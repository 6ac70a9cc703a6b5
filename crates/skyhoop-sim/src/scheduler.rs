//! Per-frame orchestration of the simulation.
//!
//! A tick runs the stages in a fixed order: pending reset, control snapshot
//! and staleness, shaping, integration, collision, checkpoints, propulsion,
//! and finally snapshot publication. Nothing inside a tick blocks.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use serde::Serialize;
use tokio::sync::watch;
use web_time::Instant;

use crate::attitude::{self, DroneState};
use crate::checkpoint::{Checkpoint, CheckpointTracker, RaceEvent, RaceState, RaceSummary};
use crate::colliders::ColliderSet;
use crate::collision::{CollisionReport, CollisionSystem};
use crate::input::{self, ControlSample};
use crate::mailbox::{ControlMailbox, ControlWriter};
use crate::params::PhysicsParams;
use crate::propulsion::{PropulsionState, PropulsionStateMachine};

/// Requests a drone reset from any thread.
///
/// The reset is applied at the start of the next tick. Requesting twice before
/// that tick resets once.
#[derive(Clone, Debug, Default)]
pub struct ResetHandle(Arc<AtomicBool>);

impl ResetHandle {
    /// Ask for the drone to be returned to spawn.
    pub fn request(&self) {
        self.0.store(true, Ordering::Release);
    }

    /// Whether a reset is waiting for the next tick.
    pub fn is_pending(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }

    fn take(&self) -> bool {
        self.0.swap(false, Ordering::AcqRel)
    }
}

/// Everything a renderer, HUD or logger needs from one tick.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct SimSnapshot {
    /// Number of ticks run so far.
    pub tick: u64,
    /// Sim time in seconds.
    pub time: f64,
    /// Timestep integrated this tick.
    pub dt: f32,
    /// Drone pose and velocity after collision.
    pub drone: DroneState,
    /// Rotor state.
    pub propulsion: PropulsionState,
    /// Rotor speed as a fraction of the maximum.
    pub normalized_rpm: f32,
    /// Race HUD view.
    pub race: RaceSummary,
    /// Race events raised this tick.
    pub events: Vec<RaceEvent>,
    /// Collision responses this tick.
    #[serde(skip)]
    pub collision: CollisionReport,
    /// Control sample flown this tick.
    pub control: ControlSample,
    /// Whether the control sample was stale and zeroed.
    pub stale: bool,
}

impl SimSnapshot {
    fn initial(params: &PhysicsParams, race: RaceSummary) -> Self {
        Self {
            tick: 0,
            time: 0.0,
            dt: 0.0,
            drone: DroneState::at_rest(params.spawn_position),
            propulsion: PropulsionState::default(),
            normalized_rpm: 0.0,
            race,
            events: Vec::new(),
            collision: CollisionReport::default(),
            control: ControlSample::default(),
            stale: true,
        }
    }
}

/// Owns the drone and runs one simulation tick per rendered frame.
#[derive(Debug)]
pub struct FrameScheduler {
    params: PhysicsParams,
    drone: DroneState,
    collision: CollisionSystem,
    propulsion: PropulsionStateMachine,
    checkpoints: CheckpointTracker,
    mailbox: ControlMailbox,
    reset: ResetHandle,
    snapshot_tx: watch::Sender<SimSnapshot>,
    tick: u64,
    time: f64,
}

impl FrameScheduler {
    /// Create a scheduler with the drone at spawn.
    pub fn new(
        params: PhysicsParams,
        colliders: Arc<ColliderSet>,
        checkpoints: Vec<Checkpoint>,
    ) -> Self {
        let checkpoints = CheckpointTracker::new(checkpoints);
        let (snapshot_tx, _) =
            watch::channel(SimSnapshot::initial(&params, checkpoints.summary(0.0)));
        Self {
            drone: DroneState::at_rest(params.spawn_position),
            params,
            collision: CollisionSystem::new(colliders),
            propulsion: PropulsionStateMachine::new(),
            checkpoints,
            mailbox: ControlMailbox::new(),
            reset: ResetHandle::default(),
            snapshot_tx,
            tick: 0,
            time: 0.0,
        }
    }

    /// Physics parameters in use.
    pub fn params(&self) -> &PhysicsParams {
        &self.params
    }

    /// Current drone state.
    pub fn drone(&self) -> &DroneState {
        &self.drone
    }

    /// Current rotor state.
    pub fn propulsion(&self) -> &PropulsionState {
        self.propulsion.state()
    }

    /// Current race state.
    pub fn race(&self) -> &RaceState {
        self.checkpoints.race()
    }

    /// The static collision world.
    pub fn colliders(&self) -> &Arc<ColliderSet> {
        self.collision.colliders()
    }

    /// Sim time in seconds.
    pub fn time(&self) -> f64 {
        self.time
    }

    /// A writer for the network side.
    pub fn control_writer(&self) -> ControlWriter {
        self.mailbox.writer()
    }

    /// A handle for requesting resets.
    pub fn reset_handle(&self) -> ResetHandle {
        self.reset.clone()
    }

    /// Subscribe to the snapshot published after every tick.
    pub fn subscribe(&self) -> watch::Receiver<SimSnapshot> {
        self.snapshot_tx.subscribe()
    }

    /// Run one frame against the mailbox at wall time `now`.
    pub fn tick(&mut self, now: Instant, wall_dt: f32) -> SimSnapshot {
        if self.reset.take() {
            self.reset_drone(now);
        }

        let stale_after =
            Duration::try_from_secs_f32(self.params.stale_after).unwrap_or(Duration::ZERO);
        let control = self.mailbox.effective(now, stale_after);
        if control.stale && !self.snapshot_tx.borrow().stale {
            tracing::warn!("Control link stale, zeroing sticks");
        }
        self.advance(wall_dt, control.sample, control.stale)
    }

    /// Run one frame with an explicit control sample.
    ///
    /// Skips the mailbox, staleness and reset handling.
    pub fn step(&mut self, dt: f32, sample: ControlSample) -> SimSnapshot {
        self.advance(dt, sample, false)
    }

    fn advance(&mut self, dt: f32, sample: ControlSample, stale: bool) -> SimSnapshot {
        let sample = sample.normalized();
        let shaped = input::shape(&sample, &self.params);

        let dt = attitude::step(&mut self.drone, &shaped, &self.params, dt);
        let collision = self.collision.resolve(&mut self.drone, dt, &self.params);

        self.tick += 1;
        self.time += f64::from(dt);

        let events = self
            .checkpoints
            .update(self.drone.position, self.drone.speed(), self.time);

        let propulsion = *self
            .propulsion
            .update(sample.throttle, sample.power, dt, &self.params);

        let snapshot = SimSnapshot {
            tick: self.tick,
            time: self.time,
            dt,
            drone: self.drone,
            propulsion,
            normalized_rpm: propulsion.normalized_rpm(&self.params),
            race: self.checkpoints.summary(self.time),
            events,
            collision,
            control: sample,
            stale,
        };
        self.snapshot_tx.send_replace(snapshot.clone());
        snapshot
    }

    /// Return the drone to spawn with rotors stopped and a fresh zero sample.
    ///
    /// Race progress is kept.
    fn reset_drone(&mut self, now: Instant) {
        tracing::info!("Resetting drone state");
        self.drone = DroneState::at_rest(self.params.spawn_position);
        self.propulsion.reset();
        self.collision.reset();
        self.mailbox.reset(now);
    }
}
