//! Simulation core for a remotely piloted racing quadrotor.
//!
//! This crate turns pilot stick input into drone motion, keeps the drone out
//! of static geometry, and times laps through a course of hoops. It has no
//! renderer, network or windowing dependencies; adapters for those live in
//! `skyhoop-client`.
//!
//! # Design principles
//!
//! - **Infallible ticks**: Bad input is normalised and missing geometry falls
//!   back to defaults, so a tick never returns an error
//! - **Single owner**: [`FrameScheduler`] owns all mutable state; other threads
//!   talk to it only through [`ControlWriter`] and [`ResetHandle`]
//! - **Pure stages**: Shaping, integration and collision response are plain
//!   functions over plain data
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use skyhoop_sim::{ColliderSet, FrameScheduler, PhysicsParams, Track, geometry};
//!
//! let colliders = Arc::new(ColliderSet::build(geometry::demo_scene()));
//! let mut scheduler =
//!     FrameScheduler::new(PhysicsParams::default(), colliders, Track::default().checkpoints());
//!
//! // The network side writes samples whenever they arrive.
//! let writer = scheduler.control_writer();
//!
//! // The render loop ticks once per frame.
//! let snapshot = scheduler.tick(web_time::Instant::now(), 1.0 / 60.0);
//! ```

pub mod attitude;
pub mod checkpoint;
pub mod colliders;
pub mod collision;
mod error;
pub mod geometry;
pub mod input;
pub mod mailbox;
pub mod params;
pub mod propulsion;
pub mod scheduler;
pub mod telemetry;
pub mod track;

pub use attitude::DroneState;
pub use checkpoint::{Checkpoint, CheckpointTracker, RaceEvent, RaceState, RaceSummary};
pub use colliders::{ColliderSet, RayCaster, RayHit};
pub use collision::{CollisionReport, CollisionSystem, GroundContact};
pub use error::{Error, Result};
pub use geometry::{ColliderKind, GeometrySource, TriangleMesh};
pub use input::{ControlSample, ShapedInput};
pub use mailbox::{ControlMailbox, ControlWriter};
pub use params::PhysicsParams;
pub use propulsion::{PropulsionMode, PropulsionState, PropulsionStateMachine};
pub use scheduler::{FrameScheduler, ResetHandle, SimSnapshot};
pub use telemetry::{CsvTelemetry, Telemetry};
pub use track::{HoopKind, Track, TrackSection};
