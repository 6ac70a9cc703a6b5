//! Adapters between the skyhoop simulation core and the outside world.
//!
//! - [`plugin`]: a Bevy plugin that ticks the simulation once per frame and
//!   mirrors the drone pose onto transforms
//! - [`scene_import`]: Bevy mesh to collision geometry conversion
//! - [`protocol`]: the relay's JSON control messages
//! - [`script`]: timed message scripts for headless sessions

mod error;
pub mod launch_params;
pub mod plugin;
pub mod protocol;
pub mod scene_import;
pub mod script;

pub use error::{Error, Result};
pub use launch_params::LaunchParams;
pub use plugin::{DroneBody, DroneSim, DroneSimPlugin, LatestSnapshot, Propeller};
pub use protocol::{Axes, ControlMessage, MessageHandler, Role};
pub use scene_import::{CollisionMeshFilter, geometry_from_mesh, import_scene};
pub use script::ScriptEntry;
