//! Tunable physics constants.
//!
//! Every value has a default matching the reference flight model; a JSON file
//! only needs to name the fields it overrides.

use std::path::Path;

use glam::Vec3;
use serde::{Deserialize, Serialize};

use crate::error::{self, Error, Result};

/// Configuration for the quadrotor flight model.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PhysicsParams {
    /// Maximum pitch/roll tilt at full stick (radians).
    pub max_tilt: f32,
    /// Yaw rate at full stick (rad/s).
    pub yaw_rate: f32,
    /// Base horizontal acceleration at full stick (units/s²).
    pub accel: f32,
    /// Upward acceleration at full throttle (units/s²).
    pub lift: f32,
    /// Gravitational acceleration (units/s²).
    pub gravity: f32,
    /// Linear drag coefficient applied to the whole velocity vector.
    pub drag: f32,
    /// Largest timestep a single tick may integrate (seconds).
    pub max_dt: f32,
    /// Age after which a control sample is replaced by the zero sample (seconds).
    pub stale_after: f32,

    /// Stick deadzone applied to yaw, pitch and roll.
    pub deadzone: f32,
    /// Expo factor for yaw.
    pub yaw_expo: f32,
    /// Expo factor for pitch.
    pub pitch_expo: f32,
    /// Expo factor for roll.
    pub roll_expo: f32,
    /// Exponent applied to pitch/roll before scaling to a tilt angle.
    pub tilt_curve_exponent: f32,

    /// Landing height of a level drone above the world origin.
    pub base_landing_height: f32,
    /// Extra landing height per radian of combined pitch and roll.
    pub tilt_landing_offset: f32,

    /// Idle rotor speed once armed.
    pub idle_rpm: f32,
    /// Rotor speed at full throttle.
    pub max_rpm: f32,
    /// Time constant for spinning rotors up (seconds).
    pub prop_spinup_time: f32,
    /// Time constant for spinning rotors down (seconds).
    pub prop_spindown_time: f32,

    /// Clearance kept between the drone centre and the ground surface.
    pub ground_radius: f32,
    /// Clearance used when sweeping against obstacles.
    pub obstacle_radius: f32,

    /// Position the drone returns to on reset.
    pub spawn_position: Vec3,
}

impl Default for PhysicsParams {
    fn default() -> Self {
        Self {
            max_tilt: 35.0_f32.to_radians(),
            yaw_rate: 180.0_f32.to_radians(),
            accel: 18.0,
            lift: 20.0,
            gravity: 9.81,
            drag: 1.5,
            max_dt: 0.033,
            stale_after: 0.5,
            deadzone: 0.06,
            yaw_expo: 0.5,
            pitch_expo: 0.4,
            roll_expo: 0.4,
            tilt_curve_exponent: 1.8,
            base_landing_height: 1.8,
            tilt_landing_offset: 0.5,
            idle_rpm: 800.0,
            max_rpm: 8000.0,
            prop_spinup_time: 0.2,
            prop_spindown_time: 0.8,
            ground_radius: 1.2,
            obstacle_radius: 1.0,
            spawn_position: Vec3::new(0.0, 1.5, 0.0),
        }
    }
}

impl PhysicsParams {
    /// Parse parameters from JSON, filling omitted fields with defaults.
    pub fn from_json(json: &str) -> Result<Self> {
        let params: Self = error::from_json("physics params", json)?;
        params.validate()?;
        Ok(params)
    }

    /// Load parameters from a JSON file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        Self::from_json(&error::read_to_string(path.as_ref())?)
    }

    /// Check that every value is finite and within its usable range.
    pub fn validate(&self) -> Result<()> {
        let positive = [
            ("max_tilt", self.max_tilt),
            ("yaw_rate", self.yaw_rate),
            ("lift", self.lift),
            ("max_dt", self.max_dt),
            ("stale_after", self.stale_after),
            ("tilt_curve_exponent", self.tilt_curve_exponent),
            ("max_rpm", self.max_rpm),
            ("prop_spinup_time", self.prop_spinup_time),
            ("prop_spindown_time", self.prop_spindown_time),
            ("ground_radius", self.ground_radius),
            ("obstacle_radius", self.obstacle_radius),
        ];
        for (name, value) in positive {
            if !value.is_finite() || value <= 0.0 {
                return Err(Error::InvalidParam {
                    name,
                    detail: format!("expected a positive finite value, got {value}"),
                });
            }
        }

        let non_negative = [
            ("accel", self.accel),
            ("gravity", self.gravity),
            ("drag", self.drag),
            ("deadzone", self.deadzone),
            ("tilt_landing_offset", self.tilt_landing_offset),
            ("idle_rpm", self.idle_rpm),
        ];
        for (name, value) in non_negative {
            if !value.is_finite() || value < 0.0 {
                return Err(Error::InvalidParam {
                    name,
                    detail: format!("expected a non-negative finite value, got {value}"),
                });
            }
        }

        for (name, value) in [
            ("yaw_expo", self.yaw_expo),
            ("pitch_expo", self.pitch_expo),
            ("roll_expo", self.roll_expo),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(Error::InvalidParam {
                    name,
                    detail: format!("expo must lie in [0, 1], got {value}"),
                });
            }
        }

        if self.idle_rpm > self.max_rpm {
            return Err(Error::InvalidParam {
                name: "idle_rpm",
                detail: format!(
                    "idle rpm {} exceeds max rpm {}",
                    self.idle_rpm, self.max_rpm
                ),
            });
        }

        if !self.base_landing_height.is_finite() || !self.spawn_position.is_finite() {
            return Err(Error::InvalidParam {
                name: "spawn_position",
                detail: "landing height and spawn position must be finite".to_string(),
            });
        }

        Ok(())
    }
}
