//! Attitude, velocity and position integration.
//!
//! Pure functions that can be tested in isolation. Pitch and roll follow their
//! stick targets through a first-order filter whose bandwidth grows with stick
//! deflection, yaw integrates the stick directly, and translation is a simple
//! semi-implicit Euler step with linear drag.

use glam::{EulerRot, Quat, Vec3};
use serde::{Deserialize, Serialize};

use crate::input::ShapedInput;
use crate::params::PhysicsParams;

/// Kinematic state of the drone.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct DroneState {
    /// World position.
    pub position: Vec3,
    /// World velocity (units/s).
    pub velocity: Vec3,
    /// Heading (radians).
    pub yaw: f32,
    /// Nose tilt (radians).
    pub pitch: f32,
    /// Bank (radians).
    pub roll: f32,
}

impl DroneState {
    /// A level, motionless drone at `position`.
    pub fn at_rest(position: Vec3) -> Self {
        Self {
            position,
            velocity: Vec3::ZERO,
            yaw: 0.0,
            pitch: 0.0,
            roll: 0.0,
        }
    }

    /// Unit vector the nose points along, ignoring tilt.
    pub fn forward(&self) -> Vec3 {
        let (sy, cy) = self.yaw.sin_cos();
        Vec3::new(sy, 0.0, cy)
    }

    /// Unit vector to the drone's right, ignoring tilt.
    pub fn right(&self) -> Vec3 {
        let (sy, cy) = self.yaw.sin_cos();
        Vec3::new(cy, 0.0, -sy)
    }

    /// Total speed.
    pub fn speed(&self) -> f32 {
        self.velocity.length()
    }

    /// Speed in the horizontal plane.
    pub fn horizontal_speed(&self) -> f32 {
        Vec3::new(self.velocity.x, 0.0, self.velocity.z).length()
    }

    /// Body orientation for renderers (yaw, then pitch, then roll).
    ///
    /// Roll is negated so that a positive roll command banks to the right
    /// in a Y-up, right-handed scene.
    pub fn rotation(&self) -> Quat {
        Quat::from_euler(EulerRot::YXZ, self.yaw, self.pitch, -self.roll)
    }
}

/// Landing height for the current attitude.
///
/// A tilted airframe needs more clearance so its arms stay above the surface.
pub fn min_landing_height(state: &DroneState, params: &PhysicsParams) -> f32 {
    params.base_landing_height + (state.pitch.abs() + state.roll.abs()) * params.tilt_landing_offset
}

/// Acceleration acting on the drone for the given inputs, including drag.
pub fn acceleration(state: &DroneState, input: &ShapedInput, params: &PhysicsParams) -> Vec3 {
    let up_accel = input.throttle * params.lift - params.gravity;
    let forward_accel = input.pitch * params.accel * input.pitch_accel_multiplier();
    let side_accel = input.roll * params.accel * input.roll_accel_multiplier();

    state.forward() * forward_accel + state.right() * side_accel + Vec3::Y * up_accel
        - state.velocity * params.drag
}

/// Advance the drone by `dt` seconds without clamping the timestep.
///
/// Callers are expected to clamp `dt`; see [`step`].
pub fn integrate(state: &mut DroneState, input: &ShapedInput, params: &PhysicsParams, dt: f32) {
    // Progressive attitude smoothing: faster response at higher deflection.
    let pitch_rate = 3.0 + input.pitch_magnitude() * 8.0;
    let roll_rate = 3.0 + input.roll_magnitude() * 8.0;
    state.pitch += (input.target_pitch - state.pitch) * (dt * pitch_rate).min(1.0);
    state.roll += (input.target_roll - state.roll) * (dt * roll_rate).min(1.0);
    state.yaw += input.yaw * params.yaw_rate * dt;

    let accel = acceleration(state, input, params);
    state.velocity += accel * dt;
    state.position += state.velocity * dt;

    let min_height = min_landing_height(state, params);
    if state.position.y < min_height {
        state.position.y = min_height;
        if state.velocity.y < 0.0 {
            state.velocity.y = 0.0;
        }
    }
}

/// Advance the drone by `dt`, clamped to [`PhysicsParams::max_dt`].
///
/// Returns the timestep that was actually integrated.
pub fn step(state: &mut DroneState, input: &ShapedInput, params: &PhysicsParams, dt: f32) -> f32 {
    let dt = clamp_dt(dt, params);
    integrate(state, input, params, dt);
    dt
}

/// Clamp a wall-clock delta into a usable simulation timestep.
pub fn clamp_dt(dt: f32, params: &PhysicsParams) -> f32 {
    if dt.is_finite() {
        dt.clamp(0.0, params.max_dt)
    } else {
        0.0
    }
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;
    use crate::input::{ControlSample, shape};

    fn frictionless() -> PhysicsParams {
        PhysicsParams {
            drag: 0.0,
            base_landing_height: 0.0,
            tilt_landing_offset: 0.0,
            max_dt: 0.1,
            ..Default::default()
        }
    }

    #[test]
    fn test_full_throttle_single_step() {
        let params = frictionless();
        let mut state = DroneState::at_rest(Vec3::new(0.0, 1.5, 0.0));
        let input = shape(
            &ControlSample {
                throttle: 1.0,
                ..Default::default()
            },
            &params,
        );

        integrate(&mut state, &input, &params, 0.1);

        // 20 - 9.81 = 10.19 upward.
        assert!((state.velocity.y - 1.019).abs() < 1e-4);
        assert!((state.position.y - 1.6019).abs() < 1e-4);
        assert_eq!(state.velocity.x, 0.0);
        assert_eq!(state.velocity.z, 0.0);
    }

    #[test]
    fn test_step_clamps_large_dt() {
        let params = PhysicsParams::default();
        let mut state = DroneState::at_rest(Vec3::new(0.0, 50.0, 0.0));
        let used = step(&mut state, &ShapedInput::default(), &params, 0.5);
        assert!((used - 0.033).abs() < 1e-6);
        assert!((state.velocity.y + 9.81 * 0.033).abs() < 1e-4);
    }

    #[test]
    fn test_clamp_dt_rejects_garbage() {
        let params = PhysicsParams::default();
        assert_eq!(clamp_dt(f32::NAN, &params), 0.0);
        assert_eq!(clamp_dt(-1.0, &params), 0.0);
        assert_eq!(clamp_dt(f32::INFINITY, &params), 0.0);
        assert!((clamp_dt(0.016, &params) - 0.016).abs() < 1e-7);
    }

    #[test]
    fn test_free_fall_loses_gravity_dt_per_step() {
        let params = frictionless();
        let mut state = DroneState::at_rest(Vec3::new(0.0, 100.0, 0.0));
        let dt = 0.02;
        for _ in 0..20 {
            let before = state.velocity.y;
            integrate(&mut state, &ShapedInput::default(), &params, dt);
            assert!((before - state.velocity.y - params.gravity * dt).abs() < 1e-4);
        }
    }

    #[test]
    fn test_ground_clamp_zeroes_only_downward_velocity() {
        let params = PhysicsParams {
            drag: 0.0,
            ..Default::default()
        };
        let mut state = DroneState::at_rest(Vec3::new(0.0, 1.81, 0.0));
        state.velocity = Vec3::new(3.0, -5.0, -2.0);

        integrate(&mut state, &ShapedInput::default(), &params, 0.02);

        assert!((state.position.y - 1.8).abs() < 1e-5);
        assert_eq!(state.velocity.y, 0.0);
        assert!((state.velocity.x - 3.0).abs() < 1e-5);
        assert!((state.velocity.z + 2.0).abs() < 1e-5);
    }

    #[test]
    fn test_tilt_raises_landing_height() {
        let params = PhysicsParams::default();
        let mut state = DroneState::at_rest(Vec3::ZERO);
        state.pitch = 0.2;
        state.roll = -0.2;
        assert!((min_landing_height(&state, &params) - 2.0).abs() < 1e-6);
    }

    #[test]
    fn test_pitch_moves_along_forward() {
        let params = frictionless();
        let mut state = DroneState::at_rest(Vec3::new(0.0, 10.0, 0.0));
        state.yaw = std::f32::consts::FRAC_PI_2;
        let input = shape(
            &ControlSample {
                pitch: 1.0,
                ..Default::default()
            },
            &params,
        );

        integrate(&mut state, &input, &params, 0.05);

        // Yaw of 90° points the nose along +X.
        assert!(state.velocity.x > 0.0);
        assert!(state.velocity.z.abs() < 1e-4);
        // Full stick: accel * (1 + 2).
        assert!((state.velocity.x - params.accel * 3.0 * 0.05).abs() < 1e-3);
    }

    #[test]
    fn test_attitude_filter_is_faster_at_full_stick() {
        let params = PhysicsParams::default();
        let half = shape(
            &ControlSample {
                roll: 0.5,
                ..Default::default()
            },
            &params,
        );
        let full = shape(
            &ControlSample {
                roll: 1.0,
                ..Default::default()
            },
            &params,
        );

        let mut a = DroneState::at_rest(Vec3::new(0.0, 10.0, 0.0));
        let mut b = a;
        integrate(&mut a, &half, &params, 0.016);
        integrate(&mut b, &full, &params, 0.016);

        let frac_half = a.roll / half.target_roll;
        let frac_full = b.roll / full.target_roll;
        assert!(frac_full > frac_half);
    }

    #[test]
    fn test_yaw_integrates_without_smoothing() {
        let params = PhysicsParams::default();
        let mut state = DroneState::at_rest(Vec3::new(0.0, 10.0, 0.0));
        let input = shape(
            &ControlSample {
                yaw: 1.0,
                ..Default::default()
            },
            &params,
        );
        integrate(&mut state, &input, &params, 0.02);
        assert!((state.yaw - params.yaw_rate * 0.02).abs() < 1e-5);
    }

    #[test]
    fn test_forward_and_right_are_orthonormal() {
        let mut state = DroneState::at_rest(Vec3::ZERO);
        state.yaw = 0.7;
        assert!((state.forward().length() - 1.0).abs() < 1e-6);
        assert!((state.right().length() - 1.0).abs() < 1e-6);
        assert!(state.forward().dot(state.right()).abs() < 1e-6);
    }

    proptest! {
        #[test]
        fn prop_altitude_never_below_landing_height(
            dt in 0.0f32..1.0,
            vy in -200.0f32..50.0,
            y in -10.0f32..20.0,
            throttle in 0.0f32..1.0,
            pitch in -1.0f32..1.0,
            roll in -1.0f32..1.0,
        ) {
            let params = PhysicsParams::default();
            let mut state = DroneState::at_rest(Vec3::new(0.0, y, 0.0));
            state.velocity.y = vy;
            let input = shape(&ControlSample { throttle, pitch, roll, ..Default::default() }, &params);
            step(&mut state, &input, &params, dt);
            prop_assert!(state.position.y >= min_landing_height(&state, &params) - 1e-4);
        }
    }
}
