//! Control samples and stick shaping.
//!
//! Raw stick values go through a deadzone, then an expo curve. Pitch and roll
//! are additionally raised to a power before being mapped to tilt angles, which
//! keeps small corrections gentle while full deflection stays aggressive.

use serde::{Deserialize, Serialize};

use crate::params::PhysicsParams;

/// One control update from the pilot.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ControlSample {
    /// Collective throttle (0 to 1).
    pub throttle: f32,
    /// Yaw stick (-1 to 1, positive = turn towards +yaw).
    pub yaw: f32,
    /// Pitch stick (-1 to 1, positive = forward).
    pub pitch: f32,
    /// Roll stick (-1 to 1, positive = right).
    pub roll: f32,
    /// Whether the pilot's power switch is on.
    pub power: bool,
    /// Sender timestamp in milliseconds. Informational only.
    pub timestamp: f64,
}

impl ControlSample {
    /// All sticks centred, throttle closed, keeping the given power flag.
    pub fn zeroed(power: bool) -> Self {
        Self {
            power,
            ..Default::default()
        }
    }

    /// Clamp every axis into its legal range; NaN becomes zero.
    #[must_use]
    pub fn normalized(self) -> Self {
        Self {
            throttle: finite_or_zero(self.throttle).clamp(0.0, 1.0),
            yaw: finite_or_zero(self.yaw).clamp(-1.0, 1.0),
            pitch: finite_or_zero(self.pitch).clamp(-1.0, 1.0),
            roll: finite_or_zero(self.roll).clamp(-1.0, 1.0),
            ..self
        }
    }
}

fn finite_or_zero(v: f32) -> f32 {
    if v.is_nan() { 0.0 } else { v }
}

/// Zero values whose magnitude is below `d`. Values at or above the threshold
/// pass through unchanged, with no rescaling of the remaining range.
pub fn deadzone(v: f32, d: f32) -> f32 {
    if v.abs() < d { 0.0 } else { v }
}

/// Blend linear and cubic response: `v·(1-e) + v³·e`.
pub fn expo(v: f32, e: f32) -> f32 {
    v * (1.0 - e) + v * v * v * e
}

/// Raise the magnitude of `v` to `exponent`, keeping its sign.
pub fn signed_pow(v: f32, exponent: f32) -> f32 {
    v.abs().powf(exponent) * v.signum()
}

/// Stick values after shaping, ready for the integrator.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct ShapedInput {
    /// Clamped throttle (0 to 1).
    pub throttle: f32,
    /// Shaped yaw command (-1 to 1).
    pub yaw: f32,
    /// Shaped pitch command (-1 to 1).
    pub pitch: f32,
    /// Shaped roll command (-1 to 1).
    pub roll: f32,
    /// Target pitch angle (radians).
    pub target_pitch: f32,
    /// Target roll angle (radians).
    pub target_roll: f32,
}

impl ShapedInput {
    /// Absolute pitch deflection.
    pub fn pitch_magnitude(&self) -> f32 {
        self.pitch.abs()
    }

    /// Absolute roll deflection.
    pub fn roll_magnitude(&self) -> f32 {
        self.roll.abs()
    }

    /// Horizontal acceleration multiplier for the pitch axis.
    pub fn pitch_accel_multiplier(&self) -> f32 {
        1.0 + self.pitch_magnitude() * 2.0
    }

    /// Horizontal acceleration multiplier for the roll axis.
    pub fn roll_accel_multiplier(&self) -> f32 {
        1.0 + self.roll_magnitude() * 2.0
    }
}

/// Shape a control sample into integrator targets.
pub fn shape(sample: &ControlSample, params: &PhysicsParams) -> ShapedInput {
    let sample = sample.normalized();

    let yaw = expo(deadzone(sample.yaw, params.deadzone), params.yaw_expo);
    let pitch = expo(deadzone(sample.pitch, params.deadzone), params.pitch_expo);
    let roll = expo(deadzone(sample.roll, params.deadzone), params.roll_expo);

    ShapedInput {
        throttle: sample.throttle,
        yaw,
        pitch,
        roll,
        target_pitch: signed_pow(pitch, params.tilt_curve_exponent) * params.max_tilt,
        target_roll: signed_pow(roll, params.tilt_curve_exponent) * params.max_tilt,
    }
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;

    #[test]
    fn test_deadzone_threshold_is_hard() {
        assert_eq!(deadzone(0.059, 0.06), 0.0);
        assert_eq!(deadzone(-0.059, 0.06), 0.0);
        // At and above the threshold the value passes through untouched.
        assert_eq!(deadzone(0.06, 0.06), 0.06);
        assert_eq!(deadzone(-0.5, 0.06), -0.5);
    }

    #[test]
    fn test_expo_endpoints() {
        for e in [0.0, 0.3, 0.5, 1.0] {
            assert!((expo(1.0, e) - 1.0).abs() < 1e-6);
            assert!((expo(-1.0, e) + 1.0).abs() < 1e-6);
            assert_eq!(expo(0.0, e), 0.0);
        }
    }

    #[test]
    fn test_expo_softens_centre() {
        assert!(expo(0.2, 0.8) < expo(0.2, 0.2));
    }

    #[test]
    fn test_signed_pow_keeps_sign() {
        assert!((signed_pow(-1.0, 1.8) + 1.0).abs() < 1e-6);
        assert!(signed_pow(-0.5, 1.8) < 0.0);
        assert!(signed_pow(0.5, 1.8) < 0.5);
        assert_eq!(signed_pow(0.0, 1.8), 0.0);
    }

    #[test]
    fn test_shape_full_pitch_reaches_max_tilt() {
        let params = PhysicsParams::default();
        let sample = ControlSample {
            pitch: 1.0,
            ..Default::default()
        };
        let shaped = shape(&sample, &params);
        assert!((shaped.pitch - 1.0).abs() < 1e-6);
        assert!((shaped.target_pitch - params.max_tilt).abs() < 1e-5);
        assert!((shaped.pitch_accel_multiplier() - 3.0).abs() < 1e-6);
        assert_eq!(shaped.target_roll, 0.0);
    }

    #[test]
    fn test_shape_clamps_out_of_range() {
        let params = PhysicsParams::default();
        let sample = ControlSample {
            throttle: 1.7,
            yaw: -4.0,
            pitch: f32::NAN,
            roll: 2.0,
            ..Default::default()
        };
        let shaped = shape(&sample, &params);
        assert_eq!(shaped.throttle, 1.0);
        assert!((shaped.yaw + 1.0).abs() < 1e-6);
        assert_eq!(shaped.pitch, 0.0);
        assert!((shaped.roll - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_negative_throttle_clamps_to_zero() {
        let shaped = shape(
            &ControlSample {
                throttle: -0.3,
                ..Default::default()
            },
            &PhysicsParams::default(),
        );
        assert_eq!(shaped.throttle, 0.0);
    }

    #[test]
    fn test_zero_sample_shapes_to_zero() {
        let shaped = shape(&ControlSample::zeroed(true), &PhysicsParams::default());
        assert_eq!(shaped, ShapedInput::default());
    }

    proptest! {
        #[test]
        fn prop_expo_deadzone_zero_below_threshold(v in -0.0599f32..0.0599, e in 0.0f32..=1.0) {
            prop_assert_eq!(expo(deadzone(v, 0.06), e), 0.0);
        }

        #[test]
        fn prop_expo_deadzone_one_at_full(e in 0.0f32..=1.0) {
            prop_assert!((expo(deadzone(1.0, 0.06), e) - 1.0).abs() < 1e-6);
        }

        #[test]
        fn prop_shaped_axes_stay_in_range(
            yaw in -10.0f32..10.0,
            pitch in -10.0f32..10.0,
            roll in -10.0f32..10.0,
            throttle in -10.0f32..10.0,
        ) {
            let params = PhysicsParams::default();
            let shaped = shape(&ControlSample { throttle, yaw, pitch, roll, ..Default::default() }, &params);
            prop_assert!((0.0..=1.0).contains(&shaped.throttle));
            for axis in [shaped.yaw, shaped.pitch, shaped.roll] {
                prop_assert!((-1.0..=1.0).contains(&axis));
            }
            prop_assert!(shaped.target_pitch.abs() <= params.max_tilt + 1e-5);
            prop_assert!(shaped.target_roll.abs() <= params.max_tilt + 1e-5);
        }
    }
}
