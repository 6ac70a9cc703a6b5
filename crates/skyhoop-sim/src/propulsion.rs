//! Rotor arming and RPM model.
//!
//! Rotors spin up quickly and coast down slowly. The RPM is purely cosmetic
//! and for telemetry: lift comes straight from throttle and is not gated by
//! arming.

use serde::Serialize;

use crate::params::PhysicsParams;

/// Throttle above which a powered drone arms.
pub const ARM_THROTTLE: f32 = 0.05;

/// Throttle above which an armed drone leaves idle.
const ACTIVE_THROTTLE: f32 = 0.01;

/// Fraction of idle RPM a powered but disarmed drone twitches at.
const DISARMED_IDLE_FRACTION: f32 = 0.3;

/// Exponent of the throttle-to-RPM curve.
const THROTTLE_CURVE: f32 = 1.5;

/// RPM difference below which the current value snaps to the target.
const SNAP_RPM: f32 = 50.0;

/// Spin-down slowdown applied when power is cut.
const POWER_OFF_SPINDOWN_FACTOR: f32 = 1.5;

/// Propulsion operating mode, derived from power, arming and throttle.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PropulsionMode {
    /// Power switch off. Rotors coast to a stop.
    PoweredOff,
    /// Power on, waiting for throttle to arm.
    Disarmed,
    /// Armed with throttle closed.
    IdleArmed,
    /// Armed and producing thrust.
    Active,
}

/// Rotor state.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize)]
pub struct PropulsionState {
    /// Current rotor speed.
    pub current_rpm: f32,
    /// Speed the rotors are heading towards.
    pub target_rpm: f32,
    /// Whether the drone is armed.
    pub armed: bool,
    /// Whether the pilot's power switch is on.
    pub power_on: bool,
    /// Throttle seen on the last update.
    #[serde(skip)]
    throttle: f32,
}

impl PropulsionState {
    /// Current operating mode.
    pub fn mode(&self) -> PropulsionMode {
        match (self.power_on, self.armed) {
            (false, _) => PropulsionMode::PoweredOff,
            (true, false) => PropulsionMode::Disarmed,
            (true, true) if self.throttle > ACTIVE_THROTTLE => PropulsionMode::Active,
            (true, true) => PropulsionMode::IdleArmed,
        }
    }

    /// Current RPM as a fraction of `max_rpm`.
    pub fn normalized_rpm(&self, params: &PhysicsParams) -> f32 {
        if params.max_rpm > 0.0 {
            (self.current_rpm / params.max_rpm).clamp(0.0, 1.0)
        } else {
            0.0
        }
    }
}

/// Arms, disarms and spools the rotors.
#[derive(Clone, Debug, Default)]
pub struct PropulsionStateMachine {
    state: PropulsionState,
}

impl PropulsionStateMachine {
    /// A machine with power off and rotors stopped.
    pub fn new() -> Self {
        Self::default()
    }

    /// Current state.
    pub fn state(&self) -> &PropulsionState {
        &self.state
    }

    /// Stop the rotors, disarm and switch power off.
    pub fn reset(&mut self) {
        self.state = PropulsionState::default();
    }

    /// Apply the latest power flag and throttle, then advance the RPM by `dt`.
    pub fn update(
        &mut self,
        throttle: f32,
        power: bool,
        dt: f32,
        params: &PhysicsParams,
    ) -> &PropulsionState {
        let throttle = if throttle.is_nan() {
            0.0
        } else {
            throttle.clamp(0.0, 1.0)
        };
        self.apply_controls(throttle, power);
        self.state.target_rpm = target_rpm(&self.state, params);
        self.spool(dt, params);
        &self.state
    }

    fn apply_controls(&mut self, throttle: f32, power: bool) {
        let state = &mut self.state;
        if power && !state.power_on {
            tracing::info!("Power on, drone ready for control");
        }
        state.power_on = power;
        state.throttle = throttle;

        if power && !state.armed && throttle > ARM_THROTTLE {
            state.armed = true;
            tracing::info!("Drone armed");
        }
        if !power && state.armed {
            state.armed = false;
            tracing::info!("Drone disarmed, power off");
        }
    }

    fn spool(&mut self, dt: f32, params: &PhysicsParams) {
        let state = &mut self.state;
        let diff = state.target_rpm - state.current_rpm;

        if diff.abs() > SNAP_RPM {
            let transition = if !state.power_on {
                params.prop_spindown_time * POWER_OFF_SPINDOWN_FACTOR
            } else if diff > 0.0 {
                params.prop_spinup_time
            } else {
                params.prop_spindown_time
            };
            let rate = diff.abs() / transition;
            let change = (rate * dt.max(0.0)).min(diff.abs());
            state.current_rpm += change * diff.signum();
        } else {
            state.current_rpm = state.target_rpm;
        }

        state.current_rpm = state.current_rpm.clamp(0.0, params.max_rpm);
    }
}

/// RPM the rotors should settle at in the current state.
fn target_rpm(state: &PropulsionState, params: &PhysicsParams) -> f32 {
    match state.mode() {
        PropulsionMode::PoweredOff => 0.0,
        PropulsionMode::Disarmed => params.idle_rpm * DISARMED_IDLE_FRACTION,
        PropulsionMode::IdleArmed => params.idle_rpm,
        PropulsionMode::Active => {
            params.idle_rpm
                + (params.max_rpm - params.idle_rpm) * state.throttle.powf(THROTTLE_CURVE)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run(
        machine: &mut PropulsionStateMachine,
        throttle: f32,
        power: bool,
        secs: f32,
        params: &PhysicsParams,
    ) {
        let dt = 0.016;
        let steps = (secs / dt).round() as usize;
        for _ in 0..steps {
            machine.update(throttle, power, dt, params);
        }
    }

    #[test]
    fn test_starts_powered_off() {
        let machine = PropulsionStateMachine::new();
        assert_eq!(machine.state().mode(), PropulsionMode::PoweredOff);
        assert_eq!(machine.state().current_rpm, 0.0);
    }

    #[test]
    fn test_power_on_without_throttle_stays_disarmed() {
        let params = PhysicsParams::default();
        let mut machine = PropulsionStateMachine::new();
        run(&mut machine, 0.04, true, 2.0, &params);

        let state = machine.state();
        assert_eq!(state.mode(), PropulsionMode::Disarmed);
        assert!((state.target_rpm - 240.0).abs() < 1e-3);
        assert!((state.current_rpm - 240.0).abs() < 1e-3);
    }

    #[test]
    fn test_throttle_arms_and_stays_armed_at_idle() {
        let params = PhysicsParams::default();
        let mut machine = PropulsionStateMachine::new();
        machine.update(0.5, true, 0.016, &params);
        assert!(machine.state().armed);
        assert_eq!(machine.state().mode(), PropulsionMode::Active);

        run(&mut machine, 0.0, true, 3.0, &params);
        assert!(machine.state().armed);
        assert_eq!(machine.state().mode(), PropulsionMode::IdleArmed);
        assert!((machine.state().current_rpm - params.idle_rpm).abs() < 1e-3);
    }

    #[test]
    fn test_full_throttle_target_is_max() {
        let params = PhysicsParams::default();
        let mut machine = PropulsionStateMachine::new();
        machine.update(1.0, true, 0.016, &params);
        assert!((machine.state().target_rpm - params.max_rpm).abs() < 1e-3);
    }

    #[test]
    fn test_throttle_curve() {
        let params = PhysicsParams::default();
        let mut machine = PropulsionStateMachine::new();
        machine.update(0.25, true, 0.016, &params);
        // 800 + 7200 * 0.125
        assert!((machine.state().target_rpm - 1700.0).abs() < 1e-2);
    }

    #[test]
    fn test_spin_up_faster_than_spin_down() {
        let params = PhysicsParams::default();
        let mut machine = PropulsionStateMachine::new();
        machine.update(1.0, true, 0.0, &params);
        let before = machine.state().current_rpm;
        machine.update(1.0, true, 0.016, &params);
        let up = machine.state().current_rpm - before;

        run(&mut machine, 1.0, true, 3.0, &params);
        let top = machine.state().current_rpm;
        machine.update(0.0, true, 0.016, &params);
        let down = top - machine.state().current_rpm;

        assert!(up > 0.0 && down > 0.0);
        // First-step change is |diff| * dt / transition.
        assert!((up - (8000.0 - before) * 0.016 / 0.2).abs() < 1.0);
        assert!((down - (top - 800.0) * 0.016 / 0.8).abs() < 1.0);
    }

    #[test]
    fn test_power_off_disarms_and_coasts_down() {
        let params = PhysicsParams::default();
        let mut machine = PropulsionStateMachine::new();
        run(&mut machine, 1.0, true, 2.0, &params);
        let top = machine.state().current_rpm;

        machine.update(1.0, false, 0.016, &params);
        let state = *machine.state();
        assert!(!state.armed);
        assert_eq!(state.mode(), PropulsionMode::PoweredOff);
        assert_eq!(state.target_rpm, 0.0);
        let expected = top - top * 0.016 / (0.8 * 1.5);
        assert!((state.current_rpm - expected).abs() < 1.0);

        run(&mut machine, 0.0, false, 10.0, &params);
        assert_eq!(machine.state().current_rpm, 0.0);
    }

    #[test]
    fn test_rpm_snaps_within_threshold() {
        let params = PhysicsParams::default();
        let mut machine = PropulsionStateMachine::new();
        machine.update(0.0, true, 0.016, &params);
        // Disarmed idle target is 240; 200 is inside the snap threshold.
        machine.state.current_rpm = 200.0;
        machine.update(0.0, true, 0.016, &params);
        let idle = params.idle_rpm * DISARMED_IDLE_FRACTION;
        assert_eq!(machine.state().current_rpm, machine.state().target_rpm);
        assert!((machine.state().current_rpm - idle).abs() < 1e-3);
    }

    #[test]
    fn test_rpm_never_exceeds_max() {
        let params = PhysicsParams::default();
        let mut machine = PropulsionStateMachine::new();
        for _ in 0..500 {
            machine.update(1.0, true, 0.033, &params);
            let rpm = machine.state().current_rpm;
            assert!((0.0..=params.max_rpm).contains(&rpm));
        }
        assert!((machine.state().normalized_rpm(&params) - 1.0).abs() < 1e-3);
    }

    #[test]
    fn test_reset_disarms_and_stops() {
        let params = PhysicsParams::default();
        let mut machine = PropulsionStateMachine::new();
        run(&mut machine, 1.0, true, 1.0, &params);
        machine.reset();
        assert!(!machine.state().armed);
        assert_eq!(machine.state().mode(), PropulsionMode::PoweredOff);
        assert_eq!(machine.state().current_rpm, 0.0);
    }
}
