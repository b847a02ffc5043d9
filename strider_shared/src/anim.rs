//! Animation driver.
//!
//! Projects locomotion state onto a fixed set of named animator parameters.
//! The sink owns any smoothing; the driver itself is stateless.

use std::collections::HashMap;

use crate::motion::LocomotionState;

pub const PARAM_FORWARD: &str = "Forward";
pub const PARAM_ON_GROUND: &str = "OnGround";
pub const PARAM_JUMP: &str = "Jump";

/// Time constant for the `Forward` parameter, in seconds.
pub const FORWARD_DAMP_TIME: f32 = 0.1;

/// Named animator parameters.
pub trait AnimationSink {
    fn set_float(&mut self, name: &'static str, value: f32);
    /// Moves the parameter toward `target` with exponential damping.
    fn set_float_damped(&mut self, name: &'static str, target: f32, damp_time: f32, dt: f32);
    fn set_bool(&mut self, name: &'static str, value: bool);
}

/// In-memory animator parameter table.
#[derive(Debug, Default, Clone)]
pub struct AnimatorParams {
    floats: HashMap<&'static str, f32>,
    bools: HashMap<&'static str, bool>,
}

impl AnimatorParams {
    pub fn float(&self, name: &str) -> Option<f32> {
        self.floats.get(name).copied()
    }

    pub fn bool(&self, name: &str) -> Option<bool> {
        self.bools.get(name).copied()
    }
}

impl AnimationSink for AnimatorParams {
    fn set_float(&mut self, name: &'static str, value: f32) {
        self.floats.insert(name, value);
    }

    fn set_float_damped(&mut self, name: &'static str, target: f32, damp_time: f32, dt: f32) {
        let current = self.floats.entry(name).or_insert(0.0);
        if damp_time <= 0.0 {
            *current = target;
            return;
        }
        let alpha = 1.0 - (-dt.max(0.0) / damp_time).exp();
        *current += (target - *current) * alpha;
    }

    fn set_bool(&mut self, name: &'static str, value: bool) {
        self.bools.insert(name, value);
    }
}

/// Maps locomotion onto `Forward`, `OnGround` and `Jump`.
#[derive(Debug, Default, Clone, Copy)]
pub struct AnimationDriver;

impl AnimationDriver {
    /// Full projection for the owning instance.
    pub fn drive(&self, sink: &mut dyn AnimationSink, state: &LocomotionState, dt: f32) {
        self.drive_forward(sink, state.forward_amount, dt);
        sink.set_bool(PARAM_ON_GROUND, state.grounded);
        if !state.grounded {
            sink.set_float(PARAM_JUMP, state.vertical_velocity);
        }
    }

    /// Forward-only projection; observers know nothing but the replica.
    pub fn drive_forward(&self, sink: &mut dyn AnimationSink, forward_amount: f32, dt: f32) {
        sink.set_float_damped(PARAM_FORWARD, forward_amount, FORWARD_DAMP_TIME, dt);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn forward_decays_exponentially() {
        let mut params = AnimatorParams::default();
        params.set_float(PARAM_FORWARD, 1.0);

        let driver = AnimationDriver;
        let idle = LocomotionState {
            grounded: true,
            ..Default::default()
        };
        driver.drive(&mut params, &idle, 0.1);
        let after_one = params.float(PARAM_FORWARD).unwrap();
        assert!((after_one - (-1.0f32).exp()).abs() < 1e-5);

        for _ in 0..9 {
            driver.drive(&mut params, &idle, 0.1);
        }
        let after_ten = params.float(PARAM_FORWARD).unwrap();
        assert!(after_ten < after_one);
        assert!((after_ten - (-10.0f32).exp()).abs() < 1e-5);
    }

    #[test]
    fn jump_only_written_while_airborne() {
        let mut params = AnimatorParams::default();
        let driver = AnimationDriver;

        let grounded = LocomotionState {
            grounded: true,
            vertical_velocity: 3.0,
            ..Default::default()
        };
        driver.drive(&mut params, &grounded, 0.02);
        assert_eq!(params.bool(PARAM_ON_GROUND), Some(true));
        assert_eq!(params.float(PARAM_JUMP), None);

        let falling = LocomotionState {
            vertical_velocity: -2.5,
            ..Default::default()
        };
        driver.drive(&mut params, &falling, 0.02);
        assert_eq!(params.bool(PARAM_ON_GROUND), Some(false));
        assert_eq!(params.float(PARAM_JUMP), Some(-2.5));
    }

    #[test]
    fn zero_damp_time_snaps() {
        let mut params = AnimatorParams::default();
        params.set_float_damped(PARAM_FORWARD, 0.7, 0.0, 0.02);
        assert_eq!(params.float(PARAM_FORWARD), Some(0.7));
    }
}
