//! Motion resolver.
//!
//! Projects a movement intent onto the ground plane, moves the body through
//! the collision world and snaps its facing to the direction of travel.

use serde::{Deserialize, Serialize};

use crate::{
    debug_draw::{DebugColor, DebugDraw},
    ground::{GroundContact, GroundSensor},
    math::{Quat, Vec3, EPSILON},
    physics::CollisionWorld,
};

/// Where a character is and which way it faces.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct CharacterPose {
    pub position: Vec3,
    pub rotation: Quat,
}

impl CharacterPose {
    pub fn at(position: Vec3) -> Self {
        Self {
            position,
            rotation: Quat::IDENTITY,
        }
    }
}

/// Locomotion state owned by the controlling instance.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LocomotionState {
    pub ground_normal: Vec3,
    pub grounded: bool,
    /// Replicated to observers.
    pub forward_amount: f32,
    pub vertical_velocity: f32,
}

impl Default for LocomotionState {
    fn default() -> Self {
        Self {
            ground_normal: Vec3::UP,
            grounded: false,
            forward_amount: 0.0,
            vertical_velocity: 0.0,
        }
    }
}

impl LocomotionState {
    fn set_ground(&mut self, contact: GroundContact) {
        self.grounded = contact.grounded;
        self.ground_normal = contact.normal;
    }
}

/// Pure result of resolving one intent against the ground.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Motion {
    /// Intent with its ground-normal component removed.
    pub projected: Vec3,
    /// Magnitude of `projected`; becomes the forward amount.
    pub speed: f32,
    pub displacement: Vec3,
    /// `None` when there is nothing to face along.
    pub facing: Option<Quat>,
}

/// Resolves an intent without touching any state.
pub fn resolve(intent: Vec3, ground_normal: Vec3, move_speed: f32, dt: f32) -> Motion {
    let projected = intent.project_on_plane(ground_normal);
    let speed = projected.len();
    let facing = (speed > EPSILON).then(|| Quat::look_rotation(projected.normalize_or_zero()));
    Motion {
        projected,
        speed,
        displacement: projected * move_speed * dt,
        facing,
    }
}

/// Ground-aware mover for one character.
#[derive(Debug, Clone, Copy)]
pub struct MotionResolver {
    pub move_speed: f32,
    pub sensor: GroundSensor,
}

impl MotionResolver {
    pub fn new(move_speed: f32, ground_check_distance: f32) -> Self {
        Self {
            move_speed,
            sensor: GroundSensor::new(ground_check_distance),
        }
    }

    /// Runs one move: probe, project, sweep, face.
    ///
    /// Updates every field of `state`; orientation is overwritten outright
    /// when the projected intent is non-zero and left untouched otherwise.
    pub fn step(
        &self,
        pose: &mut CharacterPose,
        state: &mut LocomotionState,
        intent: Vec3,
        world: &dyn CollisionWorld,
        dt: f32,
        debug: &mut dyn DebugDraw,
    ) -> Motion {
        let contact = self.sensor.probe(world, pose.position, debug);
        state.set_ground(contact);

        let motion = resolve(intent, state.ground_normal, self.move_speed, dt);
        state.forward_amount = motion.speed;

        debug.draw_ray(pose.position, motion.projected, DebugColor::Red);
        let start = pose.position;
        pose.position = world.sweep(start, motion.displacement);
        state.vertical_velocity = if dt > 0.0 {
            (pose.position.y - start.y) / dt
        } else {
            0.0
        };

        if let Some(facing) = motion.facing {
            pose.rotation = facing;
        }
        motion
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        debug_draw::NullDebugDraw,
        physics::{EmptyWorld, PlaneWorld},
    };
    use rand::{rngs::StdRng, Rng, SeedableRng};

    fn random_vec(rng: &mut StdRng) -> Vec3 {
        Vec3::new(
            rng.gen_range(-5.0..5.0),
            rng.gen_range(-5.0..5.0),
            rng.gen_range(-5.0..5.0),
        )
    }

    #[test]
    fn projection_is_orthogonal_to_ground_normal() {
        let mut rng = StdRng::seed_from_u64(0x5eed);
        for _ in 0..500 {
            let normal = random_vec(&mut rng).normalize_or_zero();
            if normal == Vec3::ZERO {
                continue;
            }
            let motion = resolve(random_vec(&mut rng), normal, 1.0, 0.02);
            assert!(
                motion.projected.dot(normal).abs() < 1e-3,
                "{:?} not orthogonal to {normal:?}",
                motion.projected
            );
        }
    }

    #[test]
    fn forward_walk_scenario() {
        let motion = resolve(Vec3::new(0.0, 0.0, 1.0), Vec3::UP, 2.0, 0.5);
        assert!(motion.displacement.approx_eq(Vec3::new(0.0, 0.0, 1.0), EPSILON));
        let facing = motion.facing.expect("facing").forward();
        assert!(facing.approx_eq(Vec3::FORWARD, 1e-4));
        assert!((motion.speed - 1.0).abs() < EPSILON);
    }

    #[test]
    fn facing_matches_normalized_projection() {
        let normal = Vec3::new(0.3, 1.0, 0.0).normalize_or_zero();
        let motion = resolve(Vec3::new(2.0, 0.0, -1.0), normal, 1.0, 0.1);
        let facing = motion.facing.expect("facing").forward();
        assert!(facing.approx_eq(motion.projected.normalize_or_zero(), 1e-4));
    }

    #[test]
    fn zero_intent_leaves_orientation_alone() {
        let resolver = MotionResolver::new(3.0, 0.1);
        let before = Quat::from_yaw(1.0);
        let mut pose = CharacterPose {
            position: Vec3::ZERO,
            rotation: before,
        };
        let mut state = LocomotionState::default();
        let motion = resolver.step(
            &mut pose,
            &mut state,
            Vec3::ZERO,
            &PlaneWorld::flat(0.0),
            0.02,
            &mut NullDebugDraw,
        );
        assert_eq!(motion.displacement, Vec3::ZERO);
        assert_eq!(pose.rotation, before);
        assert_eq!(pose.position, Vec3::ZERO);
        assert_eq!(state.forward_amount, 0.0);
        assert!(state.grounded);
    }

    #[test]
    fn vertical_intent_on_flat_ground_does_not_move() {
        let motion = resolve(Vec3::new(0.0, 4.0, 0.0), Vec3::UP, 1.0, 1.0);
        assert_eq!(motion.speed, 0.0);
        assert!(motion.facing.is_none());
    }

    #[test]
    fn step_moves_and_faces_along_travel() {
        let resolver = MotionResolver::new(2.0, 0.1);
        let mut pose = CharacterPose::default();
        let mut state = LocomotionState::default();
        resolver.step(
            &mut pose,
            &mut state,
            Vec3::new(1.0, 0.0, 0.0),
            &PlaneWorld::flat(0.0),
            0.5,
            &mut NullDebugDraw,
        );
        assert!(pose.position.approx_eq(Vec3::new(1.0, 0.0, 0.0), EPSILON));
        assert!(pose.rotation.forward().approx_eq(Vec3::RIGHT, 1e-4));
        assert!((state.forward_amount - 1.0).abs() < EPSILON);
        assert_eq!(state.vertical_velocity, 0.0);
    }

    #[test]
    fn airborne_step_uses_up_as_ground_normal() {
        let resolver = MotionResolver::new(1.0, 0.1);
        let mut pose = CharacterPose::at(Vec3::new(0.0, 10.0, 0.0));
        let mut state = LocomotionState {
            ground_normal: Vec3::RIGHT,
            grounded: true,
            ..Default::default()
        };
        resolver.step(
            &mut pose,
            &mut state,
            Vec3::new(0.0, -1.0, 1.0),
            &EmptyWorld,
            0.1,
            &mut NullDebugDraw,
        );
        assert!(!state.grounded);
        assert_eq!(state.ground_normal, Vec3::UP);
        assert!((state.forward_amount - 1.0).abs() < EPSILON);
    }
}
