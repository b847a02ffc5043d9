//! Networked third-person character.
//!
//! Each instance is either the single authoritative copy (driven by its
//! owner's input) or an observer replica (driven only by replicated fields).
//! The role is fixed at spawn.
//!
//! ```text
//! Authoritative: axes -> camera-relative intent -> resolver -> outbox
//! Observer:      replicated forward amount -> animation
//! ```

use tracing::debug;

use crate::{
    anim::{AnimationDriver, AnimatorParams},
    config::ControllerConfig,
    debug_draw::DebugDraw,
    input::{camera_relative_intent, CameraProvider, RawAxes},
    math::Vec3,
    motion::{CharacterPose, LocomotionState, Motion, MotionResolver},
    physics::CollisionWorld,
    replication::{CharacterId, FieldId, FieldUpdate, ReplicationOutbox},
};

/// State held by the owning instance.
#[derive(Debug)]
pub struct Authority {
    resolver: MotionResolver,
    pose: CharacterPose,
    state: LocomotionState,
    outbox: ReplicationOutbox,
}

/// State held by a remote replica.
#[derive(Debug)]
pub struct ObserverReplica {
    pose: CharacterPose,
    forward_amount: f32,
}

/// Role chosen once at spawn from ownership.
#[derive(Debug)]
pub enum Role {
    Authoritative(Authority),
    Observer(ObserverReplica),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoleKind {
    Authoritative,
    Observer,
}

#[derive(Debug)]
pub struct Character {
    id: CharacterId,
    config: ControllerConfig,
    role: Role,
    animator: AnimatorParams,
    driver: AnimationDriver,
}

impl Character {
    /// Spawns a character; `owned` decides the role for its whole lifetime.
    pub fn spawn(id: CharacterId, config: ControllerConfig, pose: CharacterPose, owned: bool) -> Self {
        let role = if owned {
            Role::Authoritative(Authority {
                resolver: MotionResolver::new(config.move_speed, config.ground_check_distance),
                pose,
                state: LocomotionState::default(),
                outbox: ReplicationOutbox::default(),
            })
        } else {
            Role::Observer(ObserverReplica {
                pose,
                forward_amount: 0.0,
            })
        };
        Self {
            id,
            config,
            role,
            animator: AnimatorParams::default(),
            driver: AnimationDriver,
        }
    }

    pub fn id(&self) -> CharacterId {
        self.id
    }

    pub fn config(&self) -> &ControllerConfig {
        &self.config
    }

    pub fn role(&self) -> RoleKind {
        match self.role {
            Role::Authoritative(_) => RoleKind::Authoritative,
            Role::Observer(_) => RoleKind::Observer,
        }
    }

    pub fn is_authoritative(&self) -> bool {
        self.role() == RoleKind::Authoritative
    }

    pub fn pose(&self) -> &CharacterPose {
        match &self.role {
            Role::Authoritative(a) => &a.pose,
            Role::Observer(o) => &o.pose,
        }
    }

    /// Current forward amount: the local value or the last replicated one.
    pub fn forward_amount(&self) -> f32 {
        match &self.role {
            Role::Authoritative(a) => a.state.forward_amount,
            Role::Observer(o) => o.forward_amount,
        }
    }

    /// Full locomotion state; only the authoritative copy has one.
    pub fn locomotion(&self) -> Option<&LocomotionState> {
        match &self.role {
            Role::Authoritative(a) => Some(&a.state),
            Role::Observer(_) => None,
        }
    }

    pub fn outbox_mut(&mut self) -> Option<&mut ReplicationOutbox> {
        match &mut self.role {
            Role::Authoritative(a) => Some(&mut a.outbox),
            Role::Observer(_) => None,
        }
    }

    pub fn animator(&self) -> &AnimatorParams {
        &self.animator
    }

    /// Fixed physics tick: map input through the camera and move.
    ///
    /// Observers do nothing and return `None`.
    pub fn fixed_tick(
        &mut self,
        axes: RawAxes,
        camera: &dyn CameraProvider,
        world: &dyn CollisionWorld,
        dt: f32,
        debug: &mut dyn DebugDraw,
    ) -> Option<Motion> {
        if !self.is_authoritative() {
            return None;
        }
        let intent = camera_relative_intent(axes, &camera.basis());
        self.move_by(intent, world, dt, debug)
    }

    /// Moves along a world-space intent. Silently ignored on observers.
    pub fn move_by(
        &mut self,
        intent: Vec3,
        world: &dyn CollisionWorld,
        dt: f32,
        debug: &mut dyn DebugDraw,
    ) -> Option<Motion> {
        let Role::Authoritative(auth) = &mut self.role else {
            debug!(character = ?self.id, "move on observer ignored");
            return None;
        };
        let motion = auth
            .resolver
            .step(&mut auth.pose, &mut auth.state, intent, world, dt, debug);
        auth.outbox.push(FieldUpdate {
            character: self.id,
            field: FieldId::ForwardAmount,
            value: auth.state.forward_amount,
        });
        Some(motion)
    }

    /// Frame tick: push current state into the animator.
    pub fn frame_tick(&mut self, dt: f32) {
        match &self.role {
            Role::Authoritative(a) => self.driver.drive(&mut self.animator, &a.state, dt),
            Role::Observer(o) => {
                self.driver
                    .drive_forward(&mut self.animator, o.forward_amount, dt)
            }
        }
    }

    /// Applies a replicated field. Returns whether it was taken.
    ///
    /// The authoritative copy keeps its own value; updates for another
    /// character are ignored.
    pub fn apply_replicated(&mut self, update: FieldUpdate) -> bool {
        if update.character != self.id {
            return false;
        }
        match (&mut self.role, update.field) {
            (Role::Observer(o), FieldId::ForwardAmount) => {
                o.forward_amount = update.value;
                true
            }
            (Role::Authoritative(_), _) => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        anim::PARAM_FORWARD,
        debug_draw::NullDebugDraw,
        input::CameraBasis,
        math::EPSILON,
        physics::PlaneWorld,
    };

    fn spawn(owned: bool) -> Character {
        let config = ControllerConfig {
            move_speed: 2.0,
            ..Default::default()
        };
        Character::spawn(CharacterId(1), config, CharacterPose::default(), owned)
    }

    #[test]
    fn authoritative_tick_moves_and_queues_forward_amount() {
        let mut ch = spawn(true);
        let motion = ch
            .fixed_tick(
                RawAxes::new(0.0, 1.0),
                &CameraBasis::default(),
                &PlaneWorld::flat(0.0),
                0.5,
                &mut NullDebugDraw,
            )
            .expect("authoritative moves");
        assert!(motion.displacement.approx_eq(Vec3::new(0.0, 0.0, 1.0), EPSILON));
        assert!(ch.pose().position.approx_eq(Vec3::new(0.0, 0.0, 1.0), EPSILON));
        assert!(ch.pose().rotation.forward().approx_eq(Vec3::FORWARD, 1e-4));

        let queued: Vec<_> = ch.outbox_mut().unwrap().drain().collect();
        assert_eq!(queued.len(), 1);
        assert_eq!(queued[0].field, FieldId::ForwardAmount);
        assert!((queued[0].value - 1.0).abs() < EPSILON);
    }

    #[test]
    fn observer_ignores_input() {
        let mut ch = spawn(false);
        for _ in 0..10 {
            let moved = ch.fixed_tick(
                RawAxes::new(1.0, 1.0),
                &CameraBasis::default(),
                &PlaneWorld::flat(0.0),
                0.02,
                &mut NullDebugDraw,
            );
            assert!(moved.is_none());
        }
        assert!(ch
            .move_by(Vec3::FORWARD, &PlaneWorld::flat(0.0), 0.02, &mut NullDebugDraw)
            .is_none());
        assert_eq!(ch.forward_amount(), 0.0);
        assert_eq!(ch.pose().position, Vec3::ZERO);
        assert!(ch.outbox_mut().is_none());
        assert!(ch.locomotion().is_none());
    }

    #[test]
    fn observer_takes_replicated_forward_amount() {
        let mut ch = spawn(false);
        assert!(ch.apply_replicated(FieldUpdate {
            character: CharacterId(1),
            field: FieldId::ForwardAmount,
            value: 0.8,
        }));
        assert_eq!(ch.forward_amount(), 0.8);

        ch.frame_tick(0.1);
        let forward = ch.animator().float(PARAM_FORWARD).unwrap();
        assert!(forward > 0.0 && forward < 0.8);
    }

    #[test]
    fn replicated_updates_do_not_override_authority() {
        let mut ch = spawn(true);
        assert!(!ch.apply_replicated(FieldUpdate {
            character: CharacterId(1),
            field: FieldId::ForwardAmount,
            value: 5.0,
        }));
        assert_eq!(ch.forward_amount(), 0.0);
    }

    #[test]
    fn updates_for_other_characters_are_ignored() {
        let mut ch = spawn(false);
        assert!(!ch.apply_replicated(FieldUpdate {
            character: CharacterId(2),
            field: FieldId::ForwardAmount,
            value: 1.0,
        }));
        assert_eq!(ch.forward_amount(), 0.0);
    }

    #[test]
    fn idle_forward_parameter_decays() {
        let mut ch = spawn(true);
        let world = PlaneWorld::flat(0.0);
        let camera = CameraBasis::default();
        ch.fixed_tick(RawAxes::new(0.0, 1.0), &camera, &world, 0.02, &mut NullDebugDraw);
        for _ in 0..20 {
            ch.frame_tick(0.02);
        }
        let peak = ch.animator().float(PARAM_FORWARD).unwrap();

        let before = *ch.pose();
        let motion = ch
            .fixed_tick(RawAxes::default(), &camera, &world, 0.02, &mut NullDebugDraw)
            .unwrap();
        assert_eq!(motion.displacement, Vec3::ZERO);
        assert_eq!(ch.pose().rotation, before.rotation);

        let mut last = peak;
        for _ in 0..10 {
            ch.frame_tick(0.02);
            let now = ch.animator().float(PARAM_FORWARD).unwrap();
            assert!(now < last);
            last = now;
        }
        let expected = peak * (-10.0f32 * 0.02 / 0.1).exp();
        assert!((last - expected).abs() < 1e-4);
    }
}
