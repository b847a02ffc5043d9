//! Collision world abstraction.
//!
//! The locomotion core only needs two synchronous queries from its physics
//! collaborator: a raycast for ground probing and a sweep that moves a body
//! with collision response. Both are non-blocking by contract.

use crate::math::{Vec3, EPSILON};

/// A raycast hit.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RayHit {
    pub point: Vec3,
    /// Surface normal at the hit point.
    pub normal: Vec3,
    pub distance: f32,
}

/// Collision queries used by the motion resolver and ground sensor.
pub trait CollisionWorld: Send + Sync {
    /// Casts a ray of length `max_distance` from `origin` along unit `dir`.
    fn raycast(&self, origin: Vec3, dir: Vec3, max_distance: f32) -> Option<RayHit>;

    /// Moves a body at `position` by `displacement`, resolving collisions, and
    /// returns the final position.
    fn sweep(&self, position: Vec3, displacement: Vec3) -> Vec3;
}

/// No geometry at all: rays never hit and sweeps are unobstructed.
#[derive(Debug, Default, Clone, Copy)]
pub struct EmptyWorld;

impl CollisionWorld for EmptyWorld {
    fn raycast(&self, _origin: Vec3, _dir: Vec3, _max_distance: f32) -> Option<RayHit> {
        None
    }

    fn sweep(&self, position: Vec3, displacement: Vec3) -> Vec3 {
        position + displacement
    }
}

/// One infinite solid half-space bounded by a plane.
///
/// The solid side lies opposite `normal`. Rays only hit the front face.
#[derive(Debug, Clone, Copy)]
pub struct PlaneWorld {
    pub point: Vec3,
    pub normal: Vec3,
}

impl PlaneWorld {
    pub fn new(point: Vec3, normal: Vec3) -> Self {
        let normal = normal.normalize_or_zero();
        Self {
            point,
            normal: if normal == Vec3::ZERO { Vec3::UP } else { normal },
        }
    }

    /// Horizontal floor at height `y`.
    pub fn flat(y: f32) -> Self {
        Self::new(Vec3::new(0.0, y, 0.0), Vec3::UP)
    }

    fn signed_distance(&self, p: Vec3) -> f32 {
        (p - self.point).dot(self.normal)
    }
}

impl Default for PlaneWorld {
    fn default() -> Self {
        Self::flat(0.0)
    }
}

impl CollisionWorld for PlaneWorld {
    fn raycast(&self, origin: Vec3, dir: Vec3, max_distance: f32) -> Option<RayHit> {
        let denom = dir.dot(self.normal);
        if denom > -EPSILON {
            return None;
        }
        let t = -self.signed_distance(origin) / denom;
        if !(0.0..=max_distance).contains(&t) {
            return None;
        }
        Some(RayHit {
            point: origin + dir * t,
            normal: self.normal,
            distance: t,
        })
    }

    fn sweep(&self, position: Vec3, displacement: Vec3) -> Vec3 {
        let target = position + displacement;
        let depth = self.signed_distance(target);
        if depth < 0.0 {
            target - self.normal * depth
        } else {
            target
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flat_plane_hits_from_above() {
        let world = PlaneWorld::flat(0.0);
        let hit = world
            .raycast(Vec3::new(0.0, 0.1, 0.0), Vec3::DOWN, 0.2)
            .expect("hit");
        assert!((hit.distance - 0.1).abs() < EPSILON);
        assert_eq!(hit.normal, Vec3::UP);
    }

    #[test]
    fn ray_shorter_than_gap_misses() {
        let world = PlaneWorld::flat(0.0);
        assert!(world
            .raycast(Vec3::new(0.0, 1.0, 0.0), Vec3::DOWN, 0.5)
            .is_none());
    }

    #[test]
    fn ray_from_below_misses() {
        let world = PlaneWorld::flat(0.0);
        assert!(world
            .raycast(Vec3::new(0.0, -1.0, 0.0), Vec3::DOWN, 5.0)
            .is_none());
    }

    #[test]
    fn sweep_cannot_sink_below_plane() {
        let world = PlaneWorld::flat(0.0);
        let end = world.sweep(Vec3::ZERO, Vec3::new(1.0, -2.0, 0.0));
        assert!(end.approx_eq(Vec3::new(1.0, 0.0, 0.0), EPSILON));
    }

    #[test]
    fn empty_world_moves_freely() {
        let end = EmptyWorld.sweep(Vec3::ONE, Vec3::new(0.0, -3.0, 0.0));
        assert_eq!(end, Vec3::new(1.0, -2.0, 1.0));
    }
}
