//! Ground sensor.

use crate::{
    debug_draw::{DebugColor, DebugDraw},
    math::Vec3,
    physics::CollisionWorld,
};

/// Height above the feet the probe starts from.
pub const PROBE_LIFT: f32 = 0.1;

/// Result of a ground probe.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GroundContact {
    pub grounded: bool,
    /// Unit normal of the standing surface, `Vec3::UP` while airborne.
    pub normal: Vec3,
}

impl GroundContact {
    pub const AIRBORNE: Self = Self {
        grounded: false,
        normal: Vec3::UP,
    };
}

impl Default for GroundContact {
    fn default() -> Self {
        Self::AIRBORNE
    }
}

/// Short downward probe from slightly above a character's origin.
#[derive(Debug, Clone, Copy)]
pub struct GroundSensor {
    pub check_distance: f32,
}

impl GroundSensor {
    pub fn new(check_distance: f32) -> Self {
        Self { check_distance }
    }

    /// Probes the ground under `position`. A miss is not an error: it just
    /// means airborne.
    pub fn probe(
        &self,
        world: &dyn CollisionWorld,
        position: Vec3,
        debug: &mut dyn DebugDraw,
    ) -> GroundContact {
        let origin = position + Vec3::UP * PROBE_LIFT;
        debug.draw_line(
            origin,
            origin + Vec3::DOWN * self.check_distance,
            DebugColor::White,
        );

        match world.raycast(origin, Vec3::DOWN, self.check_distance) {
            Some(hit) => {
                let normal = hit.normal.normalize_or_zero();
                GroundContact {
                    grounded: true,
                    normal: if normal == Vec3::ZERO { Vec3::UP } else { normal },
                }
            }
            None => GroundContact::AIRBORNE,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        debug_draw::{DebugRecorder, DebugShape, NullDebugDraw},
        math::EPSILON,
        physics::{EmptyWorld, PlaneWorld},
    };

    #[test]
    fn miss_reports_airborne_and_up() {
        let sensor = GroundSensor::new(0.1);
        let contact = sensor.probe(&EmptyWorld, Vec3::ZERO, &mut NullDebugDraw);
        assert_eq!(contact, GroundContact::AIRBORNE);
        assert_eq!(contact.normal, Vec3::new(0.0, 1.0, 0.0));
    }

    #[test]
    fn standing_on_floor_is_grounded() {
        let sensor = GroundSensor::new(0.1);
        let contact = sensor.probe(&PlaneWorld::flat(0.0), Vec3::ZERO, &mut NullDebugDraw);
        assert!(contact.grounded);
        assert_eq!(contact.normal, Vec3::UP);
    }

    #[test]
    fn hit_normal_is_reported_on_slopes() {
        let slope = Vec3::new(0.0, 1.0, -0.5).normalize_or_zero();
        let world = PlaneWorld::new(Vec3::ZERO, slope);
        let contact = GroundSensor::new(0.2).probe(&world, Vec3::ZERO, &mut NullDebugDraw);
        assert!(contact.grounded);
        assert!(contact.normal.approx_eq(slope, EPSILON));
    }

    #[test]
    fn probe_too_short_to_reach_floor_misses() {
        let sensor = GroundSensor::new(0.1);
        let contact = sensor.probe(
            &PlaneWorld::flat(0.0),
            Vec3::new(0.0, 0.5, 0.0),
            &mut NullDebugDraw,
        );
        assert!(!contact.grounded);
    }

    #[test]
    fn probe_segment_is_drawn() {
        let mut rec = DebugRecorder::default();
        GroundSensor::new(0.3).probe(&EmptyWorld, Vec3::ZERO, &mut rec);
        match rec.shapes.as_slice() {
            [DebugShape::Line { from, to, .. }] => {
                assert!(from.approx_eq(Vec3::new(0.0, 0.1, 0.0), EPSILON));
                assert!(to.approx_eq(Vec3::new(0.0, -0.2, 0.0), EPSILON));
            }
            other => panic!("unexpected shapes {other:?}"),
        }
    }
}
