//! Character collider tooling.
//!
//! Conversions between a capsule collider and an editing handle drawn in the
//! body's (unscaled) local space, plus the skin-width gizmo layout.

use serde::{Deserialize, Serialize};

use crate::{
    debug_draw::{DebugColor, DebugDraw},
    math::Vec3,
};

/// The capsule's height runs along local `Y`.
pub const HEIGHT_AXIS: usize = 1;

/// Number of skin-width rings drawn by default.
pub const DEFAULT_GIZMO_RESOLUTION: usize = 5;

/// Capsule collider of a character body, in collider (scaled local) space.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CharacterCollider {
    pub center: Vec3,
    pub height: f32,
    pub radius: f32,
    /// Degrees.
    pub slope_limit: f32,
    pub step_offset: f32,
    pub skin_width: f32,
    pub min_move_distance: f32,
}

impl Default for CharacterCollider {
    fn default() -> Self {
        Self {
            center: Vec3::ZERO,
            height: 2.0,
            radius: 0.5,
            slope_limit: 45.0,
            step_offset: 0.3,
            skin_width: 0.08,
            min_move_distance: 0.001,
        }
    }
}

/// Capsule as shown by the editing handle, in handle space.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct CapsuleHandle {
    pub center: Vec3,
    pub height: f32,
    pub radius: f32,
}

/// Per-axis scale for the handle and the factor applied to the radius.
///
/// The radius factor is the largest absolute scale among the non-height axes;
/// those axes are replaced by that factor, keeping their sign.
pub fn handle_scale(mut lossy_scale: Vec3, height_axis: usize) -> (Vec3, f32) {
    let radius_factor = (0..3)
        .filter(|&axis| axis != height_axis)
        .map(|axis| lossy_scale[axis].abs())
        .fold(0.0f32, f32::max);

    for axis in (0..3).filter(|&axis| axis != height_axis) {
        lossy_scale[axis] = lossy_scale[axis].signum() * radius_factor;
    }
    (lossy_scale, radius_factor)
}

/// Component-wise reciprocal; zero components stay zero.
pub fn invert_scale(v: Vec3) -> Vec3 {
    let inv = |c: f32| if c == 0.0 { 0.0 } else { 1.0 / c };
    Vec3::new(inv(v.x), inv(v.y), inv(v.z))
}

fn scale_mul(a: Vec3, b: Vec3) -> Vec3 {
    Vec3::new(a.x * b.x, a.y * b.y, a.z * b.z)
}

impl CharacterCollider {
    /// Handle matching this collider on a body with the given lossy scale.
    pub fn to_handle(&self, lossy_scale: Vec3) -> CapsuleHandle {
        let (size_scale, radius_factor) = handle_scale(lossy_scale, HEIGHT_AXIS);
        CapsuleHandle {
            center: scale_mul(self.center, lossy_scale),
            height: self.height * size_scale[HEIGHT_AXIS].abs(),
            radius: self.radius * radius_factor,
        }
    }

    /// Writes an edited handle back into the collider.
    ///
    /// Radius and height are left alone when the corresponding scale factor
    /// is zero.
    pub fn apply_handle(&mut self, handle: &CapsuleHandle, lossy_scale: Vec3) {
        self.center = scale_mul(handle.center, invert_scale(lossy_scale));

        let (size_scale, radius_factor) = handle_scale(lossy_scale, HEIGHT_AXIS);
        let size_scale = invert_scale(size_scale);

        if radius_factor != 0.0 {
            self.radius = handle.radius / radius_factor;
        }
        if size_scale[HEIGHT_AXIS] != 0.0 {
            self.height = handle.height * size_scale[HEIGHT_AXIS].abs();
        }
    }

    /// Moves the center back onto the vertical axis, keeping its height.
    pub fn recenter(&mut self) {
        self.center = Vec3::new(0.0, self.center.y, 0.0);
    }

    /// Centers of the skin-width rings, stacked from the feet up the capsule.
    pub fn skin_width_rings(&self, position: Vec3, resolution: usize) -> Vec<Vec3> {
        let offset = Vec3::new(self.center.x, 0.0, self.center.z);
        let top = Vec3::new(0.0, self.height, 0.0);
        (0..resolution)
            .map(|i| position - offset + Vec3::ZERO.lerp(top, i as f32 / resolution as f32))
            .collect()
    }

    pub fn draw_skin_width(&self, debug: &mut dyn DebugDraw, position: Vec3, resolution: usize) {
        for ring in self.skin_width_rings(position, resolution) {
            debug.draw_wire_disc(ring, Vec3::UP, self.skin_width, DebugColor::Cyan);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        debug_draw::{DebugRecorder, DebugShape},
        math::EPSILON,
    };

    #[test]
    fn radius_factor_is_widest_side_axis() {
        let (scale, factor) = handle_scale(Vec3::new(-2.0, 3.0, 0.5), HEIGHT_AXIS);
        assert_eq!(factor, 2.0);
        assert_eq!(scale, Vec3::new(-2.0, 3.0, 2.0));
    }

    #[test]
    fn invert_scale_keeps_zero() {
        assert_eq!(
            invert_scale(Vec3::new(2.0, 0.0, -4.0)),
            Vec3::new(0.5, 0.0, -0.25)
        );
    }

    #[test]
    fn handle_edit_on_scaled_body_round_trips() {
        let scale = Vec3::new(2.0, 3.0, 1.0);
        let mut collider = CharacterCollider::default();
        let mut handle = collider.to_handle(scale);
        assert_eq!(handle.height, 6.0);
        assert_eq!(handle.radius, 1.0);

        handle.radius = 1.5;
        handle.height = 9.0;
        collider.apply_handle(&handle, scale);
        assert!((collider.radius - 0.75).abs() < EPSILON);
        assert!((collider.height - 3.0).abs() < EPSILON);
    }

    #[test]
    fn zero_scale_leaves_dimensions_untouched() {
        let mut collider = CharacterCollider::default();
        let handle = CapsuleHandle {
            center: Vec3::ZERO,
            height: 10.0,
            radius: 10.0,
        };
        collider.apply_handle(&handle, Vec3::ZERO);
        assert_eq!(collider.radius, 0.5);
        assert_eq!(collider.height, 2.0);
    }

    #[test]
    fn recenter_keeps_height() {
        let mut collider = CharacterCollider {
            center: Vec3::new(0.3, 1.0, -0.2),
            ..Default::default()
        };
        collider.recenter();
        assert_eq!(collider.center, Vec3::new(0.0, 1.0, 0.0));
    }

    #[test]
    fn skin_width_rings_stack_up_the_capsule() {
        let collider = CharacterCollider::default();
        let mut rec = DebugRecorder::default();
        collider.draw_skin_width(&mut rec, Vec3::new(1.0, 0.0, 0.0), DEFAULT_GIZMO_RESOLUTION);
        assert_eq!(rec.shapes.len(), 5);
        match rec.shapes[4] {
            DebugShape::WireDisc { center, radius, .. } => {
                assert!(center.approx_eq(Vec3::new(1.0, 1.6, 0.0), EPSILON));
                assert_eq!(radius, 0.08);
            }
            other => panic!("unexpected shape {other:?}"),
        }
    }
}
