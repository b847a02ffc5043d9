//! Camera-relative input mapping.

use serde::{Deserialize, Serialize};

use crate::math::Vec3;

/// Raw two-axis input, each axis nominally in `[-1, 1]`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct RawAxes {
    pub horizontal: f32,
    pub vertical: f32,
}

impl RawAxes {
    pub const fn new(horizontal: f32, vertical: f32) -> Self {
        Self {
            horizontal,
            vertical,
        }
    }
}

/// Basis vectors of the active view.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CameraBasis {
    pub right: Vec3,
    pub forward: Vec3,
}

impl Default for CameraBasis {
    fn default() -> Self {
        Self {
            right: Vec3::RIGHT,
            forward: Vec3::FORWARD,
        }
    }
}

/// Anything that can report the current view basis.
pub trait CameraProvider {
    fn basis(&self) -> CameraBasis;
}

impl CameraProvider for CameraBasis {
    fn basis(&self) -> CameraBasis {
        *self
    }
}

/// World-space movement intent: `right * h + flat_forward * v`.
///
/// The forward vector is flattened onto the horizontal plane and normalized,
/// so pitch never slows the character down. A camera looking straight up or
/// down contributes no forward component.
pub fn camera_relative_intent(axes: RawAxes, camera: &CameraBasis) -> Vec3 {
    let flat_forward = camera.forward.project_on_plane(Vec3::UP).normalize_or_zero();
    camera.right * axes.horizontal + flat_forward * axes.vertical
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::math::EPSILON;

    #[test]
    fn forward_input_follows_camera_forward() {
        let intent = camera_relative_intent(RawAxes::new(0.0, 1.0), &CameraBasis::default());
        assert_eq!(intent, Vec3::new(0.0, 0.0, 1.0));
    }

    #[test]
    fn pitched_camera_is_flattened() {
        let camera = CameraBasis {
            right: Vec3::RIGHT,
            forward: Vec3::new(0.0, -0.8, 0.6),
        };
        let intent = camera_relative_intent(RawAxes::new(0.0, 1.0), &camera);
        assert!(intent.approx_eq(Vec3::FORWARD, EPSILON));
    }

    #[test]
    fn strafe_uses_camera_right() {
        let camera = CameraBasis {
            right: Vec3::new(0.0, 0.0, -1.0),
            forward: Vec3::RIGHT,
        };
        let intent = camera_relative_intent(RawAxes::new(1.0, 1.0), &camera);
        assert!(intent.approx_eq(Vec3::new(1.0, 0.0, -1.0), EPSILON));
    }

    #[test]
    fn straight_down_camera_has_no_forward() {
        let camera = CameraBasis {
            right: Vec3::RIGHT,
            forward: Vec3::DOWN,
        };
        let intent = camera_relative_intent(RawAxes::new(0.0, 1.0), &camera);
        assert_eq!(intent, Vec3::ZERO);
    }
}
