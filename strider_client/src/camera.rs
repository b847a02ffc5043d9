//! Follow camera.
//!
//! Orbits the locally owned character and provides the view basis the input
//! mapper needs. Only the owning client creates one; observer characters
//! never get a camera.

use strider_shared::{
    input::{CameraBasis, CameraProvider},
    math::Vec3,
};

const PITCH_LIMIT: f32 = std::f32::consts::FRAC_PI_2 - 0.01;

/// Third-person orbit camera.
#[derive(Debug, Clone, Copy)]
pub struct FollowCamera {
    /// Radians about world up; 0 looks along `+Z`.
    pub yaw: f32,
    /// Radians; positive looks down.
    pub pitch: f32,
    pub distance: f32,
    pub target_height: f32,
    pub sensitivity: f32,
}

impl Default for FollowCamera {
    fn default() -> Self {
        Self {
            yaw: 0.0,
            pitch: 0.3,
            distance: 4.0,
            target_height: 1.6,
            sensitivity: 0.002,
        }
    }
}

impl FollowCamera {
    /// Applies a mouse look delta.
    pub fn apply_look(&mut self, dx: f32, dy: f32) {
        self.yaw += dx * self.sensitivity;
        self.pitch = (self.pitch + dy * self.sensitivity).clamp(-PITCH_LIMIT, PITCH_LIMIT);
    }

    pub fn forward(&self) -> Vec3 {
        let (sy, cy) = self.yaw.sin_cos();
        let (sp, cp) = self.pitch.sin_cos();
        Vec3::new(sy * cp, -sp, cy * cp)
    }

    pub fn right(&self) -> Vec3 {
        let (sy, cy) = self.yaw.sin_cos();
        Vec3::new(cy, 0.0, -sy)
    }

    /// Eye position behind and above `target`.
    pub fn eye(&self, target: Vec3) -> Vec3 {
        target + Vec3::UP * self.target_height - self.forward() * self.distance
    }
}

impl CameraProvider for FollowCamera {
    fn basis(&self) -> CameraBasis {
        CameraBasis {
            right: self.right(),
            forward: self.forward(),
        }
    }
}
