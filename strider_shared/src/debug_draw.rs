//! Debug drawing abstraction.
//!
//! This crate intentionally does not depend on a graphics backend.
//! Probes, move rays and collider gizmos are reported through this trait so a
//! renderer or an editor overlay can visualize them.

use crate::math::Vec3;

/// Color tag for debug primitives.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DebugColor {
    White,
    Red,
    Cyan,
}

/// A minimal debug drawing API.
pub trait DebugDraw {
    fn draw_line(&mut self, from: Vec3, to: Vec3, color: DebugColor);
    fn draw_ray(&mut self, origin: Vec3, dir: Vec3, color: DebugColor);
    fn draw_wire_disc(&mut self, center: Vec3, normal: Vec3, radius: f32, color: DebugColor);
}

/// A no-op sink useful for headless runs.
#[derive(Debug, Default)]
pub struct NullDebugDraw;

impl DebugDraw for NullDebugDraw {
    fn draw_line(&mut self, _from: Vec3, _to: Vec3, _color: DebugColor) {}
    fn draw_ray(&mut self, _origin: Vec3, _dir: Vec3, _color: DebugColor) {}
    fn draw_wire_disc(&mut self, _center: Vec3, _normal: Vec3, _radius: f32, _color: DebugColor) {}
}

/// Recorded primitive.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DebugShape {
    Line { from: Vec3, to: Vec3, color: DebugColor },
    Ray { origin: Vec3, dir: Vec3, color: DebugColor },
    WireDisc { center: Vec3, normal: Vec3, radius: f32, color: DebugColor },
}

/// Keeps every primitive it is handed; used by tests and overlays that batch.
#[derive(Debug, Default)]
pub struct DebugRecorder {
    pub shapes: Vec<DebugShape>,
}

impl DebugRecorder {
    pub fn clear(&mut self) {
        self.shapes.clear();
    }
}

impl DebugDraw for DebugRecorder {
    fn draw_line(&mut self, from: Vec3, to: Vec3, color: DebugColor) {
        self.shapes.push(DebugShape::Line { from, to, color });
    }

    fn draw_ray(&mut self, origin: Vec3, dir: Vec3, color: DebugColor) {
        self.shapes.push(DebugShape::Ray { origin, dir, color });
    }

    fn draw_wire_disc(&mut self, center: Vec3, normal: Vec3, radius: f32, color: DebugColor) {
        self.shapes.push(DebugShape::WireDisc {
            center,
            normal,
            radius,
            color,
        });
    }
}
