//! Input handling.
//!
//! In a real game this would integrate with windowing and raw keyboard/mouse.
//! Here input is sampled once per fixed tick from an [`InputSource`], either
//! a set of pressed keys or a script for headless runs.

use std::collections::HashSet;

use strider_shared::input::RawAxes;

/// Something that yields raw axes every fixed tick.
pub trait InputSource {
    fn sample(&mut self, tick: u32) -> RawAxes;
}

/// No input at all.
#[derive(Debug, Default)]
pub struct Idle;

impl InputSource for Idle {
    fn sample(&mut self, _tick: u32) -> RawAxes {
        RawAxes::default()
    }
}

/// Maps WASD / arrow keys onto the two axes.
pub fn axes_from_keys(pressed: &HashSet<String>) -> RawAxes {
    let down = |keys: &[&str]| keys.iter().any(|k| pressed.contains(*k));
    let mut axes = RawAxes::default();
    if down(&["w", "W", "ArrowUp"]) {
        axes.vertical += 1.0;
    }
    if down(&["s", "S", "ArrowDown"]) {
        axes.vertical -= 1.0;
    }
    if down(&["d", "D", "ArrowRight"]) {
        axes.horizontal += 1.0;
    }
    if down(&["a", "A", "ArrowLeft"]) {
        axes.horizontal -= 1.0;
    }
    axes
}

/// Pressed-key set kept up to date by a window event loop.
#[derive(Debug, Default)]
pub struct KeyboardInput {
    pub pressed: HashSet<String>,
}

impl InputSource for KeyboardInput {
    fn sample(&mut self, _tick: u32) -> RawAxes {
        axes_from_keys(&self.pressed)
    }
}

/// Loops over `(ticks, axes)` segments.
#[derive(Debug, Clone)]
pub struct ScriptedInput {
    segments: Vec<(u32, RawAxes)>,
}

impl ScriptedInput {
    pub fn new(segments: Vec<(u32, RawAxes)>) -> Self {
        Self { segments }
    }

    /// Walk forward, strafe right, walk back, strafe left, pause.
    pub fn square_walk(ticks_per_side: u32) -> Self {
        Self::new(vec![
            (ticks_per_side, RawAxes::new(0.0, 1.0)),
            (ticks_per_side, RawAxes::new(1.0, 0.0)),
            (ticks_per_side, RawAxes::new(0.0, -1.0)),
            (ticks_per_side, RawAxes::new(-1.0, 0.0)),
            (ticks_per_side, RawAxes::default()),
        ])
    }
}

impl InputSource for ScriptedInput {
    fn sample(&mut self, tick: u32) -> RawAxes {
        let period: u32 = self.segments.iter().map(|(n, _)| *n).sum();
        if period == 0 {
            return RawAxes::default();
        }
        let mut t = tick % period;
        for (len, axes) in &self.segments {
            if t < *len {
                return *axes;
            }
            t -= len;
        }
        RawAxes::default()
    }
}
