//! `strider_shared`
//!
//! Locomotion core and wire types shared by client and server.
//!
//! Design goals:
//! - Deterministic, tick-driven, no engine runtime.
//! - Engine collaborators (collision, animation, transport, camera, debug
//!   drawing) behind traits.
//! - Role-based authority decided once at spawn.
//! - No `unsafe`.

pub mod anim;
pub mod character;
pub mod collider;
pub mod config;
pub mod debug_draw;
pub mod ground;
pub mod input;
pub mod lifetime;
pub mod math;
pub mod motion;
pub mod net;
pub mod physics;
pub mod replication;

pub mod prelude {
    //! Commonly used exports.

    pub use crate::anim::*;
    pub use crate::character::*;
    pub use crate::config::*;
    pub use crate::input::*;
    pub use crate::math::*;
    pub use crate::motion::*;
    pub use crate::net::*;
    pub use crate::physics::*;
    pub use crate::replication::*;
}
