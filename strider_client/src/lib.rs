//! `strider_client`
//!
//! Client-side systems:
//! - Connection management (reliable + unreliable channels)
//! - Input sampling and the follow camera for the owned character
//! - Fixed-tick locomotion of the owned character, field-set requests
//! - Observer replicas animated from replicated fields

pub mod camera;
pub mod client;
pub mod input;

pub use client::GameClient;
