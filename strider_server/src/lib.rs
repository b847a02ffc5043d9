//! `strider_server`
//!
//! Server-side systems:
//! - Client handshake and character ownership assignment
//! - Ownership checks on field-set requests
//! - Fixed timestep broadcast of changed fields
//!
//! Networking model:
//! - TCP: handshake/control plane (spawns, despawns, disconnects)
//! - UDP: gameplay plane (field-set requests, replication batches)

pub mod server;

pub use server::GameServer;
