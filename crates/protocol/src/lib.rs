//! Wire types for turnsync session records.
//!
//! This crate contains the serde-serializable types that describe a match as
//! it is laid out in the shared store: seats, player records, session
//! identifiers, store paths, and the node codec that maps a session to and
//! from its path-addressed representation.
//!
//! # Design Philosophy
//!
//! Types in this crate are:
//! * Pure data: No behavior beyond serialization/deserialization
//! * Engine-agnostic: Game state travels as an opaque JSON blob
//! * Stable: Changes only when the stored layout changes
//!
//! Synchronization logic is built on top of these types in `turnsync`.

pub mod node;
pub mod path;
pub mod player;
pub mod seat;
pub mod session_id;

pub use node::*;
pub use player::*;
pub use seat::*;
pub use session_id::*;
