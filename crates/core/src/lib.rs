//! turnsync: two-seat, turn-based match synchronization over a shared
//! eventually-consistent store.
//!
//! The store offers no compare-and-set and no ordering across peers, so this
//! crate supplies both approximations itself:
//!
//! * seat claims are verified by reading the seat back after one round trip
//!   ([`SessionRegistry::join_session`]);
//! * moves carry a ply counter and every peer keeps only the first state it
//!   sees at each ply ([`StateSynchronizer`]).
//!
//! Callers own their sessions through [`MatchClient`] and [`MatchHandle`];
//! there is no process-wide registry.

pub mod arbiter;
pub mod client;
pub mod clock;
pub mod config;
pub mod error;
pub mod identity;
pub mod registry;
pub mod rules;
pub mod session;
pub mod sync;

pub use arbiter::TurnArbiter;
pub use client::{MatchClient, MatchHandle};
pub use config::SyncConfig;
pub use error::{Error, Result};
pub use identity::Identity;
pub use registry::{JoinResult, SessionRegistry};
pub use rules::{RulesEngine, TurnState};
pub use session::{GameSession, Phase};
pub use sync::{Acceptance, StateSynchronizer};
pub use turnsync_protocol::{PlayerInfo, Players, Seat, SessionId};
