//! Shared store primitive used by turnsync.
//!
//! The store is a path-addressed graph with four operations: address a node
//! ([`NodeRef::get`]), write ([`NodeRef::put`]), read once
//! ([`NodeRef::once`]) and subscribe ([`NodeRef::on`]). Writes are
//! acknowledged once locally durable; there is no compare-and-set and no
//! ordering across peers.
//!
//! [`MemoryNetwork`] provides an in-process replicated implementation whose
//! peers merge field updates deterministically, with controls for holding,
//! reordering, duplicating and dropping deliveries.

pub mod error;
pub mod memory;
pub mod node;
pub mod store;
pub mod subscription;

pub use error::{Result, StoreError};
pub use memory::{Delivery, MemoryNetwork, MemoryPeer, WriteBehavior};
pub use node::NodeRef;
pub use store::Store;
pub use subscription::{NodeEvent, Subscription};
