//! Chord Node
//!
//! Owns one node's ring state and runs the protocol around it.
//!
//! ## Core Mechanisms
//! - **Narrow locks**: Finger table, successor list, predecessor and entry store are locked
//!   independently. No lock is held across a remote call, so topology repair never blocks
//!   entry reads or writes.
//! - **Iterative lookup**: The router drives every hop itself and falls back to the next-best
//!   finger or successor when a hop target fails. Lookups give up after a bounded hop count.
//! - **Stabilization**: Independent timers stabilize the successor, check the predecessor,
//!   refresh one finger and reconcile replicas. Communication failures in these routines are
//!   logged and retried on the next tick.
//! - **Join/Leave**: A joining node seeds its store from its successor in the same call that
//!   announces it. A leaving node hands its entries to its successor within a bounded time.
//!
//! ## Submodules
//! - **`service`**: `ChordNode` itself and the inbound side of the remote contract.
//! - **`router`**: Successor lookup.
//! - **`stabilizer`**: Maintenance routines and their timers.
//! - **`controller`**: Join, leave and the routed entry operations.

pub mod controller;
pub mod router;
pub mod service;
pub mod stabilizer;

pub use service::{ChordNode, NodeInfo};
