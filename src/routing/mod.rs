//! Routing State
//!
//! Plain, I/O-free structures a node routes with. Liveness checks and remote
//! lookups that feed them live in `node::stabilizer`.
//!
//! ## Structures
//! - **`FingerTable`**: `m` shortcut slots, slot `i` tracking the successor of `id + 2^i`.
//!   Refreshed one slot per maintenance tick through a rotating cursor.
//! - **`SuccessorList`**: the next `r` nodes clockwise, nearest first. Used for failover
//!   and as the replica set of the local node's entries.

pub mod finger;
pub mod successors;

pub use finger::FingerTable;
pub use successors::{SuccessorChange, SuccessorList};
