//! Entry Storage & Replication
//!
//! Holds the entries a node owns or replicates, and pushes replicas to the
//! successor list.
//!
//! ## Core Concepts
//! - **Multi-map**: One identifier maps to a *set* of entries. Insert and remove use exact
//!   (identifier, value) equality, so repeating either is a no-op.
//! - **Ownership**: Nothing in the store marks an entry as owned or replicated. A node owns
//!   the identifiers in `(predecessor, self]`; everything else it holds is a replica.
//! - **Fan-out**: Replica pushes are best-effort with bounded retry and jittered backoff.
//!   Failures are logged and left to periodic reconciliation.

pub mod replication;
pub mod store;

pub use replication::Replicator;
pub use store::EntryStore;
