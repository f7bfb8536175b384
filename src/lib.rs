//! Chord Ring Library
//!
//! A Chord distributed hash table: nodes organize themselves into a ring
//! ordered by identifier, resolve the node responsible for any identifier in
//! a logarithmic number of hops, and replicate entries across their immediate
//! successors. The binary (`main.rs`) serves one node over HTTP.
//!
//! ## Architecture Modules
//! - **`ring`**: Identifier space, node references, entries and the values exchanged by
//!   the remote contract.
//! - **`routing`**: Finger table and successor list, the two pieces of routing state.
//! - **`storage`**: The local entry multi-map and replica fan-out.
//! - **`node`**: `ChordNode`: lookup, stabilization, join/leave and the inbound side of the
//!   remote contract.
//! - **`transport`**: The `RemoteNode` contract plus in-process and HTTP implementations.
//! - **`service`**: Key/value facade with channel-delivered completions.
//! - **`config`** / **`error`**: Tunables and the error taxonomy.

pub mod config;
pub mod error;
pub mod node;
pub mod ring;
pub mod routing;
pub mod service;
pub mod storage;
pub mod transport;

pub use config::{ChordConfig, RemovalPolicy};
pub use error::{ChordError, Result};
pub use node::ChordNode;
