//! Identifier Space & Ring Vocabulary
//!
//! The ring is a circular `m`-bit identifier space. Nodes and keys are both
//! placed on it by hashing, and a key belongs to the first node found walking
//! clockwise from it.
//!
//! ## Contents
//! - **`id`**: `Identifier` and `IdSpace` with modular interval checks and finger offsets.
//! - **`types`**: `NodeRef`, `Entry` and the views exchanged during stabilization and join.

pub mod id;
pub mod types;

pub use id::{IdSpace, Identifier};
pub use types::{CopiedEntries, Entry, LookupStep, NodeRef, RingView};
