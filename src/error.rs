//! Error taxonomy shared by every layer of the ring.
//!
//! Communication failures and unresolvable owners are the only kinds that
//! cross the remote boundary. The others are raised locally: a node loses every
//! successor, or a request is malformed before it touches any state.

use crate::ring::Identifier;
use thiserror::Error;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ChordError {
    /// Transport-level unreachability or timeout while talking to one peer.
    #[error("communication with {peer} failed: {reason}")]
    Communication { peer: String, reason: String },

    /// Lookup exceeded its hop bound, found no live route, or ended at a node
    /// that is not responsible for `id`.
    #[error("responsible node for {id} currently unresolvable after {hops} hops")]
    RingUnreachable { id: Identifier, hops: usize },

    /// Every member of the successor list was found dead.
    #[error("node is isolated from the ring, rejoin required")]
    Isolated,

    /// Malformed identifier width or missing fields.
    #[error("validation failed: {0}")]
    Validation(String),

    /// The local node has left the ring and no longer serves calls.
    #[error("node has left the ring")]
    Shutdown,
}

impl ChordError {
    pub fn communication(peer: impl Into<String>, reason: impl ToString) -> Self {
        Self::Communication {
            peer: peer.into(),
            reason: reason.to_string(),
        }
    }

    pub fn is_communication(&self) -> bool {
        matches!(self, Self::Communication { .. })
    }
}

pub type Result<T> = std::result::Result<T, ChordError>;
