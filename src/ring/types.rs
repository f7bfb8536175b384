use super::id::Identifier;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::hash::{Hash, Hasher};

/// An addressable member of the ring.
///
/// Equality and hashing look at the identifier only, so two references to the
/// same logical node collapse even when their address metadata differs. This
/// is what deduplicates finger-table and successor-list entries.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeRef {
    pub id: Identifier,
    pub address: String,
}

impl NodeRef {
    pub fn new(id: Identifier, address: impl Into<String>) -> Self {
        Self {
            id,
            address: address.into(),
        }
    }
}

impl PartialEq for NodeRef {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for NodeRef {}

impl Hash for NodeRef {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl fmt::Display for NodeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.id, self.address)
    }
}

/// A stored value. `id` is the hash of the application key, so several
/// distinct entries may share one identifier.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct Entry {
    pub id: Identifier,
    pub value: Vec<u8>,
}

impl Entry {
    pub fn new(id: Identifier, value: impl Into<Vec<u8>>) -> Self {
        Self {
            id,
            value: value.into(),
        }
    }
}

/// What a node reports back to a `notify`: its predecessor after considering
/// the caller, followed by its successor list.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct RingView {
    pub predecessor: Option<NodeRef>,
    pub successors: Vec<NodeRef>,
}

/// Answer to the join-time notify: the ring view plus the entries whose
/// ownership moves to the joining node.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct CopiedEntries {
    pub predecessor: Option<NodeRef>,
    pub successors: Vec<NodeRef>,
    pub entries: HashSet<Entry>,
}

/// One hop of an iterative lookup.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub enum LookupStep {
    /// The callee knows the responsible node.
    Done(NodeRef),
    /// Nodes to ask next, best first: the callee's closest preceding nodes
    /// followed by its successor list, so a dead hop can be skipped.
    Next(Vec<NodeRef>),
}
