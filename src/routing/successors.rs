use crate::ring::NodeRef;

/// Membership delta produced by a successor-list update. Drives replica
/// hand-off: added nodes receive the owner's entries, displaced ones are
/// told to prune.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SuccessorChange {
    pub added: Vec<NodeRef>,
    pub removed: Vec<NodeRef>,
}

impl SuccessorChange {
    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.removed.is_empty()
    }
}

/// Up to `r` nodes clockwise from the local node, nearest first, without
/// duplicates and never containing the local node itself.
#[derive(Debug, Clone)]
pub struct SuccessorList {
    local: NodeRef,
    capacity: usize,
    nodes: Vec<NodeRef>,
}

impl SuccessorList {
    pub fn new(local: NodeRef, capacity: usize) -> Self {
        Self {
            local,
            capacity,
            nodes: Vec::with_capacity(capacity),
        }
    }

    pub fn first(&self) -> Option<&NodeRef> {
        self.nodes.first()
    }

    pub fn nodes(&self) -> &[NodeRef] {
        &self.nodes
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.nodes.len() >= self.capacity
    }

    pub fn contains(&self, node: &NodeRef) -> bool {
        self.nodes.contains(node)
    }

    /// Rebuilds the list from a peer: the peer becomes the head, followed by
    /// as much of the peer's own list as fits.
    ///
    /// The peer's list is cut where it reaches the local node, since anything
    /// after that point has already wrapped past us.
    pub fn update_from(&mut self, head: &NodeRef, peer_list: &[NodeRef]) -> SuccessorChange {
        let mut merged: Vec<NodeRef> = Vec::with_capacity(self.capacity);
        for node in std::iter::once(head).chain(peer_list.iter()) {
            if node == &self.local {
                break;
            }
            if merged.contains(node) {
                continue;
            }
            merged.push(node.clone());
            if merged.len() == self.capacity {
                break;
            }
        }
        self.replace(merged)
    }

    pub fn remove(&mut self, node: &NodeRef) -> bool {
        let before = self.nodes.len();
        self.nodes.retain(|existing| existing != node);
        before != self.nodes.len()
    }

    pub fn clear(&mut self) {
        self.nodes.clear();
    }

    fn replace(&mut self, nodes: Vec<NodeRef>) -> SuccessorChange {
        let added = nodes
            .iter()
            .filter(|node| !self.nodes.contains(node))
            .cloned()
            .collect();
        let removed = self
            .nodes
            .iter()
            .filter(|node| !nodes.contains(node))
            .cloned()
            .collect();
        self.nodes = nodes;
        SuccessorChange { added, removed }
    }
}
