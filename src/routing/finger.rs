use crate::ring::{IdSpace, Identifier, NodeRef};

/// Finger table of one node.
///
/// A slot pointing at the local node means nothing better is known yet.
#[derive(Debug, Clone)]
pub struct FingerTable {
    space: IdSpace,
    local: NodeRef,
    slots: Vec<NodeRef>,
    next: usize,
}

impl FingerTable {
    pub fn new(space: IdSpace, local: NodeRef) -> Self {
        let slots = vec![local.clone(); space.bits() as usize];
        Self {
            space,
            local,
            slots,
            next: 0,
        }
    }

    /// Points every slot at `reference`, used at join before anything else is known.
    pub fn initialize_with(&mut self, reference: &NodeRef) {
        for slot in self.slots.iter_mut() {
            *slot = reference.clone();
        }
        self.next = 0;
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn slots(&self) -> &[NodeRef] {
        &self.slots
    }

    pub fn get(&self, index: usize) -> Option<&NodeRef> {
        self.slots.get(index)
    }

    /// Start of slot `index`: `local + 2^index`.
    pub fn start(&self, index: usize) -> Identifier {
        self.space.add_power_of_two(self.local.id, index as u8)
    }

    /// Advances the rotating cursor and returns the slot due for a refresh.
    pub fn next_to_fix(&mut self) -> (usize, Identifier) {
        let index = self.next;
        self.next = (self.next + 1) % self.slots.len();
        (index, self.start(index))
    }

    pub fn set(&mut self, index: usize, node: NodeRef) {
        if let Some(slot) = self.slots.get_mut(index) {
            *slot = node;
        }
    }

    /// Highest slot strictly between the local node and `id`, or the local node.
    pub fn closest_preceding_finger(&self, id: Identifier) -> &NodeRef {
        self.slots
            .iter()
            .rev()
            .find(|slot| slot.id.is_between(self.local.id, id))
            .unwrap_or(&self.local)
    }

    /// Offers a node learned elsewhere. A slot takes it when the node lies in
    /// `[start, current)`, i.e. it is a closer successor of the slot's start.
    pub fn offer(&mut self, node: &NodeRef) -> bool {
        if node == &self.local {
            return false;
        }
        let mut changed = false;
        for index in 0..self.slots.len() {
            let start = self.start(index);
            let current = &self.slots[index];
            if current == node || current.id == start {
                continue;
            }
            if node.id == start || node.id.is_between(start, current.id) {
                self.slots[index] = node.clone();
                changed = true;
            }
        }
        changed
    }

    /// Forgets a dead node; its slots fall back to the local node.
    pub fn remove(&mut self, node: &NodeRef) -> bool {
        let mut changed = false;
        for slot in self.slots.iter_mut() {
            if slot == node {
                *slot = self.local.clone();
                changed = true;
            }
        }
        changed
    }

    /// Distinct remote nodes referenced by the table.
    pub fn distinct_nodes(&self) -> Vec<NodeRef> {
        let mut nodes: Vec<NodeRef> = Vec::new();
        for slot in &self.slots {
            if slot != &self.local && !nodes.contains(slot) {
                nodes.push(slot.clone());
            }
        }
        nodes
    }
}
