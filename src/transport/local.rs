use super::{RemoteNode, Transport};
use crate::error::{ChordError, Result};
use crate::node::ChordNode;
use crate::ring::{CopiedEntries, Entry, Identifier, LookupStep, NodeRef, RingView};

use async_trait::async_trait;
use dashmap::DashMap;
use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};

type Registry = Arc<DashMap<String, Weak<ChordNode>>>;

/// In-process network: nodes registered by address call each other directly.
///
/// The registry only holds weak references, so a dropped node disappears
/// on its own. `unregister` makes a live node unreachable, which is how tests
/// simulate a crash.
#[derive(Default)]
pub struct LocalNetwork {
    nodes: Registry,
}

impl LocalNetwork {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn register(&self, node: &Arc<ChordNode>) {
        self.nodes
            .insert(node.local.address.clone(), Arc::downgrade(node));
    }

    /// Cuts a node off without letting it leave gracefully.
    pub fn unregister(&self, address: &str) -> bool {
        self.nodes.remove(address).is_some()
    }

    pub fn contains(&self, address: &str) -> bool {
        self.nodes
            .get(address)
            .is_some_and(|node| node.strong_count() > 0)
    }
}

impl Transport for LocalNetwork {
    fn connect(&self, node: &NodeRef) -> Arc<dyn RemoteNode> {
        Arc::new(LocalNode {
            target: node.clone(),
            registry: self.nodes.clone(),
            closed: AtomicBool::new(false),
        })
    }
}

/// Proxy for a node on the same `LocalNetwork`. Failures the target reports
/// are surfaced as communication failures, like a real wire would, except an
/// unresolvable owner, which reaches the caller as is.
pub struct LocalNode {
    target: NodeRef,
    registry: Registry,
    closed: AtomicBool,
}

impl LocalNode {
    fn resolve(&self) -> Result<Arc<ChordNode>> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(self.failure("proxy disconnected"));
        }
        let node = self
            .registry
            .get(&self.target.address)
            .and_then(|node| node.upgrade())
            .ok_or_else(|| self.failure("node unreachable"))?;
        if node.id() != self.target.id {
            return Err(self.failure(format!("address now serves {}", node.id())));
        }
        Ok(node)
    }

    fn failure(&self, reason: impl ToString) -> ChordError {
        ChordError::communication(self.target.address.clone(), reason)
    }

    fn wire<T>(&self, result: Result<T>) -> Result<T> {
        result.map_err(|e| match e {
            ChordError::Communication { .. } | ChordError::RingUnreachable { .. } => e,
            other => self.failure(other),
        })
    }
}

#[async_trait]
impl RemoteNode for LocalNode {
    fn node_ref(&self) -> &NodeRef {
        &self.target
    }

    async fn ping(&self) -> Result<()> {
        let node = self.resolve()?;
        self.wire(node.ping().await)
    }

    async fn find_successor(&self, id: Identifier) -> Result<NodeRef> {
        let node = self.resolve()?;
        self.wire(node.find_successor(id).await)
    }

    async fn lookup_step(&self, id: Identifier) -> Result<LookupStep> {
        let node = self.resolve()?;
        self.wire(node.lookup_step(id).await)
    }

    async fn notify(&self, candidate: NodeRef) -> Result<RingView> {
        let node = self.resolve()?;
        self.wire(node.notify(candidate).await)
    }

    async fn notify_and_copy_entries(&self, candidate: NodeRef) -> Result<CopiedEntries> {
        let node = self.resolve()?;
        self.wire(node.notify_and_copy_entries(candidate).await)
    }

    async fn insert_entry(&self, entry: Entry) -> Result<()> {
        let node = self.resolve()?;
        self.wire(node.insert_entry(entry).await)
    }

    async fn insert_replicas(&self, entries: HashSet<Entry>) -> Result<()> {
        let node = self.resolve()?;
        self.wire(node.insert_replicas(entries).await)
    }

    async fn remove_entry(&self, entry: Entry) -> Result<()> {
        let node = self.resolve()?;
        self.wire(node.remove_entry(entry).await)
    }

    async fn remove_replicas(&self, sender: Identifier, entries: HashSet<Entry>) -> Result<()> {
        let node = self.resolve()?;
        self.wire(node.remove_replicas(sender, entries).await)
    }

    async fn replace_replicas(
        &self,
        range_start: Identifier,
        owner: Identifier,
        entries: HashSet<Entry>,
    ) -> Result<()> {
        let node = self.resolve()?;
        self.wire(node.replace_replicas(range_start, owner, entries).await)
    }

    async fn retrieve_entries(&self, id: Identifier) -> Result<HashSet<Entry>> {
        let node = self.resolve()?;
        self.wire(node.retrieve_entries(id).await)
    }

    async fn leaves_network(&self, departing: NodeRef) -> Result<()> {
        let node = self.resolve()?;
        self.wire(node.leaves_network(departing).await)
    }

    async fn disconnect(&self) -> Result<()> {
        self.closed.store(true, Ordering::SeqCst);
        Ok(())
    }
}
