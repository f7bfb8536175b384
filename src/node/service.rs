use crate::config::{ChordConfig, RemovalPolicy};
use crate::error::{ChordError, Result};
use crate::ring::{CopiedEntries, Entry, IdSpace, Identifier, NodeRef, RingView};
use crate::routing::{FingerTable, SuccessorList};
use crate::storage::{EntryStore, Replicator};
use crate::transport::{RemoteNode, TimedNode, Transport};

use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::{Mutex, RwLock};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// One member of the ring together with all of its local ring state.
///
/// Other nodes only ever see this state through the remote contract; the
/// inbound side of that contract is implemented here.
pub struct ChordNode {
    pub local: NodeRef,
    pub(crate) space: IdSpace,
    pub(crate) config: ChordConfig,
    transport: Arc<dyn Transport>,
    pub(crate) fingers: RwLock<FingerTable>,
    pub(crate) successors: RwLock<SuccessorList>,
    pub(crate) predecessor: RwLock<Option<NodeRef>>,
    pub(crate) store: EntryStore,
    pub(crate) replicator: Replicator,
    peers: DashMap<Identifier, Arc<dyn RemoteNode>>,
    pub(crate) isolated: AtomicBool,
    pub(crate) departed: AtomicBool,
    pub(crate) maintenance: Mutex<Vec<JoinHandle<()>>>,
}

/// Point-in-time snapshot of a node's view of the ring.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeInfo {
    pub node: NodeRef,
    pub predecessor: Option<NodeRef>,
    pub successors: Vec<NodeRef>,
    pub fingers: Vec<NodeRef>,
    pub entry_count: usize,
    pub isolated: bool,
}

impl ChordNode {
    /// Creates a node whose identifier is the hash of its address.
    pub fn new(
        address: impl Into<String>,
        config: ChordConfig,
        transport: Arc<dyn Transport>,
    ) -> Result<Arc<Self>> {
        config.validate()?;
        let space = IdSpace::new(config.id_bits)?;
        let address = address.into();
        let id = space.hash(address.as_bytes());
        Ok(Self::build(NodeRef::new(id, address), space, config, transport))
    }

    /// Creates a node with an explicit identifier.
    pub fn with_id(
        id: u64,
        address: impl Into<String>,
        config: ChordConfig,
        transport: Arc<dyn Transport>,
    ) -> Result<Arc<Self>> {
        config.validate()?;
        let space = IdSpace::new(config.id_bits)?;
        let id = space.identifier(id)?;
        Ok(Self::build(NodeRef::new(id, address), space, config, transport))
    }

    fn build(
        local: NodeRef,
        space: IdSpace,
        config: ChordConfig,
        transport: Arc<dyn Transport>,
    ) -> Arc<Self> {
        Arc::new(Self {
            fingers: RwLock::new(FingerTable::new(space, local.clone())),
            successors: RwLock::new(SuccessorList::new(local.clone(), config.successor_list_len)),
            predecessor: RwLock::new(None),
            store: EntryStore::new(),
            replicator: Replicator::new(config.replica_retry_attempts),
            peers: DashMap::new(),
            isolated: AtomicBool::new(false),
            departed: AtomicBool::new(false),
            maintenance: Mutex::new(Vec::new()),
            local,
            space,
            config,
            transport,
        })
    }

    pub fn id(&self) -> Identifier {
        self.local.id
    }

    pub fn space(&self) -> IdSpace {
        self.space
    }

    pub fn config(&self) -> &ChordConfig {
        &self.config
    }

    pub fn is_isolated(&self) -> bool {
        self.isolated.load(Ordering::SeqCst)
    }

    pub fn has_departed(&self) -> bool {
        self.departed.load(Ordering::SeqCst)
    }

    pub async fn predecessor(&self) -> Option<NodeRef> {
        self.predecessor.read().await.clone()
    }

    pub async fn successor_list(&self) -> Vec<NodeRef> {
        self.successors.read().await.nodes().to_vec()
    }

    /// First successor, or the local node while it is alone.
    pub async fn successor(&self) -> NodeRef {
        self.successors
            .read()
            .await
            .first()
            .cloned()
            .unwrap_or_else(|| self.local.clone())
    }

    pub async fn finger_slots(&self) -> Vec<NodeRef> {
        self.fingers.read().await.slots().to_vec()
    }

    /// Everything held locally, owned and replicated alike.
    pub fn local_entries(&self) -> HashSet<Entry> {
        self.store.all()
    }

    pub async fn info(&self) -> NodeInfo {
        NodeInfo {
            node: self.local.clone(),
            predecessor: self.predecessor().await,
            successors: self.successor_list().await,
            fingers: self.finger_slots().await,
            entry_count: self.store.len(),
            isolated: self.is_isolated(),
        }
    }

    // --- Peer proxies ---

    pub(crate) fn peer(&self, node: &NodeRef) -> Arc<dyn RemoteNode> {
        if let Some(existing) = self.peers.get(&node.id) {
            return existing.value().clone();
        }
        let proxy: Arc<dyn RemoteNode> = Arc::new(TimedNode::new(
            self.transport.connect(node),
            self.config.rpc_timeout,
        ));
        self.peers.insert(node.id, proxy.clone());
        proxy
    }

    pub(crate) async fn successor_peers(&self) -> Vec<Arc<dyn RemoteNode>> {
        let successors = self.successor_list().await;
        successors.iter().map(|node| self.peer(node)).collect()
    }

    /// Drops a node believed dead from the finger table and the proxy cache.
    /// The successor list is repaired by stabilization instead.
    pub(crate) async fn forget(&self, node: &NodeRef) {
        if self.fingers.write().await.remove(node) {
            debug!("Removed {} from finger table of {}", node, self.local);
        }
        self.peers.remove(&node.id);
    }

    pub(crate) fn drain_peers(&self) -> Vec<Arc<dyn RemoteNode>> {
        let proxies: Vec<Arc<dyn RemoteNode>> =
            self.peers.iter().map(|peer| peer.value().clone()).collect();
        self.peers.clear();
        proxies
    }

    pub(crate) fn ensure_serving(&self) -> Result<()> {
        if self.has_departed() {
            return Err(ChordError::Shutdown);
        }
        Ok(())
    }

    pub(crate) fn ensure_routable(&self) -> Result<()> {
        self.ensure_serving()?;
        if self.is_isolated() {
            return Err(ChordError::Isolated);
        }
        Ok(())
    }

    /// Entries in `(predecessor, self]`. Unknown while there is no predecessor.
    pub(crate) async fn owned_entries(&self) -> Option<(Identifier, HashSet<Entry>)> {
        let predecessor = self.predecessor().await?;
        let owned = self
            .store
            .entries_in_interval(predecessor.id, self.local.id);
        Some((predecessor.id, owned))
    }

    pub(crate) async fn ring_view(&self) -> RingView {
        RingView {
            predecessor: self.predecessor().await,
            successors: self.successor_list().await,
        }
    }

    /// Adopts `candidate` as predecessor if there is none or it lies between
    /// the current one and the local node.
    pub(crate) async fn consider_predecessor(&self, candidate: &NodeRef) -> bool {
        if candidate == &self.local {
            return false;
        }

        let previous = {
            let mut predecessor = self.predecessor.write().await;
            let accept = match predecessor.as_ref() {
                None => true,
                Some(current) => {
                    current != candidate && candidate.id.is_between(current.id, self.local.id)
                }
            };
            if !accept {
                None
            } else {
                Some(predecessor.replace(candidate.clone()))
            }
        };

        self.fingers.write().await.offer(candidate);

        match previous {
            Some(old) => {
                info!(
                    "Node {} predecessor {} -> {}",
                    self.local,
                    old.map(|node| node.to_string())
                        .unwrap_or_else(|| "none".to_string()),
                    candidate
                );
                true
            }
            None => false,
        }
    }

    /// Rejects identifiers outside `(predecessor, self]`. Without a
    /// predecessor the range is unknown and every identifier is accepted.
    async fn ensure_responsible(&self, id: Identifier) -> Result<()> {
        if let Some(predecessor) = self.predecessor().await
            && !id.is_between_right_inclusive(predecessor.id, self.local.id)
        {
            warn!(
                "Node {} is not responsible for {} (predecessor {})",
                self.local, id, predecessor
            );
            return Err(ChordError::RingUnreachable { id, hops: 0 });
        }
        Ok(())
    }

    fn validate_entries<'a>(&self, entries: impl IntoIterator<Item = &'a Entry>) -> Result<()> {
        for entry in entries {
            self.space.validate(entry.id)?;
        }
        Ok(())
    }

    // --- Inbound side of the remote contract ---

    pub async fn ping(&self) -> Result<()> {
        self.ensure_serving()
    }

    pub async fn notify(&self, candidate: NodeRef) -> Result<RingView> {
        self.ensure_serving()?;
        self.space.validate(candidate.id)?;
        self.consider_predecessor(&candidate).await;
        Ok(self.ring_view().await)
    }

    /// Join-time notify. Returns the predecessor this node had before the
    /// candidate arrived, the successor list, and every entry in
    /// `(self, candidate]`, which the candidate now owns or replicates.
    pub async fn notify_and_copy_entries(&self, candidate: NodeRef) -> Result<CopiedEntries> {
        self.ensure_serving()?;
        self.space.validate(candidate.id)?;

        let previous = self.predecessor().await;
        self.consider_predecessor(&candidate).await;
        let entries = self
            .store
            .entries_in_interval(self.local.id, candidate.id);

        info!(
            "Node {} copying {} entries to joining node {}",
            self.local,
            entries.len(),
            candidate
        );

        Ok(CopiedEntries {
            predecessor: previous,
            successors: self.successor_list().await,
            entries,
        })
    }

    /// Stores an entry this node is responsible for and replicates it to the
    /// successor list. Fails with `RingUnreachable` if the identifier falls
    /// outside the local range, which happens when routing used a stale view.
    pub async fn insert_entry(&self, entry: Entry) -> Result<()> {
        self.ensure_serving()?;
        self.space.validate(entry.id)?;
        self.ensure_responsible(entry.id).await?;

        if self.store.insert(entry.clone()) {
            debug!("Node {} stored entry under {}", self.local, entry.id);
        }

        let targets = self.successor_peers().await;
        if !targets.is_empty() {
            let replicated = self
                .replicator
                .insert_replicas(&targets, &HashSet::from([entry]))
                .await;
            debug!(
                "Node {} replicated entry to {}/{} successors",
                self.local,
                replicated,
                targets.len()
            );
        }
        Ok(())
    }

    pub async fn insert_replicas(&self, entries: HashSet<Entry>) -> Result<()> {
        self.ensure_serving()?;
        self.validate_entries(&entries)?;
        let added = self.store.insert_all(entries);
        if added > 0 {
            debug!("Node {} stored {} replicas", self.local, added);
        }
        Ok(())
    }

    pub async fn remove_entry(&self, entry: Entry) -> Result<()> {
        self.ensure_serving()?;
        self.space.validate(entry.id)?;
        self.ensure_responsible(entry.id).await?;

        if self.store.remove(&entry) {
            debug!("Node {} removed entry under {}", self.local, entry.id);
        }

        if self.config.removal_policy == RemovalPolicy::Eager {
            let targets = self.successor_peers().await;
            if !targets.is_empty() {
                self.replicator
                    .remove_replicas(&targets, self.local.id, &HashSet::from([entry]))
                    .await;
            }
        }
        Ok(())
    }

    /// Removes the given replicas. An empty set prunes every replica in
    /// `(self, sender]`, which this node never owns.
    pub async fn remove_replicas(&self, sender: Identifier, entries: HashSet<Entry>) -> Result<()> {
        self.ensure_serving()?;
        self.space.validate(sender)?;
        self.validate_entries(&entries)?;

        if !entries.is_empty() {
            let removed = self.store.remove_all(entries.iter());
            debug!("Node {} removed {} replicas", self.local, removed);
            return Ok(());
        }

        if sender == self.local.id {
            warn!("Node {} ignoring prune request naming itself", self.local);
            return Ok(());
        }

        // never prune identifiers this node owns
        let upper = match self.predecessor().await {
            Some(predecessor) if sender.is_between(predecessor.id, self.local.id) => predecessor.id,
            _ => sender,
        };
        let removed = self.store.remove_interval(self.local.id, upper);
        if removed > 0 {
            info!(
                "Node {} pruned {} replicas in ({}, {}]",
                self.local, removed, self.local.id, upper
            );
        }
        Ok(())
    }

    /// Makes the replicas held for `(range_start, owner]` exactly `entries`.
    pub async fn replace_replicas(
        &self,
        range_start: Identifier,
        owner: Identifier,
        entries: HashSet<Entry>,
    ) -> Result<()> {
        self.ensure_serving()?;
        self.space.validate(range_start)?;
        self.space.validate(owner)?;
        self.validate_entries(&entries)?;

        let overlaps_own_range = self.local.id.is_between_right_inclusive(range_start, owner)
            || match self.predecessor().await {
                Some(predecessor) => owner.is_between(predecessor.id, self.local.id),
                None => false,
            };
        if owner == self.local.id || overlaps_own_range {
            debug!(
                "Node {} ignoring replica sync for ({}, {}] that overlaps its own range",
                self.local, range_start, owner
            );
            return Ok(());
        }

        let (added, removed) = self.store.replace_interval(range_start, owner, entries);
        if added > 0 || removed > 0 {
            debug!(
                "Node {} synced replicas of ({}, {}]: +{} -{}",
                self.local, range_start, owner, added, removed
            );
        }
        Ok(())
    }

    pub async fn retrieve_entries(&self, id: Identifier) -> Result<HashSet<Entry>> {
        self.ensure_serving()?;
        self.space.validate(id)?;
        self.ensure_responsible(id).await?;
        Ok(self.store.retrieve(id))
    }

    /// Forgets a departing neighbour. Stabilization re-establishes the
    /// predecessor through the next notify.
    pub async fn leaves_network(&self, departing: NodeRef) -> Result<()> {
        self.ensure_serving()?;

        {
            let mut predecessor = self.predecessor.write().await;
            if predecessor.as_ref() == Some(&departing) {
                *predecessor = None;
            }
        }
        self.successors.write().await.remove(&departing);
        self.forget(&departing).await;

        info!("Node {} notified that {} left the ring", self.local, departing);
        Ok(())
    }
}
