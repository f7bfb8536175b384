//! Remote Node Contract & Transports
//!
//! Everything a node asks of a peer goes through `RemoteNode`. A `Transport`
//! hands out one proxy per peer reference; the node wraps each proxy in
//! `TimedNode` so every call carries a deadline and a timeout looks exactly
//! like any other communication failure.
//!
//! ## Submodules
//! - **`local`**: In-process transport. Nodes share a registry and call each other directly;
//!   dropping a node from the registry simulates a crash.
//! - **`http`**: `reqwest` client proxies speaking JSON over HTTP.
//! - **`handlers`**: `axum` handlers serving the contract for a local node.
//! - **`protocol`**: Endpoints and request/response bodies shared by client and server.

pub mod handlers;
pub mod http;
pub mod local;
pub mod protocol;

#[cfg(test)]
mod tests;

use crate::error::{ChordError, Result};
use crate::ring::{CopiedEntries, Entry, Identifier, LookupStep, NodeRef, RingView};

use async_trait::async_trait;
use std::collections::HashSet;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

/// Operations one node may invoke on another.
///
/// Every method fails with `ChordError::Communication`, except that a callee
/// which cannot resolve or is not responsible for an identifier answers with
/// `ChordError::RingUnreachable`.
#[async_trait]
pub trait RemoteNode: Send + Sync {
    fn node_ref(&self) -> &NodeRef;

    async fn ping(&self) -> Result<()>;

    /// Full lookup performed by the callee.
    async fn find_successor(&self, id: Identifier) -> Result<NodeRef>;

    /// One hop of an iterative lookup driven by the caller.
    async fn lookup_step(&self, id: Identifier) -> Result<LookupStep>;

    async fn notify(&self, candidate: NodeRef) -> Result<RingView>;

    /// Join-time notify that also hands over the entries the candidate now owns.
    async fn notify_and_copy_entries(&self, candidate: NodeRef) -> Result<CopiedEntries>;

    async fn insert_entry(&self, entry: Entry) -> Result<()>;

    async fn insert_replicas(&self, entries: HashSet<Entry>) -> Result<()>;

    async fn remove_entry(&self, entry: Entry) -> Result<()>;

    /// An empty set prunes every replica in `(callee, sender]`.
    async fn remove_replicas(&self, sender: Identifier, entries: HashSet<Entry>) -> Result<()>;

    /// Makes the callee's replicas in `(range_start, owner]` exactly `entries`.
    async fn replace_replicas(
        &self,
        range_start: Identifier,
        owner: Identifier,
        entries: HashSet<Entry>,
    ) -> Result<()>;

    async fn retrieve_entries(&self, id: Identifier) -> Result<HashSet<Entry>>;

    async fn leaves_network(&self, departing: NodeRef) -> Result<()>;

    /// Releases the proxy. Later calls fail.
    async fn disconnect(&self) -> Result<()>;
}

pub trait Transport: Send + Sync {
    fn connect(&self, node: &NodeRef) -> Arc<dyn RemoteNode>;
}

/// Applies a per-call deadline to another proxy.
pub struct TimedNode {
    inner: Arc<dyn RemoteNode>,
    timeout: Duration,
}

impl TimedNode {
    pub fn new(inner: Arc<dyn RemoteNode>, timeout: Duration) -> Self {
        Self { inner, timeout }
    }

    async fn deadline<T: Send>(&self, call: impl Future<Output = Result<T>> + Send) -> Result<T> {
        match tokio::time::timeout(self.timeout, call).await {
            Ok(result) => result,
            Err(_) => Err(ChordError::communication(
                self.inner.node_ref().address.clone(),
                format!("timed out after {:?}", self.timeout),
            )),
        }
    }
}

#[async_trait]
impl RemoteNode for TimedNode {
    fn node_ref(&self) -> &NodeRef {
        self.inner.node_ref()
    }

    async fn ping(&self) -> Result<()> {
        self.deadline(self.inner.ping()).await
    }

    async fn find_successor(&self, id: Identifier) -> Result<NodeRef> {
        self.deadline(self.inner.find_successor(id)).await
    }

    async fn lookup_step(&self, id: Identifier) -> Result<LookupStep> {
        self.deadline(self.inner.lookup_step(id)).await
    }

    async fn notify(&self, candidate: NodeRef) -> Result<RingView> {
        self.deadline(self.inner.notify(candidate)).await
    }

    async fn notify_and_copy_entries(&self, candidate: NodeRef) -> Result<CopiedEntries> {
        self.deadline(self.inner.notify_and_copy_entries(candidate))
            .await
    }

    async fn insert_entry(&self, entry: Entry) -> Result<()> {
        self.deadline(self.inner.insert_entry(entry)).await
    }

    async fn insert_replicas(&self, entries: HashSet<Entry>) -> Result<()> {
        self.deadline(self.inner.insert_replicas(entries)).await
    }

    async fn remove_entry(&self, entry: Entry) -> Result<()> {
        self.deadline(self.inner.remove_entry(entry)).await
    }

    async fn remove_replicas(&self, sender: Identifier, entries: HashSet<Entry>) -> Result<()> {
        self.deadline(self.inner.remove_replicas(sender, entries))
            .await
    }

    async fn replace_replicas(
        &self,
        range_start: Identifier,
        owner: Identifier,
        entries: HashSet<Entry>,
    ) -> Result<()> {
        self.deadline(self.inner.replace_replicas(range_start, owner, entries))
            .await
    }

    async fn retrieve_entries(&self, id: Identifier) -> Result<HashSet<Entry>> {
        self.deadline(self.inner.retrieve_entries(id)).await
    }

    async fn leaves_network(&self, departing: NodeRef) -> Result<()> {
        self.deadline(self.inner.leaves_network(departing)).await
    }

    async fn disconnect(&self) -> Result<()> {
        self.deadline(self.inner.disconnect()).await
    }
}
