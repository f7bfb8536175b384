use crate::error::{ChordError, Result};
use crate::ring::{Entry, Identifier};
use crate::transport::RemoteNode;

use futures::future::join_all;
use std::collections::HashSet;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

/// Best-effort replica fan-out to the successor list.
///
/// Each push is retried with jittered exponential backoff. A push that still
/// fails is logged and dropped; callers never see replication errors.
#[derive(Debug, Clone)]
pub struct Replicator {
    attempts: usize,
}

impl Replicator {
    pub fn new(attempts: usize) -> Self {
        Self {
            attempts: attempts.max(1),
        }
    }

    pub async fn insert_replicas(
        &self,
        targets: &[Arc<dyn RemoteNode>],
        entries: &HashSet<Entry>,
    ) -> usize {
        if entries.is_empty() {
            return 0;
        }
        self.fan_out("insert_replicas", targets, move |peer| {
            let entries = entries.clone();
            async move { peer.insert_replicas(entries).await }
        })
        .await
    }

    pub async fn remove_replicas(
        &self,
        targets: &[Arc<dyn RemoteNode>],
        sender: Identifier,
        entries: &HashSet<Entry>,
    ) -> usize {
        self.fan_out("remove_replicas", targets, move |peer| {
            let entries = entries.clone();
            async move { peer.remove_replicas(sender, entries).await }
        })
        .await
    }

    pub async fn replace_replicas(
        &self,
        targets: &[Arc<dyn RemoteNode>],
        range_start: Identifier,
        owner: Identifier,
        entries: &HashSet<Entry>,
    ) -> usize {
        self.fan_out("replace_replicas", targets, move |peer| {
            let entries = entries.clone();
            async move { peer.replace_replicas(range_start, owner, entries).await }
        })
        .await
    }

    /// Runs `op` against every target concurrently and returns how many succeeded.
    async fn fan_out<F, Fut>(&self, what: &str, targets: &[Arc<dyn RemoteNode>], op: F) -> usize
    where
        F: Fn(Arc<dyn RemoteNode>) -> Fut + Sync,
        Fut: Future<Output = Result<()>> + Send,
    {
        let op = &op;
        let results = join_all(targets.iter().map(|peer| async move {
            match self.with_retry(peer, op).await {
                Ok(()) => {
                    tracing::trace!("{} to {} succeeded", what, peer.node_ref());
                    true
                }
                Err(e) => {
                    tracing::warn!("{} to {} dropped: {}", what, peer.node_ref(), e);
                    false
                }
            }
        }))
        .await;

        results.into_iter().filter(|ok| *ok).count()
    }

    async fn with_retry<F, Fut>(&self, peer: &Arc<dyn RemoteNode>, op: &F) -> Result<()>
    where
        F: Fn(Arc<dyn RemoteNode>) -> Fut,
        Fut: Future<Output = Result<()>>,
    {
        let mut delay_ms = 50u64;

        for attempt in 0..self.attempts {
            match op(peer.clone()).await {
                Ok(()) => return Ok(()),
                Err(e) => {
                    if attempt + 1 == self.attempts {
                        return Err(e);
                    }
                    let jitter = rand::random::<u64>() % 25;
                    tokio::time::sleep(Duration::from_millis(delay_ms + jitter)).await;
                    delay_ms = (delay_ms * 2).min(400);
                }
            }
        }

        Err(ChordError::communication(
            peer.node_ref().address.clone(),
            "retry attempts exhausted",
        ))
    }
}
