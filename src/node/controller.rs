use super::service::ChordNode;
use crate::error::{ChordError, Result};
use crate::ring::{Entry, Identifier, NodeRef};
use crate::routing::FingerTable;

use std::collections::HashSet;
use std::sync::atomic::Ordering;
use tracing::{debug, info, warn};

impl ChordNode {
    /// Starts a new ring with this node as its only member.
    pub async fn create(&self) -> Result<()> {
        self.ensure_serving()?;
        self.reset_ring_state().await;
        info!("{} created a new ring", self.local);
        Ok(())
    }

    /// Joins the ring `bootstrap` belongs to.
    ///
    /// The successor is resolved through the bootstrap node, then asked for
    /// the entries this node now owns. The predecessor stays empty until the
    /// ring's own stabilization notifies us.
    pub async fn join(&self, bootstrap: &NodeRef) -> Result<()> {
        self.ensure_serving()?;
        if bootstrap == &self.local {
            return Err(ChordError::Validation(format!(
                "{} cannot bootstrap from itself",
                self.local
            )));
        }

        self.reset_ring_state().await;
        info!("{} joining ring via {}", self.local, bootstrap);

        let successor = self.peer(bootstrap).find_successor(self.local.id).await?;
        if successor == self.local {
            return Err(ChordError::Validation(format!(
                "identifier {} already taken by {}",
                self.local.id, successor.address
            )));
        }

        let copied = self
            .peer(&successor)
            .notify_and_copy_entries(self.local.clone())
            .await?;
        let seeded = self.store.insert_all(copied.entries);

        {
            let mut fingers = self.fingers.write().await;
            fingers.initialize_with(&successor);
            if let Some(predecessor) = copied.predecessor.as_ref() {
                fingers.offer(predecessor);
            }
        }
        self.apply_successor_view(&successor, &copied.successors)
            .await;

        info!(
            "{} joined with successor {}, seeded {} entries",
            self.local, successor, seeded
        );
        Ok(())
    }

    async fn reset_ring_state(&self) {
        *self.predecessor.write().await = None;
        self.successors.write().await.clear();
        *self.fingers.write().await = FingerTable::new(self.space, self.local.clone());
        self.drain_peers();
        self.isolated.store(false, Ordering::SeqCst);
    }

    /// Graceful leave: stops maintenance, hands owned entries to the first
    /// reachable successor and disconnects. The hand-off is bounded by the
    /// leave timeout; the node disconnects regardless of its outcome.
    pub async fn leave(&self) -> Result<()> {
        self.ensure_serving()?;
        self.stop().await;

        let outcome = tokio::time::timeout(self.config.leave_timeout, self.hand_off_on_leave()).await;
        let result = match outcome {
            Ok(result) => result,
            Err(_) => {
                warn!("{} leave hand-off timed out", self.local);
                Err(ChordError::communication(
                    self.local.address.clone(),
                    format!("leave hand-off exceeded {:?}", self.config.leave_timeout),
                ))
            }
        };

        self.departed.store(true, Ordering::SeqCst);
        for peer in self.drain_peers() {
            if let Err(e) = peer.disconnect().await {
                debug!("Disconnect from {} failed: {}", peer.node_ref(), e);
            }
        }

        info!("{} left the ring", self.local);
        result
    }

    async fn hand_off_on_leave(&self) -> Result<()> {
        let successors = self.successor_list().await;
        if successors.is_empty() {
            info!("{} was the last member of its ring", self.local);
            return Ok(());
        }

        let entries = match self.owned_entries().await {
            Some((_, owned)) => owned,
            // without a predecessor the owned range is unknown, hand over everything
            None => self.store.all(),
        };

        let mut last_error = None;
        for successor in successors {
            let peer = self.peer(&successor);
            if let Err(e) = peer.leaves_network(self.local.clone()).await {
                warn!("{} could not announce leave to {}: {}", self.local, successor, e);
                last_error = Some(e);
                continue;
            }
            if !entries.is_empty()
                && let Err(e) = peer.insert_replicas(entries.clone()).await
            {
                warn!("{} could not hand entries to {}: {}", self.local, successor, e);
                last_error = Some(e);
                continue;
            }
            info!(
                "{} handed {} entries to {}",
                self.local,
                entries.len(),
                successor
            );
            return Ok(());
        }

        Err(last_error.unwrap_or(ChordError::Isolated))
    }

    // ============================================================
    // ROUTED OPERATIONS
    // ============================================================

    /// Stores `entry` at the node responsible for its identifier.
    ///
    /// If the resolved owner disowns the identifier, because the lookup ran on
    /// a view stabilization has not caught up with yet, the call fails with
    /// `RingUnreachable` and nothing is stored.
    pub async fn insert(&self, entry: Entry) -> Result<()> {
        self.ensure_routable()?;
        self.space.validate(entry.id)?;

        let owner = self.find_successor(entry.id).await?;
        if owner == self.local {
            self.insert_entry(entry).await
        } else {
            self.peer(&owner).insert_entry(entry).await
        }
    }

    /// Removes `entry` at the node responsible for its identifier.
    pub async fn remove(&self, entry: Entry) -> Result<()> {
        self.ensure_routable()?;
        self.space.validate(entry.id)?;

        let owner = self.find_successor(entry.id).await?;
        if owner == self.local {
            self.remove_entry(entry).await
        } else {
            self.peer(&owner).remove_entry(entry).await
        }
    }

    /// Every entry stored under `id` at its responsible node.
    pub async fn retrieve(&self, id: Identifier) -> Result<HashSet<Entry>> {
        self.ensure_routable()?;
        self.space.validate(id)?;

        let owner = self.find_successor(id).await?;
        if owner == self.local {
            self.retrieve_entries(id).await
        } else {
            self.peer(&owner).retrieve_entries(id).await
        }
    }
}
