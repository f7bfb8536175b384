use super::service::ChordNode;
use crate::error::{ChordError, Result};
use crate::ring::{NodeRef, RingView};
use crate::routing::SuccessorChange;

use std::collections::HashSet;
use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::Ordering;
use std::time::Duration;
use tracing::{debug, error, info, warn};

impl ChordNode {
    /// Starts the background maintenance timers.
    pub async fn start(self: Arc<Self>) {
        info!("Starting maintenance for {}", self.local);

        let handles = vec![
            Self::spawn_periodic(&self, self.config.stabilize_interval, |node| async move {
                node.stabilize().await
            }),
            Self::spawn_periodic(&self, self.config.check_predecessor_interval, |node| async move {
                node.check_predecessor().await
            }),
            Self::spawn_periodic(&self, self.config.fix_fingers_interval, |node| async move {
                node.fix_fingers().await
            }),
            Self::spawn_periodic(&self, self.config.replica_sync_interval, |node| async move {
                node.reconcile_replicas().await
            }),
        ];

        self.maintenance.lock().await.extend(handles);
        info!("All maintenance tasks started");
    }

    /// Aborts the maintenance timers.
    pub async fn stop(&self) {
        let handles: Vec<_> = self.maintenance.lock().await.drain(..).collect();
        for handle in &handles {
            handle.abort();
        }
        if !handles.is_empty() {
            info!("Stopped {} maintenance tasks for {}", handles.len(), self.local);
        }
    }

    fn spawn_periodic<F, Fut>(
        node: &Arc<Self>,
        period: Duration,
        routine: F,
    ) -> tokio::task::JoinHandle<()>
    where
        F: Fn(Arc<Self>) -> Fut + Send + 'static,
        Fut: Future<Output = Result<()>> + Send,
    {
        let node = node.clone();
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(period);
            loop {
                interval.tick().await;
                if node.has_departed() {
                    break;
                }
                match routine(node.clone()).await {
                    Ok(()) => {}
                    Err(ChordError::Isolated) => {
                        debug!("{} is isolated, skipping maintenance", node.local)
                    }
                    Err(e) => debug!("Maintenance on {} failed: {}", node.local, e),
                }
            }
        })
    }

    /// Runs stabilize, check-predecessor and one finger refresh once each.
    pub async fn maintenance_round(&self) -> Result<()> {
        self.stabilize().await?;
        self.check_predecessor().await?;
        self.fix_fingers().await
    }

    /// Refreshes every finger slot once.
    pub async fn refresh_fingers(&self) -> Result<()> {
        let slots = self.fingers.read().await.len();
        for _ in 0..slots {
            self.fix_fingers().await?;
        }
        Ok(())
    }

    // ============================================================
    // STABILIZE
    // ============================================================

    /// Notifies the successor, adopts its predecessor when that one sits
    /// closer, and merges the reported successor list.
    pub async fn stabilize(&self) -> Result<()> {
        self.ensure_routable()?;

        let first = self.successors.read().await.first().cloned();
        let successor = match first {
            Some(successor) => successor,
            // a lone node learns its successor from whoever notified it
            None => match self.predecessor().await {
                Some(predecessor) => predecessor,
                None => return Ok(()),
            },
        };

        match self.peer(&successor).notify(self.local.clone()).await {
            Ok(view) => {
                self.adopt_view(successor, view).await;
                Ok(())
            }
            Err(e) => {
                warn!("Successor {} of {} unreachable: {}", successor, self.local, e);
                self.successors.write().await.remove(&successor);
                self.forget(&successor).await;
                self.repair_successors().await
            }
        }
    }

    async fn adopt_view(&self, successor: NodeRef, view: RingView) {
        let closer = view
            .predecessor
            .filter(|node| node != &self.local && node.id.is_between(self.local.id, successor.id));

        if let Some(closer) = closer {
            match self.peer(&closer).notify(self.local.clone()).await {
                Ok(closer_view) => {
                    debug!("{} adopting closer successor {}", self.local, closer);
                    self.apply_successor_view(&closer, &closer_view.successors)
                        .await;
                    return;
                }
                Err(e) => debug!("Closer successor {} unreachable: {}", closer, e),
            }
        }

        self.apply_successor_view(&successor, &view.successors)
            .await;
    }

    /// Rebuilds the successor list from `head` and its list, then hands
    /// replicas to the members that changed.
    pub(crate) async fn apply_successor_view(&self, head: &NodeRef, peer_list: &[NodeRef]) {
        let (change, full, nodes) = {
            let mut successors = self.successors.write().await;
            let change = successors.update_from(head, peer_list);
            (change, successors.is_full(), successors.nodes().to_vec())
        };

        {
            let mut fingers = self.fingers.write().await;
            for node in &nodes {
                fingers.offer(node);
            }
        }

        if change.is_empty() {
            return;
        }
        info!(
            "Successor list of {} now [{}]",
            self.local,
            nodes
                .iter()
                .map(|node| node.to_string())
                .collect::<Vec<_>>()
                .join(", ")
        );
        self.hand_off_replicas(change, full).await;
    }

    async fn hand_off_replicas(&self, change: SuccessorChange, full: bool) {
        if !change.added.is_empty()
            && let Some((_, owned)) = self.owned_entries().await
        {
            let targets: Vec<_> = change.added.iter().map(|node| self.peer(node)).collect();
            self.replicator.insert_replicas(&targets, &owned).await;
        }

        // only a full list displaces live members; otherwise they are gone
        if full && !change.removed.is_empty() {
            let targets: Vec<_> = change.removed.iter().map(|node| self.peer(node)).collect();
            self.replicator
                .remove_replicas(&targets, self.local.id, &HashSet::new())
                .await;
        }
    }

    /// Promotes the next live successor after the first one was found dead.
    /// Fails with `Isolated` once the whole list is exhausted.
    pub(crate) async fn repair_successors(&self) -> Result<()> {
        let remaining = self.successor_list().await;

        for candidate in remaining {
            match self.peer(&candidate).notify(self.local.clone()).await {
                Ok(view) => {
                    info!("{} promoted {} to first successor", self.local, candidate);
                    self.apply_successor_view(&candidate, &view.successors)
                        .await;
                    return Ok(());
                }
                Err(e) => {
                    warn!("Successor {} of {} unreachable: {}", candidate, self.local, e);
                    self.successors.write().await.remove(&candidate);
                    self.forget(&candidate).await;
                }
            }
        }

        self.isolated.store(true, Ordering::SeqCst);
        error!("{} lost every successor and is isolated from the ring", self.local);
        Err(ChordError::Isolated)
    }

    // ============================================================
    // PREDECESSOR & FINGERS
    // ============================================================

    /// Clears the predecessor if it stopped answering pings.
    pub async fn check_predecessor(&self) -> Result<()> {
        self.ensure_serving()?;

        let Some(predecessor) = self.predecessor().await else {
            return Ok(());
        };

        if let Err(e) = self.peer(&predecessor).ping().await {
            warn!("Predecessor {} of {} unreachable: {}", predecessor, self.local, e);
            {
                let mut current = self.predecessor.write().await;
                if current.as_ref() == Some(&predecessor) {
                    *current = None;
                }
            }
            self.forget(&predecessor).await;
        }
        Ok(())
    }

    /// Recomputes the next finger slot, keeping the old value unless the
    /// resolved node is live.
    pub async fn fix_fingers(&self) -> Result<()> {
        self.ensure_routable()?;

        let (index, start) = self.fingers.write().await.next_to_fix();
        let resolved = match self.find_successor(start).await {
            Ok(node) => node,
            Err(e) => {
                debug!("Finger {} of {} not refreshed: {}", index, self.local, e);
                return Ok(());
            }
        };

        if resolved != self.local
            && let Err(e) = self.peer(&resolved).ping().await
        {
            debug!("Finger {} candidate {} is not live: {}", index, resolved, e);
            return Ok(());
        }

        self.fingers.write().await.set(index, resolved);
        Ok(())
    }

    // ============================================================
    // REPLICA RECONCILIATION
    // ============================================================

    /// Pushes the full owned range to every successor so replicas converge
    /// even after dropped pushes or lazy removals.
    pub async fn reconcile_replicas(&self) -> Result<()> {
        self.ensure_routable()?;

        let Some((range_start, owned)) = self.owned_entries().await else {
            return Ok(());
        };
        let targets = self.successor_peers().await;
        if targets.is_empty() {
            return Ok(());
        }

        let synced = self
            .replicator
            .replace_replicas(&targets, range_start, self.local.id, &owned)
            .await;
        debug!(
            "{} reconciled {} entries with {}/{} successors",
            self.local,
            owned.len(),
            synced,
            targets.len()
        );
        Ok(())
    }
}
