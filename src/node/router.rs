use super::service::ChordNode;
use crate::error::{ChordError, Result};
use crate::ring::{Identifier, LookupStep, NodeRef};

use std::collections::{HashSet, VecDeque};
use tracing::{debug, warn};

impl ChordNode {
    /// Answers a lookup without any remote call when the local view suffices.
    async fn responsible_locally(&self, id: Identifier) -> Option<NodeRef> {
        if id == self.local.id {
            return Some(self.local.clone());
        }

        let successor = self.successors.read().await.first().cloned();
        let Some(successor) = successor else {
            // alone on the ring
            return Some(self.local.clone());
        };

        if id.is_between_right_inclusive(self.local.id, successor.id) {
            return Some(successor);
        }
        if let Some(predecessor) = self.predecessor().await
            && id.is_between_right_inclusive(predecessor.id, self.local.id)
        {
            return Some(self.local.clone());
        }
        None
    }

    /// Known nodes strictly between the local node and `id`, closest to `id`
    /// first. The head is the classic closest preceding finger; the rest are
    /// fallbacks for when a hop fails.
    async fn route_candidates(&self, id: Identifier) -> Vec<NodeRef> {
        let (closest, mut known) = {
            let fingers = self.fingers.read().await;
            (
                fingers.closest_preceding_finger(id).clone(),
                fingers.distinct_nodes(),
            )
        };
        for node in self.successors.read().await.nodes() {
            if !known.contains(node) {
                known.push(node.clone());
            }
        }

        let mut candidates: Vec<NodeRef> = known
            .into_iter()
            .filter(|node| node.id.is_between(self.local.id, id))
            .collect();
        candidates.sort_by_key(|node| self.space.distance(node.id, id));

        if closest != self.local {
            candidates.retain(|node| node != &closest);
            candidates.insert(0, closest);
        }
        candidates
    }

    /// Route candidates followed by the successor list, deduplicated.
    async fn next_hops(&self, id: Identifier) -> Vec<NodeRef> {
        let mut hops = self.route_candidates(id).await;
        for node in self.successors.read().await.nodes() {
            if !hops.contains(node) {
                hops.push(node.clone());
            }
        }
        hops
    }

    /// One hop of an iterative lookup, served to a remote caller.
    pub async fn lookup_step(&self, id: Identifier) -> Result<LookupStep> {
        self.ensure_routable()?;
        self.space.validate(id)?;

        if let Some(owner) = self.responsible_locally(id).await {
            return Ok(LookupStep::Done(owner));
        }
        Ok(LookupStep::Next(self.next_hops(id).await))
    }

    /// Resolves the node responsible for `id`.
    ///
    /// The lookup is iterative: this node asks each hop for the next ones and
    /// keeps every suggestion it has not tried yet as a fallback, newest first.
    /// A hop that fails is dropped from the finger table and never asked again
    /// during this lookup. The walk gives up with `RingUnreachable` once the
    /// hop bound is spent or no untried node is left.
    pub async fn find_successor(&self, id: Identifier) -> Result<NodeRef> {
        self.ensure_routable()?;
        self.space.validate(id)?;

        if let Some(owner) = self.responsible_locally(id).await {
            return Ok(owner);
        }

        let hop_limit = self.config.hop_limit();
        let mut pending: VecDeque<NodeRef> = self.next_hops(id).await.into();
        let mut failed: HashSet<Identifier> = HashSet::new();
        let mut hops = 0usize;

        while let Some(current) = pending.pop_front() {
            if hops >= hop_limit {
                warn!("Lookup of {} from {} exceeded {} hops", id, self.local, hop_limit);
                return Err(ChordError::RingUnreachable { id, hops });
            }
            hops += 1;

            match self.peer(&current).lookup_step(id).await {
                Ok(LookupStep::Done(owner)) => {
                    debug!("Lookup of {} resolved to {} in {} hops", id, owner, hops);
                    if owner != self.local {
                        self.fingers.write().await.offer(&owner);
                    }
                    return Ok(owner);
                }
                Ok(LookupStep::Next(suggested)) => {
                    let fresh: Vec<NodeRef> = suggested
                        .into_iter()
                        .filter(|node| {
                            node != &current && node != &self.local && !failed.contains(&node.id)
                        })
                        .collect();
                    if fresh.is_empty() {
                        debug!("Hop {} made no progress towards {}", current, id);
                    }
                    pending.retain(|node| !fresh.contains(node));
                    for node in fresh.into_iter().rev() {
                        pending.push_front(node);
                    }
                }
                Err(e) => {
                    warn!("Lookup hop {} for {} failed: {}", current, id, e);
                    failed.insert(current.id);
                    pending.retain(|node| node != &current);
                    self.forget(&current).await;
                }
            }
        }

        Err(ChordError::RingUnreachable { id, hops })
    }
}
