use super::protocol::*;
use super::{RemoteNode, Transport};
use crate::error::{ChordError, Result};
use crate::ring::{CopiedEntries, Entry, Identifier, LookupStep, NodeRef, RingView};

use async_trait::async_trait;
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::collections::HashSet;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// Hands out HTTP proxies sharing one connection pool.
#[derive(Debug, Clone, Default)]
pub struct HttpTransport {
    client: reqwest::Client,
}

impl HttpTransport {
    pub fn new() -> Self {
        Self {
            client: reqwest::Client::new(),
        }
    }
}

impl Transport for HttpTransport {
    fn connect(&self, node: &NodeRef) -> Arc<dyn RemoteNode> {
        Arc::new(HttpNode {
            target: node.clone(),
            base_url: format!("http://{}", node.address),
            client: self.client.clone(),
            closed: AtomicBool::new(false),
        })
    }
}

/// Remote node reached through its `transport::handlers` router.
pub struct HttpNode {
    target: NodeRef,
    base_url: String,
    client: reqwest::Client,
    closed: AtomicBool,
}

impl HttpNode {
    fn failure(&self, reason: impl ToString) -> ChordError {
        ChordError::communication(self.target.address.clone(), reason)
    }

    async fn post<Req, Resp>(&self, endpoint: &str, payload: &Req) -> Result<Resp>
    where
        Req: Serialize + Sync,
        Resp: DeserializeOwned,
    {
        if self.closed.load(Ordering::SeqCst) {
            return Err(self.failure("proxy disconnected"));
        }

        let url = format!("{}{}", self.base_url, endpoint);
        let response = self
            .client
            .post(url)
            .json(payload)
            .send()
            .await
            .map_err(|e| self.failure(e))?;

        let status = response.status();
        if !status.is_success() {
            let detail = match response.json::<ErrorResponse>().await {
                Ok(ErrorResponse {
                    unresolved: Some(Unresolved { id, hops }),
                    ..
                }) => return Err(ChordError::RingUnreachable { id, hops }),
                Ok(body) => body.error,
                Err(_) => status.to_string(),
            };
            return Err(self.failure(format!("{}: {}", status, detail)));
        }

        response.json::<Resp>().await.map_err(|e| self.failure(e))
    }

    async fn post_ack<Req: Serialize + Sync>(&self, endpoint: &str, payload: &Req) -> Result<()> {
        let ack: AckResponse = self.post(endpoint, payload).await?;
        if !ack.success {
            return Err(self.failure(format!("{} rejected", endpoint)));
        }
        Ok(())
    }
}

#[async_trait]
impl RemoteNode for HttpNode {
    fn node_ref(&self) -> &NodeRef {
        &self.target
    }

    async fn ping(&self) -> Result<()> {
        self.post_ack(ENDPOINT_PING, &()).await
    }

    async fn find_successor(&self, id: Identifier) -> Result<NodeRef> {
        self.post(ENDPOINT_FIND_SUCCESSOR, &IdRequest { id }).await
    }

    async fn lookup_step(&self, id: Identifier) -> Result<LookupStep> {
        self.post(ENDPOINT_LOOKUP_STEP, &IdRequest { id }).await
    }

    async fn notify(&self, candidate: NodeRef) -> Result<RingView> {
        self.post(ENDPOINT_NOTIFY, &CandidateRequest { candidate })
            .await
    }

    async fn notify_and_copy_entries(&self, candidate: NodeRef) -> Result<CopiedEntries> {
        self.post(ENDPOINT_NOTIFY_AND_COPY, &CandidateRequest { candidate })
            .await
    }

    async fn insert_entry(&self, entry: Entry) -> Result<()> {
        self.post_ack(ENDPOINT_INSERT_ENTRY, &EntryRequest { entry })
            .await
    }

    async fn insert_replicas(&self, entries: HashSet<Entry>) -> Result<()> {
        self.post_ack(ENDPOINT_INSERT_REPLICAS, &EntriesRequest { entries })
            .await
    }

    async fn remove_entry(&self, entry: Entry) -> Result<()> {
        self.post_ack(ENDPOINT_REMOVE_ENTRY, &EntryRequest { entry })
            .await
    }

    async fn remove_replicas(&self, sender: Identifier, entries: HashSet<Entry>) -> Result<()> {
        self.post_ack(
            ENDPOINT_REMOVE_REPLICAS,
            &RemoveReplicasRequest { sender, entries },
        )
        .await
    }

    async fn replace_replicas(
        &self,
        range_start: Identifier,
        owner: Identifier,
        entries: HashSet<Entry>,
    ) -> Result<()> {
        self.post_ack(
            ENDPOINT_REPLACE_REPLICAS,
            &ReplaceReplicasRequest {
                range_start,
                owner,
                entries,
            },
        )
        .await
    }

    async fn retrieve_entries(&self, id: Identifier) -> Result<HashSet<Entry>> {
        self.post(ENDPOINT_RETRIEVE_ENTRIES, &IdRequest { id })
            .await
    }

    async fn leaves_network(&self, departing: NodeRef) -> Result<()> {
        self.post_ack(ENDPOINT_LEAVES_NETWORK, &LeavesNetworkRequest { departing })
            .await
    }

    async fn disconnect(&self) -> Result<()> {
        self.closed.store(true, Ordering::SeqCst);
        Ok(())
    }
}
