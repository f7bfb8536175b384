use super::types::Completion;
use crate::error::Result;
use crate::node::ChordNode;
use crate::ring::{Entry, Identifier};

use std::collections::HashSet;
use std::sync::Arc;
use tokio::sync::mpsc::UnboundedSender;
use tokio::task::JoinHandle;

#[derive(Clone)]
pub struct ChordService {
    node: Arc<ChordNode>,
}

impl ChordService {
    pub fn new(node: Arc<ChordNode>) -> Self {
        Self { node }
    }

    pub fn node(&self) -> &Arc<ChordNode> {
        &self.node
    }

    /// Ring position of an application key.
    pub fn key_id(&self, key: &str) -> Identifier {
        self.node.space().hash(key.as_bytes())
    }

    pub async fn insert(&self, key: &str, value: &[u8]) -> Result<()> {
        let entry = Entry::new(self.key_id(key), value);
        self.node.insert(entry).await
    }

    pub async fn remove(&self, key: &str, value: &[u8]) -> Result<()> {
        let entry = Entry::new(self.key_id(key), value);
        self.node.remove(entry).await
    }

    /// Every value stored under `key`. Keys that collide in the identifier
    /// space share their values.
    pub async fn retrieve(&self, key: &str) -> Result<HashSet<Vec<u8>>> {
        let entries = self.node.retrieve(self.key_id(key)).await?;
        Ok(entries.into_iter().map(|entry| entry.value).collect())
    }

    pub fn insert_async(
        &self,
        key: String,
        value: Vec<u8>,
        completions: UnboundedSender<Completion>,
    ) -> JoinHandle<()> {
        let service = self.clone();
        tokio::spawn(async move {
            let result = service.insert(&key, &value).await;
            deliver(&completions, Completion::Inserted { key, value, result });
        })
    }

    pub fn remove_async(
        &self,
        key: String,
        value: Vec<u8>,
        completions: UnboundedSender<Completion>,
    ) -> JoinHandle<()> {
        let service = self.clone();
        tokio::spawn(async move {
            let result = service.remove(&key, &value).await;
            deliver(&completions, Completion::Removed { key, value, result });
        })
    }

    pub fn retrieve_async(
        &self,
        key: String,
        completions: UnboundedSender<Completion>,
    ) -> JoinHandle<()> {
        let service = self.clone();
        tokio::spawn(async move {
            let result = service.retrieve(&key).await;
            deliver(&completions, Completion::Retrieved { key, result });
        })
    }
}

fn deliver(completions: &UnboundedSender<Completion>, completion: Completion) {
    if let Err(e) = completions.send(completion) {
        tracing::debug!("Completion for {} dropped, receiver gone", e.0.key());
    }
}
