//! Service Module Tests
//!
//! Validates the key/value facade and its completion channel.
//!
//! ## Test Scopes
//! - **Key hashing**: Keys land in the configured identifier space.
//! - **Completions**: Every background call delivers exactly one completion, carrying
//!   either a result or an error.

#[cfg(test)]
mod tests {
    use crate::config::ChordConfig;
    use crate::error::ChordError;
    use crate::node::ChordNode;
    use crate::service::{ChordService, Completion};
    use crate::transport::local::LocalNetwork;
    use std::collections::HashSet;
    use std::sync::Arc;
    use tokio::sync::mpsc;

    async fn single_node_service() -> (Arc<LocalNetwork>, ChordService) {
        let network = LocalNetwork::new();
        let config = ChordConfig {
            id_bits: 16,
            ..Default::default()
        };
        let node = ChordNode::new("local://solo", config, network.clone()).unwrap();
        network.register(&node);
        node.create().await.unwrap();
        (network, ChordService::new(node))
    }

    #[tokio::test]
    async fn test_key_id_fits_space() {
        let (_network, service) = single_node_service().await;

        let id = service.key_id("some key");
        assert!(id.0 < (1 << 16));
        assert_eq!(id, service.key_id("some key"));
    }

    #[tokio::test]
    async fn test_insert_retrieve_remove() {
        let (_network, service) = single_node_service().await;

        service.insert("k", b"one").await.unwrap();
        service.insert("k", b"two").await.unwrap();
        service.insert("k", b"two").await.unwrap();

        let values = service.retrieve("k").await.unwrap();
        assert_eq!(values, HashSet::from([b"one".to_vec(), b"two".to_vec()]));

        service.remove("k", b"one").await.unwrap();
        assert_eq!(
            service.retrieve("k").await.unwrap(),
            HashSet::from([b"two".to_vec()])
        );

        assert!(service.retrieve("missing").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_each_async_call_completes_once() {
        let (_network, service) = single_node_service().await;
        let (tx, mut rx) = mpsc::unbounded_channel();

        service
            .insert_async("k".to_string(), b"v".to_vec(), tx.clone())
            .await
            .unwrap();
        let inserted = rx.recv().await.unwrap();
        assert_eq!(
            inserted,
            Completion::Inserted {
                key: "k".to_string(),
                value: b"v".to_vec(),
                result: Ok(()),
            }
        );
        assert!(rx.try_recv().is_err());

        service
            .retrieve_async("k".to_string(), tx.clone())
            .await
            .unwrap();
        match rx.recv().await.unwrap() {
            Completion::Retrieved { key, result } => {
                assert_eq!(key, "k");
                assert_eq!(result.unwrap(), HashSet::from([b"v".to_vec()]));
            }
            other => panic!("unexpected completion {:?}", other),
        }
        assert!(rx.try_recv().is_err());

        service
            .remove_async("k".to_string(), b"v".to_vec(), tx)
            .await
            .unwrap();
        let removed = rx.recv().await.unwrap();
        assert!(matches!(removed, Completion::Removed { .. }));
        assert!(removed.is_ok());

        // all senders gone, nothing else queued
        assert!(rx.recv().await.is_none());
    }

    #[tokio::test]
    async fn test_async_failure_carries_error_only() {
        let (_network, service) = single_node_service().await;
        service.node().leave().await.unwrap();
        let (tx, mut rx) = mpsc::unbounded_channel();

        service
            .retrieve_async("k".to_string(), tx)
            .await
            .unwrap();

        let completion = rx.recv().await.unwrap();
        assert_eq!(completion.key(), "k");
        assert!(!completion.is_ok());
        assert_eq!(
            completion,
            Completion::Retrieved {
                key: "k".to_string(),
                result: Err(ChordError::Shutdown),
            }
        );
        assert!(rx.recv().await.is_none());
    }

    #[tokio::test]
    async fn test_dropped_receiver_does_not_panic() {
        let (_network, service) = single_node_service().await;
        let (tx, rx) = mpsc::unbounded_channel();
        drop(rx);

        let handle = service.insert_async("k".to_string(), b"v".to_vec(), tx);
        assert!(handle.await.is_ok());
        assert_eq!(service.retrieve("k").await.unwrap().len(), 1);
    }
}
