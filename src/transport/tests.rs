//! Transport Module Tests
//!
//! ## Test Scopes
//! - **Local transport**: Crash simulation, disconnect, error mapping.
//! - **Ownership**: A non-owner's refusal reaches the caller as `RingUnreachable`.
//! - **Deadlines**: `TimedNode` turns a stalled call into a communication failure.
//! - **HTTP**: A two-node ring over real sockets, plus the public key/value routes.

#[cfg(test)]
mod tests {
    use crate::config::ChordConfig;
    use crate::error::{ChordError, Result};
    use crate::node::ChordNode;
    use crate::ring::{CopiedEntries, Entry, Identifier, LookupStep, NodeRef, RingView};
    use crate::service::ChordService;
    use crate::transport::handlers::router;
    use crate::transport::http::HttpTransport;
    use crate::transport::local::LocalNetwork;
    use crate::transport::protocol::{GetResponse, KeyValueRequest};
    use crate::transport::{RemoteNode, TimedNode, Transport};
    use async_trait::async_trait;
    use std::collections::HashSet;
    use std::sync::Arc;
    use std::time::Duration;

    fn config() -> ChordConfig {
        ChordConfig {
            id_bits: 8,
            ..Default::default()
        }
    }

    // ============================================================
    // LOCAL TRANSPORT TESTS
    // ============================================================

    #[tokio::test]
    async fn test_unregistered_node_is_unreachable() {
        let network = LocalNetwork::new();
        let node = ChordNode::with_id(10, "local://10", config(), network.clone()).unwrap();
        network.register(&node);
        assert!(network.contains("local://10"));

        let proxy = network.connect(&node.local);
        assert!(proxy.ping().await.is_ok());

        network.unregister("local://10");
        let err = proxy.ping().await.unwrap_err();
        assert!(err.is_communication());
    }

    #[tokio::test]
    async fn test_disconnected_proxy_rejects_calls() {
        let network = LocalNetwork::new();
        let node = ChordNode::with_id(10, "local://10", config(), network.clone()).unwrap();
        network.register(&node);

        let proxy = network.connect(&node.local);
        proxy.disconnect().await.unwrap();
        assert!(proxy.ping().await.unwrap_err().is_communication());

        // a fresh proxy still works
        assert!(network.connect(&node.local).ping().await.is_ok());
    }

    #[tokio::test]
    async fn test_unresolved_owner_crosses_local_wire() {
        let network = LocalNetwork::new();
        let first = ChordNode::with_id(10, "local://10", config(), network.clone()).unwrap();
        let second = ChordNode::with_id(20, "local://20", config(), network.clone()).unwrap();
        network.register(&first);
        network.register(&second);
        first.create().await.unwrap();
        second.join(&first.local).await.unwrap();

        // node 10 now has 20 as predecessor and owns (20, 10] only
        let err = network
            .connect(&first.local)
            .insert_entry(Entry::new(Identifier(15), b"v".to_vec()))
            .await
            .unwrap_err();
        assert_eq!(
            err,
            ChordError::RingUnreachable {
                id: Identifier(15),
                hops: 0,
            }
        );
    }

    #[tokio::test]
    async fn test_remote_errors_surface_as_communication() {
        let network = LocalNetwork::new();
        let node = ChordNode::with_id(10, "local://10", config(), network.clone()).unwrap();
        network.register(&node);
        let proxy = network.connect(&node.local);

        // out of the 8-bit space
        let err = proxy.retrieve_entries(Identifier(999)).await.unwrap_err();
        assert!(err.is_communication());
    }

    #[tokio::test]
    async fn test_dropped_node_disappears() {
        let network = LocalNetwork::new();
        let node = ChordNode::with_id(10, "local://10", config(), network.clone()).unwrap();
        network.register(&node);
        let reference = node.local.clone();
        drop(node);

        assert!(!network.contains("local://10"));
        assert!(network.connect(&reference).ping().await.is_err());
    }

    // ============================================================
    // DEADLINE TESTS
    // ============================================================

    /// Peer whose every call hangs far longer than any deadline.
    struct StalledPeer {
        node: NodeRef,
    }

    impl StalledPeer {
        async fn stall<T: Default>(&self) -> Result<T> {
            tokio::time::sleep(Duration::from_secs(60)).await;
            Ok(T::default())
        }
    }

    #[async_trait]
    impl RemoteNode for StalledPeer {
        fn node_ref(&self) -> &NodeRef {
            &self.node
        }
        async fn ping(&self) -> Result<()> {
            self.stall().await
        }
        async fn find_successor(&self, _id: Identifier) -> Result<NodeRef> {
            self.stall::<()>().await?;
            Ok(self.node.clone())
        }
        async fn lookup_step(&self, _id: Identifier) -> Result<LookupStep> {
            self.stall::<()>().await?;
            Ok(LookupStep::Done(self.node.clone()))
        }
        async fn notify(&self, _candidate: NodeRef) -> Result<RingView> {
            self.stall().await
        }
        async fn notify_and_copy_entries(&self, _candidate: NodeRef) -> Result<CopiedEntries> {
            self.stall().await
        }
        async fn insert_entry(&self, _entry: Entry) -> Result<()> {
            self.stall().await
        }
        async fn insert_replicas(&self, _entries: HashSet<Entry>) -> Result<()> {
            self.stall().await
        }
        async fn remove_entry(&self, _entry: Entry) -> Result<()> {
            self.stall().await
        }
        async fn remove_replicas(&self, _sender: Identifier, _entries: HashSet<Entry>) -> Result<()> {
            self.stall().await
        }
        async fn replace_replicas(
            &self,
            _range_start: Identifier,
            _owner: Identifier,
            _entries: HashSet<Entry>,
        ) -> Result<()> {
            self.stall().await
        }
        async fn retrieve_entries(&self, _id: Identifier) -> Result<HashSet<Entry>> {
            self.stall().await
        }
        async fn leaves_network(&self, _departing: NodeRef) -> Result<()> {
            self.stall().await
        }
        async fn disconnect(&self) -> Result<()> {
            Ok(())
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout_is_a_communication_failure() {
        let stalled = Arc::new(StalledPeer {
            node: NodeRef::new(Identifier(7), "stalled://7"),
        });
        let timed = TimedNode::new(stalled, Duration::from_millis(100));

        let err = timed.ping().await.unwrap_err();
        assert!(matches!(err, ChordError::Communication { ref peer, .. } if peer == "stalled://7"));
        assert!(timed.find_successor(Identifier(1)).await.is_err());
        assert!(timed.disconnect().await.is_ok());
    }

    // ============================================================
    // HTTP TESTS
    // ============================================================

    async fn serve_node(config: ChordConfig) -> Arc<ChordNode> {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let address = listener.local_addr().unwrap().to_string();
        let node = ChordNode::new(address, config, Arc::new(HttpTransport::new())).unwrap();
        let app = router(node.clone());
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        node
    }

    #[tokio::test]
    async fn test_http_ring_round_trip() {
        let http = ChordConfig::default();
        let first = serve_node(http.clone()).await;
        let second = serve_node(http).await;

        first.create().await.unwrap();
        second.join(&first.local).await.unwrap();
        for _ in 0..4 {
            let _ = first.stabilize().await;
            let _ = second.stabilize().await;
        }

        assert_eq!(first.successor().await, second.local);
        assert_eq!(second.successor().await, first.local);

        ChordService::new(second.clone())
            .insert("alpha", b"1")
            .await
            .unwrap();
        let values = ChordService::new(first.clone())
            .retrieve("alpha")
            .await
            .unwrap();
        assert_eq!(values, HashSet::from([b"1".to_vec()]));

        // both nodes hold it: owner plus its single successor
        assert_eq!(first.local_entries().len(), 1);
        assert_eq!(second.local_entries().len(), 1);

        // a node asked for an identifier it does not own says so over the wire
        let proxy = HttpTransport::new().connect(&first.local);
        assert_eq!(
            proxy.retrieve_entries(second.id()).await,
            Err(ChordError::RingUnreachable {
                id: second.id(),
                hops: 0,
            })
        );
    }

    #[tokio::test]
    async fn test_http_public_routes() {
        let node = serve_node(ChordConfig::default()).await;
        node.create().await.unwrap();
        let base = format!("http://{}", node.local.address);
        let client = reqwest::Client::new();

        let put = client
            .post(format!("{}/put", base))
            .json(&KeyValueRequest {
                key: "book".to_string(),
                value: serde_json::json!({"title": "Dune"}),
            })
            .send()
            .await
            .unwrap();
        assert!(put.status().is_success());

        let got: GetResponse = client
            .get(format!("{}/get/book", base))
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        assert_eq!(got.values, vec![serde_json::json!({"title": "Dune"})]);

        let status = client.get(format!("{}/status", base)).send().await.unwrap();
        assert!(status.status().is_success());
    }

    #[tokio::test]
    async fn test_http_departed_node_answers_unavailable() {
        let node = serve_node(ChordConfig::default()).await;
        node.create().await.unwrap();
        node.leave().await.unwrap();

        let proxy = HttpTransport::new().connect(&node.local);
        let err = proxy.ping().await.unwrap_err();
        assert!(err.is_communication());
        assert!(err.to_string().contains("503"));
    }
}
