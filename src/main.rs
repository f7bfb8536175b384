use chord_ring::config::ChordConfig;
use chord_ring::node::ChordNode;
use chord_ring::ring::NodeRef;
use chord_ring::transport::handlers::router;
use chord_ring::transport::http::HttpTransport;
use clap::Parser;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

/// Runs one Chord node serving the ring contract and a key/value API over HTTP.
#[derive(Debug, Parser)]
#[command(name = "chord-node", version)]
struct Args {
    /// Address to listen on; also the address other nodes reach this one at.
    #[arg(long, env = "CHORD_BIND")]
    bind: SocketAddr,

    /// Any member of an existing ring. Omit to start a new ring.
    #[arg(long, env = "CHORD_BOOTSTRAP")]
    bootstrap: Option<SocketAddr>,

    /// Identifier width in bits. Every node of a ring must agree on it.
    #[arg(long, env = "CHORD_BITS", default_value_t = 32)]
    bits: u8,

    /// Successor list length, which is also the replication factor.
    #[arg(long, env = "CHORD_SUCCESSORS", default_value_t = 3)]
    successors: usize,

    #[arg(long, env = "CHORD_STABILIZE_MS", default_value_t = 500)]
    stabilize_ms: u64,

    #[arg(long, env = "CHORD_RPC_TIMEOUT_MS", default_value_t = 500)]
    rpc_timeout_ms: u64,
}

impl Args {
    fn config(&self) -> ChordConfig {
        ChordConfig {
            id_bits: self.bits,
            successor_list_len: self.successors,
            stabilize_interval: Duration::from_millis(self.stabilize_ms),
            rpc_timeout: Duration::from_millis(self.rpc_timeout_ms),
            ..Default::default()
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();
    let config = args.config();

    // 1. Local node:
    let transport = Arc::new(HttpTransport::new());
    let node = ChordNode::new(args.bind.to_string(), config, transport)?;
    tracing::info!("Node {} starting", node.local);

    // 2. HTTP server, up before joining so the ring can reach us:
    let listener = tokio::net::TcpListener::bind(args.bind).await?;
    let app = router(node.clone());
    let server = tokio::spawn(async move { axum::serve(listener, app).await });
    tracing::info!("HTTP server listening on {}", args.bind);

    // 3. Create or join:
    match args.bootstrap {
        Some(bootstrap) => {
            let address = bootstrap.to_string();
            let bootstrap = NodeRef::new(node.space().hash(address.as_bytes()), address);
            node.join(&bootstrap).await?;
        }
        None => {
            node.create().await?;
        }
    }

    // 4. Maintenance:
    node.clone().start().await;

    // 5. Stats reporter:
    let stats_node = node.clone();
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(Duration::from_secs(5));

        loop {
            interval.tick().await;
            let info = stats_node.info().await;
            tracing::info!(
                "Ring stats: predecessor={} successors={} entries={} isolated={}",
                info.predecessor
                    .map(|node| node.to_string())
                    .unwrap_or_else(|| "none".to_string()),
                info.successors.len(),
                info.entry_count,
                info.isolated
            );
        }
    });

    tracing::info!("Press Ctrl+C to leave the ring");
    tokio::signal::ctrl_c().await?;

    // 6. Graceful leave:
    if let Err(e) = node.leave().await {
        tracing::warn!("Leave finished with error: {}", e);
    }
    server.abort();

    Ok(())
}
