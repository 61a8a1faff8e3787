use std::sync::Arc;

use rustalink_client::{
    ClientEvent, Config, RustalinkClient,
    common::logger,
    voice::GatewayPayload,
};
use tracing::{info, warn};

/// Connects to the configured nodes and logs their events. Voice payloads
/// are only logged, there is no Discord connection behind this binary.
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "config.toml".to_string());
    let config = Config::load(&path)?;
    logger::init(&config);

    let gateway = Arc::new(|shard_id: u64, payload: GatewayPayload| -> rustalink_client::Result<()> {
        info!("shard {} <- {}", shard_id, payload.d);
        Ok(())
    });
    let client = RustalinkClient::new(config, gateway)?;
    let events = client.subscribe();
    client.start();

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => break,
            event = events.recv_async() => {
                let Ok(event) = event else { break };
                match &event {
                    ClientEvent::NodeConnected { node, session_id, resumed } => {
                        info!("[{}] connected (session {}, resumed={})", node, session_id, resumed)
                    }
                    ClientEvent::NodeDisconnected { node } => warn!("[{}] disconnected", node),
                    other => info!("{} on {}", other.kind(), other.node()),
                }
            }
        }
    }

    info!("shutting down");
    client.shutdown().await;
    Ok(())
}
