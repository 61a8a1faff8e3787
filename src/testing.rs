//! Recording doubles for the REST and gateway seams.

use std::{sync::Arc, time::Duration};

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::sync::Notify;

use crate::{
    common::{
        errors::{Error, Result},
        types::{GuildId, SessionId},
    },
    configs::NodeConfig,
    node::{Node, NodeRegistry, NodeRest},
    protocol::{
        Info, LoadResult, PlayerUpdate, RemotePlayer, RoutePlannerStatus, SessionInfo,
        SessionUpdate, Stats, Track, TrackInfo,
    },
    voice::{GatewayForwarder, GatewayPayload},
};

#[derive(Debug, Clone, PartialEq)]
pub enum RestCall {
    LoadTracks(String),
    LoadCaptions {
        encoded_track: String,
        language: Option<String>,
    },
    DecodeTrack(String),
    DecodeTracks(Vec<String>),
    UpdatePlayer {
        session_id: SessionId,
        guild_id: GuildId,
        update: PlayerUpdate,
        no_replace: bool,
    },
    DestroyPlayer {
        session_id: SessionId,
        guild_id: GuildId,
    },
    UpdateSession {
        session_id: SessionId,
        update: SessionUpdate,
    },
}

#[derive(Default)]
pub struct MockRest {
    calls: Mutex<Vec<RestCall>>,
    fail_next: Mutex<Option<u16>>,
    load_result: Mutex<Option<LoadResult>>,
    notify: Notify,
}

impl MockRest {
    pub fn calls(&self) -> Vec<RestCall> {
        self.calls.lock().clone()
    }

    /// The next recorded call fails with `status`.
    pub fn fail_next(&self, status: u16) {
        *self.fail_next.lock() = Some(status);
    }

    pub fn set_load_result(&self, result: LoadResult) {
        *self.load_result.lock() = Some(result);
    }

    /// Waits until at least `n` calls were recorded. Panics after 2s.
    pub async fn wait_for_calls(&self, n: usize) {
        tokio::time::timeout(Duration::from_secs(2), async {
            loop {
                let notified = self.notify.notified();
                if self.calls.lock().len() >= n {
                    return;
                }
                notified.await;
            }
        })
        .await
        .expect("timed out waiting for rest calls");
    }

    fn record(&self, call: RestCall) -> Result<()> {
        self.calls.lock().push(call);
        self.notify.notify_waiters();
        match self.fail_next.lock().take() {
            Some(status) => Err(Error::remote(status, "")),
            None => Ok(()),
        }
    }
}

pub fn track(encoded: &str) -> Track {
    Track {
        encoded: encoded.to_string(),
        info: TrackInfo {
            identifier: encoded.to_string(),
            title: encoded.to_string(),
            ..Default::default()
        },
        plugin_info: serde_json::json!({}),
        user_data: serde_json::json!({}),
    }
}

fn unmocked<T>(what: &str) -> Result<T> {
    Err(Error::Remote {
        status: 501,
        message: format!("{what} is not mocked"),
    })
}

#[async_trait]
impl NodeRest for MockRest {
    async fn load_tracks(&self, identifier: &str) -> Result<LoadResult> {
        self.record(RestCall::LoadTracks(identifier.to_string()))?;
        Ok(self
            .load_result
            .lock()
            .clone()
            .unwrap_or(LoadResult::Empty {}))
    }

    async fn load_captions(
        &self,
        encoded_track: &str,
        language: Option<&str>,
    ) -> Result<serde_json::Value> {
        self.record(RestCall::LoadCaptions {
            encoded_track: encoded_track.to_string(),
            language: language.map(str::to_string),
        })?;
        Ok(serde_json::json!({ "captions": [] }))
    }

    async fn decode_track(&self, encoded_track: &str) -> Result<Track> {
        self.record(RestCall::DecodeTrack(encoded_track.to_string()))?;
        Ok(track(encoded_track))
    }

    async fn decode_tracks(&self, encoded_tracks: &[String]) -> Result<Vec<Track>> {
        self.record(RestCall::DecodeTracks(encoded_tracks.to_vec()))?;
        Ok(encoded_tracks.iter().map(|t| track(t)).collect())
    }

    async fn get_players(&self, _session_id: &SessionId) -> Result<Vec<RemotePlayer>> {
        Ok(Vec::new())
    }

    async fn get_player(&self, _session_id: &SessionId, guild_id: &GuildId) -> Result<RemotePlayer> {
        Err(Error::NoSuchPlayer(guild_id.clone()))
    }

    async fn update_player(
        &self,
        session_id: &SessionId,
        guild_id: &GuildId,
        update: &PlayerUpdate,
        no_replace: bool,
    ) -> Result<()> {
        self.record(RestCall::UpdatePlayer {
            session_id: session_id.clone(),
            guild_id: guild_id.clone(),
            update: update.clone(),
            no_replace,
        })
    }

    async fn destroy_player(&self, session_id: &SessionId, guild_id: &GuildId) -> Result<()> {
        self.record(RestCall::DestroyPlayer {
            session_id: session_id.clone(),
            guild_id: guild_id.clone(),
        })
    }

    async fn update_session(
        &self,
        session_id: &SessionId,
        update: &SessionUpdate,
    ) -> Result<SessionInfo> {
        self.record(RestCall::UpdateSession {
            session_id: session_id.clone(),
            update: update.clone(),
        })?;
        Ok(SessionInfo {
            resuming: update.resuming.unwrap_or(false),
            timeout: update.timeout.unwrap_or(60),
        })
    }

    async fn info(&self) -> Result<Info> {
        unmocked("info")
    }

    async fn stats(&self) -> Result<Stats> {
        Ok(Stats::default())
    }

    async fn version(&self) -> Result<String> {
        Ok("4.0.0".to_string())
    }

    async fn routeplanner_status(&self) -> Result<Option<RoutePlannerStatus>> {
        Ok(None)
    }

    async fn free_address(&self, _address: &str) -> Result<()> {
        unmocked("free_address")
    }

    async fn free_all_addresses(&self) -> Result<()> {
        unmocked("free_all_addresses")
    }
}

/// Records every op 4 payload with the shard it was routed to.
#[derive(Default)]
pub struct MockGateway {
    sent: Mutex<Vec<(u64, GatewayPayload)>>,
}

impl MockGateway {
    pub fn sent(&self) -> Vec<(u64, GatewayPayload)> {
        self.sent.lock().clone()
    }
}

impl GatewayForwarder for MockGateway {
    fn forward(&self, shard_id: u64, payload: GatewayPayload) -> Result<()> {
        self.sent.lock().push((shard_id, payload));
        Ok(())
    }
}

/// A registry holding one connected node named `name`, backed by a fresh
/// [`MockRest`].
pub fn connected_node(name: &str) -> (Arc<NodeRegistry>, Arc<Node>, Arc<MockRest>) {
    let registry = Arc::new(NodeRegistry::new());
    let rest = Arc::new(MockRest::default());
    let mut config = NodeConfig::new("localhost", "youshallnotpass");
    config.name = Some(name.to_string());
    let node = registry
        .register(config, rest.clone())
        .expect("valid node config");
    node.mark_connected(format!("session-{name}").into());
    (registry, node, rest)
}

/// Everything queued on the node's command worker so far.
pub fn drain_commands(node: &Node) -> Vec<crate::node::NodeCommand> {
    node.command_receiver().try_iter().collect()
}
