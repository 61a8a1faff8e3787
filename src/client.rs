use std::sync::Arc;

use parking_lot::Mutex;
use serde_json::Value;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::{
    common::{
        errors::Result,
        http::HttpClient,
        types::GuildId,
    },
    configs::{ClientConfig, Config, NodeConfig},
    events::{ClientEvent, Dispatcher, EventBus},
    node::{Node, NodeRegistry, NodeRest, NodeSession, RestClient, spawn_command_worker},
    player::{PlayerHandle, PlayerManager},
    voice::{GatewayForwarder, VoiceCorrelator, VoiceServerUpdate, VoiceStateUpdate},
};

/// Entry point: owns the node pool, the players and the event bus.
///
/// Construct it, subscribe to events, then call [`start`](Self::start) from
/// inside a tokio runtime to connect every node.
pub struct RustalinkClient {
    config: Arc<ClientConfig>,
    nodes: Arc<NodeRegistry>,
    players: Arc<PlayerManager>,
    dispatcher: Arc<Dispatcher>,
    voice: VoiceCorrelator,
    events: Arc<EventBus>,
    cancel_token: CancellationToken,
    tasks: Mutex<Vec<JoinHandle<()>>>,
}

impl RustalinkClient {
    /// Builds a client talking to each node over HTTP.
    pub fn new(config: Config, gateway: Arc<dyn GatewayForwarder>) -> Result<Self> {
        let http = HttpClient::new(Some(&config.client.client_name))?;
        Self::with_rest(config, gateway, |node| {
            Arc::new(RestClient::new(http.clone(), node)) as Arc<dyn NodeRest>
        })
    }

    /// Builds a client whose REST calls go through `rest_for`.
    pub fn with_rest(
        config: Config,
        gateway: Arc<dyn GatewayForwarder>,
        rest_for: impl Fn(&NodeConfig) -> Arc<dyn NodeRest>,
    ) -> Result<Self> {
        config.validate()?;

        let nodes = Arc::new(NodeRegistry::new());
        for node in &config.nodes {
            nodes.register(node.clone(), rest_for(node))?;
        }

        let client = Arc::new(config.client);
        let players = Arc::new(PlayerManager::new(
            nodes.clone(),
            gateway,
            client.queue,
            client.shard_count,
        ));
        let events = Arc::new(EventBus::default());

        Ok(Self {
            voice: VoiceCorrelator::new(client.bot_id, players.clone()),
            dispatcher: Arc::new(Dispatcher::new(players.clone(), events.clone())),
            config: client,
            nodes,
            players,
            events,
            cancel_token: CancellationToken::new(),
            tasks: Mutex::new(Vec::new()),
        })
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Spawns a session and a command worker for every node. Calling it
    /// again is a no-op.
    pub fn start(&self) {
        let mut tasks = self.tasks.lock();
        if !tasks.is_empty() {
            return;
        }

        for node in self.nodes.nodes() {
            tasks.push(spawn_command_worker(node.clone(), self.cancel_token.clone()));
            tasks.push(
                NodeSession::new(
                    node,
                    self.config.clone(),
                    self.dispatcher.clone(),
                    self.events.clone(),
                    self.cancel_token.clone(),
                )
                .spawn(),
            );
        }
        info!("started {} node session(s)", self.nodes.nodes().len());
    }

    pub fn subscribe(&self) -> flume::Receiver<ClientEvent> {
        self.events.subscribe()
    }

    pub fn nodes(&self) -> &Arc<NodeRegistry> {
        &self.nodes
    }

    pub fn node(&self, name: &str) -> Option<Arc<Node>> {
        self.nodes.get(name)
    }

    pub fn players(&self) -> &Arc<PlayerManager> {
        &self.players
    }

    pub fn create_player(&self, guild_id: impl Into<GuildId>) -> Result<PlayerHandle> {
        self.players.create(guild_id)
    }

    pub fn player(&self, guild_id: impl Into<GuildId>) -> Option<PlayerHandle> {
        self.players.get(&guild_id.into())
    }

    pub fn destroy_player(&self, guild_id: impl Into<GuildId>) -> Result<()> {
        self.players.destroy(&guild_id.into())
    }

    pub fn handle_voice_state_update(&self, update: VoiceStateUpdate) {
        self.voice.handle_state_update(update);
    }

    pub fn handle_voice_server_update(&self, update: VoiceServerUpdate) -> Result<()> {
        self.voice.handle_server_update(update)
    }

    /// Feeds a raw gateway dispatch; only the voice events are used.
    pub fn handle_gateway_event(&self, payload: &Value) -> Result<()> {
        self.voice.handle_raw(payload)
    }

    /// Closes every session and waits for the background tasks.
    pub async fn shutdown(&self) {
        self.cancel_token.cancel();
        let tasks: Vec<_> = self.tasks.lock().drain(..).collect();
        for task in tasks {
            let _ = task.await;
        }
        debug!("client shut down");
    }
}

impl Drop for RustalinkClient {
    fn drop(&mut self) {
        self.cancel_token.cancel();
    }
}
