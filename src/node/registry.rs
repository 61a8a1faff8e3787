use std::{collections::HashSet, sync::Arc};

use parking_lot::{Mutex, RwLock};
use tracing::{debug, warn};

use crate::{
    common::{
        errors::{Error, Result},
        types::{GuildId, SessionId},
    },
    configs::NodeConfig,
    node::{rest::NodeRest, session::SessionStatus, worker::NodeCommand},
    protocol::Stats,
};

#[derive(Debug, Default)]
struct NodeState {
    /// `Some` exactly while the node is connected.
    session_id: Option<SessionId>,
    stats: Option<Stats>,
    status: SessionStatus,
    /// Guilds whose player lives on this node.
    players: HashSet<GuildId>,
}

/// One configured node: identity, REST access and live state.
pub struct Node {
    name: String,
    config: NodeConfig,
    state: Mutex<NodeState>,
    rest: Arc<dyn NodeRest>,
    commands: flume::Sender<NodeCommand>,
    command_rx: flume::Receiver<NodeCommand>,
}

impl Node {
    fn new(config: NodeConfig, rest: Arc<dyn NodeRest>) -> Self {
        let (commands, command_rx) = flume::unbounded();
        Self {
            name: config.name(),
            config,
            state: Mutex::new(NodeState::default()),
            rest,
            commands,
            command_rx,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn config(&self) -> &NodeConfig {
        &self.config
    }

    pub fn rest(&self) -> &Arc<dyn NodeRest> {
        &self.rest
    }

    pub fn is_connected(&self) -> bool {
        self.state.lock().session_id.is_some()
    }

    pub fn session_id(&self) -> Option<SessionId> {
        self.state.lock().session_id.clone()
    }

    pub fn stats(&self) -> Option<Stats> {
        self.state.lock().stats.clone()
    }

    pub fn status(&self) -> SessionStatus {
        self.state.lock().status
    }

    /// Load score, `None` while disconnected. Nodes that haven't reported
    /// stats yet score zero.
    pub fn score(&self) -> Option<f64> {
        let state = self.state.lock();
        state.session_id.as_ref()?;
        Some(state.stats.as_ref().map(Stats::load_score).unwrap_or(0.0))
    }

    pub fn player_count(&self) -> usize {
        self.state.lock().players.len()
    }

    pub fn has_player(&self, guild_id: &GuildId) -> bool {
        self.state.lock().players.contains(guild_id)
    }

    pub(crate) fn mark_connected(&self, session_id: SessionId) {
        let mut state = self.state.lock();
        state.session_id = Some(session_id);
        state.status = SessionStatus::Active;
    }

    /// Returns whether the node was connected before the call.
    pub(crate) fn mark_disconnected(&self) -> bool {
        let mut state = self.state.lock();
        state.status = SessionStatus::Disconnected;
        state.session_id.take().is_some()
    }

    pub(crate) fn set_status(&self, status: SessionStatus) {
        let mut state = self.state.lock();
        if state.status != status {
            debug!("[{}] session {} -> {}", self.name, state.status, status);
            state.status = status;
        }
    }

    pub(crate) fn update_stats(&self, stats: Stats) {
        self.state.lock().stats = Some(stats);
    }

    pub(crate) fn claim_slot(&self, guild_id: GuildId) {
        self.state.lock().players.insert(guild_id);
    }

    pub(crate) fn release_slot(&self, guild_id: &GuildId) {
        self.state.lock().players.remove(guild_id);
    }

    /// Queues a fire-and-forget REST call for the command worker.
    pub(crate) fn send(&self, command: NodeCommand) {
        if self.commands.send(command).is_err() {
            warn!("[{}] command queue closed, dropping command", self.name);
        }
    }

    pub(crate) fn command_receiver(&self) -> flume::Receiver<NodeCommand> {
        self.command_rx.clone()
    }
}

impl std::fmt::Debug for Node {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Node")
            .field("name", &self.name)
            .field("state", &*self.state.lock())
            .finish()
    }
}

/// All configured nodes, in registration order.
#[derive(Default)]
pub struct NodeRegistry {
    nodes: RwLock<Vec<Arc<Node>>>,
}

impl NodeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Validates and inserts a node in the disconnected state.
    pub fn register(&self, config: NodeConfig, rest: Arc<dyn NodeRest>) -> Result<Arc<Node>> {
        config.validate()?;

        let mut nodes = self.nodes.write();
        let name = config.name();
        if nodes.iter().any(|n| n.name == name) {
            return Err(Error::Config(format!("node '{}' is already registered", name)));
        }

        let node = Arc::new(Node::new(config, rest));
        nodes.push(node.clone());
        Ok(node)
    }

    pub fn get(&self, name: &str) -> Option<Arc<Node>> {
        self.nodes.read().iter().find(|n| n.name == name).cloned()
    }

    pub fn nodes(&self) -> Vec<Arc<Node>> {
        self.nodes.read().clone()
    }

    pub fn connected(&self) -> Vec<Arc<Node>> {
        self.nodes
            .read()
            .iter()
            .filter(|n| n.is_connected())
            .cloned()
            .collect()
    }

    pub fn mark_connected(&self, name: &str, session_id: SessionId) -> Result<()> {
        self.require(name)?.mark_connected(session_id);
        Ok(())
    }

    pub fn mark_disconnected(&self, name: &str) -> Result<()> {
        self.require(name)?.mark_disconnected();
        Ok(())
    }

    pub fn update_stats(&self, name: &str, stats: Stats) -> Result<()> {
        self.require(name)?.update_stats(stats);
        Ok(())
    }

    /// The connected node with the lowest load score. Ties go to the node
    /// registered first.
    pub fn select_best(&self) -> Result<Arc<Node>> {
        let nodes = self.nodes.read();
        let mut best: Option<(&Arc<Node>, f64)> = None;

        for node in nodes.iter() {
            let Some(score) = node.score() else { continue };
            match best {
                Some((_, record)) if score >= record => {}
                _ => best = Some((node, score)),
            }
        }

        best.map(|(node, _)| node.clone())
            .ok_or(Error::NoNodeAvailable)
    }

    fn require(&self, name: &str) -> Result<Arc<Node>> {
        self.get(name)
            .ok_or_else(|| Error::NoSuchNode(name.to_string()))
    }
}
