use std::sync::Arc;

use dashmap::{DashMap, mapref::entry::Entry};
use parking_lot::Mutex;
use tracing::{debug, info};

use crate::{
    common::{
        errors::{Error, Result},
        types::{GuildId, Shared},
    },
    node::{NodeCommand, NodeRegistry},
    player::{handle::PlayerHandle, state::Player},
    protocol::PlayerUpdate,
    voice::GatewayForwarder,
};

/// Alias for the per-guild player registry.
pub type PlayerMap = DashMap<GuildId, Shared<Player>>;

/// Owns every player and the collaborators their commands need.
pub struct PlayerManager {
    players: PlayerMap,
    nodes: Arc<NodeRegistry>,
    gateway: Arc<dyn GatewayForwarder>,
    queue_enabled: bool,
    shard_count: u32,
}

impl PlayerManager {
    pub fn new(
        nodes: Arc<NodeRegistry>,
        gateway: Arc<dyn GatewayForwarder>,
        queue_enabled: bool,
        shard_count: u32,
    ) -> Self {
        Self {
            players: DashMap::new(),
            nodes,
            gateway,
            queue_enabled,
            shard_count,
        }
    }

    pub fn queue_enabled(&self) -> bool {
        self.queue_enabled
    }

    pub(crate) fn gateway(&self) -> &Arc<dyn GatewayForwarder> {
        &self.gateway
    }

    pub(crate) fn shard_count(&self) -> u32 {
        self.shard_count
    }

    /// Creates a player for `guild_id` on the least loaded node.
    pub fn create(self: &Arc<Self>, guild_id: impl Into<GuildId>) -> Result<PlayerHandle> {
        let guild_id = guild_id.into();
        if guild_id.trim().is_empty() {
            return Err(Error::Validation("guild id must not be empty".into()));
        }
        if self.players.contains_key(&guild_id) {
            return Err(Error::PlayerAlreadyExists(guild_id));
        }

        let node = self.nodes.select_best()?;
        let player = match self.players.entry(guild_id.clone()) {
            Entry::Occupied(_) => return Err(Error::PlayerAlreadyExists(guild_id)),
            Entry::Vacant(entry) => {
                let player = Arc::new(Mutex::new(Player::new(
                    guild_id.clone(),
                    node.clone(),
                    self.queue_enabled,
                )));
                entry.insert(player.clone());
                player
            }
        };
        node.claim_slot(guild_id.clone());

        info!("[{}] player created on node {}", guild_id, node.name());
        Ok(PlayerHandle::new(guild_id, player, self.clone()))
    }

    pub fn get(self: &Arc<Self>, guild_id: &GuildId) -> Option<PlayerHandle> {
        let player = self.entity(guild_id)?;
        Some(PlayerHandle::new(guild_id.clone(), player, self.clone()))
    }

    pub fn contains(&self, guild_id: &GuildId) -> bool {
        self.players.contains_key(guild_id)
    }

    pub fn len(&self) -> usize {
        self.players.len()
    }

    pub fn is_empty(&self) -> bool {
        self.players.is_empty()
    }

    pub fn guilds(&self) -> Vec<GuildId> {
        self.players.iter().map(|p| p.key().clone()).collect()
    }

    pub(crate) fn entity(&self, guild_id: &GuildId) -> Option<Shared<Player>> {
        self.players.get(guild_id).map(|p| p.value().clone())
    }

    /// Runs [`Player::apply_update`] for `guild_id`.
    pub fn update(&self, guild_id: &GuildId, update: PlayerUpdate, no_replace: bool) -> Result<()> {
        let player = self
            .entity(guild_id)
            .ok_or_else(|| Error::NoSuchPlayer(guild_id.clone()))?;
        let mut player = player.lock();
        player.apply_update(update, no_replace)
    }

    /// Removes the player, frees its node slot and deletes it remotely.
    pub fn destroy(&self, guild_id: &GuildId) -> Result<()> {
        let (_, player) = self
            .players
            .remove(guild_id)
            .ok_or_else(|| Error::NoSuchPlayer(guild_id.clone()))?;
        Self::teardown(guild_id, &player);
        Ok(())
    }

    /// Like [`destroy`](Self::destroy), but only when `guild_id` still maps
    /// to `player`. A newer player created for the same guild is left alone.
    pub(crate) fn destroy_entity(&self, guild_id: &GuildId, player: &Shared<Player>) -> Result<()> {
        let (_, player) = self
            .players
            .remove_if(guild_id, |_, current| Arc::ptr_eq(current, player))
            .ok_or_else(|| Error::NoSuchPlayer(guild_id.clone()))?;
        Self::teardown(guild_id, &player);
        Ok(())
    }

    fn teardown(guild_id: &GuildId, player: &Shared<Player>) {
        let mut player = player.lock();
        player.mark_destroyed();
        let node = player.node().clone();
        node.release_slot(guild_id);
        // sent under the guild lock so no dispatch-driven PATCH can follow it
        node.send(NodeCommand::DestroyPlayer {
            guild_id: guild_id.clone(),
        });

        debug!("[{}] player destroyed on node {}", guild_id, node.name());
    }
}
