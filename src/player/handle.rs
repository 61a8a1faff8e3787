use std::sync::Arc;

use crate::{
    common::{
        errors::{Error, Result},
        types::{ChannelId, GuildId, Shared},
    },
    node::{Node, NodeRest},
    player::{
        manager::PlayerManager,
        state::{Player, PlayerSnapshot, SkipOutcome},
    },
    protocol::{LoadResult, PlayerUpdate, Track},
    voice::{GatewayPayload, VoiceOptions},
};

/// Cheap, cloneable access to one guild's player.
///
/// Stays valid after the player is destroyed, at which point every call
/// fails with [`Error::NoSuchPlayer`].
#[derive(Clone)]
pub struct PlayerHandle {
    guild_id: GuildId,
    player: Shared<Player>,
    manager: Arc<PlayerManager>,
}

impl PlayerHandle {
    pub(crate) fn new(guild_id: GuildId, player: Shared<Player>, manager: Arc<PlayerManager>) -> Self {
        Self {
            guild_id,
            player,
            manager,
        }
    }

    pub fn guild_id(&self) -> &GuildId {
        &self.guild_id
    }

    /// The node this player lives on.
    pub fn node(&self) -> Result<Arc<Node>> {
        let player = self.player.lock();
        player.ensure_alive()?;
        Ok(player.node().clone())
    }

    fn rest(&self) -> Result<Arc<dyn NodeRest>> {
        Ok(self.node()?.rest().clone())
    }

    /// Joins `channel_id` through the host's gateway connection.
    pub fn attach_voice(&self, channel_id: ChannelId, options: VoiceOptions) -> Result<()> {
        self.voice_state(Some(channel_id), options)?;
        self.player.lock().set_connected(true);
        Ok(())
    }

    /// Leaves the voice channel.
    pub fn detach_voice(&self) -> Result<()> {
        self.voice_state(None, VoiceOptions::default())?;
        self.player.lock().set_connected(false);
        Ok(())
    }

    fn voice_state(&self, channel_id: Option<ChannelId>, options: VoiceOptions) -> Result<()> {
        self.player.lock().ensure_alive()?;
        let shard_id = self.guild_id.shard_id(self.manager.shard_count());
        let payload = GatewayPayload::voice_state(&self.guild_id, channel_id, options);
        // forwarded outside the player lock, the host may call straight back in
        self.manager.gateway().forward(shard_id, payload)
    }

    pub fn update(&self, update: PlayerUpdate, no_replace: bool) -> Result<()> {
        self.player.lock().apply_update(update, no_replace)
    }

    pub fn play(&self, encoded_track: impl Into<String>) -> Result<()> {
        self.update(PlayerUpdate::track(encoded_track), false)
    }

    /// Queues a batch of tracks. Requires queueing.
    pub fn play_all(&self, encoded_tracks: Vec<String>) -> Result<()> {
        self.update(PlayerUpdate::tracks(encoded_tracks), false)
    }

    pub fn pause(&self, paused: bool) -> Result<()> {
        self.update(PlayerUpdate::paused(paused), false)
    }

    pub fn set_volume(&self, volume: u16) -> Result<()> {
        self.update(PlayerUpdate::volume(volume), false)
    }

    pub fn seek(&self, position_ms: u64) -> Result<()> {
        self.update(PlayerUpdate::position(position_ms), false)
    }

    pub fn set_filters(&self, filters: serde_json::Value) -> Result<()> {
        self.update(PlayerUpdate::filters(filters), false)
    }

    pub fn stop(&self) -> Result<()> {
        self.update(PlayerUpdate::stop(), false)
    }

    pub fn skip(&self) -> Result<SkipOutcome> {
        self.player.lock().skip()
    }

    pub fn queue(&self) -> Result<Vec<String>> {
        self.player.lock().queue()
    }

    pub fn snapshot(&self) -> Result<PlayerSnapshot> {
        let player = self.player.lock();
        player.ensure_alive()?;
        Ok(player.snapshot())
    }

    /// Destroys this player. Fails with [`Error::NoSuchPlayer`] when it is
    /// already gone, even if a new player exists for the same guild.
    pub fn destroy(&self) -> Result<()> {
        self.player.lock().ensure_alive()?;
        self.manager.destroy_entity(&self.guild_id, &self.player)
    }

    pub async fn load_tracks(&self, identifier: &str) -> Result<LoadResult> {
        require("identifier", identifier)?;
        self.rest()?.load_tracks(identifier).await
    }

    pub async fn get_captions(&self, encoded_track: &str) -> Result<serde_json::Value> {
        require("encoded track", encoded_track)?;
        self.rest()?.load_captions(encoded_track, None).await
    }

    pub async fn load_captions(
        &self,
        encoded_track: &str,
        language: &str,
    ) -> Result<serde_json::Value> {
        require("encoded track", encoded_track)?;
        require("language", language)?;
        self.rest()?
            .load_captions(encoded_track, Some(language))
            .await
    }

    pub async fn decode_track(&self, encoded_track: &str) -> Result<Track> {
        require("encoded track", encoded_track)?;
        self.rest()?.decode_track(encoded_track).await
    }

    pub async fn decode_tracks(&self, encoded_tracks: &[String]) -> Result<Vec<Track>> {
        if encoded_tracks.is_empty() {
            return Err(Error::Validation("no tracks to decode".into()));
        }
        for track in encoded_tracks {
            require("encoded track", track)?;
        }
        self.rest()?.decode_tracks(encoded_tracks).await
    }
}

fn require(what: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(Error::Validation(format!("{what} must not be empty")));
    }
    Ok(())
}

impl std::fmt::Debug for PlayerHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PlayerHandle")
            .field("guild_id", &self.guild_id)
            .finish()
    }
}
