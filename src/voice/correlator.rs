use std::sync::Arc;

use dashmap::DashMap;
use serde_json::Value;
use tracing::{debug, trace};

use crate::{
    common::{
        errors::{Error, Result},
        types::{GuildId, UserId},
    },
    player::PlayerManager,
    protocol::{PlayerUpdate, VoiceState},
    voice::gateway::{VoiceServerUpdate, VoiceStateUpdate},
};

/// Pairs the bot's voice session id with the voice server that follows it
/// and hands the merged credentials to the guild's player.
///
/// Discord sends the two halves in no particular order; a server update
/// without a stored session id is dropped, and repeated state updates
/// overwrite each other.
pub struct VoiceCorrelator {
    bot_id: UserId,
    pending: DashMap<GuildId, String>,
    players: Arc<PlayerManager>,
}

impl VoiceCorrelator {
    pub fn new(bot_id: UserId, players: Arc<PlayerManager>) -> Self {
        Self {
            bot_id,
            pending: DashMap::new(),
            players,
        }
    }

    pub fn pending_session(&self, guild_id: &GuildId) -> Option<String> {
        self.pending.get(guild_id).map(|s| s.value().clone())
    }

    pub fn handle_state_update(&self, update: VoiceStateUpdate) {
        if update.user() != Some(self.bot_id) {
            return;
        }
        let Some(guild_id) = update.guild_id else {
            return;
        };

        if update.channel_id.is_none() {
            if self.pending.remove(&guild_id).is_some() {
                debug!("[{}] left voice, dropped pending session", guild_id);
            }
            return;
        }

        trace!("[{}] voice session {}", guild_id, update.session_id);
        self.pending.insert(guild_id, update.session_id);
    }

    pub fn handle_server_update(&self, update: VoiceServerUpdate) -> Result<()> {
        let Some(endpoint) = update.endpoint else {
            trace!("[{}] voice server pending reallocation", update.guild_id);
            return Ok(());
        };
        let Some((guild_id, session_id)) = self.pending.remove(&update.guild_id) else {
            trace!("[{}] voice server without a session, dropped", update.guild_id);
            return Ok(());
        };

        let voice = VoiceState {
            token: update.token,
            endpoint,
            session_id,
        };
        match self
            .players
            .update(&guild_id, PlayerUpdate::voice(voice), false)
        {
            Err(Error::NoSuchPlayer(_)) => {
                debug!("[{}] voice credentials for unknown player", guild_id);
                Ok(())
            }
            other => other,
        }
    }

    /// Entry point for raw gateway dispatches (`{"t": ..., "d": ...}`).
    /// Anything other than the two voice events is ignored.
    pub fn handle_raw(&self, payload: &Value) -> Result<()> {
        let Some(kind) = payload.get("t").and_then(Value::as_str) else {
            return Ok(());
        };
        let data = payload.get("d").cloned().unwrap_or(Value::Null);

        match kind {
            "VOICE_STATE_UPDATE" => {
                self.handle_state_update(serde_json::from_value(data)?);
                Ok(())
            }
            "VOICE_SERVER_UPDATE" => self.handle_server_update(serde_json::from_value(data)?),
            _ => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        node::{Node, NodeCommand},
        testing::{MockGateway, connected_node, drain_commands},
    };
    use serde_json::json;

    const BOT: u64 = 1234;

    fn fixture() -> (VoiceCorrelator, Arc<PlayerManager>, Arc<Node>) {
        let (registry, node, _rest) = connected_node("a");
        let players = Arc::new(PlayerManager::new(
            registry,
            Arc::new(MockGateway::default()),
            true,
            1,
        ));
        (
            VoiceCorrelator::new(UserId(BOT), players.clone()),
            players,
            node,
        )
    }

    fn state(guild: &str, user: u64, session: &str) -> Value {
        json!({
            "t": "VOICE_STATE_UPDATE",
            "d": {
                "guild_id": guild,
                "channel_id": "99",
                "user_id": user.to_string(),
                "session_id": session,
            }
        })
    }

    fn server(guild: &str, endpoint: Option<&str>) -> Value {
        json!({
            "t": "VOICE_SERVER_UPDATE",
            "d": { "guild_id": guild, "token": "tok", "endpoint": endpoint }
        })
    }

    fn voice_updates(node: &Node) -> Vec<VoiceState> {
        drain_commands(node)
            .into_iter()
            .filter_map(|c| match c {
                NodeCommand::UpdatePlayer { update, .. } => update.voice,
                _ => None,
            })
            .collect()
    }

    #[test]
    fn test_state_then_server_forwards_credentials() {
        let (correlator, players, node) = fixture();
        let handle = players.create("1").unwrap();

        correlator.handle_raw(&state("1", BOT, "sess")).unwrap();
        assert_eq!(correlator.pending_session(&"1".into()).as_deref(), Some("sess"));
        correlator
            .handle_raw(&server("1", Some("us-east.discord.media")))
            .unwrap();

        let expected = VoiceState {
            token: "tok".into(),
            endpoint: "us-east.discord.media".into(),
            session_id: "sess".into(),
        };
        assert_eq!(voice_updates(&node), vec![expected.clone()]);
        assert_eq!(correlator.pending_session(&"1".into()), None);
        assert_eq!(handle.snapshot().unwrap().voice, Some(expected));
    }

    #[test]
    fn test_server_before_state_is_dropped() {
        let (correlator, players, node) = fixture();
        players.create("1").unwrap();

        correlator.handle_raw(&server("1", Some("ep"))).unwrap();
        assert!(voice_updates(&node).is_empty());

        // the next pair still completes normally
        correlator.handle_raw(&state("1", BOT, "sess")).unwrap();
        correlator.handle_raw(&server("1", Some("ep"))).unwrap();
        assert_eq!(voice_updates(&node).len(), 1);
    }

    #[test]
    fn test_repeated_state_last_write_wins() {
        let (correlator, players, node) = fixture();
        players.create("1").unwrap();

        correlator.handle_raw(&state("1", BOT, "first")).unwrap();
        correlator.handle_raw(&state("1", BOT, "second")).unwrap();
        correlator.handle_raw(&server("1", Some("ep"))).unwrap();

        let updates = voice_updates(&node);
        assert_eq!(updates.len(), 1);
        assert_eq!(updates[0].session_id, "second");
    }

    #[test]
    fn test_other_users_and_null_endpoint_ignored() {
        let (correlator, players, node) = fixture();
        players.create("1").unwrap();

        correlator.handle_raw(&state("1", 5678, "someone-else")).unwrap();
        assert_eq!(correlator.pending_session(&"1".into()), None);

        correlator.handle_raw(&state("1", BOT, "sess")).unwrap();
        correlator.handle_raw(&server("1", None)).unwrap();
        assert!(voice_updates(&node).is_empty());
        // still waiting for the real endpoint
        assert_eq!(correlator.pending_session(&"1".into()).as_deref(), Some("sess"));
    }

    #[test]
    fn test_leaving_channel_clears_pending() {
        let (correlator, _players, _node) = fixture();
        correlator.handle_raw(&state("1", BOT, "sess")).unwrap();
        correlator
            .handle_raw(&json!({
                "t": "VOICE_STATE_UPDATE",
                "d": { "guild_id": "1", "channel_id": null, "user_id": BOT.to_string(), "session_id": "sess" }
            }))
            .unwrap();
        assert_eq!(correlator.pending_session(&"1".into()), None);
    }

    #[test]
    fn test_missing_player_is_not_an_error() {
        let (correlator, _players, node) = fixture();
        correlator.handle_raw(&state("1", BOT, "sess")).unwrap();
        correlator.handle_raw(&server("1", Some("ep"))).unwrap();
        assert!(voice_updates(&node).is_empty());
        assert_eq!(correlator.pending_session(&"1".into()), None);
    }

    #[test]
    fn test_unrelated_dispatches_ignored() {
        let (correlator, _players, _node) = fixture();
        correlator
            .handle_raw(&json!({ "t": "MESSAGE_CREATE", "d": {} }))
            .unwrap();
        correlator.handle_raw(&json!({ "op": 11 })).unwrap();
        assert!(matches!(
            correlator.handle_raw(&json!({ "t": "VOICE_SERVER_UPDATE", "d": {} })),
            Err(Error::Json(_))
        ));
    }
}
