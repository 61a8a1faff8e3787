use std::sync::Arc;

use tracing::{debug, trace, warn};

use crate::{
    common::types::{GuildId, SessionId},
    events::{ClientEvent, EventBus},
    node::Node,
    player::{PlayerManager, PlayerSnapshot, state::Player},
    protocol::{IncomingMessage, NodeEvent, TrackEndReason},
};

/// What the session loop should do after a frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// Handshake finished.
    Ready {
        session_id: SessionId,
        resumed: bool,
    },
    Handled,
    Ignored,
}

/// Routes decoded frames to the node registry, the players and the bus.
pub struct Dispatcher {
    players: Arc<PlayerManager>,
    events: Arc<EventBus>,
}

impl Dispatcher {
    pub fn new(players: Arc<PlayerManager>, events: Arc<EventBus>) -> Self {
        Self { players, events }
    }

    /// Decodes and dispatches one text frame. Undecodable frames are skipped.
    pub fn dispatch_text(&self, node: &Node, text: &str) -> DispatchOutcome {
        match IncomingMessage::parse(text) {
            Ok(message) => self.dispatch(node, message),
            Err(e) => {
                warn!("[{}] undecodable frame: {} ({})", node.name(), e, text);
                DispatchOutcome::Ignored
            }
        }
    }

    pub fn dispatch(&self, node: &Node, message: IncomingMessage) -> DispatchOutcome {
        match message {
            IncomingMessage::Ready {
                resumed,
                session_id,
            } => DispatchOutcome::Ready {
                session_id,
                resumed,
            },
            IncomingMessage::Stats(stats) => {
                trace!(
                    "[{}] stats: {} players, load {:.2}",
                    node.name(),
                    stats.players,
                    stats.load_score()
                );
                node.update_stats(stats);
                DispatchOutcome::Handled
            }
            IncomingMessage::PlayerUpdate { guild_id, state } => {
                self.with_player(node, &guild_id, |player| player.record_state(state))
                    .map_or(DispatchOutcome::Ignored, |_| DispatchOutcome::Handled)
            }
            IncomingMessage::Event(event) => self.dispatch_event(node, event),
            IncomingMessage::Unknown => {
                trace!("[{}] ignoring unknown op", node.name());
                DispatchOutcome::Ignored
            }
        }
    }

    fn dispatch_event(&self, node: &Node, event: NodeEvent) -> DispatchOutcome {
        let Some(guild_id) = event.guild_id().cloned() else {
            trace!("[{}] ignoring unknown event type", node.name());
            return DispatchOutcome::Ignored;
        };
        let name = node.name().to_string();

        let event = match event {
            NodeEvent::TrackStart { track, .. } => {
                let Some(player) = self.with_player(node, &guild_id, |p| p.snapshot()) else {
                    return DispatchOutcome::Ignored;
                };
                ClientEvent::TrackStart {
                    node: name,
                    guild_id,
                    player,
                    track,
                }
            }
            NodeEvent::TrackEnd { track, reason, .. } => {
                let Some(player) = self.finish_track(node, &guild_id, Some(reason)) else {
                    return DispatchOutcome::Ignored;
                };
                ClientEvent::TrackEnd {
                    node: name,
                    guild_id,
                    player,
                    track,
                    reason,
                }
            }
            NodeEvent::TrackException {
                track, exception, ..
            } => {
                warn!(
                    "[{}] [{}] track exception: {}",
                    name,
                    guild_id,
                    exception.message.as_deref().unwrap_or("unknown")
                );
                let Some(player) = self.finish_track(node, &guild_id, None) else {
                    return DispatchOutcome::Ignored;
                };
                ClientEvent::TrackException {
                    node: name,
                    guild_id,
                    player,
                    track,
                    exception,
                }
            }
            NodeEvent::TrackStuck {
                track,
                threshold_ms,
                ..
            } => {
                let Some(player) = self.with_player(node, &guild_id, |p| p.snapshot()) else {
                    return DispatchOutcome::Ignored;
                };
                ClientEvent::TrackStuck {
                    node: name,
                    guild_id,
                    player,
                    track,
                    threshold_ms,
                }
            }
            NodeEvent::WebSocketClosed {
                code,
                reason,
                by_remote,
                ..
            } => {
                let Some(player) = self.with_player(node, &guild_id, |p| p.snapshot()) else {
                    return DispatchOutcome::Ignored;
                };
                ClientEvent::WebSocketClosed {
                    node: name,
                    guild_id,
                    player,
                    code,
                    reason,
                    by_remote,
                }
            }
            NodeEvent::Unknown => return DispatchOutcome::Ignored,
        };

        self.events.publish(event);
        DispatchOutcome::Handled
    }

    fn finish_track(
        &self,
        node: &Node,
        guild_id: &GuildId,
        reason: Option<TrackEndReason>,
    ) -> Option<PlayerSnapshot> {
        self.with_player(node, guild_id, |player| {
            player.finish_track(reason);
            player.snapshot()
        })
    }

    /// Runs `f` under the guild's lock. `None` when no player exists or it
    /// was destroyed after the lookup.
    fn with_player<T>(
        &self,
        node: &Node,
        guild_id: &GuildId,
        f: impl FnOnce(&mut Player) -> T,
    ) -> Option<T> {
        let Some(player) = self.players.entity(guild_id) else {
            debug!("[{}] [{}] frame for unknown player, ignoring", node.name(), guild_id);
            return None;
        };
        let mut player = player.lock();
        if player.ensure_alive().is_err() {
            debug!("[{}] [{}] player destroyed in flight, ignoring", node.name(), guild_id);
            return None;
        }
        Some(f(&mut player))
    }
}
