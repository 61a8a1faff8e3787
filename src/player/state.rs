use std::{collections::VecDeque, sync::Arc};

use serde::Serialize;
use tracing::debug;

use crate::{
    common::{
        errors::{Error, Result},
        types::GuildId,
    },
    node::{Node, NodeCommand},
    protocol::{PlayerState, PlayerUpdate, TrackEndReason, VoiceState},
};

/// Highest volume a node accepts.
pub const MAX_VOLUME: u16 = 1000;

/// How a player tracks what it plays. Fixed when the player is created.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlayerMode {
    /// Index 0 is the track currently playing or about to play.
    Queued(VecDeque<String>),
    Single(Option<String>),
}

impl PlayerMode {
    pub fn new(queue_enabled: bool) -> Self {
        if queue_enabled {
            Self::Queued(VecDeque::new())
        } else {
            Self::Single(None)
        }
    }

    pub fn current(&self) -> Option<&String> {
        match self {
            Self::Queued(queue) => queue.front(),
            Self::Single(track) => track.as_ref(),
        }
    }
}

/// Result of [`Player::skip`]. `skipped` is false when the queue was empty.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SkipOutcome {
    pub skipped: bool,
    pub queue: Vec<String>,
}

/// Read-only copy of a player, handed out to callers and carried by events.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerSnapshot {
    pub guild_id: GuildId,
    pub node: String,
    pub connected: bool,
    pub playing: bool,
    pub paused: bool,
    pub volume: Option<u16>,
    pub track: Option<String>,
    /// `None` when queueing is disabled.
    pub queue: Option<Vec<String>>,
    pub state: PlayerState,
    pub voice: Option<VoiceState>,
    pub filters: Option<serde_json::Value>,
}

/// Local state of one guild's player.
///
/// Every method runs under the guild's lock and never awaits; remote effects
/// are queued on the owning node's command worker.
pub struct Player {
    guild_id: GuildId,
    node: Arc<Node>,
    connected: bool,
    playing: bool,
    paused: bool,
    volume: Option<u16>,
    mode: PlayerMode,
    state: PlayerState,
    voice: Option<VoiceState>,
    filters: Option<serde_json::Value>,
    destroyed: bool,
}

impl Player {
    pub fn new(guild_id: GuildId, node: Arc<Node>, queue_enabled: bool) -> Self {
        Self {
            guild_id,
            node,
            connected: false,
            playing: false,
            paused: false,
            volume: None,
            mode: PlayerMode::new(queue_enabled),
            state: PlayerState::default(),
            voice: None,
            filters: None,
            destroyed: false,
        }
    }

    pub fn guild_id(&self) -> &GuildId {
        &self.guild_id
    }

    pub fn node(&self) -> &Arc<Node> {
        &self.node
    }

    pub fn mode(&self) -> &PlayerMode {
        &self.mode
    }

    pub fn current_track(&self) -> Option<&String> {
        self.mode.current()
    }

    pub fn is_playing(&self) -> bool {
        self.playing
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }

    pub fn is_connected(&self) -> bool {
        self.connected
    }

    pub fn volume(&self) -> Option<u16> {
        self.volume
    }

    pub(crate) fn ensure_alive(&self) -> Result<()> {
        if self.destroyed {
            return Err(Error::NoSuchPlayer(self.guild_id.clone()));
        }
        Ok(())
    }

    pub(crate) fn mark_destroyed(&mut self) {
        self.destroyed = true;
        self.playing = false;
    }

    pub(crate) fn set_connected(&mut self, connected: bool) {
        self.connected = connected;
    }

    /// Stores a `playerUpdate` frame. Play/pause/queue state is untouched.
    pub(crate) fn record_state(&mut self, state: PlayerState) {
        if self.destroyed {
            return;
        }
        self.connected = state.connected;
        self.state = state;
    }

    /// Merges a command into local state and queues whatever part of it the
    /// node still has to see.
    pub fn apply_update(&mut self, mut update: PlayerUpdate, no_replace: bool) -> Result<()> {
        self.ensure_alive()?;
        self.validate(&update)?;

        let mut started = false;
        if let Some(batch) = update.encoded_tracks.take() {
            let PlayerMode::Queued(queue) = &mut self.mode else {
                return Err(Error::QueueDisabled);
            };
            if queue.is_empty() {
                update.encoded_track = Some(batch.first().cloned());
                queue.extend(batch);
                started = true;
            } else {
                debug!("[{}] queued {} tracks", self.guild_id, batch.len());
                queue.extend(batch);
            }
        }

        match update.encoded_track.clone() {
            Some(Some(track)) if !started => match &mut self.mode {
                PlayerMode::Queued(queue) => {
                    queue.push_back(track);
                    if queue.len() > 1 {
                        // dispatched when the current track ends
                        update.encoded_track = None;
                        debug!("[{}] queued track at position {}", self.guild_id, queue.len() - 1);
                    } else {
                        started = true;
                    }
                }
                PlayerMode::Single(current) => {
                    if !(no_replace && current.is_some()) {
                        *current = Some(track);
                        started = true;
                    }
                }
            },
            Some(None) => {
                match &mut self.mode {
                    PlayerMode::Queued(queue) => queue.clear(),
                    PlayerMode::Single(current) => *current = None,
                }
                self.playing = false;
            }
            _ => {}
        }

        if let Some(paused) = update.paused {
            self.paused = paused;
        }
        if started || update.paused.is_some() {
            self.playing = self.mode.current().is_some() && !self.paused;
        }
        if let Some(volume) = update.volume {
            self.volume = Some(volume);
        }
        if let Some(filters) = &update.filters {
            self.filters = Some(filters.clone());
        }
        if let Some(voice) = &update.voice {
            self.voice = Some(voice.clone());
        }

        if update != PlayerUpdate::default() {
            self.node.send(NodeCommand::UpdatePlayer {
                guild_id: self.guild_id.clone(),
                update,
                no_replace,
            });
        }
        Ok(())
    }

    fn validate(&self, update: &PlayerUpdate) -> Result<()> {
        if update.volume.is_some_and(|v| v > MAX_VOLUME) {
            return Err(Error::Validation(format!(
                "volume must be between 0 and {}",
                MAX_VOLUME
            )));
        }
        if let Some(batch) = &update.encoded_tracks {
            if batch.is_empty() {
                return Err(Error::Validation("track batch is empty".into()));
            }
            if update.encoded_track.is_some() {
                return Err(Error::Validation(
                    "encodedTrack and a track batch are mutually exclusive".into(),
                ));
            }
        }
        Ok(())
    }

    /// Applies a `TrackEndEvent` or `TrackExceptionEvent`. Exceptions carry
    /// no reason and always move on.
    pub(crate) fn finish_track(&mut self, reason: Option<TrackEndReason>) {
        if self.destroyed {
            return;
        }
        if reason.is_some_and(|r| !r.may_start_next()) {
            return;
        }

        match &mut self.mode {
            PlayerMode::Queued(queue) => {
                queue.pop_front();
                if let Some(next) = queue.front().cloned() {
                    debug!("[{}] advancing queue, {} left", self.guild_id, queue.len());
                    self.node.send(NodeCommand::UpdatePlayer {
                        guild_id: self.guild_id.clone(),
                        update: PlayerUpdate::track(next),
                        no_replace: false,
                    });
                    return;
                }
            }
            PlayerMode::Single(current) => *current = None,
        }

        self.playing = false;
        self.volume = None;
    }

    pub fn skip(&mut self) -> Result<SkipOutcome> {
        self.ensure_alive()?;
        let PlayerMode::Queued(queue) = &mut self.mode else {
            return Err(Error::QueueDisabled);
        };

        if queue.pop_front().is_none() {
            return Ok(SkipOutcome {
                skipped: false,
                queue: Vec::new(),
            });
        }

        let update = match queue.front() {
            Some(next) => PlayerUpdate::track(next.clone()),
            None => PlayerUpdate::stop(),
        };
        let queue: Vec<String> = queue.iter().cloned().collect();
        if queue.is_empty() {
            self.playing = false;
        }

        self.node.send(NodeCommand::UpdatePlayer {
            guild_id: self.guild_id.clone(),
            update,
            no_replace: false,
        });
        Ok(SkipOutcome {
            skipped: true,
            queue,
        })
    }

    pub fn queue(&self) -> Result<Vec<String>> {
        self.ensure_alive()?;
        match &self.mode {
            PlayerMode::Queued(queue) => Ok(queue.iter().cloned().collect()),
            PlayerMode::Single(_) => Err(Error::QueueDisabled),
        }
    }

    pub fn snapshot(&self) -> PlayerSnapshot {
        PlayerSnapshot {
            guild_id: self.guild_id.clone(),
            node: self.node.name().to_string(),
            connected: self.connected,
            playing: self.playing,
            paused: self.paused,
            volume: self.volume,
            track: self.mode.current().cloned(),
            queue: match &self.mode {
                PlayerMode::Queued(queue) => Some(queue.iter().cloned().collect()),
                PlayerMode::Single(_) => None,
            },
            state: self.state.clone(),
            voice: self.voice.clone(),
            filters: self.filters.clone(),
        }
    }
}

impl std::fmt::Debug for Player {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Player")
            .field("guild_id", &self.guild_id)
            .field("node", &self.node.name())
            .field("playing", &self.playing)
            .field("paused", &self.paused)
            .field("mode", &self.mode)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{connected_node, drain_commands};

    fn player(queue: bool) -> (Player, Arc<Node>) {
        let (_registry, node, _rest) = connected_node("a");
        (Player::new("1".into(), node.clone(), queue), node)
    }

    fn patched(node: &Node) -> Vec<PlayerUpdate> {
        drain_commands(node)
            .into_iter()
            .filter_map(|c| match c {
                NodeCommand::UpdatePlayer { update, .. } => Some(update),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn test_queue_appends_and_patches_only_first() {
        let (mut player, node) = player(true);
        player.apply_update(PlayerUpdate::track("A"), false).unwrap();
        player.apply_update(PlayerUpdate::track("B"), false).unwrap();

        assert_eq!(patched(&node), vec![PlayerUpdate::track("A")]);
        assert_eq!(player.queue().unwrap(), vec!["A", "B"]);
        assert!(player.is_playing());

        player.finish_track(Some(TrackEndReason::Finished));
        assert_eq!(patched(&node), vec![PlayerUpdate::track("B")]);
        assert_eq!(player.queue().unwrap(), vec!["B"]);
        assert!(player.is_playing());
    }

    #[test]
    fn test_single_track_cleared_on_end() {
        let (mut player, node) = player(false);
        player.apply_update(PlayerUpdate::track("A"), false).unwrap();
        player.apply_update(PlayerUpdate::volume(80), false).unwrap();
        assert_eq!(player.current_track().map(String::as_str), Some("A"));
        assert!(player.is_playing());
        assert_eq!(patched(&node).len(), 2);

        player.finish_track(Some(TrackEndReason::Finished));
        assert_eq!(player.current_track(), None);
        assert!(!player.is_playing());
        assert_eq!(player.volume(), None);
        assert!(patched(&node).is_empty());
    }

    #[test]
    fn test_replaced_never_pops() {
        let (mut player, node) = player(true);
        player
            .apply_update(PlayerUpdate::tracks(vec!["A".into(), "B".into()]), false)
            .unwrap();
        drain_commands(&node);

        player.finish_track(Some(TrackEndReason::Replaced));
        assert_eq!(player.queue().unwrap(), vec!["A", "B"]);
        assert!(patched(&node).is_empty());

        let (mut single, _node) = self::player(false);
        single.apply_update(PlayerUpdate::track("X"), false).unwrap();
        single.finish_track(Some(TrackEndReason::Replaced));
        assert_eq!(single.current_track().map(String::as_str), Some("X"));
    }

    #[test]
    fn test_other_reasons_pop_exactly_one() {
        for reason in [
            TrackEndReason::Finished,
            TrackEndReason::LoadFailed,
            TrackEndReason::Stopped,
            TrackEndReason::Cleanup,
            TrackEndReason::Unknown,
        ] {
            let (mut player, _node) = player(true);
            player
                .apply_update(
                    PlayerUpdate::tracks(vec!["A".into(), "B".into(), "C".into()]),
                    false,
                )
                .unwrap();
            player.finish_track(Some(reason));
            assert_eq!(player.queue().unwrap(), vec!["B", "C"], "{reason:?}");
        }
    }

    #[test]
    fn test_destroyed_player_ignores_track_end() {
        let (mut player, node) = player(true);
        player
            .apply_update(PlayerUpdate::tracks(vec!["A".into(), "B".into()]), false)
            .unwrap();
        drain_commands(&node);

        player.mark_destroyed();
        player.finish_track(Some(TrackEndReason::Finished));
        player.finish_track(None);
        player.record_state(PlayerState {
            connected: true,
            ..Default::default()
        });

        assert!(drain_commands(&node).is_empty());
        assert!(!player.is_connected());
        assert!(matches!(player.queue(), Err(Error::NoSuchPlayer(_))));
    }

    #[test]
    fn test_exception_advances_queue() {
        let (mut player, node) = player(true);
        player
            .apply_update(PlayerUpdate::tracks(vec!["A".into(), "B".into()]), false)
            .unwrap();
        drain_commands(&node);

        player.finish_track(None);
        assert_eq!(player.queue().unwrap(), vec!["B"]);
        assert_eq!(patched(&node), vec![PlayerUpdate::track("B")]);
    }

    #[test]
    fn test_queue_drained_stops_playing() {
        let (mut player, node) = player(true);
        player.apply_update(PlayerUpdate::track("A"), false).unwrap();
        player.apply_update(PlayerUpdate::volume(50), false).unwrap();
        drain_commands(&node);

        player.finish_track(Some(TrackEndReason::Finished));
        assert!(player.queue().unwrap().is_empty());
        assert!(!player.is_playing());
        assert_eq!(player.volume(), None);
        assert!(patched(&node).is_empty());
    }

    #[test]
    fn test_batch_adopted_then_appended() {
        let (mut player, node) = player(true);
        player
            .apply_update(PlayerUpdate::tracks(vec!["A".into(), "B".into()]), false)
            .unwrap();
        player
            .apply_update(PlayerUpdate::tracks(vec!["C".into()]), false)
            .unwrap();

        assert_eq!(patched(&node), vec![PlayerUpdate::track("A")]);
        assert_eq!(player.queue().unwrap(), vec!["A", "B", "C"]);
    }

    #[test]
    fn test_batch_rules() {
        let (mut single, _node) = player(false);
        assert!(matches!(
            single.apply_update(PlayerUpdate::tracks(vec!["A".into()]), false),
            Err(Error::QueueDisabled)
        ));

        let (mut queued, node) = player(true);
        assert!(matches!(
            queued.apply_update(PlayerUpdate::tracks(Vec::new()), false),
            Err(Error::Validation(_))
        ));
        assert!(queued.queue().unwrap().is_empty());
        assert!(drain_commands(&node).is_empty());
    }

    #[test]
    fn test_volume_validated_and_mirrored() {
        let (mut player, node) = player(false);
        assert!(matches!(
            player.apply_update(PlayerUpdate::volume(1001), false),
            Err(Error::Validation(_))
        ));
        assert!(drain_commands(&node).is_empty());

        player.apply_update(PlayerUpdate::volume(1000), false).unwrap();
        assert_eq!(player.volume(), Some(1000));
    }

    #[test]
    fn test_pause_mirrored() {
        let (mut player, _node) = player(false);
        player.apply_update(PlayerUpdate::paused(true), false).unwrap();
        assert!(player.is_paused());
        assert!(!player.is_playing());

        player.apply_update(PlayerUpdate::track("A"), false).unwrap();
        assert!(!player.is_playing());

        player.apply_update(PlayerUpdate::paused(false), false).unwrap();
        assert!(player.is_playing());
        assert!(!player.is_paused());
    }

    #[test]
    fn test_no_replace_keeps_current_single_track() {
        let (mut player, node) = player(false);
        player.apply_update(PlayerUpdate::track("A"), false).unwrap();
        player.apply_update(PlayerUpdate::track("B"), true).unwrap();
        assert_eq!(player.current_track().map(String::as_str), Some("A"));

        let commands = drain_commands(&node);
        assert!(matches!(
            commands.last(),
            Some(NodeCommand::UpdatePlayer { no_replace: true, .. })
        ));
    }

    #[test]
    fn test_stop_clears_queue() {
        let (mut player, node) = player(true);
        player
            .apply_update(PlayerUpdate::tracks(vec!["A".into(), "B".into()]), false)
            .unwrap();
        drain_commands(&node);

        player.apply_update(PlayerUpdate::stop(), false).unwrap();
        assert!(player.queue().unwrap().is_empty());
        assert!(!player.is_playing());
        assert_eq!(patched(&node), vec![PlayerUpdate::stop()]);
    }

    #[test]
    fn test_skip() {
        let (mut single, _node) = player(false);
        assert!(matches!(single.skip(), Err(Error::QueueDisabled)));

        let (mut player, node) = player(true);
        let outcome = player.skip().unwrap();
        assert!(!outcome.skipped);
        assert!(drain_commands(&node).is_empty());

        player
            .apply_update(PlayerUpdate::tracks(vec!["A".into(), "B".into()]), false)
            .unwrap();
        drain_commands(&node);

        let outcome = player.skip().unwrap();
        assert!(outcome.skipped);
        assert_eq!(outcome.queue, vec!["B"]);
        assert_eq!(patched(&node), vec![PlayerUpdate::track("B")]);

        let outcome = player.skip().unwrap();
        assert!(outcome.queue.is_empty());
        assert_eq!(patched(&node), vec![PlayerUpdate::stop()]);
        assert!(!player.is_playing());
    }

    #[test]
    fn test_queue_head_is_last_patched_track() {
        let (mut player, node) = player(true);
        let mut last = None;
        let mut check = |player: &Player, node: &Node| {
            if let Some(update) = patched(node).into_iter().rev().find_map(|u| u.encoded_track) {
                last = update;
            }
            if let Some(head) = player.queue().unwrap().first() {
                assert_eq!(last.as_ref(), Some(head));
            }
        };

        player.apply_update(PlayerUpdate::track("A"), false).unwrap();
        check(&player, &node);
        player
            .apply_update(PlayerUpdate::tracks(vec!["B".into(), "C".into()]), false)
            .unwrap();
        check(&player, &node);
        player.finish_track(Some(TrackEndReason::Finished));
        check(&player, &node);
        player.finish_track(Some(TrackEndReason::Replaced));
        check(&player, &node);
        player.skip().unwrap();
        check(&player, &node);
        player.apply_update(PlayerUpdate::track("D"), false).unwrap();
        check(&player, &node);
        player.finish_track(Some(TrackEndReason::Finished));
        check(&player, &node);
    }

    #[test]
    fn test_destroyed_player_rejects_commands() {
        let (mut player, _node) = player(true);
        player.mark_destroyed();
        assert!(matches!(
            player.apply_update(PlayerUpdate::track("A"), false),
            Err(Error::NoSuchPlayer(_))
        ));
        assert!(matches!(player.skip(), Err(Error::NoSuchPlayer(_))));
        assert!(matches!(player.queue(), Err(Error::NoSuchPlayer(_))));
    }

    #[test]
    fn test_player_update_frame_keeps_play_state() {
        let (mut player, _node) = player(false);
        player.apply_update(PlayerUpdate::track("A"), false).unwrap();
        player.record_state(PlayerState {
            time: 1,
            position: 500,
            connected: true,
            ping: 20,
        });
        let snapshot = player.snapshot();
        assert!(snapshot.connected);
        assert!(snapshot.playing);
        assert_eq!(snapshot.state.position, 500);
        assert_eq!(snapshot.track.as_deref(), Some("A"));
        assert_eq!(snapshot.queue, None);
    }
}
