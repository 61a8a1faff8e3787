use serde::{Deserialize, Serialize};

use crate::protocol::tracks::Track;

/// Player position/transport state, as carried by `playerUpdate` frames.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerState {
    /// Unix timestamp in milliseconds.
    pub time: u64,
    /// Playback position in milliseconds.
    #[serde(default)]
    pub position: u64,
    /// Whether the node is connected to the voice gateway.
    pub connected: bool,
    /// Voice gateway ping in milliseconds. -1 if not connected.
    #[serde(default = "default_ping")]
    pub ping: i64,
}

fn default_ping() -> i64 {
    -1
}

/// Voice credentials handed to the node.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VoiceState {
    pub token: String,
    pub endpoint: String,
    pub session_id: String,
}

/// Player as reported by `GET /sessions/{id}/players`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemotePlayer {
    pub guild_id: crate::common::types::GuildId,
    pub track: Option<Track>,
    pub volume: i32,
    pub paused: bool,
    pub state: PlayerState,
    #[serde(default)]
    pub voice: Option<VoiceState>,
    #[serde(default)]
    pub filters: serde_json::Value,
}

/// Body of `PATCH /sessions/{sessionId}/players/{guildId}`.
///
/// `encoded_tracks` never leaves the process: it is the batch form the
/// player's queue understands, and is folded into `encoded_track` before a
/// request is built.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerUpdate {
    /// `Some(None)` serializes as `null` and stops the current track.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub encoded_track: Option<Option<String>>,
    #[serde(skip)]
    pub encoded_tracks: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub identifier: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub position: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end_time: Option<Option<u64>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub volume: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub paused: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filters: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub voice: Option<VoiceState>,
}

impl PlayerUpdate {
    pub fn track(encoded: impl Into<String>) -> Self {
        Self {
            encoded_track: Some(Some(encoded.into())),
            ..Default::default()
        }
    }

    pub fn tracks(encoded: Vec<String>) -> Self {
        Self {
            encoded_tracks: Some(encoded),
            ..Default::default()
        }
    }

    pub fn stop() -> Self {
        Self {
            encoded_track: Some(None),
            ..Default::default()
        }
    }

    pub fn paused(paused: bool) -> Self {
        Self {
            paused: Some(paused),
            ..Default::default()
        }
    }

    pub fn volume(volume: u16) -> Self {
        Self {
            volume: Some(volume),
            ..Default::default()
        }
    }

    pub fn position(position: u64) -> Self {
        Self {
            position: Some(position),
            ..Default::default()
        }
    }

    pub fn filters(filters: serde_json::Value) -> Self {
        Self {
            filters: Some(filters),
            ..Default::default()
        }
    }

    pub fn voice(voice: VoiceState) -> Self {
        Self {
            voice: Some(voice),
            ..Default::default()
        }
    }
}
