use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::common::{
    errors::Result,
    types::{ChannelId, GuildId, UserId},
};

/// Sends payloads through the host's Discord gateway connection.
///
/// Implemented by whatever shard manager the bot uses; closures work too.
pub trait GatewayForwarder: Send + Sync {
    fn forward(&self, shard_id: u64, payload: GatewayPayload) -> Result<()>;
}

impl<F> GatewayForwarder for F
where
    F: Fn(u64, GatewayPayload) -> Result<()> + Send + Sync,
{
    fn forward(&self, shard_id: u64, payload: GatewayPayload) -> Result<()> {
        self(shard_id, payload)
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct GatewayPayload {
    pub op: u8,
    pub d: Value,
}

/// Self-mute/self-deaf flags for a voice join.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct VoiceOptions {
    pub self_mute: bool,
    pub self_deaf: bool,
}

impl GatewayPayload {
    /// Op 4 voice state update. `None` leaves the channel.
    pub fn voice_state(guild_id: &GuildId, channel_id: Option<ChannelId>, options: VoiceOptions) -> Self {
        Self {
            op: 4,
            d: serde_json::json!({
                "guild_id": guild_id,
                "channel_id": channel_id.map(|c| c.to_string()),
                "self_mute": options.self_mute,
                "self_deaf": options.self_deaf,
            }),
        }
    }
}

/// Snowflakes arrive as strings on the gateway but as numbers from some
/// libraries' re-serialized models.
#[derive(Deserialize)]
#[serde(untagged)]
enum RawSnowflake {
    Number(u64),
    Text(String),
}

impl RawSnowflake {
    fn into_user_id<E: serde::de::Error>(self) -> std::result::Result<UserId, E> {
        match self {
            Self::Number(id) => Ok(UserId(id)),
            Self::Text(s) => s.parse().map(UserId).map_err(E::custom),
        }
    }

    fn into_text(self) -> String {
        match self {
            Self::Number(id) => id.to_string(),
            Self::Text(s) => s,
        }
    }
}

fn guild_snowflake<'de, D>(deserializer: D) -> std::result::Result<GuildId, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(GuildId(RawSnowflake::deserialize(deserializer)?.into_text()))
}

fn optional_guild_snowflake<'de, D>(deserializer: D) -> std::result::Result<Option<GuildId>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<RawSnowflake>::deserialize(deserializer)?.map(|raw| GuildId(raw.into_text())))
}

fn optional_text_snowflake<'de, D>(deserializer: D) -> std::result::Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<RawSnowflake>::deserialize(deserializer)?.map(RawSnowflake::into_text))
}

fn snowflake<'de, D>(deserializer: D) -> std::result::Result<UserId, D::Error>
where
    D: Deserializer<'de>,
{
    RawSnowflake::deserialize(deserializer)?.into_user_id()
}

fn optional_snowflake<'de, D>(deserializer: D) -> std::result::Result<Option<UserId>, D::Error>
where
    D: Deserializer<'de>,
{
    Option::<RawSnowflake>::deserialize(deserializer)?
        .map(RawSnowflake::into_user_id)
        .transpose()
}

#[derive(Debug, Clone, Deserialize)]
pub struct GatewayUser {
    #[serde(deserialize_with = "snowflake")]
    pub id: UserId,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GatewayMember {
    pub user: GatewayUser,
}

/// `VOICE_STATE_UPDATE` dispatch data.
#[derive(Debug, Clone, Deserialize)]
pub struct VoiceStateUpdate {
    #[serde(default, deserialize_with = "optional_guild_snowflake")]
    pub guild_id: Option<GuildId>,
    #[serde(default, deserialize_with = "optional_text_snowflake")]
    pub channel_id: Option<String>,
    #[serde(default, deserialize_with = "optional_snowflake")]
    pub user_id: Option<UserId>,
    #[serde(default)]
    pub member: Option<GatewayMember>,
    pub session_id: String,
}

impl VoiceStateUpdate {
    pub fn user(&self) -> Option<UserId> {
        self.member
            .as_ref()
            .map(|m| m.user.id)
            .or(self.user_id)
    }
}

/// `VOICE_SERVER_UPDATE` dispatch data.
#[derive(Debug, Clone, Deserialize)]
pub struct VoiceServerUpdate {
    #[serde(deserialize_with = "guild_snowflake")]
    pub guild_id: GuildId,
    pub token: String,
    /// Null while Discord reallocates the voice server.
    pub endpoint: Option<String>,
}
