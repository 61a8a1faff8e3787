use serde::{Deserialize, Serialize};

use crate::common::{
  errors::{Error, Result},
  types::UserId,
};

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ClientConfig {
  pub bot_id: UserId,
  #[serde(default = "default_shard_count")]
  pub shard_count: u32,
  /// Players hold an ordered queue instead of a single track.
  #[serde(default)]
  pub queue: bool,
  #[serde(default)]
  pub debug: bool,
  #[serde(default = "default_client_name")]
  pub client_name: String,
  /// Unbounded when absent.
  #[serde(default)]
  pub max_reconnect_attempts: Option<u32>,
  /// Enables session resuming with this timeout.
  #[serde(default)]
  pub resume_timeout_secs: Option<u64>,
}

fn default_shard_count() -> u32 {
  1
}

fn default_client_name() -> String {
  concat!("rustalink-client/", env!("CARGO_PKG_VERSION")).to_string()
}

impl ClientConfig {
  pub fn new(bot_id: impl Into<UserId>) -> Self {
    Self {
      bot_id: bot_id.into(),
      shard_count: default_shard_count(),
      queue: false,
      debug: false,
      client_name: default_client_name(),
      max_reconnect_attempts: None,
      resume_timeout_secs: None,
    }
  }

  pub fn validate(&self) -> Result<()> {
    if self.bot_id.0 == 0 {
      return Err(Error::Config("bot_id must be set".into()));
    }
    if self.shard_count == 0 {
      return Err(Error::Config("shard_count must be at least 1".into()));
    }
    if self.client_name.trim().is_empty() {
      return Err(Error::Config("client_name must not be empty".into()));
    }
    Ok(())
  }
}
