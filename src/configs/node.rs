use serde::{Deserialize, Serialize};

use crate::common::errors::{Error, Result};

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct NodeConfig {
  /// Registry key. Defaults to `hostname:port`.
  #[serde(default)]
  pub name: Option<String>,
  pub hostname: String,
  #[serde(default = "default_port")]
  pub port: u16,
  pub password: String,
  #[serde(default)]
  pub secure: bool,
}

fn default_port() -> u16 {
  2333
}

impl NodeConfig {
  pub fn new(hostname: impl Into<String>, password: impl Into<String>) -> Self {
    Self {
      name: None,
      hostname: hostname.into(),
      port: default_port(),
      password: password.into(),
      secure: false,
    }
  }

  pub fn name(&self) -> String {
    self
      .name
      .clone()
      .unwrap_or_else(|| format!("{}:{}", self.hostname, self.port))
  }

  /// REST base, versioned.
  pub fn rest_url(&self) -> String {
    format!("{}/v4", self.http_root())
  }

  /// REST root without the version prefix (`/version` lives here).
  pub fn http_root(&self) -> String {
    let scheme = if self.secure { "https" } else { "http" };
    format!("{}://{}:{}", scheme, self.hostname, self.port)
  }

  pub fn websocket_url(&self) -> String {
    let scheme = if self.secure { "wss" } else { "ws" };
    format!("{}://{}:{}/v4/websocket", scheme, self.hostname, self.port)
  }

  pub fn validate(&self) -> Result<()> {
    if self.hostname.trim().is_empty() {
      return Err(Error::Config("node hostname must not be empty".into()));
    }
    if self.hostname.contains("://") || self.hostname.contains('/') {
      return Err(Error::Config(format!(
        "node hostname '{}' must not contain a scheme or path",
        self.hostname
      )));
    }
    if self.port == 0 {
      return Err(Error::Config(format!("node {} has port 0", self.hostname)));
    }
    if let Some(name) = &self.name {
      if name.trim().is_empty() {
        return Err(Error::Config("node name must not be empty".into()));
      }
    }
    Ok(())
  }
}
