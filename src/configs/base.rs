use std::{collections::HashSet, path::Path};

use serde::{Deserialize, Serialize};

use crate::{
  common::errors::{Error, Result},
  configs::*,
};

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct Config {
  pub client: ClientConfig,
  pub nodes: Vec<NodeConfig>,
  #[serde(default)]
  pub logging: Option<LoggingConfig>,
}

impl Config {
  pub fn new(client: ClientConfig, nodes: Vec<NodeConfig>) -> Result<Self> {
    let config = Self {
      client,
      nodes,
      logging: None,
    };
    config.validate()?;
    Ok(config)
  }

  pub fn load(path: impl AsRef<Path>) -> Result<Self> {
    let path = path.as_ref();
    if !path.exists() {
      return Err(Error::Config(format!("{} not found", path.display())));
    }

    let config_str = std::fs::read_to_string(path)?;
    if config_str.trim().is_empty() {
      return Err(Error::Config(format!("{} is empty", path.display())));
    }

    tracing::debug!("Loading configuration from: {}", path.display());
    Self::from_toml_str(&config_str)
  }

  pub fn from_toml_str(raw: &str) -> Result<Self> {
    let config: Config = toml::from_str(raw)?;
    config.validate()?;
    Ok(config)
  }

  pub fn validate(&self) -> Result<()> {
    self.client.validate()?;

    if self.nodes.is_empty() {
      return Err(Error::Config("at least one node must be configured".into()));
    }

    let mut names = HashSet::new();
    for node in &self.nodes {
      node.validate()?;
      if !names.insert(node.name()) {
        return Err(Error::Config(format!("duplicate node name '{}'", node.name())));
      }
    }

    Ok(())
  }
}
