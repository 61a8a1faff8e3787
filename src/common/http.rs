use std::time::Duration;

use reqwest::{Client, Error};

const DEFAULT_USER_AGENT: &str = concat!("rustalink-client/", env!("CARGO_PKG_VERSION"));

pub struct HttpClient;

impl HttpClient {
  pub fn default_user_agent() -> String {
    DEFAULT_USER_AGENT.to_string()
  }

  /// Shared client for every node's REST surface.
  pub fn new(user_agent: Option<&str>) -> Result<Client, Error> {
    Client::builder()
      .user_agent(user_agent.map(str::to_string).unwrap_or_else(Self::default_user_agent))
      .timeout(Duration::from_secs(10))
      .build()
  }
}
