use serde::{Deserialize, Serialize};

/// Node statistics, pushed over the WebSocket and served by `GET /stats`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Stats {
  pub players: i32,
  pub playing_players: i32,
  #[serde(default)]
  pub uptime: u64,
  #[serde(default)]
  pub memory: Memory,
  pub cpu: Cpu,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub frame_stats: Option<FrameStats>,
}

impl Stats {
  /// Load score used for node selection: `(systemLoad / cores) * 100`.
  ///
  /// A node reporting zero cores is scored as single-core.
  pub fn load_score(&self) -> f64 {
    let cores = self.cpu.cores.max(1) as f64;
    (self.cpu.system_load / cores) * 100.0
  }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Memory {
  pub free: u64,
  pub used: u64,
  pub allocated: u64,
  pub reservable: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Cpu {
  pub cores: i32,
  pub system_load: f64,
  #[serde(default)]
  pub lavalink_load: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FrameStats {
  pub sent: i32,
  pub nulled: i32,
  pub deficit: i32,
}
