use serde::{Deserialize, Serialize};

/// Response of `GET /routeplanner/status`. Nodes without a route planner
/// answer 204, which the REST client maps to `None`.
#[derive(Debug, Deserialize, Clone)]
#[serde(tag = "class", content = "details")]
pub enum RoutePlannerStatus {
  RotatingIpRoutePlanner(RotatingIpDetails),
  NanoIpRoutePlanner(NanoIpDetails),
  RotatingNanoIpRoutePlanner(RotatingNanoIpDetails),
  BalancingIpRoutePlanner(BalancingIpDetails),
}

impl RoutePlannerStatus {
  pub fn failing_addresses(&self) -> &[FailingAddress] {
    match self {
      Self::RotatingIpRoutePlanner(d) => &d.failing_addresses,
      Self::NanoIpRoutePlanner(d) => &d.failing_addresses,
      Self::RotatingNanoIpRoutePlanner(d) => &d.failing_addresses,
      Self::BalancingIpRoutePlanner(d) => &d.failing_addresses,
    }
  }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct RotatingIpDetails {
  pub ip_block: IpBlock,
  pub failing_addresses: Vec<FailingAddress>,
  pub rotate_index: String,
  pub ip_index: String,
  pub current_address: String,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct NanoIpDetails {
  pub ip_block: IpBlock,
  pub failing_addresses: Vec<FailingAddress>,
  pub current_address_index: String,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct RotatingNanoIpDetails {
  pub ip_block: IpBlock,
  pub failing_addresses: Vec<FailingAddress>,
  pub block_index: String,
  pub current_address_index: String,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct BalancingIpDetails {
  pub ip_block: IpBlock,
  pub failing_addresses: Vec<FailingAddress>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct IpBlock {
  #[serde(rename = "type")]
  pub block_type: String,
  pub size: String,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct FailingAddress {
  pub failing_address: String,
  pub failing_timestamp: u64,
  pub failing_time: String,
}

/// Body of `POST /routeplanner/free/address`.
#[derive(Debug, Serialize)]
pub struct FreeAddressRequest<'a> {
  pub address: &'a str,
}
