//! Client for a pool of Lavalink v4 nodes.
//!
//! [`RustalinkClient`] keeps one WebSocket session per node, places each
//! guild's player on the least loaded node, mirrors player and queue state
//! from node events and correlates Discord voice updates into the credentials
//! a node needs to join a voice channel.

pub mod client;
pub mod common;
pub mod configs;
pub mod events;
pub mod node;
pub mod player;
pub mod protocol;
pub mod voice;

#[cfg(test)]
pub(crate) mod testing;

pub use client::RustalinkClient;
pub use common::errors::{Error, Result};
pub use configs::Config;
pub use events::ClientEvent;
pub use player::{PlayerHandle, PlayerSnapshot};
