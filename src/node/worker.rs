use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::{
    common::{
        errors::{Error, Result},
        types::GuildId,
    },
    node::registry::Node,
    protocol::{PlayerUpdate, SessionUpdate},
};

/// Fire-and-forget REST calls, executed in order by the node's worker.
#[derive(Debug, Clone, PartialEq)]
pub enum NodeCommand {
    UpdatePlayer {
        guild_id: GuildId,
        update: PlayerUpdate,
        no_replace: bool,
    },
    DestroyPlayer {
        guild_id: GuildId,
    },
    UpdateSession(SessionUpdate),
}

/// Drains the node's command queue until cancelled. Failures are logged
/// and never reach whoever queued the command.
pub fn spawn_command_worker(
    node: Arc<Node>,
    cancel: CancellationToken,
) -> tokio::task::JoinHandle<()> {
    let rx = node.command_receiver();
    tokio::spawn(async move {
        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                command = rx.recv_async() => {
                    let Ok(command) = command else { break };
                    if let Err(e) = execute(&node, &command).await {
                        warn!("[{}] {:?} failed: {}", node.name(), command, e);
                    }
                }
            }
        }
        debug!("[{}] command worker stopped", node.name());
    })
}

pub(crate) async fn execute(node: &Node, command: &NodeCommand) -> Result<()> {
    let session_id = node
        .session_id()
        .ok_or_else(|| Error::NotConnected(node.name().to_string()))?;
    let rest = node.rest();

    match command {
        NodeCommand::UpdatePlayer {
            guild_id,
            update,
            no_replace,
        } => {
            rest.update_player(&session_id, guild_id, update, *no_replace)
                .await
        }
        NodeCommand::DestroyPlayer { guild_id } => rest.destroy_player(&session_id, guild_id).await,
        NodeCommand::UpdateSession(update) => {
            let info = rest.update_session(&session_id, update).await?;
            debug!(
                "[{}] session resuming={} timeout={}s",
                node.name(),
                info.resuming,
                info.timeout
            );
            Ok(())
        }
    }
}
