use std::sync::Arc;

use futures::{SinkExt, StreamExt};
use tokio_tungstenite::tungstenite::{
    self,
    client::IntoClientRequest,
    http::{HeaderValue, Request, StatusCode},
    protocol::Message,
};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::{
    common::{
        errors::{Error, Result},
        types::SessionId,
    },
    configs::ClientConfig,
    events::{ClientEvent, DispatchOutcome, Dispatcher, EventBus},
    node::{registry::Node, worker::NodeCommand},
    protocol::SessionUpdate,
};

pub mod backoff;
pub mod types;

use self::backoff::Backoff;
pub use self::types::{SessionOutcome, SessionStatus, is_fatal_close};

/// The WebSocket session of one node: connects, feeds frames to the
/// dispatcher in arrival order and reconnects with backoff until cancelled.
pub struct NodeSession {
    node: Arc<Node>,
    config: Arc<ClientConfig>,
    dispatcher: Arc<Dispatcher>,
    events: Arc<EventBus>,
    cancel_token: CancellationToken,
}

impl NodeSession {
    pub fn new(
        node: Arc<Node>,
        config: Arc<ClientConfig>,
        dispatcher: Arc<Dispatcher>,
        events: Arc<EventBus>,
        cancel_token: CancellationToken,
    ) -> Self {
        Self {
            node,
            config,
            dispatcher,
            events,
            cancel_token,
        }
    }

    pub fn spawn(self) -> tokio::task::JoinHandle<()> {
        tokio::spawn(self.run())
    }

    fn resuming(&self) -> bool {
        self.config.resume_timeout_secs.is_some()
    }

    pub async fn run(self) {
        let name = self.node.name().to_string();
        let mut backoff = Backoff::new(self.config.max_reconnect_attempts);
        let mut resume_key: Option<SessionId> = None;

        loop {
            if self.cancel_token.is_cancelled() {
                break;
            }

            let outcome = self.connect(resume_key.as_ref(), &mut backoff).await;
            if let Err(e) = &outcome {
                self.node.set_status(SessionStatus::Faulted);
                warn!("[{}] session error: {}", name, e);
            }

            let previous = self.node.session_id();
            self.node.set_status(SessionStatus::Disconnected);
            if self.node.mark_disconnected() {
                self.events
                    .publish(ClientEvent::NodeDisconnected { node: name.clone() });
            }
            if self.resuming() && previous.is_some() {
                resume_key = previous;
            }

            match outcome {
                Ok(SessionOutcome::Shutdown) => break,
                Ok(SessionOutcome::Fatal) => {
                    error!("[{}] node rejected the connection, giving up", name);
                    break;
                }
                Ok(SessionOutcome::Reconnect) | Err(_) => {
                    if backoff.is_exhausted() {
                        warn!("[{}] max reconnect attempts reached", name);
                        break;
                    }
                    let delay = backoff.next();
                    info!("[{}] reconnecting in {:?}", name, delay);
                    tokio::select! {
                        _ = self.cancel_token.cancelled() => break,
                        _ = tokio::time::sleep(delay) => {}
                    }
                }
            }
        }

        debug!("[{}] session stopped", name);
    }

    async fn connect(
        &self,
        resume_key: Option<&SessionId>,
        backoff: &mut Backoff,
    ) -> Result<SessionOutcome> {
        self.node.set_status(SessionStatus::Connecting);
        let request = self.build_request(resume_key)?;
        debug!("[{}] connecting to {}", self.node.name(), request.uri());

        let connected = tokio::select! {
            _ = self.cancel_token.cancelled() => return Ok(SessionOutcome::Shutdown),
            result = tokio_tungstenite::connect_async(request) => result,
        };
        let ws_stream = match connected {
            Ok((ws_stream, _)) => ws_stream,
            Err(tungstenite::Error::Http(response))
                if response.status() == StatusCode::UNAUTHORIZED =>
            {
                return Ok(SessionOutcome::Fatal);
            }
            Err(e) => return Err(e.into()),
        };
        self.node.set_status(SessionStatus::Handshaking);
        let (mut write, mut read) = ws_stream.split();

        let outcome = loop {
            tokio::select! {
                _ = self.cancel_token.cancelled() => {
                    self.node.set_status(SessionStatus::Closing);
                    let _ = write.send(Message::Close(None)).await;
                    break SessionOutcome::Shutdown;
                }
                msg = read.next() => {
                    let msg = match msg {
                        Some(Ok(msg)) => msg,
                        Some(Err(e)) => return Err(e.into()),
                        None => {
                            debug!("[{}] WS stream ended", self.node.name());
                            break SessionOutcome::Reconnect;
                        }
                    };

                    match msg {
                        Message::Text(text) => {
                            if let DispatchOutcome::Ready { session_id, resumed } =
                                self.dispatcher.dispatch_text(&self.node, text.as_str())
                            {
                                self.on_ready(session_id, resumed);
                                backoff.reset();
                            }
                        }
                        Message::Close(frame) => {
                            self.node.set_status(SessionStatus::Closing);
                            let (code, reason) = frame
                                .map(|cf| (cf.code.into(), cf.reason.to_string()))
                                .unwrap_or((1000u16, String::new()));
                            info!(
                                "[{}] WS closed: code={}, reason='{}'",
                                self.node.name(),
                                code,
                                reason
                            );
                            if is_fatal_close(code) {
                                break SessionOutcome::Fatal;
                            }
                            break SessionOutcome::Reconnect;
                        }
                        _ => {}
                    }
                }
            }
        };

        Ok(outcome)
    }

    fn build_request(&self, resume_key: Option<&SessionId>) -> Result<Request<()>> {
        let mut request = self.node.config().websocket_url().into_client_request()?;
        let headers = request.headers_mut();
        headers.insert("Authorization", header(&self.node.config().password)?);
        headers.insert("User-Id", header(&self.config.bot_id.to_string())?);
        headers.insert("Num-Shards", header(&self.config.shard_count.to_string())?);
        headers.insert("Client-Name", header(&self.config.client_name)?);
        if let Some(session_id) = resume_key.filter(|_| self.resuming()) {
            headers.insert("Session-Id", header(session_id)?);
        }
        Ok(request)
    }

    fn on_ready(&self, session_id: SessionId, resumed: bool) {
        info!(
            "[{}] ready, session {} (resumed={})",
            self.node.name(),
            session_id,
            resumed
        );
        self.node.set_status(SessionStatus::Active);
        self.node.mark_connected(session_id.clone());

        if let Some(timeout) = self.config.resume_timeout_secs.filter(|_| !resumed) {
            self.node.send(NodeCommand::UpdateSession(SessionUpdate {
                resuming: Some(true),
                timeout: Some(timeout),
            }));
        }

        self.events.publish(ClientEvent::NodeConnected {
            node: self.node.name().to_string(),
            session_id,
            resumed,
        });
    }
}

fn header(value: &str) -> Result<HeaderValue> {
    HeaderValue::from_str(value).map_err(|e| Error::Config(format!("invalid header value: {}", e)))
}
