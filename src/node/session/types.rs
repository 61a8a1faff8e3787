/// Lifecycle of a node's WebSocket session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SessionStatus {
    #[default]
    Disconnected,
    Connecting,
    Handshaking,
    Active,
    Closing,
    Faulted,
}

impl std::fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Disconnected => "disconnected",
            Self::Connecting => "connecting",
            Self::Handshaking => "handshaking",
            Self::Active => "active",
            Self::Closing => "closing",
            Self::Faulted => "faulted",
        };
        f.write_str(s)
    }
}

/// Outcome of a single WS session, tells the outer loop what to do next.
#[derive(Debug, PartialEq, Eq)]
pub enum SessionOutcome {
    /// Connection lost; reconnect after backoff, resuming when possible.
    Reconnect,
    /// The node rejected our credentials; retrying won't help.
    Fatal,
    /// Client shutdown.
    Shutdown,
}

/// Close codes after which reconnecting is pointless.
///
/// - `4001`: Authentication failed
/// - `4004`: Authentication failed (legacy nodes)
pub fn is_fatal_close(code: u16) -> bool {
    matches!(code, 4001 | 4004)
}
