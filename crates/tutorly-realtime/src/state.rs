use serde::{Deserialize, Serialize};
use tutorly_types::MessageRecord;

/// Lifecycle of the realtime connection
///
/// `Disconnected -> Connecting -> Open -> Closed -> Connecting ...`; an explicit
/// close moves to `Disconnected` from any state and ends the session's
/// transport for good.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Open,
    Closed,
}

impl ConnectionState {
    pub fn is_open(&self) -> bool {
        matches!(self, ConnectionState::Open)
    }
}

/// Everything the transport reports to its owner, in arrival order
#[derive(Debug, Clone, PartialEq)]
pub enum TransportEvent {
    /// Decoded inbound message
    Message(MessageRecord),

    StateChanged(ConnectionState),

    /// Connection lost and the reconnect attempt failed
    Failed(String),
}
