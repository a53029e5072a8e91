use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{MessageId, ThreadId};

/// One row of the chat preview listing
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PreviewDto {
    pub id: ThreadId,
    pub name: String,
    #[serde(default)]
    pub last_message: Option<String>,
    #[serde(default)]
    pub last_update: Option<DateTime<Utc>>,
    #[serde(default)]
    pub last_message_type: Option<String>,
    #[serde(default)]
    pub has_unread: bool,
    #[serde(default)]
    pub is_locked: bool,
    #[serde(default)]
    pub has_messages: bool,
}

/// Message as delivered by the history endpoint and the realtime channel
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MessageBackendDto {
    pub id: MessageId,
    pub chat_id: ThreadId,
    pub sender: String,
    pub content: String,
    pub message_type: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub sent_by_user: bool,
}

/// Response of the history endpoint
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryPage {
    pub messages: Vec<MessageBackendDto>,
    pub has_more: bool,
}

/// Ephemeral credential used once to open the realtime connection
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SocketToken {
    pub access_token: String,
}

/// Frame written to the realtime channel
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutboundFrame {
    pub chat_id: ThreadId,
    pub content: String,
}

impl OutboundFrame {
    pub fn text(chat_id: ThreadId, content: impl Into<String>) -> Self {
        Self {
            chat_id,
            content: content.into(),
        }
    }
}
