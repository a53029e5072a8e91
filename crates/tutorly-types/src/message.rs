use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

use crate::dto::MessageBackendDto;
use crate::preview::TUTOR_REQUEST_LABEL;
use crate::{MessageId, ThreadId, UserId};

/// Discriminant of a message payload
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageKind {
    Text,
    TutorRequest,
}

impl MessageKind {
    /// Parse the backend `message_type` field. Unknown values yield `None`.
    pub fn from_wire(value: &str) -> Option<Self> {
        match value.to_ascii_lowercase().as_str() {
            "text" => Some(MessageKind::Text),
            "tutor_request" => Some(MessageKind::TutorRequest),
            _ => None,
        }
    }

    pub fn as_wire(&self) -> &'static str {
        match self {
            MessageKind::Text => "text",
            MessageKind::TutorRequest => "tutor_request",
        }
    }
}

/// Lifecycle of a tutor request offer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TutorRequestStatus {
    Pending,
    Accepted,
    Expired,
}

/// Structured offer embedded in a tutor request message
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TutorRequest {
    #[serde(alias = "hourlyRate", deserialize_with = "number_or_string")]
    pub hourly_rate: f64,
    #[serde(
        rename = "lesson_duration",
        alias = "lessonDuration",
        alias = "lesson_duration_minutes"
    )]
    pub lesson_duration_minutes: u32,
    #[serde(alias = "assignmentRequestId")]
    pub assignment_request_id: i64,
    #[serde(alias = "assignmentId")]
    pub assignment_id: i64,
    #[serde(alias = "tutorId")]
    pub tutor_id: UserId,
    #[serde(default, alias = "assignmentTitle", skip_serializing_if = "Option::is_none")]
    pub assignment_title: Option<String>,
    #[serde(deserialize_with = "status_any_case")]
    pub status: TutorRequestStatus,
}

impl TutorRequest {
    /// Parse the JSON document carried in a message's `content` field
    pub fn parse(content: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(content)
    }

    pub fn is_expired(&self) -> bool {
        self.status == TutorRequestStatus::Expired
    }

    /// Copy of this offer with the given status, all other fields untouched
    pub fn with_status(&self, status: TutorRequestStatus) -> Self {
        Self {
            status,
            ..self.clone()
        }
    }
}

// Decimal amounts are serialized as strings by some backends ("45.00").
fn number_or_string<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Amount {
        Number(f64),
        Text(String),
    }

    match Amount::deserialize(deserializer)? {
        Amount::Number(value) => Ok(value),
        Amount::Text(text) => text.trim().parse::<f64>().map_err(serde::de::Error::custom),
    }
}

// Backends disagree on the casing of status values.
fn status_any_case<'de, D>(deserializer: D) -> Result<TutorRequestStatus, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    match raw.to_ascii_lowercase().as_str() {
        "pending" => Ok(TutorRequestStatus::Pending),
        "accepted" => Ok(TutorRequestStatus::Accepted),
        "expired" => Ok(TutorRequestStatus::Expired),
        _ => Err(serde::de::Error::unknown_variant(
            &raw,
            &["pending", "accepted", "expired"],
        )),
    }
}

/// Typed message body
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum MessagePayload {
    Text(String),
    TutorRequest(TutorRequest),
}

impl MessagePayload {
    /// Decode a backend `(message_type, content)` pair.
    ///
    /// A tutor request whose content does not parse, or a message of an
    /// unknown type, degrades to a text payload holding the raw content so
    /// the message is still shown.
    pub fn decode(message_type: &str, content: String) -> Self {
        match MessageKind::from_wire(message_type) {
            Some(MessageKind::Text) => MessagePayload::Text(content),
            Some(MessageKind::TutorRequest) => match TutorRequest::parse(&content) {
                Ok(request) => MessagePayload::TutorRequest(request),
                Err(e) => {
                    tracing::warn!("Unparseable tutor request payload, showing as text: {}", e);
                    MessagePayload::Text(content)
                }
            },
            None => {
                tracing::warn!("Unknown message type '{}', showing as text", message_type);
                MessagePayload::Text(content)
            }
        }
    }

    pub fn kind(&self) -> MessageKind {
        match self {
            MessagePayload::Text(_) => MessageKind::Text,
            MessagePayload::TutorRequest(_) => MessageKind::TutorRequest,
        }
    }
}

/// One message of a conversation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MessageRecord {
    pub id: MessageId,
    pub thread_id: ThreadId,
    pub sender: String,
    pub payload: MessagePayload,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub sent_by_current_user: bool,
}

impl MessageRecord {
    pub fn text(
        id: MessageId,
        thread_id: ThreadId,
        sender: impl Into<String>,
        content: impl Into<String>,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            thread_id,
            sender: sender.into(),
            payload: MessagePayload::Text(content.into()),
            created_at,
            updated_at: created_at,
            sent_by_current_user: false,
        }
    }

    pub fn tutor_request(
        id: MessageId,
        thread_id: ThreadId,
        sender: impl Into<String>,
        request: TutorRequest,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            thread_id,
            sender: sender.into(),
            payload: MessagePayload::TutorRequest(request),
            created_at,
            updated_at: created_at,
            sent_by_current_user: false,
        }
    }

    pub fn sent_by_me(mut self) -> Self {
        self.sent_by_current_user = true;
        self
    }

    pub fn kind(&self) -> MessageKind {
        self.payload.kind()
    }

    pub fn is_tutor_request(&self) -> bool {
        self.kind() == MessageKind::TutorRequest
    }

    pub fn as_tutor_request(&self) -> Option<&TutorRequest> {
        match &self.payload {
            MessagePayload::TutorRequest(request) => Some(request),
            MessagePayload::Text(_) => None,
        }
    }

    /// Copy with an embedded tutor request marked expired. Text messages are
    /// returned unchanged.
    pub fn expired(&self) -> Self {
        match &self.payload {
            MessagePayload::TutorRequest(request) => Self {
                payload: MessagePayload::TutorRequest(
                    request.with_status(TutorRequestStatus::Expired),
                ),
                ..self.clone()
            },
            MessagePayload::Text(_) => self.clone(),
        }
    }

    /// Single-line summary used by previews
    pub fn summary(&self) -> String {
        match &self.payload {
            MessagePayload::Text(text) => text.clone(),
            MessagePayload::TutorRequest(_) => TUTOR_REQUEST_LABEL.to_string(),
        }
    }
}

impl From<MessageBackendDto> for MessageRecord {
    fn from(dto: MessageBackendDto) -> Self {
        Self {
            id: dto.id,
            thread_id: dto.chat_id,
            sender: dto.sender,
            payload: MessagePayload::decode(&dto.message_type, dto.content),
            created_at: dto.created_at,
            updated_at: dto.updated_at,
            sent_by_current_user: dto.sent_by_user,
        }
    }
}
