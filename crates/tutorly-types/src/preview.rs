use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::message::MessageKind;
use crate::ThreadId;

/// Label shown in place of a tutor request's structured content
pub const TUTOR_REQUEST_LABEL: &str = "Tutor Request";

/// List-view projection of a thread's latest state
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ThreadPreview {
    pub id: ThreadId,
    pub name: String,
    pub last_message: String,
    pub last_update: Option<DateTime<Utc>>,
    /// Relative time label, e.g. "5m ago"
    pub display_time: String,
    pub last_message_kind: Option<MessageKind>,
    pub has_unread: bool,
    pub is_locked: bool,
}

/// Human relative time of `then` as seen from `now`.
///
/// Timestamps in the future (clock skew) read as "just now".
pub fn relative_time_label(then: DateTime<Utc>, now: DateTime<Utc>) -> String {
    let elapsed = now.signed_duration_since(then);

    if elapsed.num_minutes() < 1 {
        "just now".to_string()
    } else if elapsed.num_hours() < 1 {
        format!("{}m ago", elapsed.num_minutes())
    } else if elapsed.num_hours() < 24 {
        format!("{}h ago", elapsed.num_hours())
    } else if elapsed.num_hours() < 48 {
        "Yesterday".to_string()
    } else if elapsed.num_days() < 7 {
        format!("{}d ago", elapsed.num_days())
    } else {
        then.format("%b %-d").to_string()
    }
}
