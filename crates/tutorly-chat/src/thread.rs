use chrono::{DateTime, Utc};
use std::collections::HashSet;
use tutorly_types::{
    relative_time_label, MessageId, MessageKind, MessageRecord, PreviewDto, ThreadId,
    ThreadPreview, TutorRequestStatus, TUTOR_REQUEST_LABEL,
};

/// Preview data retained from the listing until messages are loaded
#[derive(Debug, Clone, PartialEq)]
struct PreviewPlaceholder {
    last_message: String,
    last_update: Option<DateTime<Utc>>,
    last_message_kind: Option<MessageKind>,
}

/// One conversation: its ordered messages and the flags derived from them.
///
/// Values are immutable; every transition returns a new `ThreadState` and
/// leaves the receiver untouched.
///
/// Invariants:
/// - `messages` is sorted ascending by `created_at`, ties in arrival order
/// - message ids are unique within the thread
/// - a realtime tutor request expires the one under the cursor, so at most
///   one offer pushed during the session is still pending or accepted
#[derive(Debug, Clone, PartialEq)]
pub struct ThreadState {
    id: ThreadId,
    title: String,
    is_locked: bool,
    has_more_history: bool,
    has_unread: bool,
    messages: Vec<MessageRecord>,
    /// Id of the most recent tutor request seen
    tutor_request_cursor: Option<MessageId>,
    placeholder: Option<PreviewPlaceholder>,
}

impl ThreadState {
    /// Thread known only from the preview listing; no messages loaded yet
    pub fn from_preview(preview: &PreviewDto) -> Self {
        Self {
            id: preview.id,
            title: preview.name.clone(),
            is_locked: preview.is_locked,
            has_more_history: preview.has_messages,
            has_unread: preview.has_unread,
            messages: Vec::new(),
            tutor_request_cursor: None,
            placeholder: Some(PreviewPlaceholder {
                last_message: preview.last_message.clone().unwrap_or_default(),
                last_update: preview.last_update,
                last_message_kind: preview
                    .last_message_type
                    .as_deref()
                    .and_then(MessageKind::from_wire),
            }),
        }
    }

    /// Thread materialised from a pushed message nobody listed yet.
    ///
    /// Locked until told otherwise. Older history is unknown, so a backfill
    /// is allowed.
    pub fn from_first_message(message: MessageRecord) -> Self {
        let title = if message.sent_by_current_user {
            format!("Chat {}", message.thread_id)
        } else {
            message.sender.clone()
        };

        let empty = Self {
            id: message.thread_id,
            title,
            is_locked: true,
            has_more_history: true,
            has_unread: false,
            messages: Vec::new(),
            tutor_request_cursor: None,
            placeholder: None,
        };
        empty.append_realtime(message)
    }

    pub fn id(&self) -> ThreadId {
        self.id
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn is_locked(&self) -> bool {
        self.is_locked
    }

    pub fn has_more_history(&self) -> bool {
        self.has_more_history
    }

    pub fn has_unread(&self) -> bool {
        self.has_unread
    }

    pub fn messages(&self) -> &[MessageRecord] {
        &self.messages
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn contains(&self, message_id: MessageId) -> bool {
        self.messages.iter().any(|m| m.id == message_id)
    }

    /// Index of the most recent tutor request, if any
    pub fn tutor_request_cursor(&self) -> Option<usize> {
        let cursor = self.tutor_request_cursor?;
        self.messages.iter().position(|m| m.id == cursor)
    }

    /// The tutor request under the cursor
    pub fn current_tutor_request(&self) -> Option<&MessageRecord> {
        self.tutor_request_cursor().map(|index| &self.messages[index])
    }

    /// `created_at` of the oldest loaded message; the pagination cursor
    pub fn earliest_timestamp(&self) -> Option<DateTime<Utc>> {
        self.messages.first().map(|m| m.created_at)
    }

    pub fn last_update(&self) -> Option<DateTime<Utc>> {
        match self.messages.last() {
            Some(last) => Some(last.created_at),
            None => self.placeholder.as_ref().and_then(|p| p.last_update),
        }
    }

    /// Splice a page of older messages in front of the loaded ones.
    ///
    /// The page is sorted first; ids already held are skipped. When the
    /// thread was empty the page is its whole known history and the tutor
    /// request cursor is recomputed from it.
    #[must_use]
    pub fn append_historical(&self, batch: Vec<MessageRecord>, has_more: bool) -> Self {
        let mut next = self.clone();
        next.has_more_history = has_more;

        let mut seen: HashSet<MessageId> = self.messages.iter().map(|m| m.id).collect();
        let mut fresh: Vec<MessageRecord> = batch
            .into_iter()
            .filter(|m| seen.insert(m.id))
            .collect();
        if fresh.is_empty() {
            return next;
        }
        fresh.sort_by_key(|m| m.created_at);

        let was_empty = self.messages.is_empty();
        fresh.extend(self.messages.iter().cloned());
        // Stable: a no-op unless the server sent something newer than our head
        fresh.sort_by_key(|m| m.created_at);
        next.messages = fresh;

        if was_empty {
            next.tutor_request_cursor = next
                .messages
                .iter()
                .rev()
                .find(|m| m.is_tutor_request())
                .map(|m| m.id);
        }
        next
    }

    /// Add a pushed message at the back.
    ///
    /// A tutor request expires the one under the cursor and takes its
    /// place; an accepted one unlocks the thread. A tutor request older than
    /// the one under the cursor arrives already expired and leaves the
    /// cursor alone. Messages from the other party mark the thread unread.
    /// Duplicates are ignored.
    #[must_use]
    pub fn append_realtime(&self, mut message: MessageRecord) -> Self {
        if self.contains(message.id) {
            tracing::debug!("Ignoring duplicate message {} in chat {}", message.id, self.id);
            return self.clone();
        }

        let mut next = self.clone();

        if let Some(status) = message.as_tutor_request().map(|r| r.status) {
            let current = next.tutor_request_cursor();
            let stale = current
                .is_some_and(|index| next.messages[index].created_at > message.created_at);

            if stale {
                tracing::debug!(
                    "Late tutor request {} in chat {} is already superseded",
                    message.id,
                    self.id
                );
                message = message.expired();
            } else {
                if let Some(index) = current {
                    next.messages[index] = next.messages[index].expired();
                }
                if status == TutorRequestStatus::Accepted {
                    next.is_locked = false;
                }
                next.tutor_request_cursor = Some(message.id);
            }
        }

        if !message.sent_by_current_user {
            next.has_unread = true;
        }

        // Normally the end; a late push still lands in created_at order
        let at = next
            .messages
            .partition_point(|m| m.created_at <= message.created_at);
        next.messages.insert(at, message);
        next
    }

    #[must_use]
    pub fn mark_read(&self) -> Self {
        Self {
            has_unread: false,
            ..self.clone()
        }
    }

    #[must_use]
    pub fn with_locked(&self, is_locked: bool) -> Self {
        Self {
            is_locked,
            ..self.clone()
        }
    }

    pub fn preview(&self) -> ThreadPreview {
        self.preview_at(Utc::now())
    }

    /// Derived list-view projection, with relative times measured from `now`
    pub fn preview_at(&self, now: DateTime<Utc>) -> ThreadPreview {
        let (last_message, last_update, last_message_kind) = match self.messages.last() {
            Some(last) => (last.summary(), Some(last.created_at), Some(last.kind())),
            None => match &self.placeholder {
                Some(placeholder) => {
                    let text = match placeholder.last_message_kind {
                        Some(MessageKind::TutorRequest) => TUTOR_REQUEST_LABEL.to_string(),
                        _ => placeholder.last_message.clone(),
                    };
                    (text, placeholder.last_update, placeholder.last_message_kind)
                }
                None => (String::new(), None, None),
            },
        };

        ThreadPreview {
            id: self.id,
            name: self.title.clone(),
            last_message,
            display_time: last_update
                .map(|at| relative_time_label(at, now))
                .unwrap_or_default(),
            last_update,
            last_message_kind,
            has_unread: self.has_unread,
            is_locked: self.is_locked,
        }
    }
}
