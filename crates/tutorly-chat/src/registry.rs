use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use tutorly_types::{MessageRecord, PreviewDto, ThreadId, ThreadPreview};

use crate::thread::ThreadState;

/// All threads of the session, keyed by id.
///
/// Transitions are copy-on-write: the returned registry shares every
/// untouched entry with the receiver, so consumers can diff by `Arc::ptr_eq`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ThreadRegistry {
    threads: HashMap<ThreadId, Arc<ThreadState>>,
}

impl ThreadRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fresh registry built from a full preview listing
    pub fn from_previews(previews: Vec<PreviewDto>) -> Self {
        let threads = previews
            .iter()
            .map(|preview| (preview.id, Arc::new(ThreadState::from_preview(preview))))
            .collect();
        Self { threads }
    }

    pub fn len(&self) -> usize {
        self.threads.len()
    }

    pub fn is_empty(&self) -> bool {
        self.threads.is_empty()
    }

    pub fn contains(&self, thread_id: ThreadId) -> bool {
        self.threads.contains_key(&thread_id)
    }

    pub fn thread_ids(&self) -> impl Iterator<Item = ThreadId> + '_ {
        self.threads.keys().copied()
    }

    /// Thread for display. Lookup never changes read state.
    pub fn select(&self, thread_id: ThreadId) -> Option<Arc<ThreadState>> {
        self.threads.get(&thread_id).cloned()
    }

    /// Route a pushed message to its thread, creating a locked thread when
    /// the id is not known yet.
    #[must_use]
    pub fn apply_incoming(&self, message: MessageRecord) -> Self {
        let thread_id = message.thread_id;
        let next = match self.threads.get(&thread_id) {
            Some(thread) if thread.contains(message.id) => {
                tracing::debug!("Message {} already in chat {}", message.id, thread_id);
                return self.clone();
            }
            Some(thread) => thread.append_realtime(message),
            None => {
                tracing::debug!("Message {} for unlisted chat {}, creating it", message.id, thread_id);
                ThreadState::from_first_message(message)
            }
        };
        self.replace(next)
    }

    /// Prepend a history page. Ignored for unknown threads and for threads
    /// whose history is already exhausted.
    #[must_use]
    pub fn apply_history(
        &self,
        thread_id: ThreadId,
        batch: Vec<MessageRecord>,
        has_more: bool,
    ) -> Self {
        let Some(thread) = self.threads.get(&thread_id) else {
            tracing::warn!("History page for unknown chat {} dropped", thread_id);
            return self.clone();
        };
        if !thread.has_more_history() {
            tracing::debug!("Chat {} has no more history, page ignored", thread_id);
            return self.clone();
        }
        self.replace(thread.append_historical(batch, has_more))
    }

    #[must_use]
    pub fn mark_read(&self, thread_id: ThreadId) -> Self {
        match self.threads.get(&thread_id) {
            Some(thread) if thread.has_unread() => self.replace(thread.mark_read()),
            _ => self.clone(),
        }
    }

    #[must_use]
    pub fn set_locked(&self, thread_id: ThreadId, is_locked: bool) -> Self {
        match self.threads.get(&thread_id) {
            Some(thread) if thread.is_locked() != is_locked => {
                self.replace(thread.with_locked(is_locked))
            }
            _ => self.clone(),
        }
    }

    /// Add a thread from a single preview; an existing entry wins.
    #[must_use]
    pub fn upsert_preview(&self, preview: &PreviewDto) -> Self {
        if self.contains(preview.id) {
            return self.clone();
        }
        self.replace(ThreadState::from_preview(preview))
    }

    /// True when both registries hold the very same entries
    pub fn shares_entries(&self, other: &ThreadRegistry) -> bool {
        self.threads.len() == other.threads.len()
            && self.threads.iter().all(|(id, thread)| {
                other
                    .threads
                    .get(id)
                    .is_some_and(|theirs| Arc::ptr_eq(thread, theirs))
            })
    }

    pub fn previews(&self) -> Vec<ThreadPreview> {
        self.previews_at(Utc::now())
    }

    /// Previews ordered by last update, newest first; threads without any
    /// activity go last
    pub fn previews_at(&self, now: DateTime<Utc>) -> Vec<ThreadPreview> {
        let mut previews: Vec<ThreadPreview> =
            self.threads.values().map(|thread| thread.preview_at(now)).collect();
        previews.sort_by(|a, b| b.last_update.cmp(&a.last_update).then(a.id.cmp(&b.id)));
        previews
    }

    fn replace(&self, thread: ThreadState) -> Self {
        let mut threads = self.threads.clone();
        threads.insert(thread.id(), Arc::new(thread));
        Self { threads }
    }
}
