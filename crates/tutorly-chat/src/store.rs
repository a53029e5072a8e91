use std::sync::Arc;
use tokio::sync::watch;
use tutorly_types::{MessageRecord, PreviewDto, ThreadId, ThreadPreview};

use crate::registry::ThreadRegistry;
use crate::thread::ThreadState;

/// Reactive holder of the current registry snapshot.
///
/// Every mutation reads the latest snapshot and publishes the next one under
/// the channel's write lock, so concurrent writers never interleave.
/// Subscribers are woken only when some entry actually changed.
#[derive(Clone)]
pub struct ChatStore {
    registry: Arc<watch::Sender<Arc<ThreadRegistry>>>,
    active: Arc<watch::Sender<Option<ThreadId>>>,
}

impl ChatStore {
    pub fn new() -> Self {
        let (registry, _) = watch::channel(Arc::new(ThreadRegistry::new()));
        let (active, _) = watch::channel(None);
        Self {
            registry: Arc::new(registry),
            active: Arc::new(active),
        }
    }

    pub fn snapshot(&self) -> Arc<ThreadRegistry> {
        Arc::clone(&self.registry.borrow())
    }

    pub fn subscribe(&self) -> watch::Receiver<Arc<ThreadRegistry>> {
        self.registry.subscribe()
    }

    pub fn thread(&self, thread_id: ThreadId) -> Option<Arc<ThreadState>> {
        self.registry.borrow().select(thread_id)
    }

    pub fn previews(&self) -> Vec<ThreadPreview> {
        self.snapshot().previews()
    }

    /// Replace everything with a fresh preview listing
    pub fn load_previews(&self, previews: Vec<PreviewDto>) {
        tracing::debug!("Loading {} chat previews", previews.len());
        self.registry
            .send_replace(Arc::new(ThreadRegistry::from_previews(previews)));
    }

    /// Merge a pushed message. A message for the active thread is
    /// acknowledged in the same transition, so subscribers never see it
    /// unread. Returns false for a message that was already held.
    pub fn apply_incoming(&self, message: MessageRecord) -> bool {
        let thread_id = message.thread_id;
        let active = self.active_thread() == Some(thread_id);
        self.update(|registry| {
            let next = registry.apply_incoming(message);
            if active {
                next.mark_read(thread_id)
            } else {
                next
            }
        })
    }

    pub fn apply_history(
        &self,
        thread_id: ThreadId,
        batch: Vec<MessageRecord>,
        has_more: bool,
    ) -> bool {
        self.update(|registry| registry.apply_history(thread_id, batch, has_more))
    }

    pub fn mark_read(&self, thread_id: ThreadId) -> bool {
        self.update(|registry| registry.mark_read(thread_id))
    }

    pub fn upsert_preview(&self, preview: &PreviewDto) -> bool {
        self.update(|registry| registry.upsert_preview(preview))
    }

    /// Drop every thread (logout / unmount)
    pub fn clear(&self) {
        self.registry.send_replace(Arc::new(ThreadRegistry::new()));
        self.active.send_replace(None);
    }

    pub fn active_thread(&self) -> Option<ThreadId> {
        *self.active.borrow()
    }

    pub fn set_active(&self, thread_id: Option<ThreadId>) {
        self.active.send_if_modified(|active| {
            if *active == thread_id {
                return false;
            }
            *active = thread_id;
            true
        });
    }

    pub fn subscribe_active(&self) -> watch::Receiver<Option<ThreadId>> {
        self.active.subscribe()
    }

    fn update(&self, transition: impl FnOnce(&ThreadRegistry) -> ThreadRegistry) -> bool {
        self.registry.send_if_modified(|current| {
            let next = transition(current);
            if next.shares_entries(current) {
                return false;
            }
            *current = Arc::new(next);
            true
        })
    }
}

impl Default for ChatStore {
    fn default() -> Self {
        Self::new()
    }
}
