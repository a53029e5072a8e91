use std::sync::Arc;
use tutorly_api::ChatApi;
use tutorly_types::ThreadId;

use crate::error::{ChatError, Result};
use crate::pagination::{PageOutcome, PaginationController};
use crate::store::ChatStore;
use crate::thread::ThreadState;

/// What happened while opening a thread
#[derive(Debug)]
pub struct SelectionOutcome {
    /// Thread as it stands after the whole sequence
    pub thread: Arc<ThreadState>,
    /// Result of the backfill, when one was needed
    pub backfill: Option<PageOutcome>,
    /// Backfill failure, reported without aborting the selection
    pub backfill_error: Option<ChatError>,
    /// Whether the server accepted the mark-read call
    pub read_synced: bool,
}

/// Opens threads: activate, backfill, acknowledge remotely, clear unread.
pub struct SelectionController {
    api: Arc<dyn ChatApi>,
    store: ChatStore,
    pagination: Arc<PaginationController>,
}

impl SelectionController {
    pub fn new(
        api: Arc<dyn ChatApi>,
        store: ChatStore,
        pagination: Arc<PaginationController>,
    ) -> Self {
        Self {
            api,
            store,
            pagination,
        }
    }

    pub fn active(&self) -> Option<ThreadId> {
        self.store.active_thread()
    }

    pub fn deselect(&self) {
        self.store.set_active(None);
    }

    /// Make `thread_id` the active thread.
    ///
    /// A failed backfill or mark-read call does not stop the thread from
    /// being shown. Mark-read is not retried.
    pub async fn select(&self, thread_id: ThreadId) -> Result<SelectionOutcome> {
        let thread = self
            .store
            .thread(thread_id)
            .ok_or(ChatError::ThreadNotFound(thread_id))?;

        self.store.set_active(Some(thread_id));
        tracing::debug!("Chat {} selected", thread_id);

        let mut backfill = None;
        let mut backfill_error = None;
        if thread.len() < self.pagination.page_size() && thread.has_more_history() {
            match self.pagination.load_older(thread_id).await {
                Ok(outcome) => backfill = Some(outcome),
                Err(e) => {
                    tracing::warn!("Backfill of chat {} failed: {}", thread_id, e);
                    backfill_error = Some(e);
                }
            }
        }

        let read_synced = match self.api.mark_read(thread_id).await {
            Ok(()) => true,
            Err(e) => {
                tracing::warn!("Failed to mark chat {} as read: {}", thread_id, e);
                false
            }
        };

        self.store.mark_read(thread_id);

        let thread = self.store.thread(thread_id).unwrap_or(thread);
        Ok(SelectionOutcome {
            thread,
            backfill,
            backfill_error,
            read_synced,
        })
    }
}
