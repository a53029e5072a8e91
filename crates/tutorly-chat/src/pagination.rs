use std::collections::HashSet;
use std::sync::{Arc, Mutex, PoisonError};
use tutorly_api::ChatApi;
use tutorly_types::{MessageId, MessageRecord, ThreadId};

use crate::error::{ChatError, Result};
use crate::store::ChatStore;

pub const DEFAULT_PAGE_SIZE: usize = 10;

/// Offset change that keeps the visible content in place after `old_height`
/// grew to `new_height` by prepending above the viewport
pub fn scroll_delta(old_height: f64, new_height: f64) -> f64 {
    new_height - old_height
}

/// Scroll position captured before a history splice
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScrollAnchor {
    pub content_height: f64,
    pub scroll_offset: f64,
}

impl ScrollAnchor {
    pub fn capture(content_height: f64, scroll_offset: f64) -> Self {
        Self {
            content_height,
            scroll_offset,
        }
    }

    /// Offset to apply once the surface has been laid out at `new_height`
    pub fn restore(&self, new_height: f64) -> f64 {
        (self.scroll_offset + scroll_delta(self.content_height, new_height)).max(0.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageOutcome {
    /// A page was spliced in front of the thread
    Loaded { added: usize, has_more: bool },
    /// Nothing older exists; no request was made
    Exhausted,
    /// Another request for this thread is still outstanding
    InFlight,
}

/// Loads older history pages, at most one request per thread at a time.
pub struct PaginationController {
    api: Arc<dyn ChatApi>,
    store: ChatStore,
    page_size: usize,
    in_flight: Arc<Mutex<HashSet<ThreadId>>>,
}

impl PaginationController {
    pub fn new(api: Arc<dyn ChatApi>, store: ChatStore, page_size: usize) -> Self {
        Self {
            api,
            store,
            page_size: page_size.max(1),
            in_flight: Arc::new(Mutex::new(HashSet::new())),
        }
    }

    pub fn page_size(&self) -> usize {
        self.page_size
    }

    pub fn is_loading(&self, thread_id: ThreadId) -> bool {
        self.in_flight
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .contains(&thread_id)
    }

    /// Fetch the page before the thread's earliest message.
    ///
    /// The first fetch of an empty thread sends no cursor. A failed request
    /// leaves the thread exactly as it was.
    pub async fn load_older(&self, thread_id: ThreadId) -> Result<PageOutcome> {
        let Some(_claim) = InFlightClaim::acquire(&self.in_flight, thread_id) else {
            tracing::debug!("History request for chat {} already in flight", thread_id);
            return Ok(PageOutcome::InFlight);
        };

        let thread = self
            .store
            .thread(thread_id)
            .ok_or(ChatError::ThreadNotFound(thread_id))?;
        if !thread.has_more_history() {
            return Ok(PageOutcome::Exhausted);
        }

        let before = thread.earliest_timestamp();
        tracing::debug!(
            "Fetching {} messages for chat {} before {:?}",
            self.page_size,
            thread_id,
            before
        );
        let page = self
            .api
            .fetch_history(thread_id, self.page_size, before)
            .await?;

        let batch: Vec<MessageRecord> = page
            .messages
            .into_iter()
            .filter(|dto| {
                if dto.chat_id != thread_id {
                    tracing::warn!(
                        "Discarding message {} of chat {} from history of chat {}",
                        dto.id,
                        dto.chat_id,
                        thread_id
                    );
                    return false;
                }
                true
            })
            .map(MessageRecord::from)
            .collect();

        // Pushes may have landed while the page was in flight
        let fresh: Vec<MessageId> = match self.store.thread(thread_id) {
            Some(current) => batch
                .iter()
                .map(|message| message.id)
                .filter(|id| !current.contains(*id))
                .collect(),
            None => Vec::new(),
        };
        self.store.apply_history(thread_id, batch, page.has_more);
        let added = self
            .store
            .thread(thread_id)
            .map(|next| fresh.iter().filter(|id| next.contains(**id)).count())
            .unwrap_or(0);

        Ok(PageOutcome::Loaded {
            added,
            has_more: page.has_more,
        })
    }
}

/// Membership in the in-flight set, released on drop
struct InFlightClaim {
    set: Arc<Mutex<HashSet<ThreadId>>>,
    thread_id: ThreadId,
}

impl InFlightClaim {
    fn acquire(set: &Arc<Mutex<HashSet<ThreadId>>>, thread_id: ThreadId) -> Option<Self> {
        let inserted = set
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(thread_id);
        inserted.then(|| Self {
            set: Arc::clone(set),
            thread_id,
        })
    }
}

impl Drop for InFlightClaim {
    fn drop(&mut self) {
        self.set
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&self.thread_id);
    }
}
