use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tutorly_types::{HistoryPage, PreviewDto, ThreadId, UserId};

use crate::error::Result;

/// Remote endpoints the chat engine consumes
///
/// Implemented over HTTP by [`crate::HttpChatApi`]; tests substitute
/// in-memory implementations.
#[async_trait]
pub trait ChatApi: Send + Sync {
    /// Full preview listing of the user's conversations
    async fn list_previews(&self) -> Result<Vec<PreviewDto>>;

    /// Up to `limit` messages of a thread, older than `created_before` when given
    async fn fetch_history(
        &self,
        thread_id: ThreadId,
        limit: usize,
        created_before: Option<DateTime<Utc>>,
    ) -> Result<HistoryPage>;

    /// Tell the server the thread was read
    async fn mark_read(&self, thread_id: ThreadId) -> Result<()>;

    /// Find or open the conversation with another user
    async fn get_or_create_chat(&self, other_user_id: UserId) -> Result<PreviewDto>;

    /// Exchange the session for a short-lived realtime credential
    async fn socket_token(&self) -> Result<String>;
}
