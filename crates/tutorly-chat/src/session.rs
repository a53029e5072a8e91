use std::sync::Arc;
use tokio::sync::{broadcast, mpsc, Mutex};
use tokio_util::sync::CancellationToken;
use tutorly_api::ChatApi;
use tutorly_realtime::{
    ConnectionState, RealtimeTransport, SocketConnector, TransportConfig, TransportEvent,
    WsConnector,
};
use tutorly_types::{MessageId, OutboundFrame, ThreadId, ThreadPreview, UserId};

use crate::config::ChatConfig;
use crate::error::{ChatError, Result};
use crate::pagination::{PageOutcome, PaginationController};
use crate::selection::{SelectionController, SelectionOutcome};
use crate::store::ChatStore;
use crate::thread::ThreadState;

const NOTICE_CAPACITY: usize = 64;

/// Session events for whoever renders the chat
#[derive(Debug, Clone, PartialEq)]
pub enum ChatNotice {
    /// A realtime message was merged into the registry
    Incoming {
        thread_id: ThreadId,
        message_id: MessageId,
    },
    ConnectionChanged(ConnectionState),
    /// The reconnect attempt failed; the connection stays down
    ConnectionLost(String),
}

/// One signed-in chat session.
///
/// Owns the registry store, the realtime transport and the task that merges
/// transport events into the store. All registry writes from the socket go
/// through that single task.
pub struct ChatSession {
    api: Arc<dyn ChatApi>,
    store: ChatStore,
    transport: RealtimeTransport,
    pagination: Arc<PaginationController>,
    selection: SelectionController,
    notices: broadcast::Sender<ChatNotice>,
    events: Mutex<Option<mpsc::UnboundedReceiver<TransportEvent>>>,
    pump: CancellationToken,
}

impl ChatSession {
    pub fn builder() -> ChatSessionBuilder {
        ChatSessionBuilder::new()
    }

    pub fn new(
        api: Arc<dyn ChatApi>,
        connector: Arc<dyn SocketConnector>,
        transport_config: TransportConfig,
        config: ChatConfig,
    ) -> Self {
        let store = ChatStore::new();
        let (transport, events) =
            RealtimeTransport::new(Arc::clone(&api), connector, transport_config);
        let pagination = Arc::new(PaginationController::new(
            Arc::clone(&api),
            store.clone(),
            config.page_size,
        ));
        let selection =
            SelectionController::new(Arc::clone(&api), store.clone(), Arc::clone(&pagination));
        let (notices, _) = broadcast::channel(NOTICE_CAPACITY);

        Self {
            api,
            store,
            transport,
            pagination,
            selection,
            notices,
            events: Mutex::new(Some(events)),
            pump: CancellationToken::new(),
        }
    }

    /// Load the preview listing, start merging realtime events and open the
    /// connection. Can only be called once per session.
    pub async fn start(&self) -> Result<()> {
        let mut events = self.events.lock().await;
        if events.is_none() {
            return Err(ChatError::AlreadyStarted);
        }

        let previews = self.api.list_previews().await?;
        tracing::info!("Loaded {} chats", previews.len());
        self.store.load_previews(previews);

        if let Some(rx) = events.take() {
            tokio::spawn(pump_events(
                rx,
                self.store.clone(),
                self.notices.clone(),
                self.pump.clone(),
            ));
        }
        drop(events);

        self.connect().await
    }

    /// Open the realtime connection after a failed first attempt
    pub async fn connect(&self) -> Result<()> {
        self.transport.connect().await?;
        Ok(())
    }

    pub async fn select(&self, thread_id: ThreadId) -> Result<SelectionOutcome> {
        self.selection.select(thread_id).await
    }

    pub fn deselect(&self) {
        self.selection.deselect();
    }

    pub async fn load_older(&self, thread_id: ThreadId) -> Result<PageOutcome> {
        self.pagination.load_older(thread_id).await
    }

    /// Send a text message into an unlocked thread
    pub async fn send_text(&self, thread_id: ThreadId, text: &str) -> Result<()> {
        let text = text.trim();
        if text.is_empty() {
            return Err(ChatError::EmptyMessage);
        }

        let thread = self
            .store
            .thread(thread_id)
            .ok_or(ChatError::ThreadNotFound(thread_id))?;
        if thread.is_locked() {
            return Err(ChatError::ThreadLocked(thread_id));
        }

        self.transport
            .send(&OutboundFrame::text(thread_id, text))
            .await?;
        Ok(())
    }

    /// Find or create the chat with another user and make sure it is listed
    pub async fn open_chat_with(&self, other_user_id: UserId) -> Result<ThreadId> {
        let preview = self.api.get_or_create_chat(other_user_id).await?;
        if self.store.upsert_preview(&preview) {
            tracing::debug!("Chat {} with user {} added", preview.id, other_user_id);
        }
        Ok(preview.id)
    }

    pub fn previews(&self) -> Vec<ThreadPreview> {
        self.store.previews()
    }

    pub fn thread(&self, thread_id: ThreadId) -> Option<Arc<ThreadState>> {
        self.store.thread(thread_id)
    }

    pub fn active_thread(&self) -> Option<ThreadId> {
        self.store.active_thread()
    }

    pub fn connection_state(&self) -> ConnectionState {
        self.transport.state()
    }

    pub fn subscribe_notices(&self) -> broadcast::Receiver<ChatNotice> {
        self.notices.subscribe()
    }

    pub fn store(&self) -> &ChatStore {
        &self.store
    }

    /// Logout: close the connection for good and forget every thread
    pub async fn shutdown(&self) {
        self.transport.close().await;
        self.pump.cancel();
        self.store.clear();
        tracing::info!("Chat session shut down");
    }
}

impl Drop for ChatSession {
    fn drop(&mut self) {
        self.pump.cancel();
    }
}

async fn pump_events(
    mut events: mpsc::UnboundedReceiver<TransportEvent>,
    store: ChatStore,
    notices: broadcast::Sender<ChatNotice>,
    shutdown: CancellationToken,
) {
    loop {
        tokio::select! {
            _ = shutdown.cancelled() => break,
            event = events.recv() => match event {
                Some(event) => route_event(&store, &notices, event),
                None => break,
            },
        }
    }
    tracing::debug!("Chat event pump stopped");
}

fn route_event(store: &ChatStore, notices: &broadcast::Sender<ChatNotice>, event: TransportEvent) {
    let notice = match event {
        TransportEvent::Message(message) => {
            let thread_id = message.thread_id;
            let message_id = message.id;
            if !store.apply_incoming(message) {
                return;
            }
            ChatNotice::Incoming {
                thread_id,
                message_id,
            }
        }
        TransportEvent::StateChanged(state) => ChatNotice::ConnectionChanged(state),
        TransportEvent::Failed(reason) => ChatNotice::ConnectionLost(reason),
    };
    let _ = notices.send(notice);
}

pub struct ChatSessionBuilder {
    api: Option<Arc<dyn ChatApi>>,
    connector: Option<Arc<dyn SocketConnector>>,
    transport_config: Option<TransportConfig>,
    config: ChatConfig,
}

impl ChatSessionBuilder {
    pub fn new() -> Self {
        Self {
            api: None,
            connector: None,
            transport_config: None,
            config: ChatConfig::default(),
        }
    }

    pub fn api(mut self, api: Arc<dyn ChatApi>) -> Self {
        self.api = Some(api);
        self
    }

    pub fn connector(mut self, connector: Arc<dyn SocketConnector>) -> Self {
        self.connector = Some(connector);
        self
    }

    pub fn transport_config(mut self, config: TransportConfig) -> Self {
        self.transport_config = Some(config);
        self
    }

    pub fn config(mut self, config: ChatConfig) -> Self {
        self.config = config;
        self
    }

    pub fn page_size(mut self, size: usize) -> Self {
        self.config.page_size = size;
        self
    }

    pub fn build(self) -> Result<ChatSession> {
        let api = self
            .api
            .ok_or_else(|| ChatError::Config("api client is required".to_string()))?;
        let transport_config = self
            .transport_config
            .ok_or_else(|| ChatError::Config("transport config is required".to_string()))?;
        if self.config.page_size == 0 {
            return Err(ChatError::Config("page size must be positive".to_string()));
        }
        let connector = self
            .connector
            .unwrap_or_else(|| Arc::new(WsConnector));

        Ok(ChatSession::new(api, connector, transport_config, self.config))
    }
}

impl Default for ChatSessionBuilder {
    fn default() -> Self {
        Self::new()
    }
}
