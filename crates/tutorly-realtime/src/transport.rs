use std::sync::Arc;
use tokio::sync::{mpsc, watch, Mutex};
use tokio_util::sync::CancellationToken;
use tutorly_api::ChatApi;
use tutorly_types::{MessageBackendDto, MessageRecord, OutboundFrame};

use crate::config::TransportConfig;
use crate::connector::{SocketChannels, SocketConnector};
use crate::error::{Result, TransportError};
use crate::state::{ConnectionState, TransportEvent};

/// Owner of the session's single realtime connection.
///
/// Inbound frames are decoded into [`MessageRecord`]s and reported, together
/// with state changes, on the event receiver returned by [`RealtimeTransport::new`].
/// An unrequested closure triggers exactly one reconnect attempt; [`close`]
/// (or dropping the transport) ends the connection for the rest of the session.
///
/// [`close`]: RealtimeTransport::close
pub struct RealtimeTransport {
    inner: Arc<Inner>,
}

struct Inner {
    api: Arc<dyn ChatApi>,
    connector: Arc<dyn SocketConnector>,
    config: TransportConfig,
    state: watch::Sender<ConnectionState>,
    outbound: Mutex<Option<mpsc::UnboundedSender<String>>>,
    events: mpsc::UnboundedSender<TransportEvent>,
    shutdown: CancellationToken,
}

impl RealtimeTransport {
    pub fn new(
        api: Arc<dyn ChatApi>,
        connector: Arc<dyn SocketConnector>,
        config: TransportConfig,
    ) -> (Self, mpsc::UnboundedReceiver<TransportEvent>) {
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let (state_tx, _) = watch::channel(ConnectionState::Disconnected);

        let inner = Arc::new(Inner {
            api,
            connector,
            config,
            state: state_tx,
            outbound: Mutex::new(None),
            events: events_tx,
            shutdown: CancellationToken::new(),
        });

        (Self { inner }, events_rx)
    }

    pub fn state(&self) -> ConnectionState {
        *self.inner.state.borrow()
    }

    pub fn subscribe_state(&self) -> watch::Receiver<ConnectionState> {
        self.inner.state.subscribe()
    }

    /// Fetch a credential, open the socket and start routing frames.
    ///
    /// Only valid from `Disconnected` on a transport that was never closed.
    pub async fn connect(&self) -> Result<()> {
        if self.inner.shutdown.is_cancelled() {
            return Err(TransportError::TornDown);
        }
        if !self.inner.begin_connecting(ConnectionState::Disconnected) {
            return Err(TransportError::AlreadyActive(self.state()));
        }

        let inbound = self.inner.establish().await?;
        tokio::spawn(Arc::clone(&self.inner).supervise(inbound));
        Ok(())
    }

    /// Write a frame. Rejected unless the connection is open; nothing is queued.
    pub async fn send(&self, frame: &OutboundFrame) -> Result<()> {
        let state = self.state();
        if !state.is_open() {
            return Err(TransportError::NotOpen(state));
        }

        let payload = serde_json::to_string(frame)?;
        let outbound = self.inner.outbound.lock().await;
        match outbound.as_ref() {
            Some(tx) if tx.send(payload).is_ok() => {
                tracing::debug!("Sent frame to chat {}", frame.chat_id);
                Ok(())
            }
            _ => Err(TransportError::NotOpen(self.state())),
        }
    }

    /// Deliberate teardown: cancels any pending reconnect and closes the socket.
    pub async fn close(&self) {
        self.inner.shutdown.cancel();
        self.inner.outbound.lock().await.take();
        self.inner.transition(ConnectionState::Disconnected);
        tracing::info!("Realtime transport closed");
    }

    pub fn is_closed(&self) -> bool {
        self.inner.shutdown.is_cancelled()
    }
}

impl Drop for RealtimeTransport {
    fn drop(&mut self) {
        self.inner.shutdown.cancel();
    }
}

impl Inner {
    /// Atomically move `from -> Connecting`
    fn begin_connecting(&self, from: ConnectionState) -> bool {
        let claimed = self.state.send_if_modified(|state| {
            if *state == from && !self.shutdown.is_cancelled() {
                *state = ConnectionState::Connecting;
                true
            } else {
                false
            }
        });
        if claimed {
            self.announce(ConnectionState::Connecting);
        }
        claimed
    }

    /// Apply a state change. After shutdown only `Disconnected` is accepted;
    /// returns false when the change was refused.
    fn transition(&self, next: ConnectionState) -> bool {
        let mut allowed = true;
        let changed = self.state.send_if_modified(|state| {
            if next != ConnectionState::Disconnected && self.shutdown.is_cancelled() {
                allowed = false;
                return false;
            }
            if *state == next {
                return false;
            }
            *state = next;
            true
        });
        if changed {
            self.announce(next);
        }
        allowed
    }

    fn announce(&self, state: ConnectionState) {
        tracing::debug!("Realtime transport -> {:?}", state);
        let _ = self.events.send(TransportEvent::StateChanged(state));
    }

    async fn open_socket(&self) -> Result<SocketChannels> {
        let token = self.api.socket_token().await?;
        let url = self.config.socket_url(&token)?;
        self.connector.connect(&url).await
    }

    /// Connecting -> Open, or -> Disconnected on failure
    async fn establish(&self) -> Result<mpsc::UnboundedReceiver<String>> {
        let channels = match self.open_socket().await {
            Ok(channels) => channels,
            Err(e) => {
                self.transition(ConnectionState::Disconnected);
                return Err(e);
            }
        };

        {
            let mut outbound = self.outbound.lock().await;
            if self.shutdown.is_cancelled() {
                return Err(TransportError::TornDown);
            }
            *outbound = Some(channels.outbound);
        }

        if !self.transition(ConnectionState::Open) {
            return Err(TransportError::TornDown);
        }
        tracing::info!("Realtime connection open");
        Ok(channels.inbound)
    }

    async fn supervise(self: Arc<Self>, mut inbound: mpsc::UnboundedReceiver<String>) {
        loop {
            if !self.pump(&mut inbound).await {
                return;
            }

            self.outbound.lock().await.take();
            if !self.transition(ConnectionState::Closed) {
                return;
            }

            let delay = self.config.reconnect_delay();
            tracing::warn!("Realtime connection dropped, reconnecting in {:?}", delay);
            tokio::select! {
                _ = self.shutdown.cancelled() => return,
                _ = tokio::time::sleep(delay) => {}
            }

            if !self.begin_connecting(ConnectionState::Closed) {
                return;
            }
            match self.establish().await {
                Ok(next) => inbound = next,
                Err(TransportError::TornDown) => return,
                Err(e) => {
                    tracing::error!("Realtime reconnect failed: {}", e);
                    let _ = self.events.send(TransportEvent::Failed(e.to_string()));
                    return;
                }
            }
        }
    }

    /// Route frames until the socket ends. Returns false on shutdown.
    async fn pump(&self, inbound: &mut mpsc::UnboundedReceiver<String>) -> bool {
        loop {
            tokio::select! {
                _ = self.shutdown.cancelled() => return false,
                frame = inbound.recv() => match frame {
                    Some(text) => self.dispatch(&text),
                    None => return !self.shutdown.is_cancelled(),
                },
            }
        }
    }

    fn dispatch(&self, text: &str) {
        match serde_json::from_str::<MessageBackendDto>(text) {
            Ok(dto) => {
                let _ = self.events.send(TransportEvent::Message(MessageRecord::from(dto)));
            }
            Err(e) => tracing::warn!("Dropping unparseable realtime frame: {}", e),
        }
    }
}
