use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, Notify};
use tutorly_api::{ApiError, ChatApi};
use tutorly_realtime::{
    ConnectionState, RealtimeTransport, SocketChannels, SocketConnector, TransportConfig,
    TransportError, TransportEvent,
};
use tutorly_types::{HistoryPage, MessageKind, OutboundFrame, PreviewDto, ThreadId, UserId};
use url::Url;

const WAIT: Duration = Duration::from_secs(2);

struct TokenApi {
    token: String,
    gate: Option<Arc<Notify>>,
}

#[async_trait]
impl ChatApi for TokenApi {
    async fn list_previews(&self) -> tutorly_api::Result<Vec<PreviewDto>> {
        Ok(Vec::new())
    }

    async fn fetch_history(
        &self,
        _thread_id: ThreadId,
        _limit: usize,
        _created_before: Option<DateTime<Utc>>,
    ) -> tutorly_api::Result<HistoryPage> {
        Ok(HistoryPage { messages: Vec::new(), has_more: false })
    }

    async fn mark_read(&self, _thread_id: ThreadId) -> tutorly_api::Result<()> {
        Ok(())
    }

    async fn get_or_create_chat(&self, _other_user_id: UserId) -> tutorly_api::Result<PreviewDto> {
        Err(ApiError::Status { status: 404, body: String::new() })
    }

    async fn socket_token(&self) -> tutorly_api::Result<String> {
        if let Some(gate) = &self.gate {
            gate.notified().await;
        }
        Ok(self.token.clone())
    }
}

/// Server side of one mock socket
struct MockPeer {
    url: Url,
    from_client: mpsc::UnboundedReceiver<String>,
    to_client: mpsc::UnboundedSender<String>,
}

struct MockConnector {
    peers: mpsc::UnboundedSender<MockPeer>,
    attempts: AtomicUsize,
    refuse_after_first: AtomicBool,
}

impl MockConnector {
    fn new() -> (Arc<Self>, mpsc::UnboundedReceiver<MockPeer>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let connector = Arc::new(Self {
            peers: tx,
            attempts: AtomicUsize::new(0),
            refuse_after_first: AtomicBool::new(false),
        });
        (connector, rx)
    }

    fn attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SocketConnector for MockConnector {
    async fn connect(&self, url: &Url) -> tutorly_realtime::Result<SocketChannels> {
        let attempt = self.attempts.fetch_add(1, Ordering::SeqCst);
        if attempt > 0 && self.refuse_after_first.load(Ordering::SeqCst) {
            return Err(TransportError::Connect("connection refused".to_string()));
        }

        let (outbound_tx, outbound_rx) = mpsc::unbounded_channel();
        let (inbound_tx, inbound_rx) = mpsc::unbounded_channel();
        let _ = self.peers.send(MockPeer {
            url: url.clone(),
            from_client: outbound_rx,
            to_client: inbound_tx,
        });

        Ok(SocketChannels { outbound: outbound_tx, inbound: inbound_rx })
    }
}

fn transport(
    connector: Arc<MockConnector>,
    gate: Option<Arc<Notify>>,
) -> (RealtimeTransport, mpsc::UnboundedReceiver<TransportEvent>) {
    let api = Arc::new(TokenApi { token: "ephemeral".to_string(), gate });
    let config = TransportConfig::new("ws://chat.test/ws/chat/")
        .with_reconnect_delay(Duration::from_millis(10));
    RealtimeTransport::new(api, connector, config)
}

fn frame(id: i64, message_type: &str, content: &str) -> String {
    serde_json::json!({
        "id": id,
        "chat_id": 1,
        "sender": "Ada",
        "content": content,
        "message_type": message_type,
        "created_at": "2024-03-01T12:00:00Z",
        "updated_at": "2024-03-01T12:00:00Z",
        "sent_by_user": false
    })
    .to_string()
}

async fn next_message(events: &mut mpsc::UnboundedReceiver<TransportEvent>) -> tutorly_types::MessageRecord {
    loop {
        match tokio::time::timeout(WAIT, events.recv()).await {
            Ok(Some(TransportEvent::Message(record))) => return record,
            Ok(Some(_)) => continue,
            other => panic!("no message event: {other:?}"),
        }
    }
}

async fn wait_for_state(transport: &RealtimeTransport, wanted: ConnectionState) {
    let mut rx = transport.subscribe_state();
    tokio::time::timeout(WAIT, rx.wait_for(|state| *state == wanted))
        .await
        .expect("timed out waiting for state")
        .expect("state channel closed");
}

#[tokio::test]
async fn test_connect_attaches_credential_and_routes_frames() {
    let (connector, mut peers) = MockConnector::new();
    let (transport, mut events) = transport(connector, None);

    transport.connect().await.unwrap();
    assert_eq!(transport.state(), ConnectionState::Open);

    let peer = peers.recv().await.unwrap();
    assert_eq!(peer.url.query(), Some("token=ephemeral"));

    peer.to_client.send(frame(5, "text", "Hello there")).unwrap();
    let record = next_message(&mut events).await;

    assert_eq!(record.id, 5);
    assert_eq!(record.kind(), MessageKind::Text);
    assert_eq!(record.summary(), "Hello there");
}

#[tokio::test]
async fn test_unparseable_frame_is_dropped_without_closing() {
    let (connector, mut peers) = MockConnector::new();
    let (transport, mut events) = transport(connector, None);
    transport.connect().await.unwrap();
    let peer = peers.recv().await.unwrap();

    peer.to_client.send("{\"id\": \"nope\"".to_string()).unwrap();
    peer.to_client.send(frame(6, "text", "still here")).unwrap();

    let record = next_message(&mut events).await;
    assert_eq!(record.id, 6);
    assert_eq!(transport.state(), ConnectionState::Open);
}

#[tokio::test]
async fn test_send_writes_outbound_frame() {
    let (connector, mut peers) = MockConnector::new();
    let (transport, _events) = transport(connector, None);
    transport.connect().await.unwrap();
    let mut peer = peers.recv().await.unwrap();

    transport.send(&OutboundFrame::text(1, "Thanks!")).await.unwrap();

    let written = peer.from_client.recv().await.unwrap();
    let value: serde_json::Value = serde_json::from_str(&written).unwrap();
    assert_eq!(value, serde_json::json!({"chat_id": 1, "content": "Thanks!"}));
}

#[tokio::test]
async fn test_send_rejected_while_disconnected() {
    let (connector, _peers) = MockConnector::new();
    let (transport, _events) = transport(connector, None);

    let result = transport.send(&OutboundFrame::text(1, "hi")).await;
    assert!(matches!(result, Err(TransportError::NotOpen(ConnectionState::Disconnected))));
}

#[tokio::test]
async fn test_send_rejected_while_connecting() {
    let gate = Arc::new(Notify::new());
    let (connector, _peers) = MockConnector::new();
    let (transport, _events) = transport(connector, Some(gate.clone()));
    let transport = Arc::new(transport);

    let connecting = {
        let transport = Arc::clone(&transport);
        tokio::spawn(async move { transport.connect().await })
    };
    wait_for_state(&transport, ConnectionState::Connecting).await;

    let result = transport.send(&OutboundFrame::text(1, "too early")).await;
    assert!(matches!(result, Err(TransportError::NotOpen(ConnectionState::Connecting))));

    gate.notify_one();
    connecting.await.unwrap().unwrap();
    assert_eq!(transport.state(), ConnectionState::Open);
}

#[tokio::test]
async fn test_second_connect_is_rejected() {
    let (connector, _peers) = MockConnector::new();
    let (transport, _events) = transport(connector, None);

    transport.connect().await.unwrap();
    let result = transport.connect().await;
    assert!(matches!(result, Err(TransportError::AlreadyActive(ConnectionState::Open))));
}

#[tokio::test]
async fn test_unexpected_close_reconnects_once() {
    let (connector, mut peers) = MockConnector::new();
    let (transport, mut events) = transport(Arc::clone(&connector), None);
    transport.connect().await.unwrap();

    let first = peers.recv().await.unwrap();
    drop(first);

    let second = tokio::time::timeout(WAIT, peers.recv()).await.unwrap().unwrap();
    wait_for_state(&transport, ConnectionState::Open).await;
    assert_eq!(connector.attempts(), 2);

    second.to_client.send(frame(9, "text", "back online")).unwrap();
    assert_eq!(next_message(&mut events).await.id, 9);
}

#[tokio::test]
async fn test_failed_reconnect_reports_and_stops() {
    let (connector, mut peers) = MockConnector::new();
    connector.refuse_after_first.store(true, Ordering::SeqCst);
    let (transport, mut events) = transport(Arc::clone(&connector), None);
    transport.connect().await.unwrap();

    drop(peers.recv().await.unwrap());

    let failure = loop {
        match tokio::time::timeout(WAIT, events.recv()).await {
            Ok(Some(TransportEvent::Failed(reason))) => break reason,
            Ok(Some(_)) => continue,
            other => panic!("no failure reported: {other:?}"),
        }
    };
    assert!(failure.contains("connection refused"));
    assert_eq!(transport.state(), ConnectionState::Disconnected);

    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(connector.attempts(), 2);
}

#[tokio::test]
async fn test_explicit_close_suppresses_reconnect() {
    let (connector, mut peers) = MockConnector::new();
    let (transport, _events) = transport(Arc::clone(&connector), None);
    transport.connect().await.unwrap();
    let mut peer = peers.recv().await.unwrap();

    transport.close().await;
    assert_eq!(transport.state(), ConnectionState::Disconnected);

    // The client side of the socket goes away with the transport's sender
    assert!(peer.from_client.recv().await.is_none());
    drop(peer);

    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(connector.attempts(), 1);
    assert_eq!(transport.state(), ConnectionState::Disconnected);
    assert!(matches!(transport.connect().await, Err(TransportError::TornDown)));
}

#[tokio::test]
async fn test_close_during_reconnect_delay() {
    let (connector, mut peers) = MockConnector::new();
    let api = Arc::new(TokenApi { token: "t".to_string(), gate: None });
    let config = TransportConfig::new("ws://chat.test/ws/chat/")
        .with_reconnect_delay(Duration::from_millis(200));
    let (transport, _events) = RealtimeTransport::new(api, connector.clone(), config);
    transport.connect().await.unwrap();

    drop(peers.recv().await.unwrap());
    wait_for_state(&transport, ConnectionState::Closed).await;

    transport.close().await;
    tokio::time::sleep(Duration::from_millis(300)).await;

    assert_eq!(connector.attempts(), 1);
    assert_eq!(transport.state(), ConnectionState::Disconnected);
}
