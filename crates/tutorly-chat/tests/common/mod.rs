#![allow(dead_code)]

use async_trait::async_trait;
use chrono::{DateTime, Duration, TimeZone, Utc};
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::{mpsc, Notify};
use tutorly_api::{ApiError, ChatApi};
use tutorly_realtime::{SocketChannels, SocketConnector};
use tutorly_types::{HistoryPage, MessageBackendDto, PreviewDto, ThreadId, UserId};
use url::Url;

#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    Previews,
    History {
        thread_id: ThreadId,
        limit: usize,
        before: Option<DateTime<Utc>>,
    },
    MarkRead(ThreadId),
    GetOrCreate(UserId),
    SocketToken,
}

pub enum Reply {
    Page(HistoryPage),
    Fail,
}

/// Scripted collaborator endpoints
#[derive(Default)]
pub struct MockChatApi {
    pub previews: Mutex<Vec<PreviewDto>>,
    pub history: Mutex<HashMap<ThreadId, VecDeque<Reply>>>,
    pub calls: Mutex<Vec<Call>>,
    pub fail_mark_read: AtomicBool,
    pub created: Mutex<Option<PreviewDto>>,
    /// When set, history requests wait for a notification
    pub history_gate: Mutex<Option<Arc<Notify>>>,
}

impl MockChatApi {
    pub fn new(previews: Vec<PreviewDto>) -> Arc<Self> {
        Arc::new(Self {
            previews: Mutex::new(previews),
            ..Default::default()
        })
    }

    pub fn push_page(&self, thread_id: ThreadId, messages: Vec<MessageBackendDto>, has_more: bool) {
        self.history
            .lock()
            .unwrap()
            .entry(thread_id)
            .or_default()
            .push_back(Reply::Page(HistoryPage { messages, has_more }));
    }

    pub fn push_failure(&self, thread_id: ThreadId) {
        self.history
            .lock()
            .unwrap()
            .entry(thread_id)
            .or_default()
            .push_back(Reply::Fail);
    }

    pub fn gate_history(&self) -> Arc<Notify> {
        let gate = Arc::new(Notify::new());
        *self.history_gate.lock().unwrap() = Some(Arc::clone(&gate));
        gate
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub fn history_calls(&self) -> Vec<Call> {
        self.calls()
            .into_iter()
            .filter(|call| matches!(call, Call::History { .. }))
            .collect()
    }

    fn record(&self, call: Call) {
        self.calls.lock().unwrap().push(call);
    }
}

#[async_trait]
impl ChatApi for MockChatApi {
    async fn list_previews(&self) -> tutorly_api::Result<Vec<PreviewDto>> {
        self.record(Call::Previews);
        Ok(self.previews.lock().unwrap().clone())
    }

    async fn fetch_history(
        &self,
        thread_id: ThreadId,
        limit: usize,
        created_before: Option<DateTime<Utc>>,
    ) -> tutorly_api::Result<HistoryPage> {
        self.record(Call::History {
            thread_id,
            limit,
            before: created_before,
        });

        let gate = self.history_gate.lock().unwrap().clone();
        if let Some(gate) = gate {
            gate.notified().await;
        }

        let reply = self
            .history
            .lock()
            .unwrap()
            .get_mut(&thread_id)
            .and_then(VecDeque::pop_front);
        match reply {
            Some(Reply::Page(page)) => Ok(page),
            Some(Reply::Fail) => Err(ApiError::Status {
                status: 502,
                body: "bad gateway".to_string(),
            }),
            None => Ok(HistoryPage {
                messages: Vec::new(),
                has_more: false,
            }),
        }
    }

    async fn mark_read(&self, thread_id: ThreadId) -> tutorly_api::Result<()> {
        self.record(Call::MarkRead(thread_id));
        if self.fail_mark_read.load(Ordering::SeqCst) {
            return Err(ApiError::Status {
                status: 500,
                body: String::new(),
            });
        }
        Ok(())
    }

    async fn get_or_create_chat(&self, other_user_id: UserId) -> tutorly_api::Result<PreviewDto> {
        self.record(Call::GetOrCreate(other_user_id));
        self.created.lock().unwrap().clone().ok_or(ApiError::Status {
            status: 404,
            body: "no such user".to_string(),
        })
    }

    async fn socket_token(&self) -> tutorly_api::Result<String> {
        self.record(Call::SocketToken);
        Ok("socket-token".to_string())
    }
}

/// Server side of one mock socket
pub struct MockPeer {
    pub url: Url,
    pub from_client: mpsc::UnboundedReceiver<String>,
    pub to_client: mpsc::UnboundedSender<String>,
}

pub struct MockConnector {
    peers: mpsc::UnboundedSender<MockPeer>,
}

impl MockConnector {
    pub fn new() -> (Arc<Self>, mpsc::UnboundedReceiver<MockPeer>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Arc::new(Self { peers: tx }), rx)
    }
}

#[async_trait]
impl SocketConnector for MockConnector {
    async fn connect(&self, url: &Url) -> tutorly_realtime::Result<SocketChannels> {
        let (outbound_tx, outbound_rx) = mpsc::unbounded_channel();
        let (inbound_tx, inbound_rx) = mpsc::unbounded_channel();
        let _ = self.peers.send(MockPeer {
            url: url.clone(),
            from_client: outbound_rx,
            to_client: inbound_tx,
        });
        Ok(SocketChannels {
            outbound: outbound_tx,
            inbound: inbound_rx,
        })
    }
}

pub fn at(minute: i64) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 3, 1, 9, 0, 0).unwrap() + Duration::minutes(minute)
}

pub fn preview(id: ThreadId, has_messages: bool) -> PreviewDto {
    PreviewDto {
        id,
        name: format!("Student {}", id),
        last_message: has_messages.then(|| "see you then".to_string()),
        last_update: has_messages.then(|| at(100)),
        last_message_type: has_messages.then(|| "text".to_string()),
        has_unread: has_messages,
        is_locked: false,
        has_messages,
    }
}

pub fn text_dto(id: i64, chat_id: ThreadId, minute: i64) -> MessageBackendDto {
    MessageBackendDto {
        id,
        chat_id,
        sender: "Ada".to_string(),
        content: format!("message {}", id),
        message_type: "text".to_string(),
        created_at: at(minute),
        updated_at: at(minute),
        sent_by_user: false,
    }
}

pub fn tutor_request_dto(id: i64, chat_id: ThreadId, minute: i64, status: &str) -> MessageBackendDto {
    let content = serde_json::json!({
        "hourly_rate": 45.0,
        "lesson_duration": 60,
        "assignment_request_id": 300 + id,
        "assignment_id": 77,
        "tutor_id": 9,
        "assignment_title": "Calculus II",
        "status": status
    })
    .to_string();
    MessageBackendDto {
        content,
        message_type: "tutor_request".to_string(),
        ..text_dto(id, chat_id, minute)
    }
}

/// Page of consecutive text messages, oldest first
pub fn page_dtos(chat_id: ThreadId, ids: std::ops::RangeInclusive<i64>) -> Vec<MessageBackendDto> {
    ids.map(|id| text_dto(id, chat_id, id)).collect()
}
