pub mod dto;
pub mod message;
pub mod preview;

pub use dto::{HistoryPage, MessageBackendDto, OutboundFrame, PreviewDto, SocketToken};
pub use message::{MessageKind, MessagePayload, MessageRecord, TutorRequest, TutorRequestStatus};
pub use preview::{relative_time_label, ThreadPreview, TUTOR_REQUEST_LABEL};

/// Server-assigned conversation key
pub type ThreadId = i64;

/// Server-assigned message key, monotonic within a thread
pub type MessageId = i64;

/// Server-assigned user key
pub type UserId = i64;
