pub mod config;
pub mod error;
pub mod pagination;
pub mod registry;
pub mod selection;
pub mod session;
pub mod store;
pub mod thread;

pub use config::ChatConfig;
pub use error::{ChatError, Result};
pub use pagination::{scroll_delta, PageOutcome, PaginationController, ScrollAnchor};
pub use registry::ThreadRegistry;
pub use selection::{SelectionController, SelectionOutcome};
pub use session::{ChatNotice, ChatSession, ChatSessionBuilder};
pub use store::ChatStore;
pub use thread::ThreadState;

pub use tutorly_realtime::{ConnectionState, TransportConfig};
pub use tutorly_types::{MessageKind, MessagePayload, MessageRecord, ThreadId, ThreadPreview};
