pub mod config;
pub mod connector;
pub mod error;
pub mod state;
pub mod transport;
pub mod ws;

pub use config::TransportConfig;
pub use connector::{SocketChannels, SocketConnector};
pub use error::{Result, TransportError};
pub use state::{ConnectionState, TransportEvent};
pub use transport::RealtimeTransport;
pub use ws::WsConnector;
