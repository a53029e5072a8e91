use async_trait::async_trait;
use tokio::sync::mpsc;
use url::Url;

use crate::error::Result;

/// Text-frame channels of one established socket.
///
/// Dropping `outbound` closes the socket; `inbound` yields `None` once the
/// peer has closed it.
pub struct SocketChannels {
    pub outbound: mpsc::UnboundedSender<String>,
    pub inbound: mpsc::UnboundedReceiver<String>,
}

/// Opens duplex text sockets
#[async_trait]
pub trait SocketConnector: Send + Sync {
    async fn connect(&self, url: &Url) -> Result<SocketChannels>;
}
