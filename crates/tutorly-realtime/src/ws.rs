use async_trait::async_trait;
use futures::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tokio_tungstenite::{connect_async, tungstenite::Message};
use url::Url;

use crate::connector::{SocketChannels, SocketConnector};
use crate::error::Result;

/// WebSocket connector backed by tokio-tungstenite
#[derive(Debug, Clone, Copy, Default)]
pub struct WsConnector;

#[async_trait]
impl SocketConnector for WsConnector {
    async fn connect(&self, url: &Url) -> Result<SocketChannels> {
        let (ws_stream, _) = connect_async(url.as_str()).await?;
        let (mut ws_sender, mut ws_receiver) = ws_stream.split();

        let (outbound_tx, mut outbound_rx) = mpsc::unbounded_channel::<String>();
        let (inbound_tx, inbound_rx) = mpsc::unbounded_channel::<String>();

        tokio::spawn(async move {
            while let Some(text) = outbound_rx.recv().await {
                if let Err(e) = ws_sender.send(Message::Text(text)).await {
                    tracing::debug!("WebSocket send failed: {}", e);
                    break;
                }
            }
            let _ = ws_sender.close().await;
        });

        tokio::spawn(async move {
            while let Some(frame) = ws_receiver.next().await {
                match frame {
                    Ok(Message::Text(text)) => {
                        if inbound_tx.send(text).is_err() {
                            break;
                        }
                    }
                    Ok(Message::Close(reason)) => {
                        tracing::debug!("Server closed socket: {:?}", reason);
                        break;
                    }
                    Ok(_) => continue,
                    Err(e) => {
                        tracing::warn!("WebSocket error: {}", e);
                        break;
                    }
                }
            }
        });

        Ok(SocketChannels {
            outbound: outbound_tx,
            inbound: inbound_rx,
        })
    }
}
