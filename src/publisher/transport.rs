//! Channel transport seam.
//!
//! The publisher talks to the broker through [`ChannelConnector`] /
//! [`ChannelLink`] so its scheduling logic can be exercised against an
//! in-process fake. Production traffic goes through [`WsConnector`],
//! which opens one WebSocket connection per publish attempt.

use crate::error::{Error, Result};
use async_trait::async_trait;
use futures_util::{SinkExt, StreamExt};
use tokio_tungstenite::tungstenite::Message as WsMessage;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};

/// One open, bidirectional text channel to the broker.
#[async_trait]
pub trait ChannelLink: Send {
    /// Send one outbound frame.
    async fn send(&mut self, text: String) -> Result<()>;

    /// Receive the next inbound frame. `None` means the peer closed the
    /// channel.
    async fn recv(&mut self) -> Result<Option<String>>;
}

/// Opens a fresh [`ChannelLink`] for each publish attempt.
#[async_trait]
pub trait ChannelConnector: Send + Sync {
    async fn connect(&self) -> Result<Box<dyn ChannelLink>>;
}

/// WebSocket connector for the broker's collect channel.
pub struct WsConnector {
    url: String,
}

impl WsConnector {
    pub fn new(url: impl Into<String>) -> Self {
        Self { url: url.into() }
    }
}

#[async_trait]
impl ChannelConnector for WsConnector {
    async fn connect(&self) -> Result<Box<dyn ChannelLink>> {
        let (stream, _response) = tokio_tungstenite::connect_async(self.url.as_str()).await?;
        tracing::debug!(url = %self.url, "channel connected");
        Ok(Box::new(WsLink { stream }))
    }
}

struct WsLink {
    stream: WebSocketStream<MaybeTlsStream<tokio::net::TcpStream>>,
}

#[async_trait]
impl ChannelLink for WsLink {
    async fn send(&mut self, text: String) -> Result<()> {
        self.stream.send(WsMessage::text(text)).await?;
        Ok(())
    }

    async fn recv(&mut self) -> Result<Option<String>> {
        while let Some(message) = self.stream.next().await {
            match message? {
                WsMessage::Text(text) => return Ok(Some(text.to_string())),
                WsMessage::Binary(bytes) => {
                    let text = String::from_utf8(bytes.to_vec())
                        .map_err(|_| Error::protocol("binary frame was not valid UTF-8"))?;
                    return Ok(Some(text));
                }
                WsMessage::Close(_) => return Ok(None),
                // Ping/pong are handled by tungstenite; skip anything else.
                _ => continue,
            }
        }
        Ok(None)
    }
}
