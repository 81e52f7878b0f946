//! TCP implementation of [`super::Transport`]: length-prefixed framing
//! (`framing`) carrying codec-encoded messages (`codec`).

use async_trait::async_trait;
use tokio::io::AsyncWriteExt;
use tokio::net::TcpStream;
use tracing::instrument;

use crate::codec::{self, Message};
use crate::error::TransportError;
use crate::framing;

use super::Transport;

/// A [`Transport`] backed by one accepted [`TcpStream`].
pub struct TcpTransport {
    stream: TcpStream,
    remote: String,
    connected: bool,
    last_version: u8,
}

impl TcpTransport {
    /// Wraps an already-accepted TCP stream, tuned by the caller (spec.md §4.6).
    #[must_use]
    pub fn new(stream: TcpStream) -> Self {
        let remote = stream
            .peer_addr()
            .map(|addr| addr.to_string())
            .unwrap_or_else(|_| "unknown".to_string());
        Self {
            stream,
            remote,
            connected: true,
            last_version: crate::protocol::MAX_VERSION,
        }
    }
}

#[async_trait]
impl Transport for TcpTransport {
    #[instrument(skip(self, message), fields(remote = %self.remote, msg_type = %message.message_type()))]
    async fn send(&mut self, message: &Message) -> Result<(), TransportError> {
        let payload = codec::encode(message);
        framing::write_message(&mut self.stream, &payload).await?;
        Ok(())
    }

    #[instrument(skip(self), fields(remote = %self.remote))]
    async fn recv(&mut self) -> Result<Option<Message>, TransportError> {
        let Some(payload) = framing::read_message(&mut self.stream).await? else {
            self.connected = false;
            return Ok(None);
        };
        if let Some(&version) = payload.get(5) {
            self.last_version = version;
        }
        let message = codec::decode(&payload)?;
        Ok(Some(message))
    }

    fn is_connected(&self) -> bool {
        self.connected
    }

    async fn close(&mut self) -> Result<(), TransportError> {
        self.connected = false;
        self.stream.shutdown().await.map_err(TransportError::Io)
    }

    fn remote(&self) -> String {
        self.remote.clone()
    }

    fn last_version(&self) -> u8 {
        self.last_version
    }
}
