//! TCP listener setup and per-connection socket tuning (spec.md §4.6).

use socket2::{SockRef, TcpKeepalive};
use tokio::net::{TcpListener, TcpSocket, TcpStream};
use tracing::instrument;

use crate::error::HostError;

const KEEPALIVE_IDLE: std::time::Duration = std::time::Duration::from_secs(5);
const KEEPALIVE_INTERVAL: std::time::Duration = std::time::Duration::from_secs(1);
const KEEPALIVE_RETRIES: u32 = 3;
const SOCKET_BUFFER_BYTES: usize = 32 * 1024;

/// Binds the TCP listener on `0.0.0.0:<port>` with `SO_REUSEADDR` and a
/// backlog of one connection (spec.md §4.6: one client at a time).
///
/// # Errors
///
/// Returns [`HostError::Bind`] if the address is already in use or cannot
/// be bound.
#[instrument]
pub fn bind(port: u16) -> Result<TcpListener, HostError> {
    let socket = TcpSocket::new_v4().map_err(|source| HostError::Bind {
        kind: "tcp listener socket",
        source,
    })?;
    socket.set_reuseaddr(true).map_err(|source| HostError::Bind {
        kind: "tcp listener SO_REUSEADDR",
        source,
    })?;
    let addr = std::net::SocketAddr::from((
        std::net::IpAddr::V4(std::net::Ipv4Addr::UNSPECIFIED),
        port,
    ));
    socket.bind(addr).map_err(|source| HostError::Bind {
        kind: "tcp listener bind",
        source,
    })?;
    socket.listen(1).map_err(|source| HostError::Bind {
        kind: "tcp listener listen",
        source,
    })
}

/// Applies the per-connection socket tuning spec.md §4.6 requires:
/// `TCP_NODELAY`, a keepalive probe schedule, and fixed send/recv buffers.
///
/// Tuning failures are logged, not fatal — a connection that cannot be
/// tuned is still usable, just not to spec.
#[instrument(skip(stream))]
pub fn tune(stream: &TcpStream) {
    if let Err(err) = stream.set_nodelay(true) {
        tracing::warn!(error = %err, "failed to set TCP_NODELAY");
    }

    let socket_ref = SockRef::from(stream);
    let keepalive = TcpKeepalive::new()
        .with_time(KEEPALIVE_IDLE)
        .with_interval(KEEPALIVE_INTERVAL);
    #[cfg(not(target_os = "windows"))]
    let keepalive = keepalive.with_retries(KEEPALIVE_RETRIES);
    if let Err(err) = socket_ref.set_tcp_keepalive(&keepalive) {
        tracing::warn!(error = %err, "failed to configure TCP keepalive");
    }
    if let Err(err) = socket_ref.set_recv_buffer_size(SOCKET_BUFFER_BYTES) {
        tracing::warn!(error = %err, "failed to set SO_RCVBUF");
    }
    if let Err(err) = socket_ref.set_send_buffer_size(SOCKET_BUFFER_BYTES) {
        tracing::warn!(error = %err, "failed to set SO_SNDBUF");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn bind_accepts_a_connection() {
        let listener = bind(0).expect("ephemeral port bind should succeed");
        let addr = listener.local_addr().unwrap();

        let client_task = tokio::spawn(async move { TcpStream::connect(addr).await.unwrap() });
        let (server_stream, _) = listener.accept().await.unwrap();
        let _client_stream = client_task.await.unwrap();

        tune(&server_stream);
    }
}
