//! Per-connection session state machine (spec.md §4.7):
//! `AwaitingHello` → `Connected` → `Closing`, plus per-remote bad-code
//! lockout tracking. The `Listening` state itself belongs to the
//! supervisor (C9) — a [`Session`] only exists once a transport has been
//! accepted.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use strum_macros::Display;
use tracing::{instrument, warn};

use crate::codec::{AckMessage, ByeMessage, Message};
use crate::config::HostConfig;
use crate::error::{SessionError, TransportError};
use crate::protocol::{AckStatus, MAX_VERSION, MIN_VERSION};
use crate::transport::{Transport, TransportKind};

/// How long a newly-accepted transport has to send `HELLO` before the
/// session gives up on it.
pub const HELLO_TIMEOUT: Duration = Duration::from_secs(5);

/// Why a session ended, feeding both `on_disconnected` events and
/// [`crate::metrics::HostMetrics`].
#[derive(Debug, Clone, Copy, Eq, PartialEq, Display)]
pub enum DisconnectReason {
    #[strum(to_string = "bad_code")]
    BadCode,
    #[strum(to_string = "busy")]
    Busy,
    #[strum(to_string = "version_mismatch")]
    VersionMismatch,
    #[strum(to_string = "timeout")]
    Timeout,
    #[strum(to_string = "peer_closed")]
    PeerClosed,
    #[strum(to_string = "bye")]
    Bye,
    #[strum(to_string = "stopped")]
    Stopped,
}

/// The current phase of one session's lifecycle.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Display)]
pub enum SessionState {
    #[strum(to_string = "awaiting_hello")]
    AwaitingHello,
    #[strum(to_string = "connected")]
    Connected,
    #[strum(to_string = "closing")]
    Closing,
}

/// Read-only diagnostic view of a [`Session`] (mirrors the teacher's
/// `InspectReport` accessor style).
#[derive(Debug, Clone)]
pub struct SessionSnapshot {
    pub state: SessionState,
    pub transport_kind: TransportKind,
    pub remote: String,
    pub negotiated_version: u8,
    pub connected_since: Instant,
    pub last_inbound_at: Instant,
}

/// Outcome of attempting to authenticate a freshly-accepted transport.
pub enum AuthOutcome {
    /// `HELLO` was accepted; the session is now `Connected`.
    Connected(Session),
    /// The transport was rejected and already closed.
    Rejected { reason: DisconnectReason },
}

/// Normalizes a [`Transport::remote`] string into a lockout key.
///
/// TCP's `remote()` is `ip:ephemeral_port`, and a reconnecting mobile gets a
/// fresh ephemeral port every time — keying strikes on the raw string would
/// mean a locked-out remote's *next* connection attempt always lands under
/// a fresh key and the lockout would never actually bite. Stripping to the
/// IP (when the string parses as a socket address; BLE device ids pass
/// through unchanged) makes repeated attempts from the same host collide.
fn lockout_key(remote: &str) -> String {
    match remote.parse::<std::net::SocketAddr>() {
        Ok(addr) => addr.ip().to_string(),
        Err(_) => remote.to_string(),
    }
}

/// Tracks bad-auth-code strikes per remote address (spec.md §4.7: 3
/// strikes within 60s locks a remote out).
#[derive(Debug, Default)]
pub struct LockoutTracker {
    strikes: HashMap<String, (u32, Instant)>,
}

impl LockoutTracker {
    /// Creates an empty tracker.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Reports whether `remote` is currently locked out.
    #[must_use]
    pub fn is_locked_out(&self, remote: &str) -> bool {
        self.strikes
            .get(&lockout_key(remote))
            .is_some_and(|(count, window_start)| {
                *count >= crate::config::LOCKOUT_STRIKES
                    && window_start.elapsed() < crate::config::LOCKOUT_WINDOW
            })
    }

    /// Records one bad-auth-code attempt, returning whether this attempt
    /// newly tripped the lockout.
    pub fn record_failure(&mut self, remote: &str) -> bool {
        let entry = self
            .strikes
            .entry(lockout_key(remote))
            .or_insert((0, Instant::now()));
        if entry.1.elapsed() >= crate::config::LOCKOUT_WINDOW {
            *entry = (0, Instant::now());
        }
        entry.0 += 1;
        entry.0 >= crate::config::LOCKOUT_STRIKES
    }

    /// Clears strikes for `remote` after a successful auth.
    pub fn reset(&mut self, remote: &str) {
        self.strikes.remove(&lockout_key(remote));
    }
}

fn ack(status: AckStatus) -> Message {
    Message::Ack(AckMessage {
        status: status.as_byte(),
        min_ver: MIN_VERSION,
        max_ver: MAX_VERSION,
    })
}

/// One authenticated session with the single connected mobile peer.
pub struct Session {
    transport: Box<dyn Transport>,
    transport_kind: TransportKind,
    state: SessionState,
    session_id: u32,
    remote: String,
    negotiated_version: u8,
    connected_since: Instant,
    last_inbound_at: Instant,
    heartbeat_counter: u32,
}

impl Session {
    /// Drives the `AwaitingHello` phase of a freshly-accepted transport to
    /// completion: reads `HELLO`, checks lockout/busy/auth, and sends the
    /// matching `ACK` (plus the initial `CONFIG` on success).
    ///
    /// `busy` is `true` when another session is already `Connected` —
    /// single-client exclusivity (spec.md §4.7) is enforced by the caller,
    /// not by this function.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::Transport`] on I/O failure while reading or
    /// writing the transport.
    #[instrument(skip(transport, config, lockouts), fields(transport_kind = %transport_kind))]
    pub async fn accept(
        mut transport: Box<dyn Transport>,
        transport_kind: TransportKind,
        busy: bool,
        config: &HostConfig,
        lockouts: &mut LockoutTracker,
    ) -> Result<AuthOutcome, SessionError> {
        let remote = transport.remote();

        if lockouts.is_locked_out(&remote) {
            warn!(%remote, "rejecting connection from locked-out remote");
            let _ = transport.send(&ack(AckStatus::BadCode)).await;
            let _ = transport.close().await;
            return Ok(AuthOutcome::Rejected {
                reason: DisconnectReason::BadCode,
            });
        }

        let hello = match Self::await_hello(&mut transport).await {
            Ok(Some(hello)) => hello,
            Ok(None) => {
                return Ok(AuthOutcome::Rejected {
                    reason: DisconnectReason::PeerClosed,
                });
            }
            Err(AwaitHelloError::Timeout) => {
                let _ = transport.close().await;
                return Ok(AuthOutcome::Rejected {
                    reason: DisconnectReason::Timeout,
                });
            }
            Err(AwaitHelloError::VersionMismatch) => {
                let _ = transport.send(&ack(AckStatus::VersionMismatch)).await;
                let _ = transport.close().await;
                return Ok(AuthOutcome::Rejected {
                    reason: DisconnectReason::VersionMismatch,
                });
            }
            Err(AwaitHelloError::Transport(err)) => return Err(SessionError::Transport(err)),
            Err(AwaitHelloError::UnexpectedMessage) => {
                let _ = transport.close().await;
                return Ok(AuthOutcome::Rejected {
                    reason: DisconnectReason::PeerClosed,
                });
            }
        };

        if busy {
            transport.send(&ack(AckStatus::Busy)).await?;
            transport.close().await?;
            return Ok(AuthOutcome::Rejected {
                reason: DisconnectReason::Busy,
            });
        }

        if hello.code.as_slice() != config.auth_code().as_bytes() {
            let locked_out = lockouts.record_failure(&remote);
            if locked_out {
                warn!(%remote, "remote locked out after repeated bad auth codes");
            }
            transport.send(&ack(AckStatus::BadCode)).await?;
            transport.close().await?;
            return Ok(AuthOutcome::Rejected {
                reason: DisconnectReason::BadCode,
            });
        }
        lockouts.reset(&remote);

        transport.send(&ack(AckStatus::Ok)).await?;

        let initial_config = config.initial_config_payload();
        if !initial_config.is_empty() {
            transport
                .send(&Message::Config(crate::codec::ConfigMessage {
                    config: initial_config.to_vec(),
                }))
                .await?;
        }

        let negotiated_version = transport.last_version();
        let now = Instant::now();
        Ok(AuthOutcome::Connected(Session {
            transport,
            transport_kind,
            state: SessionState::Connected,
            session_id: hello.session_id,
            remote,
            negotiated_version,
            connected_since: now,
            last_inbound_at: now,
            heartbeat_counter: 0,
        }))
    }

    async fn await_hello(
        transport: &mut Box<dyn Transport>,
    ) -> Result<Option<crate::codec::HelloMessage>, AwaitHelloError> {
        let recv_result = tokio::time::timeout(HELLO_TIMEOUT, transport.recv()).await;
        match recv_result {
            Err(_elapsed) => Err(AwaitHelloError::Timeout),
            Ok(Err(TransportError::Codec(crate::error::CodecError::UnsupportedVersion {
                ..
            }))) => Err(AwaitHelloError::VersionMismatch),
            Ok(Err(err)) => Err(AwaitHelloError::Transport(err)),
            Ok(Ok(None)) => Ok(None),
            Ok(Ok(Some(Message::Hello(hello)))) => Ok(Some(hello)),
            Ok(Ok(Some(_other))) => Err(AwaitHelloError::UnexpectedMessage),
        }
    }

    /// Waits for the next inbound message, updating the liveness clock.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::Transport`] on I/O or decode failure.
    pub async fn recv(&mut self) -> Result<Option<Message>, SessionError> {
        let message = self.transport.recv().await?;
        if message.is_some() {
            self.last_inbound_at = Instant::now();
        }
        Ok(message)
    }

    /// Sends one message over this session's transport.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::Transport`] on I/O failure.
    pub async fn send(&mut self, message: &Message) -> Result<(), SessionError> {
        self.transport.send(message).await.map_err(SessionError::Transport)
    }

    /// Validates a `BYE`'s session id and transitions to `Closing`.
    pub fn handle_bye(&mut self, bye: &ByeMessage) {
        if bye.session_id != self.session_id {
            warn!(
                expected = self.session_id,
                got = bye.session_id,
                "BYE session_id does not match the session that authenticated"
            );
        }
        self.state = SessionState::Closing;
    }

    /// Closes the underlying transport.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::Transport`] on I/O failure.
    pub async fn close(&mut self) -> Result<(), SessionError> {
        self.state = SessionState::Closing;
        self.transport.close().await.map_err(SessionError::Transport)
    }

    /// Returns how long it has been since the last inbound message.
    #[must_use]
    pub fn silence_duration(&self) -> Duration {
        self.last_inbound_at.elapsed()
    }

    /// Returns this session's negotiated transport kind.
    #[must_use]
    pub fn transport_kind(&self) -> TransportKind {
        self.transport_kind
    }

    /// Returns the session id the mobile peer proposed in `HELLO`.
    #[must_use]
    pub fn session_id(&self) -> u32 {
        self.session_id
    }

    /// Returns a read-only diagnostic snapshot of this session.
    #[must_use]
    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            state: self.state,
            transport_kind: self.transport_kind,
            remote: self.remote.clone(),
            negotiated_version: self.negotiated_version,
            connected_since: self.connected_since,
            last_inbound_at: self.last_inbound_at,
        }
    }

    /// Builds the next `HEARTBEAT` for this session, incrementing its
    /// counter and recomputing uptime from `connected_since` (spec.md
    /// §4.10: "host increments `counter` and recomputes `uptime_ms` every
    /// 500 ms").
    pub fn next_heartbeat(&mut self) -> crate::codec::HeartbeatMessage {
        self.heartbeat_counter += 1;
        let uptime_ms = u32::try_from(self.connected_since.elapsed().as_millis()).unwrap_or(u32::MAX);
        crate::codec::HeartbeatMessage {
            counter: self.heartbeat_counter,
            uptime_ms,
        }
    }
}

enum AwaitHelloError {
    Timeout,
    VersionMismatch,
    UnexpectedMessage,
    Transport(TransportError),
}
