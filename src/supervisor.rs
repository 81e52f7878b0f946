//! The public entry point: [`Host`] owns the listener, beacon, and
//! session lifecycle, and accepts exactly one connected session at a time
//! (spec.md §4.9, §9 "no global mutable state").

use std::sync::Arc;

use tokio::net::TcpListener;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, instrument, warn};

use crate::beacon;
use crate::codec::Message;
use crate::config::HostConfig;
use crate::error::{CodecError, HostError, SessionError, TransportError};
use crate::liveness::{self, LivenessEvent};
use crate::listener;
use crate::metrics::HostMetrics;
use crate::router::{Event, EventSink, OutboundChannels, OutboundRouter};
use crate::session::{AuthOutcome, DisconnectReason, LockoutTracker, Session};
use crate::transport::tcp::TcpTransport;
use crate::transport::{Transport, TransportKind};

/// A running televoodoo host: one TCP listener, one UDP beacon, and at
/// most one connected session at a time.
///
/// There is no global mutable state — everything a running host needs is
/// owned by this struct or tasks it spawned, and dropped when
/// [`Host::stop`] tears them down.
pub struct Host {
    shutdown_tx: watch::Sender<bool>,
    metrics: HostMetrics,
    router: OutboundRouter,
    local_addr: std::net::SocketAddr,
    accept_task: JoinHandle<()>,
    beacon_task: JoinHandle<()>,
}

impl Host {
    /// Binds the TCP listener and UDP beacon and starts accepting
    /// connections. Exactly one session may be `Connected` at a time;
    /// further `HELLO` attempts receive `ACK(BUSY)` (spec.md §4.7).
    ///
    /// # Errors
    ///
    /// Returns [`HostError::Config`] if `config` fails validation, or
    /// [`HostError::Bind`] if the TCP or UDP socket cannot be bound.
    #[instrument(skip(config, event_sink))]
    pub async fn start(
        config: HostConfig,
        event_sink: Arc<dyn EventSink>,
    ) -> Result<Self, HostError> {
        config.validate()?;

        let tcp_listener = listener::bind(config.tcp_port())?;
        let local_addr = tcp_listener.local_addr().map_err(|source| HostError::Bind {
            kind: "tcp listener local_addr",
            source,
        })?;
        let metrics = HostMetrics::new();
        let router = OutboundRouter::new();
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        let beacon_task = tokio::spawn(run_beacon(
            config.service_name().to_string(),
            config.tcp_port(),
            config.beacon_port(),
            config.beacon_interval(),
            metrics.clone(),
            shutdown_rx.clone(),
        ));

        let accept_task = tokio::spawn(accept_loop(
            tcp_listener,
            config,
            metrics.clone(),
            event_sink,
            router.clone(),
            shutdown_rx,
        ));

        info!("televoodoo host started");

        Ok(Self {
            shutdown_tx,
            metrics,
            router,
            local_addr,
            accept_task,
            beacon_task,
        })
    }

    /// Returns the handle used to push `HAPTIC`/`CONFIG` sends to
    /// whichever session is currently connected.
    #[must_use]
    pub fn router(&self) -> &OutboundRouter {
        &self.router
    }

    /// Returns this host's live counters.
    #[must_use]
    pub fn metrics(&self) -> &HostMetrics {
        &self.metrics
    }

    /// Returns the address the TCP listener actually bound, useful when
    /// `tcp_port` was `0` (an ephemeral port, as in tests).
    #[must_use]
    pub fn local_addr(&self) -> std::net::SocketAddr {
        self.local_addr
    }

    /// Signals shutdown and waits for the listener, beacon, and any
    /// connected session to wind down.
    pub async fn stop(self) {
        let _ = self.shutdown_tx.send(true);
        let _ = self.accept_task.await;
        let _ = self.beacon_task.await;
    }
}

async fn run_beacon(
    service_name: String,
    tcp_port: u16,
    beacon_port: u16,
    interval: std::time::Duration,
    metrics: HostMetrics,
    shutdown_rx: watch::Receiver<bool>,
) {
    if let Err(err) = beacon::run(
        service_name,
        tcp_port,
        beacon_port,
        interval,
        metrics,
        shutdown_rx,
    )
    .await
    {
        error!(error = %err, "beacon task exited");
    }
}

#[instrument(skip(tcp_listener, config, metrics, event_sink, router, shutdown_rx))]
async fn accept_loop(
    tcp_listener: TcpListener,
    config: HostConfig,
    metrics: HostMetrics,
    event_sink: Arc<dyn EventSink>,
    router: OutboundRouter,
    mut shutdown_rx: watch::Receiver<bool>,
) {
    let mut lockouts = LockoutTracker::new();
    let mut session_task: Option<JoinHandle<()>> = None;

    loop {
        tokio::select! {
            accepted = tcp_listener.accept() => {
                let (stream, remote_addr) = match accepted {
                    Ok(pair) => pair,
                    Err(err) => {
                        warn!(error = %err, "accept failed");
                        continue;
                    }
                };
                listener::tune(&stream);
                event_sink.on_event(Event::Connected {
                    transport_kind: TransportKind::Tcp,
                    remote: remote_addr.to_string(),
                });

                let transport: Box<dyn Transport> = Box::new(TcpTransport::new(stream));
                let busy = session_task.as_ref().is_some_and(|task| !task.is_finished());

                match Session::accept(transport, TransportKind::Tcp, busy, &config, &mut lockouts).await {
                    Ok(AuthOutcome::Connected(session)) => {
                        metrics.record_session_opened();
                        event_sink.on_event(Event::Authenticated {
                            session_id: session.session_id(),
                            remote: remote_addr.to_string(),
                        });
                        let channels = router.attach();
                        session_task = Some(tokio::spawn(run_session(
                            session,
                            config.ble_heartbeat_interval(),
                            config.ble_liveness_timeout(),
                            channels,
                            metrics.clone(),
                            event_sink.clone(),
                            router.clone(),
                            shutdown_rx.clone(),
                        )));
                    }
                    Ok(AuthOutcome::Rejected { reason }) => {
                        metrics.record_session_closed(reason);
                        event_sink.on_event(Event::Disconnected { reason });
                    }
                    Err(err) => {
                        warn!(error = %err, "session handshake failed");
                    }
                }
            }
            changed = shutdown_rx.changed() => {
                if changed.is_err() || *shutdown_rx.borrow() {
                    debug!("accept loop shutting down");
                    if let Some(task) = session_task.take() {
                        let _ = task.await;
                    }
                    return;
                }
            }
        }
    }
}

/// Drives one connected session: dispatches inbound `POSE`/`CMD`/`BYE` to
/// the event sink, drains queued outbound `HAPTIC`/`CONFIG` sends, and
/// (for BLE transports) enforces the heartbeat/liveness schedule in the
/// same `select!` loop — a single task owns `session` end to end, so the
/// liveness check only ever needs [`Session::silence_duration`], never a
/// second task racing the receive loop for access to it.
#[instrument(skip(session, outbound_channels, metrics, event_sink, router, shutdown_rx))]
async fn run_session(
    mut session: Session,
    ble_heartbeat_interval: std::time::Duration,
    ble_liveness_timeout: std::time::Duration,
    outbound_channels: OutboundChannels,
    metrics: HostMetrics,
    event_sink: Arc<dyn EventSink>,
    router: OutboundRouter,
    mut shutdown_rx: watch::Receiver<bool>,
) {
    let OutboundChannels {
        mut haptic_rx,
        mut config_rx,
    } = outbound_channels;

    let is_ble = session.transport_kind() == TransportKind::Ble;
    let mut heartbeat_ticker = tokio::time::interval(ble_heartbeat_interval);
    heartbeat_ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

    let reason = loop {
        tokio::select! {
            recv_result = session.recv() => {
                match recv_result {
                    Ok(Some(message)) => {
                        metrics.record_bytes_in(crate::codec::encode(&message).len());
                        match message {
                            Message::Pose(pose) => event_sink.on_event(Event::Pose(pose)),
                            Message::Cmd(cmd) => event_sink.on_event(Event::Command(cmd)),
                            Message::Bye(bye) => {
                                session.handle_bye(&bye);
                                break DisconnectReason::Bye;
                            }
                            other => {
                                debug!(msg_type = %other.message_type(), "ignoring message type not expected inbound");
                            }
                        }
                    }
                    Ok(None) => break DisconnectReason::PeerClosed,
                    Err(err) => match &err {
                        // spec.md §7: an unrecognized message type is a
                        // forward-compatibility signal, not a fault — skip it
                        // and keep the session alive.
                        SessionError::Transport(TransportError::Codec(CodecError::UnknownType { got })) => {
                            warn!(got = *got, "skipping message of unrecognized type");
                            metrics.record_unknown_type();
                        }
                        SessionError::Transport(TransportError::Codec(CodecError::BadMagic)) => {
                            metrics.record_bad_magic();
                            event_sink.on_event(Event::Error { message: err.to_string() });
                            break DisconnectReason::PeerClosed;
                        }
                        SessionError::Transport(TransportError::Codec(CodecError::UnsupportedVersion { .. })) => {
                            metrics.record_version_mismatch();
                            event_sink.on_event(Event::Error { message: err.to_string() });
                            break DisconnectReason::PeerClosed;
                        }
                        _ => {
                            event_sink.on_event(Event::Error { message: err.to_string() });
                            break DisconnectReason::PeerClosed;
                        }
                    },
                }
            }
            Ok(()) = haptic_rx.changed() => {
                if let Some(haptic) = haptic_rx.borrow_and_update().clone() {
                    if let Err(err) = session.send(&Message::Haptic(haptic)).await {
                        warn!(error = %err, "failed to deliver queued haptic send");
                    } else {
                        metrics.record_bytes_out(12);
                    }
                }
            }
            Some(config) = config_rx.recv() => {
                let len = config.config.len();
                if let Err(err) = session.send(&Message::Config(config)).await {
                    warn!(error = %err, "failed to deliver queued config send");
                } else {
                    metrics.record_bytes_out(8 + len);
                }
            }
            _ = heartbeat_ticker.tick(), if is_ble => {
                match liveness::tick(session.silence_duration(), ble_liveness_timeout) {
                    LivenessEvent::SendHeartbeat => {
                        let heartbeat = session.next_heartbeat();
                        if let Err(err) = session.send(&Message::Heartbeat(heartbeat)).await {
                            warn!(error = %err, "failed to send BLE heartbeat");
                        }
                    }
                    LivenessEvent::TimedOut => break DisconnectReason::Timeout,
                }
            }
            changed = shutdown_rx.changed() => {
                if changed.is_err() || *shutdown_rx.borrow() {
                    break DisconnectReason::Stopped;
                }
            }
        }
    };

    let _ = session.close().await;
    router.detach();
    metrics.record_session_closed(reason);
    event_sink.on_event(Event::Disconnected { reason });
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use pretty_assertions::assert_eq;
    use tokio::net::TcpStream;
    use tokio::sync::mpsc;

    use crate::codec::{self, ByeMessage, CmdMessage, HelloMessage, PoseMessage};
    use crate::protocol::AckStatus;
    use crate::router::FnEventSink;

    use super::*;

    fn config() -> HostConfig {
        HostConfig::builder()
            .auth_code("ABC123")
            .service_name("test-host")
            .tcp_port(0u16)
            .beacon_port(0u16)
            .build()
    }

    fn channel_sink() -> (Arc<dyn EventSink>, mpsc::UnboundedReceiver<Event>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let sink = FnEventSink::new(move |event: Event| {
            let _ = tx.send(event);
        });
        (Arc::new(sink), rx)
    }

    async fn send(stream: &mut TcpStream, message: Message) {
        let payload = codec::encode(&message);
        crate::framing::write_message(stream, &payload).await.unwrap();
    }

    async fn recv(stream: &mut TcpStream) -> Option<Message> {
        let payload = crate::framing::read_message(stream).await.unwrap()?;
        Some(codec::decode(&payload).unwrap())
    }

    async fn expect_ack(stream: &mut TcpStream, status: AckStatus) {
        let message = recv(stream).await.expect("expected an ACK");
        let Message::Ack(ack) = message else {
            panic!("expected ACK, got {message:?}");
        };
        assert_eq!(status.as_byte(), ack.status);
    }

    #[tokio::test]
    async fn happy_path_authenticates_streams_pose_and_closes_on_bye() {
        let (sink, mut events) = channel_sink();
        let host = Host::start(config(), sink).await.unwrap();

        let mut client = TcpStream::connect(host.local_addr()).await.unwrap();
        send(
            &mut client,
            Message::Hello(HelloMessage {
                session_id: 1,
                code: *b"ABC123",
            }),
        )
        .await;
        expect_ack(&mut client, AckStatus::Ok).await;

        let pose = PoseMessage {
            seq: 1,
            ts_us: 1,
            movement_start: true,
            x: 1.0,
            y: 0.0,
            z: 0.0,
            qx: 0.0,
            qy: 0.0,
            qz: 0.0,
            qw: 1.0,
        };
        send(&mut client, Message::Pose(pose)).await;

        send(&mut client, Message::Bye(ByeMessage { session_id: 1 })).await;

        let mut saw_authenticated = false;
        let mut saw_pose = false;
        let mut saw_disconnect_bye = false;
        for _ in 0..10 {
            let Some(event) = tokio::time::timeout(Duration::from_secs(1), events.recv())
                .await
                .ok()
                .flatten()
            else {
                break;
            };
            match event {
                Event::Authenticated { .. } => saw_authenticated = true,
                Event::Pose(p) => {
                    assert_eq!(pose, p);
                    saw_pose = true;
                }
                Event::Disconnected {
                    reason: DisconnectReason::Bye,
                } => {
                    saw_disconnect_bye = true;
                    break;
                }
                _ => {}
            }
        }
        assert!(saw_authenticated);
        assert!(saw_pose);
        assert!(saw_disconnect_bye);

        host.stop().await;
    }

    #[tokio::test]
    async fn wrong_auth_code_is_rejected_and_closed() {
        let (sink, _events) = channel_sink();
        let host = Host::start(config(), sink).await.unwrap();

        let mut client = TcpStream::connect(host.local_addr()).await.unwrap();
        send(
            &mut client,
            Message::Hello(HelloMessage {
                session_id: 1,
                code: *b"NOPE00",
            }),
        )
        .await;
        expect_ack(&mut client, AckStatus::BadCode).await;
        assert_eq!(None, recv(&mut client).await);

        host.stop().await;
    }

    #[tokio::test]
    async fn second_client_is_rejected_busy_while_first_is_connected() {
        let (sink, _events) = channel_sink();
        let host = Host::start(config(), sink).await.unwrap();

        let mut first = TcpStream::connect(host.local_addr()).await.unwrap();
        send(
            &mut first,
            Message::Hello(HelloMessage {
                session_id: 1,
                code: *b"ABC123",
            }),
        )
        .await;
        expect_ack(&mut first, AckStatus::Ok).await;

        let mut second = TcpStream::connect(host.local_addr()).await.unwrap();
        send(
            &mut second,
            Message::Hello(HelloMessage {
                session_id: 2,
                code: *b"ABC123",
            }),
        )
        .await;
        expect_ack(&mut second, AckStatus::Busy).await;

        host.stop().await;
    }

    #[tokio::test]
    async fn send_haptic_reaches_the_connected_session() {
        let (sink, _events) = channel_sink();
        let host = Host::start(config(), sink).await.unwrap();

        let mut client = TcpStream::connect(host.local_addr()).await.unwrap();
        send(
            &mut client,
            Message::Hello(HelloMessage {
                session_id: 1,
                code: *b"ABC123",
            }),
        )
        .await;
        expect_ack(&mut client, AckStatus::Ok).await;

        // Give the session task a moment to register itself before sending.
        tokio::time::sleep(Duration::from_millis(20)).await;
        host.router().send_haptic(0.9, 2).unwrap();

        let message = tokio::time::timeout(Duration::from_secs(1), recv(&mut client))
            .await
            .unwrap()
            .expect("expected a haptic message");
        let Message::Haptic(haptic) = message else {
            panic!("expected Haptic, got {message:?}");
        };
        assert_eq!(2, haptic.channel);

        host.stop().await;
    }

    #[tokio::test]
    async fn a_second_session_connects_after_the_first_disconnects() {
        let (sink, mut events) = channel_sink();
        let host = Host::start(config(), sink).await.unwrap();

        let mut first = TcpStream::connect(host.local_addr()).await.unwrap();
        send(
            &mut first,
            Message::Hello(HelloMessage {
                session_id: 1,
                code: *b"ABC123",
            }),
        )
        .await;
        expect_ack(&mut first, AckStatus::Ok).await;
        send(&mut first, Message::Bye(ByeMessage { session_id: 1 })).await;

        let mut saw_first_disconnect = false;
        for _ in 0..10 {
            let Some(event) = tokio::time::timeout(Duration::from_secs(1), events.recv())
                .await
                .ok()
                .flatten()
            else {
                break;
            };
            if let Event::Disconnected { .. } = event {
                saw_first_disconnect = true;
                break;
            }
        }
        assert!(saw_first_disconnect);

        let mut second = TcpStream::connect(host.local_addr()).await.unwrap();
        send(
            &mut second,
            Message::Hello(HelloMessage {
                session_id: 2,
                code: *b"ABC123",
            }),
        )
        .await;
        expect_ack(&mut second, AckStatus::Ok).await;

        tokio::time::sleep(Duration::from_millis(20)).await;
        host.router().send_haptic(0.4, 1).unwrap();
        let message = tokio::time::timeout(Duration::from_secs(1), recv(&mut second))
            .await
            .unwrap()
            .expect("second session should receive the haptic send");
        assert!(matches!(message, Message::Haptic(_)));

        host.stop().await;
    }

    #[tokio::test]
    async fn cmd_message_is_reported_as_a_command_event() {
        let (sink, mut events) = channel_sink();
        let host = Host::start(config(), sink).await.unwrap();

        let mut client = TcpStream::connect(host.local_addr()).await.unwrap();
        send(
            &mut client,
            Message::Hello(HelloMessage {
                session_id: 1,
                code: *b"ABC123",
            }),
        )
        .await;
        expect_ack(&mut client, AckStatus::Ok).await;

        send(
            &mut client,
            Message::Cmd(CmdMessage {
                cmd_type: 1,
                value: 1,
            }),
        )
        .await;

        let mut saw_command = false;
        for _ in 0..10 {
            let Some(event) = tokio::time::timeout(Duration::from_secs(1), events.recv())
                .await
                .ok()
                .flatten()
            else {
                break;
            };
            if let Event::Command(cmd) = event {
                assert_eq!(1, cmd.cmd_type);
                saw_command = true;
                break;
            }
        }
        assert!(saw_command);

        host.stop().await;
    }

    #[tokio::test]
    async fn unknown_message_type_is_skipped_and_the_session_survives() {
        let (sink, mut events) = channel_sink();
        let host = Host::start(config(), sink).await.unwrap();

        let mut client = TcpStream::connect(host.local_addr()).await.unwrap();
        send(
            &mut client,
            Message::Hello(HelloMessage {
                session_id: 1,
                code: *b"ABC123",
            }),
        )
        .await;
        expect_ack(&mut client, AckStatus::Ok).await;

        // A frame with an unrecognized msg_type byte (200): well-formed
        // header, garbage type.
        let bogus_frame = vec![0x54, 0x45, 0x4C, 0x45, 200, 1, 0, 0];
        crate::framing::write_message(&mut client, &bogus_frame)
            .await
            .unwrap();

        let pose = PoseMessage {
            seq: 1,
            ts_us: 1,
            movement_start: false,
            x: 0.0,
            y: 0.0,
            z: 0.0,
            qx: 0.0,
            qy: 0.0,
            qz: 0.0,
            qw: 1.0,
        };
        send(&mut client, Message::Pose(pose)).await;

        let mut saw_pose = false;
        for _ in 0..10 {
            let Some(event) = tokio::time::timeout(Duration::from_secs(1), events.recv())
                .await
                .ok()
                .flatten()
            else {
                break;
            };
            match event {
                Event::Pose(p) => {
                    assert_eq!(pose, p);
                    saw_pose = true;
                    break;
                }
                Event::Disconnected { .. } => panic!("session should not have closed"),
                _ => {}
            }
        }
        assert!(saw_pose, "the unknown-type frame should not have ended the session");
        assert_eq!(1, host.metrics().snapshot().unknown_type);

        host.stop().await;
    }
}
