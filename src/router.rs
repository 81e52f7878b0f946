//! Event dispatch and the outbound path (spec.md §4.8).
//!
//! Inbound messages become one [`Event`] sum type delivered to an
//! [`EventSink`]. Outbound `HAPTIC` and `CONFIG` sends travel to the
//! session's own receive-loop task over two differently-shaped channels,
//! so the *channel itself* enforces spec.md §4.8's differing drop
//! policies instead of hand-rolled bookkeeping: a `watch` channel only
//! ever holds the newest `HAPTIC` value (latest-wins), while a small
//! bounded `mpsc` channel backpressures `CONFIG` senders until the session
//! drains it.
//!
//! A fresh channel pair is minted per session via [`OutboundRouter::attach`]
//! rather than once for the process lifetime: the reconnect supervisor
//! (spec.md §4.9) cycles `Listening → Connected → Closing → Listening`
//! indefinitely, and the one [`OutboundRouter`] handle an embedding
//! application holds past `start()` must keep working across every one of
//! those cycles, not just the first.

use std::sync::{Arc, Mutex};

use tokio::sync::{mpsc, watch};
use tracing::instrument;

use crate::codec::{CmdMessage, ConfigMessage, HapticMessage, PoseMessage};
use crate::error::RouterError;
use crate::session::DisconnectReason;
use crate::transport::TransportKind;

/// The one event type every consumer of this crate observes.
///
/// Replaces a grab-bag of untyped per-message callbacks with a single sum
/// type a caller can exhaustively `match` on (spec.md §9 redesign flag).
#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    /// A transport-level connection was accepted, before authentication.
    Connected {
        transport_kind: TransportKind,
        remote: String,
    },
    /// A session completed authentication and is now `Connected`.
    Authenticated { session_id: u32, remote: String },
    /// A `POSE` sample arrived.
    Pose(PoseMessage),
    /// A `CMD` arrived.
    Command(CmdMessage),
    /// The session ended.
    Disconnected { reason: DisconnectReason },
    /// A recoverable per-message fault occurred (bad magic, unknown type,
    /// truncated frame); the session itself is unaffected.
    Error { message: String },
}

/// Receives [`Event`]s from a running [`crate::Host`].
///
/// An embedding application implements this (or uses [`FnEventSink`]) to
/// observe pose samples, commands, and lifecycle transitions, matching the
/// teacher's `HardwareClient` trait boundary.
pub trait EventSink: Send + Sync {
    /// Handles one event. Must not block for long — this runs on the
    /// session's own receive loop.
    fn on_event(&self, event: Event);
}

/// Adapts a plain closure into an [`EventSink`].
pub struct FnEventSink<F>(F);

impl<F> FnEventSink<F>
where
    F: Fn(Event) + Send + Sync,
{
    /// Wraps `handler` as an [`EventSink`].
    pub fn new(handler: F) -> Self {
        Self(handler)
    }
}

impl<F> EventSink for FnEventSink<F>
where
    F: Fn(Event) + Send + Sync,
{
    fn on_event(&self, event: Event) {
        (self.0)(event);
    }
}

/// Clamps a haptic intensity into `[0.0, 1.0]`, mapping `NaN` to `0.0`
/// (spec.md §4.8).
#[must_use]
pub fn clamp_intensity(intensity: f32) -> f32 {
    if intensity.is_nan() {
        0.0
    } else {
        intensity.clamp(0.0, 1.0)
    }
}

/// Depth of the `CONFIG` backpressure queue.
const CONFIG_QUEUE_DEPTH: usize = 4;

/// The receiving ends of one session's outbound channels, owned by the
/// task that drives that session's send loop for as long as it is
/// connected.
pub(crate) struct OutboundChannels {
    pub haptic_rx: watch::Receiver<Option<HapticMessage>>,
    pub config_rx: mpsc::Receiver<ConfigMessage>,
}

/// The sending ends of one session's outbound channels.
struct ActiveSession {
    haptic_tx: watch::Sender<Option<HapticMessage>>,
    config_tx: mpsc::Sender<ConfigMessage>,
}

/// A handle an embedding application holds to push `HAPTIC`/`CONFIG`
/// messages to whichever session is currently connected, independent of
/// the session's own receive loop.
///
/// Outlives any single session: [`OutboundRouter::attach`] mints a fresh
/// channel pair each time the supervisor connects a new session, so one
/// handle obtained from [`crate::Host::start`] keeps working across every
/// reconnect cycle.
#[derive(Clone)]
pub struct OutboundRouter {
    active: Arc<Mutex<Option<ActiveSession>>>,
}

impl OutboundRouter {
    pub(crate) fn new() -> Self {
        Self {
            active: Arc::new(Mutex::new(None)),
        }
    }

    /// Mints a fresh channel pair for a newly-connected session, replacing
    /// whatever the previous session left behind.
    pub(crate) fn attach(&self) -> OutboundChannels {
        let (haptic_tx, haptic_rx) = watch::channel(None);
        let (config_tx, config_rx) = mpsc::channel(CONFIG_QUEUE_DEPTH);
        *self.active.lock().unwrap() = Some(ActiveSession { haptic_tx, config_tx });
        OutboundChannels { haptic_rx, config_rx }
    }

    /// Drops the current session's senders so subsequent sends fail fast
    /// with [`RouterError::NoSession`] until the next session attaches.
    pub(crate) fn detach(&self) {
        *self.active.lock().unwrap() = None;
    }

    /// Queues a `HAPTIC` send. Never blocks: a value queued while the
    /// session hasn't yet drained the previous one simply replaces it
    /// (spec.md §4.8 latest-wins).
    ///
    /// # Errors
    ///
    /// Returns [`RouterError::NoSession`] if no session is connected, or
    /// [`RouterError::TransportClosed`] if the session's receive loop has
    /// already exited.
    #[instrument(skip(self))]
    pub fn send_haptic(&self, intensity: f32, channel: u8) -> Result<(), RouterError> {
        let guard = self.active.lock().unwrap();
        let Some(active) = guard.as_ref() else {
            return Err(RouterError::NoSession);
        };
        let intensity = clamp_intensity(intensity);
        active
            .haptic_tx
            .send(Some(HapticMessage { intensity, channel }))
            .map_err(|_| RouterError::TransportClosed)
    }

    /// Queues a `CONFIG` send, waiting for room in the backpressure queue
    /// rather than dropping (spec.md §4.8).
    ///
    /// # Errors
    ///
    /// Returns [`RouterError::NoSession`] if no session is connected, or
    /// [`RouterError::TransportClosed`] if the session's receive loop has
    /// already exited.
    #[instrument(skip(self, config))]
    pub async fn send_config(&self, config: Vec<u8>) -> Result<(), RouterError> {
        let config_tx = {
            let guard = self.active.lock().unwrap();
            let Some(active) = guard.as_ref() else {
                return Err(RouterError::NoSession);
            };
            active.config_tx.clone()
        };
        config_tx
            .send(ConfigMessage { config })
            .await
            .map_err(|_| RouterError::TransportClosed)
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn clamp_intensity_maps_nan_to_zero() {
        assert_eq!(0.0, clamp_intensity(f32::NAN));
    }

    #[test]
    fn clamp_intensity_clamps_out_of_range_values() {
        assert_eq!(0.0, clamp_intensity(-5.0));
        assert_eq!(1.0, clamp_intensity(5.0));
        assert_eq!(0.5, clamp_intensity(0.5));
    }

    #[test]
    fn send_haptic_without_a_session_is_no_session() {
        let router = OutboundRouter::new();
        assert!(matches!(
            router.send_haptic(0.5, 0),
            Err(RouterError::NoSession)
        ));
    }

    #[tokio::test]
    async fn send_config_without_a_session_is_no_session() {
        let router = OutboundRouter::new();
        assert!(matches!(
            router.send_config(vec![1, 2, 3]).await,
            Err(RouterError::NoSession)
        ));
    }

    #[tokio::test]
    async fn connected_haptic_send_is_observed_latest_wins() {
        let router = OutboundRouter::new();
        let mut channels = router.attach();

        router.send_haptic(0.25, 0).unwrap();
        router.send_haptic(0.75, 0).unwrap();

        channels.haptic_rx.changed().await.unwrap();
        let latest = channels.haptic_rx.borrow_and_update().clone().unwrap();
        assert_eq!(0.75, latest.intensity);
    }

    #[tokio::test]
    async fn connected_config_send_is_queued() {
        let router = OutboundRouter::new();
        let mut channels = router.attach();

        router.send_config(b"{}".to_vec()).await.unwrap();

        let queued = channels.config_rx.recv().await.unwrap();
        assert_eq!(b"{}".to_vec(), queued.config);
    }

    #[tokio::test]
    async fn detach_makes_subsequent_sends_fail_with_no_session() {
        let router = OutboundRouter::new();
        let _channels = router.attach();
        router.send_haptic(0.5, 0).unwrap();

        router.detach();

        assert!(matches!(
            router.send_haptic(0.5, 0),
            Err(RouterError::NoSession)
        ));
    }

    #[tokio::test]
    async fn reattaching_serves_a_second_session_after_the_first_detaches() {
        let router = OutboundRouter::new();
        let _first = router.attach();
        router.detach();

        let mut second = router.attach();
        router.send_haptic(0.5, 0).unwrap();
        second.haptic_rx.changed().await.unwrap();
        assert_eq!(0.5, second.haptic_rx.borrow().clone().unwrap().intensity);
    }

    #[test]
    fn fn_event_sink_forwards_to_closure() {
        let seen = std::sync::Mutex::new(Vec::new());
        let sink = FnEventSink::new(|event: Event| {
            seen.lock().unwrap().push(event);
        });
        sink.on_event(Event::Command(CmdMessage {
            cmd_type: 1,
            value: 1,
        }));
        assert_eq!(1, seen.lock().unwrap().len());
    }
}
