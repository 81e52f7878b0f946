//! Liveness monitoring (spec.md §4.10, §5).
//!
//! TCP relies entirely on the OS-level keepalive probes configured by
//! `listener::tune` — there is no application-level liveness loop for TCP.
//! BLE has no equivalent, so the host ticks its own heartbeat and watches
//! for inbound silence. The decision of what a given tick means is pure
//! (no I/O, no task spawning) so the session loop in `supervisor` can fold
//! it directly into its own `select!` without a second task contending
//! for the session.

use std::time::Duration;

/// What a BLE liveness tick should do, decided purely from elapsed
/// silence (spec.md §5: 500ms heartbeat interval, 3s timeout).
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum LivenessEvent {
    /// Send a `HEARTBEAT` now.
    SendHeartbeat,
    /// The peer has been silent past the liveness timeout; the session
    /// should close with [`crate::session::DisconnectReason::Timeout`].
    TimedOut,
}

/// Decides what one liveness tick should do, given how long the peer has
/// been silent.
#[must_use]
pub fn tick(silence_duration: Duration, liveness_timeout: Duration) -> LivenessEvent {
    if silence_duration >= liveness_timeout {
        LivenessEvent::TimedOut
    } else {
        LivenessEvent::SendHeartbeat
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn silence_under_timeout_sends_heartbeat() {
        assert_eq!(
            LivenessEvent::SendHeartbeat,
            tick(Duration::from_secs(1), Duration::from_secs(3))
        );
    }

    #[test]
    fn silence_past_timeout_times_out() {
        assert_eq!(
            LivenessEvent::TimedOut,
            tick(Duration::from_secs(3), Duration::from_secs(3))
        );
    }

    #[test]
    fn silence_just_under_timeout_still_sends_heartbeat() {
        assert_eq!(
            LivenessEvent::SendHeartbeat,
            tick(Duration::from_millis(2999), Duration::from_secs(3))
        );
    }
}
