//! Observable counters for a running [`crate::Host`] (spec.md §6.2).
//!
//! Mirrors the teacher's read-only `SessionMetadata`/`InspectReport`
//! accessor style: a cheap `Clone`able handle backed by shared atomics, so
//! any number of observers can poll it without contending with the hot
//! path.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::session::DisconnectReason;

#[derive(Debug, Default)]
struct Counters {
    beacons_sent: AtomicU64,
    sessions_opened: AtomicU64,
    sessions_closed_bad_code: AtomicU64,
    sessions_closed_busy: AtomicU64,
    sessions_closed_version_mismatch: AtomicU64,
    sessions_closed_timeout: AtomicU64,
    sessions_closed_peer_closed: AtomicU64,
    sessions_closed_bye: AtomicU64,
    sessions_closed_stopped: AtomicU64,
    bytes_in: AtomicU64,
    bytes_out: AtomicU64,
    bad_magic: AtomicU64,
    unknown_type: AtomicU64,
    version_mismatch: AtomicU64,
}

/// A cheap, shareable handle onto one [`crate::Host`]'s counters.
#[derive(Debug, Clone, Default)]
pub struct HostMetrics {
    counters: Arc<Counters>,
}

/// A point-in-time, immutable copy of [`HostMetrics`]' counters.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub struct MetricsSnapshot {
    pub beacons_sent: u64,
    pub sessions_opened: u64,
    pub sessions_closed_bad_code: u64,
    pub sessions_closed_busy: u64,
    pub sessions_closed_version_mismatch: u64,
    pub sessions_closed_timeout: u64,
    pub sessions_closed_peer_closed: u64,
    pub sessions_closed_bye: u64,
    pub sessions_closed_stopped: u64,
    pub bytes_in: u64,
    pub bytes_out: u64,
    pub bad_magic: u64,
    pub unknown_type: u64,
    pub version_mismatch: u64,
}

impl HostMetrics {
    /// Creates a fresh, zeroed set of counters.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn record_beacon_sent(&self) {
        self.counters.beacons_sent.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_session_opened(&self) {
        self.counters.sessions_opened.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_session_closed(&self, reason: DisconnectReason) {
        let counter = match reason {
            DisconnectReason::BadCode => &self.counters.sessions_closed_bad_code,
            DisconnectReason::Busy => &self.counters.sessions_closed_busy,
            DisconnectReason::VersionMismatch => &self.counters.sessions_closed_version_mismatch,
            DisconnectReason::Timeout => &self.counters.sessions_closed_timeout,
            DisconnectReason::PeerClosed => &self.counters.sessions_closed_peer_closed,
            DisconnectReason::Bye => &self.counters.sessions_closed_bye,
            DisconnectReason::Stopped => &self.counters.sessions_closed_stopped,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_bytes_in(&self, count: usize) {
        self.counters.bytes_in.fetch_add(count as u64, Ordering::Relaxed);
    }

    pub(crate) fn record_bytes_out(&self, count: usize) {
        self.counters.bytes_out.fetch_add(count as u64, Ordering::Relaxed);
    }

    pub(crate) fn record_bad_magic(&self) {
        self.counters.bad_magic.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_unknown_type(&self) {
        self.counters.unknown_type.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_version_mismatch(&self) {
        self.counters.version_mismatch.fetch_add(1, Ordering::Relaxed);
    }

    /// Returns an immutable point-in-time copy of every counter.
    #[must_use]
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            beacons_sent: self.counters.beacons_sent.load(Ordering::Relaxed),
            sessions_opened: self.counters.sessions_opened.load(Ordering::Relaxed),
            sessions_closed_bad_code: self.counters.sessions_closed_bad_code.load(Ordering::Relaxed),
            sessions_closed_busy: self.counters.sessions_closed_busy.load(Ordering::Relaxed),
            sessions_closed_version_mismatch: self
                .counters
                .sessions_closed_version_mismatch
                .load(Ordering::Relaxed),
            sessions_closed_timeout: self.counters.sessions_closed_timeout.load(Ordering::Relaxed),
            sessions_closed_peer_closed: self
                .counters
                .sessions_closed_peer_closed
                .load(Ordering::Relaxed),
            sessions_closed_bye: self.counters.sessions_closed_bye.load(Ordering::Relaxed),
            sessions_closed_stopped: self.counters.sessions_closed_stopped.load(Ordering::Relaxed),
            bytes_in: self.counters.bytes_in.load(Ordering::Relaxed),
            bytes_out: self.counters.bytes_out.load(Ordering::Relaxed),
            bad_magic: self.counters.bad_magic.load(Ordering::Relaxed),
            unknown_type: self.counters.unknown_type.load(Ordering::Relaxed),
            version_mismatch: self.counters.version_mismatch.load(Ordering::Relaxed),
        }
    }
}
