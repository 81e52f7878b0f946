//! Transport-agnostic host-side receiver for a low-latency 6-DoF pose
//! stream over TCP, BLE, or a UDP discovery beacon.
//!
//! [`Host::start`] is the crate's single entry point: it owns the TCP
//! listener and beacon broadcaster, accepts at most one authenticated
//! session at a time, and delivers every inbound event through one
//! [`Event`] sum type to a caller-supplied [`EventSink`].

mod beacon;
pub mod codec;
pub mod config;
pub mod error;
pub mod framing;
mod liveness;
mod listener;
pub mod metrics;
pub mod protocol;
pub mod router;
pub mod session;
mod supervisor;
pub mod transport;

pub use config::HostConfig;
pub use error::HostError;
pub use metrics::{HostMetrics, MetricsSnapshot};
pub use router::{Event, EventSink, FnEventSink, OutboundRouter};
pub use session::{DisconnectReason, SessionSnapshot};
pub use supervisor::Host;
