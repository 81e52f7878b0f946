//! Transport abstraction (spec.md §4.4): message-granular send/receive over
//! TCP or BLE, so the session state machine (C7) and router (C8) never
//! touch socket or GATT details directly.

pub mod ble;
pub mod tcp;

use async_trait::async_trait;

use crate::codec::Message;
use crate::error::TransportError;

/// A connected, message-granular duplex channel to one mobile peer.
///
/// Implementations own their framing (length-prefixed TCP, or GATT
/// characteristic writes/notifications for BLE) — callers only ever see
/// whole [`Message`] values, matching the teacher's
/// `BleTransport`/`ConnectedBleSession` split between "how bytes move" and
/// "what the bytes mean".
#[async_trait]
pub trait Transport: Send {
    /// Sends one message, blocking until it is fully written.
    async fn send(&mut self, message: &Message) -> Result<(), TransportError>;

    /// Waits for and decodes the next inbound message.
    ///
    /// Returns `Ok(None)` when the peer has closed the connection cleanly.
    async fn recv(&mut self) -> Result<Option<Message>, TransportError>;

    /// Reports whether the transport still considers itself connected.
    fn is_connected(&self) -> bool;

    /// Closes the transport, releasing any underlying socket or GATT state.
    async fn close(&mut self) -> Result<(), TransportError>;

    /// A human-readable identifier for the remote peer (address or device id).
    fn remote(&self) -> String;

    /// The protocol version carried by the header of the most recently
    /// received message (spec.md §4.7 "negotiated_version = mobile.version").
    /// BLE characteristic writes carry no wire version of their own, so
    /// `BleTransport` reports the fixed version it synthesizes headers with.
    fn last_version(&self) -> u8;
}

/// Which transport carried an accepted connection (spec.md §3 `Session.transport`).
#[derive(Debug, Clone, Copy, Eq, PartialEq, strum_macros::Display)]
pub enum TransportKind {
    #[strum(to_string = "tcp")]
    Tcp,
    #[strum(to_string = "ble")]
    Ble,
}
