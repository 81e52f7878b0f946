//! BLE GATT implementation of [`super::Transport`] (spec.md §3's six
//! peripheral characteristics, §9 "the core consumes a `BleAdapter`
//! capability; mapping to OS APIs is platform glue").
//!
//! `btleplug` (the teacher's BLE crate) is a **central**-role library: it
//! scans for and connects to peripherals. This host must act as the
//! **peripheral** — it advertises a GATT service for a phone to connect
//! to — which is a different role that crate does not serve (the
//! `happybigmtn-bitchat-rust` peripheral-advertising module in the
//! retrieval pack notes the same platform-API gap). Real peripheral
//! wiring (CoreBluetooth / BlueZ D-Bus) is explicitly out of scope
//! (spec.md's Non-goals); this module defines the capability the core
//! needs from it and a fake adapter for tests.

use async_trait::async_trait;
use tracing::instrument;

use crate::codec::{self, Message};
use crate::error::TransportError;
use crate::protocol::{self, HEADER_LEN, MessageType};

use super::Transport;

/// The fixed GATT service UUID the host peripheral advertises (spec.md §3).
pub const SERVICE_UUID: &str = "1C8FD138-FC18-4846-954D-E509366AEF61";

/// One of the six GATT characteristics the host peripheral exposes.
///
/// Characteristic identity carries the message type on BLE, so writes and
/// notifications on this transport omit the common 6-byte header
/// (`protocol::HEADER_LEN`) that TCP and UDP frames carry explicitly.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash, strum_macros::Display)]
pub enum BleCharacteristic {
    #[strum(to_string = "auth")]
    Auth,
    #[strum(to_string = "pose")]
    Pose,
    #[strum(to_string = "cmd")]
    Cmd,
    #[strum(to_string = "heartbeat")]
    Heartbeat,
    #[strum(to_string = "haptic")]
    Haptic,
    #[strum(to_string = "config")]
    Config,
}

impl BleCharacteristic {
    /// The 128-bit UUID this characteristic is published under: the fixed
    /// [`SERVICE_UUID`] family, low nibble `3..8` (spec.md §3/§4.5).
    #[must_use]
    pub fn uuid(self) -> &'static str {
        match self {
            Self::Auth => "1C8FD138-FC18-4846-954D-E509366AEF63",
            Self::Pose => "1C8FD138-FC18-4846-954D-E509366AEF64",
            Self::Heartbeat => "1C8FD138-FC18-4846-954D-E509366AEF65",
            Self::Cmd => "1C8FD138-FC18-4846-954D-E509366AEF66",
            Self::Haptic => "1C8FD138-FC18-4846-954D-E509366AEF67",
            Self::Config => "1C8FD138-FC18-4846-954D-E509366AEF68",
        }
    }

    fn for_message_type(message_type: MessageType) -> Option<Self> {
        match message_type {
            MessageType::Hello => Some(Self::Auth),
            MessageType::Pose => Some(Self::Pose),
            MessageType::Cmd => Some(Self::Cmd),
            MessageType::Heartbeat => Some(Self::Heartbeat),
            MessageType::Haptic => Some(Self::Haptic),
            MessageType::Config => Some(Self::Config),
            MessageType::Ack | MessageType::Bye | MessageType::Beacon => None,
        }
    }
}

/// Platform capability the core needs from a BLE peripheral stack.
///
/// An embedding application implements this against CoreBluetooth, BlueZ,
/// or any other platform GATT server API; the core only ever talks to
/// this trait, matching the teacher's `BleTransport`/`ConnectedBleSession`
/// split between raw GATT plumbing and protocol semantics.
#[async_trait]
pub trait BleAdapter: Send {
    /// Writes `value` to `characteristic` (host-to-mobile notify, or
    /// mobile-to-host write-response — direction is characteristic-specific).
    async fn write_characteristic(
        &mut self,
        characteristic: BleCharacteristic,
        value: &[u8],
    ) -> Result<(), TransportError>;

    /// Waits for the next inbound characteristic write or notification.
    ///
    /// Returns `Ok(None)` once the central has disconnected.
    async fn next_event(&mut self) -> Result<Option<(BleCharacteristic, Vec<u8>)>, TransportError>;

    /// Reports whether a central is still connected.
    fn is_connected(&self) -> bool;

    /// Tears down the GATT connection.
    async fn disconnect(&mut self) -> Result<(), TransportError>;

    /// A human-readable identifier for the connected central.
    fn remote(&self) -> String;
}

/// A [`Transport`] that maps [`Message`] values onto GATT characteristic
/// writes/notifications via a [`BleAdapter`].
pub struct BleTransport<A: BleAdapter> {
    adapter: A,
}

impl<A: BleAdapter> BleTransport<A> {
    /// Wraps an already-connected BLE adapter.
    #[must_use]
    pub fn new(adapter: A) -> Self {
        Self { adapter }
    }
}

fn strip_header(full_frame: &[u8]) -> &[u8] {
    &full_frame[HEADER_LEN..]
}

fn synthesize_frame(message_type: MessageType, body: &[u8]) -> Vec<u8> {
    let mut frame = Vec::with_capacity(HEADER_LEN + body.len());
    frame.extend_from_slice(&protocol::MAGIC);
    frame.push(protocol::message_metadata(message_type).id());
    frame.push(protocol::MIN_VERSION);
    frame.extend_from_slice(body);
    frame
}

#[async_trait]
impl<A: BleAdapter> Transport for BleTransport<A> {
    #[instrument(skip(self, message), fields(remote = %self.adapter.remote(), msg_type = %message.message_type()))]
    async fn send(&mut self, message: &Message) -> Result<(), TransportError> {
        let message_type = message.message_type();
        let Some(characteristic) = BleCharacteristic::for_message_type(message_type) else {
            return Err(TransportError::Codec(crate::error::CodecError::InvalidFrame {
                reason: "message type has no BLE characteristic mapping",
            }));
        };
        let full_frame = codec::encode(message);
        self.adapter
            .write_characteristic(characteristic, strip_header(&full_frame))
            .await
    }

    #[instrument(skip(self), fields(remote = %self.adapter.remote()))]
    async fn recv(&mut self) -> Result<Option<Message>, TransportError> {
        let Some((characteristic, body)) = self.adapter.next_event().await? else {
            return Ok(None);
        };
        if characteristic == BleCharacteristic::Auth {
            // The Auth characteristic is synthetic (spec.md §4.5): the central
            // writes the bare 6-char code, and the host wraps it into a HELLO
            // with session_id=0 itself — there is no 12-byte HELLO body on
            // this wire, unlike every other characteristic here.
            let code: [u8; 6] = body.as_slice().try_into().map_err(|_| {
                TransportError::Codec(crate::error::CodecError::TruncatedOrOversized {
                    expected: 6,
                    actual: body.len(),
                })
            })?;
            return Ok(Some(Message::Hello(crate::codec::HelloMessage {
                session_id: 0,
                code,
            })));
        }
        let message_type = match characteristic {
            BleCharacteristic::Auth => unreachable!("handled above"),
            BleCharacteristic::Pose => MessageType::Pose,
            BleCharacteristic::Cmd => MessageType::Cmd,
            BleCharacteristic::Heartbeat => MessageType::Heartbeat,
            BleCharacteristic::Haptic => MessageType::Haptic,
            BleCharacteristic::Config => MessageType::Config,
        };
        let frame = synthesize_frame(message_type, &body);
        let message = codec::decode(&frame)?;
        Ok(Some(message))
    }

    fn is_connected(&self) -> bool {
        self.adapter.is_connected()
    }

    async fn close(&mut self) -> Result<(), TransportError> {
        self.adapter.disconnect().await
    }

    fn remote(&self) -> String {
        self.adapter.remote()
    }

    fn last_version(&self) -> u8 {
        protocol::MIN_VERSION
    }
}

/// An in-memory [`BleAdapter`] for tests: a channel pair standing in for a
/// real GATT central connection, matching the teacher's `FakeBackend`
/// dependency-injection style.
pub mod fake {
    use tokio::sync::mpsc;

    use super::{BleAdapter, BleCharacteristic};
    use crate::error::TransportError;
    use async_trait::async_trait;

    /// A [`BleAdapter`] backed by two in-memory channels.
    pub struct FakeBleAdapter {
        outbound: mpsc::UnboundedSender<(BleCharacteristic, Vec<u8>)>,
        inbound: mpsc::UnboundedReceiver<(BleCharacteristic, Vec<u8>)>,
        connected: bool,
        remote: String,
    }

    impl FakeBleAdapter {
        /// Builds a connected pair: `(host side, test-harness side)`.
        ///
        /// The test harness reads what the host wrote via `host_writes`,
        /// and injects inbound events via `inject`.
        #[must_use]
        pub fn pair(
            remote: impl Into<String>,
        ) -> (
            Self,
            mpsc::UnboundedReceiver<(BleCharacteristic, Vec<u8>)>,
            mpsc::UnboundedSender<(BleCharacteristic, Vec<u8>)>,
        ) {
            let (to_harness_tx, to_harness_rx) = mpsc::unbounded_channel();
            let (to_host_tx, to_host_rx) = mpsc::unbounded_channel();
            let adapter = Self {
                outbound: to_harness_tx,
                inbound: to_host_rx,
                connected: true,
                remote: remote.into(),
            };
            (adapter, to_harness_rx, to_host_tx)
        }
    }

    #[async_trait]
    impl BleAdapter for FakeBleAdapter {
        async fn write_characteristic(
            &mut self,
            characteristic: BleCharacteristic,
            value: &[u8],
        ) -> Result<(), TransportError> {
            if !self.connected {
                return Err(TransportError::Closed);
            }
            self.outbound
                .send((characteristic, value.to_vec()))
                .map_err(|_| TransportError::Closed)
        }

        async fn next_event(
            &mut self,
        ) -> Result<Option<(BleCharacteristic, Vec<u8>)>, TransportError> {
            Ok(self.inbound.recv().await)
        }

        fn is_connected(&self) -> bool {
            self.connected
        }

        async fn disconnect(&mut self) -> Result<(), TransportError> {
            self.connected = false;
            Ok(())
        }

        fn remote(&self) -> String {
            self.remote.clone()
        }
    }
}
