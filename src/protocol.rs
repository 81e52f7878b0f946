use std::collections::HashMap;
use std::sync::LazyLock;

use strum::IntoEnumIterator;
use strum_macros::{Display, EnumIter};

/// The four ASCII bytes every framed payload (except raw BLE writes without the
/// common header) begins with.
pub const MAGIC: [u8; 4] = *b"TELE";

/// Lowest protocol version this host understands.
pub const MIN_VERSION: u8 = 1;

/// Highest protocol version this host understands.
pub const MAX_VERSION: u8 = 1;

/// Length in bytes of the common header (`magic` + `msg_type` + `version`).
pub const HEADER_LEN: usize = 6;

/// The nine wire message types of the televoodoo protocol.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash, EnumIter, Display)]
pub enum MessageType {
    #[strum(to_string = "HELLO")]
    Hello,
    #[strum(to_string = "ACK")]
    Ack,
    #[strum(to_string = "POSE")]
    Pose,
    #[strum(to_string = "BYE")]
    Bye,
    #[strum(to_string = "CMD")]
    Cmd,
    #[strum(to_string = "HEARTBEAT")]
    Heartbeat,
    #[strum(to_string = "HAPTIC")]
    Haptic,
    #[strum(to_string = "BEACON")]
    Beacon,
    #[strum(to_string = "CONFIG")]
    Config,
}

/// Direction a message travels on the wire.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Display)]
pub enum Direction {
    /// Mobile to host.
    #[strum(to_string = "mobile->host")]
    MobileToHost,
    /// Host to mobile.
    #[strum(to_string = "host->mobile")]
    HostToMobile,
}

/// Which transports may legally carry a message type.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub struct TransportMask {
    pub tcp: bool,
    pub ble: bool,
    pub udp: bool,
}

impl TransportMask {
    const ALL: Self = Self {
        tcp: true,
        ble: true,
        udp: false,
    };
    const TCP_ONLY: Self = Self {
        tcp: true,
        ble: false,
        udp: false,
    };
    const BLE_ONLY: Self = Self {
        tcp: false,
        ble: true,
        udp: false,
    };
    const UDP_ONLY: Self = Self {
        tcp: false,
        ble: false,
        udp: true,
    };
}

/// Descriptive metadata for one message type.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub struct MessageMetadata {
    id: u8,
    direction: Direction,
    transports: TransportMask,
}

impl MessageMetadata {
    /// Returns the wire `msg_type` byte.
    #[must_use]
    pub fn id(self) -> u8 {
        self.id
    }

    /// Returns the direction this message travels.
    #[must_use]
    pub fn direction(self) -> Direction {
        self.direction
    }

    /// Returns the transports this message may legally appear on.
    #[must_use]
    pub fn transports(self) -> TransportMask {
        self.transports
    }
}

/// Message metadata keyed by typed message kind.
pub static METADATA_BY_TYPE: LazyLock<HashMap<MessageType, MessageMetadata>> =
    LazyLock::new(|| {
        MessageType::iter()
            .map(|message_type| (message_type, metadata_for(message_type)))
            .collect()
    });

/// Returns metadata for one message type.
#[must_use]
pub fn message_metadata(message_type: MessageType) -> MessageMetadata {
    *METADATA_BY_TYPE
        .get(&message_type)
        .unwrap_or_else(|| unreachable!("every MessageType has metadata"))
}

/// Resolves a wire `msg_type` byte to a typed message kind.
#[must_use]
pub fn message_type_from_id(id: u8) -> Option<MessageType> {
    MessageType::iter().find(|message_type| message_metadata(*message_type).id() == id)
}

fn metadata_for(message_type: MessageType) -> MessageMetadata {
    match message_type {
        MessageType::Hello => MessageMetadata {
            id: 1,
            direction: Direction::MobileToHost,
            transports: TransportMask::TCP_ONLY,
        },
        MessageType::Ack => MessageMetadata {
            id: 2,
            direction: Direction::HostToMobile,
            transports: TransportMask::TCP_ONLY,
        },
        MessageType::Pose => MessageMetadata {
            id: 3,
            direction: Direction::MobileToHost,
            transports: TransportMask::ALL,
        },
        MessageType::Bye => MessageMetadata {
            id: 4,
            direction: Direction::MobileToHost,
            transports: TransportMask::TCP_ONLY,
        },
        MessageType::Cmd => MessageMetadata {
            id: 5,
            direction: Direction::MobileToHost,
            transports: TransportMask::ALL,
        },
        MessageType::Heartbeat => MessageMetadata {
            id: 6,
            direction: Direction::HostToMobile,
            transports: TransportMask::BLE_ONLY,
        },
        MessageType::Haptic => MessageMetadata {
            id: 7,
            direction: Direction::HostToMobile,
            transports: TransportMask::ALL,
        },
        MessageType::Beacon => MessageMetadata {
            id: 8,
            direction: Direction::HostToMobile,
            transports: TransportMask::UDP_ONLY,
        },
        MessageType::Config => MessageMetadata {
            id: 9,
            direction: Direction::HostToMobile,
            transports: TransportMask::ALL,
        },
    }
}

/// ACK status codes (spec.md §3).
#[derive(Debug, Clone, Copy, Eq, PartialEq, Display)]
pub enum AckStatus {
    #[strum(to_string = "OK")]
    Ok = 0,
    #[strum(to_string = "BAD_CODE")]
    BadCode = 1,
    #[strum(to_string = "BUSY")]
    Busy = 2,
    #[strum(to_string = "VERSION_MISMATCH")]
    VersionMismatch = 3,
}

impl AckStatus {
    /// Returns the wire byte for this status.
    #[must_use]
    pub fn as_byte(self) -> u8 {
        self as u8
    }

    /// Parses a wire byte into a status, if recognised.
    #[must_use]
    pub fn from_byte(value: u8) -> Option<Self> {
        match value {
            0 => Some(Self::Ok),
            1 => Some(Self::BadCode),
            2 => Some(Self::Busy),
            3 => Some(Self::VersionMismatch),
            _ => None,
        }
    }
}

/// CMD `cmd_type` values (spec.md §3).
#[derive(Debug, Clone, Copy, Eq, PartialEq, Display)]
pub enum CmdType {
    #[strum(to_string = "RECORDING")]
    Recording = 1,
    #[strum(to_string = "KEEP_RECORDING")]
    KeepRecording = 2,
}

impl CmdType {
    /// Returns the wire byte for this command type.
    #[must_use]
    pub fn as_byte(self) -> u8 {
        self as u8
    }

    /// Parses a wire byte into a command type, if recognised.
    #[must_use]
    pub fn from_byte(value: u8) -> Option<Self> {
        match value {
            1 => Some(Self::Recording),
            2 => Some(Self::KeepRecording),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn message_metadata_ids_match_spec_table() {
        assert_eq!(1, message_metadata(MessageType::Hello).id());
        assert_eq!(3, message_metadata(MessageType::Pose).id());
        assert_eq!(8, message_metadata(MessageType::Beacon).id());
        assert_eq!(9, message_metadata(MessageType::Config).id());
    }

    #[test]
    fn message_type_from_id_round_trips() {
        for message_type in MessageType::iter() {
            let id = message_metadata(message_type).id();
            assert_eq!(Some(message_type), message_type_from_id(id));
        }
    }

    #[test]
    fn unknown_id_resolves_to_none() {
        assert_eq!(None, message_type_from_id(0));
        assert_eq!(None, message_type_from_id(200));
    }

    #[test]
    fn ack_status_round_trips_through_bytes() {
        for status in [
            AckStatus::Ok,
            AckStatus::BadCode,
            AckStatus::Busy,
            AckStatus::VersionMismatch,
        ] {
            assert_eq!(Some(status), AckStatus::from_byte(status.as_byte()));
        }
    }
}
