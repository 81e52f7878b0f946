//! Pack and unpack the nine fixed-layout televoodoo wire messages.
//!
//! Every function here is pure and total: `encode` never fails for a
//! well-formed [`Message`] (lengths are enforced by the variant's own field
//! widths), and `decode` either returns a valid [`Message`] or a specific
//! [`CodecError`] — it never panics and never reads past the declared
//! length (spec.md §8).

use tracing::warn;

use crate::error::CodecError;
use crate::protocol::{self, HEADER_LEN, MAGIC, MAX_VERSION, MIN_VERSION, MessageType};

const HELLO_LEN: usize = 18;
const ACK_LEN: usize = 12;
const POSE_LEN: usize = 46;
const BYE_LEN: usize = 10;
const CMD_LEN: usize = 8;
const HEARTBEAT_LEN: usize = 14;
const HAPTIC_LEN: usize = 12;
const BEACON_HEADER_LEN: usize = 10;
const CONFIG_HEADER_LEN: usize = 8;

/// Maximum BEACON/CONFIG payload size, matching the TCP framer's 4096 byte cap.
pub const MAX_MESSAGE_LEN: usize = 4096;

/// `HELLO` — mobile-to-host authentication request.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HelloMessage {
    pub session_id: u32,
    pub code: [u8; 6],
}

/// `ACK` — host-to-mobile authentication/version response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AckMessage {
    pub status: u8,
    pub min_ver: u8,
    pub max_ver: u8,
}

/// `POSE` — one 6-DoF sample. Position in meters, quaternion forwarded verbatim.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PoseMessage {
    pub seq: u16,
    pub ts_us: u64,
    pub movement_start: bool,
    pub x: f32,
    pub y: f32,
    pub z: f32,
    pub qx: f32,
    pub qy: f32,
    pub qz: f32,
    pub qw: f32,
}

/// `BYE` — mobile-to-host graceful close.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ByeMessage {
    pub session_id: u32,
}

/// `CMD` — mobile-to-host command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CmdMessage {
    pub cmd_type: u8,
    pub value: u8,
}

/// `HEARTBEAT` — host-to-mobile BLE liveness tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HeartbeatMessage {
    pub counter: u32,
    pub uptime_ms: u32,
}

/// `HAPTIC` — host-to-mobile feedback intensity.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HapticMessage {
    pub intensity: f32,
    pub channel: u8,
}

/// `BEACON` — host discovery broadcast (UDP only).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BeaconMessage {
    pub port: u16,
    pub name: String,
}

/// `CONFIG` — host-to-mobile opaque runtime configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigMessage {
    pub config: Vec<u8>,
}

/// A decoded televoodoo wire message.
#[derive(Debug, Clone, PartialEq)]
pub enum Message {
    Hello(HelloMessage),
    Ack(AckMessage),
    Pose(PoseMessage),
    Bye(ByeMessage),
    Cmd(CmdMessage),
    Heartbeat(HeartbeatMessage),
    Haptic(HapticMessage),
    Beacon(BeaconMessage),
    Config(ConfigMessage),
}

impl Message {
    /// Returns the typed message kind.
    #[must_use]
    pub fn message_type(&self) -> MessageType {
        match self {
            Self::Hello(_) => MessageType::Hello,
            Self::Ack(_) => MessageType::Ack,
            Self::Pose(_) => MessageType::Pose,
            Self::Bye(_) => MessageType::Bye,
            Self::Cmd(_) => MessageType::Cmd,
            Self::Heartbeat(_) => MessageType::Heartbeat,
            Self::Haptic(_) => MessageType::Haptic,
            Self::Beacon(_) => MessageType::Beacon,
            Self::Config(_) => MessageType::Config,
        }
    }
}

fn write_header(buffer: &mut Vec<u8>, message_type: MessageType) {
    buffer.extend_from_slice(&MAGIC);
    buffer.push(protocol::message_metadata(message_type).id());
    buffer.push(MIN_VERSION);
}

/// Encodes a message into its on-wire byte representation, header included.
///
/// The TCP 2-byte length prefix (spec.md §4.2) is not part of this output;
/// apply it with [`crate::framing::write_message`] for TCP transports.
///
/// ```
/// use televoodoo_host::codec::{self, PoseMessage};
///
/// let bytes = codec::encode(&codec::Message::Pose(PoseMessage {
///     seq: 0,
///     ts_us: 0,
///     movement_start: true,
///     x: 1.0,
///     y: 2.0,
///     z: 3.0,
///     qx: 0.0,
///     qy: 0.0,
///     qz: 0.0,
///     qw: 1.0,
/// }));
/// assert_eq!(46, bytes.len());
/// assert_eq!(&[0x54, 0x45, 0x4C, 0x45, 0x03, 0x01], &bytes[0..6]);
/// ```
#[must_use]
pub fn encode(message: &Message) -> Vec<u8> {
    match message {
        Message::Hello(hello) => encode_hello(hello),
        Message::Ack(ack) => encode_ack(ack),
        Message::Pose(pose) => encode_pose(pose),
        Message::Bye(bye) => encode_bye(bye),
        Message::Cmd(cmd) => encode_cmd(cmd),
        Message::Heartbeat(heartbeat) => encode_heartbeat(heartbeat),
        Message::Haptic(haptic) => encode_haptic(haptic),
        Message::Beacon(beacon) => encode_beacon(beacon),
        Message::Config(config) => encode_config(config),
    }
}

fn encode_hello(hello: &HelloMessage) -> Vec<u8> {
    let mut buffer = Vec::with_capacity(HELLO_LEN);
    write_header(&mut buffer, MessageType::Hello);
    buffer.extend_from_slice(&hello.session_id.to_le_bytes());
    buffer.extend_from_slice(&hello.code);
    buffer.extend_from_slice(&0u16.to_le_bytes());
    buffer
}

fn encode_ack(ack: &AckMessage) -> Vec<u8> {
    let mut buffer = Vec::with_capacity(ACK_LEN);
    write_header(&mut buffer, MessageType::Ack);
    buffer.push(ack.status);
    buffer.push(0);
    buffer.push(ack.min_ver);
    buffer.push(ack.max_ver);
    buffer.extend_from_slice(&0u16.to_le_bytes());
    buffer
}

fn encode_pose(pose: &PoseMessage) -> Vec<u8> {
    let mut buffer = Vec::with_capacity(POSE_LEN);
    write_header(&mut buffer, MessageType::Pose);
    buffer.extend_from_slice(&pose.seq.to_le_bytes());
    buffer.extend_from_slice(&pose.ts_us.to_le_bytes());
    buffer.push(u8::from(pose.movement_start));
    buffer.push(0);
    for value in [
        pose.x, pose.y, pose.z, pose.qx, pose.qy, pose.qz, pose.qw,
    ] {
        buffer.extend_from_slice(&value.to_le_bytes());
    }
    buffer
}

fn encode_bye(bye: &ByeMessage) -> Vec<u8> {
    let mut buffer = Vec::with_capacity(BYE_LEN);
    write_header(&mut buffer, MessageType::Bye);
    buffer.extend_from_slice(&bye.session_id.to_le_bytes());
    buffer
}

fn encode_cmd(cmd: &CmdMessage) -> Vec<u8> {
    let mut buffer = Vec::with_capacity(CMD_LEN);
    write_header(&mut buffer, MessageType::Cmd);
    buffer.push(cmd.cmd_type);
    buffer.push(cmd.value);
    buffer
}

fn encode_heartbeat(heartbeat: &HeartbeatMessage) -> Vec<u8> {
    let mut buffer = Vec::with_capacity(HEARTBEAT_LEN);
    write_header(&mut buffer, MessageType::Heartbeat);
    buffer.extend_from_slice(&heartbeat.counter.to_le_bytes());
    buffer.extend_from_slice(&heartbeat.uptime_ms.to_le_bytes());
    buffer
}

fn encode_haptic(haptic: &HapticMessage) -> Vec<u8> {
    let mut buffer = Vec::with_capacity(HAPTIC_LEN);
    write_header(&mut buffer, MessageType::Haptic);
    buffer.extend_from_slice(&haptic.intensity.to_le_bytes());
    buffer.push(haptic.channel);
    buffer.push(0);
    buffer
}

fn encode_beacon(beacon: &BeaconMessage) -> Vec<u8> {
    let name_bytes = beacon.name.as_bytes();
    let mut buffer = Vec::with_capacity(BEACON_HEADER_LEN + name_bytes.len());
    write_header(&mut buffer, MessageType::Beacon);
    buffer.extend_from_slice(&beacon.port.to_le_bytes());
    buffer.push(u8::try_from(name_bytes.len()).unwrap_or(u8::MAX));
    buffer.push(0);
    buffer.extend_from_slice(name_bytes);
    buffer
}

fn encode_config(config: &ConfigMessage) -> Vec<u8> {
    let mut buffer = Vec::with_capacity(CONFIG_HEADER_LEN + config.config.len());
    write_header(&mut buffer, MessageType::Config);
    let config_len = u16::try_from(config.config.len()).unwrap_or(u16::MAX);
    buffer.extend_from_slice(&config_len.to_le_bytes());
    buffer.extend_from_slice(&config.config);
    buffer
}

/// Decodes a wire-format byte slice (header included) into a typed [`Message`].
///
/// # Errors
///
/// Returns [`CodecError::BadMagic`], [`CodecError::UnsupportedVersion`],
/// [`CodecError::UnknownType`], or [`CodecError::TruncatedOrOversized`] per
/// spec.md §4.1. Non-zero reserved bytes are accepted (forward
/// compatibility) and only logged at `WARN`.
///
/// ```
/// use televoodoo_host::codec;
///
/// let frame = [0x54, 0x45, 0x4C, 0x45, 0x05, 0x01, 0x01, 0x01];
/// let decoded = codec::decode(&frame)?;
/// assert_eq!(televoodoo_host::protocol::MessageType::Cmd, decoded.message_type());
/// # Ok::<(), televoodoo_host::error::CodecError>(())
/// ```
pub fn decode(bytes: &[u8]) -> Result<Message, CodecError> {
    if bytes.len() < HEADER_LEN {
        return Err(CodecError::TruncatedOrOversized {
            expected: HEADER_LEN,
            actual: bytes.len(),
        });
    }
    if bytes[0..4] != MAGIC {
        return Err(CodecError::BadMagic);
    }
    let type_id = bytes[4];
    let version = bytes[5];
    if version < MIN_VERSION || version > MAX_VERSION {
        return Err(CodecError::UnsupportedVersion { got: version });
    }
    let Some(message_type) = protocol::message_type_from_id(type_id) else {
        return Err(CodecError::UnknownType { got: type_id });
    };

    let body = &bytes[HEADER_LEN..];
    match message_type {
        MessageType::Hello => decode_hello(body),
        MessageType::Ack => decode_ack(body),
        MessageType::Pose => decode_pose(body),
        MessageType::Bye => decode_bye(body),
        MessageType::Cmd => decode_cmd(body),
        MessageType::Heartbeat => decode_heartbeat(body),
        MessageType::Haptic => decode_haptic(body),
        MessageType::Beacon => decode_beacon(body),
        MessageType::Config => decode_config(body),
    }
}

fn expect_len(body: &[u8], expected: usize) -> Result<(), CodecError> {
    if body.len() != expected {
        return Err(CodecError::TruncatedOrOversized {
            expected: expected + HEADER_LEN,
            actual: body.len() + HEADER_LEN,
        });
    }
    Ok(())
}

fn warn_if_reserved_nonzero(message_type: MessageType, reserved: u16) {
    if reserved != 0 {
        warn!(%message_type, reserved, "non-zero reserved bytes accepted for forward compatibility");
    }
}

fn decode_hello(body: &[u8]) -> Result<Message, CodecError> {
    expect_len(body, HELLO_LEN - HEADER_LEN)?;
    let session_id = u32::from_le_bytes(body[0..4].try_into().unwrap());
    let mut code = [0u8; 6];
    code.copy_from_slice(&body[4..10]);
    let reserved = u16::from_le_bytes(body[10..12].try_into().unwrap());
    warn_if_reserved_nonzero(MessageType::Hello, reserved);
    Ok(Message::Hello(HelloMessage { session_id, code }))
}

fn decode_ack(body: &[u8]) -> Result<Message, CodecError> {
    expect_len(body, ACK_LEN - HEADER_LEN)?;
    let status = body[0];
    let min_ver = body[2];
    let max_ver = body[3];
    let reserved = u16::from_le_bytes(body[4..6].try_into().unwrap());
    warn_if_reserved_nonzero(MessageType::Ack, reserved);
    Ok(Message::Ack(AckMessage {
        status,
        min_ver,
        max_ver,
    }))
}

fn decode_pose(body: &[u8]) -> Result<Message, CodecError> {
    expect_len(body, POSE_LEN - HEADER_LEN)?;
    let seq = u16::from_le_bytes(body[0..2].try_into().unwrap());
    let ts_us = u64::from_le_bytes(body[2..10].try_into().unwrap());
    let flags = body[10];
    let movement_start = flags & 0b1 != 0;
    warn_if_reserved_nonzero(MessageType::Pose, u16::from(body[11]));
    let floats_at = |offset: usize| f32::from_le_bytes(body[offset..offset + 4].try_into().unwrap());
    Ok(Message::Pose(PoseMessage {
        seq,
        ts_us,
        movement_start,
        x: floats_at(12),
        y: floats_at(16),
        z: floats_at(20),
        qx: floats_at(24),
        qy: floats_at(28),
        qz: floats_at(32),
        qw: floats_at(36),
    }))
}

fn decode_bye(body: &[u8]) -> Result<Message, CodecError> {
    expect_len(body, BYE_LEN - HEADER_LEN)?;
    let session_id = u32::from_le_bytes(body[0..4].try_into().unwrap());
    Ok(Message::Bye(ByeMessage { session_id }))
}

fn decode_cmd(body: &[u8]) -> Result<Message, CodecError> {
    expect_len(body, CMD_LEN - HEADER_LEN)?;
    Ok(Message::Cmd(CmdMessage {
        cmd_type: body[0],
        value: body[1],
    }))
}

fn decode_heartbeat(body: &[u8]) -> Result<Message, CodecError> {
    expect_len(body, HEARTBEAT_LEN - HEADER_LEN)?;
    let counter = u32::from_le_bytes(body[0..4].try_into().unwrap());
    let uptime_ms = u32::from_le_bytes(body[4..8].try_into().unwrap());
    Ok(Message::Heartbeat(HeartbeatMessage {
        counter,
        uptime_ms,
    }))
}

fn decode_haptic(body: &[u8]) -> Result<Message, CodecError> {
    expect_len(body, HAPTIC_LEN - HEADER_LEN)?;
    let intensity = f32::from_le_bytes(body[0..4].try_into().unwrap());
    let channel = body[4];
    warn_if_reserved_nonzero(MessageType::Haptic, u16::from(body[5]));
    Ok(Message::Haptic(HapticMessage { intensity, channel }))
}

fn decode_beacon(body: &[u8]) -> Result<Message, CodecError> {
    let header_body_len = BEACON_HEADER_LEN - HEADER_LEN;
    if body.len() < header_body_len {
        return Err(CodecError::TruncatedOrOversized {
            expected: BEACON_HEADER_LEN,
            actual: body.len() + HEADER_LEN,
        });
    }
    let port = u16::from_le_bytes(body[0..2].try_into().unwrap());
    let name_len = body[2] as usize;
    warn_if_reserved_nonzero(MessageType::Beacon, u16::from(body[3]));
    if name_len == 0 {
        return Err(CodecError::InvalidFrame {
            reason: "BEACON name_len must be non-zero",
        });
    }
    let name_bytes = &body[header_body_len..];
    if name_bytes.len() != name_len {
        return Err(CodecError::TruncatedOrOversized {
            expected: BEACON_HEADER_LEN + name_len,
            actual: body.len() + HEADER_LEN,
        });
    }
    let name = String::from_utf8_lossy(name_bytes).into_owned();
    Ok(Message::Beacon(BeaconMessage { port, name }))
}

fn decode_config(body: &[u8]) -> Result<Message, CodecError> {
    let header_body_len = CONFIG_HEADER_LEN - HEADER_LEN;
    if body.len() < header_body_len {
        return Err(CodecError::TruncatedOrOversized {
            expected: CONFIG_HEADER_LEN,
            actual: body.len() + HEADER_LEN,
        });
    }
    let config_len = u16::from_le_bytes(body[0..2].try_into().unwrap()) as usize;
    let config_bytes = &body[header_body_len..];
    if config_bytes.len() != config_len {
        return Err(CodecError::TruncatedOrOversized {
            expected: CONFIG_HEADER_LEN + config_len,
            actual: body.len() + HEADER_LEN,
        });
    }
    Ok(Message::Config(ConfigMessage {
        config: config_bytes.to_vec(),
    }))
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;
    use pretty_assertions::assert_eq;
    use proptest::prelude::*;
    use rstest::rstest;

    use super::*;

    fn sample_pose() -> PoseMessage {
        PoseMessage {
            seq: 0,
            ts_us: 0,
            movement_start: true,
            x: 1.0,
            y: 2.0,
            z: 3.0,
            qx: 0.0,
            qy: 0.0,
            qz: 0.0,
            qw: 1.0,
        }
    }

    #[test]
    fn pose_wire_bytes_match_golden_vector() {
        let encoded = encode(&Message::Pose(sample_pose()));
        assert_eq!(46, encoded.len());
        assert_eq!(&[0x54, 0x45, 0x4C, 0x45, 0x03, 0x01], &encoded[0..6]);
    }

    #[test]
    fn beacon_wire_bytes_match_golden_vector() {
        let encoded = encode(&Message::Beacon(BeaconMessage {
            port: 50000,
            name: "myvoodoo".to_string(),
        }));
        assert_eq!(
            vec![
                0x54, 0x45, 0x4C, 0x45, 0x08, 0x01, 0x50, 0xC3, 0x08, 0x00, 0x6D, 0x79, 0x76,
                0x6F, 0x6F, 0x64, 0x6F, 0x6F,
            ],
            encoded
        );
    }

    #[test]
    fn config_wire_bytes_match_golden_vector() {
        let encoded = encode(&Message::Config(ConfigMessage {
            config: b"{}".to_vec(),
        }));
        assert_eq!(
            vec![0x54, 0x45, 0x4C, 0x45, 0x09, 0x01, 0x02, 0x00, 0x7B, 0x7D],
            encoded
        );
    }

    #[rstest]
    #[case::hello(Message::Hello(HelloMessage { session_id: 1, code: *b"ABC123" }))]
    #[case::ack(Message::Ack(AckMessage { status: 0, min_ver: 1, max_ver: 1 }))]
    #[case::pose(Message::Pose(sample_pose()))]
    #[case::bye(Message::Bye(ByeMessage { session_id: 1 }))]
    #[case::cmd(Message::Cmd(CmdMessage { cmd_type: 1, value: 1 }))]
    #[case::heartbeat(Message::Heartbeat(HeartbeatMessage { counter: 7, uptime_ms: 1000 }))]
    #[case::haptic(Message::Haptic(HapticMessage { intensity: 0.5, channel: 0 }))]
    #[case::beacon(Message::Beacon(BeaconMessage { port: 50000, name: "myvoodoo".to_string() }))]
    #[case::config(Message::Config(ConfigMessage { config: b"{}".to_vec() }))]
    fn decode_of_encode_is_identity(#[case] message: Message) {
        let encoded = encode(&message);
        let decoded = decode(&encoded).expect("well-formed message should decode");
        assert_eq!(message, decoded);
    }

    #[test]
    fn decode_rejects_bad_magic() {
        let mut encoded = encode(&Message::Cmd(CmdMessage { cmd_type: 1, value: 1 }));
        encoded[0] = b'X';
        assert_matches!(decode(&encoded), Err(CodecError::BadMagic));
    }

    #[test]
    fn decode_rejects_unsupported_version() {
        let mut encoded = encode(&Message::Cmd(CmdMessage { cmd_type: 1, value: 1 }));
        encoded[5] = 2;
        assert_matches!(decode(&encoded), Err(CodecError::UnsupportedVersion { got: 2 }));
    }

    #[test]
    fn decode_rejects_unknown_type() {
        let mut encoded = encode(&Message::Cmd(CmdMessage { cmd_type: 1, value: 1 }));
        encoded[4] = 200;
        assert_matches!(decode(&encoded), Err(CodecError::UnknownType { got: 200 }));
    }

    #[test]
    fn decode_rejects_truncated_fixed_size_message() {
        let encoded = encode(&Message::Cmd(CmdMessage { cmd_type: 1, value: 1 }));
        assert_matches!(
            decode(&encoded[..encoded.len() - 1]),
            Err(CodecError::TruncatedOrOversized { .. })
        );
    }

    #[test]
    fn beacon_name_len_zero_is_invalid_frame() {
        let mut encoded = encode(&Message::Beacon(BeaconMessage {
            port: 1,
            name: "x".to_string(),
        }));
        encoded[8] = 0;
        assert_matches!(decode(&encoded), Err(CodecError::InvalidFrame { .. }));
    }

    #[test]
    fn beacon_name_len_255_with_few_bytes_is_truncated() {
        let mut encoded = encode(&Message::Beacon(BeaconMessage {
            port: 1,
            name: "short".to_string(),
        }));
        encoded[8] = 255;
        assert_matches!(decode(&encoded), Err(CodecError::TruncatedOrOversized { .. }));
    }

    #[test]
    fn config_len_exceeding_payload_is_truncated() {
        let mut encoded = encode(&Message::Config(ConfigMessage {
            config: b"ab".to_vec(),
        }));
        encoded[6] = 250;
        assert_matches!(decode(&encoded), Err(CodecError::TruncatedOrOversized { .. }));
    }

    #[test]
    fn pose_flags_0xff_sets_movement_start_with_no_other_semantics() {
        let mut encoded = encode(&Message::Pose(sample_pose()));
        encoded[HEADER_LEN + 10] = 0xFF;
        let Message::Pose(decoded) = decode(&encoded).expect("pose should decode") else {
            panic!("expected pose");
        };
        assert_eq!(true, decoded.movement_start);
        assert_eq!(sample_pose().x, decoded.x);
    }

    #[test]
    fn pose_round_trips_nan_and_subnormals_bit_for_bit() {
        let pose = PoseMessage {
            seq: u16::MAX,
            ts_us: u64::MAX,
            movement_start: false,
            x: f32::NAN,
            y: f32::from_bits(1),
            z: -0.0,
            qx: f32::INFINITY,
            qy: f32::NEG_INFINITY,
            qz: 0.0,
            qw: 1.0,
        };
        let encoded = encode(&Message::Pose(pose));
        let Message::Pose(decoded) = decode(&encoded).expect("pose should decode") else {
            panic!("expected pose");
        };
        assert_eq!(pose.x.to_bits(), decoded.x.to_bits());
        assert_eq!(pose.y.to_bits(), decoded.y.to_bits());
        assert_eq!(pose.z.to_bits(), decoded.z.to_bits());
        assert_eq!(pose.qx.to_bits(), decoded.qx.to_bits());
        assert_eq!(pose.qy.to_bits(), decoded.qy.to_bits());
    }

    proptest! {
        #[test]
        fn pose_round_trips_for_arbitrary_fields(
            seq: u16,
            ts_us: u64,
            movement_start: bool,
            x: f32, y: f32, z: f32,
            qx: f32, qy: f32, qz: f32, qw: f32,
        ) {
            // Compared bit-for-bit, not via PartialEq: arbitrary f32 inputs
            // include NaN, which is never equal to itself under `==`.
            let pose = PoseMessage { seq, ts_us, movement_start, x, y, z, qx, qy, qz, qw };
            let encoded = encode(&Message::Pose(pose));
            let Message::Pose(decoded) = decode(&encoded).expect("pose should decode") else {
                panic!("expected pose");
            };
            prop_assert_eq!(pose.seq, decoded.seq);
            prop_assert_eq!(pose.ts_us, decoded.ts_us);
            prop_assert_eq!(pose.movement_start, decoded.movement_start);
            prop_assert_eq!(pose.x.to_bits(), decoded.x.to_bits());
            prop_assert_eq!(pose.y.to_bits(), decoded.y.to_bits());
            prop_assert_eq!(pose.z.to_bits(), decoded.z.to_bits());
            prop_assert_eq!(pose.qx.to_bits(), decoded.qx.to_bits());
            prop_assert_eq!(pose.qy.to_bits(), decoded.qy.to_bits());
            prop_assert_eq!(pose.qz.to_bits(), decoded.qz.to_bits());
            prop_assert_eq!(pose.qw.to_bits(), decoded.qw.to_bits());
        }

        #[test]
        fn decode_never_panics_on_arbitrary_bytes(bytes: Vec<u8>) {
            let _ = decode(&bytes);
        }

        #[test]
        fn encoded_messages_always_start_with_header(
            cmd_type: u8, value: u8,
        ) {
            let encoded = encode(&Message::Cmd(CmdMessage { cmd_type, value }));
            prop_assert!(encoded.starts_with(&MAGIC));
            prop_assert_eq!(encoded[4], protocol::message_metadata(MessageType::Cmd).id());
            prop_assert_eq!(encoded[5], 1);
        }
    }
}
