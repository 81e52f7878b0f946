use derive_more::From;
use thiserror::Error;

/// Errors returned by the message codec (spec.md §4.1).
#[derive(Debug, Error, Clone, Eq, PartialEq)]
pub enum CodecError {
    #[error("bad magic bytes")]
    BadMagic,
    #[error("unsupported protocol version {got}")]
    UnsupportedVersion { got: u8 },
    #[error("unknown message type {got}")]
    UnknownType { got: u8 },
    #[error("truncated or oversized payload: expected {expected} bytes, got {actual}")]
    TruncatedOrOversized { expected: usize, actual: usize },
    #[error("invalid frame: {reason}")]
    InvalidFrame { reason: &'static str },
}

/// Errors returned by the TCP length-prefixed framer (spec.md §4.2).
#[derive(Debug, Error)]
pub enum FramingError {
    #[error("stream ended mid-message")]
    UnexpectedEof,
    #[error("invalid frame length {len}")]
    InvalidFrame { len: u16 },
    #[error("frame of {len} bytes exceeds the {max} byte limit")]
    FrameTooLarge { len: usize, max: usize },
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Errors returned by a `Transport` implementation (spec.md §4.4).
#[derive(Debug, Error, From)]
pub enum TransportError {
    #[error(transparent)]
    Io(std::io::Error),
    #[error(transparent)]
    Codec(CodecError),
    #[error(transparent)]
    Framing(FramingError),
    #[error("transport is closed")]
    Closed,
}

/// Errors surfaced by the session state machine (spec.md §4.7).
#[derive(Debug, Error)]
pub enum SessionError {
    #[error(transparent)]
    Transport(#[from] TransportError),
    #[error("remote is locked out after repeated bad auth codes")]
    LockedOut,
}

/// Errors returned by outbound router operations (spec.md §4.8).
#[derive(Debug, Error, Clone, Eq, PartialEq)]
pub enum RouterError {
    #[error("no session is currently connected")]
    NoSession,
    #[error("outbound transport is backpressured")]
    Backpressured,
    #[error("transport closed while sending")]
    TransportClosed,
}

/// Errors returned while validating a [`crate::config::HostConfig`] (spec.md §6.2).
#[derive(Debug, Error, Clone, Eq, PartialEq)]
pub enum HostConfigError {
    #[error("auth_code must be exactly 6 bytes of [A-Z0-9], got `{value}`")]
    InvalidAuthCode { value: String },
    #[error("service_name must be 1..=20 UTF-8 bytes, got {len} bytes")]
    InvalidServiceNameLength { len: usize },
}

/// Top-level error aggregating every subsystem, returned from [`crate::Host`] operations.
#[derive(Debug, Error, From)]
pub enum HostError {
    #[error(transparent)]
    Transport(TransportError),
    #[error(transparent)]
    Session(SessionError),
    #[error(transparent)]
    Router(RouterError),
    #[error(transparent)]
    Config(HostConfigError),
    #[error("failed to bind {kind} socket")]
    Bind {
        kind: &'static str,
        #[source]
        source: std::io::Error,
    },
}
