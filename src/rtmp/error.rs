// RTMP error model

use std::io::ErrorKind;

/// Kind of codec that failed to parse a payload
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CodecKind {
    Amf,
    Flv,
}

impl std::fmt::Display for CodecKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CodecKind::Amf => write!(f, "AMF"),
            CodecKind::Flv => write!(f, "FLV"),
        }
    }
}

/// Errors terminating an RTMP session
#[derive(Debug, thiserror::Error)]
pub enum RtmpError {
    #[error("connection closed by peer")]
    ConnectionClosed,

    #[error("handshake failed: {0}")]
    HandshakeFailed(String),

    #[error("unsupported rtmp version: {0}")]
    UnsupportedVersion(u8),

    #[error("protocol error: {0}")]
    ProtocolError(String),

    #[error("command rejected: {0}")]
    CommandRejected(String),

    #[error("stream is busy")]
    StreamBusy,

    #[error("stream not found")]
    StreamNotFound,

    #[error("resource exhausted: {0}")]
    ResourceExhausted(String),

    #[error("{0} codec error")]
    CodecError(CodecKind),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl RtmpError {
    /// Builds a protocol error from a reason
    pub fn protocol(reason: &str) -> RtmpError {
        RtmpError::ProtocolError(reason.to_string())
    }

    /// Maps a read or write error, turning peer disconnections
    /// into ConnectionClosed
    pub fn from_io(error: std::io::Error) -> RtmpError {
        match error.kind() {
            ErrorKind::UnexpectedEof
            | ErrorKind::ConnectionReset
            | ErrorKind::ConnectionAborted
            | ErrorKind::BrokenPipe => RtmpError::ConnectionClosed,
            _ => RtmpError::Io(error),
        }
    }

    /// Returns true when the error only means the peer went away
    pub fn is_peer_closed(&self) -> bool {
        matches!(self, RtmpError::ConnectionClosed)
    }
}
