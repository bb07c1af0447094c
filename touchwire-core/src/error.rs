//! Domain-specific error types for the daemon protocol.
//!
//! All fallible operations return `Result<T, TouchwireError>`.
//! No panics on invalid input; every error is typed and recoverable.

use std::time::Duration;
use thiserror::Error;

/// Crate-wide result alias.
pub type Result<T> = std::result::Result<T, TouchwireError>;

/// The canonical error type for the daemon protocol.
#[derive(Debug, Error)]
pub enum TouchwireError {
    // ── Protocol Errors ──────────────────────────────────────────
    /// A frame arrived whose checksum does not match its body.
    #[error("checksum mismatch: received {received:#06x}, computed {computed:#06x}")]
    ChecksumMismatch { received: u16, computed: u16 },

    /// A numeric value did not map to any known enum variant.
    #[error("unknown {type_name} discriminant: {value:#x}")]
    UnknownVariant { type_name: &'static str, value: u64 },

    /// The daemon's first frame could not be accepted.
    #[error("handshake failed: {0}")]
    HandshakeFailed(String),

    /// The daemon answered with the failure status byte.
    #[error("daemon rejected opcode {opcode:#04x} with status {status:#04x}")]
    RequestFailed { opcode: u8, status: u8 },

    /// The daemon answered with a status byte that is neither success nor failure.
    #[error("unexpected reply to opcode {opcode:#04x}: status {status:#04x}")]
    UnexpectedReply { opcode: u8, status: u8 },

    // ── Packet Errors ────────────────────────────────────────────
    /// The frame body exceeds the configured maximum size.
    #[error("payload too large: {size} bytes (max {max})")]
    PayloadTooLarge { size: usize, max: usize },

    // ── Connection Errors ────────────────────────────────────────
    /// The TCP/IO layer reported an error.
    #[error("connection error: {0}")]
    Connection(#[from] std::io::Error),

    /// The socket was closed while an operation was outstanding.
    #[error("connection closed")]
    ConnectionClosed,

    /// An operation is not allowed in the current connection state.
    #[error("invalid state: {0}")]
    InvalidState(&'static str),

    /// An operation exceeded its deadline.
    #[error("timeout after {0:?}")]
    Timeout(Duration),

    // ── Caller Errors ────────────────────────────────────────────
    /// Scroll direction string not understood.
    #[error("invalid scroll direction: {0}")]
    InvalidDirection(String),

    /// Capture image format string not understood.
    #[error("invalid image format: {0}")]
    InvalidImageFormat(String),

    /// Touch phase string not understood.
    #[error("invalid touch phase: {0}")]
    InvalidTouchPhase(String),

    /// Capture region is empty or inverted.
    #[error("invalid capture region: {0}")]
    InvalidRegion(String),

    /// A reply-awaiting request is already registered.
    #[error("a request is already awaiting its reply")]
    RequestInFlight,

    /// Catch-all for errors that do not fit another variant.
    #[error("{0}")]
    Other(String),
}

impl TouchwireError {
    /// Returns `true` for errors raised before any byte reaches the socket
    /// because the caller asked for something the protocol cannot express.
    pub fn is_caller_misuse(&self) -> bool {
        matches!(
            self,
            Self::InvalidDirection(_)
                | Self::InvalidImageFormat(_)
                | Self::InvalidTouchPhase(_)
                | Self::InvalidRegion(_)
                | Self::RequestInFlight
                | Self::PayloadTooLarge { .. }
        )
    }

    /// Returns `true` when the error means the transport itself is gone.
    pub fn is_transport(&self) -> bool {
        matches!(self, Self::Connection(_) | Self::ConnectionClosed)
    }
}

// ── Convenient From implementations ──────────────────────────────

impl From<String> for TouchwireError {
    fn from(s: String) -> Self {
        TouchwireError::Other(s)
    }
}

impl From<&str> for TouchwireError {
    fn from(s: &str) -> Self {
        TouchwireError::Other(s.to_string())
    }
}
