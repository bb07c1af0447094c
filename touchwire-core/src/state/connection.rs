//! Connection state machine for the daemon link.
//!
//! Provides a `ConnectionState` enum that models the full lifecycle of the
//! socket, with validated transitions that return `Result` instead of
//! panicking.

use std::time::Instant;

use crate::error::TouchwireError;

// ── ConnectStage ─────────────────────────────────────────────────

/// Progress inside [`ConnectionState::Connecting`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectStage {
    /// TCP connect in flight.
    Dialing,
    /// Socket open; waiting for the daemon's unsolicited first frame.
    Handshake,
}

// ── ConnectionState ──────────────────────────────────────────────

/// The current state of the daemon connection.
///
/// ```text
///  Disconnected ──► Connecting(Dialing) ──► Connecting(Handshake) ──► Connected
///    ▲   ▲                 │                        │                    │  │
///    │   │                 ▼                        ▼                    │  │
///    │   └───────────── Error ◄─────────────────────┴────────────────────┘  │
///    └──────────────────────────────────────────────────────────────────────┘
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ConnectionState {
    /// No socket. Initial state; terminal until the next `connect()`.
    #[default]
    Disconnected,

    /// A connect attempt is running.
    Connecting(ConnectStage),

    /// Handshake accepted; commands may be sent.
    Connected {
        /// When the connection entered the `Connected` state.
        since: Instant,
    },

    /// The socket failed. Terminal until the next `connect()`.
    Error {
        /// Human-readable cause.
        reason: String,
    },
}

impl std::fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Disconnected => write!(f, "Disconnected"),
            Self::Connecting(ConnectStage::Dialing) => write!(f, "Connecting"),
            Self::Connecting(ConnectStage::Handshake) => write!(f, "Connecting (handshake)"),
            Self::Connected { .. } => write!(f, "Connected"),
            Self::Error { reason } => write!(f, "Error: {reason}"),
        }
    }
}

impl ConnectionState {
    /// Returns `true` when commands may be sent.
    pub fn is_connected(&self) -> bool {
        matches!(self, Self::Connected { .. })
    }

    pub fn is_connecting(&self) -> bool {
        matches!(self, Self::Connecting(_))
    }

    pub fn is_disconnected(&self) -> bool {
        matches!(self, Self::Disconnected)
    }

    pub fn is_error(&self) -> bool {
        matches!(self, Self::Error { .. })
    }

    /// How long the connection has been in the `Connected` state.
    ///
    /// Returns `None` for any other state.
    pub fn connected_duration(&self) -> Option<std::time::Duration> {
        match self {
            Self::Connected { since } => Some(since.elapsed()),
            _ => None,
        }
    }

    // ── Transitions ──────────────────────────────────────────────

    /// Transition to `Connecting(Dialing)`.
    ///
    /// Valid from: `Disconnected`, `Error`.
    pub fn begin_connect(&mut self) -> Result<(), TouchwireError> {
        match self {
            Self::Disconnected | Self::Error { .. } => {
                *self = Self::Connecting(ConnectStage::Dialing);
                Ok(())
            }
            Self::Connecting(_) => Err(TouchwireError::InvalidState(
                "cannot connect: a connect attempt is already running",
            )),
            Self::Connected { .. } => Err(TouchwireError::InvalidState(
                "cannot connect: already connected",
            )),
        }
    }

    /// Transition to `Connecting(Handshake)`.
    ///
    /// Valid from: `Connecting(Dialing)`.
    pub fn begin_handshake(&mut self) -> Result<(), TouchwireError> {
        match self {
            Self::Connecting(ConnectStage::Dialing) => {
                *self = Self::Connecting(ConnectStage::Handshake);
                Ok(())
            }
            _ => Err(TouchwireError::InvalidState(
                "cannot handshake: socket is not dialing",
            )),
        }
    }

    /// Transition to `Connected`.
    ///
    /// Valid from: `Connecting(Handshake)`.
    pub fn complete_handshake(&mut self) -> Result<(), TouchwireError> {
        match self {
            Self::Connecting(ConnectStage::Handshake) => {
                *self = Self::Connected {
                    since: Instant::now(),
                };
                Ok(())
            }
            _ => Err(TouchwireError::InvalidState(
                "cannot complete handshake: not waiting for one",
            )),
        }
    }

    /// Transition to `Error`.
    ///
    /// Valid from: `Connecting`, `Connected`.
    pub fn fail(&mut self, reason: impl Into<String>) -> Result<(), TouchwireError> {
        match self {
            Self::Connecting(_) | Self::Connected { .. } => {
                *self = Self::Error {
                    reason: reason.into(),
                };
                Ok(())
            }
            _ => Err(TouchwireError::InvalidState(
                "cannot fail: no connection in progress",
            )),
        }
    }

    /// Transition to `Disconnected` after the peer closed the socket.
    ///
    /// Valid from: `Connected`.
    pub fn close(&mut self) -> Result<(), TouchwireError> {
        match self {
            Self::Connected { .. } => {
                *self = Self::Disconnected;
                Ok(())
            }
            _ => Err(TouchwireError::InvalidState(
                "cannot close: not connected",
            )),
        }
    }

    /// Force-reset to `Disconnected` regardless of current state.
    ///
    /// Used by an explicit `disconnect()`.
    pub fn force_disconnect(&mut self) {
        *self = Self::Disconnected;
    }
}

// ── Tests ────────────────────────────────────────────────────────
