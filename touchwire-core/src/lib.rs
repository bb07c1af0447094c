//! # touchwire-core
//!
//! Client library for remote touch-screen control daemons.
//!
//! This crate contains:
//! - **Checksum**: the 16-bit frame checksum
//! - **Packet / Codec**: frame layout, `Packet` and `DaemonCodec` for framed TCP I/O via `tokio_util`
//! - **Protocol payloads**: fixed-layout touch, drag, repeat-touch and capture payloads
//! - **State**: connection state machine and single-outstanding reply correlation
//! - **Network**: `DaemonConnection`, handshake, reader task and request/response
//! - **Device**: `RemoteDevice`, the gesture-level API
//! - **Backend**: the `ControlBackend` trait and `BackendCapabilities`
//! - **Error**: `TouchwireError`, a `thiserror`-based error enum

pub mod backend;
pub mod checksum;
pub mod codec;
pub mod config;
pub mod device;
pub mod error;
pub mod flags;
pub mod header;
pub mod message;
pub mod network;
pub mod packet;
pub mod protocol;
pub mod state;

// ── Re-exports for ergonomic usage ───────────────────────────────

pub use backend::{ControlBackend, select_backend};
pub use checksum::checksum;
pub use codec::DaemonCodec;
pub use config::{ConnectionConfig, DeviceConfig};
pub use device::{RemoteDevice, scroll_path};
pub use error::{Result, TouchwireError};
pub use flags::BackendCapabilities;
pub use header::{END_MARKER, FrameHeader, HEADER_LENGTH, MIN_FRAME_LENGTH, START_MARKER};
pub use message::{ImageFormat, Opcode, ResponseMode, ScrollDirection, TouchPhase};
pub use network::{ConnectionEvent, DaemonConnection};
pub use packet::{DecodedFrame, MAX_BODY_SIZE, MAX_PAYLOAD_SIZE, Packet, decode_frame, encode_frame};
pub use protocol::{CaptureRegion, DragGesture, RepeatTouch, TouchEvent};
pub use state::{ConnectStage, ConnectionState, Reply};
