//! Protocol vocabulary: opcodes, response modes, status bytes and the
//! enumerations carried inside command payloads.
//!
//! Uses proper enums with `TryFrom`; no panics on unknown values.
//! Enums a caller may type by hand also implement `FromStr`, which is
//! where caller misuse is rejected before any traffic is produced.

use std::fmt;
use std::str::FromStr;

use crate::error::TouchwireError;

// ── Opcode ───────────────────────────────────────────────────────

/// Command codes understood by the daemon.
///
/// - `0x01`        : Connection notification (daemon → client)
/// - `0xA0..0xAF`  : Diagnostics
/// - `0xB0..0xBF`  : Touch input
/// - `0xC0..0xCF`  : Screen capture
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Opcode {
    /// Unsolicited "connected" frame the daemon sends after TCP open.
    Hello = 0x01,
    /// Liveness probe; the reply carries no payload.
    Ping = 0xA0,
    /// Single touch event (press, release or move).
    Touch = 0xB1,
    /// Press-move-release along a straight line.
    Drag = 0xB2,
    /// Repeated taps at one point, paced by the daemon.
    RepeatTouch = 0xB3,
    /// Screen region capture; the reply payload is the encoded image.
    Capture = 0xC1,
}

impl TryFrom<u8> for Opcode {
    type Error = TouchwireError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0x01 => Ok(Opcode::Hello),
            0xA0 => Ok(Opcode::Ping),
            0xB1 => Ok(Opcode::Touch),
            0xB2 => Ok(Opcode::Drag),
            0xB3 => Ok(Opcode::RepeatTouch),
            0xC1 => Ok(Opcode::Capture),
            _ => Err(TouchwireError::UnknownVariant {
                type_name: "Opcode",
                value: value as u64,
            }),
        }
    }
}

impl fmt::Display for Opcode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

// ── ResponseMode ─────────────────────────────────────────────────

/// Per-command flag telling the daemon whether to answer.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ResponseMode {
    /// The daemon replies; the sender waits for that reply.
    #[default]
    AwaitReply = 0x00,
    /// No reply is produced and nothing is correlated.
    FireAndForget = 0xFE,
}

impl TryFrom<u8> for ResponseMode {
    type Error = TouchwireError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0x00 => Ok(ResponseMode::AwaitReply),
            0xFE => Ok(ResponseMode::FireAndForget),
            _ => Err(TouchwireError::UnknownVariant {
                type_name: "ResponseMode",
                value: value as u64,
            }),
        }
    }
}

// ── Status ───────────────────────────────────────────────────────

/// Status byte values carried in the sub-opcode field of replies.
pub mod status {
    /// The daemon executed the command.
    pub const OK: u8 = 0x00;
    /// The daemon refused or failed the command.
    pub const FAILED: u8 = 0x01;
}

// ── TouchPhase ───────────────────────────────────────────────────

/// Action code of a touch payload.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TouchPhase {
    Press = 0x00,
    Release = 0x01,
    Move = 0x02,
}

impl FromStr for TouchPhase {
    type Err = TouchwireError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "press" | "down" => Ok(TouchPhase::Press),
            "release" | "up" => Ok(TouchPhase::Release),
            "move" => Ok(TouchPhase::Move),
            _ => Err(TouchwireError::InvalidTouchPhase(s.to_string())),
        }
    }
}

// ── ImageFormat ──────────────────────────────────────────────────

/// Encoding the daemon uses for captured images (capture sub-opcode).
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ImageFormat {
    #[default]
    Png = 0x00,
    Jpeg = 0x01,
    Bmp = 0x02,
}

impl ImageFormat {
    /// Conventional file extension for this format.
    pub fn extension(self) -> &'static str {
        match self {
            ImageFormat::Png => "png",
            ImageFormat::Jpeg => "jpg",
            ImageFormat::Bmp => "bmp",
        }
    }
}

impl FromStr for ImageFormat {
    type Err = TouchwireError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "png" => Ok(ImageFormat::Png),
            "jpg" | "jpeg" => Ok(ImageFormat::Jpeg),
            "bmp" => Ok(ImageFormat::Bmp),
            _ => Err(TouchwireError::InvalidImageFormat(s.to_string())),
        }
    }
}

impl fmt::Display for ImageFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

// ── ScrollDirection ──────────────────────────────────────────────

/// Direction of a scroll gesture.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScrollDirection {
    Up,
    Down,
    Left,
    Right,
}

impl FromStr for ScrollDirection {
    type Err = TouchwireError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "up" => Ok(ScrollDirection::Up),
            "down" => Ok(ScrollDirection::Down),
            "left" => Ok(ScrollDirection::Left),
            "right" => Ok(ScrollDirection::Right),
            _ => Err(TouchwireError::InvalidDirection(s.to_string())),
        }
    }
}
