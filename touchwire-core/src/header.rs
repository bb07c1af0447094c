//! Fixed framing around every frame body: the start marker and length
//! prefix in front, the checksum and end marker behind.

/// Leading marker of every frame.
pub const START_MARKER: [u8; 2] = [0xAA, 0x55];

/// Trailing marker of every frame.
pub const END_MARKER: [u8; 2] = [0x55, 0xAA];

/// Start marker plus the 4-byte big-endian body length.
pub const HEADER_LENGTH: usize = START_MARKER.len() + 4;

/// Checksum plus end marker.
pub const TRAILER_LENGTH: usize = 2 + END_MARKER.len();

/// opcode + sub-opcode + response mode.
pub const BODY_PREFIX_LENGTH: usize = 3;

/// Smallest frame a well-behaved peer can produce (empty payload).
pub const MIN_FRAME_LENGTH: usize = HEADER_LENGTH + BODY_PREFIX_LENGTH + TRAILER_LENGTH;

/// The part of a frame that precedes the body.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameHeader {
    body_length: u32,
}

impl FrameHeader {
    pub fn new(body_length: u32) -> Self {
        Self { body_length }
    }

    /// Serialize marker and length.
    pub fn to_bytes(&self) -> [u8; HEADER_LENGTH] {
        let mut bytes = [0u8; HEADER_LENGTH];
        bytes[0..2].copy_from_slice(&START_MARKER);
        bytes[2..6].copy_from_slice(&self.body_length.to_be_bytes());
        bytes
    }

    /// Read a header from the front of `bytes`.
    ///
    /// Returns `None` when fewer than [`HEADER_LENGTH`] bytes are present or
    /// the start marker does not match.
    pub fn peek(bytes: &[u8]) -> Option<Self> {
        if bytes.len() < HEADER_LENGTH || bytes[0..2] != START_MARKER {
            return None;
        }
        let body_length = u32::from_be_bytes([bytes[2], bytes[3], bytes[4], bytes[5]]);
        Some(Self { body_length })
    }

    pub fn body_length(&self) -> u32 {
        self.body_length
    }

    /// Total number of bytes the frame occupies on the wire.
    pub fn frame_length(&self) -> usize {
        HEADER_LENGTH + self.body_length as usize + TRAILER_LENGTH
    }
}

/// Position of the first start marker in `bytes`, if any.
pub fn find_start_marker(bytes: &[u8]) -> Option<usize> {
    bytes.windows(START_MARKER.len()).position(|w| w == START_MARKER)
}
