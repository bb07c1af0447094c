//! Logical commands and their wire frames.
//!
//! A [`Packet`] is what the client wants to say: opcode, sub-opcode,
//! response mode and payload. [`Packet::to_bytes`] wraps it in a frame;
//! [`decode_frame`] goes the other way and never fails loudly: a frame
//! with a bad checksum still decodes, flagged through
//! [`DecodedFrame::checksum_valid`], so the caller decides whether to
//! drop it.

use std::fmt::Debug;

use bytes::{BufMut, Bytes, BytesMut};

use crate::checksum::checksum;
use crate::error::{Result, TouchwireError};
use crate::header::{
    BODY_PREFIX_LENGTH, END_MARKER, FrameHeader, HEADER_LENGTH, MIN_FRAME_LENGTH, TRAILER_LENGTH,
};
use crate::message::{Opcode, ResponseMode};

/// Largest body the codec will build or wait for (64 MiB).
///
/// Full-resolution captures stay well below it; a length prefix above it
/// can only come from corruption.
pub const MAX_BODY_SIZE: usize = 64 * 1024 * 1024;

/// Largest payload that still fits into [`MAX_BODY_SIZE`].
pub const MAX_PAYLOAD_SIZE: usize = MAX_BODY_SIZE - BODY_PREFIX_LENGTH;

// ── Packet ───────────────────────────────────────────────────────

/// An outbound command before framing.
#[derive(Clone, PartialEq, Eq)]
pub struct Packet {
    opcode: u8,
    sub_opcode: u8,
    response_mode: ResponseMode,
    payload: Bytes,
}

impl Packet {
    /// Build a command for a known opcode.
    pub fn new_command(opcode: Opcode, sub_opcode: u8, payload: impl Into<Bytes>) -> Result<Self> {
        Self::from_raw(opcode as u8, sub_opcode, ResponseMode::AwaitReply, payload)
    }

    /// Build a packet from raw field values.
    ///
    /// Used for replies in tests and for opcodes this crate has no name for.
    pub fn from_raw(
        opcode: u8,
        sub_opcode: u8,
        response_mode: ResponseMode,
        payload: impl Into<Bytes>,
    ) -> Result<Self> {
        let payload = payload.into();
        if payload.len() > MAX_PAYLOAD_SIZE {
            return Err(TouchwireError::PayloadTooLarge {
                size: payload.len(),
                max: MAX_PAYLOAD_SIZE,
            });
        }
        Ok(Self {
            opcode,
            sub_opcode,
            response_mode,
            payload,
        })
    }

    /// Same packet with a different response mode.
    pub fn with_response_mode(mut self, mode: ResponseMode) -> Self {
        self.response_mode = mode;
        self
    }

    pub fn opcode(&self) -> u8 {
        self.opcode
    }

    pub fn sub_opcode(&self) -> u8 {
        self.sub_opcode
    }

    pub fn response_mode(&self) -> ResponseMode {
        self.response_mode
    }

    pub fn payload(&self) -> &[u8] {
        &self.payload
    }

    /// Number of bytes the checksum covers.
    pub fn body_length(&self) -> usize {
        BODY_PREFIX_LENGTH + self.payload.len()
    }

    /// Number of bytes the frame occupies on the wire.
    pub fn frame_length(&self) -> usize {
        HEADER_LENGTH + self.body_length() + TRAILER_LENGTH
    }

    /// Append the framed packet to `dst`.
    pub fn write_frame(&self, dst: &mut BytesMut) {
        let body_start = dst.len() + HEADER_LENGTH;
        dst.reserve(self.frame_length());
        dst.put_slice(&FrameHeader::new(self.body_length() as u32).to_bytes());
        dst.put_u8(self.opcode);
        dst.put_u8(self.sub_opcode);
        dst.put_u8(self.response_mode as u8);
        dst.put_slice(&self.payload);
        let crc = checksum(&dst[body_start..]);
        dst.put_u16(crc);
        dst.put_slice(&END_MARKER);
    }

    /// The complete frame as a fresh buffer.
    pub fn to_bytes(&self) -> Bytes {
        let mut buf = BytesMut::with_capacity(self.frame_length());
        self.write_frame(&mut buf);
        buf.freeze()
    }
}

impl Debug for Packet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Packet")
            .field("opcode", &format_args!("{:#04x}", self.opcode))
            .field("sub_opcode", &format_args!("{:#04x}", self.sub_opcode))
            .field("response_mode", &self.response_mode)
            .field("payload_len", &self.payload.len())
            .finish()
    }
}

/// Encode raw field values straight into a frame.
pub fn encode_frame(
    opcode: u8,
    sub_opcode: u8,
    response_mode: ResponseMode,
    payload: &[u8],
) -> Result<Bytes> {
    Packet::from_raw(opcode, sub_opcode, response_mode, Bytes::copy_from_slice(payload))
        .map(|p| p.to_bytes())
}

// ── DecodedFrame ─────────────────────────────────────────────────

/// A frame read back off the wire.
#[derive(Clone, PartialEq, Eq)]
pub struct DecodedFrame {
    /// Declared body length.
    pub length: u32,
    pub opcode: u8,
    /// Status byte in replies.
    pub sub_opcode: u8,
    /// Raw byte; replies may carry values outside [`ResponseMode`].
    pub response_mode: u8,
    pub payload: Bytes,
    pub received_checksum: u16,
    pub computed_checksum: u16,
    pub checksum_valid: bool,
}

impl DecodedFrame {
    /// The opcode, if this crate knows it.
    pub fn known_opcode(&self) -> Option<Opcode> {
        Opcode::try_from(self.opcode).ok()
    }

    /// The response mode, if the byte is one of the two defined values.
    pub fn mode(&self) -> Option<ResponseMode> {
        ResponseMode::try_from(self.response_mode).ok()
    }
}

impl Debug for DecodedFrame {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DecodedFrame")
            .field("length", &self.length)
            .field("opcode", &format_args!("{:#04x}", self.opcode))
            .field("sub_opcode", &format_args!("{:#04x}", self.sub_opcode))
            .field("response_mode", &format_args!("{:#04x}", self.response_mode))
            .field("payload_len", &self.payload.len())
            .field("checksum_valid", &self.checksum_valid)
            .finish()
    }
}

/// Decode one frame from the front of `buf`.
///
/// Returns `None` if `buf` is shorter than [`MIN_FRAME_LENGTH`] or than the
/// declared frame, or if either marker is wrong. Bytes after the declared
/// frame are ignored.
pub fn decode_frame(buf: &[u8]) -> Option<DecodedFrame> {
    if buf.len() < MIN_FRAME_LENGTH {
        return None;
    }
    let header = FrameHeader::peek(buf)?;
    let frame_length = header.frame_length();
    if buf.len() < frame_length {
        return None;
    }
    let frame = &buf[..frame_length];
    if frame[frame_length - END_MARKER.len()..] != END_MARKER {
        return None;
    }

    let body_end = HEADER_LENGTH + header.body_length() as usize;
    let body = &frame[HEADER_LENGTH..body_end];
    let received_checksum = u16::from_be_bytes([frame[body_end], frame[body_end + 1]]);
    let computed_checksum = checksum(body);

    let field = |idx: usize| body.get(idx).copied().unwrap_or(0);
    let payload = if body.len() > BODY_PREFIX_LENGTH {
        Bytes::copy_from_slice(&body[BODY_PREFIX_LENGTH..])
    } else {
        Bytes::new()
    };

    Some(DecodedFrame {
        length: header.body_length(),
        opcode: field(0),
        sub_opcode: field(1),
        response_mode: field(2),
        payload,
        received_checksum,
        computed_checksum,
        checksum_valid: received_checksum == computed_checksum,
    })
}
