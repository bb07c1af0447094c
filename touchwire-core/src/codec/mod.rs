//! Stream reassembly for the daemon socket.
//!
//! [`DaemonCodec`] plugs into `tokio_util::codec::{FramedRead, FramedWrite}`.
//! The read buffer of the framed reader is the receive accumulator: bytes
//! are appended as they arrive and frames are split off its front.
//!
//! The decoder resynchronizes on its own. Leading noise is dropped up to the
//! next start marker, and a marker that turns out not to open a frame (bad
//! end marker, impossible length) is skipped. Frames with a bad checksum are
//! still yielded; correlation decides what to do with them.

use bytes::{Buf, BytesMut};
use tokio_util::codec::{Decoder, Encoder};
use tracing::{debug, trace, warn};

use crate::error::TouchwireError;
use crate::header::{END_MARKER, FrameHeader, START_MARKER, find_start_marker};
use crate::packet::{DecodedFrame, MAX_BODY_SIZE, Packet, decode_frame};

#[derive(Debug, Clone)]
pub struct DaemonCodec {
    max_body_size: usize,
    discarded: u64,
}

impl DaemonCodec {
    pub fn new() -> Self {
        Self::with_max_body_size(MAX_BODY_SIZE)
    }

    pub fn with_max_body_size(max_body_size: usize) -> Self {
        Self {
            max_body_size,
            discarded: 0,
        }
    }

    /// Total noise bytes dropped while hunting for frame boundaries.
    pub fn discarded_bytes(&self) -> u64 {
        self.discarded
    }

    fn discard(&mut self, src: &mut BytesMut, count: usize, reason: &'static str) {
        if count == 0 {
            return;
        }
        debug!(count, reason, "discarding bytes from receive buffer");
        src.advance(count);
        self.discarded += count as u64;
    }
}

impl Default for DaemonCodec {
    fn default() -> Self {
        Self::new()
    }
}

impl Decoder for DaemonCodec {
    type Item = DecodedFrame;
    type Error = TouchwireError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        loop {
            if src.len() < START_MARKER.len() {
                return Ok(None);
            }

            match find_start_marker(src) {
                None => {
                    // Keep a lone trailing byte that may be half of a split marker.
                    let keep = usize::from(src[src.len() - 1] == START_MARKER[0]);
                    let len = src.len();
                    self.discard(src, len - keep, "no start marker");
                    return Ok(None);
                }
                Some(offset) => self.discard(src, offset, "noise before start marker"),
            }

            let Some(header) = FrameHeader::peek(src) else {
                return Ok(None);
            };

            if header.body_length() as usize > self.max_body_size {
                warn!(
                    length = header.body_length(),
                    max = self.max_body_size,
                    "implausible frame length; resynchronizing"
                );
                self.discard(src, START_MARKER.len(), "oversized length prefix");
                continue;
            }

            let frame_length = header.frame_length();
            if src.len() < frame_length {
                trace!(have = src.len(), need = frame_length, "partial frame buffered");
                src.reserve(frame_length - src.len());
                return Ok(None);
            }

            if src[frame_length - END_MARKER.len()..frame_length] != END_MARKER {
                warn!(length = header.body_length(), "end marker mismatch; resynchronizing");
                self.discard(src, START_MARKER.len(), "missing end marker");
                continue;
            }

            let raw = src.split_to(frame_length);
            match decode_frame(&raw) {
                Some(frame) => {
                    trace!(?frame, "frame reassembled");
                    return Ok(Some(frame));
                }
                // Body shorter than opcode, sub-opcode and response mode.
                None => {
                    debug!(
                        length = header.body_length(),
                        "dropping frame with truncated body"
                    );
                    self.discarded += frame_length as u64;
                    continue;
                }
            }
        }
    }

    fn decode_eof(&mut self, buf: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        match self.decode(buf)? {
            Some(frame) => Ok(Some(frame)),
            None => {
                if !buf.is_empty() {
                    debug!(count = buf.len(), "dropping partial frame at end of stream");
                    let len = buf.len();
                    buf.advance(len);
                    self.discarded += len as u64;
                }
                Ok(None)
            }
        }
    }
}

impl Encoder<Packet> for DaemonCodec {
    type Error = TouchwireError;

    fn encode(&mut self, item: Packet, dst: &mut BytesMut) -> Result<(), Self::Error> {
        if item.body_length() > self.max_body_size {
            return Err(TouchwireError::PayloadTooLarge {
                size: item.body_length(),
                max: self.max_body_size,
            });
        }
        item.write_frame(dst);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::{Opcode, ResponseMode};
    use crate::packet::encode_frame;
    use futures::StreamExt;
    use tokio_util::codec::FramedRead;

    fn frame_bytes(opcode: u8, payload: &[u8]) -> Vec<u8> {
        encode_frame(opcode, 0, ResponseMode::AwaitReply, payload)
            .unwrap()
            .to_vec()
    }

    fn drain(codec: &mut DaemonCodec, buf: &mut BytesMut) -> Vec<DecodedFrame> {
        let mut out = Vec::new();
        while let Some(frame) = codec.decode(buf).unwrap() {
            out.push(frame);
        }
        out
    }

    #[test]
    fn whole_frame_decodes() {
        let mut codec = DaemonCodec::new();
        let mut buf = BytesMut::from(&frame_bytes(0xA0, &[])[..]);
        let frames = drain(&mut codec, &mut buf);
        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0].opcode, 0xA0);
        assert!(buf.is_empty());
    }

    #[test]
    fn one_byte_at_a_time_matches_whole_delivery() {
        let bytes = frame_bytes(0xC1, &[0x10, 0x20, 0x30, 0xAA, 0x55, 0x40]);
        let whole = drain(&mut DaemonCodec::new(), &mut BytesMut::from(&bytes[..]));

        let mut codec = DaemonCodec::new();
        let mut buf = BytesMut::new();
        let mut frames = Vec::new();
        for byte in &bytes {
            buf.extend_from_slice(&[*byte]);
            frames.extend(drain(&mut codec, &mut buf));
        }

        assert_eq!(frames, whole);
        assert_eq!(codec.discarded_bytes(), 0);
    }

    #[test]
    fn arbitrary_chunk_sizes() {
        let bytes = frame_bytes(0xB2, &[7u8; 13]);
        for chunk in 1..bytes.len() {
            let mut codec = DaemonCodec::new();
            let mut buf = BytesMut::new();
            let mut frames = Vec::new();
            for piece in bytes.chunks(chunk) {
                buf.extend_from_slice(piece);
                frames.extend(drain(&mut codec, &mut buf));
            }
            assert_eq!(frames.len(), 1, "chunk size {chunk}");
            assert_eq!(&frames[0].payload[..], &[7u8; 13]);
        }
    }

    #[test]
    fn several_frames_in_one_read() {
        let mut bytes = frame_bytes(0xB1, &[1; 8]);
        bytes.extend(frame_bytes(0xB2, &[2; 13]));
        bytes.extend(frame_bytes(0xB3, &[3; 9]));

        let frames = drain(&mut DaemonCodec::new(), &mut BytesMut::from(&bytes[..]));
        let opcodes: Vec<u8> = frames.iter().map(|f| f.opcode).collect();
        assert_eq!(opcodes, vec![0xB1, 0xB2, 0xB3]);
    }

    #[test]
    fn garbage_before_frame_is_discarded() {
        let mut bytes = vec![0x00, 0x13, 0x55, 0xAA, 0x37, 0xAA];
        bytes.extend(frame_bytes(0xA0, &[]));

        let mut codec = DaemonCodec::new();
        let frames = drain(&mut codec, &mut BytesMut::from(&bytes[..]));
        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0].opcode, 0xA0);
        assert_eq!(codec.discarded_bytes(), 6);
    }

    #[test]
    fn noise_without_marker_is_dropped_but_split_marker_survives() {
        let mut codec = DaemonCodec::new();
        let mut buf = BytesMut::from(&[0x01, 0x02, 0x03, 0xAA][..]);
        assert!(codec.decode(&mut buf).unwrap().is_none());
        assert_eq!(&buf[..], &[0xAA]);

        let frame = frame_bytes(0xA0, &[]);
        buf.extend_from_slice(&frame[1..]);
        let frames = drain(&mut codec, &mut buf);
        assert_eq!(frames.len(), 1);
    }

    #[test]
    fn truncated_frame_waits_for_rest() {
        let bytes = frame_bytes(0xC1, &[9u8; 64]);
        let mut codec = DaemonCodec::new();
        let mut buf = BytesMut::from(&bytes[..bytes.len() - 5]);
        assert!(codec.decode(&mut buf).unwrap().is_none());
        assert_eq!(buf.len(), bytes.len() - 5);

        buf.extend_from_slice(&bytes[bytes.len() - 5..]);
        assert!(codec.decode(&mut buf).unwrap().is_some());
    }

    #[test]
    fn false_marker_inside_noise_resyncs() {
        // A start marker followed by a length whose end marker never matches.
        let mut bytes = vec![0xAA, 0x55, 0x00, 0x00, 0x00, 0x01, 0xEE, 0x00, 0x00, 0x00, 0x00];
        bytes.extend(frame_bytes(0xB1, &[4; 8]));

        let frames = drain(&mut DaemonCodec::new(), &mut BytesMut::from(&bytes[..]));
        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0].opcode, 0xB1);
    }

    #[test]
    fn oversized_length_resyncs() {
        let mut bytes = vec![0xAA, 0x55, 0xFF, 0xFF, 0xFF, 0xFF];
        bytes.extend(frame_bytes(0xA0, &[]));

        let frames = drain(
            &mut DaemonCodec::with_max_body_size(1024),
            &mut BytesMut::from(&bytes[..]),
        );
        assert_eq!(frames.len(), 1);
    }

    #[test]
    fn frame_with_truncated_body_is_dropped_and_counted() {
        // Well-formed markers around a one-byte body.
        let mut bytes = vec![0xAA, 0x55, 0x00, 0x00, 0x00, 0x01, 0xEE, 0x12, 0x34, 0x55, 0xAA];
        bytes.extend(frame_bytes(0xA0, &[]));

        let mut codec = DaemonCodec::new();
        let frames = drain(&mut codec, &mut BytesMut::from(&bytes[..]));
        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0].opcode, 0xA0);
        assert_eq!(codec.discarded_bytes(), 11);
    }

    #[test]
    fn bad_checksum_is_yielded_flagged() {
        let mut bytes = frame_bytes(0xB1, &[0; 8]);
        bytes[9] ^= 0x01;
        let frames = drain(&mut DaemonCodec::new(), &mut BytesMut::from(&bytes[..]));
        assert_eq!(frames.len(), 1);
        assert!(!frames[0].checksum_valid);
    }

    #[test]
    fn encoder_writes_frame() {
        let packet = Packet::new_command(Opcode::Ping, 0, Vec::new()).unwrap();
        let mut dst = BytesMut::new();
        DaemonCodec::new().encode(packet.clone(), &mut dst).unwrap();
        assert_eq!(&dst[..], &packet.to_bytes()[..]);
    }

    #[tokio::test]
    async fn framed_reader_reassembles_chunked_stream() {
        let mut first = vec![0x00, 0x01];
        first.extend(frame_bytes(0x01, &[]));
        let second = frame_bytes(0xC1, &[5u8; 40]);

        let mock = tokio_test::io::Builder::new()
            .read(&first[..5])
            .read(&first[5..])
            .read(&second[..1])
            .read(&second[1..20])
            .read(&second[20..])
            .build();

        let mut reader = FramedRead::new(mock, DaemonCodec::new());
        let hello = reader.next().await.unwrap().unwrap();
        assert_eq!(hello.opcode, 0x01);
        let capture = reader.next().await.unwrap().unwrap();
        assert_eq!(capture.payload.len(), 40);
        assert!(reader.next().await.is_none());
    }

    #[tokio::test]
    async fn partial_frame_at_eof_is_dropped() {
        let bytes = frame_bytes(0xA0, &[]);
        let mock = tokio_test::io::Builder::new().read(&bytes[..7]).build();
        let mut reader = FramedRead::new(mock, DaemonCodec::new());
        assert!(reader.next().await.is_none());
    }
}
