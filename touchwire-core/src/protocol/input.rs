//! Touch input payloads.
//!
//! # Wire Layouts (big-endian)
//!
//! ## Touch (8 bytes)
//! ```text
//! finger_count:1  finger_index:1  x:2  y:2  action:1  monitor:1
//! ```
//!
//! ## Drag (13 bytes)
//! ```text
//! start_x:2  start_y:2  end_x:2  end_y:2  monitor:1  duration_ms:4
//! ```
//!
//! ## Repeat touch (9 bytes)
//! ```text
//! x:2  y:2  repeat:2  delay_ms:2  monitor:1
//! ```

use crate::error::Result;
use crate::message::{Opcode, TouchPhase};
use crate::packet::Packet;

// ── Touch ─────────────────────────────────────────────────────────

/// One touch contact changing phase at a point.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TouchEvent {
    pub finger_count: u8,
    pub finger_index: u8,
    pub x: u16,
    pub y: u16,
    pub phase: TouchPhase,
    pub monitor: u8,
}

impl TouchEvent {
    pub const SIZE: usize = 8;

    /// Single-finger touch on `monitor`.
    pub fn single(x: u16, y: u16, phase: TouchPhase, monitor: u8) -> Self {
        Self {
            finger_count: 1,
            finger_index: 0,
            x,
            y,
            phase,
            monitor,
        }
    }

    pub fn to_bytes(&self) -> [u8; Self::SIZE] {
        let mut buf = [0u8; Self::SIZE];
        buf[0] = self.finger_count;
        buf[1] = self.finger_index;
        buf[2..4].copy_from_slice(&self.x.to_be_bytes());
        buf[4..6].copy_from_slice(&self.y.to_be_bytes());
        buf[6] = self.phase as u8;
        buf[7] = self.monitor;
        buf
    }

    pub fn into_packet(self) -> Result<Packet> {
        Packet::new_command(Opcode::Touch, 0, self.to_bytes().to_vec())
    }
}

// ── Drag ──────────────────────────────────────────────────────────

/// Straight-line press-move-release performed by the daemon.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DragGesture {
    pub start_x: u16,
    pub start_y: u16,
    pub end_x: u16,
    pub end_y: u16,
    pub monitor: u8,
    pub duration_ms: u32,
}

impl DragGesture {
    pub const SIZE: usize = 13;

    pub fn new(start: (u16, u16), end: (u16, u16), duration_ms: u32, monitor: u8) -> Self {
        Self {
            start_x: start.0,
            start_y: start.1,
            end_x: end.0,
            end_y: end.1,
            monitor,
            duration_ms,
        }
    }

    pub fn to_bytes(&self) -> [u8; Self::SIZE] {
        let mut buf = [0u8; Self::SIZE];
        buf[0..2].copy_from_slice(&self.start_x.to_be_bytes());
        buf[2..4].copy_from_slice(&self.start_y.to_be_bytes());
        buf[4..6].copy_from_slice(&self.end_x.to_be_bytes());
        buf[6..8].copy_from_slice(&self.end_y.to_be_bytes());
        buf[8] = self.monitor;
        buf[9..13].copy_from_slice(&self.duration_ms.to_be_bytes());
        buf
    }

    pub fn into_packet(self) -> Result<Packet> {
        Packet::new_command(Opcode::Drag, 0, self.to_bytes().to_vec())
    }
}

// ── Repeat touch ──────────────────────────────────────────────────

/// `repeat` taps at one point, `delay_ms` apart, paced on the device.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RepeatTouch {
    pub x: u16,
    pub y: u16,
    pub repeat: u16,
    pub delay_ms: u16,
    pub monitor: u8,
}

impl RepeatTouch {
    pub const SIZE: usize = 9;

    pub fn new(x: u16, y: u16, repeat: u16, delay_ms: u16, monitor: u8) -> Self {
        Self {
            x,
            y,
            repeat,
            delay_ms,
            monitor,
        }
    }

    pub fn to_bytes(&self) -> [u8; Self::SIZE] {
        let mut buf = [0u8; Self::SIZE];
        buf[0..2].copy_from_slice(&self.x.to_be_bytes());
        buf[2..4].copy_from_slice(&self.y.to_be_bytes());
        buf[4..6].copy_from_slice(&self.repeat.to_be_bytes());
        buf[6..8].copy_from_slice(&self.delay_ms.to_be_bytes());
        buf[8] = self.monitor;
        buf
    }

    pub fn into_packet(self) -> Result<Packet> {
        Packet::new_command(Opcode::RepeatTouch, 0, self.to_bytes().to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn touch_layout() {
        let touch = TouchEvent::single(960, 360, TouchPhase::Release, 2);
        assert_eq!(
            touch.to_bytes(),
            [0x01, 0x00, 0x03, 0xC0, 0x01, 0x68, 0x01, 0x02]
        );
    }

    #[test]
    fn drag_layout() {
        let drag = DragGesture::new((100, 200), (300, 400), 0x0001_86A0, 1);
        assert_eq!(
            drag.to_bytes(),
            [
                0x00, 0x64, 0x00, 0xC8, 0x01, 0x2C, 0x01, 0x90, 0x01, 0x00, 0x01, 0x86, 0xA0
            ]
        );
    }

    #[test]
    fn repeat_touch_layout() {
        let rt = RepeatTouch::new(0x0102, 0x0304, 10, 250, 0);
        assert_eq!(
            rt.to_bytes(),
            [0x01, 0x02, 0x03, 0x04, 0x00, 0x0A, 0x00, 0xFA, 0x00]
        );
    }

    #[test]
    fn packets_carry_matching_opcodes() {
        let touch = TouchEvent::single(1, 1, TouchPhase::Press, 0).into_packet().unwrap();
        assert_eq!(touch.opcode(), Opcode::Touch as u8);
        assert_eq!(touch.payload().len(), TouchEvent::SIZE);

        let drag = DragGesture::new((0, 0), (1, 1), 300, 0).into_packet().unwrap();
        assert_eq!(drag.opcode(), Opcode::Drag as u8);

        let rt = RepeatTouch::new(1, 1, 2, 3, 0).into_packet().unwrap();
        assert_eq!(rt.opcode(), Opcode::RepeatTouch as u8);
    }
}
