//! Screen capture payload.
//!
//! ```text
//! Client ──[Capture, sub = ImageFormat]────► Daemon
//!   Payload: left:2 top:2 right:2 bottom:2 monitor:1
//!
//! Daemon ──[Capture, sub = status]─────────► Client
//!   Payload: encoded image bytes
//! ```

use crate::error::{Result, TouchwireError};
use crate::message::{ImageFormat, Opcode};
use crate::packet::Packet;

/// A rectangular region of one monitor, right/bottom exclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CaptureRegion {
    pub left: u16,
    pub top: u16,
    pub right: u16,
    pub bottom: u16,
    pub monitor: u8,
}

impl CaptureRegion {
    pub const SIZE: usize = 9;

    pub fn new(left: u16, top: u16, right: u16, bottom: u16, monitor: u8) -> Self {
        Self {
            left,
            top,
            right,
            bottom,
            monitor,
        }
    }

    /// The whole `width` × `height` screen.
    pub fn full_screen(width: u16, height: u16, monitor: u8) -> Self {
        Self::new(0, 0, width, height, monitor)
    }

    /// Same region on another monitor.
    pub fn on_monitor(mut self, monitor: u8) -> Self {
        self.monitor = monitor;
        self
    }

    pub fn width(&self) -> u16 {
        self.right.saturating_sub(self.left)
    }

    pub fn height(&self) -> u16 {
        self.bottom.saturating_sub(self.top)
    }

    /// Reject empty or inverted rectangles.
    pub fn validate(&self) -> Result<()> {
        if self.right <= self.left || self.bottom <= self.top {
            return Err(TouchwireError::InvalidRegion(format!(
                "({}, {})-({}, {}) is empty",
                self.left, self.top, self.right, self.bottom
            )));
        }
        Ok(())
    }

    pub fn to_bytes(&self) -> [u8; Self::SIZE] {
        let mut buf = [0u8; Self::SIZE];
        buf[0..2].copy_from_slice(&self.left.to_be_bytes());
        buf[2..4].copy_from_slice(&self.top.to_be_bytes());
        buf[4..6].copy_from_slice(&self.right.to_be_bytes());
        buf[6..8].copy_from_slice(&self.bottom.to_be_bytes());
        buf[8] = self.monitor;
        buf
    }

    /// Validate and build the capture command for `format`.
    pub fn into_packet(self, format: ImageFormat) -> Result<Packet> {
        self.validate()?;
        Packet::new_command(Opcode::Capture, format as u8, self.to_bytes().to_vec())
    }
}

impl std::str::FromStr for CaptureRegion {
    type Err = TouchwireError;

    /// Parse `left,top,right,bottom` on monitor 0.
    fn from_str(s: &str) -> Result<Self> {
        let parts: Vec<&str> = s.split(',').map(str::trim).collect();
        let invalid = || TouchwireError::InvalidRegion(s.to_string());
        if parts.len() != 4 {
            return Err(invalid());
        }
        let mut values = [0u16; 4];
        for (slot, part) in values.iter_mut().zip(&parts) {
            *slot = part.parse().map_err(|_| invalid())?;
        }
        let region = Self::new(values[0], values[1], values[2], values[3], 0);
        region.validate()?;
        Ok(region)
    }
}
