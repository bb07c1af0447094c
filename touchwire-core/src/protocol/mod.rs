//! Fixed-layout command payloads.
//!
//! Each sub-module defines the payload structs for one command family.
//! Payloads are plain big-endian byte layouts (no self-describing
//! serialization) and are carried inside [`Packet`] bodies.
//!
//! [`Packet`]: crate::packet::Packet

pub mod capture;
pub mod input;

pub use capture::CaptureRegion;
pub use input::{DragGesture, RepeatTouch, TouchEvent};
