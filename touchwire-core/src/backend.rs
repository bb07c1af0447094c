//! Backend boundary.
//!
//! A [`ControlBackend`] is anything that can drive a remote touch screen.
//! Callers that must choose between backends compare their
//! [`BackendCapabilities`] against what they need.

use async_trait::async_trait;
use bytes::Bytes;

use crate::error::Result;
use crate::flags::BackendCapabilities;
use crate::message::{ImageFormat, ScrollDirection};
use crate::protocol::CaptureRegion;

#[async_trait]
pub trait ControlBackend: Send + Sync {
    /// Short identifier used in logs.
    fn name(&self) -> &str;

    fn capabilities(&self) -> BackendCapabilities;

    async fn tap(&self, x: u16, y: u16) -> Result<()>;

    async fn swipe(&self, x1: u16, y1: u16, x2: u16, y2: u16, duration_ms: u32) -> Result<()>;

    async fn scroll(&self, direction: ScrollDirection, distance: u16, duration_ms: u32)
    -> Result<()>;

    /// Capture `region` and return the encoded image.
    async fn capture(&self, region: CaptureRegion, format: ImageFormat) -> Result<Bytes>;
}

/// First backend whose capabilities contain `needed`.
pub fn select_backend<'a>(
    backends: &'a [Box<dyn ControlBackend>],
    needed: BackendCapabilities,
) -> Option<&'a dyn ControlBackend> {
    backends
        .iter()
        .map(|b| b.as_ref())
        .find(|b| b.capabilities().contains(needed))
}
