//! High-level actions on a remote touch screen.
//!
//! [`RemoteDevice`] turns gestures (tap, swipe, scroll, capture) into
//! daemon commands and sends them over a shared [`DaemonConnection`].

use std::sync::Arc;
use std::sync::atomic::{AtomicU8, Ordering};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use bytes::Bytes;
use tracing::{debug, info};

use crate::backend::ControlBackend;
use crate::config::DeviceConfig;
use crate::error::{Result, TouchwireError};
use crate::flags::BackendCapabilities;
use crate::message::{ImageFormat, Opcode, ScrollDirection, TouchPhase};
use crate::network::DaemonConnection;
use crate::packet::Packet;
use crate::protocol::{CaptureRegion, DragGesture, RepeatTouch, TouchEvent};

/// Start and end points of a `distance`-pixel scroll through `center`.
///
/// Coordinates saturate at 0 and `u16::MAX`.
pub fn scroll_path(
    direction: ScrollDirection,
    distance: u16,
    center: (u16, u16),
) -> ((u16, u16), (u16, u16)) {
    let (cx, cy) = center;
    let half = distance / 2;
    let rest = distance - half;
    match direction {
        ScrollDirection::Down => ((cx, cy.saturating_sub(half)), (cx, cy.saturating_add(rest))),
        ScrollDirection::Up => ((cx, cy.saturating_add(rest)), (cx, cy.saturating_sub(half))),
        ScrollDirection::Right => ((cx.saturating_sub(half), cy), (cx.saturating_add(rest), cy)),
        ScrollDirection::Left => ((cx.saturating_add(rest), cy), (cx.saturating_sub(half), cy)),
    }
}

pub struct RemoteDevice {
    connection: Arc<DaemonConnection>,
    config: DeviceConfig,
    monitor: AtomicU8,
}

impl RemoteDevice {
    pub fn new(connection: Arc<DaemonConnection>, config: DeviceConfig) -> Self {
        let monitor = AtomicU8::new(config.monitor);
        Self {
            connection,
            config,
            monitor,
        }
    }

    pub fn connection(&self) -> &Arc<DaemonConnection> {
        &self.connection
    }

    pub fn config(&self) -> &DeviceConfig {
        &self.config
    }

    /// Display targeted by subsequent commands.
    pub fn monitor(&self) -> u8 {
        self.monitor.load(Ordering::Relaxed)
    }

    pub fn set_monitor(&self, monitor: u8) {
        debug!(monitor, "target display changed");
        self.monitor.store(monitor, Ordering::Relaxed);
    }

    /// Send an input command, acknowledged or not depending on the
    /// configuration.
    async fn send_input(&self, packet: Packet) -> Result<()> {
        if self.config.acknowledge_input {
            self.connection.request_default(packet).await?;
            Ok(())
        } else {
            self.connection.send(packet).await
        }
    }

    /// One touch event at (`x`, `y`).
    pub async fn touch(&self, x: u16, y: u16, phase: TouchPhase) -> Result<()> {
        let packet = TouchEvent::single(x, y, phase, self.monitor()).into_packet()?;
        self.send_input(packet).await
    }

    /// Press, wait the configured tap delay, release.
    pub async fn tap(&self, x: u16, y: u16) -> Result<()> {
        self.long_press(x, y, self.config.tap_delay()).await
    }

    /// Press, wait `hold`, release.
    ///
    /// If the press fails after reaching the wire, a release is still sent
    /// so no contact is left down; the press error is returned.
    pub async fn long_press(&self, x: u16, y: u16, hold: Duration) -> Result<()> {
        if let Err(error) = self.touch(x, y, TouchPhase::Press).await {
            if !matches!(error, TouchwireError::InvalidState(_)) && !error.is_caller_misuse() {
                if let Err(release_error) = self.touch(x, y, TouchPhase::Release).await {
                    debug!(%release_error, "release after failed press also failed");
                }
            }
            return Err(error);
        }
        tokio::time::sleep(hold).await;
        self.touch(x, y, TouchPhase::Release).await
    }

    /// Drag from (`x1`, `y1`) to (`x2`, `y2`) over `duration_ms`.
    pub async fn swipe(&self, x1: u16, y1: u16, x2: u16, y2: u16, duration_ms: u32) -> Result<()> {
        let packet = DragGesture::new((x1, y1), (x2, y2), duration_ms, self.monitor()).into_packet()?;
        self.send_input(packet).await
    }

    pub async fn drag(&self, x1: u16, y1: u16, x2: u16, y2: u16, duration_ms: u32) -> Result<()> {
        self.swipe(x1, y1, x2, y2, duration_ms).await
    }

    /// Swipe `distance` pixels through the screen centre.
    pub async fn scroll(
        &self,
        direction: ScrollDirection,
        distance: u16,
        duration_ms: u32,
    ) -> Result<()> {
        let ((x1, y1), (x2, y2)) = scroll_path(direction, distance, self.config.center());
        self.swipe(x1, y1, x2, y2, duration_ms).await
    }

    /// Let the device tap (`x`, `y`) `repeat` times, `delay_ms` apart.
    pub async fn fast_touch(&self, x: u16, y: u16, repeat: u16, delay_ms: u16) -> Result<()> {
        let packet = RepeatTouch::new(x, y, repeat, delay_ms, self.monitor()).into_packet()?;
        self.send_input(packet).await
    }

    /// Capture `region` and return the encoded image bytes.
    ///
    /// The region's monitor field is replaced by the current target display.
    pub async fn capture(&self, region: CaptureRegion, format: ImageFormat) -> Result<Bytes> {
        let packet = region.on_monitor(self.monitor()).into_packet(format)?;
        let reply = self
            .connection
            .request(packet, self.connection.config().capture_timeout())
            .await?;
        info!(bytes = reply.payload.len(), %format, "capture received");
        Ok(reply.payload)
    }

    /// Capture the whole configured screen.
    pub async fn capture_screen(&self, format: ImageFormat) -> Result<Bytes> {
        let region = CaptureRegion::full_screen(
            self.config.screen_width,
            self.config.screen_height,
            self.monitor(),
        );
        self.capture(region, format).await
    }

    /// Round-trip time of one ping.
    pub async fn ping(&self) -> Result<Duration> {
        let packet = Packet::new_command(Opcode::Ping, 0, Bytes::new())?;
        let started = Instant::now();
        self.connection.request_default(packet).await?;
        let rtt = started.elapsed();
        debug!(?rtt, "ping");
        Ok(rtt)
    }
}

#[async_trait]
impl ControlBackend for RemoteDevice {
    fn name(&self) -> &str {
        "daemon"
    }

    fn capabilities(&self) -> BackendCapabilities {
        BackendCapabilities::all()
    }

    async fn tap(&self, x: u16, y: u16) -> Result<()> {
        RemoteDevice::tap(self, x, y).await
    }

    async fn swipe(&self, x1: u16, y1: u16, x2: u16, y2: u16, duration_ms: u32) -> Result<()> {
        RemoteDevice::swipe(self, x1, y1, x2, y2, duration_ms).await
    }

    async fn scroll(&self, direction: ScrollDirection, distance: u16, duration_ms: u32)
    -> Result<()> {
        RemoteDevice::scroll(self, direction, distance, duration_ms).await
    }

    async fn capture(&self, region: CaptureRegion, format: ImageFormat) -> Result<Bytes> {
        RemoteDevice::capture(self, region, format).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ConnectionConfig;

    const CENTER: (u16, u16) = (960, 360);

    #[test]
    fn scroll_down_400() {
        assert_eq!(
            scroll_path(ScrollDirection::Down, 400, CENTER),
            ((960, 160), (960, 560))
        );
    }

    #[test]
    fn scroll_up_is_reversed_down() {
        let (a, b) = scroll_path(ScrollDirection::Down, 300, CENTER);
        assert_eq!(scroll_path(ScrollDirection::Up, 300, CENTER), (b, a));
    }

    #[test]
    fn scroll_horizontal() {
        assert_eq!(
            scroll_path(ScrollDirection::Right, 200, CENTER),
            ((860, 360), (1060, 360))
        );
        assert_eq!(
            scroll_path(ScrollDirection::Left, 200, CENTER),
            ((1060, 360), (860, 360))
        );
    }

    #[test]
    fn scroll_saturates_at_zero() {
        let ((_, y1), (_, y2)) = scroll_path(ScrollDirection::Down, 1000, (50, 100));
        assert_eq!(y1, 0);
        assert_eq!(y2, 600);
    }

    fn offline_device() -> RemoteDevice {
        RemoteDevice::new(
            Arc::new(DaemonConnection::new(ConnectionConfig::default())),
            DeviceConfig::default(),
        )
    }

    #[tokio::test]
    async fn commands_need_a_connection() {
        let device = offline_device();
        let err = device.tap(10, 10).await.unwrap_err();
        assert!(matches!(err, TouchwireError::InvalidState(_)));
        assert!(matches!(device.ping().await, Err(TouchwireError::InvalidState(_))));
    }

    #[tokio::test]
    async fn empty_region_rejected_before_sending() {
        let device = offline_device();
        let err = device
            .capture(CaptureRegion::new(100, 100, 100, 200, 0), ImageFormat::Png)
            .await
            .unwrap_err();
        assert!(matches!(err, TouchwireError::InvalidRegion(_)));
    }

    #[test]
    fn monitor_selection() {
        let device = offline_device();
        assert_eq!(device.monitor(), 0);
        device.set_monitor(2);
        assert_eq!(device.monitor(), 2);
        assert_eq!(device.capabilities(), BackendCapabilities::all());
    }
}
