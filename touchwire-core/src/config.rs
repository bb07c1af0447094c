//! Connection and device settings.
//!
//! Both structs deserialize with `#[serde(default)]`, so a partial TOML
//! table only overrides the keys it names.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// How to reach the daemon and how long to wait for it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ConnectionConfig {
    /// Daemon host name or IP address.
    pub host: String,
    /// Daemon TCP port.
    pub port: u16,
    /// TCP connect deadline in milliseconds.
    pub connect_timeout_ms: u64,
    /// Deadline for the daemon's first frame after the socket opens.
    pub handshake_timeout_ms: u64,
    /// Reply deadline for interactive commands.
    pub reply_timeout_ms: u64,
    /// Reply deadline for capture commands.
    pub capture_timeout_ms: u64,
    /// Capacity of the connection event channel.
    pub event_capacity: usize,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".into(),
            port: 20_000,
            connect_timeout_ms: 5_000,
            handshake_timeout_ms: 5_000,
            reply_timeout_ms: 5_000,
            capture_timeout_ms: 30_000,
            event_capacity: 16,
        }
    }
}

impl ConnectionConfig {
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }

    pub fn handshake_timeout(&self) -> Duration {
        Duration::from_millis(self.handshake_timeout_ms)
    }

    pub fn reply_timeout(&self) -> Duration {
        Duration::from_millis(self.reply_timeout_ms)
    }

    pub fn capture_timeout(&self) -> Duration {
        Duration::from_millis(self.capture_timeout_ms)
    }
}

/// What the remote screen looks like and how input is sent to it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct DeviceConfig {
    /// Display that commands target.
    pub monitor: u8,
    /// Screen width in pixels.
    pub screen_width: u16,
    /// Screen height in pixels.
    pub screen_height: u16,
    /// Pause between press and release of a tap.
    pub tap_delay_ms: u64,
    /// Send input commands with `AwaitReply` and wait for the daemon's ack.
    pub acknowledge_input: bool,
}

impl Default for DeviceConfig {
    fn default() -> Self {
        Self {
            monitor: 0,
            screen_width: 1920,
            screen_height: 720,
            tap_delay_ms: 50,
            acknowledge_input: true,
        }
    }
}

impl DeviceConfig {
    /// Centre of the screen, the anchor of scroll gestures.
    pub fn center(&self) -> (u16, u16) {
        (self.screen_width / 2, self.screen_height / 2)
    }

    pub fn tap_delay(&self) -> Duration {
        Duration::from_millis(self.tap_delay_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let conn = ConnectionConfig::default();
        assert_eq!(conn.reply_timeout(), Duration::from_secs(5));
        assert!(conn.capture_timeout() > conn.reply_timeout());

        let device = DeviceConfig::default();
        assert_eq!(device.center(), (960, 360));
        assert!(device.acknowledge_input);
    }

    #[test]
    fn partial_table_keeps_defaults() {
        let device: DeviceConfig =
            serde_json::from_str(r#"{ "screen_width": 1280, "monitor": 1 }"#).unwrap();
        assert_eq!(device.screen_width, 1280);
        assert_eq!(device.monitor, 1);
        assert_eq!(device.screen_height, 720);
    }
}
