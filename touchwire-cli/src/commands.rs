//! Runs one CLI command against a connected device.

use std::time::Duration;

use tracing::info;
use touchwire_core::{RemoteDevice, Result};

use crate::cli::Command;

/// Execute `command` and return the line to print on success.
pub async fn run(device: &RemoteDevice, command: Command) -> Result<String> {
    match command {
        Command::Ping => {
            let rtt = device.ping().await?;
            Ok(format!("pong in {:.1} ms", rtt.as_secs_f64() * 1000.0))
        }
        Command::Tap { x, y } => {
            device.tap(x, y).await?;
            Ok(format!("tapped ({x}, {y})"))
        }
        Command::LongPress { x, y, hold_ms } => {
            device.long_press(x, y, Duration::from_millis(hold_ms)).await?;
            Ok(format!("held ({x}, {y}) for {hold_ms} ms"))
        }
        Command::Swipe {
            x1,
            y1,
            x2,
            y2,
            duration_ms,
        } => {
            device.swipe(x1, y1, x2, y2, duration_ms).await?;
            Ok(format!("swiped ({x1}, {y1}) -> ({x2}, {y2})"))
        }
        Command::Scroll {
            direction,
            distance,
            duration_ms,
        } => {
            device.scroll(direction, distance, duration_ms).await?;
            Ok(format!("scrolled {direction:?} by {distance} px"))
        }
        Command::FastTouch {
            x,
            y,
            repeat,
            delay_ms,
        } => {
            device.fast_touch(x, y, repeat, delay_ms).await?;
            Ok(format!("tapped ({x}, {y}) x{repeat}"))
        }
        Command::Capture {
            region,
            format,
            out,
        } => {
            let image = match region {
                Some(region) => device.capture(region, format).await?,
                None => device.capture_screen(format).await?,
            };
            tokio::fs::write(&out, &image).await?;
            info!(path = %out.display(), bytes = image.len(), "capture saved");
            Ok(format!("wrote {} bytes to {}", image.len(), out.display()))
        }
    }
}
