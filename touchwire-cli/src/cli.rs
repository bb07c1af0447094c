//! Command-line surface.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use touchwire_core::{CaptureRegion, ImageFormat, ScrollDirection};

#[derive(Parser, Debug)]
#[command(name = "touchwire", version, about = "Remote touch-screen daemon client")]
pub struct Cli {
    /// Path to configuration TOML file.
    #[arg(short, long, default_value = "touchwire.toml")]
    pub config: PathBuf,

    /// Daemon host (overrides config).
    #[arg(long)]
    pub host: Option<String>,

    /// Daemon port (overrides config).
    #[arg(short, long)]
    pub port: Option<u16>,

    /// Target display (overrides config).
    #[arg(short, long)]
    pub monitor: Option<u8>,

    /// Print the default configuration to stdout and exit.
    #[arg(long)]
    pub gen_config: bool,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Measure the daemon round-trip time.
    Ping,
    /// Tap a point.
    Tap { x: u16, y: u16 },
    /// Press and hold a point.
    LongPress {
        x: u16,
        y: u16,
        #[arg(long, default_value_t = 800)]
        hold_ms: u64,
    },
    /// Drag from one point to another.
    Swipe {
        x1: u16,
        y1: u16,
        x2: u16,
        y2: u16,
        #[arg(long, default_value_t = 300)]
        duration_ms: u32,
    },
    /// Scroll through the screen centre (up, down, left, right).
    Scroll {
        direction: ScrollDirection,
        #[arg(long, default_value_t = 400)]
        distance: u16,
        #[arg(long, default_value_t = 300)]
        duration_ms: u32,
    },
    /// Let the device tap a point repeatedly.
    FastTouch {
        x: u16,
        y: u16,
        #[arg(long, default_value_t = 10)]
        repeat: u16,
        #[arg(long, default_value_t = 50)]
        delay_ms: u16,
    },
    /// Capture the screen, or a region of it, to a file.
    Capture {
        /// Region as `left,top,right,bottom`; whole screen when omitted.
        #[arg(long)]
        region: Option<CaptureRegion>,
        /// png, jpeg or bmp.
        #[arg(long, default_value = "png")]
        format: ImageFormat,
        #[arg(long)]
        out: PathBuf,
    },
}
