//! touchwire CLI client: entry point.
//!
//! ```text
//! touchwire ping                        Check the daemon is reachable
//! touchwire tap 100 200                 Tap a point
//! touchwire capture --out screen.png    Save a screenshot
//! touchwire --config <path> ...         Use custom config TOML
//! touchwire --gen-config                Dump default config and exit
//! ```

use std::sync::Arc;

use clap::{CommandFactory, Parser};
use tracing::info;
use tracing_subscriber::EnvFilter;

use touchwire_cli::cli::Cli;
use touchwire_cli::commands;
use touchwire_cli::config::CliConfig;
use touchwire_core::{DaemonConnection, RemoteDevice};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    if cli.gen_config {
        println!("{}", CliConfig::default_toml()?);
        return Ok(());
    }

    let Some(command) = cli.command else {
        Cli::command().print_help()?;
        return Ok(());
    };

    let mut config = CliConfig::load(&cli.config);
    if let Some(host) = cli.host {
        config.connection.host = host;
    }
    if let Some(port) = cli.port {
        config.connection.port = port;
    }
    if let Some(monitor) = cli.monitor {
        config.device.monitor = monitor;
    }

    // Init tracing.
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.logging.level));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    info!("touchwire v{}", env!("CARGO_PKG_VERSION"));

    let connection = Arc::new(DaemonConnection::new(config.connection));
    connection.connect_default().await?;

    let device = RemoteDevice::new(Arc::clone(&connection), config.device);
    let outcome = commands::run(&device, command).await;
    connection.disconnect().await;

    println!("{}", outcome?);
    Ok(())
}
