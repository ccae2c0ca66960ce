//! Manul frame for Raspberry Pi + Waveshare 7.5" V2
//!
//! Runs one refresh cycle and exits; schedule it with cron or a systemd
//! timer.

use clap::Parser;
use manul_frame::config::{Config, DEFAULT_CONFIG_PATH};
use manul_frame::display::FrameSink;
use manul_frame::refresh::{DashboardRefresher, Refresher};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Command line arguments
#[derive(Parser, Debug)]
#[command(name = "manul-frame")]
#[command(about = "Map and photo frame for a 7.5\" e-paper display")]
#[command(version)]
struct Args {
    /// Configuration file path
    #[arg(short, long, default_value = DEFAULT_CONFIG_PATH)]
    config: String,

    /// Save the frame as PNG instead of driving the panel
    #[arg(long)]
    test_mode: bool,

    /// Ignore the map cache and fetch a fresh map
    #[arg(long)]
    refresh_map: bool,

    /// Show a new photo next to the cached map
    #[arg(long, conflicts_with_all = ["refresh_map", "dashboard"])]
    rotate_photo: bool,

    /// Render the clock, reminders and weather dashboard
    #[arg(long, conflicts_with = "refresh_map")]
    dashboard: bool,

    /// Clear display and exit
    #[arg(long)]
    clear: bool,

    /// Output path for test mode (overrides config)
    #[arg(short, long)]
    output: Option<String>,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    init_logging(args.verbose);

    tracing::info!("Starting manul frame");

    let mut config = Config::load(&args.config).unwrap_or_else(|e| {
        tracing::warn!("Failed to load config from {}: {}", args.config, e);
        tracing::info!("Using default configuration");
        Config::default()
    });
    if let Some(output) = args.output {
        config.output_path = output.into();
    }

    let mut sink = if args.test_mode {
        FrameSink::File(config.output_path.clone())
    } else {
        FrameSink::panel_or_file(config.output_path.clone())
    };

    if args.clear {
        tracing::info!("Clearing display...");
        sink.clear()?;
        sink.sleep()?;
        tracing::info!("Display cleared");
        return Ok(());
    }

    if args.dashboard {
        DashboardRefresher::from_config(&config, sink).refresh().await?;
    } else {
        let mut refresher = Refresher::from_config(&config, sink)?;
        if args.rotate_photo {
            refresher.rotate_photo().await?;
        } else {
            refresher.refresh(args.refresh_map).await?;
        }
    }

    tracing::info!("Done");
    Ok(())
}

/// Initialize tracing/logging
///
/// Default level is "warn" to minimize SD card wear from log writes.
/// Use --verbose flag for "debug" level during development/troubleshooting.
fn init_logging(verbose: bool) {
    let level = if verbose { "debug" } else { "warn" };

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| format!("manul_frame={}", level).into());

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .init();
}
