// src/main.rs
//! Location Tracker - live device location with start/stop controls

use clap::Parser;
use location_tracker::{
    cli::Cli, config::TrackerConfig, display, provider, LocationTracker, Result,
};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

fn main() -> Result<()> {
    // Logs go to stderr and default to warnings so the terminal view stays readable
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_writer(std::io::stderr),
        )
        .init();

    let cli = Cli::parse();

    if cli.list_ports {
        let ports = provider::list_serial_ports()?;
        if ports.is_empty() {
            println!("No serial ports found.");
        } else {
            println!("Available serial ports:");
            for port in ports {
                println!("  {}", port);
            }
        }
        return Ok(());
    }

    let mut config = TrackerConfig::load().unwrap_or_else(|e| {
        warn!("Using default configuration: {}", e);
        TrackerConfig::default()
    });
    cli.apply(&mut config);

    if cli.save_config {
        config.save()?;
        info!("Configuration saved");
    }

    info!("Using {} source", config.source);
    let tracker = LocationTracker::new(config.build_provider());
    let runtime = tokio::runtime::Runtime::new()?;

    if cli.gui {
        if !display::should_use_gui() {
            return Err(anyhow::anyhow!(
                "GUI not available: build with --features gui and run under X11 or Wayland"
            )
            .into());
        }
        let _guard = runtime.enter();
        run_gui(tracker)
    } else {
        runtime.block_on(display::TerminalDisplay::new().run(tracker))
    }
}

#[cfg(all(unix, not(target_os = "macos"), feature = "gui"))]
fn run_gui(tracker: LocationTracker<Box<dyn location_tracker::LocationProvider>>) -> Result<()> {
    display::gui::run(tracker)
}

#[cfg(not(all(unix, not(target_os = "macos"), feature = "gui")))]
fn run_gui(_tracker: LocationTracker<Box<dyn location_tracker::LocationProvider>>) -> Result<()> {
    Err(anyhow::anyhow!("GUI support not compiled in").into())
}
