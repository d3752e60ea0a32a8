// src/cli.rs
//! Command line options

use crate::config::{SourceKind, TrackerConfig};
use clap::Parser;

#[derive(Debug, Parser)]
#[command(name = "location-tracker", version, about = "Track and display the device location")]
pub struct Cli {
    /// Location source to use (overrides the saved configuration)
    #[arg(short, long, value_enum)]
    pub source: Option<SourceKind>,

    /// gpsd host
    #[arg(long)]
    pub host: Option<String>,

    /// gpsd port
    #[arg(long)]
    pub port: Option<u16>,

    /// Serial device of an NMEA receiver, e.g. /dev/ttyUSB0
    #[arg(short, long)]
    pub device: Option<String>,

    /// Serial baud rate
    #[arg(short, long)]
    pub baud: Option<u32>,

    /// Open a window instead of the terminal view
    #[arg(long)]
    pub gui: bool,

    /// List serial ports and exit
    #[arg(long)]
    pub list_ports: bool,

    /// Persist the effective configuration before starting
    #[arg(long)]
    pub save_config: bool,
}

impl Cli {
    /// Overlay the command line on a loaded configuration
    pub fn apply(&self, config: &mut TrackerConfig) {
        if let Some(source) = self.source {
            config.source = source;
        }
        if let Some(ref host) = self.host {
            config.gpsd_host = Some(host.clone());
        }
        if let Some(port) = self.port {
            config.gpsd_port = Some(port);
        }
        if let Some(ref device) = self.device {
            config.serial_port = Some(device.clone());
            // A device without an explicit source means serial
            if self.source.is_none() {
                config.source = SourceKind::Serial;
            }
        }
        if let Some(baud) = self.baud {
            config.serial_baudrate = Some(baud);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_flags_keeps_config() {
        let cli = Cli::try_parse_from(["location-tracker"]).unwrap();
        let mut config = TrackerConfig::default();
        cli.apply(&mut config);
        assert_eq!(config, TrackerConfig::default());
    }

    #[test]
    fn test_device_implies_serial() {
        let cli = Cli::try_parse_from(["location-tracker", "--device", "/dev/ttyACM0", "-b", "4800"]).unwrap();
        let mut config = TrackerConfig::default();
        cli.apply(&mut config);

        assert_eq!(config.source, SourceKind::Serial);
        assert_eq!(config.serial_port.as_deref(), Some("/dev/ttyACM0"));
        assert_eq!(config.serial_baudrate, Some(4800));
    }

    #[test]
    fn test_gpsd_overrides() {
        let cli = Cli::try_parse_from([
            "location-tracker",
            "--source",
            "gpsd",
            "--host",
            "10.0.0.2",
            "--port",
            "2948",
        ])
        .unwrap();
        let mut config = TrackerConfig::default();
        config.source = SourceKind::Serial;
        cli.apply(&mut config);

        assert_eq!(config.source, SourceKind::Gpsd);
        assert_eq!(config.gpsd_host.as_deref(), Some("10.0.0.2"));
        assert_eq!(config.gpsd_port, Some(2948));
    }

    #[test]
    fn test_unknown_source_rejected() {
        assert!(Cli::try_parse_from(["location-tracker", "--source", "bluetooth"]).is_err());
    }
}
