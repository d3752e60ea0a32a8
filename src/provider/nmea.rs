// src/provider/nmea.rs
//! NMEA 0183 serial receiver provider

use super::{
    tasks::WatchTasks, LocationProvider, Position, PositionErrorCode, PositionSink,
    SubscriptionHandle, WatchOptions,
};
use crate::error::{Result, TrackerError};
use chrono::Utc;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader, Lines};
use tokio_serial::SerialPortBuilderExt;
use tracing::{debug, info, warn};

pub const DEFAULT_BAUDRATE: u32 = 9600;

/// Typical user equivalent range error of a consumer receiver, in meters
const UERE_METERS: f64 = 5.0;

/// Parse a single NMEA sentence into a watch outcome.
///
/// Only GGA sentences carry a fix; everything else yields `None`.
pub fn parse_nmea_sentence(line: &str) -> Option<std::result::Result<Position, PositionErrorCode>> {
    if line.starts_with("$GPGGA") || line.starts_with("$GNGGA") {
        let parts: Vec<&str> = line.split('*').next().unwrap_or(line).split(',').collect();
        Some(parse_gga(&parts))
    } else {
        None
    }
}

/// Parse GGA (Global Positioning System Fix Data) sentence
fn parse_gga(parts: &[&str]) -> std::result::Result<Position, PositionErrorCode> {
    if parts.len() < 10 {
        return Err(PositionErrorCode::PositionUnavailable);
    }

    // Fix quality (field 6), 0 means no fix
    match parts[6].parse::<u8>() {
        Ok(quality) if quality > 0 => {}
        _ => return Err(PositionErrorCode::PositionUnavailable),
    }

    let latitude = parse_coordinate(parts[2], parts[3], "S");
    let longitude = parse_coordinate(parts[4], parts[5], "W");
    let (latitude, longitude) = match (latitude, longitude) {
        (Some(lat), Some(lon)) => (lat, lon),
        _ => return Err(PositionErrorCode::PositionUnavailable),
    };

    let mut position = Position::new(latitude, longitude);

    // HDOP (field 8) scaled into a rough horizontal error estimate
    if let Ok(hdop) = parts[8].parse::<f64>() {
        position.accuracy = Some(hdop * UERE_METERS);
    }

    // Altitude (field 9)
    if let Ok(alt) = parts[9].parse::<f64>() {
        position.altitude = Some(alt);
    }

    position.timestamp = Utc::now();
    Ok(position)
}

/// Convert an NMEA `(d)ddmm.mmmm` field plus hemisphere into signed degrees
fn parse_coordinate(value: &str, hemisphere: &str, negative: &str) -> Option<f64> {
    if value.is_empty() || hemisphere.is_empty() {
        return None;
    }

    let raw = value.parse::<f64>().ok()?;
    let degrees = (raw / 100.0).trunc();
    let minutes = raw - degrees * 100.0;
    let coordinate = degrees + minutes / 60.0;

    Some(if hemisphere == negative { -coordinate } else { coordinate })
}

/// List available serial ports
pub fn list_serial_ports() -> Result<Vec<String>> {
    let ports = tokio_serial::available_ports()
        .map_err(|e| TrackerError::Other(format!("Failed to list serial ports: {}", e)))?;

    Ok(ports.into_iter().map(|port| port.port_name).collect())
}

/// Location provider reading NMEA sentences from a serial GPS receiver
pub struct SerialProvider {
    port: String,
    baudrate: u32,
    tasks: WatchTasks,
}

impl SerialProvider {
    pub fn new(port: impl Into<String>, baudrate: u32) -> Self {
        Self {
            port: port.into(),
            baudrate,
            tasks: WatchTasks::new(),
        }
    }
}

impl LocationProvider for SerialProvider {
    fn name(&self) -> &str {
        "serial"
    }

    fn is_supported(&self) -> bool {
        // A configured port is enough; open failures arrive through the watch
        // as PermissionDenied or PositionUnavailable.
        true
    }

    fn subscribe(&mut self, sink: PositionSink, options: WatchOptions) -> SubscriptionHandle {
        let port = self.port.clone();
        let baudrate = self.baudrate;
        let handle = self
            .tasks
            .spawn(sink, move |sink| run_watch(port, baudrate, sink, options));
        info!("Started serial watch {} on {} at {} baud", handle, self.port, self.baudrate);
        handle
    }

    fn unsubscribe(&mut self, handle: SubscriptionHandle) {
        if self.tasks.abort(handle) {
            info!("Stopped serial watch {} ({} still running)", handle, self.tasks.len());
        }
    }
}

fn open_error_code(error: &tokio_serial::Error) -> PositionErrorCode {
    match error.kind {
        tokio_serial::ErrorKind::Io(std::io::ErrorKind::PermissionDenied) => {
            PositionErrorCode::PermissionDenied
        }
        _ => PositionErrorCode::PositionUnavailable,
    }
}

async fn run_watch(port: String, baudrate: u32, sink: PositionSink, options: WatchOptions) {
    let serial = match tokio_serial::new(&port, baudrate)
        .timeout(Duration::from_millis(1000))
        .open_native_async()
    {
        Ok(serial) => serial,
        Err(e) => {
            warn!("Failed to open serial port {}: {}", port, e);
            sink.error(open_error_code(&e));
            return;
        }
    };
    info!("Connected to GPS on {} at {} baud", port, baudrate);

    watch_sentences(BufReader::new(serial).lines(), sink, options).await;
}

/// Forward fixes from a stream of NMEA sentences until it ends or the sink closes
async fn watch_sentences<R>(mut lines: Lines<BufReader<R>>, sink: PositionSink, options: WatchOptions)
where
    R: AsyncRead + Unpin,
{
    loop {
        let delivered = match tokio::time::timeout(options.timeout, next_fix(&mut lines)).await {
            Ok(Some(Ok(position))) => sink.success(position),
            Ok(Some(Err(code))) => sink.error(code),
            Ok(None) => {
                warn!("Serial GPS stream ended");
                sink.error(PositionErrorCode::PositionUnavailable);
                break;
            }
            Err(_) => sink.error(PositionErrorCode::Timeout),
        };

        if !delivered {
            debug!("Watch receiver dropped, closing serial port");
            break;
        }
    }
}

async fn next_fix<R>(
    lines: &mut Lines<BufReader<R>>,
) -> Option<std::result::Result<Position, PositionErrorCode>>
where
    R: AsyncRead + Unpin,
{
    loop {
        let line = match lines.next_line().await {
            Ok(Some(line)) => line,
            Ok(None) => return None,
            Err(e) => {
                warn!("Error reading from serial port: {}", e);
                return None;
            }
        };

        if let Some(outcome) = parse_nmea_sentence(line.trim()) {
            return Some(outcome);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::WatchEvent;
    use tokio::io::AsyncWriteExt;

    #[test]
    fn test_gpgga_parsing() {
        let gpgga = "$GPGGA,123519,4807.038,N,01131.000,E,1,08,0.9,545.4,M,46.9,M,,*47";

        let position = parse_nmea_sentence(gpgga).unwrap().unwrap();

        assert!((position.latitude - 48.1173).abs() < 0.0001);
        assert!((position.longitude - 11.516_667).abs() < 0.0001);
        assert_eq!(position.altitude, Some(545.4));
        assert!((position.accuracy.unwrap() - 4.5).abs() < 1e-9);
    }

    #[test]
    fn test_southern_western_hemispheres() {
        let gngga = "$GNGGA,000000,3352.000,S,15112.000,W,1,05,1.0,10.0,M,,M,,*00";

        let position = parse_nmea_sentence(gngga).unwrap().unwrap();

        assert!((position.latitude + 33.866_667).abs() < 0.0001);
        assert!((position.longitude + 151.2).abs() < 0.0001);
    }

    #[test]
    fn test_gga_without_fix() {
        let gpgga = "$GPGGA,123519,,,,,0,00,,,M,,M,,*66";
        assert_eq!(
            parse_nmea_sentence(gpgga),
            Some(Err(PositionErrorCode::PositionUnavailable))
        );
    }

    #[test]
    fn test_other_sentences_ignored() {
        let gprmc = "$GPRMC,123519,A,4807.038,N,01131.000,E,022.4,084.4,230394,003.1,W*6A";
        assert_eq!(parse_nmea_sentence(gprmc), None);
    }

    #[test]
    fn test_open_error_mapping() {
        let denied = tokio_serial::Error::new(
            tokio_serial::ErrorKind::Io(std::io::ErrorKind::PermissionDenied),
            "denied",
        );
        assert_eq!(open_error_code(&denied), PositionErrorCode::PermissionDenied);

        let missing = tokio_serial::Error::new(tokio_serial::ErrorKind::NoDevice, "missing");
        assert_eq!(open_error_code(&missing), PositionErrorCode::PositionUnavailable);
    }

    #[test]
    fn test_any_configured_port_is_supported() {
        let provider = SerialProvider::new("/dev/serial/by-id/usb-u-blox-if00", 9600);
        assert!(provider.is_supported());
    }

    #[tokio::test]
    async fn test_unopenable_port_reports_through_watch() {
        let mut provider = SerialProvider::new("/dev/location-tracker-no-such-port", 9600);
        let (sink, mut rx) = PositionSink::channel();
        provider.subscribe(sink, WatchOptions::default());

        assert_eq!(
            rx.recv().await,
            Some(WatchEvent::Error(PositionErrorCode::PositionUnavailable))
        );
    }

    #[tokio::test]
    async fn test_watch_sentences_times_out_then_recovers() {
        let (mut device, host) = tokio::io::duplex(256);
        let (sink, mut rx) = PositionSink::channel();
        let options = WatchOptions {
            timeout: Duration::from_millis(50),
            ..WatchOptions::default()
        };
        let watch = tokio::spawn(watch_sentences(BufReader::new(host).lines(), sink, options));

        // Sentences without a fix field do not reset the timer
        device
            .write_all(b"$GPGSA,A,3,04,05,,09,12,,,24,,,,,2.5,1.3,2.1*39\r\n")
            .await
            .unwrap();
        assert_eq!(rx.recv().await, Some(WatchEvent::Error(PositionErrorCode::Timeout)));

        device
            .write_all(b"$GPGGA,123519,4807.038,N,01131.000,E,1,08,0.9,545.4,M,46.9,M,,*47\r\n")
            .await
            .unwrap();
        loop {
            match rx.recv().await {
                Some(WatchEvent::Error(PositionErrorCode::Timeout)) => continue,
                Some(WatchEvent::Success(position)) => {
                    assert!((position.latitude - 48.1173).abs() < 0.0001);
                    break;
                }
                other => panic!("expected a fix after the timeout, got {:?}", other),
            }
        }

        drop(rx);
        drop(device);
        watch.await.unwrap();
    }

    #[tokio::test]
    async fn test_watch_sentences_forwards_fixes_then_ends() {
        let input: &[u8] = b"$GPRMC,123519,A,4807.038,N,01131.000,E,022.4,084.4,230394,003.1,W*6A\r\n\
$GPGGA,123519,4807.038,N,01131.000,E,1,08,0.9,545.4,M,46.9,M,,*47\r\n\
$GPGGA,123520,,,,,0,00,,,M,,M,,*66\r\n";

        let (sink, mut rx) = PositionSink::channel();
        watch_sentences(BufReader::new(input).lines(), sink, WatchOptions::default()).await;

        assert!(matches!(rx.recv().await, Some(WatchEvent::Success(_))));
        assert_eq!(
            rx.recv().await,
            Some(WatchEvent::Error(PositionErrorCode::PositionUnavailable))
        );
        // End of stream
        assert_eq!(
            rx.recv().await,
            Some(WatchEvent::Error(PositionErrorCode::PositionUnavailable))
        );
        assert_eq!(rx.recv().await, None);
    }
}
