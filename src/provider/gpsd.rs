// src/provider/gpsd.rs
//! gpsd client provider

use super::{
    tasks::WatchTasks, LocationProvider, Position, PositionErrorCode, PositionSink,
    SubscriptionHandle, WatchOptions,
};
use crate::error::{Result, TrackerError};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use std::collections::HashMap;
use tokio::{
    io::{AsyncBufReadExt, AsyncWriteExt, BufReader, Lines},
    net::TcpStream,
};
use tracing::{debug, info, warn};

pub const DEFAULT_HOST: &str = "localhost";
pub const DEFAULT_PORT: u16 = 2947;

#[derive(Debug, Deserialize)]
struct GpsdMessage {
    class: String,
    #[serde(flatten)]
    data: HashMap<String, serde_json::Value>,
}

/// What a single gpsd JSON line means for a watch
#[derive(Debug, Clone, PartialEq)]
pub enum GpsdReport {
    Fix(Position),
    NoFix,
    Ignored,
}

/// Connect to a gpsd daemon and return a stream reader
pub async fn connect_gpsd(host: &str, port: u16) -> Result<BufReader<TcpStream>> {
    let mut stream = TcpStream::connect(format!("{}:{}", host, port))
        .await
        .map_err(|e| TrackerError::Connection(format!("Failed to connect to gpsd at {}:{}: {}", host, port, e)))?;

    // Send WATCH command to start receiving JSON data
    let watch_cmd = "?WATCH={\"enable\":true,\"json\":true}\n";
    stream
        .write_all(watch_cmd.as_bytes())
        .await
        .map_err(|e| TrackerError::Connection(format!("Failed to send WATCH command: {}", e)))?;

    Ok(BufReader::new(stream))
}

/// Parse a single line of gpsd JSON data
pub fn parse_gpsd_json(line: &str) -> Result<GpsdReport> {
    let msg: GpsdMessage = serde_json::from_str(line)
        .map_err(|e| TrackerError::Other(format!("Failed to parse gpsd JSON: {}", e)))?;

    let report = match msg.class.as_str() {
        "TPV" => parse_tpv_message(&msg.data),
        "VERSION" => {
            parse_version_message(&msg.data);
            GpsdReport::Ignored
        }
        "DEVICES" => {
            parse_devices_message(&msg.data);
            GpsdReport::Ignored
        }
        _ => GpsdReport::Ignored,
    };

    Ok(report)
}

/// Parse TPV (Time Position Velocity) message
fn parse_tpv_message(msg_data: &HashMap<String, serde_json::Value>) -> GpsdReport {
    let mode = msg_data.get("mode").and_then(|v| v.as_u64()).unwrap_or(0);
    let lat = msg_data.get("lat").and_then(|v| v.as_f64());
    let lon = msg_data.get("lon").and_then(|v| v.as_f64());

    let (latitude, longitude) = match (lat, lon) {
        (Some(lat), Some(lon)) if mode >= 2 => (lat, lon),
        _ => return GpsdReport::NoFix,
    };

    let timestamp = msg_data
        .get("time")
        .and_then(|v| v.as_str())
        .and_then(|t| DateTime::parse_from_rfc3339(t).ok())
        .map(|t| t.with_timezone(&Utc))
        .unwrap_or_else(Utc::now);

    // Horizontal error estimate; older daemons only report epx/epy
    let accuracy = msg_data.get("eph").and_then(|v| v.as_f64()).or_else(|| {
        let epx = msg_data.get("epx").and_then(|v| v.as_f64())?;
        let epy = msg_data.get("epy").and_then(|v| v.as_f64())?;
        Some(epx.max(epy))
    });

    GpsdReport::Fix(Position {
        latitude,
        longitude,
        altitude: msg_data
            .get("altMSL")
            .or_else(|| msg_data.get("alt"))
            .and_then(|v| v.as_f64()),
        accuracy,
        timestamp,
    })
}

/// Parse VERSION message (informational)
fn parse_version_message(msg_data: &HashMap<String, serde_json::Value>) {
    if let Some(version) = msg_data.get("release").and_then(|v| v.as_str()) {
        info!("Connected to gpsd version: {}", version);
    }
}

/// Parse DEVICES message (informational)
fn parse_devices_message(msg_data: &HashMap<String, serde_json::Value>) {
    if let Some(devices) = msg_data.get("devices").and_then(|v| v.as_array()) {
        info!("gpsd managing {} device(s)", devices.len());
        for device in devices {
            if let Some(path) = device.get("path").and_then(|v| v.as_str()) {
                debug!("  Device: {}", path);
            }
        }
    }
}

/// Location provider backed by a gpsd daemon
pub struct GpsdProvider {
    host: String,
    port: u16,
    tasks: WatchTasks,
}

impl GpsdProvider {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
            tasks: WatchTasks::new(),
        }
    }
}

impl Default for GpsdProvider {
    fn default() -> Self {
        Self::new(DEFAULT_HOST, DEFAULT_PORT)
    }
}

impl LocationProvider for GpsdProvider {
    fn name(&self) -> &str {
        "gpsd"
    }

    fn is_supported(&self) -> bool {
        // Reachability is only known once connected; failures arrive as
        // PositionUnavailable through the watch.
        true
    }

    fn subscribe(&mut self, sink: PositionSink, options: WatchOptions) -> SubscriptionHandle {
        let host = self.host.clone();
        let port = self.port;
        let handle = self
            .tasks
            .spawn(sink, move |sink| run_watch(host, port, sink, options));
        info!("Started gpsd watch {} on {}:{}", handle, self.host, self.port);
        handle
    }

    fn unsubscribe(&mut self, handle: SubscriptionHandle) {
        if self.tasks.abort(handle) {
            info!("Stopped gpsd watch {} ({} still running)", handle, self.tasks.len());
        }
    }
}

async fn run_watch(host: String, port: u16, sink: PositionSink, options: WatchOptions) {
    let reader = match connect_gpsd(&host, port).await {
        Ok(reader) => reader,
        Err(e) => {
            warn!("{}", e);
            sink.error(PositionErrorCode::PositionUnavailable);
            return;
        }
    };
    info!("Connected to gpsd at {}:{}", host, port);

    let mut lines = reader.lines();
    loop {
        let delivered = match tokio::time::timeout(options.timeout, next_report(&mut lines)).await {
            Ok(Some(Ok(position))) => sink.success(position),
            Ok(Some(Err(code))) => sink.error(code),
            Ok(None) => {
                warn!("gpsd at {}:{} closed the connection", host, port);
                sink.error(PositionErrorCode::PositionUnavailable);
                break;
            }
            Err(_) => sink.error(PositionErrorCode::Timeout),
        };

        if !delivered {
            debug!("Watch receiver dropped, closing gpsd connection");
            break;
        }
    }
}

/// Read lines until one of them says something about the position
async fn next_report(
    lines: &mut Lines<BufReader<TcpStream>>,
) -> Option<std::result::Result<Position, PositionErrorCode>> {
    loop {
        let line = match lines.next_line().await {
            Ok(Some(line)) => line,
            Ok(None) => return None,
            Err(e) => {
                warn!("Error reading from gpsd: {}", e);
                return None;
            }
        };

        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        match parse_gpsd_json(line) {
            Ok(GpsdReport::Fix(position)) => return Some(Ok(position)),
            Ok(GpsdReport::NoFix) => return Some(Err(PositionErrorCode::PositionUnavailable)),
            Ok(GpsdReport::Ignored) => {}
            Err(e) => debug!("Skipping gpsd line: {}", e),
        }
    }
}
