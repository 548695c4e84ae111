//! User-facing alerts
//!
//! Every recoverable scan failure ends up here as a dismissible notification
//! with a title and a message.

use std::fmt;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AlertKind {
    PermissionRequired,
    BluetoothNotEnabled,
    ScanStartFailed,
    ScanError,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Alert {
    pub kind: AlertKind,
    pub title: String,
    pub message: String,
}

impl Alert {
    pub fn new(kind: AlertKind) -> Self {
        let (title, message) = match kind {
            AlertKind::PermissionRequired => (
                "Permission Required",
                "Bluetooth scanning requires Bluetooth permission. \
                 Please grant the permission to use Bluetooth.",
            ),
            AlertKind::BluetoothNotEnabled => (
                "Bluetooth Error",
                "Bluetooth is not enabled on your device.",
            ),
            AlertKind::ScanStartFailed | AlertKind::ScanError => (
                "Scan Error",
                "Failed to start device scan. Please try again.",
            ),
        };

        Self {
            kind,
            title: title.to_string(),
            message: message.to_string(),
        }
    }
}

impl fmt::Display for Alert {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.title, self.message)
    }
}

/// Where alerts are presented
pub trait AlertSink: Send + Sync {
    fn alert(&self, alert: Alert);
}

/// Prints alerts to the terminal
pub struct ConsoleAlerts;

impl AlertSink for ConsoleAlerts {
    fn alert(&self, alert: Alert) {
        log::warn!("{:?} alert shown", alert.kind);
        eprintln!();
        eprintln!("[!] {}", alert.title);
        eprintln!("    {}", alert.message);
        eprintln!();
    }
}

/// Keeps every alert in memory
#[derive(Default)]
pub struct RecordingAlerts {
    alerts: Mutex<Vec<Alert>>,
}

impl RecordingAlerts {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn alerts(&self) -> Vec<Alert> {
        self.alerts.lock().clone()
    }

    pub fn kinds(&self) -> Vec<AlertKind> {
        self.alerts.lock().iter().map(|a| a.kind).collect()
    }
}

impl AlertSink for RecordingAlerts {
    fn alert(&self, alert: Alert) {
        self.alerts.lock().push(alert);
    }
}
