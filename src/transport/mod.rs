//! Transport layer for blescan
//!
//! This module implements the boundary to the Bluetooth LE stack:
//! - Adapter and device data model shared by the rest of the crate
//! - The `BleStack` trait the session talks to
//! - A btleplug-backed stack (feature `bluetooth`)
//! - A scriptable in-memory stack for tests and simulation

pub mod traits;
pub mod mock;

#[cfg(feature = "bluetooth")]
pub mod bluetooth;

use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub use traits::*;
pub use mock::MockBleStack;

#[cfg(feature = "bluetooth")]
pub use bluetooth::BtleplugStack;

/// Power/authorization status of the host Bluetooth radio
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum AdapterState {
    #[default]
    Unknown,
    Resetting,
    Unsupported,
    Unauthorized,
    PoweredOff,
    PoweredOn,
}

impl AdapterState {
    pub fn is_powered_on(&self) -> bool {
        matches!(self, AdapterState::PoweredOn)
    }
}

impl fmt::Display for AdapterState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            AdapterState::Unknown => "Unknown",
            AdapterState::Resetting => "Resetting",
            AdapterState::Unsupported => "Unsupported",
            AdapterState::Unauthorized => "Unauthorized",
            AdapterState::PoweredOff => "PoweredOff",
            AdapterState::PoweredOn => "PoweredOn",
        };
        f.write_str(name)
    }
}

/// Stable per-device identifier (address or platform UUID)
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DeviceId(String);

impl DeviceId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DeviceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for DeviceId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

/// A device seen in an advertisement, as delivered by the stack
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiscoveredDevice {
    pub id: DeviceId,
    pub name: Option<String>,
    pub rssi: Option<i16>,
}

impl DiscoveredDevice {
    pub fn new(id: impl Into<String>, name: Option<&str>) -> Self {
        Self {
            id: DeviceId::new(id),
            name: name.map(str::to_string),
            rssi: None,
        }
    }

    pub fn with_rssi(mut self, rssi: i16) -> Self {
        self.rssi = Some(rssi);
        self
    }

    /// Name to render, falling back to `placeholder` when the device
    /// advertised no name or an empty one.
    pub fn display_name<'a>(&'a self, placeholder: &'a str) -> &'a str {
        match self.name.as_deref() {
            Some(name) if !name.trim().is_empty() => name,
            _ => placeholder,
        }
    }
}

/// Service UUID filter passed to the stack when a scan starts.
/// An empty filter discovers every advertising device.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanFilter {
    pub services: Vec<Uuid>,
}

impl ScanFilter {
    pub fn is_unfiltered(&self) -> bool {
        self.services.is_empty()
    }
}
