//! blescan - scan for nearby Bluetooth LE devices and list them
//!
//! The crate is organised the way the app is wired:
//! - transport: the Bluetooth stack boundary (btleplug or an in-memory stack)
//! - mobile: platform permission gates
//! - session: adapter monitor, device registry and the scan state machine
//! - ui: alerts, the discovery screen view model and the terminal front-end
//! - config: file and environment configuration

pub mod config;
pub mod error;
pub mod mobile;
pub mod session;
pub mod transport;
pub mod ui;

// Re-export commonly used types for easy access
pub use config::{Config, Platform};
pub use error::{Error, Result};
pub use mobile::{gate_for_platform, PermissionGate, PermissionPrompt, Rationale};
pub use session::{AdapterMonitor, DeviceRegistry, ScanSession, ScanSessionState};
pub use transport::{
    AdapterState, BleStack, DeviceId, DiscoveredDevice, MockBleStack, ScanFilter,
};
pub use ui::{Alert, AlertKind, AlertSink, DiscoveryScreen, ScreenModel};
