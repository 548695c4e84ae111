//! Scan session management
//!
//! The adapter monitor, the device registry, and the scan state machine that
//! ties them to the permission gate and the Bluetooth stack.

pub mod monitor;
pub mod registry;
pub mod scan_session;

pub use monitor::AdapterMonitor;
pub use registry::DeviceRegistry;
pub use scan_session::{ScanSession, ScanSessionState};
