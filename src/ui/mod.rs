//! User interface for blescan
//!
//! Alerts, the discovery screen view model, and the terminal front-end that
//! renders it.

pub mod alerts;
pub mod cli;
pub mod mobile;

pub use alerts::{Alert, AlertKind, AlertSink, ConsoleAlerts, RecordingAlerts};
pub use mobile::{DiscoveryScreen, ScreenModel};
