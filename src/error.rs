//! Error types and handling for blescan

use thiserror::Error;

use crate::transport::AdapterState;

/// Result type alias for blescan operations
pub type Result<T> = std::result::Result<T, Error>;

/// blescan error types
#[derive(Debug, Error)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Configuration error: {0}")]
    Config(String),

    /// The platform permission call itself failed.
    #[error("Permission error: {0}")]
    Permission(String),

    #[error("Permission denied")]
    PermissionDenied,

    #[error("Bluetooth adapter not ready: {0}")]
    AdapterNotReady(AdapterState),

    #[error("No Bluetooth adapter available: {0}")]
    AdapterUnavailable(String),

    #[error("Failed to start scan: {0}")]
    ScanStart(String),

    #[error("Discovery error: {0}")]
    Discovery(String),

    #[error("Scan already in progress")]
    AlreadyScanning,

    #[error("Scan attempt cancelled")]
    Cancelled,

    #[cfg(feature = "bluetooth")]
    #[error("Bluetooth error: {0}")]
    Bluetooth(#[from] btleplug::Error),
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Serialization(format!("JSON error: {}", err))
    }
}

impl From<toml::de::Error> for Error {
    fn from(err: toml::de::Error) -> Self {
        Error::Config(format!("Failed to parse config: {}", err))
    }
}
