//! Bluetooth stack trait definitions

use async_trait::async_trait;
use futures::stream::BoxStream;

use crate::error::Result;
use crate::transport::{AdapterState, DiscoveredDevice, ScanFilter};

/// Adapter power-state notifications. Dropping the stream removes the
/// subscription.
pub type StateStream = BoxStream<'static, AdapterState>;

/// Discovery callbacks: each item carries either an error or a device.
/// Dropping the stream releases the discovery subscription.
pub type DiscoveryStream = BoxStream<'static, Result<DiscoveredDevice>>;

/// Core Bluetooth stack trait - what the scanner needs from any BLE backend
#[async_trait]
pub trait BleStack: Send + Sync {
    /// Subscribe to adapter state changes, optionally emitting the current
    /// state as the first item
    async fn subscribe_state(&self, emit_current: bool) -> Result<StateStream>;

    /// Ask the stack to enable/authorize Bluetooth for this app
    async fn enable(&self) -> Result<bool>;

    /// Begin device discovery
    async fn start_scan(&self, filter: ScanFilter) -> Result<DiscoveryStream>;

    /// Stop device discovery
    async fn stop_scan(&self) -> Result<()>;
}
