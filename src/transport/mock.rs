//! In-memory Bluetooth stack
//!
//! Scriptable stand-in for a real BLE backend. Tests drive adapter state,
//! authorization results, start failures and discovery callbacks through it,
//! and the CLI uses it for `--simulate` runs.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use futures::channel::mpsc::{self, UnboundedSender};
use futures::stream::{self, StreamExt};
use parking_lot::Mutex;
use tokio::task::JoinHandle;

use crate::error::{Error, Result};
use crate::transport::{
    AdapterState, BleStack, DiscoveredDevice, DiscoveryStream, ScanFilter, StateStream,
};

pub struct MockBleStack {
    state: Mutex<AdapterState>,
    state_subscribers: Mutex<Vec<UnboundedSender<AdapterState>>>,
    enable_result: Mutex<std::result::Result<bool, String>>,
    start_failure: Mutex<Option<String>>,
    discovery: Mutex<Option<UnboundedSender<Result<DiscoveredDevice>>>>,
    last_filter: Mutex<Option<ScanFilter>>,
    start_calls: AtomicUsize,
    stop_calls: AtomicUsize,
}

impl MockBleStack {
    pub fn new(state: AdapterState) -> Self {
        Self {
            state: Mutex::new(state),
            state_subscribers: Mutex::new(Vec::new()),
            enable_result: Mutex::new(Ok(true)),
            start_failure: Mutex::new(None),
            discovery: Mutex::new(None),
            last_filter: Mutex::new(None),
            start_calls: AtomicUsize::new(0),
            stop_calls: AtomicUsize::new(0),
        }
    }

    /// Powered-on adapter with authorization granted
    pub fn powered_on() -> Self {
        Self::new(AdapterState::PoweredOn)
    }

    /// A handful of nearby devices, one of them unnamed
    pub fn sample_devices() -> Vec<DiscoveredDevice> {
        vec![
            DiscoveredDevice::new("C4:7C:8D:6A:21:01", Some("Mi Band 6")).with_rssi(-58),
            DiscoveredDevice::new("F0:99:B6:12:4E:02", Some("AirPods Pro")).with_rssi(-47),
            DiscoveredDevice::new("D8:3A:DD:90:11:03", None).with_rssi(-81),
            DiscoveredDevice::new("E2:15:04:7B:C3:04", Some("Tile")).with_rssi(-73),
        ]
    }

    /// Change the adapter state and notify every live subscriber
    pub fn set_state(&self, state: AdapterState) {
        *self.state.lock() = state;
        self.state_subscribers
            .lock()
            .retain(|subscriber| subscriber.unbounded_send(state).is_ok());
    }

    pub fn state(&self) -> AdapterState {
        *self.state.lock()
    }

    /// Result returned by the next `enable()` calls; `Err` simulates the
    /// platform call throwing
    pub fn set_enable_result(&self, result: std::result::Result<bool, String>) {
        *self.enable_result.lock() = result;
    }

    /// Make `start_scan` fail with `reason` until cleared with `None`
    pub fn set_start_failure(&self, reason: Option<&str>) {
        *self.start_failure.lock() = reason.map(str::to_string);
    }

    /// Deliver a discovery callback carrying a device. Returns false when no
    /// discovery stream is listening.
    pub fn emit_device(&self, device: DiscoveredDevice) -> bool {
        self.emit(Ok(device))
    }

    /// Deliver a discovery callback carrying an error
    pub fn emit_error(&self, reason: &str) -> bool {
        self.emit(Err(Error::Discovery(reason.to_string())))
    }

    fn emit(&self, item: Result<DiscoveredDevice>) -> bool {
        match self.discovery.lock().as_ref() {
            Some(sender) => sender.unbounded_send(item).is_ok(),
            None => false,
        }
    }

    /// Whether a discovery stream is currently open and listened to
    pub fn is_scanning(&self) -> bool {
        self.discovery
            .lock()
            .as_ref()
            .is_some_and(|sender| !sender.is_closed())
    }

    pub fn start_calls(&self) -> usize {
        self.start_calls.load(Ordering::SeqCst)
    }

    pub fn stop_calls(&self) -> usize {
        self.stop_calls.load(Ordering::SeqCst)
    }

    pub fn last_filter(&self) -> Option<ScanFilter> {
        self.last_filter.lock().clone()
    }

    /// Cycle through `devices`, advertising one every `period`. Advertisements
    /// sent while nothing is scanning are lost, as on real radios.
    pub fn spawn_advertisers(
        self: &Arc<Self>,
        devices: Vec<DiscoveredDevice>,
        period: Duration,
    ) -> JoinHandle<()> {
        let stack = Arc::clone(self);
        tokio::spawn(async move {
            if devices.is_empty() {
                return;
            }
            let mut ticker = tokio::time::interval(period);
            for device in devices.iter().cycle() {
                ticker.tick().await;
                if stack.emit_device(device.clone()) {
                    log::trace!("Simulated advertisement from {}", device.id);
                }
            }
        })
    }
}

impl Default for MockBleStack {
    fn default() -> Self {
        Self::new(AdapterState::Unknown)
    }
}

#[async_trait]
impl BleStack for MockBleStack {
    async fn subscribe_state(&self, emit_current: bool) -> Result<StateStream> {
        let (sender, receiver) = mpsc::unbounded();
        self.state_subscribers.lock().push(sender);

        if emit_current {
            let current = self.state();
            Ok(stream::once(async move { current }).chain(receiver).boxed())
        } else {
            Ok(receiver.boxed())
        }
    }

    async fn enable(&self) -> Result<bool> {
        self.enable_result.lock().clone().map_err(Error::Permission)
    }

    async fn start_scan(&self, filter: ScanFilter) -> Result<DiscoveryStream> {
        self.start_calls.fetch_add(1, Ordering::SeqCst);
        *self.last_filter.lock() = Some(filter);

        if let Some(reason) = self.start_failure.lock().clone() {
            return Err(Error::ScanStart(reason));
        }

        let (sender, receiver) = mpsc::unbounded();
        *self.discovery.lock() = Some(sender);
        Ok(receiver.boxed())
    }

    async fn stop_scan(&self) -> Result<()> {
        self.stop_calls.fetch_add(1, Ordering::SeqCst);
        self.discovery.lock().take();
        Ok(())
    }
}
