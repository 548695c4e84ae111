//! Scan session behaviour against the in-memory Bluetooth stack
//!
//! Covers the full start/stop cycle: permission, adapter checks,
//! deduplication and the alerts raised on each failure path.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Notify;
use tokio::time::{sleep, timeout};

use blescan::mobile::{ImplicitPermissionGate, PermissionGate};
use blescan::ui::RecordingAlerts;
use blescan::{
    AdapterMonitor, AdapterState, AlertKind, BleStack, DeviceId, DiscoveredDevice, Error, MockBleStack,
    ScanSession, ScanSessionState,
};

/// Permission gate whose answer is held back until `release` is called
struct HeldPermission {
    granted: bool,
    released: Notify,
}

impl HeldPermission {
    fn new(granted: bool) -> Arc<Self> {
        Arc::new(Self {
            granted,
            released: Notify::new(),
        })
    }

    fn release(&self) {
        self.released.notify_one();
    }
}

#[async_trait]
impl PermissionGate for HeldPermission {
    async fn request_permission(&self) -> bool {
        self.released.notified().await;
        self.granted
    }
}

struct Denied;

#[async_trait]
impl PermissionGate for Denied {
    async fn request_permission(&self) -> bool {
        false
    }
}

struct Harness {
    stack: Arc<MockBleStack>,
    alerts: Arc<RecordingAlerts>,
    session: Arc<ScanSession>,
    _monitor: AdapterMonitor,
}

async fn harness(state: AdapterState, gate: Arc<dyn PermissionGate>) -> Harness {
    let stack = Arc::new(MockBleStack::new(state));
    let alerts = Arc::new(RecordingAlerts::new());
    let monitor = AdapterMonitor::subscribe(stack.as_ref(), true).await.unwrap();
    monitor.settled(Duration::from_secs(1)).await;

    let session = Arc::new(ScanSession::new(
        stack.clone(),
        gate,
        alerts.clone(),
        monitor.watch(),
    ));

    Harness {
        stack,
        alerts,
        session,
        _monitor: monitor,
    }
}

async fn wait_until(mut condition: impl FnMut() -> bool) {
    timeout(Duration::from_secs(2), async {
        while !condition() {
            sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .expect("condition not reached in time");
}

fn ids(devices: &[DiscoveredDevice]) -> Vec<&str> {
    devices.iter().map(|d| d.id.as_str()).collect()
}

#[tokio::test]
async fn test_repeated_advertisements_are_listed_once() {
    let h = harness(AdapterState::PoweredOn, Arc::new(ImplicitPermissionGate)).await;

    h.session.start().await.unwrap();
    assert_eq!(h.session.state(), ScanSessionState::Scanning);

    h.stack.emit_device(DiscoveredDevice::new("A", Some("Tag")));
    h.stack.emit_device(DiscoveredDevice::new("B", None));
    h.stack.emit_device(DiscoveredDevice::new("A", Some("Renamed")));
    wait_until(|| h.session.device_count() == 2).await;
    sleep(Duration::from_millis(20)).await;

    let devices = h.session.snapshot();
    assert_eq!(ids(&devices), vec!["A", "B"]);
    assert_eq!(devices[0].name.as_deref(), Some("Tag"));
    assert!(h.alerts.alerts().is_empty());
}

#[tokio::test]
async fn test_powered_off_adapter_blocks_scan() {
    let h = harness(AdapterState::PoweredOn, Arc::new(ImplicitPermissionGate)).await;

    h.session.start().await.unwrap();
    h.stack.emit_device(DiscoveredDevice::new("A", None));
    wait_until(|| h.session.device_count() == 1).await;
    h.session.stop().await;

    h.stack.set_state(AdapterState::PoweredOff);
    wait_until(|| h.session.adapter_state() == AdapterState::PoweredOff).await;

    let result = h.session.start().await;
    assert!(matches!(
        result,
        Err(Error::AdapterNotReady(AdapterState::PoweredOff))
    ));
    assert_eq!(h.session.state(), ScanSessionState::Idle);
    assert_eq!(h.alerts.kinds(), vec![AlertKind::BluetoothNotEnabled]);
    assert_eq!(h.stack.start_calls(), 1);
    // Results of the earlier scan are still shown
    assert_eq!(ids(&h.session.snapshot()), vec!["A"]);
}

#[tokio::test]
async fn test_unknown_adapter_state_is_not_ready() {
    let h = harness(AdapterState::Unknown, Arc::new(ImplicitPermissionGate)).await;

    let result = h.session.start().await;
    assert!(matches!(result, Err(Error::AdapterNotReady(AdapterState::Unknown))));
    assert_eq!(h.stack.start_calls(), 0);
    assert_eq!(h.alerts.kinds(), vec![AlertKind::BluetoothNotEnabled]);
}

#[tokio::test]
async fn test_permission_denied_never_starts_stack() {
    let h = harness(AdapterState::PoweredOn, Arc::new(Denied)).await;

    let result = h.session.start().await;
    assert!(matches!(result, Err(Error::PermissionDenied)));
    assert_eq!(h.session.state(), ScanSessionState::Idle);
    assert_eq!(h.stack.start_calls(), 0);
    assert_eq!(h.alerts.kinds(), vec![AlertKind::PermissionRequired]);
}

#[tokio::test]
async fn test_stop_halts_registry_updates() {
    let h = harness(AdapterState::PoweredOn, Arc::new(ImplicitPermissionGate)).await;

    h.session.start().await.unwrap();
    h.stack.emit_device(DiscoveredDevice::new("A", None));
    wait_until(|| h.session.device_count() == 1).await;

    // Queued but possibly not yet pumped when stop() runs
    h.stack.emit_device(DiscoveredDevice::new("B", None));
    h.session.stop().await;
    let after_stop = h.session.snapshot();

    assert!(!h.stack.emit_device(DiscoveredDevice::new("C", None)));
    sleep(Duration::from_millis(30)).await;

    assert_eq!(h.session.state(), ScanSessionState::Idle);
    assert_eq!(h.session.snapshot(), after_stop);
    assert!(!h.session.snapshot().iter().any(|d| d.id == DeviceId::new("C")));
    assert_eq!(h.stack.stop_calls(), 1);
    assert!(!h.stack.is_scanning());
}

#[tokio::test]
async fn test_discovery_error_returns_to_idle() {
    let h = harness(AdapterState::PoweredOn, Arc::new(ImplicitPermissionGate)).await;

    h.session.start().await.unwrap();
    h.stack.emit_device(DiscoveredDevice::new("A", None));
    h.stack.emit_error("adapter reset");

    wait_until(|| h.session.state() == ScanSessionState::Idle).await;
    wait_until(|| h.stack.stop_calls() == 1).await;

    assert_eq!(h.alerts.kinds(), vec![AlertKind::ScanError]);
    assert_eq!(ids(&h.session.snapshot()), vec!["A"]);

    // A fresh start works again and clears the old list
    h.session.start().await.unwrap();
    assert_eq!(h.session.device_count(), 0);
    assert_eq!(h.stack.start_calls(), 2);
}

#[tokio::test]
async fn test_start_failure_is_alerted() {
    let h = harness(AdapterState::PoweredOn, Arc::new(ImplicitPermissionGate)).await;
    h.stack.set_start_failure(Some("radio busy"));

    let result = h.session.start().await;
    assert!(matches!(result, Err(Error::ScanStart(_))));
    assert_eq!(h.session.state(), ScanSessionState::Idle);
    assert_eq!(h.alerts.kinds(), vec![AlertKind::ScanStartFailed]);

    h.stack.set_start_failure(None);
    h.session.start().await.unwrap();
    assert!(h.session.is_scanning());
}

#[tokio::test]
async fn test_stop_while_permission_pending_cancels_start() {
    let gate = HeldPermission::new(true);
    let h = harness(AdapterState::PoweredOn, gate.clone()).await;

    let session = h.session.clone();
    let start = tokio::spawn(async move { session.start().await });
    wait_until(|| h.session.is_scanning()).await;

    h.session.stop().await;
    gate.release();

    let result = start.await.unwrap();
    assert!(matches!(result, Err(Error::Cancelled)));
    assert_eq!(h.session.state(), ScanSessionState::Idle);
    assert_eq!(h.stack.start_calls(), 0);
    assert!(h.alerts.alerts().is_empty());
}

#[tokio::test]
async fn test_second_start_while_pending_is_rejected() {
    let gate = HeldPermission::new(true);
    let h = harness(AdapterState::PoweredOn, gate.clone()).await;

    let session = h.session.clone();
    let first = tokio::spawn(async move { session.start().await });
    wait_until(|| h.session.is_scanning()).await;

    assert!(matches!(h.session.start().await, Err(Error::AlreadyScanning)));

    gate.release();
    first.await.unwrap().unwrap();
    assert_eq!(h.stack.start_calls(), 1);
    assert!(matches!(h.session.start().await, Err(Error::AlreadyScanning)));
}

#[tokio::test]
async fn test_dropped_start_rolls_back_to_idle() {
    let gate = HeldPermission::new(true);
    let h = harness(AdapterState::PoweredOn, gate.clone()).await;

    let session = h.session.clone();
    let start = tokio::spawn(async move { session.start().await });
    wait_until(|| h.session.is_scanning()).await;

    start.abort();
    let _ = start.await;

    assert_eq!(h.session.state(), ScanSessionState::Idle);
    // The pending flag is cleared too, so the button works again
    let session = h.session.clone();
    let retry = tokio::spawn(async move { session.start().await });
    wait_until(|| h.session.is_scanning()).await;
    gate.release();
    retry.await.unwrap().unwrap();
    assert_eq!(h.stack.start_calls(), 1);
}

#[tokio::test]
async fn test_discovery_stream_ending_returns_to_idle() {
    let h = harness(AdapterState::PoweredOn, Arc::new(ImplicitPermissionGate)).await;

    h.session.start().await.unwrap();
    h.stack.emit_device(DiscoveredDevice::new("A", None));
    wait_until(|| h.session.device_count() == 1).await;

    // The stack drops its discovery stream without reporting an error
    h.stack.stop_scan().await.unwrap();

    wait_until(|| h.session.state() == ScanSessionState::Idle).await;
    assert!(!h.stack.is_scanning());
    assert_eq!(h.alerts.kinds(), vec![AlertKind::ScanError]);
    assert_eq!(ids(&h.session.snapshot()), vec!["A"]);

    h.session.start().await.unwrap();
    assert!(h.session.is_scanning());
}

#[tokio::test]
async fn test_rescan_lists_devices_seen_before() {
    let h = harness(AdapterState::PoweredOn, Arc::new(ImplicitPermissionGate)).await;

    h.session.start().await.unwrap();
    h.stack.emit_device(DiscoveredDevice::new("A", Some("Tag")));
    h.stack.emit_device(DiscoveredDevice::new("B", None));
    wait_until(|| h.session.device_count() == 2).await;
    h.session.stop().await;

    h.session.start().await.unwrap();
    assert_eq!(h.session.device_count(), 0);

    h.stack.emit_device(DiscoveredDevice::new("B", None));
    h.stack.emit_device(DiscoveredDevice::new("A", Some("Tag")));
    wait_until(|| h.session.device_count() == 2).await;

    assert_eq!(ids(&h.session.snapshot()), vec!["B", "A"]);
}

#[tokio::test]
async fn test_denial_after_stop_ends_quietly() {
    let gate = HeldPermission::new(false);
    let h = harness(AdapterState::PoweredOn, gate.clone()).await;

    let session = h.session.clone();
    let start = tokio::spawn(async move { session.start().await });
    wait_until(|| h.session.is_scanning()).await;

    h.session.stop().await;
    gate.release();

    let result = start.await.unwrap();
    assert!(matches!(result, Err(Error::Cancelled)));
    assert_eq!(h.session.state(), ScanSessionState::Idle);
    assert_eq!(h.stack.start_calls(), 0);
    assert!(h.alerts.alerts().is_empty());
}
