//! Scan session state machine
//!
//! `Idle` -> `start()` -> `Scanning` -> `stop()` / discovery error -> `Idle`.
//!
//! `start()` flips to `Scanning` optimistically, then asks for permission,
//! checks the adapter, clears the registry and opens the stack's discovery
//! stream. Each scan gets a generation number; the pump task only upserts while
//! its generation is current, and that check happens under the same lock
//! `stop()` takes, so nothing lands in the registry once `stop()` returns.

use std::sync::Arc;

use futures::StreamExt;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::error::{Error, Result};
use crate::mobile::PermissionGate;
use crate::session::registry::DeviceRegistry;
use crate::transport::{AdapterState, BleStack, DiscoveredDevice, DiscoveryStream, ScanFilter};
use crate::ui::alerts::{Alert, AlertKind, AlertSink};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ScanSessionState {
    #[default]
    Idle,
    Scanning,
}

struct SessionInner {
    state: ScanSessionState,
    registry: DeviceRegistry,
    generation: u64,
    /// A `start()` call is suspended on permission or the stack
    start_pending: bool,
}

impl SessionInner {
    fn is_current(&self, generation: u64) -> bool {
        self.generation == generation && self.state == ScanSessionState::Scanning
    }
}

struct Shared {
    inner: Mutex<SessionInner>,
    revision: watch::Sender<u64>,
}

impl Shared {
    fn notify(&self) {
        self.revision.send_modify(|r| *r = r.wrapping_add(1));
    }

    fn is_current(&self, generation: u64) -> bool {
        self.inner.lock().is_current(generation)
    }

    /// Return to `Idle` if `generation` still owns the session
    fn back_to_idle(&self, generation: u64) -> bool {
        let mut inner = self.inner.lock();
        if inner.is_current(generation) {
            inner.state = ScanSessionState::Idle;
            true
        } else {
            false
        }
    }
}

/// Clears `start_pending` when `start()` finishes, and rolls the optimistic
/// `Scanning` back if the start future is dropped before completing.
struct PendingStart<'a> {
    shared: &'a Shared,
    generation: u64,
    completed: bool,
}

impl Drop for PendingStart<'_> {
    fn drop(&mut self) {
        let rolled_back = {
            let mut inner = self.shared.inner.lock();
            inner.start_pending = false;
            if !self.completed && inner.is_current(self.generation) {
                inner.state = ScanSessionState::Idle;
                true
            } else {
                false
            }
        };
        if rolled_back {
            log::warn!("Scan start abandoned before completing");
            self.shared.notify();
        }
    }
}

pub struct ScanSession {
    stack: Arc<dyn BleStack>,
    permissions: Arc<dyn PermissionGate>,
    alerts: Arc<dyn AlertSink>,
    adapter: watch::Receiver<AdapterState>,
    filter: ScanFilter,
    shared: Arc<Shared>,
    scan_task: Mutex<Option<JoinHandle<()>>>,
}

impl ScanSession {
    pub fn new(
        stack: Arc<dyn BleStack>,
        permissions: Arc<dyn PermissionGate>,
        alerts: Arc<dyn AlertSink>,
        adapter: watch::Receiver<AdapterState>,
    ) -> Self {
        let (revision, _) = watch::channel(0);
        Self {
            stack,
            permissions,
            alerts,
            adapter,
            filter: ScanFilter::default(),
            shared: Arc::new(Shared {
                inner: Mutex::new(SessionInner {
                    state: ScanSessionState::Idle,
                    registry: DeviceRegistry::new(),
                    generation: 0,
                    start_pending: false,
                }),
                revision,
            }),
            scan_task: Mutex::new(None),
        }
    }

    /// Restrict discovery to the given services
    pub fn with_filter(mut self, filter: ScanFilter) -> Self {
        self.filter = filter;
        self
    }

    pub fn state(&self) -> ScanSessionState {
        self.shared.inner.lock().state
    }

    pub fn is_scanning(&self) -> bool {
        self.state() == ScanSessionState::Scanning
    }

    pub fn adapter_state(&self) -> AdapterState {
        *self.adapter.borrow()
    }

    /// Devices discovered so far, in first-seen order
    pub fn snapshot(&self) -> Vec<DiscoveredDevice> {
        self.shared.inner.lock().registry.snapshot()
    }

    pub fn device_count(&self) -> usize {
        self.shared.inner.lock().registry.len()
    }

    /// Revision counter bumped on every state or registry change
    pub fn subscribe(&self) -> watch::Receiver<u64> {
        self.shared.revision.subscribe()
    }

    /// Start a scan. Failures are alerted to the user and also returned.
    pub async fn start(&self) -> Result<()> {
        let generation = {
            let mut inner = self.shared.inner.lock();
            if inner.state == ScanSessionState::Scanning {
                log::warn!("Ignoring start request: scan already in progress");
                return Err(Error::AlreadyScanning);
            }
            if inner.start_pending {
                log::warn!("Ignoring start request: previous attempt still pending");
                return Err(Error::AlreadyScanning);
            }
            inner.state = ScanSessionState::Scanning;
            inner.start_pending = true;
            inner.generation += 1;
            inner.generation
        };
        self.shared.notify();

        let mut pending = PendingStart {
            shared: self.shared.as_ref(),
            generation,
            completed: false,
        };
        let result = self.start_scan(generation).await;
        pending.completed = true;
        result
    }

    async fn start_scan(&self, generation: u64) -> Result<()> {
        if !self.permissions.request_permission().await {
            if !self.shared.is_current(generation) {
                log::info!("Scan start cancelled while waiting for permission");
                return Err(Error::Cancelled);
            }
            self.fail(generation, AlertKind::PermissionRequired);
            return Err(Error::PermissionDenied);
        }
        if !self.shared.is_current(generation) {
            log::info!("Scan start cancelled while waiting for permission");
            return Err(Error::Cancelled);
        }

        let adapter_state = self.adapter_state();
        if !adapter_state.is_powered_on() {
            log::warn!("Bluetooth adapter is {}, not scanning", adapter_state);
            self.fail(generation, AlertKind::BluetoothNotEnabled);
            return Err(Error::AdapterNotReady(adapter_state));
        }

        self.shared.inner.lock().registry.clear();
        self.shared.notify();

        let stream = match self.stack.start_scan(self.filter.clone()).await {
            Ok(stream) => stream,
            Err(e) => {
                log::error!("Scan Error: {}", e);
                self.fail(generation, AlertKind::ScanStartFailed);
                return Err(e);
            }
        };

        if !self.shared.is_current(generation) {
            log::info!("Scan start cancelled while the stack was starting");
            drop(stream);
            if let Err(e) = self.stack.stop_scan().await {
                log::warn!("Failed to stop cancelled scan: {}", e);
            }
            return Err(Error::Cancelled);
        }

        let task = tokio::spawn(pump(
            stream,
            Arc::clone(&self.shared),
            generation,
            Arc::clone(&self.stack),
            Arc::clone(&self.alerts),
        ));

        let mut slot = self.scan_task.lock();
        if let Some(previous) = slot.replace(task) {
            previous.abort();
        }
        if !self.shared.is_current(generation) {
            if let Some(task) = slot.take() {
                task.abort();
            }
            return Err(Error::Cancelled);
        }

        log::info!("Scan {} started", generation);
        Ok(())
    }

    /// Stop scanning. Discovered devices stay visible.
    pub async fn stop(&self) {
        let was_scanning = {
            let mut inner = self.shared.inner.lock();
            let was_scanning = inner.state == ScanSessionState::Scanning;
            inner.state = ScanSessionState::Idle;
            inner.generation += 1;
            was_scanning
        };

        let task = self.scan_task.lock().take();
        if let Some(task) = task {
            task.abort();
        }

        if !was_scanning {
            log::debug!("Stop requested while idle");
            return;
        }
        self.shared.notify();

        if let Err(e) = self.stack.stop_scan().await {
            log::warn!("Failed to stop scan: {}", e);
        }
        log::info!("Scan stopped with {} device(s)", self.device_count());
    }

    fn fail(&self, generation: u64, kind: AlertKind) {
        if self.shared.back_to_idle(generation) {
            self.shared.notify();
        }
        self.alerts.alert(Alert::new(kind));
    }
}

impl Drop for ScanSession {
    fn drop(&mut self) {
        if let Some(task) = self.scan_task.lock().take() {
            task.abort();
        }
    }
}

/// Feed discovery callbacks into the registry until the stream ends, errors,
/// or the scan it belongs to is superseded. A stream that errors or ends
/// while its scan is still current takes the session back to `Idle`.
async fn pump(
    mut stream: DiscoveryStream,
    shared: Arc<Shared>,
    generation: u64,
    stack: Arc<dyn BleStack>,
    alerts: Arc<dyn AlertSink>,
) {
    loop {
        match stream.next().await {
            Some(Ok(device)) => {
                let added = {
                    let mut inner = shared.inner.lock();
                    if !inner.is_current(generation) {
                        break;
                    }
                    inner.registry.upsert(device)
                };
                if added {
                    shared.notify();
                }
            }
            Some(Err(e)) => {
                log::error!("Scan Error: {}", e);
                break;
            }
            None => {
                if shared.is_current(generation) {
                    log::warn!("Discovery stream for scan {} ended unexpectedly", generation);
                }
                break;
            }
        }
    }
    drop(stream);

    if !shared.is_current(generation) {
        log::debug!("Discovery stream for scan {} closed", generation);
        return;
    }
    if let Err(e) = stack.stop_scan().await {
        log::warn!("Failed to stop scan after discovery ended: {}", e);
    }
    if shared.back_to_idle(generation) {
        shared.notify();
        alerts.alert(Alert::new(AlertKind::ScanError));
    }
}
