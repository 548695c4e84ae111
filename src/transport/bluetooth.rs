//! Bluetooth LE stack backed by btleplug

use async_trait::async_trait;
use btleplug::api::{
    Central, CentralEvent, CentralState, Manager as _, Peripheral as _,
    ScanFilter as BtleScanFilter,
};
use btleplug::platform::{Adapter, Manager, PeripheralId};
use futures::stream::{self, StreamExt};

use crate::error::{Error, Result};
use crate::transport::{
    AdapterState, BleStack, DeviceId, DiscoveredDevice, DiscoveryStream, ScanFilter,
    StateStream,
};

/// btleplug-backed implementation of [`BleStack`] using the first adapter
/// reported by the OS
pub struct BtleplugStack {
    _manager: Manager,
    adapter: Adapter,
}

impl BtleplugStack {
    pub async fn new() -> Result<Self> {
        let manager = Manager::new().await?;
        let adapters = manager.adapters().await?;
        let adapter = adapters
            .into_iter()
            .next()
            .ok_or_else(|| Error::AdapterUnavailable("no adapters reported by the OS".to_string()))?;

        match adapter.adapter_info().await {
            Ok(info) => log::info!("Using Bluetooth adapter: {}", info),
            Err(e) => log::debug!("Adapter info unavailable: {}", e),
        }

        Ok(Self {
            _manager: manager,
            adapter,
        })
    }

    /// Resolve a discovered peripheral into a device entry. Peripherals that
    /// have no properties yet are skipped rather than admitted empty.
    async fn describe(adapter: &Adapter, id: &PeripheralId) -> Result<Option<DiscoveredDevice>> {
        let peripheral = adapter
            .peripheral(id)
            .await
            .map_err(|e| Error::Discovery(e.to_string()))?;
        let properties = peripheral
            .properties()
            .await
            .map_err(|e| Error::Discovery(e.to_string()))?;

        Ok(properties.map(|props| DiscoveredDevice {
            id: DeviceId::new(format!("{:?}", id)),
            name: props.local_name,
            rssi: props.rssi,
        }))
    }
}

fn adapter_state_from(state: CentralState) -> AdapterState {
    match state {
        CentralState::PoweredOn => AdapterState::PoweredOn,
        CentralState::PoweredOff => AdapterState::PoweredOff,
        _ => AdapterState::Unknown,
    }
}

#[async_trait]
impl BleStack for BtleplugStack {
    async fn subscribe_state(&self, emit_current: bool) -> Result<StateStream> {
        let events = self.adapter.events().await?;
        let updates = events.filter_map(|event| async move {
            match event {
                CentralEvent::StateUpdate(state) => Some(adapter_state_from(state)),
                _ => None,
            }
        });

        if emit_current {
            let current = adapter_state_from(self.adapter.adapter_state().await?);
            Ok(stream::once(async move { current }).chain(updates).boxed())
        } else {
            Ok(updates.boxed())
        }
    }

    async fn enable(&self) -> Result<bool> {
        // Desktop stacks authorize on first adapter access; there is no
        // separate enable call to make.
        log::debug!("Bluetooth authorization handled by the OS");
        Ok(true)
    }

    async fn start_scan(&self, filter: ScanFilter) -> Result<DiscoveryStream> {
        // Subscribe before starting so no early advertisement is missed.
        let events = self.adapter.events().await?;

        self.adapter
            .start_scan(BtleScanFilter {
                services: filter.services.clone(),
            })
            .await
            .map_err(|e| Error::ScanStart(e.to_string()))?;

        if filter.is_unfiltered() {
            log::info!("Started scanning for all advertising devices");
        } else {
            log::info!("Started scanning for services: {:?}", filter.services);
        }

        let adapter = self.adapter.clone();
        let devices = events
            .filter_map(move |event| {
                let adapter = adapter.clone();
                async move {
                    match event {
                        // Peripherals already cached by the adapter from an
                        // earlier scan only report updates.
                        CentralEvent::DeviceDiscovered(id) | CentralEvent::DeviceUpdated(id) => {
                            match Self::describe(&adapter, &id).await {
                                Ok(device) => device.map(Ok),
                                Err(e) => {
                                    log::warn!("Skipping device {:?}: {}", id, e);
                                    None
                                }
                            }
                        }
                        CentralEvent::StateUpdate(CentralState::PoweredOff) => Some(Err(
                            Error::Discovery("Bluetooth adapter powered off".to_string()),
                        )),
                        other => {
                            log::trace!("Unhandled BLE event: {:?}", other);
                            None
                        }
                    }
                }
            })
            .chain(stream::once(async {
                Err(Error::Discovery("adapter event stream ended".to_string()))
            }));

        Ok(devices.boxed())
    }

    async fn stop_scan(&self) -> Result<()> {
        self.adapter.stop_scan().await?;
        log::info!("Scanning stopped");
        Ok(())
    }
}
