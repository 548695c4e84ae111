//! Insertion-ordered device registry
//!
//! Holds every device seen during the current scan, unique by identifier, in
//! the order the stack reported them. The first sighting of a device wins:
//! later advertisements often omit the name, so they never overwrite it.

use crate::transport::{DeviceId, DiscoveredDevice};

#[derive(Debug, Clone, Default)]
pub struct DeviceRegistry {
    devices: Vec<DiscoveredDevice>,
}

impl DeviceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append `device` unless its identifier is already known.
    /// Returns true when the device was added.
    pub fn upsert(&mut self, device: DiscoveredDevice) -> bool {
        // Expected sizes are low tens, a linear scan is fine.
        if self.contains(&device.id) {
            return false;
        }
        log::debug!(
            "New device {} ({})",
            device.id,
            device.name.as_deref().unwrap_or("unnamed")
        );
        self.devices.push(device);
        true
    }

    pub fn clear(&mut self) {
        self.devices.clear();
    }

    /// Ordered copy of the registry for rendering
    pub fn snapshot(&self) -> Vec<DiscoveredDevice> {
        self.devices.clone()
    }

    pub fn contains(&self, id: &DeviceId) -> bool {
        self.devices.iter().any(|d| &d.id == id)
    }

    pub fn len(&self) -> usize {
        self.devices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.devices.is_empty()
    }
}
