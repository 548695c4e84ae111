//! Cross-platform permission handling for Bluetooth scanning
//!
//! Each platform family authorizes BLE scanning differently:
//! - Android: runtime grant of a location permission, preceded by a rationale
//! - iOS: authorization requested through the Bluetooth stack itself
//! - Desktop: authorization is implicit, nothing to request
//!
//! Whatever goes wrong underneath, the gate answers granted or denied. Failures
//! are logged and reported as denial.

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::config::Platform;
use crate::error::Result;
use crate::transport::BleStack;

/// Decides whether a scan may proceed. Asked fresh on every scan attempt.
#[async_trait]
pub trait PermissionGate: Send + Sync {
    async fn request_permission(&self) -> bool;
}

/// OS runtime permission dialog (the Android permission subsystem)
#[async_trait]
pub trait PermissionPrompt: Send + Sync {
    async fn request(&self, permission: Permission, rationale: &Rationale)
        -> Result<PermissionState>;
}

/// Permissions relevant to BLE scanning
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Permission {
    BluetoothScan,
    BluetoothConnect,
    AccessCoarseLocation,
    AccessFineLocation,
}

impl Permission {
    /// Convert to Android permission string
    pub fn to_android_string(&self) -> &'static str {
        match self {
            Permission::BluetoothScan => "android.permission.BLUETOOTH_SCAN",
            Permission::BluetoothConnect => "android.permission.BLUETOOTH_CONNECT",
            Permission::AccessCoarseLocation => "android.permission.ACCESS_COARSE_LOCATION",
            Permission::AccessFineLocation => "android.permission.ACCESS_FINE_LOCATION",
        }
    }
}

/// Permission states
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PermissionState {
    NotDetermined,
    Granted,
    Denied,
    PermanentlyDenied,
}

/// Text of the dialog shown before the runtime permission request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Rationale {
    pub title: String,
    pub message: String,
    pub button_positive: String,
}

impl Default for Rationale {
    fn default() -> Self {
        Self {
            title: "Location Permission".to_string(),
            message: "This app needs access to your location to use Bluetooth".to_string(),
            button_positive: "OK".to_string(),
        }
    }
}

/// Android family: location permission through the runtime dialog
pub struct RuntimePermissionGate {
    prompt: Arc<dyn PermissionPrompt>,
    permission: Permission,
    rationale: Rationale,
}

impl RuntimePermissionGate {
    pub fn new(prompt: Arc<dyn PermissionPrompt>, rationale: Rationale) -> Self {
        Self {
            prompt,
            permission: Permission::AccessFineLocation,
            rationale,
        }
    }
}

#[async_trait]
impl PermissionGate for RuntimePermissionGate {
    async fn request_permission(&self) -> bool {
        log::debug!(
            "Requesting {} with rationale {:?}",
            self.permission.to_android_string(),
            self.rationale.title
        );

        match self.prompt.request(self.permission, &self.rationale).await {
            Ok(PermissionState::Granted) => {
                log::info!("Location permission granted");
                true
            }
            Ok(state) => {
                log::info!("Location permission denied ({:?})", state);
                false
            }
            Err(e) => {
                log::error!("Permission Error: {}", e);
                false
            }
        }
    }
}

/// iOS family: authorization through the Bluetooth stack
pub struct StackAuthorizationGate {
    stack: Arc<dyn BleStack>,
}

impl StackAuthorizationGate {
    pub fn new(stack: Arc<dyn BleStack>) -> Self {
        Self { stack }
    }
}

#[async_trait]
impl PermissionGate for StackAuthorizationGate {
    async fn request_permission(&self) -> bool {
        match self.stack.enable().await {
            Ok(true) => {
                log::info!("Bluetooth permission granted");
                true
            }
            Ok(false) => {
                log::info!("Bluetooth permission denied");
                false
            }
            Err(e) => {
                log::error!("Permission Error: {}", e);
                false
            }
        }
    }
}

/// Desktop family: nothing to request
pub struct ImplicitPermissionGate;

#[async_trait]
impl PermissionGate for ImplicitPermissionGate {
    async fn request_permission(&self) -> bool {
        log::debug!("No runtime Bluetooth permission on this platform");
        true
    }
}

/// Pick the gate matching the platform family
pub fn gate_for_platform(
    platform: Platform,
    stack: Arc<dyn BleStack>,
    prompt: Arc<dyn PermissionPrompt>,
    rationale: Rationale,
) -> Arc<dyn PermissionGate> {
    match platform {
        Platform::Android => Arc::new(RuntimePermissionGate::new(prompt, rationale)),
        Platform::Ios => Arc::new(StackAuthorizationGate::new(stack)),
        Platform::Desktop => Arc::new(ImplicitPermissionGate),
    }
}
