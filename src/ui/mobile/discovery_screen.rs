//! Device discovery screen
//!
//! The app's single screen: one button toggling between start and stop, and
//! the list of discovered device names. This is a view model; any renderer
//! (the terminal front-end here, a native view on a phone) draws a
//! [`ScreenModel`] and forwards button presses to [`DiscoveryScreen::press`].

use std::fmt;
use std::sync::Arc;

use serde::Serialize;

use crate::config::UiConfig;
use crate::error::Result;
use crate::session::ScanSession;
use crate::transport::AdapterState;

pub struct DiscoveryScreen {
    session: Arc<ScanSession>,
    labels: UiConfig,
}

/// Everything a renderer needs to draw the screen
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ScreenModel {
    pub button_label: String,
    pub scanning: bool,
    pub adapter_state: AdapterState,
    pub heading: String,
    pub device_labels: Vec<String>,
}

impl DiscoveryScreen {
    pub fn new(session: Arc<ScanSession>, labels: UiConfig) -> Self {
        Self { session, labels }
    }

    pub fn session(&self) -> &Arc<ScanSession> {
        &self.session
    }

    pub fn render(&self) -> ScreenModel {
        let scanning = self.session.is_scanning();
        let button_label = if scanning {
            &self.labels.stop_label
        } else {
            &self.labels.start_label
        };

        let device_labels = self
            .session
            .snapshot()
            .iter()
            .map(|device| device.display_name(&self.labels.placeholder_name).to_string())
            .collect();

        ScreenModel {
            button_label: button_label.clone(),
            scanning,
            adapter_state: self.session.adapter_state(),
            heading: self.labels.heading.clone(),
            device_labels,
        }
    }

    /// Handle a press of the start/stop button
    pub async fn press(&self) -> Result<()> {
        if self.session.is_scanning() {
            self.session.stop().await;
            Ok(())
        } else {
            self.session.start().await
        }
    }
}

impl fmt::Display for ScreenModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "[ {} ]   (Bluetooth: {})", self.button_label, self.adapter_state)?;
        writeln!(f, "{}", self.heading)?;
        for label in &self.device_labels {
            writeln!(f, "  {}", label)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mobile::ImplicitPermissionGate;
    use crate::transport::{DiscoveredDevice, MockBleStack};
    use crate::ui::alerts::RecordingAlerts;
    use std::time::Duration;
    use tokio::sync::watch;

    fn screen(stack: &Arc<MockBleStack>) -> DiscoveryScreen {
        let (_tx, adapter) = watch::channel(AdapterState::PoweredOn);
        let session = ScanSession::new(
            stack.clone(),
            Arc::new(ImplicitPermissionGate),
            Arc::new(RecordingAlerts::new()),
            adapter,
        );
        DiscoveryScreen::new(Arc::new(session), UiConfig::default())
    }

    #[tokio::test]
    async fn test_button_label_follows_state() {
        let stack = Arc::new(MockBleStack::powered_on());
        let screen = screen(&stack);
        assert_eq!(screen.render().button_label, "Start Scan");

        screen.press().await.unwrap();
        let model = screen.render();
        assert_eq!(model.button_label, "Stop Scan");
        assert!(model.scanning);

        screen.press().await.unwrap();
        assert_eq!(screen.render().button_label, "Start Scan");
        assert_eq!(stack.stop_calls(), 1);
    }

    #[tokio::test]
    async fn test_unnamed_devices_use_placeholder() {
        let stack = Arc::new(MockBleStack::powered_on());
        let screen = screen(&stack);
        let mut revisions = screen.session().subscribe();

        screen.press().await.unwrap();
        stack.emit_device(DiscoveredDevice::new("A", Some("Phone")));
        stack.emit_device(DiscoveredDevice::new("B", None));

        tokio::time::timeout(Duration::from_secs(1), async {
            while screen.session().device_count() < 2 {
                revisions.changed().await.unwrap();
            }
        })
        .await
        .unwrap();

        let model = screen.render();
        assert_eq!(model.heading, "Devices:");
        assert_eq!(model.device_labels, vec!["Phone", "Unknown Device"]);
        assert_eq!(
            model.to_string(),
            "[ Stop Scan ]   (Bluetooth: PoweredOn)\nDevices:\n  Phone\n  Unknown Device\n"
        );
    }
}
