//! Application state and wiring
//!
//! Creates the Bluetooth stack once and hands it to the adapter monitor, the
//! permission gate and the scan session.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;

use blescan::mobile::gate_for_platform;
use blescan::session::{AdapterMonitor, ScanSession};
use blescan::transport::{AdapterState, BleStack, MockBleStack};
use blescan::ui::cli::{TerminalInput, TerminalPrompt};
use blescan::ui::{ConsoleAlerts, DiscoveryScreen};
use blescan::{Config, Result};

/// Interval between simulated advertisements
const SIMULATED_ADVERTISING_INTERVAL: Duration = Duration::from_millis(400);

pub struct ScannerApp {
    pub config: Config,
    monitor: AdapterMonitor,
    screen: DiscoveryScreen,
    input: Arc<TerminalInput>,
    simulator: Option<JoinHandle<()>>,
}

impl ScannerApp {
    pub async fn new(config: Config, simulate: bool) -> Result<Self> {
        let input = TerminalInput::spawn();

        let (stack, simulator): (Arc<dyn BleStack>, Option<JoinHandle<()>>) = if simulate {
            log::info!("Using simulated Bluetooth stack");
            let mock = Arc::new(MockBleStack::powered_on());
            let simulator = mock.spawn_advertisers(
                MockBleStack::sample_devices(),
                SIMULATED_ADVERTISING_INTERVAL,
            );
            (mock, Some(simulator))
        } else {
            (Self::hardware_stack().await?, None)
        };

        let monitor =
            AdapterMonitor::subscribe(stack.as_ref(), config.scan.emit_current_state).await?;

        let gate = gate_for_platform(
            config.platform,
            Arc::clone(&stack),
            Arc::new(TerminalPrompt::new(Arc::clone(&input))),
            config.permission.clone(),
        );

        let session = ScanSession::new(stack, gate, Arc::new(ConsoleAlerts), monitor.watch())
            .with_filter(config.scan.filter());
        let screen = DiscoveryScreen::new(Arc::new(session), config.ui.clone());

        log::debug!("Scanner initialised for {:?}", config.platform);

        Ok(Self {
            config,
            monitor,
            screen,
            input,
            simulator,
        })
    }

    #[cfg(feature = "bluetooth")]
    async fn hardware_stack() -> Result<Arc<dyn BleStack>> {
        let stack = blescan::transport::BtleplugStack::new().await?;
        Ok(Arc::new(stack))
    }

    #[cfg(not(feature = "bluetooth"))]
    async fn hardware_stack() -> Result<Arc<dyn BleStack>> {
        Err(blescan::Error::AdapterUnavailable(
            "built without the `bluetooth` feature; rerun with --simulate".to_string(),
        ))
    }

    pub fn screen(&self) -> &DiscoveryScreen {
        &self.screen
    }

    pub fn monitor(&self) -> &AdapterMonitor {
        &self.monitor
    }

    pub fn input(&self) -> &TerminalInput {
        &self.input
    }

    /// Give the adapter a moment to report its first state
    pub async fn wait_for_adapter(&self) -> AdapterState {
        let state = self
            .monitor
            .settled(self.config.scan.adapter_settle_timeout)
            .await;
        log::debug!("Adapter state before scanning: {}", state);
        state
    }

    pub async fn shutdown(self) {
        self.screen.session().stop().await;
        if let Some(simulator) = self.simulator {
            simulator.abort();
        }
        self.monitor.remove();
        log::debug!("Scanner shut down");
    }
}
