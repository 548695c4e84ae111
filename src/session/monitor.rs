//! Adapter state monitor
//!
//! Keeps the latest adapter power state reported by the stack. The state is
//! push-based: if the stack stops reporting, the last value simply goes stale.

use std::time::Duration;

use futures::StreamExt;
use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::error::Result;
use crate::transport::{AdapterState, BleStack};

pub struct AdapterMonitor {
    state: watch::Receiver<AdapterState>,
    task: Option<JoinHandle<()>>,
}

impl AdapterMonitor {
    /// Subscribe to the stack's state notifications. With `emit_current` the
    /// current state is delivered right away instead of on the next change.
    pub async fn subscribe(stack: &dyn BleStack, emit_current: bool) -> Result<Self> {
        let mut updates = stack.subscribe_state(emit_current).await?;
        let (sender, receiver) = watch::channel(AdapterState::Unknown);

        let task = tokio::spawn(async move {
            while let Some(state) = updates.next().await {
                let previous = sender.send_replace(state);
                if previous != state {
                    log::info!("Bluetooth adapter state: {} -> {}", previous, state);
                }
            }
            log::debug!("Adapter state stream ended");
        });

        Ok(Self {
            state: receiver,
            task: Some(task),
        })
    }

    pub fn current(&self) -> AdapterState {
        *self.state.borrow()
    }

    /// A receiver that observes every state change
    pub fn watch(&self) -> watch::Receiver<AdapterState> {
        self.state.clone()
    }

    /// Wait until the adapter reports something other than `Unknown`, at most
    /// `timeout`. Returns the state known at that point.
    pub async fn settled(&self, timeout: Duration) -> AdapterState {
        let mut state = self.state.clone();
        let wait = state.wait_for(|s| *s != AdapterState::Unknown);
        let settled = match tokio::time::timeout(timeout, wait).await {
            Ok(Ok(settled)) => *settled,
            _ => self.current(),
        };
        settled
    }

    /// Release the subscription
    pub fn remove(mut self) {
        self.release();
    }

    fn release(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
            log::debug!("Adapter state subscription removed");
        }
    }
}

impl Drop for AdapterMonitor {
    fn drop(&mut self) {
        self.release();
    }
}
