//! Background application of store change events.

use std::sync::Arc;

use tokio::sync::{broadcast, mpsc};
use tokio::task::JoinHandle;

use crate::manager::ConfigManager;
use crate::store::ChangeEvent;

/// Applies change events to a [`ConfigManager`] one at a time, in arrival
/// order, on the blocking pool.
pub struct ChangeWorker {
    manager: Arc<ConfigManager>,
    rx: mpsc::UnboundedReceiver<ChangeEvent>,
}

impl ChangeWorker {
    pub fn new(manager: Arc<ConfigManager>, rx: mpsc::UnboundedReceiver<ChangeEvent>) -> Self {
        Self { manager, rx }
    }

    /// Run until shutdown is signalled or every sender is gone.
    pub async fn run(mut self, mut shutdown: broadcast::Receiver<()>) {
        tracing::info!("configuration change worker starting");
        loop {
            tokio::select! {
                event = self.rx.recv() => {
                    let Some(event) = event else {
                        tracing::debug!("change feed closed");
                        break;
                    };
                    let manager = Arc::clone(&self.manager);
                    let applied = tokio::task::spawn_blocking(move || manager.handle_event(&event)).await;
                    if let Err(e) = applied {
                        tracing::error!(error = %e, "configuration change task failed");
                    }
                }
                _ = shutdown.recv() => {
                    tracing::info!("configuration change worker received shutdown signal, exiting loop");
                    break;
                }
            }
        }
    }

    /// Spawn [`ChangeWorker::run`] on the current runtime.
    pub fn spawn(self, shutdown: broadcast::Receiver<()>) -> JoinHandle<()> {
        tokio::spawn(self.run(shutdown))
    }
}
