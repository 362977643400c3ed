//! Sync Session
//!
//! Wires one client identity to one durable slot: loads the stored match,
//! spawns the actor and the poller, and hands out the executor.

use std::sync::Arc;

use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tracing::{info, warn};

use crate::config::SyncConfig;
use crate::ledger::client::LedgerClient;
use crate::store::MatchStore;
use crate::sync::actor::{MatchActor, MatchHandle};
use crate::sync::executor::CommandExecutor;
use crate::sync::poller::Poller;

/// A running sync engine.
pub struct SyncSession<C> {
    handle: MatchHandle,
    executor: CommandExecutor<C>,
    shutdown_tx: broadcast::Sender<()>,
    tasks: Vec<JoinHandle<()>>,
}

impl<C: LedgerClient> SyncSession<C> {
    /// Resume from `store` and start polling.
    ///
    /// A stored record that cannot be read or migrated is dropped; the user
    /// starts over rather than the engine failing to start.
    pub fn start<S: MatchStore>(config: Arc<SyncConfig>, client: Arc<C>, store: S) -> Self {
        let initial = match store.load() {
            Ok(initial) => initial,
            Err(e) => {
                warn!("Discarding unreadable stored match: {}", e);
                if let Err(e) = store.clear() {
                    warn!("Failed to clear stored match: {}", e);
                }
                None
            }
        };
        if let Some(m) = &initial {
            info!("Resuming match {:?} in {:?}", m.locator, m.stage);
        }

        let (shutdown_tx, _) = broadcast::channel(1);
        let (handle, actor_task) = MatchActor::spawn(initial, store, shutdown_tx.subscribe());
        let poller_task =
            Poller::new(config.clone(), client.clone(), handle.clone()).spawn(shutdown_tx.subscribe());
        let executor = CommandExecutor::new(config, client, handle.clone());

        Self { handle, executor, shutdown_tx, tasks: vec![actor_task, poller_task] }
    }

    /// Read side: current match, watch channel and events.
    pub fn handle(&self) -> &MatchHandle {
        &self.handle
    }

    /// Write side.
    pub fn executor(&self) -> &CommandExecutor<C> {
        &self.executor
    }

    /// Stop polling and the actor, abandoning any in-flight query.
    pub async fn shutdown(self) {
        let _ = self.shutdown_tx.send(());
        for task in self.tasks {
            if let Err(e) = task.await {
                warn!("Sync task ended abnormally: {}", e);
            }
        }
        info!("Sync session stopped");
    }
}
