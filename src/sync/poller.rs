//! Poller
//!
//! Fixed-period reconcile loop. Each tick reads the tracked match, takes one
//! remote snapshot, folds it with [`reconcile`] and hands the result to the
//! match actor as a sequenced observation.
//!
//! A failed or timed out query abandons the tick without touching state;
//! the next tick retries. Ticks that fall behind are skipped, never queued.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tokio::time::{interval, timeout, MissedTickBehavior};
use tracing::{debug, trace, warn};

use crate::config::SyncConfig;
use crate::game::reconcile::{reconcile, RemoteSnapshot, Update};
use crate::game::state::{Match, Stage};
use crate::ledger::client::{query_lobby, query_status, LedgerClient};
use crate::ledger::error::LedgerError;
use crate::sync::actor::{MatchHandle, Observation};

/// Floor on the poll period; `interval` rejects zero.
const MIN_POLL_INTERVAL: Duration = Duration::from_millis(1);

/// Periodic reconciler for one client identity.
pub struct Poller<C> {
    config: Arc<SyncConfig>,
    client: Arc<C>,
    handle: MatchHandle,
    seq: u64,
}

impl<C: LedgerClient> Poller<C> {
    /// Create a poller feeding `handle`.
    pub fn new(config: Arc<SyncConfig>, client: Arc<C>, handle: MatchHandle) -> Self {
        Self { config, client, handle, seq: 0 }
    }

    /// Run the loop until `shutdown` fires. An in-flight tick is abandoned.
    pub fn spawn(mut self, mut shutdown: broadcast::Receiver<()>) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker = interval(self.config.poll_interval.max(MIN_POLL_INTERVAL));
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

            loop {
                tokio::select! {
                    _ = ticker.tick() => {}
                    _ = shutdown.recv() => break,
                }

                tokio::select! {
                    result = self.poll_once() => {
                        if let Err(e) = result {
                            self.report(&e);
                        }
                    }
                    _ = shutdown.recv() => break,
                }
            }
            debug!("Poller stopped");
        })
    }

    /// One tick. Returns the update handed to the actor, which is empty when
    /// nothing changed or no live match is tracked.
    pub async fn poll_once(&mut self) -> Result<Update, LedgerError> {
        let Some(current) = self.handle.current() else {
            return Ok(Update::default());
        };
        if current.is_over() {
            return Ok(Update::default());
        }

        self.seq += 1;
        let seq = self.seq;
        let snapshot = self.snapshot(&current).await?;
        let update = reconcile(&current, &snapshot, &self.config.clock());
        trace!("Tick #{} for {:?}: {:?}", seq, current.locator, update);

        if !update.is_empty() {
            let observation = Observation { locator: current.locator, seq, update: update.clone() };
            if self.handle.observe(observation).await.is_err() {
                debug!("Match actor gone, dropping tick #{}", seq);
            }
        }
        Ok(update)
    }

    async fn snapshot(&self, current: &Match) -> Result<RemoteSnapshot, LedgerError> {
        let contract = current.contract_address.as_str();
        let client = self.client.as_ref();

        let lobby = if current.stage.in_lobby() || !current.player_slot.is_resolved() {
            let lobby = self.bounded(query_lobby(client, contract, current.locator)).await?;
            if !lobby.game_started {
                return Ok(RemoteSnapshot::lobby_only(lobby));
            }
            Some(lobby)
        } else {
            None
        };

        let game = self.bounded(query_status(client, contract, current.locator)).await?;
        let height = self.bounded(client.height()).await?;
        Ok(RemoteSnapshot::with_status(lobby, game, height))
    }

    async fn bounded<T>(&self, query: impl Future<Output = Result<T, LedgerError>>) -> Result<T, LedgerError> {
        bounded(self.config.query_timeout, query).await
    }

    fn report(&self, err: &LedgerError) {
        let creating = self.handle.current().is_some_and(|m| m.stage == Stage::Creating);
        if creating {
            // Creation may not have landed yet.
            debug!("Match not visible yet: {}", err);
        } else if err.is_transient() {
            debug!("Poll failed, retrying next tick: {}", err);
        } else {
            warn!("Poll failed: {}", err);
        }
    }
}

/// Run `query`, mapping expiry of `limit` to [`LedgerError::Timeout`].
pub async fn bounded<T>(
    limit: Duration,
    query: impl Future<Output = Result<T, LedgerError>>,
) -> Result<T, LedgerError> {
    timeout(limit, query).await.map_err(|_| LedgerError::Timeout)?
}
