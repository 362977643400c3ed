//! Match Actor
//!
//! Sole owner of the match slot. Commands send intents, the poller sends
//! observations, and both land in one serialized inbox, so no two writers
//! ever interleave on the slot.
//!
//! ```text
//! CommandExecutor ──Intent──┐
//!                           ├──> inbox ──> MatchActor ──> store
//! Poller ──Observation──────┘                  │
//!                                              ├──> watch<Option<Match>>
//!                                              └──> broadcast<SyncEvent>
//! ```

use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::sync::{broadcast, mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::core::locator::Locator;
use crate::game::reconcile::{apply_update, Update};
use crate::game::state::{Handsign, Match, Stage};
use crate::store::MatchStore;
use crate::sync::error::CommandError;
use crate::sync::events::{events_between, SyncEvent};

/// Inbox capacity.
const INBOX_CAPACITY: usize = 64;

/// Event channel capacity.
const EVENT_CAPACITY: usize = 64;

/// A command-side request to change the slot.
#[derive(Debug, Clone)]
pub enum Intent {
    /// Track a new match. Refused while another live match is tracked.
    Begin(Match),
    /// Move stage forward once the creation transaction is accepted.
    Settle {
        /// Match locator.
        locator: Locator,
        /// Stage to settle into.
        stage: Stage,
    },
    /// Optimistically record a move.
    LockHandsign {
        /// Match locator.
        locator: Locator,
        /// The move.
        handsign: Handsign,
    },
    /// Undo a failed [`Intent::LockHandsign`].
    RollbackHandsign {
        /// Match locator.
        locator: Locator,
        /// The move being undone.
        handsign: Handsign,
    },
    /// Drop the match locally.
    Discard {
        /// Match locator.
        locator: Locator,
    },
    /// User asked to leave.
    Leave {
        /// Wall clock at request time.
        now: DateTime<Utc>,
        /// Minimum age before a Creating/Lobby match may be abandoned.
        min_age: Duration,
    },
}

/// A poller-side reconciliation result.
#[derive(Debug, Clone)]
pub struct Observation {
    /// Match the snapshot was taken for.
    pub locator: Locator,
    /// Poller sequence number, strictly increasing.
    pub seq: u64,
    /// Fields to overlay.
    pub update: Update,
}

type Reply = oneshot::Sender<Result<Option<Match>, CommandError>>;

enum Inbox {
    Intent(Intent, Reply),
    Observe(Observation),
}

// =============================================================================
// HANDLE
// =============================================================================

/// Cloneable front door to the actor.
#[derive(Clone)]
pub struct MatchHandle {
    inbox: mpsc::Sender<Inbox>,
    state: watch::Receiver<Option<Match>>,
    events: broadcast::Sender<SyncEvent>,
}

impl MatchHandle {
    /// Latest published match.
    pub fn current(&self) -> Option<Match> {
        self.state.borrow().clone()
    }

    /// Watch the match slot.
    pub fn subscribe(&self) -> watch::Receiver<Option<Match>> {
        self.state.clone()
    }

    /// Subscribe to discrete notifications.
    pub fn events(&self) -> broadcast::Receiver<SyncEvent> {
        self.events.subscribe()
    }

    /// Submit an intent and wait for the resulting slot contents.
    pub async fn intent(&self, intent: Intent) -> Result<Option<Match>, CommandError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.inbox
            .send(Inbox::Intent(intent, reply_tx))
            .await
            .map_err(|_| CommandError::Closed)?;
        reply_rx.await.map_err(|_| CommandError::Closed)?
    }

    /// Deliver an observation. Fails only once the actor is gone.
    pub async fn observe(&self, observation: Observation) -> Result<(), CommandError> {
        self.inbox
            .send(Inbox::Observe(observation))
            .await
            .map_err(|_| CommandError::Closed)
    }
}

// =============================================================================
// ACTOR
// =============================================================================

/// Owner of the match slot.
pub struct MatchActor<S> {
    slot: Option<Match>,
    store: S,
    last_seq: u64,
    inbox: mpsc::Receiver<Inbox>,
    state_tx: watch::Sender<Option<Match>>,
    events_tx: broadcast::Sender<SyncEvent>,
}

impl<S: MatchStore> MatchActor<S> {
    /// Spawn the actor with the slot contents loaded at startup.
    pub fn spawn(
        initial: Option<Match>,
        store: S,
        mut shutdown: broadcast::Receiver<()>,
    ) -> (MatchHandle, JoinHandle<()>) {
        let (inbox_tx, inbox_rx) = mpsc::channel(INBOX_CAPACITY);
        let (state_tx, state_rx) = watch::channel(initial.clone());
        let (events_tx, _) = broadcast::channel(EVENT_CAPACITY);

        let handle = MatchHandle { inbox: inbox_tx, state: state_rx, events: events_tx.clone() };
        let mut actor = MatchActor { slot: initial, store, last_seq: 0, inbox: inbox_rx, state_tx, events_tx };

        let task = tokio::spawn(async move {
            loop {
                tokio::select! {
                    msg = actor.inbox.recv() => match msg {
                        Some(Inbox::Intent(intent, reply)) => {
                            let result = actor.handle_intent(intent);
                            let _ = reply.send(result);
                        }
                        Some(Inbox::Observe(observation)) => actor.handle_observation(observation),
                        None => break,
                    },
                    _ = shutdown.recv() => break,
                }
            }
            debug!("Match actor stopped");
        });

        (handle, task)
    }

    fn handle_observation(&mut self, observation: Observation) {
        let Some(current) = &self.slot else {
            debug!("Dropping observation, no match tracked");
            return;
        };
        if current.locator != observation.locator {
            debug!("Dropping observation for {:?}, tracking {:?}", observation.locator, current.locator);
            return;
        }
        if observation.seq <= self.last_seq {
            warn!("Dropping stale observation #{} (last applied #{})", observation.seq, self.last_seq);
            return;
        }

        self.last_seq = observation.seq;
        let next = apply_update(current, &observation.update);
        self.publish(next);
    }

    fn handle_intent(&mut self, intent: Intent) -> Result<Option<Match>, CommandError> {
        match intent {
            Intent::Begin(m) => {
                if self.slot.as_ref().is_some_and(|live| !live.is_over()) {
                    return Err(CommandError::MatchInProgress);
                }
                self.store.store(&m).map_err(|e| CommandError::Store(e.to_string()))?;
                info!("Tracking match {:?} ({:?}, {:?})", m.locator, m.visibility, m.player_slot);
                self.last_seq = 0;
                self.slot = Some(m);
                self.state_tx.send_replace(self.slot.clone());
            }
            Intent::Settle { locator, stage } => {
                let mut next = self.tracked(&locator)?.clone();
                next.stage = next.stage.max(stage);
                self.publish(next);
            }
            Intent::LockHandsign { locator, handsign } => {
                let current = self.tracked(&locator)?;
                if current.stage != Stage::GameOn {
                    return Err(CommandError::NoActiveMatch);
                }
                if !current.can_play() {
                    return Err(CommandError::AlreadyPlayed);
                }
                let mut next = current.clone();
                next.last_handsign = Some(handsign);
                self.publish(next);
            }
            Intent::RollbackHandsign { locator, handsign } => {
                let current = self.tracked(&locator)?;
                if current.last_handsign == Some(handsign) {
                    let mut next = current.clone();
                    next.last_handsign = None;
                    self.publish(next);
                }
            }
            Intent::Discard { locator } => {
                self.tracked(&locator)?;
                self.clear(locator);
            }
            Intent::Leave { now, min_age } => {
                let current = self.slot.as_ref().ok_or(CommandError::NoActiveMatch)?;
                match current.stage {
                    Stage::Over => {}
                    Stage::GameOn => return Err(CommandError::MatchInProgress),
                    Stage::Creating | Stage::Lobby => {
                        let age = (now - current.created_at).to_std().unwrap_or_default();
                        if age < min_age {
                            return Err(CommandError::TooEarly(min_age - age));
                        }
                    }
                }
                let locator = current.locator;
                self.clear(locator);
            }
        }
        Ok(self.slot.clone())
    }

    fn tracked(&self, locator: &Locator) -> Result<&Match, CommandError> {
        self.slot
            .as_ref()
            .filter(|m| m.locator == *locator)
            .ok_or(CommandError::NoActiveMatch)
    }

    /// Replace the slot if `next` differs, persist, and notify.
    fn publish(&mut self, mut next: Match) {
        let Some(prev) = self.slot.take() else {
            return;
        };
        if prev == next {
            self.slot = Some(prev);
            return;
        }

        next.updated_at = Utc::now();
        if let Err(e) = self.store.store(&next) {
            warn!("Failed to persist match {:?}: {}", next.locator, e);
        }
        if prev.stage != next.stage {
            info!("Match {:?}: {:?} -> {:?}", next.locator, prev.stage, next.stage);
        }
        for event in events_between(&prev, &next) {
            let _ = self.events_tx.send(event);
        }

        self.slot = Some(next);
        self.state_tx.send_replace(self.slot.clone());
    }

    fn clear(&mut self, locator: Locator) {
        if let Err(e) = self.store.clear() {
            warn!("Failed to clear stored match: {}", e);
        }
        info!("Dropped match {:?}", locator);
        self.slot = None;
        self.last_seq = 0;
        let _ = self.events_tx.send(SyncEvent::Discarded { locator });
        self.state_tx.send_replace(None);
    }
}
