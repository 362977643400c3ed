//! Sync Layer
//!
//! Runtime half of the engine: the match actor owning the slot, the poller
//! feeding it observations, and the executor feeding it intents.
//!
//! - `actor`: single-writer match slot
//! - `poller`: periodic reconcile loop
//! - `executor`: optimistic commands
//! - `events`: discrete notifications
//! - `session`: wiring for one client identity
//! - `error`: user-facing command failures

pub mod actor;
pub mod error;
pub mod events;
pub mod executor;
pub mod poller;
pub mod session;

pub use actor::{Intent, MatchActor, MatchHandle, Observation};
pub use error::CommandError;
pub use events::{events_between, SyncEvent};
pub use executor::CommandExecutor;
pub use poller::Poller;
pub use session::SyncSession;
