//! # Handsign Sync
//!
//! Client-side sync engine for best-of-five rock-paper-scissors matches held
//! by a ledger smart contract. Mirrors the contract's view of one match by
//! polling, and applies the local player's commands optimistically.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                       HANDSIGN SYNC                          │
//! ├─────────────────────────────────────────────────────────────┤
//! │  core/           - Stateless helpers                         │
//! │  ├── locator.rs  - Match identity and join links             │
//! │  └── height.rs   - Block height to seconds                   │
//! │                                                              │
//! │  game/           - Match model (pure)                        │
//! │  ├── state.rs    - Match entity and enums                    │
//! │  ├── archive.rs  - Concluded rounds                          │
//! │  └── reconcile.rs- Snapshot -> Update -> Match               │
//! │                                                              │
//! │  ledger/         - Chain access (non-deterministic)          │
//! │  ├── client.rs   - LedgerClient capability                   │
//! │  ├── msg.rs      - Query/execute messages                    │
//! │  ├── error.rs    - Remote error taxonomy                     │
//! │  └── sim.rs      - In-process contract                       │
//! │                                                              │
//! │  store/          - Durable match slot + migration            │
//! │                                                              │
//! │  sync/           - Runtime                                   │
//! │  ├── actor.rs    - Single-writer match slot                  │
//! │  ├── poller.rs   - Reconciliation loop                       │
//! │  ├── executor.rs - Optimistic commands                       │
//! │  └── session.rs  - Wiring                                    │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Authority
//!
//! The contract is the source of truth. Only the poller confirms, advances
//! or corrects a match; commands may set `last_handsign` ahead of it and
//! nothing else. `stage`, `round`, `wins` and `losses` never move backwards.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(unsafe_code)]

pub mod config;
pub mod core;
pub mod game;
pub mod ledger;
pub mod store;
pub mod sync;

// Re-export commonly used types
pub use config::SyncConfig;
pub use core::locator::Locator;
pub use game::state::{Handsign, Match, PlayerSlot, Stage, Visibility};
pub use ledger::client::LedgerClient;
pub use sync::{CommandError, CommandExecutor, MatchHandle, SyncEvent, SyncSession};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Wins that end a match.
pub const WINS_TO_FINISH: u8 = 3;

/// Default poll period (ms)
pub const POLL_INTERVAL_MS: u64 = 2000;
