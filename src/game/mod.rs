//! Match Model
//!
//! The locally held match and everything that folds remote state into it.
//! Pure: no I/O, no clocks other than values passed in.
//!
//! ## Module Structure
//!
//! - `state`: Match entity, stage, slot and handsign enums
//! - `archive`: Concluded rounds, write-once per index
//! - `reconcile`: Snapshot to update, update onto match

pub mod archive;
pub mod reconcile;
pub mod state;

// Re-export key types
pub use archive::{Round, RoundArchive, RoundResult};
pub use reconcile::{apply_update, reconcile, Countdown, RemoteSnapshot, StatusSnapshot, Update};
pub use state::{Handsign, Match, PlayerSlot, Stage, Visibility};
