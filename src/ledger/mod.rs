//! Ledger Layer
//!
//! Everything that talks to the chain: message shapes, the client
//! capability, the error taxonomy, and an in-process simulator.
//! This layer is **non-deterministic**; all state folding runs through `game/`.

pub mod client;
pub mod error;
pub mod msg;
pub mod sim;

pub use client::{decode, query_lobby, query_status, LedgerClient};
pub use error::LedgerError;
pub use msg::{Coin, ExecuteMsg, GameLobbyResponse, GameStatusResponse, QueryMsg, TxReceipt};
pub use sim::{SimClient, SimulatedLedger, PLAYER_DEADLINE_BLOCKS};
