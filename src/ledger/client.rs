//! Ledger Client Capability
//!
//! The one seam between the sync engine and a chain. Wallet handling,
//! signing and transport live behind it; the engine only queries, executes
//! and asks for the current height.

use std::future::Future;

use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::core::locator::Locator;
use crate::ledger::error::LedgerError;
use crate::ledger::msg::{Coin, ExecuteMsg, GameLobbyResponse, GameStatusResponse, QueryMsg, TxReceipt};

/// A signing and querying client bound to one wallet identity.
pub trait LedgerClient: Send + Sync + 'static {
    /// Run a smart query and return the raw JSON response.
    fn query(
        &self,
        contract: &str,
        msg: &QueryMsg,
    ) -> impl Future<Output = Result<Value, LedgerError>> + Send;

    /// Sign and broadcast an execute message with attached funds.
    fn execute(
        &self,
        contract: &str,
        msg: &ExecuteMsg,
        funds: &[Coin],
    ) -> impl Future<Output = Result<TxReceipt, LedgerError>> + Send;

    /// Current block height.
    fn height(&self) -> impl Future<Output = Result<u64, LedgerError>> + Send;
}

/// Decode a raw response into a typed one, rejecting partial shapes.
pub fn decode<T: DeserializeOwned>(raw: Value) -> Result<T, LedgerError> {
    serde_json::from_value(raw).map_err(LedgerError::from)
}

/// `game_lobby` for `locator`.
pub async fn query_lobby<C: LedgerClient>(
    client: &C,
    contract: &str,
    locator: Locator,
) -> Result<GameLobbyResponse, LedgerError> {
    let raw = client.query(contract, &QueryMsg::GameLobby { locator }).await?;
    decode(raw)
}

/// `game_status` for `locator`.
pub async fn query_status<C: LedgerClient>(
    client: &C,
    contract: &str,
    locator: Locator,
) -> Result<GameStatusResponse, LedgerError> {
    let raw = client.query(contract, &QueryMsg::GameStatus { locator }).await?;
    decode(raw)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_decode_lobby() {
        let lobby: GameLobbyResponse =
            decode(json!({ "game_started": true, "player_one_is_locator_owner": false })).unwrap();
        assert!(lobby.game_started);
        assert!(!lobby.player_one_is_locator_owner);
    }

    #[test]
    fn test_decode_rejects_wrong_type() {
        let result: Result<GameLobbyResponse, _> =
            decode(json!({ "game_started": "yes", "player_one_is_locator_owner": false }));
        assert!(matches!(result, Err(LedgerError::Decode(_))));
    }

    #[test]
    fn test_decode_rejects_negative_counter() {
        let result: Result<GameStatusResponse, _> = decode(json!({
            "round": 1,
            "player1_played": false,
            "player2_played": false,
            "player1_wins": -1,
            "player2_wins": 0,
            "deadline": 10,
            "game_over": false,
        }));
        assert!(matches!(result, Err(LedgerError::Decode(_))));
    }
}
