//! Contract Messages
//!
//! Wire format for queries and signed executes against the match contract.
//! Messages serialize externally tagged in snake_case, the contract's JSON
//! dialect: `{"game_status":{"locator":"..."}}`.

use serde::{Deserialize, Serialize};

use crate::core::locator::Locator;
use crate::game::state::Handsign;

// =============================================================================
// QUERIES
// =============================================================================

/// Read-only queries.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QueryMsg {
    /// Has the match started, and who is player one.
    GameLobby {
        /// Match locator.
        locator: Locator,
    },
    /// Round, counters, deadline.
    GameStatus {
        /// Match locator.
        locator: Locator,
    },
}

/// Response to [`QueryMsg::GameLobby`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameLobbyResponse {
    /// Both players are in.
    pub game_started: bool,
    /// The locator's owner is player one.
    pub player_one_is_locator_owner: bool,
}

/// Response to [`QueryMsg::GameStatus`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameStatusResponse {
    /// 1-based current round.
    pub round: u32,
    /// Player one committed this round.
    pub player1_played: bool,
    /// Player two committed this round.
    pub player2_played: bool,
    /// Player one win count.
    pub player1_wins: u8,
    /// Player two win count.
    pub player2_wins: u8,
    /// Absolute height at which the waiting side may claim inactivity.
    pub deadline: u64,
    /// Contract considers the match finished.
    pub game_over: bool,
}

// =============================================================================
// EXECUTES
// =============================================================================

/// Signed state-changing messages.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecuteMsg {
    /// Open a match reserved for holders of the locator.
    PrivateGame {
        /// Invite locator.
        locator: Locator,
    },
    /// Enter open matchmaking.
    JoinGame {
        /// This player's locator.
        locator: Locator,
    },
    /// Commit a move for the current round.
    PlayHand {
        /// Match locator.
        locator: Locator,
        /// The move.
        handsign: Handsign,
    },
    /// Win by forfeit once the opponent's grace deadline has passed.
    ClaimInactivity {
        /// Match locator.
        locator: Locator,
    },
}

impl ExecuteMsg {
    /// Message name for logs.
    pub fn name(&self) -> &'static str {
        match self {
            ExecuteMsg::PrivateGame { .. } => "private_game",
            ExecuteMsg::JoinGame { .. } => "join_game",
            ExecuteMsg::PlayHand { .. } => "play_hand",
            ExecuteMsg::ClaimInactivity { .. } => "claim_inactivity",
        }
    }

    /// Locator the message targets.
    pub fn locator(&self) -> &Locator {
        match self {
            ExecuteMsg::PrivateGame { locator }
            | ExecuteMsg::JoinGame { locator }
            | ExecuteMsg::PlayHand { locator, .. }
            | ExecuteMsg::ClaimInactivity { locator } => locator,
        }
    }
}

/// Funds attached to an execute.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Coin {
    /// Amount in the smallest denomination.
    pub amount: u128,
    /// Denomination.
    pub denom: String,
}

impl Coin {
    /// Create a coin.
    pub fn new(amount: u128, denom: impl Into<String>) -> Self {
        Self { amount, denom: denom.into() }
    }
}

/// Receipt of an accepted transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TxReceipt {
    /// Transaction hash (hex).
    pub tx_hash: String,
    /// Height the transaction landed at.
    pub height: u64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_query_wire_shape() {
        let locator = Locator::new([2; 32]);
        let value = serde_json::to_value(QueryMsg::GameLobby { locator }).unwrap();
        assert_eq!(value, json!({ "game_lobby": { "locator": "02".repeat(32) } }));
    }

    #[test]
    fn test_execute_wire_shape() {
        let locator = Locator::new([3; 32]);
        let msg = ExecuteMsg::PlayHand { locator, handsign: Handsign::Paper };
        let value = serde_json::to_value(&msg).unwrap();
        assert_eq!(
            value,
            json!({ "play_hand": { "locator": "03".repeat(32), "handsign": "PAPER" } })
        );
        assert_eq!(msg.name(), "play_hand");
        assert_eq!(msg.locator(), &locator);
    }

    #[test]
    fn test_status_requires_every_field() {
        let partial = json!({ "round": 1, "player1_played": false });
        assert!(serde_json::from_value::<GameStatusResponse>(partial).is_err());
    }
}
