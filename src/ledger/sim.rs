//! Simulated Ledger
//!
//! An in-process stand-in for the match contract and the chain it runs on.
//! Drives the demo binary and the async tests. Hands are stored in the
//! clear here; secrecy is the real contract's job.

use std::collections::{BTreeMap, VecDeque};
use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use serde_json::Value;
use sha2::{Digest, Sha256};
use tracing::debug;

use crate::core::locator::Locator;
use crate::game::state::Handsign;
use crate::ledger::client::LedgerClient;
use crate::ledger::error::LedgerError;
use crate::ledger::msg::{Coin, ExecuteMsg, GameLobbyResponse, GameStatusResponse, QueryMsg, TxReceipt};
use crate::WINS_TO_FINISH;

/// Blocks after the last play before the waiting side may claim inactivity.
pub const PLAYER_DEADLINE_BLOCKS: u64 = 20;

type Key = [u8; 32];

fn key_of(locator: &Locator) -> Key {
    let mut hasher = Sha256::new();
    hasher.update(b"rps-locator:");
    hasher.update(locator.as_bytes());
    hasher.finalize().into()
}

#[derive(Debug, Clone)]
enum LobbyEntry {
    Waiting { owner: String, private: bool },
    Matched { game: Key, owner_is_p1: bool },
}

#[derive(Debug, Clone)]
struct SimGame {
    player1: String,
    player2: String,
    round: u32,
    player1_hand: Option<Handsign>,
    player2_hand: Option<Handsign>,
    player1_wins: u8,
    player2_wins: u8,
    last_play_height: u64,
    game_over: bool,
}

impl SimGame {
    fn new(player1: String, player2: String, height: u64) -> Self {
        Self {
            player1,
            player2,
            round: 1,
            player1_hand: None,
            player2_hand: None,
            player1_wins: 0,
            player2_wins: 0,
            last_play_height: height,
            game_over: false,
        }
    }

    fn deadline(&self) -> u64 {
        self.last_play_height + PLAYER_DEADLINE_BLOCKS
    }

    fn status(&self) -> GameStatusResponse {
        GameStatusResponse {
            round: self.round,
            player1_played: self.player1_hand.is_some(),
            player2_played: self.player2_hand.is_some(),
            player1_wins: self.player1_wins,
            player2_wins: self.player2_wins,
            deadline: self.deadline(),
            game_over: self.game_over,
        }
    }

    fn resolve_round(&mut self) {
        let (Some(a), Some(b)) = (self.player1_hand, self.player2_hand) else {
            return;
        };
        if a.beats(b) {
            self.player1_wins += 1;
        } else if b.beats(a) {
            self.player2_wins += 1;
        }
        self.round += 1;
        self.player1_hand = None;
        self.player2_hand = None;
        if self.player1_wins >= WINS_TO_FINISH || self.player2_wins >= WINS_TO_FINISH {
            self.game_over = true;
        }
    }
}

#[derive(Debug)]
struct SimState {
    contract: String,
    stake: Coin,
    height: u64,
    nonce: u64,
    latency: Duration,
    lobbies: BTreeMap<Key, LobbyEntry>,
    games: BTreeMap<Key, SimGame>,
    open_lobby: Option<Key>,
    query_faults: VecDeque<LedgerError>,
    execute_faults: VecDeque<LedgerError>,
}

fn rejected(reason: &str) -> LedgerError {
    LedgerError::TxRejected(format!("failed to execute message: {reason}"))
}

impl SimState {
    fn game_for(&self, locator: &Locator) -> Result<(Key, &SimGame), LedgerError> {
        match self.lobbies.get(&key_of(locator)) {
            Some(LobbyEntry::Matched { game, .. }) => self
                .games
                .get(game)
                .map(|g| (*game, g))
                .ok_or_else(|| LedgerError::Other("game not found".into())),
            Some(LobbyEntry::Waiting { .. }) => Err(LedgerError::Other("game not started".into())),
            None => Err(LedgerError::Other("game not found".into())),
        }
    }

    fn query(&mut self, contract: &str, msg: &QueryMsg) -> Result<Value, LedgerError> {
        if let Some(fault) = self.query_faults.pop_front() {
            return Err(fault);
        }
        if contract != self.contract {
            return Err(LedgerError::Other(format!("contract {contract} not found")));
        }

        match msg {
            QueryMsg::GameLobby { locator } => {
                let response = match self.lobbies.get(&key_of(locator)) {
                    Some(LobbyEntry::Waiting { .. }) => GameLobbyResponse {
                        game_started: false,
                        player_one_is_locator_owner: false,
                    },
                    Some(LobbyEntry::Matched { owner_is_p1, .. }) => GameLobbyResponse {
                        game_started: true,
                        player_one_is_locator_owner: *owner_is_p1,
                    },
                    None => return Err(LedgerError::Other("game not found".into())),
                };
                Ok(serde_json::to_value(response)?)
            }
            QueryMsg::GameStatus { locator } => {
                let (_, game) = self.game_for(locator)?;
                Ok(serde_json::to_value(game.status())?)
            }
        }
    }

    fn execute(&mut self, sender: &str, contract: &str, msg: &ExecuteMsg, funds: &[Coin]) -> Result<TxReceipt, LedgerError> {
        let fault = self.execute_faults.pop_front();
        if let Some(fault) = &fault {
            if !fault.is_benign() {
                return Err(fault.clone());
            }
        }
        if contract != self.contract {
            return Err(rejected("contract not found"));
        }

        match msg {
            ExecuteMsg::PrivateGame { locator } => {
                self.require_stake(funds)?;
                self.private_game(sender, locator)?;
            }
            ExecuteMsg::JoinGame { locator } => {
                self.require_stake(funds)?;
                self.join_game(sender, locator)?;
            }
            ExecuteMsg::PlayHand { locator, handsign } => self.play_hand(sender, locator, *handsign)?,
            ExecuteMsg::ClaimInactivity { locator } => self.claim_inactivity(sender, locator)?,
        }

        let receipt = self.receipt(sender, msg);
        debug!("sim: {} by {} landed at height {}", msg.name(), sender, receipt.height);
        self.height += 1;

        match fault {
            Some(benign) => Err(benign),
            None => Ok(receipt),
        }
    }

    fn require_stake(&self, funds: &[Coin]) -> Result<(), LedgerError> {
        let paid = funds
            .iter()
            .filter(|c| c.denom == self.stake.denom)
            .map(|c| c.amount)
            .sum::<u128>();
        if paid < self.stake.amount {
            return Err(LedgerError::TxRejected("insufficient funds for entry stake".into()));
        }
        Ok(())
    }

    fn private_game(&mut self, sender: &str, locator: &Locator) -> Result<(), LedgerError> {
        let key = key_of(locator);
        match self.lobbies.get(&key).cloned() {
            None => {
                self.lobbies.insert(key, LobbyEntry::Waiting { owner: sender.to_string(), private: true });
                Ok(())
            }
            Some(LobbyEntry::Waiting { owner, private: true }) if owner != sender => {
                self.games.insert(key, SimGame::new(owner, sender.to_string(), self.height));
                self.lobbies.insert(key, LobbyEntry::Matched { game: key, owner_is_p1: true });
                Ok(())
            }
            Some(LobbyEntry::Waiting { .. }) => Err(rejected("already waiting")),
            Some(LobbyEntry::Matched { .. }) => Err(rejected("game already started")),
        }
    }

    fn join_game(&mut self, sender: &str, locator: &Locator) -> Result<(), LedgerError> {
        let key = key_of(locator);
        if self.lobbies.contains_key(&key) {
            return Err(rejected("locator already used"));
        }

        let waiting = self.open_lobby.and_then(|open| match self.lobbies.get(&open) {
            Some(LobbyEntry::Waiting { owner, private: false }) if owner != sender => Some((open, owner.clone())),
            _ => None,
        });

        match waiting {
            Some((open, owner)) => {
                self.games.insert(open, SimGame::new(owner, sender.to_string(), self.height));
                self.lobbies.insert(open, LobbyEntry::Matched { game: open, owner_is_p1: true });
                self.lobbies.insert(key, LobbyEntry::Matched { game: open, owner_is_p1: false });
                self.open_lobby = None;
            }
            None => {
                self.lobbies.insert(key, LobbyEntry::Waiting { owner: sender.to_string(), private: false });
                self.open_lobby = Some(key);
            }
        }
        Ok(())
    }

    fn play_hand(&mut self, sender: &str, locator: &Locator, handsign: Handsign) -> Result<(), LedgerError> {
        let (key, _) = self.game_for(locator).map_err(|_| rejected("game not found"))?;
        let height = self.height;
        let game = self.games.get_mut(&key).ok_or_else(|| rejected("game not found"))?;

        if game.game_over {
            return Err(rejected("game is over"));
        }
        let hand = if sender == game.player1 {
            &mut game.player1_hand
        } else if sender == game.player2 {
            &mut game.player2_hand
        } else {
            return Err(rejected("not a player"));
        };
        if hand.is_some() {
            return Err(rejected("already played this round"));
        }
        *hand = Some(handsign);
        game.last_play_height = height;
        game.resolve_round();
        Ok(())
    }

    fn claim_inactivity(&mut self, sender: &str, locator: &Locator) -> Result<(), LedgerError> {
        let (key, _) = self.game_for(locator).map_err(|_| rejected("game not found"))?;
        let height = self.height;
        let game = self.games.get_mut(&key).ok_or_else(|| rejected("game not found"))?;

        if game.game_over {
            return Err(rejected("game is over"));
        }
        let (mine, theirs, wins) = if sender == game.player1 {
            (game.player1_hand, game.player2_hand, &mut game.player1_wins)
        } else if sender == game.player2 {
            (game.player2_hand, game.player1_hand, &mut game.player2_wins)
        } else {
            return Err(rejected("not a player"));
        };
        if mine.is_none() || theirs.is_some() {
            return Err(rejected("nothing to claim"));
        }
        if height < game.last_play_height + PLAYER_DEADLINE_BLOCKS {
            return Err(rejected("deadline not reached"));
        }
        *wins = WINS_TO_FINISH;
        game.game_over = true;
        Ok(())
    }

    fn receipt(&mut self, sender: &str, msg: &ExecuteMsg) -> TxReceipt {
        self.nonce += 1;
        let mut hasher = Sha256::new();
        hasher.update(sender.as_bytes());
        hasher.update(serde_json::to_vec(msg).unwrap_or_default());
        hasher.update(self.nonce.to_be_bytes());
        TxReceipt { tx_hash: hex::encode(hasher.finalize()), height: self.height }
    }
}

// =============================================================================
// LEDGER
// =============================================================================

/// Shared simulated chain. Cheap to clone.
#[derive(Debug, Clone)]
pub struct SimulatedLedger {
    inner: Arc<Mutex<SimState>>,
}

impl SimulatedLedger {
    /// New chain hosting one match contract at `contract`.
    pub fn new(contract: impl Into<String>, stake: Coin) -> Self {
        Self {
            inner: Arc::new(Mutex::new(SimState {
                contract: contract.into(),
                stake,
                height: 1,
                nonce: 0,
                latency: Duration::ZERO,
                lobbies: BTreeMap::new(),
                games: BTreeMap::new(),
                open_lobby: None,
                query_faults: VecDeque::new(),
                execute_faults: VecDeque::new(),
            })),
        }
    }

    fn state(&self) -> MutexGuard<'_, SimState> {
        match self.inner.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    /// A client signing as `address`.
    pub fn client(&self, address: impl Into<String>) -> SimClient {
        SimClient { ledger: self.clone(), address: address.into() }
    }

    /// Current height.
    pub fn height(&self) -> u64 {
        self.state().height
    }

    /// Produce `blocks` empty blocks.
    pub fn advance_blocks(&self, blocks: u64) {
        self.state().height += blocks;
    }

    /// Delay every response by `latency`.
    pub fn set_latency(&self, latency: Duration) {
        self.state().latency = latency;
    }

    /// Make the next query fail with `err`.
    pub fn fail_next_query(&self, err: LedgerError) {
        self.state().query_faults.push_back(err);
    }

    /// Make the next execute fail with `err`.
    ///
    /// A benign receipt error still applies the transaction.
    pub fn fail_next_execute(&self, err: LedgerError) {
        self.state().execute_faults.push_back(err);
    }
}

/// [`LedgerClient`] bound to one signer on a [`SimulatedLedger`].
#[derive(Debug, Clone)]
pub struct SimClient {
    ledger: SimulatedLedger,
    address: String,
}

impl SimClient {
    /// Signer address.
    pub fn address(&self) -> &str {
        &self.address
    }
}

async fn delayed<T>(latency: Duration, result: T) -> T {
    if !latency.is_zero() {
        tokio::time::sleep(latency).await;
    }
    result
}

impl LedgerClient for SimClient {
    fn query(&self, contract: &str, msg: &QueryMsg) -> impl Future<Output = Result<Value, LedgerError>> + Send {
        let mut state = self.ledger.state();
        let result = state.query(contract, msg);
        let latency = state.latency;
        drop(state);
        delayed(latency, result)
    }

    fn execute(
        &self,
        contract: &str,
        msg: &ExecuteMsg,
        funds: &[Coin],
    ) -> impl Future<Output = Result<TxReceipt, LedgerError>> + Send {
        let mut state = self.ledger.state();
        let result = state.execute(&self.address, contract, msg, funds);
        let latency = state.latency;
        drop(state);
        delayed(latency, result)
    }

    fn height(&self) -> impl Future<Output = Result<u64, LedgerError>> + Send {
        let state = self.ledger.state();
        let (height, latency) = (state.height, state.latency);
        drop(state);
        delayed(latency, Ok(height))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::client::{query_lobby, query_status};

    const CONTRACT: &str = "secret1contract";

    fn ledger() -> SimulatedLedger {
        SimulatedLedger::new(CONTRACT, Coin::new(10, "uscrt"))
    }

    fn stake() -> Vec<Coin> {
        vec![Coin::new(10, "uscrt")]
    }

    #[tokio::test]
    async fn test_private_game_flow() {
        let ledger = ledger();
        let alice = ledger.client("alice");
        let bob = ledger.client("bob");
        assert_eq!(alice.address(), "alice");
        let locator = Locator::new([1; 32]);

        assert!(query_lobby(&alice, CONTRACT, locator).await.is_err());

        alice.execute(CONTRACT, &ExecuteMsg::PrivateGame { locator }, &stake()).await.unwrap();
        let lobby = query_lobby(&alice, CONTRACT, locator).await.unwrap();
        assert!(!lobby.game_started);

        bob.execute(CONTRACT, &ExecuteMsg::PrivateGame { locator }, &stake()).await.unwrap();
        let lobby = query_lobby(&bob, CONTRACT, locator).await.unwrap();
        assert!(lobby.game_started);
        assert!(lobby.player_one_is_locator_owner);

        let status = query_status(&alice, CONTRACT, locator).await.unwrap();
        assert_eq!(status.round, 1);
        assert!(!status.game_over);
    }

    #[tokio::test]
    async fn test_public_matchmaking_pairs_players() {
        let ledger = ledger();
        let alice = ledger.client("alice");
        let bob = ledger.client("bob");
        let a = Locator::new([1; 32]);
        let b = Locator::new([2; 32]);

        alice.execute(CONTRACT, &ExecuteMsg::JoinGame { locator: a }, &stake()).await.unwrap();
        bob.execute(CONTRACT, &ExecuteMsg::JoinGame { locator: b }, &stake()).await.unwrap();

        let la = query_lobby(&alice, CONTRACT, a).await.unwrap();
        let lb = query_lobby(&bob, CONTRACT, b).await.unwrap();
        assert!(la.game_started && la.player_one_is_locator_owner);
        assert!(lb.game_started && !lb.player_one_is_locator_owner);
    }

    #[tokio::test]
    async fn test_rounds_resolve() {
        let ledger = ledger();
        let alice = ledger.client("alice");
        let bob = ledger.client("bob");
        let locator = Locator::new([3; 32]);
        alice.execute(CONTRACT, &ExecuteMsg::PrivateGame { locator }, &stake()).await.unwrap();
        bob.execute(CONTRACT, &ExecuteMsg::PrivateGame { locator }, &stake()).await.unwrap();

        for _ in 0..3 {
            alice.execute(CONTRACT, &ExecuteMsg::PlayHand { locator, handsign: Handsign::Rock }, &[]).await.unwrap();
            let status = query_status(&bob, CONTRACT, locator).await.unwrap();
            assert!(status.player1_played && !status.player2_played);
            bob.execute(CONTRACT, &ExecuteMsg::PlayHand { locator, handsign: Handsign::Scissors }, &[]).await.unwrap();
        }

        let status = query_status(&alice, CONTRACT, locator).await.unwrap();
        assert_eq!(status.player1_wins, 3);
        assert_eq!(status.round, 4);
        assert!(status.game_over);
    }

    #[tokio::test]
    async fn test_double_play_rejected() {
        let ledger = ledger();
        let alice = ledger.client("alice");
        let bob = ledger.client("bob");
        let locator = Locator::new([4; 32]);
        alice.execute(CONTRACT, &ExecuteMsg::PrivateGame { locator }, &stake()).await.unwrap();
        bob.execute(CONTRACT, &ExecuteMsg::PrivateGame { locator }, &stake()).await.unwrap();

        let play = ExecuteMsg::PlayHand { locator, handsign: Handsign::Paper };
        alice.execute(CONTRACT, &play, &[]).await.unwrap();
        assert!(matches!(alice.execute(CONTRACT, &play, &[]).await, Err(LedgerError::TxRejected(_))));
    }

    #[tokio::test]
    async fn test_stake_required() {
        let ledger = ledger();
        let alice = ledger.client("alice");
        let result = alice
            .execute(CONTRACT, &ExecuteMsg::PrivateGame { locator: Locator::new([5; 32]) }, &[])
            .await;
        assert!(matches!(result, Err(LedgerError::TxRejected(_))));
    }

    #[tokio::test]
    async fn test_claim_inactivity_after_deadline() {
        let ledger = ledger();
        let alice = ledger.client("alice");
        let bob = ledger.client("bob");
        let locator = Locator::new([6; 32]);
        alice.execute(CONTRACT, &ExecuteMsg::PrivateGame { locator }, &stake()).await.unwrap();
        bob.execute(CONTRACT, &ExecuteMsg::PrivateGame { locator }, &stake()).await.unwrap();
        alice.execute(CONTRACT, &ExecuteMsg::PlayHand { locator, handsign: Handsign::Rock }, &[]).await.unwrap();

        let claim = ExecuteMsg::ClaimInactivity { locator };
        assert!(alice.execute(CONTRACT, &claim, &[]).await.is_err());

        let before = ledger.height();
        ledger.advance_blocks(PLAYER_DEADLINE_BLOCKS);
        assert_eq!(alice.height().await.unwrap(), before + PLAYER_DEADLINE_BLOCKS);
        alice.execute(CONTRACT, &claim, &[]).await.unwrap();

        let status = query_status(&bob, CONTRACT, locator).await.unwrap();
        assert!(status.game_over);
        assert_eq!(status.player1_wins, WINS_TO_FINISH);
    }

    #[tokio::test]
    async fn test_benign_fault_still_applies() {
        let ledger = ledger();
        let alice = ledger.client("alice");
        let locator = Locator::new([7; 32]);
        ledger.fail_next_execute(LedgerError::NoCiphertext("ciphertext not set".into()));

        let result = alice.execute(CONTRACT, &ExecuteMsg::PrivateGame { locator }, &stake()).await;
        assert!(matches!(result, Err(LedgerError::NoCiphertext(_))));
        assert!(query_lobby(&alice, CONTRACT, locator).await.is_ok());
    }

    #[tokio::test]
    async fn test_query_fault_is_one_shot() {
        let ledger = ledger();
        let alice = ledger.client("alice");
        let locator = Locator::new([8; 32]);
        alice.execute(CONTRACT, &ExecuteMsg::PrivateGame { locator }, &stake()).await.unwrap();

        ledger.fail_next_query(LedgerError::Network("connection reset".into()));
        assert!(query_lobby(&alice, CONTRACT, locator).await.is_err());
        assert!(query_lobby(&alice, CONTRACT, locator).await.is_ok());
    }
}
