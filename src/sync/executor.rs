//! Command Executor
//!
//! User-initiated state changes. Each command mutates the slot through the
//! match actor first, then signs and broadcasts. Confirmation always comes
//! from a later poll; execute responses carry no game state.
//!
//! A failed execute rolls the optimistic change back, except for the
//! receipt-decoding gap ([`LedgerError::is_benign`]), which means the
//! transaction was accepted.

use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, info, warn};

use crate::config::SyncConfig;
use crate::core::locator::{join_url, parse_join_url, Locator};
use crate::game::state::{Handsign, Match, PlayerSlot, Stage, Visibility};
use crate::ledger::client::{query_lobby, LedgerClient};
use crate::ledger::error::LedgerError;
use crate::ledger::msg::{Coin, ExecuteMsg, TxReceipt};
use crate::sync::actor::{Intent, MatchHandle};
use crate::sync::error::CommandError;
use crate::sync::poller::bounded;

/// Issues signed requests on behalf of the local player.
pub struct CommandExecutor<C> {
    config: Arc<SyncConfig>,
    client: Arc<C>,
    handle: MatchHandle,
}

impl<C> Clone for CommandExecutor<C> {
    fn clone(&self) -> Self {
        Self { config: self.config.clone(), client: self.client.clone(), handle: self.handle.clone() }
    }
}

impl<C: LedgerClient> CommandExecutor<C> {
    /// Create an executor writing through `handle`.
    pub fn new(config: Arc<SyncConfig>, client: Arc<C>, handle: MatchHandle) -> Self {
        Self { config, client, handle }
    }

    /// Start a match, or join one when `invite` carries its locator.
    ///
    /// Creating takes slot One, joining an invite takes slot Two. A public
    /// match learns its slot from the lobby once paired.
    pub async fn create_or_join(
        &self,
        visibility: Visibility,
        invite: Option<Locator>,
    ) -> Result<Match, CommandError> {
        let (locator, slot, visibility) = match (invite, visibility) {
            (Some(locator), _) => (locator, PlayerSlot::Two, Visibility::Private),
            (None, Visibility::Private) => (Locator::generate(), PlayerSlot::One, Visibility::Private),
            (None, Visibility::Public) => (Locator::generate(), PlayerSlot::Unknown, Visibility::Public),
        };

        let fresh = Match::new(&self.config.contract_address, locator, visibility, slot, Utc::now());
        self.handle.intent(Intent::Begin(fresh)).await?;

        let msg = match visibility {
            Visibility::Private => ExecuteMsg::PrivateGame { locator },
            Visibility::Public => ExecuteMsg::JoinGame { locator },
        };
        let funds = [self.config.entry_stake.clone()];
        info!("Sending {} for {:?} ({:?})", msg.name(), locator, slot);

        if let Err(e) = self.send(&msg, &funds).await {
            self.handle.intent(Intent::Discard { locator }).await?;
            return Err(e);
        }

        // A fresh private match stays in Creating until the first poll sees it.
        let stage = if invite.is_some() || visibility == Visibility::Public {
            Stage::Lobby
        } else {
            Stage::Creating
        };
        self.handle
            .intent(Intent::Settle { locator, stage })
            .await?
            .ok_or(CommandError::NoActiveMatch)
    }

    /// Join the match named by a shared link.
    ///
    /// An unknown, malformed or already started locator is an
    /// [`CommandError::InvalidInvite`].
    pub async fn join_from_url(&self, url: &str) -> Result<Match, CommandError> {
        let locator = parse_join_url(url).ok_or(CommandError::InvalidInvite)?;

        let lobby = bounded(
            self.config.query_timeout,
            query_lobby(self.client.as_ref(), &self.config.contract_address, locator),
        )
        .await;
        match lobby {
            Ok(lobby) if !lobby.game_started => {}
            Ok(_) => {
                debug!("Invite {:?} already consumed", locator);
                return Err(CommandError::InvalidInvite);
            }
            Err(e) if e.is_transient() => return Err(CommandError::from_ledger(e)),
            Err(e) => {
                debug!("Invite {:?} not joinable: {}", locator, e);
                return Err(CommandError::InvalidInvite);
            }
        }

        self.create_or_join(Visibility::Private, Some(locator)).await
    }

    /// Commit a move for the current round.
    ///
    /// The move is shown as locked in immediately and undone if the
    /// transaction fails.
    pub async fn play_hand(&self, locator: Locator, handsign: Handsign) -> Result<(), CommandError> {
        self.handle.intent(Intent::LockHandsign { locator, handsign }).await?;
        info!("Playing {:?} in {:?}", handsign, locator);

        if let Err(e) = self.send(&ExecuteMsg::PlayHand { locator, handsign }, &[]).await {
            self.handle.intent(Intent::RollbackHandsign { locator, handsign }).await?;
            return Err(e);
        }
        Ok(())
    }

    /// Claim the match after the opponent let the deadline pass.
    ///
    /// On success the match is dropped locally. On failure it is left alone;
    /// the next poll shows whether the claim landed anyway.
    pub async fn claim_inactivity(&self, locator: Locator) -> Result<(), CommandError> {
        if self.handle.current().map(|m| m.locator) != Some(locator) {
            return Err(CommandError::NoActiveMatch);
        }
        info!("Claiming inactivity in {:?}", locator);

        self.send(&ExecuteMsg::ClaimInactivity { locator }, &[]).await?;
        self.handle.intent(Intent::Discard { locator }).await?;
        Ok(())
    }

    /// Leave the tracked match.
    pub async fn leave(&self) -> Result<(), CommandError> {
        let intent = Intent::Leave { now: Utc::now(), min_age: self.config.min_abandon_age };
        self.handle.intent(intent).await.map(|_| ())
    }

    /// Share link for the tracked match.
    pub fn join_url(&self) -> Option<String> {
        self.handle.current().map(|m| join_url(&self.config.app_origin, &m.locator))
    }

    async fn send(&self, msg: &ExecuteMsg, funds: &[Coin]) -> Result<(), CommandError> {
        let result = self.client.execute(&self.config.contract_address, msg, funds).await;
        accepted(msg, result).map_err(|e| {
            warn!("{} failed: {}", msg.name(), e);
            CommandError::from_ledger(e)
        })
    }
}

/// Treat the receipt-decoding gap as acceptance.
fn accepted(msg: &ExecuteMsg, result: Result<TxReceipt, LedgerError>) -> Result<(), LedgerError> {
    match result {
        Ok(receipt) => {
            debug!("{} landed in tx {} at height {}", msg.name(), receipt.tx_hash, receipt.height);
            Ok(())
        }
        Err(e) if e.is_benign() => {
            debug!("{} accepted without readable receipt: {}", msg.name(), e);
            Ok(())
        }
        Err(e) => Err(e),
    }
}
