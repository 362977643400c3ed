//! Reconciliation
//!
//! Folds a snapshot of remote contract state into the previous local match.
//! Both functions here are pure: [`reconcile`] computes the fields a snapshot
//! says have changed, and [`apply_update`] overlays them onto a match.
//!
//! ```text
//! previous Match ──┐
//!                  ├─ reconcile ──> Update ──┐
//! RemoteSnapshot ──┘                         ├─ apply_update ──> next Match
//! current Match  ────────────────────────────┘
//! ```
//!
//! An [`Update`] only carries what the snapshot observed. In particular it
//! never mentions `last_handsign` unless a round concluded, so a move locked
//! in after the snapshot was taken survives the overlay.

use serde::{Deserialize, Serialize};

use crate::core::height::BlockClock;
use crate::game::archive::{Round, RoundResult};
use crate::game::state::{Match, PlayerSlot, Stage};
use crate::ledger::msg::{GameLobbyResponse, GameStatusResponse};
use crate::WINS_TO_FINISH;

// =============================================================================
// SNAPSHOT
// =============================================================================

/// `game_status` together with the height it was read at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusSnapshot {
    /// Decoded status response.
    pub game: GameStatusResponse,
    /// Chain height at read time.
    pub height: u64,
}

/// One consistent read of remote match state.
///
/// `lobby` is only queried while the match has not started; `status` is
/// absent while the contract reports the lobby still open.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteSnapshot {
    /// Lobby query result.
    pub lobby: Option<GameLobbyResponse>,
    /// Status query result.
    pub status: Option<StatusSnapshot>,
}

impl RemoteSnapshot {
    /// Lobby still open.
    pub fn lobby_only(lobby: GameLobbyResponse) -> Self {
        Self { lobby: Some(lobby), status: None }
    }

    /// Status read, with the lobby result if one was taken this tick.
    pub fn with_status(lobby: Option<GameLobbyResponse>, game: GameStatusResponse, height: u64) -> Self {
        Self { lobby, status: Some(StatusSnapshot { game, height }) }
    }
}

// =============================================================================
// UPDATE
// =============================================================================

/// Inactivity countdown state. At most one side is ever counting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Countdown {
    /// Both or neither side has moved, or the match is over.
    Neither,
    /// Local moved, opponent has not: seconds until we may claim.
    Win(u64),
    /// Opponent moved, local has not: seconds until we may be claimed against.
    Loss(u64),
}

impl Countdown {
    /// Pick the countdown for the current move flags.
    pub fn for_moves(played: bool, opponent_played: bool, seconds: u64) -> Self {
        match (played, opponent_played) {
            (true, false) => Countdown::Win(seconds),
            (false, true) => Countdown::Loss(seconds),
            _ => Countdown::Neither,
        }
    }

    /// Read the countdown off a match.
    pub fn of(m: &Match) -> Self {
        match (m.win_deadline_seconds, m.loss_deadline_seconds) {
            (Some(s), _) => Countdown::Win(s),
            (None, Some(s)) => Countdown::Loss(s),
            (None, None) => Countdown::Neither,
        }
    }

    /// `(win_deadline_seconds, loss_deadline_seconds)`.
    pub fn fields(self) -> (Option<u64>, Option<u64>) {
        match self {
            Countdown::Neither => (None, None),
            Countdown::Win(s) => (Some(s), None),
            Countdown::Loss(s) => (None, Some(s)),
        }
    }
}

/// Fields a snapshot says have changed. `None` means "not observed".
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Update {
    /// New stage.
    pub stage: Option<Stage>,
    /// Slot resolved from the lobby.
    pub player_slot: Option<PlayerSlot>,
    /// New round number.
    pub round: Option<u32>,
    /// Local wins.
    pub wins: Option<u8>,
    /// Opponent wins.
    pub losses: Option<u8>,
    /// Local move committed.
    pub played: Option<bool>,
    /// Opponent move committed.
    pub opponent_played: Option<bool>,
    /// Local player won the match.
    pub won: Option<bool>,
    /// Inactivity countdown.
    pub countdown: Option<Countdown>,
    /// Concluded round to archive: `(index, round)`.
    pub archived: Option<(u32, Round)>,
    /// Clear `last_handsign` (set together with `archived`).
    pub clear_handsign: bool,
}

impl Update {
    /// Whether applying this changes nothing.
    pub fn is_empty(&self) -> bool {
        *self == Update::default()
    }
}

// =============================================================================
// RECONCILE
// =============================================================================

/// Compute the update that brings `previous` in line with `snapshot`.
///
/// Repeating the call against unchanged remote state yields an empty update.
/// A snapshot reporting an earlier round, or fewer wins or losses than
/// `previous` already holds, is stale and also yields an empty update.
pub fn reconcile(previous: &Match, snapshot: &RemoteSnapshot, clock: &BlockClock) -> Update {
    let mut update = Update::default();

    if previous.is_over() {
        return update;
    }

    let mut slot = previous.player_slot;
    let mut stage = previous.stage;

    // 1. Lobby, also consulted while the slot is unknown
    if stage.in_lobby() || !slot.is_resolved() {
        let Some(lobby) = snapshot.lobby else {
            return update;
        };

        if !lobby.game_started {
            // First sighting: the creation landed, now waiting for an opponent.
            if stage == Stage::Creating {
                update.stage = Some(Stage::Lobby);
            }
            return update;
        }

        if !slot.is_resolved() {
            slot = if lobby.player_one_is_locator_owner {
                PlayerSlot::One
            } else {
                PlayerSlot::Two
            };
            update.player_slot = Some(slot);
        }
        if stage != Stage::GameOn {
            stage = Stage::GameOn;
            update.stage = Some(stage);
        }
    }

    // 2. Status
    let Some(StatusSnapshot { game, height }) = snapshot.status else {
        return update;
    };

    // 3. Slot indirection
    let (Some((wins, losses)), Some((played, opponent_played))) = (
        slot.split(game.player1_wins, game.player2_wins),
        slot.split(game.player1_played, game.player2_played),
    ) else {
        return update;
    };

    if game.round < previous.round || wins < previous.wins || losses < previous.losses {
        return Update::default();
    }

    let next_stage = if game.game_over { Stage::Over } else { Stage::GameOn };
    if next_stage != stage || update.stage.is_some() {
        update.stage = Some(next_stage);
    }

    set_if_changed(&mut update.round, previous.round, game.round);
    set_if_changed(&mut update.wins, previous.wins, wins);
    set_if_changed(&mut update.losses, previous.losses, losses);
    set_if_changed(&mut update.played, previous.played, played);
    set_if_changed(&mut update.opponent_played, previous.opponent_played, opponent_played);

    let won = game.game_over && wins >= WINS_TO_FINISH;
    set_if_changed(&mut update.won, previous.won, won);

    // 4. Deadline
    let countdown = if game.game_over {
        Countdown::Neither
    } else {
        Countdown::for_moves(played, opponent_played, clock.seconds_until(game.deadline, height))
    };
    set_if_changed(&mut update.countdown, Countdown::of(previous), countdown);

    // 5. Round advance
    if game.round > previous.round {
        let index = previous.round.saturating_sub(1);
        if !previous.rounds.contains(index) {
            let result = RoundResult::from_deltas(previous.wins, wins, previous.losses, losses);
            update.archived = Some((index, Round { result, handsign: previous.last_handsign }));
        }
        update.clear_handsign = true;
    }

    update
}

fn set_if_changed<T: PartialEq>(field: &mut Option<T>, previous: T, observed: T) {
    if previous != observed {
        *field = Some(observed);
    }
}

// =============================================================================
// APPLY
// =============================================================================

/// Overlay `update` onto `current`, touching only the fields it carries.
///
/// Never moves `stage`, `round`, `wins` or `losses` backwards and never
/// overwrites an archived round or a resolved slot.
pub fn apply_update(current: &Match, update: &Update) -> Match {
    let mut next = current.clone();

    if update.round.is_some_and(|round| round < current.round) {
        return next;
    }

    if let Some(stage) = update.stage {
        next.stage = next.stage.max(stage);
    }
    if let Some(slot) = update.player_slot {
        if !next.player_slot.is_resolved() {
            next.player_slot = slot;
        }
    }
    if let Some(round) = update.round {
        next.round = next.round.max(round);
    }
    if let Some(wins) = update.wins {
        next.wins = next.wins.max(wins);
    }
    if let Some(losses) = update.losses {
        next.losses = next.losses.max(losses);
    }
    if let Some(played) = update.played {
        next.played = played;
    }
    if let Some(opponent_played) = update.opponent_played {
        next.opponent_played = opponent_played;
    }
    if let Some(won) = update.won {
        next.won = won;
    }
    if let Some(countdown) = update.countdown {
        (next.win_deadline_seconds, next.loss_deadline_seconds) = countdown.fields();
    }
    if let Some((index, round)) = update.archived {
        next.rounds.record(index, round);
    }
    if update.clear_handsign {
        next.last_handsign = None;
    }
    if next.is_over() {
        (next.win_deadline_seconds, next.loss_deadline_seconds) = (None, None);
    }

    next
}

// =============================================================================
// TESTS
// =============================================================================
