//! Match State Definitions
//!
//! The locally held mirror of one match hosted by the contract.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::core::locator::Locator;
use crate::game::archive::{Round, RoundArchive};

// =============================================================================
// ENUMS
// =============================================================================

/// How the match is joined.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Visibility {
    /// Joined by sharing the locator out of band.
    Private,
    /// Joined through open matchmaking.
    Public,
}

/// Contract-side identity this client occupies.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlayerSlot {
    /// Not yet confirmed by the contract.
    #[default]
    Unknown,
    /// Player one.
    One,
    /// Player two.
    Two,
}

impl PlayerSlot {
    /// Whether the slot has been resolved.
    pub fn is_resolved(self) -> bool {
        self != PlayerSlot::Unknown
    }

    /// Pick `(mine, theirs)` out of a per-slot pair reported by the contract.
    ///
    /// `None` while the slot is unresolved.
    pub fn split<T>(self, player1: T, player2: T) -> Option<(T, T)> {
        match self {
            PlayerSlot::One => Some((player1, player2)),
            PlayerSlot::Two => Some((player2, player1)),
            PlayerSlot::Unknown => None,
        }
    }
}

/// Match lifecycle stage.
///
/// Ordered: a match only ever moves forward.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    /// Creation transaction sent, not yet observed on chain.
    #[default]
    Creating,
    /// Observed on chain, waiting for an opponent.
    Lobby,
    /// Both players in, rounds being played.
    GameOn,
    /// Contract reports game over.
    Over,
}

impl Stage {
    /// Whether the lobby query still applies.
    pub fn in_lobby(self) -> bool {
        matches!(self, Stage::Creating | Stage::Lobby)
    }
}

/// A move.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Handsign {
    /// Beats scissors.
    Rock,
    /// Beats rock.
    Paper,
    /// Beats paper.
    Scissors,
}

impl Handsign {
    /// All moves in contract order.
    pub const ALL: [Handsign; 3] = [Handsign::Rock, Handsign::Paper, Handsign::Scissors];

    /// Whether `self` beats `other`.
    pub fn beats(self, other: Handsign) -> bool {
        (other as u8 + 1) % 3 == self as u8
    }
}

// =============================================================================
// MATCH
// =============================================================================

/// Root entity, one per locally tracked match.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Match {
    /// Contract instance hosting the match.
    pub contract_address: String,
    /// Match locator inside the contract.
    pub locator: Locator,
    /// Private or public.
    pub visibility: Visibility,
    /// When the match was created locally.
    pub created_at: DateTime<Utc>,
    /// When any observable field last changed.
    pub updated_at: DateTime<Utc>,
    /// Slot this client occupies.
    pub player_slot: PlayerSlot,
    /// Lifecycle stage.
    pub stage: Stage,
    /// 1-based round in progress, or the last one once over.
    pub round: u32,
    /// Local wins.
    pub wins: u8,
    /// Opponent wins.
    pub losses: u8,
    /// Local move committed this round.
    pub played: bool,
    /// Opponent move committed this round.
    pub opponent_played: bool,
    /// Move submitted locally for the current round.
    pub last_handsign: Option<Handsign>,
    /// Concluded rounds.
    pub rounds: RoundArchive,
    /// Local player reached the win threshold.
    pub won: bool,
    /// Seconds until the local player may claim inactivity.
    pub win_deadline_seconds: Option<u64>,
    /// Seconds until the local player risks an inactivity claim.
    pub loss_deadline_seconds: Option<u64>,
}

impl Match {
    /// Create a new, not yet observed match.
    pub fn new(
        contract_address: impl Into<String>,
        locator: Locator,
        visibility: Visibility,
        player_slot: PlayerSlot,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            contract_address: contract_address.into(),
            locator,
            visibility,
            created_at: now,
            updated_at: now,
            player_slot,
            stage: Stage::Creating,
            round: 1,
            wins: 0,
            losses: 0,
            played: false,
            opponent_played: false,
            last_handsign: None,
            rounds: RoundArchive::new(),
            won: false,
            win_deadline_seconds: None,
            loss_deadline_seconds: None,
        }
    }

    /// Whether the match is over.
    pub fn is_over(&self) -> bool {
        self.stage == Stage::Over
    }

    /// Whether a move can be submitted right now.
    pub fn can_play(&self) -> bool {
        self.stage == Stage::GameOn && !self.played && self.last_handsign.is_none()
    }

    /// Whether the opponent has run out the clock against us.
    pub fn can_claim_inactivity(&self) -> bool {
        self.stage == Stage::GameOn && self.win_deadline_seconds == Some(0)
    }

    /// Archived round by 1-based round number.
    pub fn concluded_round(&self, round: u32) -> Option<&Round> {
        round.checked_sub(1).and_then(|index| self.rounds.get(index))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_handsign_beats() {
        assert!(Handsign::Rock.beats(Handsign::Scissors));
        assert!(Handsign::Paper.beats(Handsign::Rock));
        assert!(Handsign::Scissors.beats(Handsign::Paper));
        for h in Handsign::ALL {
            assert!(!h.beats(h));
        }
        assert!(!Handsign::Rock.beats(Handsign::Paper));
    }

    #[test]
    fn test_handsign_wire_names() {
        assert_eq!(serde_json::to_string(&Handsign::Scissors).unwrap(), "\"SCISSORS\"");
        let h: Handsign = serde_json::from_str("\"ROCK\"").unwrap();
        assert_eq!(h, Handsign::Rock);
    }

    #[test]
    fn test_stage_is_ordered() {
        assert!(Stage::Creating < Stage::Lobby);
        assert!(Stage::Lobby < Stage::GameOn);
        assert!(Stage::GameOn < Stage::Over);
    }

    #[test]
    fn test_slot_split() {
        assert_eq!(PlayerSlot::One.split(2, 1), Some((2, 1)));
        assert_eq!(PlayerSlot::Two.split(2, 1), Some((1, 2)));
        assert_eq!(PlayerSlot::Unknown.split(2, 1), None);
    }

    #[test]
    fn test_new_match_defaults() {
        let m = Match::new("secret1abc", Locator::new([1; 32]), Visibility::Private, PlayerSlot::One, Utc::now());
        assert_eq!(m.stage, Stage::Creating);
        assert_eq!(m.round, 1);
        assert!(!m.can_play());
        assert!(m.concluded_round(1).is_none());
    }

    #[test]
    fn test_camel_case_fields() {
        let m = Match::new("secret1abc", Locator::new([1; 32]), Visibility::Public, PlayerSlot::Unknown, Utc::now());
        let value = serde_json::to_value(&m).unwrap();
        assert!(value.get("contractAddress").is_some());
        assert!(value.get("opponentPlayed").is_some());
        assert!(value.get("winDeadlineSeconds").is_some());
    }
}
