//! Sync Events
//!
//! Discrete notifications derived from consecutive match states, for
//! toasts and sounds. The full state is on the watch channel.

use serde::{Deserialize, Serialize};

use crate::core::locator::Locator;
use crate::game::archive::RoundResult;
use crate::game::state::{Match, Stage};

/// A notable change to the tracked match.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SyncEvent {
    /// Stage moved forward.
    StageChanged {
        /// Match locator.
        locator: Locator,
        /// Previous stage.
        from: Stage,
        /// New stage.
        to: Stage,
    },
    /// A round was archived.
    RoundConcluded {
        /// Match locator.
        locator: Locator,
        /// 1-based round number.
        round: u32,
        /// Outcome.
        result: RoundResult,
    },
    /// Contract reported game over.
    MatchOver {
        /// Match locator.
        locator: Locator,
        /// Local player won.
        won: bool,
    },
    /// The match was dropped locally.
    Discarded {
        /// Match locator.
        locator: Locator,
    },
}

/// Events implied by moving from `prev` to `next` (same match).
pub fn events_between(prev: &Match, next: &Match) -> Vec<SyncEvent> {
    let mut events = Vec::new();
    let locator = next.locator;

    for (index, round) in next.rounds.iter() {
        if !prev.rounds.contains(index) {
            events.push(SyncEvent::RoundConcluded { locator, round: index + 1, result: round.result });
        }
    }

    if prev.stage != next.stage {
        events.push(SyncEvent::StageChanged { locator, from: prev.stage, to: next.stage });
        if next.stage == Stage::Over {
            events.push(SyncEvent::MatchOver { locator, won: next.won });
        }
    }

    events
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::archive::Round;
    use crate::game::state::{PlayerSlot, Visibility};
    use chrono::Utc;

    #[test]
    fn test_events_for_final_round() {
        let mut prev = Match::new("c", Locator::new([1; 32]), Visibility::Private, PlayerSlot::One, Utc::now());
        prev.stage = Stage::GameOn;
        let mut next = prev.clone();
        next.rounds.record(0, Round { result: RoundResult::Won, handsign: None });
        next.stage = Stage::Over;
        next.won = true;

        let events = events_between(&prev, &next);
        assert_eq!(events.len(), 3);
        assert!(matches!(events[0], SyncEvent::RoundConcluded { round: 1, result: RoundResult::Won, .. }));
        assert!(matches!(events[1], SyncEvent::StageChanged { from: Stage::GameOn, to: Stage::Over, .. }));
        assert!(matches!(events[2], SyncEvent::MatchOver { won: true, .. }));
    }

    #[test]
    fn test_no_events_without_change() {
        let m = Match::new("c", Locator::new([1; 32]), Visibility::Public, PlayerSlot::Unknown, Utc::now());
        assert!(events_between(&m, &m).is_empty());
    }
}
