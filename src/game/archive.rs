//! Round Archive
//!
//! Append-only, index-addressed log of concluded rounds. Index `i` holds
//! round `i + 1`. Entries are written once and never touched again, so
//! history can be rendered without going back to the chain.

use std::collections::btree_map::Entry;
use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::game::state::Handsign;

/// Outcome of a concluded round from the local player's side.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RoundResult {
    /// Local win counter went up.
    Won,
    /// Opponent win counter went up.
    Lost,
    /// Neither moved.
    Tie,
}

impl RoundResult {
    /// Derive the outcome from win counter deltas.
    pub fn from_deltas(wins_before: u8, wins_after: u8, losses_before: u8, losses_after: u8) -> Self {
        if wins_after > wins_before {
            RoundResult::Won
        } else if losses_after > losses_before {
            RoundResult::Lost
        } else {
            RoundResult::Tie
        }
    }
}

/// A concluded round.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Round {
    /// Outcome.
    pub result: RoundResult,
    /// Local move, if this client knew it.
    pub handsign: Option<Handsign>,
}

/// Sparse round log keyed by index.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RoundArchive(BTreeMap<u32, Round>);

impl RoundArchive {
    /// Empty archive.
    pub fn new() -> Self {
        Self(BTreeMap::new())
    }

    /// Record `round` at `index` unless that slot is already written.
    ///
    /// Returns whether the entry was stored.
    pub fn record(&mut self, index: u32, round: Round) -> bool {
        match self.0.entry(index) {
            Entry::Occupied(_) => false,
            Entry::Vacant(slot) => {
                slot.insert(round);
                true
            }
        }
    }

    /// Entry at `index`.
    pub fn get(&self, index: u32) -> Option<&Round> {
        self.0.get(&index)
    }

    /// Whether `index` has been written.
    pub fn contains(&self, index: u32) -> bool {
        self.0.contains_key(&index)
    }

    /// Number of written entries.
    pub fn count(&self) -> usize {
        self.0.len()
    }

    /// Whether nothing has been archived yet.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Written entries in index order.
    pub fn iter(&self) -> impl Iterator<Item = (u32, &Round)> {
        self.0.iter().map(|(&i, r)| (i, r))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn won(h: Handsign) -> Round {
        Round { result: RoundResult::Won, handsign: Some(h) }
    }

    #[test]
    fn test_result_from_deltas() {
        assert_eq!(RoundResult::from_deltas(1, 2, 1, 1), RoundResult::Won);
        assert_eq!(RoundResult::from_deltas(1, 1, 1, 2), RoundResult::Lost);
        assert_eq!(RoundResult::from_deltas(1, 1, 1, 1), RoundResult::Tie);
    }

    #[test]
    fn test_sparse_record() {
        let mut archive = RoundArchive::new();
        assert!(archive.record(2, won(Handsign::Rock)));
        assert!(!archive.contains(0));
        assert!(!archive.contains(1));
        assert_eq!(archive.get(2), Some(&won(Handsign::Rock)));
        assert_eq!(archive.count(), 1);
    }

    #[test]
    fn test_entries_are_immutable() {
        let mut archive = RoundArchive::new();
        assert!(archive.record(0, won(Handsign::Rock)));
        let lost = Round { result: RoundResult::Lost, handsign: None };
        assert!(!archive.record(0, lost));
        assert_eq!(archive.get(0), Some(&won(Handsign::Rock)));
    }

    #[test]
    fn test_serializes_sparse_entries_by_index() {
        let mut archive = RoundArchive::new();
        archive.record(1, won(Handsign::Paper));
        let json = serde_json::to_string(&archive).unwrap();
        assert_eq!(json, r#"{"1":{"result":"won","handsign":"PAPER"}}"#);

        let back: RoundArchive = serde_json::from_str(&json).unwrap();
        assert_eq!(back, archive);
        assert_eq!(back.iter().map(|(i, _)| i).collect::<Vec<_>>(), vec![1]);
    }

    #[test]
    fn test_far_index_stays_small() {
        let mut archive = RoundArchive::new();
        assert!(archive.record(20_000_000, won(Handsign::Scissors)));
        assert_eq!(archive.count(), 1);

        let json = serde_json::to_string(&archive).unwrap();
        assert!(json.len() < 100, "archive grew to {} bytes", json.len());
    }

    #[test]
    fn test_iter_in_index_order() {
        let mut archive = RoundArchive::new();
        archive.record(7, won(Handsign::Rock));
        archive.record(2, won(Handsign::Paper));
        archive.record(10, won(Handsign::Scissors));
        assert_eq!(archive.iter().map(|(i, _)| i).collect::<Vec<_>>(), vec![2, 7, 10]);
    }
}
