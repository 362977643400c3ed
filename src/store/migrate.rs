//! Persisted Match Migration
//!
//! The durable slot holds `{"version": N, "match": {...}}`. Loading merges
//! the stored match object over a canonical defaults object, so records
//! written before a field existed still decode. Unversioned records come
//! from the first client generation and are renamed into the current shape.
//! Version 1 stored the round archive as an array with `null` holes; from
//! version 2 it is an object keyed by round index.

use chrono::{DateTime, Utc};
use serde_json::{json, Map, Value};

use crate::game::state::Match;
use crate::store::StoreError;

/// Version written by this build.
pub const CURRENT_VERSION: u64 = 2;

/// Wrap a match in the versioned envelope.
pub fn encode(m: &Match) -> Result<Value, StoreError> {
    Ok(json!({
        "version": CURRENT_VERSION,
        "match": serde_json::to_value(m)?,
    }))
}

/// Decode a stored record of any known version.
pub fn decode(raw: Value, now: DateTime<Utc>) -> Result<Match, StoreError> {
    let (version, body) = split_envelope(raw)?;

    let body = match version {
        0 => rounds_by_index(migrate_v0(body)),
        1 => rounds_by_index(body),
        CURRENT_VERSION => body,
        other => return Err(StoreError::UnsupportedVersion(other)),
    };

    let mut merged = defaults(now);
    for (key, value) in body {
        merged.insert(key, value);
    }

    if merged.get("locator").map_or(true, Value::is_null) {
        return Err(StoreError::Migration("record has no locator".into()));
    }

    Ok(serde_json::from_value(Value::Object(merged))?)
}

fn split_envelope(raw: Value) -> Result<(u64, Map<String, Value>), StoreError> {
    let Value::Object(mut obj) = raw else {
        return Err(StoreError::Migration("record is not an object".into()));
    };

    match (obj.remove("version"), obj.remove("match")) {
        (Some(version), Some(Value::Object(body))) => {
            let version = version
                .as_u64()
                .ok_or_else(|| StoreError::Migration("version is not a number".into()))?;
            Ok((version, body))
        }
        (None, None) => Ok((0, obj)),
        _ => Err(StoreError::Migration("malformed envelope".into())),
    }
}

/// Canonical defaults for every field except the locator.
fn defaults(now: DateTime<Utc>) -> Map<String, Value> {
    let value = json!({
        "contractAddress": "",
        "visibility": "public",
        "createdAt": now,
        "updatedAt": now,
        "playerSlot": "unknown",
        "stage": "creating",
        "round": 1,
        "wins": 0,
        "losses": 0,
        "played": false,
        "opponentPlayed": false,
        "lastHandsign": null,
        "rounds": {},
        "won": false,
        "winDeadlineSeconds": null,
        "lossDeadlineSeconds": null,
    });
    match value {
        Value::Object(map) => map,
        _ => Map::new(),
    }
}

/// First generation: `contract`, `creator`, numeric `status`, `opponenPlayed`.
fn migrate_v0(mut old: Map<String, Value>) -> Map<String, Value> {
    let mut body = Map::new();

    if let Some(contract) = old.remove("contract") {
        body.insert("contractAddress".into(), contract);
    }
    if let Some(creator) = old.remove("creator").and_then(|v| v.as_bool()) {
        let slot = if creator { "one" } else { "two" };
        body.insert("playerSlot".into(), slot.into());
        body.insert("visibility".into(), "private".into());
    }
    if let Some(status) = old.remove("status").and_then(|v| v.as_u64()) {
        let stage = match status {
            0 => "lobby",
            1 => "game_on",
            _ => "over",
        };
        body.insert("stage".into(), stage.into());
    }
    if let Some(flag) = old.remove("opponenPlayed") {
        body.insert("opponentPlayed".into(), flag);
    }

    for key in ["locator", "wins", "losses", "played", "lastHandsign", "round", "rounds"] {
        if let Some(value) = old.remove(key) {
            body.insert(key.into(), value);
        }
    }

    body
}

/// Rewrite an array-form archive as an index-keyed object, dropping holes.
fn rounds_by_index(mut body: Map<String, Value>) -> Map<String, Value> {
    if let Some(Value::Array(rounds)) = body.remove("rounds") {
        let keyed: Map<String, Value> = rounds
            .into_iter()
            .enumerate()
            .filter(|(_, round)| !round.is_null())
            .map(|(index, round)| (index.to_string(), round))
            .collect();
        body.insert("rounds".into(), Value::Object(keyed));
    }
    body
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::locator::Locator;
    use crate::game::archive::RoundResult;
    use crate::game::state::{Handsign, PlayerSlot, Stage, Visibility};

    fn sample() -> Match {
        let mut m = Match::new("secret1abc", Locator::new([4; 32]), Visibility::Private, PlayerSlot::One, Utc::now());
        m.stage = Stage::GameOn;
        m.wins = 2;
        m.last_handsign = Some(Handsign::Rock);
        m
    }

    #[test]
    fn test_current_version_roundtrip() {
        let m = sample();
        let decoded = decode(encode(&m).unwrap(), Utc::now()).unwrap();
        assert_eq!(decoded, m);
    }

    #[test]
    fn test_missing_fields_take_defaults() {
        let raw = json!({
            "version": 2,
            "match": {
                "contractAddress": "secret1abc",
                "locator": "04".repeat(32),
                "visibility": "private",
                "stage": "lobby",
            }
        });
        let m = decode(raw, Utc::now()).unwrap();
        assert_eq!(m.stage, Stage::Lobby);
        assert_eq!(m.round, 1);
        assert_eq!(m.player_slot, PlayerSlot::Unknown);
        assert!(m.rounds.is_empty());
        assert_eq!(m.win_deadline_seconds, None);
    }

    #[test]
    fn test_legacy_record() {
        let raw = json!({
            "contract": "secret1old",
            "locator": "04".repeat(32),
            "creator": false,
            "status": 1,
            "wins": 1,
            "losses": 2,
            "played": true,
            "opponenPlayed": false,
        });
        let m = decode(raw, Utc::now()).unwrap();
        assert_eq!(m.contract_address, "secret1old");
        assert_eq!(m.player_slot, PlayerSlot::Two);
        assert_eq!(m.stage, Stage::GameOn);
        assert_eq!((m.wins, m.losses), (1, 2));
        assert!(m.played);
        assert!(!m.opponent_played);
    }

    #[test]
    fn test_array_archive_becomes_keyed() {
        let raw = json!({
            "version": 1,
            "match": {
                "locator": "04".repeat(32),
                "stage": "game_on",
                "playerSlot": "one",
                "round": 4,
                "rounds": [
                    { "result": "won", "handsign": "ROCK" },
                    null,
                    { "result": "tie", "handsign": null },
                ],
            }
        });
        let m = decode(raw, Utc::now()).unwrap();
        assert_eq!(m.rounds.iter().map(|(i, _)| i).collect::<Vec<_>>(), vec![0, 2]);
        assert_eq!(m.rounds.get(0).map(|r| r.result), Some(RoundResult::Won));
        assert_eq!(m.rounds.get(2).map(|r| r.result), Some(RoundResult::Tie));

        let stored = encode(&m).unwrap();
        assert_eq!(stored["version"], CURRENT_VERSION);
        assert!(stored["match"]["rounds"].is_object());
    }

    #[test]
    fn test_legacy_game_on_without_creator() {
        let raw = json!({
            "contract": "secret1old",
            "locator": "04".repeat(32),
            "status": 1,
            "rounds": [{ "result": "lost", "handsign": "PAPER" }],
        });
        let m = decode(raw, Utc::now()).unwrap();
        assert_eq!(m.stage, Stage::GameOn);
        assert_eq!(m.player_slot, PlayerSlot::Unknown);
        assert_eq!(m.rounds.count(), 1);
    }

    #[test]
    fn test_legacy_without_locator_is_unrecoverable() {
        let raw = json!({ "contract": "secret1old", "creator": true, "status": 0 });
        assert!(matches!(decode(raw, Utc::now()), Err(StoreError::Migration(_))));
    }

    #[test]
    fn test_future_version_rejected() {
        let raw = json!({ "version": 99, "match": {} });
        assert!(matches!(decode(raw, Utc::now()), Err(StoreError::UnsupportedVersion(99))));
    }
}
