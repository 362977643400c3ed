//! Sync Configuration
//!
//! Built once at process start and handed to the poller, executor and
//! session by `Arc`. Nothing below this module reads the environment.

use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use thiserror::Error;

use crate::core::height::{BlockClock, DEFAULT_SECONDS_PER_BLOCK};
use crate::ledger::msg::Coin;
use crate::POLL_INTERVAL_MS;

/// Entry stake in the smallest denomination.
pub const DEFAULT_STAKE_AMOUNT: u128 = 10_000_000;

/// Entry stake denomination.
pub const DEFAULT_STAKE_DENOM: &str = "uscrt";

/// Sync engine configuration.
#[derive(Debug, Clone)]
pub struct SyncConfig {
    /// Deployed match contract.
    pub contract_address: String,
    /// Poll period.
    pub poll_interval: Duration,
    /// Upper bound on a single remote query.
    pub query_timeout: Duration,
    /// Estimated block time.
    pub seconds_per_block: u64,
    /// Funds attached to create/join.
    pub entry_stake: Coin,
    /// Origin used to build join links.
    pub app_origin: String,
    /// How long a match must sit in Creating/Lobby before it may be abandoned.
    pub min_abandon_age: Duration,
    /// JSON file holding the durable match slot. In-memory when unset.
    pub store_path: Option<PathBuf>,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            contract_address: String::new(),
            poll_interval: Duration::from_millis(POLL_INTERVAL_MS),
            query_timeout: Duration::from_secs(10),
            seconds_per_block: DEFAULT_SECONDS_PER_BLOCK,
            entry_stake: Coin::new(DEFAULT_STAKE_AMOUNT, DEFAULT_STAKE_DENOM),
            app_origin: "http://localhost:3000".to_string(),
            min_abandon_age: Duration::from_secs(60),
            store_path: None,
        }
    }
}

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A variable is set but does not parse.
    #[error("invalid value for {key}: {value:?}")]
    Invalid {
        /// Variable name.
        key: &'static str,
        /// Raw value.
        value: String,
    },
}

impl SyncConfig {
    /// Create config from environment variables, falling back to defaults.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Create config from an arbitrary key lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let defaults = Self::default();

        Ok(Self {
            contract_address: lookup("SYNC_CONTRACT_ADDRESS").unwrap_or(defaults.contract_address),
            poll_interval: parse_millis(&lookup, "SYNC_POLL_INTERVAL_MS")?.unwrap_or(defaults.poll_interval),
            query_timeout: parse_millis(&lookup, "SYNC_QUERY_TIMEOUT_MS")?.unwrap_or(defaults.query_timeout),
            seconds_per_block: parse(&lookup, "SYNC_SECONDS_PER_BLOCK")?.unwrap_or(defaults.seconds_per_block),
            entry_stake: Coin::new(
                parse(&lookup, "SYNC_STAKE_AMOUNT")?.unwrap_or(defaults.entry_stake.amount),
                lookup("SYNC_STAKE_DENOM").unwrap_or(defaults.entry_stake.denom),
            ),
            app_origin: lookup("SYNC_APP_ORIGIN").unwrap_or(defaults.app_origin),
            min_abandon_age: parse(&lookup, "SYNC_MIN_ABANDON_SECS")?
                .map(Duration::from_secs)
                .unwrap_or(defaults.min_abandon_age),
            store_path: lookup("SYNC_STORE_PATH").map(PathBuf::from).or(defaults.store_path),
        })
    }

    /// Height-to-seconds adapter for this chain.
    pub fn clock(&self) -> BlockClock {
        BlockClock::new(self.seconds_per_block)
    }
}

fn parse<T: FromStr>(lookup: &impl Fn(&str) -> Option<String>, key: &'static str) -> Result<Option<T>, ConfigError> {
    match lookup(key) {
        None => Ok(None),
        Some(value) => value
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| ConfigError::Invalid { key, value }),
    }
}

/// A millisecond duration; zero is rejected.
fn parse_millis(lookup: &impl Fn(&str) -> Option<String>, key: &'static str) -> Result<Option<Duration>, ConfigError> {
    match parse::<u64>(lookup, key)? {
        Some(0) => Err(ConfigError::Invalid { key, value: "0".to_string() }),
        millis => Ok(millis.map(Duration::from_millis)),
    }
}
