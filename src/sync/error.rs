//! Command Errors
//!
//! What a user-initiated command can fail with. Each variant maps to one
//! notification class; raw remote text only ever reaches the logs.

use std::time::Duration;

use thiserror::Error;
use tracing::error;

use crate::ledger::error::LedgerError;

/// Command failures.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CommandError {
    /// The user declined to sign.
    #[error("signing request rejected")]
    Rejected,

    /// The chain refused the transaction.
    #[error("transaction rejected: {0}")]
    ChainRejected(String),

    /// Unclassified remote failure.
    #[error("request failed: {0}")]
    Failed(String),

    /// No tracked match for this locator.
    #[error("no active match")]
    NoActiveMatch,

    /// A live match already occupies the slot, or leaving would forfeit it.
    #[error("match in progress")]
    MatchInProgress,

    /// Creation may still be landing.
    #[error("match cannot be abandoned for another {}s", .0.as_secs())]
    TooEarly(Duration),

    /// A move is already locked in for this round.
    #[error("move already submitted this round")]
    AlreadyPlayed,

    /// Join link carries no usable locator.
    #[error("invalid invite link")]
    InvalidInvite,

    /// The durable slot could not be written.
    #[error("storage error: {0}")]
    Store(String),

    /// The sync engine has shut down.
    #[error("sync engine stopped")]
    Closed,
}

impl CommandError {
    /// Map a remote failure onto a notification class.
    ///
    /// Callers filter out the benign receipt gap before getting here.
    pub fn from_ledger(err: LedgerError) -> Self {
        match err {
            LedgerError::UserRejected => CommandError::Rejected,
            LedgerError::TxRejected(reason) => CommandError::ChainRejected(reason),
            other => {
                error!("Unclassified remote failure: {}", other);
                CommandError::Failed(other.to_string())
            }
        }
    }

    /// Text to show the user.
    pub fn notice(&self) -> String {
        match self {
            CommandError::Rejected => "Request rejected in wallet.".into(),
            CommandError::ChainRejected(_) => "Transaction was rejected by the network. Try funding your wallet?".into(),
            CommandError::Failed(_) => "Something went wrong. Please try again.".into(),
            CommandError::NoActiveMatch => "There is no active game.".into(),
            CommandError::MatchInProgress => "Finish the current game first.".into(),
            CommandError::TooEarly(remaining) => {
                format!("The game may still be starting. You can leave in {}s.", remaining.as_secs().max(1))
            }
            CommandError::AlreadyPlayed => "You already played this round.".into(),
            CommandError::InvalidInvite => "Game not found or no longer joinable.".into(),
            CommandError::Store(_) => "Could not save the game locally.".into(),
            CommandError::Closed => "The game client has stopped.".into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_ledger() {
        assert_eq!(CommandError::from_ledger(LedgerError::UserRejected), CommandError::Rejected);
        assert!(matches!(
            CommandError::from_ledger(LedgerError::TxRejected("out of gas".into())),
            CommandError::ChainRejected(_)
        ));
        assert!(matches!(
            CommandError::from_ledger(LedgerError::Other("boom".into())),
            CommandError::Failed(_)
        ));
    }

    #[test]
    fn test_notice_hides_raw_text() {
        let err = CommandError::Failed("panicked at contract.rs:42".into());
        assert!(!err.notice().contains("contract.rs"));
        assert_ne!(CommandError::Rejected.notice(), CommandError::ChainRejected(String::new()).notice());
    }
}
