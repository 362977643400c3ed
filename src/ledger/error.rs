//! Remote Error Taxonomy
//!
//! Every failure a ledger client can report, sorted by how the sync engine
//! reacts to it.

use thiserror::Error;

/// Errors from a ledger query or execute.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LedgerError {
    /// Transport failure. Retried on the next tick.
    #[error("network error: {0}")]
    Network(String),

    /// The request did not complete within the query timeout.
    #[error("request timed out")]
    Timeout,

    /// The response was missing or mistyped a required field.
    #[error("decode error: {0}")]
    Decode(String),

    /// The transaction was accepted but its encrypted receipt could not be read.
    ///
    /// Treated as success: the next poll confirms the effect.
    #[error("receipt not readable: {0}")]
    NoCiphertext(String),

    /// The user declined to sign.
    #[error("signing request rejected")]
    UserRejected,

    /// The chain rejected the transaction.
    #[error("transaction rejected: {0}")]
    TxRejected(String),

    /// Anything else.
    #[error("{0}")]
    Other(String),
}

impl LedgerError {
    /// Sort raw client error text into the taxonomy.
    pub fn classify(raw: impl Into<String>) -> Self {
        let raw = raw.into();
        let lower = raw.to_ascii_lowercase();

        if lower.contains("ciphertext") {
            LedgerError::NoCiphertext(raw)
        } else if lower.contains("request rejected") || lower.contains("user denied") {
            LedgerError::UserRejected
        } else if lower.contains("failed to execute")
            || lower.contains("out of gas")
            || lower.contains("insufficient funds")
            || lower.contains("tx failed")
        {
            LedgerError::TxRejected(raw)
        } else if lower.contains("timed out") || lower.contains("timeout") {
            LedgerError::Timeout
        } else if lower.contains("network") || lower.contains("connection") || lower.contains("fetch") {
            LedgerError::Network(raw)
        } else {
            LedgerError::Other(raw)
        }
    }

    /// Whether this is the benign receipt gap.
    pub fn is_benign(&self) -> bool {
        matches!(self, LedgerError::NoCiphertext(_))
    }

    /// Whether retrying on the next tick makes sense.
    pub fn is_transient(&self) -> bool {
        matches!(self, LedgerError::Network(_) | LedgerError::Timeout)
    }
}

impl From<serde_json::Error> for LedgerError {
    fn from(err: serde_json::Error) -> Self {
        LedgerError::Decode(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_benign_receipt() {
        let err = LedgerError::classify("Cannot read properties: ciphertext not set");
        assert!(err.is_benign());
        assert!(!err.is_transient());
    }

    #[test]
    fn test_classify_user_rejection() {
        assert_eq!(LedgerError::classify("Request rejected"), LedgerError::UserRejected);
    }

    #[test]
    fn test_classify_chain_rejection() {
        let err = LedgerError::classify("failed to execute message; message index: 0: deadline not reached");
        assert!(matches!(err, LedgerError::TxRejected(_)));
    }

    #[test]
    fn test_classify_transient() {
        assert!(LedgerError::classify("Failed to fetch").is_transient());
        assert_eq!(LedgerError::classify("request timed out"), LedgerError::Timeout);
    }

    #[test]
    fn test_classify_unknown() {
        assert!(matches!(LedgerError::classify("boom"), LedgerError::Other(_)));
    }
}
