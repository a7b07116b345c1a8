//! error types for the game sdk

use std::time::Duration;
use thiserror::Error;

use crate::types::{AccountAddress, TransactionHash};

/// why the chain refused a transaction
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SubmissionErrorKind {
    /// sequence number already used; re-read account state and rebuild
    StaleSequenceNumber,
    /// not enough balance to cover the transfer or the fee
    InsufficientBalance,
    /// gas limit too low or gas price out of bounds
    InsufficientGas,
    /// type arguments or arguments do not match the entry function
    InvalidArguments,
    /// committed on chain but execution failed (abort, out of gas at runtime)
    ExecutionFailed,
    /// anything else the node rejected
    Rejected,
}

impl SubmissionErrorKind {
    /// map a node error code or vm status onto a kind
    ///
    /// accepts both `SEQUENCE_NUMBER_TOO_OLD` style codes and the prose
    /// vm statuses reported for committed transactions ("Out of gas")
    pub fn classify(status: &str) -> Self {
        let status = status.trim().to_ascii_uppercase().replace(' ', "_");

        if status.contains("SEQUENCE_NUMBER_TOO_OLD") || status.contains("SEQUENCE_NUMBER_TOO_NEW") {
            Self::StaleSequenceNumber
        } else if status.contains("INSUFFICIENT_BALANCE") {
            Self::InsufficientBalance
        } else if status.contains("OUT_OF_GAS")
            || status.contains("MAX_GAS_UNITS")
            || status.contains("GAS_UNIT_PRICE")
        {
            Self::InsufficientGas
        } else if status.contains("TYPE_MISMATCH")
            || status.contains("NUMBER_OF_ARGUMENTS_MISMATCH")
            || status.contains("NUMBER_OF_TYPE_ARGUMENTS_MISMATCH")
            || status.contains("FAILED_TO_DESERIALIZE_ARGUMENT")
            || status.contains("FUNCTION_RESOLUTION_FAILURE")
            || status.contains("LINKER_ERROR")
            || status.contains("CONSTRAINT_NOT_SATISFIED")
        {
            Self::InvalidArguments
        } else if status.contains("MOVE_ABORT") || status.contains("EXECUTION_FAILURE") {
            Self::ExecutionFailed
        } else {
            Self::Rejected
        }
    }
}

impl std::fmt::Display for SubmissionErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::StaleSequenceNumber => "stale sequence number",
            Self::InsufficientBalance => "insufficient balance",
            Self::InsufficientGas => "insufficient gas",
            Self::InvalidArguments => "invalid arguments",
            Self::ExecutionFailed => "execution failed",
            Self::Rejected => "rejected",
        };
        f.write_str(s)
    }
}

#[derive(Error, Debug)]
pub enum SdkError {
    /// bad local input, never sent over the wire
    #[error("validation error: {0}")]
    Validation(String),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("network error: {0}")]
    Network(String),

    #[error("account not found: {0}")]
    AccountNotFound(AccountAddress),

    #[error("transaction {kind}: {message}")]
    Submission {
        kind: SubmissionErrorKind,
        message: String,
    },

    #[error("timeout after {waited:?} waiting for transaction {hash}")]
    Timeout { hash: String, waited: Duration },

    #[error("signing failed: {0}")]
    Signing(String),

    #[error("encoding error: {0}")]
    Encoding(String),

    #[error("batch item {index} failed: {source}")]
    BatchItem {
        index: usize,
        /// items already accepted by the node before the failure; these still execute
        submitted: Vec<TransactionHash>,
        #[source]
        source: Box<SdkError>,
    },
}

impl SdkError {
    pub fn submission(kind: SubmissionErrorKind, message: impl Into<String>) -> Self {
        SdkError::Submission {
            kind,
            message: message.into(),
        }
    }

    /// submission kind, looking through batch wrappers
    pub fn submission_kind(&self) -> Option<SubmissionErrorKind> {
        match self {
            SdkError::Submission { kind, .. } => Some(*kind),
            SdkError::BatchItem { source, .. } => source.submission_kind(),
            _ => None,
        }
    }

    /// hashes of batch items that reached the node before the failure
    pub fn submitted_hashes(&self) -> &[TransactionHash] {
        match self {
            SdkError::BatchItem { submitted, .. } => submitted,
            _ => &[],
        }
    }

    pub fn is_timeout(&self) -> bool {
        match self {
            SdkError::Timeout { .. } => true,
            SdkError::BatchItem { source, .. } => source.is_timeout(),
            _ => false,
        }
    }
}

pub type Result<T> = std::result::Result<T, SdkError>;

impl From<reqwest::Error> for SdkError {
    fn from(e: reqwest::Error) -> Self {
        SdkError::Network(e.to_string())
    }
}

impl From<bcs::Error> for SdkError {
    fn from(e: bcs::Error) -> Self {
        SdkError::Encoding(e.to_string())
    }
}

impl From<hex::FromHexError> for SdkError {
    fn from(e: hex::FromHexError) -> Self {
        SdkError::Validation(format!("invalid hex: {}", e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_node_codes() {
        assert_eq!(
            SubmissionErrorKind::classify("SEQUENCE_NUMBER_TOO_OLD"),
            SubmissionErrorKind::StaleSequenceNumber
        );
        assert_eq!(
            SubmissionErrorKind::classify("sequence_number_too_old"),
            SubmissionErrorKind::StaleSequenceNumber
        );
        assert_eq!(
            SubmissionErrorKind::classify("INSUFFICIENT_BALANCE_FOR_TRANSACTION_FEE"),
            SubmissionErrorKind::InsufficientBalance
        );
        assert_eq!(
            SubmissionErrorKind::classify("MAX_GAS_UNITS_BELOW_MIN_TRANSACTION_GAS_UNITS"),
            SubmissionErrorKind::InsufficientGas
        );
        assert_eq!(
            SubmissionErrorKind::classify("NUMBER_OF_TYPE_ARGUMENTS_MISMATCH"),
            SubmissionErrorKind::InvalidArguments
        );
        assert_eq!(
            SubmissionErrorKind::classify("mempool_is_full"),
            SubmissionErrorKind::Rejected
        );
    }

    #[test]
    fn test_classify_vm_status() {
        assert_eq!(
            SubmissionErrorKind::classify("Out of gas"),
            SubmissionErrorKind::InsufficientGas
        );
        assert_eq!(
            SubmissionErrorKind::classify("Move abort in 0x1::coin: EINSUFFICIENT_BALANCE(0x10006)"),
            SubmissionErrorKind::InsufficientBalance
        );
        assert_eq!(
            SubmissionErrorKind::classify("Move abort in 0x4723::core: 0x2"),
            SubmissionErrorKind::ExecutionFailed
        );
    }

    #[test]
    fn test_batch_item_exposes_kind() {
        let err = SdkError::BatchItem {
            index: 2,
            submitted: Vec::new(),
            source: Box::new(SdkError::submission(
                SubmissionErrorKind::StaleSequenceNumber,
                "too old",
            )),
        };
        assert_eq!(err.submission_kind(), Some(SubmissionErrorKind::StaleSequenceNumber));
        assert!(err.to_string().contains("batch item 2"));
    }
}
