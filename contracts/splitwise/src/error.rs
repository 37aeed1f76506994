use cosmwasm_std::{Decimal, StdError, Uint256};
use thiserror::Error;

use crate::ledger::LedgerError;

#[derive(Error, Debug)]
pub enum ContractError {
    #[error("{0}")]
    Std(#[from] StdError),

    #[error("Invalid {field} address: {address}")]
    InvalidAddress { field: String, address: String },

    #[error("At least one {field} is required")]
    EmptyList { field: String },

    #[error("Recipients and shares must have the same length ({recipients} != {shares})")]
    LengthMismatch { recipients: usize, shares: usize },

    #[error("Share value at position {index} must be a positive integer")]
    InvalidShares { index: usize },

    #[error("Invalid total {total} percentage")]
    InvalidPercentage { total: Decimal },

    #[error("Invalid {field} date: {value}")]
    InvalidDate { field: String, value: String },

    #[error("Duration of {days} days for {field} is out of range")]
    InvalidDuration { field: String, days: u64 },

    #[error("Cliff of {cliff} days exceeds vesting duration of {duration} days")]
    CliffExceedsDuration { cliff: u64, duration: u64 },

    #[error("Signer is required")]
    MissingSigner {},

    #[error("Currency is required")]
    MissingCurrency {},

    #[error("Splitter contract code is required")]
    MissingSplitterCode {},

    #[error("No funds available to release for {payee}")]
    NothingToRelease { payee: String },

    #[error("Contract {address} is already recorded")]
    AlreadyRecorded { address: String },

    #[error("Failed to read {method} from {contract}: {source}")]
    LedgerRead {
        contract: String,
        method: String,
        source: LedgerError,
    },

    #[error("Failed to submit {action} to {contract}: {source}")]
    LedgerWrite {
        contract: String,
        action: String,
        source: LedgerError,
    },

    #[error("Splitter {address} was deployed by {creator} in {transaction_hash} but is already recorded")]
    RecordConflict {
        address: String,
        creator: String,
        transaction_hash: String,
    },

    #[error("Payee list of {contract} has more than {limit} entries")]
    PayeeLimitExceeded { contract: String, limit: u32 },

    #[error("Payee shares of {contract} sum to {payee_shares}, contract reports {total_shares}")]
    ShareMismatch {
        contract: String,
        payee_shares: Uint256,
        total_shares: Uint256,
    },

    #[error("Invalid math calc")]
    MathCalc {},
}

/// Coarse classification the transport layer maps onto status codes.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ErrorKind {
    Validation,
    LedgerRead,
    LedgerWrite,
    Internal,
}

impl ContractError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ContractError::LedgerRead { .. }
            | ContractError::PayeeLimitExceeded { .. }
            | ContractError::ShareMismatch { .. } => ErrorKind::LedgerRead,
            ContractError::LedgerWrite { .. } => ErrorKind::LedgerWrite,
            ContractError::Std(_)
            | ContractError::MathCalc {}
            | ContractError::RecordConflict { .. } => ErrorKind::Internal,
            _ => ErrorKind::Validation,
        }
    }
}
