use std::collections::BTreeMap;

use cosmwasm_std::{from_binary, to_binary, Addr, Binary, Uint256};
use serde::de::DeserializeOwned;
use thiserror::Error;

use crate::error::ContractError;
use crate::msg::SplitterQueryMsg;

/// Failures reported by a ledger gateway.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum LedgerError {
    /// The contract itself rejected the call (execution reverted).
    #[error("execution reverted: {reason}")]
    Reverted { reason: String },

    /// The node could not be reached or did not answer in time.
    #[error("ledger unavailable: {reason}")]
    Unavailable { reason: String },

    /// The node answered with something that does not decode.
    #[error("invalid ledger response: {reason}")]
    InvalidResponse { reason: String },
}

pub type LedgerResult<T> = Result<T, LedgerError>;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BlockHeight {
    Number(u64),
    Latest,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BlockRange {
    pub from: BlockHeight,
    pub to: BlockHeight,
}

impl BlockRange {
    pub fn full() -> Self {
        BlockRange {
            from: BlockHeight::Number(0),
            to: BlockHeight::Latest,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct LedgerEvent {
    pub return_values: BTreeMap<String, String>,
    pub block_number: u64,
    pub transaction_hash: String,
}

#[derive(Clone, Debug, PartialEq)]
pub struct TxReceipt {
    pub transaction_hash: String,
}

#[derive(Clone, Debug, PartialEq)]
pub struct DeployReceipt {
    pub contract_address: Addr,
    /// Account the signer resolved to.
    pub creator: Addr,
    pub transaction_hash: String,
}

/// Read/write access to the remote contract ledger.
///
/// Messages are JSON encoded method calls (`SplitterQueryMsg`,
/// `SplitterExecuteMsg`, `SplitterInstantiateMsg`); the gateway owns the
/// translation to the chain's ABI, account handling, gas and timeouts.
/// Implementations must report a contract-side rejection as
/// [`LedgerError::Reverted`] and everything else with the other variants.
pub trait LedgerGateway {
    fn call_view(&self, contract: &Addr, msg: &Binary) -> LedgerResult<Binary>;

    fn send_tx(&self, contract: &Addr, msg: &Binary, signer: &str) -> LedgerResult<TxReceipt>;

    fn deploy(&self, code: &Binary, msg: &Binary, signer: &str) -> LedgerResult<DeployReceipt>;

    fn balance(&self, address: &Addr) -> LedgerResult<Uint256>;

    fn past_events(
        &self,
        contract: &Addr,
        event: &str,
        range: BlockRange,
    ) -> LedgerResult<Vec<LedgerEvent>>;
}

/// Typed view calls against a single splitter contract.
pub struct SplitterQuerier<'a> {
    ledger: &'a dyn LedgerGateway,
    contract: &'a Addr,
}

impl<'a> SplitterQuerier<'a> {
    pub fn new(ledger: &'a dyn LedgerGateway, contract: &'a Addr) -> Self {
        SplitterQuerier { ledger, contract }
    }

    pub fn contract(&self) -> &Addr {
        self.contract
    }

    /// Issues the call and decodes the answer, keeping the raw ledger error
    /// so callers can tell a revert apart from a transport failure.
    pub fn try_query<T: DeserializeOwned>(&self, msg: &SplitterQueryMsg) -> LedgerResult<T> {
        let request = to_binary(msg).map_err(|err| LedgerError::InvalidResponse {
            reason: err.to_string(),
        })?;
        let response = self.ledger.call_view(self.contract, &request)?;
        from_binary(&response).map_err(|err| LedgerError::InvalidResponse {
            reason: err.to_string(),
        })
    }

    pub fn query<T: DeserializeOwned>(&self, msg: &SplitterQueryMsg) -> Result<T, ContractError> {
        self.try_query(msg).map_err(|source| self.read_error(msg, source))
    }

    pub fn balance(&self) -> Result<Uint256, ContractError> {
        self.ledger
            .balance(self.contract)
            .map_err(|source| ContractError::LedgerRead {
                contract: self.contract.to_string(),
                method: "balance".to_string(),
                source,
            })
    }

    pub fn read_error(&self, msg: &SplitterQueryMsg, source: LedgerError) -> ContractError {
        ContractError::LedgerRead {
            contract: self.contract.to_string(),
            method: msg.method(),
            source,
        }
    }
}
