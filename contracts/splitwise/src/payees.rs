use cosmwasm_std::{Addr, Decimal256, Uint256};

use crate::calculator::share_entitlement;
use crate::error::ContractError;
use crate::helpers::{from_wei, hundred, to_fixed, validate_address};
use crate::ledger::{LedgerError, SplitterQuerier};
use crate::msg::{ContractDetailsResponse, PayeeInfo, SplitterQueryMsg};

#[derive(Clone, Debug, PartialEq)]
pub struct Payee {
    pub address: Addr,
    pub shares: Uint256,
    pub released: Uint256,
    pub releasable: Uint256,
}

/// Outcome of asking a splitter for the payee at one index.
#[derive(Debug)]
pub enum ProbeResult {
    Found(Payee),
    /// The index is past the end of the payee list.
    Exhausted,
    TransientFailure(ContractError),
}

/// Everything a splitter reports about its payees, in base units.
#[derive(Clone, Debug, PartialEq)]
pub struct SplitterLedger {
    pub contract: Addr,
    pub total_shares: Uint256,
    pub total_released: Uint256,
    pub balance: Uint256,
    pub payees: Vec<Payee>,
}

/// Reads the payee at `index`.
///
/// Splitters expose no length accessor, so a revert of `payee(index)` is
/// the end-of-list signal. Any other failure, and any failure of the follow
/// up reads for a payee that does exist, is a real fault.
pub fn probe_payee(querier: &SplitterQuerier, index: u32) -> ProbeResult {
    let msg = SplitterQueryMsg::Payee { index };
    let raw: String = match querier.try_query(&msg) {
        Ok(raw) => raw,
        Err(LedgerError::Reverted { .. }) => return ProbeResult::Exhausted,
        Err(source) => return ProbeResult::TransientFailure(querier.read_error(&msg, source)),
    };

    let address = match validate_address("payee", &raw) {
        Ok(address) => address,
        Err(_) => {
            let source = LedgerError::InvalidResponse {
                reason: format!("malformed payee address {}", raw),
            };
            return ProbeResult::TransientFailure(querier.read_error(&msg, source));
        }
    };

    let account = address.to_string();
    let read = |msg: SplitterQueryMsg| querier.query::<Uint256>(&msg);
    let payee = read(SplitterQueryMsg::Shares {
        account: account.clone(),
    })
    .and_then(|shares| {
        let released = read(SplitterQueryMsg::Released {
            account: account.clone(),
        })?;
        let releasable = read(SplitterQueryMsg::Releasable {
            account: account.clone(),
        })?;
        Ok(Payee {
            address,
            shares,
            released,
            releasable,
        })
    });

    match payee {
        Ok(payee) => ProbeResult::Found(payee),
        Err(err) => ProbeResult::TransientFailure(err),
    }
}

/// Rebuilds the payee ledger of a splitter by probing indices in order
/// until the list is exhausted.
///
/// Nothing past the first exhausted index is ever reported. A transient
/// failure aborts the whole reconstruction, and so does a payee found at
/// index `max_payees`.
pub fn reconstruct(querier: &SplitterQuerier, max_payees: u32) -> Result<SplitterLedger, ContractError> {
    let contract = querier.contract().clone();
    let total_shares: Uint256 = querier.query(&SplitterQueryMsg::TotalShares {})?;
    let total_released: Uint256 = querier.query(&SplitterQueryMsg::TotalReleased {})?;

    let mut payees = vec![];
    let mut index = 0u32;
    loop {
        match probe_payee(querier, index) {
            ProbeResult::Found(payee) => {
                if index >= max_payees {
                    tracing::error!(
                        contract = %contract,
                        limit = max_payees,
                        "payee list longer than the probe limit"
                    );
                    return Err(ContractError::PayeeLimitExceeded {
                        contract: contract.to_string(),
                        limit: max_payees,
                    });
                }
                tracing::debug!(contract = %contract, index, payee = %payee.address, "payee found");
                payees.push(payee);
                index += 1;
            }
            ProbeResult::Exhausted => {
                tracing::debug!(contract = %contract, index, "payee list exhausted");
                break;
            }
            ProbeResult::TransientFailure(err) => return Err(err),
        }
    }

    let balance = querier.balance()?;

    let ledger = SplitterLedger {
        contract,
        total_shares,
        total_released,
        balance,
        payees,
    };
    reconcile(&ledger)?;
    Ok(ledger)
}

/// Shares must add up to the contract's total. Releasable amounts are
/// checked against the share model and the balance, but the ledger stays
/// authoritative for them.
fn reconcile(ledger: &SplitterLedger) -> Result<(), ContractError> {
    let payee_shares = ledger
        .payees
        .iter()
        .try_fold(Uint256::zero(), |acc, p| acc.checked_add(p.shares))
        .map_err(|_| ContractError::MathCalc {})?;
    if payee_shares != ledger.total_shares {
        return Err(ContractError::ShareMismatch {
            contract: ledger.contract.to_string(),
            payee_shares,
            total_shares: ledger.total_shares,
        });
    }

    let total_received = ledger
        .balance
        .checked_add(ledger.total_released)
        .map_err(|_| ContractError::MathCalc {})?;
    let mut releasable = Uint256::zero();
    for payee in ledger.payees.iter() {
        let expected = share_entitlement(total_received, payee.shares, ledger.total_shares, payee.released)?;
        if expected != payee.releasable {
            tracing::warn!(
                contract = %ledger.contract,
                payee = %payee.address,
                reported = %payee.releasable,
                expected = %expected,
                "releasable amount differs from share entitlement"
            );
        }
        releasable = releasable
            .checked_add(payee.releasable)
            .map_err(|_| ContractError::MathCalc {})?;
    }
    if releasable > ledger.balance {
        tracing::warn!(
            contract = %ledger.contract,
            releasable = %releasable,
            balance = %ledger.balance,
            "releasable amounts exceed contract balance"
        );
    }
    Ok(())
}

impl SplitterLedger {
    pub fn into_response(self) -> Result<ContractDetailsResponse, ContractError> {
        let total_shares = self.total_shares;
        let payees = self
            .payees
            .into_iter()
            .map(|payee| {
                Ok(PayeeInfo {
                    address: payee.address.to_string(),
                    shares: payee.shares,
                    percentage: share_percentage(payee.shares, total_shares)?,
                    released: from_wei(payee.released),
                    releasable: from_wei(payee.releasable),
                })
            })
            .collect::<Result<Vec<_>, ContractError>>()?;

        Ok(ContractDetailsResponse {
            address: self.contract.to_string(),
            total_shares,
            total_released: from_wei(self.total_released),
            balance: from_wei(self.balance),
            payees,
        })
    }
}

fn share_percentage(shares: Uint256, total_shares: Uint256) -> Result<String, ContractError> {
    if total_shares.is_zero() {
        return to_fixed(Decimal256::zero(), 2);
    }
    let percentage = Decimal256::from_ratio(shares, total_shares)
        .checked_mul(hundred())
        .map_err(|_| ContractError::MathCalc {})?;
    to_fixed(percentage, 2)
}
