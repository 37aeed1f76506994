#![cfg(test)]

use std::cell::RefCell;
use std::collections::HashMap;

use cosmwasm_std::{from_binary, to_binary, Addr, Binary, Uint256};

use crate::ledger::{
    BlockRange, DeployReceipt, LedgerError, LedgerEvent, LedgerGateway, LedgerResult, TxReceipt,
};
use crate::msg::{SplitterExecuteMsg, SplitterInstantiateMsg, SplitterQueryMsg};

/// Digits-only addresses are their own checksum form.
pub fn addr(n: u8) -> Addr {
    Addr::unchecked(format!("0x{}", n.to_string().repeat(40)))
}

#[derive(Clone, Debug)]
pub struct MockPayee {
    pub address: Addr,
    pub shares: Uint256,
    pub released: Uint256,
    pub releasable: Uint256,
}

/// In-memory splitter. `None` entries revert like an out-of-range index.
#[derive(Clone, Debug)]
pub struct MockSplitter {
    payees: Vec<Option<MockPayee>>,
    total_shares: Option<Uint256>,
    total_released: Uint256,
    balance: Uint256,
}

impl MockSplitter {
    /// (address, shares, released, releasable)
    pub fn new(payees: Vec<(Addr, u128, u128, u128)>) -> Self {
        let payees = payees
            .into_iter()
            .map(|(address, shares, released, releasable)| {
                Some(MockPayee {
                    address,
                    shares: Uint256::from(shares),
                    released: Uint256::from(released),
                    releasable: Uint256::from(releasable),
                })
            })
            .collect();
        MockSplitter {
            payees,
            total_shares: None,
            total_released: Uint256::zero(),
            balance: Uint256::zero(),
        }
    }

    pub fn with_balance(mut self, balance: u128) -> Self {
        self.balance = Uint256::from(balance);
        self
    }

    pub fn with_total_released(mut self, released: u128) -> Self {
        self.total_released = Uint256::from(released);
        self
    }

    /// Overrides the reported total, which otherwise sums every payee.
    pub fn with_total_shares(mut self, shares: u128) -> Self {
        self.total_shares = Some(Uint256::from(shares));
        self
    }

    /// Makes `index` revert while later indices keep answering.
    pub fn with_gap_at(mut self, index: usize) -> Self {
        self.payees.insert(index, None);
        self
    }

    fn total_shares(&self) -> Uint256 {
        self.total_shares.unwrap_or_else(|| {
            self.payees
                .iter()
                .flatten()
                .fold(Uint256::zero(), |acc, p| acc + p.shares)
        })
    }

    fn account(&self, account: &str) -> Option<&MockPayee> {
        self.payees
            .iter()
            .flatten()
            .find(|p| p.address.as_str() == account)
    }
}

pub struct MockLedger {
    splitters: HashMap<Addr, MockSplitter>,
    failing: Vec<String>,
    events: Vec<LedgerEvent>,
    deployed: Addr,
    creator: Addr,
    calls: RefCell<Vec<String>>,
    sent: RefCell<Vec<(Addr, SplitterExecuteMsg, String)>>,
    deploys: RefCell<Vec<(Binary, SplitterInstantiateMsg, String)>>,
}

impl Default for MockLedger {
    fn default() -> Self {
        MockLedger {
            splitters: HashMap::new(),
            failing: vec![],
            events: vec![],
            deployed: addr(7),
            creator: addr(8),
            calls: RefCell::new(vec![]),
            sent: RefCell::new(vec![]),
            deploys: RefCell::new(vec![]),
        }
    }
}

impl MockLedger {
    pub fn with_splitter(mut self, contract: &Addr, splitter: MockSplitter) -> Self {
        self.splitters.insert(contract.clone(), splitter);
        self
    }

    /// Answers `method` with a transport failure. Methods are named like
    /// `payee(0)`, `releasable(0x..)`, `balance`, `send_tx`, `deploy` and
    /// `past_events(PaymentReleased)`.
    pub fn failing_on(mut self, method: &str) -> Self {
        self.failing.push(method.to_string());
        self
    }

    pub fn with_events(mut self, events: Vec<LedgerEvent>) -> Self {
        self.events = events;
        self
    }

    pub fn was_called(&self, method: &str) -> bool {
        self.calls.borrow().iter().any(|c| c == method)
    }

    pub fn call_count(&self) -> usize {
        self.calls.borrow().len()
    }

    pub fn sent(&self) -> Vec<(Addr, SplitterExecuteMsg, String)> {
        self.sent.borrow().clone()
    }

    pub fn deploys(&self) -> Vec<(Binary, SplitterInstantiateMsg, String)> {
        self.deploys.borrow().clone()
    }

    fn record(&self, method: String) -> LedgerResult<()> {
        let failing = self.failing.contains(&method);
        self.calls.borrow_mut().push(method);
        if failing {
            return Err(LedgerError::Unavailable {
                reason: "connection reset by peer".to_string(),
            });
        }
        Ok(())
    }
}

fn encode<T: serde::Serialize>(value: &T) -> LedgerResult<Binary> {
    to_binary(value).map_err(|err| LedgerError::InvalidResponse {
        reason: err.to_string(),
    })
}

fn decode<T: serde::de::DeserializeOwned>(msg: &Binary) -> LedgerResult<T> {
    from_binary(msg).map_err(|err| LedgerError::InvalidResponse {
        reason: err.to_string(),
    })
}

impl LedgerGateway for MockLedger {
    fn call_view(&self, contract: &Addr, msg: &Binary) -> LedgerResult<Binary> {
        let query: SplitterQueryMsg = decode(msg)?;
        self.record(query.method())?;

        let splitter = self
            .splitters
            .get(contract)
            .ok_or_else(|| LedgerError::InvalidResponse {
                reason: "returned no data".to_string(),
            })?;
        let amount_of = |account: &str, pick: fn(&MockPayee) -> Uint256| {
            splitter.account(account).map(pick).unwrap_or_default()
        };

        match query {
            SplitterQueryMsg::Payee { index } => match splitter.payees.get(index as usize) {
                Some(Some(payee)) => encode(&payee.address.to_string()),
                _ => Err(LedgerError::Reverted {
                    reason: "panic: array out-of-bounds access (0x32)".to_string(),
                }),
            },
            SplitterQueryMsg::Shares { account } => encode(&amount_of(&account, |p| p.shares)),
            SplitterQueryMsg::Released { account } => encode(&amount_of(&account, |p| p.released)),
            SplitterQueryMsg::Releasable { account } => {
                encode(&amount_of(&account, |p| p.releasable))
            }
            SplitterQueryMsg::TotalShares {} => encode(&splitter.total_shares()),
            SplitterQueryMsg::TotalReleased {} => encode(&splitter.total_released),
        }
    }

    fn send_tx(&self, contract: &Addr, msg: &Binary, signer: &str) -> LedgerResult<TxReceipt> {
        self.record("send_tx".to_string())?;
        let msg: SplitterExecuteMsg = decode(msg)?;
        self.sent
            .borrow_mut()
            .push((contract.clone(), msg, signer.to_string()));
        Ok(TxReceipt {
            transaction_hash: "0xfeed".to_string(),
        })
    }

    fn deploy(&self, code: &Binary, msg: &Binary, signer: &str) -> LedgerResult<DeployReceipt> {
        self.record("deploy".to_string())?;
        let msg: SplitterInstantiateMsg = decode(msg)?;
        self.deploys
            .borrow_mut()
            .push((code.clone(), msg, signer.to_string()));
        Ok(DeployReceipt {
            contract_address: self.deployed.clone(),
            creator: self.creator.clone(),
            transaction_hash: "0xbeef".to_string(),
        })
    }

    fn balance(&self, address: &Addr) -> LedgerResult<Uint256> {
        self.record("balance".to_string())?;
        Ok(self
            .splitters
            .get(address)
            .map(|s| s.balance)
            .unwrap_or_default())
    }

    fn past_events(
        &self,
        _contract: &Addr,
        event: &str,
        _range: BlockRange,
    ) -> LedgerResult<Vec<LedgerEvent>> {
        self.record(format!("past_events({})", event))?;
        Ok(self.events.clone())
    }
}
