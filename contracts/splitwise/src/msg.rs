use cosmwasm_schema::{cw_serde, QueryResponses};
use cosmwasm_std::{Binary, Decimal, Decimal256, Timestamp, Uint256};

use crate::state::{ContractRecord, DistributionRecord};

#[cw_serde]
pub struct InstantiateMsg {
    /// Network label reported by the health check, `mainnet` when unset
    pub network: Option<String>,
    /// Compiled splitter contract used by deploy
    pub splitter_code: Binary,
    /// Upper bound on payees probed per contract, 256 when unset
    pub max_payees: Option<u32>,
}

#[cw_serde]
pub enum ExecuteMsg {
    /// Deploy a splitter paying `shares[i]` to `recipients[i]`
    Deploy {
        recipients: Vec<Recipient>,
        shares: Vec<u64>,
        signer: String,
    },
    /// Record an ERC-4626 vault as a funding source of a splitter
    ConnectVault {
        contract_address: String,
        vault_address: String,
        signer: String,
    },
    /// Record an NFT collection whose royalties feed a splitter
    ConnectNft {
        contract_address: String,
        nft_address: String,
        signer: String,
    },
    /// Pay out everything currently releasable to one payee
    Release {
        contract_address: String,
        payee: String,
        signer: String,
    },
}

#[cw_serde]
#[derive(QueryResponses)]
pub enum QueryMsg {
    /// Full payee ledger of a splitter
    #[returns(ContractDetailsResponse)]
    ContractDetails { address: String },
    /// Payments released by a splitter, from its event log
    #[returns(DistributionHistoryResponse)]
    DistributionHistory { contract_address: String },
    /// Funding sources connected to or from an address
    #[returns(ConnectionsResponse)]
    Connections { address: String },
    /// Splitters an address created or is paid by
    #[returns(UserContractsResponse)]
    UserContracts { address: String },
    /// One-shot percentage split of a profit
    #[returns(CalculateResponse)]
    Calculate {
        total_profit: Decimal256,
        currency: String,
        contributors: Vec<Contributor>,
        rounding: Option<RoundingPolicy>,
    },
    /// Linear vesting with cliff, evaluated at the current block time
    #[returns(VestingResponse)]
    SimulateVesting {
        total_amount: Decimal256,
        /// days
        vesting_duration: u64,
        /// days
        cliff: u64,
        start_date: String,
        contributors: Vec<Contributor>,
    },
    #[returns(HealthResponse)]
    Health {},
}

#[cw_serde]
pub struct Recipient {
    pub address: String,
    pub name: Option<String>,
}

#[cw_serde]
pub struct Contributor {
    pub name: String,
    pub address: Option<String>,
    pub percentage: Decimal,
}

#[cw_serde]
pub enum RoundingPolicy {
    /// Each amount rounded on its own, the sum may drift by a few cents
    PerEntry,
    /// Leftover cents handed to the largest remainders, the sum is exact
    LargestRemainder,
}

impl Default for RoundingPolicy {
    fn default() -> Self {
        RoundingPolicy::PerEntry
    }
}

#[cw_serde]
pub struct DeployResponse {
    pub contract_address: String,
    pub recipients: Vec<String>,
    pub shares: Vec<u64>,
    pub transaction_hash: String,
}

#[cw_serde]
pub struct ConnectResponse {
    pub success: bool,
    pub message: String,
}

#[cw_serde]
pub struct ReleaseResponse {
    pub success: bool,
    pub transaction_hash: String,
    pub released: Decimal256,
}

#[cw_serde]
pub struct ContractDetailsResponse {
    pub address: String,
    pub total_shares: Uint256,
    pub total_released: Decimal256,
    pub balance: Decimal256,
    pub payees: Vec<PayeeInfo>,
}

#[cw_serde]
pub struct PayeeInfo {
    pub address: String,
    pub shares: Uint256,
    /// share of the total, 2 decimals
    pub percentage: String,
    pub released: Decimal256,
    pub releasable: Decimal256,
}

#[cw_serde]
pub struct DistributionHistoryResponse {
    pub contract_address: String,
    pub distributions: Vec<ReleasedPayment>,
}

#[cw_serde]
pub struct ReleasedPayment {
    pub recipient: String,
    pub amount: Decimal256,
    pub block_number: u64,
    pub transaction_hash: String,
}

#[cw_serde]
pub struct ConnectionsResponse {
    pub address: String,
    pub connections: Vec<DistributionRecord>,
}

#[cw_serde]
pub struct UserContractsResponse {
    pub address: String,
    pub contracts: Vec<ContractRecord>,
}

#[cw_serde]
pub struct CalculateResponse {
    pub total_profit: Decimal256,
    pub currency: String,
    pub distribution: Vec<ProfitShare>,
}

#[cw_serde]
pub struct ProfitShare {
    pub name: String,
    pub address: Option<String>,
    pub percentage: Decimal,
    /// 2 decimals
    pub amount: String,
    pub currency: String,
}

#[cw_serde]
pub struct VestingResponse {
    pub total_amount: Decimal256,
    pub vesting_duration: u64,
    pub cliff: u64,
    pub start_date: String,
    pub end_date: String,
    pub cliff_end_date: String,
    /// elapsed share of the schedule, 2 decimals, within [0, 100]
    pub current_progress: String,
    pub schedules: Vec<VestingEntry>,
}

#[cw_serde]
pub struct VestingEntry {
    pub name: String,
    pub address: Option<String>,
    pub percentage: Decimal,
    pub allocation: String,
    pub vested_amount: String,
    pub vested_percentage: String,
}

#[cw_serde]
pub struct HealthResponse {
    pub status: String,
    pub timestamp: Timestamp,
    pub network: String,
}

/// Constructor arguments of the splitter contract.
#[cw_serde]
pub struct SplitterInstantiateMsg {
    pub payees: Vec<String>,
    pub shares: Vec<u64>,
}

/// Views exposed by a deployed splitter.
#[cw_serde]
pub enum SplitterQueryMsg {
    /// Address at position `index`, reverts past the end
    Payee { index: u32 },
    Shares { account: String },
    Released { account: String },
    Releasable { account: String },
    TotalShares {},
    TotalReleased {},
}

impl SplitterQueryMsg {
    /// Call signature used in error reports.
    pub fn method(&self) -> String {
        match self {
            SplitterQueryMsg::Payee { index } => format!("payee({})", index),
            SplitterQueryMsg::Shares { account } => format!("shares({})", account),
            SplitterQueryMsg::Released { account } => format!("released({})", account),
            SplitterQueryMsg::Releasable { account } => format!("releasable({})", account),
            SplitterQueryMsg::TotalShares {} => "totalShares()".to_string(),
            SplitterQueryMsg::TotalReleased {} => "totalReleased()".to_string(),
        }
    }
}

#[cw_serde]
pub enum SplitterExecuteMsg {
    Release { account: String },
}

/// Name of the event a splitter emits on every payout.
pub const PAYMENT_RELEASED_EVENT: &str = "PaymentReleased";
