use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use cosmwasm_std::{Addr, Binary, Empty, Order, StdResult, Storage, Timestamp};
use cw_storage_plus::{Item, Map};

use crate::error::ContractError;

pub const DEFAULT_NETWORK: &str = "mainnet";
pub const DEFAULT_MAX_PAYEES: u32 = 256;

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, JsonSchema)]
pub struct Config {
    pub network: String,
    pub splitter_code: Binary,
    pub max_payees: u32,
}

/// A splitter deployed through this desk.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, JsonSchema)]
pub struct ContractRecord {
    pub address: Addr,
    pub creator: Addr,
    pub recipients: Vec<Addr>,
    pub shares: Vec<u64>,
    pub created_at: Timestamp,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum SourceType {
    Vault,
    Nft,
}

/// A funding source wired to a splitter.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, JsonSchema)]
pub struct DistributionRecord {
    pub contract_address: Addr,
    pub source_type: SourceType,
    pub source_address: Addr,
    pub connected_at: Timestamp,
}

pub const CONFIG: Item<Config> = Item::new("config");
pub const CONTRACTS: Map<&Addr, ContractRecord> = Map::new("contracts");
pub const CONTRACT_SEQ: Item<u64> = Item::new("contract_seq");
/// (participant, seq) -> contract, for creators and recipients
pub const CONTRACT_PARTICIPANTS: Map<(&Addr, u64), Addr> = Map::new("contract_participants");
pub const CONNECTION_SEQ: Item<u64> = Item::new("connection_seq");
pub const CONNECTIONS: Map<u64, DistributionRecord> = Map::new("connections");
/// (participant, seq) for both the splitter and the source side
pub const CONNECTION_PARTICIPANTS: Map<(&Addr, u64), Empty> = Map::new("connection_participants");

/// Stores a new deployment. Records are never replaced.
pub fn append_contract(store: &mut dyn Storage, record: &ContractRecord) -> Result<(), ContractError> {
    CONTRACTS.update(store, &record.address, |existing| match existing {
        None => Ok(record.clone()),
        Some(_) => Err(ContractError::AlreadyRecorded {
            address: record.address.to_string(),
        }),
    })?;

    let seq = CONTRACT_SEQ.may_load(store)?.unwrap_or_default() + 1;
    CONTRACT_SEQ.save(store, &seq)?;

    CONTRACT_PARTICIPANTS.save(store, (&record.creator, seq), &record.address)?;
    for recipient in record.recipients.iter() {
        CONTRACT_PARTICIPANTS.save(store, (recipient, seq), &record.address)?;
    }
    Ok(())
}

/// Contracts `participant` created or is paid by, oldest first.
pub fn contracts_by_participant(store: &dyn Storage, participant: &Addr) -> StdResult<Vec<ContractRecord>> {
    CONTRACT_PARTICIPANTS
        .prefix(participant)
        .range(store, None, None, Order::Ascending)
        .map(|item| CONTRACTS.load(store, &item?.1))
        .collect()
}

/// Appends a connection and returns its sequence number.
pub fn append_connection(store: &mut dyn Storage, record: &DistributionRecord) -> StdResult<u64> {
    let seq = CONNECTION_SEQ.may_load(store)?.unwrap_or_default() + 1;
    CONNECTION_SEQ.save(store, &seq)?;

    CONNECTIONS.save(store, seq, record)?;
    CONNECTION_PARTICIPANTS.save(store, (&record.contract_address, seq), &Empty {})?;
    CONNECTION_PARTICIPANTS.save(store, (&record.source_address, seq), &Empty {})?;
    Ok(seq)
}

/// Connections where `participant` is the splitter or the source, oldest first.
pub fn connections_by_participant(
    store: &dyn Storage,
    participant: &Addr,
) -> StdResult<Vec<DistributionRecord>> {
    CONNECTION_PARTICIPANTS
        .prefix(participant)
        .keys(store, None, None, Order::Ascending)
        .map(|seq| CONNECTIONS.load(store, seq?))
        .collect()
}
