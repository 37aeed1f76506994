use cosmwasm_std::{to_binary, Addr, Binary, Decimal256, Env, Response, Storage, Uint256};
use cw2::set_contract_version;

use crate::calculator::split;
use crate::error::ContractError;
use crate::helpers::{from_wei, to_fixed, validate_address};
use crate::ledger::{BlockRange, LedgerError, LedgerGateway, SplitterQuerier};
use crate::msg::{
    CalculateResponse, ConnectResponse, ConnectionsResponse, Contributor, DeployResponse,
    DistributionHistoryResponse, ExecuteMsg, HealthResponse, InstantiateMsg, ProfitShare,
    QueryMsg, Recipient, ReleaseResponse, ReleasedPayment, RoundingPolicy, SplitterExecuteMsg,
    SplitterInstantiateMsg, SplitterQueryMsg, UserContractsResponse, PAYMENT_RELEASED_EVENT,
};
use crate::payees::reconstruct;
use crate::state::{
    append_connection, append_contract, connections_by_participant, contracts_by_participant,
    Config, ContractRecord, DistributionRecord, SourceType, CONFIG, DEFAULT_MAX_PAYEES,
    DEFAULT_NETWORK,
};
use crate::vesting::simulate;

// version info for migration info
const CONTRACT_NAME: &str = "crates.io:cw-disper-splitwise";
const CONTRACT_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Collaborators a read-only request runs against.
pub struct Deps<'a> {
    pub storage: &'a dyn Storage,
    pub ledger: &'a dyn LedgerGateway,
}

/// Collaborators a write request runs against.
pub struct DepsMut<'a> {
    pub storage: &'a mut dyn Storage,
    pub ledger: &'a dyn LedgerGateway,
}

pub fn instantiate(
    storage: &mut dyn Storage,
    _env: Env,
    msg: InstantiateMsg,
) -> Result<Response, ContractError> {
    if msg.splitter_code.is_empty() {
        return Err(ContractError::MissingSplitterCode {});
    }
    set_contract_version(storage, CONTRACT_NAME, CONTRACT_VERSION)?;

    let network = msg.network.unwrap_or_else(|| {
        tracing::warn!("no network configured, reporting {}", DEFAULT_NETWORK);
        DEFAULT_NETWORK.to_string()
    });
    let config = Config {
        network,
        splitter_code: msg.splitter_code,
        max_payees: msg.max_payees.unwrap_or(DEFAULT_MAX_PAYEES),
    };
    CONFIG.save(storage, &config)?;

    Ok(Response::new()
        .add_attribute("action", "instantiate")
        .add_attribute("network", config.network))
}

pub fn execute(deps: DepsMut, env: Env, msg: ExecuteMsg) -> Result<Response, ContractError> {
    let action = match &msg {
        ExecuteMsg::Deploy { .. } => "deploy",
        ExecuteMsg::ConnectVault { .. } => "connect_vault",
        ExecuteMsg::ConnectNft { .. } => "connect_nft",
        ExecuteMsg::Release { .. } => "release",
    };

    let res = match msg {
        ExecuteMsg::Deploy {
            recipients,
            shares,
            signer,
        } => try_deploy(deps, env, recipients, shares, signer),
        ExecuteMsg::ConnectVault {
            contract_address,
            vault_address,
            signer,
        } => try_connect(
            deps,
            env,
            contract_address,
            SourceType::Vault,
            vault_address,
            signer,
        ),
        ExecuteMsg::ConnectNft {
            contract_address,
            nft_address,
            signer,
        } => try_connect(deps, env, contract_address, SourceType::Nft, nft_address, signer),
        ExecuteMsg::Release {
            contract_address,
            payee,
            signer,
        } => try_release(deps, contract_address, payee, signer),
    };

    if let Err(err) = &res {
        tracing::error!(action, kind = ?err.kind(), "{}", err);
    }
    res
}

fn require_signer(signer: &str) -> Result<(), ContractError> {
    if signer.trim().is_empty() {
        return Err(ContractError::MissingSigner {});
    }
    Ok(())
}

pub fn try_deploy(
    deps: DepsMut,
    env: Env,
    recipients: Vec<Recipient>,
    shares: Vec<u64>,
    signer: String,
) -> Result<Response, ContractError> {
    if recipients.is_empty() {
        return Err(ContractError::EmptyList {
            field: "recipient".to_string(),
        });
    }
    if shares.is_empty() {
        return Err(ContractError::EmptyList {
            field: "share".to_string(),
        });
    }
    let payees = recipients
        .iter()
        .map(|r| validate_address("recipient", &r.address))
        .collect::<Result<Vec<Addr>, _>>()?;
    if let Some(index) = shares.iter().position(|s| *s == 0) {
        return Err(ContractError::InvalidShares { index });
    }
    require_signer(&signer)?;
    if recipients.len() != shares.len() {
        return Err(ContractError::LengthMismatch {
            recipients: recipients.len(),
            shares: shares.len(),
        });
    }

    let config = CONFIG.load(deps.storage)?;
    let init = to_binary(&SplitterInstantiateMsg {
        payees: payees.iter().map(|p| p.to_string()).collect(),
        shares: shares.clone(),
    })?;
    let receipt = deps
        .ledger
        .deploy(&config.splitter_code, &init, &signer)
        .map_err(|source| ContractError::LedgerWrite {
            contract: "new splitter".to_string(),
            action: "deploy".to_string(),
            source,
        })?;

    let record = ContractRecord {
        address: receipt.contract_address.clone(),
        creator: receipt.creator.clone(),
        recipients: payees.clone(),
        shares: shares.clone(),
        created_at: env.block.time,
    };
    append_contract(deps.storage, &record).map_err(|err| match err {
        ContractError::AlreadyRecorded { address } => {
            tracing::error!(
                contract = %address,
                creator = %receipt.creator,
                tx = %receipt.transaction_hash,
                "deployed splitter collides with a recorded contract"
            );
            ContractError::RecordConflict {
                address,
                creator: receipt.creator.to_string(),
                transaction_hash: receipt.transaction_hash.clone(),
            }
        }
        err => err,
    })?;
    tracing::info!(
        contract = %receipt.contract_address,
        creator = %receipt.creator,
        payees = payees.len(),
        tx = %receipt.transaction_hash,
        "splitter deployed"
    );

    let data = DeployResponse {
        contract_address: receipt.contract_address.to_string(),
        recipients: payees.iter().map(|p| p.to_string()).collect(),
        shares,
        transaction_hash: receipt.transaction_hash,
    };
    Ok(Response::new()
        .add_attribute("action", "deploy")
        .add_attribute("contract", receipt.contract_address)
        .add_attribute("creator", receipt.creator)
        .set_data(to_binary(&data)?))
}

pub fn try_connect(
    deps: DepsMut,
    env: Env,
    contract_address: String,
    source_type: SourceType,
    source_address: String,
    signer: String,
) -> Result<Response, ContractError> {
    let contract = validate_address("contract", &contract_address)?;
    let (field, label) = match source_type {
        SourceType::Vault => ("vault", "Vault"),
        SourceType::Nft => ("nft", "NFT collection"),
    };
    let source = validate_address(field, &source_address)?;
    require_signer(&signer)?;

    let record = DistributionRecord {
        contract_address: contract.clone(),
        source_type,
        source_address: source.clone(),
        connected_at: env.block.time,
    };
    let seq = append_connection(deps.storage, &record)?;
    tracing::info!(contract = %contract, source = %source, source_type = field, seq, "funding source connected");

    let data = ConnectResponse {
        success: true,
        message: format!("{} connected successfully", label),
    };
    Ok(Response::new()
        .add_attribute("action", format!("connect_{}", field))
        .add_attribute("contract", contract)
        .add_attribute("source", source)
        .set_data(to_binary(&data)?))
}

pub fn try_release(
    deps: DepsMut,
    contract_address: String,
    payee: String,
    signer: String,
) -> Result<Response, ContractError> {
    let contract = validate_address("contract", &contract_address)?;
    let payee = validate_address("payee", &payee)?;
    require_signer(&signer)?;

    let querier = SplitterQuerier::new(deps.ledger, &contract);
    let releasable: Uint256 = querier.query(&SplitterQueryMsg::Releasable {
        account: payee.to_string(),
    })?;
    if releasable.is_zero() {
        return Err(ContractError::NothingToRelease {
            payee: payee.to_string(),
        });
    }

    let msg = to_binary(&SplitterExecuteMsg::Release {
        account: payee.to_string(),
    })?;
    let receipt = deps
        .ledger
        .send_tx(&contract, &msg, &signer)
        .map_err(|source| ContractError::LedgerWrite {
            contract: contract.to_string(),
            action: "release".to_string(),
            source,
        })?;
    tracing::info!(contract = %contract, payee = %payee, amount = %releasable, "funds released");

    let data = ReleaseResponse {
        success: true,
        transaction_hash: receipt.transaction_hash,
        released: from_wei(releasable),
    };
    Ok(Response::new()
        .add_attribute("action", "release")
        .add_attribute("contract", contract)
        .add_attribute("payee", payee)
        .add_attribute("amount", releasable.to_string())
        .set_data(to_binary(&data)?))
}

pub fn query(deps: Deps, env: Env, msg: QueryMsg) -> Result<Binary, ContractError> {
    let res = match msg {
        QueryMsg::ContractDetails { address } => query_contract_details(deps, address),
        QueryMsg::DistributionHistory { contract_address } => {
            query_distribution_history(deps, contract_address)
        }
        QueryMsg::Connections { address } => query_connections(deps, address),
        QueryMsg::UserContracts { address } => query_user_contracts(deps, address),
        QueryMsg::Calculate {
            total_profit,
            currency,
            contributors,
            rounding,
        } => query_calculate(total_profit, currency, contributors, rounding),
        QueryMsg::SimulateVesting {
            total_amount,
            vesting_duration,
            cliff,
            start_date,
            contributors,
        } => simulate(
            total_amount,
            vesting_duration,
            cliff,
            start_date,
            contributors,
            env.block.time,
        )
        .and_then(|res| Ok(to_binary(&res)?)),
        QueryMsg::Health {} => query_health(deps, env),
    };

    if let Err(err) = &res {
        tracing::error!(kind = ?err.kind(), "query failed: {}", err);
    }
    res
}

fn query_contract_details(deps: Deps, address: String) -> Result<Binary, ContractError> {
    let contract = validate_address("contract", &address)?;
    let config = CONFIG.load(deps.storage)?;

    let querier = SplitterQuerier::new(deps.ledger, &contract);
    let ledger = reconstruct(&querier, config.max_payees)?;
    Ok(to_binary(&ledger.into_response()?)?)
}

fn query_distribution_history(deps: Deps, contract_address: String) -> Result<Binary, ContractError> {
    let contract = validate_address("contract", &contract_address)?;
    let read_error = |source| ContractError::LedgerRead {
        contract: contract.to_string(),
        method: PAYMENT_RELEASED_EVENT.to_string(),
        source,
    };

    let events = deps
        .ledger
        .past_events(&contract, PAYMENT_RELEASED_EVENT, BlockRange::full())
        .map_err(read_error)?;

    let distributions = events
        .into_iter()
        .map(|event| {
            let malformed = |field: &str| {
                read_error(LedgerError::InvalidResponse {
                    reason: format!("event in {} without valid {}", event.transaction_hash, field),
                })
            };
            let recipient = event
                .return_values
                .get("recipient")
                .and_then(|r| validate_address("recipient", r).ok())
                .ok_or_else(|| malformed("recipient"))?;
            let amount = event
                .return_values
                .get("amount")
                .and_then(|a| a.parse::<Uint256>().ok())
                .ok_or_else(|| malformed("amount"))?;

            Ok(ReleasedPayment {
                recipient: recipient.to_string(),
                amount: from_wei(amount),
                block_number: event.block_number,
                transaction_hash: event.transaction_hash.clone(),
            })
        })
        .collect::<Result<Vec<_>, ContractError>>()?;

    Ok(to_binary(&DistributionHistoryResponse {
        contract_address: contract.to_string(),
        distributions,
    })?)
}

fn query_connections(deps: Deps, address: String) -> Result<Binary, ContractError> {
    let participant = validate_address("address", &address)?;
    let connections = connections_by_participant(deps.storage, &participant)?;
    Ok(to_binary(&ConnectionsResponse {
        address: participant.to_string(),
        connections,
    })?)
}

fn query_user_contracts(deps: Deps, address: String) -> Result<Binary, ContractError> {
    let participant = validate_address("address", &address)?;
    let contracts = contracts_by_participant(deps.storage, &participant)?;
    Ok(to_binary(&UserContractsResponse {
        address: participant.to_string(),
        contracts,
    })?)
}

fn query_calculate(
    total_profit: Decimal256,
    currency: String,
    contributors: Vec<Contributor>,
    rounding: Option<RoundingPolicy>,
) -> Result<Binary, ContractError> {
    if currency.trim().is_empty() {
        return Err(ContractError::MissingCurrency {});
    }
    let amounts = split(total_profit, &contributors, rounding.unwrap_or_default())?;

    let distribution = contributors
        .into_iter()
        .zip(amounts.into_iter())
        .map(|(contributor, amount)| {
            Ok(ProfitShare {
                name: contributor.name,
                address: contributor.address,
                percentage: contributor.percentage,
                amount: to_fixed(amount, 2)?,
                currency: currency.clone(),
            })
        })
        .collect::<Result<Vec<_>, ContractError>>()?;

    Ok(to_binary(&CalculateResponse {
        total_profit,
        currency,
        distribution,
    })?)
}

fn query_health(deps: Deps, env: Env) -> Result<Binary, ContractError> {
    let config = CONFIG.load(deps.storage)?;
    Ok(to_binary(&HealthResponse {
        status: "ok".to_string(),
        timestamp: env.block.time,
        network: config.network,
    })?)
}
