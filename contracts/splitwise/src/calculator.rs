use cosmwasm_std::{Decimal, Decimal256, Uint256};

use crate::error::ContractError;
use crate::helpers::{hundred, maybe_address, round_half_up, WEI_DECIMALS};
use crate::msg::{Contributor, RoundingPolicy};

/// How far the percentages may stray from 100 before the split is refused.
pub fn percentage_tolerance() -> Decimal {
    Decimal::percent(1)
}

/// Checks the contributor list and returns the sum of its percentages.
pub fn validate_contributors(contributors: &[Contributor]) -> Result<Decimal, ContractError> {
    if contributors.is_empty() {
        return Err(ContractError::EmptyList {
            field: "contributor".to_string(),
        });
    }
    for contributor in contributors.iter() {
        maybe_address("contributor", contributor.address.as_deref())?;
    }

    contributors
        .iter()
        .try_fold(Decimal::zero(), |acc, c| acc.checked_add(c.percentage))
        .map_err(|_| ContractError::MathCalc {})
}

/// Splits `total_profit` by percentage. Amounts come back in contributor
/// order, rounded to cents.
///
/// With [`RoundingPolicy::PerEntry`] every amount is rounded on its own and
/// nothing is redistributed, so the amounts may sum to a few cents more or
/// less than the profit (at most half a cent per contributor).
/// [`RoundingPolicy::LargestRemainder`] floors every amount and hands the
/// missing cents to the largest remainders, so the amounts sum to the
/// profit rounded to cents.
pub fn split(
    total_profit: Decimal256,
    contributors: &[Contributor],
    policy: RoundingPolicy,
) -> Result<Vec<Decimal256>, ContractError> {
    let total = validate_contributors(contributors)?;
    let target = Decimal::percent(10_000);
    let deviation = if total > target { total - target } else { target - total };
    if deviation > percentage_tolerance() {
        return Err(ContractError::InvalidPercentage { total });
    }

    match policy {
        RoundingPolicy::PerEntry => contributors
            .iter()
            .map(|c| {
                let amount = share_of(total_profit, c.percentage, hundred())?;
                round_half_up(amount, 2)
            })
            .collect(),
        RoundingPolicy::LargestRemainder => largest_remainder(total_profit, contributors, total),
    }
}

fn share_of(total: Decimal256, part: Decimal, whole: Decimal256) -> Result<Decimal256, ContractError> {
    total
        .checked_mul(Decimal256::from(part))
        .map_err(|_| ContractError::MathCalc {})?
        .checked_div(whole)
        .map_err(|_| ContractError::MathCalc {})
}

fn floor_cents(value: Decimal256) -> Decimal256 {
    let unit = Uint256::from(10u128.pow(WEI_DECIMALS - 2));
    let atomics = value.atomics();
    Decimal256::new(atomics - atomics % unit)
}

fn largest_remainder(
    total_profit: Decimal256,
    contributors: &[Contributor],
    percent_sum: Decimal,
) -> Result<Vec<Decimal256>, ContractError> {
    let cent = Decimal256::percent(1);
    let target = round_half_up(total_profit, 2)?;
    let whole = Decimal256::from(percent_sum);

    let mut amounts = Vec::with_capacity(contributors.len());
    let mut remainders = Vec::with_capacity(contributors.len());
    for contributor in contributors.iter() {
        let exact = share_of(total_profit, contributor.percentage, whole)?;
        let floor = floor_cents(exact);
        amounts.push(floor);
        remainders.push(exact - floor);
    }

    // stable: ties keep input order
    let mut order: Vec<usize> = (0..contributors.len()).collect();
    order.sort_by(|a, b| remainders[*b].cmp(&remainders[*a]));

    let mut distributed = amounts
        .iter()
        .try_fold(Decimal256::zero(), |acc, a| acc.checked_add(*a))
        .map_err(|_| ContractError::MathCalc {})?;
    let mut next = 0;
    while distributed < target {
        let idx = order[next % order.len()];
        amounts[idx] = amounts[idx] + cent;
        distributed = distributed + cent;
        next += 1;
    }

    Ok(amounts)
}

/// Amount a payee can still claim under the share-based payout model:
/// its slice of everything the splitter ever received, minus what it was
/// already paid.
pub fn share_entitlement(
    total_received: Uint256,
    shares: Uint256,
    total_shares: Uint256,
    released: Uint256,
) -> Result<Uint256, ContractError> {
    if total_shares.is_zero() {
        return Ok(Uint256::zero());
    }
    let due = total_received
        .checked_mul(shares)
        .map_err(|_| ContractError::MathCalc {})?
        / total_shares;
    Ok(due.saturating_sub(released))
}
