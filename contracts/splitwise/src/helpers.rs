use cosmwasm_std::{Addr, Decimal, Decimal256, Uint256};
use sha3::{Digest, Keccak256};

use crate::error::ContractError;

/// Decimal places of the ledger's base unit.
pub const WEI_DECIMALS: u32 = 18;

const ADDRESS_HEX_LEN: usize = 40;

/// Accepts `0x` followed by 40 hex digits. Mixed case input must carry a
/// valid EIP-55 checksum. The returned address is always the checksummed
/// form, so two spellings of one account compare equal.
pub fn validate_address(field: &str, input: &str) -> Result<Addr, ContractError> {
    let invalid = || ContractError::InvalidAddress {
        field: field.to_string(),
        address: input.to_string(),
    };

    let hex = input.strip_prefix("0x").ok_or_else(invalid)?;
    if hex.len() != ADDRESS_HEX_LEN || !hex.chars().all(|c| c.is_ascii_hexdigit()) {
        return Err(invalid());
    }

    let checksummed = to_checksum(hex);
    let has_lower = hex.chars().any(|c| c.is_ascii_lowercase());
    let has_upper = hex.chars().any(|c| c.is_ascii_uppercase());
    if has_lower && has_upper && checksummed[2..] != *hex {
        return Err(invalid());
    }

    Ok(Addr::unchecked(checksummed))
}

pub fn maybe_address(field: &str, input: Option<&str>) -> Result<Option<Addr>, ContractError> {
    input.map(|x| validate_address(field, x)).transpose()
}

fn to_checksum(hex: &str) -> String {
    let lower = hex.to_ascii_lowercase();
    let hash = Keccak256::digest(lower.as_bytes());

    let mut out = String::with_capacity(ADDRESS_HEX_LEN + 2);
    out.push_str("0x");
    for (i, c) in lower.chars().enumerate() {
        let byte = hash[i / 2];
        let nibble = if i % 2 == 0 { byte >> 4 } else { byte & 0x0f };
        if c.is_ascii_alphabetic() && nibble >= 8 {
            out.push(c.to_ascii_uppercase());
        } else {
            out.push(c);
        }
    }
    out
}

/// Base units to whole tokens. Decimal256 already keeps 18 fractional
/// digits, so this is exact.
pub fn from_wei(amount: Uint256) -> Decimal256 {
    Decimal256::new(amount)
}

pub fn hundred() -> Decimal256 {
    Decimal256::from_ratio(100u128, 1u128)
}

/// Rounds half-up to `places` fractional digits.
pub fn round_half_up(value: Decimal256, places: u32) -> Result<Decimal256, ContractError> {
    let unit = Uint256::from(10u128.pow(WEI_DECIMALS - places));
    let atomics = value.atomics();
    let rem = atomics % unit;
    let floor = atomics - rem;

    let rounded = if rem + rem >= unit {
        floor.checked_add(unit).map_err(|_| ContractError::MathCalc {})?
    } else {
        floor
    };
    Ok(Decimal256::new(rounded))
}

/// Renders with exactly `places` fractional digits, rounding half-up.
pub fn to_fixed(value: Decimal256, places: u32) -> Result<String, ContractError> {
    let rounded = round_half_up(value, places)?.atomics();
    let one = Uint256::from(10u128.pow(WEI_DECIMALS));
    let whole = rounded / one;
    if places == 0 {
        return Ok(whole.to_string());
    }

    let fraction = (rounded % one) / Uint256::from(10u128.pow(WEI_DECIMALS - places));
    let digits = fraction.to_string();
    let padding = "0".repeat(places as usize - digits.len());
    Ok(format!("{}.{}{}", whole, padding, digits))
}

pub fn percent_to_fixed(value: Decimal) -> Result<String, ContractError> {
    to_fixed(Decimal256::from(value), 2)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn checksum_vectors() {
        let vectors = [
            "0x5aAeb6053F3E94C9b9A09f33669435E7Ef1BeAed",
            "0xfB6916095ca1df60bB79Ce92cE3Ea74c37c5d359",
            "0xdbF03B407c01E7cD3CBea99509d93f8DDDC8C6FB",
            "0xD1220A0cf47c7B9Be7A2E6BA89F429762e7b9aDb",
        ];
        for vector in vectors.iter() {
            let addr = validate_address("contract", vector).unwrap();
            assert_eq!(*vector, addr.as_str());

            // same account in lower case canonicalizes to the checksum
            let lower = format!("0x{}", vector[2..].to_ascii_lowercase());
            let addr = validate_address("contract", &lower).unwrap();
            assert_eq!(*vector, addr.as_str());
        }
    }

    #[test]
    fn rejects_malformed_addresses() {
        let bad = [
            "not-an-address",
            "",
            "0x",
            "5aAeb6053F3E94C9b9A09f33669435E7Ef1BeAed",
            "0x5aAeb6053F3E94C9b9A09f33669435E7Ef1BeAe",
            "0x5aAeb6053F3E94C9b9A09f33669435E7Ef1BeAedd",
            "0xZaAeb6053F3E94C9b9A09f33669435E7Ef1BeAed",
            // checksum broken on the first letter
            "0x5AAeb6053F3E94C9b9A09f33669435E7Ef1BeAed",
        ];
        for input in bad.iter() {
            match validate_address("payee", input) {
                Err(ContractError::InvalidAddress { field, address }) => {
                    assert_eq!("payee", field);
                    assert_eq!(*input, address);
                }
                _ => panic!("Must return InvalidAddress error for {}", input),
            }
        }
    }

    #[test]
    fn wei_conversion_is_exact() {
        let amount = Uint256::from(1_500_000_000_000_000_000u128);
        assert_eq!(Decimal256::from_str("1.5").unwrap(), from_wei(amount));
        assert_eq!("1.5", from_wei(amount).to_string());
        assert_eq!("0.000000000000000001", from_wei(Uint256::from(1u128)).to_string());
        assert_eq!(Decimal256::zero(), from_wei(Uint256::zero()));
    }

    #[test]
    fn fixed_rendering_rounds_half_up() {
        let cases = [
            ("0", "0.00"),
            ("1", "1.00"),
            ("13.333333", "13.33"),
            ("2.005", "2.01"),
            ("2.0049", "2.00"),
            ("33.3333333333", "33.33"),
            ("99.995", "100.00"),
            ("0.07", "0.07"),
        ];
        for (input, expected) in cases.iter() {
            let value = Decimal256::from_str(input).unwrap();
            assert_eq!(*expected, to_fixed(value, 2).unwrap());
        }
        assert_eq!("12.5", to_fixed(Decimal256::from_str("12.46").unwrap(), 1).unwrap());
        assert_eq!("25.00", percent_to_fixed(Decimal::percent(2500)).unwrap());
    }
}
