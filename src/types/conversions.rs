use ethers::types::{Address, H256, U256};
use rust_decimal::Decimal;
use std::str::FromStr;

/// Converts a raw token amount into a `Decimal`, scaled down by `decimals`.
pub fn u256_to_decimal(value: U256, decimals: u8) -> Result<Decimal, ConversionError> {
    let value_str = value.to_string();
    let decimal_value = Decimal::from_str(&value_str)
        .map_err(|e| ConversionError::InvalidDecimal(e.to_string()))?;

    let divisor = Decimal::from(10u128.pow(decimals as u32));
    Ok(decimal_value / divisor)
}

/// Ratio of two raw amounts. `None` when the denominator is zero or either
/// side does not fit a `Decimal`.
pub fn u256_ratio(numerator: U256, denominator: U256) -> Option<Decimal> {
    if denominator.is_zero() {
        return None;
    }
    let n = u256_to_decimal(numerator, 0).ok()?;
    let d = u256_to_decimal(denominator, 0).ok()?;
    n.checked_div(d)
}

// Subgraphs and REST APIs hand back addresses as strings in arbitrary case.
pub fn string_to_address(s: &str) -> Result<Address, ConversionError> {
    Address::from_str(s.trim()).map_err(|e| ConversionError::InvalidAddress(e.to_string()))
}

pub fn string_to_h256(s: &str) -> Result<H256, ConversionError> {
    H256::from_str(s.trim()).map_err(|e| ConversionError::InvalidHash(e.to_string()))
}

pub fn address_to_string(addr: Address) -> String {
    format!("{:?}", addr).to_lowercase()
}

#[derive(Debug, thiserror::Error)]
pub enum ConversionError {
    #[error("Invalid decimal: {0}")]
    InvalidDecimal(String),
    #[error("Invalid address: {0}")]
    InvalidAddress(String),
    #[error("Invalid bytes32: {0}")]
    InvalidHash(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn addresses_parse_regardless_of_case() {
        let lower = string_to_address("0x6b175474e89094c44da98b954eedeac495271d0f").unwrap();
        let mixed = string_to_address("0x6B175474E89094C44Da98b954EedeAC495271d0F").unwrap();
        assert_eq!(lower, mixed);
        assert_eq!(address_to_string(mixed), "0x6b175474e89094c44da98b954eedeac495271d0f");
    }

    #[test]
    fn ratio_handles_zero_denominator() {
        assert_eq!(u256_ratio(U256::from(10), U256::zero()), None);
        assert_eq!(u256_ratio(U256::from(10), U256::from(4)), Some(Decimal::new(25, 1)));
    }
}
