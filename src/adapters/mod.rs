// Venue adapters
// Each module turns one venue's addressing into sampler operations and
// decodes whatever venue-specific data the sampler returns.

pub mod aave_v2;
pub mod balancer;
pub mod balancer_v2;
pub mod compound;
pub mod curve;
pub mod dodo_v2;
pub mod maker_psm;
pub mod uniswap;
pub mod uniswap_v2;

use ethers::abi::Token;
use ethers::types::{Address, U256};

use crate::types::MarketOperation;

pub(crate) fn amounts_token(amounts: &[U256]) -> Token {
    Token::Array(amounts.iter().copied().map(Token::Uint).collect())
}

pub(crate) fn addresses_token(addresses: &[Address]) -> Token {
    Token::Array(addresses.iter().copied().map(Token::Address).collect())
}

/// Picks the sell or buy variant of a sampler function.
pub(crate) fn side_function(side: MarketOperation, sell: &'static str, buy: &'static str) -> &'static str {
    match side {
        MarketOperation::Sell => sell,
        MarketOperation::Buy => buy,
    }
}
