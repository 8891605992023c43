use ethers::abi::Token;
use ethers::types::{Address, U256};

use super::{amounts_token, side_function};
use crate::errors::SamplerResult;
use crate::operations::{SamplerContractOperation, SourceQuoteOperation};
use crate::types::{BalancerFillData, FillData, MarketOperation, Source};

/// Quote from a single Balancer V1 pool.
pub fn quote(
    side: MarketOperation,
    pool_address: Address,
    taker_token: Address,
    maker_token: Address,
    amounts: &[U256],
) -> SamplerResult<SourceQuoteOperation> {
    let op = SamplerContractOperation::new(
        Source::Balancer,
        side_function(side, "sampleSellsFromBalancer", "sampleBuysFromBalancer"),
        vec![
            Token::Address(pool_address),
            Token::Address(taker_token),
            Token::Address(maker_token),
            amounts_token(amounts),
        ],
        FillData::Balancer(BalancerFillData { pool_address }),
    )?;
    Ok(SourceQuoteOperation::contract(Source::Balancer, op))
}
