use ethers::abi::Token;
use ethers::types::{Address, U256};

use super::{amounts_token, side_function};
use crate::errors::SamplerResult;
use crate::operations::{SamplerContractOperation, SourceQuoteOperation};
use crate::types::{FillData, MarketOperation, Source, UniswapFillData};

/// Uniswap V1 exchange quote for a direct pair.
pub fn quote(
    side: MarketOperation,
    router: Address,
    taker_token: Address,
    maker_token: Address,
    amounts: &[U256],
) -> SamplerResult<SourceQuoteOperation> {
    let op = SamplerContractOperation::new(
        Source::Uniswap,
        side_function(side, "sampleSellsFromUniswap", "sampleBuysFromUniswap"),
        vec![
            Token::Address(router),
            Token::Address(taker_token),
            Token::Address(maker_token),
            amounts_token(amounts),
        ],
        FillData::Uniswap(UniswapFillData { router }),
    )?;
    Ok(SourceQuoteOperation::contract(Source::Uniswap, op))
}
