use ethers::abi::Token;
use ethers::types::{Address, U256};

use super::{addresses_token, amounts_token, side_function};
use crate::errors::SamplerResult;
use crate::operations::{SamplerContractOperation, SourceQuoteOperation};
use crate::types::{FillData, MarketOperation, Source, UniswapV2FillData};

/// Quote along `path` through a Uniswap-V2-style router. Works for every
/// fork that keeps the `getAmountsOut`/`getAmountsIn` interface.
pub fn quote(
    source: Source,
    side: MarketOperation,
    router: Address,
    path: Vec<Address>,
    amounts: &[U256],
) -> SamplerResult<SourceQuoteOperation> {
    let op = SamplerContractOperation::new(
        source,
        side_function(side, "sampleSellsFromUniswapV2", "sampleBuysFromUniswapV2"),
        vec![
            Token::Address(router),
            addresses_token(&path),
            amounts_token(amounts),
        ],
        FillData::UniswapV2(UniswapV2FillData {
            router,
            token_address_path: path,
        }),
    )?;
    Ok(SourceQuoteOperation::contract(source, op))
}

/// The direct path first, then one path per intermediate token.
pub fn paths(
    taker_token: Address,
    maker_token: Address,
    intermediate_tokens: &[Address],
) -> Vec<Vec<Address>> {
    std::iter::once(vec![taker_token, maker_token])
        .chain(
            intermediate_tokens
                .iter()
                .map(|token| vec![taker_token, *token, maker_token]),
        )
        .collect()
}
