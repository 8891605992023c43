use ethers::abi::Token;
use ethers::types::{Address, U256};

use super::{amounts_token, side_function};
use crate::errors::SamplerResult;
use crate::operations::{SamplerContractOperation, SourceQuoteOperation};
use crate::types::{CurveFillData, CurveInfo, FillData, MarketOperation, Source};

/// Token indices of a pair within a pool, `None` unless the pool holds both.
pub fn token_indices(pool: &CurveInfo, taker_token: Address, maker_token: Address) -> Option<(usize, usize)> {
    let from = pool.tokens.iter().position(|token| *token == taker_token)?;
    let to = pool.tokens.iter().position(|token| *token == maker_token)?;
    Some((from, to))
}

/// Pools from `pools` that can swap the pair, with their indices.
pub fn pools_for_pair(
    pools: Vec<CurveInfo>,
    taker_token: Address,
    maker_token: Address,
) -> Vec<(CurveInfo, usize, usize)> {
    pools
        .into_iter()
        .filter_map(|pool| {
            let (from, to) = token_indices(&pool, taker_token, maker_token)?;
            Some((pool, from, to))
        })
        .collect()
}

pub fn quote(
    source: Source,
    side: MarketOperation,
    pool: CurveInfo,
    from_token_idx: usize,
    to_token_idx: usize,
    amounts: &[U256],
) -> SamplerResult<SourceQuoteOperation> {
    let curve_info = Token::Tuple(vec![
        Token::Address(pool.pool_address),
        Token::FixedBytes(pool.sell_quote_function_selector.to_vec()),
        Token::FixedBytes(pool.buy_quote_function_selector.to_vec()),
    ]);
    let op = SamplerContractOperation::new(
        source,
        side_function(side, "sampleSellsFromCurve", "sampleBuysFromCurve"),
        vec![
            curve_info,
            Token::Int(U256::from(from_token_idx)),
            Token::Int(U256::from(to_token_idx)),
            amounts_token(amounts),
        ],
        FillData::Curve(CurveFillData {
            pool,
            from_token_idx,
            to_token_idx,
        }),
    )?;
    Ok(SourceQuoteOperation::contract(source, op))
}
