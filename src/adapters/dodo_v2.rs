use ethers::abi::{Function, Token};
use ethers::types::{Address, U256};

use super::{amounts_token, side_function};
use crate::errors::{SamplerError, SamplerResult};
use crate::operations::{SamplerContractOperation, SourceQuoteOperation};
use crate::types::{DodoV2FillData, FillData, MarketOperation, Source};

/// Quote from whichever pool the registry lists at `offset` for the pair.
/// The pool and its direction are filled in once the sample returns.
pub fn quote(
    side: MarketOperation,
    registry: Address,
    offset: u64,
    taker_token: Address,
    maker_token: Address,
    amounts: &[U256],
) -> SamplerResult<SourceQuoteOperation> {
    let op = SamplerContractOperation::new(
        Source::DodoV2,
        side_function(side, "sampleSellsFromDODOV2", "sampleBuysFromDODOV2"),
        vec![
            Token::Address(registry),
            Token::Uint(U256::from(offset)),
            Token::Address(taker_token),
            Token::Address(maker_token),
            amounts_token(amounts),
        ],
        FillData::DodoV2(DodoV2FillData {
            registry,
            offset,
            ..Default::default()
        }),
    )?
    .with_handler(Box::new(decode_pool_and_amounts));
    Ok(SourceQuoteOperation::contract(Source::DodoV2, op))
}

fn decode_pool_and_amounts(
    function: &Function,
    data: &[u8],
    fill_data: &mut FillData,
) -> SamplerResult<Vec<U256>> {
    let tokens = function
        .decode_output(data)
        .map_err(|e| SamplerError::abi(&function.name, e))?;
    let (is_sell_base, pool_address, amounts) = match tokens.as_slice() {
        [Token::Bool(is_sell_base), Token::Address(pool), Token::Array(amounts)] => {
            (*is_sell_base, *pool, amounts)
        }
        _ => return Err(SamplerError::malformed(&function.name, "expected (bool, address, uint256[])")),
    };
    let amounts = amounts
        .iter()
        .map(|token| token.clone().into_uint())
        .collect::<Option<Vec<_>>>()
        .ok_or_else(|| SamplerError::malformed(&function.name, "non-uint amount"))?;

    if let FillData::DodoV2(dodo) = fill_data {
        dodo.pool_address = pool_address;
        dodo.is_sell_base = is_sell_base;
    }
    Ok(amounts)
}
