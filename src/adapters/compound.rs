use ethers::abi::Token;
use ethers::types::{Address, U256};

use super::{amounts_token, side_function};
use crate::errors::SamplerResult;
use crate::operations::{SamplerContractOperation, SourceQuoteOperation};
use crate::types::{CompoundFillData, FillData, MarketOperation, Source};

/// Mint or redeem quote against a cToken.
pub fn quote(
    side: MarketOperation,
    c_token: Address,
    taker_token: Address,
    maker_token: Address,
    amounts: &[U256],
) -> SamplerResult<SourceQuoteOperation> {
    let op = SamplerContractOperation::new(
        Source::Compound,
        side_function(side, "sampleSellsFromCompound", "sampleBuysFromCompound"),
        vec![
            Token::Address(c_token),
            Token::Address(taker_token),
            Token::Address(maker_token),
            amounts_token(amounts),
        ],
        FillData::Compound(CompoundFillData {
            c_token,
            taker_token,
            maker_token,
        }),
    )?;
    Ok(SourceQuoteOperation::contract(Source::Compound, op))
}
