use ethers::abi::Token;
use ethers::types::{Address, U256};

use super::{amounts_token, side_function};
use crate::constants::MakerPsmInfo;
use crate::errors::SamplerResult;
use crate::operations::{SamplerContractOperation, SourceQuoteOperation};
use crate::types::{FillData, MakerPsmFillData, MarketOperation, Source};

/// The PSM only swaps DAI against its gem token.
pub fn supports_pair(info: &MakerPsmInfo, dai: Address, taker_token: Address, maker_token: Address) -> bool {
    (taker_token == dai && maker_token == info.gem_token_address)
        || (taker_token == info.gem_token_address && maker_token == dai)
}

pub fn quote(
    side: MarketOperation,
    info: &MakerPsmInfo,
    taker_token: Address,
    maker_token: Address,
    amounts: &[U256],
) -> SamplerResult<SourceQuoteOperation> {
    let psm_info = Token::Tuple(vec![
        Token::Address(info.psm_address),
        Token::FixedBytes(info.ilk_identifier.as_bytes().to_vec()),
        Token::Address(info.gem_token_address),
    ]);
    let op = SamplerContractOperation::new(
        Source::MakerPsm,
        side_function(side, "sampleSellsFromMakerPsm", "sampleBuysFromMakerPsm"),
        vec![
            psm_info,
            Token::Address(taker_token),
            Token::Address(maker_token),
            amounts_token(amounts),
        ],
        FillData::MakerPsm(MakerPsmFillData {
            psm_address: info.psm_address,
            ilk_identifier: info.ilk_identifier,
            gem_token_address: info.gem_token_address,
            is_sell_operation: side == MarketOperation::Sell,
            taker_token,
            maker_token,
        }),
    )?;
    Ok(SourceQuoteOperation::contract(Source::MakerPsm, op))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::{maker_psm_info, mainnet};
    use crate::types::ChainId;

    #[test]
    fn only_dai_gem_pairs_are_supported() {
        let info = maker_psm_info(ChainId::Mainnet).unwrap();
        assert!(supports_pair(&info, mainnet::DAI, mainnet::USDC, mainnet::DAI));
        assert!(supports_pair(&info, mainnet::DAI, mainnet::DAI, mainnet::USDC));
        assert!(!supports_pair(&info, mainnet::DAI, mainnet::USDT, mainnet::DAI));
    }

    #[test]
    fn buy_side_is_flagged_in_fill_data() {
        let info = maker_psm_info(ChainId::Mainnet).unwrap();
        let op = quote(MarketOperation::Buy, &info, mainnet::USDC, mainnet::DAI, &[U256::one()])
            .unwrap();
        match op.fill_data() {
            FillData::MakerPsm(psm) => assert!(!psm.is_sell_operation),
            other => panic!("unexpected fill data {:?}", other),
        }
    }
}
