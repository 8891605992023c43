use ethers::abi::Token;
use ethers::types::{Address, U256};

use super::{addresses_token, amounts_token, side_function};
use crate::errors::{SamplerError, SamplerResult};
use crate::operations::{SamplerContractOperation, SourceQuoteOperation};
use crate::types::{
    BalancerSwapInfo, BalancerSwapStep, BalancerV2BatchSwapFillData, ChainId, FillData,
    MarketOperation, Source,
};

/// Quote one batch-swap plan through the vault.
pub fn quote(
    side: MarketOperation,
    vault: Address,
    chain_id: ChainId,
    plan: &BalancerSwapInfo,
    amounts: &[U256],
) -> SamplerResult<SourceQuoteOperation> {
    validate_plan(plan)?;
    let steps = Token::Array(plan.swap_steps.iter().map(step_token).collect());
    let op = SamplerContractOperation::new(
        Source::BalancerV2,
        side_function(
            side,
            "sampleMultihopSellsFromBalancerV2",
            "sampleMultihopBuysFromBalancerV2",
        ),
        vec![
            Token::Address(vault),
            steps,
            addresses_token(&plan.assets),
            amounts_token(amounts),
        ],
        FillData::BalancerV2(BalancerV2BatchSwapFillData {
            vault,
            swap_steps: plan.swap_steps.clone(),
            assets: plan.assets.clone(),
            chain_id,
        }),
    )?;
    Ok(SourceQuoteOperation::contract(Source::BalancerV2, op))
}

fn step_token(step: &BalancerSwapStep) -> Token {
    Token::Tuple(vec![
        Token::FixedBytes(step.pool_id.as_bytes().to_vec()),
        Token::Uint(U256::from(step.asset_in_index)),
        Token::Uint(U256::from(step.asset_out_index)),
        Token::Uint(step.amount),
        Token::Bytes(step.user_data.to_vec()),
    ])
}

/// Every step must index into the plan's asset list.
fn validate_plan(plan: &BalancerSwapInfo) -> SamplerResult<()> {
    if plan.swap_steps.is_empty() {
        return Err(SamplerError::InvalidPlan {
            venue: Source::BalancerV2,
            reason: "plan has no swap steps".to_string(),
        });
    }
    let asset_count = plan.assets.len();
    for (i, step) in plan.swap_steps.iter().enumerate() {
        if step.asset_in_index >= asset_count || step.asset_out_index >= asset_count {
            return Err(SamplerError::InvalidPlan {
                venue: Source::BalancerV2,
                reason: format!(
                    "step {} indexes assets {}->{} of {}",
                    i, step.asset_in_index, step.asset_out_index, asset_count
                ),
            });
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use ethers::types::{Bytes, H256};

    fn plan(asset_out_index: usize) -> BalancerSwapInfo {
        BalancerSwapInfo {
            assets: vec![Address::repeat_byte(1), Address::repeat_byte(2)],
            swap_steps: vec![BalancerSwapStep {
                pool_id: H256::repeat_byte(0x42),
                asset_in_index: 0,
                asset_out_index,
                amount: U256::zero(),
                user_data: Bytes::new(),
            }],
        }
    }

    #[test]
    fn valid_plan_builds_an_operation() {
        let op = quote(
            MarketOperation::Sell,
            Address::repeat_byte(0xba),
            ChainId::Mainnet,
            &plan(1),
            &[U256::one()],
        )
        .unwrap();
        assert_eq!(op.function_name(), Some("sampleMultihopSellsFromBalancerV2"));
        assert!(matches!(op.fill_data(), FillData::BalancerV2(f) if f.assets.len() == 2));
    }

    #[test]
    fn out_of_range_step_is_rejected() {
        let err = quote(
            MarketOperation::Buy,
            Address::repeat_byte(0xba),
            ChainId::Mainnet,
            &plan(5),
            &[U256::one()],
        )
        .err()
        .unwrap();
        assert!(matches!(err, SamplerError::InvalidPlan { venue: Source::BalancerV2, .. }));
    }
}
