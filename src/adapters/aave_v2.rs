use ethers::types::{Address, U256};

use crate::caches::AaveReserve;
use crate::operations::{SamplerNoOperation, SourceQuoteOperation};
use crate::types::{AaveV2FillData, FillData, Source};

/// Deposits and withdrawals convert 1:1, so the quote is the amounts
/// themselves and nothing is sent on-chain. Same for both sides.
pub fn quote(reserve: &AaveReserve, taker_token: Address, amounts: &[U256]) -> SourceQuoteOperation {
    let outputs = amounts.to_vec();
    SourceQuoteOperation::no_op(
        Source::AaveV2,
        SamplerNoOperation::new(
            Source::AaveV2,
            FillData::AaveV2(AaveV2FillData {
                lending_pool: reserve.lending_pool,
                a_token: reserve.a_token,
                underlying_token: reserve.underlying_asset,
                taker_token,
            }),
            move || outputs.clone(),
        ),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::operations::{is_no_op_call, BatchedOperation};

    #[test]
    fn quote_is_one_to_one_and_never_sent() {
        let reserve = AaveReserve {
            id: "dai".to_string(),
            underlying_asset: Address::repeat_byte(1),
            a_token: Address::repeat_byte(2),
            lending_pool: Address::repeat_byte(3),
        };
        let amounts = [U256::from(5), U256::from(50)];
        let mut op = quote(&reserve, reserve.a_token, &amounts);
        assert!(is_no_op_call(&op.encode_call()));
        let quote = op.handle_call_results(&[]);
        assert_eq!(quote.outputs, amounts.to_vec());
        assert_eq!(quote.source, Source::AaveV2);
    }
}
