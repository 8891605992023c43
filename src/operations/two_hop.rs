use ethers::abi::Token;
use ethers::types::{Address, Bytes, U256};
use log::{debug, warn};

use super::{decode_revert_reason, BatchedOperation, SourceQuoteOperation};
use crate::contracts::sampler_function;
use crate::errors::{SamplerError, SamplerResult};
use crate::types::{DexSample, FillData, HopFillData, MarketOperation, Source, TwoHopFillData};

/// Route through one intermediate token. The sampler contract tries every
/// first-hop/second-hop combination and reports the winning indices, which
/// are then decoded by the winning child operations themselves.
pub struct TwoHopOperation {
    side: MarketOperation,
    intermediate_token: Address,
    amount: U256,
    first_hop_ops: Vec<SourceQuoteOperation>,
    second_hop_ops: Vec<SourceQuoteOperation>,
    calldata: Bytes,
}

struct HopInfo {
    source_index: usize,
    return_data: Vec<u8>,
}

impl TwoHopOperation {
    pub fn new(
        side: MarketOperation,
        intermediate_token: Address,
        amount: U256,
        first_hop_ops: Vec<SourceQuoteOperation>,
        second_hop_ops: Vec<SourceQuoteOperation>,
    ) -> SamplerResult<Self> {
        let function_name = Self::function_name_for(side);
        let function = sampler_function(function_name)?;
        let calls = |ops: &[SourceQuoteOperation]| {
            Token::Array(
                ops.iter()
                    .map(|op| Token::Bytes(op.encode_call().to_vec()))
                    .collect(),
            )
        };
        let calldata = function
            .encode_input(&[
                calls(&first_hop_ops),
                calls(&second_hop_ops),
                Token::Uint(amount),
            ])
            .map_err(|e| SamplerError::abi(function_name, e))?;
        Ok(Self {
            side,
            intermediate_token,
            amount,
            first_hop_ops,
            second_hop_ops,
            calldata: Bytes::from(calldata),
        })
    }

    fn function_name_for(side: MarketOperation) -> &'static str {
        match side {
            MarketOperation::Sell => "sampleTwoHopSell",
            MarketOperation::Buy => "sampleTwoHopBuy",
        }
    }

    pub fn intermediate_token(&self) -> Address {
        self.intermediate_token
    }

    /// The contract's "no route" answer for this side.
    fn infeasible_amount(&self) -> U256 {
        match self.side {
            MarketOperation::Sell => U256::zero(),
            MarketOperation::Buy => U256::MAX,
        }
    }

    fn sample(&self, output: U256, fill_data: TwoHopFillData) -> DexSample {
        DexSample {
            source: Source::MultiHop,
            input: self.amount,
            output,
            fill_data: FillData::TwoHop(fill_data),
        }
    }

    fn infeasible(&self) -> DexSample {
        self.sample(
            U256::zero(),
            TwoHopFillData {
                intermediate_token: self.intermediate_token,
                first_hop_source: None,
                second_hop_source: None,
            },
        )
    }

    fn decode(&self, data: &[u8]) -> SamplerResult<(HopInfo, HopInfo, U256)> {
        let name = Self::function_name_for(self.side);
        let function = sampler_function(name)?;
        let mut tokens = function
            .decode_output(data)
            .map_err(|e| SamplerError::abi(name, e))?
            .into_iter();
        let mut hop = || -> SamplerResult<HopInfo> {
            match tokens.next() {
                Some(Token::Tuple(fields)) => match fields.as_slice() {
                    [Token::Uint(index), Token::Bytes(return_data)] => Ok(HopInfo {
                        source_index: index.low_u64() as usize,
                        return_data: return_data.clone(),
                    }),
                    _ => Err(SamplerError::malformed(name, "unexpected HopInfo fields")),
                },
                _ => Err(SamplerError::malformed(name, "missing HopInfo")),
            }
        };
        let first = hop()?;
        let second = hop()?;
        let amount = tokens
            .next()
            .and_then(Token::into_uint)
            .ok_or_else(|| SamplerError::malformed(name, "missing amount"))?;
        Ok((first, second, amount))
    }
}

fn winning_hop(ops: &mut [SourceQuoteOperation], hop: &HopInfo) -> Option<Box<HopFillData>> {
    let op = ops.get_mut(hop.source_index)?;
    let quote = op.handle_call_results(&hop.return_data);
    Some(Box::new(HopFillData {
        source: quote.source,
        fill_data: quote.fill_data,
    }))
}

impl BatchedOperation for TwoHopOperation {
    type Output = DexSample;

    fn encode_call(&self) -> Bytes {
        self.calldata.clone()
    }

    fn handle_call_results(&mut self, data: &[u8]) -> DexSample {
        let (first, second, amount) = match self.decode(data) {
            Ok(decoded) => decoded,
            Err(e) => {
                warn!(
                    "Two-hop sample via {:?} is undecodable: {}",
                    self.intermediate_token, e
                );
                return self.infeasible();
            }
        };
        if amount == self.infeasible_amount() {
            debug!("No two-hop route via {:?}", self.intermediate_token);
            return self.infeasible();
        }

        let first_hop_source = winning_hop(&mut self.first_hop_ops, &first);
        let second_hop_source = winning_hop(&mut self.second_hop_ops, &second);
        if first_hop_source.is_none() || second_hop_source.is_none() {
            warn!(
                "Two-hop result via {:?} names unknown hops {} / {}",
                self.intermediate_token, first.source_index, second.source_index
            );
            return self.infeasible();
        }

        self.sample(
            amount,
            TwoHopFillData {
                intermediate_token: self.intermediate_token,
                first_hop_source,
                second_hop_source,
            },
        )
    }

    fn handle_revert(&mut self, data: &[u8]) -> DexSample {
        warn!(
            "{} via {:?} reverted: {}",
            Self::function_name_for(self.side),
            self.intermediate_token,
            decode_revert_reason(data).unwrap_or_else(|| "no reason".to_string())
        );
        self.infeasible()
    }
}
