//! Sampler operations: one on-chain read each, batched by the executor.
//!
//! An operation is encoded once, and after the batch returns exactly one of
//! [`BatchedOperation::handle_call_results`] or
//! [`BatchedOperation::handle_revert`] is invoked on it. Both handlers are
//! infallible: decode problems are logged and resolve to a neutral value so
//! one venue never aborts the batch.

mod batch_operation;
mod no_operation;
mod sampler_contract_operation;
mod source_quote;
mod two_hop;

pub use batch_operation::BatchOperation;
pub use no_operation::SamplerNoOperation;
pub use sampler_contract_operation::{
    decode_return_data, DecodeReturnData, ResultHandler, SamplerContractOperation,
};
pub use source_quote::SourceQuoteOperation;
pub use two_hop::TwoHopOperation;

use ethers::abi::{self, ParamType, Token};
use ethers::types::{Bytes, U256};

use crate::contracts::sampler_function;
use crate::errors::{SamplerError, SamplerResult};

const ERROR_STRING_SELECTOR: [u8; 4] = [0x08, 0xc3, 0x79, 0xa0];
const PANIC_SELECTOR: [u8; 4] = [0x4e, 0x48, 0x7b, 0x71];

pub trait BatchedOperation: Send {
    type Output;

    /// Calldata for the sampler contract. Empty bytes mean "nothing to ask".
    fn encode_call(&self) -> Bytes;

    fn handle_call_results(&mut self, data: &[u8]) -> Self::Output;

    fn handle_revert(&mut self, data: &[u8]) -> Self::Output;
}

impl<T: BatchedOperation + ?Sized> BatchedOperation for Box<T> {
    type Output = T::Output;

    fn encode_call(&self) -> Bytes {
        (**self).encode_call()
    }

    fn handle_call_results(&mut self, data: &[u8]) -> Self::Output {
        (**self).handle_call_results(data)
    }

    fn handle_revert(&mut self, data: &[u8]) -> Self::Output {
        (**self).handle_revert(data)
    }
}

pub type BoxedOperation<O> = Box<dyn BatchedOperation<Output = O>>;

/// Per-sub-call outcome of a `batchCall`.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CallResult {
    pub success: bool,
    pub data: Bytes,
}

pub fn is_no_op_call(calldata: &[u8]) -> bool {
    calldata.is_empty()
}

/// Encodes `batchCall(bytes[])` over the given sub-calls.
pub fn encode_batch_call(calls: &[Bytes]) -> SamplerResult<Bytes> {
    let function = sampler_function("batchCall")?;
    let calls = calls.iter().map(|c| Token::Bytes(c.to_vec())).collect();
    function
        .encode_input(&[Token::Array(calls)])
        .map(Bytes::from)
        .map_err(|e| SamplerError::abi("batchCall", e))
}

/// Decodes the return data of `batchCall(bytes[])`.
pub fn decode_batch_call_results(data: &[u8]) -> SamplerResult<Vec<CallResult>> {
    let function = sampler_function("batchCall")?;
    let tokens = function
        .decode_output(data)
        .map_err(|e| SamplerError::abi("batchCall", e))?;
    let results = tokens
        .into_iter()
        .next()
        .and_then(|t| t.into_array())
        .ok_or_else(|| SamplerError::malformed("batchCall", "expected an array of results"))?;

    results
        .into_iter()
        .map(|result| match result {
            Token::Tuple(fields) => match fields.as_slice() {
                [Token::Bytes(data), Token::Bool(success)] => Ok(CallResult {
                    success: *success,
                    data: Bytes::from(data.clone()),
                }),
                _ => Err(SamplerError::malformed("batchCall", "unexpected result tuple")),
            },
            _ => Err(SamplerError::malformed("batchCall", "result is not a tuple")),
        })
        .collect()
}

/// Feeds batch results back to the operations that produced `encoded`.
///
/// `results` only covers the non-empty calls; no-op entries are answered
/// with an empty payload in their original position.
pub fn route_results<Op: BatchedOperation>(
    ops: &mut [Op],
    encoded: &[Bytes],
    results: Vec<CallResult>,
) -> SamplerResult<Vec<Op::Output>> {
    let expected = encoded.iter().filter(|c| !is_no_op_call(c)).count();
    if results.len() != expected {
        return Err(SamplerError::ResultCountMismatch {
            expected,
            actual: results.len(),
        });
    }

    let mut results = results.into_iter();
    let outputs = ops
        .iter_mut()
        .zip(encoded)
        .map(|(op, calldata)| dispatch_result(op, calldata, &mut results))
        .collect();
    Ok(outputs)
}

/// Hands one operation its result. No-op calls consume nothing from
/// `results`; a missing result is treated as a revert with no data.
pub fn dispatch_result<Op: BatchedOperation>(
    op: &mut Op,
    calldata: &[u8],
    results: &mut impl Iterator<Item = CallResult>,
) -> Op::Output {
    if is_no_op_call(calldata) {
        return op.handle_call_results(&[]);
    }
    match results.next() {
        Some(CallResult { success: true, data }) => op.handle_call_results(&data),
        Some(CallResult { success: false, data }) => op.handle_revert(&data),
        None => op.handle_revert(&[]),
    }
}

/// Best-effort human readable revert reason.
pub fn decode_revert_reason(data: &[u8]) -> Option<String> {
    if data.len() < 4 {
        return None;
    }
    let (selector, payload) = data.split_at(4);
    if selector == ERROR_STRING_SELECTOR {
        return abi::decode(&[ParamType::String], payload)
            .ok()
            .and_then(|t| t.into_iter().next())
            .and_then(|t| t.into_string());
    }
    if selector == PANIC_SELECTOR {
        return abi::decode(&[ParamType::Uint(256)], payload)
            .ok()
            .and_then(|t| t.into_iter().next())
            .and_then(|t| t.into_uint())
            .map(|code: U256| format!("Panic(0x{:x})", code));
    }
    Some(format!("0x{}", hex::encode(data)))
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Echo {
        calldata: Bytes,
    }

    impl BatchedOperation for Echo {
        type Output = String;

        fn encode_call(&self) -> Bytes {
            self.calldata.clone()
        }

        fn handle_call_results(&mut self, data: &[u8]) -> String {
            format!("ok:{}", hex::encode(data))
        }

        fn handle_revert(&mut self, data: &[u8]) -> String {
            format!("revert:{}", hex::encode(data))
        }
    }

    fn echo(calldata: &[u8]) -> Echo {
        Echo {
            calldata: Bytes::from(calldata.to_vec()),
        }
    }

    #[test]
    fn routing_rethreads_no_ops_in_place() {
        let mut ops = vec![echo(&[1]), echo(&[]), echo(&[2])];
        let encoded: Vec<Bytes> = ops.iter().map(|o| o.encode_call()).collect();
        let results = vec![
            CallResult { success: true, data: Bytes::from(vec![0xaa]) },
            CallResult { success: false, data: Bytes::from(vec![0xbb]) },
        ];
        let outputs = route_results(&mut ops, &encoded, results).unwrap();
        assert_eq!(outputs, vec!["ok:aa", "ok:", "revert:bb"]);
    }

    #[test]
    fn routing_rejects_short_results() {
        let mut ops = vec![echo(&[1]), echo(&[2])];
        let encoded: Vec<Bytes> = ops.iter().map(|o| o.encode_call()).collect();
        let err = route_results(&mut ops, &encoded, vec![CallResult::default()]).unwrap_err();
        assert!(matches!(
            err,
            SamplerError::ResultCountMismatch { expected: 2, actual: 1 }
        ));
    }

    #[test]
    fn batch_call_results_decode() {
        let encoded = abi::encode(&[Token::Array(vec![
            Token::Tuple(vec![Token::Bytes(vec![1, 2]), Token::Bool(true)]),
            Token::Tuple(vec![Token::Bytes(vec![]), Token::Bool(false)]),
        ])]);
        let results = decode_batch_call_results(&encoded).unwrap();
        assert_eq!(
            results,
            vec![
                CallResult { success: true, data: Bytes::from(vec![1, 2]) },
                CallResult { success: false, data: Bytes::new() },
            ]
        );
    }

    #[test]
    fn revert_reasons_decode() {
        let mut error = ERROR_STRING_SELECTOR.to_vec();
        error.extend(abi::encode(&[Token::String("UniswapV2: K".into())]));
        assert_eq!(decode_revert_reason(&error).as_deref(), Some("UniswapV2: K"));

        let mut panic = PANIC_SELECTOR.to_vec();
        panic.extend(abi::encode(&[Token::Uint(U256::from(0x11))]));
        assert_eq!(decode_revert_reason(&panic).as_deref(), Some("Panic(0x11)"));

        assert_eq!(decode_revert_reason(&[]), None);
        assert_eq!(decode_revert_reason(&[1, 2, 3, 4]).as_deref(), Some("0x01020304"));
    }
}
