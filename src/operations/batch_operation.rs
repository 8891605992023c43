use ethers::types::Bytes;
use log::warn;

use super::{
    decode_batch_call_results, decode_revert_reason, encode_batch_call, is_no_op_call,
    route_results, BatchedOperation,
};

type Reducer<O, R> = Box<dyn Fn(Vec<O>) -> R + Send + Sync>;

/// A nested `batchCall` over child operations, reduced to a single value.
///
/// Encodes to the no-op sentinel when every child does, so a batch of local
/// answers never reaches the network.
pub struct BatchOperation<Op: BatchedOperation, R> {
    children: Vec<Op>,
    reduce: Reducer<Op::Output, R>,
}

impl<Op: BatchedOperation, R> BatchOperation<Op, R> {
    pub fn new(
        children: Vec<Op>,
        reduce: impl Fn(Vec<Op::Output>) -> R + Send + Sync + 'static,
    ) -> Self {
        Self {
            children,
            reduce: Box::new(reduce),
        }
    }

    pub fn children(&self) -> &[Op] {
        &self.children
    }

    fn child_calls(&self) -> Vec<Bytes> {
        self.children.iter().map(|c| c.encode_call()).collect()
    }

    fn revert_children(&mut self) -> R {
        let outputs = self.children.iter_mut().map(|c| c.handle_revert(&[])).collect();
        (self.reduce)(outputs)
    }
}

impl<Op> BatchOperation<Op, Vec<Op::Output>>
where
    Op: BatchedOperation,
    Op::Output: 'static,
{
    /// Children's outputs, unreduced.
    pub fn collect(children: Vec<Op>) -> Self {
        Self::new(children, |outputs| outputs)
    }
}

impl<Op, R> BatchedOperation for BatchOperation<Op, R>
where
    Op: BatchedOperation,
{
    type Output = R;

    fn encode_call(&self) -> Bytes {
        let calls: Vec<Bytes> = self
            .child_calls()
            .into_iter()
            .filter(|c| !is_no_op_call(c))
            .collect();
        if calls.is_empty() {
            return Bytes::new();
        }
        encode_batch_call(&calls).unwrap_or_else(|e| {
            warn!("Failed to encode nested batch: {}", e);
            Bytes::new()
        })
    }

    fn handle_call_results(&mut self, data: &[u8]) -> R {
        let encoded = self.child_calls();
        let results = if is_no_op_call(data) {
            Ok(Vec::new())
        } else {
            decode_batch_call_results(data)
        };
        match results.and_then(|results| route_results(&mut self.children, &encoded, results)) {
            Ok(outputs) => (self.reduce)(outputs),
            Err(e) => {
                warn!("Nested batch of {} calls is malformed: {}", encoded.len(), e);
                self.revert_children()
            }
        }
    }

    fn handle_revert(&mut self, data: &[u8]) -> R {
        warn!(
            "Nested batch reverted: {}",
            decode_revert_reason(data).unwrap_or_else(|| "no reason".to_string())
        );
        self.revert_children()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::operations::{CallResult, SamplerNoOperation};
    use crate::types::{FillData, Source};
    use ethers::abi::{self, Token};

    struct Fixed(Vec<u8>);

    impl BatchedOperation for Fixed {
        type Output = Option<Vec<u8>>;

        fn encode_call(&self) -> Bytes {
            Bytes::from(self.0.clone())
        }

        fn handle_call_results(&mut self, data: &[u8]) -> Self::Output {
            Some(data.to_vec())
        }

        fn handle_revert(&mut self, _data: &[u8]) -> Self::Output {
            None
        }
    }

    fn encode_results(results: &[CallResult]) -> Vec<u8> {
        abi::encode(&[Token::Array(
            results
                .iter()
                .map(|r| Token::Tuple(vec![Token::Bytes(r.data.to_vec()), Token::Bool(r.success)]))
                .collect(),
        )])
    }

    #[test]
    fn all_no_op_children_make_a_no_op_batch() {
        let mut batch = BatchOperation::collect(vec![
            SamplerNoOperation::new(Source::AaveV2, FillData::None, || 7u8),
            SamplerNoOperation::new(Source::Compound, FillData::None, || 9u8),
        ]);
        assert!(batch.encode_call().is_empty());
        assert_eq!(batch.handle_call_results(&[]), vec![7, 9]);
    }

    #[test]
    fn nested_results_are_demultiplexed() {
        let mut batch = BatchOperation::collect(vec![Fixed(vec![1]), Fixed(vec![]), Fixed(vec![2])]);
        assert!(!batch.encode_call().is_empty());

        let data = encode_results(&[
            CallResult { success: true, data: Bytes::from(vec![0x10]) },
            CallResult { success: false, data: Bytes::new() },
        ]);
        assert_eq!(
            batch.handle_call_results(&data),
            vec![Some(vec![0x10]), Some(vec![]), None]
        );
    }

    #[test]
    fn malformed_payload_reverts_every_child() {
        let mut batch = BatchOperation::new(vec![Fixed(vec![1]), Fixed(vec![2])], |outputs| {
            outputs.iter().filter(|o| o.is_none()).count()
        });
        assert_eq!(batch.handle_call_results(&[0xff; 3]), 2);
    }
}
