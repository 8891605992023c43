//! Runs sampler operations in a single round trip.

use ethers::types::Bytes;
use tracing::debug;

use crate::errors::{SamplerError, SamplerResult};
use crate::metrics;
use crate::multicall::SamplerTransport;
use crate::operations::{dispatch_result, is_no_op_call, route_results, BatchedOperation, CallResult};

pub struct SamplerBatchExecutor<T> {
    transport: T,
}

impl<T: SamplerTransport> SamplerBatchExecutor<T> {
    pub fn new(transport: T) -> Self {
        Self { transport }
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub async fn execute<Op: BatchedOperation>(&self, op: Op) -> SamplerResult<Op::Output> {
        let mut outputs = self.execute_batch(vec![op]).await?;
        outputs
            .pop()
            .ok_or(SamplerError::ResultCountMismatch { expected: 1, actual: 0 })
    }

    /// Encodes every operation, sends the non-empty calls as one `batchCall`
    /// and hands each operation its own result. Only a transport failure
    /// fails the whole batch.
    pub async fn execute_batch<Op: BatchedOperation>(
        &self,
        mut ops: Vec<Op>,
    ) -> SamplerResult<Vec<Op::Output>> {
        let encoded: Vec<Bytes> = ops.iter().map(|op| op.encode_call()).collect();
        let results = self.send(&encoded).await?;
        route_results(&mut ops, &encoded, results)
    }

    /// Two operations with different outputs, still one round trip.
    pub async fn execute_pair<A, B>(
        &self,
        mut a: A,
        mut b: B,
    ) -> SamplerResult<(A::Output, B::Output)>
    where
        A: BatchedOperation,
        B: BatchedOperation,
    {
        let encoded = [a.encode_call(), b.encode_call()];
        let mut results = self.send(&encoded).await?.into_iter();
        let out_a = dispatch_result(&mut a, &encoded[0], &mut results);
        let out_b = dispatch_result(&mut b, &encoded[1], &mut results);
        Ok((out_a, out_b))
    }

    async fn send(&self, encoded: &[Bytes]) -> SamplerResult<Vec<CallResult>> {
        let pending: Vec<Bytes> = encoded
            .iter()
            .filter(|call| !is_no_op_call(call))
            .cloned()
            .collect();
        if pending.is_empty() {
            debug!(operations = encoded.len(), "every operation is a no-op, skipping call");
            metrics::increment_batch_skipped();
            return Ok(Vec::new());
        }

        debug!(
            operations = encoded.len(),
            calls = pending.len(),
            "sending sampler batch"
        );
        metrics::record_batch_call(pending.len());
        let expected = pending.len();
        let results = self.transport.batch_call(pending).await?;
        if results.len() != expected {
            return Err(SamplerError::ResultCountMismatch {
                expected,
                actual: results.len(),
            });
        }
        Ok(results)
    }
}
