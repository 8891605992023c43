use anyhow::{anyhow, Result};
use async_trait::async_trait;
use ethers::prelude::*;
use indexmap::IndexMap;
use log::debug;
use std::sync::Arc;
use std::time::Duration;

use crate::operations::{decode_batch_call_results, encode_batch_call, CallResult};

/// Executes one batched read-only call against the sampler contract and
/// returns a `{success, data}` pair per sub-call, in order.
#[async_trait]
pub trait SamplerTransport: Send + Sync {
    async fn batch_call(&self, calls: Vec<Bytes>) -> Result<Vec<CallResult>>;
}

#[async_trait]
impl<T: SamplerTransport + ?Sized> SamplerTransport for Arc<T> {
    async fn batch_call(&self, calls: Vec<Bytes>) -> Result<Vec<CallResult>> {
        (**self).batch_call(calls).await
    }
}

/// `eth_call` transport for a deployed ERC20BridgeSampler.
///
/// Identical sub-calls are coalesced before sending and fanned back out
/// afterwards, so callers always see one result per call they passed in.
#[derive(Clone)]
pub struct SamplerContract<M: Middleware> {
    provider: Arc<M>,
    sampler_address: Address,
    block: Option<BlockId>,
    timeout: Option<Duration>,
}

impl<M: Middleware + 'static> SamplerContract<M> {
    pub fn new(provider: Arc<M>, sampler_address: Address) -> Self {
        Self {
            provider,
            sampler_address,
            block: None,
            timeout: None,
        }
    }

    /// Pins every call to a block instead of `latest`.
    pub fn with_block(mut self, block: BlockId) -> Self {
        self.block = Some(block);
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn address(&self) -> Address {
        self.sampler_address
    }

    async fn execute_batch_call(&self, calls: &[Bytes]) -> Result<Vec<CallResult>> {
        let calldata = encode_batch_call(calls)?;

        let tx_request = TransactionRequest::new()
            .to(self.sampler_address)
            .data(calldata);
        let typed_tx: ethers::types::transaction::eip2718::TypedTransaction = tx_request.into();
        let request = self.provider.call(&typed_tx, self.block);

        let response = match self.timeout {
            Some(timeout) => tokio::time::timeout(timeout, request)
                .await
                .map_err(|_| anyhow!("sampler batchCall timed out after {:?}", timeout))?,
            None => request.await,
        }
        .map_err(|e| anyhow!("sampler batchCall failed: {}", e))?;

        Ok(decode_batch_call_results(&response)?)
    }
}

#[async_trait]
impl<M: Middleware + 'static> SamplerTransport for SamplerContract<M> {
    async fn batch_call(&self, calls: Vec<Bytes>) -> Result<Vec<CallResult>> {
        if calls.is_empty() {
            return Ok(Vec::new());
        }

        // Coalesce identical calls to reduce load
        let mut unique_calls: IndexMap<Bytes, ()> = IndexMap::new();
        let original_indices: Vec<usize> = calls
            .iter()
            .map(|call| unique_calls.insert_full(call.clone(), ()).0)
            .collect();
        let unique_calls: Vec<Bytes> = unique_calls.into_keys().collect();
        debug!(
            "Sampler batch coalesced {} calls into {}",
            calls.len(),
            unique_calls.len()
        );

        let unique_results = self.execute_batch_call(&unique_calls).await?;
        if unique_results.len() != unique_calls.len() {
            return Err(anyhow!(
                "sampler returned {} results for {} calls",
                unique_results.len(),
                unique_calls.len()
            ));
        }

        Ok(original_indices
            .into_iter()
            .map(|index| unique_results[index].clone())
            .collect())
    }
}
