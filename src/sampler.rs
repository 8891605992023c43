//! `DexOrderSampler`: the operations factory bound to a transport.

use anyhow::{Context, Result};
use ethers::providers::Middleware;
use ethers::types::{Address, U256};
use log::info;
use rust_decimal::Decimal;
use std::sync::Arc;
use std::time::Duration;

use crate::batch_executor::SamplerBatchExecutor;
use crate::caches::{
    AaveV2ReservesCache, BalancerPoolsCache, BalancerV2SwapInfoCache, CompoundCTokenCache,
    SubgraphClient,
};
use crate::constants::wrapped_native_token;
use crate::errors::SamplerResult;
use crate::multicall::{SamplerContract, SamplerTransport};
use crate::operations::BatchedOperation;
use crate::sample_amounts::get_sample_amounts_with_base;
use crate::sampler_operations::{FeeSchedule, SamplerOperations};
use crate::settings::Settings;
use crate::types::{DexSample, Source};

pub struct DexOrderSampler<T> {
    operations: SamplerOperations,
    executor: SamplerBatchExecutor<T>,
    num_samples: usize,
    distribution_base: Decimal,
}

impl<M: Middleware + 'static> DexOrderSampler<SamplerContract<M>> {
    /// Wires the sampler contract and every cache the chain has endpoints
    /// for. Cache refresh loops start immediately, so this must run inside a
    /// Tokio runtime.
    pub fn from_settings(settings: &Settings, provider: Arc<M>) -> Result<Self> {
        let chain_id = settings.chain_id()?;
        let caches = &settings.caches;
        let http_timeout = caches.http_timeout();
        let client = |url: String| SubgraphClient::new(url, http_timeout);

        let mut operations = SamplerOperations::new(chain_id)
            .with_fresh_lookup_timeout(caches.fresh_lookup_timeout());
        if let Some(url) = settings.aave_v2_subgraph_url() {
            operations = operations.with_aave_v2_cache(Arc::new(AaveV2ReservesCache::new(
                client(url)?,
                caches.reserves_refresh_interval(),
            )));
        }
        if let Some(url) = settings.compound_api_url() {
            operations = operations.with_compound_cache(Arc::new(CompoundCTokenCache::new(
                client(url)?,
                wrapped_native_token(chain_id),
                caches.reserves_refresh_interval(),
            )));
        }
        if let Some(url) = settings.balancer_subgraph_url() {
            operations = operations.with_balancer_cache(Arc::new(BalancerPoolsCache::new(
                client(url)?,
                caches.pools_cache_ttl(),
            )));
        }
        if let Some(url) = settings.balancer_v2_subgraph_url() {
            operations = operations.with_balancer_v2_cache(Arc::new(BalancerV2SwapInfoCache::new(
                client(url)?,
                caches.balancer_v2_refresh_interval(),
                caches.pools_cache_ttl(),
            )));
        }

        let sampler_address = settings.sampler_address()?;
        let transport = SamplerContract::new(provider, sampler_address)
            .with_timeout(Duration::from_millis(settings.rpc.timeout_ms));
        info!(
            "Sampler ready on chain {} at {:?}",
            chain_id.id(),
            sampler_address
        );

        Ok(Self::new(operations, transport).with_sample_distribution(
            settings.sampling.num_samples,
            settings
                .distribution_base()
                .context("invalid sample distribution")?,
        ))
    }
}

impl<T: SamplerTransport> DexOrderSampler<T> {
    pub fn new(operations: SamplerOperations, transport: T) -> Self {
        Self {
            operations,
            executor: SamplerBatchExecutor::new(transport),
            num_samples: 13,
            distribution_base: Decimal::new(105, 2),
        }
    }

    pub fn with_sample_distribution(mut self, num_samples: usize, distribution_base: Decimal) -> Self {
        self.num_samples = num_samples;
        self.distribution_base = distribution_base;
        self
    }

    pub fn operations(&self) -> &SamplerOperations {
        &self.operations
    }

    pub fn transport(&self) -> &T {
        self.executor.transport()
    }

    /// The configured sample ladder up to `max_fill_amount`.
    pub fn sample_amounts_for(&self, max_fill_amount: U256) -> SamplerResult<Vec<U256>> {
        get_sample_amounts_with_base(max_fill_amount, self.num_samples, self.distribution_base)
    }

    pub async fn execute<Op: BatchedOperation>(&self, op: Op) -> SamplerResult<Op::Output> {
        self.executor.execute(op).await
    }

    pub async fn execute_batch<Op: BatchedOperation>(&self, ops: Vec<Op>) -> SamplerResult<Vec<Op::Output>> {
        self.executor.execute_batch(ops).await
    }

    pub async fn execute_pair<A, B>(&self, a: A, b: B) -> SamplerResult<(A::Output, B::Output)>
    where
        A: BatchedOperation,
        B: BatchedOperation,
    {
        self.executor.execute_pair(a, b).await
    }

    pub async fn get_sell_quotes(
        &self,
        sources: &[Source],
        maker_token: Address,
        taker_token: Address,
        taker_fill_amounts: &[U256],
    ) -> SamplerResult<Vec<Vec<DexSample>>> {
        self.operations
            .warm_pair_caches(sources, taker_token, maker_token)
            .await;
        let op = self
            .operations
            .get_sell_quotes(sources, maker_token, taker_token, taker_fill_amounts)?;
        self.execute(op).await
    }

    pub async fn get_buy_quotes(
        &self,
        sources: &[Source],
        maker_token: Address,
        taker_token: Address,
        maker_fill_amounts: &[U256],
    ) -> SamplerResult<Vec<Vec<DexSample>>> {
        self.operations
            .warm_pair_caches(sources, taker_token, maker_token)
            .await;
        let op = self
            .operations
            .get_buy_quotes(sources, maker_token, taker_token, maker_fill_amounts)?;
        self.execute(op).await
    }

    pub async fn get_two_hop_sell_quotes(
        &self,
        sources: &[Source],
        maker_token: Address,
        taker_token: Address,
        sell_amount: U256,
    ) -> SamplerResult<Vec<DexSample>> {
        let op = self
            .operations
            .get_two_hop_sell_quotes(sources, maker_token, taker_token, sell_amount)?;
        self.execute(op).await
    }

    pub async fn get_two_hop_buy_quotes(
        &self,
        sources: &[Source],
        maker_token: Address,
        taker_token: Address,
        buy_amount: U256,
    ) -> SamplerResult<Vec<DexSample>> {
        let op = self
            .operations
            .get_two_hop_buy_quotes(sources, maker_token, taker_token, buy_amount)?;
        self.execute(op).await
    }

    /// Ties between fee-adjusted rates go to the earlier source in `sources`.
    pub async fn get_best_native_token_sell_rate(
        &self,
        sources: &[Source],
        maker_token: Address,
        sell_amount: U256,
        fee_schedule: &FeeSchedule,
    ) -> SamplerResult<Decimal> {
        let op = self.operations.get_best_native_token_sell_rate(
            sources,
            maker_token,
            sell_amount,
            fee_schedule,
        )?;
        self.execute(op).await
    }

    /// ERC20 decimals, 0 for tokens whose `decimals()` failed.
    pub async fn get_token_decimals(&self, tokens: &[Address]) -> SamplerResult<Vec<u8>> {
        let op = self.operations.get_token_decimals(tokens)?;
        let decimals = self.execute(op).await?;
        Ok(decimals
            .into_iter()
            .map(saturating_decimals)
            .collect())
    }
}

/// Values that do not fit a `u8` saturate rather than wrap.
fn saturating_decimals(decimals: U256) -> u8 {
    u8::try_from(decimals).unwrap_or(u8::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn oversized_decimals_saturate() {
        assert_eq!(saturating_decimals(U256::from(18)), 18);
        assert_eq!(saturating_decimals(U256::from(256)), u8::MAX);
        // 2^64 + 6 must not wrap through the low word
        let wide = (U256::one() << 64) + U256::from(6);
        assert_eq!(saturating_decimals(wide), u8::MAX);
        assert_eq!(saturating_decimals(U256::MAX), u8::MAX);
    }
}
