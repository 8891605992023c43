//! Builds ready-to-batch sampler operations for a pair.
//!
//! Venue resolution never fails the request: a venue that is not configured
//! for the chain, has no cached data for the pair, or errors while building
//! its operations simply contributes nothing. Only a source that cannot be
//! sampled per-venue at all is reported as an error.

use ethers::types::{Address, U256};
use log::{debug, warn};
use rust_decimal::Decimal;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use crate::adapters::{self, addresses_token};
use crate::caches::{AaveV2ReservesCache, BalancerPoolsCache, BalancerV2SwapInfoCache, CompoundCTokenCache};
use crate::constants::{
    self, balancer_v2_vault, curve_like_pools, dodo_v2_factories, is_rebasing_token,
    maker_psm_info, uniswap_v1_router, uniswap_v2_like_router, wrapped_native_token,
    DODO_V2_OFFSETS, NULL_ADDRESS,
};
use crate::errors::{SamplerError, SamplerResult};
use crate::operations::{
    is_no_op_call, BatchOperation, BatchedOperation, BoxedOperation, SamplerContractOperation,
    SamplerNoOperation, SourceQuoteOperation, TwoHopOperation,
};
use crate::source_filters::batch_source_filters;
use crate::token_adjacency_graph::TokenAdjacencyGraph;
use crate::types::conversions::u256_ratio;
use crate::types::{ChainId, DexSample, FillData, MarketOperation, Source, SourceQuote};

/// Converts a venue's gas cost for a fill into an amount of the sold token.
pub type FeeFn = Arc<dyn Fn(&FillData) -> U256 + Send + Sync>;
pub type FeeSchedule = HashMap<Source, FeeFn>;

/// Per-source sample groups, in the order the operations were built.
pub type QuotesOperation = BatchOperation<SourceQuoteOperation, Vec<Vec<DexSample>>>;
/// One sample per intermediate token that has operations on both hops.
pub type TwoHopQuotesOperation = BatchOperation<TwoHopOperation, Vec<DexSample>>;

pub struct SamplerOperations {
    chain_id: ChainId,
    token_adjacency_graph: TokenAdjacencyGraph,
    aave_v2_cache: Option<Arc<AaveV2ReservesCache>>,
    compound_cache: Option<Arc<CompoundCTokenCache>>,
    balancer_cache: Option<Arc<BalancerPoolsCache>>,
    balancer_v2_cache: Option<Arc<BalancerV2SwapInfoCache>>,
    fresh_lookup_timeout: Duration,
}

impl SamplerOperations {
    /// A factory with the chain's default adjacency graph and no caches.
    pub fn new(chain_id: ChainId) -> Self {
        Self {
            chain_id,
            token_adjacency_graph: constants::default_token_adjacency_graph(chain_id),
            aave_v2_cache: None,
            compound_cache: None,
            balancer_cache: None,
            balancer_v2_cache: None,
            fresh_lookup_timeout: Duration::from_secs(1),
        }
    }

    pub fn with_token_adjacency_graph(mut self, graph: TokenAdjacencyGraph) -> Self {
        self.token_adjacency_graph = graph;
        self
    }

    pub fn with_aave_v2_cache(mut self, cache: Arc<AaveV2ReservesCache>) -> Self {
        self.aave_v2_cache = Some(cache);
        self
    }

    pub fn with_compound_cache(mut self, cache: Arc<CompoundCTokenCache>) -> Self {
        self.compound_cache = Some(cache);
        self
    }

    pub fn with_balancer_cache(mut self, cache: Arc<BalancerPoolsCache>) -> Self {
        self.balancer_cache = Some(cache);
        self
    }

    pub fn with_balancer_v2_cache(mut self, cache: Arc<BalancerV2SwapInfoCache>) -> Self {
        self.balancer_v2_cache = Some(cache);
        self
    }

    pub fn with_fresh_lookup_timeout(mut self, timeout: Duration) -> Self {
        self.fresh_lookup_timeout = timeout;
        self
    }

    /// Makes sure the per-pair pool caches of the requested venues have the
    /// pair, waiting at most the fresh-lookup timeout. Caches of venues not in
    /// `sources` are left alone. Lookups that time out finish in the
    /// background.
    pub async fn warm_pair_caches(&self, sources: &[Source], taker_token: Address, maker_token: Address) {
        let requested = batch_source_filters().get_allowed(sources);
        let timeout = self.fresh_lookup_timeout;
        let balancer = async {
            match &self.balancer_cache {
                Some(cache) if requested.contains(&Source::Balancer) => {
                    cache.get_fresh_for_pair(taker_token, maker_token, timeout).await;
                }
                _ => {}
            }
        };
        let balancer_v2 = async {
            match &self.balancer_v2_cache {
                Some(cache) if requested.contains(&Source::BalancerV2) => {
                    cache.get_fresh_for_pair(taker_token, maker_token, timeout).await;
                }
                _ => {}
            }
        };
        futures::join!(balancer, balancer_v2);
    }

    pub fn chain_id(&self) -> ChainId {
        self.chain_id
    }

    pub fn token_adjacency_graph(&self) -> &TokenAdjacencyGraph {
        &self.token_adjacency_graph
    }

    pub fn get_token_decimals(&self, tokens: &[Address]) -> SamplerResult<SamplerContractOperation<Vec<U256>>> {
        SamplerContractOperation::new(
            None::<Source>,
            "getTokenDecimals",
            vec![addresses_token(tokens)],
            FillData::None,
        )
    }

    pub fn get_sell_quotes(
        &self,
        sources: &[Source],
        maker_token: Address,
        taker_token: Address,
        taker_fill_amounts: &[U256],
    ) -> SamplerResult<QuotesOperation> {
        self.get_quotes(MarketOperation::Sell, sources, maker_token, taker_token, taker_fill_amounts)
    }

    pub fn get_buy_quotes(
        &self,
        sources: &[Source],
        maker_token: Address,
        taker_token: Address,
        maker_fill_amounts: &[U256],
    ) -> SamplerResult<QuotesOperation> {
        self.get_quotes(MarketOperation::Buy, sources, maker_token, taker_token, maker_fill_amounts)
    }

    fn get_quotes(
        &self,
        side: MarketOperation,
        sources: &[Source],
        maker_token: Address,
        taker_token: Address,
        fill_amounts: &[U256],
    ) -> SamplerResult<QuotesOperation> {
        let ops = self.get_source_quote_operations(side, sources, maker_token, taker_token, fill_amounts)?;
        let fill_amounts = fill_amounts.to_vec();
        Ok(BatchOperation::new(ops, move |quotes: Vec<SourceQuote>| {
            quotes
                .into_iter()
                .map(|quote| quote.into_samples(&fill_amounts))
                .collect()
        }))
    }

    pub fn get_two_hop_sell_quotes(
        &self,
        sources: &[Source],
        maker_token: Address,
        taker_token: Address,
        sell_amount: U256,
    ) -> SamplerResult<TwoHopQuotesOperation> {
        self.get_two_hop_quotes(MarketOperation::Sell, sources, maker_token, taker_token, sell_amount)
    }

    pub fn get_two_hop_buy_quotes(
        &self,
        sources: &[Source],
        maker_token: Address,
        taker_token: Address,
        buy_amount: U256,
    ) -> SamplerResult<TwoHopQuotesOperation> {
        self.get_two_hop_quotes(MarketOperation::Buy, sources, maker_token, taker_token, buy_amount)
    }

    fn get_two_hop_quotes(
        &self,
        side: MarketOperation,
        sources: &[Source],
        maker_token: Address,
        taker_token: Address,
        amount: U256,
    ) -> SamplerResult<TwoHopQuotesOperation> {
        // The sampler contract splices the real amount into each hop call.
        let placeholder = [U256::zero()];
        let mut ops = Vec::new();
        for intermediate in self
            .token_adjacency_graph
            .get_intermediate_tokens(&maker_token, &taker_token)
        {
            let first_hop = self.on_chain_operations(side, sources, intermediate, taker_token, &placeholder)?;
            let second_hop = self.on_chain_operations(side, sources, maker_token, intermediate, &placeholder)?;
            if first_hop.is_empty() || second_hop.is_empty() {
                debug!("No two-hop candidates via {:?}", intermediate);
                continue;
            }
            ops.push(TwoHopOperation::new(side, intermediate, amount, first_hop, second_hop)?);
        }
        Ok(BatchOperation::collect(ops))
    }

    /// Hop operations the sampler contract can evaluate itself.
    fn on_chain_operations(
        &self,
        side: MarketOperation,
        sources: &[Source],
        maker_token: Address,
        taker_token: Address,
        fill_amounts: &[U256],
    ) -> SamplerResult<Vec<SourceQuoteOperation>> {
        // Hops are direct only; a path inside a hop would be a third hop.
        Ok(self
            .quote_operations(side, sources, maker_token, taker_token, fill_amounts, &TokenAdjacencyGraph::empty())?
            .into_iter()
            .filter(|op| !is_no_op_call(&op.encode_call()))
            .collect())
    }

    /// Samples every source for `sell_amount` of the native token and returns
    /// the raw `output / input` rate of the venue with the best fee-adjusted
    /// rate. Zero when nothing quotes. When fee-adjusted rates tie, the source
    /// listed first in `sources` wins and its raw rate is returned.
    pub fn get_best_native_token_sell_rate(
        &self,
        sources: &[Source],
        maker_token: Address,
        sell_amount: U256,
        fee_schedule: &FeeSchedule,
    ) -> SamplerResult<BoxedOperation<Decimal>> {
        let native_token = wrapped_native_token(self.chain_id);
        if maker_token == native_token {
            return Ok(Box::new(SamplerNoOperation::new(None::<Source>, FillData::None, || {
                Decimal::ONE
            })));
        }
        let ops = self.get_source_quote_operations(
            MarketOperation::Sell,
            sources,
            maker_token,
            native_token,
            &[sell_amount],
        )?;
        let fee_schedule = fee_schedule.clone();
        Ok(Box::new(BatchOperation::new(ops, move |quotes: Vec<SourceQuote>| {
            let samples: Vec<DexSample> = quotes
                .into_iter()
                .flat_map(|quote| quote.into_samples(&[sell_amount]))
                .collect();
            best_rate(&samples, &fee_schedule)
        })))
    }

    /// Operations for every batchable source, in request order.
    pub fn get_source_quote_operations(
        &self,
        side: MarketOperation,
        sources: &[Source],
        maker_token: Address,
        taker_token: Address,
        fill_amounts: &[U256],
    ) -> SamplerResult<Vec<SourceQuoteOperation>> {
        self.quote_operations(
            side,
            sources,
            maker_token,
            taker_token,
            fill_amounts,
            &self.token_adjacency_graph,
        )
    }

    fn quote_operations(
        &self,
        side: MarketOperation,
        sources: &[Source],
        maker_token: Address,
        taker_token: Address,
        fill_amounts: &[U256],
        graph: &TokenAdjacencyGraph,
    ) -> SamplerResult<Vec<SourceQuoteOperation>> {
        let mut ops = Vec::new();
        for source in batch_source_filters().get_allowed(sources) {
            match self.source_operations(source, side, maker_token, taker_token, fill_amounts, graph) {
                Ok(source_ops) => ops.extend(source_ops),
                Err(e @ SamplerError::UnsupportedSource(_)) => return Err(e),
                Err(e) => warn!("Skipping {} for {:?}: {}", source, side, e),
            }
        }
        Ok(ops)
    }

    fn source_operations(
        &self,
        source: Source,
        side: MarketOperation,
        maker_token: Address,
        taker_token: Address,
        amounts: &[U256],
        graph: &TokenAdjacencyGraph,
    ) -> SamplerResult<Vec<SourceQuoteOperation>> {
        let chain = self.chain_id;
        let rebasing = is_rebasing_token(&maker_token) || is_rebasing_token(&taker_token);
        match source {
            Source::Uniswap => {
                let router = match uniswap_v1_router(chain) {
                    Some(router) if !rebasing => router,
                    _ => return Ok(Vec::new()),
                };
                Ok(vec![adapters::uniswap::quote(side, router, taker_token, maker_token, amounts)?])
            }
            s if s.is_uniswap_v2_like() => {
                let router = match uniswap_v2_like_router(s, chain) {
                    Some(router) if !rebasing => router,
                    _ => return Ok(Vec::new()),
                };
                let intermediates = graph.get_intermediate_tokens(&maker_token, &taker_token);
                adapters::uniswap_v2::paths(taker_token, maker_token, &intermediates)
                    .into_iter()
                    .filter(|path| !path.iter().any(is_rebasing_token))
                    .map(|path| adapters::uniswap_v2::quote(s, side, router, path, amounts))
                    .collect()
            }
            s if s.is_curve_like() => {
                adapters::curve::pools_for_pair(curve_like_pools(s, chain), taker_token, maker_token)
                    .into_iter()
                    .map(|(pool, from, to)| adapters::curve::quote(s, side, pool, from, to, amounts))
                    .collect()
            }
            Source::DodoV2 => dodo_v2_factories(chain)
                .iter()
                .filter(|registry| **registry != NULL_ADDRESS)
                .flat_map(|registry| DODO_V2_OFFSETS.into_iter().map(move |offset| (*registry, offset)))
                .map(|(registry, offset)| {
                    adapters::dodo_v2::quote(side, registry, offset, taker_token, maker_token, amounts)
                })
                .collect(),
            Source::Balancer => {
                let Some(cache) = &self.balancer_cache else {
                    return Ok(Vec::new());
                };
                if !cache.is_fresh(taker_token, maker_token) {
                    cache.prefetch(taker_token, maker_token);
                }
                cache
                    .get_cached_for_pair(taker_token, maker_token)
                    .into_iter()
                    .map(|pool| adapters::balancer::quote(side, pool, taker_token, maker_token, amounts))
                    .collect()
            }
            Source::BalancerV2 => {
                let (Some(vault), Some(cache)) = (balancer_v2_vault(chain), &self.balancer_v2_cache) else {
                    return Ok(Vec::new());
                };
                if !cache.is_fresh(taker_token, maker_token) {
                    cache.prefetch(taker_token, maker_token);
                }
                let swaps = cache.get_cached_for_pair(taker_token, maker_token);
                let plans = match side {
                    MarketOperation::Sell => swaps.exact_in,
                    MarketOperation::Buy => swaps.exact_out,
                };
                let mut ops = Vec::with_capacity(plans.len());
                for plan in &plans {
                    match adapters::balancer_v2::quote(side, vault, chain, plan, amounts) {
                        Ok(op) => ops.push(op),
                        Err(e) => warn!("Dropping Balancer V2 plan: {}", e),
                    }
                }
                Ok(ops)
            }
            Source::AaveV2 => Ok(self
                .aave_v2_cache
                .as_ref()
                .and_then(|cache| cache.get(taker_token, maker_token))
                .map(|reserve| adapters::aave_v2::quote(&reserve, taker_token, amounts))
                .into_iter()
                .collect()),
            Source::Compound => {
                let Some(c_token) = self
                    .compound_cache
                    .as_ref()
                    .and_then(|cache| cache.get(taker_token, maker_token))
                else {
                    return Ok(Vec::new());
                };
                Ok(vec![adapters::compound::quote(
                    side,
                    c_token.token_address,
                    taker_token,
                    maker_token,
                    amounts,
                )?])
            }
            Source::MakerPsm => {
                let Some(info) = maker_psm_info(chain) else {
                    return Ok(Vec::new());
                };
                if info.psm_address == NULL_ADDRESS
                    || !adapters::maker_psm::supports_pair(&info, constants::mainnet::DAI, taker_token, maker_token)
                {
                    return Ok(Vec::new());
                }
                Ok(vec![adapters::maker_psm::quote(side, &info, taker_token, maker_token, amounts)?])
            }
            _ => Err(SamplerError::UnsupportedSource(source.to_string())),
        }
    }
}

/// Raw rate of the sample with the best fee-adjusted rate. Earlier samples
/// win ties.
fn best_rate(samples: &[DexSample], fee_schedule: &FeeSchedule) -> Decimal {
    let mut best: Option<(Decimal, &DexSample)> = None;
    for sample in samples {
        if sample.output.is_zero() {
            continue;
        }
        let fee = fee_schedule
            .get(&sample.source)
            .map(|fee| (**fee)(&sample.fill_data))
            .unwrap_or_default();
        let Some(adjusted) = u256_ratio(sample.output, sample.input.saturating_add(fee)) else {
            continue;
        };
        if best.map_or(true, |(rate, _)| adjusted > rate) {
            best = Some((adjusted, sample));
        }
    }
    best.and_then(|(_, sample)| u256_ratio(sample.output, sample.input))
        .unwrap_or(Decimal::ZERO)
}
