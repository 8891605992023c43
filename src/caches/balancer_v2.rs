//! Balancer V2 batch-swap plans.
//!
//! A background task pre-warms plans for every pair reachable through the
//! top pools by liquidity; pairs outside that set are looked up on demand
//! and kept in a TTL cache.

use anyhow::Result;
use async_trait::async_trait;
use ethers::types::{Address, Bytes, H256, U256};
use indexmap::IndexSet;
use log::debug;
use serde::Deserialize;
use serde_json::json;
use std::collections::HashMap;
use std::time::Duration;

use super::pair_cache::{PairCache, PairFetcher};
use super::subgraph::SubgraphClient;
use super::{RefreshPolicy, RefreshingTable, TableFetcher};
use crate::types::conversions::{address_to_string, string_to_address, string_to_h256};
use crate::types::{BalancerSwapInfo, BalancerSwapStep};

const TOP_POOLS: usize = 100;
const POOLS_PER_TOKEN: usize = 20;
const MAX_PLANS_PER_PAIR: usize = 5;
const PAIRS_PER_YIELD: usize = 100;

const TOP_POOLS_QUERY: &str = r#"
query ($first: Int!) {
  pools(
    first: $first,
    where: { totalLiquidity_gt: 0 },
    orderBy: totalLiquidity,
    orderDirection: desc
  ) {
    id
    tokensList
  }
}
"#;

const POOLS_FOR_PAIR_QUERY: &str = r#"
query ($taker: [Bytes!]!, $maker: [Bytes!]!, $first: Int!) {
  takerPools: pools(
    first: $first,
    where: { tokensList_contains: $taker, totalLiquidity_gt: 0 },
    orderBy: totalLiquidity,
    orderDirection: desc
  ) {
    id
    tokensList
  }
  makerPools: pools(
    first: $first,
    where: { tokensList_contains: $maker, totalLiquidity_gt: 0 },
    orderBy: totalLiquidity,
    orderDirection: desc
  ) {
    id
    tokensList
  }
}
"#;

#[derive(Debug, Deserialize)]
struct SubgraphPool {
    id: String,
    #[serde(rename = "tokensList")]
    tokens_list: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct TopPoolsResponse {
    pools: Vec<SubgraphPool>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PairPoolsResponse {
    taker_pools: Vec<SubgraphPool>,
    maker_pools: Vec<SubgraphPool>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BalancerV2Pool {
    pub id: H256,
    pub tokens: Vec<Address>,
}

fn parse_pool(pool: &SubgraphPool) -> Result<BalancerV2Pool> {
    let tokens = pool
        .tokens_list
        .iter()
        .map(|token| string_to_address(token))
        .collect::<Result<Vec<_>, _>>()?;
    Ok(BalancerV2Pool {
        id: string_to_h256(&pool.id)?,
        tokens,
    })
}

/// Plans for one ordered pair. Sells use `exact_in`, buys use `exact_out`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BalancerSwaps {
    pub exact_in: Vec<BalancerSwapInfo>,
    pub exact_out: Vec<BalancerSwapInfo>,
}

impl BalancerSwaps {
    fn from_exact_in(exact_in: Vec<BalancerSwapInfo>) -> Self {
        let exact_out = exact_in.iter().map(reverse_steps).collect();
        Self { exact_in, exact_out }
    }

    pub fn is_empty(&self) -> bool {
        self.exact_in.is_empty()
    }
}

/// A `GIVEN_OUT` batch swap walks the same assets from the last step back.
fn reverse_steps(plan: &BalancerSwapInfo) -> BalancerSwapInfo {
    BalancerSwapInfo {
        assets: plan.assets.clone(),
        swap_steps: plan.swap_steps.iter().rev().cloned().collect(),
    }
}

#[derive(Debug, Default)]
pub struct SwapInfoTable {
    swaps: HashMap<(Address, Address), BalancerSwaps>,
}

impl SwapInfoTable {
    pub fn get(&self, taker_token: Address, maker_token: Address) -> Option<&BalancerSwaps> {
        self.swaps.get(&(taker_token, maker_token))
    }

    pub fn insert(&mut self, taker_token: Address, maker_token: Address, swaps: BalancerSwaps) {
        self.swaps.insert((taker_token, maker_token), swaps);
    }

    pub fn len(&self) -> usize {
        self.swaps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.swaps.is_empty()
    }
}

struct PoolGraph<'a> {
    pools: &'a [BalancerV2Pool],
    by_token: HashMap<Address, Vec<usize>>,
}

impl<'a> PoolGraph<'a> {
    fn new(pools: &'a [BalancerV2Pool]) -> Self {
        let mut by_token: HashMap<Address, Vec<usize>> = HashMap::new();
        for (index, pool) in pools.iter().enumerate() {
            for token in &pool.tokens {
                by_token.entry(*token).or_default().push(index);
            }
        }
        Self { pools, by_token }
    }

    fn pools_with(&self, token: &Address) -> &[usize] {
        self.by_token.get(token).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Every ordered pair connected by one or two pools, in discovery order.
    fn reachable_pairs(&self) -> IndexSet<(Address, Address)> {
        let mut pairs = IndexSet::new();
        for pool in self.pools {
            for from in &pool.tokens {
                for mid in &pool.tokens {
                    if mid == from {
                        continue;
                    }
                    pairs.insert((*from, *mid));
                    for &next in self.pools_with(mid) {
                        for to in &self.pools[next].tokens {
                            if to != from {
                                pairs.insert((*from, *to));
                            }
                        }
                    }
                }
            }
        }
        pairs
    }

    /// Direct plans first, then two-pool plans through a shared token.
    fn plans_for_pair(&self, taker_token: Address, maker_token: Address) -> Vec<BalancerSwapInfo> {
        let mut plans = Vec::new();
        let taker_pools = self.pools_with(&taker_token);
        let maker_pools = self.pools_with(&maker_token);

        for &index in taker_pools {
            if maker_pools.contains(&index) {
                plans.push(BalancerSwapInfo {
                    assets: vec![taker_token, maker_token],
                    swap_steps: vec![step(self.pools[index].id, 0, 1)],
                });
            }
        }

        'outer: for &first in taker_pools {
            for mid in &self.pools[first].tokens {
                if *mid == taker_token || *mid == maker_token {
                    continue;
                }
                for &second in maker_pools {
                    if plans.len() >= MAX_PLANS_PER_PAIR {
                        break 'outer;
                    }
                    if second == first || !self.pools[second].tokens.contains(mid) {
                        continue;
                    }
                    plans.push(BalancerSwapInfo {
                        assets: vec![taker_token, *mid, maker_token],
                        swap_steps: vec![
                            step(self.pools[first].id, 0, 1),
                            step(self.pools[second].id, 1, 2),
                        ],
                    });
                }
            }
        }
        plans.truncate(MAX_PLANS_PER_PAIR);
        plans
    }
}

fn step(pool_id: H256, asset_in_index: usize, asset_out_index: usize) -> BalancerSwapStep {
    BalancerSwapStep {
        pool_id,
        asset_in_index,
        asset_out_index,
        amount: U256::zero(),
        user_data: Bytes::new(),
    }
}

/// Derives plans for every reachable pair, yielding to the scheduler every
/// few pairs so a large refresh does not hog its worker.
pub async fn build_swap_info_table(pools: &[BalancerV2Pool]) -> SwapInfoTable {
    let graph = PoolGraph::new(pools);
    let mut table = SwapInfoTable::default();
    for (i, (taker_token, maker_token)) in graph.reachable_pairs().into_iter().enumerate() {
        if i > 0 && i % PAIRS_PER_YIELD == 0 {
            tokio::task::yield_now().await;
        }
        let plans = graph.plans_for_pair(taker_token, maker_token);
        if !plans.is_empty() {
            table.insert(taker_token, maker_token, BalancerSwaps::from_exact_in(plans));
        }
    }
    table
}

pub struct TopPoolsFetcher {
    subgraph: SubgraphClient,
}

#[async_trait]
impl TableFetcher for TopPoolsFetcher {
    type Table = SwapInfoTable;

    fn name(&self) -> &'static str {
        "balancer_v2"
    }

    async fn fetch(&self) -> Result<SwapInfoTable> {
        let response: TopPoolsResponse = self
            .subgraph
            .query(TOP_POOLS_QUERY, json!({ "first": TOP_POOLS }))
            .await?;
        let pools = response
            .pools
            .iter()
            .map(parse_pool)
            .collect::<Result<Vec<_>>>()?;
        debug!("Building Balancer V2 swap plans from {} pools", pools.len());
        Ok(build_swap_info_table(&pools).await)
    }

    fn entry_count(table: &SwapInfoTable) -> usize {
        table.len()
    }
}

pub struct PairPoolsFetcher {
    subgraph: SubgraphClient,
}

#[async_trait]
impl PairFetcher for PairPoolsFetcher {
    type Value = BalancerSwaps;

    fn name(&self) -> &'static str {
        "balancer_v2_pair"
    }

    async fn fetch_pair(&self, taker_token: Address, maker_token: Address) -> Result<BalancerSwaps> {
        let response: PairPoolsResponse = self
            .subgraph
            .query(
                POOLS_FOR_PAIR_QUERY,
                json!({
                    "taker": [address_to_string(taker_token)],
                    "maker": [address_to_string(maker_token)],
                    "first": POOLS_PER_TOKEN,
                }),
            )
            .await?;
        let mut seen = IndexSet::new();
        let pools = response
            .taker_pools
            .iter()
            .chain(response.maker_pools.iter())
            .filter(|pool| seen.insert(pool.id.clone()))
            .map(parse_pool)
            .collect::<Result<Vec<_>>>()?;
        let plans = PoolGraph::new(&pools).plans_for_pair(taker_token, maker_token);
        Ok(BalancerSwaps::from_exact_in(plans))
    }
}

/// Pre-warmed plans plus on-demand lookups for pairs outside the top pools.
pub struct BalancerV2SwapInfoCache {
    table: RefreshingTable<TopPoolsFetcher>,
    on_demand: Option<PairCache<PairPoolsFetcher>>,
}

impl BalancerV2SwapInfoCache {
    /// Starts the pre-warm loop. Must be called within a Tokio runtime.
    pub fn new(subgraph: SubgraphClient, refresh_interval: Duration, pair_ttl: Duration) -> Self {
        let table = RefreshingTable::spawn(
            TopPoolsFetcher {
                subgraph: subgraph.clone(),
            },
            refresh_interval,
            RefreshPolicy::RetainStale,
        );
        Self {
            table,
            on_demand: Some(PairCache::new(PairPoolsFetcher { subgraph }, pair_ttl)),
        }
    }

    /// A fixed table with no network access.
    pub fn fixed(table: SwapInfoTable) -> Self {
        Self {
            table: RefreshingTable::fixed(table),
            on_demand: None,
        }
    }

    pub fn get_cached_for_pair(&self, taker_token: Address, maker_token: Address) -> BalancerSwaps {
        if let Some(swaps) = self.table.snapshot().get(taker_token, maker_token) {
            return swaps.clone();
        }
        self.on_demand
            .as_ref()
            .map(|cache| cache.get_cached_for_pair(taker_token, maker_token))
            .unwrap_or_default()
    }

    pub fn is_fresh(&self, taker_token: Address, maker_token: Address) -> bool {
        self.table.snapshot().get(taker_token, maker_token).is_some()
            || self
                .on_demand
                .as_ref()
                .is_some_and(|cache| cache.is_fresh(taker_token, maker_token))
    }

    /// Starts an on-demand lookup for a pair the pre-warm did not cover.
    pub fn prefetch(&self, taker_token: Address, maker_token: Address) {
        if let Some(cache) = &self.on_demand {
            cache.prefetch(taker_token, maker_token);
        }
    }

    pub async fn get_fresh_for_pair(
        &self,
        taker_token: Address,
        maker_token: Address,
        timeout: Duration,
    ) -> BalancerSwaps {
        if let Some(swaps) = self.table.snapshot().get(taker_token, maker_token) {
            return swaps.clone();
        }
        match &self.on_demand {
            Some(cache) => cache.get_fresh_for_pair(taker_token, maker_token, timeout).await,
            None => BalancerSwaps::default(),
        }
    }
}
