//! Balancer V1 pools, looked up per pair from the subgraph.

use anyhow::Result;
use async_trait::async_trait;
use ethers::types::Address;
use serde::Deserialize;
use serde_json::json;
use std::time::Duration;

use super::pair_cache::{PairCache, PairFetcher};
use super::subgraph::SubgraphClient;
use crate::types::conversions::{address_to_string, string_to_address};

const MAX_POOLS_PER_PAIR: usize = 5;

const POOLS_FOR_PAIR_QUERY: &str = r#"
query ($tokens: [Bytes!]!, $first: Int!) {
  pools(
    first: $first,
    where: { tokensList_contains: $tokens, publicSwap: true, liquidity_gt: 0 },
    orderBy: liquidity,
    orderDirection: desc
  ) {
    id
  }
}
"#;

#[derive(Debug, Deserialize)]
struct PoolsResponse {
    pools: Vec<PoolId>,
}

#[derive(Debug, Deserialize)]
struct PoolId {
    id: String,
}

pub struct BalancerPoolsFetcher {
    subgraph: SubgraphClient,
}

impl BalancerPoolsFetcher {
    pub fn new(subgraph: SubgraphClient) -> Self {
        Self { subgraph }
    }
}

#[async_trait]
impl PairFetcher for BalancerPoolsFetcher {
    type Value = Vec<Address>;

    fn name(&self) -> &'static str {
        "balancer"
    }

    async fn fetch_pair(&self, taker_token: Address, maker_token: Address) -> Result<Vec<Address>> {
        let response: PoolsResponse = self
            .subgraph
            .query(
                POOLS_FOR_PAIR_QUERY,
                json!({
                    "tokens": [address_to_string(taker_token), address_to_string(maker_token)],
                    "first": MAX_POOLS_PER_PAIR,
                }),
            )
            .await?;
        parse_pool_ids(response)
    }
}

fn parse_pool_ids(response: PoolsResponse) -> Result<Vec<Address>> {
    response
        .pools
        .iter()
        .map(|pool| string_to_address(&pool.id).map_err(anyhow::Error::from))
        .collect()
}

/// Pool addresses trading a pair. Pool membership is symmetric, so both
/// orderings of a pair share one entry.
pub struct BalancerPoolsCache {
    pools: PairCache<BalancerPoolsFetcher>,
}

impl BalancerPoolsCache {
    pub fn new(subgraph: SubgraphClient, ttl: Duration) -> Self {
        Self {
            pools: PairCache::new(BalancerPoolsFetcher::new(subgraph), ttl),
        }
    }

    pub async fn get_fresh_for_pair(
        &self,
        taker_token: Address,
        maker_token: Address,
        timeout: Duration,
    ) -> Vec<Address> {
        let (a, b) = ordered(taker_token, maker_token);
        self.pools.get_fresh_for_pair(a, b, timeout).await
    }

    pub fn get_cached_for_pair(&self, taker_token: Address, maker_token: Address) -> Vec<Address> {
        let (a, b) = ordered(taker_token, maker_token);
        self.pools.get_cached_for_pair(a, b)
    }

    pub fn is_fresh(&self, taker_token: Address, maker_token: Address) -> bool {
        let (a, b) = ordered(taker_token, maker_token);
        self.pools.is_fresh(a, b)
    }

    /// Kicks off a lookup so a later sampling request finds the pair cached.
    pub fn prefetch(&self, taker_token: Address, maker_token: Address) {
        let (a, b) = ordered(taker_token, maker_token);
        self.pools.prefetch(a, b);
    }

    pub fn insert(&self, taker_token: Address, maker_token: Address, pools: Vec<Address>) {
        let (a, b) = ordered(taker_token, maker_token);
        self.pools.insert(a, b, pools);
    }
}

fn ordered(a: Address, b: Address) -> (Address, Address) {
    if a <= b {
        (a, b)
    } else {
        (b, a)
    }
}
