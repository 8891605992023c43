use anyhow::Result;
use async_trait::async_trait;
use ethers::types::Address;
use serde::Deserialize;
use serde_json::json;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use super::subgraph::SubgraphClient;
use super::{RefreshPolicy, RefreshingTable, TableFetcher};
use crate::types::conversions::string_to_address;

const RESERVES_QUERY: &str = r#"
query {
  reserves(first: 300, where: { isActive: true, isFrozen: false }) {
    id
    underlyingAsset
    aToken { id }
    pool { id lendingPool }
  }
}
"#;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AaveReserve {
    pub id: String,
    pub underlying_asset: Address,
    pub a_token: Address,
    pub lending_pool: Address,
}

#[derive(Debug, Deserialize)]
struct ReservesResponse {
    reserves: Vec<RawReserve>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawReserve {
    id: String,
    underlying_asset: String,
    a_token: IdOnly,
    pool: RawPool,
}

#[derive(Debug, Deserialize)]
struct IdOnly {
    id: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawPool {
    lending_pool: String,
}

fn parse_reserve(raw: &RawReserve) -> Result<AaveReserve> {
    Ok(AaveReserve {
        id: raw.id.clone(),
        underlying_asset: string_to_address(&raw.underlying_asset)?,
        a_token: string_to_address(&raw.a_token.id)?,
        lending_pool: string_to_address(&raw.pool.lending_pool)?,
    })
}

/// Reserves indexed by both `(underlying, aToken)` and `(aToken, underlying)`.
#[derive(Debug, Default)]
pub struct ReserveTable {
    by_pair: HashMap<(Address, Address), Arc<AaveReserve>>,
}

impl ReserveTable {
    pub fn from_reserves(reserves: impl IntoIterator<Item = AaveReserve>) -> Self {
        let mut by_pair = HashMap::new();
        for reserve in reserves {
            let reserve = Arc::new(reserve);
            by_pair.insert((reserve.underlying_asset, reserve.a_token), reserve.clone());
            by_pair.insert((reserve.a_token, reserve.underlying_asset), reserve);
        }
        Self { by_pair }
    }

    pub fn get(&self, token_a: Address, token_b: Address) -> Option<&AaveReserve> {
        self.by_pair.get(&(token_a, token_b)).map(Arc::as_ref)
    }

    pub fn reserve_count(&self) -> usize {
        self.by_pair.len() / 2
    }
}

pub struct ReservesFetcher {
    subgraph: SubgraphClient,
}

#[async_trait]
impl TableFetcher for ReservesFetcher {
    type Table = ReserveTable;

    fn name(&self) -> &'static str {
        "aave_v2"
    }

    async fn fetch(&self) -> Result<ReserveTable> {
        let response: ReservesResponse = self.subgraph.query(RESERVES_QUERY, json!({})).await?;
        parse_reserves(&response)
    }

    fn entry_count(table: &ReserveTable) -> usize {
        table.reserve_count()
    }
}

fn parse_reserves(response: &ReservesResponse) -> Result<ReserveTable> {
    let reserves = response
        .reserves
        .iter()
        .map(parse_reserve)
        .collect::<Result<Vec<_>>>()?;
    Ok(ReserveTable::from_reserves(reserves))
}

/// Aave V2 lending reserves. A failed refresh empties the cache: a stale
/// reserve (frozen or migrated) would build a deposit that reverts.
pub struct AaveV2ReservesCache {
    table: RefreshingTable<ReservesFetcher>,
}

impl AaveV2ReservesCache {
    /// Starts the refresh loop. Must be called within a Tokio runtime.
    pub fn new(subgraph: SubgraphClient, refresh_interval: Duration) -> Self {
        Self {
            table: RefreshingTable::spawn(
                ReservesFetcher { subgraph },
                refresh_interval,
                RefreshPolicy::Clear,
            ),
        }
    }

    pub fn fixed(reserves: impl IntoIterator<Item = AaveReserve>) -> Self {
        Self {
            table: RefreshingTable::fixed(ReserveTable::from_reserves(reserves)),
        }
    }

    /// The reserve linking the two tokens, in either direction.
    pub fn get(&self, token_a: Address, token_b: Address) -> Option<AaveReserve> {
        self.table.snapshot().get(token_a, token_b).cloned()
    }
}
