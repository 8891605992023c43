use anyhow::Result;
use async_trait::async_trait;
use ethers::types::Address;
use serde::Deserialize;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use super::subgraph::SubgraphClient;
use super::{RefreshPolicy, RefreshingTable, TableFetcher};
use crate::types::conversions::string_to_address;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CToken {
    pub token_address: Address,
    pub underlying_address: Address,
    pub symbol: String,
}

#[derive(Debug, Deserialize)]
struct CTokenResponse {
    #[serde(rename = "cToken")]
    c_tokens: Vec<RawCToken>,
}

#[derive(Debug, Deserialize)]
struct RawCToken {
    token_address: String,
    // null for cETH
    underlying_address: Option<String>,
    #[serde(default)]
    symbol: String,
}

/// cTokens indexed by `(underlying, cToken)` and `(cToken, underlying)`.
#[derive(Debug, Default)]
pub struct CTokenTable {
    by_pair: HashMap<(Address, Address), Arc<CToken>>,
}

impl CTokenTable {
    pub fn from_c_tokens(c_tokens: impl IntoIterator<Item = CToken>) -> Self {
        let mut by_pair = HashMap::new();
        for c_token in c_tokens {
            let c_token = Arc::new(c_token);
            by_pair.insert((c_token.underlying_address, c_token.token_address), c_token.clone());
            by_pair.insert((c_token.token_address, c_token.underlying_address), c_token);
        }
        Self { by_pair }
    }

    pub fn get(&self, token_a: Address, token_b: Address) -> Option<&CToken> {
        self.by_pair.get(&(token_a, token_b)).map(Arc::as_ref)
    }

    pub fn c_token_count(&self) -> usize {
        self.by_pair.len() / 2
    }
}

pub struct CTokenFetcher {
    api: SubgraphClient,
    wrapped_native_token: Address,
}

#[async_trait]
impl TableFetcher for CTokenFetcher {
    type Table = CTokenTable;

    fn name(&self) -> &'static str {
        "compound"
    }

    async fn fetch(&self) -> Result<CTokenTable> {
        let response: CTokenResponse = self.api.get_json().await?;
        parse_c_tokens(&response, self.wrapped_native_token)
    }

    fn entry_count(table: &CTokenTable) -> usize {
        table.c_token_count()
    }
}

fn parse_c_tokens(response: &CTokenResponse, wrapped_native_token: Address) -> Result<CTokenTable> {
    let c_tokens = response
        .c_tokens
        .iter()
        .map(|raw| -> Result<CToken> {
            let underlying_address = match &raw.underlying_address {
                Some(address) => string_to_address(address)?,
                None => wrapped_native_token,
            };
            Ok(CToken {
                token_address: string_to_address(&raw.token_address)?,
                underlying_address,
                symbol: raw.symbol.clone(),
            })
        })
        .collect::<Result<Vec<_>>>()?;
    Ok(CTokenTable::from_c_tokens(c_tokens))
}

/// Compound cToken listings. Markets are never delisted, so a failed refresh
/// keeps serving the previous table.
pub struct CompoundCTokenCache {
    table: RefreshingTable<CTokenFetcher>,
}

impl CompoundCTokenCache {
    /// Starts the refresh loop. Must be called within a Tokio runtime.
    pub fn new(api: SubgraphClient, wrapped_native_token: Address, refresh_interval: Duration) -> Self {
        Self {
            table: RefreshingTable::spawn(
                CTokenFetcher {
                    api,
                    wrapped_native_token,
                },
                refresh_interval,
                RefreshPolicy::RetainStale,
            ),
        }
    }

    pub fn fixed(c_tokens: impl IntoIterator<Item = CToken>) -> Self {
        Self {
            table: RefreshingTable::fixed(CTokenTable::from_c_tokens(c_tokens)),
        }
    }

    /// The cToken linking the two tokens, in either direction.
    pub fn get(&self, token_a: Address, token_b: Address) -> Option<CToken> {
        self.table.snapshot().get(token_a, token_b).cloned()
    }
}
