use config::{Config, ConfigError, File};
use ethers::types::Address;
use rust_decimal::Decimal;
use serde::Deserialize;
use std::env;
use std::path::Path;
use std::time::Duration;

use crate::constants;
use crate::types::ChainId;

#[derive(Debug, Deserialize, Clone)]
pub struct Chain {
    #[serde(default = "default_chain_id")]
    pub id: u64,
}

fn default_chain_id() -> u64 {
    1
}

#[derive(Debug, Deserialize, Clone)]
pub struct Rpc {
    pub http_url: String,
    #[serde(default = "default_rpc_timeout_ms")]
    pub timeout_ms: u64,
}

fn default_rpc_timeout_ms() -> u64 {
    10_000
}

#[derive(Debug, Deserialize, Clone)]
pub struct SamplerContract {
    /// Deployed ERC20BridgeSampler
    pub address: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct Sampling {
    #[serde(default = "default_num_samples")]
    pub num_samples: usize,
    /// Geometric base of the sample ladder, 1.0 is linear
    #[serde(default = "default_distribution_base")]
    pub distribution_base: f64,
}

fn default_num_samples() -> usize {
    13
}
fn default_distribution_base() -> f64 {
    1.05
}

impl Default for Sampling {
    fn default() -> Self {
        Self {
            num_samples: default_num_samples(),
            distribution_base: default_distribution_base(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct Caches {
    // Endpoint overrides; the chain's defaults apply when unset.
    #[serde(default)]
    pub aave_v2_subgraph_url: Option<String>,
    #[serde(default)]
    pub compound_api_url: Option<String>,
    #[serde(default)]
    pub balancer_subgraph_url: Option<String>,
    #[serde(default)]
    pub balancer_v2_subgraph_url: Option<String>,
    #[serde(default = "default_refresh_interval_seconds")]
    pub reserves_refresh_interval_seconds: u64,
    #[serde(default = "default_refresh_interval_seconds")]
    pub balancer_v2_refresh_interval_seconds: u64,
    #[serde(default = "default_pools_cache_ttl_seconds")]
    pub pools_cache_ttl_seconds: u64,
    #[serde(default = "default_fresh_lookup_timeout_ms")]
    pub fresh_lookup_timeout_ms: u64,
    #[serde(default = "default_http_timeout_ms")]
    pub http_timeout_ms: u64,
}

fn default_refresh_interval_seconds() -> u64 {
    1800 // 30 min
}
fn default_pools_cache_ttl_seconds() -> u64 {
    3600
}
fn default_fresh_lookup_timeout_ms() -> u64 {
    1000
}
fn default_http_timeout_ms() -> u64 {
    5000
}

impl Default for Caches {
    fn default() -> Self {
        Self {
            aave_v2_subgraph_url: None,
            compound_api_url: None,
            balancer_subgraph_url: None,
            balancer_v2_subgraph_url: None,
            reserves_refresh_interval_seconds: default_refresh_interval_seconds(),
            balancer_v2_refresh_interval_seconds: default_refresh_interval_seconds(),
            pools_cache_ttl_seconds: default_pools_cache_ttl_seconds(),
            fresh_lookup_timeout_ms: default_fresh_lookup_timeout_ms(),
            http_timeout_ms: default_http_timeout_ms(),
        }
    }
}

impl Caches {
    pub fn reserves_refresh_interval(&self) -> Duration {
        Duration::from_secs(self.reserves_refresh_interval_seconds)
    }

    pub fn balancer_v2_refresh_interval(&self) -> Duration {
        Duration::from_secs(self.balancer_v2_refresh_interval_seconds)
    }

    pub fn pools_cache_ttl(&self) -> Duration {
        Duration::from_secs(self.pools_cache_ttl_seconds)
    }

    pub fn fresh_lookup_timeout(&self) -> Duration {
        Duration::from_millis(self.fresh_lookup_timeout_ms)
    }

    pub fn http_timeout(&self) -> Duration {
        Duration::from_millis(self.http_timeout_ms)
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct Settings {
    #[serde(default = "default_chain")]
    pub chain: Chain,
    pub rpc: Rpc,
    pub sampler: SamplerContract,
    #[serde(default)]
    pub sampling: Sampling,
    #[serde(default)]
    pub caches: Caches,
}

fn default_chain() -> Chain {
    Chain {
        id: default_chain_id(),
    }
}

impl Settings {
    /// `Config.toml` in the working directory plus `SAMPLER_*` overrides.
    pub fn new() -> Result<Self, ConfigError> {
        Self::load(File::with_name("Config.toml"))
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        Self::load(File::from(path.as_ref()))
    }

    fn load<S>(source: S) -> Result<Self, ConfigError>
    where
        S: config::Source + Send + Sync + 'static,
    {
        let s = Config::builder().add_source(source).build()?;
        let mut settings: Self = s.try_deserialize()?;
        settings.apply_env_overrides();
        settings.validate()?;
        Ok(settings)
    }

    fn apply_env_overrides(&mut self) {
        if let Some(url) = non_empty_env("SAMPLER_RPC_HTTP_URL") {
            self.rpc.http_url = url;
        }
        if let Some(address) = non_empty_env("SAMPLER_SAMPLER_ADDRESS") {
            self.sampler.address = address;
        }
        if let Some(raw) = non_empty_env("SAMPLER_CHAIN_ID") {
            match raw.parse() {
                Ok(id) => self.chain.id = id,
                Err(e) => eprintln!("Ignoring SAMPLER_CHAIN_ID={}: {}", raw, e),
            }
        }
        if let Some(raw) = non_empty_env("SAMPLER_SAMPLING_NUM_SAMPLES") {
            match raw.parse() {
                Ok(n) => self.sampling.num_samples = n,
                Err(e) => eprintln!("Ignoring SAMPLER_SAMPLING_NUM_SAMPLES={}: {}", raw, e),
            }
        }
    }

    fn validate(&self) -> Result<(), ConfigError> {
        self.chain_id()?;
        self.sampler_address()?;
        self.distribution_base()?;
        if self.sampling.num_samples == 0 {
            return Err(ConfigError::Message("sampling.num_samples must be at least 1".into()));
        }
        url::Url::parse(&self.rpc.http_url)
            .map_err(|e| ConfigError::Message(format!("rpc.http_url: {}", e)))?;
        for (key, value) in [
            ("caches.aave_v2_subgraph_url", &self.caches.aave_v2_subgraph_url),
            ("caches.compound_api_url", &self.caches.compound_api_url),
            ("caches.balancer_subgraph_url", &self.caches.balancer_subgraph_url),
            ("caches.balancer_v2_subgraph_url", &self.caches.balancer_v2_subgraph_url),
        ] {
            if let Some(value) = value {
                url::Url::parse(value).map_err(|e| ConfigError::Message(format!("{}: {}", key, e)))?;
            }
        }
        Ok(())
    }

    pub fn chain_id(&self) -> Result<ChainId, ConfigError> {
        ChainId::try_from(self.chain.id).map_err(|e| ConfigError::Message(e.to_string()))
    }

    pub fn sampler_address(&self) -> Result<Address, ConfigError> {
        self.sampler
            .address
            .trim()
            .parse()
            .map_err(|e| ConfigError::Message(format!("sampler.address: {}", e)))
    }

    pub fn distribution_base(&self) -> Result<Decimal, ConfigError> {
        let base = Decimal::try_from(self.sampling.distribution_base)
            .map_err(|e| ConfigError::Message(format!("sampling.distribution_base: {}", e)))?;
        if base < Decimal::ONE {
            return Err(ConfigError::Message(
                "sampling.distribution_base must be at least 1".into(),
            ));
        }
        Ok(base)
    }

    pub fn aave_v2_subgraph_url(&self) -> Option<String> {
        self.endpoint(&self.caches.aave_v2_subgraph_url, constants::aave_v2_subgraph_url)
    }

    pub fn compound_api_url(&self) -> Option<String> {
        self.endpoint(&self.caches.compound_api_url, constants::compound_api_url)
    }

    pub fn balancer_subgraph_url(&self) -> Option<String> {
        self.endpoint(&self.caches.balancer_subgraph_url, constants::balancer_subgraph_url)
    }

    pub fn balancer_v2_subgraph_url(&self) -> Option<String> {
        self.endpoint(&self.caches.balancer_v2_subgraph_url, constants::balancer_v2_subgraph_url)
    }

    fn endpoint(
        &self,
        configured: &Option<String>,
        chain_default: fn(ChainId) -> Option<&'static str>,
    ) -> Option<String> {
        configured.clone().or_else(|| {
            self.chain_id()
                .ok()
                .and_then(chain_default)
                .map(str::to_string)
        })
    }
}

fn non_empty_env(key: &str) -> Option<String> {
    env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
