//! # Sample Pair
//!
//! Samples one token pair across every venue the configured chain supports
//! and prints the resulting quote ladders as JSON.
//!
//! ## Usage
//!
//! ```bash
//! cargo run --bin sample_pair -- \
//!     --taker 0xc02aaa39b223fe8d0a0e5c4f27ead9083c756cc2 \
//!     --maker 0x6b175474e89094c44da98b954eedeac495271d0f \
//!     --amount 10000000000000000000
//! ```
//!
//! Settings are read from `Config.toml` (or `--config`) with `SAMPLER_*`
//! environment overrides, also loaded from `.env`.

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use ethers::prelude::{Address, Http, Provider, U256};
use log::info;
use serde_json::json;
use std::sync::Arc;

use dex_sampler_sdk::types::conversions::string_to_address;
use dex_sampler_sdk::source_filters::{buy_sources, sell_sources, SourceFilters};
use dex_sampler_sdk::{DexOrderSampler, MarketOperation, Settings};

#[derive(Debug, Clone, Copy, ValueEnum)]
enum Side {
    Sell,
    Buy,
}

impl From<Side> for MarketOperation {
    fn from(side: Side) -> Self {
        match side {
            Side::Sell => MarketOperation::Sell,
            Side::Buy => MarketOperation::Buy,
        }
    }
}

#[derive(Debug, Parser)]
#[command(name = "sample_pair", about = "Sample DEX quotes for a token pair")]
struct Args {
    /// Token being sold
    #[arg(long, value_parser = string_to_address)]
    taker: Address,
    /// Token being bought
    #[arg(long, value_parser = string_to_address)]
    maker: Address,
    /// Largest fill amount in base units (taker token when selling, maker token when buying)
    #[arg(long)]
    amount: String,
    #[arg(long, value_enum, default_value = "sell")]
    side: Side,
    /// Comma-separated source names; defaults to every source on the chain
    #[arg(long, value_delimiter = ',')]
    sources: Vec<String>,
    #[arg(long)]
    config: Option<String>,
    /// Also sample two-hop routes at the full amount
    #[arg(long)]
    two_hop: bool,
    /// Serve Prometheus metrics on this address (`observability` builds only)
    #[arg(long)]
    metrics_listen: Option<String>,
}

#[cfg(feature = "observability")]
fn init_observability(listen: Option<&str>) -> Result<()> {
    tracing_subscriber::fmt().json().init();
    if let Some(listen) = listen {
        let addr: std::net::SocketAddr = listen
            .parse()
            .context("--metrics-listen must be host:port")?;
        metrics_exporter_prometheus::PrometheusBuilder::new()
            .with_http_listener(addr)
            .install()
            .context("failed to install prometheus exporter")?;
    }
    dex_sampler_sdk::metrics::describe_metrics();
    Ok(())
}

#[cfg(not(feature = "observability"))]
fn init_observability(listen: Option<&str>) -> Result<()> {
    if listen.is_some() {
        log::warn!("--metrics-listen is ignored without the `observability` feature");
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();
    env_logger::init();

    let args = Args::parse();
    init_observability(args.metrics_listen.as_deref())?;
    let settings = match &args.config {
        Some(path) => Settings::from_file(path)?,
        None => Settings::new()?,
    };
    let chain_id = settings.chain_id()?;
    let side = MarketOperation::from(args.side);

    let amount = U256::from_dec_str(&args.amount).context("--amount must be a decimal integer")?;
    let requested = SourceFilters::parse_sources(&args.sources)?;
    let filters = match side {
        MarketOperation::Sell => sell_sources(chain_id),
        MarketOperation::Buy => buy_sources(chain_id),
    };
    let sources = filters.include(requested).sources();
    info!("Sampling {} sources on chain {}", sources.len(), chain_id.id());

    let provider = Arc::new(Provider::<Http>::try_from(settings.rpc.http_url.as_str())?);
    let sampler = DexOrderSampler::from_settings(&settings, provider)?;
    let amounts = sampler.sample_amounts_for(amount)?;

    let quotes = match side {
        MarketOperation::Sell => {
            sampler
                .get_sell_quotes(&sources, args.maker, args.taker, &amounts)
                .await?
        }
        MarketOperation::Buy => {
            sampler
                .get_buy_quotes(&sources, args.maker, args.taker, &amounts)
                .await?
        }
    };

    let two_hop = if args.two_hop {
        match side {
            MarketOperation::Sell => {
                sampler
                    .get_two_hop_sell_quotes(&sources, args.maker, args.taker, amount)
                    .await?
            }
            MarketOperation::Buy => {
                sampler
                    .get_two_hop_buy_quotes(&sources, args.maker, args.taker, amount)
                    .await?
            }
        }
    } else {
        Vec::new()
    };

    let output = json!({
        "side": side,
        "amounts": amounts,
        "quotes": quotes,
        "twoHop": two_hop,
    });
    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}
