//! End-to-end sampling against an in-process sampler contract.
//!
//! Tests cover:
//! - One round trip per request, groups in source order
//! - Revert isolation between venues
//! - Requests that never touch the network
//! - Cache-backed venues with and without data for the pair
//! - Two-hop and native-rate requests
//! - Pool caches of unrequested venues never delay a request

mod common;

use common::{addr, dodo_pool, MockSampler};
use dex_sampler_sdk::caches::{
    AaveReserve, AaveV2ReservesCache, BalancerPoolsCache, CToken, CompoundCTokenCache,
    SubgraphClient,
};
use dex_sampler_sdk::constants::mainnet::{AMPL, DAI, USDC, WETH};
use dex_sampler_sdk::sample_amounts::get_sample_amounts;
use dex_sampler_sdk::token_adjacency_graph::TokenAdjacencyGraph;
use dex_sampler_sdk::types::{DodoV2FillData, UniswapV2FillData};
use dex_sampler_sdk::{
    ChainId, DexOrderSampler, FeeSchedule, FillData, SamplerError, SamplerOperations, Source,
};
use ethers::types::{Address, U256};
use rust_decimal::Decimal;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::net::TcpListener;

fn operations() -> SamplerOperations {
    SamplerOperations::new(ChainId::Mainnet)
        .with_token_adjacency_graph(TokenAdjacencyGraph::from_defaults(vec![USDC]))
}

fn amounts() -> Vec<U256> {
    vec![U256::from(1_000), U256::from(2_000), U256::from(3_000)]
}

fn aave_reserve() -> AaveReserve {
    AaveReserve {
        id: "dai-reserve".to_string(),
        underlying_asset: DAI,
        a_token: addr("0x028171bca77440897b824ca71d1c56cac55b68a3"),
        lending_pool: addr("0x7d2768de32b0b80b7a3454c06bdac94a69ddc7a9"),
    }
}

#[tokio::test]
async fn test_sell_quotes_share_one_round_trip() {
    let mock = MockSampler::new()
        .with_rate("sampleSellsFromUniswap", 2)
        .with_rate("sampleSellsFromUniswapV2", 3);
    let sampler = DexOrderSampler::new(operations(), mock);

    let quotes = sampler
        .get_sell_quotes(&[Source::Uniswap, Source::UniswapV2], DAI, WETH, &amounts())
        .await
        .unwrap();

    // Uniswap, then UniswapV2 direct, then UniswapV2 via USDC
    assert_eq!(quotes.len(), 3);
    assert_eq!(sampler.transport().batch_calls(), 1);
    assert_eq!(quotes[0][0].source, Source::Uniswap);

    for (group, rate) in quotes.iter().zip([2u64, 3, 3]) {
        assert_eq!(group.len(), 3);
        for (sample, amount) in group.iter().zip(amounts()) {
            assert_eq!(sample.input, amount);
            assert_eq!(sample.output, amount * rate);
        }
    }

    let paths: Vec<Vec<Address>> = quotes[1..]
        .iter()
        .map(|group| match &group[0].fill_data {
            FillData::UniswapV2(UniswapV2FillData { token_address_path, .. }) => {
                token_address_path.clone()
            }
            other => panic!("unexpected fill data {:?}", other),
        })
        .collect();
    assert_eq!(paths, vec![vec![WETH, DAI], vec![WETH, USDC, DAI]]);
}

#[tokio::test]
async fn test_buy_quotes_use_buy_functions() {
    let mock = MockSampler::new().with_rate("sampleBuysFromUniswapV2", 5);
    let sampler = DexOrderSampler::new(operations(), mock);

    let quotes = sampler
        .get_buy_quotes(&[Source::UniswapV2], DAI, WETH, &amounts())
        .await
        .unwrap();

    assert_eq!(quotes.len(), 2);
    assert_eq!(quotes[0][2].output, U256::from(15_000));
    assert!(sampler
        .transport()
        .called()
        .iter()
        .all(|name| name == "sampleBuysFromUniswapV2"));
}

#[tokio::test]
async fn test_reverting_venue_does_not_spoil_the_batch() {
    let mock = MockSampler::new()
        .with_rate("sampleSellsFromUniswap", 2)
        .with_rate("sampleSellsFromUniswapV2", 3)
        .with_revert("sampleSellsFromUniswapV2");
    let sampler = DexOrderSampler::new(operations(), mock);

    let quotes = sampler
        .get_sell_quotes(&[Source::Uniswap, Source::UniswapV2], DAI, WETH, &amounts())
        .await
        .unwrap();

    assert_eq!(quotes.len(), 3);
    assert_eq!(quotes[0].len(), 3);
    assert_eq!(quotes[0][1].output, U256::from(4_000));
    assert!(quotes[1].is_empty());
    assert!(quotes[2].is_empty());
}

#[tokio::test]
async fn test_no_op_only_request_skips_the_network() {
    let ops = operations().with_aave_v2_cache(Arc::new(AaveV2ReservesCache::fixed([aave_reserve()])));
    let sampler = DexOrderSampler::new(ops, MockSampler::unreachable());
    let reserve = aave_reserve();

    // An unreachable transport would fail the request if it were called.
    let quotes = sampler
        .get_sell_quotes(&[Source::AaveV2], reserve.a_token, DAI, &amounts())
        .await
        .unwrap();

    assert_eq!(sampler.transport().batch_calls(), 0);
    assert_eq!(quotes.len(), 1);
    for (sample, amount) in quotes[0].iter().zip(amounts()) {
        assert_eq!(sample.source, Source::AaveV2);
        assert_eq!(sample.output, amount);
    }
}

#[tokio::test]
async fn test_transport_failure_fails_the_request() {
    let sampler = DexOrderSampler::new(operations(), MockSampler::unreachable());

    let result = sampler
        .get_sell_quotes(&[Source::UniswapV2], DAI, WETH, &amounts())
        .await;

    assert!(matches!(result, Err(SamplerError::Transport(_))));
    assert_eq!(sampler.transport().batch_calls(), 1);
}

#[tokio::test]
async fn test_reserve_cache_misses_produce_nothing_on_either_side() {
    let ops = operations()
        .with_aave_v2_cache(Arc::new(AaveV2ReservesCache::fixed([aave_reserve()])))
        .with_compound_cache(Arc::new(CompoundCTokenCache::fixed(Vec::<CToken>::new())));

    for (taker, maker) in [(WETH, USDC), (USDC, WETH)] {
        let sell = ops
            .get_source_quote_operations(
                dex_sampler_sdk::MarketOperation::Sell,
                &[Source::AaveV2, Source::Compound],
                maker,
                taker,
                &amounts(),
            )
            .unwrap();
        let buy = ops
            .get_source_quote_operations(
                dex_sampler_sdk::MarketOperation::Buy,
                &[Source::AaveV2, Source::Compound],
                maker,
                taker,
                &amounts(),
            )
            .unwrap();
        assert!(sell.is_empty());
        assert!(buy.is_empty());
    }
}

#[tokio::test]
async fn test_rebasing_tokens_are_never_sampled_on_amms() {
    let mock = MockSampler::new()
        .with_rate("sampleSellsFromUniswap", 2)
        .with_rate("sampleSellsFromUniswapV2", 3);
    let sampler = DexOrderSampler::new(operations(), mock);

    let quotes = sampler
        .get_sell_quotes(&[Source::Uniswap, Source::UniswapV2], DAI, AMPL, &amounts())
        .await
        .unwrap();

    assert!(quotes.is_empty());
    assert_eq!(sampler.transport().batch_calls(), 0);
}

#[tokio::test]
async fn test_dodo_fill_data_comes_from_the_chain() {
    let mock = MockSampler::new().with_rate("sampleSellsFromDODOV2", 1);
    let sampler = DexOrderSampler::new(operations(), mock);

    let quotes = sampler
        .get_sell_quotes(&[Source::DodoV2], DAI, WETH, &amounts())
        .await
        .unwrap();

    assert!(!quotes.is_empty());
    match &quotes[0][0].fill_data {
        FillData::DodoV2(DodoV2FillData { pool_address, is_sell_base, .. }) => {
            assert_eq!(*pool_address, dodo_pool());
            assert!(*is_sell_base);
        }
        other => panic!("unexpected fill data {:?}", other),
    }
}

#[tokio::test]
async fn test_two_hop_sell_through_intermediate() {
    let mock = MockSampler::new().with_rate("sampleSellsFromUniswapV2", 3);
    let sampler = DexOrderSampler::new(operations(), mock);

    let samples = sampler
        .get_two_hop_sell_quotes(&[Source::UniswapV2], DAI, WETH, U256::from(10))
        .await
        .unwrap();

    assert_eq!(samples.len(), 1);
    let sample = &samples[0];
    assert_eq!(sample.source, Source::MultiHop);
    assert_eq!(sample.input, U256::from(10));
    assert_eq!(sample.output, U256::from(90));
    match &sample.fill_data {
        FillData::TwoHop(fill) => {
            assert_eq!(fill.intermediate_token, USDC);
            let first = fill.first_hop_source.as_ref().unwrap();
            assert_eq!(first.source, Source::UniswapV2);
            match &first.fill_data {
                FillData::UniswapV2(data) => assert_eq!(data.token_address_path, vec![WETH, USDC]),
                other => panic!("unexpected hop fill data {:?}", other),
            }
        }
        other => panic!("unexpected fill data {:?}", other),
    }
}

#[tokio::test]
async fn test_two_hop_buy_through_intermediate() {
    let mock = MockSampler::new().with_rate("sampleBuysFromUniswapV2", 4);
    let sampler = DexOrderSampler::new(operations(), mock);

    let samples = sampler
        .get_two_hop_buy_quotes(&[Source::UniswapV2], DAI, WETH, U256::from(10))
        .await
        .unwrap();

    assert_eq!(samples.len(), 1);
    assert_eq!(samples[0].input, U256::from(10));
    assert_eq!(samples[0].output, U256::from(160));
    let called = sampler.transport().called();
    assert!(called.contains(&"sampleTwoHopBuy".to_string()));
    assert!(!called.iter().any(|name| name.starts_with("sampleSells")));
    match &samples[0].fill_data {
        FillData::TwoHop(fill) => {
            assert_eq!(fill.intermediate_token, USDC);
            assert_eq!(fill.first_hop_source.as_ref().unwrap().source, Source::UniswapV2);
            assert_eq!(fill.second_hop_source.as_ref().unwrap().source, Source::UniswapV2);
        }
        other => panic!("unexpected fill data {:?}", other),
    }
}

#[tokio::test]
async fn test_two_hop_buy_without_route_is_infeasible() {
    let mock = MockSampler::new()
        .with_rate("sampleBuysFromUniswapV2", 4)
        .without_two_hop_routes();
    let sampler = DexOrderSampler::new(operations(), mock);

    let samples = sampler
        .get_two_hop_buy_quotes(&[Source::UniswapV2], DAI, WETH, U256::from(10))
        .await
        .unwrap();

    assert_eq!(samples.len(), 1);
    assert!(samples[0].output.is_zero());
    match &samples[0].fill_data {
        FillData::TwoHop(fill) => {
            assert!(fill.first_hop_source.is_none());
            assert!(fill.second_hop_source.is_none());
        }
        other => panic!("unexpected fill data {:?}", other),
    }
}

#[tokio::test]
async fn test_two_hop_revert_is_an_infeasible_sample() {
    let mock = MockSampler::new()
        .with_rate("sampleSellsFromUniswapV2", 3)
        .with_revert("sampleTwoHopSell");
    let sampler = DexOrderSampler::new(operations(), mock);

    let samples = sampler
        .get_two_hop_sell_quotes(&[Source::UniswapV2], DAI, WETH, U256::from(10))
        .await
        .unwrap();

    assert_eq!(samples.len(), 1);
    assert!(samples[0].output.is_zero());
}

#[tokio::test]
async fn test_best_native_token_sell_rate_picks_highest_output() {
    let mock = MockSampler::new()
        .with_rate("sampleSellsFromUniswap", 2)
        .with_rate("sampleSellsFromUniswapV2", 3);
    let sampler = DexOrderSampler::new(operations(), mock);

    let rate = sampler
        .get_best_native_token_sell_rate(
            &[Source::Uniswap, Source::UniswapV2],
            DAI,
            U256::from(1_000),
            &FeeSchedule::new(),
        )
        .await
        .unwrap();

    assert_eq!(rate, Decimal::from(3));
}

#[tokio::test]
async fn test_native_token_rate_for_itself_is_one() {
    let sampler = DexOrderSampler::new(operations(), MockSampler::unreachable());

    let rate = sampler
        .get_best_native_token_sell_rate(&[Source::UniswapV2], WETH, U256::from(1_000), &FeeSchedule::new())
        .await
        .unwrap();

    assert_eq!(rate, Decimal::ONE);
    assert_eq!(sampler.transport().batch_calls(), 0);
}

#[tokio::test]
async fn test_token_decimals() {
    let sampler = DexOrderSampler::new(operations(), MockSampler::new().with_rate("getTokenDecimals", 18));

    let decimals = sampler.get_token_decimals(&[DAI, WETH]).await.unwrap();

    assert_eq!(decimals, vec![18, 18]);
}

#[tokio::test]
async fn test_sample_ladder_feeds_quotes() {
    let mock = MockSampler::new().with_rate("sampleSellsFromUniswap", 1);
    let sampler =
        DexOrderSampler::new(operations(), mock).with_sample_distribution(13, Decimal::ONE);
    let max = U256::exp10(18);

    let ladder = sampler.sample_amounts_for(max).unwrap();
    assert_eq!(ladder, get_sample_amounts(max, 13));

    let quotes = sampler
        .get_sell_quotes(&[Source::Uniswap], DAI, WETH, &ladder)
        .await
        .unwrap();
    assert_eq!(quotes[0].len(), 13);
    assert_eq!(quotes[0].last().unwrap().input, max);
}

#[tokio::test]
async fn test_pseudo_source_is_ignored_by_quotes() {
    let mock = MockSampler::new().with_rate("sampleSellsFromUniswap", 2);
    let sampler = DexOrderSampler::new(operations(), mock);

    let quotes = sampler
        .get_sell_quotes(&[Source::Native, Source::Uniswap, Source::MultiHop], DAI, WETH, &amounts())
        .await
        .unwrap();

    assert_eq!(quotes.len(), 1);
    assert_eq!(quotes[0][0].source, Source::Uniswap);
}

/// A subgraph endpoint that accepts connections and never answers.
async fn silent_subgraph() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let url = format!("http://{}/subgraph", listener.local_addr().unwrap());
    tokio::spawn(async move {
        let mut open = Vec::new();
        while let Ok((socket, _)) = listener.accept().await {
            open.push(socket);
        }
    });
    url
}

#[tokio::test]
async fn test_unrequested_pool_caches_do_not_delay_quotes() {
    let lookup_timeout = Duration::from_millis(1_500);
    let subgraph = SubgraphClient::new(silent_subgraph().await, Duration::from_secs(30)).unwrap();
    let balancer = BalancerPoolsCache::new(subgraph, Duration::from_secs(3_600));
    let operations = operations()
        .with_balancer_cache(Arc::new(balancer))
        .with_fresh_lookup_timeout(lookup_timeout);
    let mock = MockSampler::new().with_rate("sampleSellsFromUniswap", 2);
    let sampler = DexOrderSampler::new(operations, mock);

    let started = Instant::now();
    let quotes = sampler
        .get_sell_quotes(&[Source::Uniswap], DAI, WETH, &[U256::from(10)])
        .await
        .unwrap();
    assert!(
        started.elapsed() < lookup_timeout / 2,
        "uniswap-only request took {:?}",
        started.elapsed()
    );
    assert_eq!(quotes.len(), 1);
    assert_eq!(quotes[0][0].output, U256::from(20));

    // A Balancer request still waits for the lookup, then proceeds without pools.
    let started = Instant::now();
    let quotes = sampler
        .get_sell_quotes(&[Source::Balancer], DAI, WETH, &[U256::from(10)])
        .await
        .unwrap();
    assert!(started.elapsed() >= lookup_timeout);
    assert!(quotes.is_empty());
}
