//! # DEX Sampler SDK
//!
//! Batched, revert-safe price sampling across on-chain liquidity venues. A
//! request for quotes on a token pair becomes one read-only `batchCall` to an
//! ERC20BridgeSampler contract; every venue's answer is decoded independently
//! so one failing venue never spoils the rest.
//!
//! ## Overview
//!
//! - **Sample amounts**: geometric fill-amount ladders ending exactly at the requested size
//! - **Operations**: one encode/decode recipe per venue call, composable into nested batches
//! - **Factory**: per-source dispatch from `(sources, pair, amounts, side)` to operations
//! - **Executor**: a single round trip per request, skipped entirely when nothing needs the network
//! - **Caches**: lending reserves and pool topology refreshed in the background, read lock-free
//!
//! ## Architecture
//!
//! ### Venue Layer
//! `adapters` encode the sampler function for each venue and decode venue-specific return data
//! into fill data for the execution layer.
//!
//! ### Cache Layer
//! `caches` hold immutable snapshots swapped atomically on refresh. The sampling path only reads
//! them and never waits on an upstream API.
//!
//! ### Sampling Layer
//! `sampler_operations` builds operations, `batch_executor` runs them, and `sampler` ties both to
//! a transport.

// Core Types
/// Sources, chains, samples and per-source fill data
pub mod types;
/// Error type
pub mod errors;
/// Per-chain venue configuration
pub mod constants;

// Sampling primitives
pub mod sample_amounts;
pub mod token_adjacency_graph;
pub mod source_filters;

// On-chain plumbing
/// ERC20BridgeSampler ABI
pub mod contracts;
pub mod operations;
/// Transport for the sampler's `batchCall`
pub mod multicall;
pub mod batch_executor;

// Venues and their off-chain data
pub mod adapters;
pub mod caches;

// Public surface
pub mod sampler_operations;
pub mod sampler;

/// Configuration management
pub mod settings;
pub mod metrics;

// Re-exports for convenience
pub use batch_executor::SamplerBatchExecutor;
pub use errors::{SamplerError, SamplerResult};
pub use multicall::{SamplerContract, SamplerTransport};
pub use operations::BatchedOperation;
pub use sampler::DexOrderSampler;
pub use sampler_operations::{FeeSchedule, SamplerOperations};
pub use settings::Settings;
pub use types::{ChainId, DexSample, FillData, MarketOperation, Source};
