//! Liquidity source and chain identifiers.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::errors::SamplerError;

/// Liquidity source identifier.
///
/// `Native` and `MultiHop` are pseudo-sources: they appear in caller-facing
/// source lists but are produced by other subsystems (order book, two-hop
/// aggregation) and are never sampled per-venue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Source {
    Native,
    MultiHop,
    Uniswap,
    UniswapV2,
    SushiSwap,
    PancakeSwap,
    QuickSwap,
    Curve,
    CurveV2,
    Swerve,
    Nerve,
    Ellipsis,
    DodoV2,
    Balancer,
    BalancerV2,
    AaveV2,
    Compound,
    MakerPsm,
}

impl Source {
    /// Every known source, in declaration order.
    pub const ALL: [Source; 18] = [
        Source::Native,
        Source::MultiHop,
        Source::Uniswap,
        Source::UniswapV2,
        Source::SushiSwap,
        Source::PancakeSwap,
        Source::QuickSwap,
        Source::Curve,
        Source::CurveV2,
        Source::Swerve,
        Source::Nerve,
        Source::Ellipsis,
        Source::DodoV2,
        Source::Balancer,
        Source::BalancerV2,
        Source::AaveV2,
        Source::Compound,
        Source::MakerPsm,
    ];

    pub const fn name(&self) -> &'static str {
        match self {
            Source::Native => "Native",
            Source::MultiHop => "MultiHop",
            Source::Uniswap => "Uniswap",
            Source::UniswapV2 => "Uniswap_V2",
            Source::SushiSwap => "SushiSwap",
            Source::PancakeSwap => "PancakeSwap_V2",
            Source::QuickSwap => "QuickSwap",
            Source::Curve => "Curve",
            Source::CurveV2 => "Curve_V2",
            Source::Swerve => "Swerve",
            Source::Nerve => "Nerve",
            Source::Ellipsis => "Ellipsis",
            Source::DodoV2 => "DODO_V2",
            Source::Balancer => "Balancer",
            Source::BalancerV2 => "Balancer_V2",
            Source::AaveV2 => "Aave_V2",
            Source::Compound => "Compound",
            Source::MakerPsm => "MakerPsm",
        }
    }

    /// Uniswap-V2 router forks that accept an arbitrary token path.
    pub const fn is_uniswap_v2_like(&self) -> bool {
        matches!(
            self,
            Source::UniswapV2 | Source::SushiSwap | Source::PancakeSwap | Source::QuickSwap
        )
    }

    /// Stableswap venues served from the static pool registry.
    pub const fn is_curve_like(&self) -> bool {
        matches!(
            self,
            Source::Curve | Source::CurveV2 | Source::Swerve | Source::Nerve | Source::Ellipsis
        )
    }
}

impl fmt::Display for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Source {
    type Err = SamplerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Source::ALL
            .iter()
            .copied()
            .find(|source| source.name().eq_ignore_ascii_case(s))
            .ok_or_else(|| SamplerError::UnsupportedSource(s.to_string()))
    }
}

/// Chains the sampler has venue configuration for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "u64", into = "u64")]
pub enum ChainId {
    Mainnet,
    Bsc,
    Polygon,
}

impl ChainId {
    pub const fn id(&self) -> u64 {
        match self {
            ChainId::Mainnet => 1,
            ChainId::Bsc => 56,
            ChainId::Polygon => 137,
        }
    }
}

impl TryFrom<u64> for ChainId {
    type Error = SamplerError;

    fn try_from(value: u64) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(ChainId::Mainnet),
            56 => Ok(ChainId::Bsc),
            137 => Ok(ChainId::Polygon),
            other => Err(SamplerError::UnsupportedChain(other)),
        }
    }
}

impl From<ChainId> for u64 {
    fn from(chain: ChainId) -> Self {
        chain.id()
    }
}

impl fmt::Display for ChainId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.id())
    }
}
