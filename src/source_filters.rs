//! Set algebra over liquidity sources.
//!
//! A filter is immutable: every combinator returns a new filter.

use std::collections::BTreeSet;

use crate::errors::{SamplerError, SamplerResult};
use crate::types::{ChainId, Source};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceFilters {
    valid: BTreeSet<Source>,
    excluded: BTreeSet<Source>,
    included: BTreeSet<Source>,
}

impl SourceFilters {
    pub fn new(valid: impl IntoIterator<Item = Source>) -> Self {
        Self {
            valid: valid.into_iter().collect(),
            excluded: BTreeSet::new(),
            included: BTreeSet::new(),
        }
    }

    /// Every known source.
    pub fn all() -> Self {
        Self::new(Source::ALL)
    }

    pub fn is_allowed(&self, source: Source) -> bool {
        if self.excluded.contains(&source) {
            return false;
        }
        if !self.included.is_empty() && !self.included.contains(&source) {
            return false;
        }
        self.valid.contains(&source)
    }

    /// Allowed sources in declaration order.
    pub fn sources(&self) -> Vec<Source> {
        self.valid
            .iter()
            .copied()
            .filter(|s| self.is_allowed(*s))
            .collect()
    }

    pub fn exclude(&self, sources: impl IntoIterator<Item = Source>) -> Self {
        let mut next = self.clone();
        next.excluded.extend(sources);
        next
    }

    /// Restricts to `sources`. An empty list leaves the filter unchanged.
    pub fn include(&self, sources: impl IntoIterator<Item = Source>) -> Self {
        let mut next = self.clone();
        next.included.extend(sources);
        next
    }

    /// Narrows the valid set to `sources`.
    pub fn validate(&self, sources: impl IntoIterator<Item = Source>) -> Self {
        let restrict: BTreeSet<Source> = sources.into_iter().collect();
        Self {
            valid: self.valid.intersection(&restrict).copied().collect(),
            excluded: self.excluded.clone(),
            included: self.included.clone(),
        }
    }

    pub fn merge(&self, other: &SourceFilters) -> Self {
        Self {
            valid: self.valid.intersection(&other.valid).copied().collect(),
            excluded: self.excluded.union(&other.excluded).copied().collect(),
            included: self.included.union(&other.included).copied().collect(),
        }
    }

    /// `sources` minus anything this filter rejects, order preserved.
    pub fn get_allowed(&self, sources: &[Source]) -> Vec<Source> {
        sources
            .iter()
            .copied()
            .filter(|s| self.is_allowed(*s))
            .collect()
    }

    /// Parses caller-supplied source names, failing on the first unknown one.
    pub fn parse_sources<S: AsRef<str>>(names: &[S]) -> SamplerResult<Vec<Source>> {
        names
            .iter()
            .map(|name| name.as_ref().parse::<Source>())
            .collect::<Result<Vec<_>, SamplerError>>()
    }
}

/// Sources that are sampled per-venue through the sampler contract.
pub fn batch_source_filters() -> SourceFilters {
    SourceFilters::all().exclude([Source::MultiHop, Source::Native])
}

pub fn sell_sources(chain: ChainId) -> SourceFilters {
    match chain {
        ChainId::Mainnet => SourceFilters::new([
            Source::Native,
            Source::MultiHop,
            Source::Uniswap,
            Source::UniswapV2,
            Source::SushiSwap,
            Source::Curve,
            Source::CurveV2,
            Source::Swerve,
            Source::DodoV2,
            Source::Balancer,
            Source::BalancerV2,
            Source::AaveV2,
            Source::Compound,
            Source::MakerPsm,
        ]),
        ChainId::Bsc => SourceFilters::new([
            Source::Native,
            Source::MultiHop,
            Source::PancakeSwap,
            Source::SushiSwap,
            Source::Nerve,
            Source::Ellipsis,
        ]),
        ChainId::Polygon => SourceFilters::new([
            Source::Native,
            Source::MultiHop,
            Source::QuickSwap,
            Source::SushiSwap,
            Source::Curve,
            Source::BalancerV2,
            Source::AaveV2,
        ]),
    }
}

/// Exact-output sampling is unavailable on pools without a buy quote function.
pub fn buy_sources(chain: ChainId) -> SourceFilters {
    match chain {
        ChainId::Mainnet => sell_sources(chain).exclude([Source::CurveV2]),
        ChainId::Bsc => sell_sources(chain).exclude([Source::Nerve, Source::Ellipsis]),
        ChainId::Polygon => sell_sources(chain),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn batch_filter_drops_pseudo_sources() {
        let filters = batch_source_filters();
        assert!(!filters.is_allowed(Source::Native));
        assert!(!filters.is_allowed(Source::MultiHop));
        assert!(filters.is_allowed(Source::Curve));
        assert_eq!(
            filters.get_allowed(&[Source::MultiHop, Source::UniswapV2, Source::Native]),
            vec![Source::UniswapV2]
        );
    }

    #[test]
    fn include_restricts_and_exclude_wins() {
        let filters = SourceFilters::all()
            .include([Source::Uniswap, Source::Curve])
            .exclude([Source::Curve]);
        assert_eq!(filters.sources(), vec![Source::Uniswap]);
    }

    #[test]
    fn validate_narrows_valid_set() {
        let filters = SourceFilters::all().validate([Source::Balancer, Source::Compound]);
        assert_eq!(filters.sources(), vec![Source::Balancer, Source::Compound]);
        assert!(!filters.is_allowed(Source::Uniswap));
    }

    #[test]
    fn merge_intersects_valid_and_unions_exclusions() {
        let a = SourceFilters::new([Source::Uniswap, Source::Curve, Source::AaveV2])
            .exclude([Source::AaveV2]);
        let b = SourceFilters::new([Source::Curve, Source::AaveV2, Source::Compound]);
        assert_eq!(a.merge(&b).sources(), vec![Source::Curve]);
    }

    #[test]
    fn parse_sources_rejects_unknown_names() {
        assert_eq!(
            SourceFilters::parse_sources(&["Curve", "uniswap_v2"]).unwrap(),
            vec![Source::Curve, Source::UniswapV2]
        );
        assert!(SourceFilters::parse_sources(&["Curve", "Bancor"]).is_err());
    }

    #[test]
    fn chain_source_sets_respect_buy_support() {
        assert!(sell_sources(ChainId::Bsc).is_allowed(Source::Nerve));
        assert!(!buy_sources(ChainId::Bsc).is_allowed(Source::Nerve));
        assert!(!sell_sources(ChainId::Polygon).is_allowed(Source::Uniswap));
    }
}
