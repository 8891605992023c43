use ethers::types::U256;
use serde::{Deserialize, Serialize};

use super::fill_data::FillData;
use super::source::Source;

/// One executable price sample.
///
/// `input` echoes the requested fill amount verbatim. `output` is the raw
/// amount the venue returns for that input; zero means infeasible at this
/// size.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DexSample {
    pub source: Source,
    pub input: U256,
    pub output: U256,
    pub fill_data: FillData,
}

/// The decoded result of one per-venue operation before it is paired with
/// the requested fill amounts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceQuote {
    pub source: Source,
    pub fill_data: FillData,
    pub outputs: Vec<U256>,
}

impl SourceQuote {
    /// Pairs each output with the fill amount that produced it.
    pub fn into_samples(self, fill_amounts: &[U256]) -> Vec<DexSample> {
        let SourceQuote { source, fill_data, outputs } = self;
        outputs
            .into_iter()
            .zip(fill_amounts.iter())
            .map(|(output, input)| DexSample {
                source,
                input: *input,
                output,
                fill_data: fill_data.clone(),
            })
            .collect()
    }
}

/// Whether fill amounts are denominated in the taker (sell) or maker (buy)
/// token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MarketOperation {
    Sell,
    Buy,
}
