//! Error type for the sampling core.
//!
//! Only programmer errors and transport failures surface as `Err`. Venue
//! gaps, reverts and cache refresh failures are handled where they occur
//! and degrade to fewer samples instead.

use ethers::types::Address;

use crate::types::conversions::ConversionError;
use crate::types::Source;

#[derive(Debug, thiserror::Error)]
pub enum SamplerError {
    /// The caller asked for a source this sampler cannot sample. Source lists
    /// are caller-controlled and should be validated upstream.
    #[error("Unsupported sample source: {0}")]
    UnsupportedSource(String),

    #[error("Unsupported chain id: {0}")]
    UnsupportedChain(u64),

    #[error("Invalid sample distribution: {0}")]
    InvalidSampleDistribution(String),

    #[error("Token {0:?} cannot be connected to itself")]
    SelfLoop(Address),

    #[error("Sampler ABI has no function `{0}`")]
    UnknownFunction(String),

    #[error("ABI error in `{function}`: {source}")]
    Abi {
        function: String,
        #[source]
        source: ethers::abi::Error,
    },

    #[error("Malformed return data from `{function}`: {reason}")]
    MalformedReturnData { function: String, reason: String },

    #[error("Batch returned {actual} results for {expected} calls")]
    ResultCountMismatch { expected: usize, actual: usize },

    #[error("Invalid {venue} plan: {reason}")]
    InvalidPlan { venue: Source, reason: String },

    #[error(transparent)]
    Conversion(#[from] ConversionError),

    /// The single batched read-only call failed as a whole.
    #[error(transparent)]
    Transport(#[from] anyhow::Error),
}

impl SamplerError {
    pub(crate) fn abi(function: &str, source: ethers::abi::Error) -> Self {
        SamplerError::Abi {
            function: function.to_string(),
            source,
        }
    }

    pub(crate) fn malformed(function: &str, reason: impl Into<String>) -> Self {
        SamplerError::MalformedReturnData {
            function: function.to_string(),
            reason: reason.into(),
        }
    }
}

pub type SamplerResult<T> = Result<T, SamplerError>;
