//! Common types shared by the sampler, the adapters and the caches.

pub mod conversions;
pub mod fill_data;
pub mod sample;
pub mod source;

pub use fill_data::*;
pub use sample::{DexSample, MarketOperation, SourceQuote};
pub use source::{ChainId, Source};
