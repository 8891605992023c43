use ethers::types::Bytes;

use super::BatchedOperation;
use crate::types::{FillData, Source};

/// An operation answered locally. Encodes to the no-op sentinel so the
/// executor never sends it; the result comes from `result` instead.
pub struct SamplerNoOperation<T> {
    source: Option<Source>,
    fill_data: FillData,
    result: Box<dyn Fn() -> T + Send + Sync>,
}

impl<T> SamplerNoOperation<T> {
    pub fn new(
        source: impl Into<Option<Source>>,
        fill_data: FillData,
        result: impl Fn() -> T + Send + Sync + 'static,
    ) -> Self {
        Self {
            source: source.into(),
            fill_data,
            result: Box::new(result),
        }
    }

    pub fn source(&self) -> Option<Source> {
        self.source
    }

    pub fn fill_data(&self) -> &FillData {
        &self.fill_data
    }
}

impl<T> BatchedOperation for SamplerNoOperation<T> {
    type Output = T;

    fn encode_call(&self) -> Bytes {
        Bytes::new()
    }

    fn handle_call_results(&mut self, _data: &[u8]) -> T {
        (self.result)()
    }

    fn handle_revert(&mut self, _data: &[u8]) -> T {
        (self.result)()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ethers::types::U256;

    #[test]
    fn no_op_encodes_the_sentinel_and_answers_locally() {
        let amounts = vec![U256::from(1), U256::from(2)];
        let expected = amounts.clone();
        let mut op = SamplerNoOperation::new(Source::AaveV2, FillData::None, move || amounts.clone());
        assert!(op.encode_call().is_empty());
        assert_eq!(op.handle_call_results(&[]), expected);
    }
}
