use ethers::types::{Bytes, U256};

use super::{BatchedOperation, SamplerContractOperation, SamplerNoOperation};
use crate::types::{FillData, Source, SourceQuote};

/// A per-venue quote: output amounts for the requested fill amounts, tagged
/// with the source and the fill data as it stands after decoding.
pub enum SourceQuoteOperation {
    Contract {
        source: Source,
        op: SamplerContractOperation<Vec<U256>>,
    },
    NoOp {
        source: Source,
        op: SamplerNoOperation<Vec<U256>>,
    },
}

impl SourceQuoteOperation {
    pub fn contract(source: Source, op: SamplerContractOperation<Vec<U256>>) -> Self {
        SourceQuoteOperation::Contract { source, op }
    }

    pub fn no_op(source: Source, op: SamplerNoOperation<Vec<U256>>) -> Self {
        SourceQuoteOperation::NoOp { source, op }
    }

    pub fn source(&self) -> Source {
        match self {
            SourceQuoteOperation::Contract { source, .. } => *source,
            SourceQuoteOperation::NoOp { source, .. } => *source,
        }
    }

    pub fn fill_data(&self) -> &FillData {
        match self {
            SourceQuoteOperation::Contract { op, .. } => op.fill_data(),
            SourceQuoteOperation::NoOp { op, .. } => op.fill_data(),
        }
    }

    /// Sampler function name, `None` for locally answered quotes.
    pub fn function_name(&self) -> Option<&str> {
        match self {
            SourceQuoteOperation::Contract { op, .. } => Some(op.function_name()),
            SourceQuoteOperation::NoOp { .. } => None,
        }
    }

    fn quote(&self, outputs: Vec<U256>) -> SourceQuote {
        SourceQuote {
            source: self.source(),
            fill_data: self.fill_data().clone(),
            outputs,
        }
    }
}

impl BatchedOperation for SourceQuoteOperation {
    type Output = SourceQuote;

    fn encode_call(&self) -> Bytes {
        match self {
            SourceQuoteOperation::Contract { op, .. } => op.encode_call(),
            SourceQuoteOperation::NoOp { op, .. } => op.encode_call(),
        }
    }

    fn handle_call_results(&mut self, data: &[u8]) -> SourceQuote {
        let outputs = match self {
            SourceQuoteOperation::Contract { op, .. } => op.handle_call_results(data),
            SourceQuoteOperation::NoOp { op, .. } => op.handle_call_results(data),
        };
        self.quote(outputs)
    }

    fn handle_revert(&mut self, data: &[u8]) -> SourceQuote {
        let outputs = match self {
            SourceQuoteOperation::Contract { op, .. } => op.handle_revert(data),
            SourceQuoteOperation::NoOp { op, .. } => op.handle_revert(data),
        };
        self.quote(outputs)
    }
}
