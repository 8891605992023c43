use ethers::abi::{Function, Token};
use ethers::types::{Bytes, U256};
use log::{debug, warn};

use super::{decode_revert_reason, BatchedOperation};
use crate::contracts::sampler_function;
use crate::errors::{SamplerError, SamplerResult};
use crate::metrics;
use crate::types::{FillData, Source};

/// Per-source post-processing of a successful call. May write decode-time
/// details (pool chosen on-chain, direction) into the operation's fill data.
pub type ResultHandler<T> =
    Box<dyn Fn(&Function, &[u8], &mut FillData) -> SamplerResult<T> + Send + Sync>;

/// Generic structural decode used when no handler is supplied.
pub trait DecodeReturnData: Sized {
    fn from_tokens(tokens: Vec<Token>) -> Option<Self>;
}

impl DecodeReturnData for Vec<U256> {
    fn from_tokens(tokens: Vec<Token>) -> Option<Self> {
        tokens
            .into_iter()
            .next()?
            .into_array()?
            .into_iter()
            .map(Token::into_uint)
            .collect()
    }
}

impl DecodeReturnData for U256 {
    fn from_tokens(tokens: Vec<Token>) -> Option<Self> {
        tokens.into_iter().next()?.into_uint()
    }
}

/// Decodes `data` as the outputs of `function` into `T`.
pub fn decode_return_data<T: DecodeReturnData>(function: &Function, data: &[u8]) -> SamplerResult<T> {
    let tokens = function
        .decode_output(data)
        .map_err(|e| SamplerError::abi(&function.name, e))?;
    T::from_tokens(tokens)
        .ok_or_else(|| SamplerError::malformed(&function.name, "unexpected output shape"))
}

/// A single call to a sampler contract function.
pub struct SamplerContractOperation<T> {
    source: Option<Source>,
    function: &'static Function,
    calldata: Bytes,
    fill_data: FillData,
    handler: Option<ResultHandler<T>>,
}

impl<T> SamplerContractOperation<T> {
    pub fn new(
        source: impl Into<Option<Source>>,
        function_name: &str,
        params: Vec<Token>,
        fill_data: FillData,
    ) -> SamplerResult<Self> {
        let function = sampler_function(function_name)?;
        let calldata = function
            .encode_input(&params)
            .map_err(|e| SamplerError::abi(function_name, e))?;
        Ok(Self {
            source: source.into(),
            function,
            calldata: Bytes::from(calldata),
            fill_data,
            handler: None,
        })
    }

    pub fn with_handler(mut self, handler: ResultHandler<T>) -> Self {
        self.handler = Some(handler);
        self
    }

    pub fn source(&self) -> Option<Source> {
        self.source
    }

    pub fn function_name(&self) -> &str {
        &self.function.name
    }

    pub fn fill_data(&self) -> &FillData {
        &self.fill_data
    }

    fn source_label(&self) -> &'static str {
        self.source.map(|s| s.name()).unwrap_or("sampler")
    }
}

impl<T> BatchedOperation for SamplerContractOperation<T>
where
    T: DecodeReturnData + Default + Send,
{
    type Output = T;

    fn encode_call(&self) -> Bytes {
        self.calldata.clone()
    }

    fn handle_call_results(&mut self, data: &[u8]) -> T {
        let decoded = match &self.handler {
            Some(handler) => handler(self.function, data, &mut self.fill_data),
            None => decode_return_data(self.function, data),
        };
        decoded.unwrap_or_else(|e| {
            warn!(
                "{} returned undecodable data for {}: {}",
                self.function.name,
                self.source_label(),
                e
            );
            T::default()
        })
    }

    fn handle_revert(&mut self, data: &[u8]) -> T {
        let reason = decode_revert_reason(data).unwrap_or_else(|| "no reason".to_string());
        warn!(
            "Sampler call {} for {} reverted: {}",
            self.function.name,
            self.source_label(),
            reason
        );
        debug!("Reverted calldata: 0x{}", hex::encode(&self.calldata));
        metrics::increment_operation_revert(self.source_label());
        T::default()
    }
}
