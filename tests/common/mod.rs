//! Shared fixtures: an in-process stand-in for the ERC20BridgeSampler.

#![allow(dead_code)]

use anyhow::anyhow;
use async_trait::async_trait;
use ethers::abi::{self, Token};
use ethers::types::{Address, Bytes, U256};
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use dex_sampler_sdk::contracts::SAMPLER_ABI;
use dex_sampler_sdk::operations::CallResult;
use dex_sampler_sdk::SamplerTransport;

/// Answers every sampling function with `amount * rate` per requested
/// amount. Functions without a configured rate revert with a reason string.
/// Nested `batchCall`s are unpacked and answered call by call.
#[derive(Default)]
pub struct MockSampler {
    rates: HashMap<String, u64>,
    reverting: HashSet<String>,
    fail: bool,
    no_two_hop_route: bool,
    batch_calls: AtomicUsize,
    called: Mutex<Vec<String>>,
}

impl MockSampler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_rate(mut self, function: &str, rate: u64) -> Self {
        self.rates.insert(function.to_string(), rate);
        self
    }

    pub fn with_revert(mut self, function: &str) -> Self {
        self.reverting.insert(function.to_string());
        self
    }

    /// Two-hop calls answer with the contract's "no route" amount: zero for
    /// sells, `U256::MAX` for buys.
    pub fn without_two_hop_routes(mut self) -> Self {
        self.no_two_hop_route = true;
        self
    }

    /// Every `batchCall` fails at the transport level.
    pub fn unreachable() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    pub fn batch_calls(&self) -> usize {
        self.batch_calls.load(Ordering::SeqCst)
    }

    /// Function names of every sub-call seen, in order.
    pub fn called(&self) -> Vec<String> {
        self.called.lock().unwrap().clone()
    }

    fn answer(&self, calldata: &[u8]) -> CallResult {
        let function = SAMPLER_ABI
            .functions()
            .find(|f| calldata.len() >= 4 && f.short_signature()[..] == calldata[..4])
            .expect("calldata targets a sampler function");
        if function.name == "batchCall" {
            return self.answer_nested(function, calldata);
        }
        self.called.lock().unwrap().push(function.name.clone());

        if function.name.starts_with("sampleTwoHop") && !self.reverting.contains(&function.name) {
            return self.answer_two_hop(function, calldata);
        }

        let rate = match self.rates.get(&function.name) {
            Some(rate) if !self.reverting.contains(&function.name) => U256::from(*rate),
            _ => return revert(&format!("{} unavailable", function.name)),
        };

        let inputs = function
            .decode_input(&calldata[4..])
            .expect("calldata decodes against the ABI");
        if function.name == "getTokenDecimals" {
            let tokens = inputs[0].clone().into_array().unwrap_or_default();
            let decimals = tokens.iter().map(|_| Token::Uint(rate)).collect();
            return success(abi::encode(&[Token::Array(decimals)]));
        }

        let amounts: Vec<U256> = inputs
            .last()
            .cloned()
            .and_then(Token::into_array)
            .unwrap_or_default()
            .into_iter()
            .filter_map(Token::into_uint)
            .collect();
        let outputs = Token::Array(amounts.iter().map(|a| Token::Uint(*a * rate)).collect());

        if function.name.ends_with("FromDODOV2") {
            return success(abi::encode(&[
                Token::Bool(true),
                Token::Address(dodo_pool()),
                outputs,
            ]));
        }
        success(abi::encode(&[outputs]))
    }

    fn answer_nested(&self, function: &abi::Function, calldata: &[u8]) -> CallResult {
        let inputs = function
            .decode_input(&calldata[4..])
            .expect("calldata decodes against the ABI");
        let results = inputs[0]
            .clone()
            .into_array()
            .unwrap_or_default()
            .into_iter()
            .filter_map(Token::into_bytes)
            .map(|call| {
                let result = self.answer(&call);
                Token::Tuple(vec![Token::Bytes(result.data.to_vec()), Token::Bool(result.success)])
            })
            .collect();
        success(abi::encode(&[Token::Array(results)]))
    }

    /// Routes through the first call of each hop; the result is the amount
    /// scaled by both hop rates.
    fn answer_two_hop(&self, function: &abi::Function, calldata: &[u8]) -> CallResult {
        let inputs = function
            .decode_input(&calldata[4..])
            .expect("calldata decodes against the ABI");
        let first_call = |i: usize| -> Option<Vec<u8>> {
            inputs[i].clone().into_array()?.into_iter().next()?.into_bytes()
        };
        let (Some(first), Some(second)) = (first_call(0), first_call(1)) else {
            return revert("empty hop");
        };
        let amount = inputs[2].clone().into_uint().unwrap_or_default();

        let hop_rate = |call: &[u8]| -> Option<U256> {
            let name = &SAMPLER_ABI
                .functions()
                .find(|f| f.short_signature()[..] == call[..4])?
                .name;
            self.rates.get(name).map(|r| U256::from(*r))
        };
        let first_result = self.answer(&first);
        let second_result = self.answer(&second);
        let (Some(r1), Some(r2)) = (hop_rate(&first), hop_rate(&second)) else {
            return revert("hop unavailable");
        };
        if !first_result.success || !second_result.success {
            return revert("hop reverted");
        }
        let output = match (self.no_two_hop_route, function.name.as_str()) {
            (true, "sampleTwoHopBuy") => U256::MAX,
            (true, _) => U256::zero(),
            (false, _) => amount * r1 * r2,
        };
        success(abi::encode(&[
            Token::Tuple(vec![Token::Uint(U256::zero()), Token::Bytes(first_result.data.to_vec())]),
            Token::Tuple(vec![Token::Uint(U256::zero()), Token::Bytes(second_result.data.to_vec())]),
            Token::Uint(output),
        ]))
    }
}

#[async_trait]
impl SamplerTransport for MockSampler {
    async fn batch_call(&self, calls: Vec<Bytes>) -> anyhow::Result<Vec<CallResult>> {
        self.batch_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            return Err(anyhow!("connection refused"));
        }
        Ok(calls.iter().map(|call| self.answer(call)).collect())
    }
}

pub fn dodo_pool() -> Address {
    addr("0x000000000000000000000000000000000000d0d0")
}

pub fn addr(s: &str) -> Address {
    s.parse().expect("valid address literal")
}

fn success(data: Vec<u8>) -> CallResult {
    CallResult {
        success: true,
        data: Bytes::from(data),
    }
}

fn revert(reason: &str) -> CallResult {
    let mut data = vec![0x08, 0xc3, 0x79, 0xa0];
    data.extend(abi::encode(&[Token::String(reason.to_string())]));
    CallResult {
        success: false,
        data: Bytes::from(data),
    }
}
