//! Per-source fill data.
//!
//! Fill data is everything the execution layer needs to turn a sample into an
//! on-chain fill instruction. The sampler is stateless between sampling and
//! trading, so these shapes are a wire contract with that layer: changing a
//! field is a breaking change for the consumer.

use ethers::types::{Address, Bytes, H256};
use serde::{Deserialize, Serialize};

use super::source::{ChainId, Source};

/// Four-byte function selectors serialize as `0x`-prefixed hex.
pub(crate) mod hex_selector {
    use serde::{de::Error, Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(selector: &[u8; 4], serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&format!("0x{}", hex::encode(selector)))
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<[u8; 4], D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        let decoded = hex::decode(raw.trim_start_matches("0x")).map_err(D::Error::custom)?;
        decoded
            .try_into()
            .map_err(|_| D::Error::custom("selector must be exactly 4 bytes"))
    }
}

/// A stableswap pool as registered in the static Curve-like registry.
///
/// Pools expose different calling conventions (`exchange` vs
/// `exchange_underlying`, `int128` vs `uint256` indices), so the selectors
/// travel with the pool rather than being derived from the source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CurveInfo {
    pub pool_address: Address,
    pub tokens: Vec<Address>,
    #[serde(with = "hex_selector")]
    pub exchange_function_selector: [u8; 4],
    #[serde(with = "hex_selector")]
    pub sell_quote_function_selector: [u8; 4],
    /// All-zero when the pool cannot quote exact-output swaps.
    #[serde(with = "hex_selector")]
    pub buy_quote_function_selector: [u8; 4],
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UniswapFillData {
    pub router: Address,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UniswapV2FillData {
    pub router: Address,
    pub token_address_path: Vec<Address>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CurveFillData {
    pub pool: CurveInfo,
    pub from_token_idx: usize,
    pub to_token_idx: usize,
}

/// DODO V2 pools are chosen on-chain by the registry offset, so the pool
/// address and direction are only known once the sample returns.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct DodoV2FillData {
    pub registry: Address,
    pub offset: u64,
    pub pool_address: Address,
    pub is_sell_base: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BalancerFillData {
    pub pool_address: Address,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BalancerSwapStep {
    pub pool_id: H256,
    pub asset_in_index: usize,
    pub asset_out_index: usize,
    pub amount: ethers::types::U256,
    pub user_data: Bytes,
}

/// One Balancer V2 batch-swap plan: the asset list and the steps walking it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct BalancerSwapInfo {
    pub assets: Vec<Address>,
    pub swap_steps: Vec<BalancerSwapStep>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BalancerV2BatchSwapFillData {
    pub vault: Address,
    pub swap_steps: Vec<BalancerSwapStep>,
    pub assets: Vec<Address>,
    pub chain_id: ChainId,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AaveV2FillData {
    pub lending_pool: Address,
    pub a_token: Address,
    pub underlying_token: Address,
    pub taker_token: Address,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompoundFillData {
    pub c_token: Address,
    pub taker_token: Address,
    pub maker_token: Address,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MakerPsmFillData {
    pub psm_address: Address,
    pub ilk_identifier: H256,
    pub gem_token_address: Address,
    pub is_sell_operation: bool,
    pub taker_token: Address,
    pub maker_token: Address,
}

/// The winning venue for one leg of a two-hop route.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HopFillData {
    pub source: Source,
    pub fill_data: FillData,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TwoHopFillData {
    pub intermediate_token: Address,
    pub first_hop_source: Option<Box<HopFillData>>,
    pub second_hop_source: Option<Box<HopFillData>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(tag = "type", content = "data")]
pub enum FillData {
    #[default]
    None,
    Uniswap(UniswapFillData),
    UniswapV2(UniswapV2FillData),
    Curve(CurveFillData),
    DodoV2(DodoV2FillData),
    Balancer(BalancerFillData),
    BalancerV2(BalancerV2BatchSwapFillData),
    AaveV2(AaveV2FillData),
    Compound(CompoundFillData),
    MakerPsm(MakerPsmFillData),
    TwoHop(TwoHopFillData),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn curve_selectors_serialize_as_hex() {
        let info = CurveInfo {
            pool_address: Address::repeat_byte(0x11),
            tokens: vec![Address::repeat_byte(0x01), Address::repeat_byte(0x02)],
            exchange_function_selector: [0x3d, 0xf0, 0x21, 0x24],
            sell_quote_function_selector: [0x5e, 0x0d, 0x44, 0x3f],
            buy_quote_function_selector: [0; 4],
        };
        let json = serde_json::to_value(&info).unwrap();
        assert_eq!(json["exchangeFunctionSelector"], "0x3df02124");
        assert_eq!(json["buyQuoteFunctionSelector"], "0x00000000");

        let back: CurveInfo = serde_json::from_value(json).unwrap();
        assert_eq!(back, info);
    }

    #[test]
    fn fill_data_is_tagged_by_variant() {
        let fill_data = FillData::Compound(CompoundFillData {
            c_token: Address::repeat_byte(0xcc),
            taker_token: Address::repeat_byte(0x01),
            maker_token: Address::repeat_byte(0xcc),
        });
        let json = serde_json::to_value(&fill_data).unwrap();
        assert_eq!(json["type"], "Compound");
        assert!(json["data"]["cToken"].is_string());
    }
}
