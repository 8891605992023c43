use ethers::abi::{parse_abi, Abi, Function};
use once_cell::sync::Lazy;

use crate::errors::{SamplerError, SamplerResult};

// ERC20BridgeSampler: read-only helper contract that quotes every supported
// venue for a list of amounts and never reverts the outer call.
const ERC20_BRIDGE_SAMPLER_ABI: &[&str] = &[
    "struct CallResults { bytes data; bool success; }",
    "struct CurveInfo { address poolAddress; bytes4 sellQuoteFunctionSelector; bytes4 buyQuoteFunctionSelector; }",
    "struct BalancerV2BatchSwapStep { bytes32 poolId; uint256 assetInIndex; uint256 assetOutIndex; uint256 amount; bytes userData; }",
    "struct MakerPsmInfo { address psmAddress; bytes32 ilkIdentifier; address gemTokenAddress; }",
    "struct HopInfo { uint256 sourceIndex; bytes returnData; }",
    "function batchCall(bytes[] callDatas) external returns (CallResults[] callResults)",
    "function getTokenDecimals(address[] tokens) external view returns (uint256[] decimals)",
    "function sampleSellsFromUniswap(address router, address takerToken, address makerToken, uint256[] takerTokenAmounts) external view returns (uint256[] makerTokenAmounts)",
    "function sampleBuysFromUniswap(address router, address takerToken, address makerToken, uint256[] makerTokenAmounts) external view returns (uint256[] takerTokenAmounts)",
    "function sampleSellsFromUniswapV2(address router, address[] path, uint256[] takerTokenAmounts) external view returns (uint256[] makerTokenAmounts)",
    "function sampleBuysFromUniswapV2(address router, address[] path, uint256[] makerTokenAmounts) external view returns (uint256[] takerTokenAmounts)",
    "function sampleSellsFromCurve(CurveInfo curveInfo, int128 fromTokenIdx, int128 toTokenIdx, uint256[] takerTokenAmounts) external view returns (uint256[] makerTokenAmounts)",
    "function sampleBuysFromCurve(CurveInfo curveInfo, int128 fromTokenIdx, int128 toTokenIdx, uint256[] makerTokenAmounts) external view returns (uint256[] takerTokenAmounts)",
    "function sampleSellsFromDODOV2(address registry, uint256 offset, address takerToken, address makerToken, uint256[] takerTokenAmounts) external view returns (bool sellBase, address pool, uint256[] makerTokenAmounts)",
    "function sampleBuysFromDODOV2(address registry, uint256 offset, address takerToken, address makerToken, uint256[] makerTokenAmounts) external view returns (bool sellBase, address pool, uint256[] takerTokenAmounts)",
    "function sampleSellsFromBalancer(address poolAddress, address takerToken, address makerToken, uint256[] takerTokenAmounts) external view returns (uint256[] makerTokenAmounts)",
    "function sampleBuysFromBalancer(address poolAddress, address takerToken, address makerToken, uint256[] makerTokenAmounts) external view returns (uint256[] takerTokenAmounts)",
    "function sampleMultihopSellsFromBalancerV2(address vault, BalancerV2BatchSwapStep[] swapSteps, address[] swapAssets, uint256[] takerTokenAmounts) external returns (uint256[] makerTokenAmounts)",
    "function sampleMultihopBuysFromBalancerV2(address vault, BalancerV2BatchSwapStep[] swapSteps, address[] swapAssets, uint256[] makerTokenAmounts) external returns (uint256[] takerTokenAmounts)",
    "function sampleSellsFromCompound(address cToken, address takerToken, address makerToken, uint256[] takerTokenAmounts) external view returns (uint256[] makerTokenAmounts)",
    "function sampleBuysFromCompound(address cToken, address takerToken, address makerToken, uint256[] makerTokenAmounts) external view returns (uint256[] takerTokenAmounts)",
    "function sampleSellsFromMakerPsm(MakerPsmInfo psmInfo, address takerToken, address makerToken, uint256[] takerTokenAmounts) external view returns (uint256[] makerTokenAmounts)",
    "function sampleBuysFromMakerPsm(MakerPsmInfo psmInfo, address takerToken, address makerToken, uint256[] makerTokenAmounts) external view returns (uint256[] takerTokenAmounts)",
    "function sampleTwoHopSell(bytes[] firstHopCalls, bytes[] secondHopCalls, uint256 sellAmount) external returns (HopInfo firstHop, HopInfo secondHop, uint256 buyAmount)",
    "function sampleTwoHopBuy(bytes[] firstHopCalls, bytes[] secondHopCalls, uint256 buyAmount) external returns (HopInfo firstHop, HopInfo secondHop, uint256 sellAmount)",
];

pub static SAMPLER_ABI: Lazy<Abi> =
    Lazy::new(|| parse_abi(ERC20_BRIDGE_SAMPLER_ABI).expect("sampler ABI is well-formed"));

/// Looks up a sampler function by name.
pub fn sampler_function(name: &str) -> SamplerResult<&'static Function> {
    SAMPLER_ABI
        .function(name)
        .map_err(|_| SamplerError::UnknownFunction(name.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use ethers::abi::ParamType;

    #[test]
    fn every_function_parses() {
        assert_eq!(SAMPLER_ABI.functions().count(), 20);
    }

    #[test]
    fn struct_params_become_tuples() {
        let curve = sampler_function("sampleSellsFromCurve").unwrap();
        assert_eq!(
            curve.inputs[0].kind,
            ParamType::Tuple(vec![
                ParamType::Address,
                ParamType::FixedBytes(4),
                ParamType::FixedBytes(4)
            ])
        );
        assert_eq!(curve.inputs[1].kind, ParamType::Int(128));

        let batch = sampler_function("batchCall").unwrap();
        assert_eq!(
            batch.outputs[0].kind,
            ParamType::Array(Box::new(ParamType::Tuple(vec![
                ParamType::Bytes,
                ParamType::Bool
            ])))
        );
    }

    #[test]
    fn unknown_function_is_an_error() {
        assert!(matches!(
            sampler_function("sampleSellsFromKyber"),
            Err(SamplerError::UnknownFunction(_))
        ));
    }
}
