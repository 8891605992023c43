//! Per-chain venue configuration.
//!
//! Everything here is static data. A `None` or an empty list means the venue
//! is not deployed on that chain and is skipped during sampling.

use ethers::types::{Address, H160, H256};
use ethers::utils::id;

use crate::token_adjacency_graph::TokenAdjacencyGraph;
use crate::types::{ChainId, CurveInfo, Source};

pub const NULL_ADDRESS: Address = H160([0u8; 20]);

/// Registry offsets probed for every DODO V2 factory.
pub const DODO_V2_OFFSETS: [u64; 3] = [0, 1, 2];

/// Selector placeholder for pools that cannot quote exact-output swaps.
pub const NO_SELECTOR: [u8; 4] = [0u8; 4];

const fn hex_nibble(c: u8) -> u8 {
    match c {
        b'0'..=b'9' => c - b'0',
        b'a'..=b'f' => c - b'a' + 10,
        b'A'..=b'F' => c - b'A' + 10,
        _ => panic!("invalid hex digit in address literal"),
    }
}

/// Parses a `0x`-prefixed 20-byte hex literal at compile time.
pub const fn address(s: &str) -> Address {
    let bytes = s.as_bytes();
    assert!(bytes.len() == 42, "address literal must be 0x + 40 hex digits");
    let mut out = [0u8; 20];
    let mut i = 0;
    while i < 20 {
        out[i] = hex_nibble(bytes[2 + 2 * i]) << 4 | hex_nibble(bytes[3 + 2 * i]);
        i += 1;
    }
    H160(out)
}

/// Right-pads an ASCII identifier into a `bytes32`, the way Maker encodes ilks.
pub const fn bytes32_from_str(s: &str) -> H256 {
    let bytes = s.as_bytes();
    assert!(bytes.len() <= 32, "identifier longer than 32 bytes");
    let mut out = [0u8; 32];
    let mut i = 0;
    while i < bytes.len() {
        out[i] = bytes[i];
        i += 1;
    }
    H256(out)
}

pub mod mainnet {
    use super::address;
    use ethers::types::Address;

    pub const WETH: Address = address("0xc02aaa39b223fe8d0a0e5c4f27ead9083c756cc2");
    pub const DAI: Address = address("0x6b175474e89094c44da98b954eedeac495271d0f");
    pub const USDC: Address = address("0xa0b86991c6218b36c1d19d4a2e9eb0ce3606eb48");
    pub const USDT: Address = address("0xdac17f958d2ee523a2206206994597c13d831ec7");
    pub const WBTC: Address = address("0x2260fac5e5542a773aa44fbcfedf7c193bc2c599");
    pub const SUSD: Address = address("0x57ab1ec28d129707052df4df418d58a2d46d5f51");
    pub const TUSD: Address = address("0x0000000000085d4780b73119b644ae5ecd22b376");

    pub const AMPL: Address = address("0xd46ba6d942050d489dbd938a2c909a5d5039a161");
    pub const STETH: Address = address("0xae7ab96520de3a18e5e111b5eaab095312d7fe84");
    pub const SOHM: Address = address("0x04f2694c8fcee23e8fd0dfea1d4f5bb8c352111f");
}

pub mod bsc {
    use super::address;
    use ethers::types::Address;

    pub const WBNB: Address = address("0xbb4cdb9cbd36b01bd1cbaebf2de08d9173bc095c");
    pub const BUSD: Address = address("0xe9e7cea3dedca5984780bafc599bd69add087d56");
    pub const USDC: Address = address("0x8ac76a51cc950d9822d68b83fe1ad97b32cd580d");
    pub const USDT: Address = address("0x55d398326f99059ff775485246999027b3197955");
    pub const DAI: Address = address("0x1af3f329e8be154074d8769d1ffa4ee058b1dbc3");
}

pub mod polygon {
    use super::address;
    use ethers::types::Address;

    pub const WMATIC: Address = address("0x0d500b1d8e8ef31e21c99d1db9a6444d3adf1270");
    pub const WETH: Address = address("0x7ceb23fd6bc0add59e62ac25578270cff1b9f619");
    pub const USDC: Address = address("0x2791bca1f2de4661ed88a30c99a7a9449aa84174");
    pub const DAI: Address = address("0x8f3cf7ad23cd3cadbd9735aff958023239c6a063");
    pub const USDT: Address = address("0xc2132d05d31c914a87c6611c10748aeb04b58e8f");
}

/// Tokens whose balances change without transfers. Pools holding them revert
/// too often to be worth sampling.
pub const REBASING_TOKENS: [Address; 3] = [mainnet::AMPL, mainnet::STETH, mainnet::SOHM];

pub fn is_rebasing_token(token: &Address) -> bool {
    REBASING_TOKENS.contains(token)
}

pub fn wrapped_native_token(chain: ChainId) -> Address {
    match chain {
        ChainId::Mainnet => mainnet::WETH,
        ChainId::Bsc => bsc::WBNB,
        ChainId::Polygon => polygon::WMATIC,
    }
}

pub fn default_intermediate_tokens(chain: ChainId) -> Vec<Address> {
    match chain {
        ChainId::Mainnet => vec![
            mainnet::WETH,
            mainnet::USDT,
            mainnet::DAI,
            mainnet::USDC,
            mainnet::WBTC,
        ],
        ChainId::Bsc => vec![bsc::WBNB, bsc::BUSD, bsc::DAI, bsc::USDC, bsc::USDT],
        ChainId::Polygon => vec![
            polygon::WMATIC,
            polygon::WETH,
            polygon::USDC,
            polygon::DAI,
            polygon::USDT,
        ],
    }
}

/// Default graph for a chain: the default intermediates plus stablecoin
/// cliques that are always worth routing through each other.
pub fn default_token_adjacency_graph(chain: ChainId) -> TokenAdjacencyGraph {
    let builder = TokenAdjacencyGraph::builder(default_intermediate_tokens(chain));
    let result = match chain {
        ChainId::Mainnet => builder
            .add_complete_subgraph(&[mainnet::DAI, mainnet::USDC, mainnet::USDT])
            .and_then(|b| b.add_bidirectional(mainnet::SUSD, mainnet::DAI))
            .and_then(|b| b.add_bidirectional(mainnet::TUSD, mainnet::USDC)),
        ChainId::Bsc => builder.add_complete_subgraph(&[bsc::BUSD, bsc::USDC, bsc::USDT]),
        ChainId::Polygon => {
            builder.add_complete_subgraph(&[polygon::DAI, polygon::USDC, polygon::USDT])
        }
    };
    match result {
        Ok(builder) => builder.build(),
        // Edges above are distinct token pairs; a self-loop here is a typo.
        Err(e) => {
            log::error!("Default adjacency graph for chain {} is invalid: {}", chain, e);
            TokenAdjacencyGraph::from_defaults(default_intermediate_tokens(chain))
        }
    }
}

pub fn uniswap_v1_router(chain: ChainId) -> Option<Address> {
    match chain {
        ChainId::Mainnet => Some(address("0xc0a47dfe034b400b47bdad5fecda2621de6c4d95")),
        _ => None,
    }
}

/// Router for a Uniswap-V2 fork on a chain.
pub fn uniswap_v2_like_router(source: Source, chain: ChainId) -> Option<Address> {
    match (source, chain) {
        (Source::UniswapV2, ChainId::Mainnet) => {
            Some(address("0x7a250d5630b4cf539739df2c5dacb4c659f2488d"))
        }
        (Source::SushiSwap, ChainId::Mainnet) => {
            Some(address("0xd9e1ce17f2641f24ae83637ab66a2cca9c378b9f"))
        }
        (Source::SushiSwap, ChainId::Bsc) | (Source::SushiSwap, ChainId::Polygon) => {
            Some(address("0x1b02da8cb0d097eb8d57a175b88c7d8b47997506"))
        }
        (Source::PancakeSwap, ChainId::Bsc) => {
            Some(address("0x10ed43c718714eb63d5aa57b78b54704e256024e"))
        }
        (Source::QuickSwap, ChainId::Polygon) => {
            Some(address("0xa5e0829caced8ffdd4de3c43696c57f7d7a678ff"))
        }
        _ => None,
    }
}

/// DVM, DSP and DPP factories.
pub fn dodo_v2_factories(chain: ChainId) -> &'static [Address] {
    const MAINNET: [Address; 3] = [
        address("0x72d220ce168c4f361dd4dee5d826a01ad8598f6c"),
        address("0x6fddb76c93299d985f4d3fc7ac468f9a168577a4"),
        address("0x5336ede8f971339f6c0e304c66ba16f1296a2fbe"),
    ];
    match chain {
        ChainId::Mainnet => &MAINNET,
        _ => &[],
    }
}

pub fn balancer_v2_vault(chain: ChainId) -> Option<Address> {
    match chain {
        ChainId::Mainnet | ChainId::Polygon => {
            Some(address("0xba12222222228d8ba445958a75a0704d566bf2c8"))
        }
        ChainId::Bsc => None,
    }
}

/// Peg stability module configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MakerPsmInfo {
    pub psm_address: Address,
    pub ilk_identifier: H256,
    pub gem_token_address: Address,
}

pub fn maker_psm_info(chain: ChainId) -> Option<MakerPsmInfo> {
    match chain {
        ChainId::Mainnet => Some(MakerPsmInfo {
            psm_address: address("0x89b78cfa322f6c5de0abceecab66aee45393cc5a"),
            ilk_identifier: bytes32_from_str("PSM-USDC-A"),
            gem_token_address: mainnet::USDC,
        }),
        _ => None,
    }
}

pub fn aave_v2_subgraph_url(chain: ChainId) -> Option<&'static str> {
    match chain {
        ChainId::Mainnet => Some("https://api.thegraph.com/subgraphs/name/aave/protocol-v2"),
        ChainId::Polygon => Some("https://api.thegraph.com/subgraphs/name/aave/aave-v2-matic"),
        ChainId::Bsc => None,
    }
}

pub fn compound_api_url(chain: ChainId) -> Option<&'static str> {
    match chain {
        ChainId::Mainnet => Some("https://api.compound.finance/api/v2/ctoken"),
        _ => None,
    }
}

pub fn balancer_subgraph_url(chain: ChainId) -> Option<&'static str> {
    match chain {
        ChainId::Mainnet => Some("https://api.thegraph.com/subgraphs/name/balancer-labs/balancer"),
        _ => None,
    }
}

pub fn balancer_v2_subgraph_url(chain: ChainId) -> Option<&'static str> {
    match chain {
        ChainId::Mainnet => {
            Some("https://api.thegraph.com/subgraphs/name/balancer-labs/balancer-v2")
        }
        ChainId::Polygon => {
            Some("https://api.thegraph.com/subgraphs/name/balancer-labs/balancer-polygon-v2")
        }
        ChainId::Bsc => None,
    }
}

fn curve_pool(
    pool_address: Address,
    tokens: Vec<Address>,
    exchange: &str,
    sell_quote: &str,
    buy_quote: Option<&str>,
) -> CurveInfo {
    CurveInfo {
        pool_address,
        tokens,
        exchange_function_selector: id(exchange),
        sell_quote_function_selector: id(sell_quote),
        buy_quote_function_selector: buy_quote.map(id).unwrap_or(NO_SELECTOR),
    }
}

const EXCHANGE: &str = "exchange(int128,int128,uint256,uint256)";
const EXCHANGE_UNDERLYING: &str = "exchange_underlying(int128,int128,uint256,uint256)";
const GET_DY: &str = "get_dy(int128,int128,uint256)";
const GET_DY_UNDERLYING: &str = "get_dy_underlying(int128,int128,uint256)";
const GET_DX_UNDERLYING: &str = "get_dx_underlying(int128,int128,uint256)";
const EXCHANGE_V2: &str = "exchange(uint256,uint256,uint256,uint256)";
const GET_DY_V2: &str = "get_dy(uint256,uint256,uint256)";
const SADDLE_SWAP: &str = "swap(uint8,uint8,uint256,uint256,uint256)";
const SADDLE_CALCULATE_SWAP: &str = "calculateSwap(uint8,uint8,uint256)";

/// Static stableswap registry for one Curve-like source on one chain.
pub fn curve_like_pools(source: Source, chain: ChainId) -> Vec<CurveInfo> {
    match (source, chain) {
        (Source::Curve, ChainId::Mainnet) => vec![
            curve_pool(
                address("0xbebc44782c7db0a1a60cb6fe97d0b483032ff1c7"),
                vec![mainnet::DAI, mainnet::USDC, mainnet::USDT],
                EXCHANGE,
                GET_DY,
                None,
            ),
            curve_pool(
                address("0xa2b47e3d5c44877cca798226b7b8118f9bfb7a56"),
                vec![mainnet::DAI, mainnet::USDC],
                EXCHANGE_UNDERLYING,
                GET_DY_UNDERLYING,
                Some(GET_DX_UNDERLYING),
            ),
            curve_pool(
                address("0xa5407eae9ba41422680e2e00537571bcc53efbfd"),
                vec![mainnet::DAI, mainnet::USDC, mainnet::USDT, mainnet::SUSD],
                EXCHANGE_UNDERLYING,
                GET_DY_UNDERLYING,
                None,
            ),
        ],
        (Source::Curve, ChainId::Polygon) => vec![curve_pool(
            address("0x445fe580ef8d70ff569ab36e80c647af338db351"),
            vec![polygon::DAI, polygon::USDC, polygon::USDT],
            EXCHANGE_UNDERLYING,
            GET_DY_UNDERLYING,
            None,
        )],
        (Source::CurveV2, ChainId::Mainnet) => vec![curve_pool(
            address("0xd51a44d3fae010294c616388b506acda1bfaae46"),
            vec![mainnet::USDT, mainnet::WBTC, mainnet::WETH],
            EXCHANGE_V2,
            GET_DY_V2,
            None,
        )],
        (Source::Swerve, ChainId::Mainnet) => vec![curve_pool(
            address("0x329239599afb305da0a2ec69c58f8a6697f9f88d"),
            vec![mainnet::DAI, mainnet::USDC, mainnet::USDT, mainnet::TUSD],
            EXCHANGE_UNDERLYING,
            GET_DY_UNDERLYING,
            None,
        )],
        (Source::Nerve, ChainId::Bsc) => vec![curve_pool(
            address("0x1b3771a66ee31180906972580ade9b81afc5fcdc"),
            vec![bsc::BUSD, bsc::USDT, bsc::USDC],
            SADDLE_SWAP,
            SADDLE_CALCULATE_SWAP,
            None,
        )],
        (Source::Ellipsis, ChainId::Bsc) => vec![curve_pool(
            address("0x160caed03795365f3a589f10c379ffa7d75d4e76"),
            vec![bsc::BUSD, bsc::USDC, bsc::USDT],
            EXCHANGE,
            GET_DY,
            None,
        )],
        _ => Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn address_literals_match_runtime_parsing() {
        let parsed = Address::from_str("0x6B175474E89094C44Da98b954EedeAC495271d0F").unwrap();
        assert_eq!(mainnet::DAI, parsed);
    }

    #[test]
    fn ilk_identifier_is_right_padded() {
        let ilk = bytes32_from_str("PSM-USDC-A");
        assert_eq!(&ilk.as_bytes()[..10], b"PSM-USDC-A");
        assert!(ilk.as_bytes()[10..].iter().all(|b| *b == 0));
    }

    #[test]
    fn curve_selectors_match_known_values() {
        let pools = curve_like_pools(Source::Curve, ChainId::Mainnet);
        let three_pool = &pools[0];
        assert_eq!(three_pool.sell_quote_function_selector, [0x5e, 0x0d, 0x44, 0x3f]);
        assert_eq!(three_pool.exchange_function_selector, [0x3d, 0xf0, 0x21, 0x24]);
        assert_eq!(three_pool.buy_quote_function_selector, NO_SELECTOR);
    }

    #[test]
    fn unconfigured_venues_are_empty() {
        assert!(uniswap_v2_like_router(Source::PancakeSwap, ChainId::Mainnet).is_none());
        assert!(dodo_v2_factories(ChainId::Polygon).is_empty());
        assert!(curve_like_pools(Source::Nerve, ChainId::Mainnet).is_empty());
    }

    #[test]
    fn rebasing_tokens_are_flagged() {
        assert!(is_rebasing_token(&mainnet::AMPL));
        assert!(!is_rebasing_token(&mainnet::DAI));
    }
}
