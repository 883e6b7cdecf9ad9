//! Nabla contract ABIs
//!
//! Only the functions and events the tracker touches are defined here: the
//! portal's asset list, the router's sub-pool lookup, the swap pool's
//! figures, the curve parameters, the oracle price and the Pyth adapter's
//! feed ids.

use ethabi::{Event, EventParam, Function, Param, ParamType, StateMutability};

fn param(name: &str, kind: ParamType) -> Param {
    Param {
        name: name.to_string(),
        kind,
        internal_type: None,
    }
}

#[allow(deprecated)]
fn view_function(name: &str, inputs: Vec<Param>, outputs: Vec<Param>) -> Function {
    Function {
        name: name.to_string(),
        inputs,
        outputs,
        constant: None,
        state_mutability: StateMutability::View,
    }
}

fn uint_getter(name: &str) -> Function {
    view_function(name, vec![], vec![param("", ParamType::Uint(256))])
}

/// Portal: `getRouterAssets(address router) returns (address[])`
pub fn get_router_assets() -> Function {
    view_function(
        "getRouterAssets",
        vec![param("router", ParamType::Address)],
        vec![param("", ParamType::Array(Box::new(ParamType::Address)))],
    )
}

/// Router: `poolByAsset(address asset) returns (address)`
pub fn pool_by_asset() -> Function {
    view_function(
        "poolByAsset",
        vec![param("asset", ParamType::Address)],
        vec![param("", ParamType::Address)],
    )
}

/// Swap pool: `reserve() returns (uint256)`
pub fn reserve() -> Function {
    uint_getter("reserve")
}

/// Swap pool: `reserveWithSlippage() returns (uint256)`
pub fn reserve_with_slippage() -> Function {
    uint_getter("reserveWithSlippage")
}

/// Swap pool: `totalLiabilities() returns (uint256)`
pub fn total_liabilities() -> Function {
    uint_getter("totalLiabilities")
}

/// Swap pool: `swapFees() returns (uint256 lpFee, uint256 backstopFee, uint256 protocolFee)`
pub fn swap_fees() -> Function {
    view_function(
        "swapFees",
        vec![],
        vec![
            param("lpFee", ParamType::Uint(256)),
            param("backstopFee", ParamType::Uint(256)),
            param("protocolFee", ParamType::Uint(256)),
        ],
    )
}

/// Swap pool: `slippageCurve() returns (address)`
pub fn slippage_curve() -> Function {
    view_function("slippageCurve", vec![], vec![param("", ParamType::Address)])
}

/// Swap pool: `asset() returns (address)`
pub fn asset() -> Function {
    view_function("asset", vec![], vec![param("", ParamType::Address)])
}

/// Curve: `params() returns (int256 beta, int256 c)`
pub fn curve_params() -> Function {
    view_function(
        "params",
        vec![],
        vec![
            param("beta", ParamType::Int(256)),
            param("c", ParamType::Int(256)),
        ],
    )
}

/// Oracle: `getAssetPrice(address asset) returns (uint256)`
pub fn get_asset_price() -> Function {
    view_function(
        "getAssetPrice",
        vec![param("asset", ParamType::Address)],
        vec![param("", ParamType::Uint(256))],
    )
}

/// Pyth adapter: `getPriceFeedIdByAsset(address asset) returns (bytes32)`
pub fn get_price_feed_id_by_asset() -> Function {
    view_function(
        "getPriceFeedIdByAsset",
        vec![param("asset", ParamType::Address)],
        vec![param("", ParamType::FixedBytes(32))],
    )
}

/// ERC-20: `decimals() returns (uint8)`
pub fn decimals() -> Function {
    view_function("decimals", vec![], vec![param("", ParamType::Uint(8))])
}

/// Swap pool ReserveUpdated event ABI definition
/// event ReserveUpdated(uint256 newReserve, uint256 newReserveWithSlippage, uint256 newTotalLiabilities)
pub fn reserve_updated_event() -> Event {
    Event {
        name: "ReserveUpdated".to_string(),
        inputs: vec![
            EventParam {
                name: "newReserve".to_string(),
                kind: ParamType::Uint(256),
                indexed: false,
            },
            EventParam {
                name: "newReserveWithSlippage".to_string(),
                kind: ParamType::Uint(256),
                indexed: false,
            },
            EventParam {
                name: "newTotalLiabilities".to_string(),
                kind: ParamType::Uint(256),
                indexed: false,
            },
        ],
        anonymous: false,
    }
}

/// Swap pool SwapFeesSet event ABI definition
/// event SwapFeesSet(address indexed sender, uint256 lpFee, uint256 backstopFee, uint256 protocolFee)
pub fn swap_fees_set_event() -> Event {
    Event {
        name: "SwapFeesSet".to_string(),
        inputs: vec![
            EventParam {
                name: "sender".to_string(),
                kind: ParamType::Address,
                indexed: true,
            },
            EventParam {
                name: "lpFee".to_string(),
                kind: ParamType::Uint(256),
                indexed: false,
            },
            EventParam {
                name: "backstopFee".to_string(),
                kind: ParamType::Uint(256),
                indexed: false,
            },
            EventParam {
                name: "protocolFee".to_string(),
                kind: ParamType::Uint(256),
                indexed: false,
            },
        ],
        anonymous: false,
    }
}

/// Oracle PriceFeedUpdate event ABI definition
/// event PriceFeedUpdate(bytes32 indexed id, uint64 publishTime, int64 price, uint64 conf)
pub fn price_feed_update_event() -> Event {
    Event {
        name: "PriceFeedUpdate".to_string(),
        inputs: vec![
            EventParam {
                name: "id".to_string(),
                kind: ParamType::FixedBytes(32),
                indexed: true,
            },
            EventParam {
                name: "publishTime".to_string(),
                kind: ParamType::Uint(64),
                indexed: false,
            },
            EventParam {
                name: "price".to_string(),
                kind: ParamType::Int(64),
                indexed: false,
            },
            EventParam {
                name: "conf".to_string(),
                kind: ParamType::Uint(64),
                indexed: false,
            },
        ],
        anonymous: false,
    }
}
