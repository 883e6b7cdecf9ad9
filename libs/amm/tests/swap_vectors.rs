//! Swap quotes checked against amounts returned by the deployed router

use nabla_amm::{
    NablaCurve, SubPool, SubPoolMeta, SubPoolState, SwapError, SwapMath, I256, PRICE_PRECISION,
};

fn int(s: &str) -> I256 {
    I256::from_dec_str(s).unwrap()
}

fn meta() -> SubPoolMeta {
    SubPoolMeta {
        curve: NablaCurve::deployed(),
        lp_fee: I256::from(200),
        backstop_fee: I256::from(300),
        protocol_fee: I256::from(100),
    }
}

fn sub_pool(reserve: &str, reserve_with_slippage: &str, liabilities: &str, price: i64) -> SubPool {
    SubPool::new(
        meta(),
        SubPoolState {
            reserve: int(reserve),
            reserve_with_slippage: int(reserve_with_slippage),
            total_liabilities: int(liabilities),
            price: Some(I256::from(price)),
        },
    )
}

fn balanced(amount: &str) -> SubPool {
    sub_pool(amount, amount, amount, PRICE_PRECISION)
}

/// Sub-pools after a 100-unit swap out of a balanced 1000/1000 pair
fn imbalanced_pair() -> (SubPool, SubPool) {
    let source = sub_pool(
        "1099997249253573525485",
        "1100000000000000000000",
        "1000000000000000000000",
        PRICE_PRECISION,
    );
    let destination = sub_pool(
        "900052749371053261277",
        "900055528992381704580",
        "1000019999449850714705",
        PRICE_PRECISION,
    );
    (source, destination)
}

const THOUSAND: &str = "1000000000000000000000";
const ONE_TOKEN: &str = "1000000000000000000";

#[test]
fn balanced_pool_one_token() {
    let pool = balanced(THOUSAND);
    let result = SwapMath::quote(&pool, &pool, int(ONE_TOKEN), 18, 18).unwrap();
    assert_eq!(result.amount_out, int("999399447164390453"));
}

#[test]
fn imbalanced_pool_into_scarce_side() {
    let (source, destination) = imbalanced_pair();
    let result = SwapMath::quote(&source, &destination, int(ONE_TOKEN), 18, 18).unwrap();
    assert_eq!(result.amount_out, int("999288878655122808"));
}

#[test]
fn imbalanced_pool_into_abundant_side() {
    let (source, destination) = imbalanced_pair();
    let result = SwapMath::quote(
        &destination,
        &source,
        int("100000000000000000000"),
        18,
        18,
    )
    .unwrap();
    assert_eq!(result.amount_out, int("99945528699304486120"));
}

#[test]
fn price_ratio_scales_output() {
    let (mut source, destination) = imbalanced_pair();
    source.state.price = Some(I256::from(2 * PRICE_PRECISION));
    let result = SwapMath::quote(&source, &destination, int(ONE_TOKEN), 18, 18).unwrap();
    assert_eq!(result.amount_out, int("1998577195258299942"));
}

#[test]
fn six_decimal_source() {
    let source = balanced("1000000000");
    let destination = balanced(THOUSAND);
    let result = SwapMath::quote(&source, &destination, I256::from(1_000_000), 6, 18).unwrap();
    assert_eq!(result.amount_out, int("999398724194972786"));
}

#[test]
fn six_decimal_destination() {
    let source = balanced(THOUSAND);
    let destination = balanced("1000000000");
    let result = SwapMath::quote(&source, &destination, int(ONE_TOKEN), 18, 6).unwrap();
    assert_eq!(result.amount_out, I256::from(999_402));
}

#[test]
fn source_coverage_cap() {
    let source = balanced(THOUSAND);
    let destination = balanced("10000000000000000000000");

    let at_cap = int("990257029737968856409");
    let result = SwapMath::quote(&source, &destination, at_cap, 18, 18).unwrap();
    assert_eq!(result.source.reserve, int("1990000000000000000000"));

    let over_cap = at_cap + I256::one();
    assert_eq!(
        SwapMath::quote(&source, &destination, over_cap, 18, 18),
        Err(SwapError::ZeroSwap)
    );
}

#[test]
fn destination_coverage_floor() {
    let source = balanced("100000000000000000000000");
    let destination = balanced(THOUSAND);

    let result =
        SwapMath::quote(&source, &destination, int("990000000000000000000"), 18, 18).unwrap();
    assert_eq!(result.amount_out, int("989116774074673494112"));

    assert_eq!(
        SwapMath::quote(&source, &destination, int("995000000000000000000"), 18, 18),
        Err(SwapError::ZeroSwap)
    );
}

#[test]
fn fees_follow_configured_rates() {
    let pool = balanced(THOUSAND);
    let mut destination = pool;
    destination.meta.protocol_fee = I256::zero();
    destination.meta.backstop_fee = I256::zero();

    let charged = SwapMath::quote(&pool, &pool, int(ONE_TOKEN), 18, 18).unwrap();
    let fee_free = SwapMath::quote(&pool, &destination, int(ONE_TOKEN), 18, 18).unwrap();

    assert_eq!(fee_free.fees.backstop, I256::zero());
    assert_eq!(fee_free.fees.protocol, I256::zero());
    assert!(fee_free.amount_out > charged.amount_out);
}
