//! Event decoding throughput for replay batches

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use ethabi::Token;
use nabla_dex::{NablaEventDecoder, RESERVE_UPDATED, SWAP_FEES_SET};
use web3::types::{Bytes, Log, H160, H256, U256};

fn create_log(topics: Vec<H256>, data: Vec<u8>, index: u64) -> Log {
    Log {
        address: H160::from_low_u64_be(0x5c69bee701ef814a),
        topics,
        data: Bytes(data),
        block_hash: Some(H256::repeat_byte(0x5a)),
        block_number: Some(250_000_000u64.into()),
        transaction_hash: Some(H256::repeat_byte(0x5a)),
        transaction_index: Some(0u64.into()),
        log_index: Some(index.into()),
        transaction_log_index: Some(0u64.into()),
        log_type: None,
        removed: Some(false),
    }
}

fn create_reserve_updated_log(index: u64) -> Log {
    let data = ethabi::encode(&[
        Token::Uint(U256::exp10(21)),
        Token::Uint(U256::exp10(21) + U256::from(index)),
        Token::Uint(U256::exp10(21)),
    ]);
    create_log(vec![RESERVE_UPDATED], data, index)
}

fn create_swap_fees_set_log(index: u64) -> Log {
    let data = ethabi::encode(&[
        Token::Uint(U256::from(200)),
        Token::Uint(U256::from(300)),
        Token::Uint(U256::from(100)),
    ]);
    create_log(
        vec![SWAP_FEES_SET, H256::from(H160::repeat_byte(0x42))],
        data,
        index,
    )
}

fn bench_decoding(c: &mut Criterion) {
    let mut group = c.benchmark_group("event_decoding");

    let reserve_log = create_reserve_updated_log(0);
    group.bench_function("reserve_updated", |b| {
        b.iter(|| NablaEventDecoder::decode(black_box(&reserve_log)));
    });

    let fees_log = create_swap_fees_set_log(1);
    group.bench_function("swap_fees_set", |b| {
        b.iter(|| NablaEventDecoder::decode(black_box(&fees_log)));
    });

    let batch: Vec<Log> = (0..256)
        .map(|i| {
            if i % 8 == 0 {
                create_swap_fees_set_log(i)
            } else {
                create_reserve_updated_log(i)
            }
        })
        .collect();
    group.bench_function("replay_batch_256", |b| {
        b.iter(|| {
            for log in black_box(&batch) {
                let _ = black_box(NablaEventDecoder::decode(log));
            }
        });
    });

    group.finish();
}

criterion_group!(benches, bench_decoding);
criterion_main!(benches);
