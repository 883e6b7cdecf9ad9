//! In-memory chain used by the synchronizer tests

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use ethabi::{Function, Token};
use ethers_core::types::{Address, I256, U256};
use nabla_dex::{nabla, PRICE_FEED_UPDATE, RESERVE_UPDATED, SWAP_FEES_SET};
use nabla_tracker::{
    BatchResponse, ContractCall, ContractReader, OraclePriceSource, PoolTracker, PriceBatch,
    PriceRequest, PriceSource, ReadError,
};
use parking_lot::Mutex;
use web3::types::{Bytes, Log, H256, U64};

pub const ROUTER: u8 = 0x01;
pub const PORTAL: u8 = 0x02;
pub const ORACLE: u8 = 0x03;
pub const PYTH_ADAPTER: u8 = 0x04;

/// Balanced starting figures: 1000 tokens per sub-pool
pub const THOUSAND: &str = "1000000000000000000000";
pub const BETA: &str = "5000000000000000";
pub const C: &str = "17075887234393789126";

pub fn addr(byte: u8) -> Address {
    Address::repeat_byte(byte)
}

pub fn uint(s: &str) -> U256 {
    U256::from_dec_str(s).unwrap()
}

pub fn int(s: &str) -> I256 {
    I256::from_dec_str(s).unwrap()
}

/// Asset `i` lives at 0xa0+i, its sub-pool at 0xb0+i and its curve at 0xc0+i
pub fn asset(i: u8) -> Address {
    addr(0xa0 + i)
}

pub fn sub_pool(i: u8) -> Address {
    addr(0xb0 + i)
}

pub fn curve(i: u8) -> Address {
    addr(0xc0 + i)
}

/// Contract reads answered from a key/value table, all at one block height
#[derive(Default)]
pub struct FakeChain {
    responses: Mutex<HashMap<(Address, Vec<u8>), Vec<Token>>>,
    block: AtomicU64,
    fail: AtomicBool,
    batches: AtomicUsize,
    pinned: Mutex<Vec<Option<u64>>>,
}

impl FakeChain {
    pub fn new(block: u64) -> Arc<Self> {
        let chain = Self::default();
        chain.block.store(block, Ordering::SeqCst);
        Arc::new(chain)
    }

    pub fn set(&self, target: Address, function: Function, params: Vec<Token>, output: Vec<Token>) {
        let input = function.encode_input(&params).unwrap();
        self.responses.lock().insert((target, input), output);
    }

    pub fn unset(&self, target: Address, function: Function, params: Vec<Token>) {
        let input = function.encode_input(&params).unwrap();
        self.responses.lock().remove(&(target, input));
    }

    pub fn set_block(&self, block: u64) {
        self.block.store(block, Ordering::SeqCst);
    }

    pub fn set_failing(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }

    pub fn batches(&self) -> usize {
        self.batches.load(Ordering::SeqCst)
    }

    pub fn pinned_blocks(&self) -> Vec<Option<u64>> {
        self.pinned.lock().clone()
    }

    pub fn set_assets(&self, count: u8) {
        let assets = (0..count).map(|i| Token::Address(asset(i))).collect();
        self.set(
            addr(PORTAL),
            nabla::get_router_assets(),
            vec![Token::Address(addr(ROUTER))],
            vec![Token::Array(assets)],
        );
        for i in 0..count {
            self.set(
                addr(ROUTER),
                nabla::pool_by_asset(),
                vec![Token::Address(asset(i))],
                vec![Token::Address(sub_pool(i))],
            );
            self.set(asset(i), nabla::decimals(), vec![], vec![Token::Uint(18u64.into())]);
            self.set(
                sub_pool(i),
                nabla::slippage_curve(),
                vec![],
                vec![Token::Address(curve(i))],
            );
            self.set(
                curve(i),
                nabla::curve_params(),
                vec![],
                vec![Token::Int(uint(BETA)), Token::Int(uint(C))],
            );
            self.set_figures(i, THOUSAND, THOUSAND, THOUSAND);
            self.set_fees(i, 200, 300, 100);
            self.set_price(i, 100_000_000);
        }
    }

    pub fn set_figures(&self, i: u8, reserve: &str, reserve_with_slippage: &str, liabilities: &str) {
        self.set(sub_pool(i), nabla::reserve(), vec![], vec![Token::Uint(uint(reserve))]);
        self.set(
            sub_pool(i),
            nabla::reserve_with_slippage(),
            vec![],
            vec![Token::Uint(uint(reserve_with_slippage))],
        );
        self.set(
            sub_pool(i),
            nabla::total_liabilities(),
            vec![],
            vec![Token::Uint(uint(liabilities))],
        );
    }

    pub fn set_fees(&self, i: u8, lp: u64, backstop: u64, protocol: u64) {
        self.set(
            sub_pool(i),
            nabla::swap_fees(),
            vec![],
            vec![
                Token::Uint(lp.into()),
                Token::Uint(backstop.into()),
                Token::Uint(protocol.into()),
            ],
        );
    }

    pub fn set_price(&self, i: u8, price: u64) {
        self.set(
            addr(ORACLE),
            nabla::get_asset_price(),
            vec![Token::Address(asset(i))],
            vec![Token::Uint(price.into())],
        );
    }

    /// Feed id the Pyth adapter reports for asset `i`; zero means none
    pub fn set_feed_id(&self, i: u8, id: H256) {
        self.set(
            addr(PYTH_ADAPTER),
            nabla::get_price_feed_id_by_asset(),
            vec![Token::Address(asset(i))],
            vec![Token::FixedBytes(id.as_bytes().to_vec())],
        );
    }

    pub fn clear_price(&self, i: u8) {
        self.unset(
            addr(ORACLE),
            nabla::get_asset_price(),
            vec![Token::Address(asset(i))],
        );
    }
}

#[async_trait]
impl ContractReader for FakeChain {
    async fn aggregate(
        &self,
        calls: Vec<ContractCall>,
        block: Option<u64>,
    ) -> Result<BatchResponse, ReadError> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(ReadError::Transport("connection refused".to_string()));
        }
        self.batches.fetch_add(1, Ordering::SeqCst);
        self.pinned.lock().push(block);

        let responses = self.responses.lock();
        let results = calls
            .iter()
            .map(|call| {
                let input = call.encode()?;
                responses
                    .get(&(call.target, input))
                    .cloned()
                    .ok_or_else(|| {
                        ReadError::Malformed(format!("execution reverted: {}", call.function.name))
                    })
            })
            .collect();

        Ok(BatchResponse {
            block_number: block.unwrap_or_else(|| self.block.load(Ordering::SeqCst)),
            results,
        })
    }
}

pub fn tracker(chain: &Arc<FakeChain>) -> PoolTracker {
    let prices = Arc::new(OraclePriceSource::new(chain.clone(), addr(ORACLE)));
    PoolTracker::new(chain.clone(), prices, addr(PORTAL), addr(ORACLE))
}

/// Oracle prices, remembering every request it was handed
pub struct RecordingPrices {
    inner: OraclePriceSource,
    requests: Mutex<Vec<Vec<PriceRequest>>>,
}

impl RecordingPrices {
    pub fn new(chain: &Arc<FakeChain>) -> Arc<Self> {
        Arc::new(Self {
            inner: OraclePriceSource::new(chain.clone(), addr(ORACLE)),
            requests: Mutex::new(Vec::new()),
        })
    }

    pub fn requests(&self) -> Vec<Vec<PriceRequest>> {
        self.requests.lock().clone()
    }
}

#[async_trait]
impl PriceSource for RecordingPrices {
    async fn fetch(
        &self,
        requests: &[PriceRequest],
        block: Option<u64>,
    ) -> Result<PriceBatch, ReadError> {
        self.requests.lock().push(requests.to_vec());
        self.inner.fetch(requests, block).await
    }
}

fn log(address: Address, topics: Vec<H256>, data: Vec<u8>, block: u64, index: u64) -> Log {
    Log {
        address,
        topics,
        data: Bytes(data),
        block_hash: None,
        block_number: Some(U64::from(block)),
        transaction_hash: None,
        transaction_index: None,
        log_index: Some(U256::from(index)),
        transaction_log_index: None,
        log_type: None,
        removed: Some(false),
    }
}

pub fn reserve_updated_log(
    pool: Address,
    reserve: &str,
    reserve_with_slippage: &str,
    liabilities: &str,
    block: u64,
    index: u64,
) -> Log {
    let data = ethabi::encode(&[
        Token::Uint(uint(reserve)),
        Token::Uint(uint(reserve_with_slippage)),
        Token::Uint(uint(liabilities)),
    ]);
    log(pool, vec![RESERVE_UPDATED], data, block, index)
}

pub fn swap_fees_set_log(pool: Address, lp: u64, backstop: u64, protocol: u64, block: u64, index: u64) -> Log {
    let data = ethabi::encode(&[
        Token::Uint(lp.into()),
        Token::Uint(backstop.into()),
        Token::Uint(protocol.into()),
    ]);
    log(
        pool,
        vec![SWAP_FEES_SET, H256::from(addr(0x99))],
        data,
        block,
        index,
    )
}

pub fn price_feed_update_log(emitter: Address, block: u64, index: u64) -> Log {
    let data = ethabi::encode(&[
        Token::Uint(1_700_000_000u64.into()),
        Token::Int(U256::from(300_000_000_000u64)),
        Token::Uint(U256::from(1_000)),
    ]);
    log(
        emitter,
        vec![PRICE_FEED_UPDATE, H256::repeat_byte(0xfe)],
        data,
        block,
        index,
    )
}
