//! Nabla pool synchronizer
//!
//! One refresh cycle per call. The cycle reads the router's asset list, then
//! picks one of three modes:
//!
//! - **Full**: the asset set changed or a log was reverted. Sub-pools, curves,
//!   decimals, Pyth feed ids, figures and prices are all re-read at the
//!   topology block.
//! - **Replay**: logs were supplied. Logs from contracts other than the
//!   sub-pools and the oracle are dropped unread. Reserve and fee events are
//!   applied in chain order; an oracle price push triggers one batched price
//!   re-read.
//! - **Direct**: nothing supplied. Figures and prices are re-read at the
//!   topology block, curves are kept.
//!
//! Every mode works on a copy of the caller's aggregate, so an error leaves
//! the caller's state untouched.

use std::collections::HashSet;
use std::str::FromStr;
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use ethabi::Token;
use ethers_core::types::{Address, H256, I256};
use nabla_amm::{fixed_point, NablaCurve, SubPoolMeta, SubPoolState};
use nabla_config::TrackerConfig;
use nabla_dex::{has_reverted_log, latest_block_number, nabla, NablaEventDecoder, NablaEventKind};
use nabla_state::{NablaPool, PoolAggregate, PoolToken, Stateful};
use tracing::{debug, info, warn};
use web3::types::Log;

use crate::error::SyncError;
use crate::prices::{PriceBatch, PriceRequest, PriceSource};
use crate::reader::{ContractCall, ContractReader};

/// Which path a refresh cycle took
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshMode {
    Full,
    Replay,
    Direct,
}

/// Reserve, liabilities and fees of one sub-pool as read from chain
#[derive(Debug, Clone, Copy)]
struct SubPoolFigures {
    reserve: I256,
    reserve_with_slippage: I256,
    total_liabilities: I256,
    lp_fee: I256,
    backstop_fee: I256,
    protocol_fee: I256,
}

const FIGURE_CALLS: usize = 4;

pub struct PoolTracker {
    reader: Arc<dyn ContractReader>,
    prices: Arc<dyn PriceSource>,
    portal: Address,
    oracle: Address,
    /// Resolves Pyth feed ids on a full refresh when set
    pyth_adapter: Option<Address>,
    skip_price_update: bool,
}

impl PoolTracker {
    pub fn new(
        reader: Arc<dyn ContractReader>,
        prices: Arc<dyn PriceSource>,
        portal: Address,
        oracle: Address,
    ) -> Self {
        Self {
            reader,
            prices,
            portal,
            oracle,
            pyth_adapter: None,
            skip_price_update: false,
        }
    }

    pub fn from_config(
        config: &TrackerConfig,
        reader: Arc<dyn ContractReader>,
        prices: Arc<dyn PriceSource>,
    ) -> Result<Self, SyncError> {
        let pyth_adapter = config
            .pyth
            .as_ref()
            .and_then(|pyth| pyth.adapter.as_deref())
            .map(parse_address)
            .transpose()?;

        Ok(Self::new(
            reader,
            prices,
            parse_address(&config.portal)?,
            parse_address(&config.oracle)?,
        )
        .with_pyth_adapter(pyth_adapter)
        .with_skip_price_update(config.skip_price_update))
    }

    pub fn with_pyth_adapter(mut self, adapter: Option<Address>) -> Self {
        self.pyth_adapter = adapter;
        self
    }

    pub fn with_skip_price_update(mut self, skip: bool) -> Self {
        self.skip_price_update = skip;
        self
    }

    pub fn oracle(&self) -> Address {
        self.oracle
    }

    /// Run one refresh cycle and return the refreshed copy of `current`
    pub async fn refresh(
        &self,
        current: &PoolAggregate,
        logs: &[Log],
    ) -> Result<PoolAggregate, SyncError> {
        self.refresh_with_mode(current, logs)
            .await
            .map(|(aggregate, _)| aggregate)
    }

    pub async fn refresh_with_mode(
        &self,
        current: &PoolAggregate,
        logs: &[Log],
    ) -> Result<(PoolAggregate, RefreshMode), SyncError> {
        let (block, assets) = self.read_topology(current.address).await?;
        let mut next = current.clone();

        let mode = if topology_changed(current, &assets) {
            info!(
                pool = ?current.address,
                cached = current.tokens.len(),
                current = assets.len(),
                "Router asset list changed, running full refresh"
            );
            RefreshMode::Full
        } else if has_reverted_log(logs) {
            info!(pool = ?current.address, "Reverted log observed, running full refresh");
            RefreshMode::Full
        } else if !logs.is_empty() {
            RefreshMode::Replay
        } else {
            RefreshMode::Direct
        };

        match mode {
            RefreshMode::Full => self.full_refresh(&mut next, &assets, block).await?,
            RefreshMode::Replay => self.replay(&mut next, logs).await?,
            RefreshMode::Direct => self.direct_refresh(&mut next, block).await?,
        }

        next.timestamp = unix_now();
        next.validate()?;

        debug!(
            pool = ?next.address,
            ?mode,
            block = next.block_number,
            "Refresh cycle finished"
        );
        Ok((next, mode))
    }

    /// Addresses whose state this aggregate depends on, lowercase, plus
    /// whether the curves have been read for the current topology
    pub fn dependencies(&self, aggregate: &PoolAggregate) -> (Vec<String>, bool) {
        let mut addresses: Vec<String> = aggregate
            .pools
            .iter()
            .map(|pool| format_address(&pool.address))
            .collect();
        addresses.push(format_address(&self.oracle));
        (addresses, aggregate.dependencies_complete)
    }

    async fn read_topology(&self, router: Address) -> Result<(u64, Vec<Address>), SyncError> {
        let call = ContractCall::new(
            self.portal,
            nabla::get_router_assets(),
            vec![Token::Address(router)],
        );
        let response = self.reader.aggregate(vec![call], None).await?;
        let block = response.block_number;
        let results = response.into_required()?;

        let assets = results
            .first()
            .and_then(|tokens| tokens.first())
            .cloned()
            .and_then(Token::into_array)
            .ok_or_else(|| SyncError::Malformed("getRouterAssets returned no array".into()))?
            .into_iter()
            .map(|token| {
                token
                    .into_address()
                    .ok_or_else(|| SyncError::Malformed("non-address in asset list".into()))
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok((block, assets))
    }

    async fn full_refresh(
        &self,
        aggregate: &mut PoolAggregate,
        assets: &[Address],
        block: u64,
    ) -> Result<(), SyncError> {
        let router = aggregate.address;

        // sub-pool, decimals and, with an adapter, the Pyth feed id per asset
        let mut calls = Vec::new();
        for asset in assets {
            calls.push(ContractCall::new(
                router,
                nabla::pool_by_asset(),
                vec![Token::Address(*asset)],
            ));
            calls.push(ContractCall::view(*asset, nabla::decimals()));
            if let Some(adapter) = self.pyth_adapter {
                calls.push(ContractCall::new(
                    adapter,
                    nabla::get_price_feed_id_by_asset(),
                    vec![Token::Address(*asset)],
                ));
            }
        }
        let per_asset = if self.pyth_adapter.is_some() { 3 } else { 2 };
        let response = self.reader.aggregate(calls, Some(block)).await?;
        ensure_len(&response.results, assets.len() * per_asset, "poolByAsset")?;

        let mut results = response.results.into_iter();
        let mut pool_addresses = Vec::with_capacity(assets.len());
        let mut tokens = Vec::with_capacity(assets.len());
        let mut feed_ids = Vec::new();
        for asset in assets {
            let mut required = Vec::with_capacity(2);
            for _ in 0..2 {
                let reply = results
                    .next()
                    .ok_or_else(|| SyncError::Malformed("poolByAsset batch truncated".into()))?;
                required.push(reply?);
            }
            pool_addresses.push(address_at(&required, 0, 0, "poolByAsset")?);
            let decimals = uint_at(&required, 1, 0, "decimals")?;
            tokens.push(PoolToken {
                address: *asset,
                decimals: u8::try_from(decimals)
                    .map_err(|_| SyncError::Malformed(format!("decimals {}", decimals)))?,
            });

            if self.pyth_adapter.is_some() {
                let feed_id = match results.next() {
                    Some(Ok(reply)) => feed_id_from(&reply),
                    Some(Err(e)) => {
                        warn!(asset = ?asset, error = %e, "Failed to resolve price feed id");
                        None
                    }
                    None => {
                        return Err(SyncError::Malformed("feed id batch truncated".into()));
                    }
                };
                feed_ids.push(feed_id);
            }
        }

        let calls = pool_addresses
            .iter()
            .map(|pool| ContractCall::view(*pool, nabla::slippage_curve()))
            .collect();
        let results = self.reader.aggregate(calls, Some(block)).await?.into_required()?;
        let curve_addresses = (0..results.len())
            .map(|i| address_at(&results, i, 0, "slippageCurve"))
            .collect::<Result<Vec<_>, _>>()?;
        ensure_len(&curve_addresses, pool_addresses.len(), "slippageCurve")?;

        let requests: Vec<PriceRequest> = assets
            .iter()
            .enumerate()
            .map(|(i, asset)| PriceRequest::new(*asset, feed_ids.get(i).copied().flatten()))
            .collect();
        let (curves, figures, prices) = tokio::try_join!(
            self.read_curves(&curve_addresses, block),
            self.read_figures(&pool_addresses, block),
            self.read_prices(&requests, block),
        )?;

        aggregate.tokens = tokens;
        aggregate.price_feed_ids = feed_ids;
        aggregate.pools = pool_addresses
            .iter()
            .zip(curve_addresses.iter())
            .zip(curves.iter().zip(figures.iter()))
            .map(|((pool, curve_address), (curve, figures))| NablaPool {
                address: *pool,
                curve: *curve_address,
                meta: SubPoolMeta {
                    curve: *curve,
                    lp_fee: figures.lp_fee,
                    backstop_fee: figures.backstop_fee,
                    protocol_fee: figures.protocol_fee,
                },
                state: SubPoolState {
                    reserve: figures.reserve,
                    reserve_with_slippage: figures.reserve_with_slippage,
                    total_liabilities: figures.total_liabilities,
                    price: None,
                },
            })
            .collect();
        aggregate.price_update_data = None;
        if let Some(batch) = prices {
            apply_prices(aggregate, batch);
        }
        aggregate.dependencies_complete = true;
        aggregate.block_number = block;

        info!(
            pool = ?aggregate.address,
            sub_pools = aggregate.pools.len(),
            block,
            "Finished full refresh"
        );
        Ok(())
    }

    async fn direct_refresh(
        &self,
        aggregate: &mut PoolAggregate,
        block: u64,
    ) -> Result<(), SyncError> {
        let pool_addresses = aggregate.sub_pool_addresses();
        let requests = price_requests(aggregate);

        let (figures, prices) = tokio::try_join!(
            self.read_figures(&pool_addresses, block),
            self.read_prices(&requests, block),
        )?;

        for (pool, figures) in aggregate.pools.iter_mut().zip(figures) {
            apply_figures(pool, &figures);
        }
        if let Some(batch) = prices {
            apply_prices(aggregate, batch);
        }
        aggregate.block_number = block;
        Ok(())
    }

    async fn replay(&self, aggregate: &mut PoolAggregate, logs: &[Log]) -> Result<(), SyncError> {
        let start = aggregate.block_number;

        // Only dependency logs are decoded; an undecodable one fails the cycle
        let mut events = Vec::with_capacity(logs.len());
        for log in logs {
            let dependency = log.address == self.oracle || aggregate.is_sub_pool(&log.address);
            let stale = log.block_number.map_or(false, |n| n.as_u64() < start);
            if !dependency || stale {
                continue;
            }
            if let Some(event) = NablaEventDecoder::decode(log)? {
                events.push(event);
            }
        }
        events.sort_by_key(|event| event.position());

        let mut applied = 0usize;
        let mut refetch_prices = false;
        for event in events {
            match event.kind {
                NablaEventKind::PriceFeedUpdate { .. } => {
                    if event.address == self.oracle {
                        refetch_prices = true;
                    }
                }
                _ => {
                    if aggregate.is_sub_pool(&event.address) {
                        applied += 1;
                    }
                    aggregate.apply_event(event)?;
                }
            }
        }

        if let Some(latest) = latest_block_number(logs) {
            aggregate.block_number = aggregate.block_number.max(latest);
        }

        if refetch_prices {
            let requests = price_requests(aggregate);
            if let Some(batch) = self.read_prices(&requests, aggregate.block_number).await? {
                apply_prices(aggregate, batch);
            }
        }

        debug!(
            pool = ?aggregate.address,
            logs = logs.len(),
            applied,
            refetch_prices,
            "Replayed pool events"
        );
        Ok(())
    }

    async fn read_curves(
        &self,
        curves: &[Address],
        block: u64,
    ) -> Result<Vec<NablaCurve>, SyncError> {
        let calls = curves
            .iter()
            .map(|curve| ContractCall::view(*curve, nabla::curve_params()))
            .collect();
        let results = self.reader.aggregate(calls, Some(block)).await?.into_required()?;
        ensure_len(&results, curves.len(), "params")?;

        results
            .iter()
            .map(|tokens| {
                let beta = int_at(tokens, 0, "beta")?;
                let c = int_at(tokens, 1, "c")?;
                Ok(NablaCurve::new(beta, c))
            })
            .collect()
    }

    /// One same-block batch covering every sub-pool
    async fn read_figures(
        &self,
        pools: &[Address],
        block: u64,
    ) -> Result<Vec<SubPoolFigures>, SyncError> {
        let calls = pools
            .iter()
            .flat_map(|pool| {
                [
                    ContractCall::view(*pool, nabla::reserve()),
                    ContractCall::view(*pool, nabla::reserve_with_slippage()),
                    ContractCall::view(*pool, nabla::total_liabilities()),
                    ContractCall::view(*pool, nabla::swap_fees()),
                ]
            })
            .collect();
        let results = self.reader.aggregate(calls, Some(block)).await?.into_required()?;
        ensure_len(&results, pools.len() * FIGURE_CALLS, "sub-pool figures")?;

        results
            .chunks(FIGURE_CALLS)
            .map(|chunk| {
                Ok(SubPoolFigures {
                    reserve: signed_uint_at(chunk, 0, 0, "reserve")?,
                    reserve_with_slippage: signed_uint_at(chunk, 1, 0, "reserveWithSlippage")?,
                    total_liabilities: signed_uint_at(chunk, 2, 0, "totalLiabilities")?,
                    lp_fee: signed_uint_at(chunk, 3, 0, "lpFee")?,
                    backstop_fee: signed_uint_at(chunk, 3, 1, "backstopFee")?,
                    protocol_fee: signed_uint_at(chunk, 3, 2, "protocolFee")?,
                })
            })
            .collect()
    }

    async fn read_prices(
        &self,
        requests: &[PriceRequest],
        block: u64,
    ) -> Result<Option<PriceBatch>, SyncError> {
        if self.skip_price_update {
            return Ok(None);
        }
        let batch = self.prices.fetch(requests, Some(block)).await?;
        if batch.prices.len() != requests.len() {
            return Err(SyncError::Malformed(format!(
                "{} prices for {} assets",
                batch.prices.len(),
                requests.len()
            )));
        }
        Ok(Some(batch))
    }
}

fn price_requests(aggregate: &PoolAggregate) -> Vec<PriceRequest> {
    aggregate
        .tokens
        .iter()
        .enumerate()
        .map(|(i, token)| PriceRequest::new(token.address, aggregate.price_feed_id(i)))
        .collect()
}

/// A zero id means the adapter has no feed for the asset
fn feed_id_from(tokens: &[Token]) -> Option<H256> {
    let bytes = tokens.first().cloned().and_then(Token::into_fixed_bytes)?;
    if bytes.len() != 32 || bytes.iter().all(|b| *b == 0) {
        return None;
    }
    Some(H256::from_slice(&bytes))
}

fn topology_changed(current: &PoolAggregate, assets: &[Address]) -> bool {
    let cached: HashSet<Address> = current.tokens.iter().map(|t| t.address).collect();
    let fresh: HashSet<Address> = assets.iter().copied().collect();
    cached != fresh || current.tokens.len() != assets.len()
}

fn apply_figures(pool: &mut NablaPool, figures: &SubPoolFigures) {
    pool.state.reserve = figures.reserve;
    pool.state.reserve_with_slippage = figures.reserve_with_slippage;
    pool.state.total_liabilities = figures.total_liabilities;
    pool.meta.lp_fee = figures.lp_fee;
    pool.meta.backstop_fee = figures.backstop_fee;
    pool.meta.protocol_fee = figures.protocol_fee;
}

/// Per-asset failures and non-positive prices leave the price absent
fn apply_prices(aggregate: &mut PoolAggregate, batch: PriceBatch) {
    let PriceBatch {
        prices,
        update_payload,
    } = batch;

    for ((pool, token), price) in aggregate
        .pools
        .iter_mut()
        .zip(aggregate.tokens.iter())
        .zip(prices)
    {
        pool.state.price = match price {
            Ok(price) if price > I256::zero() => Some(price),
            Ok(price) => {
                warn!(asset = ?token.address, %price, "Ignoring non-positive asset price");
                None
            }
            Err(e) => {
                warn!(asset = ?token.address, error = %e, "Failed to read asset price");
                None
            }
        };
    }
    aggregate.price_update_data = update_payload;
}

fn ensure_len<T>(items: &[T], expected: usize, what: &str) -> Result<(), SyncError> {
    if items.len() == expected {
        Ok(())
    } else {
        Err(SyncError::Malformed(format!(
            "expected {} {} results, got {}",
            expected,
            what,
            items.len()
        )))
    }
}

fn token_at<'a>(
    results: &'a [Vec<Token>],
    call: usize,
    output: usize,
    what: &str,
) -> Result<&'a Token, SyncError> {
    results
        .get(call)
        .and_then(|tokens| tokens.get(output))
        .ok_or_else(|| SyncError::Malformed(format!("{} missing from response", what)))
}

fn address_at(
    results: &[Vec<Token>],
    call: usize,
    output: usize,
    what: &str,
) -> Result<Address, SyncError> {
    token_at(results, call, output, what)?
        .clone()
        .into_address()
        .ok_or_else(|| SyncError::Malformed(format!("{} is not an address", what)))
}

fn uint_at(
    results: &[Vec<Token>],
    call: usize,
    output: usize,
    what: &str,
) -> Result<ethers_core::types::U256, SyncError> {
    token_at(results, call, output, what)?
        .clone()
        .into_uint()
        .ok_or_else(|| SyncError::Malformed(format!("{} is not a uint", what)))
}

fn signed_uint_at(
    results: &[Vec<Token>],
    call: usize,
    output: usize,
    what: &str,
) -> Result<I256, SyncError> {
    let value = uint_at(results, call, output, what)?;
    fixed_point::from_unsigned(value)
        .map_err(|_| SyncError::Malformed(format!("{} {} out of range", what, value)))
}

fn int_at(tokens: &[Token], output: usize, what: &str) -> Result<I256, SyncError> {
    let raw = tokens
        .get(output)
        .cloned()
        .and_then(Token::into_int)
        .ok_or_else(|| SyncError::Malformed(format!("{} is not an int", what)))?;
    Ok(I256::from_raw(raw))
}

fn parse_address(value: &str) -> Result<Address, SyncError> {
    Address::from_str(value.trim_start_matches("0x"))
        .map_err(|_| SyncError::InvalidAddress(value.to_string()))
}

fn format_address(address: &Address) -> String {
    format!("{:?}", address)
}

fn unix_now() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_secs() as i64)
        .unwrap_or_default()
}
