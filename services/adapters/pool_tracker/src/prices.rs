//! Asset price sources
//!
//! Prices are 8-decimal integers. A failure for one asset is reported in its
//! own slot; only a transport failure fails the whole batch.

use std::collections::BTreeMap;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use ethabi::Token;
use ethers_core::types::{Address, H256, I256};
use nabla_amm::fixed_point;
use nabla_config::PythConfig;
use nabla_dex::nabla;
use serde::Deserialize;
use tracing::debug;

use crate::error::ReadError;
use crate::reader::{ContractCall, ContractReader};

/// Decimals of every price handed to the swap engine
pub const PRICE_DECIMALS: i32 = 8;

#[derive(Debug)]
pub struct PriceBatch {
    /// One entry per requested asset, in request order
    pub prices: Vec<Result<I256, ReadError>>,
    /// Opaque update payload to report through `describe()`
    pub update_payload: Option<Vec<u8>>,
}

/// One asset to price, with the feed id the Pyth adapter resolved for it
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PriceRequest {
    pub asset: Address,
    pub feed_id: Option<H256>,
}

impl PriceRequest {
    pub fn new(asset: Address, feed_id: Option<H256>) -> Self {
        Self { asset, feed_id }
    }
}

#[async_trait]
pub trait PriceSource: Send + Sync {
    async fn fetch(
        &self,
        requests: &[PriceRequest],
        block: Option<u64>,
    ) -> Result<PriceBatch, ReadError>;
}

/// On-chain oracle read through `getAssetPrice(asset)`
pub struct OraclePriceSource {
    reader: Arc<dyn ContractReader>,
    oracle: Address,
}

impl OraclePriceSource {
    pub fn new(reader: Arc<dyn ContractReader>, oracle: Address) -> Self {
        Self { reader, oracle }
    }
}

#[async_trait]
impl PriceSource for OraclePriceSource {
    async fn fetch(
        &self,
        requests: &[PriceRequest],
        block: Option<u64>,
    ) -> Result<PriceBatch, ReadError> {
        let calls = requests
            .iter()
            .map(|request| {
                ContractCall::new(
                    self.oracle,
                    nabla::get_asset_price(),
                    vec![Token::Address(request.asset)],
                )
            })
            .collect();

        let response = self.reader.aggregate(calls, block).await?;
        let prices = response
            .results
            .into_iter()
            .map(|result| result.and_then(|tokens| price_from_tokens(&tokens)))
            .collect();

        Ok(PriceBatch {
            prices,
            update_payload: None,
        })
    }
}

fn price_from_tokens(tokens: &[Token]) -> Result<I256, ReadError> {
    let value = tokens
        .first()
        .cloned()
        .and_then(Token::into_uint)
        .ok_or_else(|| ReadError::Malformed("getAssetPrice returned no uint".to_string()))?;
    fixed_point::from_unsigned(value)
        .map_err(|_| ReadError::Malformed(format!("price {} out of range", value)))
}

#[derive(Debug, Deserialize)]
pub struct HermesResponse {
    pub binary: HermesBinary,
    #[serde(default)]
    pub parsed: Vec<HermesParsed>,
}

#[derive(Debug, Deserialize)]
pub struct HermesBinary {
    #[serde(default)]
    pub encoding: String,
    pub data: Vec<String>,
}

#[derive(Debug, Deserialize)]
pub struct HermesParsed {
    pub id: String,
    pub price: HermesPrice,
}

#[derive(Debug, Deserialize)]
pub struct HermesPrice {
    pub price: String,
    #[serde(default)]
    pub conf: String,
    pub expo: i32,
    #[serde(default)]
    pub publish_time: i64,
}

/// Off-chain Pyth prices from a Hermes endpoint
pub struct HermesPriceSource {
    client: reqwest::Client,
    url: String,
    /// Configured feed ids, lowercase without `0x`; these win over the
    /// adapter-resolved id carried by each request
    feeds: BTreeMap<Address, String>,
}

impl HermesPriceSource {
    pub fn new(config: &PythConfig) -> Result<Self, ReadError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_millis(config.timeout_ms))
            .build()?;

        let feeds = config
            .feeds
            .iter()
            .map(|(asset, feed)| {
                let address = Address::from_str(asset.trim_start_matches("0x"))
                    .map_err(|_| ReadError::Malformed(format!("invalid asset {}", asset)))?;
                Ok((address, normalize_feed_id(feed)))
            })
            .collect::<Result<BTreeMap<_, _>, ReadError>>()?;

        Ok(Self {
            client,
            url: config.url.clone(),
            feeds,
        })
    }

    /// Feed id to query for `request`, lowercase without `0x`
    pub fn feed_for(&self, request: &PriceRequest) -> Option<String> {
        self.feeds
            .get(&request.asset)
            .cloned()
            .or_else(|| request.feed_id.map(|id| hex::encode(id.as_bytes())))
    }

    /// Map a Hermes reply back onto the requested assets
    pub fn prices_from_response(
        &self,
        requests: &[PriceRequest],
        response: &HermesResponse,
    ) -> Result<PriceBatch, ReadError> {
        let parsed: BTreeMap<String, &HermesPrice> = response
            .parsed
            .iter()
            .map(|entry| (normalize_feed_id(&entry.id), &entry.price))
            .collect();

        let prices = requests
            .iter()
            .map(|request| {
                let feed = self.feed_for(request).ok_or_else(|| no_feed(request))?;
                let price = parsed.get(&feed).ok_or_else(|| {
                    ReadError::Malformed(format!("feed {} missing from response", feed))
                })?;
                normalize_price(price)
            })
            .collect();

        let update_payload = match response.binary.data.first() {
            Some(data) => Some(
                hex::decode(data.trim_start_matches("0x"))
                    .map_err(|e| ReadError::Malformed(format!("update payload: {}", e)))?,
            ),
            None => None,
        };

        Ok(PriceBatch {
            prices,
            update_payload,
        })
    }
}

#[async_trait]
impl PriceSource for HermesPriceSource {
    async fn fetch(
        &self,
        requests: &[PriceRequest],
        _block: Option<u64>,
    ) -> Result<PriceBatch, ReadError> {
        let feeds: Vec<String> = requests
            .iter()
            .filter_map(|request| self.feed_for(request))
            .collect();

        // Hermes rejects a request without ids
        if feeds.is_empty() {
            return Ok(PriceBatch {
                prices: requests.iter().map(|request| Err(no_feed(request))).collect(),
                update_payload: None,
            });
        }

        let query: Vec<(&str, &str)> = feeds
            .iter()
            .map(|feed| ("ids[]", feed.as_str()))
            .collect();
        let response: HermesResponse = self
            .client
            .get(&self.url)
            .query(&query)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        debug!(feeds = query.len(), "Fetched Hermes price update");

        self.prices_from_response(requests, &response)
    }
}

fn no_feed(request: &PriceRequest) -> ReadError {
    ReadError::Malformed(format!("no price feed for asset {:?}", request.asset))
}

fn normalize_feed_id(feed: &str) -> String {
    feed.trim_start_matches("0x").to_lowercase()
}

/// Rescale a Pyth `price * 10^expo` to 8 decimals, truncating extra digits
fn normalize_price(price: &HermesPrice) -> Result<I256, ReadError> {
    let raw = I256::from_dec_str(&price.price)
        .map_err(|_| ReadError::Malformed(format!("price {}", price.price)))?;
    let shift = PRICE_DECIMALS + price.expo;
    let overflow = |_| ReadError::Malformed(format!("price {} out of range", price.price));
    let factor = fixed_point::ten_pow(shift.unsigned_abs()).map_err(overflow)?;
    if shift >= 0 {
        fixed_point::mul_int(raw, factor).map_err(overflow)
    } else {
        fixed_point::div_int(raw, factor).map_err(overflow)
    }
}
