//! JSON-RPC batch reader over `web3`

use std::time::Duration;

use async_trait::async_trait;
use futures::future::join_all;
use tracing::debug;
use web3::{
    transports::{Batch, Http},
    types::{BlockId, BlockNumber, Bytes, CallRequest, U64},
    Web3,
};

use crate::error::ReadError;
use crate::reader::{BatchResponse, ContractCall, ContractReader};

/// Sends every batch as a single JSON-RPC array request
#[derive(Debug, Clone)]
pub struct Web3Reader {
    http: Http,
    timeout: Duration,
}

impl Web3Reader {
    /// Build a reader with a keep-alive HTTP client
    pub fn new(rpc_url: &str, timeout: Duration) -> Result<Self, ReadError> {
        let client = reqwest::Client::builder()
            .pool_idle_timeout(Duration::from_secs(60))
            .pool_max_idle_per_host(10)
            .timeout(timeout)
            .tcp_keepalive(Duration::from_secs(60))
            .tcp_nodelay(true)
            .build()?;

        let url = rpc_url
            .parse()
            .map_err(|e| ReadError::Transport(format!("Invalid RPC URL {}: {}", rpc_url, e)))?;

        Ok(Self {
            http: Http::with_client(client, url),
            timeout,
        })
    }

    /// Chain id reported by the node
    pub async fn chain_id(&self) -> Result<u64, ReadError> {
        let web3 = Web3::new(self.http.clone());
        let chain_id = tokio::time::timeout(self.timeout, web3.eth().chain_id())
            .await
            .map_err(|_| ReadError::Timeout(self.timeout))?
            .map_err(|e| ReadError::Transport(e.to_string()))?;
        Ok(chain_id.low_u64())
    }

    async fn latest_block(&self) -> Result<u64, ReadError> {
        let web3 = Web3::new(self.http.clone());
        let block = web3
            .eth()
            .block_number()
            .await
            .map_err(|e| ReadError::Transport(e.to_string()))?;
        Ok(block.as_u64())
    }

    async fn execute(
        &self,
        calls: Vec<ContractCall>,
        block: Option<u64>,
    ) -> Result<BatchResponse, ReadError> {
        let block_number = match block {
            Some(number) => number,
            None => self.latest_block().await?,
        };

        if calls.is_empty() {
            return Ok(BatchResponse {
                block_number,
                results: Vec::new(),
            });
        }

        let web3 = Web3::new(Batch::new(self.http.clone()));
        let block_id = BlockId::Number(BlockNumber::Number(U64::from(block_number)));

        let mut pending = Vec::with_capacity(calls.len());
        for call in &calls {
            let request = CallRequest {
                to: Some(call.target),
                data: Some(Bytes(call.encode()?)),
                ..Default::default()
            };
            pending.push(web3.eth().call(request, Some(block_id)));
        }

        web3.transport()
            .submit_batch()
            .await
            .map_err(|e| ReadError::Transport(e.to_string()))?;

        let replies = join_all(pending).await;
        debug!(calls = calls.len(), block = block_number, "Batch call completed");

        let results = calls
            .iter()
            .zip(replies)
            .map(|(call, reply)| match reply {
                Ok(output) => call.decode(&output.0),
                Err(e) => Err(ReadError::Transport(format!(
                    "{}() on {:?}: {}",
                    call.function.name, call.target, e
                ))),
            })
            .collect();

        Ok(BatchResponse {
            block_number,
            results,
        })
    }
}

#[async_trait]
impl ContractReader for Web3Reader {
    async fn aggregate(
        &self,
        calls: Vec<ContractCall>,
        block: Option<u64>,
    ) -> Result<BatchResponse, ReadError> {
        tokio::time::timeout(self.timeout, self.execute(calls, block))
            .await
            .map_err(|_| ReadError::Timeout(self.timeout))?
    }
}
