use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use serde::de::DeserializeOwned;
use serde_json::{json, Value};
use tokio_util::sync::CancellationToken;

use crate::error::{ChainError, ChainResult};
use crate::models::{CallRequest, RpcBlock, RpcReceipt, RpcTransaction};
use crate::rpc::transport::{HttpTransport, JsonRpcRequest, Transport};
use crate::units::{parse_quantity, to_hex_quantity};

const EMPTY_CODE: &str = "0x";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockTag {
    Latest,
    Number(u64),
}

impl BlockTag {
    pub fn to_param(self) -> String {
        match self {
            BlockTag::Latest => "latest".to_string(),
            BlockTag::Number(n) => to_hex_quantity(n),
        }
    }
}

impl From<u64> for BlockTag {
    fn from(n: u64) -> Self {
        BlockTag::Number(n)
    }
}

/// JSON-RPC 2.0 client bound to a single endpoint.
///
/// Clones share the transport and the request id counter. Every request is an
/// independent round trip: nothing is cached, retried or de-duplicated.
#[derive(Clone)]
pub struct RpcClient {
    transport: Arc<dyn Transport>,
    next_id: Arc<AtomicU64>,
    cancel: CancellationToken,
}

impl RpcClient {
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self {
            transport,
            next_id: Arc::new(AtomicU64::new(1)),
            cancel: CancellationToken::new(),
        }
    }

    pub fn http(rpc_url: &str, timeout: Option<Duration>) -> ChainResult<Self> {
        let transport = HttpTransport::new(rpc_url, timeout)?;
        Ok(Self::new(Arc::new(transport)))
    }

    /// Returns a clone whose in-flight requests are aborted with
    /// [`ChainError::Cancelled`] once `token` is cancelled.
    pub fn with_cancellation(&self, token: CancellationToken) -> Self {
        Self {
            transport: Arc::clone(&self.transport),
            next_id: Arc::clone(&self.next_id),
            cancel: token,
        }
    }

    pub fn cancellation_token(&self) -> &CancellationToken {
        &self.cancel
    }

    /// Sends `method` with `params` and returns the raw `result` member.
    pub async fn request(&self, method: &str, params: Value) -> ChainResult<Value> {
        if self.cancel.is_cancelled() {
            return Err(ChainError::Cancelled);
        }

        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let request = JsonRpcRequest::new(method, params, id);
        tracing::trace!(method, id, "rpc request");

        let response = tokio::select! {
            _ = self.cancel.cancelled() => return Err(ChainError::Cancelled),
            response = self.transport.send(&request) => response?,
        };

        response.into_result().map_err(|e| {
            tracing::debug!(method, id, error = %e, "rpc error response");
            e
        })
    }

    /// Like [`request`](Self::request) but decodes `result` into `T`.
    pub async fn request_as<T: DeserializeOwned>(
        &self,
        method: &str,
        params: Value,
    ) -> ChainResult<T> {
        let value = self.request(method, params).await?;
        serde_json::from_value(value)
            .map_err(|e| ChainError::Parse(format!("unexpected {method} result: {e}")))
    }

    pub async fn get_block_number(&self) -> ChainResult<u64> {
        let hex: String = self.request_as("eth_blockNumber", json!([])).await?;
        parse_quantity(&hex)
    }

    /// Suggested gas price in wei, hex-encoded.
    pub async fn gas_price(&self) -> ChainResult<String> {
        self.request_as("eth_gasPrice", json!([])).await
    }

    /// Balance in wei, hex-encoded.
    pub async fn get_balance(&self, address: &str) -> ChainResult<String> {
        self.request_as("eth_getBalance", json!([address, "latest"]))
            .await
    }

    pub async fn get_transaction_count(&self, address: &str) -> ChainResult<u64> {
        let hex: String = self
            .request_as("eth_getTransactionCount", json!([address, "latest"]))
            .await?;
        parse_quantity(&hex)
    }

    /// Fetches a block with the hash-only transaction list.
    pub async fn get_block(&self, tag: impl Into<BlockTag>) -> ChainResult<Option<RpcBlock>> {
        let tag = tag.into();
        self.request_as("eth_getBlockByNumber", json!([tag.to_param(), false]))
            .await
    }

    pub async fn get_block_by_hash(&self, hash: &str) -> ChainResult<Option<RpcBlock>> {
        self.request_as("eth_getBlockByHash", json!([hash, false]))
            .await
    }

    pub async fn get_transaction_by_hash(
        &self,
        hash: &str,
    ) -> ChainResult<Option<RpcTransaction>> {
        self.request_as("eth_getTransactionByHash", json!([hash]))
            .await
    }

    /// `None` until the transaction is mined.
    pub async fn get_transaction_receipt(&self, hash: &str) -> ChainResult<Option<RpcReceipt>> {
        self.request_as("eth_getTransactionReceipt", json!([hash]))
            .await
    }

    pub async fn get_code(&self, address: &str) -> ChainResult<String> {
        self.request_as("eth_getCode", json!([address, "latest"]))
            .await
    }

    pub async fn get_storage_at(&self, address: &str, slot: &str) -> ChainResult<String> {
        self.request_as("eth_getStorageAt", json!([address, slot, "latest"]))
            .await
    }

    /// `eth_call` against the latest block; returns the raw return data.
    pub async fn call(&self, call: &CallRequest) -> ChainResult<String> {
        self.request_as("eth_call", json!([call, "latest"])).await
    }

    /// Gas units, hex-encoded.
    pub async fn estimate_gas(&self, call: &CallRequest) -> ChainResult<String> {
        self.request_as("eth_estimateGas", json!([call])).await
    }

    pub async fn is_contract(&self, address: &str) -> ChainResult<bool> {
        let code = self.get_code(address).await?;
        Ok(has_code(&code))
    }
}

pub(crate) fn has_code(code: &str) -> bool {
    code != EMPTY_CODE && code.len() > 2
}

impl std::fmt::Debug for RpcClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RpcClient")
            .field("next_id", &self.next_id.load(Ordering::Relaxed))
            .field("cancelled", &self.cancel.is_cancelled())
            .finish()
    }
}
