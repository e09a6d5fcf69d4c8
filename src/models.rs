use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::ChainResult;
use crate::units::parse_quantity;

/// Block as returned by `eth_getBlockByNumber` / `eth_getBlockByHash` in the
/// hash-only transaction form.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RpcBlock {
    pub number: String,
    #[serde(default)]
    pub hash: Option<String>,
    #[serde(default)]
    pub parent_hash: Option<String>,
    pub timestamp: String,
    pub gas_used: String,
    pub gas_limit: String,
    #[serde(default)]
    pub base_fee_per_gas: Option<String>,
    #[serde(default)]
    pub miner: Option<String>,
    #[serde(default)]
    pub transactions: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RpcTransaction {
    pub hash: String,
    pub from: String,
    #[serde(default)]
    pub to: Option<String>,
    pub value: String,
    pub gas: String,
    #[serde(default)]
    pub gas_price: Option<String>,
    pub input: String,
    pub nonce: String,
    #[serde(default)]
    pub block_number: Option<String>,
    #[serde(default)]
    pub block_hash: Option<String>,
    #[serde(default)]
    pub transaction_index: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RpcLog {
    pub address: String,
    #[serde(default)]
    pub topics: Vec<String>,
    pub data: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RpcReceipt {
    #[serde(default)]
    pub status: Option<String>,
    pub gas_used: String,
    #[serde(default)]
    pub logs: Vec<RpcLog>,
}

impl RpcReceipt {
    /// `Some(true)` for `0x1`, `Some(false)` for `0x0`, `None` for pre-Byzantium
    /// receipts without a status field.
    pub fn succeeded(&self) -> Option<bool> {
        self.status.as_deref().map(|s| s == "0x1")
    }
}

/// Parameters for `eth_call` and `eth_estimateGas`.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CallRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub from: Option<String>,
    pub to: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gas: Option<String>,
}

impl CallRequest {
    /// Zero-value transfer used to probe gas pricing.
    pub fn zero_transfer(to: impl Into<String>) -> Self {
        Self {
            to: to.into(),
            value: Some("0x0".to_string()),
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BlockSummary {
    pub number: u64,
    pub timestamp: u64,
    pub gas_used: String,
    pub gas_limit: String,
    pub transactions: Vec<String>,
    pub transaction_count: usize,
}

impl TryFrom<RpcBlock> for BlockSummary {
    type Error = crate::error::ChainError;

    fn try_from(block: RpcBlock) -> ChainResult<Self> {
        let number = parse_quantity(&block.number)?;
        let timestamp = parse_quantity(&block.timestamp)?;
        Ok(Self {
            number,
            timestamp,
            gas_used: block.gas_used,
            gas_limit: block.gas_limit,
            transaction_count: block.transactions.len(),
            transactions: block.transactions,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChainMetrics {
    pub block_height: u64,
    pub block_time_ms: f64,
    pub gas_price_gwei: f64,
    /// Transaction count of the latest block. This is a per-block figure, not
    /// a per-second rate.
    pub txs_in_latest_block: usize,
    /// Gas units of a zero-value transfer, when estimation succeeded.
    pub transfer_gas: Option<u64>,
    pub last_updated: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
pub struct AddressSummary {
    pub address: String,
    pub balance_wei: String,
    pub balance_ether: f64,
    pub nonce: u64,
    pub is_contract: bool,
    pub code_size: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct TransactionDetail {
    pub transaction: RpcTransaction,
    pub value_ether: f64,
    pub gas_price_gwei: Option<f64>,
    pub receipt: Option<RpcReceipt>,
    pub pending: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct StorageSlot {
    pub slot: String,
    pub value: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct ContractInfo {
    pub address: String,
    pub is_contract: bool,
    pub bytecode: String,
    pub code_size: usize,
    pub storage: Option<StorageSlot>,
}

#[derive(Debug, Clone, Serialize)]
pub struct PortfolioEntry {
    pub address: String,
    pub balance_ether: Option<f64>,
    pub error: Option<String>,
}

/// Block served by the indexer REST API, with full transaction objects.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexedBlock {
    pub number: u64,
    #[serde(default)]
    pub hash: Option<String>,
    #[serde(default)]
    pub timestamp: Option<u64>,
    #[serde(default)]
    pub transactions: Vec<IndexedTransaction>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IndexedTransaction {
    pub hash: String,
    pub from: String,
    #[serde(default)]
    pub to: Option<String>,
    /// Wei, hex-encoded.
    pub value: String,
    #[serde(default)]
    pub gas_price: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct LeaderboardEntry {
    pub address: String,
    pub tx_count: u64,
    pub total_value_ether: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct AddressActivity {
    pub block_number: u64,
    pub timestamp: Option<u64>,
    pub hash: String,
    pub from: String,
    pub to: Option<String>,
    pub value_ether: f64,
    pub outgoing: bool,
}
