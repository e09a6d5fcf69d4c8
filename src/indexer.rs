//! Client for the block-indexing REST API and the multi-block scans built on
//! it (sender leaderboard, address history). The indexer serves blocks with
//! embedded transaction objects, which the hash-only RPC block form lacks.

use std::collections::HashMap;
use std::time::Duration;

use futures_util::{stream, StreamExt, TryStreamExt};
use reqwest::StatusCode;
use url::Url;

use crate::error::{ChainError, ChainResult};
use crate::models::{AddressActivity, IndexedBlock, LeaderboardEntry};
use crate::units::wei_to_ether;

/// Concurrent block requests per scan.
const SCAN_CONCURRENCY: usize = 4;

#[derive(Debug, Clone)]
pub struct IndexerClient {
    client: reqwest::Client,
    base_url: Url,
    network: String,
}

impl IndexerClient {
    pub fn new(
        base_url: &str,
        network: impl Into<String>,
        timeout: Option<Duration>,
    ) -> ChainResult<Self> {
        let mut base_url = Url::parse(base_url)
            .map_err(|e| ChainError::Transport(format!("invalid indexer url {base_url:?}: {e}")))?;
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }

        let mut builder = reqwest::Client::builder().no_proxy();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder.build()?;

        Ok(Self {
            client,
            base_url,
            network: network.into(),
        })
    }

    fn endpoint(&self, tail: &str) -> ChainResult<Url> {
        self.base_url
            .join(&format!("networks/{}/{}", self.network, tail))
            .map_err(|e| ChainError::Transport(format!("invalid indexer path: {e}")))
    }

    async fn get_block(&self, tail: &str, what: String) -> ChainResult<IndexedBlock> {
        let url = self.endpoint(tail)?;
        let response = self.client.get(url).send().await?;

        match response.status() {
            StatusCode::NOT_FOUND => Err(ChainError::NotFound(what)),
            status if !status.is_success() => Err(ChainError::Transport(format!(
                "indexer returned http status {status} for {what}"
            ))),
            _ => {
                let body = response.bytes().await?;
                serde_json::from_slice(&body)
                    .map_err(|e| ChainError::Parse(format!("malformed indexer {what}: {e}")))
            }
        }
    }

    /// Latest indexed block descriptor.
    pub async fn latest(&self) -> ChainResult<IndexedBlock> {
        self.get_block("latest", "latest indexed block".to_string())
            .await
    }

    pub async fn block(&self, number: u64) -> ChainResult<IndexedBlock> {
        self.get_block(&number.to_string(), format!("indexed block {number}"))
            .await
    }

    /// The latest block and up to `depth - 1` predecessors, newest first.
    pub async fn recent_blocks(&self, depth: u64) -> ChainResult<Vec<IndexedBlock>> {
        if depth == 0 {
            return Ok(Vec::new());
        }

        let latest = self.latest().await?;
        let start = latest.number.saturating_sub(depth - 1);
        tracing::debug!(
            network = %self.network,
            from = start,
            to = latest.number,
            "scanning indexed blocks"
        );

        stream::iter((start..=latest.number).rev())
            .map(|number| self.block(number))
            .buffered(SCAN_CONCURRENCY)
            .try_collect()
            .await
    }

    pub async fn leaderboard(&self, depth: u64, limit: usize) -> ChainResult<Vec<LeaderboardEntry>> {
        let blocks = self.recent_blocks(depth).await?;
        Ok(rank_senders(&blocks, limit))
    }

    pub async fn address_history(
        &self,
        address: &str,
        depth: u64,
    ) -> ChainResult<Vec<AddressActivity>> {
        let blocks = self.recent_blocks(depth).await?;
        Ok(activity_for(&blocks, address))
    }
}

/// Senders ordered by transaction count, then total value moved.
pub fn rank_senders(blocks: &[IndexedBlock], limit: usize) -> Vec<LeaderboardEntry> {
    let mut by_sender: HashMap<String, LeaderboardEntry> = HashMap::new();

    for tx in blocks.iter().flat_map(|b| b.transactions.iter()) {
        let address = tx.from.to_lowercase();
        let entry = by_sender
            .entry(address.clone())
            .or_insert_with(|| LeaderboardEntry {
                address,
                tx_count: 0,
                total_value_ether: 0.0,
            });
        entry.tx_count += 1;
        let value = wei_to_ether(&tx.value);
        if value.is_finite() {
            entry.total_value_ether += value;
        }
    }

    let mut ranked: Vec<LeaderboardEntry> = by_sender.into_values().collect();
    ranked.sort_by(|a, b| {
        b.tx_count
            .cmp(&a.tx_count)
            .then_with(|| b.total_value_ether.total_cmp(&a.total_value_ether))
            .then_with(|| a.address.cmp(&b.address))
    });
    ranked.truncate(limit);
    ranked
}

/// Transactions sent from or to `address`, in block order as given.
pub fn activity_for(blocks: &[IndexedBlock], address: &str) -> Vec<AddressActivity> {
    let needle = address.to_lowercase();
    let mut out = Vec::new();

    for block in blocks {
        for tx in &block.transactions {
            let outgoing = tx.from.to_lowercase() == needle;
            let incoming = tx
                .to
                .as_deref()
                .map(|to| to.to_lowercase() == needle)
                .unwrap_or(false);
            if !(outgoing || incoming) {
                continue;
            }
            out.push(AddressActivity {
                block_number: block.number,
                timestamp: block.timestamp,
                hash: tx.hash.clone(),
                from: tx.from.clone(),
                to: tx.to.clone(),
                value_ether: wei_to_ether(&tx.value),
                outgoing,
            });
        }
    }
    out
}
