//! Polling aggregator: keeps a live view of chain health for the dashboard.
//!
//! Every tick reads the block height, prices gas, and fetches the latest block,
//! then publishes a fresh [`PollerState`] on a watch channel. A failed tick
//! never blanks what is already published; it only sets `error` next to the
//! stale values. Ticks are single-flight: the run loop waits for a tick to
//! settle before scheduling the next one, and manual refetches queue behind
//! any tick already in flight.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use serde::Serialize;
use tokio::sync::{watch, Mutex, Notify};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::error::{ChainError, ChainResult};
use crate::models::{BlockSummary, CallRequest, ChainMetrics};
use crate::poll_stats::{PollSnapshot, PollStats};
use crate::rpc::{BlockTag, RpcClient};
use crate::units::{parse_quantity, wei_to_gwei};
use crate::window::{BlockWindow, DEFAULT_WINDOW_CAPACITY};

pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(2);

/// Block time reported while the window has nothing to compare against.
pub const EMPTY_WINDOW_BLOCK_TIME_MS: f64 = 50.0;

/// Recipient of the zero-value transfer used to probe gas estimation.
const GAS_PROBE_RECIPIENT: &str = "0x0000000000000000000000000000000000000000";

#[derive(Debug, Clone, Copy)]
pub struct PollerConfig {
    pub interval: Duration,
    pub window_capacity: usize,
}

impl Default for PollerConfig {
    fn default() -> Self {
        Self {
            interval: DEFAULT_POLL_INTERVAL,
            window_capacity: DEFAULT_WINDOW_CAPACITY,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PollerStatus {
    Loading,
    Ready,
    ReadyWithError,
}

#[derive(Debug, Clone, Serialize)]
pub struct PollerState {
    pub status: PollerStatus,
    pub loading: bool,
    pub error: Option<String>,
    pub metrics: Option<ChainMetrics>,
    pub blocks: Vec<BlockSummary>,
}

impl PollerState {
    fn initial() -> Self {
        Self {
            status: PollerStatus::Loading,
            loading: true,
            error: None,
            metrics: None,
            blocks: Vec::new(),
        }
    }

    fn refresh_status(&mut self) {
        self.status = match (&self.metrics, &self.error) {
            (None, _) => PollerStatus::Loading,
            (Some(_), None) => PollerStatus::Ready,
            (Some(_), Some(_)) => PollerStatus::ReadyWithError,
        };
    }
}

struct GasQuote {
    price_gwei: f64,
    transfer_gas: Option<u64>,
}

struct Sample {
    block_height: u64,
    gas: ChainResult<GasQuote>,
    latest: BlockSummary,
}

pub struct ChainPoller {
    client: RpcClient,
    interval: Duration,
    cancel: CancellationToken,
    // Held for the whole tick, which makes ticks single-flight.
    window: Mutex<BlockWindow>,
    state: watch::Sender<PollerState>,
    refetch: Notify,
    stats: PollStats,
}

impl ChainPoller {
    /// The poller cancels through a child of the client's token, so either the
    /// caller's token or [`shutdown`](Self::shutdown) stops it.
    pub fn new(client: RpcClient, config: PollerConfig) -> Self {
        let cancel = client.cancellation_token().child_token();
        let client = client.with_cancellation(cancel.clone());
        let (state, _) = watch::channel(PollerState::initial());
        Self {
            client,
            interval: config.interval,
            cancel,
            window: Mutex::new(BlockWindow::new(config.window_capacity)),
            state,
            refetch: Notify::new(),
            stats: PollStats::new(),
        }
    }

    pub fn state(&self) -> PollerState {
        self.state.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<PollerState> {
        self.state.subscribe()
    }

    pub fn stats(&self) -> PollSnapshot {
        self.stats.snapshot()
    }

    pub fn is_shut_down(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Stops the run loop and aborts in-flight requests.
    pub fn shutdown(&self) {
        self.cancel.cancel();
    }

    /// Runs one tick right away, outside the timer.
    pub async fn refetch(&self) -> ChainResult<PollerState> {
        self.tick().await?;
        Ok(self.state())
    }

    /// Wakes the run loop so it ticks without waiting for the interval.
    pub fn request_refetch(&self) {
        self.refetch.notify_one();
    }

    pub async fn tick(&self) -> ChainResult<()> {
        let mut window = self.window.lock().await;
        let sample = self.sample().await;

        if self.cancel.is_cancelled() {
            self.stats.inc_discarded_ticks();
            debug!("discarding tick that settled after shutdown");
            return Err(ChainError::Cancelled);
        }
        self.stats.inc_ticks();

        match sample {
            Ok(sample) => self.apply(&mut window, sample),
            Err(e) => {
                self.stats.inc_failed_ticks();
                warn!(error = %e, "chain poll failed, keeping last known values");
                self.state.send_modify(|state| {
                    state.error = Some(e.to_string());
                    state.refresh_status();
                });
                Err(e)
            }
        }
    }

    async fn sample(&self) -> ChainResult<Sample> {
        let block_height = self.client.get_block_number().await?;
        let gas = self.gas_quote().await;
        let latest = self
            .client
            .get_block(BlockTag::Latest)
            .await?
            .ok_or_else(|| ChainError::NotFound("latest block".to_string()))?;
        let latest = BlockSummary::try_from(latest)?;

        Ok(Sample {
            block_height,
            gas,
            latest,
        })
    }

    async fn gas_quote(&self) -> ChainResult<GasQuote> {
        let probe = CallRequest::zero_transfer(GAS_PROBE_RECIPIENT);
        let estimate = self
            .client
            .estimate_gas(&probe)
            .await
            .and_then(|units| parse_quantity(&units));

        let transfer_gas = match estimate {
            Ok(units) => Some(units),
            Err(ChainError::Cancelled) => return Err(ChainError::Cancelled),
            Err(e) => {
                self.stats.inc_gas_fallbacks();
                warn!(error = %e, "gas estimate failed, falling back to eth_gasPrice");
                None
            }
        };

        let price = self.client.gas_price().await?;
        Ok(GasQuote {
            price_gwei: wei_to_gwei(&price),
            transfer_gas,
        })
    }

    fn apply(&self, window: &mut BlockWindow, sample: Sample) -> ChainResult<()> {
        let block_time_ms = match window.newest() {
            Some(newest) => (sample.latest.timestamp as f64 - newest.timestamp as f64) * 1000.0,
            None => EMPTY_WINDOW_BLOCK_TIME_MS,
        };

        let previous = self.state.borrow().metrics.clone();
        let (gas_price_gwei, transfer_gas, gas_error) = match sample.gas {
            Ok(quote) => (quote.price_gwei, quote.transfer_gas, None),
            Err(e) => {
                warn!(error = %e, "gas price unavailable, keeping previous value");
                (
                    previous.as_ref().map_or(f64::NAN, |m| m.gas_price_gwei),
                    previous.as_ref().and_then(|m| m.transfer_gas),
                    Some(e),
                )
            }
        };

        let metrics = ChainMetrics {
            block_height: sample.block_height,
            block_time_ms,
            gas_price_gwei,
            txs_in_latest_block: sample.latest.transaction_count,
            transfer_gas,
            last_updated: Utc::now(),
        };

        let number = sample.latest.number;
        if window.push(sample.latest) {
            debug!(block = number, retained = window.len(), "block added to window");
        }

        let blocks = window.to_vec();
        let error = gas_error.as_ref().map(ToString::to_string);
        self.state.send_modify(|state| {
            state.metrics = Some(metrics);
            state.blocks = blocks;
            state.loading = false;
            state.error = error;
            state.refresh_status();
        });

        match gas_error {
            Some(e) => {
                self.stats.inc_failed_ticks();
                Err(e)
            }
            None => Ok(()),
        }
    }

    /// Polls until shut down. The next tick is scheduled only after the
    /// previous one settles.
    pub async fn run(&self) {
        info!(interval_ms = self.interval.as_millis() as u64, "chain poller started");
        loop {
            if let Err(ChainError::Cancelled) = self.tick().await {
                break;
            }
            tokio::select! {
                _ = self.cancel.cancelled() => break,
                _ = tokio::time::sleep(self.interval) => {}
                _ = self.refetch.notified() => debug!("manual refetch requested"),
            }
        }
        info!("chain poller stopped");
    }

    pub fn spawn(self: Arc<Self>) -> JoinHandle<()> {
        tokio::spawn(async move { self.run().await })
    }
}
