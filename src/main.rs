mod cli;

use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use serde::Serialize;
use tokio_util::sync::CancellationToken;

use chain_pulse::api::{self, AppState};
use chain_pulse::config::Config;
use chain_pulse::{lookup, ChainError, ChainPoller, IndexerClient, RpcClient};

use crate::cli::{Cli, Commands};

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    init_tracing();

    let cli = Cli::parse();
    let config = Config::from_env().context("failed to load configuration")?;

    let shutdown = CancellationToken::new();
    let client = RpcClient::http(&config.eth_rpc_url, config.rpc_timeout)
        .context("failed to build rpc client")?
        .with_cancellation(shutdown.clone());

    match cli.command {
        Commands::Serve { addr } => {
            let bind = addr.unwrap_or_else(|| config.http_bind_addr.clone());
            serve(&config, client, &bind, shutdown).await?;
        }
        Commands::Watch { ticks } => {
            watch(&config, client, ticks, shutdown).await;
        }
        Commands::Balance { address } => {
            let summary = lookup::address_summary(&client, &address)
                .await
                .with_context(|| format!("failed to look up {address}"))?;
            print_json(&summary)?;
        }
        Commands::Tx { hash } => {
            let detail = lookup::transaction_detail(&client, &hash)
                .await
                .with_context(|| format!("failed to look up transaction {hash}"))?;
            print_json(&detail)?;
        }
        Commands::Code { address, slot } => {
            let info = lookup::contract_info(&client, &address, slot.as_deref())
                .await
                .with_context(|| format!("failed to read code of {address}"))?;
            print_json(&info)?;
        }
        Commands::Leaderboard { blocks, limit } => {
            let indexer = indexer_client(&config)?
                .context("leaderboard needs INDEXER_URL")?;
            let depth = blocks.unwrap_or(config.scan_blocks);
            let ranked = indexer
                .leaderboard(depth, limit)
                .await
                .context("leaderboard scan failed")?;
            print_json(&ranked)?;
        }
        Commands::History { address, blocks } => {
            let indexer = indexer_client(&config)?
                .context("history needs INDEXER_URL")?;
            let depth = blocks.unwrap_or(config.scan_blocks);
            let activity = indexer
                .address_history(&address, depth)
                .await
                .context("address history scan failed")?;
            print_json(&activity)?;
        }
    }

    Ok(())
}

async fn serve(
    config: &Config,
    client: RpcClient,
    bind: &str,
    shutdown: CancellationToken,
) -> Result<()> {
    let poller = Arc::new(ChainPoller::new(client.clone(), config.poller()));
    let poll_handle = poller.clone().spawn();

    let state = AppState {
        client,
        poller,
        indexer: indexer_client(config)?,
        scan_blocks: config.scan_blocks,
    };

    cancel_on_ctrl_c(shutdown.clone());

    let served = api::run_http_server(bind, state, shutdown.clone()).await;
    shutdown.cancel();
    poll_handle.await.context("poller task panicked")?;
    served
}

async fn watch(
    config: &Config,
    client: RpcClient,
    ticks: Option<u64>,
    shutdown: CancellationToken,
) {
    cancel_on_ctrl_c(shutdown.clone());
    let poller = ChainPoller::new(client, config.poller());
    let mut done = 0u64;

    loop {
        match poller.tick().await {
            Ok(()) => {
                if let Some(m) = poller.state().metrics {
                    tracing::info!(
                        block = m.block_height,
                        block_time_ms = m.block_time_ms,
                        gas_gwei = m.gas_price_gwei,
                        txs = m.txs_in_latest_block,
                        "chain metrics"
                    );
                }
            }
            Err(ChainError::Cancelled) => break,
            Err(e) => tracing::warn!("tick failed: {}", e),
        }

        done += 1;
        if ticks.is_some_and(|limit| done >= limit) {
            break;
        }

        tokio::select! {
            _ = shutdown.cancelled() => break,
            _ = tokio::time::sleep(config.poll_interval) => {}
        }
    }
    poller.shutdown();
}

/// Cancels `token` on Ctrl-C so in-flight rpc calls return promptly.
fn cancel_on_ctrl_c(token: CancellationToken) {
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("shutdown requested");
        }
        token.cancel();
    });
}

fn indexer_client(config: &Config) -> Result<Option<IndexerClient>> {
    config
        .indexer_url
        .as_deref()
        .map(|url| {
            IndexerClient::new(url, config.indexer_network.clone(), config.rpc_timeout)
                .context("failed to build indexer client")
        })
        .transpose()
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();
}
