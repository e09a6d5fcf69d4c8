use std::sync::Arc;

use anyhow::Result;
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;

use crate::error::ChainError;
use crate::indexer::IndexerClient;
use crate::lookup;
use crate::models::{
    AddressActivity, AddressSummary, BlockSummary, ContractInfo, LeaderboardEntry, PortfolioEntry,
    TransactionDetail,
};
use crate::poll_stats::PollSnapshot;
use crate::poller::{ChainPoller, PollerState};
use crate::rpc::RpcClient;
use crate::units::{is_address, is_tx_hash};

const MAX_SCAN_BLOCKS: u64 = 100;
const DEFAULT_LEADERBOARD_LIMIT: usize = 10;
const MAX_PORTFOLIO_ADDRESSES: usize = 50;

#[derive(Clone)]
pub struct AppState {
    pub client: RpcClient,
    pub poller: Arc<ChainPoller>,
    pub indexer: Option<IndexerClient>,
    pub scan_blocks: u64,
}

#[derive(Debug)]
pub enum ApiError {
    BadRequest(String),
    IndexerDisabled,
    Chain(ChainError),
}

impl From<ChainError> for ApiError {
    fn from(e: ChainError) -> Self {
        Self::Chain(e)
    }
}

#[derive(Serialize)]
struct ErrorBody {
    error: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            ApiError::IndexerDisabled => (
                StatusCode::SERVICE_UNAVAILABLE,
                "indexer is not configured".to_string(),
            ),
            ApiError::Chain(e) => {
                let status = match e {
                    ChainError::NotFound(_) => StatusCode::NOT_FOUND,
                    ChainError::Cancelled => StatusCode::SERVICE_UNAVAILABLE,
                    _ => StatusCode::BAD_GATEWAY,
                };
                (status, e.to_string())
            }
        };
        if status.is_server_error() {
            tracing::warn!(status = %status, error = %message, "request failed");
        }
        (status, Json(ErrorBody { error: message })).into_response()
    }
}

type ApiResult<T> = std::result::Result<Json<T>, ApiError>;

fn require_address(address: &str) -> std::result::Result<(), ApiError> {
    if is_address(address) {
        Ok(())
    } else {
        Err(ApiError::BadRequest(format!("invalid address {address:?}")))
    }
}

fn require_hex_data(value: &str, what: &str) -> std::result::Result<(), ApiError> {
    let valid = value
        .strip_prefix("0x")
        .map(|digits| digits.chars().all(|c| c.is_ascii_hexdigit()))
        .unwrap_or(false);
    if valid {
        Ok(())
    } else {
        Err(ApiError::BadRequest(format!("invalid {what} {value:?}")))
    }
}

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
}

async fn health() -> Json<HealthResponse> {
    Json(HealthResponse { status: "ok" })
}

async fn dashboard(State(state): State<AppState>) -> Json<PollerState> {
    Json(state.poller.state())
}

async fn blocks(State(state): State<AppState>) -> Json<Vec<BlockSummary>> {
    Json(state.poller.state().blocks)
}

async fn refetch(State(state): State<AppState>) -> ApiResult<PollerState> {
    match state.poller.refetch().await {
        Ok(fresh) => Ok(Json(fresh)),
        Err(ChainError::Cancelled) => Err(ChainError::Cancelled.into()),
        // The tick error is already recorded in the state next to the stale values.
        Err(_) => Ok(Json(state.poller.state())),
    }
}

async fn stats(State(state): State<AppState>) -> Json<PollSnapshot> {
    Json(state.poller.stats())
}

#[derive(Deserialize)]
struct PortfolioQuery {
    addresses: String,
}

async fn portfolio(
    State(state): State<AppState>,
    Query(query): Query<PortfolioQuery>,
) -> ApiResult<Vec<PortfolioEntry>> {
    let addresses: Vec<String> = query
        .addresses
        .split(',')
        .map(|s| s.trim().to_lowercase())
        .filter(|s| !s.is_empty())
        .collect();
    if addresses.is_empty() {
        return Err(ApiError::BadRequest("no addresses given".to_string()));
    }
    if addresses.len() > MAX_PORTFOLIO_ADDRESSES {
        return Err(ApiError::BadRequest(format!(
            "at most {MAX_PORTFOLIO_ADDRESSES} addresses per request"
        )));
    }
    for address in &addresses {
        require_address(address)?;
    }
    Ok(Json(lookup::portfolio(&state.client, &addresses).await))
}

async fn address(
    State(state): State<AppState>,
    Path(address): Path<String>,
) -> ApiResult<AddressSummary> {
    require_address(&address)?;
    Ok(Json(lookup::address_summary(&state.client, &address).await?))
}

#[derive(Deserialize)]
struct ScanQuery {
    blocks: Option<u64>,
    limit: Option<usize>,
}

impl ScanQuery {
    fn depth(&self, default: u64) -> u64 {
        self.blocks.unwrap_or(default).clamp(1, MAX_SCAN_BLOCKS)
    }
}

async fn address_history(
    State(state): State<AppState>,
    Path(address): Path<String>,
    Query(query): Query<ScanQuery>,
) -> ApiResult<Vec<AddressActivity>> {
    require_address(&address)?;
    let indexer = state.indexer.as_ref().ok_or(ApiError::IndexerDisabled)?;
    let depth = query.depth(state.scan_blocks);
    Ok(Json(indexer.address_history(&address, depth).await?))
}

async fn leaderboard(
    State(state): State<AppState>,
    Query(query): Query<ScanQuery>,
) -> ApiResult<Vec<LeaderboardEntry>> {
    let indexer = state.indexer.as_ref().ok_or(ApiError::IndexerDisabled)?;
    let depth = query.depth(state.scan_blocks);
    let limit = query.limit.unwrap_or(DEFAULT_LEADERBOARD_LIMIT);
    Ok(Json(indexer.leaderboard(depth, limit).await?))
}

async fn transaction(
    State(state): State<AppState>,
    Path(hash): Path<String>,
) -> ApiResult<TransactionDetail> {
    if !is_tx_hash(&hash) {
        return Err(ApiError::BadRequest(format!("invalid transaction hash {hash:?}")));
    }
    Ok(Json(lookup::transaction_detail(&state.client, &hash).await?))
}

#[derive(Deserialize)]
struct SlotQuery {
    slot: Option<String>,
}

async fn contract(
    State(state): State<AppState>,
    Path(address): Path<String>,
    Query(query): Query<SlotQuery>,
) -> ApiResult<ContractInfo> {
    require_address(&address)?;
    if let Some(slot) = &query.slot {
        require_hex_data(slot, "storage slot")?;
    }
    let info = lookup::contract_info(&state.client, &address, query.slot.as_deref()).await?;
    Ok(Json(info))
}

#[derive(Deserialize)]
struct CallBody {
    data: String,
}

#[derive(Serialize)]
struct CallResponse {
    result: String,
}

async fn contract_call(
    State(state): State<AppState>,
    Path(address): Path<String>,
    Json(body): Json<CallBody>,
) -> ApiResult<CallResponse> {
    require_address(&address)?;
    require_hex_data(&body.data, "call data")?;
    let result = lookup::contract_call(&state.client, &address, &body.data).await?;
    Ok(Json(CallResponse { result }))
}

async fn not_found() -> Response {
    ApiError::Chain(ChainError::NotFound("route".to_string())).into_response()
}

pub fn app_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(dashboard))
        .route("/health", get(health))
        .route("/blocks", get(blocks))
        .route("/refetch", post(refetch))
        .route("/stats", get(stats))
        .route("/portfolio", get(portfolio))
        .route("/address/:address", get(address))
        .route("/address/:address/history", get(address_history))
        .route("/tx/:hash", get(transaction))
        .route("/contract/:address", get(contract))
        .route("/contract/:address/call", post(contract_call))
        .route("/leaderboard", get(leaderboard))
        .fallback(not_found)
        .with_state(state)
}

pub async fn run_http_server(addr: &str, state: AppState, shutdown: CancellationToken) -> Result<()> {
    let app = app_router(state);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!("HTTP server listening on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(async move { shutdown.cancelled().await })
        .await?;
    Ok(())
}
