#![allow(dead_code)]

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde_json::{json, Value};
use tokio::task::JoinHandle;

use chain_pulse::api::{app_router, AppState};
use chain_pulse::{ChainPoller, IndexerClient, PollerConfig, RpcClient};

pub const CONTRACT: &str = "0x00000000219ab540356cbb839cbe05303d7705fa";
pub const WALLET: &str = "0x1111111111111111111111111111111111111111";

#[derive(Clone)]
pub enum Reply {
    Result(Value),
    Error(i64, String),
    Status(u16),
    Garbage,
}

/// JSON-RPC node answering each method with a fixed reply.
#[derive(Clone, Default)]
pub struct MockNode {
    replies: Arc<Mutex<HashMap<String, Reply>>>,
    calls: Arc<Mutex<Vec<(String, Value)>>>,
}

impl MockNode {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reply(&self, method: &str, reply: Reply) -> &Self {
        self.replies
            .lock()
            .unwrap()
            .insert(method.to_string(), reply);
        self
    }

    pub fn result(&self, method: &str, result: Value) -> &Self {
        self.reply(method, Reply::Result(result))
    }

    /// `(method, id)` of every request received so far.
    pub fn calls(&self) -> Vec<(String, Value)> {
        self.calls.lock().unwrap().clone()
    }

    pub async fn spawn(&self) -> (String, JoinHandle<()>) {
        let app = Router::new()
            .route("/", post(rpc_handler))
            .with_state(self.clone());
        serve(app).await
    }
}

async fn rpc_handler(State(node): State<MockNode>, Json(req): Json<Value>) -> Response {
    let method = req["method"].as_str().unwrap_or_default().to_string();
    let id = req["id"].clone();
    node.calls.lock().unwrap().push((method.clone(), id.clone()));

    let reply = node.replies.lock().unwrap().get(&method).cloned();
    match reply {
        Some(Reply::Result(result)) => {
            Json(json!({"jsonrpc": "2.0", "id": id, "result": result})).into_response()
        }
        Some(Reply::Error(code, message)) => Json(json!({
            "jsonrpc": "2.0",
            "id": id,
            "error": {"code": code, "message": message}
        }))
        .into_response(),
        Some(Reply::Status(code)) => StatusCode::from_u16(code).unwrap().into_response(),
        Some(Reply::Garbage) => "<html>bad gateway</html>".into_response(),
        None => Json(json!({
            "jsonrpc": "2.0",
            "id": id,
            "error": {"code": -32601, "message": "method not found"}
        }))
        .into_response(),
    }
}

pub fn block_json(number: u64, timestamp: u64, txs: usize) -> Value {
    let hashes: Vec<String> = (0..txs).map(|i| format!("0x{:064x}", i + 1)).collect();
    json!({
        "number": format!("0x{number:x}"),
        "hash": format!("0x{:064x}", number),
        "timestamp": format!("0x{timestamp:x}"),
        "gasUsed": "0x5208",
        "gasLimit": "0x1c9c380",
        "transactions": hashes,
    })
}

pub fn tx_json(hash: &str) -> Value {
    json!({
        "hash": hash,
        "from": WALLET,
        "to": CONTRACT,
        "value": "0xde0b6b3a7640000",
        "gas": "0x5208",
        "gasPrice": "0x3b9aca00",
        "input": "0x",
        "nonce": "0x1",
        "blockNumber": "0x64",
        "blockHash": format!("0x{:064x}", 100),
        "transactionIndex": "0x0"
    })
}

/// Node with sensible answers for everything the dashboard asks.
pub fn healthy_node() -> MockNode {
    let node = MockNode::new();
    node.result("eth_blockNumber", json!("0x64"))
        .result("eth_estimateGas", json!("0x5208"))
        .result("eth_gasPrice", json!("0x3b9aca00"))
        .result("eth_getBlockByNumber", block_json(100, 1_700_000_000, 2))
        .result("eth_getBalance", json!("0xde0b6b3a7640000"))
        .result("eth_getTransactionCount", json!("0x3"))
        .result("eth_getCode", json!("0x6080604052"))
        .result("eth_getStorageAt", json!(format!("0x{:064x}", 42)))
        .result("eth_call", json!("0x0000000000000000000000000000000000000000000000000000000000000012"))
        .result("eth_getTransactionByHash", Value::Null)
        .result("eth_getTransactionReceipt", Value::Null);
    node
}

/// Indexer serving `blocks` (newest is the latest) under any network name.
pub async fn spawn_mock_indexer(blocks: Vec<Value>) -> (String, JoinHandle<()>) {
    let by_number: HashMap<u64, Value> = blocks
        .into_iter()
        .map(|b| (b["number"].as_u64().unwrap(), b))
        .collect();
    let app = Router::new()
        .route("/networks/:network/:block", get(indexer_handler))
        .with_state(Arc::new(by_number));
    serve(app).await
}

async fn indexer_handler(
    State(blocks): State<Arc<HashMap<u64, Value>>>,
    Path((_network, block)): Path<(String, String)>,
) -> Response {
    let number = if block == "latest" {
        blocks.keys().max().copied()
    } else {
        block.parse::<u64>().ok()
    };
    match number.and_then(|n| blocks.get(&n)) {
        Some(b) => Json(b.clone()).into_response(),
        None => StatusCode::NOT_FOUND.into_response(),
    }
}

async fn serve(app: Router) -> (String, JoinHandle<()>) {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr: SocketAddr = listener.local_addr().unwrap();
    let base_url = format!("http://{}", addr);
    let server = axum::serve(listener, app);
    let handle = tokio::spawn(async move {
        let _ = server.await;
    });
    (base_url, handle)
}

pub struct TestApp {
    pub base_url: String,
    pub poller: Arc<ChainPoller>,
    handles: Vec<JoinHandle<()>>,
}

impl TestApp {
    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }
}

impl Drop for TestApp {
    fn drop(&mut self) {
        self.poller.shutdown();
        for handle in &self.handles {
            handle.abort();
        }
    }
}

/// Dashboard API in front of `node` (and an indexer when given). The poller
/// is not started; tests drive it through `/refetch`.
pub async fn spawn_app(node: &MockNode, indexer_blocks: Option<Vec<Value>>) -> TestApp {
    let (rpc_url, node_handle) = node.spawn().await;
    let mut handles = vec![node_handle];

    let indexer = match indexer_blocks {
        Some(blocks) => {
            let (indexer_url, indexer_handle) = spawn_mock_indexer(blocks).await;
            handles.push(indexer_handle);
            Some(IndexerClient::new(&indexer_url, "mainnet", None).unwrap())
        }
        None => None,
    };

    let client = RpcClient::http(&rpc_url, None).unwrap();
    let poller = Arc::new(ChainPoller::new(client.clone(), PollerConfig::default()));
    let state = AppState {
        client,
        poller: poller.clone(),
        indexer,
        scan_blocks: 10,
    };

    let (base_url, app_handle) = serve(app_router(state)).await;
    handles.push(app_handle);

    TestApp {
        base_url,
        poller,
        handles,
    }
}
