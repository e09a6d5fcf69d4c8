use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use url::Url;

use crate::error::{ChainError, ChainResult};

#[derive(Debug, Clone, Serialize)]
pub struct JsonRpcRequest {
    pub jsonrpc: &'static str,
    pub method: String,
    pub params: Value,
    pub id: u64,
}

impl JsonRpcRequest {
    pub fn new(method: impl Into<String>, params: Value, id: u64) -> Self {
        Self {
            jsonrpc: "2.0",
            method: method.into(),
            params,
            id,
        }
    }
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct JsonRpcErrorObject {
    pub code: i64,
    pub message: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct JsonRpcResponse {
    #[serde(default)]
    pub id: Option<Value>,
    #[serde(default)]
    pub result: Option<Value>,
    #[serde(default)]
    pub error: Option<JsonRpcErrorObject>,
}

impl JsonRpcResponse {
    pub fn success(result: Value) -> Self {
        Self {
            id: None,
            result: Some(result),
            error: None,
        }
    }

    pub fn failure(code: i64, message: impl Into<String>) -> Self {
        Self {
            id: None,
            result: None,
            error: Some(JsonRpcErrorObject {
                code,
                message: message.into(),
            }),
        }
    }

    /// Unwraps the envelope: an `error` member wins over `result`, and a
    /// missing `result` is reported as JSON `null`.
    pub fn into_result(self) -> ChainResult<Value> {
        if let Some(err) = self.error {
            return Err(ChainError::Rpc {
                code: err.code,
                message: err.message,
            });
        }
        Ok(self.result.unwrap_or(Value::Null))
    }
}

/// Moves one JSON-RPC request to the endpoint and back.
///
/// Implementations report HTTP-level failures as [`ChainError::Transport`] and
/// undecodable bodies as [`ChainError::Parse`]; JSON-RPC error envelopes are
/// returned as-is and unwrapped by the client.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(&self, request: &JsonRpcRequest) -> ChainResult<JsonRpcResponse>;
}

#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: reqwest::Client,
    url: Url,
}

impl HttpTransport {
    pub fn new(rpc_url: &str, timeout: Option<Duration>) -> ChainResult<Self> {
        let url = Url::parse(rpc_url)
            .map_err(|e| ChainError::Transport(format!("invalid rpc url {rpc_url:?}: {e}")))?;
        let mut builder = reqwest::Client::builder().no_proxy();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder
            .build()
            .map_err(|e| ChainError::Transport(format!("failed to build reqwest client: {e}")))?;
        Ok(Self { client, url })
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn send(&self, request: &JsonRpcRequest) -> ChainResult<JsonRpcResponse> {
        let response = self
            .client
            .post(self.url.clone())
            .json(request)
            .send()
            .await
            .map_err(|e| ChainError::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(ChainError::Transport(format!(
                "{} returned http status {}",
                request.method, status
            )));
        }

        let body = response
            .bytes()
            .await
            .map_err(|e| ChainError::Transport(e.to_string()))?;
        serde_json::from_slice(&body).map_err(|e| {
            ChainError::Parse(format!("{} returned a malformed envelope: {e}", request.method))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn request_envelope_shape() {
        let req = JsonRpcRequest::new("eth_blockNumber", json!([]), 7);
        assert_eq!(
            serde_json::to_value(&req).unwrap(),
            json!({"jsonrpc": "2.0", "method": "eth_blockNumber", "params": [], "id": 7})
        );
    }

    #[test]
    fn error_member_becomes_rpc_error() {
        let resp: JsonRpcResponse = serde_json::from_value(json!({
            "jsonrpc": "2.0",
            "id": 1,
            "error": {"code": -32000, "message": "execution reverted"}
        }))
        .unwrap();
        assert_eq!(
            resp.into_result(),
            Err(ChainError::Rpc {
                code: -32000,
                message: "execution reverted".to_string()
            })
        );
    }

    #[test]
    fn null_result_is_preserved() {
        let resp: JsonRpcResponse =
            serde_json::from_value(json!({"jsonrpc": "2.0", "id": 1, "result": null})).unwrap();
        assert_eq!(resp.into_result().unwrap(), Value::Null);
    }

    #[test]
    fn rejects_invalid_url() {
        assert!(matches!(
            HttpTransport::new("not a url", None),
            Err(ChainError::Transport(_))
        ));
    }
}
