//! In-process transport with scripted per-method outcomes for unit tests.

use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;

use async_trait::async_trait;
use serde_json::Value;

use crate::error::{ChainError, ChainResult};
use crate::rpc::transport::{JsonRpcRequest, JsonRpcResponse, Transport};

#[derive(Clone)]
enum Outcome {
    Reply(JsonRpcResponse),
    Fail(ChainError),
    Hang,
}

/// Each method holds a queue of outcomes; the last one repeats once the queue
/// is down to a single entry.
#[derive(Default)]
pub(crate) struct ScriptedTransport {
    script: Mutex<HashMap<String, VecDeque<Outcome>>>,
    log: Mutex<Vec<JsonRpcRequest>>,
}

impl ScriptedTransport {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    fn push(&self, method: &str, outcome: Outcome) {
        self.script
            .lock()
            .unwrap()
            .entry(method.to_string())
            .or_default()
            .push_back(outcome);
    }

    pub(crate) fn respond(&self, method: &str, result: Value) {
        self.push(method, Outcome::Reply(JsonRpcResponse::success(result)));
    }

    pub(crate) fn fail_rpc(&self, method: &str, code: i64, message: &str) {
        self.push(method, Outcome::Reply(JsonRpcResponse::failure(code, message)));
    }

    pub(crate) fn fail_transport(&self, method: &str) {
        self.push(
            method,
            Outcome::Fail(ChainError::Transport(format!("{method} unreachable"))),
        );
    }

    pub(crate) fn hang(&self, method: &str) {
        self.push(method, Outcome::Hang);
    }

    /// Drops everything scripted for `method`.
    pub(crate) fn clear(&self, method: &str) {
        self.script.lock().unwrap().remove(method);
    }

    pub(crate) fn requests(&self) -> Vec<JsonRpcRequest> {
        self.log.lock().unwrap().clone()
    }

    pub(crate) fn count(&self, method: &str) -> usize {
        self.log
            .lock()
            .unwrap()
            .iter()
            .filter(|r| r.method == method)
            .count()
    }

    fn next_outcome(&self, method: &str) -> Option<Outcome> {
        let mut script = self.script.lock().unwrap();
        let queue = script.get_mut(method)?;
        if queue.len() > 1 {
            queue.pop_front()
        } else {
            queue.front().cloned()
        }
    }
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn send(&self, request: &JsonRpcRequest) -> ChainResult<JsonRpcResponse> {
        self.log.lock().unwrap().push(request.clone());
        match self.next_outcome(&request.method) {
            Some(Outcome::Reply(response)) => Ok(response),
            Some(Outcome::Fail(err)) => Err(err),
            Some(Outcome::Hang) => std::future::pending().await,
            None => Ok(JsonRpcResponse::failure(
                -32601,
                format!("method {} not scripted", request.method),
            )),
        }
    }
}
