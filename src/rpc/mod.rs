//! Ethereum JSON-RPC client: envelope handling, transport abstraction and
//! typed wrappers for the methods the dashboard relies on.

pub mod client;
#[cfg(test)]
pub(crate) mod mock;
pub mod transport;

pub use client::{BlockTag, RpcClient};
pub use transport::{HttpTransport, JsonRpcErrorObject, JsonRpcRequest, JsonRpcResponse, Transport};
