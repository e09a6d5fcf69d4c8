pub mod api;
pub mod config;
pub mod error;
pub mod indexer;
pub mod lookup;
pub mod models;
pub mod poll_stats;
pub mod poller;
pub mod rpc;
pub mod units;
pub mod window;

pub use error::{ChainError, ChainResult};
pub use indexer::IndexerClient;
pub use poller::{ChainPoller, PollerConfig, PollerState, PollerStatus};
pub use rpc::{BlockTag, RpcClient};
pub use window::BlockWindow;
