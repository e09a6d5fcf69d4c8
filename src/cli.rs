use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(name = "chain-pulse", version, about = "Live Ethereum chain dashboard backend")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the poller and the HTTP dashboard API
    Serve {
        /// Override bind address, e.g. 0.0.0.0:8080
        #[arg(long)]
        addr: Option<String>,
    },
    /// Poll the chain and log metrics on every tick
    Watch {
        /// Stop after this many ticks (runs until Ctrl-C when omitted)
        #[arg(long)]
        ticks: Option<u64>,
    },
    /// Show balance, nonce and account kind of an address
    Balance { address: String },
    /// Show a transaction and its receipt
    Tx { hash: String },
    /// Show contract bytecode, optionally reading one storage slot
    Code {
        address: String,
        #[arg(long)]
        slot: Option<String>,
    },
    /// Top senders over the last N indexed blocks
    Leaderboard {
        #[arg(long)]
        blocks: Option<u64>,
        #[arg(long, default_value_t = 10)]
        limit: usize,
    },
    /// Transactions touching an address over the last N indexed blocks
    History {
        address: String,
        #[arg(long)]
        blocks: Option<u64>,
    },
}
