#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum ChainError {
    #[error("transport error: {0}")]
    Transport(String),

    #[error("rpc error {code}: {message}")]
    Rpc { code: i64, message: String },

    #[error("{0} not found")]
    NotFound(String),

    #[error("parse error: {0}")]
    Parse(String),

    #[error("request cancelled")]
    Cancelled,
}

impl From<reqwest::Error> for ChainError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_decode() {
            Self::Parse(e.to_string())
        } else {
            Self::Transport(e.to_string())
        }
    }
}

impl From<serde_json::Error> for ChainError {
    fn from(e: serde_json::Error) -> Self {
        Self::Parse(e.to_string())
    }
}

pub type ChainResult<T> = Result<T, ChainError>;
