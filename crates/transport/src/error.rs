use thiserror::Error;

#[derive(Error, Debug)]
pub enum TransportError {
    #[error("channel closed")]
    Closed,

    #[error("control frame decode error: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("send failed: {0}")]
    Send(String),
}

pub type Result<T> = std::result::Result<T, TransportError>;
