use thiserror::Error;

#[derive(Error, Debug)]
pub enum ClientError {
    #[error("no default input device")]
    NoInputDevice,

    #[error("no default output device")]
    NoOutputDevice,

    #[error("audio stream error: {0}")]
    Stream(String),

    #[error("websocket connect failed: {0}")]
    Connect(String),

    #[error("websocket closed")]
    Closed,

    #[error("control frame decode error: {0}")]
    Decode(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, ClientError>;
