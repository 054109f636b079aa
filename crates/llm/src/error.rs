use thiserror::Error;

#[derive(Error, Debug)]
pub enum LlmError {
    #[error("llm connection failed: {0}")]
    Connect(String),

    #[error("llm http status error: {0}")]
    Status(String),

    #[error("llm response decode error: {0}")]
    Decode(String),

    #[error("session io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("session decode error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, LlmError>;

impl From<LlmError> for voice_agent_core::Error {
    fn from(err: LlmError) -> Self {
        voice_agent_core::Error::Llm(err.to_string())
    }
}
