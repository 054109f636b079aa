use thiserror::Error;

#[derive(Error, Debug)]
pub enum SttError {
    #[error("stt process failed: {0}")]
    Process(String),

    #[error("stt scratch io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("stt response decode error: {0}")]
    Decode(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, SttError>;

impl From<SttError> for voice_agent_core::Error {
    fn from(err: SttError) -> Self {
        voice_agent_core::Error::Stt(err.to_string())
    }
}
