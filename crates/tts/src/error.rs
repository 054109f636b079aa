use thiserror::Error;

#[derive(Error, Debug)]
pub enum TtsError {
    #[error("tts process failed: {0}")]
    Process(String),

    #[error("tts io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("tts model error: {0}")]
    Model(String),
}

pub type Result<T> = std::result::Result<T, TtsError>;

impl From<TtsError> for voice_agent_core::Error {
    fn from(err: TtsError) -> Self {
        voice_agent_core::Error::Tts(err.to_string())
    }
}
