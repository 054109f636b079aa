use thiserror::Error;

#[derive(Error, Debug)]
pub enum SegmenterError {
    #[error("vad model error: {0}")]
    Model(String),

    #[error("vad inference failed: {0}")]
    Inference(String),
}

pub type Result<T> = std::result::Result<T, SegmenterError>;

impl From<SegmenterError> for voice_agent_core::Error {
    fn from(err: SegmenterError) -> Self {
        voice_agent_core::Error::Segmenter(err.to_string())
    }
}
