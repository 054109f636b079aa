use thiserror::Error;

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("stt error: {0}")]
    Stt(String),

    #[error("llm error: {0}")]
    Llm(String),

    #[error("tts error: {0}")]
    Tts(String),

    #[error("egress closed")]
    EgressClosed,
}

pub type Result<T> = std::result::Result<T, PipelineError>;

impl From<PipelineError> for voice_agent_core::Error {
    fn from(err: PipelineError) -> Self {
        voice_agent_core::Error::Pipeline(err.to_string())
    }
}

impl From<voice_agent_transport::TransportError> for PipelineError {
    fn from(_: voice_agent_transport::TransportError) -> Self {
        PipelineError::EgressClosed
    }
}
