use thiserror::Error;

#[derive(Error, Debug)]
pub enum ServerError {
    #[error("websocket error: {0}")]
    WebSocket(String),

    #[error("pipeline error: {0}")]
    Pipeline(#[from] voice_agent_pipeline::PipelineError),

    #[error("transport error: {0}")]
    Transport(#[from] voice_agent_transport::TransportError),
}

pub type Result<T> = std::result::Result<T, ServerError>;
