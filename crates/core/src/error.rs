//! Crate-wide error type
//!
//! Each crate in the workspace owns a `thiserror`-derived error enum scoped to
//! its own domain and converts into this umbrella type at API boundaries where
//! call sites (the per-connection supervisor, the pipeline orchestrator) need
//! to handle errors from several subsystems uniformly.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    #[error("segmenter error: {0}")]
    Segmenter(String),

    #[error("speech-to-text error: {0}")]
    Stt(String),

    #[error("text-to-speech error: {0}")]
    Tts(String),

    #[error("llm error: {0}")]
    Llm(String),

    #[error("transport error: {0}")]
    Transport(String),

    #[error("pipeline error: {0}")]
    Pipeline(String),

    #[error("subprocess supervisor error: {0}")]
    Supervisor(String),

    #[error("configuration error: {0}")]
    Configuration(String),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}
