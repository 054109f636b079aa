//! Configuration surface for the voice agent.
//!
//! Layered loading: `config/default.{toml,yaml,json}`, an optional
//! environment-specific overlay (`config/{environment}.*`), then
//! `VOICE_AGENT__*` environment variables (double underscore separates
//! nesting, e.g. `VOICE_AGENT__SERVER__PORT`).

pub mod settings;

pub use settings::{
    load_settings, AudioConfig, CloudFallbackConfig, LlmConfig, LlmSupervisorConfig,
    ObservabilityConfig, RuntimeEnvironment, SegmenterConfig, ServerConfig, Settings, SttConfig,
    TtsConfig, TtsProvider,
};

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Configuration file not found: {0}")]
    FileNotFound(String),

    #[error("Failed to parse configuration: {0}")]
    ParseError(String),

    #[error("Missing required field: {0}")]
    MissingField(String),

    #[error("Invalid value for {field}: {message}")]
    InvalidValue { field: String, message: String },

    #[error("Environment error: {0}")]
    Environment(String),
}

impl From<config::ConfigError> for ConfigError {
    fn from(err: config::ConfigError) -> Self {
        ConfigError::ParseError(err.to_string())
    }
}
