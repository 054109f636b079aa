use thiserror::Error;

#[derive(Error, Debug)]
pub enum SupervisorError {
    #[error("llm executable not found: {0}")]
    ExecutableNotFound(String),

    #[error("llm model not found: {0}")]
    ModelNotFound(String),

    #[error("llm process exited immediately after start: model file not found ({0})")]
    ImmediateExitFileMissing(String),

    #[error("llm process exited immediately after start: split model part missing ({0})")]
    ImmediateExitSplitFileMissing(String),

    #[error("llm process exited immediately after start: {0}")]
    ImmediateExit(String),

    #[error("llm process spawn failed: {0}")]
    Spawn(#[from] std::io::Error),

    #[error("max restart attempts ({0}) reached")]
    MaxRestartsReached(u32),
}

pub type Result<T> = std::result::Result<T, SupervisorError>;

impl From<SupervisorError> for voice_agent_core::Error {
    fn from(err: SupervisorError) -> Self {
        voice_agent_core::Error::Supervisor(err.to_string())
    }
}
