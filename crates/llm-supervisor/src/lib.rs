//! Lifecycle management for the local LLM server subprocess.

pub mod error;
pub mod supervisor;

pub use error::{Result, SupervisorError};
pub use supervisor::LlmSupervisor;
