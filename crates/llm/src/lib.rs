//! Streaming chat-completion client and session persistence for the
//! shared local LLM server.

pub mod client;
pub mod error;
pub mod session;

pub use client::LlmClient;
pub use error::{LlmError, Result};
pub use session::{load_session, save_session};
