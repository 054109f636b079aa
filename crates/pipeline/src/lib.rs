//! Waterfall pipeline orchestrator: one `VoicePipeline` per connection,
//! coordinating STT, streaming LLM generation, and TTS with clause-level
//! audio dispatch and barge-in handling.

pub mod clause;
pub mod error;
pub mod keywords;
pub mod orchestrator;

pub use error::{PipelineError, Result};
pub use orchestrator::{InterruptReason, PipelineConfig, PipelineMetrics, VoicePipeline};
