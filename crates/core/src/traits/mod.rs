//! Core traits for pluggable backends.
//!
//! - Speech: `SpeechToText`, `TextToSpeech`, `VoiceActivityDetector`
//! - Language model: `LanguageModel`

mod llm;
mod speech;

pub use llm::{FinishReason, LanguageModel, Message, Role, StreamChunk};
pub use speech::{
    SpeechToText, TextToSpeech, TranscriptFrame, VADConfig, VADEvent, VADState,
    VoiceActivityDetector,
};
