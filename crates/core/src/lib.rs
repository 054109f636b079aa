//! Core traits and types shared across the voice agent workspace:
//! audio frames, control-frame schema, conversation history, transcripts,
//! and the pluggable-backend traits (STT, TTS, VAD, LLM).

pub mod audio;
pub mod control;
pub mod conversation;
pub mod error;
pub mod traits;
pub mod transcript;

pub use audio::{AudioBuffer, AudioEncoding, AudioFrame, Channels, SampleRate};
pub use control::ControlFrame;
pub use conversation::{ConversationHistory, Turn, TurnRole};
pub use error::{Error, Result};
pub use traits::{
    FinishReason, LanguageModel, Message, Role, SpeechToText, StreamChunk, TextToSpeech,
    TranscriptFrame, VADConfig, VADEvent, VADState, VoiceActivityDetector,
};
pub use transcript::{TranscriptResult, WordTimestamp};
