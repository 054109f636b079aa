//! Speech-to-text transcript types

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// A word with its timing within the source audio
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WordTimestamp {
    pub word: String,
    pub start_ms: u64,
    pub end_ms: u64,
    #[serde(default)]
    pub confidence: f32,
}

/// Result of running STT on one utterance or audio frame
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TranscriptResult {
    pub text: String,
    pub confidence: f32,
    pub is_final: bool,
    #[serde(default)]
    pub words: Vec<WordTimestamp>,
    /// Duration of the source audio, in milliseconds
    #[serde(default)]
    pub audio_duration_ms: u64,
    /// Wall-clock time spent inside the STT backend, in milliseconds
    #[serde(default)]
    pub stt_latency_ms: u64,
}

impl TranscriptResult {
    pub fn new(text: impl Into<String>, confidence: f32) -> Self {
        Self {
            text: text.into(),
            confidence,
            is_final: true,
            words: Vec::new(),
            audio_duration_ms: 0,
            stt_latency_ms: 0,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.text.trim().is_empty()
    }

    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.stt_latency_ms = latency.as_millis() as u64;
        self
    }
}
