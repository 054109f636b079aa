//! Speech processing traits: STT, TTS, and voice-activity detection.

use crate::transcript::TranscriptResult;
use crate::{AudioFrame, Result};
use async_trait::async_trait;
use futures::Stream;
use std::pin::Pin;

pub type TranscriptFrame = TranscriptResult;

/// Speech-to-Text interface.
///
/// Implementations wrap a concrete backend (subprocess CLI, in-process
/// model, or an HTTP STT endpoint); this crate only depends on the trait.
#[async_trait]
pub trait SpeechToText: Send + Sync + 'static {
    /// Transcribe a single utterance's audio.
    async fn transcribe(&self, audio: &AudioFrame) -> Result<TranscriptFrame>;

    /// Stream transcription as audio arrives. Partial transcripts have
    /// `is_final = false`; the stream ends after the final transcript.
    fn transcribe_stream<'a>(
        &'a self,
        audio_stream: Pin<Box<dyn Stream<Item = AudioFrame> + Send + 'a>>,
    ) -> Pin<Box<dyn Stream<Item = Result<TranscriptFrame>> + Send + 'a>>;

    /// Model name for logging.
    fn model_name(&self) -> &str;
}

/// Text-to-Speech interface.
///
/// Two concrete shapes exist in this repository: a subprocess-per-call
/// synth and an in-process neural synth sharing one loaded model.
#[async_trait]
pub trait TextToSpeech: Send + Sync + 'static {
    /// Synthesize text to audio. Empty or whitespace-only input returns
    /// `Ok(None)` rather than an error.
    async fn synthesize(&self, text: &str) -> Result<Option<AudioFrame>>;

    /// Sample rate this backend publishes audio at.
    fn sample_rate(&self) -> crate::SampleRate;

    /// Model/voice name for logging.
    fn name(&self) -> &str;
}

/// Configuration for voice activity detection.
#[derive(Debug, Clone)]
pub struct VADConfig {
    /// Base speech-probability threshold (0.0-1.0). Multiplied by
    /// `tts_active_multiplier` while assistant speech is playing.
    pub threshold: f32,
    /// Multiplier applied to `threshold` while TTS audio is playing, to
    /// suppress self-echo. Clamped so the effective threshold never exceeds
    /// `max_threshold`.
    pub tts_active_multiplier: f32,
    pub max_threshold: f32,
    pub min_speech_duration_ms: u32,
    pub min_silence_duration_ms: u32,
    pub energy_floor_db: f32,
    pub pre_speech_padding_ms: u32,
}

impl Default for VADConfig {
    fn default() -> Self {
        Self {
            threshold: 0.5,
            tts_active_multiplier: 1.5,
            max_threshold: 0.9,
            min_speech_duration_ms: 0,
            min_silence_duration_ms: 320,
            energy_floor_db: -50.0,
            pre_speech_padding_ms: 500,
        }
    }
}

impl VADConfig {
    /// Effective threshold given whether assistant speech is currently
    /// playing.
    pub fn effective_threshold(&self, tts_active: bool) -> f32 {
        if tts_active {
            (self.threshold * self.tts_active_multiplier).min(self.max_threshold)
        } else {
            self.threshold
        }
    }
}

/// Voice-activity-detection events.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum VADEvent {
    SpeechStart,
    SpeechContinue { probability: f32 },
    SpeechEnd,
    Silence,
}

impl VADEvent {
    pub fn is_speech(&self) -> bool {
        matches!(self, Self::SpeechStart | Self::SpeechContinue { .. })
    }

    pub fn probability(&self) -> Option<f32> {
        match self {
            Self::SpeechContinue { probability } => Some(*probability),
            _ => None,
        }
    }
}

/// Utterance-segmenter state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum VADState {
    #[default]
    Idle,
    Speech,
    SilenceAfterSpeech,
}

/// Voice Activity Detector interface.
///
/// A fixed-window neural model (e.g. Silero-style, via ONNX) and an
/// energy-threshold fallback both implement this trait; the segmenter is
/// generic over it.
#[async_trait]
pub trait VoiceActivityDetector: Send + Sync + 'static {
    /// Speech probability for exactly one window of
    /// `recommended_frame_size()` samples.
    async fn speech_probability(&self, window: &[f32]) -> Result<f32>;

    /// Samples required per call to `speech_probability`.
    fn recommended_frame_size(&self) -> usize {
        512
    }

    /// Model info for logging.
    fn model_info(&self) -> &str;
}

#[cfg(test)]
mod tests {
    use super::*;

    struct MockStt;

    #[async_trait]
    impl SpeechToText for MockStt {
        async fn transcribe(&self, _audio: &AudioFrame) -> Result<TranscriptFrame> {
            Ok(TranscriptResult::new("test transcription", 0.95))
        }

        fn transcribe_stream<'a>(
            &'a self,
            _audio_stream: Pin<Box<dyn Stream<Item = AudioFrame> + Send + 'a>>,
        ) -> Pin<Box<dyn Stream<Item = Result<TranscriptFrame>> + Send + 'a>> {
            Box::pin(futures::stream::empty())
        }

        fn model_name(&self) -> &str {
            "mock-stt"
        }
    }

    #[tokio::test]
    async fn test_mock_stt_transcribe() {
        let stt = MockStt;
        let frame = AudioFrame::new(vec![0.0; 160], crate::SampleRate::Hz16000, crate::Channels::Mono, 0);
        let result = stt.transcribe(&frame).await.unwrap();
        assert_eq!(result.text, "test transcription");
    }

    #[test]
    fn test_vad_config_effective_threshold_clamped() {
        let config = VADConfig {
            threshold: 0.7,
            tts_active_multiplier: 2.0,
            max_threshold: 0.9,
            ..VADConfig::default()
        };
        assert_eq!(config.effective_threshold(false), 0.7);
        assert_eq!(config.effective_threshold(true), 0.9);
    }
}
