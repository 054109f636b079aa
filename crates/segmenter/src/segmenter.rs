//! Utterance segmenter: converts a continuous PCM stream into discrete,
//! bounded utterances with pre-roll and echo-suppressed threshold inflation.

use std::sync::Arc;

use voice_agent_config::SegmenterConfig;
use voice_agent_core::traits::{VADState, VoiceActivityDetector};

use crate::error::{Result, SegmenterError};

pub struct UtteranceSegmenter {
    vad: Arc<dyn VoiceActivityDetector>,
    config: SegmenterConfig,
    sample_rate: u32,
    window_size: usize,

    state: VADState,
    streaming_buffer: Vec<f32>,
    utterance_buffer: Vec<f32>,
    silence_frame_counter: usize,

    pre_roll_samples: usize,
    silence_frames_required: usize,
    min_utterance_samples: usize,
    max_utterance_samples: usize,
}

impl UtteranceSegmenter {
    pub fn new(vad: Arc<dyn VoiceActivityDetector>, config: SegmenterConfig, sample_rate: u32) -> Self {
        let window_size = vad.recommended_frame_size();
        let window_ms = (window_size as f32 * 1000.0) / sample_rate as f32;

        let pre_roll_samples = (config.pre_roll_ms as f32 / 1000.0 * sample_rate as f32) as usize;
        let silence_frames_required =
            ((config.silence_frames_required_ms as f32 / window_ms).ceil() as usize).max(1);
        let min_utterance_samples = (config.min_utterance_seconds * sample_rate as f32) as usize;
        let max_utterance_samples = (config.max_utterance_seconds * sample_rate as f32) as usize;

        Self {
            vad,
            config,
            sample_rate,
            window_size,
            state: VADState::Idle,
            streaming_buffer: Vec::with_capacity(window_size * 4),
            utterance_buffer: Vec::new(),
            silence_frame_counter: 0,
            pre_roll_samples,
            silence_frames_required,
            min_utterance_samples,
            max_utterance_samples,
        }
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    fn effective_threshold(&self, tts_active: bool) -> f32 {
        if tts_active {
            (self.config.threshold * self.config.tts_active_multiplier).min(self.config.max_threshold)
        } else {
            self.config.threshold
        }
    }

    fn trim_pre_roll(&mut self) {
        if self.utterance_buffer.len() > self.pre_roll_samples {
            let excess = self.utterance_buffer.len() - self.pre_roll_samples;
            self.utterance_buffer.drain(0..excess);
        }
    }

    fn finalize(&mut self) -> Vec<f32> {
        let utterance = std::mem::take(&mut self.utterance_buffer);
        self.state = VADState::Idle;
        self.silence_frame_counter = 0;
        utterance
    }

    fn discard(&mut self) {
        self.utterance_buffer.clear();
        self.state = VADState::Idle;
        self.silence_frame_counter = 0;
    }

    /// Feed an arbitrarily-sized chunk of new samples. Returns at most one
    /// finalized utterance per call; any remaining complete windows stay
    /// queued in the streaming buffer for the next call.
    pub async fn push(&mut self, chunk: &[f32], tts_active: bool) -> Result<Option<Vec<f32>>> {
        self.streaming_buffer.extend_from_slice(chunk);
        let threshold = self.effective_threshold(tts_active);

        while self.streaming_buffer.len() >= self.window_size {
            let window: Vec<f32> = self.streaming_buffer.drain(0..self.window_size).collect();

            let probability = self
                .vad
                .speech_probability(&window)
                .await
                .map_err(|e| SegmenterError::Inference(e.to_string()))?;
            let is_speech = probability >= threshold;

            match self.state {
                VADState::Idle => {
                    self.utterance_buffer.extend_from_slice(&window);
                    self.trim_pre_roll();
                    if is_speech {
                        self.state = VADState::Speech;
                        self.silence_frame_counter = 0;
                    }
                }
                VADState::Speech => {
                    self.utterance_buffer.extend_from_slice(&window);
                    if is_speech {
                        self.silence_frame_counter = 0;
                    } else {
                        self.state = VADState::SilenceAfterSpeech;
                        self.silence_frame_counter = 1;
                    }
                    if self.utterance_buffer.len() >= self.max_utterance_samples {
                        return Ok(Some(self.finalize()));
                    }
                }
                VADState::SilenceAfterSpeech => {
                    self.utterance_buffer.extend_from_slice(&window);
                    if is_speech {
                        self.state = VADState::Speech;
                        self.silence_frame_counter = 0;
                    } else {
                        self.silence_frame_counter += 1;
                        if self.utterance_buffer.len() >= self.max_utterance_samples {
                            return Ok(Some(self.finalize()));
                        }
                        if self.silence_frame_counter >= self.silence_frames_required {
                            if self.utterance_buffer.len() >= self.min_utterance_samples {
                                return Ok(Some(self.finalize()));
                            } else {
                                self.discard();
                            }
                        }
                    }
                }
            }
        }

        Ok(None)
    }

    pub fn state(&self) -> VADState {
        self.state
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vad::EnergyVad;
    use crate::vad::EnergyVadConfig;

    fn test_config() -> SegmenterConfig {
        SegmenterConfig {
            vad_model_path: String::new(),
            threshold: 0.01,
            tts_active_multiplier: 1.5,
            max_threshold: 0.9,
            pre_roll_ms: 100,
            silence_frames_required_ms: 64,
            min_utterance_seconds: 0.05,
            max_utterance_seconds: 2.0,
        }
    }

    fn tone(n: usize) -> Vec<f32> {
        (0..n).map(|i| (i as f32 * 0.3).sin() * 0.8).collect()
    }

    fn silence(n: usize) -> Vec<f32> {
        vec![0.0f32; n]
    }

    #[tokio::test]
    async fn test_pre_roll_retained_in_idle() {
        let vad = Arc::new(EnergyVad::new(EnergyVadConfig {
            energy_floor_db: -50.0,
            frame_size: 512,
        }));
        let mut seg = UtteranceSegmenter::new(vad, test_config(), 16000);

        let result = seg.push(&silence(512 * 3), false).await.unwrap();
        assert!(result.is_none());
        assert_eq!(seg.state(), VADState::Idle);
        assert!(seg.utterance_buffer.len() <= seg.pre_roll_samples);
    }

    #[tokio::test]
    async fn test_speech_then_silence_finalizes_utterance() {
        let vad = Arc::new(EnergyVad::new(EnergyVadConfig {
            energy_floor_db: -50.0,
            frame_size: 512,
        }));
        let mut seg = UtteranceSegmenter::new(vad, test_config(), 16000);

        let mut result = None;
        for _ in 0..8 {
            result = seg.push(&tone(512), false).await.unwrap();
            if result.is_some() {
                break;
            }
        }
        assert!(result.is_none());

        for _ in 0..6 {
            result = seg.push(&silence(512), false).await.unwrap();
            if result.is_some() {
                break;
            }
        }
        assert!(result.is_some());
        assert_eq!(seg.state(), VADState::Idle);
    }

    #[tokio::test]
    async fn test_short_utterance_below_minimum_is_discarded() {
        let mut cfg = test_config();
        cfg.min_utterance_seconds = 10.0;
        let vad = Arc::new(EnergyVad::new(EnergyVadConfig {
            energy_floor_db: -50.0,
            frame_size: 512,
        }));
        let mut seg = UtteranceSegmenter::new(vad, cfg, 16000);

        seg.push(&tone(512 * 2), false).await.unwrap();
        let result = seg.push(&silence(512 * 6), false).await.unwrap();
        assert!(result.is_none());
        assert_eq!(seg.state(), VADState::Idle);
    }

    #[test]
    fn test_effective_threshold_inflates_during_tts() {
        let vad = Arc::new(EnergyVad::new(EnergyVadConfig::default()));
        let seg = UtteranceSegmenter::new(vad, test_config(), 16000);
        assert_eq!(seg.effective_threshold(false), 0.01);
        assert!((seg.effective_threshold(true) - 0.015).abs() < 1e-6);
    }
}
