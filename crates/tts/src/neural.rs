//! In-process neural speech synthesis.
//!
//! Loaded once at startup and shared across connections. Synthesis runs off
//! the event thread via `spawn_blocking` since ONNX Runtime inference is
//! synchronous; the session itself is guarded by a mutex since `ort::Session`
//! is not safely shared across concurrent `run` calls.

use std::sync::Arc;

use async_trait::async_trait;
use ndarray::Array2;
use ort::session::{builder::GraphOptimizationLevel, Session};
use ort::value::Tensor;
use parking_lot::Mutex;

use voice_agent_config::TtsConfig;
use voice_agent_core::traits::TextToSpeech;
use voice_agent_core::{AudioFrame, Channels, Result as CoreResult, SampleRate};

use crate::error::TtsError;

pub struct NeuralSynth {
    session: Arc<Mutex<Session>>,
    config: TtsConfig,
}

impl NeuralSynth {
    pub fn load(config: TtsConfig) -> crate::error::Result<Self> {
        let session = Session::builder()
            .map_err(|e| TtsError::Model(e.to_string()))?
            .with_optimization_level(GraphOptimizationLevel::Level3)
            .map_err(|e| TtsError::Model(e.to_string()))?
            .with_intra_threads(2)
            .map_err(|e| TtsError::Model(e.to_string()))?
            .commit_from_file(&config.model_path)
            .map_err(|e| TtsError::Model(e.to_string()))?;

        Ok(Self {
            session: Arc::new(Mutex::new(session)),
            config,
        })
    }

    fn synthesize_blocking(session: &Mutex<Session>, text: &str, speed: f32) -> crate::error::Result<Vec<f32>> {
        let text_ids: Vec<i64> = text.chars().map(|c| c as i64).collect();
        if text_ids.is_empty() {
            return Ok(Vec::new());
        }

        let input = Array2::from_shape_vec((1, text_ids.len()), text_ids)
            .map_err(|e| TtsError::Model(e.to_string()))?;
        let input_lengths = Array2::from_shape_vec((1, 1), vec![input.len() as i64])
            .map_err(|e| TtsError::Model(e.to_string()))?;
        let scales = Array2::from_shape_vec((1, 3), vec![0.667, speed, 0.8])
            .map_err(|e| TtsError::Model(e.to_string()))?;

        let mut session = session.lock();
        let outputs = session
            .run(ort::inputs![
                "input" => Tensor::from_array(input).map_err(|e| TtsError::Model(e.to_string()))?,
                "input_lengths" => Tensor::from_array(input_lengths).map_err(|e| TtsError::Model(e.to_string()))?,
                "scales" => Tensor::from_array(scales).map_err(|e| TtsError::Model(e.to_string()))?,
            ])
            .map_err(|e| TtsError::Model(e.to_string()))?;

        let audio = outputs["output"]
            .try_extract_array::<f32>()
            .map_err(|e| TtsError::Model(e.to_string()))?;

        Ok(audio.iter().copied().collect())
    }
}

#[async_trait]
impl TextToSpeech for NeuralSynth {
    async fn synthesize(&self, text: &str) -> CoreResult<Option<AudioFrame>> {
        if text.trim().is_empty() {
            return Ok(None);
        }

        let session = self.session.clone();
        let text = text.to_string();
        let speed = self.config.speed;

        let samples = tokio::task::spawn_blocking(move || {
            Self::synthesize_blocking(&session, &text, speed)
        })
        .await
        .map_err(|e| TtsError::Model(format!("synth task panicked: {}", e)))??;

        if samples.is_empty() {
            return Ok(None);
        }

        Ok(Some(AudioFrame::new(
            samples,
            SampleRate::Hz24000,
            Channels::Mono,
            0,
        )))
    }

    fn sample_rate(&self) -> SampleRate {
        SampleRate::Hz24000
    }

    fn name(&self) -> &str {
        "kokoro"
    }
}
