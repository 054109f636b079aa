//! Neural (Silero-style) voice-activity detector backed by an ONNX model.
//!
//! The model takes a raw waveform chunk plus the previous LSTM hidden/cell
//! state and returns a speech probability and the updated state. State is
//! held behind a lock since `VoiceActivityDetector::speech_probability` is
//! called from a single segmenter task but must remain `Send + Sync` to sit
//! behind a trait object.

use std::path::Path;

use async_trait::async_trait;
use ndarray::Array2;
use ort::session::builder::GraphOptimizationLevel;
use ort::session::Session;
use ort::value::Tensor;
use parking_lot::Mutex;

use voice_agent_core::traits::VoiceActivityDetector;

use crate::error::SegmenterError;

struct LstmState {
    h: Array2<f32>,
    c: Array2<f32>,
}

pub struct NeuralVad {
    session: Mutex<Session>,
    state: Mutex<LstmState>,
    sample_rate: i64,
    frame_size: usize,
    model_path: String,
}

impl NeuralVad {
    pub fn load(model_path: impl AsRef<Path>, sample_rate: u32, frame_size: usize) -> Result<Self, SegmenterError> {
        let path = model_path.as_ref();
        let session = Session::builder()
            .map_err(|e| SegmenterError::Model(e.to_string()))?
            .with_optimization_level(GraphOptimizationLevel::Level3)
            .map_err(|e| SegmenterError::Model(e.to_string()))?
            .with_intra_threads(1)
            .map_err(|e| SegmenterError::Model(e.to_string()))?
            .commit_from_file(path)
            .map_err(|e| SegmenterError::Model(e.to_string()))?;

        Ok(Self {
            session: Mutex::new(session),
            state: Mutex::new(LstmState {
                h: Array2::zeros((2, 64)),
                c: Array2::zeros((2, 64)),
            }),
            sample_rate: sample_rate as i64,
            frame_size,
            model_path: path.display().to_string(),
        })
    }

    fn reset(&self) {
        let mut state = self.state.lock();
        state.h.fill(0.0);
        state.c.fill(0.0);
    }
}

#[async_trait]
impl VoiceActivityDetector for NeuralVad {
    async fn speech_probability(&self, window: &[f32]) -> voice_agent_core::Result<f32> {
        let input = Array2::from_shape_vec((1, window.len()), window.to_vec())
            .map_err(|e| SegmenterError::Inference(e.to_string()))?;
        let sr = ndarray::arr1(&[self.sample_rate]);

        let mut state = self.state.lock();
        let input_tensor =
            Tensor::from_array(input).map_err(|e| SegmenterError::Inference(e.to_string()))?;
        let sr_tensor =
            Tensor::from_array(sr).map_err(|e| SegmenterError::Inference(e.to_string()))?;
        let h_tensor = Tensor::from_array(state.h.clone())
            .map_err(|e| SegmenterError::Inference(e.to_string()))?;
        let c_tensor = Tensor::from_array(state.c.clone())
            .map_err(|e| SegmenterError::Inference(e.to_string()))?;

        let mut session = self.session.lock();
        let outputs = session
            .run(ort::inputs![
                "input" => input_tensor,
                "sr" => sr_tensor,
                "h" => h_tensor,
                "c" => c_tensor,
            ])
            .map_err(|e| SegmenterError::Inference(e.to_string()))?;

        let (_, speech_data) = outputs
            .get("output")
            .ok_or_else(|| SegmenterError::Inference("missing output tensor".to_string()))?
            .try_extract_tensor::<f32>()
            .map_err(|e| SegmenterError::Inference(e.to_string()))?;
        let speech_prob = speech_data.first().copied().unwrap_or(0.0);

        if let Some(hn) = outputs.get("hn") {
            let (shape, data) = hn
                .try_extract_tensor::<f32>()
                .map_err(|e| SegmenterError::Inference(e.to_string()))?;
            let dims: Vec<usize> = shape.iter().map(|&d| d as usize).collect();
            if dims.len() == 2 && data.len() == dims[0] * dims[1] {
                if let Ok(new_h) = ndarray::ArrayView2::from_shape((dims[0], dims[1]), data) {
                    state.h.assign(&new_h);
                }
            }
        }
        if let Some(cn) = outputs.get("cn") {
            let (shape, data) = cn
                .try_extract_tensor::<f32>()
                .map_err(|e| SegmenterError::Inference(e.to_string()))?;
            let dims: Vec<usize> = shape.iter().map(|&d| d as usize).collect();
            if dims.len() == 2 && data.len() == dims[0] * dims[1] {
                if let Ok(new_c) = ndarray::ArrayView2::from_shape((dims[0], dims[1]), data) {
                    state.c.assign(&new_c);
                }
            }
        }

        Ok(speech_prob)
    }

    fn recommended_frame_size(&self) -> usize {
        self.frame_size
    }

    fn model_info(&self) -> &str {
        &self.model_path
    }
}

impl Drop for NeuralVad {
    fn drop(&mut self) {
        self.reset();
    }
}
