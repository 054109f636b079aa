//! Utterance segmentation: neural/energy voice-activity detection, pre-roll
//! buffering, and echo-suppressed threshold inflation during TTS playback.

pub mod error;
pub mod segmenter;
pub mod vad;

pub use error::{Result, SegmenterError};
pub use segmenter::UtteranceSegmenter;
pub use vad::{EnergyVad, EnergyVadConfig};
#[cfg(feature = "onnx")]
pub use vad::NeuralVad;
