//! Pluggable voice-activity detection backends.
//!
//! The segmenter is generic over `voice_agent_core::traits::VoiceActivityDetector`;
//! these are the two concrete implementations shipped here: a neural
//! (ONNX, Silero-style) backend and an energy-threshold fallback used when
//! no model file is configured.

pub mod energy;
#[cfg(feature = "onnx")]
pub mod neural;

pub use energy::{EnergyVad, EnergyVadConfig};
#[cfg(feature = "onnx")]
pub use neural::NeuralVad;
