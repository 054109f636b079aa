//! Speech synthesis adapters: a subprocess-per-call backend (piper) and an
//! in-process neural backend sharing one loaded model (kokoro), both behind
//! `voice_agent_core::traits::TextToSpeech`.

pub mod error;
pub mod factory;
pub mod piper;

#[cfg(feature = "onnx")]
pub mod neural;

pub use error::{Result, TtsError};
pub use factory::create_tts;
pub use piper::PiperSynth;

#[cfg(feature = "onnx")]
pub use neural::NeuralSynth;
