//! Construct the configured `TextToSpeech` backend from `TtsConfig`.

use std::sync::Arc;

use voice_agent_config::{TtsConfig, TtsProvider};
use voice_agent_core::traits::TextToSpeech;

use crate::error::{Result, TtsError};
use crate::piper::PiperSynth;

pub fn create_tts(config: &TtsConfig) -> Result<Arc<dyn TextToSpeech>> {
    match config.provider {
        TtsProvider::Piper => Ok(Arc::new(PiperSynth::new(config.clone()))),
        TtsProvider::Kokoro => {
            #[cfg(feature = "onnx")]
            {
                Ok(Arc::new(crate::neural::NeuralSynth::load(config.clone())?))
            }
            #[cfg(not(feature = "onnx"))]
            {
                Err(TtsError::Model(
                    "kokoro provider requires the onnx feature".to_string(),
                ))
            }
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_piper_is_default_provider() {
        let config = TtsConfig::default();
        let tts = create_tts(&config).unwrap();
        assert_eq!(tts.name(), "piper");
    }
}
