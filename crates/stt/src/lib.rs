//! Speech-to-text adapter: a subprocess-backed implementation of
//! `voice_agent_core::traits::SpeechToText`.

pub mod error;
pub mod subprocess;

pub use error::{Result, SttError};
pub use subprocess::SubprocessStt;

#[cfg(test)]
mod tests {
    use super::*;
    use voice_agent_config::SttConfig;
    use voice_agent_core::traits::SpeechToText;
    use voice_agent_core::{AudioFrame, Channels, SampleRate};

    #[tokio::test]
    async fn test_missing_executable_errors() {
        let stt = SubprocessStt::new(SttConfig::default());
        let frame = AudioFrame::new(vec![0.0; 1600], SampleRate::Hz16000, Channels::Mono, 0);
        let result = stt.transcribe(&frame).await;
        assert!(result.is_err());
    }

    #[test]
    fn test_model_name_falls_back_when_unset() {
        let stt = SubprocessStt::new(SttConfig::default());
        assert_eq!(stt.model_name(), "subprocess-stt");
    }

    #[test]
    fn test_model_name_reports_configured_path() {
        let mut config = SttConfig::default();
        config.model_path = "models/ggml-base.en.bin".to_string();
        let stt = SubprocessStt::new(config);
        assert_eq!(stt.model_name(), "models/ggml-base.en.bin");
    }
}
