//! Subprocess speech synthesis: spawns the synth executable once per call,
//! writes the text to stdin, and reads raw PCM16 audio back from stdout.
//!
//! Mirrors the Python reference implementation's Piper wrapper: the same
//! `--model <path> --output_raw` invocation, the same up-to-2-attempt retry
//! with a 0.5s gap between attempts, and stderr captured for the failure log.

use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use tokio::io::{AsyncWriteExt, AsyncReadExt};
use tokio::process::Command;

use voice_agent_config::TtsConfig;
use voice_agent_core::traits::TextToSpeech;
use voice_agent_core::{AudioFrame, Channels, Result as CoreResult, SampleRate};

use crate::error::TtsError;

const RETRY_DELAY: Duration = Duration::from_millis(500);

pub struct PiperSynth {
    config: TtsConfig,
}

impl PiperSynth {
    pub fn new(config: TtsConfig) -> Self {
        Self { config }
    }

    async fn run_once(&self, text: &str) -> crate::error::Result<Vec<u8>> {
        let mut child = Command::new(&self.config.executable_path)
            .arg("--model")
            .arg(&self.config.model_path)
            .arg("--output_raw")
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()?;

        let mut stdin = child.stdin.take().expect("stdin was piped");
        stdin.write_all(text.as_bytes()).await?;
        drop(stdin);

        let mut stdout = Vec::new();
        let mut stderr = Vec::new();
        if let Some(mut out) = child.stdout.take() {
            out.read_to_end(&mut stdout).await?;
        }
        if let Some(mut err) = child.stderr.take() {
            err.read_to_end(&mut stderr).await?;
        }

        let status = child.wait().await?;
        if !status.success() {
            return Err(TtsError::Process(String::from_utf8_lossy(&stderr).into_owned()));
        }

        Ok(stdout)
    }

    async fn synthesize_with_retries(&self, text: &str) -> crate::error::Result<Vec<u8>> {
        let attempts = self.config.max_retries.max(1);
        let mut last_error = None;

        for attempt in 1..=attempts {
            match self.run_once(text).await {
                Ok(bytes) if !bytes.is_empty() => return Ok(bytes),
                Ok(_) => {
                    last_error = Some(TtsError::Process("synth produced no audio".to_string()));
                },
                Err(e) => {
                    tracing::warn!(attempt, max_attempts = attempts, error = %e, "piper synth attempt failed");
                    last_error = Some(e);
                },
            }
            if attempt < attempts {
                tokio::time::sleep(RETRY_DELAY).await;
            }
        }

        Err(last_error.unwrap_or_else(|| TtsError::Process("synth failed".to_string())))
    }
}

#[async_trait]
impl TextToSpeech for PiperSynth {
    async fn synthesize(&self, text: &str) -> CoreResult<Option<AudioFrame>> {
        if text.trim().is_empty() {
            return Ok(None);
        }

        let pcm = self.synthesize_with_retries(text).await?;
        Ok(Some(AudioFrame::from_pcm16(
            &pcm,
            SampleRate::Hz22050,
            Channels::Mono,
            0,
        )))
    }

    fn sample_rate(&self) -> SampleRate {
        SampleRate::Hz22050
    }

    fn name(&self) -> &str {
        "piper"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_empty_text_returns_none() {
        let synth = PiperSynth::new(TtsConfig::default());
        let result = synth.synthesize("   ").await.unwrap();
        assert!(result.is_none());
    }

    #[tokio::test]
    async fn test_missing_executable_errors() {
        let mut config = TtsConfig::default();
        config.executable_path = "/nonexistent/piper-binary".to_string();
        config.max_retries = 1;
        let synth = PiperSynth::new(config);
        let result = synth.synthesize("hello there").await;
        assert!(result.is_err());
    }

    #[test]
    fn test_sample_rate_is_22050() {
        let synth = PiperSynth::new(TtsConfig::default());
        assert_eq!(synth.sample_rate(), SampleRate::Hz22050);
    }
}
