//! Subprocess speech-to-text backend.
//!
//! Spawns a transcription executable (e.g. a whisper.cpp build) once per
//! utterance: writes the utterance audio to a scratch WAV file, runs the
//! executable against it, and parses a JSON transcript object from stdout.
//! Mirrors the subprocess-per-call shape of the TTS adapter's subprocess
//! variant, applied to the opposite direction of the pipeline.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use futures::Stream;
use serde::Deserialize;
use std::pin::Pin;
use tokio::process::Command;

use voice_agent_config::SttConfig;
use voice_agent_core::traits::{SpeechToText, TranscriptFrame};
use voice_agent_core::{AudioFrame, Result as CoreResult, TranscriptResult};

use crate::error::SttError;

#[derive(Debug, Deserialize)]
struct SubprocessTranscript {
    text: String,
    #[serde(default)]
    confidence: f32,
}

pub struct SubprocessStt {
    config: SttConfig,
}

impl SubprocessStt {
    pub fn new(config: SttConfig) -> Self {
        Self { config }
    }

    fn write_wav(&self, audio: &AudioFrame) -> crate::error::Result<tempfile::NamedTempFile> {
        let file = tempfile::Builder::new()
            .suffix(".wav")
            .tempfile()
            .map_err(|e| SttError::Process(format!("failed to create scratch file: {}", e)))?;

        let spec = hound::WavSpec {
            channels: audio.channels.count() as u16,
            sample_rate: audio.sample_rate.as_u32(),
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };
        let mut writer = hound::WavWriter::create(file.path(), spec)
            .map_err(|e| SttError::Process(format!("failed to open wav writer: {}", e)))?;
        for &sample in audio.samples.iter() {
            let pcm16 = (sample.clamp(-1.0, 1.0) * 32767.0) as i16;
            writer
                .write_sample(pcm16)
                .map_err(|e| SttError::Process(format!("failed to write wav sample: {}", e)))?;
        }
        writer
            .finalize()
            .map_err(|e| SttError::Process(format!("failed to finalize wav: {}", e)))?;

        Ok(file)
    }

    async fn run_once(&self, audio: &AudioFrame) -> crate::error::Result<TranscriptResult> {
        if self.config.executable_path.is_empty() {
            return Err(SttError::Process(
                "no stt executable configured".to_string(),
            ));
        }

        let start = Instant::now();
        let wav = self.write_wav(audio)?;

        let mut command = Command::new(&self.config.executable_path);
        command
            .arg("--model")
            .arg(&self.config.model_path)
            .arg("--device")
            .arg(&self.config.device)
            .arg("--compute-type")
            .arg(&self.config.compute_type)
            .arg("--beam-size")
            .arg(self.config.beam_size.to_string())
            .arg(wav.path());

        let output = tokio::time::timeout(
            Duration::from_secs(self.config.timeout_secs),
            command.output(),
        )
        .await
        .map_err(|_| SttError::Process("stt process timed out".to_string()))?
        .map_err(|e| SttError::Process(format!("failed to spawn stt process: {}", e)))?;

        if !output.status.success() {
            return Err(SttError::Process(format!(
                "stt process exited with {}",
                output.status
            )));
        }

        let transcript: SubprocessTranscript = serde_json::from_slice(&output.stdout)?;
        let latency = start.elapsed();

        Ok(TranscriptResult::new(transcript.text, transcript.confidence)
            .with_latency(latency))
    }
}

#[async_trait]
impl SpeechToText for SubprocessStt {
    async fn transcribe(&self, audio: &AudioFrame) -> CoreResult<TranscriptFrame> {
        self.run_once(audio).await.map_err(Into::into)
    }

    fn transcribe_stream<'a>(
        &'a self,
        mut audio_stream: Pin<Box<dyn Stream<Item = AudioFrame> + Send + 'a>>,
    ) -> Pin<Box<dyn Stream<Item = CoreResult<TranscriptFrame>> + Send + 'a>> {
        Box::pin(async_stream::stream! {
            use futures::StreamExt;
            let mut samples: Vec<f32> = Vec::new();
            let mut last_frame: Option<AudioFrame> = None;
            while let Some(frame) = audio_stream.next().await {
                samples.extend_from_slice(&frame.samples);
                last_frame = Some(frame);
            }
            if let Some(frame) = last_frame {
                let merged = AudioFrame::new(samples, frame.sample_rate, frame.channels, frame.sequence);
                yield self.run_once(&merged).await.map_err(Into::into);
            }
        })
    }

    fn model_name(&self) -> &str {
        if self.config.model_path.is_empty() {
            "subprocess-stt"
        } else {
            &self.config.model_path
        }
    }
}
