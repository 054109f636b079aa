//! `WAITING_FOR_WAKE -> WAKE_DETECTED -> STREAMING` client loop.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::sync::mpsc;

use voice_agent_core::ControlFrame;
use voice_agent_core::traits::VoiceActivityDetector;
use voice_agent_segmenter::EnergyVad;

use crate::config::ClientConfig;
use crate::connection::{Connection, Inbound};
use crate::error::Result;
use crate::preroll::PrerollBuffer;
use crate::traits::{AudioSink, AudioSource, WakeWordDetector};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    WaitingForWake,
    Streaming,
}

pub struct ClientStateMachine {
    config: ClientConfig,
    audio_source: Box<dyn AudioSource>,
    audio_sink: Arc<dyn AudioSink>,
    wake_detector: Arc<dyn WakeWordDetector>,
    local_vad: Arc<EnergyVad>,
}

impl ClientStateMachine {
    pub fn new(
        config: ClientConfig,
        audio_source: Box<dyn AudioSource>,
        audio_sink: Arc<dyn AudioSink>,
        wake_detector: Arc<dyn WakeWordDetector>,
        local_vad: Arc<EnergyVad>,
    ) -> Self {
        Self { config, audio_source, audio_sink, wake_detector, local_vad }
    }

    pub async fn run(mut self) -> Result<()> {
        let (connection, mut inbound) = Connection::connect(&self.config.server_url).await?;
        let connection = Arc::new(connection);

        let (frame_tx, mut frame_rx) = mpsc::unbounded_channel::<Vec<f32>>();
        self.audio_source.start(frame_tx)?;

        let preroll = PrerollBuffer::new(self.config.preroll_duration, self.config.sample_rate);
        preroll.wait_for_preroll(self.config.preroll_timeout).await;

        let tts_active = Arc::new(AtomicBool::new(false));
        let return_to_wake = Arc::new(AtomicBool::new(false));

        {
            let tts_active = tts_active.clone();
            let return_to_wake = return_to_wake.clone();
            let audio_sink = self.audio_sink.clone();
            let tts_sample_rate = self.config.tts_sample_rate;
            tokio::spawn(async move {
                while let Some(item) = inbound.recv().await {
                    match item {
                        Inbound::Control(ControlFrame::TtsStart) => {
                            tts_active.store(true, Ordering::Release);
                        },
                        Inbound::Control(ControlFrame::TtsStop) => {
                            tts_active.store(false, Ordering::Release);
                            return_to_wake.store(true, Ordering::Release);
                        },
                        Inbound::Control(ControlFrame::PlaybackStop) => {
                            tts_active.store(false, Ordering::Release);
                        },
                        Inbound::Control(ControlFrame::Transcription { text }) => {
                            tracing::info!(%text, "transcription");
                        },
                        Inbound::Control(ControlFrame::LlmResponse { text }) => {
                            tracing::info!(%text, "assistant response");
                        },
                        Inbound::Control(_) => {},
                        Inbound::Audio(pcm) => {
                            let samples = voice_agent_core::AudioFrame::from_pcm16(
                                &pcm,
                                sample_rate_from_hz(tts_sample_rate),
                                voice_agent_core::Channels::Mono,
                                0,
                            )
                            .samples;
                            let samples: Vec<f32> = samples.iter().copied().collect();
                            let _ = audio_sink.play(&samples, tts_sample_rate).await;
                        },
                    }
                }
            });
        }

        let mut state = State::WaitingForWake;
        let frame_size = self.wake_detector.recommended_frame_size();
        let mut wake_window: Vec<f32> = Vec::with_capacity(frame_size);

        while let Some(frame) = frame_rx.recv().await {
            match state {
                State::WaitingForWake => {
                    wake_window.extend_from_slice(&frame);
                    if wake_window.len() >= frame_size {
                        let window: Vec<f32> = wake_window.drain(..frame_size).collect();
                        if self.wake_detector.detect(&window).await {
                            self.audio_sink
                                .play(&feedback_tone(self.config.sample_rate), self.config.sample_rate)
                                .await
                                .ok();
                            tokio::time::sleep(self.config.activation_delay).await;
                            connection.send_control(ControlFrame::Hello {
                                sample_rate: self.config.sample_rate,
                                channels: 1,
                            })?;
                            state = State::Streaming;
                        }
                    }
                },
                State::Streaming => {
                    let pcm = samples_to_f32le(&frame);
                    if connection.send_audio(pcm).is_err() {
                        break;
                    }

                    let threshold_multiplier = if tts_active.load(Ordering::Acquire) {
                        self.config.tts_active_vad_multiplier
                    } else {
                        1.0
                    };
                    if let Ok(probability) = self.local_vad.speech_probability(&frame).await {
                        let in_speech = probability * threshold_multiplier >= self.config.wake_threshold;
                        tracing::trace!(probability, in_speech, "local vad");
                    }

                    if return_to_wake.swap(false, Ordering::AcqRel) {
                        state = State::WaitingForWake;
                        wake_window.clear();
                    }
                },
            }
        }

        Ok(())
    }
}

fn sample_rate_from_hz(hz: u32) -> voice_agent_core::SampleRate {
    use voice_agent_core::SampleRate;
    match hz {
        8000 => SampleRate::Hz8000,
        22050 => SampleRate::Hz22050,
        24000 => SampleRate::Hz24000,
        44100 => SampleRate::Hz44100,
        48000 => SampleRate::Hz48000,
        _ => SampleRate::Hz16000,
    }
}

fn feedback_tone(sample_rate: u32) -> Vec<f32> {
    let duration_ms = 120;
    let n = (sample_rate as usize * duration_ms) / 1000;
    let freq = 880.0_f32;
    (0..n)
        .map(|i| (2.0 * std::f32::consts::PI * freq * i as f32 / sample_rate as f32).sin() * 0.2)
        .collect()
}

/// Client -> server audio is float32 LE; only server -> client TTS audio is
/// int16 PCM.
fn samples_to_f32le(samples: &[f32]) -> Vec<u8> {
    samples.iter().flat_map(|&s| s.to_le_bytes()).collect()
}
