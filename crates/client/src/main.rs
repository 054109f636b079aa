//! Voice agent edge client entry point.

use std::sync::Arc;

use async_trait::async_trait;

use voice_agent_client::capture::CpalAudioSource;
use voice_agent_client::playback::CpalAudioSink;
use voice_agent_client::traits::WakeWordDetector;
use voice_agent_client::{ClientConfig, ClientStateMachine};
use voice_agent_core::traits::VoiceActivityDetector;
use voice_agent_segmenter::{EnergyVad, EnergyVadConfig};

/// Energy-threshold stand-in for a trained wake-word model: crosses its
/// threshold on any sufficiently loud window. Real deployments swap this
/// for a model-backed `WakeWordDetector`; the state machine doesn't care.
struct EnergyWakeDetector {
    vad: EnergyVad,
    threshold: f32,
}

#[async_trait]
impl WakeWordDetector for EnergyWakeDetector {
    async fn detect(&self, window: &[f32]) -> bool {
        self.vad.speech_probability(window).await.unwrap_or(0.0) >= self.threshold
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "voice_agent_client=info".into()))
        .init();

    let config = ClientConfig::from_env();
    tracing::info!(server_url = %config.server_url, "starting voice agent client");

    let audio_source = Box::new(CpalAudioSource::new(config.sample_rate));
    let audio_sink: Arc<dyn voice_agent_client::traits::AudioSink> = Arc::new(CpalAudioSink::new()?);
    let wake_detector: Arc<dyn WakeWordDetector> = Arc::new(EnergyWakeDetector {
        vad: EnergyVad::new(EnergyVadConfig::default()),
        threshold: config.wake_threshold,
    });
    let local_vad = Arc::new(EnergyVad::new(EnergyVadConfig::default()));

    let state_machine = ClientStateMachine::new(config, audio_source, audio_sink, wake_detector, local_vad);
    state_machine.run().await?;

    Ok(())
}
