//! Client runtime configuration. Loaded from `VOICE_AGENT_CLIENT_*`
//! environment variables with defaults matching the server's expected
//! wire format; there is no config-file layer here, unlike the server.

use std::time::Duration;

#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub server_url: String,
    pub sample_rate: u32,
    /// Sample rate the server's TTS synth emits audio at. Not negotiated
    /// over the wire; must match the server's configured synth (24 kHz for
    /// the neural backend, 22050 Hz for the subprocess/piper backend).
    pub tts_sample_rate: u32,
    pub frame_samples: usize,
    pub wake_threshold: f32,
    pub activation_delay: Duration,
    pub tts_active_vad_multiplier: f32,
    pub preroll_duration: Duration,
    pub preroll_timeout: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            server_url: "ws://127.0.0.1:8080/ws/audio".to_string(),
            sample_rate: 16_000,
            tts_sample_rate: 24_000,
            frame_samples: 320,
            wake_threshold: 0.6,
            activation_delay: Duration::from_millis(500),
            tts_active_vad_multiplier: 1.25,
            preroll_duration: Duration::from_millis(1500),
            preroll_timeout: Duration::from_secs(3),
        }
    }
}

impl ClientConfig {
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Ok(url) = std::env::var("VOICE_AGENT_CLIENT_SERVER_URL") {
            config.server_url = url;
        }
        if let Ok(threshold) = std::env::var("VOICE_AGENT_CLIENT_WAKE_THRESHOLD") {
            if let Ok(value) = threshold.parse() {
                config.wake_threshold = value;
            }
        }
        if let Ok(rate) = std::env::var("VOICE_AGENT_CLIENT_TTS_SAMPLE_RATE") {
            if let Ok(value) = rate.parse() {
                config.tts_sample_rate = value;
            }
        }
        config
    }
}
