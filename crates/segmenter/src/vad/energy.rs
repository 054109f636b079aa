//! Energy-threshold voice-activity detector.
//!
//! Used when no neural VAD model file is configured. Computes RMS energy
//! in dB and maps it onto a 0..1 pseudo-probability the same way the
//! neural backend's fallback path does, so both backends share a
//! threshold scale.

use async_trait::async_trait;
use voice_agent_core::traits::VoiceActivityDetector;

#[derive(Debug, Clone)]
pub struct EnergyVadConfig {
    pub energy_floor_db: f32,
    pub frame_size: usize,
}

impl Default for EnergyVadConfig {
    fn default() -> Self {
        Self {
            energy_floor_db: -50.0,
            frame_size: 512,
        }
    }
}

pub struct EnergyVad {
    config: EnergyVadConfig,
}

impl EnergyVad {
    pub fn new(config: EnergyVadConfig) -> Self {
        Self { config }
    }
}

#[async_trait]
impl VoiceActivityDetector for EnergyVad {
    async fn speech_probability(&self, window: &[f32]) -> voice_agent_core::Result<f32> {
        if window.is_empty() {
            return Ok(0.0);
        }
        let energy: f32 = window.iter().map(|s| s * s).sum::<f32>() / window.len() as f32;
        let energy_db = 10.0 * energy.max(1e-10).log10();

        let threshold_db = self.config.energy_floor_db + 10.0;
        let prob = if energy_db > threshold_db {
            ((energy_db - threshold_db) / 30.0).clamp(0.0, 1.0)
        } else {
            0.0
        };
        Ok(prob)
    }

    fn recommended_frame_size(&self) -> usize {
        self.config.frame_size
    }

    fn model_info(&self) -> &str {
        "energy-threshold-fallback"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_silence_has_low_probability() {
        let vad = EnergyVad::new(EnergyVadConfig::default());
        let silence = vec![0.0f32; 512];
        let prob = vad.speech_probability(&silence).await.unwrap();
        assert_eq!(prob, 0.0);
    }

    #[tokio::test]
    async fn test_loud_signal_has_higher_probability() {
        let vad = EnergyVad::new(EnergyVadConfig::default());
        let tone: Vec<f32> = (0..512).map(|i| (i as f32 * 0.3).sin() * 0.8).collect();
        let prob = vad.speech_probability(&tone).await.unwrap();
        assert!(prob > 0.0);
    }
}
