//! Injectable boundaries for microphone capture, speaker playback, and
//! wake-word detection. The client binary wires the `cpal`-backed defaults
//! in [`crate::capture`] and [`crate::playback`]; wake model weights are
//! out of scope, so the binary's [`WakeWordDetector`] is an energy-threshold
//! stand-in rather than a trained model.

use async_trait::async_trait;

/// A source of mono f32 PCM frames at a fixed sample rate.
#[async_trait]
pub trait AudioSource: Send + Sync {
    /// Start capturing; frames are delivered to `sink` as they arrive.
    fn start(&mut self, sink: tokio::sync::mpsc::UnboundedSender<Vec<f32>>) -> crate::error::Result<()>;
    fn stop(&mut self);
    fn sample_rate(&self) -> u32;
}

/// A sink for mono f32 PCM played back to the user. `source_rate` is the
/// rate `samples` was encoded at (the server's TTS synth rate); the sink
/// resamples to its own output device rate before queuing.
#[async_trait]
pub trait AudioSink: Send + Sync {
    async fn play(&self, samples: &[f32], source_rate: u32) -> crate::error::Result<()>;
    fn sample_rate(&self) -> u32;
}

/// Crosses a confidence threshold on wake-word presence within a window of
/// captured audio. Model-specific; the client only depends on the trait.
#[async_trait]
pub trait WakeWordDetector: Send + Sync {
    async fn detect(&self, window: &[f32]) -> bool;
    fn recommended_frame_size(&self) -> usize {
        320
    }
}
