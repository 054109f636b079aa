//! Speaker playback via `cpal`: queues synthesized PCM onto a ring buffer
//! fed to the output stream's callback.

use std::sync::Arc;

use async_trait::async_trait;
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{SampleFormat, Stream, StreamConfig};
use parking_lot::Mutex;
use std::collections::VecDeque;

use crate::error::{ClientError, Result};
use crate::resample::resample;
use crate::traits::AudioSink;

pub struct CpalAudioSink {
    sample_rate: u32,
    _stream: Stream,
    queue: Arc<Mutex<VecDeque<f32>>>,
}

impl CpalAudioSink {
    pub fn new() -> Result<Self> {
        let host = cpal::default_host();
        let device = host.default_output_device().ok_or(ClientError::NoOutputDevice)?;
        let config = device
            .default_output_config()
            .map_err(|e| ClientError::Stream(e.to_string()))?;

        let sample_rate = config.sample_rate().0;
        let channels = config.channels() as usize;
        let queue: Arc<Mutex<VecDeque<f32>>> = Arc::new(Mutex::new(VecDeque::new()));
        let queue_cb = queue.clone();

        let stream_config: StreamConfig = config.clone().into();
        let err_fn = |err: cpal::StreamError| tracing::error!(%err, "audio output stream error");

        let stream = match config.sample_format() {
            SampleFormat::F32 => device
                .build_output_stream(
                    &stream_config,
                    move |data: &mut [f32], _: &cpal::OutputCallbackInfo| {
                        let mut queue = queue_cb.lock();
                        for frame in data.chunks_mut(channels) {
                            let sample = queue.pop_front().unwrap_or(0.0);
                            for out in frame.iter_mut() {
                                *out = sample;
                            }
                        }
                    },
                    err_fn,
                    None,
                )
                .map_err(|e| ClientError::Stream(e.to_string()))?,
            other => return Err(ClientError::Stream(format!("unsupported sample format: {:?}", other))),
        };

        stream.play().map_err(|e| ClientError::Stream(e.to_string()))?;

        Ok(Self { sample_rate, _stream: stream, queue })
    }
}

#[async_trait]
impl AudioSink for CpalAudioSink {
    async fn play(&self, samples: &[f32], source_rate: u32) -> Result<()> {
        let resampled = resample(samples, source_rate, self.sample_rate);
        self.queue.lock().extend(resampled.iter().copied());
        Ok(())
    }

    fn sample_rate(&self) -> u32 {
        self.sample_rate
    }
}
