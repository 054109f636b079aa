//! Microphone capture via `cpal`, resampled to the pipeline's target rate
//! and delivered as mono f32 frames through an unbounded channel.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{SampleFormat, Stream, StreamConfig};
use tokio::sync::mpsc::UnboundedSender;

use crate::error::{ClientError, Result};
use crate::resample::resample;
use crate::traits::AudioSource;

pub struct CpalAudioSource {
    target_rate: u32,
    stream: Option<Stream>,
    recording: Arc<AtomicBool>,
}

impl CpalAudioSource {
    pub fn new(target_rate: u32) -> Self {
        Self {
            target_rate,
            stream: None,
            recording: Arc::new(AtomicBool::new(false)),
        }
    }
}

fn stereo_to_mono(samples: &[f32], channels: u16) -> Vec<f32> {
    let channels = channels as usize;
    if channels <= 1 {
        return samples.to_vec();
    }
    samples
        .chunks_exact(channels)
        .map(|frame| frame.iter().sum::<f32>() / channels as f32)
        .collect()
}

impl AudioSource for CpalAudioSource {
    fn start(&mut self, sink: UnboundedSender<Vec<f32>>) -> Result<()> {
        let host = cpal::default_host();
        let device = host.default_input_device().ok_or(ClientError::NoInputDevice)?;
        let config = device
            .default_input_config()
            .map_err(|e| ClientError::Stream(e.to_string()))?;

        let device_rate = config.sample_rate().0;
        let device_channels = config.channels();
        let target_rate = self.target_rate;
        let recording = self.recording.clone();
        recording.store(true, Ordering::Release);

        let stream_config: StreamConfig = config.clone().into();
        let err_fn = |err: cpal::StreamError| tracing::error!(%err, "audio input stream error");

        let build = move |data: &[f32]| {
            if !recording.load(Ordering::Acquire) {
                return;
            }
            let mono = stereo_to_mono(data, device_channels);
            let resampled = resample(&mono, device_rate, target_rate);
            if !resampled.is_empty() {
                let _ = sink.send(resampled);
            }
        };

        let stream = match config.sample_format() {
            SampleFormat::F32 => device
                .build_input_stream(
                    &stream_config,
                    move |data: &[f32], _: &cpal::InputCallbackInfo| build(data),
                    err_fn,
                    None,
                )
                .map_err(|e| ClientError::Stream(e.to_string()))?,
            other => return Err(ClientError::Stream(format!("unsupported sample format: {:?}", other))),
        };

        stream.play().map_err(|e| ClientError::Stream(e.to_string()))?;
        self.stream = Some(stream);
        Ok(())
    }

    fn stop(&mut self) {
        self.recording.store(false, Ordering::Release);
        self.stream = None;
    }

    fn sample_rate(&self) -> u32 {
        self.target_rate
    }
}
